use std::collections::BTreeMap;

use aegis_client::{Tuning, TuningFilter, TuningKind, TuningType, ValidationError};
use serde_json::json;

fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn each_kind_serializes_its_own_payload() {
    let cases: Vec<(TuningKind, &str, serde_json::Value)> = vec![
        (TuningKind::Attacker, "", json!(null)),
        (
            TuningKind::Ttc {
                ttc: "Exponential,0.1".to_string(),
            },
            "ttc",
            json!("Exponential,0.1"),
        ),
        (
            TuningKind::Probability { probability: 0.5 },
            "probability",
            json!(0.5),
        ),
        (
            TuningKind::Consequence { consequence: 7 },
            "consequence",
            json!(7),
        ),
        (
            TuningKind::Tag {
                tags: tags(&[("env", "prod")]),
            },
            "tags",
            json!({"env": "prod"}),
        ),
    ];

    for (kind, payload_key, payload_value) in cases {
        let type_name = kind.tuning_type().name();
        let tuning = Tuning::apply(kind, TuningFilter::metaconcept("EC2Instance")).unwrap();
        let value = tuning.to_value();
        assert_eq!(value["type"], type_name);
        assert_eq!(value["op"], "apply");
        assert_eq!(value["filter"], json!({"metaconcept": "EC2Instance"}));

        // Exactly the one legal payload key is present.
        for key in ["ttc", "probability", "consequence", "tags"] {
            if key == payload_key {
                assert_eq!(value[key], payload_value, "payload for {type_name}");
            } else {
                assert!(
                    value.get(key).is_none(),
                    "'{key}' must be absent on a {type_name} tuning"
                );
            }
        }
    }
}

#[test]
fn multi_payload_documents_always_fail() {
    let payloads = [
        ("ttc", json!("Infinity")),
        ("probability", json!(0.5)),
        ("consequence", json!(5)),
        ("tags", json!({"a": "b"})),
    ];
    for type_name in ["attacker", "ttc", "probability", "consequence", "tag"] {
        for (i, (key_a, value_a)) in payloads.iter().enumerate() {
            for (key_b, value_b) in &payloads[i + 1..] {
                let mut doc = json!({"type": type_name, "op": "apply", "filter": {}});
                doc[*key_a] = value_a.clone();
                doc[*key_b] = value_b.clone();
                assert!(
                    Tuning::from_value(&doc).is_err(),
                    "type {type_name} accepted payloads {key_a}+{key_b}"
                );
            }
        }
    }
}

#[test]
fn defense_filter_is_rejected_outside_probability() {
    let filter = TuningFilter::metaconcept("EC2Instance").with_defense("Patched");
    for kind in [
        TuningKind::Attacker,
        TuningKind::Ttc {
            ttc: "Infinity".to_string(),
        },
        TuningKind::Consequence { consequence: 5 },
        TuningKind::Tag {
            tags: tags(&[("env", "prod")]),
        },
    ] {
        assert!(matches!(
            Tuning::apply(kind, filter.clone()),
            Err(ValidationError::ForbiddenFilterKey { key: "defense", .. })
        ));
    }

    // And it is the one place a defense filter is legal.
    let tuning = Tuning::apply(TuningKind::Probability { probability: 0.2 }, filter).unwrap();
    assert_eq!(tuning.to_value()["filter"]["defense"], "Patched");
}

#[test]
fn attackstep_filter_is_rejected_for_probability_and_tag() {
    let filter = TuningFilter::metaconcept("EC2Instance").with_attackstep("Connect");
    for kind in [
        TuningKind::Probability { probability: 0.2 },
        TuningKind::Tag {
            tags: tags(&[("env", "prod")]),
        },
    ] {
        assert!(matches!(
            Tuning::apply(kind, filter.clone()),
            Err(ValidationError::ForbiddenFilterKey { key: "attackstep", .. })
        ));
    }
}

#[test]
fn numeric_ranges_are_enforced() {
    for probability in [-0.1, 1.01, f64::INFINITY] {
        assert!(matches!(
            Tuning::apply(
                TuningKind::Probability { probability },
                TuningFilter::default()
            ),
            Err(ValidationError::OutOfRange { field: "probability", .. })
        ));
    }
    for consequence in [0u8, 11, 200] {
        assert!(matches!(
            Tuning::apply(
                TuningKind::Consequence { consequence },
                TuningFilter::default()
            ),
            Err(ValidationError::OutOfRange { field: "consequence", .. })
        ));
    }
    // Boundary values pass.
    for probability in [0.0, 1.0] {
        assert!(Tuning::apply(
            TuningKind::Probability { probability },
            TuningFilter::default()
        )
        .is_ok());
    }
    for consequence in [1u8, 10] {
        assert!(Tuning::apply(
            TuningKind::Consequence { consequence },
            TuningFilter::default()
        )
        .is_ok());
    }
}

#[test]
fn wire_round_trip_preserves_every_kind() {
    let kinds = [
        TuningKind::Attacker,
        TuningKind::Ttc {
            ttc: "TruncatedNormal,5,1".to_string(),
        },
        TuningKind::Probability { probability: 1.0 },
        TuningKind::Consequence { consequence: 1 },
        TuningKind::Tag {
            tags: tags(&[("owner", "storage-team")]),
        },
    ];
    for kind in kinds {
        let tuning = Tuning::apply(kind, TuningFilter::metaconcept("S3Bucket")).unwrap();
        let parsed = Tuning::from_value(&tuning.to_value()).unwrap();
        assert_eq!(parsed, tuning);
    }
}

#[test]
fn clear_round_trips_without_payload() {
    for tuning_type in [
        TuningType::Attacker,
        TuningType::Ttc,
        TuningType::Probability,
        TuningType::Consequence,
        TuningType::Tag,
    ] {
        let tuning = Tuning::clear(tuning_type, TuningFilter::object_name("web1")).unwrap();
        let value = tuning.to_value();
        assert_eq!(value["op"], "clear");
        for key in ["ttc", "probability", "consequence", "tags"] {
            assert!(value.get(key).is_none());
        }
        assert_eq!(Tuning::from_value(&value).unwrap(), tuning);
    }
}
