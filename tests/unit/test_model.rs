use aegis_client::{Association, AttackStep, Defense, Model, ModelError, Object, Ttc};
use serde_json::json;

fn two_tier_doc() -> serde_json::Value {
    json!({
        "mid": "m-42",
        "name": "two-tier",
        "samples": 2000,
        "threshold": 80,
        "metadata": {"source": "aws"},
        "tags": {"env": "prod"},
        "objects": {
            "10": {
                "eid": 1,
                "name": "web1",
                "metaconcept": "EC2Instance",
                "tags": {"role": "frontend"},
                "attacksteps": [
                    {"name": "Connect"},
                    {"name": "HighPrivilegeAccess",
                     "ttc": {"distribution": "Exponential", "parameters": [0.05]},
                     "consequence": 8}
                ],
                "defenses": [{"name": "Patched", "probability": 0.8}]
            },
            "11": {
                "eid": 2,
                "name": "db1",
                "metaconcept": "RDSInstance",
                "attacksteps": [{"name": "ReadDatabase"}]
            }
        },
        "associations": [
            {"id1": "10", "id2": "11", "link": "NetworkAccess",
             "type1": "clients", "type2": "databases"}
        ],
        "views": [{"name": "Overview", "objects": ["10", "11"]}]
    })
}

#[test]
fn parse_builds_complete_graph() {
    let model = Model::from_json(two_tier_doc()).unwrap();
    assert_eq!(model.mid.as_deref(), Some("m-42"));
    assert_eq!(model.samples, 2000);
    assert_eq!(model.threshold, 80);
    assert_eq!(model.tags.get("env").map(String::as_str), Some("prod"));
    assert_eq!(model.object_count(), 2);

    let web1 = model.object(Some("web1"), None).unwrap();
    assert_eq!(web1.metaconcept(), "EC2Instance");
    assert_eq!(web1.attack_steps().len(), 2);
    assert_eq!(
        web1.defense("Patched").unwrap().probability(),
        Some(0.8)
    );
}

#[test]
fn serialize_parse_round_trip_is_lossless() {
    let first = Model::from_json(two_tier_doc()).unwrap();
    let second = Model::from_json(first.to_json().unwrap()).unwrap();
    assert_eq!(first, second);

    // And once more; normalization is stable from the first pass on.
    let third = Model::from_json(second.to_json().unwrap()).unwrap();
    assert_eq!(second, third);
}

#[test]
fn associations_stay_resolvable_through_mutations() {
    let mut model = Model::from_json(two_tier_doc()).unwrap();

    let mut cache = Object::new("12", "cache1", "ElastiCache");
    cache.add_attack_step(AttackStep::new("Access")).unwrap();
    model.add_object(cache).unwrap();
    model
        .add_association(Association {
            id1: "10".to_string(),
            id2: "12".to_string(),
            link: "NetworkAccess".to_string(),
            type1: "clients".to_string(),
            type2: "caches".to_string(),
        })
        .unwrap();
    model.remove_object("11").unwrap();

    for association in model.associations() {
        assert!(model.object_by_id(&association.id1).is_some());
        assert!(model.object_by_id(&association.id2).is_some());
    }
}

#[test]
fn ambiguous_name_lookup_is_an_error_not_a_guess() {
    let mut model = Model::from_json(two_tier_doc()).unwrap();
    model
        .add_object(Object::new("20", "web1", "S3Bucket"))
        .unwrap();

    let err = model.object(Some("web1"), None).unwrap_err();
    assert!(matches!(err, ModelError::Ambiguous { count: 2, .. }));

    let ec2 = model.object(Some("web1"), Some("EC2Instance")).unwrap();
    assert_eq!(ec2.id(), "10");
    let bucket = model.object(Some("web1"), Some("S3Bucket")).unwrap();
    assert_eq!(bucket.id(), "20");
}

#[test]
fn named_member_lookups_fail_loudly() {
    let model = Model::from_json(two_tier_doc()).unwrap();
    assert!(matches!(
        model.attack_step("10", "Fly"),
        Err(ModelError::NotFound { kind: "attack step", .. })
    ));
    assert!(matches!(
        model.defense("11", "Patched"),
        Err(ModelError::NotFound { kind: "defense", .. })
    ));
    assert!(matches!(
        model.attack_step("99", "Connect"),
        Err(ModelError::NotFound { kind: "object", .. })
    ));
}

#[test]
fn local_mutations_round_trip() {
    let mut model = Model::from_json(two_tier_doc()).unwrap();
    model
        .attack_step_mut("10", "Connect")
        .unwrap()
        .set_consequence(3)
        .unwrap();
    model
        .defense_mut("10", "Patched")
        .unwrap()
        .set_probability(0.25)
        .unwrap();
    model.attack_step_mut("11", "ReadDatabase").unwrap().disable();

    let reparsed = Model::from_json(model.to_json().unwrap()).unwrap();
    assert_eq!(
        reparsed.attack_step("10", "Connect").unwrap().consequence(),
        3
    );
    assert_eq!(
        reparsed.defense("10", "Patched").unwrap().probability(),
        Some(0.25)
    );
    let disabled = reparsed.attack_step("11", "ReadDatabase").unwrap();
    assert!(disabled.is_disabled());
    assert_eq!(disabled.ttc, Some(Ttc::disabled()));
}

#[test]
fn malformed_documents_are_rejected_whole() {
    // Association to a missing object.
    let mut doc = two_tier_doc();
    doc["associations"][0]["id1"] = json!("404");
    assert!(Model::from_json(doc).is_err());

    // Colliding defense names on one object.
    let mut doc = two_tier_doc();
    doc["objects"]["10"]["defenses"] = json!([
        {"name": "Patched"},
        {"name": "Patched"}
    ]);
    assert!(Model::from_json(doc).is_err());

    // Missing top-level name.
    let mut doc = two_tier_doc();
    doc.as_object_mut().unwrap().remove("name");
    assert!(Model::from_json(doc).is_err());
}

#[test]
fn defense_member_checks_mirror_attack_steps() {
    let mut object = Object::new("1", "host", "EC2Instance");
    object.add_defense(Defense::new("Patched")).unwrap();
    let err = object.add_defense(Defense::new("Patched")).unwrap_err();
    assert!(err.to_string().contains("Duplicate defense"));
}
