use aegis_client::metadata::{AssetMeta, AttackStepMeta, MetadataCatalog};
use aegis_client::{AegisError, AttackStep, HighValueAsset, IdMatcher, Model, ModelError, Object};
use serde_json::json;

fn catalog() -> MetadataCatalog {
    let step = |name: &str| AttackStepMeta {
        name: name.to_string(),
        description: String::new(),
        risk_types: Vec::new(),
    };
    MetadataCatalog::new(vec![
        AssetMeta {
            name: "S3Bucket".to_string(),
            description: String::new(),
            attack_steps: vec![step("ReadObject"), step("DeleteObject")],
        },
        AssetMeta {
            name: "EC2Instance".to_string(),
            description: String::new(),
            attack_steps: vec![step("HighPrivilegeAccess")],
        },
    ])
}

fn storage_model() -> Model {
    let mut model = Model::new("storage");
    for (id, name) in [("1", "bucket-a"), ("2", "bucket-b"), ("3", "bucket-c")] {
        let mut bucket = Object::new(id, name, "S3Bucket").with_tag("team", "storage");
        bucket.add_attack_step(AttackStep::new("ReadObject")).unwrap();
        model.add_object(bucket).unwrap();
    }
    model
        .add_object(Object::new("4", "web1", "EC2Instance"))
        .unwrap();
    model
}

#[test]
fn descriptor_without_consequence_sets_ten() {
    let mut model = storage_model();
    let hva: HighValueAsset =
        serde_json::from_value(json!({"metaconcept": "S3Bucket", "attackstep": "ReadObject"}))
            .unwrap();
    model.set_high_value_assets(&catalog(), &[hva]).unwrap();
    for id in ["1", "2", "3"] {
        assert_eq!(
            model.attack_step(id, "ReadObject").unwrap().raw_consequence(),
            Some(10)
        );
    }
}

#[test]
fn name_matcher_targets_one_object() {
    let mut model = storage_model();
    let hva = HighValueAsset::new("S3Bucket", "ReadObject")
        .with_id(IdMatcher::Name {
            value: "bucket-b".to_string(),
        })
        .with_consequence(6);
    model.set_high_value_assets(&catalog(), &[hva]).unwrap();
    assert_eq!(
        model.attack_step("2", "ReadObject").unwrap().raw_consequence(),
        Some(6)
    );
    for untouched in ["1", "3"] {
        assert_eq!(
            model
                .attack_step(untouched, "ReadObject")
                .unwrap()
                .raw_consequence(),
            None
        );
    }
}

#[test]
fn tag_matcher_targets_tagged_objects() {
    let mut model = storage_model();
    model
        .object_by_id_mut("2")
        .unwrap()
        .tags
        .insert("tier".to_string(), "gold".to_string());

    let hva = HighValueAsset::new("S3Bucket", "ReadObject")
        .with_id(IdMatcher::Tag {
            key: "tier".to_string(),
            value: "gold".to_string(),
        })
        .with_consequence(9);
    model.set_high_value_assets(&catalog(), &[hva]).unwrap();
    assert_eq!(
        model.attack_step("2", "ReadObject").unwrap().raw_consequence(),
        Some(9)
    );
    assert_eq!(
        model.attack_step("1", "ReadObject").unwrap().raw_consequence(),
        None
    );
}

#[test]
fn overlapping_descriptors_resolve_last_wins() {
    let mut model = storage_model();
    let broad = HighValueAsset::new("S3Bucket", "ReadObject").with_consequence(2);
    let narrow = HighValueAsset::new("S3Bucket", "ReadObject")
        .with_id(IdMatcher::Name {
            value: "bucket-a".to_string(),
        })
        .with_consequence(10);
    model
        .set_high_value_assets(&catalog(), &[broad, narrow])
        .unwrap();
    assert_eq!(
        model.attack_step("1", "ReadObject").unwrap().raw_consequence(),
        Some(10),
        "the later, narrower descriptor wins on bucket-a"
    );
    assert_eq!(
        model.attack_step("2", "ReadObject").unwrap().raw_consequence(),
        Some(2)
    );
}

#[test]
fn catalog_valid_step_missing_locally_is_appended() {
    let mut model = storage_model();
    let hva = HighValueAsset::new("S3Bucket", "DeleteObject").with_consequence(7);
    model.set_high_value_assets(&catalog(), &[hva]).unwrap();
    let step = model.attack_step("1", "DeleteObject").unwrap();
    assert_eq!(step.raw_consequence(), Some(7));
}

#[test]
fn catalog_unknown_names_are_rejected_up_front() {
    let mut model = storage_model();

    let err = model
        .set_high_value_assets(
            &catalog(),
            &[HighValueAsset::new("S3Bucket", "FlyToTheMoon")],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AegisError::Model(ModelError::NotFound { kind: "attack step", .. })
    ));

    let err = model
        .set_high_value_assets(&catalog(), &[HighValueAsset::new("Mainframe", "Use")])
        .unwrap_err();
    assert!(matches!(
        err,
        AegisError::Model(ModelError::NotFound { kind: "asset type", .. })
    ));
}

#[test]
fn out_of_range_consequence_rejected_before_mutation() {
    let mut model = storage_model();
    let good = HighValueAsset::new("S3Bucket", "ReadObject").with_consequence(5);
    let bad = HighValueAsset::new("S3Bucket", "ReadObject").with_consequence(11);
    assert!(model.set_high_value_assets(&catalog(), &[good, bad]).is_err());
    assert_eq!(
        model.attack_step("1", "ReadObject").unwrap().raw_consequence(),
        None,
        "nothing is applied when any descriptor is invalid"
    );
}

#[test]
fn descriptor_json_round_trip() {
    let doc = json!({
        "metaconcept": "EC2Instance",
        "attackstep": "HighPrivilegeAccess",
        "id": {"type": "name", "value": "web1"},
        "consequence": 8
    });
    let hva: HighValueAsset = serde_json::from_value(doc.clone()).unwrap();
    assert_eq!(serde_json::to_value(&hva).unwrap(), doc);

    let arn: HighValueAsset = serde_json::from_value(json!({
        "metaconcept": "S3Bucket",
        "attackstep": "ReadObject",
        "id": {"type": "arn", "value": "arn:aws:s3:::bucket-a"}
    }))
    .unwrap();
    assert_eq!(
        arn.id,
        Some(IdMatcher::Arn {
            value: "arn:aws:s3:::bucket-a".to_string()
        })
    );
}
