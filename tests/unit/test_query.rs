use aegis_client::model::query::{resolve_attack_steps, resolve_defenses, resolve_objects};
use aegis_client::{
    AegisError, AttackStep, Defense, Model, ModelError, Object, TuningFilter, ValidationError,
};

fn mixed_model() -> Model {
    let mut model = Model::new("fleet");
    for (id, name) in [("1", "web1"), ("2", "web2"), ("3", "web3")] {
        let mut obj = Object::new(id, name, "EC2Instance");
        obj.add_attack_step(AttackStep::new("Connect")).unwrap();
        obj.add_attack_step(AttackStep::new("HighPrivilegeAccess"))
            .unwrap();
        obj.add_defense(Defense::new("Patched")).unwrap();
        model.add_object(obj).unwrap();
    }
    let mut bucket = Object::new("4", "bucket-a", "S3Bucket").with_tag("env", "prod");
    bucket.add_attack_step(AttackStep::new("ReadObject")).unwrap();
    bucket.add_defense(Defense::new("Encrypted")).unwrap();
    model.add_object(bucket).unwrap();
    let mut net = Object::new("5", "vpc", "VPC");
    net.add_defense(Defense::new("Segmented")).unwrap();
    model.add_object(net).unwrap();
    model
}

#[test]
fn metaconcept_filter_returns_exactly_the_matching_type() {
    let model = mixed_model();
    let filter = TuningFilter::metaconcept("EC2Instance");

    let steps = resolve_attack_steps(&model, &filter).unwrap();
    assert_eq!(steps.len(), 6, "3 instances x 2 attack steps");
    assert!(steps.iter().all(|(o, _)| o.metaconcept() == "EC2Instance"));

    let defenses = resolve_defenses(&model, &filter).unwrap();
    assert_eq!(defenses.len(), 3);
}

#[test]
fn metaconcept_matching_is_case_sensitive() {
    let model = mixed_model();
    let filter = TuningFilter::metaconcept("ec2instance");
    assert!(resolve_objects(&model, &filter).unwrap().is_empty());
}

#[test]
fn object_name_narrows_to_one() {
    let model = mixed_model();
    let filter = TuningFilter::object_name("web2").with_attackstep("Connect");
    let steps = resolve_attack_steps(&model, &filter).unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].0.id(), "2");
    assert_eq!(steps[0].1.name(), "Connect");
}

#[test]
fn duplicate_names_need_a_metaconcept() {
    let mut model = mixed_model();
    model
        .add_object(Object::new("6", "web1", "S3Bucket"))
        .unwrap();

    let err = resolve_objects(&model, &TuningFilter::object_name("web1")).unwrap_err();
    assert!(matches!(
        err,
        AegisError::Model(ModelError::Ambiguous { .. })
    ));

    let filter = TuningFilter {
        metaconcept: Some("S3Bucket".to_string()),
        object_name: Some("web1".to_string()),
        ..TuningFilter::default()
    };
    let objects = resolve_objects(&model, &filter).unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].id(), "6");
}

#[test]
fn tag_filters_require_a_single_pair() {
    let model = mixed_model();

    let single = TuningFilter::default().with_tag("env", "prod");
    let objects = resolve_objects(&model, &single).unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].id(), "4");

    let double = TuningFilter::default()
        .with_tag("env", "prod")
        .with_tag("team", "storage");
    let err = resolve_objects(&model, &double).unwrap_err();
    assert!(matches!(
        err,
        AegisError::Validation(ValidationError::TooManyFilterTags(2))
    ));
}

#[test]
fn tag_value_must_match_exactly() {
    let model = mixed_model();
    let filter = TuningFilter::default().with_tag("env", "staging");
    assert!(resolve_objects(&model, &filter).unwrap().is_empty());
}

#[test]
fn empty_target_sets_are_legal() {
    let model = mixed_model();
    let filter = TuningFilter::metaconcept("EC2Instance").with_attackstep("NoSuchStep");
    assert!(resolve_attack_steps(&model, &filter).unwrap().is_empty());
    let filter = TuningFilter::metaconcept("S3Bucket").with_defense("NoSuchDefense");
    assert!(resolve_defenses(&model, &filter).unwrap().is_empty());
}

#[test]
fn filter_disable_then_disable_again_is_stable() {
    let mut model = mixed_model();
    let filter = TuningFilter::object_name("web1").with_attackstep("Connect");

    assert_eq!(model.disable_attack_steps(&filter).unwrap(), 1);
    let once = model.to_json().unwrap();
    assert_eq!(model.disable_attack_steps(&filter).unwrap(), 1);
    let twice = model.to_json().unwrap();
    assert_eq!(once, twice, "disabling is idempotent");
}
