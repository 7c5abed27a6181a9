use serde_json::json;

use super::registry;

#[test]
fn generated_arguments_carry_no_defaults() {
    let schemas = registry();
    for schema in [&schemas.playbook_args, &schemas.module_args] {
        assert!(!schema.fields().is_empty());
        for def in schema.fields() {
            if let crate::core::schema::Field::Scalar(spec) = &def.field {
                assert!(spec.default.is_none(), "{} has a default", def.name);
            }
        }
    }
}

#[test]
fn empty_vars_stay_empty() {
    let schemas = registry();
    assert!(schemas.playbook_args.validate_create(&json!({})).unwrap().is_empty());
    assert!(schemas.module_args.validate_create(&json!({})).unwrap().is_empty());

    let validated = schemas
        .template_create
        .validate_create(&json!({ "name": "t", "data": { "playbook": "a.yml", "vars": {} } }))
        .unwrap();
    assert_eq!(validated["data"]["vars"], json!({}));
}

#[test]
fn secret_formats_survive_generation() {
    let schemas = registry();
    let desc = schemas.playbook_args.describe();
    let private_key = desc["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "private_key")
        .unwrap()
        .clone();
    assert_eq!(private_key["format"], "secretfile");
}
