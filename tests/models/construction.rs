use std::sync::Arc;

use arrow_orm::{Field, FieldType, InMemoryConnector, Model, ModelDefinition, ModelError};

use crate::support::{user_model, StubConnector};

#[test]
fn missing_connector_is_definition_error() {
    let definition = ModelDefinition::new().field("name", Field::string());

    let err = Model::define("user", definition).unwrap_err();

    assert!(matches!(err, ModelError::Definition(_)));
}

#[test]
fn empty_definition_is_definition_error() {
    let err = Model::define("user", ModelDefinition::default()).unwrap_err();
    assert!(matches!(err, ModelError::Definition(_)));
}

#[test]
fn reserved_id_field_is_validation_error() {
    let definition = ModelDefinition::new()
        .field("id", Field::string())
        .with_connector(Arc::new(StubConnector::new()));

    let err = Model::define("user", definition).unwrap_err();

    assert!(matches!(err, ModelError::Validation { ref field, .. } if field == "id"));
}

#[test]
fn define_from_json_config() {
    let definition = ModelDefinition::from_json(
        r#"{
            "fields": {
                "title": { "type": "string", "required": true, "maxlength": 120 },
                "done": { "type": "boolean", "default": false }
            },
            "plural": "todos",
            "metadata": { "table": "todo_items" }
        }"#,
    )
    .unwrap()
    .with_connector(Arc::new(InMemoryConnector::new()));

    let todo = Model::define("todo", definition).unwrap();

    assert_eq!(todo.plural(), "todos");
    assert_eq!(todo.field("done").map(|f| f.field_type), Some(FieldType::Boolean));
    assert_eq!(todo.field("title").and_then(|f| f.maxlength), Some(120));
    assert_eq!(
        todo.metadata().and_then(|m| m.get("table")).and_then(|t| t.as_str()),
        Some("todo_items")
    );
}

#[test]
fn extend_with_model_merges_fields_last_wins() {
    let connector = Arc::new(StubConnector::new());
    let a = Model::define(
        "a",
        ModelDefinition::new()
            .field("x", Field::string())
            .with_connector(connector.clone()),
    )
    .unwrap();
    let b = Model::define(
        "b",
        ModelDefinition::new()
            .field("x", Field::integer().required())
            .field("y", Field::boolean())
            .with_connector(connector),
    )
    .unwrap();

    let merged = a.extend(&b).unwrap();

    let names: Vec<_> = merged.fields().keys().cloned().collect();
    assert_eq!(names, vec!["x", "y"]);
    assert_eq!(merged.field("x"), b.field("x"));
    assert_eq!(merged.name(), "b");
    // the receiver is untouched
    assert_eq!(a.field("x").map(|f| f.field_type), Some(FieldType::String));
    assert_eq!(a.fields().len(), 1);
}

#[test]
fn extend_inherits_connector_when_definition_has_none() {
    let stub = Arc::new(StubConnector::new());
    let user = user_model(stub.clone());

    let admin = user
        .extend(("admin", ModelDefinition::new().field("level", Field::integer())))
        .unwrap();

    assert_eq!(admin.connector().map(|c| c.name().to_string()), Some("stub".into()));
    assert!(admin.field("name").is_some());
    assert!(admin.field("level").is_some());
}

#[test]
fn extend_with_reserved_id_is_validation_error() {
    let user = user_model(Arc::new(StubConnector::new()));

    let err = user
        .extend(("admin", ModelDefinition::new().field("id", Field::integer())))
        .unwrap_err();

    assert!(matches!(err, ModelError::Validation { .. }));
}
