//! Configuration driving schema defaults and the storage backend

use super::test_utils::*;
use ctxmodel::{
    row, AccessorArgs, AssociationOptions, Attribute, ConfigLoader, Database, ModelOptions,
    StorageBackend,
};
use tempfile::TempDir;

#[tokio::test]
async fn test_project_config_shapes_schema() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("ctxmodel.toml"),
        r#"
[define]
underscored = true
freeze_table_name = true

[storage]
backend = "memory"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load(temp_dir.path()).unwrap();
    assert!(config.define.underscored);
    assert_eq!(config.storage.backend, StorageBackend::Memory);

    let mut builder = config.schema_builder();
    let user = builder
        .define("User", [("name", Attribute::string())], ModelOptions::new())
        .unwrap();
    let task = builder
        .define("Task", [("title", Attribute::string())], ModelOptions::new())
        .unwrap();
    builder
        .has_many(user, task, AssociationOptions::new())
        .unwrap();

    let db = Database::from_config(builder.build(), &config).unwrap();
    db.sync().await.unwrap();

    let task_model = db.model("Task").unwrap();
    assert_eq!(task_model.definition().table_name(), "Task");
    assert!(task_model.definition().has_attribute("user_id"));
    assert_eq!(
        task_model.definition().timestamp_columns(),
        Some(("created_at".to_string(), "updated_at".to_string()))
    );

    let users = db.model("User").unwrap().contextify(ctx("ctx1"));
    let owner = users.create(row([("name", "Dana".into())])).await.unwrap();
    let created = owner
        .call("createTask", AccessorArgs::Values(row([("title", "plan".into())])))
        .await
        .unwrap()
        .into_one()
        .unwrap();
    assert_eq!(created.get("user_id"), owner.id());
    assert_eq!(ctx_value(&created), Some("ctx1"));
}

#[test]
fn test_explicit_model_options_beat_config_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("ctxmodel.toml");
    std::fs::write(&config_file, "[define]\ntimestamps = false\n").unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let mut builder = config.schema_builder();
    let plain = builder
        .define("Plain", no_attributes(), ModelOptions::new())
        .unwrap();
    let stamped = builder
        .define("Stamped", no_attributes(), ModelOptions::new().timestamps(true))
        .unwrap();

    assert!(builder.model(plain).timestamp_columns().is_none());
    assert_eq!(
        builder.model(stamped).timestamp_columns(),
        Some(("createdAt".to_string(), "updatedAt".to_string()))
    );
}
