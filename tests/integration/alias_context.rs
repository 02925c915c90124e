//! Aliases on context-bound models

use super::test_utils::*;
use ctxmodel::{
    row, Alias, AssociationOptions, FindOptions, Include, ModelError, ModelOptions, NameForms,
    Schema, SchemaBuilder, Value,
};

fn user_task_schema(assignments: &str, owner: &str) -> Schema {
    let mut builder = SchemaBuilder::new();
    let user = builder.define("user", no_attributes(), ModelOptions::new()).unwrap();
    let task = builder.define("task", no_attributes(), ModelOptions::new()).unwrap();
    builder
        .has_many(
            user,
            task,
            AssociationOptions::new().alias(assignments).foreign_key("userId"),
        )
        .unwrap();
    builder
        .belongs_to(
            task,
            user,
            AssociationOptions::new().alias(owner).foreign_key("userId"),
        )
        .unwrap();
    builder.build()
}

#[tokio::test]
async fn test_alias_getter_upper_cased_but_include_key_untouched() {
    let (db, _) = memory_db(user_task_schema("assignments", "owner")).await;
    let user = db.model("user").unwrap();
    let task = db.model("task").unwrap();

    let ctx1 = ctx("ctx1");
    let ctx2 = ctx("ctx2");
    let user1_model = user.contextify(ctx1.clone());
    let user2_model = user.contextify(ctx2.clone());
    let task1_model = task.contextify(ctx1.clone());
    let task2_model = task.contextify(ctx2.clone());

    let (user1, user2) = tokio::try_join!(
        user1_model.create(row([("id", 1.into())])),
        user2_model.create(row([("id", 2.into())])),
    )
    .unwrap();
    assert_eq!(user1.id(), Some(&Value::from(1)));
    assert_eq!(ctx_value(&user1), Some("ctx1"));
    assert!(user1.has_method("getAssignments"));
    assert_eq!(user2.id(), Some(&Value::from(2)));
    assert_eq!(ctx_value(&user2), Some("ctx2"));
    assert!(user2.has_method("getAssignments"));

    let (task1, task2) = tokio::try_join!(
        task1_model.create(row([("id", 1.into()), ("userId", 1.into())])),
        task2_model.create(row([("id", 2.into()), ("userId", 2.into())])),
    )
    .unwrap();
    assert_eq!(ctx_value(&task1), Some("ctx1"));
    assert!(task1.has_method("getOwner"));
    assert_eq!(ctx_value(&task2), Some("ctx2"));
    assert!(task2.has_method("getOwner"));

    let (user1, task1, user2, task2) = tokio::try_join!(
        user1_model.find(
            FindOptions::new()
                .where_eq("id", 1)
                .include(Include::model_as(&task, "assignments"))
        ),
        task1_model.find(
            FindOptions::new()
                .where_eq("id", 1)
                .include(Include::model_as(&user, "owner"))
        ),
        user2_model.find(
            FindOptions::new()
                .where_eq("id", 2)
                .include(Include::model_as(&task, "assignments"))
        ),
        task2_model.find(
            FindOptions::new()
                .where_eq("id", 2)
                .include(Include::model_as(&user, "owner"))
        ),
    )
    .unwrap();

    let (user1, task1) = (user1.unwrap(), task1.unwrap());
    let (user2, task2) = (user2.unwrap(), task2.unwrap());
    assert_eq!(ctx_value(&user1), Some("ctx1"));
    let assignments = user1.included_many("assignments").unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(ctx_value(&assignments[0]), Some("ctx1"));
    assert_eq!(ctx_value(&task1), Some("ctx1"));
    assert_eq!(ctx_value(task1.included_one("owner").unwrap()), Some("ctx1"));

    assert_eq!(ctx_value(&user2), Some("ctx2"));
    assert_eq!(user2.included_many("assignments").unwrap().len(), 1);
    assert_eq!(ctx_value(&task2), Some("ctx2"));
    assert_eq!(ctx_value(task2.included_one("owner").unwrap()), Some("ctx2"));
}

#[tokio::test]
async fn test_upper_case_alias_left_untouched() {
    let (db, _) = memory_db(user_task_schema("ASSIGNMENTS", "OWNER")).await;
    let user = db.model("user").unwrap();
    let task = db.model("task").unwrap();
    let ctx1 = ctx("ctx1");
    let user_model = user.contextify(ctx1.clone());
    let task_model = task.contextify(ctx1.clone());

    let created = user_model.create(row([("id", 1.into())])).await.unwrap();
    assert_eq!(ctx_value(&created), Some("ctx1"));
    assert!(created.has_method("getASSIGNMENTS"));

    let created = task_model
        .create(row([("id", 1.into()), ("userId", 1.into())]))
        .await
        .unwrap();
    assert_eq!(ctx_value(&created), Some("ctx1"));
    assert!(created.has_method("getOWNER"));

    let found_user = user_model
        .find(
            FindOptions::new()
                .where_eq("id", 1)
                .include(Include::model_as(&task, "ASSIGNMENTS")),
        )
        .await
        .unwrap()
        .unwrap();
    let found_task = task_model
        .find(
            FindOptions::new()
                .where_eq("id", 1)
                .include(Include::model_as(&user, "OWNER")),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ctx_value(&found_user), Some("ctx1"));
    assert_eq!(found_user.included_many("ASSIGNMENTS").unwrap().len(), 1);
    assert_eq!(ctx_value(&found_task), Some("ctx1"));
    assert!(found_task.included_one("OWNER").is_some());

    let err = user_model
        .find(FindOptions::new().include(Include::model_as(&task, "assignments")))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::UnresolvableInclude { .. }));
}

#[tokio::test]
async fn test_explicit_plural_and_singular_on_has_many() {
    let mut builder = SchemaBuilder::new();
    let user_id = builder.define("user", no_attributes(), ModelOptions::new()).unwrap();
    let task_id = builder.define("task", no_attributes(), ModelOptions::new()).unwrap();
    builder
        .has_many(
            user_id,
            task_id,
            AssociationOptions::new().alias(Alias::forms("task", "taskz")),
        )
        .unwrap();
    let (db, _) = memory_db(builder.build()).await;

    let ctx1 = ctx("ctx1");
    let user_model = db.model("user").unwrap().contextify(ctx1.clone());
    let task_model = db.model("task").unwrap().contextify(ctx1.clone());

    let user = user_model.create(row([("id", 1.into())])).await.unwrap();
    assert_eq!(ctx_value(&user), Some("ctx1"));
    assert!(user.has_method("getTaskz"));
    assert!(user.has_method("addTask"));
    assert!(user.has_method("addTaskz"));

    let (first, second) = tokio::try_join!(
        user.call("createTask", Default::default()),
        user.call("createTask", Default::default()),
    )
    .unwrap();
    for created in [first, second] {
        let created = created.into_one().unwrap();
        assert_eq!(ctx_value(&created), Some("ctx1"));
        assert_eq!(created.get("userId"), Some(&Value::from(1)));
    }

    let user = user_model
        .find(
            FindOptions::new()
                .where_eq("id", 1)
                .include(Include::model_as(&task_model, "taskz")),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ctx_value(&user), Some("ctx1"));
    let taskz = user.included_many("taskz").unwrap();
    assert_eq!(taskz.len(), 2);
    assert_eq!(ctx_value(&taskz[0]), Some("ctx1"));
    assert_eq!(ctx_value(&taskz[1]), Some("ctx1"));
}

#[tokio::test]
async fn test_name_forms_defined_on_model() {
    let mut builder = SchemaBuilder::new();
    let user_id = builder.define("user", no_attributes(), ModelOptions::new()).unwrap();
    let task_id = builder
        .define(
            "task",
            no_attributes(),
            ModelOptions::new().name(NameForms::new("assignment", "assignments")),
        )
        .unwrap();
    builder
        .has_many(user_id, task_id, AssociationOptions::new())
        .unwrap();
    let (db, _) = memory_db(builder.build()).await;

    let ctx1 = ctx("ctx1");
    let user_model = db.model("user").unwrap().contextify(ctx1.clone());
    let task_model = db.model("task").unwrap().contextify(ctx1.clone());

    let user = user_model.create(row([("id", 1.into())])).await.unwrap();
    assert_eq!(ctx_value(&user), Some("ctx1"));
    assert!(user.has_method("getAssignments"));
    assert!(user.has_method("addAssignment"));
    assert!(user.has_method("addAssignments"));

    let assignments = user.association("assignments").unwrap();
    tokio::try_join!(
        assignments.create(row::<&str, _>([])),
        assignments.create(row::<&str, _>([])),
    )
    .unwrap();

    let user = user_model
        .find(
            FindOptions::new()
                .where_eq("id", 1)
                .include(Include::model(&task_model)),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ctx_value(&user), Some("ctx1"));
    let loaded = user.included_many("assignments").unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].ctx(), Some(&ctx1));
    assert_eq!(loaded[1].ctx(), Some(&ctx1));
}
