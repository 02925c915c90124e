//! Eager loading through bound models

use super::test_utils::*;
use ctxmodel::{
    row, AccessorArgs, AssociationOptions, Attribute, Criteria, Database, FindOptions, Include,
    Included, ModelError, ModelOptions, SchemaBuilder,
};

/// `User` has many `Task`s, each `Task` belongs to a `User` and has many `Tag`s
/// through `TaskTags`.
async fn tracker_db() -> Database {
    let mut builder = SchemaBuilder::new();
    let user = builder
        .define("User", [("name", Attribute::string())], ModelOptions::new())
        .unwrap();
    let task = builder
        .define("Task", [("title", Attribute::string())], ModelOptions::new())
        .unwrap();
    let tag = builder
        .define("Tag", [("label", Attribute::string())], ModelOptions::new())
        .unwrap();
    builder
        .has_many(user, task, AssociationOptions::new().foreign_key("userId"))
        .unwrap();
    builder
        .belongs_to(task, user, AssociationOptions::new().foreign_key("userId"))
        .unwrap();
    builder
        .belongs_to_many(task, tag, "TaskTags", AssociationOptions::new())
        .unwrap();
    memory_db(builder.build()).await.0
}

#[tokio::test]
async fn test_nested_includes_share_root_context() {
    let db = tracker_db().await;
    let ctx1 = ctx("ctx1");
    let users = db.model("User").unwrap().contextify(ctx1.clone());
    let tags = db.model("Tag").unwrap().contextify(ctx1.clone());
    let task_model = db.model("Task").unwrap();
    let tag_model = db.model("Tag").unwrap();

    let mary = users.create(row([("name", "Mary".into())])).await.unwrap();
    let urgent = tags.create(row([("label", "urgent".into())])).await.unwrap();
    let first = mary
        .call("createTask", AccessorArgs::Values(row([("title", "first".into())])))
        .await
        .unwrap()
        .into_one()
        .unwrap();
    mary.call("createTask", AccessorArgs::Values(row([("title", "second".into())])))
        .await
        .unwrap();
    first
        .call("addTag", AccessorArgs::Instance(urgent.clone()))
        .await
        .unwrap();

    let found = users
        .find(
            FindOptions::new().where_eq("name", "Mary").include(
                Include::model(&task_model)
                    .include(Include::model(&tag_model))
                    .include(Include::alias("User")),
            ),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.ctx(), Some(&ctx1));
    let loaded = found.included_many("Tasks").unwrap();
    assert_eq!(loaded.len(), 2);
    for task in loaded {
        assert_eq!(task.ctx(), Some(&ctx1));
        let owner = task.included_one("User").unwrap();
        assert_eq!(owner.ctx(), Some(&ctx1));
        assert_eq!(owner.id(), mary.id());

        let task_tags = task.included_many("Tags").unwrap();
        if task.get("title").and_then(|v| v.as_str()) == Some("first") {
            assert_eq!(task_tags.len(), 1);
            assert_eq!(task_tags[0].ctx(), Some(&ctx1));
            assert_eq!(task_tags[0].id(), urgent.id());
        } else {
            assert!(task_tags.is_empty());
        }
    }
}

#[tokio::test]
async fn test_empty_and_missing_associations() {
    let db = tracker_db().await;
    let ctx1 = ctx("ctx1");
    let users = db.model("User").unwrap().contextify(ctx1.clone());
    let tasks = db.model("Task").unwrap().contextify(ctx1.clone());
    let user_model = db.model("User").unwrap();
    let task_model = db.model("Task").unwrap();

    users.create(row([("name", "Idle".into())])).await.unwrap();
    tasks.create(row([("title", "orphan".into())])).await.unwrap();

    let idle = users
        .find_all(FindOptions::new().include(Include::model(&task_model)))
        .await
        .unwrap();
    assert_eq!(idle.len(), 1);
    assert!(matches!(idle[0].included("Tasks"), Some(Included::Many(v)) if v.is_empty()));

    let orphan = tasks
        .find(FindOptions::new().include(Include::model(&user_model)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(orphan.ctx(), Some(&ctx1));
    assert!(matches!(orphan.included("User"), Some(Included::One(None))));
}

#[tokio::test]
async fn test_include_filter() {
    let db = tracker_db().await;
    let ctx1 = ctx("ctx1");
    let users = db.model("User").unwrap().contextify(ctx1.clone());
    let task_model = db.model("Task").unwrap();

    let mary = users.create(row([("name", "Mary".into())])).await.unwrap();
    for title in ["keep", "drop"] {
        mary.call("createTask", AccessorArgs::Values(row([("title", title.into())])))
            .await
            .unwrap();
    }

    let found = users
        .find(
            FindOptions::new()
                .include(Include::model(&task_model).filter(Criteria::new().eq("title", "keep"))),
        )
        .await
        .unwrap()
        .unwrap();
    let loaded = found.included_many("Tasks").unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].get("title").and_then(|v| v.as_str()), Some("keep"));
}

#[tokio::test]
async fn test_include_limit_applies_per_parent() {
    let db = tracker_db().await;
    let users = db.model("User").unwrap().contextify(ctx("ctx1"));
    let task_model = db.model("Task").unwrap();

    for name in ["Mary", "John"] {
        let user = users.create(row([("name", name.into())])).await.unwrap();
        for title in ["a", "b"] {
            user.call("createTask", AccessorArgs::Values(row([("title", title.into())])))
                .await
                .unwrap();
        }
    }

    let found = users
        .find_all(
            FindOptions::new()
                .include(Include::model(&task_model).filter(Criteria::new().limit(1))),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    for user in &found {
        let loaded = user.included_many("Tasks").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].get("userId"), user.id());
    }
}

#[tokio::test]
async fn test_ambiguous_and_unknown_includes() {
    let mut builder = SchemaBuilder::new();
    let user = builder.define("User", no_attributes(), ModelOptions::new()).unwrap();
    let task = builder.define("Task", no_attributes(), ModelOptions::new()).unwrap();
    builder
        .has_many(user, task, AssociationOptions::new().alias("authored").foreign_key("authorId"))
        .unwrap();
    builder
        .has_many(user, task, AssociationOptions::new().alias("reviewed").foreign_key("reviewerId"))
        .unwrap();
    let (db, _) = memory_db(builder.build()).await;
    let users = db.model("User").unwrap().contextify(ctx("ctx1"));

    let err = users
        .find_all(FindOptions::new().include(Include::model(&task)))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::AmbiguousInclude { .. }));

    let err = users
        .find_all(FindOptions::new().include(Include::alias("assigned")))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::UnresolvableInclude { ref alias, .. } if alias == "assigned"));

    let rows = users
        .find_all(FindOptions::new().include(Include::model_as(&task, "reviewed")))
        .await
        .unwrap();
    assert!(rows.is_empty());
}
