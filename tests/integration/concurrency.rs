//! Concurrent callers sharing one canonical model

use super::test_utils::*;
use ctxmodel::{
    row, AccessorArgs, AssociationOptions, Attribute, Database, FindOptions, Include,
    ModelOptions, SchemaBuilder,
};
use futures::future::try_join_all;

async fn tenant_db() -> Database {
    let mut builder = SchemaBuilder::new();
    let account = builder
        .define("Account", [("tenant", Attribute::string())], ModelOptions::new())
        .unwrap();
    let note = builder
        .define("Note", [("tenant", Attribute::string())], ModelOptions::new())
        .unwrap();
    builder
        .has_many(account, note, AssociationOptions::new())
        .unwrap();
    memory_db(builder.build()).await.0
}

static TENANTS: [&str; 8] = ["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_creates_keep_their_context() {
    let db = tenant_db().await;
    let account = db.model("Account").unwrap();

    let handles = TENANTS.iter().flat_map(|tenant| {
        let bound = account.contextify(ctx(*tenant));
        (0..10).map(move |_| {
            let bound = bound.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                let created = bound
                    .create(row([("tenant", (*tenant).into())]))
                    .await
                    .unwrap();
                (*tenant, created)
            })
        })
    });

    let results = futures::future::join_all(handles).await;
    assert_eq!(results.len(), TENANTS.len() * 10);
    for result in results {
        let (tenant, created) = result.unwrap();
        assert_eq!(ctx_value(&created), Some(tenant));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accessors_and_includes_stay_isolated() {
    let db = tenant_db().await;
    let account = db.model("Account").unwrap();
    let note = db.model("Note").unwrap();

    let tasks = TENANTS.iter().map(|tenant| {
        let accounts = account.contextify(ctx(*tenant));
        let note = note.clone();
        tokio::spawn(async move {
            let owner = accounts
                .create(row([("tenant", (*tenant).into())]))
                .await
                .unwrap();
            let creates = (0..3).map(|_| {
                owner.call(
                    "createNote",
                    AccessorArgs::Values(row([("tenant", (*tenant).into())])),
                )
            });
            let notes = try_join_all(creates).await.unwrap();
            for created in notes {
                assert_eq!(ctx_value(&created.into_one().unwrap()), Some(*tenant));
            }

            let found = accounts
                .find(
                    FindOptions::new()
                        .where_eq("tenant", *tenant)
                        .include(Include::model(&note)),
                )
                .await
                .unwrap()
                .unwrap();
            assert_eq!(ctx_value(&found), Some(*tenant));
            let loaded = found.included_many("Notes").unwrap();
            assert_eq!(loaded.len(), 3);
            for item in loaded {
                assert_eq!(ctx_value(item), Some(*tenant));
                assert_eq!(item.get("tenant").and_then(|v| v.as_str()), Some(*tenant));
            }
        })
    });

    for joined in futures::future::join_all(tasks).await {
        joined.unwrap();
    }
}
