mod helpers;

use helpers::{count_rows, test_db, tools_with, StubProvider};
use hippocampus::tools::context::ContextParams;
use hippocampus::tools::export::ExportParams;
use hippocampus::tools::forget::ForgetParams;
use hippocampus::tools::remember::RememberParams;

fn remember_params(content: &str, entity: &str) -> RememberParams {
    RememberParams {
        content: content.to_string(),
        entity: Some(entity.to_string()),
        r#type: None,
        source: None,
    }
}

#[tokio::test]
async fn forget_entity_removes_everything_it_owns() {
    let db = test_db();
    // Pin vectors so neither the dedup gate nor the semantic fallback can
    // fire by accident.
    let provider = StubProvider::new()
        .with("a project", helpers::test_embedding(10))
        .with("fact one", helpers::test_embedding(60))
        .with("fact two", helpers::test_embedding(110))
        .with("gallant ships hippocampus builds", helpers::test_embedding(160))
        .with("gallant", helpers::test_embedding(210));
    let tools = tools_with(&db, provider);

    tools.remember(remember_params("a project", "hippocampus")).await.unwrap();
    tools.remember(remember_params("fact one", "gallant")).await.unwrap();
    tools.remember(remember_params("fact two", "gallant")).await.unwrap();
    // Creates a gallant — hippocampus relationship via mention detection.
    tools
        .remember(remember_params("gallant ships hippocampus builds", "gallant"))
        .await
        .unwrap();

    let result = tools
        .forget(ForgetParams {
            entity: Some("gallant".to_string()),
            observation_id: None,
        })
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.deleted.observations, 3);
    assert_eq!(result.deleted.embeddings, 3);
    assert_eq!(result.deleted.relationships, 1);
    assert_eq!(result.deleted.entity, 1);

    // A later export must not mention the entity.
    let export = tools
        .export(ExportParams {
            format: "json".to_string(),
            entity: None,
            r#type: None,
        })
        .await
        .unwrap();
    let names: Vec<&str> = export.data["entities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert!(!names.contains(&"gallant"));

    // And context resolution must fail for it.
    let context = tools
        .context(ContextParams {
            topic: "gallant".to_string(),
            depth: None,
        })
        .await
        .unwrap();
    assert!(!context.success);
}

#[tokio::test]
async fn forget_observation_deletes_only_that_pair() {
    let db = test_db();
    let provider = StubProvider::new()
        .with("keep this", helpers::test_embedding(1))
        .with("drop this", helpers::test_embedding(101));
    let tools = tools_with(&db, provider);

    let keep = tools.remember(remember_params("keep this", "k")).await.unwrap();
    let drop = tools.remember(remember_params("drop this", "k")).await.unwrap();

    let result = tools
        .forget(ForgetParams {
            entity: None,
            observation_id: drop.observation_id.clone(),
        })
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.deleted.observations, 1);
    assert_eq!(result.deleted.embeddings, 1);
    assert_eq!(result.deleted.entity, 0);

    assert_eq!(count_rows(&db, "observations"), 1);
    let remaining: String = {
        let conn = db.lock().unwrap();
        conn.query_row("SELECT id FROM observations", [], |row| row.get(0))
            .unwrap()
    };
    assert_eq!(Some(remaining), keep.observation_id);
}

#[tokio::test]
async fn forget_twice_fails_the_second_time_without_changes() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    let stored = tools.remember(remember_params("ephemeral", "k")).await.unwrap();
    let id = stored.observation_id.unwrap();

    let first = tools
        .forget(ForgetParams {
            entity: None,
            observation_id: Some(id.clone()),
        })
        .await
        .unwrap();
    assert!(first.success);

    let second = tools
        .forget(ForgetParams {
            entity: None,
            observation_id: Some(id),
        })
        .await
        .unwrap();
    assert!(!second.success);
    assert_eq!(second.deleted.observations, 0);

    // The entity row is untouched by observation-level forgetting.
    assert_eq!(count_rows(&db, "entities"), 1);
}

#[tokio::test]
async fn forget_requires_exactly_one_selector() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    let neither = tools
        .forget(ForgetParams {
            entity: None,
            observation_id: None,
        })
        .await
        .unwrap();
    assert!(!neither.success);
    assert!(neither.message.contains("exactly one"));

    let both = tools
        .forget(ForgetParams {
            entity: Some("k".to_string()),
            observation_id: Some("some-id".to_string()),
        })
        .await
        .unwrap();
    assert!(!both.success);
}

#[tokio::test]
async fn forget_unknown_entity_reports_failure() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    let result = tools
        .forget(ForgetParams {
            entity: Some("never-existed".to_string()),
            observation_id: None,
        })
        .await
        .unwrap();
    assert!(!result.success);
}
