mod helpers;

use helpers::{test_db, test_embedding, tools_with, StubProvider};
use hippocampus::tools::context::ContextParams;
use hippocampus::tools::remember::RememberParams;

fn remember_params(content: &str, entity: &str) -> RememberParams {
    RememberParams {
        content: content.to_string(),
        entity: Some(entity.to_string()),
        r#type: None,
        source: None,
    }
}

fn context_params(topic: &str, depth: Option<u32>) -> ContextParams {
    ContextParams {
        topic: topic.to_string(),
        depth,
    }
}

#[tokio::test]
async fn exact_name_resolves_with_observations() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    tools.remember(remember_params("first fact", "karolina")).await.unwrap();
    tools.remember(remember_params("second fact", "karolina")).await.unwrap();

    let result = tools.context(context_params("karolina", None)).await.unwrap();
    assert!(result.success);
    let entity = result.entity.unwrap();
    assert_eq!(entity.name, "karolina");
    assert_eq!(entity.observations.len(), 2);
    // Newest first.
    assert_eq!(entity.observations[0].content, "second fact");
}

#[tokio::test]
async fn substring_resolves_when_exact_fails() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    tools.remember(remember_params("a project", "Hippocampus")).await.unwrap();

    let result = tools.context(context_params("hippo", None)).await.unwrap();
    assert!(result.success);
    assert_eq!(result.entity.unwrap().name, "Hippocampus");
}

#[tokio::test]
async fn semantic_fallback_resolves_owning_entity() {
    let db = test_db();
    let provider = StubProvider::new()
        .with("works on atmospheric models", test_embedding(0))
        .with("weather simulation", test_embedding(0));
    let tools = tools_with(&db, provider);

    tools
        .remember(remember_params("works on atmospheric models", "climate"))
        .await
        .unwrap();

    let result = tools
        .context(context_params("weather simulation", None))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.entity.unwrap().name, "climate");
}

#[tokio::test]
async fn unresolvable_topic_returns_not_found() {
    let db = test_db();
    // Pin both vectors so the fallback similarity is exactly 0.0, below 0.2.
    let provider = StubProvider::new()
        .with("some fact", test_embedding(5))
        .with("zzqxjwvfk_9847362", test_embedding(300));
    let tools = tools_with(&db, provider);

    tools.remember(remember_params("some fact", "k")).await.unwrap();

    let result = tools
        .context(context_params("zzqxjwvfk_9847362", None))
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(
        result.message,
        "No entity found for topic \"zzqxjwvfk_9847362\"."
    );
    assert!(result.entity.is_none());
}

#[tokio::test]
async fn related_entities_expand_to_requested_depth() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    // karolina's own observation mentions hippocampus, so she gets a direct
    // edge to it; the notes observation then links notes to both.
    tools.remember(remember_params("a project", "hippocampus")).await.unwrap();
    tools
        .remember(remember_params("created hippocampus", "karolina"))
        .await
        .unwrap();
    let noted = tools
        .remember(remember_params("karolina is the creator of hippocampus", "notes"))
        .await
        .unwrap();
    let mut linked = noted.relationships_created.clone();
    linked.sort();
    assert_eq!(linked, vec!["hippocampus", "karolina"]);

    let result = tools.context(context_params("karolina", Some(1))).await.unwrap();
    assert!(result.success);

    let names: Vec<&str> = result
        .related_entities
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert!(names.contains(&"hippocampus"));
    assert!(names.contains(&"notes"));
    assert!(result.related_entities.iter().all(|r| r.depth == 1));

    // Neighbors carry their own observations.
    let hippo = result
        .related_entities
        .iter()
        .find(|r| r.name == "hippocampus")
        .unwrap();
    assert_eq!(hippo.observations.len(), 1);
    assert_eq!(hippo.observations[0].content, "a project");
}

#[tokio::test]
async fn depth_zero_returns_no_neighbors() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    tools.remember(remember_params("a project", "hippocampus")).await.unwrap();
    tools
        .remember(remember_params("shipping hippocampus", "notes"))
        .await
        .unwrap();

    let result = tools.context(context_params("notes", Some(0))).await.unwrap();
    assert!(result.success);
    assert!(result.related_entities.is_empty());
    // Direct relationships are still listed.
    assert_eq!(result.relationships.len(), 1);
    assert_eq!(result.relationships[0].relation_type, "relates_to");
}

#[tokio::test]
async fn neighbor_set_grows_with_depth() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    // chain: a — b — c via mention links.
    tools.remember(remember_params("entity b exists", "bbb")).await.unwrap();
    tools.remember(remember_params("knows bbb well", "aaa")).await.unwrap();
    tools.remember(remember_params("paired with bbb", "ccc")).await.unwrap();

    let one = tools.context(context_params("aaa", Some(1))).await.unwrap();
    let two = tools.context(context_params("aaa", Some(2))).await.unwrap();
    assert!(one.related_entities.len() <= two.related_entities.len());
    assert!(two.related_entities.iter().any(|r| r.name == "ccc" && r.depth == 2));
}

#[tokio::test]
async fn overlong_topic_is_rejected() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    let result = tools
        .context(context_params(&"t".repeat(201), None))
        .await
        .unwrap();
    assert!(!result.success);
}
