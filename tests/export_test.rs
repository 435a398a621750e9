mod helpers;

use helpers::{test_db, tools_with, StubProvider};
use hippocampus::tools::export::ExportParams;
use hippocampus::tools::remember::RememberParams;
use std::collections::BTreeSet;

fn remember_params(content: &str, entity: &str, entity_type: Option<&str>) -> RememberParams {
    RememberParams {
        content: content.to_string(),
        entity: Some(entity.to_string()),
        r#type: entity_type.map(str::to_string),
        source: None,
    }
}

fn export_params(format: &str) -> ExportParams {
    ExportParams {
        format: format.to_string(),
        entity: None,
        r#type: None,
    }
}

async fn seed(tools: &hippocampus::tools::HippocampusTools) {
    tools
        .remember(remember_params("builds memory tools", "karolina", Some("person")))
        .await
        .unwrap();
    tools
        .remember(remember_params("a memory server", "hippocampus", Some("project")))
        .await
        .unwrap();
    tools
        .remember(remember_params(
            "karolina is the creator of hippocampus",
            "notes",
            None,
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn json_export_round_trips_the_graph() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());
    seed(&tools).await;

    let result = tools.export(export_params("json")).await.unwrap();
    assert!(result.success);
    assert_eq!(result.format, "json");
    assert_eq!(result.entity_count, 3);
    assert_eq!(result.observation_count, 3);

    // Reconstruct the entity → observations mapping from the export and
    // compare against the live store.
    let exported: BTreeSet<(String, String)> = result.data["entities"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|entity| {
            let name = entity["name"].as_str().unwrap().to_string();
            entity["observations"]
                .as_array()
                .unwrap()
                .iter()
                .map(move |o| (name.clone(), o["content"].as_str().unwrap().to_string()))
        })
        .collect();

    let live: BTreeSet<(String, String)> = {
        let conn = db.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT e.name, o.content FROM observations o \
                 JOIN entities e ON o.entity_id = e.id",
            )
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        rows.collect::<Result<_, _>>().unwrap()
    };
    assert_eq!(exported, live);

    // Relationship endpoints survive as names, deduplicated by edge.
    let relationships: BTreeSet<(String, String)> = result.data["relationships"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["from"].as_str().unwrap().to_string(),
                r["to"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    let expected: BTreeSet<(String, String)> = [
        ("notes".to_string(), "karolina".to_string()),
        ("notes".to_string(), "hippocampus".to_string()),
    ]
    .into_iter()
    .collect();
    assert_eq!(relationships, expected);
}

#[tokio::test]
async fn claude_md_export_has_the_compact_layout() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());
    seed(&tools).await;

    let result = tools.export(export_params("claude-md")).await.unwrap();
    assert!(result.success);
    let text = result.data.as_str().unwrap();

    assert!(text.starts_with("# Memory Export\n"));
    assert!(text.contains("## Person"));
    assert!(text.contains("## Project"));
    assert!(text.contains("## General")); // untyped entities land here
    assert!(text.contains("### notes"));
    assert!(text.contains("- karolina is the creator of hippocampus"));
}

#[tokio::test]
async fn markdown_export_has_the_verbose_layout() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());
    seed(&tools).await;

    let result = tools.export(export_params("markdown")).await.unwrap();
    assert!(result.success);
    let text = result.data.as_str().unwrap();

    assert!(text.starts_with("# Hippocampus Memory Export\n"));
    assert!(text.contains("Generated: "));
    assert!(text.contains("## karolina (person)"));
    assert!(text.contains("## notes\n")); // untyped: no parenthesized type
    assert!(text.contains("### Relationships"));
}

#[tokio::test]
async fn entity_and_type_filters_scope_the_export() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());
    seed(&tools).await;

    let by_entity = tools
        .export(ExportParams {
            format: "json".to_string(),
            entity: Some("karolina".to_string()),
            r#type: None,
        })
        .await
        .unwrap();
    assert_eq!(by_entity.entity_count, 1);

    let by_type = tools
        .export(ExportParams {
            format: "json".to_string(),
            entity: None,
            r#type: Some("project".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(by_type.entity_count, 1);
    assert_eq!(by_type.data["entities"][0]["name"], "hippocampus");
}

#[tokio::test]
async fn unknown_format_is_rejected() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());

    let result = tools.export(export_params("yaml")).await.unwrap();
    assert!(!result.success);
    assert!(result.message.contains("yaml"));
}

#[tokio::test]
async fn resources_render_the_graph() {
    let db = test_db();
    let tools = tools_with(&db, StubProvider::new());
    seed(&tools).await;

    let full = tools.read_resource("context://").await.unwrap();
    assert!(full.starts_with("# Memory Export"));

    let entity = tools.read_resource("entity://karolina").await.unwrap();
    assert!(entity.starts_with("# karolina (person)"));
    assert!(entity.contains("- builds memory tools"));
    assert!(entity.contains("## Relationships"));

    // Percent-encoded names decode before lookup.
    let encoded = tools.read_resource("entity://hippo%63ampus").await.unwrap();
    assert!(encoded.starts_with("# hippocampus"));

    let missing = tools.read_resource("entity://nobody").await;
    assert!(missing.is_err());
}
