// crates/flownodes/tests/catalog_test.rs

use flowcore::{Config, EditError, EntityKind};
use floweditor::{Editor, NodeScope, Registries};
use flownodes::{register_all, standard_registries};
use serde_json::json;

fn config(value: serde_json::Value) -> Config {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn test_register_all_fills_every_registry() {
    let mut registries = Registries::new();
    register_all(&mut registries);

    assert!(registries.triggers.contains("webhook"));
    assert!(registries.nodes.contains("http"));
    assert!(registries.nodes.contains("switch"));
    assert!(registries.tools.contains("web_search"));
    assert_eq!(registries.triggers.get_all()[0].type_id, "webhook");
}

#[test]
fn test_search_matches_tags_case_insensitively() {
    let registries = standard_registries();
    let hits: Vec<&str> = registries
        .nodes
        .search("SMTP")
        .into_iter()
        .map(|d| d.type_id.as_str())
        .collect();
    assert_eq!(hits, vec!["email"]);
    assert_eq!(
        registries.nodes.search("").len(),
        registries.nodes.len(),
        "empty query returns everything"
    );
}

#[test]
fn test_categories_group_definitions() {
    let registries = standard_registries();
    let logic: Vec<&str> = registries
        .nodes
        .get_by_category("logic")
        .into_iter()
        .map(|d| d.type_id.as_str())
        .collect();
    assert_eq!(logic, vec!["if", "switch", "merge"]);
    assert!(registries.nodes.categories().contains(&"ai"));
}

#[test]
fn test_conditional_instances_get_their_branches() {
    let registries = standard_registries();

    let if_node = registries.nodes.create_instance("if", None).unwrap();
    assert_eq!(if_node.branch_ids(), vec!["true", "false"]);

    let switch = registries
        .nodes
        .create_instance("switch", Some(config(json!({ "cases": ["a", "b"] }))))
        .unwrap();
    assert_eq!(switch.branch_ids(), vec!["default", "case1", "case2"]);
}

#[test]
fn test_instances_merge_overrides_and_get_fresh_ids() {
    let registries = standard_registries();
    let a = registries
        .nodes
        .create_instance("http", Some(config(json!({ "method": "POST" }))))
        .unwrap();
    let b = registries.nodes.create_instance("http", None).unwrap();

    assert_ne!(a.id, b.id);
    assert!(a.enabled);
    assert_eq!(a.config["method"], json!("POST"));
    assert_eq!(a.config["timeout"], json!(30));
    assert_eq!(b.config["method"], json!("GET"));
    assert!(registries.nodes.create_instance("teleport", None).is_none());
}

#[test]
fn test_validators_report_messages() {
    let registries = standard_registries();

    let err = registries
        .nodes
        .validate("http", &config(json!({ "url": "" })))
        .unwrap_err();
    assert_eq!(
        err,
        EditError::Validation {
            type_id: "http".to_string(),
            message: "URL is required".to_string()
        }
    );
    assert!(registries
        .nodes
        .validate("http", &config(json!({ "url": "https://example.com", "method": "PATCH" })))
        .is_ok());
    assert!(registries
        .nodes
        .validate("email", &config(json!({ "to": "ops@example.com, nope" })))
        .is_err());
    assert!(registries
        .triggers
        .validate("schedule", &config(json!({ "cron": "every day" })))
        .is_err());
    assert!(matches!(
        registries.tools.validate("teleport", &Config::new()),
        Err(EditError::UnknownType {
            kind: EntityKind::Tool,
            ..
        })
    ));
}

#[test]
fn test_agent_accepts_tools_from_catalog() {
    let mut editor = Editor::new(standard_registries());
    editor
        .graph_mut()
        .add_container(flowcore::Container::new("c1", "Agent step"))
        .unwrap();
    let scope = NodeScope::container("c1");
    let agent = editor
        .add_node_from_registry(&scope, "ai_agent", None, None)
        .unwrap()
        .unwrap();
    let http = editor
        .add_node_from_registry(&scope, "http", None, None)
        .unwrap()
        .unwrap();

    let tool = editor
        .add_tool_from_registry("c1", &agent, "web_search")
        .unwrap();
    assert!(tool.is_some());
    assert!(editor
        .add_tool_from_registry("c1", &http, "web_search")
        .is_err());

    let node = editor.graph().find_node("c1", &agent).unwrap();
    assert_eq!(node.tools.as_ref().unwrap().len(), 1);
    assert_eq!(node.icon.as_deref(), Some("bot"));
}
