// crates/floweditor/tests/graph_store_test.rs

use flowcore::{Container, EditError, Notifier, Trigger, WorkflowNode};
use floweditor::{Definition, GraphStore, Registries};
use std::sync::Arc;

fn registries() -> Arc<Registries> {
    let mut registries = Registries::new();
    registries.nodes.register(Definition::new("http").with_label("HTTP Request"));
    registries
        .nodes
        .register(Definition::new("ai_agent").supports_tools());
    registries.nodes.register(Definition::new("switch").supports_branches());
    Arc::new(registries)
}

fn store() -> GraphStore {
    GraphStore::new(registries(), Notifier::default(), 50)
}

fn store_with_container() -> GraphStore {
    let mut graph = store();
    graph.add_container(Container::new("c1", "Step 1")).unwrap();
    graph
}

fn switch_node() -> WorkflowNode {
    let mut node = WorkflowNode::new("sw", "switch");
    node.branches
        .as_mut()
        .unwrap()
        .push(flowcore::Branch::new("case1"));
    node.branches
        .as_mut()
        .unwrap()
        .push(flowcore::Branch::new("case2"));
    node.normalize_branches();
    node
}

#[test]
fn test_undo_redo_inverse_law() {
    let mut graph = store_with_container();
    let before = graph.state().clone();

    graph
        .add_node("c1", WorkflowNode::new("n1", "http"), None)
        .unwrap();
    let after = graph.state().clone();

    assert!(graph.undo());
    assert_eq!(graph.state(), &before, "undo must restore the previous state");
    assert!(graph.redo());
    assert_eq!(graph.state(), &after, "redo must restore the mutated state");
}

#[test]
fn test_every_mutation_kind_is_undoable() {
    let mut graph = store_with_container();
    graph
        .add_node("c1", WorkflowNode::new("n1", "http"), None)
        .unwrap();
    graph
        .add_node("c1", WorkflowNode::new("n2", "http"), None)
        .unwrap();
    graph.add_trigger(Trigger::new("t1", "webhook"));
    let baseline = graph.state().clone();

    assert!(graph.toggle_node("c1", "n1"));
    assert!(graph.move_node("c1", 0, 1));
    assert!(graph
        .update_container("c1", |c| c.title = "Renamed".to_string())
        .unwrap());
    assert!(graph.toggle_trigger("t1"));
    assert!(graph.set_workflow_name("Renamed workflow"));
    assert!(graph.delete_node("c1", "n2").is_some());

    for _ in 0..6 {
        assert!(graph.undo());
    }
    assert_eq!(graph.state(), &baseline);
}

#[test]
fn test_new_edit_discards_redo_branch() {
    let mut graph = store_with_container();
    graph.add_container(Container::new("c2", "Step 2")).unwrap();
    graph.add_container(Container::new("c3", "Step 3")).unwrap();

    assert!(graph.undo());
    assert!(graph.undo());
    graph.add_container(Container::new("c4", "Step 4")).unwrap();

    assert!(!graph.can_redo());
    assert!(!graph.redo(), "redo after a new edit must be a no-op");
    assert!(graph.container("c2").is_none());
    assert!(graph.container("c4").is_some());
}

#[test]
fn test_history_is_bounded() {
    let mut graph = GraphStore::new(registries(), Notifier::default(), 5);
    for i in 0..10 {
        graph.add_container(Container::new(format!("c{}", i), "Step")).unwrap();
    }
    assert_eq!(graph.history_len(), 5);

    let mut undos = 0;
    while graph.undo() {
        undos += 1;
    }
    assert_eq!(undos, 4);
    assert_eq!(graph.state().containers.len(), 6);
}

#[test]
fn test_undo_at_boundary_is_noop() {
    let mut graph = store();
    assert!(!graph.can_undo());
    assert!(!graph.undo());
    assert!(!graph.redo());
}

#[test]
fn test_second_form_node_is_rejected() {
    let mut graph = store_with_container();
    assert!(graph
        .add_node("c1", WorkflowNode::new("form_a", "form"), None)
        .unwrap());

    let result = graph.add_node("c1", WorkflowNode::new("form_b", "form"), None);
    assert_eq!(
        result,
        Err(EditError::DuplicateFormNode {
            container_id: "c1".to_string()
        })
    );

    let forms = graph
        .container("c1")
        .unwrap()
        .nodes
        .iter()
        .filter(|n| n.is_form())
        .count();
    assert_eq!(forms, 1, "container must keep exactly one form node");
}

#[test]
fn test_form_guard_covers_branch_nodes() {
    let mut graph = store_with_container();
    graph
        .add_node("c1", WorkflowNode::new("if1", "if"), None)
        .unwrap();
    graph
        .add_node_to_branch("c1", "if1", "true", WorkflowNode::new("form_a", "form"))
        .unwrap();

    assert!(graph
        .add_node("c1", WorkflowNode::new("form_b", "form"), None)
        .is_err());
    assert!(graph
        .add_node_to_branch("c1", "if1", "false", WorkflowNode::new("form_c", "form"))
        .is_err());
}

#[test]
fn test_form_nodes_in_different_containers_are_fine() {
    let mut graph = store_with_container();
    graph.add_container(Container::new("c2", "Step 2")).unwrap();
    assert!(graph
        .add_node("c1", WorkflowNode::new("f1", "form"), None)
        .is_ok());
    assert!(graph
        .add_node("c2", WorkflowNode::new("f2", "form"), None)
        .is_ok());
}

#[test]
fn test_delete_from_branch_never_crosses_branches() {
    let mut graph = store_with_container();
    graph
        .add_node("c1", WorkflowNode::new("if1", "if"), None)
        .unwrap();
    graph
        .add_node_to_branch("c1", "if1", "false", WorkflowNode::new("x", "http"))
        .unwrap();

    assert!(graph
        .delete_node_from_branch("c1", "if1", "true", "x")
        .is_none());
    let node = graph.find_node("c1", "if1").unwrap();
    assert_eq!(node.branch("false").unwrap().nodes.len(), 1);
}

#[test]
fn test_delete_conditional_node_finds_its_branch() {
    let mut graph = store_with_container();
    graph
        .add_node("c1", WorkflowNode::new("if1", "if"), None)
        .unwrap();
    graph
        .add_node_to_branch("c1", "if1", "false", WorkflowNode::new("x", "http"))
        .unwrap();

    let (branch, node) = graph.delete_conditional_node("c1", "if1", "x").unwrap();
    assert_eq!(branch, "false");
    assert_eq!(node.id, "x");
}

#[test]
fn test_default_branch_is_protected() {
    let mut graph = store_with_container();
    let mut node = switch_node();
    node.branch_mut("case1")
        .unwrap()
        .nodes
        .push(WorkflowNode::new("in_case1", "http"));
    node.branch_mut("case2")
        .unwrap()
        .nodes
        .push(WorkflowNode::new("in_case2", "http"));
    graph.add_node("c1", node, None).unwrap();

    let result = graph.delete_branch("c1", "sw", "default");
    assert!(matches!(result, Err(EditError::ProtectedBranch { .. })));

    let removed = graph.delete_branch("c1", "sw", "case1").unwrap().unwrap();
    assert_eq!(removed.nodes[0].id, "in_case1");

    let node = graph.find_node("c1", "sw").unwrap();
    assert_eq!(node.branch_ids(), vec!["default", "case2"]);
    assert_eq!(node.branch("case2").unwrap().nodes[0].id, "in_case2");
    let routes: Vec<&str> = node
        .routes
        .as_ref()
        .unwrap()
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(routes, vec!["default", "case2"]);
}

#[test]
fn test_if_branches_are_fixed() {
    let mut graph = store_with_container();
    graph
        .add_node("c1", WorkflowNode::new("if1", "if"), None)
        .unwrap();

    assert!(matches!(
        graph.delete_branch("c1", "if1", "true"),
        Err(EditError::FixedBranches { .. })
    ));
    assert!(matches!(
        graph.add_switch_case("c1", "if1"),
        Err(EditError::FixedBranches { .. })
    ));
    assert_eq!(
        graph.find_node("c1", "if1").unwrap().branch_ids(),
        vec!["true", "false"]
    );
}

#[test]
fn test_switch_cases_are_numbered() {
    let mut graph = store_with_container();
    graph.add_node("c1", switch_node(), None).unwrap();

    let case = graph.add_switch_case("c1", "sw").unwrap();
    assert_eq!(case.as_deref(), Some("case3"));
    assert!(graph.add_switch_case("c1", "missing").unwrap().is_none());
}

#[test]
fn test_branch_ops_on_plain_node_are_rejected() {
    let mut graph = store_with_container();
    graph
        .add_node("c1", WorkflowNode::new("n1", "http"), None)
        .unwrap();
    assert!(matches!(
        graph.add_node_to_branch("c1", "n1", "true", WorkflowNode::new("x", "http")),
        Err(EditError::NotConditional { .. })
    ));
}

#[test]
fn test_stale_references_are_silent_noops() {
    let mut graph = store_with_container();
    let len = graph.history_len();

    assert!(!graph.add_node("missing", WorkflowNode::new("n1", "http"), None).unwrap());
    assert!(!graph.toggle_trigger("missing"));
    assert!(!graph.move_node("c1", 3, 0));
    assert!(graph.delete_container("missing").is_none());
    assert!(!graph
        .add_node_to_branch("c1", "missing", "true", WorkflowNode::new("x", "http"))
        .unwrap());
    assert_eq!(graph.history_len(), len);
}

#[test]
fn test_tools_require_capability() {
    let mut graph = store_with_container();
    graph
        .add_node("c1", WorkflowNode::new("agent", "ai_agent"), None)
        .unwrap();
    graph
        .add_node("c1", WorkflowNode::new("n1", "http"), None)
        .unwrap();
    let tool = flowcore::Tool {
        id: "tool1".to_string(),
        tool_type: "web_search".to_string(),
        label: "Search".to_string(),
        enabled: true,
        config: Default::default(),
        icon: None,
    };

    assert!(graph.add_tool_to_node("c1", "agent", tool.clone()).unwrap());
    assert!(matches!(
        graph.add_tool_to_node("c1", "n1", tool),
        Err(EditError::ToolsUnsupported { .. })
    ));
    assert!(graph.remove_tool_from_node("c1", "agent", "tool1").is_some());
}

#[test]
fn test_duplicate_node_gets_fresh_ids() {
    let mut graph = store_with_container();
    graph
        .add_node("c1", WorkflowNode::new("if1", "if"), None)
        .unwrap();
    graph
        .add_node_to_branch("c1", "if1", "true", WorkflowNode::new("x", "http"))
        .unwrap();

    let copy_id = graph.duplicate_node("c1", "if1").unwrap().unwrap();
    let container = graph.container("c1").unwrap();
    assert_eq!(container.nodes[1].id, copy_id);
    assert_ne!(container.nodes[1].branch("true").unwrap().nodes[0].id, "x");
}

#[test]
fn test_form_fields_crud() {
    let mut graph = store();
    assert!(graph.add_form_field(flowcore::FormField::new("email", "Email")));
    assert!(graph.add_form_field(flowcore::FormField::new("name", "Name")));
    assert!(graph.update_form_field("email", |f| f.required = true));
    assert!(graph.move_form_field(1, 0));
    assert_eq!(graph.state().form_fields[0].id, "name");
    assert!(graph.remove_form_field("email").is_some());
    assert_eq!(graph.state().form_fields.len(), 1);
}
