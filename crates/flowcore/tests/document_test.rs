// crates/flowcore/tests/document_test.rs

use flowcore::{
    Connection, ConnectionType, Container, EditError, EndpointType, ImportError, Notifier,
    NotificationLevel, Side, SubStepContainer, Trigger, WorkflowDocument, WorkflowNode,
    DOCUMENT_VERSION,
};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_minimal_document_fills_defaults() {
    let doc: WorkflowDocument = serde_json::from_value(json!({
        "triggers": [{ "id": "t1", "type": "webhook" }],
        "containers": [{ "id": "c1", "nodes": [{ "id": "n1", "type": "http" }] }]
    }))
    .unwrap();

    assert_eq!(doc.version, DOCUMENT_VERSION);
    assert!(doc.triggers[0].enabled);
    assert!(doc.containers[0].title.is_empty());
    assert!(doc.containers[0].nodes[0].enabled);
    assert!(doc.sub_steps.is_empty());
    assert!(doc.exported_at.is_none());
}

#[test]
fn test_document_serializes_camel_case() {
    let mut doc = WorkflowDocument::new("Orders");
    doc.triggers.push(Trigger::new("t1", "webhook"));
    doc.containers
        .push(Container::new("c1", "Step 1").with_node(WorkflowNode::new("n1", "http")));
    doc.sub_steps
        .push(SubStepContainer::new("c1", "n1", "Follow up").with_node(WorkflowNode::new("s1", "email")));
    doc.connections.push(Connection::new(
        "t1",
        EndpointType::Trigger,
        "n1",
        EndpointType::Node,
    ));

    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["triggers"][0]["type"], json!("webhook"));
    assert_eq!(value["subSteps"][0]["parentNodeId"], json!("n1"));
    assert_eq!(value["subSteps"][0]["parentContainerId"], json!("c1"));
    assert_eq!(value["connections"][0]["sourceType"], json!("trigger"));
    assert_eq!(value["connections"][0]["connectionType"], json!("manual"));
    assert!(value.get("exportedAt").is_none());

    let back: WorkflowDocument = serde_json::from_value(value).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn test_node_count_includes_branches_and_sub_steps() {
    let mut switch = WorkflowNode::new("sw", "switch");
    switch
        .branch_mut("default")
        .unwrap()
        .nodes
        .push(WorkflowNode::new("b1", "http"));

    let mut doc = WorkflowDocument::new("Counting");
    doc.containers.push(Container::new("c1", "Step").with_node(switch));
    doc.sub_steps
        .push(SubStepContainer::new("c1", "sw", "Extra").with_node(WorkflowNode::new("s1", "delay")));

    assert_eq!(doc.node_count(), 3);
}

#[test]
fn test_connection_builders() {
    let conn = Connection::new("sw", EndpointType::Node, "n2", EndpointType::Node)
        .automatic()
        .with_branch_output("case1");

    assert!(conn.id.starts_with("conn_"));
    assert_eq!(conn.connection_type, ConnectionType::Automatic);
    assert_eq!(conn.side, Side::Right);
    assert_eq!(conn.branch_output.as_deref(), Some("case1"));
    assert!(conn.touches("sw"));
    assert!(conn.touches("n2"));
    assert!(!conn.touches("n3"));
}

#[test]
fn test_error_messages_name_the_entity() {
    let err = EditError::DuplicateFormNode {
        container_id: "c1".to_string(),
    };
    assert_eq!(err.to_string(), "Step 'c1' already contains a form node");

    let err = ImportError::Structure(vec!["missing containers".to_string(), "bad id".to_string()]);
    assert_eq!(err.errors().len(), 2);
    assert!(err.to_string().contains("missing containers; bad id"));
}

#[tokio::test]
async fn test_notifier_fans_out_to_every_subscriber() {
    init_tracing();
    let notifier = Notifier::new(16);
    let mut first = notifier.subscribe();
    let mut second = notifier.subscribe();

    notifier.success("Workflow imported");
    notifier.warn("Unknown node type: teleport");

    for rx in [&mut first, &mut second] {
        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();
        assert_eq!(a.level, NotificationLevel::Success);
        assert_eq!(b.level, NotificationLevel::Warning);
        assert!(b.message.contains("teleport"));
    }
}
