//! Import/export of the workflow document.
//!
//! Export assembles the three stores into one [`WorkflowDocument`] without
//! icons. Import validates the raw JSON, folds the legacy shapes into the
//! canonical one, and re-resolves icons from the registries.

use crate::graph::GraphState;
use crate::registry::Registries;
use chrono::Utc;
use flowcore::{
    Branch, Config, Connection, EntityKind, ImportError, SubStepContainer, WorkflowDocument, WorkflowNode,
};
use serde_json::{Map, Value};

const WRAPPER_KEY: &str = "workflowData";
const ARRAY_KEYS: [&str; 5] = ["containers", "triggers", "connections", "subSteps", "formFields"];
const LEGACY_BRANCH_SUFFIX: &str = "Nodes";

/// Collect every structural problem of a raw document.
///
/// An empty result means the document can be normalized and deserialized.
pub fn validate_structure(raw: &Value) -> Vec<String> {
    let Some(root) = raw.as_object() else {
        return vec!["document must be a JSON object".to_string()];
    };
    let mut errors = Vec::new();

    let wrapper = root.get(WRAPPER_KEY);
    if let Some(wrapper) = wrapper {
        if !wrapper.is_object() {
            errors.push(format!("'{}' must be an object", WRAPPER_KEY));
        }
    }
    if !root.contains_key("containers") && !root.contains_key("triggers") && wrapper.is_none() {
        errors.push(format!(
            "document must contain 'containers', 'triggers' or '{}'",
            WRAPPER_KEY
        ));
    }

    let scopes = std::iter::once(("", root)).chain(
        wrapper
            .and_then(Value::as_object)
            .map(|inner| ("workflowData.", inner)),
    );
    for (prefix, object) in scopes {
        for key in ARRAY_KEYS {
            if let Some(value) = object.get(key) {
                if !value.is_array() {
                    errors.push(format!("'{}{}' must be an array", prefix, key));
                }
            }
        }
    }
    errors
}

/// Fold the `workflowData` template shape into the flat shape.
///
/// Inner fields win; top-level fields fill in whatever the wrapper lacks,
/// and an empty inner name/description gives way to the top-level one.
pub fn unwrap_template(root: Map<String, Value>) -> Map<String, Value> {
    let mut root = root;
    let Some(Value::Object(inner)) = root.remove(WRAPPER_KEY) else {
        return root;
    };
    let mut merged = inner;
    for (key, value) in root {
        let inner_is_blank = matches!(merged.get(&key), Some(Value::String(s)) if s.is_empty());
        if !merged.contains_key(&key) || inner_is_blank {
            merged.insert(key, value);
        }
    }
    merged
}

/// Parse, validate and normalize a document without touching any store
pub fn parse_document(json: &str) -> Result<WorkflowDocument, ImportError> {
    let raw: Value = serde_json::from_str(json).map_err(ImportError::Parse)?;
    document_from_value(raw)
}

pub fn document_from_value(raw: Value) -> Result<WorkflowDocument, ImportError> {
    let errors = validate_structure(&raw);
    if !errors.is_empty() {
        return Err(ImportError::Structure(errors));
    }
    let Value::Object(root) = raw else {
        return Err(ImportError::Shape("document must be a JSON object".to_string()));
    };
    let flat = unwrap_template(root);
    let mut document: WorkflowDocument = serde_json::from_value(Value::Object(flat))
        .map_err(|e| ImportError::Shape(e.to_string()))?;
    normalize_document(&mut document).map_err(|e| ImportError::Shape(e.to_string()))?;
    Ok(document)
}

/// Move legacy `config["<branch>Nodes"]` lists into branches and make sure
/// every conditional node carries its mandatory branches.
pub fn normalize_document(document: &mut WorkflowDocument) -> Result<(), serde_json::Error> {
    for trigger in &mut document.triggers {
        for node in trigger.nodes.iter_mut().flatten() {
            normalize_node(node)?;
        }
    }
    for container in &mut document.containers {
        for node in &mut container.nodes {
            normalize_node(node)?;
        }
    }
    for sub_step in &mut document.sub_steps {
        for node in &mut sub_step.nodes {
            normalize_node(node)?;
        }
    }
    Ok(())
}

fn normalize_node(node: &mut WorkflowNode) -> Result<(), serde_json::Error> {
    if node.conditional_kind().is_some() {
        let legacy_keys: Vec<String> = node
            .config
            .iter()
            .filter(|(key, value)| {
                key.len() > LEGACY_BRANCH_SUFFIX.len()
                    && key.ends_with(LEGACY_BRANCH_SUFFIX)
                    && value.is_array()
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in legacy_keys {
            let Some(value) = node.config.remove(&key) else {
                continue;
            };
            let nodes: Vec<WorkflowNode> = serde_json::from_value(value)?;
            let branch_id = &key[..key.len() - LEGACY_BRANCH_SUFFIX.len()];
            let branches = node.branches.get_or_insert_with(Vec::new);
            match branches.iter_mut().find(|b| b.id == branch_id) {
                Some(branch) => branch.nodes.extend(nodes),
                None => branches.push(Branch {
                    nodes,
                    ..Branch::new(branch_id)
                }),
            }
        }
        node.normalize_branches();
    }
    for branch in node.branches.iter_mut().flatten() {
        for child in &mut branch.nodes {
            normalize_node(child)?;
        }
    }
    Ok(())
}

/// Resolve icons from the registries. Unknown types load without an icon;
/// their type ids are returned (deduplicated) so the caller can report them.
pub fn resolve_icons(document: &mut WorkflowDocument, registries: &Registries) -> Vec<String> {
    let mut unknown: Vec<String> = Vec::new();
    let mut resolve = |kind: EntityKind, type_id: &str| -> Option<String> {
        if !registries.knows(kind, type_id) && !unknown.iter().any(|t| t == type_id) {
            tracing::warn!(%kind, type_id, "unknown type in document; loading without icon");
            unknown.push(type_id.to_string());
        }
        registries.icon_for(kind, type_id)
    };

    for trigger in &mut document.triggers {
        trigger.icon = resolve(EntityKind::Trigger, &trigger.trigger_type);
    }
    for_each_node_mut(document, &mut |node: &mut WorkflowNode| {
        node.icon = resolve(EntityKind::Node, &node.node_type);
        for tool in node.tools.iter_mut().flatten() {
            tool.icon = resolve(EntityKind::Tool, &tool.tool_type);
        }
    });
    unknown
}

/// Visit every node of a document: trigger chains, containers, sub-steps,
/// and all nested branch nodes
pub fn for_each_node_mut(document: &mut WorkflowDocument, f: &mut dyn FnMut(&mut WorkflowNode)) {
    for trigger in &mut document.triggers {
        for node in trigger.nodes.iter_mut().flatten() {
            node.visit_mut(f);
        }
    }
    for container in &mut document.containers {
        for node in &mut container.nodes {
            node.visit_mut(f);
        }
    }
    for sub_step in &mut document.sub_steps {
        for node in &mut sub_step.nodes {
            node.visit_mut(f);
        }
    }
}

/// Drop registry-derived fields so the document holds only persisted data
pub fn strip_icons(document: &mut WorkflowDocument) {
    for trigger in &mut document.triggers {
        trigger.icon = None;
    }
    for_each_node_mut(document, &mut |node: &mut WorkflowNode| {
        node.icon = None;
        for tool in node.tools.iter_mut().flatten() {
            tool.icon = None;
        }
    });
}

/// Header fields of a document that live outside the three stores
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub version: String,
    pub description: String,
    pub metadata: Config,
}

/// Assemble the export document from the three stores
pub fn assemble(
    info: &DocumentInfo,
    graph: &GraphState,
    sub_steps: &[SubStepContainer],
    connections: &[Connection],
) -> WorkflowDocument {
    let mut document = WorkflowDocument {
        version: info.version.clone(),
        name: graph.workflow_name.clone(),
        description: info.description.clone(),
        metadata: info.metadata.clone(),
        triggers: graph.owned_triggers(),
        trigger_logic: graph.trigger_logic.as_ref().clone(),
        containers: graph.owned_containers(),
        form_fields: graph.form_fields.as_ref().clone(),
        sub_steps: sub_steps.to_vec(),
        connections: connections.to_vec(),
        exported_at: Some(Utc::now()),
    };
    strip_icons(&mut document);
    document
}
