use crate::ids::generate_id;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Free-form configuration attached to triggers, nodes and tools
pub type Config = Map<String, Value>;

pub const FORM_NODE_TYPE: &str = "form";
pub const TRUE_BRANCH: &str = "true";
pub const FALSE_BRANCH: &str = "false";
pub const DEFAULT_BRANCH: &str = "default";

fn enabled_by_default() -> bool {
    true
}

/// Canvas position in the visual editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Entry point that starts a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    #[serde(rename = "type")]
    pub trigger_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub config: Config,
    /// Post-trigger processing chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<WorkflowNode>>,
    /// Resolved from the registry on load, never serialized
    #[serde(skip)]
    pub icon: Option<String>,
}

impl Trigger {
    pub fn new(id: impl Into<String>, trigger_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            trigger_type: trigger_type.into(),
            label: String::new(),
            enabled: true,
            config: Config::new(),
            nodes: None,
            icon: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Ids of the trigger itself and every node in its chain
    pub fn entity_ids(&self) -> Vec<String> {
        let mut ids = vec![self.id.clone()];
        for node in self.nodes.iter().flatten() {
            node.collect_ids(&mut ids);
        }
        ids
    }
}

/// Conditional node flavours that own branches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalKind {
    If,
    Switch,
}

impl ConditionalKind {
    pub fn of(node_type: &str) -> Option<Self> {
        match node_type {
            "if" => Some(ConditionalKind::If),
            "switch" => Some(ConditionalKind::Switch),
            _ => None,
        }
    }
}

/// Named outcome of a conditional node and what happens on exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Ordered node list owned by one outcome of a conditional node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub position: Position,
}

impl Branch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: Vec::new(),
            position: Position::default(),
        }
    }
}

#[derive(Deserialize)]
struct KeyedBranch {
    #[serde(default)]
    nodes: Vec<WorkflowNode>,
    #[serde(default)]
    position: Position,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BranchesRepr {
    List(Vec<Branch>),
    Keyed(BTreeMap<String, KeyedBranch>),
}

// Older documents key branches by id instead of listing them.
fn deserialize_branches<'de, D>(deserializer: D) -> Result<Option<Vec<Branch>>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<BranchesRepr>::deserialize(deserializer)?;
    Ok(repr.map(|repr| match repr {
        BranchesRepr::List(branches) => branches,
        BranchesRepr::Keyed(keyed) => keyed
            .into_iter()
            .map(|(id, branch)| Branch {
                id,
                nodes: branch.nodes,
                position: branch.position,
            })
            .collect(),
    }))
}

/// Capability attached to a node whose definition supports tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub config: Config,
    #[serde(skip)]
    pub icon: Option<String>,
}

/// A single workflow action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub config: Config,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
    #[serde(
        default,
        deserialize_with = "deserialize_branches",
        skip_serializing_if = "Option::is_none"
    )]
    pub branches: Option<Vec<Branch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip)]
    pub icon: Option<String>,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        let mut node = Self {
            id: id.into(),
            node_type: node_type.into(),
            label: String::new(),
            category: String::new(),
            enabled: true,
            config: Config::new(),
            routes: None,
            branches: None,
            tools: None,
            icon: None,
        };
        node.normalize_branches();
        node
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn is_form(&self) -> bool {
        self.node_type == FORM_NODE_TYPE
    }

    pub fn conditional_kind(&self) -> Option<ConditionalKind> {
        ConditionalKind::of(&self.node_type)
    }

    pub fn branch(&self, branch_id: &str) -> Option<&Branch> {
        self.branches.as_ref()?.iter().find(|b| b.id == branch_id)
    }

    pub fn branch_mut(&mut self, branch_id: &str) -> Option<&mut Branch> {
        self.branches.as_mut()?.iter_mut().find(|b| b.id == branch_id)
    }

    pub fn branch_ids(&self) -> Vec<&str> {
        self.branches
            .iter()
            .flatten()
            .map(|b| b.id.as_str())
            .collect()
    }

    /// Bring branches and routes in line with the node type.
    ///
    /// `if` nodes end up with exactly `true` and `false`; `switch` nodes keep
    /// their cases and always carry `default` first. Routes mirror branches.
    /// Non-conditional nodes are left untouched.
    pub fn normalize_branches(&mut self) {
        let Some(kind) = self.conditional_kind() else {
            return;
        };
        let mut existing = self.branches.take().unwrap_or_default();
        let mut take = |id: &str| -> Branch {
            match existing.iter().position(|b| b.id == id) {
                Some(index) => existing.remove(index),
                None => Branch::new(id),
            }
        };

        let branches = match kind {
            ConditionalKind::If => vec![take(TRUE_BRANCH), take(FALSE_BRANCH)],
            ConditionalKind::Switch => {
                let default = take(DEFAULT_BRANCH);
                let mut branches = vec![default];
                let mut seen = Vec::new();
                for branch in existing {
                    if !seen.contains(&branch.id) {
                        seen.push(branch.id.clone());
                        branches.push(branch);
                    }
                }
                branches
            }
        };
        self.branches = Some(branches);
        self.sync_routes();
    }

    /// Keep exactly one route per branch, in branch order
    pub fn sync_routes(&mut self) {
        let Some(branches) = &self.branches else {
            return;
        };
        let mut previous = self.routes.take().unwrap_or_default();
        let routes = branches
            .iter()
            .map(|branch| match previous.iter().position(|r| r.id == branch.id) {
                Some(index) => previous.remove(index),
                None => Route {
                    id: branch.id.clone(),
                    label: default_route_label(&branch.id),
                    action: None,
                },
            })
            .collect();
        self.routes = Some(routes);
    }

    /// Next free `caseN` identifier for a switch node
    pub fn next_case_id(&self) -> String {
        let highest = self
            .branches
            .iter()
            .flatten()
            .filter_map(|b| b.id.strip_prefix("case"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("case{}", highest + 1)
    }

    /// Push this node's id and every nested branch node id
    pub fn collect_ids(&self, out: &mut Vec<String>) {
        out.push(self.id.clone());
        for branch in self.branches.iter().flatten() {
            for node in &branch.nodes {
                node.collect_ids(out);
            }
        }
    }

    /// True when this node or any nested branch node is a form
    pub fn contains_form(&self) -> bool {
        self.is_form()
            || self
                .branches
                .iter()
                .flatten()
                .any(|b| b.nodes.iter().any(WorkflowNode::contains_form))
    }

    /// Find a node by id in this subtree
    pub fn find(&self, node_id: &str) -> Option<&WorkflowNode> {
        if self.id == node_id {
            return Some(self);
        }
        self.branches
            .iter()
            .flatten()
            .flat_map(|b| b.nodes.iter())
            .find_map(|n| n.find(node_id))
    }

    /// Mutable variant of [`WorkflowNode::find`]
    pub fn find_mut(&mut self, node_id: &str) -> Option<&mut WorkflowNode> {
        if self.id == node_id {
            return Some(self);
        }
        self.branches
            .iter_mut()
            .flatten()
            .flat_map(|b| b.nodes.iter_mut())
            .find_map(|n| n.find_mut(node_id))
    }

    /// Visit this node and every nested branch node
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut WorkflowNode)) {
        f(self);
        for branch in self.branches.iter_mut().flatten() {
            for node in &mut branch.nodes {
                node.visit_mut(f);
            }
        }
    }

    /// Deep copy with freshly allocated ids throughout the subtree
    pub fn with_fresh_ids(&self) -> WorkflowNode {
        let mut copy = self.clone();
        copy.visit_mut(&mut |node: &mut WorkflowNode| {
            node.id = generate_id("node");
            for tool in node.tools.iter_mut().flatten() {
                tool.id = generate_id("tool");
            }
        });
        copy
    }
}

fn default_route_label(branch_id: &str) -> String {
    match branch_id {
        TRUE_BRANCH => "True".to_string(),
        FALSE_BRANCH => "False".to_string(),
        DEFAULT_BRANCH => "Default".to_string(),
        other => match other.strip_prefix("case") {
            Some(n) => format!("Case {}", n),
            None => other.to_string(),
        },
    }
}

/// A step in the main sequential spine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
}

impl Container {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: String::new(),
            nodes: Vec::new(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_node(mut self, node: WorkflowNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Every node id in the container, branch nodes included
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for node in &self.nodes {
            node.collect_ids(&mut ids);
        }
        ids
    }

    pub fn find_node(&self, node_id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find_map(|n| n.find(node_id))
    }

    pub fn find_node_mut(&mut self, node_id: &str) -> Option<&mut WorkflowNode> {
        self.nodes.iter_mut().find_map(|n| n.find_mut(node_id))
    }

    pub fn has_form_node(&self) -> bool {
        self.nodes.iter().any(WorkflowNode::contains_form)
    }
}

/// Input of a generated form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

fn default_field_type() -> String {
    "text".to_string()
}

impl FormField {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            field_type: default_field_type(),
            label: name.clone(),
            name,
            required: false,
            placeholder: None,
            options: Vec::new(),
            default_value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_if_node_gets_exactly_true_and_false() {
        let mut node = WorkflowNode::new("n1", "if");
        assert_eq!(node.branch_ids(), vec!["true", "false"]);

        node.branches.as_mut().unwrap().push(Branch::new("case1"));
        node.normalize_branches();
        assert_eq!(node.branch_ids(), vec!["true", "false"]);
        assert_eq!(node.routes.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_switch_always_has_default_first() {
        let mut node = WorkflowNode::new("n1", "switch");
        node.branches = Some(vec![Branch::new("case1"), Branch::new("case2")]);
        node.normalize_branches();
        assert_eq!(node.branch_ids(), vec!["default", "case1", "case2"]);
        assert_eq!(node.next_case_id(), "case3");
    }

    #[test]
    fn test_keyed_branches_are_accepted() {
        let node: WorkflowNode = serde_json::from_value(json!({
            "id": "n1",
            "type": "if",
            "branches": {
                "true": { "nodes": [{ "id": "a", "type": "http" }], "position": { "x": 1.0, "y": 2.0 } },
                "false": { "nodes": [] }
            }
        }))
        .unwrap();
        assert_eq!(node.branch("true").unwrap().nodes[0].id, "a");
        assert_eq!(node.branch("true").unwrap().position, Position::new(1.0, 2.0));
        assert!(node.branch("false").unwrap().nodes.is_empty());
    }

    #[test]
    fn test_icon_is_never_serialized() {
        let mut node = WorkflowNode::new("n1", "http");
        node.icon = Some("globe".to_string());
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("icon").is_none());
    }

    #[test]
    fn test_fresh_ids_cover_nested_branches() {
        let mut node = WorkflowNode::new("n1", "if");
        node.branch_mut("true")
            .unwrap()
            .nodes
            .push(WorkflowNode::new("inner", "http"));
        let copy = node.with_fresh_ids();
        let mut ids = Vec::new();
        copy.collect_ids(&mut ids);
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"n1".to_string()));
        assert!(!ids.contains(&"inner".to_string()));
    }
}
