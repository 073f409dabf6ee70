use flowcore::{
    Config, ConditionalKind, EditError, EntityKind, Tool, Trigger, WorkflowNode, generate_id,
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Config check supplied by a definition: `Err` carries the user-facing message
pub type Validator = Arc<dyn Fn(&Config) -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_branches: bool,
    pub supports_tools: bool,
}

/// Static description of a trigger, node or tool type
#[derive(Clone)]
pub struct Definition {
    pub type_id: String,
    pub label: String,
    pub description: String,
    pub category: String,
    pub icon: Option<String>,
    pub tags: Vec<String>,
    pub default_config: Config,
    pub capabilities: Capabilities,
    validator: Option<Validator>,
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("type_id", &self.type_id)
            .field("label", &self.label)
            .field("category", &self.category)
            .field("capabilities", &self.capabilities)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

impl Definition {
    pub fn new(type_id: impl Into<String>) -> Self {
        let type_id = type_id.into();
        Self {
            label: type_id.clone(),
            type_id,
            description: String::new(),
            category: "general".to_string(),
            icon: None,
            tags: Vec::new(),
            default_config: Config::new(),
            capabilities: Capabilities::default(),
            validator: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_config.insert(key.into(), value.into());
        self
    }

    pub fn supports_branches(mut self) -> Self {
        self.capabilities.supports_branches = true;
        self
    }

    pub fn supports_tools(mut self) -> Self {
        self.capabilities.supports_tools = true;
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Config) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Run the definition's validator, if any
    pub fn validate(&self, config: &Config) -> Result<(), String> {
        match &self.validator {
            Some(validator) => validator(config),
            None => Ok(()),
        }
    }

    /// Defaults merged with caller overrides; overrides win
    pub fn merged_config(&self, overrides: Option<Config>) -> Config {
        let mut config = self.default_config.clone();
        if let Some(overrides) = overrides {
            config.extend(overrides);
        }
        config
    }

    fn matches(&self, needle: &str) -> bool {
        self.label.to_lowercase().contains(needle)
            || self.type_id.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// What a registry produces from a definition
pub trait RegistryKind {
    type Instance;
    const KIND: EntityKind;
    const ID_PREFIX: &'static str;

    fn instantiate(definition: &Definition, id: String, config: Config) -> Self::Instance;
}

pub struct TriggerKind;
pub struct NodeKind;
pub struct ToolKind;

impl RegistryKind for TriggerKind {
    type Instance = Trigger;
    const KIND: EntityKind = EntityKind::Trigger;
    const ID_PREFIX: &'static str = "trigger";

    fn instantiate(definition: &Definition, id: String, config: Config) -> Trigger {
        Trigger {
            id,
            trigger_type: definition.type_id.clone(),
            label: definition.label.clone(),
            enabled: true,
            config,
            nodes: None,
            icon: definition.icon.clone(),
        }
    }
}

impl RegistryKind for NodeKind {
    type Instance = WorkflowNode;
    const KIND: EntityKind = EntityKind::Node;
    const ID_PREFIX: &'static str = "node";

    fn instantiate(definition: &Definition, id: String, config: Config) -> WorkflowNode {
        let mut node = WorkflowNode::new(id, definition.type_id.clone())
            .with_label(definition.label.clone())
            .with_category(definition.category.clone());
        node.icon = definition.icon.clone();

        // Switch cases listed in config become case branches up front
        if ConditionalKind::of(&definition.type_id) == Some(ConditionalKind::Switch) {
            let cases = config
                .get("cases")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0);
            for _ in 0..cases {
                let case_id = node.next_case_id();
                if let Some(branches) = node.branches.as_mut() {
                    branches.push(flowcore::Branch::new(case_id));
                }
            }
            node.normalize_branches();
        }
        if definition.capabilities.supports_tools {
            node.tools = Some(Vec::new());
        }
        node.config = config;
        node
    }
}

impl RegistryKind for ToolKind {
    type Instance = Tool;
    const KIND: EntityKind = EntityKind::Tool;
    const ID_PREFIX: &'static str = "tool";

    fn instantiate(definition: &Definition, id: String, config: Config) -> Tool {
        Tool {
            id,
            tool_type: definition.type_id.clone(),
            label: definition.label.clone(),
            enabled: true,
            config,
            icon: definition.icon.clone(),
        }
    }
}

/// Catalog of available types of one kind
pub struct Registry<K: RegistryKind> {
    definitions: HashMap<String, Arc<Definition>>,
    order: Vec<String>,
    _kind: PhantomData<fn() -> K>,
}

pub type TriggerRegistry = Registry<TriggerKind>;
pub type NodeRegistry = Registry<NodeKind>;
pub type ToolRegistry = Registry<ToolKind>;

impl<K: RegistryKind> Registry<K> {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            order: Vec::new(),
            _kind: PhantomData,
        }
    }

    /// Register a definition, replacing any previous one of the same type
    pub fn register(&mut self, definition: Definition) {
        let type_id = definition.type_id.clone();
        tracing::info!("Registering {} type: {}", K::KIND, type_id);
        if self
            .definitions
            .insert(type_id.clone(), Arc::new(definition))
            .is_none()
        {
            self.order.push(type_id);
        }
    }

    pub fn get(&self, type_id: &str) -> Option<&Definition> {
        self.definitions.get(type_id).map(Arc::as_ref)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.definitions.contains_key(type_id)
    }

    /// All definitions in registration order
    pub fn get_all(&self) -> Vec<&Definition> {
        self.order.iter().filter_map(|t| self.get(t)).collect()
    }

    /// Case-insensitive substring match over label, type, description and tags
    pub fn search(&self, query: &str) -> Vec<&Definition> {
        let needle = query.trim().to_lowercase();
        self.get_all()
            .into_iter()
            .filter(|d| needle.is_empty() || d.matches(&needle))
            .collect()
    }

    pub fn get_by_category(&self, category: &str) -> Vec<&Definition> {
        self.get_all()
            .into_iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for definition in self.get_all() {
            if !categories.contains(&definition.category.as_str()) {
                categories.push(&definition.category);
            }
        }
        categories
    }

    /// Build a fresh entity of `type_id`, or `None` when the type is unknown
    pub fn create_instance(&self, type_id: &str, overrides: Option<Config>) -> Option<K::Instance> {
        let definition = self.get(type_id)?;
        let config = definition.merged_config(overrides);
        Some(K::instantiate(definition, generate_id(K::ID_PREFIX), config))
    }

    /// Validate a config against the type's validator.
    ///
    /// Unknown types are reported as [`EditError::UnknownType`].
    pub fn validate(&self, type_id: &str, config: &Config) -> Result<(), EditError> {
        let definition = self.get(type_id).ok_or_else(|| EditError::UnknownType {
            kind: K::KIND,
            type_id: type_id.to_string(),
        })?;
        definition
            .validate(config)
            .map_err(|message| EditError::Validation {
                type_id: type_id.to_string(),
                message,
            })
    }

    pub fn icon(&self, type_id: &str) -> Option<String> {
        self.get(type_id).and_then(|d| d.icon.clone())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K: RegistryKind> Default for Registry<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// The three catalogs an editor session consults, built once at startup
#[derive(Default)]
pub struct Registries {
    pub triggers: TriggerRegistry,
    pub nodes: NodeRegistry,
    pub tools: ToolRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the node type's definition allows attaching tools
    pub fn node_supports_tools(&self, node_type: &str) -> bool {
        self.nodes
            .get(node_type)
            .is_some_and(|d| d.capabilities.supports_tools)
    }

    /// Icon of a type in the registry matching `kind`
    pub fn icon_for(&self, kind: EntityKind, type_id: &str) -> Option<String> {
        match kind {
            EntityKind::Trigger => self.triggers.icon(type_id),
            EntityKind::Node => self.nodes.icon(type_id),
            EntityKind::Tool => self.tools.icon(type_id),
        }
    }

    pub fn knows(&self, kind: EntityKind, type_id: &str) -> bool {
        match kind {
            EntityKind::Trigger => self.triggers.contains(type_id),
            EntityKind::Node => self.nodes.contains(type_id),
            EntityKind::Tool => self.tools.contains(type_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node_registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(
            Definition::new("http")
                .with_label("HTTP Request")
                .with_category("network")
                .with_icon("globe")
                .with_tags(["api", "REST"])
                .with_default("method", "GET")
                .with_validator(|config| match config.get("url") {
                    Some(Value::String(url)) if !url.is_empty() => Ok(()),
                    _ => Err("URL is required".to_string()),
                }),
        );
        registry.register(
            Definition::new("switch")
                .with_label("Switch")
                .with_category("logic")
                .supports_branches(),
        );
        registry
    }

    #[test]
    fn test_create_instance_merges_overrides() {
        let registry = node_registry();
        let mut overrides = Config::new();
        overrides.insert("url".to_string(), json!("https://example.com"));
        overrides.insert("method".to_string(), json!("POST"));

        let node = registry.create_instance("http", Some(overrides)).unwrap();
        assert!(node.id.starts_with("node_"));
        assert!(node.enabled);
        assert_eq!(node.label, "HTTP Request");
        assert_eq!(node.config["method"], json!("POST"));
        assert_eq!(node.icon.as_deref(), Some("globe"));
    }

    #[test]
    fn test_unknown_type_yields_none() {
        assert!(node_registry().create_instance("nope", None).is_none());
    }

    #[test]
    fn test_search_is_case_insensitive_over_tags() {
        let registry = node_registry();
        let hits = registry.search("rest");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].type_id, "http");
        assert_eq!(registry.search("").len(), 2);
        assert_eq!(registry.get_by_category("logic").len(), 1);
    }

    #[test]
    fn test_switch_cases_seed_branches() {
        let registry = node_registry();
        let mut overrides = Config::new();
        overrides.insert("cases".to_string(), json!(["a", "b"]));
        let node = registry.create_instance("switch", Some(overrides)).unwrap();
        assert_eq!(node.branch_ids(), vec!["default", "case1", "case2"]);
    }

    #[test]
    fn test_validator_reports_message() {
        let registry = node_registry();
        let err = registry.validate("http", &Config::new()).unwrap_err();
        assert_eq!(
            err,
            EditError::Validation {
                type_id: "http".to_string(),
                message: "URL is required".to_string(),
            }
        );
    }
}
