//! Node-list operations shared by every collection that holds nodes.
//!
//! Container nodes, branch nodes, trigger chains and sub-step nodes all go
//! through these functions, so enable/disable, duplicate and reorder behave
//! identically wherever a node lives.

use flowcore::{EditError, WorkflowNode};

/// Where a node list lives, for the scoped editor API
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeScope {
    Container(String),
    SubStep(String),
}

impl NodeScope {
    pub fn container(id: impl Into<String>) -> Self {
        NodeScope::Container(id.into())
    }

    pub fn sub_step(id: impl Into<String>) -> Self {
        NodeScope::SubStep(id.into())
    }

    pub fn id(&self) -> &str {
        match self {
            NodeScope::Container(id) | NodeScope::SubStep(id) => id,
        }
    }
}

/// Reject a form node when the list already holds one
pub fn check_form(
    nodes: &[WorkflowNode],
    node: &WorkflowNode,
    scope_id: &str,
) -> Result<(), EditError> {
    if node.contains_form() && nodes.iter().any(WorkflowNode::contains_form) {
        return Err(EditError::DuplicateFormNode {
            container_id: scope_id.to_string(),
        });
    }
    Ok(())
}

/// Form nodes in the list, branch nodes included
pub fn form_count(nodes: &[WorkflowNode]) -> usize {
    fn count(node: &WorkflowNode) -> usize {
        let nested: usize = node
            .branches
            .iter()
            .flatten()
            .flat_map(|b| b.nodes.iter())
            .map(count)
            .sum();
        usize::from(node.is_form()) + nested
    }
    nodes.iter().map(count).sum()
}

/// Reject an edit that turned `before` into `after` when it added a form
/// node to a list that ends up with more than one
pub fn check_form_edit(
    before: &[WorkflowNode],
    after: &[WorkflowNode],
    scope_id: &str,
) -> Result<(), EditError> {
    let forms = form_count(after);
    if forms > 1 && forms > form_count(before) {
        return Err(EditError::DuplicateFormNode {
            container_id: scope_id.to_string(),
        });
    }
    Ok(())
}

/// Apply `edit` to a copy of the list and keep it only when the form guard
/// holds. `Ok(false)` when `node_id` is not in the list.
pub fn update_guarded<F>(
    nodes: &mut Vec<WorkflowNode>,
    node_id: &str,
    edit: F,
    scope_id: &str,
) -> Result<bool, EditError>
where
    F: FnOnce(&mut WorkflowNode),
{
    let mut edited = nodes.clone();
    if !update(&mut edited, node_id, edit) {
        return Ok(false);
    }
    check_form_edit(nodes, &edited, scope_id)?;
    *nodes = edited;
    Ok(true)
}

/// Insert at `index` (clamped), or append when `index` is `None`.
pub fn insert(
    nodes: &mut Vec<WorkflowNode>,
    mut node: WorkflowNode,
    index: Option<usize>,
    scope_id: &str,
) -> Result<(), EditError> {
    check_form(nodes, &node, scope_id)?;
    node.normalize_branches();
    let index = index.unwrap_or(nodes.len()).min(nodes.len());
    nodes.insert(index, node);
    Ok(())
}

/// Apply `edit` to the node with `node_id`; `false` when it is not in the list
pub fn update<F>(nodes: &mut [WorkflowNode], node_id: &str, edit: F) -> bool
where
    F: FnOnce(&mut WorkflowNode),
{
    match nodes.iter_mut().find(|n| n.id == node_id) {
        Some(node) => {
            edit(node);
            node.normalize_branches();
            true
        }
        None => false,
    }
}

pub fn remove(nodes: &mut Vec<WorkflowNode>, node_id: &str) -> Option<WorkflowNode> {
    let index = nodes.iter().position(|n| n.id == node_id)?;
    Some(nodes.remove(index))
}

pub fn toggle(nodes: &mut [WorkflowNode], node_id: &str) -> bool {
    update(nodes, node_id, |node| node.enabled = !node.enabled)
}

/// Move the node at `from` to `to` (clamped to the last slot)
pub fn reorder<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || items.is_empty() {
        return false;
    }
    let to = to.min(items.len() - 1);
    if from == to {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

/// Copy a node with fresh ids right after the original.
///
/// Returns the new node id, `None` when the original is not in the list.
pub fn duplicate(
    nodes: &mut Vec<WorkflowNode>,
    node_id: &str,
    scope_id: &str,
) -> Result<Option<String>, EditError> {
    let Some(index) = nodes.iter().position(|n| n.id == node_id) else {
        return Ok(None);
    };
    let copy = nodes[index].with_fresh_ids();
    check_form(nodes, &copy, scope_id)?;
    let id = copy.id.clone();
    nodes.insert(index + 1, copy);
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Vec<WorkflowNode> {
        vec![
            WorkflowNode::new("a", "http"),
            WorkflowNode::new("b", "delay"),
            WorkflowNode::new("c", "email"),
        ]
    }

    fn ids(nodes: &[WorkflowNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_insert_at_index_and_clamp() {
        let mut nodes = list();
        insert(&mut nodes, WorkflowNode::new("x", "http"), Some(1), "c1").unwrap();
        insert(&mut nodes, WorkflowNode::new("y", "http"), Some(99), "c1").unwrap();
        assert_eq!(ids(&nodes), vec!["a", "x", "b", "c", "y"]);
    }

    #[test]
    fn test_second_form_is_rejected() {
        let mut nodes = list();
        insert(&mut nodes, WorkflowNode::new("f1", "form"), None, "c1").unwrap();
        let err = insert(&mut nodes, WorkflowNode::new("f2", "form"), None, "c1").unwrap_err();
        assert_eq!(
            err,
            EditError::DuplicateFormNode {
                container_id: "c1".to_string()
            }
        );
        assert_eq!(nodes.iter().filter(|n| n.is_form()).count(), 1);
    }

    #[test]
    fn test_reorder() {
        let mut nodes = list();
        assert!(reorder(&mut nodes, 0, 2));
        assert_eq!(ids(&nodes), vec!["b", "c", "a"]);
        assert!(!reorder(&mut nodes, 5, 0));
        assert!(!reorder(&mut nodes, 1, 1));
    }

    #[test]
    fn test_toggle_and_missing_ids() {
        let mut nodes = list();
        assert!(toggle(&mut nodes, "b"));
        assert!(!nodes[1].enabled);
        assert!(!toggle(&mut nodes, "zzz"));
        assert!(remove(&mut nodes, "zzz").is_none());
    }

    #[test]
    fn test_duplicate_places_copy_after_original() {
        let mut nodes = list();
        let id = duplicate(&mut nodes, "a", "c1").unwrap().unwrap();
        assert_eq!(nodes[1].id, id);
        assert_eq!(nodes[1].node_type, "http");
        assert_eq!(nodes.len(), 4);
    }

    #[test]
    fn test_update_into_second_form_is_rejected() {
        let mut nodes = list();
        nodes.push(WorkflowNode::new("f1", "form"));

        let err = update_guarded(&mut nodes, "b", |n| n.node_type = "form".to_string(), "c1");
        assert!(err.is_err());
        assert_eq!(nodes[1].node_type, "delay");
        assert_eq!(form_count(&nodes), 1);

        assert!(update_guarded(&mut nodes, "b", |n| n.label = "Wait".to_string(), "c1").unwrap());
        assert_eq!(nodes[1].label, "Wait");
        assert!(!update_guarded(&mut nodes, "zzz", |n| n.enabled = false, "c1").unwrap());
    }

    #[test]
    fn test_form_count_includes_branch_nodes() {
        let mut node = WorkflowNode::new("if1", "if");
        node.branch_mut("true")
            .unwrap()
            .nodes
            .push(WorkflowNode::new("f1", "form"));
        assert_eq!(form_count(&[node, WorkflowNode::new("f2", "form")]), 2);
    }

    #[test]
    fn test_duplicating_a_form_is_rejected() {
        let mut nodes = vec![WorkflowNode::new("f", "form")];
        assert!(duplicate(&mut nodes, "f", "c1").is_err());
        assert_eq!(nodes.len(), 1);
    }
}
