//! Connection Store: the flat edge list and the drag-to-connect session.

use flowcore::{Connection, ConnectionType, EndpointType, Position, Side};
use std::collections::HashSet;

/// An in-flight drag from a source terminal
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub source_id: String,
    pub source_type: EndpointType,
    pub branch_output: Option<String>,
    pub position: Option<Position>,
}

/// At most one drag exists at a time
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

#[derive(Debug, Default)]
pub struct ConnectionStore {
    connections: Vec<Connection>,
    drag: DragState,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn get(&self, connection_id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Append an edge. Several edges may share a target.
    pub fn add_connection(&mut self, connection: Connection) -> String {
        tracing::debug!(
            source = %connection.source_id,
            target = %connection.target_id,
            branch = ?connection.branch_output,
            "connection added"
        );
        let id = connection.id.clone();
        self.connections.push(connection);
        id
    }

    pub fn remove_connection(&mut self, connection_id: &str) -> Option<Connection> {
        let index = self.connections.iter().position(|c| c.id == connection_id)?;
        Some(self.connections.remove(index))
    }

    pub fn clear_connections(&mut self) {
        self.connections.clear();
    }

    /// Replace every edge, e.g. when a document is loaded
    pub fn replace_all(&mut self, connections: Vec<Connection>) {
        self.connections = connections;
        self.drag = DragState::Idle;
    }

    /// Edges touching a node.
    ///
    /// `Left` selects edges arriving at the node (`target_id`), `Right` edges
    /// leaving it (`source_id`), `None` both.
    pub fn get_connections_for_node(&self, node_id: &str, side: Option<Side>) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| match side {
                Some(Side::Left) => c.target_id == node_id,
                Some(Side::Right) => c.source_id == node_id,
                None => c.touches(node_id),
            })
            .collect()
    }

    /// Outgoing edges of one branch of a conditional node
    pub fn get_branch_connections(&self, node_id: &str, branch_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.source_id == node_id && c.branch_output.as_deref() == Some(branch_id))
            .collect()
    }

    /// Drop every edge touching any of `entity_ids`; returns how many went
    pub fn remove_connections_for(&mut self, entity_ids: &HashSet<String>) -> usize {
        let before = self.connections.len();
        self.connections
            .retain(|c| !entity_ids.contains(&c.source_id) && !entity_ids.contains(&c.target_id));
        before - self.connections.len()
    }

    /// Drop the edges fanning out of one branch of a conditional node
    pub fn remove_branch_connections(&mut self, node_id: &str, branch_id: &str) -> usize {
        let before = self.connections.len();
        self.connections
            .retain(|c| !(c.source_id == node_id && c.branch_output.as_deref() == Some(branch_id)));
        before - self.connections.len()
    }

    // ----- drag to connect -----

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging(_))
    }

    /// Begin a drag. A drag already in flight is cancelled first.
    pub fn start_drag_connection(
        &mut self,
        source_id: impl Into<String>,
        source_type: EndpointType,
        branch_output: Option<String>,
    ) {
        if let DragState::Dragging(previous) = &self.drag {
            tracing::warn!(source = %previous.source_id, "replacing unfinished connection drag");
        }
        self.drag = DragState::Dragging(DragSession {
            source_id: source_id.into(),
            source_type,
            branch_output,
            position: None,
        });
    }

    /// Track the pointer; ignored when idle
    pub fn update_drag_position(&mut self, position: Position) {
        if let DragState::Dragging(session) = &mut self.drag {
            session.position = Some(position);
        }
    }

    /// Finish a drag. With a target, commits a manual right-side edge carrying
    /// the captured branch output; without one, the drag is cancelled. Either
    /// way the store is idle afterwards.
    pub fn end_drag_connection(
        &mut self,
        target: Option<(&str, EndpointType)>,
    ) -> Option<Connection> {
        let DragState::Dragging(session) = std::mem::take(&mut self.drag) else {
            return None;
        };
        let (target_id, target_type) = target?;
        let mut connection = Connection::new(
            session.source_id,
            session.source_type,
            target_id,
            target_type,
        );
        connection.connection_type = ConnectionType::Manual;
        connection.side = Side::Right;
        connection.branch_output = session.branch_output;
        self.add_connection(connection.clone());
        Some(connection)
    }

    pub fn cancel_drag_connection(&mut self) {
        if self.is_dragging() {
            tracing::debug!("connection drag cancelled");
        }
        self.drag = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_commits_manual_edge_with_branch() {
        let mut store = ConnectionStore::new();
        store.start_drag_connection("if1", EndpointType::Node, Some("true".to_string()));
        store.update_drag_position(Position::new(10.0, 20.0));
        assert!(store.is_dragging());

        let connection = store
            .end_drag_connection(Some(("n2", EndpointType::Node)))
            .unwrap();
        assert_eq!(connection.connection_type, ConnectionType::Manual);
        assert_eq!(connection.side, Side::Right);
        assert_eq!(connection.branch_output.as_deref(), Some("true"));
        assert_eq!(store.drag_state(), &DragState::Idle);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_drag_without_target_is_cancelled() {
        let mut store = ConnectionStore::new();
        store.start_drag_connection("t1", EndpointType::Trigger, None);
        assert!(store.end_drag_connection(None).is_none());
        assert!(!store.is_dragging());
        assert!(store.is_empty());
    }

    #[test]
    fn test_end_without_start_does_nothing() {
        let mut store = ConnectionStore::new();
        assert!(store
            .end_drag_connection(Some(("n1", EndpointType::Node)))
            .is_none());
        assert!(store.is_empty());
    }
}
