//! Collaborator seams between the policy and whoever hosts it.
//!
//! The policy never holds cluster state itself. Every call receives a
//! [`ClusterView`] (read side) and, for reconciliation, a [`TaskPatcher`]
//! (the single write it performs). [`StateStore`] implements both.

use spotmix_core::{LabelSelector, Node, Task};
use spotmix_state::{StateError, StateStore};

/// Point-in-time, read-only view of tasks and nodes.
pub trait ClusterView {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Tasks whose labels satisfy `selector`.
    fn list_tasks(&self, selector: &LabelSelector) -> Result<Vec<Task>, Self::Error>;

    /// A node by name, or `None` if the view has no such node.
    fn get_node(&self, name: &str) -> Result<Option<Node>, Self::Error>;
}

/// Merge-patch of a single task annotation.
///
/// Implementations must leave every other annotation untouched and need
/// not guard against concurrent writers.
pub trait TaskPatcher {
    type Error: std::error::Error + Send + Sync + 'static;

    fn merge_annotation(&self, task: &Task, key: &str, value: &str) -> Result<(), Self::Error>;
}

impl ClusterView for StateStore {
    type Error = StateError;

    fn list_tasks(&self, selector: &LabelSelector) -> Result<Vec<Task>, StateError> {
        self.list_tasks_matching(selector)
    }

    fn get_node(&self, name: &str) -> Result<Option<Node>, StateError> {
        StateStore::get_node(self, name)
    }
}

impl TaskPatcher for StateStore {
    type Error = StateError;

    fn merge_annotation(&self, task: &Task, key: &str, value: &str) -> Result<(), StateError> {
        self.merge_task_annotation(&task.table_key(), key, value)
            .map(|_| ())
    }
}
