//! Post-bind reconciliation of a task's capacity annotation.
//!
//! Once a task is bound, its node's capacity class is copied onto the task
//! so later censuses can count on-demand siblings from task records alone.
//! This is bookkeeping for future cycles: nothing here can fail a placement
//! that already happened, so the outcome is a plain value rather than a
//! `Result`.

use spotmix_core::{CapacityClass, Task};
use thiserror::Error;
use tracing::{error, info};

use crate::classifier::classify_node;
use crate::error::{BoxError, PlacementError};
use crate::view::{ClusterView, TaskPatcher};

/// Why a reconciliation did not record anything.
#[derive(Debug, Error)]
pub enum ReconcileFailure {
    #[error("capacity lookup failed: {0}")]
    Lookup(#[source] PlacementError),

    #[error("annotation write rejected for task {task}: {source}")]
    Write { task: String, source: BoxError },
}

/// Result of a best-effort reconciliation. Callers may log it and move on.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The annotation was merged onto the stored task.
    Annotated { class: CapacityClass },
    /// Lookup or write failed; already logged.
    Failed(ReconcileFailure),
}

impl ReconcileOutcome {
    /// The class now recorded on the task, if reconciliation succeeded.
    pub fn class(&self) -> Option<CapacityClass> {
        match self {
            ReconcileOutcome::Annotated { class } => Some(*class),
            ReconcileOutcome::Failed(_) => None,
        }
    }
}

/// Record the capacity class of `node_name` on `task` under `capacity_key`.
pub fn reconcile<V>(view: &V, task: &Task, node_name: &str, capacity_key: &str) -> ReconcileOutcome
where
    V: ClusterView + TaskPatcher,
{
    let class = match classify_node(view, node_name, capacity_key) {
        Ok(class) => class,
        Err(e) => {
            error!(task = %task.table_key(), node = node_name, error = %e, "failed to get node capacity");
            return ReconcileOutcome::Failed(ReconcileFailure::Lookup(e));
        }
    };

    // Always merge: the caller's snapshot may lag the stored record.
    if let Err(e) = view.merge_annotation(task, capacity_key, class.annotation_value()) {
        let failure = ReconcileFailure::Write {
            task: task.table_key(),
            source: Box::new(e),
        };
        error!(task = %task.table_key(), node = node_name, error = %failure, "failed to annotate task capacity");
        return ReconcileOutcome::Failed(failure);
    }

    info!(task = %task.table_key(), node = node_name, %class, "task capacity annotated");
    ReconcileOutcome::Annotated { class }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fmt;

    use spotmix_core::{DEFAULT_CAPACITY_KEY, LabelSelector, Node};
    use spotmix_state::{StateError, StateStore};

    fn seeded_store() -> StateStore {
        let store = StateStore::open_in_memory().unwrap();
        store
            .put_node(&Node::new("od-1").with_label(DEFAULT_CAPACITY_KEY, "on-demand"))
            .unwrap();
        store
            .put_node(&Node::new("spot-1").with_label(DEFAULT_CAPACITY_KEY, "spot"))
            .unwrap();
        store.put_node(&Node::new("bare-1")).unwrap();
        store
    }

    fn bound_task(store: &StateStore, node: &str) -> Task {
        let task = Task::new("default", "web-0")
            .with_label("app", "web")
            .with_annotation("owner", "team-a")
            .on_node(node);
        store.put_task(&task).unwrap();
        task
    }

    fn stored(store: &StateStore) -> HashMap<String, String> {
        store.get_task("default/web-0").unwrap().unwrap().annotations
    }

    #[test]
    fn writes_node_class_and_keeps_other_annotations() {
        let store = seeded_store();
        let task = bound_task(&store, "spot-1");

        let outcome = reconcile(&store, &task, "spot-1", DEFAULT_CAPACITY_KEY);

        assert!(matches!(outcome, ReconcileOutcome::Annotated { class: CapacityClass::Spot }));
        let annotations = stored(&store);
        assert_eq!(annotations.get(DEFAULT_CAPACITY_KEY).map(String::as_str), Some("spot"));
        assert_eq!(annotations.get("owner").map(String::as_str), Some("team-a"));
    }

    #[test]
    fn reconciling_twice_is_idempotent() {
        let store = seeded_store();
        let task = bound_task(&store, "od-1");

        let _ = reconcile(&store, &task, "od-1", DEFAULT_CAPACITY_KEY);
        let once = stored(&store);

        let refreshed = store.get_task("default/web-0").unwrap().unwrap();
        let outcome = reconcile(&store, &refreshed, "od-1", DEFAULT_CAPACITY_KEY);
        assert!(matches!(outcome, ReconcileOutcome::Annotated { class: CapacityClass::OnDemand }));
        assert_eq!(stored(&store), once);

        let _ = reconcile(&store, &task, "od-1", DEFAULT_CAPACITY_KEY);
        assert_eq!(stored(&store), once);
    }

    #[test]
    fn snapshot_claiming_current_class_still_fixes_store() {
        let store = seeded_store();
        let task = bound_task(&store, "od-1");
        store
            .merge_task_annotation("default/web-0", DEFAULT_CAPACITY_KEY, "spot")
            .unwrap();

        // The caller's copy says on-demand, the stored record says spot.
        let snapshot = task.with_annotation(DEFAULT_CAPACITY_KEY, "on-demand");
        let outcome = reconcile(&store, &snapshot, "od-1", DEFAULT_CAPACITY_KEY);

        assert_eq!(outcome.class(), Some(CapacityClass::OnDemand));
        assert_eq!(
            stored(&store).get(DEFAULT_CAPACITY_KEY).map(String::as_str),
            Some("on-demand")
        );
    }

    #[test]
    fn overwrites_stale_annotation() {
        let store = seeded_store();
        let task = bound_task(&store, "od-1").with_annotation(DEFAULT_CAPACITY_KEY, "spot");
        store.put_task(&task).unwrap();

        let outcome = reconcile(&store, &task, "od-1", DEFAULT_CAPACITY_KEY);
        assert_eq!(outcome.class(), Some(CapacityClass::OnDemand));
        assert_eq!(
            stored(&store).get(DEFAULT_CAPACITY_KEY).map(String::as_str),
            Some("on-demand")
        );
    }

    #[test]
    fn unclassified_node_records_empty_value() {
        let store = seeded_store();
        let task = bound_task(&store, "bare-1");

        let outcome = reconcile(&store, &task, "bare-1", DEFAULT_CAPACITY_KEY);
        assert_eq!(outcome.class(), Some(CapacityClass::Unclassified));
        assert_eq!(stored(&store).get(DEFAULT_CAPACITY_KEY).map(String::as_str), Some(""));
    }

    #[test]
    fn missing_node_is_swallowed() {
        let store = seeded_store();
        let task = bound_task(&store, "ghost");

        let outcome = reconcile(&store, &task, "ghost", DEFAULT_CAPACITY_KEY);

        assert!(matches!(outcome, ReconcileOutcome::Failed(ReconcileFailure::Lookup(_))));
        assert!(!stored(&store).contains_key(DEFAULT_CAPACITY_KEY));
    }

    #[derive(Debug)]
    struct Rejected;

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("conflicting update")
        }
    }

    impl std::error::Error for Rejected {}

    /// Reads from a real store, rejects every write.
    struct ReadOnly(StateStore);

    impl ClusterView for ReadOnly {
        type Error = StateError;

        fn list_tasks(&self, selector: &LabelSelector) -> Result<Vec<Task>, StateError> {
            self.0.list_tasks_matching(selector)
        }

        fn get_node(&self, name: &str) -> Result<Option<Node>, StateError> {
            self.0.get_node(name)
        }
    }

    impl TaskPatcher for ReadOnly {
        type Error = Rejected;

        fn merge_annotation(&self, _: &Task, _: &str, _: &str) -> Result<(), Rejected> {
            Err(Rejected)
        }
    }

    #[test]
    fn rejected_write_is_swallowed() {
        let store = seeded_store();
        let task = bound_task(&store, "spot-1");

        let outcome = reconcile(&ReadOnly(store.clone()), &task, "spot-1", DEFAULT_CAPACITY_KEY);

        match outcome {
            ReconcileOutcome::Failed(ReconcileFailure::Write { task, source }) => {
                assert_eq!(task, "default/web-0");
                assert_eq!(source.to_string(), "conflicting update");
            }
            other => panic!("expected write failure, got {other:?}"),
        }
    }
}
