//! Sibling census — placement statistics for a task's group.
//!
//! The group is every task whose labels contain all of the evaluated
//! task's labels. Only placed siblings are counted, and the on-demand
//! count trusts the capacity annotation the reconciler wrote at bind time
//! rather than re-reading each sibling's node.

use serde::Serialize;
use spotmix_core::{LabelSelector, ON_DEMAND, Task};

use crate::error::{PlacementError, PlacementResult};
use crate::view::ClusterView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SiblingCensus {
    /// Siblings bound to any node.
    pub placed_siblings: u32,
    /// Siblings bound to the candidate node.
    pub placed_on_candidate: u32,
    /// Placed siblings annotated as on-demand.
    pub on_demand_siblings: u32,
}

impl SiblingCensus {
    /// Count `siblings` against a candidate node.
    pub fn tally<'a, I>(siblings: I, candidate: &str, capacity_key: &str) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut census = SiblingCensus::default();
        for sibling in siblings {
            let Some(node) = sibling.assigned_node() else {
                continue;
            };
            census.placed_siblings += 1;
            if node == candidate {
                census.placed_on_candidate += 1;
            }
            if sibling.annotation(capacity_key) == Some(ON_DEMAND) {
                census.on_demand_siblings += 1;
            }
        }
        census
    }
}

/// Query the group of `task` and tally it against `candidate`.
pub fn take_census<V: ClusterView>(
    view: &V,
    task: &Task,
    candidate: &str,
    capacity_key: &str,
) -> PlacementResult<SiblingCensus> {
    let selector = LabelSelector::from_labels(&task.labels);
    let siblings = view
        .list_tasks(&selector)
        .map_err(|e| PlacementError::Query {
            task: task.table_key(),
            source: Box::new(e),
        })?;
    Ok(SiblingCensus::tally(&siblings, candidate, capacity_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotmix_core::DEFAULT_CAPACITY_KEY;
    use spotmix_state::StateStore;

    fn sibling(name: &str, node: Option<&str>, capacity: Option<&str>) -> Task {
        let mut task = Task::new("default", name).with_label("app", "web");
        task.node_name = node.map(str::to_string);
        if let Some(capacity) = capacity {
            task = task.with_annotation(DEFAULT_CAPACITY_KEY, capacity);
        }
        task
    }

    #[test]
    fn empty_group_counts_nothing() {
        let census = SiblingCensus::tally(&Vec::<Task>::new(), "n1", DEFAULT_CAPACITY_KEY);
        assert_eq!(census, SiblingCensus::default());
    }

    #[test]
    fn unplaced_siblings_are_ignored() {
        let siblings = vec![
            sibling("web-0", None, Some("on-demand")),
            sibling("web-1", Some(""), Some("on-demand")),
        ];
        let census = SiblingCensus::tally(&siblings, "n1", DEFAULT_CAPACITY_KEY);
        assert_eq!(census, SiblingCensus::default());
    }

    #[test]
    fn counts_placement_and_capacity() {
        let siblings = vec![
            sibling("web-0", Some("n1"), Some("on-demand")),
            sibling("web-1", Some("n1"), Some("spot")),
            sibling("web-2", Some("n2"), Some("on-demand")),
            sibling("web-3", Some("n3"), None),
            sibling("web-4", None, None),
        ];
        let census = SiblingCensus::tally(&siblings, "n1", DEFAULT_CAPACITY_KEY);
        assert_eq!(
            census,
            SiblingCensus {
                placed_siblings: 4,
                placed_on_candidate: 2,
                on_demand_siblings: 2,
            }
        );
    }

    #[test]
    fn take_census_uses_task_labels_as_selector() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_task(&sibling("web-0", Some("n1"), Some("on-demand"))).unwrap();
        store
            .put_task(&Task::new("default", "db-0").with_label("app", "db").on_node("n1"))
            .unwrap();

        let task = Task::new("default", "web-9").with_label("app", "web");
        let census = take_census(&store, &task, "n1", DEFAULT_CAPACITY_KEY).unwrap();

        assert_eq!(census.placed_siblings, 1);
        assert_eq!(census.placed_on_candidate, 1);
        assert_eq!(census.on_demand_siblings, 1);
    }

    #[derive(Debug)]
    struct Unreachable;

    impl std::fmt::Display for Unreachable {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("view unreachable")
        }
    }

    impl std::error::Error for Unreachable {}

    struct DownView;

    impl ClusterView for DownView {
        type Error = Unreachable;

        fn list_tasks(&self, _: &LabelSelector) -> Result<Vec<Task>, Unreachable> {
            Err(Unreachable)
        }

        fn get_node(&self, _: &str) -> Result<Option<spotmix_core::Node>, Unreachable> {
            Err(Unreachable)
        }
    }

    #[test]
    fn failed_query_is_an_error_not_an_empty_group() {
        let task = Task::new("default", "web-0").with_label("app", "web");
        let err = take_census(&DownView, &task, "n1", DEFAULT_CAPACITY_KEY).unwrap_err();

        match err {
            PlacementError::Query { task, source } => {
                assert_eq!(task, "default/web-0");
                assert_eq!(source.to_string(), "view unreachable");
            }
            other => panic!("expected query error, got {other:?}"),
        }
    }
}
