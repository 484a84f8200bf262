//! Node → capacity class lookup.

use spotmix_core::CapacityClass;

use crate::error::{PlacementError, PlacementResult};
use crate::view::ClusterView;

/// Read the capacity class of `node_name` from its `capacity_label`.
///
/// A missing node is an error; a missing or unknown label is not, it
/// yields [`CapacityClass::Unclassified`].
pub fn classify_node<V: ClusterView>(
    view: &V,
    node_name: &str,
    capacity_label: &str,
) -> PlacementResult<CapacityClass> {
    let node = view
        .get_node(node_name)
        .map_err(|e| PlacementError::Lookup {
            node: node_name.to_string(),
            source: Box::new(e),
        })?
        .ok_or_else(|| PlacementError::NodeNotFound(node_name.to_string()))?;

    Ok(CapacityClass::from_label(node.label(capacity_label)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotmix_core::{DEFAULT_CAPACITY_KEY, Node};
    use spotmix_state::StateStore;

    fn store_with(nodes: &[Node]) -> StateStore {
        let store = StateStore::open_in_memory().unwrap();
        for node in nodes {
            store.put_node(node).unwrap();
        }
        store
    }

    #[test]
    fn reads_capacity_label() {
        let store = store_with(&[
            Node::new("od").with_label(DEFAULT_CAPACITY_KEY, "on-demand"),
            Node::new("sp").with_label(DEFAULT_CAPACITY_KEY, "spot"),
        ]);

        assert_eq!(classify_node(&store, "od", DEFAULT_CAPACITY_KEY).unwrap(), CapacityClass::OnDemand);
        assert_eq!(classify_node(&store, "sp", DEFAULT_CAPACITY_KEY).unwrap(), CapacityClass::Spot);
    }

    #[test]
    fn unlabeled_node_is_unclassified() {
        let store = store_with(&[
            Node::new("bare"),
            Node::new("odd").with_label(DEFAULT_CAPACITY_KEY, "reserved"),
        ]);

        assert_eq!(
            classify_node(&store, "bare", DEFAULT_CAPACITY_KEY).unwrap(),
            CapacityClass::Unclassified
        );
        assert_eq!(
            classify_node(&store, "odd", DEFAULT_CAPACITY_KEY).unwrap(),
            CapacityClass::Unclassified
        );
    }

    #[test]
    fn missing_node_is_lookup_error() {
        let store = store_with(&[]);
        let err = classify_node(&store, "ghost", DEFAULT_CAPACITY_KEY).unwrap_err();
        assert!(matches!(err, PlacementError::NodeNotFound(name) if name == "ghost"));
    }
}
