//! redb table definitions for the spotmix state store.

use redb::TableDefinition;

/// Tasks keyed by `{namespace}/{name}`.
pub const TASKS: TableDefinition<&str, &[u8]> = TableDefinition::new("tasks");

/// Nodes keyed by name.
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");
