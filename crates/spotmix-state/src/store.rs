//! StateStore — redb-backed persistence for tasks and nodes.
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing). Every mutation runs in its own write transaction; redb
//! serializes writers, so a read-modify-write inside one transaction never
//! interleaves with another writer.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use spotmix_core::{ClusterSnapshot, LabelSelector, Node, Task};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(TASKS).map_err(map_err!(Table))?;
        txn.open_table(NODES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Tasks ──────────────────────────────────────────────────────

    /// Insert or replace a task.
    pub fn put_task(&self, task: &Task) -> StateResult<()> {
        let key = task.table_key();
        let value = serde_json::to_vec(task).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(TASKS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "task stored");
        Ok(())
    }

    /// Get a task by `{namespace}/{name}` key.
    pub fn get_task(&self, key: &str) -> StateResult<Option<Task>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let task: Task =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// List all tasks, in key order.
    pub fn list_tasks(&self) -> StateResult<Vec<Task>> {
        self.list_tasks_matching(&LabelSelector::default())
    }

    /// List the tasks whose labels satisfy `selector`, in key order.
    ///
    /// All records are read from one transaction, so the result is a
    /// consistent snapshot.
    pub fn list_tasks_matching(&self, selector: &LabelSelector) -> StateResult<Vec<Task>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let task: Task =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if selector.matches(&task.labels) {
                results.push(task);
            }
        }
        Ok(results)
    }

    /// Assign a task to a node. Fails with `Conflict` if the task is
    /// already bound elsewhere; re-binding to the same node is a no-op.
    pub fn bind_task(&self, key: &str, node_name: &str) -> StateResult<Task> {
        self.update_task(key, |task| {
            if let Some(current) = task.assigned_node().filter(|n| *n != node_name) {
                return Err(StateError::Conflict(format!(
                    "task {key} already bound to {current}"
                )));
            }
            task.node_name = Some(node_name.to_string());
            Ok(())
        })
    }

    /// Merge a single annotation into a task, leaving every other
    /// annotation untouched. No precondition on the stored version: the
    /// last writer wins.
    pub fn merge_task_annotation(&self, key: &str, annotation: &str, value: &str) -> StateResult<Task> {
        self.update_task(key, |task| {
            task.annotations
                .insert(annotation.to_string(), value.to_string());
            Ok(())
        })
    }

    /// Read-modify-write a task inside a single write transaction.
    fn update_task<F>(&self, key: &str, mutate: F) -> StateResult<Task>
    where
        F: FnOnce(&mut Task) -> StateResult<()>,
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let task = {
            let mut table = txn.open_table(TASKS).map_err(map_err!(Table))?;
            let current = table
                .get(key)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| StateError::NotFound(format!("task {key}")))?;
            let mut task: Task =
                serde_json::from_slice(&current).map_err(map_err!(Deserialize))?;
            mutate(&mut task)?;
            let value = serde_json::to_vec(&task).map_err(map_err!(Serialize))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
            task
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "task updated");
        Ok(task)
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Insert or replace a node.
    pub fn put_node(&self, node: &Node) -> StateResult<()> {
        let value = serde_json::to_vec(node).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            table
                .insert(node.name.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a node by name.
    pub fn get_node(&self, name: &str) -> StateResult<Option<Node>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(NODES).map_err(map_err!(Table))?;
        match table.get(name).map_err(map_err!(Read))? {
            Some(guard) => {
                let node: Node =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// List all nodes, in name order.
    pub fn list_nodes(&self) -> StateResult<Vec<Node>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(NODES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let node: Node =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(node);
        }
        Ok(results)
    }

    // ── Snapshots ──────────────────────────────────────────────────

    /// Upsert every node and task of a snapshot in one transaction.
    pub fn import_snapshot(&self, snapshot: &ClusterSnapshot) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut nodes = txn.open_table(NODES).map_err(map_err!(Table))?;
            for node in &snapshot.nodes {
                let value = serde_json::to_vec(node).map_err(map_err!(Serialize))?;
                nodes
                    .insert(node.name.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
            let mut tasks = txn.open_table(TASKS).map_err(map_err!(Table))?;
            for task in &snapshot.tasks {
                let key = task.table_key();
                let value = serde_json::to_vec(task).map_err(map_err!(Serialize))?;
                tasks
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            nodes = snapshot.nodes.len(),
            tasks = snapshot.tasks.len(),
            "snapshot imported"
        );
        Ok(())
    }
}
