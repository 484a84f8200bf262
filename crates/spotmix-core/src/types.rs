//! Shared types used across spotmix crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Node label (and task annotation) that records the capacity class.
pub const DEFAULT_CAPACITY_KEY: &str = "node.kubernetes.io/capacity";

/// Task label carrying the group's availability guarantee.
pub const DEFAULT_GUARANTEE_KEY: &str = "mix-scheduler-plugins/availability-guarantee";

pub const ON_DEMAND: &str = "on-demand";
pub const SPOT: &str = "spot";

/// Purchasing model of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityClass {
    /// Guaranteed, non-preemptible capacity.
    OnDemand,
    /// Discounted, preemptible capacity.
    Spot,
    /// Label absent or carrying an unknown value. Never preferred.
    Unclassified,
}

impl CapacityClass {
    /// Classify a raw label value. Matching is exact.
    pub fn from_label(value: Option<&str>) -> Self {
        match value {
            Some(ON_DEMAND) => CapacityClass::OnDemand,
            Some(SPOT) => CapacityClass::Spot,
            _ => CapacityClass::Unclassified,
        }
    }

    /// Value written into a task annotation. Unclassified nodes record an
    /// empty string, which no sibling census counts as on-demand.
    pub fn annotation_value(&self) -> &'static str {
        match self {
            CapacityClass::OnDemand => ON_DEMAND,
            CapacityClass::Spot => SPOT,
            CapacityClass::Unclassified => "",
        }
    }
}

impl fmt::Display for CapacityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityClass::Unclassified => f.write_str("unclassified"),
            other => f.write_str(other.annotation_value()),
        }
    }
}

// ── Task ──────────────────────────────────────────────────────────

/// A schedulable unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Mutable metadata, distinct from labels.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Node the task is bound to, once placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

impl Task {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
            node_name: None,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn on_node(mut self, node: impl Into<String>) -> Self {
        self.node_name = Some(node.into());
        self
    }

    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// The assigned node, treating an empty string as unassigned.
    pub fn assigned_node(&self) -> Option<&str> {
        self.node_name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn is_placed(&self) -> bool {
        self.assigned_node().is_some()
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Split a `{namespace}/{name}` key. The namespace may not contain `/`.
pub fn split_task_key(key: &str) -> Option<(&str, &str)> {
    let (ns, name) = key.split_once('/')?;
    (!ns.is_empty() && !name.is_empty()).then_some((ns, name))
}

// ── Node ──────────────────────────────────────────────────────────

/// A compute host. Read-only from the policy's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: HashMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

// ── Selector ──────────────────────────────────────────────────────

/// Exact-match equality selector over labels.
///
/// An empty selector matches every task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSelector {
    pub match_labels: HashMap<String, String>,
}

impl LabelSelector {
    /// Selector that matches the group of a task: all of its labels.
    pub fn from_labels(labels: &HashMap<String, String>) -> Self {
        Self {
            match_labels: labels.clone(),
        }
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|lv| lv == v))
    }
}

/// Point-in-time dump of the cluster, as imported by `spotmixd import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}
