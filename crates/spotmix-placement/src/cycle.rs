//! Scheduling cycle driver — the host side of the policy.
//!
//! Runs score → normalize → select → bind → reconcile for one task against
//! every node in a [`StateStore`]. Candidates are scored concurrently on
//! the blocking pool; the normalization barrier is the join of all of them.
//! A node whose score cannot be computed is left out of the cycle rather
//! than scored as zero.

use std::sync::Arc;

use serde::Serialize;
use spotmix_core::{CapacityClass, Task};
use spotmix_state::StateStore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{PlacementError, PlacementResult};
use crate::normalize::NodeScore;
use crate::policy::CapacityMixPolicy;
use crate::view::ClusterView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    /// Bind the task to the winner and reconcile its annotation.
    Bind,
    /// Score and select only.
    DryRun,
}

/// A node that dropped out of the cycle.
#[derive(Debug, Clone, Serialize)]
pub struct UnscorableNode {
    pub node_name: String,
    pub error: String,
}

/// Everything one cycle decided.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub task: String,
    /// Normalized scores, in node name order.
    pub scores: Vec<NodeScore>,
    pub unscorable: Vec<UnscorableNode>,
    pub chosen: Option<String>,
    pub bound: bool,
    /// Capacity class recorded on the task after binding, if reconciliation
    /// succeeded.
    pub recorded_class: Option<CapacityClass>,
}

/// Pick the highest score; ties go to the first node in the slice.
pub fn select_node(scores: &[NodeScore]) -> Option<&NodeScore> {
    scores
        .iter()
        .fold(None, |best: Option<&NodeScore>, candidate| match best {
            Some(b) if b.score >= candidate.score => Some(b),
            _ => Some(candidate),
        })
}

/// Run one cycle for the task stored under `task_key`.
pub async fn run_cycle(
    policy: &CapacityMixPolicy,
    store: &StateStore,
    task_key: &str,
    mode: CycleMode,
) -> PlacementResult<CycleReport> {
    let task = store
        .get_task(task_key)?
        .ok_or_else(|| PlacementError::TaskNotFound(task_key.to_string()))?;
    if task.is_placed() {
        return Err(PlacementError::AlreadyBound(task_key.to_string()));
    }

    let nodes = store.list_nodes()?.into_iter().map(|n| n.name).collect();
    let (mut scores, unscorable) = score_nodes(policy, store, Arc::new(task.clone()), nodes).await?;
    policy.normalize(&mut scores);

    let chosen = select_node(&scores).map(|s| s.node_name.clone());
    let mut report = CycleReport {
        task: task_key.to_string(),
        scores,
        unscorable,
        chosen: chosen.clone(),
        bound: false,
        recorded_class: None,
    };

    let Some(node_name) = chosen else {
        warn!(task = task_key, "no scorable node, task left pending");
        return Ok(report);
    };
    info!(task = task_key, node = %node_name, ?mode, "node selected");

    if mode == CycleMode::DryRun {
        return Ok(report);
    }

    let bound = store.bind_task(task_key, &node_name)?;
    report.bound = true;
    info!(task = task_key, node = %node_name, "task bound");

    let outcome = policy.reconcile(store, &bound, &node_name);
    report.recorded_class = outcome.class();
    Ok(report)
}

/// Run a cycle for every unplaced task, in key order.
///
/// Cycles run one after another so each one sees the bindings and
/// annotations of the previous ones.
pub async fn run_pending(
    policy: &CapacityMixPolicy,
    store: &StateStore,
    mode: CycleMode,
) -> PlacementResult<Vec<CycleReport>> {
    let pending: Vec<String> = store
        .list_tasks()?
        .into_iter()
        .filter(|t| !t.is_placed())
        .map(|t| t.table_key())
        .collect();
    info!(count = pending.len(), "scheduling pending tasks");

    let mut reports = Vec::with_capacity(pending.len());
    for key in pending {
        reports.push(run_cycle(policy, store, &key, mode).await?);
    }
    Ok(reports)
}

/// Score `nodes` concurrently. Nodes whose score errors are split out,
/// and both lists come back in node name order.
async fn score_nodes<V>(
    policy: &CapacityMixPolicy,
    view: &V,
    task: Arc<Task>,
    nodes: Vec<String>,
) -> PlacementResult<(Vec<NodeScore>, Vec<UnscorableNode>)>
where
    V: ClusterView + Clone + Send + 'static,
{
    let mut set = JoinSet::new();
    for node_name in nodes {
        let policy = policy.clone();
        let view = view.clone();
        let task = Arc::clone(&task);
        set.spawn_blocking(move || {
            let result = policy.score(&view, &task, &node_name);
            (node_name, result)
        });
    }

    let mut scores = Vec::new();
    let mut unscorable = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (node_name, result) = joined.map_err(|e| PlacementError::Worker(e.to_string()))?;
        match result {
            Ok(score) => scores.push(NodeScore { node_name, score }),
            Err(e) => {
                warn!(task = %task.table_key(), node = %node_name, error = %e, "node unscorable");
                unscorable.push(UnscorableNode {
                    node_name,
                    error: e.to_string(),
                });
            }
        }
    }

    scores.sort_by(|a, b| a.node_name.cmp(&b.node_name));
    unscorable.sort_by(|a, b| a.node_name.cmp(&b.node_name));
    Ok((scores, unscorable))
}
