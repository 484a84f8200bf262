//! The capacity-mix policy as a host-facing object.
//!
//! Bundles the scorer, normalizer and reconciler behind the three hooks a
//! scheduling framework calls: score each candidate, normalize the cycle,
//! reconcile after bind. Collaborators are passed per call.

use spotmix_core::{ConfigError, PolicyConfig, Task};
use tracing::debug;

use crate::census::take_census;
use crate::classifier::classify_node;
use crate::error::PlacementResult;
use crate::normalize::{NodeScore, normalize_scores};
use crate::reconciler::{ReconcileOutcome, reconcile};
use crate::scorer::{ScoreDecision, availability_guarantee, capacity_mix_score};
use crate::view::{ClusterView, TaskPatcher};

#[derive(Debug, Clone, Default)]
pub struct CapacityMixPolicy {
    config: PolicyConfig,
}

impl CapacityMixPolicy {
    /// Build a policy, rejecting a config whose score range or weight
    /// would make normalization meaningless.
    pub fn new(config: PolicyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Raw score of `node_name` for `task`.
    pub fn score<V: ClusterView>(&self, view: &V, task: &Task, node_name: &str) -> PlacementResult<i64> {
        let decision = self.decide(view, task, node_name)?;
        Ok(i64::try_from(decision.score).unwrap_or(i64::MAX))
    }

    /// Like [`score`](Self::score), but keeps the rule that fired.
    pub fn decide<V: ClusterView>(
        &self,
        view: &V,
        task: &Task,
        node_name: &str,
    ) -> PlacementResult<ScoreDecision> {
        let census = take_census(view, task, node_name, &self.config.capacity_label)?;
        let class = classify_node(view, node_name, &self.config.capacity_label)?;
        let guarantee = availability_guarantee(task, &self.config.guarantee_label);

        let decision = capacity_mix_score(&census, class, guarantee, self.config.weight);
        debug!(
            task = %task.table_key(),
            node = node_name,
            %class,
            guarantee,
            placed = census.placed_siblings,
            on_candidate = census.placed_on_candidate,
            on_demand = census.on_demand_siblings,
            rule = ?decision.rule,
            score = decision.score,
            "node scored"
        );
        Ok(decision)
    }

    /// Rescale one cycle's scores into the configured range.
    pub fn normalize(&self, scores: &mut [NodeScore]) {
        normalize_scores(scores, self.config.min_score, self.config.max_score);
    }

    /// Record the bound node's capacity class on the task. Never fails.
    pub fn reconcile<V>(&self, view: &V, task: &Task, node_name: &str) -> ReconcileOutcome
    where
        V: ClusterView + TaskPatcher,
    {
        reconcile(view, task, node_name, &self.config.capacity_label)
    }
}
