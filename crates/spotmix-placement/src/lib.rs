//! spotmix capacity-mix placement policy.
//!
//! Scores candidate nodes for a task so that each task group keeps a
//! guaranteed base of on-demand capacity and spreads the rest over spot
//! capacity, then records the capacity class a task actually landed on.
//! The crate does not filter nodes or bin-pack resources; it only emits one
//! preference signal per candidate.
//!
//! # Components
//!
//! - **`view`** — `ClusterView` / `TaskPatcher` collaborator traits
//! - **`classifier`** — node → capacity class
//! - **`census`** — sibling placement statistics
//! - **`scorer`** — the capacity-mix rules
//! - **`normalize`** — per-cycle rescaling into the host's score range
//! - **`reconciler`** — post-bind annotation bookkeeping
//! - **`policy`** — the three hooks bundled with their config
//! - **`cycle`** — host-side driver over the state store

pub mod census;
pub mod classifier;
pub mod cycle;
pub mod error;
pub mod normalize;
pub mod policy;
pub mod reconciler;
pub mod scorer;
pub mod view;

pub use census::{SiblingCensus, take_census};
pub use classifier::classify_node;
pub use cycle::{CycleMode, CycleReport, UnscorableNode, run_cycle, run_pending, select_node};
pub use error::{BoxError, GuaranteeParseError, PlacementError, PlacementResult};
pub use normalize::{NodeScore, normalize_scores};
pub use policy::CapacityMixPolicy;
pub use reconciler::{ReconcileFailure, ReconcileOutcome, reconcile};
pub use scorer::{ScoreDecision, ScoreRule, availability_guarantee, capacity_mix_score, diminishing_reward, parse_guarantee};
pub use view::{ClusterView, TaskPatcher};
