//! Capacity-mix scoring for a single candidate node.
//!
//! Rules, first match wins:
//! 1. **No placed siblings**: reward on-demand with the full weight.
//! 2. **No on-demand sibling yet**: same, to seed one guaranteed member.
//! 3. **Guarantee ≤ 1** (already met by the seed): reward spot with a
//!    diminishing share, `ceil(weight / (k + 1))` where `k` is the number
//!    of siblings already on the candidate.
//! 4. **Guarantee N > 1**: while fewer than N siblings are on-demand,
//!    reward on-demand with the diminishing share; afterwards reward spot.
//!
//! Anything else, unclassified nodes included, scores zero.

use std::num::IntErrorKind;

use serde::Serialize;
use spotmix_core::{CapacityClass, Task};
use tracing::warn;

use crate::census::SiblingCensus;
use crate::error::GuaranteeParseError;

/// Which rule produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRule {
    /// No sibling is placed yet.
    SeedEmptyGroup,
    /// Siblings are placed but none on on-demand capacity.
    SeedOnDemand,
    /// The guarantee is met; spread over spot capacity.
    SpreadSpot,
    /// The guarantee is not met yet; spread over on-demand capacity.
    FillGuarantee,
}

impl ScoreRule {
    /// Capacity class this rule rewards.
    pub fn preferred_class(&self) -> CapacityClass {
        match self {
            ScoreRule::SeedEmptyGroup | ScoreRule::SeedOnDemand | ScoreRule::FillGuarantee => {
                CapacityClass::OnDemand
            }
            ScoreRule::SpreadSpot => CapacityClass::Spot,
        }
    }
}

/// Raw score plus the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreDecision {
    pub score: u64,
    pub rule: ScoreRule,
}

/// `ceil(weight / (on_candidate + 1))`, in exact integer arithmetic.
pub fn diminishing_reward(weight: u64, on_candidate: u32) -> u64 {
    weight.div_ceil(u64::from(on_candidate) + 1)
}

/// Pick the active rule for a group, independent of the candidate.
pub fn select_rule(census: &SiblingCensus, guarantee: u64) -> ScoreRule {
    if census.placed_siblings == 0 {
        ScoreRule::SeedEmptyGroup
    } else if census.on_demand_siblings == 0 {
        ScoreRule::SeedOnDemand
    } else if guarantee <= 1 || u64::from(census.on_demand_siblings) >= guarantee {
        ScoreRule::SpreadSpot
    } else {
        ScoreRule::FillGuarantee
    }
}

/// Score one candidate of class `class` given the group census.
pub fn capacity_mix_score(
    census: &SiblingCensus,
    class: CapacityClass,
    guarantee: u64,
    weight: u64,
) -> ScoreDecision {
    let rule = select_rule(census, guarantee);
    let score = if class != rule.preferred_class() {
        0
    } else {
        match rule {
            ScoreRule::SeedEmptyGroup | ScoreRule::SeedOnDemand => weight,
            ScoreRule::SpreadSpot | ScoreRule::FillGuarantee => {
                diminishing_reward(weight, census.placed_on_candidate)
            }
        }
    };
    ScoreDecision { score, rule }
}

/// Parse a raw availability-guarantee label value.
///
/// `Ok(None)` means the label is absent or empty. Values too large for a
/// `u64` saturate, since such a guarantee can never be met anyway.
pub fn parse_guarantee(value: Option<&str>) -> Result<Option<u64>, GuaranteeParseError> {
    let raw = match value {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };
    match raw.parse::<u64>() {
        Ok(n) => Ok(Some(n)),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(Some(u64::MAX)),
        Err(_) => Err(GuaranteeParseError {
            value: raw.to_string(),
        }),
    }
}

/// The task's availability guarantee. An absent or malformed label falls
/// back to zero with a warning.
pub fn availability_guarantee(task: &Task, guarantee_label: &str) -> u64 {
    match parse_guarantee(task.label(guarantee_label)) {
        Ok(Some(n)) => n,
        Ok(None) => {
            warn!(
                task = %task.table_key(),
                label = guarantee_label,
                "no availability guarantee, assuming 0"
            );
            0
        }
        Err(e) => {
            warn!(
                task = %task.table_key(),
                label = guarantee_label,
                error = %e,
                "ignoring availability guarantee"
            );
            0
        }
    }
}
