//! Per-cycle score normalization.

use serde::{Deserialize, Serialize};

/// Score of one candidate node within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeScore {
    pub node_name: String,
    pub score: i64,
}

impl NodeScore {
    pub fn new(node_name: impl Into<String>, score: i64) -> Self {
        Self {
            node_name: node_name.into(),
            score,
        }
    }
}

/// Rescale a cycle's raw scores linearly into `[min_score, max_score]`.
///
/// The lowest raw score maps to `min_score` and the highest to
/// `max_score`, with truncating division in between. When every score is
/// equal there is no signal, so everything maps to `min_score`.
pub fn normalize_scores(scores: &mut [NodeScore], min_score: i64, max_score: i64) {
    let Some(highest) = scores.iter().map(|s| s.score).max() else {
        return;
    };
    let lowest = scores.iter().map(|s| s.score).min().unwrap_or(highest);

    let old_range = i128::from(highest) - i128::from(lowest);
    let new_range = i128::from(max_score) - i128::from(min_score);

    for entry in scores.iter_mut() {
        entry.score = if old_range == 0 {
            min_score
        } else {
            let offset = (i128::from(entry.score) - i128::from(lowest)) * new_range / old_range;
            // offset lies within [0, new_range], so the sum fits in i64.
            (i128::from(min_score) + offset) as i64
        };
    }
}
