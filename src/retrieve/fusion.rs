//! Reciprocal Rank Fusion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Standard RRF constant.
pub const RRF_K: f64 = 60.0;

/// `[fusion]` settings in `retrieval.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub rrf_k: f64,
    /// Fused candidates kept for ranking.
    pub pool_size: usize,
    /// Hits requested from each index.
    pub list_depth: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: RRF_K,
            pool_size: 30,
            list_depth: 50,
        }
    }
}

/// Fuse ranked lists: each id scores `1 / (k + rank + 1)` per list it
/// appears in (rank is 0-based), summed. Sorted by score descending, ties in
/// first-seen order, truncated to `pool_size`.
pub fn reciprocal_rank_fusion(
    lists: &[Vec<(String, f64)>],
    k: f64,
    pool_size: usize,
) -> Vec<(String, f64)> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut fused: Vec<(String, f64)> = Vec::new();
    for list in lists {
        for (rank, (id, _)) in list.iter().enumerate() {
            let contribution = 1.0 / (k + rank as f64 + 1.0);
            match position.get(id.as_str()) {
                Some(&i) => fused[i].1 += contribution,
                None => {
                    position.insert(id.as_str(), fused.len());
                    fused.push((id.clone(), contribution));
                }
            }
        }
    }
    // Stable sort keeps first-seen order among equal scores.
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(pool_size);
    fused
}
