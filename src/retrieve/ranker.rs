//! Coherent-subgraph selection.
//!
//! Greedy: the first pick is the most relevant candidate; every later pick
//! balances relevance against connectivity to what is already selected, minus
//! a penalty for near-duplicates of selected documents. Type modifiers and
//! the category boost scale the whole score.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RankError;
use crate::graph::FundamentalCategory;

use super::DocNode;
use super::adjacency::AdjacencyMatrix;

/// `[ranking]` settings in `retrieval.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Relevance share of the combined score; connectivity gets the rest.
    pub alpha: f64,
    pub diversity_penalty: f64,
    /// Added to the modifier when a candidate's category is a query target.
    pub category_boost: f64,
    /// rdf:type local name → additive modifier.
    pub type_modifiers: HashMap<String, f64>,
    /// Weight of the PageRank prior applied before ranking; 0 disables it.
    pub authority_weight: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        let type_modifiers = [
            ("E22_Human-Made_Object", 0.10),
            ("E21_Person", 0.10),
            ("E74_Group", 0.05),
            ("E53_Place", 0.05),
            ("E12_Production", 0.05),
            ("E55_Type", -0.10),
            ("E52_Time-Span", -0.15),
            ("E41_Appellation", -0.20),
            ("E42_Identifier", -0.20),
        ]
        .into_iter()
        .map(|(t, m)| (t.to_string(), m))
        .collect();
        Self {
            alpha: 0.7,
            diversity_penalty: 0.2,
            category_boost: 0.10,
            type_modifiers,
            authority_weight: 0.1,
        }
    }
}

/// Ranking result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankOutcome {
    /// Selected ids in pick order.
    pub selected: Vec<String>,
    /// Score each pick won its round with.
    pub scores: Vec<f64>,
    pub requested: usize,
    /// Fewer candidates than requested.
    pub exhausted: bool,
}

/// Greedy multi-factor selector.
#[derive(Debug, Clone, Default)]
pub struct SubgraphRanker {
    config: RankingConfig,
}

fn min_max(values: &[f64], flat: f64) -> Vec<f64> {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    if !range.is_finite() || range <= f64::EPSILON {
        return vec![flat; values.len()];
    }
    values.iter().map(|&v| (v - lo) / range).collect()
}

/// Cosine similarity; `None` when either vector is unusable.
fn cosine(a: &[f32], a_norm: f64, b: &[f32], b_norm: f64) -> Option<f64> {
    if a.len() != b.len() || a_norm == 0.0 || b_norm == 0.0 {
        return None;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    Some(dot / (a_norm * b_norm))
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Index of the largest value; the first one wins ties.
fn argmax(candidates: impl Iterator<Item = (usize, f64)>) -> Option<(usize, f64)> {
    candidates.fold(None, |best, (i, s)| match best {
        Some((_, bs)) if s <= bs => best,
        _ => Some((i, s)),
    })
}

impl SubgraphRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Type modifier plus category boost for one candidate.
    pub fn modifier(&self, doc: &DocNode, targets: &[FundamentalCategory]) -> f64 {
        let from_types: f64 = doc
            .types
            .iter()
            .filter_map(|t| self.config.type_modifiers.get(t))
            .sum();
        let hit = doc
            .category
            .iter()
            .chain(&doc.categories)
            .any(|c| targets.contains(c));
        let boost = if hit { self.config.category_boost } else { 0.0 };
        from_types + boost
    }

    /// Select up to `k` documents. `adjacency` must cover `candidates` in order.
    pub fn rank(
        &self,
        candidates: &[DocNode],
        adjacency: &AdjacencyMatrix,
        k: usize,
        targets: &[FundamentalCategory],
    ) -> Result<RankOutcome, RankError> {
        let n = candidates.len();
        if adjacency.len() != n {
            return Err(RankError::Dimension {
                expected: n,
                found: adjacency.len(),
            });
        }
        let mut outcome = RankOutcome {
            requested: k,
            exhausted: n < k,
            ..Default::default()
        };
        if outcome.exhausted {
            tracing::warn!(requested = k, available = n, "fewer candidates than requested");
        }
        if n == 0 || k == 0 {
            return Ok(outcome);
        }

        let raw: Vec<f64> = candidates
            .iter()
            .map(|d| if d.relevance.is_finite() { d.relevance } else { 0.0 })
            .collect();
        let relevance = min_max(&raw, 1.0);
        let multiplier: Vec<f64> = candidates
            .iter()
            .map(|d| 1.0 + self.modifier(d, targets))
            .collect();
        let norms: Vec<Option<f64>> = candidates
            .iter()
            .map(|d| d.embedding.as_deref().map(norm))
            .collect();

        let mut selected: Vec<usize> = Vec::with_capacity(k.min(n));
        let mut remaining: Vec<usize> = (0..n).collect();

        let Some((first, score)) = argmax((0..n).map(|i| (i, relevance[i] * multiplier[i]))) else {
            return Ok(outcome);
        };
        selected.push(first);
        outcome.scores.push(score);
        remaining.retain(|&i| i != first);

        while selected.len() < k && !remaining.is_empty() {
            let connectivity_raw: Vec<f64> = remaining
                .iter()
                .map(|&i| {
                    selected
                        .iter()
                        .map(|&j| adjacency.get(i, j).max(adjacency.get(j, i)))
                        .sum::<f64>()
                        / selected.len() as f64
                })
                .collect();
            let connectivity = min_max(&connectivity_raw, 0.0);

            let scored = remaining.iter().enumerate().map(|(slot, &i)| {
                let penalty = self.config.diversity_penalty * self.max_similarity(candidates, &norms, i, &selected);
                let base = self.config.alpha * relevance[i]
                    + (1.0 - self.config.alpha) * connectivity[slot]
                    - penalty;
                (slot, base * multiplier[i])
            });
            let Some((slot, score)) = argmax(scored) else {
                break;
            };
            let pick = remaining.remove(slot);
            selected.push(pick);
            outcome.scores.push(score);
        }

        outcome.selected = selected.into_iter().map(|i| candidates[i].id.clone()).collect();
        tracing::debug!(
            candidates = n,
            selected = outcome.selected.len(),
            "ranked coherent subgraph"
        );
        Ok(outcome)
    }

    /// Largest non-negative cosine similarity between `i` and any selected document.
    fn max_similarity(
        &self,
        candidates: &[DocNode],
        norms: &[Option<f64>],
        i: usize,
        selected: &[usize],
    ) -> f64 {
        let (Some(a), Some(a_norm)) = (candidates[i].embedding.as_deref(), norms[i]) else {
            tracing::debug!(doc = %candidates[i].id, "no embedding, diversity penalty skipped");
            return 0.0;
        };
        selected
            .iter()
            .filter_map(|&j| {
                let b = candidates[j].embedding.as_deref()?;
                cosine(a, a_norm, b, norms[j]?)
            })
            .fold(0.0, f64::max)
    }
}
