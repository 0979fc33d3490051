//! Graph analytics: authority scores over materialized FR edges.
//!
//! RDF edges are excluded from authority computation; they are dense and
//! schema-heavy, while FR edges carry the curated semantic structure.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use super::index::KnowledgeGraph;

// ---------------------------------------------------------------------------
// PageRank
// ---------------------------------------------------------------------------

/// PageRank parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    pub damping: f64,
    pub max_iterations: usize,
    /// Stop once the L1 change per vertex drops below this.
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1.0e-6,
        }
    }
}

/// PageRank score for a single vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankScore {
    pub vertex: NodeIndex,
    pub score: f64,
}

/// Outcome of a PageRank run.
#[derive(Debug, Clone, Default)]
pub struct PageRankReport {
    /// Sorted by score desc.
    pub scores: Vec<PageRankScore>,
    pub iterations: usize,
    pub converged: bool,
}

/// Compute PageRank over the subgraph induced by FR edges.
///
/// Parallel FR edges between the same pair count once, each with weight 1.0.
/// Dangling vertices spread their mass uniformly. Vertices without FR edges
/// do not appear in the result.
pub fn fr_pagerank(kg: &KnowledgeGraph, config: &PageRankConfig) -> PageRankReport {
    let pairs: HashSet<(NodeIndex, NodeIndex)> = kg.fr_edge_pairs().into_iter().collect();
    if pairs.is_empty() {
        return PageRankReport {
            converged: true,
            ..Default::default()
        };
    }

    // Compact vertex numbering, ordered by node index for determinism.
    let mut members: Vec<NodeIndex> = pairs.iter().flat_map(|&(s, t)| [s, t]).collect();
    members.sort();
    members.dedup();
    let position: HashMap<NodeIndex, usize> =
        members.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let n = members.len();

    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut out_degree = vec![0usize; n];
    let mut sorted_pairs: Vec<_> = pairs.into_iter().collect();
    sorted_pairs.sort();
    for (s, t) in sorted_pairs {
        let (si, ti) = (position[&s], position[&t]);
        predecessors[ti].push(si);
        out_degree[si] += 1;
    }

    let d = config.damping;
    let nf = n as f64;
    let mut scores = vec![1.0 / nf; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let dangling: f64 = (0..n)
            .filter(|&i| out_degree[i] == 0)
            .map(|i| scores[i])
            .sum();
        let base = (1.0 - d) / nf + d * dangling / nf;

        let mut delta = 0.0;
        for v in 0..n {
            let incoming: f64 = predecessors[v]
                .iter()
                .map(|&u| scores[u] / out_degree[u] as f64)
                .sum();
            next[v] = base + d * incoming;
            delta += (next[v] - scores[v]).abs();
        }
        std::mem::swap(&mut scores, &mut next);

        if delta < nf * config.tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(iterations, "pagerank did not converge");
    }

    let mut results: Vec<PageRankScore> = members
        .into_iter()
        .zip(scores)
        .map(|(vertex, score)| PageRankScore { vertex, score })
        .collect();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.vertex.cmp(&b.vertex))
    });

    PageRankReport {
        scores: results,
        iterations,
        converged,
    }
}

/// Write scores onto vertices. Vertices absent from the report get 0.
pub fn apply_pagerank(kg: &mut KnowledgeGraph, report: &PageRankReport) {
    let all: Vec<NodeIndex> = kg.vertex_indices().collect();
    for idx in all {
        kg.vertex_mut(idx).pagerank = 0.0;
    }
    for entry in &report.scores {
        kg.vertex_mut(entry.vertex).pagerank = entry.score;
    }
}
