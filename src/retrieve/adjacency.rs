//! Weighted document graph over a candidate set.
//!
//! Direct RDF edges between two candidates count with their predicate
//! weight. Candidates that share a non-candidate neighbour get a virtual
//! edge `w_a * w_b / max_hops`, so documents linked through an unretrieved
//! intermediary (a shared production event, a shared place) still connect.
//! The result is symmetrically normalized: `D^-1/2 (A + I) D^-1/2`.

use std::collections::HashMap;

use ndarray::Array2;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::graph::KnowledgeGraph;

/// `[adjacency]` settings in `retrieval.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjacencyConfig {
    /// Signal decay divisor for virtual edges. 1 disables them.
    pub max_hops: usize,
    /// Weight of predicates missing from `weights`.
    pub default_weight: f64,
    /// Predicate local name → edge weight.
    pub weights: HashMap<String, f64>,
}

impl Default for AdjacencyConfig {
    fn default() -> Self {
        let weights = [
            ("P108i_was_produced_by", 1.0),
            ("P108_has_produced", 1.0),
            ("P14_carried_out_by", 1.0),
            ("P14i_performed", 1.0),
            ("P7_took_place_at", 0.9),
            ("P7i_witnessed", 0.9),
            ("P46_is_composed_of", 0.8),
            ("P46i_forms_part_of", 0.8),
            ("P89_falls_within", 0.8),
            ("P89i_contains", 0.8),
            ("P53_has_former_or_current_location", 0.8),
            ("P53i_is_former_or_current_location_of", 0.8),
            ("P4_has_time-span", 0.4),
            ("P2_has_type", 0.3),
            ("P1_is_identified_by", 0.2),
            ("type", 0.1),
        ]
        .into_iter()
        .map(|(p, w)| (p.to_string(), w))
        .collect();
        Self {
            max_hops: 2,
            default_weight: 0.5,
            weights,
        }
    }
}

impl AdjacencyConfig {
    /// Weight of a predicate; non-finite or negative weights count as 0.
    pub fn weight(&self, predicate: &str) -> f64 {
        let w = self.weights.get(predicate).copied().unwrap_or(self.default_weight);
        if w.is_finite() { w.max(0.0) } else { 0.0 }
    }
}

/// Normalized adjacency over an ordered candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    ids: Vec<String>,
    matrix: Array2<f64>,
}

impl AdjacencyMatrix {
    /// Build and normalize for `ids`, in order.
    pub fn build(graph: &KnowledgeGraph, ids: &[String], config: &AdjacencyConfig) -> Self {
        let mut matrix = weighted(graph, ids, config);
        for i in 0..ids.len() {
            matrix[[i, i]] = 1.0;
        }
        normalize(&mut matrix);
        Self {
            ids: ids.to_vec(),
            matrix,
        }
    }

    /// Wrap an already normalized matrix.
    pub fn from_parts(ids: Vec<String>, matrix: Array2<f64>) -> Self {
        Self { ids, matrix }
    }

    /// Identity matrix: no connectivity information.
    pub fn identity(ids: &[String]) -> Self {
        Self {
            ids: ids.to_vec(),
            matrix: Array2::eye(ids.len()),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[[i, j]]
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.len();
        (0..n).all(|i| (0..i).all(|j| (self.matrix[[i, j]] - self.matrix[[j, i]]).abs() <= tolerance))
    }
}

/// Raw weighted adjacency (no self-loops, no normalization).
pub fn weighted(graph: &KnowledgeGraph, ids: &[String], config: &AdjacencyConfig) -> Array2<f64> {
    let n = ids.len();
    let mut matrix = Array2::<f64>::zeros((n, n));

    let mut position: HashMap<NodeIndex, usize> = HashMap::with_capacity(n);
    for (i, id) in ids.iter().enumerate() {
        match graph.index_of(id) {
            Some(idx) => {
                position.entry(idx).or_insert(i);
            }
            None => tracing::debug!(doc = %id, "candidate missing from graph"),
        }
    }

    // intermediary → candidate position → strongest edge weight
    let mut via: HashMap<NodeIndex, HashMap<usize, f64>> = HashMap::new();
    for (&idx, &i) in &position {
        for (other, predicate) in graph.rdf_neighbors(idx) {
            if other == idx {
                continue;
            }
            let w = config.weight(predicate);
            match position.get(&other) {
                Some(&j) => {
                    let current = matrix[[i, j]].max(w);
                    matrix[[i, j]] = current;
                    matrix[[j, i]] = current;
                }
                None => {
                    let slot = via.entry(other).or_default().entry(i).or_insert(0.0);
                    *slot = slot.max(w);
                }
            }
        }
    }

    if config.max_hops >= 2 {
        let hops = config.max_hops as f64;
        for linked in via.values().filter(|m| m.len() >= 2) {
            let members: Vec<(usize, f64)> = linked.iter().map(|(&i, &w)| (i, w)).collect();
            for (a, &(i, wi)) in members.iter().enumerate() {
                for &(j, wj) in &members[a + 1..] {
                    let virtual_weight = wi * wj / hops;
                    let current = matrix[[i, j]].max(virtual_weight);
                    matrix[[i, j]] = current;
                    matrix[[j, i]] = current;
                }
            }
        }
    }
    matrix
}

/// `D^-1/2 A D^-1/2` in place. Rows whose degree is not a positive finite
/// number become identity rows; non-finite entries become 0.
pub fn normalize(matrix: &mut Array2<f64>) {
    let n = matrix.nrows();
    let degrees: Vec<f64> = matrix.rows().into_iter().map(|row| row.sum()).collect();
    let scale: Vec<Option<f64>> = degrees
        .iter()
        .map(|&d| (d.is_finite() && d > 0.0).then(|| 1.0 / d.sqrt()))
        .collect();

    for i in 0..n {
        for j in 0..n {
            let value = match (scale[i], scale[j]) {
                (Some(si), Some(sj)) => matrix[[i, j]] * si * sj,
                _ if i == j => 1.0,
                _ => 0.0,
            };
            matrix[[i, j]] = if value.is_finite() { value } else { 0.0 };
        }
    }
    let degenerate = scale.iter().filter(|s| s.is_none()).count();
    if degenerate > 0 {
        tracing::debug!(degenerate, "adjacency rows fell back to identity");
    }
}
