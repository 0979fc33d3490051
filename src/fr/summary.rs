//! Per-entity listing of materialized FR relations.
//!
//! Two presentation heuristics keep the listing readable: an FR whose
//! targets are mostly covered by a larger FR is dropped, and a relation whose
//! many targets share only a couple of base labels ("Sherd 1", "Sherd 2",
//! ...) is flagged as suppressed.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::graph::KnowledgeGraph;
use crate::graph::index::GraphResult;

/// Trailing numbering and parentheticals: `Sherd 12`, `Stele (fragment)`, `Vase #3`.
static TRAILING_QUALIFIERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s*\([^)]*\)|\s*#?\d+(?:[.,]\d+)*)+\s*$").expect("valid regex"));

/// `[summary]` thresholds in `retrieval.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Drop an FR when more than this share of its targets also belong to a
    /// strictly larger FR of the same entity.
    pub overlap_threshold: f64,
    pub max_unique_base_labels: usize,
    pub min_total_for_suppression: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.8,
            max_unique_base_labels: 2,
            min_total_for_suppression: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationTarget {
    pub uri: String,
    pub label: String,
}

/// One FR of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationSummary {
    pub fr_id: String,
    pub label: String,
    /// Sorted by label, then URI.
    pub targets: Vec<RelationTarget>,
    pub total_count: usize,
    pub unique_base_labels: usize,
    pub suppressed: bool,
}

/// A label without trailing numbering or parentheticals, lowercased.
pub fn base_label(label: &str) -> String {
    let stripped = TRAILING_QUALIFIERS.replace(label, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        label.trim().to_lowercase()
    } else {
        stripped.to_lowercase()
    }
}

/// Summarize the outgoing FR edges of `uri`, ordered by FR id.
pub fn summarize(
    graph: &KnowledgeGraph,
    uri: &str,
    config: &SummaryConfig,
) -> GraphResult<Vec<RelationSummary>> {
    let idx = graph.require(uri)?;

    let mut grouped: BTreeMap<&str, (&str, BTreeSet<&str>)> = BTreeMap::new();
    for (target, fr_id, fr_label) in graph.fr_edges_from(idx) {
        grouped
            .entry(fr_id)
            .or_insert_with(|| (fr_label, BTreeSet::new()))
            .1
            .insert(graph.vertex_at(target).uri.as_str());
    }

    let sets: Vec<(&str, &BTreeSet<&str>)> =
        grouped.iter().map(|(id, (_, targets))| (*id, targets)).collect();
    let mut dropped: HashSet<&str> = HashSet::new();
    for &(id, targets) in &sets {
        let covered = sets.iter().any(|&(other, other_targets)| {
            other != id
                && other_targets.len() > targets.len()
                && targets.intersection(other_targets).count() as f64
                    > config.overlap_threshold * targets.len() as f64
        });
        if covered {
            tracing::debug!(entity = uri, fr = id, "dropping overlapping relation");
            dropped.insert(id);
        }
    }

    let summaries = grouped
        .into_iter()
        .filter(|(id, _)| !dropped.contains(id))
        .map(|(id, (label, uris))| {
            let mut targets: Vec<RelationTarget> = uris
                .into_iter()
                .map(|t| RelationTarget {
                    uri: t.to_string(),
                    label: graph.vertex(t).map(|v| v.label.clone()).unwrap_or_default(),
                })
                .collect();
            targets.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.uri.cmp(&b.uri)));
            let unique_base_labels = targets
                .iter()
                .map(|t| base_label(&t.label))
                .collect::<HashSet<_>>()
                .len();
            let total_count = targets.len();
            RelationSummary {
                fr_id: id.to_string(),
                label: label.to_string(),
                suppressed: unique_base_labels <= config.max_unique_base_labels
                    && total_count > config.min_total_for_suppression,
                targets,
                total_count,
                unique_base_labels,
            }
        })
        .collect();
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RdfTriple;

    fn graph_with(edges: &[(&str, &str, &str)]) -> KnowledgeGraph {
        let mut kg = KnowledgeGraph::new();
        for (_, _, target) in edges {
            kg.add_triples(&[RdfTriple::new("urn:e", "urn:p/rel", *target)]);
        }
        let e = kg.index_of("urn:e").unwrap();
        for (fr, label, target) in edges {
            let t = kg.index_of(target).unwrap();
            kg.add_fr_edge(e, fr, label, t);
        }
        kg
    }

    #[test]
    fn base_label_strips_numbering() {
        assert_eq!(base_label("Sherd 12"), "sherd");
        assert_eq!(base_label("Stele (fragment)"), "stele");
        assert_eq!(base_label("Vase #3 (detail)"), "vase");
        assert_eq!(base_label("1999"), "1999");
        assert_eq!(base_label("Parthenon"), "parthenon");
    }

    #[test]
    fn overlapping_smaller_relation_is_dropped() {
        let mut edges = Vec::new();
        let targets: Vec<String> = (0..6).map(|i| format!("urn:t{i}")).collect();
        for t in &targets {
            edges.push(("broad", "is related to", t.as_str()));
        }
        for t in &targets[..5] {
            edges.push(("narrow", "is part of", t.as_str()));
        }
        edges.push(("other", "was made by", "urn:maker"));
        let kg = graph_with(&edges);
        let out = summarize(&kg, "urn:e", &SummaryConfig::default()).unwrap();
        let ids: Vec<&str> = out.iter().map(|s| s.fr_id.as_str()).collect();
        assert_eq!(ids, vec!["broad", "other"]);
    }

    #[test]
    fn repetitive_labels_are_suppressed() {
        let uris: Vec<String> = (1..=6).map(|i| format!("urn:sherd/{i}")).collect();
        let edges: Vec<(&str, &str, &str)> =
            uris.iter().map(|u| ("has_part", "has part", u.as_str())).collect();
        let mut kg = graph_with(&edges);
        kg.add_triples(
            &uris
                .iter()
                .enumerate()
                .map(|(i, u)| RdfTriple::new("urn:x", "urn:p/rel", u.as_str()).with_labels("X", &format!("Sherd {i}")))
                .collect::<Vec<_>>(),
        );
        let out = summarize(&kg, "urn:e", &SummaryConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].total_count, 6);
        assert_eq!(out[0].unique_base_labels, 1);
        assert!(out[0].suppressed);
    }

    #[test]
    fn unknown_entity_errors() {
        let kg = KnowledgeGraph::new();
        assert!(summarize(&kg, "urn:nope", &SummaryConfig::default()).is_err());
    }
}
