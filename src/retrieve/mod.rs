//! Query-time ranking: fusion, candidate adjacency, coherent selection.
//!
//! - [`fusion`]: Reciprocal Rank Fusion of the dense and sparse lists
//! - [`adjacency`]: weighted, normalized document graph over the candidates
//! - [`ranker`]: greedy relevance / connectivity / diversity selection
//! - [`query`]: question → target categories for the category boost

pub mod adjacency;
pub mod fusion;
pub mod query;
pub mod ranker;

use serde::{Deserialize, Serialize};

use crate::graph::{FundamentalCategory, KnowledgeGraph, local_name};
use crate::sources::EmbeddingSource;

pub use adjacency::{AdjacencyConfig, AdjacencyMatrix};
pub use fusion::{FusionConfig, reciprocal_rank_fusion};
pub use query::infer_categories;
pub use ranker::{RankOutcome, RankingConfig, SubgraphRanker};

/// One candidate document for a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    /// Vertex URI.
    pub id: String,
    pub label: String,
    /// rdf:type local names.
    pub types: Vec<String>,
    pub category: Option<FundamentalCategory>,
    /// All categories of the vertex, including `category`.
    pub categories: Vec<FundamentalCategory>,
    pub embedding: Option<Vec<f32>>,
    /// PageRank of the vertex, 0 when unknown.
    pub authority: f64,
    /// Fused relevance score.
    pub relevance: f64,
}

impl DocNode {
    pub fn new(id: impl Into<String>, relevance: f64) -> Self {
        let id = id.into();
        Self {
            label: local_name(&id).to_string(),
            id,
            types: Vec::new(),
            category: None,
            categories: Vec::new(),
            embedding: None,
            authority: 0.0,
            relevance,
        }
    }

    /// Fill metadata from the graph vertex, if there is one.
    pub fn from_graph(graph: &KnowledgeGraph, id: &str, relevance: f64) -> Self {
        let mut doc = Self::new(id, relevance);
        match graph.vertex(id) {
            Some(v) => {
                doc.label = v.label.clone();
                doc.types = v.types.clone();
                doc.category = v.category;
                doc.categories = v.categories.clone();
                doc.authority = v.pagerank;
            }
            None => tracing::debug!(doc = id, "candidate has no graph vertex"),
        }
        doc
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Build candidate documents from fused `(id, score)` pairs.
pub fn doc_nodes(
    graph: &KnowledgeGraph,
    fused: &[(String, f64)],
    embeddings: Option<&dyn EmbeddingSource>,
) -> Vec<DocNode> {
    fused
        .iter()
        .map(|(id, score)| {
            let mut doc = DocNode::from_graph(graph, id, *score);
            doc.embedding = embeddings.and_then(|e| e.embedding_of(id));
            doc
        })
        .collect()
}

/// Blend vertex authority into relevance:
/// `relevance * (1 + weight * authority / max_authority)`, max taken over
/// the candidates. No-op when no candidate has authority.
pub fn blend_authority(docs: &mut [DocNode], weight: f64) {
    let max = docs.iter().map(|d| d.authority).fold(0.0_f64, f64::max);
    if max <= 0.0 || weight == 0.0 {
        return;
    }
    for doc in docs {
        doc.relevance *= 1.0 + weight * doc.authority / max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RdfTriple;
    use crate::sources::EmbeddingMap;

    #[test]
    fn doc_nodes_pull_vertex_metadata() {
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[RdfTriple::new("urn:a", "urn:p/rel", "urn:b").with_labels("Alpha", "Beta")]);
        let mut embeddings = EmbeddingMap::default();
        embeddings.insert("urn:a", vec![1.0, 0.0]);
        let fused = vec![("urn:a".to_string(), 0.5), ("urn:zzz".to_string(), 0.4)];
        let docs = doc_nodes(&kg, &fused, Some(&embeddings));
        assert_eq!(docs[0].label, "Alpha");
        assert!(docs[0].embedding.is_some());
        assert_eq!(docs[1].label, "urn:zzz");
        assert!(docs[1].embedding.is_none());
    }

    #[test]
    fn authority_blend_scales_by_max() {
        let mut docs = vec![DocNode::new("a", 1.0), DocNode::new("b", 1.0), DocNode::new("c", 1.0)];
        docs[0].authority = 0.4;
        docs[1].authority = 0.2;
        blend_authority(&mut docs, 0.1);
        assert!((docs[0].relevance - 1.1).abs() < 1e-12);
        assert!((docs[1].relevance - 1.05).abs() < 1e-12);
        assert_eq!(docs[2].relevance, 1.0);
    }

    #[test]
    fn authority_blend_without_scores_is_noop() {
        let mut docs = vec![DocNode::new("a", 0.7)];
        blend_authority(&mut docs, 0.1);
        assert_eq!(docs[0].relevance, 0.7);
    }
}
