//! Engine facade: top-level API for building graphs and ranking documents.
//!
//! The `Engine` owns the immutable configuration and the published graph.
//! `build` runs the single-writer materialization pass and publishes the
//! result; `retrieve` runs fusion, adjacency and ranking against whatever
//! graph is current when the call starts.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{OntologyConfig, RetrievalConfig};
use crate::error::{RankError, RetrievalResult};
use crate::fr::summary::{RelationSummary, summarize};
use crate::fr::{MaterializeReport, Materializer};
use crate::graph::{FundamentalCategory, KnowledgeGraph};
use crate::retrieve::{
    AdjacencyMatrix, DocNode, RankOutcome, SubgraphRanker, blend_authority, doc_nodes,
    infer_categories, reciprocal_rank_fusion,
};
use crate::sources::{EmbeddingSource, RetrievalIndex, TripleSource, TypeSource, ingest};
use crate::store::{GraphHandle, load_snapshot, save_snapshot};

/// One retrieval request.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub question: String,
    pub k: usize,
    /// Target categories for the boost; inferred from the question when `None`.
    pub categories: Option<Vec<FundamentalCategory>>,
}

impl RetrievalRequest {
    pub fn new(question: impl Into<String>, k: usize) -> Self {
        Self {
            question: question.into(),
            k,
            categories: None,
        }
    }

    pub fn with_categories(mut self, categories: Vec<FundamentalCategory>) -> Self {
        self.categories = Some(categories);
        self
    }
}

/// Selected documents with the ranking details.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    /// Selected documents in pick order.
    pub documents: Vec<DocNode>,
    pub outcome: RankOutcome,
    pub categories: Vec<FundamentalCategory>,
    /// Candidates that entered ranking.
    pub pool: usize,
}

/// The graph-guided retrieval engine.
pub struct Engine {
    ontology: Arc<OntologyConfig>,
    config: Arc<RetrievalConfig>,
    graph: GraphHandle,
}

impl Engine {
    /// Create an engine with an empty graph.
    pub fn new(ontology: OntologyConfig, config: RetrievalConfig) -> RetrievalResult<Self> {
        config.validate()?;
        tracing::info!(
            relationships = ontology.relationships().len(),
            workers = config.build.workers,
            "initializing retrieval engine"
        );
        Ok(Self {
            ontology: Arc::new(ontology),
            config: Arc::new(config),
            graph: GraphHandle::default(),
        })
    }

    /// Load the ontology directory and an optional `retrieval.toml`.
    pub fn open(ontology_dir: &Path, config_path: Option<&Path>) -> RetrievalResult<Self> {
        let ontology = OntologyConfig::load_dir(ontology_dir)?;
        let config = match config_path {
            Some(path) => RetrievalConfig::load(path)?,
            None => RetrievalConfig::default(),
        };
        Self::new(ontology, config)
    }

    pub fn ontology(&self) -> &OntologyConfig {
        &self.ontology
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The currently published graph.
    pub fn graph(&self) -> Arc<KnowledgeGraph> {
        self.graph.current()
    }

    /// Build a fresh graph without publishing it.
    pub fn build_graph(
        &self,
        triples: &mut dyn TripleSource,
        types: Option<&dyn TypeSource>,
    ) -> RetrievalResult<(KnowledgeGraph, MaterializeReport)> {
        let mut graph = KnowledgeGraph::with_labels(self.graph().labels().clone());
        let added = ingest(triples, &mut graph)?;
        tracing::info!(rdf_edges = added, vertices = graph.vertex_count(), "loaded triples");
        let materializer = Materializer::new(Arc::clone(&self.ontology), self.config.build.clone());
        let report = materializer.materialize(&mut graph, types)?;
        Ok((graph, report))
    }

    /// Build a fresh graph and publish it.
    pub fn build(
        &self,
        triples: &mut dyn TripleSource,
        types: Option<&dyn TypeSource>,
    ) -> RetrievalResult<MaterializeReport> {
        let (graph, report) = self.build_graph(triples, types)?;
        self.graph.publish(graph);
        Ok(report)
    }

    /// Publish an already built graph.
    pub fn publish(&self, graph: KnowledgeGraph) -> u64 {
        self.graph.publish(graph)
    }

    /// Save the current graph as a snapshot.
    pub fn save(&self, path: &Path) -> RetrievalResult<()> {
        Ok(save_snapshot(&self.graph(), path)?)
    }

    /// Load a snapshot and publish it.
    pub fn load(&self, path: &Path) -> RetrievalResult<u64> {
        let graph = load_snapshot(path)?;
        Ok(self.graph.publish(graph))
    }

    /// FR relations of one entity, with the configured presentation heuristics.
    pub fn relations(&self, uri: &str) -> RetrievalResult<Vec<RelationSummary>> {
        Ok(summarize(&self.graph(), uri, &self.config.summary)?)
    }

    /// Query both indexes, fuse, and rank.
    pub fn retrieve(
        &self,
        request: &RetrievalRequest,
        dense: &dyn RetrievalIndex,
        sparse: &dyn RetrievalIndex,
        embeddings: Option<&dyn EmbeddingSource>,
    ) -> RetrievalResult<Retrieval> {
        let depth = self.config.fusion.list_depth;
        let lists = vec![
            query_index(dense, &request.question, depth)?,
            query_index(sparse, &request.question, depth)?,
        ];
        tracing::debug!(
            dense = lists[0].len(),
            sparse = lists[1].len(),
            "retrieved candidate lists"
        );
        let fused = reciprocal_rank_fusion(&lists, self.config.fusion.rrf_k, self.config.fusion.pool_size);
        let categories = request
            .categories
            .clone()
            .unwrap_or_else(|| infer_categories(&request.question));
        self.rank_candidates(&fused, request.k, &categories, embeddings)
    }

    /// Rank an already fused candidate list against the current graph.
    pub fn rank_candidates(
        &self,
        fused: &[(String, f64)],
        k: usize,
        categories: &[FundamentalCategory],
        embeddings: Option<&dyn EmbeddingSource>,
    ) -> RetrievalResult<Retrieval> {
        let graph = self.graph();
        let mut candidates = doc_nodes(&graph, fused, embeddings);
        blend_authority(&mut candidates, self.config.ranking.authority_weight);

        let ids: Vec<String> = candidates.iter().map(|d| d.id.clone()).collect();
        let adjacency = AdjacencyMatrix::build(&graph, &ids, &self.config.adjacency);
        let ranker = SubgraphRanker::new(self.config.ranking.clone());
        let outcome = ranker.rank(&candidates, &adjacency, k, categories)?;

        let documents = outcome
            .selected
            .iter()
            .filter_map(|id| candidates.iter().find(|d| &d.id == id).cloned())
            .collect();
        tracing::info!(
            pool = candidates.len(),
            selected = outcome.selected.len(),
            exhausted = outcome.exhausted,
            "retrieved documents"
        );
        Ok(Retrieval {
            documents,
            outcome,
            categories: categories.to_vec(),
            pool: candidates.len(),
        })
    }

    /// Counts describing the current graph.
    pub fn info(&self) -> EngineInfo {
        let graph = self.graph();
        let mut categories = BTreeMap::new();
        let mut documents = 0;
        for idx in graph.vertex_indices() {
            let v = graph.vertex_at(idx);
            if let Some(c) = v.category {
                *categories.entry(c).or_insert(0) += 1;
            }
            if v.is_document {
                documents += 1;
            }
        }
        EngineInfo {
            generation: self.graph.generation(),
            vertices: graph.vertex_count(),
            rdf_edges: graph.rdf_edge_count(),
            fr_edges: graph.fr_edge_count(),
            documents,
            relationships: self.ontology.relationships().len(),
            categories,
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("relationships", &self.ontology.relationships().len())
            .field("generation", &self.graph.generation())
            .finish()
    }
}

/// Summary information about the engine's current graph.
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub generation: u64,
    pub vertices: usize,
    pub rdf_edges: usize,
    pub fr_edges: usize,
    pub documents: usize,
    pub relationships: usize,
    pub categories: BTreeMap<FundamentalCategory, usize>,
}

impl fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "crm-retrieval graph info")?;
        writeln!(f, "  generation:    {}", self.generation)?;
        writeln!(f, "  vertices:      {}", self.vertices)?;
        writeln!(f, "  rdf edges:     {}", self.rdf_edges)?;
        writeln!(f, "  fr edges:      {}", self.fr_edges)?;
        writeln!(f, "  documents:     {}", self.documents)?;
        writeln!(f, "  relationships: {}", self.relationships)?;
        for (category, count) in &self.categories {
            writeln!(f, "  {:<14} {count}", format!("{category}:"))?;
        }
        Ok(())
    }
}

/// Query one candidate index, naming it in any failure.
fn query_index(
    index: &dyn RetrievalIndex,
    text: &str,
    k: usize,
) -> Result<Vec<(String, f64)>, RankError> {
    index.query(text, k).map_err(|e| {
        tracing::warn!(index = index.name(), error = %e, "candidate index failed");
        RankError::Index {
            index: index.name().to_string(),
            message: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::fr::{FrDefinition, PropertyPath, Step};
    use crate::graph::{RDF_TYPE, RdfTriple};
    use crate::sources::{StaticIndex, VecTripleSource};

    const CRM: &str = "http://www.cidoc-crm.org/cidoc-crm/";

    fn engine() -> Engine {
        let fr = FrDefinition::new(
            "place_in_place",
            "is located in",
            FundamentalCategory::Place,
            Some(FundamentalCategory::Place),
            vec![PropertyPath::new("p", vec![Step::new("P89_falls_within", true)])],
        );
        let classes = HashMap::from([("Place".to_string(), vec!["E53_Place".to_string()])]);
        let ontology = OntologyConfig::new(vec![fr], HashMap::new(), classes, HashMap::new()).unwrap();
        Engine::new(ontology, RetrievalConfig::default()).unwrap()
    }

    fn triples() -> VecTripleSource {
        let mut t = Vec::new();
        for uri in ["urn:athens", "urn:attica", "urn:greece"] {
            t.push(RdfTriple::new(uri, RDF_TYPE, format!("{CRM}E53_Place")));
        }
        t.push(RdfTriple::new("urn:athens", format!("{CRM}P89_falls_within"), "urn:attica"));
        t.push(RdfTriple::new("urn:attica", format!("{CRM}P89_falls_within"), "urn:greece"));
        VecTripleSource::new(t, 2)
    }

    struct Offline;

    impl RetrievalIndex for Offline {
        fn name(&self) -> &str {
            "sparse-bm25"
        }

        fn query(&self, _text: &str, _k: usize) -> Result<Vec<(String, f64)>, RankError> {
            Err(RankError::Source {
                message: "connection refused".into(),
            })
        }
    }

    #[test]
    fn failing_index_is_named_in_the_error() {
        let engine = engine();
        engine.build(&mut triples(), None).unwrap();
        let dense = StaticIndex::new("dense", vec![("urn:athens".into(), 0.9)]);
        let request = RetrievalRequest::new("Where is Athens?", 2);
        let err = engine.retrieve(&request, &dense, &Offline, None).unwrap_err();
        match err {
            crate::error::RetrievalError::Rank(RankError::Index { index, message }) => {
                assert_eq!(index, "sparse-bm25");
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rebuild_keeps_labels_learned_earlier() {
        let engine = engine();
        let labeled = vec![
            RdfTriple::new("urn:athens", format!("{CRM}P89_falls_within"), "urn:attica")
                .with_labels("Athens", "Attica"),
        ];
        engine.build(&mut VecTripleSource::new(labeled, 4), None).unwrap();
        assert_eq!(engine.graph().vertex("urn:athens").unwrap().label, "Athens");

        engine.build(&mut triples(), None).unwrap();
        let graph = engine.graph();
        assert_eq!(graph.vertex("urn:athens").unwrap().label, "Athens");
        assert_eq!(graph.vertex("urn:attica").unwrap().label, "Attica");
        assert_eq!(graph.vertex("urn:greece").unwrap().label, "urn:greece");
    }

    #[test]
    fn build_publishes_graph() {
        let engine = engine();
        assert_eq!(engine.info().vertices, 0);
        let report = engine.build(&mut triples(), None).unwrap();
        assert_eq!(report.fr_edges, 3);
        let info = engine.info();
        assert_eq!(info.generation, 1);
        assert_eq!(info.fr_edges, 3);
        assert_eq!(info.categories.get(&FundamentalCategory::Place), Some(&3));
        assert!(format!("{info}").contains("fr edges:      3"));
    }

    #[test]
    fn retrieve_fuses_and_ranks() {
        let engine = engine();
        engine.build(&mut triples(), None).unwrap();
        let dense = StaticIndex::new("dense", vec![("urn:athens".into(), 0.9), ("urn:attica".into(), 0.8)]);
        let sparse = StaticIndex::new("sparse", vec![("urn:athens".into(), 3.0), ("urn:greece".into(), 2.0)]);
        let request = RetrievalRequest::new("Where is Athens?", 2);
        let result = engine.retrieve(&request, &dense, &sparse, None).unwrap();
        assert_eq!(result.categories, vec![FundamentalCategory::Place]);
        assert_eq!(result.pool, 3);
        assert_eq!(result.outcome.selected.len(), 2);
        assert_eq!(result.outcome.selected[0], "urn:athens");
        assert_eq!(result.documents[0].category, Some(FundamentalCategory::Place));
    }

    #[test]
    fn relations_of_unknown_entity_fail() {
        let engine = engine();
        assert!(engine.relations("urn:nowhere").is_err());
    }
}
