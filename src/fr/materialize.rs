//! Graph materialization: categories, FR edges, authority scores.
//!
//! Runs after all RDF triples are loaded. Category assignment and the final
//! merge are single-threaded; per-FR path matching fans out over a rayon
//! pool against the read-only graph.

use std::sync::Arc;

use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::OntologyConfig;
use crate::error::{GraphError, RetrievalResult};
use crate::graph::KnowledgeGraph;
use crate::graph::analytics::{PageRankConfig, apply_pagerank, fr_pagerank};
use crate::sources::{TypeSource, rdf_types};

use super::matcher::{FrMatcher, FrMatches};

/// Build-phase settings (`[build]` in `retrieval.toml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Worker threads for FR matching; 0 lets rayon decide.
    pub workers: usize,
    pub pagerank: PageRankConfig,
}

/// Per-FR outcome of a build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipStats {
    pub fr_id: String,
    pub sources_considered: usize,
    pub sources_matched: usize,
    pub edges_added: usize,
}

/// What a materialization pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterializeReport {
    pub categorized: usize,
    pub documents: usize,
    pub relationships: Vec<RelationshipStats>,
    pub fr_edges: usize,
    pub ranked_vertices: usize,
    pub pagerank_iterations: usize,
    pub pagerank_converged: bool,
}

/// Turns an RDF-only graph into one with categories, FR edges and PageRank.
pub struct Materializer {
    ontology: Arc<OntologyConfig>,
    config: BuildConfig,
}

impl Materializer {
    pub fn new(ontology: Arc<OntologyConfig>, config: BuildConfig) -> Self {
        Self { ontology, config }
    }

    pub fn ontology(&self) -> &OntologyConfig {
        &self.ontology
    }

    /// Assign type tags, categories and document flags.
    ///
    /// Without a type source, types come from the graph's own `rdf:type`
    /// edges. Returns (vertices given a category, vertices marked as documents).
    pub fn assign_categories(
        &self,
        graph: &mut KnowledgeGraph,
        types: Option<&dyn TypeSource>,
    ) -> (usize, usize) {
        let collected: Vec<(NodeIndex, Vec<String>)> = graph
            .vertex_indices()
            .map(|idx| {
                let raw = match types {
                    Some(source) => source.types_of(&graph.vertex_at(idx).uri),
                    None => rdf_types(graph, idx),
                };
                let mut names: Vec<String> = raw
                    .iter()
                    .map(|t| crate::graph::local_name(t).to_string())
                    .collect();
                names.sort();
                names.dedup();
                (idx, names)
            })
            .collect();

        let mut categorized = 0;
        let mut documents = 0;
        for (idx, names) in collected {
            let matched = self.ontology.get_fc(&names);
            let categories = self.ontology.categories_of(&names);
            let vertex = graph.vertex_mut(idx);
            for category in categories {
                if !vertex.categories.contains(&category) {
                    vertex.categories.push(category);
                }
            }
            vertex.categories.sort();
            for name in names {
                if !vertex.types.contains(&name) {
                    vertex.types.push(name);
                }
            }
            let Some(matched) = matched else {
                continue;
            };
            if vertex.upgrade_category(matched.category) {
                vertex.doc_type = Some(matched.class);
                categorized += 1;
            } else if vertex.doc_type.is_none() {
                vertex.doc_type = Some(matched.class);
            }
            if !vertex.is_document {
                vertex.is_document = true;
                documents += 1;
            }
        }
        tracing::debug!(categorized, documents, "assigned fundamental categories");
        (categorized, documents)
    }

    /// Run every FR's matcher in parallel. Results keep configuration order.
    pub fn match_relationships(&self, graph: &KnowledgeGraph) -> RetrievalResult<Vec<FrMatches>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| GraphError::Build {
                message: format!("worker pool: {e}"),
            })?;
        let hierarchy = self.ontology.hierarchy();
        let matches = pool.install(|| {
            self.ontology
                .relationships()
                .par_iter()
                .map(|def| {
                    let found = FrMatcher::new(def, graph, hierarchy).match_all();
                    tracing::debug!(
                        fr = %def.id,
                        sources = found.sources_considered,
                        edges = found.edge_count(),
                        "matched relationship"
                    );
                    found
                })
                .collect()
        });
        Ok(matches)
    }

    /// Full pass: categories, FR edges, PageRank.
    pub fn materialize(
        &self,
        graph: &mut KnowledgeGraph,
        types: Option<&dyn TypeSource>,
    ) -> RetrievalResult<MaterializeReport> {
        let (categorized, documents) = self.assign_categories(graph, types);
        let matches = self.match_relationships(graph)?;

        let mut relationships = Vec::with_capacity(matches.len());
        let mut fr_edges = 0;
        for (def, found) in self.ontology.relationships().iter().zip(matches) {
            let mut edges_added = 0;
            for (source, targets) in &found.pairs {
                for &target in targets {
                    if graph.add_fr_edge(*source, &def.id, &def.label, target) {
                        edges_added += 1;
                    }
                }
            }
            fr_edges += edges_added;
            relationships.push(RelationshipStats {
                fr_id: found.fr_id,
                sources_considered: found.sources_considered,
                sources_matched: found.pairs.len(),
                edges_added,
            });
        }

        let pagerank = fr_pagerank(graph, &self.config.pagerank);
        apply_pagerank(graph, &pagerank);

        tracing::info!(
            vertices = graph.vertex_count(),
            rdf_edges = graph.rdf_edge_count(),
            fr_edges,
            pagerank_iterations = pagerank.iterations,
            "materialized knowledge graph"
        );

        Ok(MaterializeReport {
            categorized,
            documents,
            relationships,
            fr_edges,
            ranked_vertices: pagerank.scores.len(),
            pagerank_iterations: pagerank.iterations,
            pagerank_converged: pagerank.converged,
        })
    }
}
