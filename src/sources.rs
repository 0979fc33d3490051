//! Collaborator interfaces and their file-backed implementations.
//!
//! The engine never talks to a triple store, an embedding model or a
//! vector index directly; it consumes these traits. The implementations here
//! read local JSON / JSON Lines files and are what the CLI and tests use.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use petgraph::graph::NodeIndex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{RankError, RetrievalResult, StoreError};
use crate::graph::{KnowledgeGraph, RDF_TYPE, RdfTriple};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Yields batches of labeled triples.
pub trait TripleSource {
    /// The next batch, or `None` once exhausted.
    fn next_batch(&mut self) -> RetrievalResult<Option<Vec<RdfTriple>>>;
}

/// Maps a vertex URI to its `rdf:type` URIs.
pub trait TypeSource {
    fn types_of(&self, uri: &str) -> Vec<String>;
}

/// A dense or sparse top-k candidate index.
pub trait RetrievalIndex: Send + Sync {
    fn name(&self) -> &str;
    fn query(&self, text: &str, k: usize) -> Result<Vec<(String, f64)>, RankError>;
}

/// Document embeddings for the diversity penalty.
pub trait EmbeddingSource: Send + Sync {
    fn embedding_of(&self, doc_id: &str) -> Option<Vec<f32>>;
}

fn read_json<T: DeserializeOwned>(path: &Path) -> RetrievalResult<T> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        RankError::Source {
            message: format!("{}: {e}", path.display()),
        }
        .into()
    })
}

// ---------------------------------------------------------------------------
// Triples
// ---------------------------------------------------------------------------

/// Reads one JSON triple object per line. Blank lines and `#` comments are skipped.
pub struct JsonlTripleSource<R> {
    reader: R,
    origin: String,
    batch_size: usize,
    line: usize,
    done: bool,
}

impl JsonlTripleSource<BufReader<File>> {
    pub fn open(path: &Path, batch_size: usize) -> RetrievalResult<Self> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
            batch_size,
        ))
    }
}

impl<R: BufRead> JsonlTripleSource<R> {
    pub fn from_reader(reader: R, origin: impl Into<String>, batch_size: usize) -> Self {
        Self {
            reader,
            origin: origin.into(),
            batch_size: batch_size.max(1),
            line: 0,
            done: false,
        }
    }
}

impl<R: BufRead> TripleSource for JsonlTripleSource<R> {
    fn next_batch(&mut self) -> RetrievalResult<Option<Vec<RdfTriple>>> {
        if self.done {
            return Ok(None);
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut buf = String::new();
        while batch.len() < self.batch_size {
            buf.clear();
            let read = self.reader.read_line(&mut buf).map_err(|source| StoreError::Io {
                path: self.origin.clone(),
                source,
            })?;
            if read == 0 {
                self.done = true;
                break;
            }
            self.line += 1;
            let text = buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let triple: RdfTriple = serde_json::from_str(text).map_err(|e| RankError::Source {
                message: format!("{}:{}: {e}", self.origin, self.line),
            })?;
            batch.push(triple);
        }
        Ok(if batch.is_empty() { None } else { Some(batch) })
    }
}

/// In-memory triples, handed out in fixed-size chunks.
pub struct VecTripleSource {
    triples: Vec<RdfTriple>,
    batch_size: usize,
}

impl VecTripleSource {
    pub fn new(triples: Vec<RdfTriple>, batch_size: usize) -> Self {
        Self {
            triples,
            batch_size: batch_size.max(1),
        }
    }
}

impl TripleSource for VecTripleSource {
    fn next_batch(&mut self) -> RetrievalResult<Option<Vec<RdfTriple>>> {
        if self.triples.is_empty() {
            return Ok(None);
        }
        let take = self.batch_size.min(self.triples.len());
        Ok(Some(self.triples.drain(..take).collect()))
    }
}

/// Several sources read one after another.
pub struct ChainedSource {
    sources: VecDeque<Box<dyn TripleSource>>,
}

impl ChainedSource {
    pub fn new(sources: Vec<Box<dyn TripleSource>>) -> Self {
        Self {
            sources: sources.into(),
        }
    }
}

impl TripleSource for ChainedSource {
    fn next_batch(&mut self) -> RetrievalResult<Option<Vec<RdfTriple>>> {
        while let Some(source) = self.sources.front_mut() {
            if let Some(batch) = source.next_batch()? {
                return Ok(Some(batch));
            }
            self.sources.pop_front();
        }
        Ok(None)
    }
}

/// Drain a source into the graph. Returns the number of new RDF edges.
pub fn ingest(source: &mut dyn TripleSource, graph: &mut KnowledgeGraph) -> RetrievalResult<usize> {
    let mut added = 0;
    let mut batches = 0;
    while let Some(batch) = source.next_batch()? {
        added += graph.add_triples(&batch);
        batches += 1;
        tracing::trace!(batch = batches, size = batch.len(), "ingested triple batch");
    }
    tracing::debug!(batches, added, "ingested triples");
    Ok(added)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The graph's own `rdf:type` objects for one vertex, as URIs.
pub fn rdf_types(graph: &KnowledgeGraph, idx: NodeIndex) -> Vec<String> {
    graph
        .objects_of(idx, RDF_TYPE)
        .into_iter()
        .map(|t| graph.vertex_at(t).uri.clone())
        .collect()
}

/// Type source backed by the graph's `rdf:type` edges.
pub struct RdfTypeSource<'g> {
    graph: &'g KnowledgeGraph,
}

impl<'g> RdfTypeSource<'g> {
    pub fn new(graph: &'g KnowledgeGraph) -> Self {
        Self { graph }
    }
}

impl TypeSource for RdfTypeSource<'_> {
    fn types_of(&self, uri: &str) -> Vec<String> {
        self.graph
            .index_of(uri)
            .map(|idx| rdf_types(self.graph, idx))
            .unwrap_or_default()
    }
}

/// URI → type URIs, loadable from a JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeMap {
    types: HashMap<String, Vec<String>>,
}

impl TypeMap {
    pub fn load(path: &Path) -> RetrievalResult<Self> {
        read_json(path)
    }

    pub fn insert(&mut self, uri: impl Into<String>, types: impl IntoIterator<Item = String>) {
        self.types.entry(uri.into()).or_default().extend(types);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeSource for TypeMap {
    fn types_of(&self, uri: &str) -> Vec<String> {
        self.types.get(uri).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Candidate indexes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Hit {
    id: String,
    score: f64,
}

/// A precomputed ranked list; the query text is ignored.
#[derive(Debug, Clone)]
pub struct StaticIndex {
    name: String,
    hits: Vec<(String, f64)>,
}

impl StaticIndex {
    /// `hits` must already be in rank order.
    pub fn new(name: impl Into<String>, hits: Vec<(String, f64)>) -> Self {
        Self {
            name: name.into(),
            hits,
        }
    }

    /// Load a JSON array of `{"id": ..., "score": ...}` in rank order.
    pub fn load(name: impl Into<String>, path: &Path) -> RetrievalResult<Self> {
        let hits: Vec<Hit> = read_json(path)?;
        Ok(Self::new(name, hits.into_iter().map(|h| (h.id, h.score)).collect()))
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl RetrievalIndex for StaticIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, _text: &str, k: usize) -> Result<Vec<(String, f64)>, RankError> {
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// Document id → embedding vector, loadable from a JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingMap {
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingMap {
    pub fn load(path: &Path) -> RetrievalResult<Self> {
        read_json(path)
    }

    pub fn insert(&mut self, doc_id: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(doc_id.into(), vector);
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl EmbeddingSource for EmbeddingMap {
    fn embedding_of(&self, doc_id: &str) -> Option<Vec<f32>> {
        self.vectors.get(doc_id).cloned()
    }
}
