// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # crm-retrieval
//!
//! Graph-guided retrieval ranking over a CIDOC-CRM knowledge base.
//!
//! ## Architecture
//!
//! - **Knowledge graph** (`graph`): predicate-indexed petgraph multigraph,
//!   property families and inverses, PageRank over FR edges
//! - **Fundamental Relationships** (`fr`): step tries, path matching,
//!   materialization of FR shortcut edges, per-entity relation summaries
//! - **Retrieval** (`retrieve`): RRF fusion, candidate adjacency, coherent
//!   subgraph ranking
//! - **Snapshots** (`store`): versioned, compressed graph files and the
//!   atomically published graph handle
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use crm_retrieval::engine::{Engine, RetrievalRequest};
//! use crm_retrieval::sources::{JsonlTripleSource, StaticIndex};
//!
//! let engine = Engine::open(Path::new("ontology"), None).unwrap();
//! let mut triples = JsonlTripleSource::open(Path::new("triples.jsonl"), 10_000).unwrap();
//! engine.build(&mut triples, None).unwrap();
//!
//! let dense = StaticIndex::load("dense", Path::new("dense.json")).unwrap();
//! let sparse = StaticIndex::load("sparse", Path::new("sparse.json")).unwrap();
//! let request = RetrievalRequest::new("Who made the Parthenon frieze?", 5);
//! let result = engine.retrieve(&request, &dense, &sparse, None).unwrap();
//! for doc in &result.documents {
//!     println!("{} ({})", doc.label, doc.id);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fr;
pub mod graph;
pub mod label;
pub mod retrieve;
pub mod sources;
pub mod store;
