//! Knowledge graph: predicate-indexed multigraph of RDF and FR edges.
//!
//! - **Index** ([`KnowledgeGraph`]): `petgraph` storage plus per-vertex
//!   predicate maps for constant-time step lookups
//! - **Hierarchy** ([`PropertyHierarchy`]): sub-property families and inverses
//! - **Analytics**: PageRank restricted to materialized FR edges
//!
//! All layers share the data model defined here.

pub mod analytics;
pub mod hierarchy;
pub mod index;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use hierarchy::{PropertyFamily, PropertyHierarchy};
pub use index::{KnowledgeGraph, ResolvedPredicate};

/// `rdf:type` predicate URI.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Return the local name of a URI: the segment after the last `#` or `/`.
///
/// ```
/// use crm_retrieval::graph::local_name;
/// assert_eq!(local_name("http://www.cidoc-crm.org/cidoc-crm/P89_falls_within"), "P89_falls_within");
/// assert_eq!(local_name("plain"), "plain");
/// ```
pub fn local_name(uri: &str) -> &str {
    let trimmed = uri.trim_end_matches(['/', '#']);
    match trimmed.rfind(['#', '/']) {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

// ---------------------------------------------------------------------------
// Fundamental categories
// ---------------------------------------------------------------------------

/// Coarse semantic class of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FundamentalCategory {
    Thing,
    Actor,
    Place,
    Event,
    Concept,
    Time,
}

impl FundamentalCategory {
    pub const ALL: [FundamentalCategory; 6] = [
        FundamentalCategory::Thing,
        FundamentalCategory::Actor,
        FundamentalCategory::Place,
        FundamentalCategory::Event,
        FundamentalCategory::Concept,
        FundamentalCategory::Time,
    ];

    /// Assignment priority when an entity carries several typed classes.
    /// Actor > Event > Place > Concept > Time > Thing.
    pub fn priority(self) -> u8 {
        match self {
            FundamentalCategory::Actor => 6,
            FundamentalCategory::Event => 5,
            FundamentalCategory::Place => 4,
            FundamentalCategory::Concept => 3,
            FundamentalCategory::Time => 2,
            FundamentalCategory::Thing => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FundamentalCategory::Thing => "Thing",
            FundamentalCategory::Actor => "Actor",
            FundamentalCategory::Place => "Place",
            FundamentalCategory::Event => "Event",
            FundamentalCategory::Concept => "Concept",
            FundamentalCategory::Time => "Time",
        }
    }

    /// Pick the strongest category of the given candidates.
    pub fn strongest(
        categories: impl IntoIterator<Item = FundamentalCategory>,
    ) -> Option<FundamentalCategory> {
        categories.into_iter().max_by_key(|c| c.priority())
    }
}

impl fmt::Display for FundamentalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FundamentalCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FundamentalCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownCategory {
                name: s.to_string(),
            })
    }
}

impl TryFrom<String> for FundamentalCategory {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FundamentalCategory> for String {
    fn from(c: FundamentalCategory) -> Self {
        c.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Triples, vertices, edges
// ---------------------------------------------------------------------------

/// One labeled RDF statement as yielded by a triple source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdfTriple {
    pub subject: String,
    #[serde(default)]
    pub subject_label: Option<String>,
    pub predicate: String,
    #[serde(default)]
    pub predicate_label: Option<String>,
    pub object: String,
    #[serde(default)]
    pub object_label: Option<String>,
}

impl RdfTriple {
    /// Create an unlabeled triple.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            subject_label: None,
            predicate: predicate.into(),
            predicate_label: None,
            object: object.into(),
            object_label: None,
        }
    }

    /// Attach subject and object labels.
    pub fn with_labels(mut self, subject_label: &str, object_label: &str) -> Self {
        self.subject_label = Some(subject_label.to_string());
        self.object_label = Some(object_label.to_string());
        self
    }
}

/// Interned predicate handle. RDF predicates and FR ids live in separate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredicateId(pub u32);

/// Whether an edge came from the source data or from FR materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Rdf,
    Fr,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Rdf => f.write_str("rdf"),
            EdgeKind::Fr => f.write_str("fr"),
        }
    }
}

/// Edge payload stored on petgraph edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub kind: EdgeKind,
    /// Index into the predicate table for `kind`.
    pub predicate: PredicateId,
    pub weight: f64,
}

/// Vertex payload stored on petgraph nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexData {
    pub uri: String,
    pub label: String,
    /// True once `label` came from the data rather than a URI heuristic.
    pub label_explicit: bool,
    pub category: Option<FundamentalCategory>,
    /// Every category the vertex's types map to; `category` is the strongest.
    pub categories: Vec<FundamentalCategory>,
    pub is_document: bool,
    pub doc_type: Option<String>,
    /// rdf:type local names.
    pub types: Vec<String>,
    pub pagerank: f64,
}

impl VertexData {
    pub(crate) fn new(uri: &str, label: String, label_explicit: bool) -> Self {
        Self {
            uri: uri.to_string(),
            label,
            label_explicit,
            category: None,
            categories: Vec::new(),
            is_document: false,
            doc_type: None,
            types: Vec::new(),
            pagerank: 0.0,
        }
    }

    /// Raise the category if `candidate` outranks the current one.
    /// Returns whether the category changed.
    pub fn upgrade_category(&mut self, candidate: FundamentalCategory) -> bool {
        match self.category {
            Some(current) if current.priority() >= candidate.priority() => false,
            _ => {
                self.category = Some(candidate);
                true
            }
        }
    }
}

/// A resolved, owned view of one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    /// Full predicate URI for RDF edges, FR id for FR edges.
    pub predicate: String,
    pub label: String,
    pub weight: f64,
}
