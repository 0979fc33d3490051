//! Rich diagnostic error types for the retrieval engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Only configuration
//! errors are fatal; traversal gaps, degenerate matrices, and missing
//! embeddings degrade gracefully inside the core and never reach this module.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the retrieval engine.
#[derive(Debug, Error, Diagnostic)]
pub enum RetrievalError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rank(#[from] RankError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration file: {path}")]
    #[diagnostic(
        code(crm::config::read),
        help(
            "Ensure the file exists and is readable. The ontology directory must contain \
             fundamental_relationships.json, inverse_properties.json and fc_class_mapping.json."
        )
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {message}")]
    #[diagnostic(
        code(crm::config::parse),
        help("Check the JSON/TOML syntax and that every field has the expected type.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write configuration file: {path}")]
    #[diagnostic(
        code(crm::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown fundamental category \"{name}\"")]
    #[diagnostic(
        code(crm::config::unknown_fc),
        help("Valid categories are: Thing, Actor, Place, Event, Concept, Time.")
    )]
    UnknownCategory { name: String },

    #[error("invalid fundamental relationship \"{fr_id}\": {message}")]
    #[diagnostic(
        code(crm::config::invalid_fr),
        help(
            "Every relationship needs a non-empty id, at least one path, \
             and every path at least one step with a property name."
        )
    )]
    InvalidRelationship { fr_id: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(crm::config::invalid), help("{message}"))]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("vertex not found: {uri}")]
    #[diagnostic(
        code(crm::graph::vertex_not_found),
        help(
            "The URI has no vertex in the knowledge graph. Vertices are created \
             from triples; check the URI spelling or rebuild the snapshot."
        )
    )]
    VertexNotFound { uri: String },

    #[error("graph build failed: {message}")]
    #[diagnostic(
        code(crm::graph::build),
        help("The materialization worker pool could not be created or a source failed.")
    )]
    Build { message: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(crm::store::io),
        help(
            "A filesystem operation failed. Check that the directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(crm::store::serde),
        help(
            "Failed to serialize or deserialize the snapshot. The file may be \
             truncated; rebuild it with `crm-retrieval build`."
        )
    )]
    Serialization { message: String },

    #[error("snapshot format version {found} is not supported (expected {expected})")]
    #[diagnostic(
        code(crm::store::version),
        help("The snapshot was written by a different release. Rebuild it from the source triples.")
    )]
    UnsupportedVersion { found: u32, expected: u32 },
}

// ---------------------------------------------------------------------------
// Ranking errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RankError {
    #[error("retrieval index \"{index}\" failed: {message}")]
    #[diagnostic(
        code(crm::rank::index),
        help("The dense or sparse candidate index returned an error. Check its backing files.")
    )]
    Index { index: String, message: String },

    #[error("collaborator source failed: {message}")]
    #[diagnostic(
        code(crm::rank::source),
        help("A triple, type, or embedding source could not be read.")
    )]
    Source { message: String },

    #[error("adjacency matrix covers {found} candidates, expected {expected}")]
    #[diagnostic(
        code(crm::rank::dimension),
        help("Build the adjacency matrix from the same candidate list that is passed to the ranker.")
    )]
    Dimension { expected: usize, found: usize },
}

/// Convenience alias for functions returning retrieval results.
pub type RetrievalResult<T> = std::result::Result<T, RetrievalError>;
