//! Fundamental Relationships: curated property-path shortcuts between
//! fundamental categories.
//!
//! - [`trie`]: per-FR prefix tree over path steps
//! - [`matcher`]: walks the trie over the predicate-indexed graph
//! - [`materialize`]: builds FR edges, categories and PageRank for a graph
//! - [`summary`]: per-entity FR listings with presentation heuristics

pub mod matcher;
pub mod materialize;
pub mod summary;
pub mod trie;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::{FundamentalCategory, local_name};

pub use matcher::FrMatcher;
pub use materialize::{BuildConfig, MaterializeReport, Materializer};
pub use trie::StepTrie;

/// One predicate hop in a property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    /// Predicate local name (full URIs are reduced on validation).
    #[serde(alias = "predicate")]
    pub property: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
    /// Zero-or-more repetitions of this predicate.
    #[serde(default)]
    pub recursive: bool,
}

impl Step {
    pub fn new(property: impl Into<String>, recursive: bool) -> Self {
        Self {
            property: property.into(),
            domain: None,
            range: None,
            recursive,
        }
    }
}

/// An ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyPath {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

impl PropertyPath {
    pub fn new(id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            steps,
        }
    }
}

/// A Fundamental Relationship definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrDefinition {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub domain_fc: FundamentalCategory,
    #[serde(default)]
    pub range_fc: Option<FundamentalCategory>,
    #[serde(default)]
    pub domain_class: Option<String>,
    #[serde(default)]
    pub range_class: Option<String>,
    pub paths: Vec<PropertyPath>,
}

impl FrDefinition {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        domain_fc: FundamentalCategory,
        range_fc: Option<FundamentalCategory>,
        paths: Vec<PropertyPath>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            domain_fc,
            range_fc,
            domain_class: None,
            range_class: None,
            paths,
        }
    }

    /// Check structure and reduce step properties to local names.
    pub fn normalize(mut self) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidRelationship {
            fr_id: self.id.clone(),
            message: message.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if self.paths.is_empty() {
            return Err(invalid("no paths"));
        }
        if self.paths.iter().any(|p| p.steps.is_empty()) {
            return Err(invalid("a path has no steps"));
        }
        if self
            .paths
            .iter()
            .flat_map(|p| &p.steps)
            .any(|s| s.property.trim().is_empty())
        {
            return Err(invalid("a step has an empty property"));
        }
        for step in self.paths.iter_mut().flat_map(|p| p.steps.iter_mut()) {
            step.property = local_name(step.property.trim()).to_string();
        }
        if self.label.is_empty() {
            self.label = self.id.replace('_', " ");
        }
        Ok(self)
    }
}

/// Validate a full relationship list: each entry plus id uniqueness.
pub fn normalize_all(definitions: Vec<FrDefinition>) -> Result<Vec<FrDefinition>, ConfigError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(definitions.len());
    for def in definitions {
        let def = def.normalize()?;
        if !seen.insert(def.id.clone()) {
            return Err(ConfigError::InvalidRelationship {
                fr_id: def.id,
                message: "duplicate id".into(),
            });
        }
        out.push(def);
    }
    Ok(out)
}
