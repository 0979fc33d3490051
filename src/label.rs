//! Human-readable labels for vertices and predicates.
//!
//! Labels are resolved through an ordered chain of strategies; the first one
//! that yields a value wins. The default chain is: explicit label supplied
//! with the data, table lookup by full URI, table lookup by local name, and a
//! heuristic that turns a CIDOC-CRM local name like `P89_falls_within` into
//! `falls within`. The bare local name is the last resort.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::graph::local_name;

/// CIDOC-CRM class/property code prefix: `E53_`, `P89_`, `P89i_`, `P2.1_`.
static CRM_CODE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,3}\d+(?:\.\d+)?[a-z]?_").expect("valid regex"));

/// One step of the label fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelStrategy {
    /// Use the label that arrived with the data.
    Explicit,
    /// Look up the full URI in the label table.
    ByUri,
    /// Look up the local name in the label table.
    ByLocalName,
    /// Derive a label from the local name.
    Heuristic,
}

/// Ordered label fallback chain with its lookup tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelResolver {
    chain: Vec<LabelStrategy>,
    by_uri: HashMap<String, String>,
    by_local_name: HashMap<String, String>,
}

impl Default for LabelResolver {
    fn default() -> Self {
        Self {
            chain: vec![
                LabelStrategy::Explicit,
                LabelStrategy::ByUri,
                LabelStrategy::ByLocalName,
                LabelStrategy::Heuristic,
            ],
            by_uri: HashMap::new(),
            by_local_name: HashMap::new(),
        }
    }
}

impl LabelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the strategy order.
    pub fn with_chain(mut self, chain: Vec<LabelStrategy>) -> Self {
        self.chain = chain;
        self
    }

    /// Register a label under its full URI.
    pub fn insert_uri(&mut self, uri: impl Into<String>, label: impl Into<String>) {
        self.by_uri.insert(uri.into(), label.into());
    }

    /// Register a label under a local name.
    pub fn insert_local_name(&mut self, name: impl Into<String>, label: impl Into<String>) {
        self.by_local_name.insert(name.into(), label.into());
    }

    /// Remember a label seen in the data under its URI. The first one sticks.
    pub fn learn_uri(&mut self, uri: &str, label: &str) {
        if !self.by_uri.contains_key(uri) {
            self.by_uri.insert(uri.to_string(), label.to_string());
        }
    }

    /// Remember a label under a local name. The first one sticks.
    pub fn learn_local_name(&mut self, name: &str, label: &str) {
        if !self.by_local_name.contains_key(name) {
            self.by_local_name.insert(name.to_string(), label.to_string());
        }
    }

    fn apply(&self, strategy: LabelStrategy, uri: &str, explicit: Option<&str>) -> Option<String> {
        match strategy {
            LabelStrategy::Explicit => explicit
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            LabelStrategy::ByUri => self.by_uri.get(uri).cloned(),
            LabelStrategy::ByLocalName => self.by_local_name.get(local_name(uri)).cloned(),
            LabelStrategy::Heuristic => humanize(local_name(uri)),
        }
    }

    /// Resolve a label, returning it with the strategy that produced it.
    pub fn resolve_with(&self, uri: &str, explicit: Option<&str>) -> (String, Option<LabelStrategy>) {
        for &strategy in &self.chain {
            if let Some(label) = self.apply(strategy, uri, explicit) {
                return (label, Some(strategy));
            }
        }
        (local_name(uri).to_string(), None)
    }

    /// Resolve a label through the chain.
    pub fn resolve(&self, uri: &str, explicit: Option<&str>) -> String {
        self.resolve_with(uri, explicit).0
    }
}

/// Strip a CIDOC-CRM code prefix and turn underscores into spaces.
///
/// Returns `None` when nothing readable remains.
pub fn humanize(name: &str) -> Option<String> {
    let stripped = CRM_CODE_PREFIX.replace(name, "");
    let spaced = stripped.replace(['_', '-'], " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() { None } else { Some(collapsed) }
}
