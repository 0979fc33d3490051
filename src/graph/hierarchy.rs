//! Property hierarchy: sub-property families and inverse properties.
//!
//! When `P89_falls_within` has sub-property `P89a_falls_within_admin`, a path
//! step over `P89_falls_within` also follows `P89a_falls_within_admin` edges.
//! When `P89_falls_within` has inverse `P89i_contains`, the step also follows
//! `P89i_contains` edges backwards, since data is often asserted in one
//! direction only.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// A predicate together with all of its transitive sub-properties.
pub type PropertyFamily = Arc<BTreeSet<String>>;

/// Compute the family of every predicate mentioned in a parent → children map.
///
/// Each family contains the predicate itself plus all transitive descendants.
/// Results are memoized, so shared sub-trees are expanded once. Cycles are
/// tolerated: a predicate reached again while its own expansion is still in
/// progress contributes only itself.
pub fn resolve_families(children: &HashMap<String, Vec<String>>) -> HashMap<String, PropertyFamily> {
    let mut memo: HashMap<String, PropertyFamily> = HashMap::new();
    let mut in_progress: HashSet<String> = HashSet::new();

    let mut roots: Vec<&String> = children.keys().collect();
    roots.sort();
    for root in roots {
        expand(root, children, &mut memo, &mut in_progress);
    }
    for kids in children.values() {
        for kid in kids {
            expand(kid, children, &mut memo, &mut in_progress);
        }
    }
    memo
}

fn expand(
    predicate: &str,
    children: &HashMap<String, Vec<String>>,
    memo: &mut HashMap<String, PropertyFamily>,
    in_progress: &mut HashSet<String>,
) -> PropertyFamily {
    if let Some(done) = memo.get(predicate) {
        return Arc::clone(done);
    }
    if !in_progress.insert(predicate.to_string()) {
        tracing::warn!(predicate, "cycle in sub-property hierarchy");
        return Arc::new(BTreeSet::from([predicate.to_string()]));
    }

    let mut family = BTreeSet::from([predicate.to_string()]);
    if let Some(kids) = children.get(predicate) {
        for kid in kids {
            let sub = expand(kid, children, memo, in_progress);
            family.extend(sub.iter().cloned());
        }
    }

    in_progress.remove(predicate);
    let family = Arc::new(family);
    memo.insert(predicate.to_string(), Arc::clone(&family));
    family
}

/// Cached property families and inverse mappings, keyed by predicate local name.
#[derive(Debug, Clone, Default)]
pub struct PropertyHierarchy {
    families: HashMap<String, PropertyFamily>,
    inverses: HashMap<String, String>,
}

impl PropertyHierarchy {
    /// Build from a parent → children map and a one-directional inverse map.
    /// Inverses are made symmetric.
    pub fn new(
        sub_properties: &HashMap<String, Vec<String>>,
        inverses: &HashMap<String, String>,
    ) -> Self {
        let families = resolve_families(sub_properties);
        let mut symmetric = HashMap::with_capacity(inverses.len() * 2);
        for (p, q) in inverses {
            symmetric.insert(p.clone(), q.clone());
            symmetric.entry(q.clone()).or_insert_with(|| p.clone());
        }
        Self {
            families,
            inverses: symmetric,
        }
    }

    /// The predicate plus all of its transitive sub-properties.
    /// Predicates absent from the hierarchy map to themselves only.
    pub fn family(&self, predicate: &str) -> PropertyFamily {
        match self.families.get(predicate) {
            Some(family) => Arc::clone(family),
            None => Arc::new(BTreeSet::from([predicate.to_string()])),
        }
    }

    /// The declared inverse of a predicate.
    pub fn inverse_of(&self, predicate: &str) -> Option<&str> {
        self.inverses.get(predicate).map(String::as_str)
    }

    /// Predicates whose *incoming* edges satisfy a forward step over `predicate`:
    /// the family of the inverse, plus the inverse of every family member.
    pub fn inverse_family(&self, predicate: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        for member in self.family(predicate).iter() {
            if let Some(inverse) = self.inverse_of(member) {
                result.extend(self.family(inverse).iter().cloned());
            }
        }
        result
    }

    /// Check if `specific` is `general` or one of its sub-properties.
    pub fn is_sub_property_of(&self, specific: &str, general: &str) -> bool {
        self.family(general).contains(specific)
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty() && self.inverses.is_empty()
    }
}
