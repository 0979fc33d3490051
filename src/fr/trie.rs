//! Step trie: one FR's alternative paths compiled into a prefix tree.
//!
//! Paths sharing a prefix share trie nodes, so the frontier for a shared
//! prefix is computed once per source vertex. Nodes live in an arena and
//! refer to their children by index.

use std::collections::{BTreeMap, BTreeSet};

use super::PropertyPath;

/// Trie edge key: one step, distinguished by predicate and recursion flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepKey {
    pub predicate: String,
    pub recursive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TrieNode {
    /// `None` only for the root.
    pub step: Option<StepKey>,
    pub children: BTreeMap<StepKey, usize>,
    /// Some path ends here.
    pub terminal: bool,
    /// Ids of the paths ending here.
    pub path_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StepTrie {
    nodes: Vec<TrieNode>,
}

impl StepTrie {
    pub const ROOT: usize = 0;

    /// Compile an ordered path list.
    pub fn build(paths: &[PropertyPath]) -> Self {
        let mut nodes = vec![TrieNode::default()];
        for path in paths {
            let mut current = Self::ROOT;
            for step in &path.steps {
                let key = StepKey {
                    predicate: step.property.clone(),
                    recursive: step.recursive,
                };
                let existing = nodes[current].children.get(&key).copied();
                current = match existing {
                    Some(child) => child,
                    None => {
                        let child = nodes.len();
                        nodes.push(TrieNode {
                            step: Some(key.clone()),
                            ..Default::default()
                        });
                        nodes[current].children.insert(key, child);
                        child
                    }
                };
            }
            if current != Self::ROOT {
                let node = &mut nodes[current];
                node.terminal = true;
                node.path_ids.push(path.id.clone());
            }
        }
        Self { nodes }
    }

    pub fn node(&self, idx: usize) -> &TrieNode {
        &self.nodes[idx]
    }

    /// Number of distinct steps (nodes other than the root).
    pub fn step_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.step_count() == 0
    }

    /// Predicates a source vertex must carry to begin any path.
    ///
    /// A leading recursive step may match zero times, so the steps after it
    /// are entry points too.
    pub fn entry_predicates(&self) -> BTreeSet<String> {
        let mut entries = BTreeSet::new();
        let mut stack: Vec<usize> = self.nodes[Self::ROOT].children.values().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if let Some(step) = &node.step {
                entries.insert(step.predicate.clone());
                if step.recursive {
                    stack.extend(node.children.values().copied());
                }
            }
        }
        entries
    }
}
