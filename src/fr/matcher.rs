//! FR path matching: walk a step trie over the predicate-indexed graph.
//!
//! Only vertices of the FR's domain category that can take at least one
//! entry step are visited, so the cost is bounded by the number of such
//! sources times the number of distinct trie steps rather than by the total
//! vertex count.

use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use petgraph::graph::NodeIndex;

use crate::graph::index::GraphResult;
use crate::graph::{KnowledgeGraph, PropertyHierarchy, ResolvedPredicate};

use super::FrDefinition;
use super::trie::StepTrie;

/// Apply one step to a frontier.
///
/// A plain step takes exactly one hop from every frontier vertex. A
/// recursive step is a BFS closure that includes the frontier itself
/// (zero-or-more hops).
pub fn apply_step(
    graph: &KnowledgeGraph,
    frontier: &HashSet<NodeIndex>,
    step: &ResolvedPredicate,
    recursive: bool,
) -> HashSet<NodeIndex> {
    if !recursive {
        let mut next = HashSet::new();
        for &v in frontier {
            graph.follow(v, step, &mut next);
        }
        return next;
    }

    let mut closure = frontier.clone();
    let mut queue: Vec<NodeIndex> = frontier.iter().copied().collect();
    let mut scratch = HashSet::new();
    while let Some(v) = queue.pop() {
        scratch.clear();
        graph.follow(v, step, &mut scratch);
        for &next in &scratch {
            if closure.insert(next) {
                queue.push(next);
            }
        }
    }
    closure
}

/// All (source, targets) pairs found for one FR.
#[derive(Debug, Clone, Default)]
pub struct FrMatches {
    pub fr_id: String,
    /// Sources in index order, each with its sorted non-empty target list.
    pub pairs: Vec<(NodeIndex, Vec<NodeIndex>)>,
    pub sources_considered: usize,
}

impl FrMatches {
    pub fn edge_count(&self) -> usize {
        self.pairs.iter().map(|(_, t)| t.len()).sum()
    }
}

/// One FR compiled against one graph.
pub struct FrMatcher<'g> {
    definition: &'g FrDefinition,
    graph: &'g KnowledgeGraph,
    trie: StepTrie,
    /// Per trie node; the root entry is empty.
    resolved: Vec<ResolvedPredicate>,
    entry: ResolvedPredicate,
}

impl<'g> FrMatcher<'g> {
    pub fn new(
        definition: &'g FrDefinition,
        graph: &'g KnowledgeGraph,
        hierarchy: &PropertyHierarchy,
    ) -> Self {
        let trie = StepTrie::build(&definition.paths);
        let resolved = (0..=trie.step_count())
            .map(|idx| match &trie.node(idx).step {
                Some(step) => graph.resolve_predicate(&step.predicate, hierarchy),
                None => ResolvedPredicate::default(),
            })
            .collect();

        let mut entry = ResolvedPredicate::default();
        for predicate in trie.entry_predicates() {
            let r = graph.resolve_predicate(&predicate, hierarchy);
            entry.forward.extend(r.forward);
            entry.backward.extend(r.backward);
        }
        entry.forward.sort();
        entry.forward.dedup();
        entry.backward.sort();
        entry.backward.dedup();

        Self {
            definition,
            graph,
            trie,
            resolved,
            entry,
        }
    }

    pub fn definition(&self) -> &FrDefinition {
        self.definition
    }

    pub fn trie(&self) -> &StepTrie {
        &self.trie
    }

    /// Domain-category vertices able to take an entry step, in index order.
    pub fn candidate_sources(&self) -> Vec<NodeIndex> {
        let mut sources: Vec<NodeIndex> = self
            .graph
            .step0_sources(&self.entry)
            .into_iter()
            .filter(|&v| self.graph.vertex_at(v).category == Some(self.definition.domain_fc))
            .collect();
        sources.sort();
        sources
    }

    /// Union of terminal frontiers for one source, origin included.
    pub fn raw_targets(&self, source: NodeIndex) -> HashSet<NodeIndex> {
        let mut targets = HashSet::new();
        let root_frontier = Rc::new(HashSet::from([source]));
        let mut stack: Vec<(usize, Rc<HashSet<NodeIndex>>)> = self
            .trie
            .node(StepTrie::ROOT)
            .children
            .values()
            .map(|&child| (child, Rc::clone(&root_frontier)))
            .collect();

        while let Some((idx, parent_frontier)) = stack.pop() {
            let node = self.trie.node(idx);
            let recursive = node.step.as_ref().is_some_and(|s| s.recursive);
            let frontier = apply_step(self.graph, &parent_frontier, &self.resolved[idx], recursive);
            if frontier.is_empty() {
                tracing::trace!(
                    fr = %self.definition.id,
                    step = node.step.as_ref().map(|s| s.predicate.as_str()).unwrap_or(""),
                    "traversal gap"
                );
                continue;
            }
            let frontier = Rc::new(frontier);
            if node.terminal {
                targets.extend(frontier.iter().copied());
            }
            for &child in node.children.values() {
                stack.push((child, Rc::clone(&frontier)));
            }
        }
        targets
    }

    /// Targets of this FR for one source: terminal frontiers minus the
    /// origin, restricted to the range category when one is declared.
    pub fn match_source(&self, source: NodeIndex) -> BTreeSet<NodeIndex> {
        let mut targets = self.raw_targets(source);
        targets.remove(&source);
        if let Some(range) = self.definition.range_fc {
            targets.retain(|&t| self.graph.vertex_at(t).category == Some(range));
        }
        targets.into_iter().collect()
    }

    /// Target URIs for a source URI.
    pub fn match_uri(&self, uri: &str) -> GraphResult<BTreeSet<String>> {
        let source = self.graph.require(uri)?;
        Ok(self
            .match_source(source)
            .into_iter()
            .map(|t| self.graph.vertex_at(t).uri.clone())
            .collect())
    }

    /// Match every candidate source.
    pub fn match_all(&self) -> FrMatches {
        let sources = self.candidate_sources();
        let sources_considered = sources.len();
        let pairs = sources
            .into_iter()
            .filter_map(|s| {
                let targets = self.match_source(s);
                (!targets.is_empty()).then(|| (s, targets.into_iter().collect()))
            })
            .collect();
        FrMatches {
            fr_id: self.definition.id.clone(),
            pairs,
            sources_considered,
        }
    }
}
