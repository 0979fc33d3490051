//! In-memory predicate-indexed knowledge graph.
//!
//! Uses `petgraph` for the multigraph structure and keeps two secondary
//! indexes so that path steps never scan a vertex's full edge list:
//!
//! - per vertex: predicate → outgoing targets and predicate → incoming sources
//! - global: predicate → vertices carrying that predicate (as subject or object)
//!
//! RDF predicates are interned by full URI, so two vocabularies that share a
//! local name stay distinct. A secondary local-name index serves FR steps,
//! the property hierarchy and the adjacency weight table, which are all
//! written against local names.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::label::{LabelResolver, LabelStrategy};

use super::hierarchy::PropertyHierarchy;
use super::{
    EdgeData, EdgeKind, EdgeView, FundamentalCategory, PredicateId, RdfTriple, VertexData,
    local_name,
};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

// ---------------------------------------------------------------------------
// Predicate table
// ---------------------------------------------------------------------------

/// One interned predicate (or FR id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateEntry {
    /// Lookup key: full URI for RDF predicates, id for FRs.
    pub key: String,
    pub uri: String,
    pub label: String,
    pub label_explicit: bool,
}

#[derive(Debug, Clone, Default)]
struct PredicateTable {
    entries: Vec<PredicateEntry>,
    by_key: HashMap<String, PredicateId>,
    by_local_name: HashMap<String, Vec<PredicateId>>,
}

impl PredicateTable {
    fn from_entries(entries: Vec<PredicateEntry>) -> Self {
        let mut table = Self::default();
        for (i, e) in entries.iter().enumerate() {
            table.index(&e.key, PredicateId(i as u32));
        }
        table.entries = entries;
        table
    }

    fn index(&mut self, key: &str, id: PredicateId) {
        self.by_key.insert(key.to_string(), id);
        self.by_local_name
            .entry(local_name(key).to_string())
            .or_default()
            .push(id);
    }

    fn intern(&mut self, key: &str, uri: &str, label: String, explicit: bool) -> PredicateId {
        if let Some(&id) = self.by_key.get(key) {
            let entry = &mut self.entries[id.0 as usize];
            if explicit && !entry.label_explicit {
                entry.label = label;
                entry.label_explicit = true;
            }
            return id;
        }
        let id = PredicateId(self.entries.len() as u32);
        self.entries.push(PredicateEntry {
            key: key.to_string(),
            uri: uri.to_string(),
            label,
            label_explicit: explicit,
        });
        self.index(key, id);
        id
    }

    fn get(&self, key: &str) -> Option<PredicateId> {
        self.by_key.get(key).copied()
    }

    /// Every interned predicate whose key ends in `name`.
    fn by_local_name(&self, name: &str) -> &[PredicateId] {
        self.by_local_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn entry(&self, id: PredicateId) -> &PredicateEntry {
        &self.entries[id.0 as usize]
    }
}

// ---------------------------------------------------------------------------
// Resolved predicates
// ---------------------------------------------------------------------------

/// A path-step predicate resolved against the hierarchy and the interned
/// predicate table: which edges satisfy the step in each direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPredicate {
    /// Outgoing edges over any of these satisfy the step.
    pub forward: Vec<PredicateId>,
    /// Incoming edges over any of these (inverse predicates) satisfy the step.
    pub backward: Vec<PredicateId>,
}

impl ResolvedPredicate {
    /// True when no edge in the graph can satisfy the step.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.backward.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct VertexAdjacency {
    outgoing: HashMap<PredicateId, Vec<NodeIndex>>,
    incoming: HashMap<PredicateId, Vec<NodeIndex>>,
}

type EdgeKey = (NodeIndex, EdgeKind, PredicateId, NodeIndex);

// ---------------------------------------------------------------------------
// Snapshot form
// ---------------------------------------------------------------------------

/// Flat, serializable form of the graph. Vertex order is the node index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub vertices: Vec<VertexData>,
    pub predicates: Vec<PredicateEntry>,
    pub relationships: Vec<PredicateEntry>,
    pub edges: Vec<(u32, u32, EdgeData)>,
    pub labels: LabelResolver,
}

// ---------------------------------------------------------------------------
// Knowledge graph
// ---------------------------------------------------------------------------

/// Directed multigraph of entities with RDF and FR edges.
///
/// Built by a single writer, then shared read-only (`Arc<KnowledgeGraph>`)
/// across query threads.
pub struct KnowledgeGraph {
    graph: DiGraph<VertexData, EdgeData>,
    vertex_index: HashMap<String, NodeIndex>,
    predicates: PredicateTable,
    relationships: PredicateTable,
    /// Parallel to node indices.
    adjacency: Vec<VertexAdjacency>,
    subjects_by_predicate: HashMap<PredicateId, HashSet<NodeIndex>>,
    objects_by_predicate: HashMap<PredicateId, HashSet<NodeIndex>>,
    edge_keys: HashSet<EdgeKey>,
    labels: LabelResolver,
    rdf_edge_count: usize,
    fr_edge_count: usize,
}

impl KnowledgeGraph {
    /// Create a new empty knowledge graph.
    pub fn new() -> Self {
        Self::with_labels(LabelResolver::default())
    }

    /// Create an empty graph with a preloaded label resolver.
    pub fn with_labels(labels: LabelResolver) -> Self {
        Self {
            graph: DiGraph::new(),
            vertex_index: HashMap::new(),
            predicates: PredicateTable::default(),
            relationships: PredicateTable::default(),
            adjacency: Vec::new(),
            subjects_by_predicate: HashMap::new(),
            objects_by_predicate: HashMap::new(),
            edge_keys: HashSet::new(),
            labels,
            rdf_edge_count: 0,
            fr_edge_count: 0,
        }
    }

    /// Ensure a vertex exists for the URI, returning its index.
    ///
    /// An explicit label replaces a heuristic one but never another explicit one.
    fn ensure_vertex(&mut self, uri: &str, explicit: Option<&str>) -> NodeIndex {
        let explicit = explicit.map(str::trim).filter(|l| !l.is_empty());
        if let Some(label) = explicit {
            self.labels.learn_uri(uri, label);
        }
        if let Some(&idx) = self.vertex_index.get(uri) {
            let vertex = &mut self.graph[idx];
            if !vertex.label_explicit {
                if let Some(label) = explicit {
                    vertex.label = label.to_string();
                    vertex.label_explicit = true;
                }
            }
            return idx;
        }
        let (label, via) = self.labels.resolve_with(uri, explicit);
        let idx = self
            .graph
            .add_node(VertexData::new(uri, label, via == Some(LabelStrategy::Explicit)));
        self.vertex_index.insert(uri.to_string(), idx);
        self.adjacency.push(VertexAdjacency::default());
        idx
    }

    /// Insert an edge unless an identical (source, kind, predicate, target) exists.
    fn insert_edge(&mut self, source: NodeIndex, target: NodeIndex, data: EdgeData) -> bool {
        if !self.edge_keys.insert((source, data.kind, data.predicate, target)) {
            return false;
        }
        self.graph.add_edge(source, target, data);
        match data.kind {
            EdgeKind::Rdf => {
                self.adjacency[source.index()]
                    .outgoing
                    .entry(data.predicate)
                    .or_default()
                    .push(target);
                self.adjacency[target.index()]
                    .incoming
                    .entry(data.predicate)
                    .or_default()
                    .push(source);
                self.subjects_by_predicate
                    .entry(data.predicate)
                    .or_default()
                    .insert(source);
                self.objects_by_predicate
                    .entry(data.predicate)
                    .or_default()
                    .insert(target);
                self.rdf_edge_count += 1;
            }
            EdgeKind::Fr => self.fr_edge_count += 1,
        }
        true
    }

    /// Add a batch of RDF triples. Returns the number of new edges.
    ///
    /// Re-submitting triples already present is a no-op.
    pub fn add_triples(&mut self, batch: &[RdfTriple]) -> usize {
        let mut added = 0;
        for triple in batch {
            let source = self.ensure_vertex(&triple.subject, triple.subject_label.as_deref());
            let target = self.ensure_vertex(&triple.object, triple.object_label.as_deref());
            let predicate_label = triple
                .predicate_label
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty());
            if let Some(label) = predicate_label {
                self.labels.learn_uri(&triple.predicate, label);
                self.labels.learn_local_name(local_name(&triple.predicate), label);
            }
            let (label, via) = self
                .labels
                .resolve_with(&triple.predicate, triple.predicate_label.as_deref());
            let predicate = self.predicates.intern(
                &triple.predicate,
                &triple.predicate,
                label,
                via == Some(LabelStrategy::Explicit),
            );
            let data = EdgeData {
                kind: EdgeKind::Rdf,
                predicate,
                weight: 1.0,
            };
            if self.insert_edge(source, target, data) {
                added += 1;
            }
        }
        added
    }

    /// Add a materialized FR edge. Self-references are rejected.
    pub fn add_fr_edge(
        &mut self,
        source: NodeIndex,
        fr_id: &str,
        fr_label: &str,
        target: NodeIndex,
    ) -> bool {
        if source == target {
            return false;
        }
        let predicate = self
            .relationships
            .intern(fr_id, fr_id, fr_label.to_string(), true);
        self.insert_edge(
            source,
            target,
            EdgeData {
                kind: EdgeKind::Fr,
                predicate,
                weight: 1.0,
            },
        )
    }

    // -- predicate resolution ---------------------------------------------

    /// Resolve a step predicate (local name) against the hierarchy.
    pub fn resolve_predicate(
        &self,
        predicate: &str,
        hierarchy: &PropertyHierarchy,
    ) -> ResolvedPredicate {
        let mut forward: Vec<PredicateId> = hierarchy
            .family(predicate)
            .iter()
            .flat_map(|p| self.predicates.by_local_name(p).iter().copied())
            .collect();
        let mut backward: Vec<PredicateId> = hierarchy
            .inverse_family(predicate)
            .iter()
            .flat_map(|p| self.predicates.by_local_name(p).iter().copied())
            .collect();
        forward.sort();
        forward.dedup();
        backward.sort();
        backward.dedup();
        ResolvedPredicate { forward, backward }
    }

    /// Collect every vertex one resolved step away from `vertex` into `out`.
    pub fn follow(&self, vertex: NodeIndex, step: &ResolvedPredicate, out: &mut HashSet<NodeIndex>) {
        let Some(adj) = self.adjacency.get(vertex.index()) else {
            return;
        };
        for p in &step.forward {
            if let Some(targets) = adj.outgoing.get(p) {
                out.extend(targets.iter().copied());
            }
        }
        for p in &step.backward {
            if let Some(sources) = adj.incoming.get(p) {
                out.extend(sources.iter().copied());
            }
        }
    }

    /// Vertices from which the resolved step can be taken at all.
    pub fn step0_sources(&self, step: &ResolvedPredicate) -> HashSet<NodeIndex> {
        let mut sources = HashSet::new();
        for p in &step.forward {
            if let Some(s) = self.subjects_by_predicate.get(p) {
                sources.extend(s.iter().copied());
            }
        }
        for p in &step.backward {
            if let Some(s) = self.objects_by_predicate.get(p) {
                sources.extend(s.iter().copied());
            }
        }
        sources
    }

    /// URIs reachable from `uri` by one step over `predicate`, including
    /// sub-properties and inverse-direction edges.
    pub fn follow_predicate(
        &self,
        uri: &str,
        predicate: &str,
        hierarchy: &PropertyHierarchy,
    ) -> GraphResult<BTreeSet<String>> {
        let idx = self.require(uri)?;
        let step = self.resolve_predicate(predicate, hierarchy);
        let mut out = HashSet::new();
        self.follow(idx, &step, &mut out);
        Ok(out.into_iter().map(|i| self.graph[i].uri.clone()).collect())
    }

    /// URIs of every vertex that can start a step over `predicate`.
    pub fn get_step0_sources(&self, predicate: &str, hierarchy: &PropertyHierarchy) -> BTreeSet<String> {
        let step = self.resolve_predicate(predicate, hierarchy);
        self.step0_sources(&step)
            .into_iter()
            .map(|i| self.graph[i].uri.clone())
            .collect()
    }

    // -- vertices -----------------------------------------------------------

    /// Look up a vertex index by URI.
    pub fn index_of(&self, uri: &str) -> Option<NodeIndex> {
        self.vertex_index.get(uri).copied()
    }

    /// Look up a vertex index by URI, failing if absent.
    pub fn require(&self, uri: &str) -> GraphResult<NodeIndex> {
        self.index_of(uri).ok_or_else(|| GraphError::VertexNotFound {
            uri: uri.to_string(),
        })
    }

    pub fn vertex(&self, uri: &str) -> Option<&VertexData> {
        self.index_of(uri).map(|i| &self.graph[i])
    }

    pub fn vertex_at(&self, idx: NodeIndex) -> &VertexData {
        &self.graph[idx]
    }

    pub(crate) fn vertex_mut(&mut self, idx: NodeIndex) -> &mut VertexData {
        &mut self.graph[idx]
    }

    /// All vertex indices in insertion order.
    pub fn vertex_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Vertices of the given category, in insertion order.
    pub fn vertices_with_category(&self, category: FundamentalCategory) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&i| self.graph[i].category == Some(category))
            .collect()
    }

    /// Objects of the edges over one exact predicate URI.
    pub fn objects_of(&self, idx: NodeIndex, predicate_uri: &str) -> Vec<NodeIndex> {
        self.predicates
            .get(predicate_uri)
            .and_then(|p| self.adjacency[idx.index()].outgoing.get(&p))
            .cloned()
            .unwrap_or_default()
    }

    // -- edges --------------------------------------------------------------

    /// RDF neighbours of a vertex in both directions, with predicate local names.
    pub fn rdf_neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &str)> + '_ {
        let out = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), *e.weight()));
        let inc = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), *e.weight()));
        out.chain(inc)
            .filter(|(_, d)| d.kind == EdgeKind::Rdf)
            .map(move |(other, d)| (other, local_name(&self.predicates.entry(d.predicate).key)))
    }

    /// Outgoing FR edges of a vertex as (target, FR id, FR label).
    pub fn fr_edges_from(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &str, &str)> + '_ {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().kind == EdgeKind::Fr)
            .map(move |e| {
                let entry = self.relationships.entry(e.weight().predicate);
                (e.target(), entry.key.as_str(), entry.label.as_str())
            })
    }

    /// Every FR edge as (source, target).
    pub fn fr_edge_pairs(&self) -> Vec<(NodeIndex, NodeIndex)> {
        self.graph
            .edge_references()
            .filter(|e| e.weight().kind == EdgeKind::Fr)
            .map(|e| (e.source(), e.target()))
            .collect()
    }

    /// Owned views of every edge.
    pub fn edges(&self) -> Vec<EdgeView> {
        self.graph
            .edge_references()
            .map(|e| {
                let d = e.weight();
                let entry = match d.kind {
                    EdgeKind::Rdf => self.predicates.entry(d.predicate),
                    EdgeKind::Fr => self.relationships.entry(d.predicate),
                };
                EdgeView {
                    source: self.graph[e.source()].uri.clone(),
                    target: self.graph[e.target()].uri.clone(),
                    kind: d.kind,
                    predicate: entry.uri.clone(),
                    label: entry.label.clone(),
                    weight: d.weight,
                }
            })
            .collect()
    }

    /// Human label of an RDF predicate, by full URI or local name.
    /// A local name shared by several URIs yields the first one interned.
    pub fn predicate_label(&self, predicate: &str) -> Option<&str> {
        self.predicates
            .get(predicate)
            .or_else(|| self.predicates.by_local_name(predicate).first().copied())
            .map(|p| self.predicates.entry(p).label.as_str())
    }

    pub fn labels(&self) -> &LabelResolver {
        &self.labels
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn rdf_edge_count(&self) -> usize {
        self.rdf_edge_count
    }

    pub fn fr_edge_count(&self) -> usize {
        self.fr_edge_count
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // -- snapshots ----------------------------------------------------------

    /// Flatten the graph for persistence.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            vertices: self
                .graph
                .node_indices()
                .map(|i| self.graph[i].clone())
                .collect(),
            predicates: self.predicates.entries.clone(),
            relationships: self.relationships.entries.clone(),
            edges: self
                .graph
                .edge_references()
                .map(|e| (e.source().index() as u32, e.target().index() as u32, *e.weight()))
                .collect(),
            labels: self.labels.clone(),
        }
    }

    /// Rebuild a graph and all of its indexes from a snapshot.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> GraphResult<Self> {
        let mut kg = Self::with_labels(snapshot.labels);
        kg.predicates = PredicateTable::from_entries(snapshot.predicates);
        kg.relationships = PredicateTable::from_entries(snapshot.relationships);
        for vertex in snapshot.vertices {
            let uri = vertex.uri.clone();
            let idx = kg.graph.add_node(vertex);
            kg.vertex_index.insert(uri, idx);
            kg.adjacency.push(VertexAdjacency::default());
        }
        let n = kg.graph.node_count();
        for (source, target, data) in snapshot.edges {
            let table_len = match data.kind {
                EdgeKind::Rdf => kg.predicates.entries.len(),
                EdgeKind::Fr => kg.relationships.entries.len(),
            };
            if source as usize >= n || target as usize >= n || data.predicate.0 as usize >= table_len {
                return Err(GraphError::Build {
                    message: format!("snapshot edge ({source}, {target}) references missing data"),
                });
            }
            kg.insert_edge(NodeIndex::new(source as usize), NodeIndex::new(target as usize), data);
        }
        Ok(kg)
    }
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KnowledgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeGraph")
            .field("vertices", &self.vertex_count())
            .field("rdf_edges", &self.rdf_edge_count)
            .field("fr_edges", &self.fr_edge_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRM: &str = "http://www.cidoc-crm.org/cidoc-crm/";

    fn p(name: &str) -> String {
        format!("{CRM}{name}")
    }

    fn falls_within_hierarchy() -> PropertyHierarchy {
        let subs = HashMap::from([(
            "P89_falls_within".to_string(),
            vec!["P89a_falls_within_admin".to_string()],
        )]);
        let inverses = HashMap::from([("P89_falls_within".to_string(), "P89i_contains".to_string())]);
        PropertyHierarchy::new(&subs, &inverses)
    }

    #[test]
    fn add_and_lookup() {
        let mut kg = KnowledgeGraph::new();
        let added = kg.add_triples(&[
            RdfTriple::new("urn:a", p("P89_falls_within"), "urn:b").with_labels("Athens", "Attica"),
        ]);
        assert_eq!(added, 1);
        assert_eq!(kg.vertex_count(), 2);
        assert_eq!(kg.rdf_edge_count(), 1);
        assert_eq!(kg.vertex("urn:a").unwrap().label, "Athens");
        assert_eq!(kg.predicate_label("P89_falls_within"), Some("falls within"));
    }

    #[test]
    fn add_triples_is_idempotent() {
        let mut kg = KnowledgeGraph::new();
        let batch = vec![
            RdfTriple::new("urn:a", p("P89_falls_within"), "urn:b"),
            RdfTriple::new("urn:b", p("P89_falls_within"), "urn:c"),
        ];
        assert_eq!(kg.add_triples(&batch), 2);
        assert_eq!(kg.add_triples(&batch), 0);
        assert_eq!(kg.edge_count(), 2);
    }

    #[test]
    fn explicit_label_replaces_heuristic_once() {
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[RdfTriple::new("urn:x/E53_Place", p("P2_has_type"), "urn:t")]);
        assert_eq!(kg.vertex("urn:x/E53_Place").unwrap().label, "Place");
        let mut labeled = RdfTriple::new("urn:x/E53_Place", p("P1_is_identified_by"), "urn:n");
        labeled.subject_label = Some("Delphi".into());
        kg.add_triples(&[labeled]);
        assert_eq!(kg.vertex("urn:x/E53_Place").unwrap().label, "Delphi");
        let mut relabeled = RdfTriple::new("urn:x/E53_Place", p("P1_is_identified_by"), "urn:m");
        relabeled.subject_label = Some("Other".into());
        kg.add_triples(&[relabeled]);
        assert_eq!(kg.vertex("urn:x/E53_Place").unwrap().label, "Delphi");
    }

    #[test]
    fn labels_from_the_data_feed_the_lookup_tables() {
        let mut labeled =
            RdfTriple::new("urn:a", p("P89_falls_within"), "urn:b").with_labels("Athens", "Attica");
        labeled.predicate_label = Some("lies within".into());
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[labeled]);
        assert_eq!(kg.predicate_label("P89_falls_within"), Some("lies within"));

        // A later graph seeded with these tables labels unlabeled data.
        let mut next = KnowledgeGraph::with_labels(kg.labels().clone());
        next.add_triples(&[
            RdfTriple::new("urn:a", p("P89_falls_within"), "urn:b"),
            RdfTriple::new("urn:c", "http://example.org/ns/P89_falls_within", "urn:a"),
        ]);
        assert_eq!(next.vertex("urn:a").unwrap().label, "Athens");
        assert_eq!(next.vertex("urn:b").unwrap().label, "Attica");
        assert!(!next.vertex("urn:a").unwrap().label_explicit);
        assert_eq!(
            next.predicate_label("http://example.org/ns/P89_falls_within"),
            Some("lies within")
        );
    }

    #[test]
    fn follow_uses_family_and_inverse() {
        let h = falls_within_hierarchy();
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[
            RdfTriple::new("urn:a", p("P89_falls_within"), "urn:b"),
            RdfTriple::new("urn:a", p("P89a_falls_within_admin"), "urn:c"),
            RdfTriple::new("urn:d", p("P89i_contains"), "urn:a"),
            RdfTriple::new("urn:a", p("P2_has_type"), "urn:t"),
        ]);
        let reached = kg.follow_predicate("urn:a", "P89_falls_within", &h).unwrap();
        let expected: BTreeSet<String> =
            ["urn:b", "urn:c", "urn:d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(reached, expected);
    }

    #[test]
    fn step0_sources_include_inverse_objects() {
        let h = falls_within_hierarchy();
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[
            RdfTriple::new("urn:a", p("P89_falls_within"), "urn:b"),
            RdfTriple::new("urn:d", p("P89i_contains"), "urn:e"),
        ]);
        let sources = kg.get_step0_sources("P89_falls_within", &h);
        let expected: BTreeSet<String> = ["urn:a", "urn:e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(sources, expected);
    }

    #[test]
    fn unknown_predicate_resolves_empty() {
        let kg = KnowledgeGraph::new();
        let step = kg.resolve_predicate("P999_nothing", &PropertyHierarchy::default());
        assert!(step.is_empty());
    }

    #[test]
    fn follow_unknown_vertex_errors() {
        let kg = KnowledgeGraph::new();
        let err = kg
            .follow_predicate("urn:missing", "P89_falls_within", &PropertyHierarchy::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::VertexNotFound { .. }));
    }

    #[test]
    fn fr_edges_dedup_and_reject_self_loops() {
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[RdfTriple::new("urn:a", p("P89_falls_within"), "urn:b")]);
        let a = kg.index_of("urn:a").unwrap();
        let b = kg.index_of("urn:b").unwrap();
        assert!(kg.add_fr_edge(a, "place_in_place", "is located in", b));
        assert!(!kg.add_fr_edge(a, "place_in_place", "is located in", b));
        assert!(!kg.add_fr_edge(a, "place_in_place", "is located in", a));
        assert_eq!(kg.fr_edge_count(), 1);
        assert_eq!(kg.rdf_edge_count(), 1);
        let fr: Vec<_> = kg.fr_edges_from(a).collect();
        assert_eq!(fr, vec![(b, "place_in_place", "is located in")]);
    }

    #[test]
    fn rdf_neighbors_both_directions() {
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[
            RdfTriple::new("urn:a", p("P46_is_composed_of"), "urn:b"),
            RdfTriple::new("urn:c", p("P62_depicts"), "urn:a"),
        ]);
        let a = kg.index_of("urn:a").unwrap();
        let mut names: Vec<&str> = kg.rdf_neighbors(a).map(|(_, p)| p).collect();
        names.sort();
        assert_eq!(names, vec!["P46_is_composed_of", "P62_depicts"]);
    }

    #[test]
    fn predicates_sharing_a_local_name_stay_distinct() {
        let dcterms_type = "http://purl.org/dc/terms/type";
        let mut kg = KnowledgeGraph::new();
        let added = kg.add_triples(&[
            RdfTriple::new("urn:a", crate::graph::RDF_TYPE, p("E53_Place")),
            RdfTriple::new("urn:a", dcterms_type, p("E53_Place")),
            RdfTriple::new("urn:a", dcterms_type, p("E21_Person")),
        ]);
        assert_eq!(added, 3);
        assert_eq!(kg.rdf_edge_count(), 3);

        let a = kg.index_of("urn:a").unwrap();
        let place = kg.index_of(&p("E53_Place")).unwrap();
        assert_eq!(kg.objects_of(a, crate::graph::RDF_TYPE), vec![place]);
        assert_eq!(kg.objects_of(a, dcterms_type).len(), 2);
        assert!(kg.objects_of(a, "type").is_empty());

        // Local-name resolution still reaches both vocabularies.
        let step = kg.resolve_predicate("type", &PropertyHierarchy::default());
        assert_eq!(step.forward.len(), 2);
    }

    #[test]
    fn snapshot_rebuilds_indexes() {
        let h = falls_within_hierarchy();
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[
            RdfTriple::new("urn:a", p("P89_falls_within"), "urn:b"),
            RdfTriple::new("urn:c", p("P89i_contains"), "urn:a"),
        ]);
        let a = kg.index_of("urn:a").unwrap();
        let b = kg.index_of("urn:b").unwrap();
        kg.add_fr_edge(a, "place_in_place", "is located in", b);

        let restored = KnowledgeGraph::from_snapshot(kg.to_snapshot()).unwrap();
        assert_eq!(restored.vertex_count(), kg.vertex_count());
        assert_eq!(restored.rdf_edge_count(), 2);
        assert_eq!(restored.fr_edge_count(), 1);
        assert_eq!(
            restored.follow_predicate("urn:a", "P89_falls_within", &h).unwrap(),
            kg.follow_predicate("urn:a", "P89_falls_within", &h).unwrap()
        );
    }
}
