use crate::core::error::TopologyError;
use crate::core::models::element::Element;
use crate::core::models::ids::AtomIdx;
use crate::core::models::internals::Internal;
use crate::core::topology::connectivity::ConnectivityBase;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLabel {
    pub atom: AtomIdx,
    pub element: Element,
    /// The partner atom in the other molecule if this atom is pinned.
    pub partner: Option<AtomIdx>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLabel {
    pub in_ring: bool,
}

/// A molecule reduced to the atoms that take part in a substructure match.
///
/// Vertices are numbered densely from zero in ascending atom order; the
/// labels carry the atom each vertex came from so results can be translated
/// back.
#[derive(Debug, Clone)]
pub struct LabelledGraph {
    graph: UnGraph<VertexLabel, EdgeLabel>,
    atom_to_node: HashMap<AtomIdx, NodeIndex>,
    /// Sorted per-vertex neighbour lists mirroring `graph`, for O(log d)
    /// edge lookups in the search loop.
    neighbors: Vec<Vec<(usize, EdgeLabel)>>,
}

impl LabelledGraph {
    /// Builds the graph over every atom accepted by `include`.
    ///
    /// # Arguments
    ///
    /// * `connectivity` - Bonds of the whole molecule. Ring membership is
    ///   judged on the whole molecule, not on the included atoms.
    /// * `elements` - One element per atom.
    /// * `include` - Filter deciding which atoms become vertices.
    /// * `pinned` - Pre-matched atoms of this molecule and their partners.
    pub fn build(
        connectivity: &ConnectivityBase,
        elements: &[Element],
        include: impl Fn(AtomIdx) -> bool,
        pinned: &BTreeMap<AtomIdx, AtomIdx>,
    ) -> Result<Self, TopologyError> {
        let n_atoms = connectivity.n_atoms();
        if elements.len() != n_atoms {
            return Err(TopologyError::PropertyLength {
                property: "element",
                expected: n_atoms,
                found: elements.len(),
            });
        }

        let mut graph = UnGraph::new_undirected();
        let mut atom_to_node = HashMap::new();
        for i in 0..n_atoms {
            let atom = AtomIdx::new(i);
            if !include(atom) {
                continue;
            }
            let node = graph.add_node(VertexLabel {
                atom,
                element: elements[i],
                partner: pinned.get(&atom).copied(),
            });
            atom_to_node.insert(atom, node);
        }

        for bond in connectivity.bonds() {
            let [a0, a1] = bond.key();
            if let (Some(&n0), Some(&n1)) = (atom_to_node.get(&a0), atom_to_node.get(&a1)) {
                let in_ring = connectivity.in_ring_bond(a0, a1)?;
                graph.add_edge(n0, n1, EdgeLabel { in_ring });
            }
        }

        let mut neighbors: Vec<Vec<(usize, EdgeLabel)>> = vec![Vec::new(); graph.node_count()];
        for node in graph.node_indices() {
            let list = &mut neighbors[node.index()];
            list.extend(graph.edges(node).map(|e| {
                let other = if e.source() == node { e.target() } else { e.source() };
                (other.index(), *e.weight())
            }));
            list.sort_unstable_by_key(|&(n, _)| n);
        }

        Ok(Self {
            graph,
            atom_to_node,
            neighbors,
        })
    }

    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn n_edges(&self) -> usize {
        self.graph.edge_count()
    }

    #[inline]
    pub fn label(&self, vertex: usize) -> &VertexLabel {
        &self.graph[NodeIndex::new(vertex)]
    }

    #[inline]
    pub fn atom(&self, vertex: usize) -> AtomIdx {
        self.label(vertex).atom
    }

    pub fn vertex_of(&self, atom: AtomIdx) -> Option<usize> {
        self.atom_to_node.get(&atom).map(|n| n.index())
    }

    #[inline]
    pub fn neighbors(&self, vertex: usize) -> &[(usize, EdgeLabel)] {
        &self.neighbors[vertex]
    }

    pub fn edge(&self, v0: usize, v1: usize) -> Option<EdgeLabel> {
        let list = &self.neighbors[v0];
        list.binary_search_by_key(&v1, |&(n, _)| n)
            .ok()
            .map(|i| list[i].1)
    }
}
