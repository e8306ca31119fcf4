use super::graph::LabelledGraph;
use super::progress::{Progress, ProgressReporter};
use std::time::Instant;
use tracing::{debug, instrument};

/// Upper limit on the number of equally large matches kept for tie-breaking.
const MAX_TIED_MATCHES: usize = 256;

/// A vertex correspondence between two graphs, sorted by the first graph's
/// vertex.
pub type Correspondence = Vec<(usize, usize)>;

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub match_ring_bonds: bool,
    pub match_elements: bool,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Every distinct correspondence of maximum size met, in discovery order.
    pub best: Vec<Correspondence>,
    pub size: usize,
    /// How many times a maximum-size correspondence was met, duplicates
    /// included.
    pub n_tied: usize,
    pub timed_out: bool,
}

/// Connected maximum common induced subgraph search.
///
/// Correspondences grow one vertex at a time from a seed pair. Pinned pairs
/// are mapped before any seed is placed: they take part in every
/// correspondence and constrain its edges, but growth is not limited to
/// their neighbourhood, so a pin on a detached fragment never hides a larger
/// match elsewhere. Every extension must keep both edge sets identical over
/// the mapped vertices and, when requested, map ring bonds onto ring bonds.
/// Each maximal correspondence reached is inspected; the largest ones are
/// kept. The search stops early once a correspondence covers the smaller
/// graph and gives up with its best-so-far when the deadline passes.
pub struct McsSearch<'a> {
    g0: &'a LabelledGraph,
    g1: &'a LabelledGraph,
    options: SearchOptions,
    reporter: &'a ProgressReporter<'a>,

    m0: Vec<Option<usize>>,
    m1: Vec<Option<usize>>,
    excluded0: Vec<bool>,
    size: usize,
    target: usize,

    outcome: SearchOutcome,
    done: bool,
}

impl<'a> McsSearch<'a> {
    pub fn new(
        g0: &'a LabelledGraph,
        g1: &'a LabelledGraph,
        options: SearchOptions,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        let (n0, n1) = (g0.n_vertices(), g1.n_vertices());
        Self {
            g0,
            g1,
            options,
            reporter,
            m0: vec![None; n0],
            m1: vec![None; n1],
            excluded0: vec![false; n0],
            size: 0,
            target: n0.min(n1),
            outcome: SearchOutcome::default(),
            done: false,
        }
    }

    /// Runs the search. `pinned` lists vertex pairs that every reported
    /// correspondence contains. The pins must agree with each other on
    /// edges; see [`check_pinned_edges`](super::matcher::check_pinned_edges).
    #[instrument(skip_all, name = "mcs_search")]
    pub fn run(mut self, pinned: &[(usize, usize)]) -> SearchOutcome {
        if self.target == 0 {
            return self.outcome;
        }

        for &(v0, v1) in pinned {
            self.map(v0, v1);
        }
        if !pinned.is_empty() {
            // The pins and whatever grows from them alone.
            self.extend();
        }

        for s0 in 0..self.g0.n_vertices() {
            if self.done || self.upper_bound() < self.outcome.size {
                break;
            }
            if self.m0[s0].is_some() {
                continue;
            }
            for s1 in 0..self.g1.n_vertices() {
                if self.done {
                    break;
                }
                if !self.feasible(s0, s1) {
                    continue;
                }
                self.map(s0, s1);
                self.extend();
                self.unmap(s0, s1);
            }
            self.excluded0[s0] = true;
        }
        self.outcome
    }

    fn map(&mut self, v0: usize, v1: usize) {
        self.m0[v0] = Some(v1);
        self.m1[v1] = Some(v0);
        self.size += 1;
    }

    fn unmap(&mut self, v0: usize, v1: usize) {
        self.m0[v0] = None;
        self.m1[v1] = None;
        self.size -= 1;
    }

    fn vertices_compatible(&self, v0: usize, v1: usize) -> bool {
        let (l0, l1) = (self.g0.label(v0), self.g1.label(v1));
        if self.options.match_elements && l0.element != l1.element {
            return false;
        }
        match (l0.partner, l1.partner) {
            (None, None) => true,
            (Some(p1), Some(p0)) => p1 == l1.atom && p0 == l0.atom,
            _ => false,
        }
    }

    fn feasible(&self, v0: usize, v1: usize) -> bool {
        if self.m1[v1].is_some() || !self.vertices_compatible(v0, v1) {
            return false;
        }
        for &(u0, e0) in self.g0.neighbors(v0) {
            if let Some(u1) = self.m0[u0] {
                match self.g1.edge(v1, u1) {
                    None => return false,
                    Some(e1) if self.options.match_ring_bonds && e0 != e1 => return false,
                    Some(_) => {}
                }
            }
        }
        self.g1
            .neighbors(v1)
            .iter()
            .filter_map(|&(u1, _)| self.m1[u1])
            .all(|u0| self.g0.edge(v0, u0).is_some())
    }

    /// The lowest unmapped, non-excluded vertex of the first graph that is
    /// bonded to a mapped vertex.
    fn next_vertex(&self) -> Option<usize> {
        (0..self.m0.len()).find(|&v| {
            self.m0[v].is_none()
                && !self.excluded0[v]
                && self.g0.neighbors(v).iter().any(|&(u, _)| self.m0[u].is_some())
        })
    }

    fn upper_bound(&self) -> usize {
        let open0 = (0..self.m0.len())
            .filter(|&v| self.m0[v].is_none() && !self.excluded0[v])
            .count();
        let open1 = self.m1.len() - self.size;
        self.size + open0.min(open1)
    }

    fn extend(&mut self) {
        if self.done {
            return;
        }
        if Instant::now() >= self.options.deadline {
            self.outcome.timed_out = true;
            self.done = true;
            return;
        }

        let Some(v0) = self.next_vertex() else {
            self.record();
            return;
        };
        if self.upper_bound() < self.outcome.size {
            return;
        }

        // Images of v0 must neighbour the image of its first mapped neighbour.
        let anchor = self
            .g0
            .neighbors(v0)
            .iter()
            .find_map(|&(u0, _)| self.m0[u0]);
        let candidates: Vec<usize> = match anchor {
            Some(u1) => self.g1.neighbors(u1).iter().map(|&(w, _)| w).collect(),
            None => Vec::new(),
        };

        for v1 in candidates {
            if self.feasible(v0, v1) {
                self.map(v0, v1);
                self.extend();
                self.unmap(v0, v1);
                if self.done {
                    return;
                }
            }
        }

        self.excluded0[v0] = true;
        self.extend();
        self.excluded0[v0] = false;
    }

    fn record(&mut self) {
        if self.size == 0 || self.size < self.outcome.size {
            return;
        }

        let current: Correspondence = self
            .m0
            .iter()
            .enumerate()
            .filter_map(|(v0, m)| m.map(|v1| (v0, v1)))
            .collect();

        if self.size > self.outcome.size {
            debug!("Common substructure grew to {} atoms", self.size);
            self.outcome.size = self.size;
            self.outcome.best = vec![current];
            self.outcome.n_tied = 1;
            self.reporter.report(Progress::Improved { size: self.size });
            if self.size == self.target {
                self.done = true;
            }
        } else {
            self.outcome.n_tied += 1;
            if self.outcome.best.len() < MAX_TIED_MATCHES && !self.outcome.best.contains(&current)
            {
                self.outcome.best.push(current);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use crate::core::models::ids::AtomIdx;
    use crate::core::models::molecule_info::MoleculeInfo;
    use crate::core::topology::editor::ConnectivityEditor;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn graph(n: usize, edges: &[(u32, u32)], pinned: &[(u32, u32)]) -> LabelledGraph {
        let names: Vec<String> = (0..n).map(|i| format!("C{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let info = MoleculeInfo::builder()
            .start_residue(1, "MOL")
            .and_then(|b| b.add_atoms(&names))
            .unwrap()
            .build();
        let mut editor = ConnectivityEditor::new(Arc::new(info));
        for &(i, j) in edges {
            editor.connect(AtomIdx(i), AtomIdx(j)).unwrap();
        }
        let pinned: BTreeMap<AtomIdx, AtomIdx> =
            pinned.iter().map(|&(a, b)| (AtomIdx(a), AtomIdx(b))).collect();
        LabelledGraph::build(&editor.commit(), &vec![Element::CARBON; n], |_| true, &pinned)
            .unwrap()
    }

    fn ring(n: u32) -> Vec<(u32, u32)> {
        (0..n).map(|i| (i, (i + 1) % n)).collect()
    }

    fn options(match_ring_bonds: bool) -> SearchOptions {
        SearchOptions {
            match_ring_bonds,
            match_elements: false,
            deadline: Instant::now() + Duration::from_secs(10),
        }
    }

    fn search(g0: &LabelledGraph, g1: &LabelledGraph, opts: SearchOptions) -> SearchOutcome {
        let reporter = ProgressReporter::new();
        McsSearch::new(g0, g1, opts, &reporter).run(&[])
    }

    #[test]
    fn identical_rings_map_completely() {
        let g = graph(6, &ring(6), &[]);
        let outcome = search(&g, &g, options(true));
        assert_eq!(outcome.size, 6);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.best[0].len(), 6);
    }

    #[test]
    fn ring_bonds_only_map_onto_ring_bonds() {
        let path = graph(3, &[(0, 1), (1, 2)], &[]);
        let triangle = graph(3, &ring(3), &[]);
        assert_eq!(search(&path, &triangle, options(true)).size, 1);
        // Without the ring rule the induced-subgraph rule still forbids
        // closing the path into a triangle.
        assert_eq!(search(&path, &triangle, options(false)).size, 2);
    }

    #[test]
    fn pinned_pairs_are_kept() {
        let g0 = graph(6, &ring(6), &[(0, 3)]);
        let g1 = graph(6, &ring(6), &[(3, 0)]);
        let reporter = ProgressReporter::new();
        let outcome = McsSearch::new(&g0, &g1, options(true), &reporter).run(&[(0, 3)]);
        assert_eq!(outcome.size, 6);
        assert!(outcome.best[0].contains(&(0, 3)));
    }

    #[test]
    fn pins_do_not_confine_growth_to_their_fragment() {
        let mut edges = ring(6);
        edges.push((6, 7));
        let g = graph(9, &edges, &[(8, 8)]);
        let reporter = ProgressReporter::new();
        let outcome = McsSearch::new(&g, &g, options(true), &reporter).run(&[(8, 8)]);
        // The ring plus the pinned lone vertex, not the pin alone.
        assert_eq!(outcome.size, 7);
        assert!(outcome.best.iter().all(|m| m.contains(&(8, 8))));
    }

    #[test]
    fn pinned_pairs_constrain_neighbouring_extensions() {
        let g = graph(6, &ring(6), &[(0, 0)]);
        let reporter = ProgressReporter::new();
        let outcome = McsSearch::new(&g, &g, options(true), &reporter).run(&[(0, 0)]);
        assert_eq!(outcome.size, 6);
        for m in &outcome.best {
            for &(v0, v1) in m {
                // Neighbours of the pinned vertex stay neighbours.
                if g.edge(0, v0).is_some() {
                    assert!(g.edge(0, v1).is_some());
                }
            }
        }
    }

    #[test]
    fn ties_are_collected() {
        let star = graph(4, &[(0, 1), (0, 2), (0, 3)], &[]);
        let path = graph(4, &[(0, 1), (1, 2), (2, 3)], &[]);
        let outcome = search(&star, &path, options(true));
        assert_eq!(outcome.size, 3);
        assert!(outcome.best.len() >= 2);
        assert!(outcome.n_tied >= outcome.best.len());
        assert!(outcome.best.iter().all(|m| m.len() == 3));
    }

    #[test]
    fn expired_deadline_stops_the_search() {
        let g = graph(6, &ring(6), &[]);
        let mut opts = options(true);
        opts.deadline = Instant::now();
        let outcome = search(&g, &g, opts);
        assert!(outcome.timed_out);
    }

    #[test]
    fn empty_graph_matches_nothing() {
        let g = graph(3, &ring(3), &[]);
        let empty = graph(0, &[], &[]);
        let outcome = search(&g, &empty, options(true));
        assert_eq!(outcome, SearchOutcome::default());
    }
}
