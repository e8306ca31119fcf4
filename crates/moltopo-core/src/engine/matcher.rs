use super::error::McsError;
use super::graph::LabelledGraph;
use crate::core::models::ids::{AtomIdx, ResNum};
use crate::core::models::molecule::MoleculeView;
use std::collections::{BTreeMap, HashMap, HashSet};

pub type AtomMapping = HashMap<AtomIdx, AtomIdx>;

/// Supplies a partial atom correspondence between two molecules before the
/// substructure search runs. Every pair it returns is pinned: it appears in
/// the final mapping unchanged.
pub trait AtomMatcher {
    fn match_atoms(
        &self,
        view0: &MoleculeView<'_>,
        view1: &MoleculeView<'_>,
    ) -> Result<AtomMapping, McsError>;
}

impl<F> AtomMatcher for F
where
    F: Fn(&MoleculeView<'_>, &MoleculeView<'_>) -> Result<AtomMapping, McsError>,
{
    fn match_atoms(
        &self,
        view0: &MoleculeView<'_>,
        view1: &MoleculeView<'_>,
    ) -> Result<AtomMapping, McsError> {
        self(view0, view1)
    }
}

/// Groups the selected atoms of a view by `key`, keeping only keys that
/// identify exactly one atom.
fn unique_by<K, F>(view: &MoleculeView<'_>, key: F) -> HashMap<K, AtomIdx>
where
    K: std::hash::Hash + Eq,
    F: Fn(AtomIdx) -> Option<K>,
{
    let mut seen: HashMap<K, Option<AtomIdx>> = HashMap::new();
    for atom in view.selection().selected() {
        if let Some(k) = key(atom) {
            seen.entry(k)
                .and_modify(|slot| *slot = None)
                .or_insert(Some(atom));
        }
    }
    seen.into_iter()
        .filter_map(|(k, atom)| atom.map(|a| (k, a)))
        .collect()
}

fn pair_by_key<K, F>(view0: &MoleculeView<'_>, view1: &MoleculeView<'_>, key: F) -> AtomMapping
where
    K: std::hash::Hash + Eq,
    F: Fn(&MoleculeView<'_>, AtomIdx) -> Option<K>,
{
    let side0 = unique_by(view0, |a| key(view0, a));
    let side1 = unique_by(view1, |a| key(view1, a));
    side0
        .into_iter()
        .filter_map(|(k, a0)| side1.get(&k).map(|&a1| (a0, a1)))
        .collect()
}

/// Pairs selected atoms whose names are equal and unique in both molecules.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomNameMatcher;

impl AtomMatcher for AtomNameMatcher {
    fn match_atoms(
        &self,
        view0: &MoleculeView<'_>,
        view1: &MoleculeView<'_>,
    ) -> Result<AtomMapping, McsError> {
        Ok(pair_by_key(view0, view1, |view, atom| {
            view.info().atom_name(atom).ok().map(str::to_owned)
        }))
    }
}

/// Pairs selected atoms that share a residue number and an atom name unique
/// within that residue.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResidueAtomNameMatcher;

impl AtomMatcher for ResidueAtomNameMatcher {
    fn match_atoms(
        &self,
        view0: &MoleculeView<'_>,
        view1: &MoleculeView<'_>,
    ) -> Result<AtomMapping, McsError> {
        Ok(pair_by_key(view0, view1, |view, atom| {
            let info = view.info();
            let resnum: ResNum = info.resnum_of(atom).ok()?;
            let name = info.atom_name(atom).ok()?;
            Some((resnum, name.to_owned()))
        }))
    }
}

/// Pairs atoms with the same index when selected in both molecules.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomIdxMatcher;

impl AtomMatcher for AtomIdxMatcher {
    fn match_atoms(
        &self,
        view0: &MoleculeView<'_>,
        view1: &MoleculeView<'_>,
    ) -> Result<AtomMapping, McsError> {
        Ok(view0
            .selection()
            .selected()
            .filter(|&atom| {
                atom.value() < view1.info().n_atoms() && view1.selection().is_selected(atom)
            })
            .map(|atom| (atom, atom))
            .collect())
    }
}

/// Checks that `mapping` pairs selected atoms of `view0` one-to-one with
/// selected atoms of `view1`.
pub fn validate_mapping(
    mapping: &AtomMapping,
    view0: &MoleculeView<'_>,
    view1: &MoleculeView<'_>,
) -> Result<BTreeMap<AtomIdx, AtomIdx>, McsError> {
    let mut targets = HashSet::with_capacity(mapping.len());
    for (&a0, &a1) in mapping {
        if !view0.info().contains_atom(a0) || !view0.selection().is_selected(a0) {
            return Err(McsError::Matcher {
                message: format!("atom {a0} is not a selected atom of the first molecule"),
            });
        }
        if !view1.info().contains_atom(a1) || !view1.selection().is_selected(a1) {
            return Err(McsError::Matcher {
                message: format!("atom {a1} is not a selected atom of the second molecule"),
            });
        }
        if !targets.insert(a1) {
            return Err(McsError::Matcher {
                message: format!("atom {a1} of the second molecule is matched more than once"),
            });
        }
    }
    Ok(mapping.iter().map(|(&a0, &a1)| (a0, a1)).collect())
}

/// Checks that pinned vertex pairs agree on every edge among themselves:
/// two pinned vertices are bonded in the first graph exactly when their
/// partners are bonded in the second, and with `match_ring_bonds` the bond
/// lies in a ring on both sides or on neither.
pub fn check_pinned_edges(
    pinned: &[(usize, usize)],
    g0: &LabelledGraph,
    g1: &LabelledGraph,
    match_ring_bonds: bool,
) -> Result<(), McsError> {
    for (i, &(u0, u1)) in pinned.iter().enumerate() {
        for &(v0, v1) in &pinned[i + 1..] {
            let consistent = match (g0.edge(u0, v0), g1.edge(u1, v1)) {
                (None, None) => true,
                (Some(e0), Some(e1)) => !match_ring_bonds || e0 == e1,
                _ => false,
            };
            if !consistent {
                return Err(McsError::Matcher {
                    message: format!(
                        "pinned pairs {}-{} and {}-{} disagree on the bond between them",
                        g0.atom(u0),
                        g1.atom(u1),
                        g0.atom(v0),
                        g1.atom(v1)
                    ),
                });
            }
        }
    }
    Ok(())
}
