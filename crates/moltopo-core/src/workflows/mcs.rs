use crate::core::models::element::Element;
use crate::core::models::ids::AtomIdx;
use crate::core::models::molecule::MoleculeView;
use crate::core::topology::connectivity::Connectivity;
use crate::core::topology::hunter::CovalentBondHunter;
use crate::engine::config::{McsConfig, TieBreak};
use crate::engine::error::McsError;
use crate::engine::graph::LabelledGraph;
use crate::engine::matcher::{AtomMatcher, check_pinned_edges, validate_mapping};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::search::{Correspondence, McsSearch, SearchOptions};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McsResult {
    /// Atom correspondence from the first molecule to the second.
    pub mapping: BTreeMap<AtomIdx, AtomIdx>,
    /// The time budget ran out; `mapping` is the best found so far and may
    /// not be maximal.
    pub timed_out: bool,
    /// How often a match of the returned size was met during the search.
    pub n_tied: usize,
}

impl McsResult {
    #[inline]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Finds the largest connected common substructure of two molecules.
///
/// Only selected atoms with an atomic number of at least
/// `config.min_atomic_number` take part. Atoms pinned by `matcher` are the
/// exception: a pinned atom joins the search even when it is light, so its
/// bonds constrain the match and may connect it to the rest. Pinned pairs
/// appear in the result unchanged and never make it smaller than the match
/// found without them. When no atoms can be matched the result is empty
/// rather than an error.
///
/// # Errors
///
/// [`McsError::MissingProperty`] if a molecule has neither elements nor
/// masses, or neither connectivity nor coordinates to derive it from, and
/// [`McsError::Matcher`] if the matcher's pairs are not a one-to-one mapping
/// between selected atoms or if two pinned pairs disagree on the bond
/// between them.
#[instrument(skip_all, name = "mcs_workflow")]
pub fn find_mcs(
    view0: &MoleculeView<'_>,
    view1: &MoleculeView<'_>,
    matcher: Option<&dyn AtomMatcher>,
    config: &McsConfig,
    reporter: &ProgressReporter,
) -> Result<McsResult, McsError> {
    let start = Instant::now();
    let deadline = start + config.timeout;

    // === Phase 1: Pre-matching ===
    reporter.report(Progress::PhaseStart {
        name: "Pre-matching",
    });
    let pinned = match matcher {
        Some(matcher) => validate_mapping(&matcher.match_atoms(view0, view1)?, view0, view1)?,
        None => BTreeMap::new(),
    };
    let inverse: BTreeMap<AtomIdx, AtomIdx> = pinned.iter().map(|(&a0, &a1)| (a1, a0)).collect();
    debug!("Matcher pinned {} atom pairs", pinned.len());
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Graph construction ===
    reporter.report(Progress::PhaseStart {
        name: "Graph construction",
    });
    let g0 = build_graph(view0, 0, config, &pinned)?;
    let g1 = build_graph(view1, 1, config, &inverse)?;
    debug!(
        "Search graphs have {}/{} vertices and {}/{} edges",
        g0.n_vertices(),
        g1.n_vertices(),
        g0.n_edges(),
        g1.n_edges()
    );
    let pinned_vertices = pinned
        .iter()
        .map(|(a0, a1)| match (g0.vertex_of(*a0), g1.vertex_of(*a1)) {
            (Some(v0), Some(v1)) => Ok((v0, v1)),
            _ => Err(McsError::Internal(format!(
                "pinned pair {a0}-{a1} is missing from the search graphs"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    check_pinned_edges(&pinned_vertices, &g0, &g1, config.match_ring_bonds)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Search ===
    reporter.report(Progress::PhaseStart { name: "Search" });
    let options = SearchOptions {
        match_ring_bonds: config.match_ring_bonds,
        match_elements: config.match_elements,
        deadline,
    };
    let outcome = McsSearch::new(&g0, &g1, options, reporter).run(&pinned_vertices);
    reporter.report(Progress::PhaseFinish);

    if outcome.timed_out {
        let message = format!(
            "Substructure search hit its {:?} budget; returning a possibly smaller match of {} atoms",
            config.timeout, outcome.size
        );
        warn!("{message}");
        reporter.report(Progress::Message(message));
    }

    let translate = |c: &Correspondence| -> Vec<(AtomIdx, AtomIdx)> {
        c.iter().map(|&(v0, v1)| (g0.atom(v0), g1.atom(v1))).collect()
    };
    let chosen = match config.tie_break {
        TieBreak::FirstFound => outcome.best.first().map(translate),
        TieBreak::LowestIndices => outcome
            .best
            .iter()
            .map(|c| {
                let mut pairs = translate(c);
                pairs.sort_unstable();
                pairs
            })
            .min(),
    };

    let mut mapping: BTreeMap<AtomIdx, AtomIdx> = chosen.into_iter().flatten().collect();
    mapping.extend(pinned.iter().map(|(&a0, &a1)| (a0, a1)));

    info!(
        "Common substructure of {} atoms found in {:.3}s ({} ties)",
        mapping.len(),
        start.elapsed().as_secs_f64(),
        outcome.n_tied.saturating_sub(1)
    );

    Ok(McsResult {
        mapping,
        timed_out: outcome.timed_out,
        n_tied: outcome.n_tied,
    })
}

fn build_graph(
    view: &MoleculeView<'_>,
    which: usize,
    config: &McsConfig,
    pinned: &BTreeMap<AtomIdx, AtomIdx>,
) -> Result<LabelledGraph, McsError> {
    let elements = elements_of(view, which)?;
    let connectivity = connectivity_of(view, which, &elements)?;
    let include = |atom: AtomIdx| {
        pinned.contains_key(&atom)
            || (view.selection().is_selected(atom)
                && elements[atom.value()].is_heavy(config.min_atomic_number))
    };
    Ok(LabelledGraph::build(&connectivity, &elements, include, pinned)?)
}

/// Per-atom elements, taken from the molecule or derived from its masses.
/// Masses that match no element become dummy atoms, which never count as
/// heavy.
fn elements_of<'m>(view: &MoleculeView<'m>, which: usize) -> Result<Cow<'m, [Element]>, McsError> {
    let molecule = view.molecule();
    if let Some(elements) = &molecule.elements {
        return Ok(Cow::Borrowed(elements.as_slice()));
    }
    if let Some(masses) = &molecule.masses {
        debug!("Molecule {which} has no elements; deriving them from masses");
        let elements: Vec<Element> = masses
            .iter()
            .map(|&m| Element::from_mass(m).unwrap_or(Element::DUMMY))
            .collect();
        let unknown = elements.iter().filter(|&&e| e == Element::DUMMY).count();
        if unknown > 0 {
            warn!(
                "Molecule {which}: {unknown} atom masses match no known element; those atoms are left out of the match"
            );
        }
        return Ok(Cow::Owned(elements));
    }
    Err(McsError::MissingProperty {
        molecule: which,
        property: "element",
    })
}

fn connectivity_of<'m>(
    view: &MoleculeView<'m>,
    which: usize,
    elements: &[Element],
) -> Result<Cow<'m, Connectivity>, McsError> {
    let molecule = view.molecule();
    if let Some(connectivity) = &molecule.connectivity {
        return Ok(Cow::Borrowed(connectivity));
    }
    if let Some(coordinates) = &molecule.coordinates {
        debug!("Molecule {which} has no connectivity; perceiving bonds from coordinates");
        let hunted = CovalentBondHunter::default().hunt(&molecule.info, elements, coordinates)?;
        return Ok(Cow::Owned(hunted));
    }
    Err(McsError::MissingProperty {
        molecule: which,
        property: "connectivity",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::Molecule;
    use crate::core::models::molecule_info::MoleculeInfo;
    use crate::core::models::selection::AtomSelection;
    use crate::core::topology::editor::ConnectivityEditor;
    use crate::engine::matcher::{AtomMapping, AtomNameMatcher};
    use nalgebra::Point3;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const CARBONS: [&str; 6] = ["C1", "C2", "C3", "C4", "C5", "C6"];
    const HYDROGENS: [&str; 6] = ["H1", "H2", "H3", "H4", "H5", "H6"];

    fn a(i: u32) -> AtomIdx {
        AtomIdx(i)
    }

    fn config() -> McsConfig {
        McsConfig::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap()
    }

    fn ring_info(with_hydrogens: bool) -> Arc<MoleculeInfo> {
        let mut builder = MoleculeInfo::builder()
            .start_residue(1, "BNZ")
            .and_then(|b| b.add_atoms(&CARBONS))
            .unwrap();
        if with_hydrogens {
            builder = builder.add_atoms(&HYDROGENS).unwrap();
        }
        Arc::new(builder.build())
    }

    /// Six ring carbons (atoms 0-5), each carrying one hydrogen (atoms 6-11).
    fn benzene() -> Molecule {
        let info = ring_info(true);
        let mut editor = ConnectivityEditor::new(Arc::clone(&info));
        for i in 0..6 {
            editor.connect(a(i), a((i + 1) % 6)).unwrap();
            editor.connect(a(i), a(i + 6)).unwrap();
        }
        let mut elements = vec![Element::CARBON; 6];
        elements.extend([Element::HYDROGEN; 6]);
        Molecule::new(info)
            .with_elements(elements)
            .with_connectivity(editor.commit())
    }

    /// Benzene as above plus a free chloride ion (atom 12) in its own residue.
    fn benzene_and_chloride() -> Molecule {
        let info = MoleculeInfo::builder()
            .start_residue(1, "BNZ")
            .and_then(|b| b.add_atoms(&CARBONS))
            .and_then(|b| b.add_atoms(&HYDROGENS))
            .and_then(|b| b.start_residue(2, "CL"))
            .and_then(|b| b.add_atoms(&["CL"]))
            .unwrap();
        let info = Arc::new(info.build());
        let mut editor = ConnectivityEditor::new(Arc::clone(&info));
        for i in 0..6 {
            editor.connect(a(i), a((i + 1) % 6)).unwrap();
            editor.connect(a(i), a(i + 6)).unwrap();
        }
        let mut elements = vec![Element::CARBON; 6];
        elements.extend([Element::HYDROGEN; 6]);
        elements.push(Element::from_symbol("Cl").unwrap());
        Molecule::new(info)
            .with_elements(elements)
            .with_connectivity(editor.commit())
    }

    /// Carbons only, bonded as given.
    fn carbon_skeleton(n: u32, bonds: &[(u32, u32)]) -> Molecule {
        let names: Vec<String> = (0..n).map(|i| format!("C{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let info = MoleculeInfo::builder()
            .start_residue(1, "SKL")
            .and_then(|b| b.add_atoms(&names))
            .unwrap();
        let info = Arc::new(info.build());
        let mut editor = ConnectivityEditor::new(Arc::clone(&info));
        for &(i, j) in bonds {
            editor.connect(a(i), a(j)).unwrap();
        }
        Molecule::new(info)
            .with_elements(vec![Element::CARBON; n as usize])
            .with_connectivity(editor.commit())
    }

    /// Ring carbons only, with coordinates on a regular hexagon and no bonds.
    fn carbon_hexagon() -> Molecule {
        let coordinates = (0..6)
            .map(|i| {
                let angle = f64::from(i) * std::f64::consts::FRAC_PI_3;
                Point3::new(1.39 * angle.cos(), 1.39 * angle.sin(), 0.0)
            })
            .collect();
        Molecule::new(ring_info(false))
            .with_elements(vec![Element::CARBON; 6])
            .with_coordinates(coordinates)
    }

    fn run(m0: &Molecule, m1: &Molecule, matcher: Option<&dyn AtomMatcher>) -> McsResult {
        find_mcs(
            &MoleculeView::new(m0),
            &MoleculeView::new(m1),
            matcher,
            &config(),
            &ProgressReporter::new(),
        )
        .unwrap()
    }

    mod matching {
        use super::*;

        #[test]
        fn identical_rings_map_every_heavy_atom() {
            let mol = benzene();
            let start = Instant::now();
            let result = run(&mol, &mol, None);

            assert!(start.elapsed() < Duration::from_secs(10));
            assert!(!result.timed_out);
            assert_eq!(result.len(), 6);
            assert!(result.mapping.keys().all(|atom| atom.value() < 6));
            assert!(result.mapping.values().all(|atom| atom.value() < 6));
        }

        #[test]
        fn pinning_never_shrinks_the_match() {
            let mol = benzene();
            let free = run(&mol, &mol, None);

            fn rotate(_: &MoleculeView<'_>, _: &MoleculeView<'_>) -> Result<AtomMapping, McsError> {
                Ok(AtomMapping::from([(AtomIdx(0), AtomIdx(3))]))
            }
            let rotated = run(&mol, &mol, Some(&rotate));
            assert!(rotated.len() >= free.len());
            assert_eq!(rotated.mapping.get(&a(0)), Some(&a(3)));

            // Pinning every atom by name also pins the hydrogens.
            let by_name = run(&mol, &mol, Some(&AtomNameMatcher));
            assert!(by_name.len() >= free.len());
            assert_eq!(by_name.len(), 12);
            assert_eq!(by_name.mapping.get(&a(7)), Some(&a(7)));
        }

        #[test]
        fn light_atoms_only_give_an_empty_match() {
            let info = MoleculeInfo::builder()
                .start_residue(1, "H2")
                .and_then(|b| b.add_atoms(&["H1", "H2"]))
                .unwrap()
                .build();
            let info = Arc::new(info);
            let mut editor = ConnectivityEditor::new(Arc::clone(&info));
            editor.connect(a(0), a(1)).unwrap();
            let hydrogen = Molecule::new(info)
                .with_elements(vec![Element::HYDROGEN; 2])
                .with_connectivity(editor.commit());

            let result = run(&hydrogen, &benzene(), None);
            assert!(result.is_empty());
            assert!(!result.timed_out);
        }

        #[test]
        fn selection_limits_the_match() {
            let mol = benzene();
            let selection = AtomSelection::from_atoms(12, [a(0), a(1), a(2)]).unwrap();
            let result = find_mcs(
                &MoleculeView::with_selection(&mol, selection),
                &MoleculeView::new(&mol),
                None,
                &config(),
                &ProgressReporter::new(),
            )
            .unwrap();
            assert_eq!(result.len(), 3);
            assert!(result.mapping.keys().all(|atom| atom.value() < 3));
        }

        #[test]
        fn lowest_indices_tie_break_picks_smallest_pairs() {
            // A star cannot cover a path, so the search sees every tie.
            let star = carbon_skeleton(4, &[(0, 1), (0, 2), (0, 3)]);
            let path = carbon_skeleton(4, &[(0, 1), (1, 2), (2, 3)]);
            let config = McsConfig::builder()
                .timeout(Duration::from_secs(10))
                .tie_break(TieBreak::LowestIndices)
                .build()
                .unwrap();
            let result = find_mcs(
                &MoleculeView::new(&star),
                &MoleculeView::new(&path),
                None,
                &config,
                &ProgressReporter::new(),
            )
            .unwrap();

            assert!(result.n_tied > 1);
            let expected = BTreeMap::from([(a(0), a(1)), (a(1), a(0)), (a(2), a(2))]);
            assert_eq!(result.mapping, expected);
        }
    }

    mod pinning {
        use super::*;

        #[test]
        fn pin_on_detached_fragment_keeps_the_larger_match() {
            let mol = benzene_and_chloride();
            let free = run(&mol, &mol, None);
            assert_eq!(free.len(), 6);

            fn chloride(_: &MoleculeView<'_>, _: &MoleculeView<'_>) -> Result<AtomMapping, McsError> {
                Ok(AtomMapping::from([(AtomIdx(12), AtomIdx(12))]))
            }
            let pinned = run(&mol, &mol, Some(&chloride));
            assert!(pinned.len() >= free.len());
            assert_eq!(pinned.len(), 7);
            assert_eq!(pinned.mapping.get(&a(12)), Some(&a(12)));
            assert!((0..6).all(|i| pinned.mapping.contains_key(&a(i))));
        }

        #[test]
        fn pins_that_disagree_on_a_bond_are_rejected() {
            let mol = benzene();
            fn skewed(_: &MoleculeView<'_>, _: &MoleculeView<'_>) -> Result<AtomMapping, McsError> {
                // Atoms 0 and 1 are bonded; atoms 0 and 2 are not.
                Ok(AtomMapping::from([(AtomIdx(0), AtomIdx(0)), (AtomIdx(1), AtomIdx(2))]))
            }
            let view = MoleculeView::new(&mol);
            let result = find_mcs(&view, &view, Some(&skewed), &config(), &ProgressReporter::new());
            assert!(matches!(result, Err(McsError::Matcher { .. })));
        }

        #[test]
        fn pinned_light_atom_joins_and_constrains_the_match() {
            let mol = benzene();
            fn first_hydrogen(
                _: &MoleculeView<'_>,
                _: &MoleculeView<'_>,
            ) -> Result<AtomMapping, McsError> {
                Ok(AtomMapping::from([(AtomIdx(6), AtomIdx(6))]))
            }
            let result = run(&mol, &mol, Some(&first_hydrogen));

            assert_eq!(result.len(), 7);
            assert_eq!(result.mapping.get(&a(6)), Some(&a(6)));
            // The hydrogen's carbon can only map onto the carbon bonded to
            // the hydrogen's partner.
            assert_eq!(result.mapping.get(&a(0)), Some(&a(0)));
            assert!(result.mapping.keys().all(|atom| atom.value() <= 6));
        }
    }

    mod properties {
        use super::*;

        #[test]
        fn elements_are_derived_from_masses() {
            let mut mol = benzene();
            let elements = mol.elements.take().unwrap();
            mol.masses = Some(elements.iter().map(|e| e.mass()).collect());
            assert_eq!(run(&mol, &benzene(), None).len(), 6);
        }

        #[test]
        fn bonds_are_perceived_from_coordinates() {
            let hexagon = carbon_hexagon();
            assert_eq!(run(&hexagon, &benzene(), None).len(), 6);
        }

        #[test]
        fn missing_element_data_is_an_error() {
            let mut mol = benzene();
            mol.elements = None;
            let result = find_mcs(
                &MoleculeView::new(&benzene()),
                &MoleculeView::new(&mol),
                None,
                &config(),
                &ProgressReporter::new(),
            );
            assert!(matches!(
                result,
                Err(McsError::MissingProperty {
                    molecule: 1,
                    property: "element"
                })
            ));
        }

        #[test]
        fn missing_connectivity_is_an_error() {
            let mut mol = carbon_hexagon();
            mol.coordinates = None;
            let result = find_mcs(
                &MoleculeView::new(&mol),
                &MoleculeView::new(&benzene()),
                None,
                &config(),
                &ProgressReporter::new(),
            );
            assert!(matches!(
                result,
                Err(McsError::MissingProperty {
                    molecule: 0,
                    property: "connectivity"
                })
            ));
        }

        #[test]
        fn inconsistent_matcher_is_rejected() {
            let mol = benzene();
            fn clash(_: &MoleculeView<'_>, _: &MoleculeView<'_>) -> Result<AtomMapping, McsError> {
                Ok(AtomMapping::from([(AtomIdx(0), AtomIdx(1)), (AtomIdx(2), AtomIdx(1))]))
            }
            let view = MoleculeView::new(&mol);
            let result = find_mcs(&view, &view, Some(&clash), &config(), &ProgressReporter::new());
            assert!(matches!(result, Err(McsError::Matcher { .. })));
        }
    }

    mod budget {
        use super::*;

        #[test]
        fn exhausted_budget_is_reported() {
            let messages = Mutex::new(Vec::new());
            let reporter = ProgressReporter::with_callback(Box::new(|event| {
                if let Progress::Message(text) = event {
                    messages.lock().unwrap().push(text);
                }
            }));
            let mol = benzene();
            let config = McsConfig::builder()
                .timeout(Duration::from_nanos(1))
                .build()
                .unwrap();
            let view = MoleculeView::new(&mol);
            let result = find_mcs(&view, &view, None, &config, &reporter).unwrap();
            drop(reporter);

            assert!(result.timed_out);
            let messages = messages.into_inner().unwrap();
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("budget"));
        }

        #[test]
        fn phases_and_improvements_are_reported() {
            let events = Mutex::new(Vec::new());
            let reporter = ProgressReporter::with_callback(Box::new(|event| {
                events.lock().unwrap().push(event);
            }));
            let mol = benzene();
            let view = MoleculeView::new(&mol);
            find_mcs(&view, &view, None, &config(), &reporter).unwrap();
            drop(reporter);

            let events = events.into_inner().unwrap();
            let phases: Vec<&str> = events
                .iter()
                .filter_map(|e| match e {
                    Progress::PhaseStart { name } => Some(*name),
                    _ => None,
                })
                .collect();
            assert_eq!(phases, vec!["Pre-matching", "Graph construction", "Search"]);
            assert!(events
                .iter()
                .any(|e| matches!(e, Progress::Improved { size: 6 })));
        }
    }
}
