use super::group::InternalGroup;
use crate::core::models::ids::{GroupId, GroupIndexId, Index};
use crate::core::models::internals::Internal;
use crate::core::models::molecule_info::MoleculeInfo;
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) type GroupMap<T> = BTreeMap<GroupId, InternalGroup<T>>;

#[derive(Debug, Clone)]
struct Cursor<T: Internal> {
    molinfo: Arc<MoleculeInfo>,
    groups: Arc<GroupMap<T>>,
    group_ids: Arc<[GroupId]>,
    // `group_pos == group_ids.len()` marks the end position.
    group_pos: usize,
    index: usize,
}

impl<T: Internal> Cursor<T> {
    fn group_at(&self, pos: usize) -> Option<&InternalGroup<T>> {
        self.group_ids
            .get(pos)
            .and_then(|id| self.groups.get(id))
    }

    fn current_len(&self) -> usize {
        self.group_at(self.group_pos)
            .map(InternalGroup::n_internals)
            .unwrap_or(0)
    }
}

/// A restartable, bidirectional cursor over the internals of one or more
/// groups.
///
/// The cursor owns a snapshot of the group map taken when it was created, so
/// an `InternalInfo` may be modified while cursors created from it are still
/// alive: they keep iterating the data as it was.
///
/// Groups are visited in ascending [`GroupId`] order and the internals of a
/// group in index order. A default-constructed cursor is invalid; a cursor
/// created for a query with no results is valid but empty.
#[derive(Debug, Clone)]
pub struct InternalGroupIterator<T: Internal> {
    cursor: Option<Cursor<T>>,
}

impl<T: Internal> Default for InternalGroupIterator<T> {
    fn default() -> Self {
        Self { cursor: None }
    }
}

impl<T: Internal> InternalGroupIterator<T> {
    pub(crate) fn new(
        molinfo: Arc<MoleculeInfo>,
        groups: Arc<GroupMap<T>>,
        group_ids: impl IntoIterator<Item = GroupId>,
    ) -> Self {
        let mut ids: Vec<GroupId> = group_ids
            .into_iter()
            .filter(|id| groups.get(id).is_some_and(|g| !g.is_empty()))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        Self {
            cursor: Some(Cursor {
                molinfo,
                groups,
                group_ids: ids.into(),
                group_pos: 0,
                index: 0,
            }),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cursor.is_some()
    }

    /// True when there is nothing to iterate (including the invalid case).
    pub fn is_empty(&self) -> bool {
        self.cursor
            .as_ref()
            .is_none_or(|c| c.group_ids.is_empty())
    }

    pub fn at_end(&self) -> bool {
        self.cursor
            .as_ref()
            .is_none_or(|c| c.group_pos >= c.group_ids.len())
    }

    /// The groups this cursor ranges over, in visiting order.
    pub fn group_ids(&self) -> &[GroupId] {
        match &self.cursor {
            Some(c) => &c.group_ids[..],
            None => &[],
        }
    }

    /// Total number of internals over the whole range (not just the rest).
    pub fn n_internals(&self) -> usize {
        self.cursor.as_ref().map_or(0, |c| {
            c.group_ids
                .iter()
                .filter_map(|id| c.groups.get(id))
                .map(InternalGroup::n_internals)
                .sum()
        })
    }

    pub fn current(&self) -> Option<T> {
        let c = self.cursor.as_ref()?;
        c.group_at(c.group_pos)?.internal(Index(c.index as u32)).ok()
    }

    pub fn current_id(&self) -> Option<GroupIndexId> {
        let c = self.cursor.as_ref()?;
        let group = *c.group_ids.get(c.group_pos)?;
        Some(GroupIndexId::new(group, Index(c.index as u32)))
    }

    /// Moves one internal forward, crossing into the next group when the
    /// current one is exhausted. Does nothing at the end.
    pub fn advance(&mut self) {
        let Some(c) = self.cursor.as_mut() else {
            return;
        };
        if c.group_pos >= c.group_ids.len() {
            return;
        }
        c.index += 1;
        if c.index >= c.current_len() {
            c.group_pos += 1;
            c.index = 0;
        }
    }

    /// Moves one internal back. Stepping back from the end lands on the last
    /// internal; stepping back from the first internal does nothing.
    pub fn retreat(&mut self) {
        let Some(c) = self.cursor.as_mut() else {
            return;
        };
        if c.index > 0 {
            c.index -= 1;
        } else if c.group_pos > 0 {
            c.group_pos -= 1;
            c.index = c.current_len().saturating_sub(1);
        }
    }

    pub fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    pub fn retreat_by(&mut self, n: usize) {
        for _ in 0..n {
            self.retreat();
        }
    }

    /// Moves back to the first internal of the first group.
    pub fn restart(&mut self) {
        if let Some(c) = self.cursor.as_mut() {
            c.group_pos = 0;
            c.index = 0;
        }
    }

    /// Returns a copy positioned on `internal`, or at the end if it is not in
    /// range. Only groups whose residue key matches the internal's are
    /// searched.
    pub fn find(&self, internal: &T) -> Self {
        let mut found = self.clone();
        let Some(c) = found.cursor.as_mut() else {
            return found;
        };
        c.group_pos = c.group_ids.len();
        c.index = 0;

        let Ok(key) = internal.residue_key(&c.molinfo) else {
            return found;
        };
        for (pos, id) in c.group_ids.iter().enumerate() {
            let Some(group) = c.groups.get(id) else {
                continue;
            };
            if *group.residue_key() != key {
                continue;
            }
            if let Some(index) = group.index_of(internal) {
                c.group_pos = pos;
                c.index = index.value();
                break;
            }
        }
        found
    }

    /// A cursor over only the group the current position lies in, positioned
    /// at its first internal. At the end this is a valid, empty cursor.
    pub fn current_group(&self) -> Self {
        let Some(c) = self.cursor.as_ref() else {
            return Self::default();
        };
        let ids: Vec<GroupId> = c.group_ids.get(c.group_pos).copied().into_iter().collect();
        Self::new(Arc::clone(&c.molinfo), Arc::clone(&c.groups), ids)
    }
}

impl<T: Internal> Iterator for InternalGroupIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.current()?;
        self.advance();
        Some(item)
    }
}

impl<T: Internal> PartialEq for InternalGroupIterator<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.cursor, &other.cursor) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                Arc::ptr_eq(&a.groups, &b.groups)
                    && a.group_ids == b.group_ids
                    && a.group_pos == b.group_pos
                    && a.index == b.index
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::{AtomIdx, ResNum};
    use crate::core::models::internals::{Bond, ResidueKey};

    struct Fixture {
        molinfo: Arc<MoleculeInfo>,
        groups: Arc<GroupMap<Bond>>,
    }

    fn bond(i: u32, j: u32) -> Bond {
        Bond::new(AtomIdx(i), AtomIdx(j))
    }

    // Residue 1: atoms 0-2, residue 2: atoms 3-5.
    // Group 0 holds two intra-1 bonds, group 3 one inter bond, group 5 one intra-2 bond.
    fn fixture() -> Fixture {
        let molinfo = MoleculeInfo::builder()
            .start_residue(1, "A")
            .unwrap()
            .add_atoms(&["C1", "C2", "C3"])
            .unwrap()
            .start_residue(2, "B")
            .unwrap()
            .add_atoms(&["C4", "C5", "C6"])
            .unwrap()
            .build();

        let mut g0 = InternalGroup::new(ResidueKey::new(&[ResNum(1), ResNum(1)]));
        g0.add(&bond(0, 1));
        g0.add(&bond(1, 2));
        let mut g3 = InternalGroup::new(ResidueKey::new(&[ResNum(1), ResNum(2)]));
        g3.add(&bond(2, 3));
        let mut g5 = InternalGroup::new(ResidueKey::new(&[ResNum(2), ResNum(2)]));
        g5.add(&bond(3, 4));

        let mut groups = GroupMap::new();
        groups.insert(GroupId(5), g5);
        groups.insert(GroupId(0), g0);
        groups.insert(GroupId(3), g3);

        Fixture {
            molinfo: Arc::new(molinfo),
            groups: Arc::new(groups),
        }
    }

    fn full_iterator(f: &Fixture) -> InternalGroupIterator<Bond> {
        InternalGroupIterator::new(
            Arc::clone(&f.molinfo),
            Arc::clone(&f.groups),
            [GroupId(5), GroupId(3), GroupId(0)],
        )
    }

    #[test]
    fn default_iterators_are_invalid_and_equal() {
        let a = InternalGroupIterator::<Bond>::default();
        let b = InternalGroupIterator::<Bond>::default();
        assert!(!a.is_valid());
        assert!(a.at_end());
        assert_eq!(a, b);
    }

    #[test]
    fn iteration_crosses_groups_in_ascending_id_order() {
        let f = fixture();
        let all: Vec<Bond> = full_iterator(&f).collect();
        assert_eq!(all, vec![bond(0, 1), bond(1, 2), bond(2, 3), bond(3, 4)]);
    }

    #[test]
    fn current_id_reports_group_and_index() {
        let f = fixture();
        let mut it = full_iterator(&f);
        it.advance_by(2);
        assert_eq!(it.current_id(), Some(GroupIndexId::new(GroupId(3), Index(0))));
        assert_eq!(it.current(), Some(bond(2, 3)));
    }

    #[test]
    fn retreat_is_clamped_at_the_first_internal() {
        let f = fixture();
        let mut it = full_iterator(&f);
        it.retreat();
        assert_eq!(it.current(), Some(bond(0, 1)));
        it.advance_by(3);
        it.retreat_by(2);
        assert_eq!(it.current(), Some(bond(1, 2)));
        it.retreat_by(10);
        assert_eq!(it.current(), Some(bond(0, 1)));
    }

    #[test]
    fn advancing_past_the_end_stays_at_the_end() {
        let f = fixture();
        let mut it = full_iterator(&f);
        it.advance_by(10);
        assert!(it.at_end());
        assert_eq!(it.current(), None);
        it.retreat();
        assert_eq!(it.current(), Some(bond(3, 4)));
    }

    #[test]
    fn restart_returns_to_the_beginning() {
        let f = fixture();
        let mut it = full_iterator(&f);
        it.advance_by(3);
        it.restart();
        assert_eq!(it.current(), Some(bond(0, 1)));
    }

    #[test]
    fn find_positions_on_the_requested_internal() {
        let f = fixture();
        let it = full_iterator(&f);
        let found = it.find(&bond(3, 2));
        assert_eq!(found.current(), Some(bond(2, 3)));

        let missing = it.find(&bond(0, 5));
        assert!(missing.at_end());
        let outside = it.find(&bond(0, 99));
        assert!(outside.at_end());
    }

    #[test]
    fn current_group_scopes_to_one_group() {
        let f = fixture();
        let mut it = full_iterator(&f);
        it.advance();
        let group_only: Vec<Bond> = it.current_group().collect();
        assert_eq!(group_only, vec![bond(0, 1), bond(1, 2)]);

        it.advance_by(10);
        let at_end = it.current_group();
        assert!(at_end.is_valid());
        assert!(at_end.is_empty());
    }

    #[test]
    fn empty_but_valid_iterator_yields_nothing() {
        let f = fixture();
        let it = InternalGroupIterator::new(
            Arc::clone(&f.molinfo),
            Arc::clone(&f.groups),
            std::iter::empty(),
        );
        assert!(it.is_valid());
        assert!(it.is_empty());
        assert_eq!(it.count(), 0);
    }

    #[test]
    fn copies_compare_equal_until_one_moves() {
        let f = fixture();
        let a = full_iterator(&f);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.advance();
        assert_ne!(a, b);
        assert_eq!(a.n_internals(), 4);
    }
}
