//! Compact set of consumed query lengths.
//!
//! Matching a phonetic unit at some query offset can consume several
//! different numbers of characters (an abbreviation, the full syllable, the
//! syllable plus a tone key). `IndexSet` stores those lengths as bits of a
//! `u32`, which comfortably covers the longest keystroke spelling of a
//! syllable.

/// Set of lengths in `0..32`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IndexSet(u32);

impl IndexSet {
    pub const NONE: IndexSet = IndexSet(0);
    /// The set containing only length zero.
    pub const ZERO: IndexSet = IndexSet(1);

    pub const CAPACITY: usize = 32;

    pub fn single(len: usize) -> Self {
        let mut set = IndexSet::NONE;
        set.set(len);
        set
    }

    /// Insert `len`. Lengths beyond capacity are ignored.
    pub fn set(&mut self, len: usize) {
        if len < Self::CAPACITY {
            self.0 |= 1 << len;
        }
    }

    pub fn get(&self, len: usize) -> bool {
        len < Self::CAPACITY && self.0 & (1 << len) != 0
    }

    pub fn merge(&mut self, other: IndexSet) {
        self.0 |= other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Shift every length up by `by`.
    pub fn offset(self, by: usize) -> IndexSet {
        if by >= Self::CAPACITY {
            IndexSet::NONE
        } else {
            IndexSet(self.0 << by)
        }
    }

    /// Largest contained length.
    pub fn max(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(31 - self.0.leading_zeros() as usize)
        }
    }

    /// Contained lengths in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let next = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Some(next)
        })
    }
}

impl FromIterator<usize> for IndexSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = IndexSet::NONE;
        for len in iter {
            set.set(len);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_iterate() {
        let set: IndexSet = [3, 1, 4, 1].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3, 4]);
        assert_eq!(set.max(), Some(4));
        assert!(set.get(3));
        assert!(!set.get(2));
    }

    #[test]
    fn merge_and_offset() {
        let mut set = IndexSet::ZERO;
        set.merge(IndexSet::single(2));
        assert_eq!(set.offset(3).iter().collect::<Vec<_>>(), vec![3, 5]);
        assert!(IndexSet::ZERO.offset(40).is_empty());
    }

    #[test]
    fn out_of_capacity_lengths_are_dropped() {
        let mut set = IndexSet::NONE;
        set.set(32);
        assert!(set.is_empty());
        assert_eq!(set.max(), None);
        assert!(!set.get(99));
    }
}
