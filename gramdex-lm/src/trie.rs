//! One trie level: the flat-array representation of all n-grams of a fixed
//! order.
//!
//! No node objects and no pointers — a level is three parallel structures
//! addressed by position:
//!
//! - `ids`: the level's word ids as one Elias-Fano sequence. Each parent's
//!   children occupy a contiguous position range with strictly increasing
//!   ids; ranges are chained into a single non-decreasing sequence by adding
//!   to every range the last stored value of the preceding range (its
//!   "previous upper bound"). Searching a range first re-applies that offset.
//! - `ptrs`: child-range boundaries into the next order (`len + 1` values,
//!   starting at 0). Absent at the maximum order.
//! - `values`: per-position value codes — raw counts for a count model,
//!   codebook codes for a probability model.

use crate::vocab::WordId;
use gramdex_core::{CompactVector, EliasFano};

/// Half-open position range `[begin, end)` within a trie level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRange {
    pub begin: usize,
    pub end: usize,
}

impl NodeRange {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// Per-position value storage of one level.
#[derive(Debug, Clone)]
pub enum LevelValues {
    /// Raw frequencies (count models).
    Counts(CompactVector),
    /// Codebook codes (probability models); `backoffs` is `None` at the
    /// maximum order, where no further backoff exists.
    ProbBackoff {
        probs: CompactVector,
        backoffs: Option<CompactVector>,
    },
}

/// All n-grams of one order, in succinct form.
#[derive(Debug, Clone)]
pub struct TrieLevel {
    ids: EliasFano,
    ptrs: Option<EliasFano>,
    values: LevelValues,
}

impl TrieLevel {
    pub fn new(ids: EliasFano, ptrs: Option<EliasFano>, values: LevelValues) -> Self {
        Self { ids, ptrs, values }
    }

    /// Number of n-grams stored at this level.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The implicit range spanning the whole level. Only meaningful at
    /// order 1, where every entry is a child of the (virtual) root.
    pub fn root_range(&self) -> NodeRange {
        NodeRange {
            begin: 0,
            end: self.ids.len(),
        }
    }

    /// Binary-search `word_id` within a parent's children range.
    ///
    /// `None` means the parent has no child with this id — normal control
    /// flow (a count of 0, or a backoff step), never an error.
    pub fn find_child(&self, r: NodeRange, word_id: WordId) -> Option<usize> {
        if r.is_empty() {
            return None;
        }
        let prev_upper = if r.begin > 0 { self.ids.get(r.begin - 1) } else { 0 };
        self.ids.find_in(r.begin, r.end, word_id as u64 + prev_upper)
    }

    /// The children range at the next order of the node at `pos`.
    ///
    /// `None` at the maximum order (no deeper level exists).
    pub fn child_range(&self, pos: usize) -> Option<NodeRange> {
        let ptrs = self.ptrs.as_ref()?;
        Some(NodeRange {
            begin: ptrs.get(pos) as usize,
            end: ptrs.get(pos + 1) as usize,
        })
    }

    /// The value storage of this level.
    pub fn values(&self) -> &LevelValues {
        &self.values
    }

    /// Count value at `pos`. Count-model levels only.
    pub fn count(&self, pos: usize) -> u64 {
        match &self.values {
            LevelValues::Counts(cv) => cv.get(pos),
            LevelValues::ProbBackoff { .. } => {
                unreachable!("count access on a probability level")
            }
        }
    }

    /// Probability code at `pos`. Probability-model levels only.
    pub fn prob_code(&self, pos: usize) -> u64 {
        match &self.values {
            LevelValues::ProbBackoff { probs, .. } => probs.get(pos),
            LevelValues::Counts(_) => unreachable!("prob access on a count level"),
        }
    }

    /// Backoff code at `pos`, `None` at the maximum order.
    pub fn backoff_code(&self, pos: usize) -> Option<u64> {
        match &self.values {
            LevelValues::ProbBackoff { backoffs, .. } => {
                backoffs.as_ref().map(|cv| cv.get(pos))
            }
            LevelValues::Counts(_) => unreachable!("backoff access on a count level"),
        }
    }

    /// The id sequence (for serialization).
    pub fn ids(&self) -> &EliasFano {
        &self.ids
    }

    /// The boundary sequence (for serialization and validation).
    pub fn ptrs(&self) -> Option<&EliasFano> {
        self.ptrs.as_ref()
    }
}

/// Chain `find_child` across levels: the position of the full id sequence
/// at level `ids.len() - 1`, or `None` if any step misses.
///
/// A valid range from level k is by construction a valid input to level
/// k + 1, so this loop is an exact n-gram lookup.
pub fn chained_position(levels: &[TrieLevel], ids: &[WordId]) -> Option<usize> {
    debug_assert!(!ids.is_empty() && ids.len() <= levels.len());
    let mut range = levels[0].root_range();
    let mut pos = levels[0].find_child(range, ids[0])?;
    for k in 1..ids.len() {
        // level k - 1 always has boundaries here since ids.len() <= order
        range = levels[k - 1].child_range(pos)?;
        pos = levels[k].find_child(range, ids[k])?;
    }
    Some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramdex_core::{bits_for, CompactVectorBuilder, EliasFano};

    fn counts(values: &[u64]) -> LevelValues {
        let max = values.iter().copied().max().unwrap_or(0);
        let mut b = CompactVectorBuilder::new(bits_for(max)).unwrap();
        for &v in values {
            b.push(v);
        }
        LevelValues::Counts(b.freeze())
    }

    /// Two-level fixture: unigrams {0,1,2,3}, children of 1 = {0, 2},
    /// children of 3 = {1}. Offset-transformed bigram ids: [0, 2, 2+1].
    fn two_levels() -> Vec<TrieLevel> {
        let uni_ids = EliasFano::from_sorted(&[0, 1, 2, 3]).unwrap();
        let ptrs = EliasFano::from_sorted(&[0, 0, 2, 2, 3]).unwrap();
        let uni = TrieLevel::new(uni_ids, Some(ptrs), counts(&[1, 5, 1, 2]));

        let bi_ids = EliasFano::from_sorted(&[0, 2, 3]).unwrap();
        let bi = TrieLevel::new(bi_ids, None, counts(&[7, 3, 4]));
        vec![uni, bi]
    }

    #[test]
    fn test_find_child_at_root() {
        let levels = two_levels();
        let root = levels[0].root_range();
        assert_eq!(levels[0].find_child(root, 2), Some(2));
        assert_eq!(levels[0].find_child(root, 9), None);
    }

    #[test]
    fn test_child_range_and_offset_search() {
        let levels = two_levels();
        let root = levels[0].root_range();

        let pos = levels[0].find_child(root, 1).unwrap();
        let r = levels[0].child_range(pos).unwrap();
        assert_eq!(r, NodeRange { begin: 0, end: 2 });
        assert_eq!(levels[1].find_child(r, 0), Some(0));
        assert_eq!(levels[1].find_child(r, 2), Some(1));
        assert_eq!(levels[1].find_child(r, 1), None);

        // second parent's range: ids are offset by the previous upper bound
        let pos = levels[0].find_child(root, 3).unwrap();
        let r = levels[0].child_range(pos).unwrap();
        assert_eq!(r, NodeRange { begin: 2, end: 3 });
        assert_eq!(levels[1].find_child(r, 1), Some(2));
        assert_eq!(levels[1].find_child(r, 0), None);
    }

    #[test]
    fn test_empty_range_misses() {
        let levels = two_levels();
        let root = levels[0].root_range();
        let pos = levels[0].find_child(root, 0).unwrap();
        let r = levels[0].child_range(pos).unwrap();
        assert!(r.is_empty());
        assert_eq!(levels[1].find_child(r, 0), None);
    }

    #[test]
    fn test_chained_position() {
        let levels = two_levels();
        assert_eq!(chained_position(&levels, &[1, 2]), Some(1));
        assert_eq!(chained_position(&levels, &[3, 1]), Some(2));
        assert_eq!(chained_position(&levels, &[1, 1]), None);
        assert_eq!(chained_position(&levels, &[2]), Some(2));
        assert_eq!(levels[1].count(chained_position(&levels, &[1, 2]).unwrap()), 3);
    }
}
