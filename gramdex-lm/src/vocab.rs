//! Bidirectional word ↔ id dictionary.
//!
//! Forward (id → string): O(1) Vec index. Reverse (string → id): FxHashMap
//! lookup. `Arc<str>` shared between both — no string duplication.
//!
//! Ids are dense `0..len`. Id 0 is reserved for the unknown word; queries
//! for out-of-vocabulary strings resolve to it instead of failing.

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Dense word identifier. 0 is the reserved unknown id.
pub type WordId = u32;

/// The reserved unknown-word id.
pub const UNK_ID: WordId = 0;

/// Conventional spelling of the unknown word in model files.
pub const UNK_TOKEN: &str = "<unk>";

/// Conventional spelling of the begin-of-sentence marker.
pub const BOS_TOKEN: &str = "<s>";

/// Immutable bidirectional string ↔ `WordId` map.
#[derive(Debug)]
pub struct Vocabulary {
    forward: Vec<Arc<str>>,
    reverse: FxHashMap<Arc<str>, WordId>,
}

impl Vocabulary {
    /// Build from an ordered word list: entry at index `i` gets id `i`.
    ///
    /// This is the only constructor — id stability is guaranteed by the
    /// order of the persisted vocabulary section.
    pub fn from_ordered_words(words: Vec<Arc<str>>) -> Self {
        let mut reverse =
            FxHashMap::with_capacity_and_hasher(words.len(), Default::default());
        for (id, w) in words.iter().enumerate() {
            reverse.insert(Arc::clone(w), id as WordId);
        }
        Self {
            forward: words,
            reverse,
        }
    }

    /// Id of `word`, or the reserved unknown id when absent.
    #[inline]
    pub fn word_id(&self, word: &str) -> WordId {
        self.find(word).unwrap_or(UNK_ID)
    }

    /// Id of `word` without the unknown fallback.
    #[inline]
    pub fn find(&self, word: &str) -> Option<WordId> {
        self.reverse.get(word).copied()
    }

    /// The string for a given id.
    pub fn resolve(&self, id: WordId) -> Option<&str> {
        self.forward.get(id as usize).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Words in id order (for serialization).
    pub fn words(&self) -> &[Arc<str>] {
        &self.forward
    }
}
