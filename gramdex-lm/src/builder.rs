//! In-memory model builders.
//!
//! The builders accept per-n-gram entries in any order, assemble the trie
//! layout (children grouped under parents in parent-position order, strictly
//! increasing ids per range, closed boundary ranges), quantize probability
//! values into the shared codebooks, and emit a complete binary model image
//! for [`crate::format::decode_model`] to load.
//!
//! This is the write side of the wire format — corpus counting, ARPA
//! parsing, and probability estimation happen upstream of it.

use crate::format::{self, ModelKind, MAX_ORDER};
use crate::quantizer::Codebook;
use crate::trie::{LevelValues, TrieLevel};
use crate::vocab::{Vocabulary, WordId, UNK_TOKEN};
use gramdex_core::{bits_for, CompactVector, CompactVectorBuilder, EliasFano};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Hard cap on distinct codebook entries (codes must stay small relative
/// to the n-gram count for quantization to win anything).
pub const MAX_CODEBOOK: usize = 1 << 16;

/// Errors raised while assembling a model image.
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("invalid model order {got}: must be between 1 and {max}")]
    InvalidOrder { got: u8, max: u8 },

    #[error("n-gram is empty")]
    EmptyGram,

    #[error("{got}-gram exceeds builder order {order}")]
    OrderExceeded { got: usize, order: u8 },

    #[error("duplicate n-gram: \"{0}\"")]
    DuplicateGram(String),

    /// Every k-gram's (k−1)-prefix must itself be stored, or there is no
    /// node to hang its children range from.
    #[error("missing parent {0}-gram: \"{1}\"")]
    MissingParent(usize, String),

    /// Probability models need an explicit unigram (with its probability)
    /// for every vocabulary word, the unknown word included.
    #[error("missing unigram entry for \"{0}\"")]
    MissingUnigram(String),

    #[error("codebook needs {0} distinct values (max {MAX_CODEBOOK})")]
    TooManyCodewords(usize),

    #[error(transparent)]
    Core(#[from] gramdex_core::Error),
}

// ============================================================================
// Shared interning + layout
// ============================================================================

/// Word interner + per-order gram tables shared by both builders.
struct GramTables<V> {
    order: u8,
    words: Vec<Arc<str>>,
    word_ids: FxHashMap<Arc<str>, WordId>,
    /// `grams[k - 1]`: id sequence → value, ordered lexicographically —
    /// which is exactly (parent position, last id) order.
    grams: Vec<BTreeMap<Vec<WordId>, V>>,
}

impl<V> GramTables<V> {
    fn new(order: u8) -> Result<Self, BuilderError> {
        if order == 0 || order > MAX_ORDER {
            return Err(BuilderError::InvalidOrder {
                got: order,
                max: MAX_ORDER,
            });
        }
        let mut tables = Self {
            order,
            words: Vec::new(),
            word_ids: FxHashMap::default(),
            grams: (0..order).map(|_| BTreeMap::new()).collect(),
        };
        tables.intern(UNK_TOKEN); // id 0 is reserved
        Ok(tables)
    }

    fn intern(&mut self, word: &str) -> WordId {
        if let Some(&id) = self.word_ids.get(word) {
            return id;
        }
        let id = self.words.len() as WordId;
        let word: Arc<str> = Arc::from(word);
        self.words.push(Arc::clone(&word));
        self.word_ids.insert(word, id);
        id
    }

    fn insert(&mut self, gram: &[&str], value: V) -> Result<(), BuilderError> {
        if gram.is_empty() {
            return Err(BuilderError::EmptyGram);
        }
        if gram.len() > self.order as usize {
            return Err(BuilderError::OrderExceeded {
                got: gram.len(),
                order: self.order,
            });
        }
        let ids: Vec<WordId> = gram.iter().map(|w| self.intern(w)).collect();
        if self.grams[ids.len() - 1].insert(ids, value).is_some() {
            return Err(BuilderError::DuplicateGram(gram.join(" ")));
        }
        Ok(())
    }

    fn resolve(&self, ids: &[WordId]) -> String {
        ids.iter()
            .map(|&id| self.words[id as usize].as_ref())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Trie layout for order k ≥ 2: offset-chained ids plus the parent
    /// level's closed boundary sequence.
    ///
    /// `prev` and `cur` are both lexicographically ordered, so children
    /// appear grouped by parent, in parent-position order, with strictly
    /// increasing ids inside each group.
    fn layout_level(
        &self,
        prev: &BTreeMap<Vec<WordId>, V>,
        cur: &BTreeMap<Vec<WordId>, V>,
    ) -> Result<(Vec<u64>, Vec<u64>), BuilderError> {
        let parent_pos: FxHashMap<&[WordId], usize> = prev
            .keys()
            .enumerate()
            .map(|(i, k)| (k.as_slice(), i))
            .collect();

        let mut per_parent = vec![0u64; prev.len()];
        for key in cur.keys() {
            let parent = &key[..key.len() - 1];
            let pos = *parent_pos.get(parent).ok_or_else(|| {
                BuilderError::MissingParent(parent.len(), self.resolve(parent))
            })?;
            per_parent[pos] += 1;
        }

        let mut ptrs = Vec::with_capacity(prev.len() + 1);
        let mut acc = 0u64;
        ptrs.push(0);
        for &c in &per_parent {
            acc += c;
            ptrs.push(acc);
        }

        // offset chain: each range is shifted by the last stored value of
        // the preceding range, making the whole level one monotone sequence
        let mut ids = Vec::with_capacity(cur.len());
        let mut prev_upper = 0u64;
        let mut last_parent: Option<&[WordId]> = None;
        for key in cur.keys() {
            let parent = &key[..key.len() - 1];
            if last_parent != Some(parent) {
                prev_upper = ids.last().copied().unwrap_or(0);
                last_parent = Some(parent);
            }
            ids.push(*key.last().expect("gram is non-empty") as u64 + prev_upper);
        }

        Ok((ids, ptrs))
    }

    /// The unigram id sequence: the dense identity over the vocabulary.
    fn unigram_ids(&self) -> Vec<u64> {
        (0..self.words.len() as u64).collect()
    }

    fn into_vocab(self) -> Vocabulary {
        Vocabulary::from_ordered_words(self.words)
    }
}

fn compact(values: impl ExactSizeIterator<Item = u64> + Clone) -> CompactVector {
    let max = values.clone().max().unwrap_or(0);
    let mut b = CompactVectorBuilder::with_capacity(bits_for(max), values.len())
        .expect("bits_for yields a valid width");
    for v in values {
        b.push(v);
    }
    b.freeze()
}

// ============================================================================
// Count models
// ============================================================================

/// Assembles a count model image from (n-gram, frequency) entries.
///
/// The unigram level always spans the whole vocabulary: words that were
/// only ever seen inside longer grams get an implicit unigram count of 0.
/// Parents of higher-order grams must be pushed explicitly.
pub struct CountModelBuilder {
    tables: GramTables<u64>,
}

impl CountModelBuilder {
    pub fn new(order: u8) -> Result<Self, BuilderError> {
        Ok(Self {
            tables: GramTables::new(order)?,
        })
    }

    /// Record one n-gram and its frequency.
    pub fn push(&mut self, gram: &[&str], count: u64) -> Result<(), BuilderError> {
        self.tables.insert(gram, count)
    }

    /// Assemble and serialize the model image.
    pub fn finish(mut self) -> Result<Vec<u8>, BuilderError> {
        // close the unigram level over the vocabulary
        for id in 0..self.tables.words.len() as WordId {
            self.tables.grams[0].entry(vec![id]).or_insert(0);
        }

        let order = self.tables.order as usize;
        let mut levels = Vec::with_capacity(order);
        for k in 1..=order {
            let ids = if k == 1 {
                self.tables.unigram_ids()
            } else {
                let (ids, ptrs) =
                    self.tables.layout_level(&self.tables.grams[k - 2], &self.tables.grams[k - 1])?;
                let prev = levels.pop().expect("previous level present");
                levels.push(attach_ptrs(prev, &ptrs)?);
                ids
            };
            let counts = compact(self.tables.grams[k - 1].values().copied());
            levels.push(TrieLevel::new(
                EliasFano::from_sorted(&ids)?,
                None,
                LevelValues::Counts(counts),
            ));
        }

        let vocab = self.tables.into_vocab();
        Ok(format::encode_model(ModelKind::Count, &vocab, &levels, None))
    }
}

// rebuild a finished level with its boundary sequence attached
fn attach_ptrs(level: TrieLevel, ptrs: &[u64]) -> Result<TrieLevel, BuilderError> {
    Ok(TrieLevel::new(
        level.ids().clone(),
        Some(EliasFano::from_sorted(ptrs)?),
        level.values().clone(),
    ))
}

// ============================================================================
// Probability models
// ============================================================================

/// Assembles a probability model image from (n-gram, log10-prob, backoff)
/// entries.
///
/// Backoff weights are meaningful below the maximum order only; the value
/// passed for a maximum-order gram is ignored. Every vocabulary word —
/// `<unk>` included — must receive an explicit unigram entry.
pub struct ProbModelBuilder {
    tables: GramTables<(f32, f32)>,
}

impl ProbModelBuilder {
    pub fn new(order: u8) -> Result<Self, BuilderError> {
        Ok(Self {
            tables: GramTables::new(order)?,
        })
    }

    /// Record one n-gram with its log10-probability and backoff weight.
    pub fn push(
        &mut self,
        gram: &[&str],
        log10_prob: f32,
        backoff: f32,
    ) -> Result<(), BuilderError> {
        self.tables.insert(gram, (log10_prob, backoff))
    }

    /// Assemble and serialize the model image.
    pub fn finish(self) -> Result<Vec<u8>, BuilderError> {
        let order = self.tables.order as usize;

        // probability models cannot invent values: every word needs its
        // unigram probability, the unknown word included
        for id in 0..self.tables.words.len() as WordId {
            if !self.tables.grams[0].contains_key(&vec![id]) {
                return Err(BuilderError::MissingUnigram(
                    self.tables.words[id as usize].to_string(),
                ));
            }
        }

        let prob_codebook = build_codebook(
            self.tables.grams.iter().flat_map(|g| g.values().map(|v| v.0)),
        )?;
        let backoff_codebook = build_codebook(
            self.tables.grams[..order - 1]
                .iter()
                .flat_map(|g| g.values().map(|v| v.1)),
        )?;

        let mut levels = Vec::with_capacity(order);
        for k in 1..=order {
            let ids = if k == 1 {
                self.tables.unigram_ids()
            } else {
                let (ids, ptrs) =
                    self.tables.layout_level(&self.tables.grams[k - 2], &self.tables.grams[k - 1])?;
                let prev = levels.pop().expect("previous level present");
                levels.push(attach_ptrs(prev, &ptrs)?);
                ids
            };

            let table = &self.tables.grams[k - 1];
            let probs = compact(CodeIter::new(table.values().map(|v| v.0), &prob_codebook));
            let backoffs = if k < order {
                Some(compact(CodeIter::new(
                    table.values().map(|v| v.1),
                    &backoff_codebook,
                )))
            } else {
                None
            };
            levels.push(TrieLevel::new(
                EliasFano::from_sorted(&ids)?,
                None,
                LevelValues::ProbBackoff { probs, backoffs },
            ));
        }

        let vocab = self.tables.into_vocab();
        Ok(format::encode_model(
            ModelKind::ProbBackoff,
            &vocab,
            &levels,
            Some((&prob_codebook, &backoff_codebook)),
        ))
    }
}

/// Distinct representative values, sorted for deterministic code
/// assignment; code = position in the table.
fn build_codebook(values: impl Iterator<Item = f32>) -> Result<Codebook, BuilderError> {
    let mut distinct: Vec<f32> = values.collect();
    distinct.sort_by(f32::total_cmp);
    distinct.dedup_by(|a, b| a.to_bits() == b.to_bits());
    if distinct.len() > MAX_CODEBOOK {
        return Err(BuilderError::TooManyCodewords(distinct.len()));
    }
    Ok(Codebook::new(distinct))
}

/// Maps values to their codebook codes on the fly.
#[derive(Clone)]
struct CodeIter<'a, I> {
    values: I,
    codebook: &'a Codebook,
}

impl<'a, I> CodeIter<'a, I> {
    fn new(values: I, codebook: &'a Codebook) -> Self {
        Self { values, codebook }
    }
}

impl<I: Iterator<Item = f32>> Iterator for CodeIter<'_, I> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let v = self.values.next()?;
        let code = self
            .codebook
            .values()
            .binary_search_by(|probe| probe.total_cmp(&v))
            .expect("codebook was built from these values");
        Some(code as u64)
    }
}

impl<I: ExactSizeIterator<Item = f32>> ExactSizeIterator for CodeIter<'_, I> {
    fn len(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::decode_model;

    #[test]
    fn test_count_builder_layout() {
        let mut b = CountModelBuilder::new(2).unwrap();
        b.push(&["this"], 5).unwrap();
        b.push(&["is"], 3).unwrap();
        b.push(&["this", "is"], 3).unwrap();
        let bytes = b.finish().unwrap();

        let raw = decode_model(&bytes).unwrap();
        assert_eq!(raw.order, 2);
        // <unk>, this, is
        assert_eq!(raw.vocab.len(), 3);
        assert_eq!(raw.levels[0].len(), 3);
        assert_eq!(raw.levels[1].len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut b = CountModelBuilder::new(2).unwrap();
        b.push(&["a"], 1).unwrap();
        let err = b.push(&["a"], 2).unwrap_err();
        assert!(matches!(err, BuilderError::DuplicateGram(_)));
    }

    #[test]
    fn test_missing_parent_rejected() {
        let mut b = CountModelBuilder::new(3).unwrap();
        b.push(&["a", "b"], 1).unwrap();
        b.push(&["a", "b", "c"], 1).unwrap();
        // "x y z" has no "x y" bigram to hang from
        b.push(&["x", "y", "z"], 1).unwrap();
        let err = b.finish().unwrap_err();
        assert!(matches!(err, BuilderError::MissingParent(2, _)));
    }

    #[test]
    fn test_prob_builder_requires_unigrams() {
        let mut b = ProbModelBuilder::new(2).unwrap();
        b.push(&["<unk>"], -2.0, 0.0).unwrap();
        b.push(&["a"], -0.5, -0.25).unwrap();
        b.push(&["a", "b"], -0.5, 0.0).unwrap();
        // "b" was interned by the bigram but never given a unigram
        let err = b.finish().unwrap_err();
        assert!(matches!(err, BuilderError::MissingUnigram(w) if w == "b"));
    }

    #[test]
    fn test_prob_builder_round_trip() {
        let mut b = ProbModelBuilder::new(2).unwrap();
        b.push(&["<unk>"], -2.0, 0.0).unwrap();
        b.push(&["test"], -0.5, -0.25).unwrap();
        b.push(&["a"], -0.75, 0.0).unwrap();
        b.push(&["test", "a"], -0.125, 0.0).unwrap();
        let bytes = b.finish().unwrap();

        let raw = decode_model(&bytes).unwrap();
        assert_eq!(raw.kind, ModelKind::ProbBackoff);
        let probs = raw.prob_codebook.unwrap();
        // distinct probs, sorted: -2.0, -0.75, -0.5, -0.125
        assert_eq!(probs.values(), &[-2.0, -0.75, -0.5, -0.125]);
        let backoffs = raw.backoff_codebook.unwrap();
        assert_eq!(backoffs.values(), &[-0.25, 0.0]);
    }

    #[test]
    fn test_order_bounds() {
        assert!(CountModelBuilder::new(0).is_err());
        assert!(CountModelBuilder::new(9).is_err());
        let mut b = CountModelBuilder::new(2).unwrap();
        assert!(matches!(
            b.push(&["a", "b", "c"], 1),
            Err(BuilderError::OrderExceeded { got: 3, order: 2 })
        ));
        assert!(matches!(b.push(&[], 1), Err(BuilderError::EmptyGram)));
    }
}
