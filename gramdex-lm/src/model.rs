//! Loaded models: the read-side handles over a decoded model file.
//!
//! A model is loaded in one pass (`open` memory-maps the file, `from_bytes`
//! decodes any buffer) and is immutable afterwards: no locks, no interior
//! mutability, safely shareable across threads behind an `Arc`. Hot-swapping
//! a model means loading a new one and replacing the handle.

use crate::error::{LoadError, QueryError, Result};
use crate::format::{self, ModelKind, RawModel};
use crate::quantizer::Codebook;
use crate::trie::{chained_position, TrieLevel};
use crate::vocab::{Vocabulary, WordId, BOS_TOKEN, UNK_ID};
use std::fs::File;
use std::path::Path;

/// Read-only n-gram frequency model.
pub struct CountModel {
    vocab: Vocabulary,
    levels: Vec<TrieLevel>,
}

/// Read-only probability model with backoff weights.
#[derive(Debug)]
pub struct ProbModel {
    pub(crate) vocab: Vocabulary,
    pub(crate) levels: Vec<TrieLevel>,
    pub(crate) prob_codebook: Codebook,
    pub(crate) backoff_codebook: Codebook,
    /// Vocabulary id of the begin-of-sentence marker; the unknown id when
    /// the model has no `<s>` entry.
    pub(crate) bos_id: WordId,
}

impl CountModel {
    /// Memory-map and decode a model file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&map_file(path.as_ref())?)
    }

    /// Decode a model image from a byte buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let raw = decode_expecting(data, ModelKind::Count)?;
        Ok(Self {
            vocab: raw.vocab,
            levels: raw.levels,
        })
    }

    /// Maximum n-gram order.
    pub fn order(&self) -> usize {
        self.levels.len()
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Exact count of a stored n-gram; 0 when it was never stored.
    ///
    /// Unknown words resolve to the reserved unknown id rather than failing.
    pub fn lookup(&self, tokens: &[&str]) -> std::result::Result<u64, QueryError> {
        let mut ids = [UNK_ID; format::MAX_ORDER as usize];
        check_query_len(tokens.len(), self.order())?;
        for (slot, token) in ids.iter_mut().zip(tokens) {
            *slot = self.vocab.word_id(token);
        }
        self.lookup_ids(&ids[..tokens.len()])
    }

    /// `lookup` over pre-resolved word ids.
    pub fn lookup_ids(&self, ids: &[WordId]) -> std::result::Result<u64, QueryError> {
        check_query_len(ids.len(), self.order())?;
        Ok(match chained_position(&self.levels, ids) {
            Some(pos) => self.levels[ids.len() - 1].count(pos),
            None => 0,
        })
    }
}

impl ProbModel {
    /// Memory-map and decode a model file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&map_file(path.as_ref())?)
    }

    /// Decode a model image from a byte buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let raw = decode_expecting(data, ModelKind::ProbBackoff)?;
        let bos_id = raw.vocab.find(BOS_TOKEN).unwrap_or(UNK_ID);
        Ok(Self {
            vocab: raw.vocab,
            levels: raw.levels,
            prob_codebook: raw.prob_codebook.expect("prob kind carries codebooks"),
            backoff_codebook: raw.backoff_codebook.expect("prob kind carries codebooks"),
            bos_id,
        })
    }

    /// Maximum n-gram order.
    pub fn order(&self) -> usize {
        self.levels.len()
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }
}

fn decode_expecting(data: &[u8], expected: ModelKind) -> Result<RawModel> {
    let raw = format::decode_model(data)?;
    if raw.kind != expected {
        return Err(LoadError::KindMismatch {
            expected,
            found: raw.kind,
        });
    }
    tracing::debug!(%expected, order = raw.order, words = raw.vocab.len(), "model loaded");
    Ok(raw)
}

fn map_file(path: &Path) -> Result<memmap2::Mmap> {
    let file = File::open(path)?;
    // SAFETY: the mapping is read-only and dropped before `open` returns;
    // decode copies everything it keeps into owned structures.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    tracing::debug!(path = %path.display(), bytes = mmap.len(), "mapped model file");
    Ok(mmap)
}

fn check_query_len(len: usize, order: usize) -> std::result::Result<(), QueryError> {
    if len == 0 {
        return Err(QueryError::EmptyNgram);
    }
    if len > order {
        return Err(QueryError::OrderExceedsModel {
            got: len,
            max: order,
        });
    }
    Ok(())
}
