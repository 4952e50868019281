//! Binary n-gram model format (`NGM1`).
//!
//! One file holds a complete model: header, vocabulary, one trie-level
//! section per order, and (for probability models) the quantizer codebooks.
//! The encoding is fully structured binary, little-endian throughout.
//!
//! ## Layout
//!
//! ```text
//! magic: "NGM1" (4B)
//! version: u8 (= 1)   kind: u8 (0 = count, 1 = prob-backoff)
//! order:   u8 (1..=8) reserved: u8 (= 0)
//! Vocabulary:
//!     count: u32
//!     per entry: len: u32, utf8_bytes: [u8; len]     (id = entry index)
//! Per order k = 1..=order:
//!     ids:  EF block       (word ids, offset-chained per children range)
//!     ptrs: EF block       (k < order only; child boundaries, n_k + 1 values)
//!     count kind: counts: CV block
//!     prob kind:  probs:  CV block
//!                 backoffs: CV block                  (k < order only)
//! Quantizer (prob kind only):
//!     prob codebook:    count: u32, f32 x count
//!     backoff codebook: count: u32, f32 x count
//!
//! EF block: n: u64, l: u8, high: BV block, low: BV block
//! CV block: n: u64, width: u8, bits: BV block
//! BV block: nbits: u64, words: u64 x ceil(nbits / 64)
//! ```
//!
//! Select directories over the EF high bits are rebuilt at load rather than
//! serialized, keeping the wire format free of index-layout details.
//!
//! Encode and decode live side by side here; `decode_model` performs all
//! structural validation (magic, version, order, range closure, codebook
//! bounds) and either returns a fully valid model or fails — never a
//! partial one.

pub mod wire;

use crate::error::LoadError;
use crate::quantizer::Codebook;
use crate::trie::{LevelValues, TrieLevel};
use crate::vocab::Vocabulary;
use std::fmt;
use std::sync::Arc;
use wire::{
    ensure_len, read_compact_vector, read_elias_fano, read_f32, read_u32, write_compact_vector,
    write_elias_fano,
};

/// Magic bytes identifying a gramdex model file.
pub const MODEL_MAGIC: [u8; 4] = *b"NGM1";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Highest supported n-gram order.
pub const MAX_ORDER: u8 = 8;

/// What a model's value records hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Raw n-gram frequencies.
    Count = 0,
    /// Quantized log10-probability / backoff-weight pairs.
    ProbBackoff = 1,
}

impl ModelKind {
    fn from_byte(b: u8) -> Result<Self, LoadError> {
        match b {
            0 => Ok(ModelKind::Count),
            1 => Ok(ModelKind::ProbBackoff),
            other => Err(LoadError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Count => write!(f, "count"),
            ModelKind::ProbBackoff => write!(f, "prob-backoff"),
        }
    }
}

/// Fully decoded and validated model parts, before kind-specific wrapping.
pub struct RawModel {
    pub kind: ModelKind,
    pub order: u8,
    pub vocab: Vocabulary,
    pub levels: Vec<TrieLevel>,
    pub prob_codebook: Option<Codebook>,
    pub backoff_codebook: Option<Codebook>,
}

// ============================================================================
// Encode
// ============================================================================

/// Serialize model parts into a complete file image.
///
/// The parts are trusted to be internally consistent (the builder produces
/// them); `decode_model` is the validating side.
pub fn encode_model(
    kind: ModelKind,
    vocab: &Vocabulary,
    levels: &[TrieLevel],
    codebooks: Option<(&Codebook, &Codebook)>,
) -> Vec<u8> {
    debug_assert!(!levels.is_empty() && levels.len() <= MAX_ORDER as usize);
    let mut buf = Vec::new();
    buf.extend_from_slice(&MODEL_MAGIC);
    buf.push(FORMAT_VERSION);
    buf.push(kind as u8);
    buf.push(levels.len() as u8);
    buf.push(0); // reserved

    // vocabulary
    buf.extend_from_slice(&(vocab.len() as u32).to_le_bytes());
    for word in vocab.words() {
        let bytes = word.as_bytes();
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
    }

    // trie levels
    let order = levels.len();
    for (k, level) in levels.iter().enumerate() {
        write_elias_fano(&mut buf, level.ids());
        if k + 1 < order {
            let ptrs = level.ptrs().expect("non-final level has boundaries");
            write_elias_fano(&mut buf, ptrs);
        }
        match level.values() {
            LevelValues::Counts(cv) => write_compact_vector(&mut buf, cv),
            LevelValues::ProbBackoff { probs, backoffs } => {
                write_compact_vector(&mut buf, probs);
                if k + 1 < order {
                    let backoffs = backoffs.as_ref().expect("non-final level has backoffs");
                    write_compact_vector(&mut buf, backoffs);
                }
            }
        }
    }

    // quantizer codebooks
    if let Some((probs, backoffs)) = codebooks {
        write_codebook(&mut buf, probs);
        write_codebook(&mut buf, backoffs);
    }

    buf
}

fn write_codebook(buf: &mut Vec<u8>, cb: &Codebook) {
    buf.extend_from_slice(&(cb.len() as u32).to_le_bytes());
    for &v in cb.values() {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Parse and validate a complete model image.
pub fn decode_model(data: &[u8]) -> Result<RawModel, LoadError> {
    ensure_len(data, 0, 8, "header")?;
    if data[0..4] != MODEL_MAGIC {
        return Err(LoadError::BadMagic);
    }
    let version = data[4];
    if version != FORMAT_VERSION {
        return Err(LoadError::UnsupportedVersion(version));
    }
    let kind = ModelKind::from_byte(data[5])?;
    let order = data[6];
    if order == 0 || order > MAX_ORDER {
        return Err(LoadError::InvalidOrder {
            got: order,
            max: MAX_ORDER,
        });
    }
    let mut pos = 8;

    let vocab = read_vocabulary(data, &mut pos)?;
    tracing::debug!(order, words = vocab.len(), %kind, "decoding model sections");

    // level sections: ids, boundaries, value codes
    let mut levels = Vec::with_capacity(order as usize);
    for k in 1..=order {
        let ctx = format!("order-{k} level");
        let ids = read_elias_fano(data, &mut pos, &ctx)?;
        let ptrs = if k < order {
            Some(read_elias_fano(data, &mut pos, &ctx)?)
        } else {
            None
        };
        let values = match kind {
            ModelKind::Count => LevelValues::Counts(read_compact_vector(data, &mut pos, &ctx)?),
            ModelKind::ProbBackoff => {
                let probs = read_compact_vector(data, &mut pos, &ctx)?;
                let backoffs = if k < order {
                    Some(read_compact_vector(data, &mut pos, &ctx)?)
                } else {
                    None
                };
                LevelValues::ProbBackoff { probs, backoffs }
            }
        };
        tracing::debug!(order = k, grams = ids.len(), "decoded level");
        levels.push(TrieLevel::new(ids, ptrs, values));
    }

    let (prob_codebook, backoff_codebook) = match kind {
        ModelKind::Count => (None, None),
        ModelKind::ProbBackoff => (
            Some(read_codebook(data, &mut pos, "prob codebook")?),
            Some(read_codebook(data, &mut pos, "backoff codebook")?),
        ),
    };

    if pos != data.len() {
        return Err(LoadError::Corrupt(format!(
            "{} trailing bytes after model sections",
            data.len() - pos
        )));
    }

    validate(&vocab, &levels, prob_codebook.as_ref(), backoff_codebook.as_ref())?;

    Ok(RawModel {
        kind,
        order,
        vocab,
        levels,
        prob_codebook,
        backoff_codebook,
    })
}

fn read_vocabulary(data: &[u8], pos: &mut usize) -> Result<Vocabulary, LoadError> {
    let count = read_u32(data, pos, "vocabulary count")?;
    let mut words: Vec<Arc<str>> = Vec::with_capacity(count.min(1 << 20) as usize);
    for i in 0..count {
        let len = read_u32(data, pos, "vocabulary entry length")? as usize;
        ensure_len(data, *pos, len, "vocabulary entry")?;
        let s = std::str::from_utf8(&data[*pos..*pos + len]).map_err(|e| {
            LoadError::Corrupt(format!("vocabulary entry {i} is not valid UTF-8: {e}"))
        })?;
        words.push(Arc::from(s));
        *pos += len;
    }
    Ok(Vocabulary::from_ordered_words(words))
}

fn read_codebook(data: &[u8], pos: &mut usize, ctx: &str) -> Result<Codebook, LoadError> {
    let count = read_u32(data, pos, ctx)?;
    ensure_len(data, *pos, count as usize * 4, ctx)?;
    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        values.push(read_f32(data, pos, ctx)?);
    }
    Ok(Codebook::new(values))
}

// ============================================================================
// Validation
// ============================================================================

/// Structural invariants that make every later query panic-free:
/// range closure between adjacent orders, value arrays parallel to the id
/// arrays, vocabulary spanning the unigram level, and every stored code
/// within its codebook.
fn validate(
    vocab: &Vocabulary,
    levels: &[TrieLevel],
    prob_codebook: Option<&Codebook>,
    backoff_codebook: Option<&Codebook>,
) -> Result<(), LoadError> {
    let order = levels.len();

    if vocab.len() != levels[0].len() {
        return Err(LoadError::Corrupt(format!(
            "vocabulary holds {} words but the unigram level holds {}",
            vocab.len(),
            levels[0].len()
        )));
    }

    for (k, level) in levels.iter().enumerate() {
        let n = level.len();

        if k + 1 < order {
            let ptrs = level.ptrs().ok_or_else(|| {
                LoadError::Corrupt(format!("order-{} level is missing boundaries", k + 1))
            })?;
            if ptrs.len() != n + 1 {
                return Err(LoadError::RangeClosure(format!(
                    "order-{} boundaries hold {} values for {} nodes",
                    k + 1,
                    ptrs.len(),
                    n
                )));
            }
            let first = ptrs.get(0);
            let last = ptrs.universe();
            let next_n = levels[k + 1].len() as u64;
            if first != 0 || last != next_n {
                return Err(LoadError::RangeClosure(format!(
                    "order-{} boundaries span {}..{} but order-{} holds {} grams",
                    k + 1,
                    first,
                    last,
                    k + 2,
                    next_n
                )));
            }
        }

        match level.values() {
            LevelValues::Counts(cv) => {
                if cv.len() != n {
                    return Err(LoadError::Corrupt(format!(
                        "order-{} counts hold {} values for {} grams",
                        k + 1,
                        cv.len(),
                        n
                    )));
                }
            }
            LevelValues::ProbBackoff { probs, backoffs } => {
                if probs.len() != n {
                    return Err(LoadError::Corrupt(format!(
                        "order-{} prob codes hold {} values for {} grams",
                        k + 1,
                        probs.len(),
                        n
                    )));
                }
                let prob_cb = prob_codebook.expect("prob kind carries codebooks");
                check_codes(probs.iter(), prob_cb)?;

                match backoffs {
                    Some(cv) if k + 1 < order => {
                        if cv.len() != n {
                            return Err(LoadError::Corrupt(format!(
                                "order-{} backoff codes hold {} values for {} grams",
                                k + 1,
                                cv.len(),
                                n
                            )));
                        }
                        let backoff_cb =
                            backoff_codebook.expect("prob kind carries codebooks");
                        check_codes(cv.iter(), backoff_cb)?;
                    }
                    None if k + 1 == order => {}
                    _ => {
                        return Err(LoadError::Corrupt(format!(
                            "order-{} backoff codes present where none belong",
                            k + 1
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

fn check_codes(codes: impl Iterator<Item = u64>, cb: &Codebook) -> Result<(), LoadError> {
    for code in codes {
        if !cb.contains(code) {
            return Err(LoadError::CorruptCodebook {
                code,
                len: cb.len(),
            });
        }
    }
    Ok(())
}
