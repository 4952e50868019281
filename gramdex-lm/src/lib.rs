//! # Gramdex LM
//!
//! Binary n-gram model format and read-side runtime.
//!
//! This crate owns the on-disk model format (`NGM1`) and everything needed
//! to query it: the vocabulary dictionary, the succinct trie levels, the
//! quantizer codebooks, count lookup, and backoff sentence/corpus scoring.
//!
//! ## Design Principles
//!
//! 1. **Load, then freeze**: a model is decoded in one pass and is immutable
//!    afterwards — arbitrarily many readers, no locks
//! 2. **Misses are not errors**: an absent n-gram is a count of 0 or a
//!    backoff step; only structural/format problems surface as errors
//! 3. **Flat arrays, not node graphs**: every trie level is parallel
//!    id/boundary/value arrays addressed by position ranges
//!
//! ## Example
//!
//! ```ignore
//! use gramdex_lm::{CountModel, ProbModel};
//!
//! let counts = CountModel::open("corpus.counts.ngm")?;
//! let n = counts.lookup(&["this", "is"])?;
//!
//! let lm = ProbModel::open("corpus.prob.ngm")?;
//! let (log10_prob, words) = lm.score_sentence("this is a test");
//! let perplexity = 10f64.powf(-log10_prob / words as f64);
//! ```

pub mod builder;
pub mod error;
pub mod format;
pub mod model;
pub mod quantizer;
pub mod score;
pub mod trie;
pub mod vocab;

// ── Model handles ────────────────────────────────────────────────────────────
pub use model::{CountModel, ProbModel};

// ── Builders ─────────────────────────────────────────────────────────────────
pub use builder::{BuilderError, CountModelBuilder, ProbModelBuilder};

// ── Errors ───────────────────────────────────────────────────────────────────
pub use error::{LoadError, QueryError, Result};

// ── Format types ─────────────────────────────────────────────────────────────
pub use format::{ModelKind, FORMAT_VERSION, MAX_ORDER, MODEL_MAGIC};

// ── Vocabulary ───────────────────────────────────────────────────────────────
pub use vocab::{Vocabulary, WordId, BOS_TOKEN, UNK_ID, UNK_TOKEN};
