//! # Gramdex Core
//!
//! Succinct low-level structures shared by the gramdex crates.
//!
//! This crate provides:
//! - `BitVector` / `BitVectorBuilder`: raw bit-packed storage over `u64` words
//! - `SelectIndex`: sampled select-1 directory for constant-time ones lookup
//! - `CompactVector`: fixed-width packed unsigned integers
//! - `EliasFano`: near-optimal encoding of non-decreasing integer sequences
//!   with random access and range predecessor/successor search
//!
//! ## Design Principles
//!
//! 1. **Build once, freeze**: every structure is assembled by a builder (or a
//!    single constructor pass) and is immutable afterwards
//! 2. **No I/O**: (de)serialization of these structures belongs to the format
//!    layer in `gramdex-lm`; this crate only exposes their raw parts
//! 3. **Bit arithmetic stays here**: callers never touch word offsets or masks

pub mod bits;
pub mod compact;
pub mod elias_fano;
pub mod error;
pub mod select;

pub use bits::{BitVector, BitVectorBuilder};
pub use compact::{bits_for, CompactVector, CompactVectorBuilder};
pub use elias_fano::EliasFano;
pub use error::{Error, Result};
pub use select::SelectIndex;
