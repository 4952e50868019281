//! Elias-Fano encoding of non-decreasing integer sequences.
//!
//! A sequence of n values with universe u (the last value) is split at
//! `l = floor(log2(u / n))`: the low l bits of each value are packed
//! contiguously, the high parts are unary-coded into a bitmap of
//! `n + (u >> l) + 1` bits (the i-th value sets bit `(v >> l) + i`). Total
//! space is within 2 + log2(u/n) bits per element of the information-theoretic
//! minimum, while supporting:
//!
//! - `get(i)`: random access via a select-1 directory on the high bits
//! - `next_geq_in(lo, hi, v)`: smallest stored value ≥ v within a position
//!   range, O(log (hi − lo))
//! - `find_in(lo, hi, v)`: exact-match position within a range
//!
//! Construction is append-once: encode from a sorted slice, then frozen.
//! Decreasing input is rejected with [`Error::Unsorted`].

use crate::bits::{BitVector, BitVectorBuilder};
use crate::error::{Error, Result};
use crate::select::SelectIndex;

/// Frozen Elias-Fano sequence.
#[derive(Debug, Clone)]
pub struct EliasFano {
    high: BitVector,
    high_select: SelectIndex,
    low: BitVector,
    low_width: u8,
    len: usize,
}

impl EliasFano {
    /// Encode a non-decreasing slice.
    pub fn from_sorted(values: &[u64]) -> Result<Self> {
        let n = values.len() as u64;
        let u = values.last().copied().unwrap_or(0);
        let low_width = split_width(n, u);

        let mut high = BitVectorBuilder::with_len(n + (u >> low_width) + 1);
        let mut low = BitVectorBuilder::new();
        low.reserve(n * low_width as u64);

        let mut prev = 0u64;
        for (i, &v) in values.iter().enumerate() {
            if i > 0 && v < prev {
                return Err(Error::Unsorted {
                    pos: i,
                    value: v,
                    prev,
                });
            }
            if low_width > 0 {
                low.append_bits(v & low_mask(low_width), low_width);
            }
            high.set((v >> low_width) + i as u64);
            prev = v;
        }

        let high = high.freeze();
        let high_select = SelectIndex::new(&high);
        Ok(Self {
            high,
            high_select,
            low: low.freeze(),
            low_width,
            len: values.len(),
        })
    }

    /// Reassemble from decoded wire parts; rebuilds the select directory.
    pub fn from_parts(high: BitVector, low: BitVector, low_width: u8, len: usize) -> Result<Self> {
        if low_width >= 64 {
            return Err(Error::WidthOverflow(low_width));
        }
        if low.len() != len as u64 * low_width as u64 {
            return Err(Error::InvalidParts(format!(
                "elias-fano: {} low bits for {} elements of width {}",
                low.len(),
                len,
                low_width
            )));
        }
        let high_select = SelectIndex::new(&high);
        if high_select.num_ones() != len as u64 {
            return Err(Error::InvalidParts(format!(
                "elias-fano: {} high one-bits for {} elements",
                high_select.num_ones(),
                len
            )));
        }
        Ok(Self {
            high,
            high_select,
            low,
            low_width,
            len,
        })
    }

    /// The `i`-th value. `i < len()`.
    #[inline]
    pub fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.len);
        let i = i as u64;
        let high_part = self.high_select.select(&self.high, i) - i;
        let low_part = self.low.get_bits(i * self.low_width as u64, self.low_width);
        high_part << self.low_width | low_part
    }

    /// Smallest stored value ≥ `v` among positions `[lo, hi)`, with its
    /// position. `None` if every value in the range is below `v`.
    pub fn next_geq_in(&self, lo: usize, hi: usize, v: u64) -> Option<(usize, u64)> {
        debug_assert!(lo <= hi && hi <= self.len);
        let (mut a, mut b) = (lo, hi);
        while a < b {
            let mid = a + (b - a) / 2;
            if self.get(mid) < v {
                a = mid + 1;
            } else {
                b = mid;
            }
        }
        if a < hi {
            Some((a, self.get(a)))
        } else {
            None
        }
    }

    /// Position of the exact value `v` among positions `[lo, hi)`.
    pub fn find_in(&self, lo: usize, hi: usize, v: u64) -> Option<usize> {
        match self.next_geq_in(lo, hi, v) {
            Some((pos, found)) if found == v => Some(pos),
            _ => None,
        }
    }

    /// Number of encoded values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The last (largest) value; 0 for an empty sequence.
    pub fn universe(&self) -> u64 {
        if self.len == 0 {
            0
        } else {
            self.get(self.len - 1)
        }
    }

    /// Width of the packed low parts, in bits.
    pub fn low_width(&self) -> u8 {
        self.low_width
    }

    /// The unary-coded high bitmap (for serialization).
    pub fn high_bits(&self) -> &BitVector {
        &self.high
    }

    /// The packed low bits (for serialization).
    pub fn low_bits(&self) -> &BitVector {
        &self.low
    }

    /// Sequential values, in position order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }
}

/// `floor(log2(u / n))`, the space-optimal low-bit split.
#[inline]
fn split_width(n: u64, u: u64) -> u8 {
    if n == 0 || u / n == 0 {
        0
    } else {
        63 - (u / n).leading_zeros() as u8
    }
}

#[inline]
fn low_mask(width: u8) -> u64 {
    (1u64 << width) - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_round_trip_small() {
        let values = [0u64, 1, 1, 4, 100, 100, 1000, 1_000_000];
        let ef = EliasFano::from_sorted(&values).unwrap();
        assert_eq!(ef.len(), values.len());
        assert_eq!(ef.universe(), 1_000_000);
        let decoded: Vec<u64> = ef.iter().collect();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_round_trip_randomized() {
        let mut rng = StdRng::seed_from_u64(0x6d6f6e6f746f6e65);
        for _ in 0..20 {
            let n = rng.random_range(1..2000usize);
            let mut values: Vec<u64> = (0..n).map(|_| rng.random_range(0..1u64 << 40)).collect();
            values.sort_unstable();
            let ef = EliasFano::from_sorted(&values).unwrap();
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(ef.get(i), v);
            }
        }
    }

    #[test]
    fn test_large_gaps_and_runs() {
        // long run of equal deltas followed by a huge gap
        let mut values: Vec<u64> = (0..500u64).collect();
        values.extend([1u64 << 50, (1 << 50) + 1]);
        let ef = EliasFano::from_sorted(&values).unwrap();
        let decoded: Vec<u64> = ef.iter().collect();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_rejects_unsorted() {
        let err = EliasFano::from_sorted(&[3, 2]).unwrap_err();
        assert!(matches!(err, Error::Unsorted { pos: 1, .. }));
    }

    #[test]
    fn test_empty() {
        let ef = EliasFano::from_sorted(&[]).unwrap();
        assert_eq!(ef.len(), 0);
        assert_eq!(ef.universe(), 0);
        assert_eq!(ef.next_geq_in(0, 0, 5), None);
    }

    #[test]
    fn test_next_geq_in_range() {
        let values = [2u64, 4, 8, 8, 16, 32];
        let ef = EliasFano::from_sorted(&values).unwrap();

        assert_eq!(ef.next_geq_in(0, 6, 0), Some((0, 2)));
        assert_eq!(ef.next_geq_in(0, 6, 5), Some((2, 8)));
        assert_eq!(ef.next_geq_in(0, 6, 8), Some((2, 8)));
        assert_eq!(ef.next_geq_in(0, 6, 33), None);
        // restricted window excludes the global answer
        assert_eq!(ef.next_geq_in(4, 6, 5), Some((4, 16)));
        assert_eq!(ef.next_geq_in(0, 2, 8), None);
    }

    #[test]
    fn test_find_in() {
        let values = [2u64, 4, 8, 16, 32];
        let ef = EliasFano::from_sorted(&values).unwrap();
        assert_eq!(ef.find_in(0, 5, 16), Some(3));
        assert_eq!(ef.find_in(0, 5, 15), None);
        assert_eq!(ef.find_in(0, 3, 16), None);
    }

    #[test]
    fn test_parts_round_trip() {
        let values: Vec<u64> = (0..1000u64).map(|i| i * 13).collect();
        let ef = EliasFano::from_sorted(&values).unwrap();
        let rebuilt = EliasFano::from_parts(
            ef.high_bits().clone(),
            ef.low_bits().clone(),
            ef.low_width(),
            ef.len(),
        )
        .unwrap();
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(rebuilt.get(i), v);
        }
    }
}
