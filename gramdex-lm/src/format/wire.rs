//! Bounds-checked little-endian primitives and the reusable wire blocks
//! (bit vector, compact vector, Elias-Fano sequence).
//!
//! Readers take `(data, &mut pos)` and advance on success; every read is
//! length-checked first and fails with `LoadError::Truncated` naming the
//! section being decoded.

use crate::error::LoadError;
use gramdex_core::{BitVector, CompactVector, EliasFano};

/// Check that `data[pos..pos + need]` is within bounds.
#[inline]
pub fn ensure_len(data: &[u8], pos: usize, need: usize, ctx: &str) -> Result<(), LoadError> {
    if data.len().saturating_sub(pos) < need {
        Err(LoadError::Truncated(format!(
            "{ctx} (need {need} bytes at offset {pos}, have {})",
            data.len().saturating_sub(pos)
        )))
    } else {
        Ok(())
    }
}

/// Read a u8 at `pos`, advancing.
#[inline]
pub fn read_u8(data: &[u8], pos: &mut usize, ctx: &str) -> Result<u8, LoadError> {
    ensure_len(data, *pos, 1, ctx)?;
    let v = data[*pos];
    *pos += 1;
    Ok(v)
}

/// Read a u32 LE at `pos`, advancing.
#[inline]
pub fn read_u32(data: &[u8], pos: &mut usize, ctx: &str) -> Result<u32, LoadError> {
    ensure_len(data, *pos, 4, ctx)?;
    let v = u32::from_le_bytes(data[*pos..*pos + 4].try_into().unwrap());
    *pos += 4;
    Ok(v)
}

/// Read a u64 LE at `pos`, advancing.
#[inline]
pub fn read_u64(data: &[u8], pos: &mut usize, ctx: &str) -> Result<u64, LoadError> {
    ensure_len(data, *pos, 8, ctx)?;
    let v = u64::from_le_bytes(data[*pos..*pos + 8].try_into().unwrap());
    *pos += 8;
    Ok(v)
}

/// Read an f32 LE at `pos`, advancing.
#[inline]
pub fn read_f32(data: &[u8], pos: &mut usize, ctx: &str) -> Result<f32, LoadError> {
    ensure_len(data, *pos, 4, ctx)?;
    let v = f32::from_le_bytes(data[*pos..*pos + 4].try_into().unwrap());
    *pos += 4;
    Ok(v)
}

// ============================================================================
// Bit vector block: nbits: u64, words: u64 x ceil(nbits / 64)
// ============================================================================

pub fn write_bit_vector(buf: &mut Vec<u8>, bv: &BitVector) {
    buf.extend_from_slice(&bv.len().to_le_bytes());
    for &w in bv.words() {
        buf.extend_from_slice(&w.to_le_bytes());
    }
}

pub fn read_bit_vector(data: &[u8], pos: &mut usize, ctx: &str) -> Result<BitVector, LoadError> {
    let nbits = read_u64(data, pos, ctx)?;
    let nwords = nbits.div_ceil(64);
    // guard the multiply on corrupt lengths before allocating
    let nbytes = nwords
        .checked_mul(8)
        .filter(|&b| b <= data.len() as u64)
        .ok_or_else(|| LoadError::Truncated(format!("{ctx}: {nbits} bits")))?
        as usize;
    ensure_len(data, *pos, nbytes, ctx)?;
    let mut words = Vec::with_capacity(nwords as usize);
    for _ in 0..nwords {
        words.push(u64::from_le_bytes(data[*pos..*pos + 8].try_into().unwrap()));
        *pos += 8;
    }
    Ok(BitVector::from_words(words, nbits)?)
}

// ============================================================================
// Compact vector block: n: u64, width: u8, bit vector block
// ============================================================================

pub fn write_compact_vector(buf: &mut Vec<u8>, cv: &CompactVector) {
    buf.extend_from_slice(&(cv.len() as u64).to_le_bytes());
    buf.push(cv.width());
    write_bit_vector(buf, cv.bits());
}

pub fn read_compact_vector(
    data: &[u8],
    pos: &mut usize,
    ctx: &str,
) -> Result<CompactVector, LoadError> {
    let n = read_u64(data, pos, ctx)? as usize;
    let width = read_u8(data, pos, ctx)?;
    let bits = read_bit_vector(data, pos, ctx)?;
    Ok(CompactVector::from_parts(bits, width, n)?)
}

// ============================================================================
// Elias-Fano block: n: u64, l: u8, high bit vector block, low bit vector block
// ============================================================================

pub fn write_elias_fano(buf: &mut Vec<u8>, ef: &EliasFano) {
    buf.extend_from_slice(&(ef.len() as u64).to_le_bytes());
    buf.push(ef.low_width());
    write_bit_vector(buf, ef.high_bits());
    write_bit_vector(buf, ef.low_bits());
}

pub fn read_elias_fano(data: &[u8], pos: &mut usize, ctx: &str) -> Result<EliasFano, LoadError> {
    let n = read_u64(data, pos, ctx)? as usize;
    let low_width = read_u8(data, pos, ctx)?;
    let high = read_bit_vector(data, pos, ctx)?;
    let low = read_bit_vector(data, pos, ctx)?;
    Ok(EliasFano::from_parts(high, low, low_width, n)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramdex_core::{bits_for, BitVectorBuilder, CompactVectorBuilder};

    #[test]
    fn test_bit_vector_round_trip() {
        let mut b = BitVectorBuilder::new();
        b.append_bits(0b1011, 4);
        b.append_bits(0xDEADBEEF, 32);
        let bv = b.freeze();

        let mut buf = Vec::new();
        write_bit_vector(&mut buf, &bv);
        let mut pos = 0;
        let decoded = read_bit_vector(&buf, &mut pos, "bv").unwrap();
        assert_eq!(pos, buf.len());
        assert_eq!(decoded.len(), bv.len());
        assert_eq!(decoded.get_bits(0, 4), 0b1011);
        assert_eq!(decoded.get_bits(4, 32), 0xDEADBEEF);
    }

    #[test]
    fn test_compact_vector_round_trip() {
        let values = [9u64, 0, 511, 123];
        let mut b = CompactVectorBuilder::new(bits_for(511)).unwrap();
        for &v in &values {
            b.push(v);
        }
        let mut buf = Vec::new();
        write_compact_vector(&mut buf, &b.freeze());

        let mut pos = 0;
        let decoded = read_compact_vector(&buf, &mut pos, "cv").unwrap();
        assert_eq!(pos, buf.len());
        let got: Vec<u64> = decoded.iter().collect();
        assert_eq!(got, values);
    }

    #[test]
    fn test_elias_fano_round_trip() {
        let values = [0u64, 3, 3, 17, 900, 4096];
        let ef = EliasFano::from_sorted(&values).unwrap();
        let mut buf = Vec::new();
        write_elias_fano(&mut buf, &ef);

        let mut pos = 0;
        let decoded = read_elias_fano(&buf, &mut pos, "ef").unwrap();
        assert_eq!(pos, buf.len());
        let got: Vec<u64> = decoded.iter().collect();
        assert_eq!(got, values);
    }

    #[test]
    fn test_truncated_block() {
        let ef = EliasFano::from_sorted(&[1u64, 2, 3]).unwrap();
        let mut buf = Vec::new();
        write_elias_fano(&mut buf, &ef);
        buf.truncate(buf.len() - 1);

        let mut pos = 0;
        let err = read_elias_fano(&buf, &mut pos, "ef").unwrap_err();
        assert!(matches!(err, LoadError::Truncated(_)));
    }

    #[test]
    fn test_corrupt_length_does_not_overallocate() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u64::MAX.to_le_bytes()); // absurd nbits
        let mut pos = 0;
        let err = read_bit_vector(&buf, &mut pos, "bv").unwrap_err();
        assert!(matches!(err, LoadError::Truncated(_)));
    }
}
