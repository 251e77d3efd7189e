//! Palette index bit-packing inside 64-bit words.
//!
//! Indices are stored least-significant bits first. Before data version 2529 the
//! words form one continuous bitstream and an index may straddle two words; from
//! 2529 on, each word holds `64 / bits` whole indices and leftover high bits are
//! padding.

use scarif_common::{Result, ScarifError};

/// First data version (20w17a) that stops indices from crossing word boundaries.
pub const WORD_ALIGNED_DATA_VERSION: i32 = 2529;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingRegime {
    Tight,
    WordAligned,
}

impl PackingRegime {
    pub fn for_data_version(data_version: i32) -> Self {
        if data_version < WORD_ALIGNED_DATA_VERSION {
            PackingRegime::Tight
        } else {
            PackingRegime::WordAligned
        }
    }
}

/// Bits per index for a palette of `palette_len` entries, never below `min_bits`.
pub fn bits_for_palette(palette_len: usize, min_bits: u32) -> u32 {
    let rounded = palette_len.max(1).next_power_of_two();
    rounded.trailing_zeros().max(min_bits)
}

/// Number of words needed to hold `count` indices.
pub fn packed_len(count: usize, bits: u32, regime: PackingRegime) -> usize {
    if bits == 0 {
        return 0;
    }
    match regime {
        PackingRegime::Tight => (count * bits as usize).div_ceil(64),
        PackingRegime::WordAligned => count.div_ceil(64 / bits as usize),
    }
}

pub fn unpack(data: &[i64], count: usize, bits: u32, regime: PackingRegime) -> Result<Vec<u16>> {
    if bits == 0 {
        return Ok(vec![0; count]);
    }
    if bits > 16 {
        return Err(ScarifError::data(format!("{} bits per index is too wide", bits)));
    }

    let needed = packed_len(count, bits, regime);
    if data.len() < needed {
        return Err(ScarifError::data(format!(
            "packed array holds {} longs, {} needed for {} indices at {} bits",
            data.len(),
            needed,
            count,
            bits
        )));
    }

    let bits = bits as usize;
    let mask = (1u64 << bits) - 1;
    let mut indices = Vec::with_capacity(count);

    match regime {
        PackingRegime::Tight => {
            for i in 0..count {
                let start_bit = i * bits;
                let start_long = start_bit / 64;
                let start_offset = start_bit % 64;

                let mut value = data[start_long] as u64 >> start_offset;
                if start_offset + bits > 64 {
                    value |= (data[start_long + 1] as u64) << (64 - start_offset);
                }
                indices.push((value & mask) as u16);
            }
        }
        PackingRegime::WordAligned => {
            let per_long = 64 / bits;
            for i in 0..count {
                let long = data[i / per_long] as u64;
                let offset = (i % per_long) * bits;
                indices.push(((long >> offset) & mask) as u16);
            }
        }
    }

    Ok(indices)
}

pub fn pack(indices: &[u16], bits: u32, regime: PackingRegime) -> Vec<i64> {
    let mut data = vec![0u64; packed_len(indices.len(), bits, regime)];
    if bits == 0 {
        return Vec::new();
    }

    let bits = bits as usize;
    let mask = (1u64 << bits) - 1;

    match regime {
        PackingRegime::Tight => {
            for (i, &index) in indices.iter().enumerate() {
                let value = index as u64 & mask;
                let start_bit = i * bits;
                let start_long = start_bit / 64;
                let start_offset = start_bit % 64;

                data[start_long] |= value << start_offset;
                if start_offset + bits > 64 {
                    data[start_long + 1] |= value >> (64 - start_offset);
                }
            }
        }
        PackingRegime::WordAligned => {
            let per_long = 64 / bits;
            for (i, &index) in indices.iter().enumerate() {
                let value = index as u64 & mask;
                data[i / per_long] |= value << ((i % per_long) * bits);
            }
        }
    }

    data.into_iter().map(|long| long as i64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_bits_for_palette() {
        let expected = [(1, 4), (2, 4), (15, 4), (16, 4), (17, 5), (255, 8), (256, 8), (257, 9)];
        for (len, bits) in expected {
            assert_eq!(bits_for_palette(len, 4), bits, "palette of {}", len);
        }
        assert_eq!(bits_for_palette(1, 0), 0);
        assert_eq!(bits_for_palette(2, 0), 1);
        assert_eq!(bits_for_palette(3, 0), 2);
        assert_eq!(bits_for_palette(0, 0), 0);
    }

    #[test]
    fn test_regime_threshold() {
        assert_eq!(PackingRegime::for_data_version(2528), PackingRegime::Tight);
        assert_eq!(PackingRegime::for_data_version(2529), PackingRegime::WordAligned);
        assert_eq!(PackingRegime::for_data_version(3465), PackingRegime::WordAligned);
    }

    #[test]
    fn test_packed_len() {
        assert_eq!(packed_len(4096, 4, PackingRegime::Tight), 256);
        assert_eq!(packed_len(4096, 4, PackingRegime::WordAligned), 256);
        assert_eq!(packed_len(4096, 5, PackingRegime::Tight), 320);
        // 12 indices per word, 4 bits of padding
        assert_eq!(packed_len(4096, 5, PackingRegime::WordAligned), 342);
        assert_eq!(packed_len(64, 1, PackingRegime::WordAligned), 1);
    }

    #[test]
    fn test_round_trip_random_palettes() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5ca1f);
        for palette_len in [1usize, 2, 15, 16, 17, 255, 256] {
            let bits = bits_for_palette(palette_len, 4);
            let indices: Vec<u16> = (0..4096)
                .map(|_| rng.gen_range(0..palette_len) as u16)
                .collect();

            for regime in [PackingRegime::Tight, PackingRegime::WordAligned] {
                let packed = pack(&indices, bits, regime);
                assert_eq!(packed.len(), packed_len(4096, bits, regime));
                let unpacked = unpack(&packed, 4096, bits, regime).unwrap();
                assert_eq!(unpacked, indices, "palette {} regime {:?}", palette_len, regime);
            }
        }
    }

    #[test]
    fn test_word_aligned_layout() {
        // 5 bits: index 12 begins at bit 0 of the second word
        let mut indices = vec![0u16; 24];
        indices[0] = 1;
        indices[11] = 31;
        indices[12] = 3;
        let packed = pack(&indices, 5, PackingRegime::WordAligned);
        assert_eq!(packed[0] as u64, 1 | (31u64 << 55));
        assert_eq!(packed[1], 3);
    }

    #[test]
    fn test_tight_layout_straddles_words() {
        let mut indices = vec![0u16; 13];
        indices[12] = 0b11111;
        let packed = pack(&indices, 5, PackingRegime::Tight);
        // index 12 covers bits 60..65
        assert_eq!(packed[0] as u64, 0b1111u64 << 60);
        assert_eq!(packed[1], 1);
    }

    #[test]
    fn test_short_data_rejected() {
        let result = unpack(&[0; 10], 4096, 4, PackingRegime::WordAligned);
        assert_matches!(result, Err(ScarifError::DataConsistencyError(_)));
    }

    #[test]
    fn test_zero_bits_needs_no_data() {
        assert_eq!(unpack(&[], 64, 0, PackingRegime::WordAligned).unwrap(), vec![0; 64]);
        assert!(pack(&[0; 64], 0, PackingRegime::WordAligned).is_empty());
    }
}
