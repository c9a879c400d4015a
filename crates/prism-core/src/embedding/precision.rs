//! Storage precision for label embeddings.
//!
//! `Half` keeps label vectors as bfloat16 bit patterns on disk. Every vector,
//! fresh or cached, passes through [`Precision::prepare`] (or is decoded from
//! the same encoding) before it is stored in a table, so comparisons always
//! run on identical `f32` values whichever path produced them.

use serde::{Deserialize, Serialize};

use crate::math::l2_normalize_in_place;

/// Numeric precision of stored label embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 32-bit floats end to end
    #[default]
    Full,
    /// bfloat16 storage, upcast to `f32` before any comparison
    Half,
}

impl Precision {
    /// Identifier written into cache entries.
    pub fn name(self) -> &'static str {
        match self {
            Precision::Full => "f32",
            Precision::Half => "bf16",
        }
    }

    /// Bytes used per stored component.
    pub fn bytes_per_value(self) -> usize {
        match self {
            Precision::Full => 4,
            Precision::Half => 2,
        }
    }

    /// Normalize to unit length, then round through the storage encoding.
    pub fn prepare(self, v: &mut [f32]) {
        l2_normalize_in_place(v);
        if self == Precision::Half {
            for x in v.iter_mut() {
                *x = bf16_to_f32(f32_to_bf16(*x));
            }
        }
    }

    /// Encode values as little-endian bytes in this precision.
    pub fn encode(self, values: &[f32]) -> Vec<u8> {
        match self {
            Precision::Full => values.iter().flat_map(|f| f.to_le_bytes()).collect(),
            Precision::Half => values
                .iter()
                .flat_map(|&f| f32_to_bf16(f).to_le_bytes())
                .collect(),
        }
    }

    /// Decode little-endian bytes back to `f32`.
    ///
    /// Returns `None` when the byte count is not a whole number of values.
    pub fn decode(self, bytes: &[u8]) -> Option<Vec<f32>> {
        let width = self.bytes_per_value();
        if bytes.len() % width != 0 {
            return None;
        }
        let values = match self {
            Precision::Full => bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            Precision::Half => bytes
                .chunks_exact(2)
                .map(|b| bf16_to_f32(u16::from_le_bytes([b[0], b[1]])))
                .collect(),
        };
        Some(values)
    }
}

/// Round an `f32` to bfloat16 (round-to-nearest-even).
fn f32_to_bf16(x: f32) -> u16 {
    let bits = x.to_bits();
    if x.is_nan() {
        // keep it a quiet NaN after truncation
        return ((bits >> 16) as u16) | 0x0040;
    }
    let rounding_bias = 0x7FFF + ((bits >> 16) & 1);
    ((bits + rounding_bias) >> 16) as u16
}

fn bf16_to_f32(h: u16) -> f32 {
    f32::from_bits((h as u32) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_round_trip_is_exact() {
        let values = vec![0.1f32, -0.25, 0.333_333, 1.0];
        let bytes = Precision::Full.encode(&values);
        assert_eq!(bytes.len(), 16);
        assert_eq!(Precision::Full.decode(&bytes).unwrap(), values);
    }

    #[test]
    fn test_half_round_trip_matches_prepare() {
        let mut prepared = vec![0.3f32, -0.4, 0.5, 0.7];
        Precision::Half.prepare(&mut prepared);

        let bytes = Precision::Half.encode(&prepared);
        assert_eq!(bytes.len(), 8);
        let decoded = Precision::Half.decode(&bytes).unwrap();

        // Prepared values are already representable, so storage is lossless.
        assert_eq!(decoded, prepared);
    }

    #[test]
    fn test_half_is_close_to_full() {
        let mut full = vec![0.12f32, -0.56, 0.78, 0.01];
        let mut half = full.clone();
        Precision::Full.prepare(&mut full);
        Precision::Half.prepare(&mut half);
        for (a, b) in full.iter().zip(&half) {
            assert!((a - b).abs() < 1e-2, "{a} vs {b}");
        }
    }

    #[test]
    fn test_bf16_rounds_to_nearest_even() {
        // 1.0 + 2^-8 sits exactly halfway between two bf16 values; ties go to even (1.0).
        let halfway = f32::from_bits(0x3F80_8000);
        assert_eq!(bf16_to_f32(f32_to_bf16(halfway)), 1.0);
        // Slightly above halfway rounds up.
        let above = f32::from_bits(0x3F80_8001);
        assert_eq!(f32_to_bf16(above), 0x3F81);
    }

    #[test]
    fn test_decode_rejects_ragged_bytes() {
        assert!(Precision::Full.decode(&[0, 0, 0]).is_none());
        assert!(Precision::Half.decode(&[0]).is_none());
    }

    #[test]
    fn test_nan_stays_nan() {
        assert!(bf16_to_f32(f32_to_bf16(f32::NAN)).is_nan());
    }
}
