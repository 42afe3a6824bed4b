//! Goldilocks field elements (p = 2^64 - 2^32 + 1)
//!
//! Only the projection side lives here: turning transaction integers and byte
//! fields into canonical elements. The permutation itself belongs to the
//! injected [`FieldHasher`](super::FieldHasher).

use crate::error::EncodingError;

/// The Goldilocks prime
pub const MODULUS: u64 = 0xFFFF_FFFF_0000_0001;

/// A canonical element, always `< MODULUS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Felt(u64);

impl Felt {
    pub const ZERO: Felt = Felt(0);

    pub fn from_u64(value: u64) -> Self {
        // One subtraction suffices: u64::MAX < 2 * MODULUS.
        if value >= MODULUS {
            Felt(value - MODULUS)
        } else {
            Felt(value)
        }
    }

    pub fn from_u32(value: u32) -> Self {
        Felt(value as u64)
    }

    /// Two's-complement reinterpretation, then reduction.
    pub fn from_i64(value: i64) -> Self {
        Self::from_u64(value as u64)
    }

    pub fn from_bool(value: bool) -> Self {
        Felt(u64::from(value))
    }

    /// Rejects values that are not already reduced.
    pub fn from_canonical(value: u64) -> Option<Self> {
        (value < MODULUS).then_some(Felt(value))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

/// Split `bytes` into 8-byte little-endian limbs, each of which must already
/// be canonical. Used for fields that are themselves field elements, such as
/// public keys.
pub fn canonical_le_limbs(field: &'static str, bytes: &[u8]) -> Result<Vec<Felt>, EncodingError> {
    if bytes.len() % 8 != 0 {
        return Err(EncodingError::InvalidLength {
            field,
            chunk: 8,
            actual: bytes.len(),
        });
    }
    bytes
        .chunks_exact(8)
        .enumerate()
        .map(|(limb, chunk)| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            Felt::from_canonical(u64::from_le_bytes(raw))
                .ok_or(EncodingError::NonCanonical { field, limb })
        })
        .collect()
}

/// Pack arbitrary bytes into 4-byte little-endian limbs. Every `u32` is
/// canonical, so this never fails on content, only on length.
pub fn packed_u32_limbs(field: &'static str, bytes: &[u8]) -> Result<Vec<Felt>, EncodingError> {
    if bytes.len() % 4 != 0 {
        return Err(EncodingError::InvalidLength {
            field,
            chunk: 4,
            actual: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(chunk);
            Felt::from_u32(u32::from_le_bytes(raw))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_values_above_modulus() {
        assert_eq!(Felt::from_u64(MODULUS).as_u64(), 0);
        assert_eq!(Felt::from_u64(u64::MAX).as_u64(), u64::MAX - MODULUS);
        assert_eq!(Felt::from_i64(-1).as_u64(), u64::MAX - MODULUS);
    }

    #[test]
    fn canonical_limbs_are_little_endian() {
        let mut bytes = vec![0u8; 16];
        bytes[0] = 1;
        bytes[8] = 2;
        bytes[9] = 1;
        let limbs = canonical_le_limbs("pub_key", &bytes).unwrap();
        assert_eq!(limbs, vec![Felt::from_u64(1), Felt::from_u64(0x0102)]);
    }

    #[test]
    fn canonical_limbs_reject_bad_input() {
        let err = canonical_le_limbs("pub_key", &[0u8; 12]).unwrap_err();
        assert!(matches!(err, EncodingError::InvalidLength { chunk: 8, .. }));

        let err = canonical_le_limbs("pub_key", &[0xFF; 8]).unwrap_err();
        assert_eq!(
            err,
            EncodingError::NonCanonical {
                field: "pub_key",
                limb: 0
            }
        );
    }

    #[test]
    fn packed_limbs_accept_any_content() {
        let limbs = packed_u32_limbs("memo", &[0xFF; 32]).unwrap();
        assert_eq!(limbs.len(), 8);
        assert!(limbs.iter().all(|f| f.as_u64() == u32::MAX as u64));
    }
}
