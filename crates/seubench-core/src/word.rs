//! Fixed-width element types the engine can compare, seal, and corrupt.

use std::fmt;

use xxhash_rust::xxh3::Xxh3;

/// A fixed-width integer element of a kernel buffer.
///
/// Comparisons are exact. Every kernel in this workspace is deterministic over
/// fixed-width integers, so there is no tolerance.
pub trait Word:
    Copy + PartialEq + Default + fmt::Debug + fmt::Display + fmt::LowerHex + Send + 'static
{
    /// Width of the element in bits.
    const BITS: u32;

    /// Return `self` with bit `bit % BITS` inverted.
    #[must_use]
    fn flip_bit(self, bit: u32) -> Self;

    /// Feed the little-endian encoding of `self` into a seal hasher.
    fn hash_into(self, hasher: &mut Xxh3);

    /// Lossless widening used by checksum checks.
    fn widen(self) -> i128;
}

macro_rules! impl_word {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Word for $ty {
                const BITS: u32 = <$ty>::BITS;

                fn flip_bit(self, bit: u32) -> Self {
                    self ^ (1 << (bit % Self::BITS))
                }

                fn hash_into(self, hasher: &mut Xxh3) {
                    hasher.update(&self.to_le_bytes());
                }

                fn widen(self) -> i128 {
                    i128::from(self)
                }
            }
        )*
    };
}

impl_word!(u8, u16, u32, u64, i32, i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_bit_is_an_involution() {
        let value: u8 = 0b1010_0101;
        assert_eq!(value.flip_bit(3).flip_bit(3), value);
        assert_eq!(value.flip_bit(0), 0b1010_0100);
    }

    #[test]
    fn flip_bit_wraps_bit_index() {
        assert_eq!(0_u8.flip_bit(9), 0b10);
        assert_eq!(0_i32.flip_bit(31), i32::MIN);
    }

    #[test]
    fn widen_preserves_sign() {
        assert_eq!((-7_i32).widen(), -7);
        assert_eq!(u64::MAX.widen(), i128::from(u64::MAX));
    }
}
