//! Byte-order normalization for the `.m`/`.mat` formats.
//!
//! Both formats store every multi-byte value big-endian, independent of the
//! host. Each value passes through the swap exactly once per direction, so
//! writing and reading cancel out.

/// Reverse the two bytes of a 16-bit unsigned integer.
#[inline]
pub fn swap_u16(v: u16) -> u16 {
    v.swap_bytes()
}

/// Reverse the four bytes of a 32-bit float's bit pattern.
///
/// Operates on the bits so NaN payloads and infinities survive untouched.
#[inline]
pub fn swap_f32(v: f32) -> f32 {
    f32::from_bits(v.to_bits().swap_bytes())
}

// swap(v) in little-endian byte order == v in big-endian byte order, on any
// host. Keeping the swap explicit here mirrors the on-disk contract: one
// normalization per value per direction.

#[inline]
pub fn u16_to_disk(v: u16) -> [u8; 2] {
    swap_u16(v).to_le_bytes()
}

#[inline]
pub fn u16_from_disk(b: [u8; 2]) -> u16 {
    swap_u16(u16::from_le_bytes(b))
}

#[inline]
pub fn f32_to_disk(v: f32) -> [u8; 4] {
    swap_f32(v).to_bits().to_le_bytes()
}

#[inline]
pub fn f32_from_disk(b: [u8; 4]) -> f32 {
    swap_f32(f32::from_bits(u32::from_le_bytes(b)))
}

#[cfg(test)]
mod endian_tests {
    use super::*;

    #[test]
    fn u16_swap_is_involution() {
        for v in 0..=u16::MAX {
            assert_eq!(swap_u16(swap_u16(v)), v);
        }
    }

    #[test]
    fn f32_swap_is_involution() {
        let cases = [
            0.0f32,
            -0.0,
            1.0,
            -1.5,
            f32::MIN,
            f32::MAX,
            f32::MIN_POSITIVE,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::EPSILON,
        ];
        for v in cases {
            assert_eq!(swap_f32(swap_f32(v)).to_bits(), v.to_bits());
        }

        // NaN bit patterns must survive the double swap bit-exactly.
        let nan = f32::from_bits(0x7fc0_dead);
        assert_eq!(swap_f32(swap_f32(nan)).to_bits(), nan.to_bits());
    }

    #[test]
    fn disk_order_is_big_endian() {
        assert_eq!(u16_to_disk(0x1234), [0x12, 0x34]);
        assert_eq!(u16_from_disk([0x12, 0x34]), 0x1234);

        assert_eq!(f32_to_disk(1.0), [0x3f, 0x80, 0x00, 0x00]);
        assert_eq!(f32_from_disk([0x3f, 0x80, 0x00, 0x00]), 1.0);
    }

    #[test]
    fn disk_round_trip() {
        for v in [0u16, 1, 255, 256, 0x1234, u16::MAX] {
            assert_eq!(u16_from_disk(u16_to_disk(v)), v);
        }
        for v in [0.0f32, -2.75, 1e-38, f32::INFINITY] {
            assert_eq!(f32_from_disk(f32_to_disk(v)).to_bits(), v.to_bits());
        }
    }
}
