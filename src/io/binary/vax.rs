// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! VAX floating-point conversion.
//!
//! VAX F_floating (32-bit) and D_floating (64-bit) values use an exponent
//! bias of 128 with a hidden leading `0.1` mantissa bit, and store their
//! 16-bit words most-significant first, each word little-endian.
//!
//! Layout of the logical value, from the most significant bit:
//!
//! | Format | Sign | Exponent | Fraction |
//! |--------|------|----------|----------|
//! | F      | 1    | 8        | 23       |
//! | D      | 1    | 8        | 55       |
//!
//! A zero exponent encodes zero. VAX has no infinities or NaN, so such values
//! saturate to the largest representable magnitude when written.

const VAX_EXPONENT_BIAS: i32 = 128;

/// Decode four VAX F_floating bytes into an IEEE single.
pub fn vax_f_to_f32(bytes: [u8; 4]) -> f32 {
    let hi = u16::from_le_bytes([bytes[0], bytes[1]]) as u32;
    let lo = u16::from_le_bytes([bytes[2], bytes[3]]) as u32;
    let bits = (hi << 16) | lo;

    let exponent = ((bits >> 23) & 0xFF) as i32;
    if exponent == 0 {
        return 0.0;
    }
    let fraction = bits & 0x007F_FFFF;
    let mantissa = f64::from((1 << 23) | fraction);
    let magnitude = mantissa * 2f64.powi(exponent - VAX_EXPONENT_BIAS - 24);
    let value = if bits >> 31 == 1 {
        -magnitude
    } else {
        magnitude
    };
    value as f32
}

/// Encode an IEEE single into four VAX F_floating bytes.
pub fn f32_to_vax_f(value: f32) -> [u8; 4] {
    let Some((negative, exponent, fraction)) = split_for_vax(f64::from(value)) else {
        return [0; 4];
    };
    let (exponent, fraction) = match exponent {
        e if e > 255 => (255u32, (1u64 << 52) - 1),
        e => (e as u32, fraction),
    };
    let bits = (u32::from(negative) << 31) | (exponent << 23) | ((fraction >> 29) as u32);
    let hi = ((bits >> 16) as u16).to_le_bytes();
    let lo = ((bits & 0xFFFF) as u16).to_le_bytes();
    [hi[0], hi[1], lo[0], lo[1]]
}

/// Decode eight VAX D_floating bytes into an IEEE double.
pub fn vax_d_to_f64(bytes: [u8; 8]) -> f64 {
    let mut bits = 0u64;
    for word in bytes.chunks_exact(2) {
        bits = (bits << 16) | u64::from(u16::from_le_bytes([word[0], word[1]]));
    }

    let exponent = ((bits >> 55) & 0xFF) as i32;
    if exponent == 0 {
        return 0.0;
    }
    let fraction = bits & ((1u64 << 55) - 1);
    let mantissa = ((1u64 << 55) | fraction) as f64;
    let magnitude = mantissa * 2f64.powi(exponent - VAX_EXPONENT_BIAS - 56);
    if bits >> 63 == 1 {
        -magnitude
    } else {
        magnitude
    }
}

/// Encode an IEEE double into eight VAX D_floating bytes.
pub fn f64_to_vax_d(value: f64) -> [u8; 8] {
    let Some((negative, exponent, fraction)) = split_for_vax(value) else {
        return [0; 8];
    };
    let (exponent, fraction) = match exponent {
        e if e > 255 => (255u64, (1u64 << 52) - 1),
        e => (e as u64, fraction),
    };
    let bits = (u64::from(negative) << 63) | (exponent << 55) | (fraction << 3);
    let mut out = [0u8; 8];
    for (i, chunk) in out.chunks_exact_mut(2).enumerate() {
        let word = (bits >> (48 - 16 * i)) as u16;
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// Split a double into (sign, VAX exponent, 52-bit fraction).
///
/// Returns `None` when the value is zero or too small for VAX. The exponent
/// may exceed 255 for non-finite or too large values.
fn split_for_vax(value: f64) -> Option<(bool, i32, u64)> {
    let bits = value.to_bits();
    let negative = bits >> 63 == 1;
    let ieee_exponent = ((bits >> 52) & 0x7FF) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    if ieee_exponent == 0 {
        return None;
    }
    if ieee_exponent == 0x7FF {
        return Some((negative, 256, fraction));
    }
    // IEEE 1.f * 2^(E-1023) == 0.1f * 2^(E-1022)
    let exponent = ieee_exponent - 1022 + VAX_EXPONENT_BIAS;
    if exponent < 1 {
        return None;
    }
    Some((negative, exponent, fraction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vax_f_one() {
        assert_eq!(f32_to_vax_f(1.0), [0x80, 0x40, 0x00, 0x00]);
        assert_eq!(vax_f_to_f32([0x80, 0x40, 0x00, 0x00]), 1.0);
    }

    #[test]
    fn test_vax_f_matches_byte_swap_rule() {
        // IEEE little-endian bytes are [b2, b3, b0, b1 - 1] for VAX bytes b.
        for value in [3.5f32, -12.25, 1.0e-3, 12345.678] {
            let vax = f32_to_vax_f(value);
            let ieee = [vax[2], vax[3], vax[0], vax[1] - 1];
            assert_eq!(f32::from_le_bytes(ieee), value);
        }
    }

    #[test]
    fn test_vax_f_zero() {
        assert_eq!(f32_to_vax_f(0.0), [0; 4]);
        assert_eq!(vax_f_to_f32([0; 4]), 0.0);
        assert_eq!(vax_f_to_f32([0x00, 0x80, 0x12, 0x34]), 0.0);
    }

    #[test]
    fn test_vax_f_negative() {
        let vax = f32_to_vax_f(-2.0);
        assert_eq!(vax_f_to_f32(vax), -2.0);
        assert_eq!(vax[1] & 0x80, 0x80);
    }

    #[test]
    fn test_vax_f_saturates_infinity() {
        let vax = f32_to_vax_f(f32::INFINITY);
        let back = vax_f_to_f32(vax);
        assert!(back.is_finite());
        assert!(back > 1.0e38);
    }

    #[test]
    fn test_vax_d_values() {
        for value in [1.0f64, -0.1, 123456.789, 2.5e-20] {
            assert_eq!(vax_d_to_f64(f64_to_vax_d(value)), value);
        }
    }

    #[test]
    fn test_vax_d_one_layout() {
        // 0.5 * 2^1: exponent 129, zero fraction
        assert_eq!(f64_to_vax_d(1.0), [0x80, 0x40, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_vax_d_underflow_is_zero() {
        assert_eq!(f64_to_vax_d(1.0e-300), [0; 8]);
    }
}
