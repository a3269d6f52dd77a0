//! Fixed-width integer helpers.
//!
//! Emulated values are carried around as `u64` along with a width in bytes;
//! these functions give that pair its two's complement meaning.

use num_traits::ToPrimitive;

/// Given a width in bytes, produce a mask covering that many low bits.
pub fn mask(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1 << (width * 8)) - 1
    }
}

/// Given a width in bits, produce a mask covering that many low bits.
pub fn mask_bits(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Determine if the sign bit of a `width`-byte value is set.
pub fn msb(value: u64, width: usize) -> bool {
    let width = width.clamp(1, 8);
    value >> (width * 8 - 1) & 1 == 1
}

/// Sign-extend a `width`-byte value to the full 64 bits.
pub fn sign_extend(value: u64, width: usize) -> u64 {
    let value = value & mask(width);

    if msb(value, width) {
        value | !mask(width)
    } else {
        value
    }
}

/// Reinterpret a `width`-byte value as a signed integer.
pub fn to_signed(value: u64, width: usize) -> i64 {
    sign_extend(value, width) as i64
}

/// x86 parity: true if the low byte has an even number of set bits.
pub fn parity(value: u64) -> bool {
    (value as u8).count_ones() % 2 == 0
}

/// Convert a float to a `width`-byte signed integer the way the x87 does.
///
/// Rounds to nearest, ties to even. Values that do not fit (including NaN)
/// become the "integer indefinite", which is the most negative value of the
/// target width.
pub fn float_to_int(value: f64, width: usize) -> u64 {
    let rounded = if (value - value.trunc()).abs() == 0.5 {
        2.0 * (value / 2.0).round()
    } else {
        value.round()
    };
    let indefinite = 1u64 << (width.clamp(1, 8) * 8 - 1);

    match rounded.to_i64() {
        Some(i) if sign_extend(i as u64, width) == i as u64 => i as u64 & mask(width),
        _ => indefinite,
    }
}

#[cfg(test)]
mod tests;
