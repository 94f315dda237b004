//! Bitmask recognition for constant operands.
//!
//! Compilers zero-extend narrow values with `AND x 0xff..ff`; the resolver
//! elides those masks so the condition reads in terms of `x`.

use primitive_types::U256;

/// Extract bit at position `pos` from `num`.
pub fn get_bit(num: U256, pos: u16) -> u8 {
    if pos < 256 && num.bit(pos as usize) { 1 } else { 0 }
}

/// Try to decompose `num` into a contiguous bitmask: returns `(size, offset)`
/// such that `num == (2^size - 1) << offset`, or `None` if `num` is not a
/// contiguous mask.
pub fn to_mask(num: U256) -> Option<(u16, u16)> {
    if num.is_zero() {
        return Some((0, 0));
    }

    let mut i: u16 = 0;
    while i < 256 && get_bit(num, i) == 0 {
        i += 1;
    }
    let mask_pos = i;

    while i < 256 && get_bit(num, i) == 1 {
        i += 1;
    }
    let mask_pos_plus_len = i;

    while i < 256 {
        if get_bit(num, i) != 0 {
            return None;
        }
        i += 1;
    }

    Some((mask_pos_plus_len - mask_pos, mask_pos))
}

/// `true` when every hex digit of `num` is `f`: a low mask whose width is a
/// whole number of nibbles (`0xf`, `0xff`, `0xffffffff`, …).
pub fn is_full_width_mask(num: U256) -> bool {
    matches!(to_mask(num), Some((size, 0)) if size > 0 && size % 4 == 0)
}
