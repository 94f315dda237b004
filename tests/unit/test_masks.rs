//! Unit tests for bitmask recognition.

use primitive_types::U256;
use revertscope::core::masks::{get_bit, is_full_width_mask, to_mask};

#[test]
fn test_to_mask() {
    assert_eq!(to_mask(U256::from(0xffu64)), Some((8, 0)));
    assert_eq!(to_mask(U256::from(0xff00u64)), Some((8, 8)));
    assert_eq!(to_mask(U256::from(0b101u64)), None);
    assert_eq!(to_mask(U256::MAX), Some((256, 0)));
}

#[test]
fn test_get_bit() {
    assert_eq!(get_bit(U256::from(2u64), 1), 1);
    assert_eq!(get_bit(U256::from(2u64), 0), 0);
    assert_eq!(get_bit(U256::MAX, 300), 0);
}

#[test]
fn test_full_width_masks() {
    assert!(is_full_width_mask(U256::from(0xfu64)));
    assert!(is_full_width_mask(U256::from(0xffffffffu64)));
    // address mask
    assert!(is_full_width_mask((U256::one() << 160) - U256::one()));
    assert!(is_full_width_mask(U256::MAX));

    assert!(!is_full_width_mask(U256::zero()));
    assert!(!is_full_width_mask(U256::from(0x7u64)));
    assert!(!is_full_width_mask(U256::from(0xff00u64)));
    assert!(!is_full_width_mask(U256::from(0x20u64)));
}
