//! Fixed-width helper testing

use crate::maths::{float_to_int, mask, mask_bits, msb, parity, sign_extend, to_signed};

#[test]
fn mask_widths() {
    assert_eq!(mask(1), 0xFF);
    assert_eq!(mask(2), 0xFFFF);
    assert_eq!(mask(4), 0xFFFF_FFFF);
    assert_eq!(mask(8), u64::MAX);
    assert_eq!(mask_bits(2), 0b11);
    assert_eq!(mask_bits(128), u128::MAX);
}

#[test]
fn sign_extension() {
    assert_eq!(sign_extend(0x80, 1), 0xFFFF_FFFF_FFFF_FF80);
    assert_eq!(sign_extend(0x7F, 1), 0x7F);
    assert_eq!(sign_extend(0x1_8000, 2), 0xFFFF_FFFF_FFFF_8000);
    assert_eq!(to_signed(0xFFFF_FFFF, 4), -1);
    assert!(msb(0x8000_0000, 4));
    assert!(!msb(0x8000_0000, 8));
}

#[test]
fn parity_low_byte() {
    assert!(parity(0));
    assert!(parity(0b11));
    assert!(!parity(0b111));
    assert!(parity(0x100));
}

#[test]
fn float_conversion() {
    assert_eq!(float_to_int(2.5, 4), 2);
    assert_eq!(float_to_int(3.5, 4), 4);
    assert_eq!(float_to_int(1.4, 4), 1);
    assert_eq!(float_to_int(-1.0, 2), 0xFFFF);
    assert_eq!(float_to_int(70000.0, 2), 0x8000);
    assert_eq!(float_to_int(f64::NAN, 4), 0x8000_0000);
}
