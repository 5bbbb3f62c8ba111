//! Packed binary coded decimal (BCD) helpers.
//! The high nibble holds the tens digit and the low nibble the ones digit.

/// Converts a binary value (0..99) to packed BCD format.
/// No range check is performed: callers must clamp first.
pub const fn bin_to_bcd(value: u8) -> u8 {
  ((value / 10) << 4) | (value % 10)
}

/// Converts a packed BCD value to binary format.
/// Each nibble is masked independently; a malformed nibble (10..15)
/// is decoded as-is rather than rejected.
pub const fn bcd_to_bin(value: u8) -> u8 {
  ((value >> 4) & 0x0F) * 10 + (value & 0x0F)
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn known_values() {
    assert_eq!(bin_to_bcd(0), 0x00);
    assert_eq!(bin_to_bcd(9), 0x09);
    assert_eq!(bin_to_bcd(10), 0x10);
    assert_eq!(bin_to_bcd(59), 0x59);
    assert_eq!(bin_to_bcd(99), 0x99);
    assert_eq!(bcd_to_bin(0x23), 23);
    assert_eq!(bcd_to_bin(0x31), 31);
  }

  #[test]
  fn malformed_nibbles_pass_through() {
    // 0x1F: tens digit 1, ones "digit" 15
    assert_eq!(bcd_to_bin(0x1F), 25);
    // 0xA0: tens "digit" 10
    assert_eq!(bcd_to_bin(0xA0), 100);
  }

  proptest! {
    #[test]
    fn decimal_survives_bcd(v in 0u8..=99) {
      prop_assert_eq!(bcd_to_bin(bin_to_bcd(v)), v);
    }
  }
}
