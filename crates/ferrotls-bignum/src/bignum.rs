//! Big number type: representation, conversion, and comparison.

use ferrotls_types::CryptoError;
use zeroize::Zeroize;

/// Limb type (64-bit on 64-bit platforms).
pub type Limb = u64;
/// Double-width type for multiplication intermediates.
pub(crate) type DoubleLimb = u128;

/// Bits per limb.
pub const LIMB_BITS: usize = 64;

/// A heap-allocated signed big number, zeroized on drop.
///
/// Sign-magnitude representation over a little-endian array of `u64`
/// limbs. Canonical form has no trailing zero limbs (zero itself is a
/// single zero limb with a non-negative sign).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct BigNum {
    /// Little-endian limbs (limbs[0] is the least significant).
    limbs: Vec<Limb>,
    /// True if the number is negative.
    negative: bool,
}

impl BigNum {
    /// The value zero.
    pub fn zero() -> Self {
        Self {
            limbs: vec![0],
            negative: false,
        }
    }

    /// The value one.
    pub fn one() -> Self {
        Self::from_u64(1)
    }

    pub fn from_u64(value: u64) -> Self {
        Self {
            limbs: vec![value],
            negative: false,
        }
    }

    /// Build from big-endian bytes. Leading zero bytes are accepted and
    /// dropped from the canonical form.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::zero();
        }

        let mut limbs = vec![0u64; bytes.len().div_ceil(8)];
        for (i, &byte) in bytes.iter().rev().enumerate() {
            limbs[i / 8] |= (byte as u64) << ((i % 8) * 8);
        }

        let mut bn = Self {
            limbs,
            negative: false,
        };
        bn.normalize();
        bn
    }

    /// Export the magnitude as minimal big-endian bytes (zero encodes as
    /// a single `0x00` byte).
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let bits = self.bit_len();
        if bits == 0 {
            return vec![0];
        }

        let num_bytes = bits.div_ceil(8);
        let mut bytes = vec![0u8; num_bytes];
        for i in 0..num_bytes {
            bytes[num_bytes - 1 - i] = (self.limbs[i / 8] >> ((i % 8) * 8)) as u8;
        }
        bytes
    }

    /// Export the magnitude as big-endian bytes left-padded to `width`.
    ///
    /// Fails when the value does not fit.
    pub fn to_bytes_be_padded(&self, width: usize) -> Result<Vec<u8>, CryptoError> {
        let raw = self.to_bytes_be();
        let raw = if raw == [0] { Vec::new() } else { raw };
        if raw.len() > width {
            return Err(CryptoError::BufferTooSmall {
                need: raw.len(),
                got: width,
            });
        }
        let mut out = vec![0u8; width];
        out[width - raw.len()..].copy_from_slice(&raw);
        Ok(out)
    }

    /// Parse a hex string, with an optional leading `-` and optional
    /// `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        if digits.is_empty() {
            return Err(CryptoError::BnParseFail);
        }

        let mut limbs = vec![0u64; digits.len().div_ceil(16)];
        for (i, c) in digits.chars().rev().enumerate() {
            let nibble = c.to_digit(16).ok_or(CryptoError::BnParseFail)? as u64;
            limbs[i / 16] |= nibble << ((i % 16) * 4);
        }

        let mut bn = Self { limbs, negative };
        bn.normalize();
        Ok(bn)
    }

    /// Parse a decimal string, with an optional leading `-`.
    pub fn from_decimal(s: &str) -> Result<Self, CryptoError> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() {
            return Err(CryptoError::BnParseFail);
        }

        let ten = BigNum::from_u64(10);
        let mut acc = BigNum::zero();
        for c in digits.chars() {
            let d = c.to_digit(10).ok_or(CryptoError::BnParseFail)? as u64;
            acc = acc.mul(&ten).add(&BigNum::from_u64(d));
        }
        acc.negative = negative;
        acc.normalize();
        Ok(acc)
    }

    /// Lowercase hex rendering of the magnitude, with a `-` prefix for
    /// negative values.
    pub fn to_hex(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let hex: String = self
            .to_bytes_be()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        let hex = hex.trim_start_matches('0');
        if hex.is_empty() {
            "0".to_string()
        } else {
            format!("{sign}{hex}")
        }
    }

    /// Number of significant bits in the magnitude.
    pub fn bit_len(&self) -> usize {
        for i in (0..self.limbs.len()).rev() {
            if self.limbs[i] != 0 {
                return i * LIMB_BITS + (LIMB_BITS - self.limbs[i].leading_zeros() as usize);
            }
        }
        0
    }

    pub fn num_limbs(&self) -> usize {
        self.limbs.len()
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&l| l == 0)
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.is_zero()
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    pub(crate) fn limbs_mut(&mut self) -> &mut Vec<Limb> {
        &mut self.limbs
    }

    pub fn set_negative(&mut self, neg: bool) {
        self.negative = neg && !self.is_zero();
    }

    /// Build from little-endian limbs.
    pub fn from_limbs(limbs: Vec<Limb>) -> Self {
        let mut bn = Self {
            limbs: if limbs.is_empty() { vec![0] } else { limbs },
            negative: false,
        };
        bn.normalize();
        bn
    }

    pub fn is_one(&self) -> bool {
        !self.negative && self.limbs.len() == 1 && self.limbs[0] == 1
    }

    pub fn is_even(&self) -> bool {
        self.limbs[0] & 1 == 0
    }

    pub fn is_odd(&self) -> bool {
        self.limbs[0] & 1 == 1
    }

    /// Bit at position `idx`, counted from the LSB.
    pub fn get_bit(&self, idx: usize) -> u64 {
        let limb_idx = idx / LIMB_BITS;
        if limb_idx >= self.limbs.len() {
            0
        } else {
            (self.limbs[limb_idx] >> (idx % LIMB_BITS)) & 1
        }
    }

    /// Set bit at position `idx`, growing the limb array as needed.
    pub fn set_bit(&mut self, idx: usize) {
        let limb_idx = idx / LIMB_BITS;
        if limb_idx >= self.limbs.len() {
            self.limbs.resize(limb_idx + 1, 0);
        }
        self.limbs[limb_idx] |= 1u64 << (idx % LIMB_BITS);
    }

    /// Restore canonical form: strip trailing zero limbs, clear the sign
    /// of zero.
    pub(crate) fn normalize(&mut self) {
        while self.limbs.len() > 1 && self.limbs[self.limbs.len() - 1] == 0 {
            self.limbs.pop();
        }
        if self.is_zero() {
            self.negative = false;
        }
    }
}

impl std::fmt::Debug for BigNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BigNum({})", self.to_hex())
    }
}

impl PartialEq for BigNum {
    fn eq(&self, other: &Self) -> bool {
        self.negative == other.negative && self.limbs == other.limbs
    }
}

impl Eq for BigNum {}

impl PartialOrd for BigNum {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigNum {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self.is_negative(), other.is_negative()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.cmp_abs(other),
            (true, true) => other.cmp_abs(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_properties() {
        let z = BigNum::zero();
        assert!(z.is_zero());
        assert_eq!(z.bit_len(), 0);
        assert!(!z.is_negative());
    }

    #[test]
    fn bytes_roundtrip() {
        let bytes = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        let n = BigNum::from_bytes_be(&bytes);
        assert_eq!(n.to_bytes_be(), bytes);
    }

    #[test]
    fn leading_zero_bytes_dropped() {
        let n = BigNum::from_bytes_be(&[0x00, 0x00, 0x12, 0x34]);
        assert_eq!(n.to_bytes_be(), vec![0x12, 0x34]);
        assert_eq!(n, BigNum::from_u64(0x1234));
    }

    #[test]
    fn padded_export() {
        let n = BigNum::from_u64(0x1234);
        assert_eq!(
            n.to_bytes_be_padded(4).unwrap(),
            vec![0x00, 0x00, 0x12, 0x34]
        );
        assert!(n.to_bytes_be_padded(1).is_err());
        assert_eq!(BigNum::zero().to_bytes_be_padded(2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn hex_parse_and_render() {
        let n = BigNum::from_hex("deadbeef").unwrap();
        assert_eq!(n, BigNum::from_u64(0xdeadbeef));
        assert_eq!(n.to_hex(), "deadbeef");

        let m = BigNum::from_hex("-0x10").unwrap();
        assert!(m.is_negative());
        assert_eq!(m.to_hex(), "-10");

        assert!(BigNum::from_hex("xyz").is_err());
        assert!(BigNum::from_hex("").is_err());
    }

    #[test]
    fn decimal_parse() {
        let n = BigNum::from_decimal("18446744073709551617").unwrap();
        // 2^64 + 1
        assert_eq!(n.limbs(), &[1, 1]);
        assert!(BigNum::from_decimal("12a").is_err());
        assert_eq!(
            BigNum::from_decimal("-7").unwrap(),
            {
                let mut m = BigNum::from_u64(7);
                m.set_negative(true);
                m
            }
        );
    }

    #[test]
    fn ordering_with_signs() {
        let mut neg_five = BigNum::from_u64(5);
        neg_five.set_negative(true);
        let mut neg_two = BigNum::from_u64(2);
        neg_two.set_negative(true);
        let three = BigNum::from_u64(3);

        assert!(neg_five < neg_two);
        assert!(neg_two < three);
        assert!(neg_five < three);
        assert!(BigNum::zero() > neg_two);
    }

    #[test]
    fn negative_zero_is_zero() {
        let mut z = BigNum::zero();
        z.set_negative(true);
        assert!(!z.is_negative());
        assert_eq!(z, BigNum::zero());
    }

    #[test]
    fn bit_access() {
        let mut n = BigNum::zero();
        n.set_bit(130);
        assert_eq!(n.get_bit(130), 1);
        assert_eq!(n.get_bit(129), 0);
        assert_eq!(n.bit_len(), 131);
        assert_eq!(n.num_limbs(), 3);
    }
}
