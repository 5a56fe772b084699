//! Random big number generation from OS randomness.

use crate::bignum::BigNum;
use ferrotls_types::CryptoError;

impl BigNum {
    /// Random value with exactly `bits` significant bits; the top bit
    /// is forced on, and the bottom bit too when `odd` is set.
    pub fn random(bits: usize, odd: bool) -> Result<BigNum, CryptoError> {
        if bits == 0 {
            return Ok(BigNum::zero());
        }

        let num_bytes = bits.div_ceil(8);
        let mut buf = vec![0u8; num_bytes];
        getrandom::getrandom(&mut buf).map_err(|_| CryptoError::BnRandGenFail)?;

        let excess = num_bytes * 8 - bits;
        if excess > 0 {
            buf[0] &= 0xFF >> excess;
        }
        buf[0] |= 1 << ((bits - 1) % 8);

        let mut result = BigNum::from_bytes_be(&buf);
        if odd {
            result.limbs_mut()[0] |= 1;
        }
        Ok(result)
    }

    /// Uniform in [1, upper), by rejection sampling.
    pub fn random_range(upper: &BigNum) -> Result<BigNum, CryptoError> {
        if upper.is_zero() || upper.is_one() {
            return Err(CryptoError::InvalidArg);
        }

        let bits = upper.bit_len();
        let num_bytes = bits.div_ceil(8);
        let excess = num_bytes * 8 - bits;

        loop {
            let mut buf = vec![0u8; num_bytes];
            getrandom::getrandom(&mut buf).map_err(|_| CryptoError::BnRandGenFail)?;
            if excess > 0 {
                buf[0] &= 0xFF >> excess;
            }

            let candidate = BigNum::from_bytes_be(&buf);
            if !candidate.is_zero() && candidate < *upper {
                return Ok(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_bit_length() {
        for bits in [1, 7, 8, 15, 64, 65, 256, 521] {
            let r = BigNum::random(bits, false).unwrap();
            assert_eq!(r.bit_len(), bits, "random({bits})");
        }
    }

    #[test]
    fn odd_flag_forces_low_bit() {
        let r = BigNum::random(128, true).unwrap();
        assert!(r.is_odd());
    }

    #[test]
    fn range_sampling_stays_in_bounds() {
        let upper = BigNum::from_u64(1000);
        for _ in 0..50 {
            let r = BigNum::random_range(&upper).unwrap();
            assert!(r > BigNum::zero() && r < upper);
        }
    }
}
