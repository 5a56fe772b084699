//! Probabilistic primality testing.

use ferrotls_types::CryptoError;

use crate::bignum::BigNum;

/// Primes used for trial division before Miller-Rabin.
const TRIAL_PRIMES: [u64; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

impl BigNum {
    /// Miller-Rabin primality test with `rounds` random witnesses.
    ///
    /// Returns `Ok(false)` for composites; `Ok(true)` means the number is
    /// prime with probability at least 1 - 4^(-rounds).
    pub fn is_probably_prime(&self, rounds: usize) -> Result<bool, CryptoError> {
        if self.is_negative() || self.is_zero() || self.is_one() {
            return Ok(false);
        }

        for &p in &TRIAL_PRIMES {
            let p_bn = BigNum::from_u64(p);
            if *self == p_bn {
                return Ok(true);
            }
            let r = self.mod_reduce(&p_bn)?;
            if r.is_zero() {
                return Ok(false);
            }
        }

        // Write n - 1 = 2^s * d with d odd.
        let one = BigNum::one();
        let n_minus_1 = self.sub(&one);
        let mut d = n_minus_1.clone();
        let mut s = 0usize;
        while d.is_even() {
            d = d.shr(1);
            s += 1;
        }

        // n - 2 as the exclusive upper bound keeps witnesses in [1, n-2].
        let n_minus_2 = self.sub(&BigNum::from_u64(2));

        'witness: for _ in 0..rounds {
            let a = BigNum::random_range(&n_minus_2)?;
            let mut x = a.mod_exp(&d, self)?;
            if x.is_one() || x == n_minus_1 {
                continue;
            }
            for _ in 1..s {
                x = x.mod_mul(&x, self)?;
                if x == n_minus_1 {
                    continue 'witness;
                }
            }
            return Ok(false);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_primes_pass() {
        for &p in &TRIAL_PRIMES {
            assert!(
                BigNum::from_u64(p).is_probably_prime(8).unwrap(),
                "{p} should test prime"
            );
        }
    }

    #[test]
    fn small_composites_fail() {
        for c in [4u64, 15, 21, 91, 561, 41041] {
            // 561 and 41041 are Carmichael numbers
            assert!(!BigNum::from_u64(c).is_probably_prime(8).unwrap(), "{c}");
        }
    }

    #[test]
    fn mersenne_prime() {
        let n = BigNum::from_u64((1u64 << 61) - 1);
        assert!(n.is_probably_prime(8).unwrap());
    }

    #[test]
    fn p256_prime() {
        let n = BigNum::from_hex(
            "ffffffff00000001000000000000000000000000ffffffffffffffffffffffff",
        )
        .unwrap();
        assert!(n.is_probably_prime(8).unwrap());
    }

    #[test]
    fn even_and_trivial_inputs() {
        assert!(!BigNum::zero().is_probably_prime(8).unwrap());
        assert!(!BigNum::one().is_probably_prime(8).unwrap());
        assert!(!BigNum::from_u64(1 << 20).is_probably_prime(8).unwrap());
    }
}
