//! GCD, extended Euclid, and modular inverse.

use crate::bignum::BigNum;
use ferrotls_types::CryptoError;

impl BigNum {
    /// Greatest common divisor of |self| and |other|.
    pub fn gcd(&self, other: &BigNum) -> Result<BigNum, CryptoError> {
        if self.is_zero() && other.is_zero() {
            return Err(CryptoError::InvalidArg);
        }
        let mut a = self.clone();
        a.set_negative(false);
        let mut b = other.clone();
        b.set_negative(false);
        if a.is_zero() {
            return Ok(b);
        }

        while !b.is_zero() {
            let (_, rem) = a.div_rem(&b)?;
            a = b;
            b = rem;
        }
        Ok(a)
    }

    /// Extended Euclid: returns (g, x, y) with self*x + other*y == g,
    /// g = gcd(|self|, |other|).
    pub fn extended_gcd(&self, other: &BigNum) -> Result<(BigNum, BigNum, BigNum), CryptoError> {
        if self.is_zero() && other.is_zero() {
            return Err(CryptoError::InvalidArg);
        }

        let mut old_r = self.clone();
        let mut r = other.clone();
        let mut old_s = BigNum::one();
        let mut s = BigNum::zero();
        let mut old_t = BigNum::zero();
        let mut t = BigNum::one();

        while !r.is_zero() {
            let (q, rem) = old_r.div_rem(&r)?;

            old_r = r;
            r = rem;

            let new_s = old_s.sub(&q.mul(&s));
            old_s = s;
            s = new_s;

            let new_t = old_t.sub(&q.mul(&t));
            old_t = t;
            t = new_t;
        }

        // Fix up signs so the gcd comes out non-negative.
        if old_r.is_negative() {
            old_r.set_negative(false);
            let mut nx = old_s;
            nx.set_negative(!nx.is_negative());
            let mut ny = old_t;
            ny.set_negative(!ny.is_negative());
            return Ok((old_r, nx, ny));
        }
        Ok((old_r, old_s, old_t))
    }

    /// self^-1 mod modulus; fails with `BnNoInverse` when
    /// gcd(self, modulus) != 1.
    pub fn mod_inv(&self, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        if modulus.is_zero() || modulus.is_one() {
            return Err(CryptoError::InvalidArg);
        }

        let reduced = self.mod_reduce(modulus)?;
        if reduced.is_zero() {
            return Err(CryptoError::BnNoInverse);
        }

        let (g, x, _) = reduced.extended_gcd(modulus)?;
        if !g.is_one() {
            return Err(CryptoError::BnNoInverse);
        }
        x.mod_reduce(modulus)
    }
}
