//! Montgomery multiplication context for modular exponentiation.

use crate::bignum::{BigNum, DoubleLimb, Limb, LIMB_BITS};
use ferrotls_types::CryptoError;

/// Precomputed state for Montgomery arithmetic modulo an odd N, with
/// R = 2^(m_size * LIMB_BITS).
pub struct MontgomeryCtx {
    modulus: BigNum,
    /// Limb count of the modulus.
    m_size: usize,
    /// N' with N[0] * N' == -1 (mod 2^64).
    n_prime: Limb,
    /// R^2 mod N, for encoding into Montgomery form.
    r_squared: BigNum,
}

impl MontgomeryCtx {
    /// Requires an odd, non-zero modulus.
    pub fn new(modulus: &BigNum) -> Result<Self, CryptoError> {
        if modulus.is_zero() {
            return Err(CryptoError::BnDivisionByZero);
        }
        if modulus.is_even() || modulus.is_negative() {
            return Err(CryptoError::InvalidArg);
        }

        let m_size = modulus.num_limbs();
        let r_squared = BigNum::one()
            .shl(2 * m_size * LIMB_BITS)
            .mod_reduce(modulus)?;

        Ok(MontgomeryCtx {
            modulus: modulus.clone(),
            m_size,
            n_prime: compute_n_prime(modulus.limbs()[0]),
            r_squared,
        })
    }

    pub fn modulus(&self) -> &BigNum {
        &self.modulus
    }

    /// Encode: a -> aR mod N.
    pub fn to_mont(&self, a: &BigNum) -> Result<BigNum, CryptoError> {
        let reduced = a.mod_reduce(&self.modulus)?;
        Ok(self.reduce(&reduced.mul(&self.r_squared)))
    }

    /// Decode: aR -> a mod N.
    pub fn from_mont(&self, a_mont: &BigNum) -> BigNum {
        self.reduce(a_mont)
    }

    /// (a * b * R^-1) mod N for operands in Montgomery form.
    pub fn mont_mul(&self, a: &BigNum, b: &BigNum) -> BigNum {
        self.reduce(&a.mul(b))
    }

    /// (a^2 * R^-1) mod N for an operand in Montgomery form.
    pub fn mont_sqr(&self, a: &BigNum) -> BigNum {
        self.reduce(&a.sqr())
    }

    /// REDC (HAC 14.32): T -> T * R^-1 mod N.
    ///
    /// Per limb i, q = t[i] * n' mod 2^64 is added as q * N * 2^(64i),
    /// zeroing the low limbs; the top half is the result, minus one
    /// conditional final subtraction.
    fn reduce(&self, t: &BigNum) -> BigNum {
        let m = self.m_size;
        let mod_limbs = self.modulus.limbs();

        let mut work = vec![0u64; 2 * m + 2];
        let t_limbs = t.limbs();
        let copy_len = t_limbs.len().min(work.len());
        work[..copy_len].copy_from_slice(&t_limbs[..copy_len]);

        for i in 0..m {
            let q = work[i].wrapping_mul(self.n_prime);
            let mut carry: Limb = 0;
            for j in 0..m {
                let prod = q as DoubleLimb * mod_limbs[j] as DoubleLimb
                    + work[i + j] as DoubleLimb
                    + carry as DoubleLimb;
                work[i + j] = prod as Limb;
                carry = (prod >> LIMB_BITS) as Limb;
            }
            let mut k = i + m;
            while carry != 0 && k < work.len() {
                let sum = work[k] as DoubleLimb + carry as DoubleLimb;
                work[k] = sum as Limb;
                carry = (sum >> LIMB_BITS) as Limb;
                k += 1;
            }
        }

        // The REDC intermediate lies in [0, 2N) for reduced operands, so a
        // single masked subtraction canonicalizes it.
        BigNum::from_limbs(work[m..2 * m + 2].to_vec()).ct_sub_if_gte(&self.modulus)
    }

    /// Fixed-window exponentiation: base^exp mod N.
    pub fn mont_exp(&self, base: &BigNum, exp: &BigNum) -> Result<BigNum, CryptoError> {
        if exp.is_zero() {
            if self.modulus.is_one() {
                return Ok(BigNum::zero());
            }
            return Ok(BigNum::one());
        }

        let exp_bits = exp.bit_len();
        let w = window_size(exp_bits);
        let table_size = 1usize << w;

        // table[i] = base^i in Montgomery form.
        let base_mont = self.to_mont(base)?;
        let mut table = Vec::with_capacity(table_size);
        table.push(self.to_mont(&BigNum::one())?);
        table.push(base_mont.clone());
        for i in 2..table_size {
            table.push(self.mont_mul(&table[i - 1], &base_mont));
        }

        let mut result = table[0].clone();
        let mut i = exp_bits;
        while i > 0 {
            let window_bits = w.min(i);
            i -= window_bits;

            for _ in 0..window_bits {
                result = self.mont_sqr(&result);
            }

            let mut window_val = 0u64;
            for b in 0..window_bits {
                window_val |= exp.get_bit(i + b) << b;
            }
            if window_val != 0 {
                result = self.mont_mul(&result, &table[window_val as usize]);
            }
        }

        Ok(self.from_mont(&result))
    }
}

/// N' with n0 * N' == -1 (mod 2^64), by Newton iteration on the
/// inverse of n0 modulo 2^64.
fn compute_n_prime(n0: Limb) -> Limb {
    let mut x: Limb = 1;
    for _ in 0..6 {
        x = x.wrapping_mul(2u64.wrapping_sub(n0.wrapping_mul(x)));
    }
    x.wrapping_neg()
}

fn window_size(exp_bits: usize) -> usize {
    match exp_bits {
        0..=32 => 1,
        33..=64 => 2,
        65..=128 => 3,
        129..=256 => 4,
        257..=512 => 5,
        _ => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_prime_inverse_relation() {
        for n in [0xFFFF_FFFF_FFFF_FFEFu64, 0xC5, 3, 1] {
            let np = compute_n_prime(n);
            assert_eq!(n.wrapping_mul(np), u64::MAX, "n = {n:#x}");
        }
    }

    #[test]
    fn rejects_even_and_zero_modulus() {
        assert!(MontgomeryCtx::new(&BigNum::from_u64(100)).is_err());
        assert!(MontgomeryCtx::new(&BigNum::zero()).is_err());
    }

    #[test]
    fn encode_decode_roundtrip() {
        let modulus = BigNum::from_u64(0xFFFF_FFFF_FFFF_FFC5);
        let ctx = MontgomeryCtx::new(&modulus).unwrap();
        let a = BigNum::from_u64(42);
        assert_eq!(ctx.from_mont(&ctx.to_mont(&a).unwrap()), a);
    }

    #[test]
    fn mont_mul_matches_plain_reduction() {
        let modulus = BigNum::from_hex("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff").unwrap();
        let ctx = MontgomeryCtx::new(&modulus).unwrap();
        let a = BigNum::from_hex("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296").unwrap();
        let b = BigNum::from_hex("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5").unwrap();

        let am = ctx.to_mont(&a).unwrap();
        let bm = ctx.to_mont(&b).unwrap();
        let got = ctx.from_mont(&ctx.mont_mul(&am, &bm));
        let want = a.mul(&b).mod_reduce(&modulus).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn mont_exp_small_values() {
        let modulus = BigNum::from_u64(97);
        let ctx = MontgomeryCtx::new(&modulus).unwrap();
        let r = ctx
            .mont_exp(&BigNum::from_u64(3), &BigNum::from_u64(4))
            .unwrap();
        assert_eq!(r, BigNum::from_u64(81));
        assert_eq!(
            ctx.mont_exp(&BigNum::from_u64(5), &BigNum::zero()).unwrap(),
            BigNum::one()
        );
    }

    #[test]
    fn mont_exp_fermat() {
        let p = BigNum::from_u64(0xFFFF_FFFF_FFFF_FFC5);
        let ctx = MontgomeryCtx::new(&p).unwrap();
        let e = p.sub(&BigNum::one());
        for a in [2u64, 3, 65537, 0xdead_beef] {
            let r = ctx.mont_exp(&BigNum::from_u64(a), &e).unwrap();
            assert_eq!(r, BigNum::one(), "fermat failed for a = {a}");
        }
    }

    #[test]
    fn window_size_thresholds() {
        assert_eq!(window_size(16), 1);
        assert_eq!(window_size(33), 2);
        assert_eq!(window_size(65), 3);
        assert_eq!(window_size(129), 4);
        assert_eq!(window_size(257), 5);
        assert_eq!(window_size(513), 6);
    }
}
