//! Arithmetic: add, sub, mul, shifts, division, modular exponentiation.

use crate::bignum::{BigNum, DoubleLimb, Limb, LIMB_BITS};
use crate::montgomery::MontgomeryCtx;
use ferrotls_types::CryptoError;

impl BigNum {
    /// self + other.
    pub fn add(&self, other: &BigNum) -> BigNum {
        if self.is_negative() == other.is_negative() {
            let mut result = add_mag(self.limbs(), other.limbs());
            result.set_negative(self.is_negative());
            result
        } else if self.is_negative() {
            sub_mag(other.limbs(), self.limbs())
        } else {
            sub_mag(self.limbs(), other.limbs())
        }
    }

    /// self - other.
    pub fn sub(&self, other: &BigNum) -> BigNum {
        if self.is_negative() != other.is_negative() {
            let mut result = add_mag(self.limbs(), other.limbs());
            result.set_negative(self.is_negative());
            result
        } else if self.is_negative() {
            sub_mag(other.limbs(), self.limbs())
        } else {
            sub_mag(self.limbs(), other.limbs())
        }
    }

    /// self * other.
    pub fn mul(&self, other: &BigNum) -> BigNum {
        let mut result = mul_mag(self.limbs(), other.limbs());
        result.set_negative(self.is_negative() != other.is_negative());
        result
    }

    /// self * self.
    pub fn sqr(&self) -> BigNum {
        mul_mag(self.limbs(), self.limbs())
    }

    /// Shift left by `bits`.
    pub fn shl(&self, bits: usize) -> BigNum {
        if self.is_zero() || bits == 0 {
            let mut r = self.clone();
            r.normalize();
            return r;
        }
        let limb_shift = bits / LIMB_BITS;
        let bit_shift = bits % LIMB_BITS;
        let src = self.limbs();
        let mut limbs = vec![0u64; src.len() + limb_shift + 1];

        if bit_shift == 0 {
            limbs[limb_shift..limb_shift + src.len()].copy_from_slice(src);
        } else {
            for i in 0..src.len() {
                limbs[i + limb_shift] |= src[i] << bit_shift;
                limbs[i + limb_shift + 1] = src[i] >> (LIMB_BITS - bit_shift);
            }
        }

        let mut r = BigNum::from_limbs(limbs);
        r.set_negative(self.is_negative());
        r
    }

    /// Shift right by `bits` (magnitude shift; shifts toward zero).
    pub fn shr(&self, bits: usize) -> BigNum {
        let limb_shift = bits / LIMB_BITS;
        let src = self.limbs();
        if limb_shift >= src.len() {
            return BigNum::zero();
        }
        let bit_shift = bits % LIMB_BITS;
        let kept = &src[limb_shift..];
        let mut limbs = vec![0u64; kept.len()];

        if bit_shift == 0 {
            limbs.copy_from_slice(kept);
        } else {
            for i in 0..kept.len() {
                limbs[i] = kept[i] >> bit_shift;
                if i + 1 < kept.len() {
                    limbs[i] |= kept[i + 1] << (LIMB_BITS - bit_shift);
                }
            }
        }

        let mut r = BigNum::from_limbs(limbs);
        r.set_negative(self.is_negative());
        r
    }

    /// Division with remainder: (quotient, remainder) with
    /// `self == divisor * quotient + remainder` and
    /// `|remainder| < |divisor|`; the remainder's sign follows the
    /// dividend (truncated division).
    pub fn div_rem(&self, divisor: &BigNum) -> Result<(BigNum, BigNum), CryptoError> {
        if divisor.is_zero() {
            return Err(CryptoError::BnDivisionByZero);
        }
        let (mut q, mut r) = div_rem_mag(self.limbs(), divisor.limbs());
        q.set_negative(self.is_negative() != divisor.is_negative());
        r.set_negative(self.is_negative());
        Ok((q, r))
    }

    /// Canonical residue: self mod modulus, in [0, |modulus|).
    pub fn mod_reduce(&self, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        let (_, mut r) = self.div_rem(modulus)?;
        if r.is_negative() {
            let mut m = modulus.clone();
            m.set_negative(false);
            r = r.add(&m);
        }
        Ok(r)
    }

    /// (self + other) mod modulus, canonical.
    pub fn mod_add(&self, other: &BigNum, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        self.add(other).mod_reduce(modulus)
    }

    /// (self - other) mod modulus, canonical.
    pub fn mod_sub(&self, other: &BigNum, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        self.sub(other).mod_reduce(modulus)
    }

    /// (self * other) mod modulus, canonical.
    pub fn mod_mul(&self, other: &BigNum, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        self.mul(other).mod_reduce(modulus)
    }

    /// Modular exponentiation: self^exp mod modulus.
    ///
    /// Odd moduli go through Montgomery arithmetic; even moduli fall
    /// back to plain square-and-multiply.
    pub fn mod_exp(&self, exp: &BigNum, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        if modulus.is_zero() {
            return Err(CryptoError::BnDivisionByZero);
        }
        if modulus.is_odd() && !modulus.is_one() {
            let ctx = MontgomeryCtx::new(modulus)?;
            return ctx.mont_exp(self, exp);
        }

        let mut result = BigNum::one().mod_reduce(modulus)?;
        let mut base = self.mod_reduce(modulus)?;
        for i in 0..exp.bit_len() {
            if exp.get_bit(i) == 1 {
                result = result.mul(&base).mod_reduce(modulus)?;
            }
            base = base.sqr().mod_reduce(modulus)?;
        }
        Ok(result)
    }

    /// Compare magnitudes, ignoring signs.
    pub fn cmp_abs(&self, other: &BigNum) -> std::cmp::Ordering {
        cmp_mag(self.limbs(), other.limbs())
    }
}

fn cmp_mag(a: &[Limb], b: &[Limb]) -> std::cmp::Ordering {
    for i in (0..a.len().max(b.len())).rev() {
        let av = a.get(i).copied().unwrap_or(0);
        let bv = b.get(i).copied().unwrap_or(0);
        if av != bv {
            return av.cmp(&bv);
        }
    }
    std::cmp::Ordering::Equal
}

fn add_mag(a: &[Limb], b: &[Limb]) -> BigNum {
    let max_len = a.len().max(b.len());
    let mut limbs = vec![0u64; max_len + 1];
    let mut carry: Limb = 0;

    for (i, limb) in limbs.iter_mut().take(max_len).enumerate() {
        let av = a.get(i).copied().unwrap_or(0);
        let bv = b.get(i).copied().unwrap_or(0);
        let sum = av as DoubleLimb + bv as DoubleLimb + carry as DoubleLimb;
        *limb = sum as Limb;
        carry = (sum >> LIMB_BITS) as Limb;
    }
    limbs[max_len] = carry;
    BigNum::from_limbs(limbs)
}

/// a - b on magnitudes; the result carries the sign of the true
/// difference.
fn sub_mag(a: &[Limb], b: &[Limb]) -> BigNum {
    let (larger, smaller, negative) = match cmp_mag(a, b) {
        std::cmp::Ordering::Less => (b, a, true),
        std::cmp::Ordering::Equal => return BigNum::zero(),
        std::cmp::Ordering::Greater => (a, b, false),
    };

    let mut limbs = vec![0u64; larger.len()];
    let mut borrow: Limb = 0;
    for (i, limb) in limbs.iter_mut().enumerate() {
        let sv = smaller.get(i).copied().unwrap_or(0);
        let (d1, b1) = larger[i].overflowing_sub(sv);
        let (d2, b2) = d1.overflowing_sub(borrow);
        *limb = d2;
        borrow = (b1 as Limb) + (b2 as Limb);
    }

    let mut bn = BigNum::from_limbs(limbs);
    bn.set_negative(negative);
    bn
}

fn mul_mag(a: &[Limb], b: &[Limb]) -> BigNum {
    if a.iter().all(|&l| l == 0) || b.iter().all(|&l| l == 0) {
        return BigNum::zero();
    }

    let mut limbs = vec![0u64; a.len() + b.len()];
    for i in 0..a.len() {
        let mut carry: Limb = 0;
        for j in 0..b.len() {
            let prod = a[i] as DoubleLimb * b[j] as DoubleLimb
                + limbs[i + j] as DoubleLimb
                + carry as DoubleLimb;
            limbs[i + j] = prod as Limb;
            carry = (prod >> LIMB_BITS) as Limb;
        }
        limbs[i + b.len()] = carry;
    }
    BigNum::from_limbs(limbs)
}

/// Magnitude division dispatch: short division for single-limb
/// divisors, Knuth's Algorithm D otherwise.
fn div_rem_mag(u: &[Limb], v: &[Limb]) -> (BigNum, BigNum) {
    if cmp_mag(u, v) == std::cmp::Ordering::Less {
        return (BigNum::zero(), BigNum::from_limbs(u.to_vec()));
    }

    let mut v_norm = v.to_vec();
    while v_norm.len() > 1 && v_norm[v_norm.len() - 1] == 0 {
        v_norm.pop();
    }
    let mut u_norm = u.to_vec();
    while u_norm.len() > 1 && u_norm[u_norm.len() - 1] == 0 {
        u_norm.pop();
    }

    if v_norm.len() == 1 {
        let (q, r) = div_rem_single(&u_norm, v_norm[0]);
        return (BigNum::from_limbs(q), BigNum::from_u64(r));
    }
    div_rem_knuth(&u_norm, &v_norm)
}

fn div_rem_single(u: &[Limb], v: Limb) -> (Vec<Limb>, Limb) {
    let mut q = vec![0u64; u.len()];
    let mut rem: DoubleLimb = 0;
    for i in (0..u.len()).rev() {
        let cur = (rem << LIMB_BITS) | u[i] as DoubleLimb;
        q[i] = (cur / v as DoubleLimb) as Limb;
        rem = cur % v as DoubleLimb;
    }
    (q, rem as Limb)
}

/// Knuth's Algorithm D (TAOCP vol. 2, 4.3.1), for divisors of at least
/// two limbs. Requires |u| >= |v| and a normalized v.
fn div_rem_knuth(u: &[Limb], v: &[Limb]) -> (BigNum, BigNum) {
    const BASE: DoubleLimb = 1 << LIMB_BITS;

    let n = v.len();
    let m = u.len() - n;

    // D1: normalize so the divisor's top limb has its high bit set.
    let s = v[n - 1].leading_zeros() as usize;
    let mut vn = vec![0u64; n];
    let mut un = vec![0u64; u.len() + 1];
    if s == 0 {
        vn.copy_from_slice(v);
        un[..u.len()].copy_from_slice(u);
    } else {
        for i in (1..n).rev() {
            vn[i] = (v[i] << s) | (v[i - 1] >> (LIMB_BITS - s));
        }
        vn[0] = v[0] << s;
        un[u.len()] = u[u.len() - 1] >> (LIMB_BITS - s);
        for i in (1..u.len()).rev() {
            un[i] = (u[i] << s) | (u[i - 1] >> (LIMB_BITS - s));
        }
        un[0] = u[0] << s;
    }

    let mut q = vec![0u64; m + 1];

    // D2..D7: one quotient limb per iteration, most significant first.
    for j in (0..=m).rev() {
        // D3: trial quotient from the top two limbs against v's top limb.
        let num = ((un[j + n] as DoubleLimb) << LIMB_BITS) | un[j + n - 1] as DoubleLimb;
        let mut qhat = num / vn[n - 1] as DoubleLimb;
        let mut rhat = num % vn[n - 1] as DoubleLimb;

        // Correct qhat: it can be at most two too large.
        while qhat >= BASE
            || qhat * vn[n - 2] as DoubleLimb
                > ((rhat << LIMB_BITS) | un[j + n - 2] as DoubleLimb)
        {
            qhat -= 1;
            rhat += vn[n - 1] as DoubleLimb;
            if rhat >= BASE {
                break;
            }
        }

        // D4: multiply and subtract qhat * v from u[j..=j+n].
        let mut prod_carry: DoubleLimb = 0;
        let mut borrow: Limb = 0;
        for i in 0..n {
            let p = qhat * vn[i] as DoubleLimb + prod_carry;
            prod_carry = p >> LIMB_BITS;
            let (d1, b1) = un[j + i].overflowing_sub(p as Limb);
            let (d2, b2) = d1.overflowing_sub(borrow);
            un[j + i] = d2;
            borrow = (b1 as Limb) + (b2 as Limb);
        }
        let (d1, b1) = un[j + n].overflowing_sub(prod_carry as Limb);
        let (d2, b2) = d1.overflowing_sub(borrow);
        un[j + n] = d2;

        // D5/D6: the rare overshoot case; add the divisor back.
        if b1 || b2 {
            qhat -= 1;
            let mut carry: Limb = 0;
            for i in 0..n {
                let sum = un[j + i] as DoubleLimb + vn[i] as DoubleLimb + carry as DoubleLimb;
                un[j + i] = sum as Limb;
                carry = (sum >> LIMB_BITS) as Limb;
            }
            un[j + n] = un[j + n].wrapping_add(carry);
        }

        q[j] = qhat as Limb;
    }

    // D8: denormalize the remainder out of un[0..n].
    let mut r = vec![0u64; n];
    if s == 0 {
        r.copy_from_slice(&un[..n]);
    } else {
        for i in 0..n - 1 {
            r[i] = (un[i] >> s) | (un[i + 1] << (LIMB_BITS - s));
        }
        r[n - 1] = un[n - 1] >> s;
    }

    (BigNum::from_limbs(q), BigNum::from_limbs(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bn(hex: &str) -> BigNum {
        BigNum::from_hex(hex).unwrap()
    }

    #[test]
    fn add_sub_inverse() {
        let a = bn("123456789abcdef0123456789abcdef0");
        let b = bn("fedcba9876543210");
        assert_eq!(a.sub(&b).add(&b), a);
        assert_eq!(b.sub(&a).add(&a), b);
    }

    #[test]
    fn add_with_carry_chain() {
        let a = BigNum::from_limbs(vec![u64::MAX, u64::MAX]);
        let one = BigNum::one();
        let sum = a.add(&one);
        assert_eq!(sum.limbs(), &[0, 0, 1]);
    }

    #[test]
    fn signed_addition() {
        let mut neg_three = BigNum::from_u64(3);
        neg_three.set_negative(true);
        let five = BigNum::from_u64(5);
        assert_eq!(five.add(&neg_three), BigNum::from_u64(2));
        let r = neg_three.add(&neg_three);
        assert!(r.is_negative());
        assert_eq!(r.cmp_abs(&BigNum::from_u64(6)), std::cmp::Ordering::Equal);
    }

    #[test]
    fn mul_matches_u64() {
        let a = BigNum::from_u64(0xdead_beef);
        let b = BigNum::from_u64(0xcafe_babe);
        assert_eq!(a.mul(&b), BigNum::from_u64(0xdead_beef * 0xcafe_babe));
    }

    #[test]
    fn mul_sign_rules() {
        let mut a = BigNum::from_u64(6);
        a.set_negative(true);
        let b = BigNum::from_u64(7);
        assert!(a.mul(&b).is_negative());
        assert!(!a.mul(&a).is_negative());
    }

    #[test]
    fn sqr_matches_mul() {
        let a = bn("fedcba9876543210fedcba9876543210");
        assert_eq!(a.sqr(), a.mul(&a));
    }

    #[test]
    fn shift_roundtrip() {
        let a = bn("123456789abcdef0fedcba9876543210");
        for bits in [1usize, 13, 63, 64, 65, 128, 200] {
            assert_eq!(a.shl(bits).shr(bits), a, "shift by {bits}");
        }
    }

    #[test]
    fn shr_discards_low_bits() {
        let a = BigNum::from_u64(0b1011);
        assert_eq!(a.shr(2), BigNum::from_u64(0b10));
        assert_eq!(a.shr(64), BigNum::zero());
    }

    #[test]
    fn div_rem_small() {
        let a = BigNum::from_u64(100);
        let b = BigNum::from_u64(7);
        let (q, r) = a.div_rem(&b).unwrap();
        assert_eq!(q, BigNum::from_u64(14));
        assert_eq!(r, BigNum::from_u64(2));
    }

    #[test]
    fn div_by_zero_rejected() {
        assert!(BigNum::from_u64(100).div_rem(&BigNum::zero()).is_err());
        assert!(BigNum::from_u64(100).mod_exp(&BigNum::one(), &BigNum::zero()).is_err());
    }

    #[test]
    fn div_rem_reconstructs_dividend() {
        let a = bn("1f2e3d4c5b6a79880123456789abcdef0123456789abcdef");
        let b = bn("fedcba98765432100123");
        let (q, r) = a.div_rem(&b).unwrap();
        assert_eq!(b.mul(&q).add(&r), a);
        assert_eq!(r.cmp_abs(&b), std::cmp::Ordering::Less);
    }

    #[test]
    fn div_rem_sign_convention() {
        // Truncated division over all four sign combinations.
        let mk = |v: u64, neg: bool| {
            let mut n = BigNum::from_u64(v);
            n.set_negative(neg);
            n
        };
        for (a_neg, b_neg) in [(false, false), (true, false), (false, true), (true, true)] {
            let a = mk(100, a_neg);
            let b = mk(7, b_neg);
            let (q, r) = a.div_rem(&b).unwrap();
            assert_eq!(b.mul(&q).add(&r), a, "a_neg={a_neg} b_neg={b_neg}");
            assert_eq!(r.cmp_abs(&b), std::cmp::Ordering::Less);
            assert!(r.is_zero() || r.is_negative() == a.is_negative());
        }
    }

    #[test]
    fn knuth_adversarial_inputs() {
        // Limb patterns that stress the trial-quotient correction and
        // add-back paths.
        let cases: &[(Vec<u64>, Vec<u64>)] = &[
            (vec![3, 0, 1 << 63], vec![1, 0, 1 << 63]),
            (vec![0, u64::MAX - 1, u64::MAX], vec![u64::MAX, u64::MAX]),
            (vec![0, 0, 1 << 63], vec![1, 1 << 63]),
            (vec![u64::MAX, u64::MAX, u64::MAX, u64::MAX], vec![1, u64::MAX]),
            (vec![0, 0, 0, 1], vec![u64::MAX, u64::MAX, 1]),
        ];
        for (ul, vl) in cases {
            let u = BigNum::from_limbs(ul.clone());
            let v = BigNum::from_limbs(vl.clone());
            let (q, r) = u.div_rem(&v).unwrap();
            assert_eq!(v.mul(&q).add(&r), u, "u={u:?} v={v:?}");
            assert_eq!(r.cmp_abs(&v), std::cmp::Ordering::Less);
        }
    }

    #[test]
    fn knuth_trial_quotient_correction() {
        // Top limbs equal: q-hat starts at base-1 overshoot territory.
        let u = BigNum::from_limbs(vec![u64::MAX, u64::MAX, u64::MAX - 1]);
        let v = BigNum::from_limbs(vec![u64::MAX, u64::MAX]);
        let (q, r) = u.div_rem(&v).unwrap();
        assert_eq!(v.mul(&q).add(&r), u);
        assert_eq!(r.cmp_abs(&v), std::cmp::Ordering::Less);
    }

    #[test]
    fn div_smaller_than_divisor() {
        let a = BigNum::from_u64(5);
        let b = bn("100000000000000000");
        let (q, r) = a.div_rem(&b).unwrap();
        assert!(q.is_zero());
        assert_eq!(r, a);
    }

    #[test]
    fn mod_reduce_canonical() {
        let mut a = BigNum::from_u64(5);
        a.set_negative(true);
        let m = BigNum::from_u64(7);
        // -5 mod 7 = 2
        assert_eq!(a.mod_reduce(&m).unwrap(), BigNum::from_u64(2));
    }

    #[test]
    fn mod_exp_even_modulus() {
        // 3^5 = 243, 243 mod 16 = 3
        let r = BigNum::from_u64(3)
            .mod_exp(&BigNum::from_u64(5), &BigNum::from_u64(16))
            .unwrap();
        assert_eq!(r, BigNum::from_u64(3));
    }

    #[test]
    fn mod_exp_large_prime() {
        // Fermat over a 9-digit prime.
        let p = BigNum::from_u64(1_000_000_007);
        let a = BigNum::from_u64(123_456_789);
        let e = BigNum::from_u64(1_000_000_006);
        assert_eq!(a.mod_exp(&e, &p).unwrap(), BigNum::one());
    }
}
