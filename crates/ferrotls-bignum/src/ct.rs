//! Constant-time helpers over limb arrays.

use crate::bignum::BigNum;
use subtle::Choice;

impl BigNum {
    /// Returns `a` when choice is 0, `b` when choice is 1, selected
    /// limb-wise by masking.
    pub fn ct_select(a: &BigNum, b: &BigNum, choice: Choice) -> BigNum {
        let mask = (choice.unwrap_u8() as u64).wrapping_neg();
        let max_len = a.limbs().len().max(b.limbs().len());
        let mut limbs = vec![0u64; max_len];

        for (i, limb) in limbs.iter_mut().enumerate() {
            let av = a.limbs().get(i).copied().unwrap_or(0);
            let bv = b.limbs().get(i).copied().unwrap_or(0);
            *limb = av ^ (mask & (av ^ bv));
        }

        let neg_a = a.is_negative() as u64;
        let neg_b = b.is_negative() as u64;
        let neg = neg_a ^ (mask & (neg_a ^ neg_b));

        let mut result = BigNum::from_limbs(limbs);
        result.set_negative(neg != 0);
        result
    }

    /// self - modulus when self >= modulus, else self, with the
    /// comparison folded into the borrow chain. This is the final
    /// subtraction of the Montgomery reduction.
    pub fn ct_sub_if_gte(&self, modulus: &BigNum) -> BigNum {
        let max_len = self.limbs().len().max(modulus.limbs().len());

        let mut diff = vec![0u64; max_len];
        let mut borrow: u64 = 0;
        for (i, d) in diff.iter_mut().enumerate() {
            let a = self.limbs().get(i).copied().unwrap_or(0);
            let b = modulus.limbs().get(i).copied().unwrap_or(0);
            let (d1, b1) = a.overflowing_sub(b);
            let (d2, b2) = d1.overflowing_sub(borrow);
            *d = d2;
            borrow = (b1 as u64) + (b2 as u64);
        }

        let use_diff = Choice::from((borrow == 0) as u8);
        BigNum::ct_select(self, &BigNum::from_limbs(diff), use_diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ct_select_both_ways() {
        let a = BigNum::from_u64(10);
        let b = BigNum::from_hex("ffffffffffffffffffff").unwrap();
        assert_eq!(BigNum::ct_select(&a, &b, Choice::from(0)), a);
        assert_eq!(BigNum::ct_select(&a, &b, Choice::from(1)), b);
    }

    #[test]
    fn ct_sub_if_gte_boundaries() {
        let m = BigNum::from_u64(97);
        assert_eq!(BigNum::from_u64(100).ct_sub_if_gte(&m), BigNum::from_u64(3));
        assert_eq!(BigNum::from_u64(50).ct_sub_if_gte(&m), BigNum::from_u64(50));
        assert_eq!(BigNum::from_u64(97).ct_sub_if_gte(&m), BigNum::zero());
    }

    #[test]
    fn ct_sub_if_gte_multi_limb() {
        // Wider value than modulus, forcing the padded-limb borrow path.
        let m = BigNum::from_hex("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff")
            .unwrap();
        let wide = m.shl(1);
        assert_eq!(wide.ct_sub_if_gte(&m), m);
        let below = m.sub(&BigNum::one());
        assert_eq!(below.ct_sub_if_gte(&m), below);
    }
}
