//! Point arithmetic in Jacobian projective coordinates.
//!
//! A Jacobian triple (X, Y, Z) stands for the affine point (X/Z^2, Y/Z^3);
//! Z = 0 encodes the point at infinity. All coordinates live in GF(p).

use ferrotls_bignum::BigNum;
use ferrotls_types::CryptoError;

use super::curves::CurveParams;

#[derive(Clone)]
pub(crate) struct JacobianPoint {
    pub x: BigNum,
    pub y: BigNum,
    pub z: BigNum,
}

impl JacobianPoint {
    pub fn infinity() -> Self {
        JacobianPoint {
            x: BigNum::one(),
            y: BigNum::one(),
            z: BigNum::zero(),
        }
    }

    pub fn from_affine(x: &BigNum, y: &BigNum) -> Self {
        JacobianPoint {
            x: x.clone(),
            y: y.clone(),
            z: BigNum::one(),
        }
    }

    pub fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }

    /// Recover affine coordinates, or `None` at infinity.
    pub fn to_affine(&self, p: &BigNum) -> Result<Option<(BigNum, BigNum)>, CryptoError> {
        if self.is_infinity() {
            return Ok(None);
        }
        let zi = self.z.mod_inv(p)?;
        let zi2 = zi.mod_mul(&zi, p)?;
        let x = self.x.mod_mul(&zi2, p)?;
        let y = self.y.mod_mul(&zi2, p)?.mod_mul(&zi, p)?;
        Ok(Some((x, y)))
    }

    /// Point addition.
    pub fn add(&self, other: &JacobianPoint, params: &CurveParams) -> Result<Self, CryptoError> {
        if self.is_infinity() {
            return Ok(other.clone());
        }
        if other.is_infinity() {
            return Ok(self.clone());
        }
        let p = &params.p;

        // U1 = X1*Z2^2, U2 = X2*Z1^2, S1 = Y1*Z2^3, S2 = Y2*Z1^3
        let z1sq = self.z.mod_mul(&self.z, p)?;
        let z2sq = other.z.mod_mul(&other.z, p)?;
        let u1 = self.x.mod_mul(&z2sq, p)?;
        let u2 = other.x.mod_mul(&z1sq, p)?;
        let s1 = self.y.mod_mul(&z2sq.mod_mul(&other.z, p)?, p)?;
        let s2 = other.y.mod_mul(&z1sq.mod_mul(&self.z, p)?, p)?;

        let h = u2.mod_sub(&u1, p)?;
        let r = s2.mod_sub(&s1, p)?;

        if h.is_zero() {
            // Same x: either the doubling case or P + (-P) = O.
            if r.is_zero() {
                return self.double(params);
            }
            return Ok(JacobianPoint::infinity());
        }

        let h2 = h.mod_mul(&h, p)?;
        let h3 = h2.mod_mul(&h, p)?;
        let u1h2 = u1.mod_mul(&h2, p)?;

        // X3 = r^2 - H^3 - 2*U1*H^2
        let x3 = r
            .mod_mul(&r, p)?
            .mod_sub(&h3, p)?
            .mod_sub(&u1h2, p)?
            .mod_sub(&u1h2, p)?;

        // Y3 = r*(U1*H^2 - X3) - S1*H^3
        let y3 = r
            .mod_mul(&u1h2.mod_sub(&x3, p)?, p)?
            .mod_sub(&s1.mod_mul(&h3, p)?, p)?;

        // Z3 = H*Z1*Z2
        let z3 = h.mod_mul(&self.z, p)?.mod_mul(&other.z, p)?;

        Ok(JacobianPoint {
            x: x3,
            y: y3,
            z: z3,
        })
    }

    /// Point doubling. Curves with a = p - 3 take the factored slope
    /// M = 3*(X+Z^2)*(X-Z^2); others use the generic M = 3*X^2 + a*Z^4.
    pub fn double(&self, params: &CurveParams) -> Result<Self, CryptoError> {
        if self.is_infinity() || self.y.is_zero() {
            return Ok(JacobianPoint::infinity());
        }
        let p = &params.p;
        let two = BigNum::from_u64(2);
        let three = BigNum::from_u64(3);

        // S = 4*X*Y^2
        let ysq = self.y.mod_mul(&self.y, p)?;
        let s = self
            .x
            .mod_mul(&ysq, p)?
            .mod_mul(&BigNum::from_u64(4), p)?;

        let zsq = self.z.mod_mul(&self.z, p)?;
        let m = if params.a_is_minus_three {
            self.x
                .mod_add(&zsq, p)?
                .mod_mul(&self.x.mod_sub(&zsq, p)?, p)?
                .mod_mul(&three, p)?
        } else {
            let z4 = zsq.mod_mul(&zsq, p)?;
            self.x
                .mod_mul(&self.x, p)?
                .mod_mul(&three, p)?
                .mod_add(&params.a.mod_mul(&z4, p)?, p)?
        };

        // X3 = M^2 - 2*S
        let x3 = m.mod_mul(&m, p)?.mod_sub(&s, p)?.mod_sub(&s, p)?;

        // Y3 = M*(S - X3) - 8*Y^4
        let y4x8 = ysq.mod_mul(&ysq, p)?.mod_mul(&BigNum::from_u64(8), p)?;
        let y3 = m.mod_mul(&s.mod_sub(&x3, p)?, p)?.mod_sub(&y4x8, p)?;

        // Z3 = 2*Y*Z
        let z3 = self.y.mod_mul(&self.z, p)?.mod_mul(&two, p)?;

        Ok(JacobianPoint {
            x: x3,
            y: y3,
            z: z3,
        })
    }
}

/// k * P by left-to-right double-and-add.
pub(crate) fn scalar_mul(
    k: &BigNum,
    point: &JacobianPoint,
    params: &CurveParams,
) -> Result<JacobianPoint, CryptoError> {
    if k.is_zero() || point.is_infinity() {
        return Ok(JacobianPoint::infinity());
    }

    let mut acc = JacobianPoint::infinity();
    for i in (0..k.bit_len()).rev() {
        acc = acc.double(params)?;
        if k.get_bit(i) == 1 {
            acc = acc.add(point, params)?;
        }
    }
    Ok(acc)
}

/// k1 * A + k2 * B with interleaved doubling (Shamir's trick).
pub(crate) fn scalar_mul_add(
    k1: &BigNum,
    a: &JacobianPoint,
    k2: &BigNum,
    b: &JacobianPoint,
    params: &CurveParams,
) -> Result<JacobianPoint, CryptoError> {
    if k1.is_zero() {
        return scalar_mul(k2, b, params);
    }
    if k2.is_zero() {
        return scalar_mul(k1, a, params);
    }

    let sum = a.add(b, params)?;
    let bits = k1.bit_len().max(k2.bit_len());

    let mut acc = JacobianPoint::infinity();
    for i in (0..bits).rev() {
        acc = acc.double(params)?;
        acc = match (k1.get_bit(i), k2.get_bit(i)) {
            (1, 1) => acc.add(&sum, params)?,
            (1, 0) => acc.add(a, params)?,
            (0, 1) => acc.add(b, params)?,
            _ => acc,
        };
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::curves::curve_params;
    use ferrotls_types::EccCurveId;

    fn p256() -> (CurveParams, JacobianPoint) {
        let params = curve_params(EccCurveId::NistP256).unwrap();
        let g = JacobianPoint::from_affine(&params.gx, &params.gy);
        (params, g)
    }

    #[test]
    fn affine_roundtrip() {
        let (params, g) = p256();
        let (x, y) = g.to_affine(&params.p).unwrap().unwrap();
        assert_eq!(x, params.gx);
        assert_eq!(y, params.gy);
        assert!(JacobianPoint::infinity()
            .to_affine(&params.p)
            .unwrap()
            .is_none());
    }

    #[test]
    fn identity_laws() {
        let (params, g) = p256();
        let inf = JacobianPoint::infinity();
        for r in [g.add(&inf, &params).unwrap(), inf.add(&g, &params).unwrap()] {
            let (x, y) = r.to_affine(&params.p).unwrap().unwrap();
            assert_eq!(x, params.gx);
            assert_eq!(y, params.gy);
        }
    }

    #[test]
    fn adding_negation_gives_infinity() {
        let (params, g) = p256();
        let neg_y = params.p.sub(&params.gy);
        let neg_g = JacobianPoint::from_affine(&params.gx, &neg_y);
        assert!(g.add(&neg_g, &params).unwrap().is_infinity());
    }

    #[test]
    fn double_agrees_with_self_add() {
        let (params, g) = p256();
        let via_double = g.double(&params).unwrap();
        let via_add = g.add(&g, &params).unwrap();
        assert_eq!(
            via_double.to_affine(&params.p).unwrap().unwrap(),
            via_add.to_affine(&params.p).unwrap().unwrap()
        );
    }

    #[test]
    fn double_of_2g_known_value() {
        // 2G on P-256, affine coordinates from the NIST reference values.
        let (params, g) = p256();
        let two_g = g.double(&params).unwrap();
        let (x, y) = two_g.to_affine(&params.p).unwrap().unwrap();
        assert_eq!(
            x,
            BigNum::from_hex(
                "7CF27B188D034F7E8A52380304B51AC3C08969E277F21B35A60B48FC47669978"
            )
            .unwrap()
        );
        assert_eq!(
            y,
            BigNum::from_hex(
                "07775510DB8ED040293D9AC69F7430DBBA7DADE63CE982299E04B79D227873D1"
            )
            .unwrap()
        );
    }

    #[test]
    fn scalar_mul_edge_scalars() {
        let (params, g) = p256();
        assert!(scalar_mul(&BigNum::zero(), &g, &params)
            .unwrap()
            .is_infinity());
        // n * G = O
        assert!(scalar_mul(&params.n, &g, &params).unwrap().is_infinity());
        let (x, _) = scalar_mul(&BigNum::one(), &g, &params)
            .unwrap()
            .to_affine(&params.p)
            .unwrap()
            .unwrap();
        assert_eq!(x, params.gx);
    }

    #[test]
    fn shamir_matches_separate_muls() {
        let (params, g) = p256();
        let q = g.double(&params).unwrap();
        let k1 = BigNum::from_u64(0x1234_5678);
        let k2 = BigNum::from_u64(0x9ABC_DEF0);

        let combined = scalar_mul_add(&k1, &g, &k2, &q, &params).unwrap();
        let lhs = scalar_mul(&k1, &g, &params).unwrap();
        let rhs = scalar_mul(&k2, &q, &params).unwrap();
        let separate = lhs.add(&rhs, &params).unwrap();

        assert_eq!(
            combined.to_affine(&params.p).unwrap().unwrap(),
            separate.to_affine(&params.p).unwrap().unwrap()
        );
    }
}
