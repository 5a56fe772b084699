//! Elliptic curve groups and points over prime fields.
//!
//! `EcGroup` bundles the domain parameters of a named NIST curve, or of a
//! caller-supplied explicit curve, and exposes the scalar multiplications
//! that ECDSA and ECDH need. `EcPoint` is an affine point with the SEC 1
//! uncompressed wire encoding (0x04 || x || y).

use ferrotls_bignum::BigNum;
use ferrotls_types::{CryptoError, EccCurveId};

mod curves;
mod point;

use curves::CurveParams;
use point::JacobianPoint;

/// An elliptic curve group, either a named NIST curve or one built from
/// explicit domain parameters.
#[derive(Clone)]
pub struct EcGroup {
    curve_id: Option<EccCurveId>,
    params: CurveParams,
}

impl EcGroup {
    pub fn new(curve_id: EccCurveId) -> Result<Self, CryptoError> {
        let params = curves::curve_params(curve_id)?;
        Ok(EcGroup {
            curve_id: Some(curve_id),
            params,
        })
    }

    /// Build a group from explicit short Weierstrass parameters
    /// y^2 = x^3 + ax + b over GF(p) with generator G of order n.
    ///
    /// Rejects even or tiny moduli, coefficients and coordinates outside
    /// [0, p), singular curves (4a^3 + 27b^2 = 0), generators off the
    /// curve, and an order under which n*G is not the identity. Only the
    /// prime-order subgroup is ever used, so the cofactor is not taken.
    pub fn from_params(
        p: &BigNum,
        a: &BigNum,
        b: &BigNum,
        gx: &BigNum,
        gy: &BigNum,
        n: &BigNum,
    ) -> Result<Self, CryptoError> {
        if p.is_even() || *p <= BigNum::from_u64(3) {
            return Err(CryptoError::EccInvalidCurveParams);
        }
        for value in [a, b, gx, gy] {
            if value.is_negative() || value >= p {
                return Err(CryptoError::EccInvalidCurveParams);
            }
        }
        if n.is_zero() || n.is_one() {
            return Err(CryptoError::EccInvalidCurveParams);
        }

        // 4a^3 + 27b^2 != 0 mod p, otherwise the curve is singular.
        let a3 = a.mod_mul(a, p)?.mod_mul(a, p)?;
        let b2 = b.mod_mul(b, p)?;
        let discriminant = a3
            .mod_mul(&BigNum::from_u64(4), p)?
            .mod_add(&b2.mod_mul(&BigNum::from_u64(27), p)?, p)?;
        if discriminant.is_zero() {
            return Err(CryptoError::EccInvalidCurveParams);
        }

        let field_size = (p.bit_len() + 7) / 8;
        let a_is_minus_three = p.sub(a) == BigNum::from_u64(3);
        let group = EcGroup {
            curve_id: None,
            params: CurveParams {
                p: p.clone(),
                a: a.clone(),
                b: b.clone(),
                gx: gx.clone(),
                gy: gy.clone(),
                n: n.clone(),
                field_size,
                a_is_minus_three,
            },
        };

        if !group.is_on_curve(gx, gy)? {
            return Err(CryptoError::EccInvalidCurveParams);
        }
        let g = JacobianPoint::from_affine(gx, gy);
        if !point::scalar_mul(n, &g, &group.params)?.is_infinity() {
            return Err(CryptoError::EccInvalidCurveParams);
        }
        Ok(group)
    }

    /// The curve identifier, or `None` for an explicit-parameter group.
    pub fn curve_id(&self) -> Option<EccCurveId> {
        self.curve_id
    }

    /// Order n of the generator.
    pub fn order(&self) -> &BigNum {
        &self.params.n
    }

    /// Field element length in bytes.
    pub fn field_size(&self) -> usize {
        self.params.field_size
    }

    /// k * G.
    pub fn scalar_mul_base(&self, k: &BigNum) -> Result<EcPoint, CryptoError> {
        let g = JacobianPoint::from_affine(&self.params.gx, &self.params.gy);
        self.to_point(point::scalar_mul(k, &g, &self.params)?)
    }

    /// k * Q for an arbitrary point Q.
    pub fn scalar_mul(&self, k: &BigNum, q: &EcPoint) -> Result<EcPoint, CryptoError> {
        self.to_point(point::scalar_mul(k, &q.to_jacobian(), &self.params)?)
    }

    /// u1 * G + u2 * Q, the combined multiplication ECDSA verification uses.
    pub fn scalar_mul_add(
        &self,
        u1: &BigNum,
        u2: &BigNum,
        q: &EcPoint,
    ) -> Result<EcPoint, CryptoError> {
        let g = JacobianPoint::from_affine(&self.params.gx, &self.params.gy);
        self.to_point(point::scalar_mul_add(
            u1,
            &g,
            u2,
            &q.to_jacobian(),
            &self.params,
        )?)
    }

    fn to_point(&self, j: JacobianPoint) -> Result<EcPoint, CryptoError> {
        match j.to_affine(&self.params.p)? {
            Some((x, y)) => Ok(EcPoint {
                x,
                y,
                infinity: false,
            }),
            None => Ok(EcPoint::infinity()),
        }
    }

    /// Check y^2 = x^3 + ax + b mod p.
    fn is_on_curve(&self, x: &BigNum, y: &BigNum) -> Result<bool, CryptoError> {
        let p = &self.params.p;
        let lhs = y.mod_mul(y, p)?;
        let rhs = x
            .mod_mul(x, p)?
            .mod_add(&self.params.a, p)?
            .mod_mul(x, p)?
            .mod_add(&self.params.b, p)?;
        Ok(lhs == rhs)
    }
}

/// An affine point on an elliptic curve.
#[derive(Clone)]
pub struct EcPoint {
    x: BigNum,
    y: BigNum,
    infinity: bool,
}

impl EcPoint {
    pub fn infinity() -> Self {
        EcPoint {
            x: BigNum::zero(),
            y: BigNum::zero(),
            infinity: true,
        }
    }

    pub fn is_infinity(&self) -> bool {
        self.infinity
    }

    /// Affine x-coordinate.
    pub fn x(&self) -> &BigNum {
        &self.x
    }

    /// Affine y-coordinate.
    pub fn y(&self) -> &BigNum {
        &self.y
    }

    /// Parse a SEC 1 uncompressed point and validate it against the group.
    ///
    /// Rejects wrong lengths, the compressed forms, coordinates outside
    /// [0, p) and points that do not satisfy the curve equation.
    pub fn from_uncompressed(group: &EcGroup, data: &[u8]) -> Result<Self, CryptoError> {
        let fs = group.field_size();
        if data.len() != 1 + 2 * fs || data[0] != 0x04 {
            return Err(CryptoError::EccInvalidPublicKey);
        }

        let x = BigNum::from_bytes_be(&data[1..1 + fs]);
        let y = BigNum::from_bytes_be(&data[1 + fs..]);
        if x >= group.params.p || y >= group.params.p {
            return Err(CryptoError::EccInvalidPublicKey);
        }
        if !group.is_on_curve(&x, &y)? {
            return Err(CryptoError::EccPointNotOnCurve);
        }

        Ok(EcPoint {
            x,
            y,
            infinity: false,
        })
    }

    /// Encode as 0x04 || x || y with both coordinates zero-padded to the
    /// field size.
    pub fn to_uncompressed(&self, group: &EcGroup) -> Result<Vec<u8>, CryptoError> {
        if self.infinity {
            return Err(CryptoError::EccPointAtInfinity);
        }
        let fs = group.field_size();
        let mut out = Vec::with_capacity(1 + 2 * fs);
        out.push(0x04);
        out.extend_from_slice(&self.x.to_bytes_be_padded(fs)?);
        out.extend_from_slice(&self.y.to_bytes_be_padded(fs)?);
        Ok(out)
    }

    fn to_jacobian(&self) -> JacobianPoint {
        if self.infinity {
            JacobianPoint::infinity()
        } else {
            JacobianPoint::from_affine(&self.x, &self.y)
        }
    }
}
