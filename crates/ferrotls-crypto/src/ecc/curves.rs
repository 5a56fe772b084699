//! Domain parameters for the NIST prime curves.
//!
//! All three supported curves (P-256, P-384, P-521) are short Weierstrass
//! curves y^2 = x^3 + ax + b over GF(p) with a = p - 3 and cofactor 1.

use ferrotls_bignum::BigNum;
use ferrotls_types::{CryptoError, EccCurveId};

/// Parameters of a short Weierstrass curve over a prime field.
#[derive(Clone)]
pub(crate) struct CurveParams {
    /// Field modulus p.
    pub p: BigNum,
    /// Coefficient a (always p - 3 here).
    pub a: BigNum,
    /// Coefficient b.
    pub b: BigNum,
    /// Generator x-coordinate.
    pub gx: BigNum,
    /// Generator y-coordinate.
    pub gy: BigNum,
    /// Order of the generator.
    pub n: BigNum,
    /// Field element length in bytes.
    pub field_size: usize,
    /// Whether a = p - 3, enabling the faster doubling formula.
    pub a_is_minus_three: bool,
}

/// Load the parameters of a named curve.
pub(crate) fn curve_params(curve_id: EccCurveId) -> Result<CurveParams, CryptoError> {
    let (p, a, b, gx, gy, n, field_size) = match curve_id {
        // SEC 2 v2 section 2.4.2
        EccCurveId::NistP256 => (
            "FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFF",
            "FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFC",
            "5AC635D8AA3A93E7B3EBBD55769886BC651D06B0CC53B0F63BCE3C3E27D2604B",
            "6B17D1F2E12C4247F8BCE6E563A440F277037D812DEB33A0F4A13945D898C296",
            "4FE342E2FE1A7F9B8EE7EB4A7C0F9E162BCE33576B315ECECBB6406837BF51F5",
            "FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551",
            32,
        ),
        // SEC 2 v2 section 2.5.1
        EccCurveId::NistP384 => (
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE\
             FFFFFFFF0000000000000000FFFFFFFF",
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE\
             FFFFFFFF0000000000000000FFFFFFFC",
            "B3312FA7E23EE7E4988E056BE3F82D19181D9C6EFE8141120314088F5013875A\
             C656398D8A2ED19D2A85C8EDD3EC2AEF",
            "AA87CA22BE8B05378EB1C71EF320AD746E1D3B628BA79B9859F741E082542A38\
             5502F25DBF55296C3A545E3872760AB7",
            "3617DE4A96262C6F5D9E98BF9292DC29F8F41DBD289A147CE9DA3113B5F0B8C0\
             0A60B1CE1D7E819D7A431D7C90EA0E5F",
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFC7634D81F4372DDF\
             581A0DB248B0A77AECEC196ACCC52973",
            48,
        ),
        // SEC 2 v2 section 2.6.1
        EccCurveId::NistP521 => (
            "01FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
             FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
             FFFF",
            "01FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
             FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
             FFFC",
            "0051953EB9618E1C9A1F929A21A0B68540EEA2DA725B99B315F3B8B489918EF1\
             09E156193951EC7E937B1652C0BD3BB1BF073573DF883D2C34F1EF451FD46B50\
             3F00",
            "00C6858E06B70404E9CD9E3ECB662395B4429C648139053FB521F828AF606B4D\
             3DBAA14B5E77EFE75928FE1DC127A2FFA8DE3348B3C1856A429BF97E7E31C2E5\
             BD66",
            "011839296A789A3BC0045C8A5FB42C7D1BD998F54449579B446817AFBD17273E\
             662C97EE72995EF42640C550B9013FAD0761353C7086A272C24088BE94769FD1\
             6650",
            "01FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
             FFFFFA51868783BF2F966B7FCC0148F709A5D03BB5C9B8899C47AEBB6FB71E91\
             386409",
            66,
        ),
    };

    let p = BigNum::from_hex(p)?;
    let a = BigNum::from_hex(a)?;
    let a_is_minus_three = p.sub(&a) == BigNum::from_u64(3);
    Ok(CurveParams {
        p,
        a,
        b: BigNum::from_hex(b)?,
        gx: BigNum::from_hex(gx)?,
        gy: BigNum::from_hex(gy)?,
        n: BigNum::from_hex(n)?,
        field_size,
        a_is_minus_three,
    })
}
