//! ECDSA signing and verification (FIPS 186-4) over the NIST prime curves.
//!
//! Signatures are DER encoded as SEQUENCE { INTEGER r, INTEGER s }. The
//! caller supplies the message digest; hashing happens elsewhere.

use ferrotls_bignum::BigNum;
use ferrotls_types::{CryptoError, EccCurveId};
use zeroize::Zeroize;

use crate::asn1::{Decoder, Encoder};
use crate::ecc::{EcGroup, EcPoint};

/// Retries before giving up on finding a usable nonce.
const MAX_SIGN_ATTEMPTS: usize = 100;

/// An ECDSA key pair. A verify-only pair has a zero private scalar.
#[derive(Clone)]
pub struct EcdsaKeyPair {
    curve_id: EccCurveId,
    group: EcGroup,
    private_key: BigNum,
    public_key: EcPoint,
}

impl Drop for EcdsaKeyPair {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl EcdsaKeyPair {
    /// Generate a fresh key pair on the given curve.
    pub fn generate(curve_id: EccCurveId) -> Result<Self, CryptoError> {
        let group = EcGroup::new(curve_id)?;
        let d = BigNum::random_range(group.order())?;
        let public_key = group.scalar_mul_base(&d)?;
        Ok(EcdsaKeyPair {
            curve_id,
            group,
            private_key: d,
            public_key,
        })
    }

    /// Load a signing key from a big-endian scalar.
    pub fn from_private_key(curve_id: EccCurveId, private_key: &[u8]) -> Result<Self, CryptoError> {
        let group = EcGroup::new(curve_id)?;
        let d = BigNum::from_bytes_be(private_key);
        if d.is_zero() || &d >= group.order() {
            return Err(CryptoError::EccInvalidPrivateKey);
        }
        let public_key = group.scalar_mul_base(&d)?;
        Ok(EcdsaKeyPair {
            curve_id,
            group,
            private_key: d,
            public_key,
        })
    }

    /// Load a verify-only key from an uncompressed public point.
    pub fn from_public_key(curve_id: EccCurveId, public_key: &[u8]) -> Result<Self, CryptoError> {
        let group = EcGroup::new(curve_id)?;
        let q = EcPoint::from_uncompressed(&group, public_key)?;
        Ok(EcdsaKeyPair {
            curve_id,
            group,
            private_key: BigNum::zero(),
            public_key: q,
        })
    }

    pub fn curve_id(&self) -> EccCurveId {
        self.curve_id
    }

    /// Uncompressed public point encoding.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        self.public_key.to_uncompressed(&self.group)
    }

    pub fn private_key_bytes(&self) -> Vec<u8> {
        self.private_key.to_bytes_be()
    }

    /// Sign a digest, returning the DER-encoded signature.
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if self.private_key.is_zero() {
            return Err(CryptoError::EccInvalidPrivateKey);
        }

        let n = self.group.order();
        let e = reduce_digest(digest, n.bit_len());

        for _ in 0..MAX_SIGN_ATTEMPTS {
            let k = BigNum::random_range(n)?;

            let kg = self.group.scalar_mul_base(&k)?;
            if kg.is_infinity() {
                continue;
            }
            let r = kg.x().mod_reduce(n)?;
            if r.is_zero() {
                continue;
            }

            // s = k^-1 * (e + d*r) mod n
            let dr = self.private_key.mod_mul(&r, n)?;
            let s = k.mod_inv(n)?.mod_mul(&e.mod_add(&dr, n)?, n)?;
            if s.is_zero() {
                continue;
            }

            return encode_signature(&r, &s);
        }

        Err(CryptoError::BnRandGenFail)
    }

    /// Verify a DER signature against a digest. Malformed signatures and
    /// out-of-range components report `Ok(false)` rather than an error.
    pub fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let n = self.group.order();

        let (r, s) = match decode_signature(signature) {
            Ok(rs) => rs,
            Err(_) => return Ok(false),
        };
        if r.is_zero() || &r >= n || s.is_zero() || &s >= n {
            return Ok(false);
        }

        let e = reduce_digest(digest, n.bit_len());
        let w = match s.mod_inv(n) {
            Ok(w) => w,
            Err(_) => return Ok(false),
        };
        let u1 = e.mod_mul(&w, n)?;
        let u2 = r.mod_mul(&w, n)?;

        let point = self.group.scalar_mul_add(&u1, &u2, &self.public_key)?;
        if point.is_infinity() {
            return Ok(false);
        }
        Ok(point.x().mod_reduce(n)? == r)
    }
}

/// Interpret the digest as an integer truncated to the order's bit length.
fn reduce_digest(digest: &[u8], n_bits: usize) -> BigNum {
    let e = BigNum::from_bytes_be(digest);
    let excess = (digest.len() * 8).saturating_sub(n_bits);
    if excess > 0 {
        e.shr(excess)
    } else {
        e
    }
}

fn encode_signature(r: &BigNum, s: &BigNum) -> Result<Vec<u8>, CryptoError> {
    let mut inner = Encoder::new();
    inner
        .write_integer(&r.to_bytes_be())
        .write_integer(&s.to_bytes_be());
    let body = inner.finish();

    let mut outer = Encoder::new();
    outer.write_sequence(&body);
    Ok(outer.finish())
}

fn decode_signature(data: &[u8]) -> Result<(BigNum, BigNum), CryptoError> {
    let mut decoder = Decoder::new(data);
    let mut seq = decoder.read_sequence()?;
    let r = BigNum::from_bytes_be(seq.read_integer()?);
    let s = BigNum::from_bytes_be(seq.read_integer()?);
    if !seq.is_empty() || !decoder.is_empty() {
        return Err(CryptoError::EcdsaVerifyFail);
    }
    Ok((r, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    // RFC 6979 A.2.5 key on P-256.
    const P256_D: &str = "C9AFA9D845BA75166B5C215767B1D6934E50C3DB36E89B127B8A622B120F6721";
    const P256_QX: &str = "60FED4BA255A9D31C961EB74C6356D68C049B8923B61FA6CE669622E60F29FB6";
    const P256_QY: &str = "7903FE1008B8BC99A41AE9E95628BC64F2F1B20C2D7E9F5177A3C294D4462299";
    // SHA-256("sample") and the matching RFC 6979 signature.
    const SAMPLE_DIGEST: &str = "AF2BDBE1AA9B6EC1E2ADE1D694F41FC71A831D0268E9891562113D8A62ADD1BF";
    const SAMPLE_R: &str = "EFD48B2AACB6A8FD1140DD9CD45E81D69D2C877B56AAF991C34D0EA84EAF3716";
    const SAMPLE_S: &str = "F7CB1C942D657C41D436C7A1B6E29F65F3E900DBB9AFF4064DC4AB2F843ACDA8";

    #[test]
    fn private_key_derives_known_public_point() {
        let key = EcdsaKeyPair::from_private_key(EccCurveId::NistP256, &hex(P256_D)).unwrap();
        let mut expected = vec![0x04];
        expected.extend_from_slice(&hex(P256_QX));
        expected.extend_from_slice(&hex(P256_QY));
        assert_eq!(key.public_key_bytes().unwrap(), expected);
    }

    #[test]
    fn verifies_rfc6979_signature() {
        let mut pub_bytes = vec![0x04];
        pub_bytes.extend_from_slice(&hex(P256_QX));
        pub_bytes.extend_from_slice(&hex(P256_QY));
        let verifier = EcdsaKeyPair::from_public_key(EccCurveId::NistP256, &pub_bytes).unwrap();

        let r = BigNum::from_hex(SAMPLE_R).unwrap();
        let s = BigNum::from_hex(SAMPLE_S).unwrap();
        let sig = encode_signature(&r, &s).unwrap();

        assert!(verifier.verify(&hex(SAMPLE_DIGEST), &sig).unwrap());

        // Any digest bit flip must fail.
        let mut bad = hex(SAMPLE_DIGEST);
        bad[0] ^= 0x80;
        assert!(!verifier.verify(&bad, &sig).unwrap());
    }

    #[test]
    fn sign_verify_roundtrip_all_curves() {
        let digest = hex(SAMPLE_DIGEST);
        for curve in [
            EccCurveId::NistP256,
            EccCurveId::NistP384,
            EccCurveId::NistP521,
        ] {
            let key = EcdsaKeyPair::generate(curve).unwrap();
            let sig = key.sign(&digest).unwrap();
            assert!(key.verify(&digest, &sig).unwrap(), "{curve:?}");
        }
    }

    #[test]
    fn verify_only_key_cannot_sign() {
        let key = EcdsaKeyPair::generate(EccCurveId::NistP256).unwrap();
        let pub_bytes = key.public_key_bytes().unwrap();
        let verifier = EcdsaKeyPair::from_public_key(EccCurveId::NistP256, &pub_bytes).unwrap();
        assert!(verifier.sign(&hex(SAMPLE_DIGEST)).is_err());
    }

    #[test]
    fn malformed_signature_reports_false() {
        let key = EcdsaKeyPair::generate(EccCurveId::NistP256).unwrap();
        let digest = hex(SAMPLE_DIGEST);
        assert!(!key.verify(&digest, &[]).unwrap());
        assert!(!key.verify(&digest, &[0x30, 0x00]).unwrap());

        // Trailing garbage after a valid signature
        let mut sig = key.sign(&digest).unwrap();
        sig.push(0x00);
        assert!(!key.verify(&digest, &sig).unwrap());
    }

    #[test]
    fn rejects_out_of_range_private_key() {
        let group = EcGroup::new(EccCurveId::NistP256).unwrap();
        let n_bytes = group.order().to_bytes_be();
        assert!(EcdsaKeyPair::from_private_key(EccCurveId::NistP256, &n_bytes).is_err());
        assert!(EcdsaKeyPair::from_private_key(EccCurveId::NistP256, &[0u8; 32]).is_err());
    }

    #[test]
    fn digest_longer_than_order_is_truncated() {
        // P-256 order is 256 bits; a SHA-512 digest must still verify.
        let key = EcdsaKeyPair::generate(EccCurveId::NistP256).unwrap();
        let digest = crate::hash::hash(ferrotls_types::HashAlgId::Sha512, b"truncation")
            .unwrap();
        let sig = key.sign(&digest).unwrap();
        assert!(key.verify(&digest, &sig).unwrap());
    }
}
