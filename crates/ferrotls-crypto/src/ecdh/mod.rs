//! Ephemeral ECDH key agreement over the NIST prime curves.
//!
//! The shared secret is the affine x-coordinate of d * Q_peer, zero-padded
//! to the field size as TLS requires (RFC 8446 section 7.4.2).

use ferrotls_bignum::BigNum;
use ferrotls_types::{CryptoError, EccCurveId};
use zeroize::Zeroize;

use crate::ecc::{EcGroup, EcPoint};

/// An ECDH key pair.
#[derive(Clone)]
pub struct EcdhKeyPair {
    curve_id: EccCurveId,
    group: EcGroup,
    private_key: BigNum,
    public_key: EcPoint,
}

impl Drop for EcdhKeyPair {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl EcdhKeyPair {
    /// Generate an ephemeral key pair on the given curve.
    pub fn generate(curve_id: EccCurveId) -> Result<Self, CryptoError> {
        let group = EcGroup::new(curve_id)?;
        let d = BigNum::random_range(group.order())?;
        let public_key = group.scalar_mul_base(&d)?;
        Ok(EcdhKeyPair {
            curve_id,
            group,
            private_key: d,
            public_key,
        })
    }

    /// Load a key pair from a big-endian private scalar.
    pub fn from_private_key(curve_id: EccCurveId, private_key: &[u8]) -> Result<Self, CryptoError> {
        let group = EcGroup::new(curve_id)?;
        let d = BigNum::from_bytes_be(private_key);
        if d.is_zero() || &d >= group.order() {
            return Err(CryptoError::EccInvalidPrivateKey);
        }
        let public_key = group.scalar_mul_base(&d)?;
        Ok(EcdhKeyPair {
            curve_id,
            group,
            private_key: d,
            public_key,
        })
    }

    pub fn curve_id(&self) -> EccCurveId {
        self.curve_id
    }

    /// Our public point in uncompressed encoding.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        self.public_key.to_uncompressed(&self.group)
    }

    /// Compute the shared secret with an uncompressed peer public point.
    ///
    /// The peer point is validated (on-curve, in-range) before use.
    pub fn compute_shared_secret(&self, peer_public: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let peer = EcPoint::from_uncompressed(&self.group, peer_public)?;
        let shared = self.group.scalar_mul(&self.private_key, &peer)?;
        if shared.is_infinity() {
            return Err(CryptoError::EccPointAtInfinity);
        }
        shared.x().to_bytes_be_padded(self.group.field_size())
    }
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

    #[test]
    fn both_sides_agree() {
        for curve in [
            EccCurveId::NistP256,
            EccCurveId::NistP384,
            EccCurveId::NistP521,
        ] {
            let alice = EcdhKeyPair::generate(curve).unwrap();
            let bob = EcdhKeyPair::generate(curve).unwrap();

            let s1 = alice
                .compute_shared_secret(&bob.public_key_bytes().unwrap())
                .unwrap();
            let s2 = bob
                .compute_shared_secret(&alice.public_key_bytes().unwrap())
                .unwrap();
            assert_eq!(s1, s2, "{curve:?}");
            assert_eq!(
                s1.len(),
                EcGroup::new(curve).unwrap().field_size(),
                "{curve:?}"
            );
        }
    }

    #[test]
    fn nist_cavp_p256_vector() {
        // CAVP KAS ECC CDH P-256 count 0.
        let keypair = EcdhKeyPair::from_private_key(
            EccCurveId::NistP256,
            &hex("7d7dc5f71eb29ddaf80d6214632eeae03d9058af1fb6d22ed80badb62bc1a534"),
        )
        .unwrap();
        let mut peer = vec![0x04];
        peer.extend_from_slice(&hex(
            "700c48f77f56584c5cc632ca65640db91b6bacce3a4df6b42ce7cc838833d287",
        ));
        peer.extend_from_slice(&hex(
            "db71e509e3fd9b060ddb20ba5c51dcc5948d46fbf640dfe0441782cab85fa4ac",
        ));
        let shared = keypair.compute_shared_secret(&peer).unwrap();
        assert_eq!(
            shared,
            hex("46fc62106420ff012e54a434fbdd2d25ccc5852060561e68040dd7778997bd7b")
        );
    }

    #[test]
    fn rejects_invalid_peer_point() {
        let keypair = EcdhKeyPair::generate(EccCurveId::NistP256).unwrap();
        let mut peer = keypair.public_key_bytes().unwrap();
        peer[10] ^= 0xFF;
        assert!(keypair.compute_shared_secret(&peer).is_err());
        assert!(keypair.compute_shared_secret(&[0x04; 12]).is_err());
    }

    #[test]
    fn private_key_roundtrip() {
        let keypair = EcdhKeyPair::generate(EccCurveId::NistP384).unwrap();
        let d = keypair.private_key.to_bytes_be();
        let restored = EcdhKeyPair::from_private_key(EccCurveId::NistP384, &d).unwrap();
        assert_eq!(
            keypair.public_key_bytes().unwrap(),
            restored.public_key_bytes().unwrap()
        );
    }
}
