//! Handshake signatures: CertificateVerify and ServerKeyExchange.

use ferrotls_crypto::ecdsa::EcdsaKeyPair;
use ferrotls_crypto::hash;
use ferrotls_crypto::rsa::{RsaPadding, RsaPrivateKey, RsaPublicKey};
use ferrotls_types::{EccCurveId, TlsError};

use crate::config::{PeerPublicKey, PrivateKey};
use crate::crypt::SignatureScheme;

const CONTEXT_PAD: [u8; 64] = [0x20; 64];
const SERVER_CONTEXT: &[u8] = b"TLS 1.3, server CertificateVerify";
const CLIENT_CONTEXT: &[u8] = b"TLS 1.3, client CertificateVerify";

/// The signed content of a TLS 1.3 CertificateVerify: 64 spaces, the
/// context string, a zero separator, then the transcript hash.
pub fn signature_context(server: bool, transcript_hash: &[u8]) -> Vec<u8> {
    let context = if server { SERVER_CONTEXT } else { CLIENT_CONTEXT };
    let mut out = Vec::with_capacity(64 + context.len() + 1 + transcript_hash.len());
    out.extend_from_slice(&CONTEXT_PAD);
    out.extend_from_slice(context);
    out.push(0);
    out.extend_from_slice(transcript_hash);
    out
}

fn rsa_padding_for(scheme: SignatureScheme) -> Option<RsaPadding> {
    match scheme {
        SignatureScheme::RSA_PSS_RSAE_SHA256 => Some(RsaPadding::Pss),
        SignatureScheme::RSA_PKCS1_SHA256
        | SignatureScheme::RSA_PKCS1_SHA384
        | SignatureScheme::RSA_PKCS1_SHA512 => Some(RsaPadding::Pkcs1v15Sign),
        _ => None,
    }
}

fn ecdsa_curve_for(scheme: SignatureScheme) -> Option<EccCurveId> {
    match scheme {
        SignatureScheme::ECDSA_SECP256R1_SHA256 => Some(EccCurveId::NistP256),
        SignatureScheme::ECDSA_SECP384R1_SHA384 => Some(EccCurveId::NistP384),
        SignatureScheme::ECDSA_SECP521R1_SHA512 => Some(EccCurveId::NistP521),
        _ => None,
    }
}

/// Sign `message` under `scheme` with the configured key.
pub fn sign_with_key(
    key: &PrivateKey,
    scheme: SignatureScheme,
    message: &[u8],
) -> Result<Vec<u8>, TlsError> {
    let hash_alg = scheme
        .hash_alg()
        .ok_or_else(|| TlsError::HandshakeFailed(format!("unknown scheme {:04x}", scheme.0)))?;
    let digest = hash::hash(hash_alg, message)?;
    match key {
        PrivateKey::Rsa { n, d, e, p, q } => {
            let padding = rsa_padding_for(scheme).ok_or_else(|| {
                TlsError::HandshakeFailed("RSA key with non-RSA scheme".to_string())
            })?;
            let rsa = RsaPrivateKey::new(n, d, e, p, q)?;
            Ok(rsa.sign(padding, &digest)?)
        }
        PrivateKey::Ecdsa {
            curve_id,
            private_key,
        } => {
            let scheme_curve = ecdsa_curve_for(scheme).ok_or_else(|| {
                TlsError::HandshakeFailed("ECDSA key with non-ECDSA scheme".to_string())
            })?;
            if scheme_curve != *curve_id {
                return Err(TlsError::HandshakeFailed(
                    "signature scheme does not match key curve".to_string(),
                ));
            }
            let pair = EcdsaKeyPair::from_private_key(*curve_id, private_key)?;
            Ok(pair.sign(&digest)?)
        }
    }
}

/// Check a peer signature. A mismatch is a verification failure, not a
/// decode error.
pub fn verify_with_peer_key(
    key: &PeerPublicKey,
    scheme: SignatureScheme,
    message: &[u8],
    signature: &[u8],
) -> Result<(), TlsError> {
    let hash_alg = scheme
        .hash_alg()
        .ok_or_else(|| TlsError::HandshakeFailed(format!("unknown scheme {:04x}", scheme.0)))?;
    let digest = hash::hash(hash_alg, message)?;
    let ok = match key {
        PeerPublicKey::Rsa { n, e } => {
            let padding = rsa_padding_for(scheme).ok_or_else(|| {
                TlsError::CertVerifyFailed("RSA key with non-RSA scheme".to_string())
            })?;
            let rsa = RsaPublicKey::new(n, e)?;
            rsa.verify(padding, &digest, signature)?
        }
        PeerPublicKey::Ecdsa { curve_id, point } => {
            match ecdsa_curve_for(scheme) {
                Some(c) if c == *curve_id => {}
                _ => {
                    return Err(TlsError::CertVerifyFailed(
                        "signature scheme does not match key curve".to_string(),
                    ))
                }
            }
            let pair = EcdsaKeyPair::from_public_key(*curve_id, point)?;
            pair.verify(&digest, signature)?
        }
    };
    if !ok {
        return Err(TlsError::CertVerifyFailed(
            "signature mismatch".to_string(),
        ));
    }
    Ok(())
}

/// Pick the first offered scheme this key can produce. TLS 1.3 forbids
/// PKCS#1 v1.5 in CertificateVerify, so RSA keys are limited to PSS there.
pub fn select_scheme(
    key: &PrivateKey,
    offered: &[SignatureScheme],
    tls13: bool,
) -> Result<SignatureScheme, TlsError> {
    let usable = |scheme: SignatureScheme| match key {
        PrivateKey::Rsa { .. } => {
            if tls13 {
                scheme == SignatureScheme::RSA_PSS_RSAE_SHA256
            } else {
                rsa_padding_for(scheme).is_some()
            }
        }
        PrivateKey::Ecdsa { curve_id, .. } => ecdsa_curve_for(scheme) == Some(*curve_id),
    };
    offered
        .iter()
        .copied()
        .find(|s| usable(*s))
        .ok_or_else(|| TlsError::HandshakeFailed("no usable signature scheme".to_string()))
}
