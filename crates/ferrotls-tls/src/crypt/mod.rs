//! Cipher suite descriptors and key derivation.

pub mod hkdf;
pub mod key_schedule;
pub mod key_schedule12;
pub mod prf;
pub mod traffic_keys;
pub mod transcript;

use crate::CipherSuite;
use ferrotls_types::{DhParamId, EccCurveId, HashAlgId, TlsError};

/// Named group for key exchange (RFC 8446 section 4.2.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamedGroup(pub u16);

impl NamedGroup {
    pub const SECP256R1: NamedGroup = NamedGroup(0x0017);
    pub const SECP384R1: NamedGroup = NamedGroup(0x0018);
    pub const SECP521R1: NamedGroup = NamedGroup(0x0019);
    pub const FFDHE2048: NamedGroup = NamedGroup(0x0100);
    pub const FFDHE3072: NamedGroup = NamedGroup(0x0101);

    /// The NIST curve behind this group, if it is an EC group.
    pub fn curve_id(self) -> Option<EccCurveId> {
        match self {
            NamedGroup::SECP256R1 => Some(EccCurveId::NistP256),
            NamedGroup::SECP384R1 => Some(EccCurveId::NistP384),
            NamedGroup::SECP521R1 => Some(EccCurveId::NistP521),
            _ => None,
        }
    }

    /// The finite-field DH parameters behind this group, if any.
    pub fn dh_id(self) -> Option<DhParamId> {
        match self {
            NamedGroup::FFDHE2048 => Some(DhParamId::Ffdhe2048),
            NamedGroup::FFDHE3072 => Some(DhParamId::Ffdhe3072),
            _ => None,
        }
    }

    pub fn is_supported(self) -> bool {
        self.curve_id().is_some() || self.dh_id().is_some()
    }
}

/// Signature scheme identifier (RFC 8446 section 4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureScheme(pub u16);

impl SignatureScheme {
    pub const RSA_PKCS1_SHA256: SignatureScheme = SignatureScheme(0x0401);
    pub const RSA_PKCS1_SHA384: SignatureScheme = SignatureScheme(0x0501);
    pub const RSA_PKCS1_SHA512: SignatureScheme = SignatureScheme(0x0601);
    pub const ECDSA_SECP256R1_SHA256: SignatureScheme = SignatureScheme(0x0403);
    pub const ECDSA_SECP384R1_SHA384: SignatureScheme = SignatureScheme(0x0503);
    pub const ECDSA_SECP521R1_SHA512: SignatureScheme = SignatureScheme(0x0603);
    pub const RSA_PSS_RSAE_SHA256: SignatureScheme = SignatureScheme(0x0804);

    /// The hash this scheme applies to the message before signing.
    pub fn hash_alg(self) -> Option<HashAlgId> {
        match self {
            SignatureScheme::RSA_PKCS1_SHA256
            | SignatureScheme::ECDSA_SECP256R1_SHA256
            | SignatureScheme::RSA_PSS_RSAE_SHA256 => Some(HashAlgId::Sha256),
            SignatureScheme::RSA_PKCS1_SHA384 | SignatureScheme::ECDSA_SECP384R1_SHA384 => {
                Some(HashAlgId::Sha384)
            }
            SignatureScheme::RSA_PKCS1_SHA512 | SignatureScheme::ECDSA_SECP521R1_SHA512 => {
                Some(HashAlgId::Sha512)
            }
            _ => None,
        }
    }
}

/// Key exchange family of a TLS 1.2 cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeAlg {
    Ecdhe,
    Dhe,
    /// Static RSA: the premaster secret is encrypted to the server key.
    Rsa,
}

/// Authentication family of a TLS 1.2 cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAlg {
    Rsa,
    Ecdsa,
}

/// AEAD and hash parameters of a TLS 1.3 cipher suite.
#[derive(Debug, Clone)]
pub struct CipherSuiteParams {
    pub suite: CipherSuite,
    pub hash_alg: HashAlgId,
    pub key_len: usize,
    pub iv_len: usize,
    pub tag_len: usize,
}

impl CipherSuiteParams {
    pub fn from_suite(suite: CipherSuite) -> Result<Self, TlsError> {
        let (hash_alg, key_len) = match suite {
            CipherSuite::TLS_AES_128_GCM_SHA256 => (HashAlgId::Sha256, 16),
            CipherSuite::TLS_AES_256_GCM_SHA384 => (HashAlgId::Sha384, 32),
            _ => return Err(TlsError::NoSharedCipherSuite),
        };
        Ok(Self {
            suite,
            hash_alg,
            key_len,
            iv_len: 12,
            tag_len: 16,
        })
    }

    pub fn hash_len(&self) -> usize {
        self.hash_alg.output_size()
    }
}

/// Full parameter set of a TLS 1.2 cipher suite.
#[derive(Debug, Clone)]
pub struct Tls12CipherSuiteParams {
    pub suite: CipherSuite,
    pub kx: KeyExchangeAlg,
    pub auth: AuthAlg,
    /// Hash driving the PRF and the Finished computation.
    pub prf_alg: HashAlgId,
    pub enc_key_len: usize,
    /// Key-block IV bytes (GCM salt); zero for CBC suites, which use a
    /// per-record explicit IV instead.
    pub fixed_iv_len: usize,
    /// Explicit per-record nonce or IV bytes carried on the wire.
    pub record_iv_len: usize,
    pub mac_key_len: usize,
    /// HMAC hash for CBC suites; None for AEAD suites.
    pub mac_alg: Option<HashAlgId>,
    pub is_cbc: bool,
    pub tag_len: usize,
}

impl Tls12CipherSuiteParams {
    pub fn from_suite(suite: CipherSuite) -> Result<Self, TlsError> {
        use {AuthAlg::*, KeyExchangeAlg::*};
        let (kx, auth, prf_alg, enc_key_len, is_cbc) = match suite {
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => {
                (Ecdhe, AuthAlg::Rsa, HashAlgId::Sha256, 16, false)
            }
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => {
                (Ecdhe, AuthAlg::Rsa, HashAlgId::Sha384, 32, false)
            }
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 => {
                (Ecdhe, Ecdsa, HashAlgId::Sha256, 16, false)
            }
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 => {
                (Ecdhe, Ecdsa, HashAlgId::Sha384, 32, false)
            }
            CipherSuite::TLS_DHE_RSA_WITH_AES_128_GCM_SHA256 => {
                (Dhe, AuthAlg::Rsa, HashAlgId::Sha256, 16, false)
            }
            CipherSuite::TLS_DHE_RSA_WITH_AES_256_GCM_SHA384 => {
                (Dhe, AuthAlg::Rsa, HashAlgId::Sha384, 32, false)
            }
            CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256 => {
                (KeyExchangeAlg::Rsa, AuthAlg::Rsa, HashAlgId::Sha256, 16, false)
            }
            CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384 => {
                (KeyExchangeAlg::Rsa, AuthAlg::Rsa, HashAlgId::Sha384, 32, false)
            }
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256 => {
                (Ecdhe, AuthAlg::Rsa, HashAlgId::Sha256, 16, true)
            }
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256 => {
                (Ecdhe, Ecdsa, HashAlgId::Sha256, 16, true)
            }
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256 => {
                (KeyExchangeAlg::Rsa, AuthAlg::Rsa, HashAlgId::Sha256, 16, true)
            }
            _ => return Err(TlsError::NoSharedCipherSuite),
        };

        Ok(if is_cbc {
            Self {
                suite,
                kx,
                auth,
                prf_alg,
                enc_key_len,
                fixed_iv_len: 0,
                record_iv_len: 16,
                mac_key_len: prf_alg.output_size(),
                mac_alg: Some(prf_alg),
                is_cbc,
                tag_len: 0,
            }
        } else {
            Self {
                suite,
                kx,
                auth,
                prf_alg,
                enc_key_len,
                fixed_iv_len: 4,
                record_iv_len: 8,
                mac_key_len: 0,
                mac_alg: None,
                is_cbc,
                tag_len: 16,
            }
        })
    }

    /// Bytes to derive from the master secret: MAC keys, then encryption
    /// keys, then implicit IVs, client before server within each pair.
    pub fn key_block_len(&self) -> usize {
        2 * self.mac_key_len + 2 * self.enc_key_len + 2 * self.fixed_iv_len
    }
}

pub fn is_tls13_suite(suite: CipherSuite) -> bool {
    (suite.0 >> 8) == 0x13
}

pub fn is_tls12_suite(suite: CipherSuite) -> bool {
    Tls12CipherSuiteParams::from_suite(suite).is_ok()
}
