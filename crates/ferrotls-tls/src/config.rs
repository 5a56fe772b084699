//! Connection configuration and the builder that assembles it.

use std::fmt;
use std::sync::{Arc, Mutex};

use ferrotls_types::{EccCurveId, TlsError};
use zeroize::Zeroize;

use crate::crypt::{NamedGroup, SignatureScheme};
use crate::session::{InMemorySessionCache, TlsSession, TICKET_KEY_LEN};
use crate::{CipherSuite, TlsVersion};

/// Server or client signing key.
pub enum PrivateKey {
    Rsa {
        n: Vec<u8>,
        d: Vec<u8>,
        e: Vec<u8>,
        p: Vec<u8>,
        q: Vec<u8>,
    },
    Ecdsa {
        curve_id: EccCurveId,
        private_key: Vec<u8>,
    },
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        match self {
            PrivateKey::Rsa { d, p, q, .. } => {
                d.zeroize();
                p.zeroize();
                q.zeroize();
            }
            PrivateKey::Ecdsa { private_key, .. } => private_key.zeroize(),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKey::Rsa { n, .. } => f
                .debug_struct("PrivateKey::Rsa")
                .field("modulus_bytes", &n.len())
                .finish_non_exhaustive(),
            PrivateKey::Ecdsa { curve_id, .. } => f
                .debug_struct("PrivateKey::Ecdsa")
                .field("curve_id", curve_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Public key recovered from a peer certificate by the application's
/// certificate decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerPublicKey {
    Rsa { n: Vec<u8>, e: Vec<u8> },
    Ecdsa { curve_id: EccCurveId, point: Vec<u8> },
}

/// Extracts the subject public key from a DER certificate. Chain
/// validation stays with the application.
pub type CertificateDecoder =
    Arc<dyn Fn(&[u8]) -> Result<PeerPublicKey, TlsError> + Send + Sync>;

pub struct TlsConfig {
    pub min_version: TlsVersion,
    pub max_version: TlsVersion,
    pub cipher_suites: Vec<CipherSuite>,
    pub supported_groups: Vec<NamedGroup>,
    pub signature_algorithms: Vec<SignatureScheme>,
    pub server_name: Option<String>,
    pub verify_peer: bool,
    /// Leaf first, DER encoded.
    pub certificate_chain: Vec<Vec<u8>>,
    pub private_key: Option<PrivateKey>,
    pub ticket_key: Option<[u8; TICKET_KEY_LEN]>,
    pub session_resumption: bool,
    /// Session to offer when reconnecting as a client.
    pub resumption_session: Option<TlsSession>,
    pub max_early_data_size: u32,
    pub max_fragment_size: usize,
    pub session_cache: Option<Arc<Mutex<InMemorySessionCache>>>,
    pub certificate_decoder: Option<CertificateDecoder>,
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("min_version", &self.min_version)
            .field("max_version", &self.max_version)
            .field("cipher_suites", &self.cipher_suites)
            .field("supported_groups", &self.supported_groups)
            .field("signature_algorithms", &self.signature_algorithms)
            .field("server_name", &self.server_name)
            .field("verify_peer", &self.verify_peer)
            .field("certificate_chain_len", &self.certificate_chain.len())
            .field("has_private_key", &self.private_key.is_some())
            .field("has_ticket_key", &self.ticket_key.is_some())
            .field("session_resumption", &self.session_resumption)
            .field("max_early_data_size", &self.max_early_data_size)
            .field("max_fragment_size", &self.max_fragment_size)
            .finish_non_exhaustive()
    }
}

impl TlsConfig {
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::new()
    }
}

pub struct TlsConfigBuilder {
    config: TlsConfig,
}

impl Default for TlsConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TlsConfig {
                min_version: TlsVersion::Tls12,
                max_version: TlsVersion::Tls13,
                cipher_suites: vec![
                    CipherSuite::TLS_AES_128_GCM_SHA256,
                    CipherSuite::TLS_AES_256_GCM_SHA384,
                    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
                    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
                    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
                    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
                    CipherSuite::TLS_DHE_RSA_WITH_AES_128_GCM_SHA256,
                    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256,
                ],
                supported_groups: vec![
                    NamedGroup::SECP256R1,
                    NamedGroup::SECP384R1,
                    NamedGroup::SECP521R1,
                    NamedGroup::FFDHE2048,
                ],
                signature_algorithms: vec![
                    SignatureScheme::ECDSA_SECP256R1_SHA256,
                    SignatureScheme::ECDSA_SECP384R1_SHA384,
                    SignatureScheme::RSA_PSS_RSAE_SHA256,
                    SignatureScheme::RSA_PKCS1_SHA256,
                    SignatureScheme::RSA_PKCS1_SHA384,
                ],
                server_name: None,
                verify_peer: true,
                certificate_chain: Vec::new(),
                private_key: None,
                ticket_key: None,
                session_resumption: true,
                resumption_session: None,
                max_early_data_size: 0,
                max_fragment_size: 16384,
                session_cache: None,
                certificate_decoder: None,
            },
        }
    }

    pub fn min_version(mut self, version: TlsVersion) -> Self {
        self.config.min_version = version;
        self
    }

    pub fn max_version(mut self, version: TlsVersion) -> Self {
        self.config.max_version = version;
        self
    }

    pub fn cipher_suites(mut self, suites: Vec<CipherSuite>) -> Self {
        self.config.cipher_suites = suites;
        self
    }

    pub fn supported_groups(mut self, groups: Vec<NamedGroup>) -> Self {
        self.config.supported_groups = groups;
        self
    }

    pub fn signature_algorithms(mut self, schemes: Vec<SignatureScheme>) -> Self {
        self.config.signature_algorithms = schemes;
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.config.server_name = Some(name.into());
        self
    }

    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.config.verify_peer = verify;
        self
    }

    pub fn certificate_chain(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.config.certificate_chain = chain;
        self
    }

    pub fn private_key(mut self, key: PrivateKey) -> Self {
        self.config.private_key = Some(key);
        self
    }

    pub fn ticket_key(mut self, key: [u8; TICKET_KEY_LEN]) -> Self {
        self.config.ticket_key = Some(key);
        self
    }

    pub fn session_resumption(mut self, enabled: bool) -> Self {
        self.config.session_resumption = enabled;
        self
    }

    pub fn resumption_session(mut self, session: TlsSession) -> Self {
        self.config.resumption_session = Some(session);
        self
    }

    pub fn max_early_data_size(mut self, size: u32) -> Self {
        self.config.max_early_data_size = size;
        self
    }

    pub fn max_fragment_size(mut self, size: usize) -> Self {
        self.config.max_fragment_size = size.clamp(64, 16384);
        self
    }

    pub fn session_cache(mut self, cache: Arc<Mutex<InMemorySessionCache>>) -> Self {
        self.config.session_cache = Some(cache);
        self
    }

    pub fn certificate_decoder(mut self, decoder: CertificateDecoder) -> Self {
        self.config.certificate_decoder = Some(decoder);
        self
    }

    pub fn build(self) -> Result<TlsConfig, TlsError> {
        if self.config.min_version > self.config.max_version {
            return Err(TlsError::HandshakeFailed(
                "min_version exceeds max_version".to_string(),
            ));
        }
        if self.config.cipher_suites.is_empty() {
            return Err(TlsError::HandshakeFailed(
                "no cipher suites configured".to_string(),
            ));
        }
        Ok(self.config)
    }
}
