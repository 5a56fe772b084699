//! Handshake message bodies and their wire forms.
//!
//! `encode` always yields a complete message including the four-byte
//! header. Decoding is driven by the negotiated version and, for TLS 1.2
//! ClientKeyExchange, by the selected key exchange, since those bodies are
//! not self-describing.

use ferrotls_types::TlsError;

use super::HandshakeType;
use crate::codec::{CodecError, Encoder, Reader};
use crate::crypt::{KeyExchangeAlg, NamedGroup, SignatureScheme};
use crate::extensions::{
    read_extensions, write_extensions, ExtensionContext, ExtensionPayload,
};
use crate::{CipherSuite, TlsVersion};

/// Fixed ServerHello.random value announcing a HelloRetryRequest.
pub const HELLO_RETRY_REQUEST_RANDOM: [u8; 32] = [
    0xcf, 0x21, 0xad, 0x74, 0xe5, 0x9a, 0x61, 0x11, 0xbe, 0x1d, 0x8c, 0x02, 0x1e, 0x65, 0xb8,
    0x91, 0xc2, 0xa2, 0x11, 0x16, 0x7a, 0xbb, 0x8c, 0x5e, 0x07, 0x9e, 0x09, 0xe2, 0xc8, 0xa8,
    0x33, 0x9c,
];

const NAMED_CURVE_TYPE: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub legacy_version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<ExtensionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub legacy_version: u16,
    pub random: [u8; 32],
    pub session_id_echo: Vec<u8>,
    pub cipher_suite: CipherSuite,
    pub compression_method: u8,
    pub extensions: Vec<ExtensionPayload>,
}

impl ServerHello {
    pub fn is_hello_retry_request(&self) -> bool {
        self.random == HELLO_RETRY_REQUEST_RANDOM
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateEntry {
    pub cert_data: Vec<u8>,
    pub extensions: Vec<ExtensionPayload>,
}

/// TLS 1.3 certificate message with request context and per-entry
/// extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate13 {
    pub context: Vec<u8>,
    pub entries: Vec<CertificateEntry>,
}

/// TLS 1.2 certificate message, a bare chain of DER blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate12 {
    pub chain: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerify {
    pub scheme: SignatureScheme,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerKeyExchangeParams {
    Ecdhe { group: NamedGroup, public: Vec<u8> },
    Dhe { p: Vec<u8>, g: Vec<u8>, public: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerKeyExchange {
    pub params: ServerKeyExchangeParams,
    pub scheme: SignatureScheme,
    pub signature: Vec<u8>,
}

impl ServerKeyExchange {
    /// The serialized params, the portion covered by the signature.
    pub fn params_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::new();
        encode_ske_params(&mut enc, &self.params)?;
        Ok(enc.finish())
    }
}

fn encode_ske_params(
    enc: &mut Encoder,
    params: &ServerKeyExchangeParams,
) -> Result<(), CodecError> {
    match params {
        ServerKeyExchangeParams::Ecdhe { group, public } => {
            enc.put_u8(NAMED_CURVE_TYPE);
            enc.put_u16(group.0);
            enc.put_vec8(public)?;
        }
        ServerKeyExchangeParams::Dhe { p, g, public } => {
            enc.put_vec16(p)?;
            enc.put_vec16(g)?;
            enc.put_vec16(public)?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKeyExchange {
    /// Uncompressed EC point, one-byte length prefix on the wire.
    Ecdh(Vec<u8>),
    /// DH public value, two-byte length prefix.
    Dh(Vec<u8>),
    /// RSA-encrypted premaster secret, two-byte length prefix.
    Rsa(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateRequest {
    Tls13 {
        context: Vec<u8>,
        extensions: Vec<ExtensionPayload>,
    },
    Tls12 {
        cert_types: Vec<u8>,
        schemes: Vec<SignatureScheme>,
        ca_names: Vec<Vec<u8>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionTicket13 {
    pub lifetime: u32,
    pub age_add: u32,
    pub nonce: Vec<u8>,
    pub ticket: Vec<u8>,
    pub extensions: Vec<ExtensionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionTicket12 {
    pub lifetime_hint: u32,
    pub ticket: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub verify_data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUpdateRequest {
    pub update_requested: bool,
}

/// What the decoder needs to know about the connection.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext {
    pub version: TlsVersion,
    /// Negotiated TLS 1.2 key exchange, once known.
    pub kx: Option<KeyExchangeAlg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandshakePayload {
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    EncryptedExtensions(Vec<ExtensionPayload>),
    Certificate13(Certificate13),
    Certificate12(Certificate12),
    CertificateVerify(CertificateVerify),
    ServerKeyExchange(ServerKeyExchange),
    ServerHelloDone,
    ClientKeyExchange(ClientKeyExchange),
    CertificateRequest(CertificateRequest),
    NewSessionTicket13(NewSessionTicket13),
    NewSessionTicket12(NewSessionTicket12),
    EndOfEarlyData,
    Finished(Finished),
    KeyUpdate(KeyUpdateRequest),
}

impl HandshakePayload {
    pub fn msg_type(&self) -> HandshakeType {
        match self {
            Self::ClientHello(_) => HandshakeType::ClientHello,
            Self::ServerHello(_) => HandshakeType::ServerHello,
            Self::EncryptedExtensions(_) => HandshakeType::EncryptedExtensions,
            Self::Certificate13(_) | Self::Certificate12(_) => HandshakeType::Certificate,
            Self::CertificateVerify(_) => HandshakeType::CertificateVerify,
            Self::ServerKeyExchange(_) => HandshakeType::ServerKeyExchange,
            Self::ServerHelloDone => HandshakeType::ServerHelloDone,
            Self::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            Self::CertificateRequest(_) => HandshakeType::CertificateRequest,
            Self::NewSessionTicket13(_) | Self::NewSessionTicket12(_) => {
                HandshakeType::NewSessionTicket
            }
            Self::EndOfEarlyData => HandshakeType::EndOfEarlyData,
            Self::Finished(_) => HandshakeType::Finished,
            Self::KeyUpdate(_) => HandshakeType::KeyUpdate,
        }
    }

    /// Serialize the complete message, four-byte header included.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut body = Encoder::new();
        match self {
            Self::ClientHello(ch) => {
                body.put_u16(ch.legacy_version);
                body.put_bytes(&ch.random);
                body.put_vec8(&ch.session_id)?;
                let mut suites = Encoder::new();
                for s in &ch.cipher_suites {
                    suites.put_u16(s.0);
                }
                body.put_vec16(suites.as_slice())?;
                body.put_vec8(&ch.compression_methods)?;
                // An empty extension block is omitted entirely.
                if !ch.extensions.is_empty() {
                    body.put_bytes(&write_extensions(&ch.extensions)?);
                }
            }
            Self::ServerHello(sh) => {
                body.put_u16(sh.legacy_version);
                body.put_bytes(&sh.random);
                body.put_vec8(&sh.session_id_echo)?;
                body.put_u16(sh.cipher_suite.0);
                body.put_u8(sh.compression_method);
                body.put_bytes(&write_extensions(&sh.extensions)?);
            }
            Self::EncryptedExtensions(exts) => {
                body.put_bytes(&write_extensions(exts)?);
            }
            Self::Certificate13(cert) => {
                body.put_vec8(&cert.context)?;
                let mut entries = Encoder::new();
                for entry in &cert.entries {
                    entries.put_vec24(&entry.cert_data)?;
                    entries.put_bytes(&write_extensions(&entry.extensions)?);
                }
                body.put_vec24(entries.as_slice())?;
            }
            Self::Certificate12(cert) => {
                let mut chain = Encoder::new();
                for der in &cert.chain {
                    chain.put_vec24(der)?;
                }
                body.put_vec24(chain.as_slice())?;
            }
            Self::CertificateVerify(cv) => {
                body.put_u16(cv.scheme.0);
                body.put_vec16(&cv.signature)?;
            }
            Self::ServerKeyExchange(ske) => {
                encode_ske_params(&mut body, &ske.params)?;
                body.put_u16(ske.scheme.0);
                body.put_vec16(&ske.signature)?;
            }
            Self::ServerHelloDone | Self::EndOfEarlyData => {}
            Self::ClientKeyExchange(cke) => match cke {
                ClientKeyExchange::Ecdh(point) => body.put_vec8(point)?,
                ClientKeyExchange::Dh(public) => body.put_vec16(public)?,
                ClientKeyExchange::Rsa(encrypted) => body.put_vec16(encrypted)?,
            },
            Self::CertificateRequest(cr) => match cr {
                CertificateRequest::Tls13 {
                    context,
                    extensions,
                } => {
                    body.put_vec8(context)?;
                    body.put_bytes(&write_extensions(extensions)?);
                }
                CertificateRequest::Tls12 {
                    cert_types,
                    schemes,
                    ca_names,
                } => {
                    body.put_vec8(cert_types)?;
                    let mut list = Encoder::new();
                    for s in schemes {
                        list.put_u16(s.0);
                    }
                    body.put_vec16(list.as_slice())?;
                    let mut names = Encoder::new();
                    for name in ca_names {
                        names.put_vec16(name)?;
                    }
                    body.put_vec16(names.as_slice())?;
                }
            },
            Self::NewSessionTicket13(nst) => {
                body.put_u32(nst.lifetime);
                body.put_u32(nst.age_add);
                body.put_vec8(&nst.nonce)?;
                body.put_vec16(&nst.ticket)?;
                body.put_bytes(&write_extensions(&nst.extensions)?);
            }
            Self::NewSessionTicket12(nst) => {
                body.put_u32(nst.lifetime_hint);
                body.put_vec16(&nst.ticket)?;
            }
            Self::Finished(fin) => {
                body.put_bytes(&fin.verify_data);
            }
            Self::KeyUpdate(ku) => {
                body.put_u8(ku.update_requested as u8);
            }
        }

        let body = body.finish();
        let mut out = Encoder::with_capacity(4 + body.len());
        out.put_u8(self.msg_type() as u8);
        out.put_vec24(&body)?;
        Ok(out.finish())
    }
}

/// Decode one handshake message body.
pub fn decode_handshake(
    ctx: DecodeContext,
    msg_type: HandshakeType,
    body: &[u8],
) -> Result<HandshakePayload, TlsError> {
    let mut r = Reader::new(body);
    let payload = match msg_type {
        HandshakeType::ClientHello => {
            let legacy_version = r.get_u16()?;
            let mut random = [0u8; 32];
            random.copy_from_slice(r.take(32)?);
            let session_id = r.vec8()?.to_vec();
            let mut suites_r = Reader::new(r.vec16()?);
            let mut cipher_suites = Vec::new();
            while !suites_r.is_empty() {
                cipher_suites.push(CipherSuite(suites_r.get_u16()?));
            }
            let compression_methods = r.vec8()?.to_vec();
            let extensions = if r.is_empty() {
                Vec::new()
            } else {
                read_extensions(r.vec16()?, ExtensionContext::ClientHello)?
            };
            r.expect_empty()?;
            HandshakePayload::ClientHello(ClientHello {
                legacy_version,
                random,
                session_id,
                cipher_suites,
                compression_methods,
                extensions,
            })
        }
        HandshakeType::ServerHello => {
            let legacy_version = r.get_u16()?;
            let mut random = [0u8; 32];
            random.copy_from_slice(r.take(32)?);
            let session_id_echo = r.vec8()?.to_vec();
            let cipher_suite = CipherSuite(r.get_u16()?);
            let compression_method = r.get_u8()?;
            let ext_ctx = if random == HELLO_RETRY_REQUEST_RANDOM {
                ExtensionContext::HelloRetryRequest
            } else {
                ExtensionContext::ServerHello
            };
            let extensions = read_extensions(r.vec16()?, ext_ctx)?;
            r.expect_empty()?;
            HandshakePayload::ServerHello(ServerHello {
                legacy_version,
                random,
                session_id_echo,
                cipher_suite,
                compression_method,
                extensions,
            })
        }
        HandshakeType::EncryptedExtensions => {
            let exts = read_extensions(r.vec16()?, ExtensionContext::EncryptedExtensions)?;
            r.expect_empty()?;
            HandshakePayload::EncryptedExtensions(exts)
        }
        HandshakeType::Certificate => match ctx.version {
            TlsVersion::Tls13 => {
                let context = r.vec8()?.to_vec();
                let mut list = Reader::new(r.vec24()?);
                let mut entries = Vec::new();
                while !list.is_empty() {
                    let cert_data = list.vec24()?.to_vec();
                    let extensions =
                        read_extensions(list.vec16()?, ExtensionContext::ClientHello)?;
                    entries.push(CertificateEntry {
                        cert_data,
                        extensions,
                    });
                }
                r.expect_empty()?;
                HandshakePayload::Certificate13(Certificate13 { context, entries })
            }
            TlsVersion::Tls12 => {
                let mut list = Reader::new(r.vec24()?);
                let mut chain = Vec::new();
                while !list.is_empty() {
                    chain.push(list.vec24()?.to_vec());
                }
                r.expect_empty()?;
                HandshakePayload::Certificate12(Certificate12 { chain })
            }
        },
        HandshakeType::CertificateVerify => {
            let scheme = SignatureScheme(r.get_u16()?);
            let signature = r.vec16()?.to_vec();
            r.expect_empty()?;
            HandshakePayload::CertificateVerify(CertificateVerify { scheme, signature })
        }
        HandshakeType::ServerKeyExchange => {
            let kx = ctx.kx.ok_or_else(|| {
                TlsError::DecodeError("ServerKeyExchange before key exchange selection".into())
            })?;
            let params = match kx {
                KeyExchangeAlg::Ecdhe => {
                    let curve_type = r.get_u8()?;
                    if curve_type != NAMED_CURVE_TYPE {
                        return Err(TlsError::DecodeError(format!(
                            "unsupported curve type {curve_type}"
                        )));
                    }
                    let group = NamedGroup(r.get_u16()?);
                    let public = r.vec8()?.to_vec();
                    ServerKeyExchangeParams::Ecdhe { group, public }
                }
                KeyExchangeAlg::Dhe => ServerKeyExchangeParams::Dhe {
                    p: r.vec16()?.to_vec(),
                    g: r.vec16()?.to_vec(),
                    public: r.vec16()?.to_vec(),
                },
                KeyExchangeAlg::Rsa => {
                    return Err(TlsError::DecodeError(
                        "ServerKeyExchange with static RSA".into(),
                    ))
                }
            };
            let scheme = SignatureScheme(r.get_u16()?);
            let signature = r.vec16()?.to_vec();
            r.expect_empty()?;
            HandshakePayload::ServerKeyExchange(ServerKeyExchange {
                params,
                scheme,
                signature,
            })
        }
        HandshakeType::ServerHelloDone => {
            r.expect_empty()?;
            HandshakePayload::ServerHelloDone
        }
        HandshakeType::ClientKeyExchange => {
            let kx = ctx.kx.ok_or_else(|| {
                TlsError::DecodeError("ClientKeyExchange before key exchange selection".into())
            })?;
            let cke = match kx {
                KeyExchangeAlg::Ecdhe => ClientKeyExchange::Ecdh(r.vec8()?.to_vec()),
                KeyExchangeAlg::Dhe => ClientKeyExchange::Dh(r.vec16()?.to_vec()),
                KeyExchangeAlg::Rsa => ClientKeyExchange::Rsa(r.vec16()?.to_vec()),
            };
            r.expect_empty()?;
            HandshakePayload::ClientKeyExchange(cke)
        }
        HandshakeType::CertificateRequest => match ctx.version {
            TlsVersion::Tls13 => {
                let context = r.vec8()?.to_vec();
                let extensions =
                    read_extensions(r.vec16()?, ExtensionContext::CertificateRequest)?;
                r.expect_empty()?;
                HandshakePayload::CertificateRequest(CertificateRequest::Tls13 {
                    context,
                    extensions,
                })
            }
            TlsVersion::Tls12 => {
                let cert_types = r.vec8()?.to_vec();
                let mut list = Reader::new(r.vec16()?);
                let mut schemes = Vec::new();
                while !list.is_empty() {
                    schemes.push(SignatureScheme(list.get_u16()?));
                }
                let mut names_r = Reader::new(r.vec16()?);
                let mut ca_names = Vec::new();
                while !names_r.is_empty() {
                    ca_names.push(names_r.vec16()?.to_vec());
                }
                r.expect_empty()?;
                HandshakePayload::CertificateRequest(CertificateRequest::Tls12 {
                    cert_types,
                    schemes,
                    ca_names,
                })
            }
        },
        HandshakeType::NewSessionTicket => match ctx.version {
            TlsVersion::Tls13 => {
                let lifetime = r.get_u32()?;
                let age_add = r.get_u32()?;
                let nonce = r.vec8()?.to_vec();
                let ticket = r.vec16()?.to_vec();
                let extensions =
                    read_extensions(r.vec16()?, ExtensionContext::NewSessionTicket)?;
                r.expect_empty()?;
                HandshakePayload::NewSessionTicket13(NewSessionTicket13 {
                    lifetime,
                    age_add,
                    nonce,
                    ticket,
                    extensions,
                })
            }
            TlsVersion::Tls12 => {
                let lifetime_hint = r.get_u32()?;
                let ticket = r.vec16()?.to_vec();
                r.expect_empty()?;
                HandshakePayload::NewSessionTicket12(NewSessionTicket12 {
                    lifetime_hint,
                    ticket,
                })
            }
        },
        HandshakeType::EndOfEarlyData => {
            r.expect_empty()?;
            HandshakePayload::EndOfEarlyData
        }
        HandshakeType::Finished => HandshakePayload::Finished(Finished {
            verify_data: r.rest().to_vec(),
        }),
        HandshakeType::KeyUpdate => {
            let v = r.get_u8()?;
            r.expect_empty()?;
            if v > 1 {
                return Err(TlsError::DecodeError(format!("bad KeyUpdate value {v}")));
            }
            HandshakePayload::KeyUpdate(KeyUpdateRequest {
                update_requested: v == 1,
            })
        }
        HandshakeType::MessageHash => {
            return Err(TlsError::DecodeError(
                "message_hash is not a wire message".into(),
            ))
        }
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_ctx(version: TlsVersion, kx: Option<KeyExchangeAlg>) -> DecodeContext {
        DecodeContext { version, kx }
    }

    fn round_trip(payload: HandshakePayload, ctx: DecodeContext) {
        let wire = payload.encode().unwrap();
        let msg_type = HandshakeType::from_u8(wire[0]).unwrap();
        let decoded = decode_handshake(ctx, msg_type, &wire[4..]).unwrap();
        assert_eq!(decoded, payload);
    }

    // Minimal ClientHello: one cipher suite, null compression, no
    // extension block at all.
    #[test]
    fn test_client_hello_fixed_vector() {
        let ch = HandshakePayload::ClientHello(ClientHello {
            legacy_version: 0x0301,
            random: {
                let mut r = [0u8; 32];
                for (i, b) in r.iter_mut().enumerate() {
                    *b = (i + 1) as u8;
                }
                r
            },
            session_id: Vec::new(),
            cipher_suites: vec![CipherSuite(0x0005)],
            compression_methods: vec![0],
            extensions: Vec::new(),
        });
        let wire = ch.encode().unwrap();
        let mut expected = vec![0x01, 0x00, 0x00, 41, 0x03, 0x01];
        expected.extend((1u8..=32).collect::<Vec<u8>>());
        expected.extend_from_slice(&[0x00, 0x00, 0x02, 0x00, 0x05, 0x01, 0x00]);
        assert_eq!(wire, expected);
        round_trip(ch, decode_ctx(TlsVersion::Tls13, None));
    }

    #[test]
    fn test_server_hello_round_trip() {
        round_trip(
            HandshakePayload::ServerHello(ServerHello {
                legacy_version: 0x0303,
                random: [0x5a; 32],
                session_id_echo: vec![1, 2, 3],
                cipher_suite: CipherSuite::TLS_AES_128_GCM_SHA256,
                compression_method: 0,
                extensions: vec![ExtensionPayload::SupportedVersionsServer(0x0304)],
            }),
            decode_ctx(TlsVersion::Tls13, None),
        );
    }

    #[test]
    fn test_hello_retry_request_detection() {
        let sh = ServerHello {
            legacy_version: 0x0303,
            random: HELLO_RETRY_REQUEST_RANDOM,
            session_id_echo: Vec::new(),
            cipher_suite: CipherSuite::TLS_AES_128_GCM_SHA256,
            compression_method: 0,
            extensions: vec![ExtensionPayload::KeyShareHelloRetry(
                crate::crypt::NamedGroup::SECP256R1,
            )],
        };
        assert!(sh.is_hello_retry_request());
        // The HRR key_share form only parses under the HRR context, which
        // the decoder selects from the sentinel random.
        round_trip(
            HandshakePayload::ServerHello(sh),
            decode_ctx(TlsVersion::Tls13, None),
        );
    }

    #[test]
    fn test_certificate_both_versions() {
        round_trip(
            HandshakePayload::Certificate13(Certificate13 {
                context: vec![0xAA],
                entries: vec![CertificateEntry {
                    cert_data: vec![0x30, 0x82, 0x01, 0x00],
                    extensions: Vec::new(),
                }],
            }),
            decode_ctx(TlsVersion::Tls13, None),
        );
        round_trip(
            HandshakePayload::Certificate12(Certificate12 {
                chain: vec![vec![0x30, 0x10], vec![0x30, 0x20]],
            }),
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Ecdhe)),
        );
    }

    #[test]
    fn test_server_key_exchange_ecdhe() {
        let ske = ServerKeyExchange {
            params: ServerKeyExchangeParams::Ecdhe {
                group: NamedGroup::SECP256R1,
                public: vec![0x04; 65],
            },
            scheme: SignatureScheme::RSA_PKCS1_SHA256,
            signature: vec![0xCC; 256],
        };
        let signed = ske.params_bytes().unwrap();
        assert_eq!(signed[0], NAMED_CURVE_TYPE);
        assert_eq!(&signed[1..3], &NamedGroup::SECP256R1.0.to_be_bytes());
        round_trip(
            HandshakePayload::ServerKeyExchange(ske),
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Ecdhe)),
        );
    }

    #[test]
    fn test_server_key_exchange_dhe() {
        round_trip(
            HandshakePayload::ServerKeyExchange(ServerKeyExchange {
                params: ServerKeyExchangeParams::Dhe {
                    p: vec![0xFF; 256],
                    g: vec![2],
                    public: vec![0xAB; 256],
                },
                scheme: SignatureScheme::RSA_PKCS1_SHA384,
                signature: vec![0xCD; 256],
            }),
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Dhe)),
        );
    }

    #[test]
    fn test_client_key_exchange_forms() {
        round_trip(
            HandshakePayload::ClientKeyExchange(ClientKeyExchange::Ecdh(vec![0x04; 65])),
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Ecdhe)),
        );
        round_trip(
            HandshakePayload::ClientKeyExchange(ClientKeyExchange::Dh(vec![0xAB; 256])),
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Dhe)),
        );
        round_trip(
            HandshakePayload::ClientKeyExchange(ClientKeyExchange::Rsa(vec![0xCD; 256])),
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Rsa)),
        );
    }

    #[test]
    fn test_new_session_ticket_both_versions() {
        round_trip(
            HandshakePayload::NewSessionTicket13(NewSessionTicket13 {
                lifetime: 7200,
                age_add: 0x12345678,
                nonce: vec![0, 0, 0, 1],
                ticket: vec![0xEE; 64],
                extensions: vec![ExtensionPayload::EarlyDataMaxSize(16384)],
            }),
            decode_ctx(TlsVersion::Tls13, None),
        );
        round_trip(
            HandshakePayload::NewSessionTicket12(NewSessionTicket12 {
                lifetime_hint: 3600,
                ticket: vec![0xDD; 48],
            }),
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Ecdhe)),
        );
    }

    #[test]
    fn test_empty_body_messages() {
        round_trip(
            HandshakePayload::ServerHelloDone,
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Ecdhe)),
        );
        round_trip(
            HandshakePayload::EndOfEarlyData,
            decode_ctx(TlsVersion::Tls13, None),
        );
    }

    #[test]
    fn test_key_update_values() {
        round_trip(
            HandshakePayload::KeyUpdate(KeyUpdateRequest {
                update_requested: true,
            }),
            decode_ctx(TlsVersion::Tls13, None),
        );
        let bad = decode_handshake(
            decode_ctx(TlsVersion::Tls13, None),
            HandshakeType::KeyUpdate,
            &[2],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let shd = decode_handshake(
            decode_ctx(TlsVersion::Tls12, Some(KeyExchangeAlg::Ecdhe)),
            HandshakeType::ServerHelloDone,
            &[0x00],
        );
        assert!(shd.is_err());

        let ku = decode_handshake(
            decode_ctx(TlsVersion::Tls13, None),
            HandshakeType::KeyUpdate,
            &[0x00, 0x00],
        );
        assert!(ku.is_err());
    }
}
