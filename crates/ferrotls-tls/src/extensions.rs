//! Hello extension parsing and serialization.
//!
//! Several extension bodies change shape with the message that carries
//! them, so decoding is driven by an `ExtensionContext`. Unrecognized
//! extension types are preserved as opaque payloads rather than rejected.

use crate::codec::{CodecError, Encoder, Reader};
use crate::crypt::{NamedGroup, SignatureScheme};
use ferrotls_types::TlsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionType(pub u16);

impl ExtensionType {
    pub const SERVER_NAME: ExtensionType = ExtensionType(0);
    pub const SUPPORTED_GROUPS: ExtensionType = ExtensionType(10);
    pub const EC_POINT_FORMATS: ExtensionType = ExtensionType(11);
    pub const SIGNATURE_ALGORITHMS: ExtensionType = ExtensionType(13);
    pub const RECORD_SIZE_LIMIT: ExtensionType = ExtensionType(28);
    pub const SESSION_TICKET: ExtensionType = ExtensionType(35);
    pub const PRE_SHARED_KEY: ExtensionType = ExtensionType(41);
    pub const EARLY_DATA: ExtensionType = ExtensionType(42);
    pub const SUPPORTED_VERSIONS: ExtensionType = ExtensionType(43);
    pub const PSK_KEY_EXCHANGE_MODES: ExtensionType = ExtensionType(45);
    pub const KEY_SHARE: ExtensionType = ExtensionType(51);
    pub const RENEGOTIATION_INFO: ExtensionType = ExtensionType(0xFF01);
}

/// psk_ke / psk_dhe_ke mode codes (RFC 8446 section 4.2.9).
pub const PSK_MODE_KE: u8 = 0;
pub const PSK_MODE_DHE_KE: u8 = 1;

/// The message whose extension block is being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionContext {
    ClientHello,
    ServerHello,
    HelloRetryRequest,
    EncryptedExtensions,
    NewSessionTicket,
    CertificateRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub key_exchange: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskIdentity {
    pub identity: Vec<u8>,
    pub obfuscated_ticket_age: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionPayload {
    ServerName(String),
    SupportedGroups(Vec<NamedGroup>),
    EcPointFormats(Vec<u8>),
    SignatureAlgorithms(Vec<SignatureScheme>),
    SupportedVersionsClient(Vec<u16>),
    SupportedVersionsServer(u16),
    KeyShareClient(Vec<KeyShareEntry>),
    KeyShareServer(KeyShareEntry),
    KeyShareHelloRetry(NamedGroup),
    PskKeyExchangeModes(Vec<u8>),
    PreSharedKeyOffer {
        identities: Vec<PskIdentity>,
        binders: Vec<Vec<u8>>,
    },
    PreSharedKeySelected(u16),
    /// Empty marker in ClientHello and EncryptedExtensions.
    EarlyDataIndication,
    /// NewSessionTicket form carrying max_early_data_size.
    EarlyDataMaxSize(u32),
    SessionTicket(Vec<u8>),
    RenegotiationInfo(Vec<u8>),
    RecordSizeLimit(u16),
    Unknown {
        extension_type: u16,
        data: Vec<u8>,
    },
}

impl ExtensionPayload {
    pub fn extension_type(&self) -> u16 {
        match self {
            Self::ServerName(_) => ExtensionType::SERVER_NAME.0,
            Self::SupportedGroups(_) => ExtensionType::SUPPORTED_GROUPS.0,
            Self::EcPointFormats(_) => ExtensionType::EC_POINT_FORMATS.0,
            Self::SignatureAlgorithms(_) => ExtensionType::SIGNATURE_ALGORITHMS.0,
            Self::SupportedVersionsClient(_) | Self::SupportedVersionsServer(_) => {
                ExtensionType::SUPPORTED_VERSIONS.0
            }
            Self::KeyShareClient(_) | Self::KeyShareServer(_) | Self::KeyShareHelloRetry(_) => {
                ExtensionType::KEY_SHARE.0
            }
            Self::PskKeyExchangeModes(_) => ExtensionType::PSK_KEY_EXCHANGE_MODES.0,
            Self::PreSharedKeyOffer { .. } | Self::PreSharedKeySelected(_) => {
                ExtensionType::PRE_SHARED_KEY.0
            }
            Self::EarlyDataIndication | Self::EarlyDataMaxSize(_) => ExtensionType::EARLY_DATA.0,
            Self::SessionTicket(_) => ExtensionType::SESSION_TICKET.0,
            Self::RenegotiationInfo(_) => ExtensionType::RENEGOTIATION_INFO.0,
            Self::RecordSizeLimit(_) => ExtensionType::RECORD_SIZE_LIMIT.0,
            Self::Unknown { extension_type, .. } => *extension_type,
        }
    }

    fn encode_data(&self) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::new();
        match self {
            Self::ServerName(name) => {
                if !name.is_empty() {
                    let mut entry = Encoder::new();
                    entry.put_u8(0); // host_name
                    entry.put_vec16(name.as_bytes())?;
                    enc.put_vec16(entry.as_slice())?;
                }
            }
            Self::SupportedGroups(groups) => {
                let mut list = Encoder::new();
                for g in groups {
                    list.put_u16(g.0);
                }
                enc.put_vec16(list.as_slice())?;
            }
            Self::EcPointFormats(formats) => {
                enc.put_vec8(formats)?;
            }
            Self::SignatureAlgorithms(schemes) => {
                let mut list = Encoder::new();
                for s in schemes {
                    list.put_u16(s.0);
                }
                enc.put_vec16(list.as_slice())?;
            }
            Self::SupportedVersionsClient(versions) => {
                let mut list = Encoder::new();
                for v in versions {
                    list.put_u16(*v);
                }
                enc.put_vec8(list.as_slice())?;
            }
            Self::SupportedVersionsServer(v) => {
                enc.put_u16(*v);
            }
            Self::KeyShareClient(entries) => {
                let mut list = Encoder::new();
                for e in entries {
                    list.put_u16(e.group.0);
                    list.put_vec16(&e.key_exchange)?;
                }
                enc.put_vec16(list.as_slice())?;
            }
            Self::KeyShareServer(entry) => {
                enc.put_u16(entry.group.0);
                enc.put_vec16(&entry.key_exchange)?;
            }
            Self::KeyShareHelloRetry(group) => {
                enc.put_u16(group.0);
            }
            Self::PskKeyExchangeModes(modes) => {
                enc.put_vec8(modes)?;
            }
            Self::PreSharedKeyOffer {
                identities,
                binders,
            } => {
                let mut ids = Encoder::new();
                for id in identities {
                    ids.put_vec16(&id.identity)?;
                    ids.put_u32(id.obfuscated_ticket_age);
                }
                enc.put_vec16(ids.as_slice())?;
                let mut bs = Encoder::new();
                for b in binders {
                    bs.put_vec8(b)?;
                }
                enc.put_vec16(bs.as_slice())?;
            }
            Self::PreSharedKeySelected(index) => {
                enc.put_u16(*index);
            }
            Self::EarlyDataIndication => {}
            Self::EarlyDataMaxSize(max) => {
                enc.put_u32(*max);
            }
            Self::SessionTicket(ticket) => {
                enc.put_bytes(ticket);
            }
            Self::RenegotiationInfo(data) => {
                enc.put_vec8(data)?;
            }
            Self::RecordSizeLimit(limit) => {
                enc.put_u16(*limit);
            }
            Self::Unknown { data, .. } => {
                enc.put_bytes(data);
            }
        }
        Ok(enc.finish())
    }

    fn decode(
        ext_type: u16,
        data: &[u8],
        ctx: ExtensionContext,
    ) -> Result<Self, CodecError> {
        let mut r = Reader::new(data);
        let payload = match ExtensionType(ext_type) {
            ExtensionType::SERVER_NAME => {
                if r.is_empty() {
                    // The server acknowledges SNI with an empty body.
                    ExtensionPayload::ServerName(String::new())
                } else {
                    let mut list = Reader::new(r.vec16()?);
                    let name_type = list.get_u8()?;
                    if name_type != 0 {
                        return Err(CodecError::BadValue("server name type"));
                    }
                    let name = std::str::from_utf8(list.vec16()?)
                        .map_err(|_| CodecError::BadValue("server name"))?;
                    ExtensionPayload::ServerName(name.to_string())
                }
            }
            ExtensionType::SUPPORTED_GROUPS => {
                let mut list = Reader::new(r.vec16()?);
                let mut groups = Vec::new();
                while !list.is_empty() {
                    groups.push(NamedGroup(list.get_u16()?));
                }
                ExtensionPayload::SupportedGroups(groups)
            }
            ExtensionType::EC_POINT_FORMATS => {
                ExtensionPayload::EcPointFormats(r.vec8()?.to_vec())
            }
            ExtensionType::SIGNATURE_ALGORITHMS => {
                let mut list = Reader::new(r.vec16()?);
                let mut schemes = Vec::new();
                while !list.is_empty() {
                    schemes.push(SignatureScheme(list.get_u16()?));
                }
                ExtensionPayload::SignatureAlgorithms(schemes)
            }
            ExtensionType::SUPPORTED_VERSIONS => match ctx {
                ExtensionContext::ClientHello => {
                    let mut list = Reader::new(r.vec8()?);
                    let mut versions = Vec::new();
                    while !list.is_empty() {
                        versions.push(list.get_u16()?);
                    }
                    ExtensionPayload::SupportedVersionsClient(versions)
                }
                _ => ExtensionPayload::SupportedVersionsServer(r.get_u16()?),
            },
            ExtensionType::KEY_SHARE => match ctx {
                ExtensionContext::ClientHello => {
                    let mut list = Reader::new(r.vec16()?);
                    let mut entries = Vec::new();
                    while !list.is_empty() {
                        let group = NamedGroup(list.get_u16()?);
                        let key_exchange = list.vec16()?.to_vec();
                        entries.push(KeyShareEntry {
                            group,
                            key_exchange,
                        });
                    }
                    ExtensionPayload::KeyShareClient(entries)
                }
                ExtensionContext::HelloRetryRequest => {
                    ExtensionPayload::KeyShareHelloRetry(NamedGroup(r.get_u16()?))
                }
                _ => {
                    let group = NamedGroup(r.get_u16()?);
                    let key_exchange = r.vec16()?.to_vec();
                    ExtensionPayload::KeyShareServer(KeyShareEntry {
                        group,
                        key_exchange,
                    })
                }
            },
            ExtensionType::PSK_KEY_EXCHANGE_MODES => {
                ExtensionPayload::PskKeyExchangeModes(r.vec8()?.to_vec())
            }
            ExtensionType::PRE_SHARED_KEY => match ctx {
                ExtensionContext::ClientHello => {
                    let mut ids = Reader::new(r.vec16()?);
                    let mut identities = Vec::new();
                    while !ids.is_empty() {
                        let identity = ids.vec16()?.to_vec();
                        let obfuscated_ticket_age = ids.get_u32()?;
                        identities.push(PskIdentity {
                            identity,
                            obfuscated_ticket_age,
                        });
                    }
                    let mut bs = Reader::new(r.vec16()?);
                    let mut binders = Vec::new();
                    while !bs.is_empty() {
                        binders.push(bs.vec8()?.to_vec());
                    }
                    ExtensionPayload::PreSharedKeyOffer {
                        identities,
                        binders,
                    }
                }
                _ => ExtensionPayload::PreSharedKeySelected(r.get_u16()?),
            },
            ExtensionType::EARLY_DATA => match ctx {
                ExtensionContext::NewSessionTicket => {
                    ExtensionPayload::EarlyDataMaxSize(r.get_u32()?)
                }
                _ => ExtensionPayload::EarlyDataIndication,
            },
            ExtensionType::SESSION_TICKET => ExtensionPayload::SessionTicket(r.rest().to_vec()),
            ExtensionType::RENEGOTIATION_INFO => {
                ExtensionPayload::RenegotiationInfo(r.vec8()?.to_vec())
            }
            ExtensionType::RECORD_SIZE_LIMIT => ExtensionPayload::RecordSizeLimit(r.get_u16()?),
            _ => {
                return Ok(ExtensionPayload::Unknown {
                    extension_type: ext_type,
                    data: r.rest().to_vec(),
                })
            }
        };
        r.expect_empty()?;
        Ok(payload)
    }
}

/// Parse an extension block (contents of the outer 2-byte-length vector).
/// A trailing run shorter than one extension header is tolerated and
/// discarded; anything malformed inside a recognized extension is fatal.
pub fn read_extensions(
    block: &[u8],
    ctx: ExtensionContext,
) -> Result<Vec<ExtensionPayload>, TlsError> {
    let mut r = Reader::new(block);
    let mut out = Vec::new();
    while r.remaining() >= 4 {
        let ext_type = r.get_u16()?;
        let data = r.vec16()?;
        let payload = ExtensionPayload::decode(ext_type, data, ctx)?;
        if matches!(payload, ExtensionPayload::Unknown { .. }) {
            log::debug!("ignoring unknown extension type {ext_type}");
        }
        out.push(payload);
    }
    if !r.is_empty() {
        log::debug!("discarding {} trailing bytes after extensions", r.remaining());
    }
    Ok(out)
}

/// Serialize extensions, outer 2-byte length prefix included.
pub fn write_extensions(exts: &[ExtensionPayload]) -> Result<Vec<u8>, CodecError> {
    let mut block = Encoder::new();
    for ext in exts {
        block.put_u16(ext.extension_type());
        block.put_vec16(&ext.encode_data()?)?;
    }
    let mut out = Encoder::new();
    out.put_vec16(block.as_slice())?;
    Ok(out.finish())
}

/// Find the first extension of a given type.
pub fn find_extension<'a>(
    exts: &'a [ExtensionPayload],
    ext_type: ExtensionType,
) -> Option<&'a ExtensionPayload> {
    exts.iter().find(|e| e.extension_type() == ext_type.0)
}
