//! TLS record layer: framing, fragmentation limits and per-direction
//! protection state.

pub mod cbc;
pub mod encryption;
pub mod encryption12;
pub mod joiner;

use ferrotls_types::TlsError;

use crate::crypt::key_schedule12::DirectionKeys;
use crate::crypt::traffic_keys::TrafficKeys;
use crate::crypt::{CipherSuiteParams, Tls12CipherSuiteParams};

pub const RECORD_HEADER_LEN: usize = 5;
pub const MAX_PLAINTEXT_LEN: usize = 16384;
// Protected records may exceed the plaintext limit by the AEAD expansion.
pub const MAX_CIPHERTEXT_LEN: usize = MAX_PLAINTEXT_LEN + 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            20 => Some(Self::ChangeCipherSpec),
            21 => Some(Self::Alert),
            22 => Some(Self::Handshake),
            23 => Some(Self::ApplicationData),
            _ => None,
        }
    }
}

/// One record as read off the wire, fragment still protected.
#[derive(Debug, Clone)]
pub struct Record {
    pub content_type: ContentType,
    pub version: u16,
    pub fragment: Vec<u8>,
}

/// Parse one record from the front of `buf`. Returns the record and the
/// number of bytes consumed, or None if the buffer holds only a partial
/// record.
pub fn parse_record(buf: &[u8]) -> Result<Option<(Record, usize)>, TlsError> {
    if buf.len() < RECORD_HEADER_LEN {
        return Ok(None);
    }
    let content_type = ContentType::from_u8(buf[0])
        .ok_or_else(|| TlsError::RecordError(format!("unknown content type {}", buf[0])))?;
    let version = u16::from_be_bytes([buf[1], buf[2]]);
    let len = u16::from_be_bytes([buf[3], buf[4]]) as usize;
    if len > MAX_CIPHERTEXT_LEN {
        return Err(TlsError::RecordError("record overflow".to_string()));
    }
    if buf.len() < RECORD_HEADER_LEN + len {
        return Ok(None);
    }
    let fragment = buf[RECORD_HEADER_LEN..RECORD_HEADER_LEN + len].to_vec();
    Ok(Some((
        Record {
            content_type,
            version,
            fragment,
        },
        RECORD_HEADER_LEN + len,
    )))
}

pub fn serialize_record(content_type: ContentType, version: u16, fragment: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RECORD_HEADER_LEN + fragment.len());
    out.push(content_type as u8);
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(&(fragment.len() as u16).to_be_bytes());
    out.extend_from_slice(fragment);
    out
}

enum Protection {
    Tls13(encryption::Tls13Protection),
    Gcm12(encryption12::Gcm12Protection),
    Cbc12(cbc::Cbc12Protection),
}

/// Record layer state for one connection. Each direction starts in
/// plaintext and switches to protected operation when keys activate; every
/// activation resets that direction's sequence number.
pub struct RecordLayer {
    max_fragment_size: usize,
    write: Option<Protection>,
    read: Option<Protection>,
}

impl RecordLayer {
    pub fn new(max_fragment_size: usize) -> Self {
        Self {
            max_fragment_size: max_fragment_size.min(MAX_PLAINTEXT_LEN),
            write: None,
            read: None,
        }
    }

    pub fn max_fragment_size(&self) -> usize {
        self.max_fragment_size
    }

    pub fn write_protected(&self) -> bool {
        self.write.is_some()
    }

    pub fn read_protected(&self) -> bool {
        self.read.is_some()
    }

    pub fn activate_tls13_write(
        &mut self,
        params: &CipherSuiteParams,
        keys: &TrafficKeys,
    ) -> Result<(), TlsError> {
        self.write = Some(Protection::Tls13(encryption::Tls13Protection::new(
            params, keys,
        )?));
        Ok(())
    }

    pub fn activate_tls13_read(
        &mut self,
        params: &CipherSuiteParams,
        keys: &TrafficKeys,
    ) -> Result<(), TlsError> {
        self.read = Some(Protection::Tls13(encryption::Tls13Protection::new(
            params, keys,
        )?));
        Ok(())
    }

    pub fn activate_tls12_write(
        &mut self,
        params: &Tls12CipherSuiteParams,
        keys: &DirectionKeys<'_>,
    ) -> Result<(), TlsError> {
        self.write = Some(Self::tls12_protection(params, keys)?);
        Ok(())
    }

    pub fn activate_tls12_read(
        &mut self,
        params: &Tls12CipherSuiteParams,
        keys: &DirectionKeys<'_>,
    ) -> Result<(), TlsError> {
        self.read = Some(Self::tls12_protection(params, keys)?);
        Ok(())
    }

    fn tls12_protection(
        params: &Tls12CipherSuiteParams,
        keys: &DirectionKeys<'_>,
    ) -> Result<Protection, TlsError> {
        if params.is_cbc {
            Ok(Protection::Cbc12(cbc::Cbc12Protection::new(params, keys)?))
        } else {
            Ok(Protection::Gcm12(encryption12::Gcm12Protection::new(
                params, keys,
            )?))
        }
    }

    /// Produce one complete wire record for a payload no longer than the
    /// fragment limit.
    pub fn seal_record(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        if payload.len() > self.max_fragment_size {
            return Err(TlsError::RecordError("fragment too long".to_string()));
        }
        match &mut self.write {
            None => Ok(serialize_record(content_type, 0x0303, payload)),
            Some(Protection::Tls13(p)) => {
                let fragment = p.seal(content_type, payload)?;
                Ok(serialize_record(
                    ContentType::ApplicationData,
                    0x0303,
                    &fragment,
                ))
            }
            Some(Protection::Gcm12(p)) => {
                let fragment = p.seal(content_type, payload)?;
                Ok(serialize_record(content_type, 0x0303, &fragment))
            }
            Some(Protection::Cbc12(p)) => {
                let fragment = p.seal(content_type, payload)?;
                Ok(serialize_record(content_type, 0x0303, &fragment))
            }
        }
    }

    /// Recover the plaintext content of one parsed record.
    pub fn open_record(&mut self, record: Record) -> Result<(ContentType, Vec<u8>), TlsError> {
        match &mut self.read {
            None => {
                if record.fragment.len() > MAX_PLAINTEXT_LEN {
                    return Err(TlsError::RecordError("record overflow".to_string()));
                }
                Ok((record.content_type, record.fragment))
            }
            Some(Protection::Tls13(p)) => {
                // Unprotected change_cipher_spec records remain legal in the
                // middle of a protected handshake and are handled upstream.
                if record.content_type == ContentType::ChangeCipherSpec {
                    return Ok((record.content_type, record.fragment));
                }
                if record.content_type != ContentType::ApplicationData {
                    return Err(TlsError::RecordError(
                        "unprotected record after key activation".to_string(),
                    ));
                }
                p.open(&record.fragment)
            }
            Some(Protection::Gcm12(p)) => {
                let plaintext = p.open(record.content_type, &record.fragment)?;
                Ok((record.content_type, plaintext))
            }
            Some(Protection::Cbc12(p)) => {
                let plaintext = p.open(record.content_type, &record.fragment)?;
                Ok((record.content_type, plaintext))
            }
        }
    }
}
