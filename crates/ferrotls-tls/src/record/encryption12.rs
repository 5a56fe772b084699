//! TLS 1.2 AES-GCM record protection (RFC 5288).
//!
//! The nonce is the four-byte salt from the key block followed by an
//! eight-byte explicit part carried in the fragment. The additional data
//! covers the sequence number and the plaintext record header.

use ferrotls_crypto::modes::AesGcm;
use ferrotls_crypto::provider::Aead;
use ferrotls_types::TlsError;
use zeroize::Zeroize;

use super::ContentType;
use crate::crypt::key_schedule12::DirectionKeys;
use crate::crypt::Tls12CipherSuiteParams;

pub const GCM12_EXPLICIT_NONCE_LEN: usize = 8;

pub struct Gcm12Protection {
    aead: AesGcm,
    fixed_iv: Vec<u8>,
    seq: u64,
    tag_len: usize,
}

impl Drop for Gcm12Protection {
    fn drop(&mut self) {
        self.fixed_iv.zeroize();
    }
}

fn record_aad(seq: u64, content_type: ContentType, plaintext_len: usize) -> [u8; 13] {
    let mut aad = [0u8; 13];
    aad[..8].copy_from_slice(&seq.to_be_bytes());
    aad[8] = content_type as u8;
    aad[9] = 0x03;
    aad[10] = 0x03;
    aad[11] = (plaintext_len >> 8) as u8;
    aad[12] = plaintext_len as u8;
    aad
}

impl Gcm12Protection {
    pub fn new(params: &Tls12CipherSuiteParams, keys: &DirectionKeys<'_>) -> Result<Self, TlsError> {
        let aead = AesGcm::new(keys.key)?;
        Ok(Self {
            aead,
            fixed_iv: keys.iv.to_vec(),
            seq: 0,
            tag_len: params.tag_len,
        })
    }

    fn next_seq(&mut self) -> Result<u64, TlsError> {
        if self.seq == u64::MAX {
            return Err(TlsError::RecordError(
                "sequence number exhausted".to_string(),
            ));
        }
        let seq = self.seq;
        self.seq += 1;
        Ok(seq)
    }

    /// Returns explicit_nonce || ciphertext || tag.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let seq = self.next_seq()?;
        let explicit = seq.to_be_bytes();
        let mut nonce = Vec::with_capacity(self.fixed_iv.len() + explicit.len());
        nonce.extend_from_slice(&self.fixed_iv);
        nonce.extend_from_slice(&explicit);

        let aad = record_aad(seq, content_type, payload.len());
        let sealed = self.aead.seal(&nonce, &aad, payload)?;

        let mut out = Vec::with_capacity(explicit.len() + sealed.len());
        out.extend_from_slice(&explicit);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    pub fn open(
        &mut self,
        content_type: ContentType,
        fragment: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        if fragment.len() < GCM12_EXPLICIT_NONCE_LEN + self.tag_len {
            return Err(TlsError::RecordError("fragment too short".to_string()));
        }
        let seq = self.next_seq()?;
        let (explicit, sealed) = fragment.split_at(GCM12_EXPLICIT_NONCE_LEN);
        let mut nonce = Vec::with_capacity(self.fixed_iv.len() + explicit.len());
        nonce.extend_from_slice(&self.fixed_iv);
        nonce.extend_from_slice(explicit);

        let plaintext_len = sealed.len() - self.tag_len;
        let aad = record_aad(seq, content_type, plaintext_len);
        self.aead
            .open(&nonce, &aad, sealed)
            .map_err(|_| TlsError::RecordError("bad record MAC".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CipherSuite;

    fn setup() -> (Gcm12Protection, Gcm12Protection) {
        let params = Tls12CipherSuiteParams::from_suite(
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        )
        .unwrap();
        let key = [0x5au8; 16];
        let iv = [0xa5u8; 4];
        let keys = DirectionKeys {
            mac_key: &[],
            key: &key,
            iv: &iv,
        };
        (
            Gcm12Protection::new(&params, &keys).unwrap(),
            Gcm12Protection::new(&params, &keys).unwrap(),
        )
    }

    #[test]
    fn test_seal_open_round_trip() {
        let (mut sealer, mut opener) = setup();
        let sealed = sealer.seal(ContentType::ApplicationData, b"payload").unwrap();
        assert_eq!(sealed.len(), 8 + 7 + 16);
        assert_eq!(&sealed[..8], &0u64.to_be_bytes());
        let pt = opener.open(ContentType::ApplicationData, &sealed).unwrap();
        assert_eq!(pt, b"payload");
    }

    #[test]
    fn test_wrong_content_type_fails() {
        let (mut sealer, mut opener) = setup();
        let sealed = sealer.seal(ContentType::Handshake, b"finished").unwrap();
        assert!(opener.open(ContentType::ApplicationData, &sealed).is_err());
    }

    #[test]
    fn test_out_of_order_fails() {
        let (mut sealer, mut opener) = setup();
        let _first = sealer.seal(ContentType::ApplicationData, b"a").unwrap();
        let second = sealer.seal(ContentType::ApplicationData, b"b").unwrap();
        // Opener expects sequence number 0, record was sealed with 1.
        assert!(opener.open(ContentType::ApplicationData, &second).is_err());
    }

    #[test]
    fn test_short_fragment_rejected() {
        let (_, mut opener) = setup();
        assert!(opener.open(ContentType::ApplicationData, &[0u8; 10]).is_err());
    }
}
