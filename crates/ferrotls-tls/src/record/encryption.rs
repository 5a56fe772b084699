//! TLS 1.3 record protection (RFC 8446 section 5.2).
//!
//! The plaintext is wrapped as TLSInnerPlaintext (content || type || zeros),
//! the nonce is the static IV XORed with the sequence number, and the
//! additional data is the outer five-byte record header.

use ferrotls_crypto::modes::AesGcm;
use ferrotls_crypto::provider::Aead;
use ferrotls_types::TlsError;
use zeroize::Zeroize;

use super::ContentType;
use crate::crypt::traffic_keys::TrafficKeys;
use crate::crypt::CipherSuiteParams;

pub const TLS13_NONCE_LEN: usize = 12;

/// One direction of TLS 1.3 record protection.
pub struct Tls13Protection {
    aead: AesGcm,
    iv: Vec<u8>,
    seq: u64,
    tag_len: usize,
}

impl Drop for Tls13Protection {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

fn build_nonce(iv: &[u8], seq: u64) -> [u8; TLS13_NONCE_LEN] {
    let mut nonce = [0u8; TLS13_NONCE_LEN];
    nonce[4..].copy_from_slice(&seq.to_be_bytes());
    for (n, v) in nonce.iter_mut().zip(iv.iter()) {
        *n ^= v;
    }
    nonce
}

fn record_aad(ciphertext_len: usize) -> [u8; 5] {
    let len = ciphertext_len as u16;
    [
        ContentType::ApplicationData as u8,
        0x03,
        0x03,
        (len >> 8) as u8,
        len as u8,
    ]
}

impl Tls13Protection {
    pub fn new(params: &CipherSuiteParams, keys: &TrafficKeys) -> Result<Self, TlsError> {
        let aead = AesGcm::new(&keys.key)?;
        Ok(Self {
            aead,
            iv: keys.iv.clone(),
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

    /// Encrypt one record payload. Returns the protected fragment.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let seq = self.next_seq()?;
        let mut inner = Vec::with_capacity(payload.len() + 1);
        inner.extend_from_slice(payload);
        inner.push(content_type as u8);

        let nonce = build_nonce(&self.iv, seq);
        let aad = record_aad(inner.len() + self.tag_len);
        let sealed = self.aead.seal(&nonce, &aad, &inner)?;
        inner.zeroize();
        Ok(sealed)
    }

    /// Decrypt one protected fragment. Returns the inner content type and
    /// plaintext with padding removed.
    pub fn open(&mut self, fragment: &[u8]) -> Result<(ContentType, Vec<u8>), TlsError> {
        if self.seq == u64::MAX {
            return Err(TlsError::RecordError(
                "sequence number exhausted".to_string(),
            ));
        }
        let nonce = build_nonce(&self.iv, self.seq);
        let aad = record_aad(fragment.len());
        // The sequence number advances only on success, so a record that
        // fails to decrypt (rejected early data being skipped) does not
        // desynchronize the ones that follow.
        let mut inner = self
            .aead
            .open(&nonce, &aad, fragment)
            .map_err(|_| TlsError::RecordError("bad record MAC".to_string()))?;
        self.seq += 1;

        // Strip zero padding, then the trailing content type octet.
        let content_end = match inner.iter().rposition(|&b| b != 0) {
            Some(pos) => pos,
            None => {
                return Err(TlsError::RecordError(
                    "all-zero inner plaintext".to_string(),
                ))
            }
        };
        let content_type = ContentType::from_u8(inner[content_end])
            .ok_or_else(|| TlsError::RecordError("unknown inner content type".to_string()))?;
        inner.truncate(content_end);
        Ok((content_type, inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CipherSuite;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn params() -> CipherSuiteParams {
        CipherSuiteParams::from_suite(CipherSuite::TLS_AES_128_GCM_SHA256).unwrap()
    }

    #[test]
    fn test_nonce_xor() {
        let iv = hex("5d313eb2671276ee13000b30");
        assert_eq!(&build_nonce(&iv, 0)[..], &iv[..]);
        let n1 = build_nonce(&iv, 1);
        assert_eq!(n1[11], iv[11] ^ 1);
        assert_eq!(&n1[..11], &iv[..11]);
    }

    #[test]
    fn test_seal_open_round_trip() {
        let keys = TrafficKeys {
            key: hex("3fce516009c21727d0f2e4e86ee403bc"),
            iv: hex("5d313eb2671276ee13000b30"),
        };
        let mut sealer = Tls13Protection::new(&params(), &keys).unwrap();
        let mut opener = Tls13Protection::new(&params(), &keys).unwrap();

        let sealed = sealer.seal(ContentType::Handshake, b"hello record").unwrap();
        assert_eq!(sealed.len(), 12 + 1 + 16);
        let (ct, pt) = opener.open(&sealed).unwrap();
        assert_eq!(ct, ContentType::Handshake);
        assert_eq!(pt, b"hello record");
    }

    #[test]
    fn test_sequence_number_advances() {
        let keys = TrafficKeys {
            key: vec![0x11; 16],
            iv: vec![0x22; 12],
        };
        let mut sealer = Tls13Protection::new(&params(), &keys).unwrap();
        let a = sealer.seal(ContentType::ApplicationData, b"x").unwrap();
        let b = sealer.seal(ContentType::ApplicationData, b"x").unwrap();
        assert_ne!(a, b);

        let mut opener = Tls13Protection::new(&params(), &keys).unwrap();
        assert_eq!(opener.open(&a).unwrap().1, b"x");
        assert_eq!(opener.open(&b).unwrap().1, b"x");
    }

    #[test]
    fn test_tamper_rejected() {
        let keys = TrafficKeys {
            key: vec![0x11; 16],
            iv: vec![0x22; 12],
        };
        let mut sealer = Tls13Protection::new(&params(), &keys).unwrap();
        let mut sealed = sealer.seal(ContentType::Alert, &[1, 0]).unwrap();
        sealed[0] ^= 0x80;
        let mut opener = Tls13Protection::new(&params(), &keys).unwrap();
        assert!(matches!(
            opener.open(&sealed),
            Err(TlsError::RecordError(_))
        ));
    }

    #[test]
    fn test_padding_stripped() {
        // Build a sealed record whose inner plaintext carries zero padding
        // by sealing manually through the AEAD.
        let keys = TrafficKeys {
            key: vec![0x11; 16],
            iv: vec![0x22; 12],
        };
        let aead = AesGcm::new(&keys.key).unwrap();
        let mut inner = b"data".to_vec();
        inner.push(ContentType::ApplicationData as u8);
        inner.extend_from_slice(&[0u8; 7]);
        let nonce = build_nonce(&keys.iv, 0);
        let aad = record_aad(inner.len() + 16);
        let sealed = aead.seal(&nonce, &aad, &inner).unwrap();

        let mut opener = Tls13Protection::new(&params(), &keys).unwrap();
        let (ct, pt) = opener.open(&sealed).unwrap();
        assert_eq!(ct, ContentType::ApplicationData);
        assert_eq!(pt, b"data");
    }
}
