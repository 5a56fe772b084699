//! TLS 1.2 CBC record protection with HMAC (RFC 5246 section 6.2.3.2).
//!
//! MAC-then-encrypt: the HMAC over the sequence number, record header and
//! plaintext is appended before padding. Each record carries a fresh random
//! explicit IV as the first cipher block.

use ferrotls_crypto::aes::{AesKey, AES_BLOCK_SIZE};
use ferrotls_crypto::hmac::Hmac;
use ferrotls_crypto::modes::{cbc_decrypt_blocks, cbc_encrypt_blocks};
use ferrotls_types::{HashAlgId, TlsError};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::ContentType;
use crate::crypt::key_schedule12::DirectionKeys;
use crate::crypt::Tls12CipherSuiteParams;

pub struct Cbc12Protection {
    cipher: AesKey,
    mac_key: Vec<u8>,
    mac_alg: HashAlgId,
    seq: u64,
}

impl Drop for Cbc12Protection {
    fn drop(&mut self) {
        self.mac_key.zeroize();
    }
}

fn record_mac(
    alg: HashAlgId,
    mac_key: &[u8],
    seq: u64,
    content_type: ContentType,
    payload: &[u8],
) -> Result<Vec<u8>, TlsError> {
    let mut input = Vec::with_capacity(13 + payload.len());
    input.extend_from_slice(&seq.to_be_bytes());
    input.push(content_type as u8);
    input.extend_from_slice(&[0x03, 0x03]);
    input.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    input.extend_from_slice(payload);
    Ok(Hmac::mac(alg, mac_key, &input)?)
}

impl Cbc12Protection {
    pub fn new(
        params: &Tls12CipherSuiteParams,
        keys: &DirectionKeys<'_>,
    ) -> Result<Self, TlsError> {
        let mac_alg = params
            .mac_alg
            .ok_or_else(|| TlsError::RecordError("cipher suite has no MAC".to_string()))?;
        Ok(Self {
            cipher: AesKey::new(keys.key)?,
            mac_key: keys.mac_key.to_vec(),
            mac_alg,
            seq: 0,
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

    /// Returns explicit_iv || encrypted(payload || mac || padding).
    pub fn seal(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let seq = self.next_seq()?;
        let mac = record_mac(self.mac_alg, &self.mac_key, seq, content_type, payload)?;

        let mut data = Vec::with_capacity(payload.len() + mac.len() + AES_BLOCK_SIZE);
        data.extend_from_slice(payload);
        data.extend_from_slice(&mac);
        // TLS padding: padding_length + 1 bytes, each equal to padding_length.
        let pad_len = AES_BLOCK_SIZE - 1 - (data.len() % AES_BLOCK_SIZE);
        data.resize(data.len() + pad_len + 1, pad_len as u8);

        let mut iv = [0u8; AES_BLOCK_SIZE];
        getrandom::getrandom(&mut iv)
            .map_err(|_| TlsError::RecordError("random generation failed".to_string()))?;
        cbc_encrypt_blocks(&self.cipher, &iv, &mut data)?;

        let mut out = Vec::with_capacity(AES_BLOCK_SIZE + data.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&data);
        Ok(out)
    }

    pub fn open(
        &mut self,
        content_type: ContentType,
        fragment: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let mac_len = self.mac_alg.output_size();
        // Minimum: IV plus one block of padding holding the MAC tail.
        if fragment.len() < 2 * AES_BLOCK_SIZE || (fragment.len() % AES_BLOCK_SIZE) != 0 {
            return Err(TlsError::RecordError("bad record MAC".to_string()));
        }
        let seq = self.next_seq()?;
        let (iv, ciphertext) = fragment.split_at(AES_BLOCK_SIZE);
        let mut data = ciphertext.to_vec();
        cbc_decrypt_blocks(&self.cipher, iv, &mut data)
            .map_err(|_| TlsError::RecordError("bad record MAC".to_string()))?;

        // Padding check runs over the claimed range regardless of validity so
        // a padding failure and a MAC failure take a similar path.
        let pad_len = data[data.len() - 1] as usize;
        let mut ok: u8 = if pad_len + 1 + mac_len <= data.len() { 1 } else { 0 };
        let check_len = pad_len.min(data.len() - 1);
        let pad_byte = pad_len as u8;
        for b in &data[data.len() - 1 - check_len..data.len() - 1] {
            ok &= b.ct_eq(&pad_byte).unwrap_u8();
        }
        if ok != 1 {
            return Err(TlsError::RecordError("bad record MAC".to_string()));
        }
        data.truncate(data.len() - pad_len - 1);

        if data.len() < mac_len {
            return Err(TlsError::RecordError("bad record MAC".to_string()));
        }
        let payload_len = data.len() - mac_len;
        let expected = record_mac(
            self.mac_alg,
            &self.mac_key,
            seq,
            content_type,
            &data[..payload_len],
        )?;
        if expected.ct_eq(&data[payload_len..]).unwrap_u8() != 1 {
            return Err(TlsError::RecordError("bad record MAC".to_string()));
        }
        data.truncate(payload_len);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CipherSuite;

    fn setup() -> (Cbc12Protection, Cbc12Protection) {
        let params = Tls12CipherSuiteParams::from_suite(
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256,
        )
        .unwrap();
        let mac_key = [0x0bu8; 32];
        let key = [0x5au8; 16];
        let keys = DirectionKeys {
            mac_key: &mac_key,
            key: &key,
            iv: &[],
        };
        (
            Cbc12Protection::new(&params, &keys).unwrap(),
            Cbc12Protection::new(&params, &keys).unwrap(),
        )
    }

    #[test]
    fn test_seal_open_round_trip() {
        let (mut sealer, mut opener) = setup();
        let sealed = sealer.seal(ContentType::ApplicationData, b"cbc payload").unwrap();
        assert_eq!(sealed.len() % AES_BLOCK_SIZE, 0);
        let pt = opener.open(ContentType::ApplicationData, &sealed).unwrap();
        assert_eq!(pt, b"cbc payload");
    }

    #[test]
    fn test_empty_payload() {
        let (mut sealer, mut opener) = setup();
        let sealed = sealer.seal(ContentType::ApplicationData, b"").unwrap();
        let pt = opener.open(ContentType::ApplicationData, &sealed).unwrap();
        assert!(pt.is_empty());
    }

    #[test]
    fn test_block_aligned_payload_round_trip() {
        let (mut sealer, mut opener) = setup();
        // Payload plus MAC lands exactly on a block boundary, forcing a
        // full block of padding.
        let payload = vec![0x41u8; 16];
        let sealed = sealer.seal(ContentType::ApplicationData, &payload).unwrap();
        let pt = opener.open(ContentType::ApplicationData, &sealed).unwrap();
        assert_eq!(pt, payload);
    }

    #[test]
    fn test_tamper_rejected() {
        let (mut sealer, mut opener) = setup();
        let mut sealed = sealer.seal(ContentType::ApplicationData, b"data").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        assert!(matches!(
            opener.open(ContentType::ApplicationData, &sealed),
            Err(TlsError::RecordError(_))
        ));
    }

    #[test]
    fn test_unaligned_fragment_rejected() {
        let (_, mut opener) = setup();
        assert!(opener.open(ContentType::ApplicationData, &[0u8; 33]).is_err());
    }
}
