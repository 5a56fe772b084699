//! Running handshake transcript hash.
//!
//! Messages are buffered rather than hashed incrementally: the hash
//! algorithm is only known once the cipher suite is negotiated, and the
//! HelloRetryRequest path replaces the transcript prefix with a synthetic
//! message_hash construct, which requires replaying from the start anyway.

use ferrotls_types::{HashAlgId, TlsError};

use crate::handshake::HandshakeType;

#[derive(Debug, Clone)]
pub struct TranscriptHash {
    alg: Option<HashAlgId>,
    buffer: Vec<u8>,
}

impl TranscriptHash {
    /// Start a transcript before the hash algorithm is negotiated.
    pub fn new() -> Self {
        Self {
            alg: None,
            buffer: Vec::new(),
        }
    }

    pub fn with_alg(alg: HashAlgId) -> Self {
        Self {
            alg: Some(alg),
            buffer: Vec::new(),
        }
    }

    /// Fix the hash once the cipher suite is known. Already-buffered
    /// messages are covered retroactively.
    pub fn set_alg(&mut self, alg: HashAlgId) {
        self.alg = Some(alg);
    }

    pub fn alg(&self) -> Option<HashAlgId> {
        self.alg
    }

    /// Append a full handshake message (header included).
    pub fn update(&mut self, message: &[u8]) {
        self.buffer.extend_from_slice(message);
    }

    /// Hash of everything appended so far.
    pub fn current_hash(&self) -> Result<Vec<u8>, TlsError> {
        let alg = self
            .alg
            .ok_or_else(|| TlsError::HandshakeFailed("transcript hash not negotiated".into()))?;
        Ok(ferrotls_crypto::hash::hash(alg, &self.buffer)?)
    }

    /// Hash of the empty string under the negotiated algorithm.
    pub fn empty_hash(&self) -> Result<Vec<u8>, TlsError> {
        let alg = self
            .alg
            .ok_or_else(|| TlsError::HandshakeFailed("transcript hash not negotiated".into()))?;
        Ok(ferrotls_crypto::hash::hash(alg, &[])?)
    }

    /// HelloRetryRequest transcript surgery (RFC 8446 section 4.4.1):
    /// replace the buffered ClientHello1 with
    /// `message_hash || 00 00 || Hash.length || Hash(ClientHello1)`.
    pub fn replace_with_message_hash(&mut self) -> Result<(), TlsError> {
        let hash = self.current_hash()?;
        let mut synthetic = Vec::with_capacity(4 + hash.len());
        synthetic.push(HandshakeType::MessageHash as u8);
        synthetic.extend_from_slice(&[0, 0, hash.len() as u8]);
        synthetic.extend_from_slice(&hash);
        self.buffer = synthetic;
        Ok(())
    }

    /// The raw buffered messages, for TLS 1.2 session-hash uses.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

impl Default for TranscriptHash {
    fn default() -> Self {
        Self::new()
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
    fn test_empty_sha256() {
        let th = TranscriptHash::with_alg(HashAlgId::Sha256);
        assert_eq!(
            th.current_hash().unwrap(),
            hex("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_empty_sha384() {
        let th = TranscriptHash::with_alg(HashAlgId::Sha384);
        assert_eq!(
            th.current_hash().unwrap(),
            hex(
                "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da\
                 274edebfe76f65fbd51ad2f14898b95b"
            )
        );
    }

    #[test]
    fn test_alg_set_after_buffering() {
        let mut th = TranscriptHash::new();
        th.update(b"hello");
        assert!(th.current_hash().is_err());
        th.set_alg(HashAlgId::Sha256);
        let expected = ferrotls_crypto::hash::hash(HashAlgId::Sha256, b"hello").unwrap();
        assert_eq!(th.current_hash().unwrap(), expected);
    }

    #[test]
    fn test_message_hash_replacement() {
        let mut th = TranscriptHash::with_alg(HashAlgId::Sha256);
        th.update(b"first client hello bytes");
        let before = th.current_hash().unwrap();

        th.replace_with_message_hash().unwrap();
        let after = th.current_hash().unwrap();
        assert_ne!(before, after);

        // Hash(254 || 0 || 0 || 32 || Hash(CH1)) must equal the new value.
        let mut synthetic = vec![254, 0, 0, 32];
        synthetic.extend_from_slice(&before);
        let expected = ferrotls_crypto::hash::hash(HashAlgId::Sha256, &synthetic).unwrap();
        assert_eq!(after, expected);
    }

    #[test]
    fn test_updates_accumulate() {
        let mut th = TranscriptHash::with_alg(HashAlgId::Sha256);
        th.update(b"one");
        th.update(b"two");
        let joined = ferrotls_crypto::hash::hash(HashAlgId::Sha256, b"onetwo").unwrap();
        assert_eq!(th.current_hash().unwrap(), joined);
    }
}
