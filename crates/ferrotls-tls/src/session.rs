//! Session resumption state, the session cache and ticket sealing.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ferrotls_crypto::modes::AesGcm;
use ferrotls_crypto::provider::Aead;
use zeroize::Zeroize;

use crate::codec::{Encoder, Reader};
use crate::{CipherSuite, TlsVersion};

pub const TICKET_KEY_LEN: usize = 32;
const TICKET_NONCE_LEN: usize = 12;

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Everything needed to resume a connection: the TLS 1.3 PSK or the
/// TLS 1.2 master secret, plus the ticket that names it.
#[derive(Debug, Clone)]
pub struct TlsSession {
    pub version: TlsVersion,
    pub cipher_suite: CipherSuite,
    /// Resumption PSK for TLS 1.3, master secret for TLS 1.2.
    pub secret: Vec<u8>,
    pub ticket: Vec<u8>,
    pub lifetime: u32,
    pub age_add: u32,
    pub max_early_data: u32,
    pub created_at: u64,
}

impl Drop for TlsSession {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl TlsSession {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.created_at.saturating_add(u64::from(self.lifetime))
    }

    /// Milliseconds since issuance, obfuscated with age_add as the
    /// pre_shared_key extension expects.
    pub fn obfuscated_age(&self, now: u64) -> u32 {
        let age_ms = now.saturating_sub(self.created_at).saturating_mul(1000) as u32;
        age_ms.wrapping_add(self.age_add)
    }
}

/// Storage keyed by ticket (or session id) bytes.
pub trait SessionCache: Send + Sync {
    fn put(&mut self, key: Vec<u8>, session: TlsSession);
    fn get(&mut self, key: &[u8]) -> Option<TlsSession>;
    fn remove(&mut self, key: &[u8]);
}

/// Bounded in-memory cache with lazy expiry. Inserting past capacity
/// evicts the oldest entry.
pub struct InMemorySessionCache {
    entries: HashMap<Vec<u8>, TlsSession>,
    max_size: usize,
    ttl: Duration,
}

impl InMemorySessionCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_size: max_size.max(1),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_expired(&self, session: &TlsSession, now: u64) -> bool {
        session.is_expired(now)
            || now >= session.created_at.saturating_add(self.ttl.as_secs())
    }

    /// Drop every expired entry.
    pub fn cleanup(&mut self) {
        let now = unix_now();
        let ttl = self.ttl.as_secs();
        self.entries.retain(|_, s| {
            !s.is_expired(now) && now < s.created_at.saturating_add(ttl)
        });
    }
}

impl SessionCache for InMemorySessionCache {
    fn put(&mut self, key: Vec<u8>, session: TlsSession) {
        if self.entries.len() >= self.max_size && !self.entries.contains_key(&key) {
            self.cleanup();
            if self.entries.len() >= self.max_size {
                if let Some(oldest) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, s)| s.created_at)
                    .map(|(k, _)| k.clone())
                {
                    self.entries.remove(&oldest);
                }
            }
        }
        self.entries.insert(key, session);
    }

    fn get(&mut self, key: &[u8]) -> Option<TlsSession> {
        let now = unix_now();
        let expired = match self.entries.get(key) {
            Some(session) => self.entry_expired(session, now),
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).cloned()
    }

    fn remove(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }
}

/// Serialize resumption state for embedding in a self-contained ticket.
pub fn encode_session_state(session: &TlsSession) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.put_u16(session.version.wire());
    enc.put_u16(session.cipher_suite.0);
    // Secrets are hash-sized, far below the one-byte prefix limit.
    let _ = enc.put_vec8(&session.secret);
    enc.put_u32(session.lifetime);
    enc.put_u32(session.age_add);
    enc.put_u32(session.max_early_data);
    enc.put_u64(session.created_at);
    enc.finish()
}

pub fn decode_session_state(data: &[u8]) -> Option<TlsSession> {
    let mut r = Reader::new(data);
    let version = TlsVersion::from_wire(r.get_u16().ok()?)?;
    let cipher_suite = CipherSuite(r.get_u16().ok()?);
    let secret = r.vec8().ok()?.to_vec();
    let lifetime = r.get_u32().ok()?;
    let age_add = r.get_u32().ok()?;
    let max_early_data = r.get_u32().ok()?;
    let created_at = r.get_u64().ok()?;
    r.expect_empty().ok()?;
    Some(TlsSession {
        version,
        cipher_suite,
        secret,
        ticket: Vec::new(),
        lifetime,
        age_add,
        max_early_data,
        created_at,
    })
}

/// Seal ticket state under the server ticket key. Output is
/// nonce || ciphertext || tag.
pub fn encrypt_session_ticket(key: &[u8; TICKET_KEY_LEN], state: &[u8]) -> Option<Vec<u8>> {
    let mut nonce = [0u8; TICKET_NONCE_LEN];
    getrandom::getrandom(&mut nonce).ok()?;
    let aead = AesGcm::new(key).ok()?;
    let sealed = aead.seal(&nonce, &[], state).ok()?;
    let mut out = Vec::with_capacity(TICKET_NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Some(out)
}

/// Open a ticket sealed by `encrypt_session_ticket`. Any failure, from a
/// rotated key to truncation, yields None so the server falls back to a
/// full handshake.
pub fn decrypt_session_ticket(key: &[u8; TICKET_KEY_LEN], ticket: &[u8]) -> Option<Vec<u8>> {
    if ticket.len() <= TICKET_NONCE_LEN {
        return None;
    }
    let (nonce, sealed) = ticket.split_at(TICKET_NONCE_LEN);
    let aead = AesGcm::new(key).ok()?;
    aead.open(nonce, &[], sealed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(created_at: u64, lifetime: u32) -> TlsSession {
        TlsSession {
            version: TlsVersion::Tls13,
            cipher_suite: CipherSuite::TLS_AES_128_GCM_SHA256,
            secret: vec![0x42; 32],
            ticket: vec![1, 2, 3],
            lifetime,
            age_add: 0x11223344,
            max_early_data: 16384,
            created_at,
        }
    }

    #[test]
    fn test_session_expiry() {
        let s = session(1000, 60);
        assert!(!s.is_expired(1059));
        assert!(s.is_expired(1060));
    }

    #[test]
    fn test_obfuscated_age() {
        let s = session(1000, 7200);
        assert_eq!(s.obfuscated_age(1010), 10_000u32.wrapping_add(0x11223344));
    }

    #[test]
    fn test_cache_put_get_remove() {
        let mut cache = InMemorySessionCache::new(10, Duration::from_secs(3600));
        cache.put(vec![1], session(unix_now(), 7200));
        assert_eq!(cache.len(), 1);
        let got = cache.get(&[1]).unwrap();
        assert_eq!(got.secret, vec![0x42; 32]);
        assert!(cache.get(&[2]).is_none());
        cache.remove(&[1]);
        assert!(cache.get(&[1]).is_none());
    }

    #[test]
    fn test_cache_expired_entry_dropped_on_get() {
        let mut cache = InMemorySessionCache::new(10, Duration::from_secs(3600));
        cache.put(vec![1], session(unix_now().saturating_sub(100), 60));
        assert!(cache.get(&[1]).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_eviction_at_capacity() {
        let mut cache = InMemorySessionCache::new(2, Duration::from_secs(3600));
        let now = unix_now();
        cache.put(vec![1], session(now.saturating_sub(30), 7200));
        cache.put(vec![2], session(now.saturating_sub(20), 7200));
        cache.put(vec![3], session(now.saturating_sub(10), 7200));
        assert_eq!(cache.len(), 2);
        // The oldest entry made way.
        assert!(cache.get(&[1]).is_none());
        assert!(cache.get(&[2]).is_some());
        assert!(cache.get(&[3]).is_some());
    }

    #[test]
    fn test_cleanup_removes_stale_entries() {
        let mut cache = InMemorySessionCache::new(10, Duration::from_secs(50));
        let now = unix_now();
        cache.put(vec![1], session(now.saturating_sub(100), 7200));
        cache.put(vec![2], session(now, 7200));
        cache.cleanup();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_state_round_trip() {
        let s = session(123456, 7200);
        let encoded = encode_session_state(&s);
        let decoded = decode_session_state(&encoded).unwrap();
        assert_eq!(decoded.version, s.version);
        assert_eq!(decoded.cipher_suite, s.cipher_suite);
        assert_eq!(decoded.secret, s.secret);
        assert_eq!(decoded.age_add, s.age_add);
        assert_eq!(decoded.max_early_data, s.max_early_data);
        assert_eq!(decoded.created_at, s.created_at);
    }

    #[test]
    fn test_state_trailing_bytes_rejected() {
        let mut encoded = encode_session_state(&session(1, 2));
        encoded.push(0);
        assert!(decode_session_state(&encoded).is_none());
    }

    #[test]
    fn test_ticket_seal_open() {
        let key = [0x5au8; TICKET_KEY_LEN];
        let state = encode_session_state(&session(99, 7200));
        let ticket = encrypt_session_ticket(&key, &state).unwrap();
        assert_ne!(ticket, state);
        assert_eq!(decrypt_session_ticket(&key, &ticket).unwrap(), state);
    }

    #[test]
    fn test_ticket_wrong_key_or_tampered() {
        let key = [0x5au8; TICKET_KEY_LEN];
        let other_key = [0xa5u8; TICKET_KEY_LEN];
        let state = encode_session_state(&session(99, 7200));
        let mut ticket = encrypt_session_ticket(&key, &state).unwrap();
        assert!(decrypt_session_ticket(&other_key, &ticket).is_none());
        let last = ticket.len() - 1;
        ticket[last] ^= 1;
        assert!(decrypt_session_ticket(&key, &ticket).is_none());
        assert!(decrypt_session_ticket(&key, &[0u8; 5]).is_none());
    }
}
