//! Reassembly of handshake messages from record fragments.
//!
//! Handshake messages may be split across records or packed several to a
//! record. The joiner buffers incoming handshake fragments and yields whole
//! messages, header included, once their four-byte header length is satisfied.

use ferrotls_types::TlsError;

pub const HANDSHAKE_HEADER_LEN: usize = 4;
// Reassembly cap, generous enough for large certificate chains.
const MAX_BODY_LEN: usize = 256 * 1024;

/// One complete handshake message, including its four-byte header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeFrame {
    pub msg_type: u8,
    pub raw: Vec<u8>,
}

impl HandshakeFrame {
    pub fn body(&self) -> &[u8] {
        &self.raw[HANDSHAKE_HEADER_LEN..]
    }
}

#[derive(Debug, Default)]
pub struct HandshakeJoiner {
    buf: Vec<u8>,
}

impl HandshakeJoiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &[u8]) {
        self.buf.extend_from_slice(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Pop the next complete message, or None while a partial tail remains.
    pub fn next(&mut self) -> Result<Option<HandshakeFrame>, TlsError> {
        if self.buf.len() < HANDSHAKE_HEADER_LEN {
            return Ok(None);
        }
        let body_len = u32::from_be_bytes([0, self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if body_len > MAX_BODY_LEN {
            return Err(TlsError::DecodeError(
                "handshake message too long".to_string(),
            ));
        }
        let total = HANDSHAKE_HEADER_LEN + body_len;
        if self.buf.len() < total {
            return Ok(None);
        }
        let raw: Vec<u8> = self.buf.drain(..total).collect();
        Ok(Some(HandshakeFrame {
            msg_type: raw[0],
            raw,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(msg_type: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![msg_type];
        out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_single_message() {
        let mut j = HandshakeJoiner::new();
        j.push(&msg(2, b"hello"));
        let frame = j.next().unwrap().unwrap();
        assert_eq!(frame.msg_type, 2);
        assert_eq!(frame.body(), b"hello");
        assert!(j.next().unwrap().is_none());
        assert!(j.is_empty());
    }

    #[test]
    fn test_two_messages_in_one_record() {
        let mut j = HandshakeJoiner::new();
        let mut record = msg(11, b"cert");
        record.extend_from_slice(&msg(20, b"fin"));
        j.push(&record);
        assert_eq!(j.next().unwrap().unwrap().msg_type, 11);
        assert_eq!(j.next().unwrap().unwrap().msg_type, 20);
        assert!(j.next().unwrap().is_none());
    }

    #[test]
    fn test_message_split_across_records() {
        let whole = msg(1, &[0xabu8; 100]);
        let mut j = HandshakeJoiner::new();
        j.push(&whole[..3]);
        assert!(j.next().unwrap().is_none());
        j.push(&whole[3..50]);
        assert!(j.next().unwrap().is_none());
        j.push(&whole[50..]);
        let frame = j.next().unwrap().unwrap();
        assert_eq!(frame.raw, whole);
    }

    #[test]
    fn test_partial_tail_preserved() {
        let mut j = HandshakeJoiner::new();
        let mut record = msg(2, b"first");
        let second = msg(20, b"second");
        record.extend_from_slice(&second[..4]);
        j.push(&record);
        assert_eq!(j.next().unwrap().unwrap().body(), b"first");
        assert!(j.next().unwrap().is_none());
        assert!(!j.is_empty());
        j.push(&second[4..]);
        assert_eq!(j.next().unwrap().unwrap().body(), b"second");
    }
}
