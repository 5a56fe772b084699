//! Big-endian wire codec shared by every message and extension.
//!
//! TLS frames multi-byte integers big-endian and prefixes variable-length
//! vectors with a 1, 2, or 3-byte length. The `Reader` never reads past the
//! end of its input; every accessor reports insufficient bytes as an error.

use std::fmt;

use ferrotls_types::TlsError;

/// Errors from reading or building wire data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before the requested bytes.
    UnexpectedEof,
    /// Bytes remained after a complete parse.
    TrailingBytes,
    /// A vector exceeded the capacity of its length prefix.
    LengthOverflow,
    /// A field held a value the protocol does not allow.
    BadValue(&'static str),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnexpectedEof => write!(f, "unexpected end of input"),
            CodecError::TrailingBytes => write!(f, "trailing bytes after message"),
            CodecError::LengthOverflow => write!(f, "vector too long for length prefix"),
            CodecError::BadValue(what) => write!(f, "invalid value for {what}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for TlsError {
    fn from(e: CodecError) -> Self {
        TlsError::DecodeError(e.to_string())
    }
}

/// Append-only encoder producing big-endian wire bytes.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// The 3-byte length form used by handshake headers and certificate lists.
    pub fn put_u24(&mut self, v: u32) {
        debug_assert!(v <= 0xFF_FFFF);
        self.buf.extend_from_slice(&v.to_be_bytes()[1..]);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// opaque data<0..2^8-1>
    pub fn put_vec8(&mut self, b: &[u8]) -> Result<(), CodecError> {
        let len = u8::try_from(b.len()).map_err(|_| CodecError::LengthOverflow)?;
        self.put_u8(len);
        self.put_bytes(b);
        Ok(())
    }

    /// opaque data<0..2^16-1>
    pub fn put_vec16(&mut self, b: &[u8]) -> Result<(), CodecError> {
        let len = u16::try_from(b.len()).map_err(|_| CodecError::LengthOverflow)?;
        self.put_u16(len);
        self.put_bytes(b);
        Ok(())
    }

    /// opaque data<0..2^24-1>
    pub fn put_vec24(&mut self, b: &[u8]) -> Result<(), CodecError> {
        if b.len() > 0xFF_FFFF {
            return Err(CodecError::LengthOverflow);
        }
        self.put_u24(b.len() as u32);
        self.put_bytes(b);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Borrowing cursor over wire bytes. All reads are bounds-checked.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Consume everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    pub fn get_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn get_u24(&mut self) -> Result<u32, CodecError> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn get_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_u64(&mut self) -> Result<u64, CodecError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    /// Read a 1-byte length prefix, then that many bytes.
    pub fn vec8(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.get_u8()? as usize;
        self.take(len)
    }

    /// Read a 2-byte length prefix, then that many bytes.
    pub fn vec16(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.get_u16()? as usize;
        self.take(len)
    }

    /// Read a 3-byte length prefix, then that many bytes.
    pub fn vec24(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.get_u24()? as usize;
        self.take(len)
    }

    /// A sub-reader over the next `n` bytes.
    pub fn sub(&mut self, n: usize) -> Result<Reader<'a>, CodecError> {
        Ok(Reader::new(self.take(n)?))
    }

    /// Fail unless the entire input has been consumed.
    pub fn expect_empty(&self) -> Result<(), CodecError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes)
        }
    }
}
