//! Minimal ASN.1 DER encoding and decoding.
//!
//! Covers the subset needed for ECDSA signature interchange and for
//! extracting the SubjectPublicKeyInfo out of an X.509 certificate:
//! INTEGER, SEQUENCE, BIT STRING, OID and raw TLVs with single-byte tags.

use ferrotls_types::CryptoError;

/// ASN.1 universal tag numbers used here.
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

/// A builder for DER-encoded data.
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Consume the encoder and return the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Write a TLV with the given tag byte.
    pub fn write_tlv(&mut self, tag: u8, value: &[u8]) -> &mut Self {
        self.buf.push(tag);
        self.write_length(value.len());
        self.buf.extend_from_slice(value);
        self
    }

    fn write_length(&mut self, length: usize) {
        if length < 0x80 {
            self.buf.push(length as u8);
        } else {
            let bytes = length.to_be_bytes();
            let skip = bytes.iter().take_while(|&&b| b == 0).count();
            let sig = &bytes[skip..];
            self.buf.push(0x80 | sig.len() as u8);
            self.buf.extend_from_slice(sig);
        }
    }

    /// Write an unsigned INTEGER from big-endian magnitude bytes.
    ///
    /// A leading zero byte is inserted when the high bit is set, so the
    /// value stays positive in DER's two's-complement reading.
    pub fn write_integer(&mut self, value: &[u8]) -> &mut Self {
        let trimmed = {
            let skip = value.iter().take_while(|&&b| b == 0).count();
            &value[skip.min(value.len().saturating_sub(1))..]
        };
        if trimmed.is_empty() || trimmed[0] & 0x80 != 0 {
            let mut padded = Vec::with_capacity(trimmed.len() + 1);
            padded.push(0x00);
            padded.extend_from_slice(trimmed);
            self.write_tlv(TAG_INTEGER, &padded)
        } else {
            self.write_tlv(TAG_INTEGER, trimmed)
        }
    }

    /// Write a SEQUENCE wrapping already-encoded contents.
    pub fn write_sequence(&mut self, contents: &[u8]) -> &mut Self {
        self.write_tlv(TAG_SEQUENCE, contents)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed tag-length-value element.
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

/// A streaming DER decoder.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns true once all input is consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The tag byte of the next element, without consuming it.
    pub fn peek_tag(&self) -> Result<u8, CryptoError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CryptoError::DecodeAsn1Fail)
    }

    /// Parse the next TLV element.
    pub fn read_tlv(&mut self) -> Result<Tlv<'a>, CryptoError> {
        let tag = self.peek_tag()?;
        self.pos += 1;
        let length = self.read_length()?;
        let end = self
            .pos
            .checked_add(length)
            .ok_or(CryptoError::DecodeAsn1Fail)?;
        if end > self.data.len() {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        let value = &self.data[self.pos..end];
        self.pos = end;
        Ok(Tlv { tag, value })
    }

    fn read_length(&mut self) -> Result<usize, CryptoError> {
        let first = *self
            .data
            .get(self.pos)
            .ok_or(CryptoError::DecodeAsn1Fail)?;
        self.pos += 1;

        if first < 0x80 {
            return Ok(first as usize);
        }
        // 0x80 is the indefinite form, invalid in DER.
        let num_bytes = (first & 0x7f) as usize;
        if num_bytes == 0 || num_bytes > 4 || self.pos + num_bytes > self.data.len() {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        let mut length = 0usize;
        for &b in &self.data[self.pos..self.pos + num_bytes] {
            length = (length << 8) | b as usize;
        }
        self.pos += num_bytes;
        Ok(length)
    }

    fn expect(&mut self, tag: u8) -> Result<&'a [u8], CryptoError> {
        let tlv = self.read_tlv()?;
        if tlv.tag != tag {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        Ok(tlv.value)
    }

    /// Read an INTEGER, returning its magnitude with any sign-padding zero
    /// stripped.
    pub fn read_integer(&mut self) -> Result<&'a [u8], CryptoError> {
        let mut value = self.expect(TAG_INTEGER)?;
        if value.is_empty() {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        while value.len() > 1 && value[0] == 0 {
            value = &value[1..];
        }
        Ok(value)
    }

    /// Read a BIT STRING, returning (unused_bits, data).
    pub fn read_bit_string(&mut self) -> Result<(u8, &'a [u8]), CryptoError> {
        let value = self.expect(TAG_BIT_STRING)?;
        match value.split_first() {
            Some((&unused, rest)) => Ok((unused, rest)),
            None => Err(CryptoError::DecodeAsn1Fail),
        }
    }

    /// Read an OBJECT IDENTIFIER and return the raw content bytes.
    pub fn read_oid(&mut self) -> Result<&'a [u8], CryptoError> {
        self.expect(TAG_OID)
    }

    /// Read a SEQUENCE and return a sub-decoder over its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder<'a>, CryptoError> {
        Ok(Decoder::new(self.expect(TAG_SEQUENCE)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_roundtrip_high_bit() {
        let mut enc = Encoder::new();
        enc.write_integer(&[0x8f, 0x01]);
        let der = enc.finish();
        // Leading zero inserted to keep the value positive
        assert_eq!(der, [0x02, 0x03, 0x00, 0x8f, 0x01]);

        let mut dec = Decoder::new(&der);
        assert_eq!(dec.read_integer().unwrap(), &[0x8f, 0x01]);
        assert!(dec.is_empty());
    }

    #[test]
    fn test_integer_strips_redundant_zeros() {
        let mut enc = Encoder::new();
        enc.write_integer(&[0x00, 0x00, 0x7f]);
        assert_eq!(enc.finish(), [0x02, 0x01, 0x7f]);
    }

    #[test]
    fn test_integer_zero() {
        let mut enc = Encoder::new();
        enc.write_integer(&[]);
        let der = enc.finish();
        assert_eq!(der, [0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_long_form_length() {
        let payload = vec![0xab; 300];
        let mut enc = Encoder::new();
        enc.write_tlv(TAG_OCTET_STRING, &payload);
        let der = enc.finish();
        assert_eq!(&der[..4], &[0x04, 0x82, 0x01, 0x2c]);

        let mut dec = Decoder::new(&der);
        let tlv = dec.read_tlv().unwrap();
        assert_eq!(tlv.tag, TAG_OCTET_STRING);
        assert_eq!(tlv.value, &payload[..]);
    }

    #[test]
    fn test_nested_sequence() {
        let mut inner = Encoder::new();
        inner.write_integer(&[0x05]).write_integer(&[0x07]);
        let mut enc = Encoder::new();
        enc.write_sequence(&inner.finish());
        let der = enc.finish();

        let mut dec = Decoder::new(&der);
        let mut seq = dec.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), &[0x05]);
        assert_eq!(seq.read_integer().unwrap(), &[0x07]);
        assert!(seq.is_empty());
        assert!(dec.is_empty());
    }

    #[test]
    fn test_truncated_value_rejected() {
        // Claims 4 content bytes but carries only 2
        let der = [0x02, 0x04, 0x01, 0x02];
        assert!(Decoder::new(&der).read_tlv().is_err());
    }

    #[test]
    fn test_indefinite_length_rejected() {
        let der = [0x30, 0x80, 0x00, 0x00];
        assert!(Decoder::new(&der).read_tlv().is_err());
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let der = [0x04, 0x01, 0xff];
        assert!(Decoder::new(&der).read_integer().is_err());
    }

    #[test]
    fn test_bit_string() {
        let der = [0x03, 0x03, 0x00, 0xde, 0xad];
        let (unused, data) = Decoder::new(&der).read_bit_string().unwrap();
        assert_eq!(unused, 0);
        assert_eq!(data, &[0xde, 0xad]);
    }
}
