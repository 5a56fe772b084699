//! HKDF-Expand-Label and Derive-Secret (RFC 8446 section 7.1).

use ferrotls_crypto::hkdf::Hkdf;
use ferrotls_types::{HashAlgId, TlsError};

/// HKDF-Extract. An empty salt stands for a string of hash-length zeros.
pub fn hkdf_extract(alg: HashAlgId, salt: &[u8], ikm: &[u8]) -> Result<Vec<u8>, TlsError> {
    let kdf = Hkdf::new(alg, salt, ikm)?;
    Ok(kdf.prk().to_vec())
}

/// HKDF-Expand from an extracted PRK.
pub fn hkdf_expand(
    alg: HashAlgId,
    prk: &[u8],
    info: &[u8],
    length: usize,
) -> Result<Vec<u8>, TlsError> {
    let kdf = Hkdf::from_prk(alg, prk)?;
    Ok(kdf.expand(info, length)?)
}

/// The HkdfLabel structure: length, "tls13 " + label, context.
pub fn encode_hkdf_label(label: &str, context: &[u8], length: usize) -> Vec<u8> {
    let full_label = format!("tls13 {label}");
    let mut out = Vec::with_capacity(4 + full_label.len() + context.len());
    out.extend_from_slice(&(length as u16).to_be_bytes());
    out.push(full_label.len() as u8);
    out.extend_from_slice(full_label.as_bytes());
    out.push(context.len() as u8);
    out.extend_from_slice(context);
    out
}

/// HKDF-Expand-Label(secret, label, context, length).
pub fn hkdf_expand_label(
    alg: HashAlgId,
    secret: &[u8],
    label: &str,
    context: &[u8],
    length: usize,
) -> Result<Vec<u8>, TlsError> {
    let info = encode_hkdf_label(label, context, length);
    hkdf_expand(alg, secret, &info, length)
}

/// Derive-Secret(secret, label, transcript_hash). Output is hash-length.
pub fn derive_secret(
    alg: HashAlgId,
    secret: &[u8],
    label: &str,
    transcript_hash: &[u8],
) -> Result<Vec<u8>, TlsError> {
    hkdf_expand_label(alg, secret, label, transcript_hash, alg.output_size())
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
    fn test_label_encoding() {
        // HkdfLabel for Expand-Label(secret, "key", "", 16)
        let info = encode_hkdf_label("key", &[], 16);
        let mut expected = vec![0x00, 0x10, 0x09];
        expected.extend_from_slice(b"tls13 key");
        expected.push(0x00);
        assert_eq!(info, expected);
    }

    #[test]
    fn test_label_encoding_with_context() {
        let ctx = [0xAA; 32];
        let info = encode_hkdf_label("derived", &ctx, 32);
        assert_eq!(info[0..2], [0x00, 0x20]);
        assert_eq!(info[2], 13); // "tls13 derived"
        assert_eq!(&info[3..16], b"tls13 derived");
        assert_eq!(info[16], 32);
        assert_eq!(&info[17..], &ctx[..]);
    }

    #[test]
    fn test_extract_rfc8448_early_secret() {
        // Early-Secret = HKDF-Extract(salt=0, ikm=0^32) from the RFC 8448
        // simple 1-RTT trace.
        let prk = hkdf_extract(HashAlgId::Sha256, &[], &[0u8; 32]).unwrap();
        assert_eq!(
            prk,
            hex("33ad0a1c607ec03b09e6cd9893680ce210adf300aa1f2660e1b22e10f170f92a")
        );
    }

    #[test]
    fn test_derive_secret_output_length() {
        let secret = [0x0B; 48];
        let hash = [0x0C; 48];
        let out = derive_secret(HashAlgId::Sha384, &secret, "c hs traffic", &hash).unwrap();
        assert_eq!(out.len(), 48);
    }
}
