//! PKCS#1 v1.5 encodings (RFC 8017 sections 7.2 and 9.2).

use ferrotls_types::CryptoError;

/// DER DigestInfo headers, keyed by digest length below.
const DIGEST_INFO_SHA1: &[u8] = &[
    0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14,
];
const DIGEST_INFO_SHA256: &[u8] = &[
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];
const DIGEST_INFO_SHA384: &[u8] = &[
    0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x02, 0x05,
    0x00, 0x04, 0x30,
];
const DIGEST_INFO_SHA512: &[u8] = &[
    0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03, 0x05,
    0x00, 0x04, 0x40,
];

/// Pick the DigestInfo header for a digest by its length.
fn digest_info(digest_len: usize) -> Result<&'static [u8], CryptoError> {
    match digest_len {
        20 => Ok(DIGEST_INFO_SHA1),
        32 => Ok(DIGEST_INFO_SHA256),
        48 => Ok(DIGEST_INFO_SHA384),
        64 => Ok(DIGEST_INFO_SHA512),
        _ => Err(CryptoError::InvalidArg),
    }
}

/// EMSA-PKCS1-v1_5: EM = 00 || 01 || FF..FF || 00 || DigestInfo || digest.
pub(crate) fn encode_signature_em(digest: &[u8], k: usize) -> Result<Vec<u8>, CryptoError> {
    let info = digest_info(digest.len())?;
    let t_len = info.len() + digest.len();
    // At least eight FF bytes of padding plus the three frame bytes.
    if k < t_len + 11 {
        return Err(CryptoError::RsaInvalidPadding);
    }

    let mut em = vec![0xFF; k];
    em[0] = 0x00;
    em[1] = 0x01;
    em[k - t_len - 1] = 0x00;
    em[k - t_len..k - digest.len()].copy_from_slice(info);
    em[k - digest.len()..].copy_from_slice(digest);
    Ok(em)
}

/// Compare a recovered EM against the expected encoding of `digest`.
pub(crate) fn verify_signature_em(
    em: &[u8],
    digest: &[u8],
    k: usize,
) -> Result<bool, CryptoError> {
    use subtle::ConstantTimeEq;
    let expected = encode_signature_em(digest, k)?;
    Ok(em.ct_eq(&expected).into())
}

/// RSAES-PKCS1-v1_5: EM = 00 || 02 || PS || 00 || M with random non-zero PS.
pub(crate) fn pad_message(msg: &[u8], k: usize) -> Result<Vec<u8>, CryptoError> {
    if msg.len() > k.saturating_sub(11) {
        return Err(CryptoError::InputOverflow);
    }

    let ps_len = k - msg.len() - 3;
    let mut em = Vec::with_capacity(k);
    em.push(0x00);
    em.push(0x02);
    em.extend_from_slice(&nonzero_random(ps_len)?);
    em.push(0x00);
    em.extend_from_slice(msg);
    Ok(em)
}

/// Strip RSAES-PKCS1-v1_5 padding, requiring at least eight PS bytes.
pub(crate) fn unpad_message(em: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if em.len() < 11 || em[0] != 0x00 || em[1] != 0x02 {
        return Err(CryptoError::RsaInvalidPadding);
    }
    let sep = em
        .iter()
        .skip(2)
        .position(|&b| b == 0x00)
        .map(|i| i + 2)
        .ok_or(CryptoError::RsaInvalidPadding)?;
    if sep < 10 {
        return Err(CryptoError::RsaInvalidPadding);
    }
    Ok(em[sep + 1..].to_vec())
}

/// Random bytes with zero excluded, by rejection.
fn nonzero_random(len: usize) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::with_capacity(len);
    let mut byte = [0u8; 1];
    while out.len() < len {
        getrandom::getrandom(&mut byte).map_err(|_| CryptoError::BnRandGenFail)?;
        if byte[0] != 0 {
            out.push(byte[0]);
        }
    }
    Ok(out)
}
