//! TLS 1.2 pseudorandom function (RFC 5246 section 5).
//!
//! PRF(secret, label, seed) = P_hash(secret, label || seed) where the hash
//! is the cipher suite's PRF hash, SHA-256 or SHA-384 for the suites here.

use ferrotls_crypto::hmac::Hmac;
use ferrotls_types::{HashAlgId, TlsError};

/// P_hash expansion truncated to `out_len` bytes.
pub fn prf(
    alg: HashAlgId,
    secret: &[u8],
    label: &[u8],
    seed: &[u8],
    out_len: usize,
) -> Result<Vec<u8>, TlsError> {
    let mut label_seed = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label);
    label_seed.extend_from_slice(seed);

    let mut out = Vec::with_capacity(out_len);
    // A(1) = HMAC(secret, A(0)), A(0) = label || seed.
    let mut a = Hmac::mac(alg, secret, &label_seed)?;
    while out.len() < out_len {
        let mut block_input = Vec::with_capacity(a.len() + label_seed.len());
        block_input.extend_from_slice(&a);
        block_input.extend_from_slice(&label_seed);
        let block = Hmac::mac(alg, secret, &block_input)?;
        let take = (out_len - out.len()).min(block.len());
        out.extend_from_slice(&block[..take]);
        a = Hmac::mac(alg, secret, &a)?;
    }
    Ok(out)
}
