//! EMSA-PSS encoding and verification (RFC 8017 section 9.1).
//!
//! Fixed to SHA-256 with MGF1-SHA256 and a salt the length of the hash.

use ferrotls_types::CryptoError;

use crate::sha2::{Sha256, SHA256_OUTPUT_SIZE};

use super::mgf1_sha256;

const H_LEN: usize = SHA256_OUTPUT_SIZE;
const SALT_LEN: usize = SHA256_OUTPUT_SIZE;

/// H = SHA-256(00 00 00 00 00 00 00 00 || mHash || salt).
fn hash_m_prime(digest: &[u8], salt: &[u8]) -> Result<[u8; H_LEN], CryptoError> {
    let mut hasher = Sha256::new();
    hasher.update(&[0u8; 8])?;
    hasher.update(digest)?;
    hasher.update(salt)?;
    hasher.finish()
}

/// Encode with a freshly drawn salt. `em_bits` is modBits - 1.
pub(crate) fn encode_with_random_salt(
    digest: &[u8],
    em_bits: usize,
) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt).map_err(|_| CryptoError::BnRandGenFail)?;
    encode(digest, em_bits, &salt)
}

/// EMSA-PSS-ENCODE: EM = maskedDB || H || 0xbc.
fn encode(digest: &[u8], em_bits: usize, salt: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if digest.len() != H_LEN {
        return Err(CryptoError::InvalidArg);
    }
    let em_len = em_bits.div_ceil(8);
    if em_len < H_LEN + salt.len() + 2 {
        return Err(CryptoError::RsaInvalidPadding);
    }

    let h = hash_m_prime(digest, salt)?;

    // DB = PS || 0x01 || salt, masked with MGF1(H).
    let db_len = em_len - H_LEN - 1;
    let mask = mgf1_sha256(&h, db_len)?;
    let mut masked_db = mask;
    masked_db[db_len - salt.len() - 1] ^= 0x01;
    for (slot, s) in masked_db[db_len - salt.len()..].iter_mut().zip(salt) {
        *slot ^= s;
    }

    // Clear the bits above em_bits in the leading byte.
    let top_bits = 8 * em_len - em_bits;
    if top_bits > 0 {
        masked_db[0] &= 0xFF >> top_bits;
    }

    let mut em = masked_db;
    em.extend_from_slice(&h);
    em.push(0xbc);
    Ok(em)
}

/// EMSA-PSS-VERIFY. Structural mismatches report `Ok(false)`.
pub(crate) fn verify(em: &[u8], digest: &[u8], em_bits: usize) -> Result<bool, CryptoError> {
    if digest.len() != H_LEN {
        return Err(CryptoError::InvalidArg);
    }
    let em_len = em_bits.div_ceil(8);
    if em.len() < em_len || em_len < H_LEN + SALT_LEN + 2 {
        return Ok(false);
    }
    // A leading zero byte may pad the raw RSA output.
    let em = &em[em.len() - em_len..];

    if em[em_len - 1] != 0xbc {
        return Ok(false);
    }

    let db_len = em_len - H_LEN - 1;
    let masked_db = &em[..db_len];
    let h = &em[db_len..db_len + H_LEN];

    let top_bits = 8 * em_len - em_bits;
    if top_bits > 0 && masked_db[0] & (0xFF << (8 - top_bits)) != 0 {
        return Ok(false);
    }

    let mask = mgf1_sha256(h, db_len)?;
    let mut db: Vec<u8> = masked_db.iter().zip(&mask).map(|(a, b)| a ^ b).collect();
    if top_bits > 0 {
        db[0] &= 0xFF >> top_bits;
    }

    // DB must be zeros, then 0x01, then the salt.
    let ps_len = db_len - SALT_LEN - 1;
    if db[..ps_len].iter().any(|&b| b != 0x00) || db[ps_len] != 0x01 {
        return Ok(false);
    }
    let salt = &db[ps_len + 1..];

    let h_prime = hash_m_prime(digest, salt)?;
    use subtle::ConstantTimeEq;
    Ok(h.ct_eq(&h_prime).into())
}
