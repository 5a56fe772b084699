//! CBC (Cipher Block Chaining) mode of operation.
//!
//! The block-aligned in-place functions are the building blocks; record
//! protocols that define their own padding (such as TLS) call those
//! directly. The `cbc_encrypt`/`cbc_decrypt` pair adds PKCS#7 padding.

use ferrotls_types::CryptoError;
use subtle::ConstantTimeEq;

use crate::aes::{AesKey, AES_BLOCK_SIZE};
use crate::provider::BlockCipher;

/// Encrypt block-aligned data in place with CBC chaining.
pub fn cbc_encrypt_blocks(
    cipher: &dyn BlockCipher,
    iv: &[u8],
    data: &mut [u8],
) -> Result<(), CryptoError> {
    let bs = cipher.block_size();
    if iv.len() != bs {
        return Err(CryptoError::InvalidIvLength);
    }
    if data.len() % bs != 0 {
        return Err(CryptoError::InvalidArg);
    }

    let mut prev = iv.to_vec();
    for chunk in data.chunks_mut(bs) {
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        cipher.encrypt_block(chunk)?;
        prev.copy_from_slice(chunk);
    }
    Ok(())
}

/// Decrypt block-aligned data in place with CBC chaining.
pub fn cbc_decrypt_blocks(
    cipher: &dyn BlockCipher,
    iv: &[u8],
    data: &mut [u8],
) -> Result<(), CryptoError> {
    let bs = cipher.block_size();
    if iv.len() != bs {
        return Err(CryptoError::InvalidIvLength);
    }
    if data.len() % bs != 0 {
        return Err(CryptoError::InvalidArg);
    }

    let mut prev = iv.to_vec();
    for chunk in data.chunks_mut(bs) {
        let ct_copy = chunk.to_vec();
        cipher.decrypt_block(chunk)?;
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        prev = ct_copy;
    }
    Ok(())
}

/// AES-CBC encryption with PKCS#7 padding.
pub fn cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = AesKey::new(key)?;

    let pad_len = AES_BLOCK_SIZE - (plaintext.len() % AES_BLOCK_SIZE);
    let mut data = plaintext.to_vec();
    data.resize(plaintext.len() + pad_len, pad_len as u8);

    cbc_encrypt_blocks(&cipher, iv, &mut data)?;
    Ok(data)
}

/// AES-CBC decryption removing PKCS#7 padding.
///
/// The padding check runs in constant time over the padding bytes.
pub fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() {
        return Err(CryptoError::InvalidArg);
    }
    let cipher = AesKey::new(key)?;

    let mut data = ciphertext.to_vec();
    cbc_decrypt_blocks(&cipher, iv, &mut data)?;

    let pad_len = *data.last().ok_or(CryptoError::InvalidPadding)? as usize;
    if pad_len == 0 || pad_len > AES_BLOCK_SIZE || pad_len > data.len() {
        return Err(CryptoError::InvalidPadding);
    }
    let pad_byte = pad_len as u8;
    let mut ok = 1u8;
    for b in &data[data.len() - pad_len..] {
        ok &= b.ct_eq(&pad_byte).unwrap_u8();
    }
    if ok != 1 {
        return Err(CryptoError::InvalidPadding);
    }
    data.truncate(data.len() - pad_len);
    Ok(data)
}
