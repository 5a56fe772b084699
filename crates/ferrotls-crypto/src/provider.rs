//! Trait interfaces shared by the algorithm implementations.
//!
//! Algorithms are exposed both as concrete types (for callers that know
//! what they want) and through these object-safe traits (for callers that
//! select algorithms at runtime, such as a cipher suite registry).

use ferrotls_types::CryptoError;

/// A hash / message digest algorithm.
pub trait Digest: Send + Sync {
    /// The output size in bytes.
    fn output_size(&self) -> usize;

    /// The internal block size in bytes.
    fn block_size(&self) -> usize;

    /// Feed data into the hash state.
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;

    /// Finalize the hash and write the digest to `out`.
    /// The length of `out` must be at least `output_size()`.
    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError>;

    /// Reset the hash state to process a new message.
    fn reset(&mut self);
}

/// A block cipher (e.g., AES).
pub trait BlockCipher: Send + Sync {
    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Key size in bytes.
    fn key_size(&self) -> usize;

    /// Encrypt a single block in-place.
    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;

    /// Decrypt a single block in-place.
    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;
}

/// An Authenticated Encryption with Associated Data (AEAD) algorithm.
pub trait Aead: Send + Sync {
    /// The length of the authentication tag in bytes.
    fn tag_size(&self) -> usize;

    /// The expected nonce size in bytes.
    fn nonce_size(&self) -> usize;

    /// Encrypt plaintext with AEAD.
    ///
    /// Returns ciphertext || tag.
    fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt ciphertext with AEAD.
    ///
    /// `ciphertext` must include the appended tag.
    fn open(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// A Message Authentication Code (MAC) algorithm.
pub trait Mac: Send + Sync {
    /// The output size of the MAC in bytes.
    fn output_size(&self) -> usize;

    /// Feed data into the MAC computation.
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;

    /// Finalize and write the MAC value to `out`.
    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError>;

    /// Reset the MAC state for reuse with the same key.
    fn reset(&mut self);
}
