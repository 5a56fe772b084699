//! HMAC (Hash-based Message Authentication Code), RFC 2104.
//!
//! HMAC(K, m) = H((K' XOR opad) || H((K' XOR ipad) || m))
//!
//! where K' is the key padded (or hashed) to the block size, ipad = 0x36,
//! opad = 0x5c.

use ferrotls_types::{CryptoError, HashAlgId};
use zeroize::Zeroize;

use crate::hash::new_digest;
use crate::provider::{Digest, Mac};

/// HMAC context over one of the supported hash algorithms.
pub struct Hmac {
    alg: HashAlgId,
    /// Inner hash context (keyed with ipad).
    inner: Box<dyn Digest>,
    /// Outer hash context (keyed with opad).
    outer: Box<dyn Digest>,
    /// Processed key block, retained for reset.
    key_block: Vec<u8>,
}

impl Hmac {
    /// Create a new HMAC instance with the given hash algorithm and key.
    pub fn new(alg: HashAlgId, key: &[u8]) -> Result<Self, CryptoError> {
        let mut inner = new_digest(alg);
        let mut outer = new_digest(alg);
        let block_size = inner.block_size();

        // A key longer than the block size is hashed first.
        let mut key_block = vec![0u8; block_size];
        if key.len() > block_size {
            let mut hasher = new_digest(alg);
            hasher.update(key)?;
            let output_size = hasher.output_size();
            hasher.finish(&mut key_block[..output_size])?;
        } else {
            key_block[..key.len()].copy_from_slice(key);
        }

        feed_pads(&mut inner, &mut outer, &key_block)?;

        Ok(Self {
            alg,
            inner,
            outer,
            key_block,
        })
    }

    /// The MAC output size in bytes (the hash output size).
    pub fn output_size(&self) -> usize {
        self.inner.output_size()
    }

    /// Feed data into the HMAC computation.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.inner.update(data)
    }

    /// Finalize the HMAC computation and write the result to `out`.
    pub fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let output_size = self.inner.output_size();
        let mut inner_hash = vec![0u8; output_size];
        self.inner.finish(&mut inner_hash)?;

        self.outer.update(&inner_hash)?;
        inner_hash.zeroize();

        self.outer.finish(out)
    }

    /// Reset the HMAC state for reuse with the same key.
    pub fn reset(&mut self) {
        self.inner = new_digest(self.alg);
        self.outer = new_digest(self.alg);
        // Feeding a single block into a fresh context cannot fail.
        let _ = feed_pads(&mut self.inner, &mut self.outer, &self.key_block);
    }

    /// One-shot HMAC computation.
    pub fn mac(alg: HashAlgId, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut ctx = Self::new(alg, key)?;
        ctx.update(data)?;
        let mut out = vec![0u8; ctx.output_size()];
        ctx.finish(&mut out)?;
        Ok(out)
    }
}

fn feed_pads(
    inner: &mut Box<dyn Digest>,
    outer: &mut Box<dyn Digest>,
    key_block: &[u8],
) -> Result<(), CryptoError> {
    let mut pad: Vec<u8> = key_block.iter().map(|b| b ^ 0x36).collect();
    inner.update(&pad)?;
    for b in pad.iter_mut() {
        *b ^= 0x36 ^ 0x5c;
    }
    outer.update(&pad)?;
    pad.zeroize();
    Ok(())
}

impl Drop for Hmac {
    fn drop(&mut self) {
        self.key_block.zeroize();
    }
}

impl Mac for Hmac {
    fn output_size(&self) -> usize {
        Hmac::output_size(self)
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        Hmac::update(self, data)
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        Hmac::finish(self, out)
    }

    fn reset(&mut self) {
        Hmac::reset(self)
    }
}
