//! SHA-1 message digest algorithm (FIPS 180-4).
//!
//! **Security warning**: SHA-1 is broken by practical collision attacks.
//! It is kept only for legacy signature schemes and must not be used for
//! new applications.

use ferrotls_types::CryptoError;

use crate::provider::Digest;

/// SHA-1 output size in bytes.
pub const SHA1_OUTPUT_SIZE: usize = 20;

/// SHA-1 block size in bytes.
pub const SHA1_BLOCK_SIZE: usize = 64;

const SHA1_IV: [u32; 5] = [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476, 0xc3d2e1f0];

fn compress(state: &mut [u32; 5], block: &[u8]) {
    debug_assert_eq!(block.len(), SHA1_BLOCK_SIZE);

    let mut w = [0u32; 80];
    for (i, chunk) in block.chunks_exact(4).enumerate() {
        w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for t in 16..80 {
        w[t] = (w[t - 3] ^ w[t - 8] ^ w[t - 14] ^ w[t - 16]).rotate_left(1);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;

    for (t, &wt) in w.iter().enumerate() {
        let (f, k) = match t {
            0..=19 => ((b & c) | (!b & d), 0x5a827999u32),
            20..=39 => (b ^ c ^ d, 0x6ed9eba1),
            40..=59 => ((b & c) | (b & d) | (c & d), 0x8f1bbcdc),
            _ => (b ^ c ^ d, 0xca62c1d6),
        };
        let tmp = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(wt);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = tmp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}

/// SHA-1 hash context.
#[derive(Clone)]
pub struct Sha1 {
    state: [u32; 5],
    /// Total bytes processed so far.
    count: u64,
    buffer: [u8; SHA1_BLOCK_SIZE],
    buffer_len: usize,
}

impl Sha1 {
    /// Create a new SHA-1 hash context.
    pub fn new() -> Self {
        Sha1 {
            state: SHA1_IV,
            count: 0,
            buffer: [0u8; SHA1_BLOCK_SIZE],
            buffer_len: 0,
        }
    }

    /// Feed data into the hash computation.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.count = self
            .count
            .checked_add(data.len() as u64)
            .ok_or(CryptoError::InputOverflow)?;
        self.absorb(data);
        Ok(())
    }

    fn absorb(&mut self, data: &[u8]) {
        let mut input = data;
        if self.buffer_len > 0 {
            let want = SHA1_BLOCK_SIZE - self.buffer_len;
            let take = want.min(input.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&input[..take]);
            self.buffer_len += take;
            input = &input[take..];
            if self.buffer_len == SHA1_BLOCK_SIZE {
                let block = self.buffer;
                compress(&mut self.state, &block);
                self.buffer_len = 0;
            }
        }

        let mut chunks = input.chunks_exact(SHA1_BLOCK_SIZE);
        for block in &mut chunks {
            compress(&mut self.state, block);
        }
        let rest = chunks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffer_len = rest.len();
    }

    /// Finalize the hash and return the 20-byte digest.
    pub fn finish(&mut self) -> Result<[u8; SHA1_OUTPUT_SIZE], CryptoError> {
        let bit_len = self
            .count
            .checked_mul(8)
            .ok_or(CryptoError::InputOverflow)?;

        let mut pad = [0u8; SHA1_BLOCK_SIZE * 2];
        let pad_len = if self.buffer_len < 56 {
            SHA1_BLOCK_SIZE - self.buffer_len
        } else {
            2 * SHA1_BLOCK_SIZE - self.buffer_len
        };
        pad[0] = 0x80;
        pad[pad_len - 8..pad_len].copy_from_slice(&bit_len.to_be_bytes());
        self.absorb(&pad[..pad_len]);

        let mut out = [0u8; SHA1_OUTPUT_SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Ok(out)
    }

    /// Reset the hash context for a new computation.
    pub fn reset(&mut self) {
        self.state = SHA1_IV;
        self.count = 0;
        self.buffer_len = 0;
    }

    /// One-shot: compute the SHA-1 digest of `data`.
    pub fn digest(data: &[u8]) -> Result<[u8; SHA1_OUTPUT_SIZE], CryptoError> {
        let mut ctx = Self::new();
        ctx.update(data)?;
        ctx.finish()
    }
}

impl Default for Sha1 {
    fn default() -> Self {
        Self::new()
    }
}

impl Digest for Sha1 {
    fn output_size(&self) -> usize {
        SHA1_OUTPUT_SIZE
    }

    fn block_size(&self) -> usize {
        SHA1_BLOCK_SIZE
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        Sha1::update(self, data)
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        if out.len() < SHA1_OUTPUT_SIZE {
            return Err(CryptoError::BufferTooSmall {
                need: SHA1_OUTPUT_SIZE,
                got: out.len(),
            });
        }
        let digest = Sha1::finish(self)?;
        out[..SHA1_OUTPUT_SIZE].copy_from_slice(&digest);
        Ok(())
    }

    fn reset(&mut self) {
        Sha1::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: hex string to bytes.
    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_sha1_empty() {
        let d = Sha1::digest(b"").unwrap();
        assert_eq!(d.to_vec(), hex("da39a3ee5e6b4b0d3255bfef95601890afd80709"));
    }

    #[test]
    fn test_sha1_abc() {
        let d = Sha1::digest(b"abc").unwrap();
        assert_eq!(d.to_vec(), hex("a9993e364706816aba3e25717850c26c9cd0d89d"));
    }

    #[test]
    fn test_sha1_two_blocks() {
        let d = Sha1::digest(b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq").unwrap();
        assert_eq!(d.to_vec(), hex("84983e441c3bd26ebaae4aa1f95129e5e54670f1"));
    }

    #[test]
    fn test_sha1_incremental() {
        let data = vec![0x5au8; 163];
        let oneshot = Sha1::digest(&data).unwrap();
        let mut ctx = Sha1::new();
        for chunk in data.chunks(13) {
            ctx.update(chunk).unwrap();
        }
        assert_eq!(ctx.finish().unwrap(), oneshot);
    }
}
