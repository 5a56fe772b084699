//! SHA-2 family of message digest algorithms (FIPS 180-4).
//!
//! Provides SHA-256, SHA-384 and SHA-512. SHA-384 and SHA-512 share the
//! same 64-bit compression function and differ only in initial state and
//! output truncation.

use ferrotls_types::CryptoError;

use crate::provider::Digest;

/// SHA-256 output size in bytes.
pub const SHA256_OUTPUT_SIZE: usize = 32;
/// SHA-256 block size in bytes.
pub const SHA256_BLOCK_SIZE: usize = 64;
/// SHA-384 output size in bytes.
pub const SHA384_OUTPUT_SIZE: usize = 48;
/// SHA-384 block size in bytes.
pub const SHA384_BLOCK_SIZE: usize = 128;
/// SHA-512 output size in bytes.
pub const SHA512_OUTPUT_SIZE: usize = 64;
/// SHA-512 block size in bytes.
pub const SHA512_BLOCK_SIZE: usize = 128;

const SHA256_IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

const SHA384_IV: [u64; 8] = [
    0xcbbb9d5dc1059ed8,
    0x629a292a367cd507,
    0x9159015a3070dd17,
    0x152fecd8f70e5939,
    0x67332667ffc00b31,
    0x8eb44a8768581511,
    0xdb0c2e0d64f98fa7,
    0x47b5481dbefa4fa4,
];

const SHA512_IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

#[rustfmt::skip]
const K256: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

#[rustfmt::skip]
const K512: [u64; 80] = [
    0x428a2f98d728ae22, 0x7137449123ef65cd, 0xb5c0fbcfec4d3b2f, 0xe9b5dba58189dbbc,
    0x3956c25bf348b538, 0x59f111f1b605d019, 0x923f82a4af194f9b, 0xab1c5ed5da6d8118,
    0xd807aa98a3030242, 0x12835b0145706fbe, 0x243185be4ee4b28c, 0x550c7dc3d5ffb4e2,
    0x72be5d74f27b896f, 0x80deb1fe3b1696b1, 0x9bdc06a725c71235, 0xc19bf174cf692694,
    0xe49b69c19ef14ad2, 0xefbe4786384f25e3, 0x0fc19dc68b8cd5b5, 0x240ca1cc77ac9c65,
    0x2de92c6f592b0275, 0x4a7484aa6ea6e483, 0x5cb0a9dcbd41fbd4, 0x76f988da831153b5,
    0x983e5152ee66dfab, 0xa831c66d2db43210, 0xb00327c898fb213f, 0xbf597fc7beef0ee4,
    0xc6e00bf33da88fc2, 0xd5a79147930aa725, 0x06ca6351e003826f, 0x142929670a0e6e70,
    0x27b70a8546d22ffc, 0x2e1b21385c26c926, 0x4d2c6dfc5ac42aed, 0x53380d139d95b3df,
    0x650a73548baf63de, 0x766a0abb3c77b2a8, 0x81c2c92e47edaee6, 0x92722c851482353b,
    0xa2bfe8a14cf10364, 0xa81a664bbc423001, 0xc24b8b70d0f89791, 0xc76c51a30654be30,
    0xd192e819d6ef5218, 0xd69906245565a910, 0xf40e35855771202a, 0x106aa07032bbd1b8,
    0x19a4c116b8d2d0c8, 0x1e376c085141ab53, 0x2748774cdf8eeb99, 0x34b0bcb5e19b48a8,
    0x391c0cb3c5c95a63, 0x4ed8aa4ae3418acb, 0x5b9cca4f7763e373, 0x682e6ff3d6b2b8a3,
    0x748f82ee5defb2fc, 0x78a5636f43172f60, 0x84c87814a1f0ab72, 0x8cc702081a6439ec,
    0x90befffa23631e28, 0xa4506cebde82bde9, 0xbef9a3f7b2c67915, 0xc67178f2e372532b,
    0xca273eceea26619c, 0xd186b8c721c0c207, 0xeada7dd6cde0eb1e, 0xf57d4f7fee6ed178,
    0x06f067aa72176fba, 0x0a637dc5a2c898a6, 0x113f9804bef90dae, 0x1b710b35131c471b,
    0x28db77f523047d84, 0x32caab7b40c72493, 0x3c9ebe0a15c9bebc, 0x431d67c49c100d4c,
    0x4cc5d4becb3e42b6, 0x597f299cfc657e2a, 0x5fcb6fab3ad6faec, 0x6c44198c4a475817,
];

fn compress256(state: &mut [u32; 8], block: &[u8]) {
    debug_assert_eq!(block.len(), SHA256_BLOCK_SIZE);

    let mut w = [0u32; 64];
    for (i, chunk) in block.chunks_exact(4).enumerate() {
        w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for t in 16..64 {
        let s0 = w[t - 15].rotate_right(7) ^ w[t - 15].rotate_right(18) ^ (w[t - 15] >> 3);
        let s1 = w[t - 2].rotate_right(17) ^ w[t - 2].rotate_right(19) ^ (w[t - 2] >> 10);
        w[t] = w[t - 16]
            .wrapping_add(s0)
            .wrapping_add(w[t - 7])
            .wrapping_add(s1);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for t in 0..64 {
        let sigma1 = e.rotate_right(6) ^ e.rotate_right(11) ^ e.rotate_right(25);
        let ch = (e & f) ^ (!e & g);
        let t1 = h
            .wrapping_add(sigma1)
            .wrapping_add(ch)
            .wrapping_add(K256[t])
            .wrapping_add(w[t]);
        let sigma0 = a.rotate_right(2) ^ a.rotate_right(13) ^ a.rotate_right(22);
        let maj = (a & b) ^ (a & c) ^ (b & c);
        let t2 = sigma0.wrapping_add(maj);

        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
    state[5] = state[5].wrapping_add(f);
    state[6] = state[6].wrapping_add(g);
    state[7] = state[7].wrapping_add(h);
}

fn compress512(state: &mut [u64; 8], block: &[u8]) {
    debug_assert_eq!(block.len(), SHA512_BLOCK_SIZE);

    let mut w = [0u64; 80];
    for (i, chunk) in block.chunks_exact(8).enumerate() {
        w[i] = u64::from_be_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ]);
    }
    for t in 16..80 {
        let s0 = w[t - 15].rotate_right(1) ^ w[t - 15].rotate_right(8) ^ (w[t - 15] >> 7);
        let s1 = w[t - 2].rotate_right(19) ^ w[t - 2].rotate_right(61) ^ (w[t - 2] >> 6);
        w[t] = w[t - 16]
            .wrapping_add(s0)
            .wrapping_add(w[t - 7])
            .wrapping_add(s1);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for t in 0..80 {
        let sigma1 = e.rotate_right(14) ^ e.rotate_right(18) ^ e.rotate_right(41);
        let ch = (e & f) ^ (!e & g);
        let t1 = h
            .wrapping_add(sigma1)
            .wrapping_add(ch)
            .wrapping_add(K512[t])
            .wrapping_add(w[t]);
        let sigma0 = a.rotate_right(28) ^ a.rotate_right(34) ^ a.rotate_right(39);
        let maj = (a & b) ^ (a & c) ^ (b & c);
        let t2 = sigma0.wrapping_add(maj);

        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
    state[5] = state[5].wrapping_add(f);
    state[6] = state[6].wrapping_add(g);
    state[7] = state[7].wrapping_add(h);
}

/// SHA-256 hash context.
#[derive(Clone)]
pub struct Sha256 {
    state: [u32; 8],
    /// Total bytes processed so far.
    count: u64,
    buffer: [u8; SHA256_BLOCK_SIZE],
    buffer_len: usize,
}

impl Sha256 {
    /// Create a new SHA-256 hash context.
    pub fn new() -> Self {
        Sha256 {
            state: SHA256_IV,
            count: 0,
            buffer: [0u8; SHA256_BLOCK_SIZE],
            buffer_len: 0,
        }
    }

    /// Feed data into the hash computation.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.count = self
            .count
            .checked_add(data.len() as u64)
            .ok_or(CryptoError::InputOverflow)?;

        let mut input = data;
        if self.buffer_len > 0 {
            let want = SHA256_BLOCK_SIZE - self.buffer_len;
            let take = want.min(input.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&input[..take]);
            self.buffer_len += take;
            input = &input[take..];
            if self.buffer_len == SHA256_BLOCK_SIZE {
                let block = self.buffer;
                compress256(&mut self.state, &block);
                self.buffer_len = 0;
            }
        }

        let mut chunks = input.chunks_exact(SHA256_BLOCK_SIZE);
        for block in &mut chunks {
            compress256(&mut self.state, block);
        }
        let rest = chunks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffer_len = rest.len();
        Ok(())
    }

    /// Finalize the hash and return the 32-byte digest.
    pub fn finish(&mut self) -> Result<[u8; SHA256_OUTPUT_SIZE], CryptoError> {
        let bit_len = self
            .count
            .checked_mul(8)
            .ok_or(CryptoError::InputOverflow)?;

        // Padding: 0x80, zeros, 64-bit big-endian bit count.
        let mut pad = [0u8; SHA256_BLOCK_SIZE * 2];
        let pad_len = if self.buffer_len < 56 {
            SHA256_BLOCK_SIZE - self.buffer_len
        } else {
            2 * SHA256_BLOCK_SIZE - self.buffer_len
        };
        pad[0] = 0x80;
        pad[pad_len - 8..pad_len].copy_from_slice(&bit_len.to_be_bytes());
        self.update_no_count(&pad[..pad_len]);

        let mut out = [0u8; SHA256_OUTPUT_SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Ok(out)
    }

    fn update_no_count(&mut self, data: &[u8]) {
        let mut input = data;
        if self.buffer_len > 0 {
            let want = SHA256_BLOCK_SIZE - self.buffer_len;
            let take = want.min(input.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&input[..take]);
            self.buffer_len += take;
            input = &input[take..];
            if self.buffer_len == SHA256_BLOCK_SIZE {
                let block = self.buffer;
                compress256(&mut self.state, &block);
                self.buffer_len = 0;
            }
        }
        for block in input.chunks_exact(SHA256_BLOCK_SIZE) {
            compress256(&mut self.state, block);
        }
    }

    /// Reset the hash context for a new computation.
    pub fn reset(&mut self) {
        self.state = SHA256_IV;
        self.count = 0;
        self.buffer_len = 0;
    }

    /// One-shot: compute the SHA-256 digest of `data`.
    pub fn digest(data: &[u8]) -> Result<[u8; SHA256_OUTPUT_SIZE], CryptoError> {
        let mut ctx = Self::new();
        ctx.update(data)?;
        ctx.finish()
    }
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Digest for Sha256 {
    fn output_size(&self) -> usize {
        SHA256_OUTPUT_SIZE
    }

    fn block_size(&self) -> usize {
        SHA256_BLOCK_SIZE
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        Sha256::update(self, data)
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        if out.len() < SHA256_OUTPUT_SIZE {
            return Err(CryptoError::BufferTooSmall {
                need: SHA256_OUTPUT_SIZE,
                got: out.len(),
            });
        }
        let digest = Sha256::finish(self)?;
        out[..SHA256_OUTPUT_SIZE].copy_from_slice(&digest);
        Ok(())
    }

    fn reset(&mut self) {
        Sha256::reset(self)
    }
}

/// Shared 64-bit engine behind SHA-384 and SHA-512.
#[derive(Clone)]
struct Sha512Core {
    state: [u64; 8],
    /// Total bytes processed so far.
    count: u128,
    buffer: [u8; SHA512_BLOCK_SIZE],
    buffer_len: usize,
}

impl Sha512Core {
    fn new(iv: [u64; 8]) -> Self {
        Sha512Core {
            state: iv,
            count: 0,
            buffer: [0u8; SHA512_BLOCK_SIZE],
            buffer_len: 0,
        }
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.count = self
            .count
            .checked_add(data.len() as u128)
            .ok_or(CryptoError::InputOverflow)?;
        self.absorb(data);
        Ok(())
    }

    fn absorb(&mut self, data: &[u8]) {
        let mut input = data;
        if self.buffer_len > 0 {
            let want = SHA512_BLOCK_SIZE - self.buffer_len;
            let take = want.min(input.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&input[..take]);
            self.buffer_len += take;
            input = &input[take..];
            if self.buffer_len == SHA512_BLOCK_SIZE {
                let block = self.buffer;
                compress512(&mut self.state, &block);
                self.buffer_len = 0;
            }
        }

        let mut chunks = input.chunks_exact(SHA512_BLOCK_SIZE);
        for block in &mut chunks {
            compress512(&mut self.state, block);
        }
        let rest = chunks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffer_len = rest.len();
    }

    fn finish(&mut self) -> Result<[u64; 8], CryptoError> {
        let bit_len = self
            .count
            .checked_mul(8)
            .ok_or(CryptoError::InputOverflow)?;

        // Padding: 0x80, zeros, 128-bit big-endian bit count.
        let mut pad = [0u8; SHA512_BLOCK_SIZE * 2];
        let pad_len = if self.buffer_len < 112 {
            SHA512_BLOCK_SIZE - self.buffer_len
        } else {
            2 * SHA512_BLOCK_SIZE - self.buffer_len
        };
        pad[0] = 0x80;
        pad[pad_len - 16..pad_len].copy_from_slice(&bit_len.to_be_bytes());
        self.absorb(&pad[..pad_len]);

        Ok(self.state)
    }

    fn reset(&mut self, iv: [u64; 8]) {
        self.state = iv;
        self.count = 0;
        self.buffer_len = 0;
    }
}

/// SHA-384 hash context.
#[derive(Clone)]
pub struct Sha384 {
    core: Sha512Core,
}

impl Sha384 {
    /// Create a new SHA-384 hash context.
    pub fn new() -> Self {
        Sha384 {
            core: Sha512Core::new(SHA384_IV),
        }
    }

    /// Feed data into the hash computation.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.core.update(data)
    }

    /// Finalize the hash and return the 48-byte digest.
    pub fn finish(&mut self) -> Result<[u8; SHA384_OUTPUT_SIZE], CryptoError> {
        let state = self.core.finish()?;
        let mut out = [0u8; SHA384_OUTPUT_SIZE];
        for (chunk, word) in out.chunks_exact_mut(8).zip(state.iter().take(6)) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Ok(out)
    }

    /// Reset the hash context for a new computation.
    pub fn reset(&mut self) {
        self.core.reset(SHA384_IV);
    }

    /// One-shot: compute the SHA-384 digest of `data`.
    pub fn digest(data: &[u8]) -> Result<[u8; SHA384_OUTPUT_SIZE], CryptoError> {
        let mut ctx = Self::new();
        ctx.update(data)?;
        ctx.finish()
    }
}

impl Default for Sha384 {
    fn default() -> Self {
        Self::new()
    }
}

impl Digest for Sha384 {
    fn output_size(&self) -> usize {
        SHA384_OUTPUT_SIZE
    }

    fn block_size(&self) -> usize {
        SHA384_BLOCK_SIZE
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        Sha384::update(self, data)
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        if out.len() < SHA384_OUTPUT_SIZE {
            return Err(CryptoError::BufferTooSmall {
                need: SHA384_OUTPUT_SIZE,
                got: out.len(),
            });
        }
        let digest = Sha384::finish(self)?;
        out[..SHA384_OUTPUT_SIZE].copy_from_slice(&digest);
        Ok(())
    }

    fn reset(&mut self) {
        Sha384::reset(self)
    }
}

/// SHA-512 hash context.
#[derive(Clone)]
pub struct Sha512 {
    core: Sha512Core,
}

impl Sha512 {
    /// Create a new SHA-512 hash context.
    pub fn new() -> Self {
        Sha512 {
            core: Sha512Core::new(SHA512_IV),
        }
    }

    /// Feed data into the hash computation.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.core.update(data)
    }

    /// Finalize the hash and return the 64-byte digest.
    pub fn finish(&mut self) -> Result<[u8; SHA512_OUTPUT_SIZE], CryptoError> {
        let state = self.core.finish()?;
        let mut out = [0u8; SHA512_OUTPUT_SIZE];
        for (chunk, word) in out.chunks_exact_mut(8).zip(state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Ok(out)
    }

    /// Reset the hash context for a new computation.
    pub fn reset(&mut self) {
        self.core.reset(SHA512_IV);
    }

    /// One-shot: compute the SHA-512 digest of `data`.
    pub fn digest(data: &[u8]) -> Result<[u8; SHA512_OUTPUT_SIZE], CryptoError> {
        let mut ctx = Self::new();
        ctx.update(data)?;
        ctx.finish()
    }
}

impl Default for Sha512 {
    fn default() -> Self {
        Self::new()
    }
}

impl Digest for Sha512 {
    fn output_size(&self) -> usize {
        SHA512_OUTPUT_SIZE
    }

    fn block_size(&self) -> usize {
        SHA512_BLOCK_SIZE
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        Sha512::update(self, data)
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        if out.len() < SHA512_OUTPUT_SIZE {
            return Err(CryptoError::BufferTooSmall {
                need: SHA512_OUTPUT_SIZE,
                got: out.len(),
            });
        }
        let digest = Sha512::finish(self)?;
        out[..SHA512_OUTPUT_SIZE].copy_from_slice(&digest);
        Ok(())
    }

    fn reset(&mut self) {
        Sha512::reset(self)
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

    // FIPS 180-4 / NIST CAVP test vectors.

    #[test]
    fn test_sha256_empty() {
        let d = Sha256::digest(b"").unwrap();
        assert_eq!(
            d.to_vec(),
            hex("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_sha256_abc() {
        let d = Sha256::digest(b"abc").unwrap();
        assert_eq!(
            d.to_vec(),
            hex("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_sha256_two_blocks() {
        let d = Sha256::digest(b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq").unwrap();
        assert_eq!(
            d.to_vec(),
            hex("248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1")
        );
    }

    #[test]
    fn test_sha256_million_a() {
        let mut ctx = Sha256::new();
        let chunk = [b'a'; 1000];
        for _ in 0..1000 {
            ctx.update(&chunk).unwrap();
        }
        let d = ctx.finish().unwrap();
        assert_eq!(
            d.to_vec(),
            hex("cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0")
        );
    }

    #[test]
    fn test_sha256_incremental_matches_oneshot() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let oneshot = Sha256::digest(data).unwrap();

        // Split at awkward offsets around the block boundary
        for split in [1, 7, 31, 42] {
            let mut ctx = Sha256::new();
            ctx.update(&data[..split]).unwrap();
            ctx.update(&data[split..]).unwrap();
            assert_eq!(ctx.finish().unwrap(), oneshot);
        }
    }

    #[test]
    fn test_sha256_reset() {
        let mut ctx = Sha256::new();
        ctx.update(b"garbage").unwrap();
        ctx.reset();
        ctx.update(b"abc").unwrap();
        let d = ctx.finish().unwrap();
        assert_eq!(d, Sha256::digest(b"abc").unwrap());
    }

    #[test]
    fn test_sha384_abc() {
        let d = Sha384::digest(b"abc").unwrap();
        assert_eq!(
            d.to_vec(),
            hex(
                "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed\
                 8086072ba1e7cc2358baeca134c825a7"
            )
        );
    }

    #[test]
    fn test_sha384_empty() {
        let d = Sha384::digest(b"").unwrap();
        assert_eq!(
            d.to_vec(),
            hex(
                "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da\
                 274edebfe76f65fbd51ad2f14898b95b"
            )
        );
    }

    #[test]
    fn test_sha512_abc() {
        let d = Sha512::digest(b"abc").unwrap();
        assert_eq!(
            d.to_vec(),
            hex(
                "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
                 2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
            )
        );
    }

    #[test]
    fn test_sha512_two_blocks() {
        let msg = b"abcdefghbcdefghicdefghijdefghijkefghijklfghijklmghijklmn\
hijklmnoijklmnopjklmnopqklmnopqrlmnopqrsmnopqrstnopqrstu";
        let d = Sha512::digest(msg).unwrap();
        assert_eq!(
            d.to_vec(),
            hex(
                "8e959b75dae313da8cf4f72814fc143f8f7779c6eb9f7fa17299aeadb6889018\
                 501d289e4900f7e4331b99dec4b5433ac7d329eeb6dd26545e96e55b874be909"
            )
        );
    }

    #[test]
    fn test_digest_trait_object() {
        let mut d: Box<dyn Digest> = Box::new(Sha384::new());
        assert_eq!(d.output_size(), 48);
        assert_eq!(d.block_size(), 128);
        d.update(b"abc").unwrap();
        let mut out = [0u8; 48];
        d.finish(&mut out).unwrap();
        assert_eq!(out, Sha384::digest(b"abc").unwrap());
    }
}
