//! GCM (Galois/Counter Mode) authenticated encryption, NIST SP 800-38D.
//!
//! GHASH uses a 16-entry table for 4-bit multiplication in GF(2^128).
//! Field elements are held as a single `u128` with the polynomial's most
//! significant coefficient in the top bit.

use ferrotls_types::CryptoError;
use subtle::ConstantTimeEq;

use crate::aes::AesKey;
use crate::provider::Aead;

/// GCM tag length in bytes.
pub const GCM_TAG_SIZE: usize = 16;

/// GCM nonce length used by TLS.
pub const GCM_NONCE_SIZE: usize = 12;

// The reduction polynomial R = 0xE1 << 120.
const GCM_R: u128 = 0xe1 << 120;

// TABLE_P4[i] folds the i low bits shifted out by a 4-bit step back into
// the high end: TABLE_P4[i] = (i * R) >> 124 style precomputation.
const TABLE_P4: [u64; 16] = [
    0x0000000000000000,
    0x1c20000000000000,
    0x3840000000000000,
    0x2460000000000000,
    0x7080000000000000,
    0x6ca0000000000000,
    0x48c0000000000000,
    0x54e0000000000000,
    0xe100000000000000,
    0xfd20000000000000,
    0xd940000000000000,
    0xc560000000000000,
    0x9180000000000000,
    0x8da0000000000000,
    0xa9c0000000000000,
    0xb5e0000000000000,
];

fn block_to_u128(b: &[u8; 16]) -> u128 {
    u128::from_be_bytes(*b)
}

/// Precomputed multiplication table for one hash subkey H.
struct GhashTable {
    table: [u128; 16],
}

impl GhashTable {
    fn new(h: &[u8; 16]) -> Self {
        let mut table = [0u128; 16];
        table[8] = block_to_u128(h);

        // table[4], table[2], table[1] by successive halving in the field.
        let mut cur = table[8];
        for idx in [4usize, 2, 1] {
            let carry = cur & 1 != 0;
            cur >>= 1;
            if carry {
                cur ^= GCM_R;
            }
            table[idx] = cur;
        }

        // Remaining entries are sums of the power-of-two entries.
        for i in [3usize, 5, 6, 7, 9, 10, 11, 12, 13, 14, 15] {
            let msb = 1 << (usize::BITS - 1 - i.leading_zeros());
            table[i] = table[msb] ^ table[i ^ msb];
        }

        Self { table }
    }

    /// One GHASH step: state = (state XOR block) * H.
    fn ghash_block(&self, state: &mut u128, block: &[u8; 16]) {
        let x = (*state ^ block_to_u128(block)).to_be_bytes();
        let mut z = 0u128;

        // Bytes from least to most significant, low nibble before high.
        for &byte in x.iter().rev() {
            for nibble in [byte & 0x0f, byte >> 4] {
                let rem = (z & 0x0f) as usize;
                z >>= 4;
                z ^= (TABLE_P4[rem] as u128) << 64;
                z ^= self.table[nibble as usize];
            }
        }

        *state = z;
    }

    /// GHASH over arbitrary-length data, zero-padded to the block size.
    fn ghash_data(&self, state: &mut u128, data: &[u8]) {
        for chunk in data.chunks(16) {
            let mut block = [0u8; 16];
            block[..chunk.len()].copy_from_slice(chunk);
            self.ghash_block(state, &block);
        }
    }
}

/// Increment the low 32 bits of the counter block (INC32).
fn inc32(counter: &mut [u8; 16]) {
    let ctr =
        u32::from_be_bytes([counter[12], counter[13], counter[14], counter[15]]).wrapping_add(1);
    counter[12..].copy_from_slice(&ctr.to_be_bytes());
}

/// A keyed AES-GCM instance with its GHASH table precomputed once.
pub struct AesGcm {
    cipher: AesKey,
    table: GhashTable,
}

impl AesGcm {
    /// Create an AES-GCM instance from a 16, 24 or 32 byte key.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let cipher = AesKey::new(key)?;
        // H = CIPH_K(0^128)
        let mut h = [0u8; 16];
        cipher.encrypt_block(&mut h)?;
        Ok(Self {
            cipher,
            table: GhashTable::new(&h),
        })
    }

    fn crypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        input: &[u8],
        encrypting: bool,
    ) -> Result<(Vec<u8>, [u8; GCM_TAG_SIZE]), CryptoError> {
        // J0: nonce || 0^31 || 1 for 96-bit nonces, GHASH otherwise.
        let mut j0 = [0u8; 16];
        if nonce.len() == GCM_NONCE_SIZE {
            j0[..GCM_NONCE_SIZE].copy_from_slice(nonce);
            j0[15] = 1;
        } else {
            let mut state = 0u128;
            self.table.ghash_data(&mut state, nonce);
            let mut len_block = [0u8; 16];
            len_block[8..].copy_from_slice(&(nonce.len() as u64 * 8).to_be_bytes());
            self.table.ghash_block(&mut state, &len_block);
            j0 = state.to_be_bytes();
        }

        let mut ek0 = j0;
        self.cipher.encrypt_block(&mut ek0)?;

        // CTR keystream starting at inc32(J0).
        let mut counter = j0;
        let mut output = input.to_vec();
        for chunk in output.chunks_mut(16) {
            inc32(&mut counter);
            let mut keystream = counter;
            self.cipher.encrypt_block(&mut keystream)?;
            for (d, k) in chunk.iter_mut().zip(keystream.iter()) {
                *d ^= k;
            }
        }

        // Tag over AAD, ciphertext, and the length block.
        let ciphertext = if encrypting { &output } else { input };
        let mut state = 0u128;
        self.table.ghash_data(&mut state, aad);
        self.table.ghash_data(&mut state, ciphertext);
        let mut len_block = [0u8; 16];
        len_block[..8].copy_from_slice(&(aad.len() as u64 * 8).to_be_bytes());
        len_block[8..].copy_from_slice(&(ciphertext.len() as u64 * 8).to_be_bytes());
        self.table.ghash_block(&mut state, &len_block);

        let mut tag = state.to_be_bytes();
        for (t, e) in tag.iter_mut().zip(ek0.iter()) {
            *t ^= e;
        }

        Ok((output, tag))
    }
}

impl Aead for AesGcm {
    fn tag_size(&self) -> usize {
        GCM_TAG_SIZE
    }

    fn nonce_size(&self) -> usize {
        GCM_NONCE_SIZE
    }

    fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (mut out, tag) = self.crypt(nonce, aad, plaintext, true)?;
        out.extend_from_slice(&tag);
        Ok(out)
    }

    fn open(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < GCM_TAG_SIZE {
            return Err(CryptoError::InvalidArg);
        }
        let (ct, received_tag) = ciphertext.split_at(ciphertext.len() - GCM_TAG_SIZE);
        let (plaintext, tag) = self.crypt(nonce, aad, ct, false)?;
        if tag.ct_eq(received_tag).unwrap_u8() != 1 {
            return Err(CryptoError::AeadTagVerifyFail);
        }
        Ok(plaintext)
    }
}

/// One-shot AES-GCM encryption. Returns ciphertext || 16-byte tag.
pub fn gcm_encrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    AesGcm::new(key)?.seal(nonce, aad, plaintext)
}

/// One-shot AES-GCM decryption of ciphertext || tag.
pub fn gcm_decrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    AesGcm::new(key)?.open(nonce, aad, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    // NIST SP 800-38D Test Case 1: empty plaintext, empty AAD
    #[test]
    fn test_gcm_case1() {
        let key = [0u8; 16];
        let nonce = [0u8; 12];

        let result = gcm_encrypt(&key, &nonce, &[], &[]).unwrap();
        assert_eq!(hex(&result), "58e2fccefa7e3061367f1d57a4e7455a");

        let pt = gcm_decrypt(&key, &nonce, &[], &result).unwrap();
        assert!(pt.is_empty());
    }

    // NIST SP 800-38D Test Case 2: one zero block
    #[test]
    fn test_gcm_case2() {
        let key = [0u8; 16];
        let nonce = [0u8; 12];
        let pt = [0u8; 16];

        let result = gcm_encrypt(&key, &nonce, &[], &pt).unwrap();
        assert_eq!(hex(&result[..16]), "0388dace60b6a392f328c2b971b2fe78");
        assert_eq!(hex(&result[16..]), "ab6e47d42cec13bdf53a67b21257bddf");

        assert_eq!(gcm_decrypt(&key, &nonce, &[], &result).unwrap(), pt);
    }

    // NIST SP 800-38D Test Case 4: 60-byte plaintext with AAD
    #[test]
    fn test_gcm_case4() {
        let key = hex_to_bytes("feffe9928665731c6d6a8f9467308308");
        let nonce = hex_to_bytes("cafebabefacedbaddecaf888");
        let pt = hex_to_bytes(
            "d9313225f88406e5a55909c5aff5269a86a7a9531534f7da2e4c303d8a318a72\
             1c3c0c95956809532fcf0e2449a6b525b16aedf5aa0de657ba637b39",
        );
        let aad = hex_to_bytes("feedfacedeadbeeffeedfacedeadbeefabaddad2");

        let result = gcm_encrypt(&key, &nonce, &aad, &pt).unwrap();
        assert_eq!(
            hex(&result[..pt.len()]),
            "42831ec2217774244b7221b784d0d49ce3aa212f2c02a4e035c17e2329aca12e\
             21d514b25466931c7d8f6a5aac84aa051ba30b396a0aac973d58e091"
        );
        assert_eq!(hex(&result[pt.len()..]), "5bc94fbc3221a5db94fae95ae7121a47");

        assert_eq!(gcm_decrypt(&key, &nonce, &aad, &result).unwrap(), pt);
    }

    // NIST SP 800-38D Test Case 16: AES-256 with AAD
    #[test]
    fn test_gcm_aes256_case16() {
        let key = hex_to_bytes(
            "feffe9928665731c6d6a8f9467308308feffe9928665731c6d6a8f9467308308",
        );
        let nonce = hex_to_bytes("cafebabefacedbaddecaf888");
        let pt = hex_to_bytes(
            "d9313225f88406e5a55909c5aff5269a86a7a9531534f7da2e4c303d8a318a72\
             1c3c0c95956809532fcf0e2449a6b525b16aedf5aa0de657ba637b39",
        );
        let aad = hex_to_bytes("feedfacedeadbeeffeedfacedeadbeefabaddad2");

        let result = gcm_encrypt(&key, &nonce, &aad, &pt).unwrap();
        assert_eq!(
            hex(&result[..pt.len()]),
            "522dc1f099567d07f47f37a32a84427d643a8cdcbfe5c0c97598a2bd2555d1aa\
             8cb08e48590dbb3da7b08b1056828838c5f61e6393ba7a0abcc9f662"
        );
        assert_eq!(hex(&result[pt.len()..]), "76fc6ece0f4e1768cddf8853bb2d551b");
    }

    #[test]
    fn test_gcm_tamper_detected() {
        let key = [0u8; 16];
        let nonce = [0u8; 12];
        let mut sealed = gcm_encrypt(&key, &nonce, &[], &[0u8; 16]).unwrap();
        sealed[0] ^= 1;
        assert!(matches!(
            gcm_decrypt(&key, &nonce, &[], &sealed),
            Err(CryptoError::AeadTagVerifyFail)
        ));
    }

    #[test]
    fn test_gcm_aad_mismatch_detected() {
        let key = [7u8; 16];
        let nonce = [1u8; 12];
        let sealed = gcm_encrypt(&key, &nonce, b"header", b"body").unwrap();
        assert!(gcm_decrypt(&key, &nonce, b"Header", &sealed).is_err());
    }

    #[test]
    fn test_gcm_short_ciphertext() {
        assert!(gcm_decrypt(&[0u8; 16], &[0u8; 12], &[], &[0u8; 15]).is_err());
    }

    #[test]
    fn test_gcm_keyed_instance_reuse() {
        let gcm = AesGcm::new(&[3u8; 32]).unwrap();
        for i in 0..4u8 {
            let nonce = [i; 12];
            let sealed = gcm.seal(&nonce, &[], b"record payload").unwrap();
            assert_eq!(gcm.open(&nonce, &[], &sealed).unwrap(), b"record payload");
        }
    }
}
