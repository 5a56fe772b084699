//! HKDF (HMAC-based Extract-and-Expand Key Derivation Function), RFC 5869.
//!
//! Extract condenses input keying material into a fixed-length
//! pseudorandom key; expand stretches that key into any amount of output
//! keying material bound to a context string.

use ferrotls_types::{CryptoError, HashAlgId};
use zeroize::Zeroize;

use crate::hmac::Hmac;

/// HKDF context holding the extracted pseudorandom key.
pub struct Hkdf {
    alg: HashAlgId,
    /// The pseudorandom key from the extract step.
    prk: Vec<u8>,
}

impl Hkdf {
    /// Perform the extract step: PRK = HMAC-Hash(salt, IKM).
    ///
    /// An empty `salt` is treated as a string of hash-length zero bytes,
    /// as the RFC specifies.
    pub fn new(alg: HashAlgId, salt: &[u8], ikm: &[u8]) -> Result<Self, CryptoError> {
        let zero_salt;
        let salt = if salt.is_empty() {
            zero_salt = vec![0u8; alg.output_size()];
            &zero_salt
        } else {
            salt
        };
        let prk = Hmac::mac(alg, salt, ikm)?;
        Ok(Self { alg, prk })
    }

    /// Construct directly from an existing pseudorandom key.
    pub fn from_prk(alg: HashAlgId, prk: &[u8]) -> Result<Self, CryptoError> {
        if prk.len() < alg.output_size() {
            return Err(CryptoError::InvalidKey);
        }
        Ok(Self {
            alg,
            prk: prk.to_vec(),
        })
    }

    /// The extracted pseudorandom key.
    pub fn prk(&self) -> &[u8] {
        &self.prk
    }

    /// Perform the expand step to derive `okm_len` bytes of output keying
    /// material.
    pub fn expand(&self, info: &[u8], okm_len: usize) -> Result<Vec<u8>, CryptoError> {
        let hash_len = self.alg.output_size();
        if okm_len > 255 * hash_len {
            return Err(CryptoError::InputOverflow);
        }

        let mut okm = Vec::with_capacity(okm_len);
        let mut t: Vec<u8> = Vec::new();
        let mut counter = 1u8;
        while okm.len() < okm_len {
            let mut mac = Hmac::new(self.alg, &self.prk)?;
            mac.update(&t)?;
            mac.update(info)?;
            mac.update(&[counter])?;
            let mut block = vec![0u8; hash_len];
            mac.finish(&mut block)?;
            let take = (okm_len - okm.len()).min(hash_len);
            okm.extend_from_slice(&block[..take]);
            t = block;
            counter += 1;
        }
        t.zeroize();
        Ok(okm)
    }

    /// One-shot: extract and expand in a single call.
    pub fn derive(
        alg: HashAlgId,
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        okm_len: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        Self::new(alg, salt, ikm)?.expand(info, okm_len)
    }
}

impl Drop for Hkdf {
    fn drop(&mut self) {
        self.prk.zeroize();
    }
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

    // RFC 5869 Test Case 1 (SHA-256, basic)
    #[test]
    fn test_hkdf_sha256_case1() {
        let ikm = [0x0b; 22];
        let salt = hex("000102030405060708090a0b0c");
        let info = hex("f0f1f2f3f4f5f6f7f8f9");

        let kdf = Hkdf::new(HashAlgId::Sha256, &salt, &ikm).unwrap();
        assert_eq!(
            kdf.prk(),
            &hex("077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5")[..]
        );

        let okm = kdf.expand(&info, 42).unwrap();
        assert_eq!(
            okm,
            hex(
                "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf\
                 34007208d5b887185865"
            )
        );
    }

    // RFC 5869 Test Case 3 (SHA-256, empty salt and info)
    #[test]
    fn test_hkdf_sha256_case3() {
        let ikm = [0x0b; 22];

        let kdf = Hkdf::new(HashAlgId::Sha256, &[], &ikm).unwrap();
        assert_eq!(
            kdf.prk(),
            &hex("19ef24a32c717b167f33a91d6f648bdf96596776afdb6377ac434c1c293ccb04")[..]
        );

        let okm = kdf.expand(&[], 42).unwrap();
        assert_eq!(
            okm,
            hex(
                "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d\
                 9d201395faa4b61a96c8"
            )
        );
    }

    #[test]
    fn test_hkdf_expand_limit() {
        let kdf = Hkdf::new(HashAlgId::Sha256, &[], &[0x0b; 22]).unwrap();
        assert!(kdf.expand(&[], 255 * 32).is_ok());
        assert!(kdf.expand(&[], 255 * 32 + 1).is_err());
    }

    #[test]
    fn test_hkdf_from_prk_matches_extract() {
        let ikm = [0x42; 32];
        let extracted = Hkdf::new(HashAlgId::Sha384, b"salt", &ikm).unwrap();
        let reloaded = Hkdf::from_prk(HashAlgId::Sha384, extracted.prk()).unwrap();
        assert_eq!(
            extracted.expand(b"ctx", 64).unwrap(),
            reloaded.expand(b"ctx", 64).unwrap()
        );
    }
}
