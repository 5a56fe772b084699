//! RSA key generation, encryption and signatures (RFC 8017).
//!
//! Supports PKCS#1 v1.5 for both encryption and signatures, and RSASSA-PSS
//! with SHA-256. Private key operations go through the CRT.

mod pkcs1v15;
mod pss;

use ferrotls_bignum::BigNum;
use ferrotls_types::CryptoError;
use zeroize::Zeroize;

/// F4, the conventional public exponent.
const RSA_PUBLIC_EXPONENT: u64 = 65537;

const RSA_MIN_BITS: usize = 2048;
const RSA_MAX_BITS: usize = 8192;

/// Padding scheme selector for RSA operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    /// RSAES-PKCS1-v1_5 encryption padding.
    Pkcs1v15Encrypt,
    /// EMSA-PKCS1-v1_5 signature padding.
    Pkcs1v15Sign,
    /// EMSA-PSS signature padding (SHA-256, 32-byte salt).
    Pss,
    /// Textbook RSA without padding.
    None,
}

/// An RSA public key (n, e).
#[derive(Clone)]
pub struct RsaPublicKey {
    n: BigNum,
    e: BigNum,
    bits: usize,
    /// Modulus length in bytes.
    k: usize,
}

impl std::fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPublicKey").field("bits", &self.bits).finish()
    }
}

impl RsaPublicKey {
    /// Build a public key from big-endian modulus and exponent bytes.
    pub fn new(n: &[u8], e: &[u8]) -> Result<Self, CryptoError> {
        let n = BigNum::from_bytes_be(n);
        let e = BigNum::from_bytes_be(e);
        // An RSA modulus is odd; so is any usable exponent.
        if n.is_zero() || n.is_even() || e.is_zero() || e.is_even() {
            return Err(CryptoError::InvalidKey);
        }
        let bits = n.bit_len();
        Ok(RsaPublicKey {
            k: bits.div_ceil(8),
            n,
            e,
            bits,
        })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Modulus length in bytes.
    pub fn modulus_len(&self) -> usize {
        self.k
    }

    pub fn n_bytes(&self) -> Vec<u8> {
        self.n.to_bytes_be()
    }

    pub fn e_bytes(&self) -> Vec<u8> {
        self.e.to_bytes_be()
    }

    /// Encrypt a message under the chosen padding.
    pub fn encrypt(&self, padding: RsaPadding, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let em = match padding {
            RsaPadding::Pkcs1v15Encrypt => pkcs1v15::pad_message(plaintext, self.k)?,
            RsaPadding::None => plaintext.to_vec(),
            _ => return Err(CryptoError::InvalidArg),
        };
        self.public_op(&em)
    }

    /// Verify a signature over a message digest.
    pub fn verify(
        &self,
        padding: RsaPadding,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        if signature.len() != self.k {
            return Err(CryptoError::RsaVerifyFail);
        }
        let em = self.public_op(signature)?;
        match padding {
            RsaPadding::Pkcs1v15Sign => pkcs1v15::verify_signature_em(&em, digest, self.k),
            RsaPadding::Pss => pss::verify(&em, digest, self.bits - 1),
            _ => Err(CryptoError::InvalidArg),
        }
    }

    /// RSAEP: m^e mod n, fixed-width output.
    fn public_op(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let m = BigNum::from_bytes_be(data);
        if m >= self.n {
            return Err(CryptoError::InvalidArg);
        }
        m.mod_exp(&self.e, &self.n)?.to_bytes_be_padded(self.k)
    }
}

/// An RSA private key carrying the CRT parameters.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct RsaPrivateKey {
    n: BigNum,
    d: BigNum,
    e: BigNum,
    p: BigNum,
    q: BigNum,
    /// d mod (p-1).
    dp: BigNum,
    /// d mod (q-1).
    dq: BigNum,
    /// q^-1 mod p.
    qinv: BigNum,
    #[zeroize(skip)]
    bits: usize,
    #[zeroize(skip)]
    k: usize,
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey").field("bits", &self.bits).finish()
    }
}

impl RsaPrivateKey {
    /// Generate a key pair of the given modulus size (2048..=8192 bits, even).
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        if !(RSA_MIN_BITS..=RSA_MAX_BITS).contains(&bits) || bits % 2 != 0 {
            return Err(CryptoError::RsaInvalidKeyBits);
        }

        let e = BigNum::from_u64(RSA_PUBLIC_EXPONENT);
        let p = generate_prime(bits / 2, &e)?;
        let q = loop {
            let candidate = generate_prime(bits / 2, &e)?;
            if candidate != p {
                break candidate;
            }
        };
        // qinv = q^-1 mod p needs p > q.
        let (p, q) = if p > q { (p, q) } else { (q, p) };

        let n = p.mul(&q);
        if n.bit_len() != bits {
            return Self::generate(bits);
        }

        let p_minus_1 = p.sub(&BigNum::one());
        let q_minus_1 = q.sub(&BigNum::one());
        let phi = p_minus_1.mul(&q_minus_1);
        let d = e.mod_inv(&phi)?;

        let dp = d.mod_reduce(&p_minus_1)?;
        let dq = d.mod_reduce(&q_minus_1)?;
        let qinv = q.mod_inv(&p)?;

        Ok(RsaPrivateKey {
            k: bits.div_ceil(8),
            n,
            d,
            e,
            p,
            q,
            dp,
            dq,
            qinv,
            bits,
        })
    }

    /// Build a private key from its big-endian components, deriving the
    /// CRT parameters.
    pub fn new(n: &[u8], d: &[u8], e: &[u8], p: &[u8], q: &[u8]) -> Result<Self, CryptoError> {
        let n = BigNum::from_bytes_be(n);
        let d = BigNum::from_bytes_be(d);
        let e = BigNum::from_bytes_be(e);
        let p = BigNum::from_bytes_be(p);
        let q = BigNum::from_bytes_be(q);
        if n.is_zero() || d.is_zero() || e.is_zero() || p.is_zero() || q.is_zero() {
            return Err(CryptoError::InvalidKey);
        }

        let p_minus_1 = p.sub(&BigNum::one());
        let q_minus_1 = q.sub(&BigNum::one());
        let dp = d.mod_reduce(&p_minus_1)?;
        let dq = d.mod_reduce(&q_minus_1)?;
        let qinv = q.mod_inv(&p)?;

        let bits = n.bit_len();
        Ok(RsaPrivateKey {
            k: bits.div_ceil(8),
            n,
            d,
            e,
            p,
            q,
            dp,
            dq,
            qinv,
            bits,
        })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Modulus length in bytes.
    pub fn modulus_len(&self) -> usize {
        self.k
    }

    /// The matching public key.
    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey {
            n: self.n.clone(),
            e: self.e.clone(),
            bits: self.bits,
            k: self.k,
        }
    }

    /// Decrypt a ciphertext under the chosen padding.
    pub fn decrypt(&self, padding: RsaPadding, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() != self.k {
            return Err(CryptoError::InvalidArg);
        }
        let em = self.private_op(ciphertext)?;
        match padding {
            RsaPadding::Pkcs1v15Encrypt => pkcs1v15::unpad_message(&em),
            RsaPadding::None => Ok(em),
            _ => Err(CryptoError::InvalidArg),
        }
    }

    /// Sign a message digest under the chosen padding.
    pub fn sign(&self, padding: RsaPadding, digest: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let em = match padding {
            RsaPadding::Pkcs1v15Sign => pkcs1v15::encode_signature_em(digest, self.k)?,
            RsaPadding::Pss => pss::encode_with_random_salt(digest, self.bits - 1)?,
            RsaPadding::None => digest.to_vec(),
            _ => return Err(CryptoError::InvalidArg),
        };
        self.private_op(&em)
    }

    /// RSADP via the CRT: m1 = c^dp mod p, m2 = c^dq mod q,
    /// m = m2 + q * (qinv * (m1 - m2) mod p).
    fn private_op(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let c = BigNum::from_bytes_be(data);
        if c >= self.n {
            return Err(CryptoError::InvalidArg);
        }

        let m1 = c.mod_exp(&self.dp, &self.p)?;
        let m2 = c.mod_exp(&self.dq, &self.q)?;

        let h = m1.sub(&m2).mul(&self.qinv).mod_reduce(&self.p)?;
        let m = m2.add(&h.mul(&self.q));

        m.to_bytes_be_padded(self.k)
    }
}

/// Find a prime of exactly `bits` bits with gcd(p-1, e) = 1.
fn generate_prime(bits: usize, e: &BigNum) -> Result<BigNum, CryptoError> {
    // FIPS 186-4 table C.2: 5 Miller-Rabin rounds suffice at >= 1024 bits.
    let rounds = if bits >= 1024 { 5 } else { 10 };

    for _ in 0..5000 {
        let candidate = BigNum::random(bits, true)?;

        let p_minus_1 = candidate.sub(&BigNum::one());
        if !p_minus_1.gcd(e)?.is_one() {
            continue;
        }
        if candidate.is_probably_prime(rounds)? {
            return Ok(candidate);
        }
    }
    Err(CryptoError::BnPrimeGenFail)
}

/// MGF1 with SHA-256 (RFC 8017 appendix B.2.1).
pub(crate) fn mgf1_sha256(seed: &[u8], mask_len: usize) -> Result<Vec<u8>, CryptoError> {
    use crate::sha2::{Sha256, SHA256_OUTPUT_SIZE};

    let mut mask = Vec::with_capacity(mask_len.div_ceil(SHA256_OUTPUT_SIZE) * SHA256_OUTPUT_SIZE);
    let mut counter: u32 = 0;
    while mask.len() < mask_len {
        let mut hasher = Sha256::new();
        hasher.update(seed)?;
        hasher.update(&counter.to_be_bytes())?;
        mask.extend_from_slice(&hasher.finish()?);
        counter += 1;
    }
    mask.truncate(mask_len);
    Ok(mask)
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

    // A fixed RSA-1024 key for fast deterministic tests (not for real use).
    #[allow(clippy::type_complexity)]
    fn test_key_1024() -> (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>) {
        let n = hex(
            "00d531c26a4cc6443cca66325ba2746a7eaf0423112d1aa222c8a89f5bb8d12c\
             3dccf8386a53b9aa4d1cfbe5b17ddb8a329732110aa1dd06c55dccb849e5ffc8\
             b2c213bdc95d8fe28e4b75b483b95b7d4cde85ab58dd9cc2b741b79b74c0d09c\
             df85612ca1793d16e28e8d98af311ac3b242c074e551767d0659e9fbaae940c091",
        );
        let e = hex("010001");
        let d = hex(
            "0df14923a68db8dcb8e7e2173812a0fc53f9d3494647dd9ea4bcd25f2f410ec1\
             a3ebffd484513a1ffceb44644d34d45ee6a07198de69140e484a212b440d6c54\
             95e905a5294f7f30066100900603b9f68d2c23d149bb3a09393bca9b09a6d479\
             dd953b76884fb7127db6d169fd7bbdfa5fcd8047876d965d936e819232622cb9",
        );
        let p = hex(
            "00ed8bdd1da05a922e09eae43fc535ba4c0fb7315dab0b6a24136a7ddc0803c1\
             6426f829298419218307822335145a1dc864e3e165a09444fc6106f93809bb934f",
        );
        let q = hex(
            "00e5c19a4c79326ace1080b907791eb70a6a8a164473e18445193743a784f68a\
             72867b962d8c5c42a68ef865c79660a2ae63a9ae8dec8bdcd28e348a3b3544f61f",
        );
        (n, e, d, p, q)
    }

    fn test_keys() -> (RsaPublicKey, RsaPrivateKey) {
        let (n, e, d, p, q) = test_key_1024();
        (
            RsaPublicKey::new(&n, &e).unwrap(),
            RsaPrivateKey::new(&n, &d, &e, &p, &q).unwrap(),
        )
    }

    const DIGEST: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn raw_roundtrip() {
        let (pub_key, priv_key) = test_keys();
        let mut msg = vec![0u8; 128];
        msg[124..].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let ct = pub_key.encrypt(RsaPadding::None, &msg).unwrap();
        assert_eq!(priv_key.decrypt(RsaPadding::None, &ct).unwrap(), msg);
    }

    #[test]
    fn pkcs1v15_sign_verify() {
        let (pub_key, priv_key) = test_keys();
        let digest = hex(DIGEST);

        let sig = priv_key.sign(RsaPadding::Pkcs1v15Sign, &digest).unwrap();
        assert_eq!(sig.len(), pub_key.modulus_len());
        assert!(pub_key
            .verify(RsaPadding::Pkcs1v15Sign, &digest, &sig)
            .unwrap());

        let mut bad = digest;
        bad[0] ^= 0x01;
        assert!(!pub_key.verify(RsaPadding::Pkcs1v15Sign, &bad, &sig).unwrap());
    }

    #[test]
    fn pkcs1v15_encrypt_decrypt() {
        let (pub_key, priv_key) = test_keys();
        let msg = b"premaster secret material";
        let ct = pub_key.encrypt(RsaPadding::Pkcs1v15Encrypt, msg).unwrap();
        assert_eq!(ct.len(), 128);
        assert_eq!(
            priv_key.decrypt(RsaPadding::Pkcs1v15Encrypt, &ct).unwrap(),
            msg
        );
    }

    #[test]
    fn pss_sign_verify() {
        let (pub_key, priv_key) = test_keys();
        let digest = hex(DIGEST);

        let sig = priv_key.sign(RsaPadding::Pss, &digest).unwrap();
        assert!(pub_key.verify(RsaPadding::Pss, &digest, &sig).unwrap());

        let mut bad = digest;
        bad[31] ^= 0x80;
        assert!(!pub_key.verify(RsaPadding::Pss, &bad, &sig).unwrap());
    }

    #[test]
    fn public_key_extraction() {
        let (pub_key, priv_key) = test_keys();
        let derived = priv_key.public_key();
        assert_eq!(derived.n_bytes(), pub_key.n_bytes());
        assert_eq!(derived.e_bytes(), pub_key.e_bytes());
        assert_eq!(derived.bits(), 1024);
    }

    #[test]
    fn rejects_bad_key_sizes() {
        assert!(RsaPrivateKey::generate(1024).is_err());
        assert!(RsaPrivateKey::generate(2049).is_err());
        assert!(RsaPrivateKey::generate(16384).is_err());
    }

    #[test]
    fn rejects_even_modulus_or_exponent() {
        assert!(RsaPublicKey::new(&[0x10], &[0x03]).is_err());
        assert!(RsaPublicKey::new(&[0x0f], &[0x04]).is_err());
    }

    #[test]
    #[ignore] // prime generation takes minutes unoptimized
    fn generate_2048_is_consistent() {
        let key = RsaPrivateKey::generate(2048).unwrap();
        assert_eq!(key.bits(), 2048);
        assert_eq!(key.n, key.p.mul(&key.q));

        let digest = hex(DIGEST);
        let sig = key.sign(RsaPadding::Pkcs1v15Sign, &digest).unwrap();
        assert!(key
            .public_key()
            .verify(RsaPadding::Pkcs1v15Sign, &digest, &sig)
            .unwrap());
    }

    #[test]
    fn mgf1_is_deterministic_with_prefix_property() {
        let short = mgf1_sha256(b"seed", 40).unwrap();
        let long = mgf1_sha256(b"seed", 72).unwrap();
        assert_eq!(short.len(), 40);
        assert_eq!(&long[..40], &short[..]);
    }
}
