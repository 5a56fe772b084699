//! Finite-field Diffie-Hellman key agreement.
//!
//! Works over the RFC 7919 named groups or caller-supplied (p, g)
//! parameters. Public values and shared secrets are fixed-width
//! big-endian octet strings of the prime length.

mod groups;

use ferrotls_bignum::BigNum;
use ferrotls_types::{CryptoError, DhParamId};
use zeroize::Zeroize;

/// Diffie-Hellman domain parameters.
#[derive(Clone)]
pub struct DhParams {
    p: BigNum,
    g: BigNum,
}

impl DhParams {
    /// Parameters from big-endian prime and generator bytes.
    pub fn new(p: &[u8], g: &[u8]) -> Result<Self, CryptoError> {
        if p.is_empty() || g.is_empty() {
            return Err(CryptoError::NullInput);
        }
        let p = BigNum::from_bytes_be(p);
        let g = BigNum::from_bytes_be(g);
        // p must be an odd number with at least two bits, g in (1, p).
        if p.bit_len() < 2 || p.is_even() {
            return Err(CryptoError::InvalidArg);
        }
        if g.is_zero() || g.is_one() || g >= p {
            return Err(CryptoError::InvalidArg);
        }
        Ok(DhParams { p, g })
    }

    /// Parameters of a named RFC 7919 group.
    pub fn from_group(id: DhParamId) -> Result<Self, CryptoError> {
        let (p, g) = groups::ffdhe_params(id)?;
        Ok(DhParams { p, g })
    }

    /// Prime length in bytes.
    pub fn prime_size(&self) -> usize {
        self.p.bit_len().div_ceil(8)
    }

    /// Prime bytes, big-endian without leading zeros.
    pub fn p_bytes(&self) -> Vec<u8> {
        self.p.to_bytes_be()
    }

    /// Generator bytes, big-endian without leading zeros.
    pub fn g_bytes(&self) -> Vec<u8> {
        self.g.to_bytes_be()
    }
}

/// A DH key pair: private exponent x and public value g^x mod p.
#[derive(Clone)]
pub struct DhKeyPair {
    private_key: BigNum,
    public_key: BigNum,
}

impl Drop for DhKeyPair {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl DhKeyPair {
    /// Generate a key pair with x uniform in [1, p-2].
    pub fn generate(params: &DhParams) -> Result<Self, CryptoError> {
        let exp_bound = params.p.sub(&BigNum::from_u64(2));
        let x = BigNum::random_range(&exp_bound)?;
        let y = params.g.mod_exp(&x, &params.p)?;
        Ok(DhKeyPair {
            private_key: x,
            public_key: y,
        })
    }

    /// Public value, left-padded to the prime length.
    pub fn public_key_bytes(&self, params: &DhParams) -> Result<Vec<u8>, CryptoError> {
        self.public_key.to_bytes_be_padded(params.prime_size())
    }

    /// peer^x mod p, left-padded to the prime length.
    ///
    /// The peer value must lie in [2, p-2]; this rejects the degenerate
    /// subgroup elements 0, 1 and p-1.
    pub fn compute_shared_secret(
        &self,
        params: &DhParams,
        peer_public: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let peer = BigNum::from_bytes_be(peer_public);
        let p_minus_1 = params.p.sub(&BigNum::one());
        if peer <= BigNum::one() || peer >= p_minus_1 {
            return Err(CryptoError::DhInvalidPublic);
        }
        let shared = peer.mod_exp(&self.private_key, &params.p)?;
        shared.to_bytes_be_padded(params.prime_size())
    }
}
