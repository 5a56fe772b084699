#![forbid(unsafe_code)]
#![doc = "Cryptographic algorithm library for FerroTLS."]

// Core traits
pub mod provider;

// Hash algorithms
pub mod sha1;
pub mod sha2;

pub mod hash;

// Symmetric ciphers and modes of operation
pub mod aes;
pub mod modes;

// MAC and KDF
pub mod hkdf;
pub mod hmac;

// Asymmetric algorithms
pub mod dh;
pub mod ecc;
pub mod ecdh;
pub mod ecdsa;
pub mod rsa;

// DER encoding for signature interchange
pub mod asn1;
