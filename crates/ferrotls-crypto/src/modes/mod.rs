//! Block cipher modes of operation.

pub mod cbc;
pub mod gcm;

pub use cbc::{cbc_decrypt, cbc_decrypt_blocks, cbc_encrypt, cbc_encrypt_blocks};
pub use gcm::{gcm_decrypt, gcm_encrypt, AesGcm};
