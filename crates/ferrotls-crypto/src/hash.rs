//! Unified hash entry point.
//!
//! Re-exports the concrete digest types and provides runtime algorithm
//! selection keyed by [`HashAlgId`], which is what the cipher suite layer
//! uses.

use ferrotls_types::{CryptoError, HashAlgId};

pub use crate::provider::Digest;
pub use crate::sha1::Sha1;
pub use crate::sha2::{Sha256, Sha384, Sha512};

/// Create a boxed digest context for the given algorithm.
pub fn new_digest(alg: HashAlgId) -> Box<dyn Digest> {
    match alg {
        HashAlgId::Sha1 => Box::new(Sha1::new()),
        HashAlgId::Sha256 => Box::new(Sha256::new()),
        HashAlgId::Sha384 => Box::new(Sha384::new()),
        HashAlgId::Sha512 => Box::new(Sha512::new()),
    }
}

/// One-shot digest computation.
pub fn hash(alg: HashAlgId, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut ctx = new_digest(alg);
    ctx.update(data)?;
    let mut out = vec![0u8; ctx.output_size()];
    ctx.finish(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_output_sizes() {
        for (alg, len) in [
            (HashAlgId::Sha1, 20),
            (HashAlgId::Sha256, 32),
            (HashAlgId::Sha384, 48),
            (HashAlgId::Sha512, 64),
        ] {
            assert_eq!(new_digest(alg).output_size(), len);
            assert_eq!(hash(alg, b"x").unwrap().len(), len);
        }
    }

    #[test]
    fn test_oneshot_matches_concrete_type() {
        let via_factory = hash(HashAlgId::Sha256, b"abc").unwrap();
        let direct = Sha256::digest(b"abc").unwrap();
        assert_eq!(via_factory, direct.to_vec());
    }
}
