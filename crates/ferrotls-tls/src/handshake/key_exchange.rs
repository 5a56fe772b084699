//! Ephemeral key shares for ECDHE and FFDHE groups.

use ferrotls_crypto::dh::{DhKeyPair, DhParams};
use ferrotls_crypto::ecdh::EcdhKeyPair;
use ferrotls_types::TlsError;

use crate::crypt::NamedGroup;

enum ShareKind {
    Ecdh(EcdhKeyPair),
    Dh(DhKeyPair, DhParams),
}

/// One generated key share, tied to its named group.
pub struct ActiveKeyShare {
    group: NamedGroup,
    inner: ShareKind,
}

impl ActiveKeyShare {
    pub fn generate(group: NamedGroup) -> Result<Self, TlsError> {
        let inner = if let Some(curve_id) = group.curve_id() {
            ShareKind::Ecdh(EcdhKeyPair::generate(curve_id)?)
        } else if let Some(dh_id) = group.dh_id() {
            let params = DhParams::from_group(dh_id)?;
            let pair = DhKeyPair::generate(&params)?;
            ShareKind::Dh(pair, params)
        } else {
            return Err(TlsError::NoSharedGroup);
        };
        Ok(Self { group, inner })
    }

    /// Key share over explicit TLS 1.2 ServerKeyExchange DH parameters.
    pub fn from_explicit_dh(p: &[u8], g: &[u8]) -> Result<Self, TlsError> {
        let params = DhParams::new(p, g)?;
        let pair = DhKeyPair::generate(&params)?;
        Ok(Self {
            // Explicit parameters have no registered group code.
            group: NamedGroup(0),
            inner: ShareKind::Dh(pair, params),
        })
    }

    pub fn group(&self) -> NamedGroup {
        self.group
    }

    /// The DH domain parameters, for suites that put them on the wire.
    pub fn dh_params(&self) -> Option<&DhParams> {
        match &self.inner {
            ShareKind::Dh(_, params) => Some(params),
            ShareKind::Ecdh(_) => None,
        }
    }

    /// Wire form: uncompressed EC point or padded DH public value.
    pub fn public_bytes(&self) -> Result<Vec<u8>, TlsError> {
        match &self.inner {
            ShareKind::Ecdh(pair) => Ok(pair.public_key_bytes()?),
            ShareKind::Dh(pair, params) => Ok(pair.public_key_bytes(params)?),
        }
    }

    pub fn shared_secret(&self, peer_public: &[u8]) -> Result<Vec<u8>, TlsError> {
        match &self.inner {
            ShareKind::Ecdh(pair) => Ok(pair.compute_shared_secret(peer_public)?),
            ShareKind::Dh(pair, params) => Ok(pair.compute_shared_secret(params, peer_public)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecdhe_share_agreement() {
        let a = ActiveKeyShare::generate(NamedGroup::SECP256R1).unwrap();
        let b = ActiveKeyShare::generate(NamedGroup::SECP256R1).unwrap();
        let sa = a.shared_secret(&b.public_bytes().unwrap()).unwrap();
        let sb = b.shared_secret(&a.public_bytes().unwrap()).unwrap();
        assert_eq!(sa, sb);
        assert_eq!(sa.len(), 32);
        // Uncompressed point: 0x04 || X || Y.
        assert_eq!(a.public_bytes().unwrap()[0], 0x04);
        assert_eq!(a.public_bytes().unwrap().len(), 65);
    }

    #[test]
    fn test_ffdhe_share_agreement() {
        let a = ActiveKeyShare::generate(NamedGroup::FFDHE2048).unwrap();
        let b = ActiveKeyShare::generate(NamedGroup::FFDHE2048).unwrap();
        let sa = a.shared_secret(&b.public_bytes().unwrap()).unwrap();
        let sb = b.shared_secret(&a.public_bytes().unwrap()).unwrap();
        assert_eq!(sa, sb);
        assert_eq!(a.public_bytes().unwrap().len(), 256);
    }

    #[test]
    fn test_unsupported_group_rejected() {
        // x25519 is not implemented.
        assert!(ActiveKeyShare::generate(NamedGroup(0x001D)).is_err());
    }

    #[test]
    fn test_degenerate_peer_value_rejected() {
        let share = ActiveKeyShare::generate(NamedGroup::FFDHE2048).unwrap();
        let mut one = vec![0u8; 256];
        one[255] = 1;
        assert!(share.shared_secret(&one).is_err());
    }
}
