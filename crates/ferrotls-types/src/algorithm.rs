/// Hash algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgId {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgId {
    pub fn output_size(&self) -> usize {
        match self {
            HashAlgId::Sha1 => 20,
            HashAlgId::Sha256 => 32,
            HashAlgId::Sha384 => 48,
            HashAlgId::Sha512 => 64,
        }
    }
}

/// Asymmetric (public key) algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkeyAlgId {
    Rsa,
    Dh,
    Ecdsa,
    Ecdh,
}

/// Elliptic curve parameter identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EccCurveId {
    NistP256,
    NistP384,
    NistP521,
}

/// Finite-field DH named groups (RFC 7919).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DhParamId {
    Ffdhe2048,
    Ffdhe3072,
}

impl DhParamId {
    /// Prime modulus length in bytes.
    pub fn prime_size(&self) -> usize {
        match self {
            DhParamId::Ffdhe2048 => 256,
            DhParamId::Ffdhe3072 => 384,
        }
    }
}

/// Elliptic curve point encoding formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointFormat {
    #[default]
    Uncompressed,
    Compressed,
}
