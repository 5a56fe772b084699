#![forbid(unsafe_code)]
#![doc = "TLS 1.2 and 1.3 protocol implementation for FerroTLS."]

pub mod alert;
pub mod codec;
pub mod config;
pub mod connection;
pub mod crypt;
pub mod extensions;
pub mod handshake;
pub mod record;
pub mod session;

pub use ferrotls_types::TlsError;

/// Supported protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

impl TlsVersion {
    /// The version field as it appears on the wire.
    pub fn wire(self) -> u16 {
        match self {
            TlsVersion::Tls12 => 0x0303,
            TlsVersion::Tls13 => 0x0304,
        }
    }

    pub fn from_wire(v: u16) -> Option<Self> {
        match v {
            0x0303 => Some(TlsVersion::Tls12),
            0x0304 => Some(TlsVersion::Tls13),
            _ => None,
        }
    }
}

/// IANA cipher suite identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite(pub u16);

impl CipherSuite {
    // TLS 1.3 (RFC 8446)
    pub const TLS_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0x1301);
    pub const TLS_AES_256_GCM_SHA384: CipherSuite = CipherSuite(0x1302);

    // TLS 1.2 ECDHE (RFC 5289)
    pub const TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0xC02F);
    pub const TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384: CipherSuite = CipherSuite(0xC030);
    pub const TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0xC02B);
    pub const TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384: CipherSuite = CipherSuite(0xC02C);
    pub const TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256: CipherSuite = CipherSuite(0xC027);
    pub const TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256: CipherSuite = CipherSuite(0xC023);

    // TLS 1.2 DHE and static RSA (RFC 5246, RFC 5288)
    pub const TLS_DHE_RSA_WITH_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0x009E);
    pub const TLS_DHE_RSA_WITH_AES_256_GCM_SHA384: CipherSuite = CipherSuite(0x009F);
    pub const TLS_RSA_WITH_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0x009C);
    pub const TLS_RSA_WITH_AES_256_GCM_SHA384: CipherSuite = CipherSuite(0x009D);
    pub const TLS_RSA_WITH_AES_128_CBC_SHA256: CipherSuite = CipherSuite(0x003C);
}

/// Endpoint role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRole {
    Client,
    Server,
}

/// A TLS connection over some byte transport.
pub trait TlsConnection {
    /// Run the handshake to completion.
    fn handshake(&mut self) -> Result<(), TlsError>;

    /// Read decrypted application data. Returns 0 at a clean close.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError>;

    /// Write application data, fragmenting into records as needed.
    fn write(&mut self, data: &[u8]) -> Result<usize, TlsError>;

    /// Send close_notify and mark the connection closed.
    fn shutdown(&mut self) -> Result<(), TlsError>;

    /// The negotiated protocol version, once the handshake completed.
    fn version(&self) -> Option<TlsVersion>;

    /// The negotiated cipher suite, once the handshake completed.
    fn cipher_suite(&self) -> Option<CipherSuite>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_wire_values() {
        assert_eq!(TlsVersion::Tls12.wire(), 0x0303);
        assert_eq!(TlsVersion::Tls13.wire(), 0x0304);
        assert_eq!(TlsVersion::from_wire(0x0304), Some(TlsVersion::Tls13));
        assert_eq!(TlsVersion::from_wire(0x0301), None);
    }

    #[test]
    fn test_version_ordering() {
        assert!(TlsVersion::Tls12 < TlsVersion::Tls13);
    }

    #[test]
    fn test_cipher_suite_ids() {
        assert_eq!(CipherSuite::TLS_AES_128_GCM_SHA256.0, 0x1301);
        assert_eq!(CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256.0, 0xC02F);
        assert_eq!(CipherSuite::TLS_DHE_RSA_WITH_AES_256_GCM_SHA384.0, 0x009F);
    }
}
