//! Traffic key derivation from a TLS 1.3 traffic secret (RFC 8446 7.3).

use ferrotls_types::TlsError;
use zeroize::Zeroize;

use super::hkdf::hkdf_expand_label;
use super::CipherSuiteParams;

/// AEAD write key and static IV for one direction.
#[derive(Debug)]
pub struct TrafficKeys {
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl Drop for TrafficKeys {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl TrafficKeys {
    pub fn derive(params: &CipherSuiteParams, secret: &[u8]) -> Result<Self, TlsError> {
        let key = hkdf_expand_label(params.hash_alg, secret, "key", &[], params.key_len)?;
        let iv = hkdf_expand_label(params.hash_alg, secret, "iv", &[], params.iv_len)?;
        Ok(Self { key, iv })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CipherSuite;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    // RFC 8448 section 3: keys from the server handshake traffic secret.
    #[test]
    fn test_rfc8448_server_handshake_keys() {
        let params =
            CipherSuiteParams::from_suite(CipherSuite::TLS_AES_128_GCM_SHA256).unwrap();
        let secret =
            hex("b67b7d690cc16c4e75e54213cb2d37b4e9c912bcded9105d42befd59d391ad38");
        let keys = TrafficKeys::derive(&params, &secret).unwrap();
        assert_eq!(keys.key, hex("3fce516009c21727d0f2e4e86ee403bc"));
        assert_eq!(keys.iv, hex("5d313eb2671276ee13000b30"));
    }

    // RFC 8448 section 3: keys from the client handshake traffic secret.
    #[test]
    fn test_rfc8448_client_handshake_keys() {
        let params =
            CipherSuiteParams::from_suite(CipherSuite::TLS_AES_128_GCM_SHA256).unwrap();
        let secret =
            hex("b3eddb126e067f35a780b3abf45e2d8f3b1a950738f52e9600746a0e27a55a21");
        let keys = TrafficKeys::derive(&params, &secret).unwrap();
        assert_eq!(keys.key, hex("dbfaa693d1762c5b666af5d950258d01"));
        assert_eq!(keys.iv, hex("5bd3c71b836e0b76bb73265f"));
    }

    #[test]
    fn test_aes256_lengths() {
        let params =
            CipherSuiteParams::from_suite(CipherSuite::TLS_AES_256_GCM_SHA384).unwrap();
        let keys = TrafficKeys::derive(&params, &[0x33u8; 48]).unwrap();
        assert_eq!(keys.key.len(), 32);
        assert_eq!(keys.iv.len(), 12);
    }
}
