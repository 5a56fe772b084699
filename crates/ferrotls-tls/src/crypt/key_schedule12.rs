//! TLS 1.2 master secret and key block derivation (RFC 5246 section 8).

use ferrotls_types::{HashAlgId, TlsError};
use zeroize::Zeroize;

use super::prf::prf;
use super::Tls12CipherSuiteParams;

pub const MASTER_SECRET_LEN: usize = 48;
pub const VERIFY_DATA_LEN: usize = 12;

/// master_secret = PRF(pre_master, "master secret", CR || SR)[0..48].
pub fn derive_master_secret(
    alg: HashAlgId,
    pre_master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<Vec<u8>, TlsError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);
    prf(
        alg,
        pre_master_secret,
        b"master secret",
        &seed,
        MASTER_SECRET_LEN,
    )
}

/// Per-direction record protection material sliced from the key block.
pub struct Tls12KeyBlock {
    pub client_write_mac_key: Vec<u8>,
    pub server_write_mac_key: Vec<u8>,
    pub client_write_key: Vec<u8>,
    pub server_write_key: Vec<u8>,
    pub client_write_iv: Vec<u8>,
    pub server_write_iv: Vec<u8>,
}

impl Drop for Tls12KeyBlock {
    fn drop(&mut self) {
        self.client_write_mac_key.zeroize();
        self.server_write_mac_key.zeroize();
        self.client_write_key.zeroize();
        self.server_write_key.zeroize();
        self.client_write_iv.zeroize();
        self.server_write_iv.zeroize();
    }
}

/// One side's keys borrowed out of the block.
pub struct DirectionKeys<'a> {
    pub mac_key: &'a [u8],
    pub key: &'a [u8],
    pub iv: &'a [u8],
}

impl Tls12KeyBlock {
    /// key_block = PRF(master, "key expansion", SR || CR), sliced in the
    /// RFC order: MAC keys, encryption keys, IVs, client before server.
    pub fn derive(
        params: &Tls12CipherSuiteParams,
        master_secret: &[u8],
        client_random: &[u8; 32],
        server_random: &[u8; 32],
    ) -> Result<Self, TlsError> {
        let mut seed = Vec::with_capacity(64);
        seed.extend_from_slice(server_random);
        seed.extend_from_slice(client_random);
        let block = prf(
            params.prf_alg,
            master_secret,
            b"key expansion",
            &seed,
            params.key_block_len(),
        )?;

        let mut at = 0usize;
        let mut take = |n: usize| {
            let out = block[at..at + n].to_vec();
            at += n;
            out
        };
        let client_write_mac_key = take(params.mac_key_len);
        let server_write_mac_key = take(params.mac_key_len);
        let client_write_key = take(params.enc_key_len);
        let server_write_key = take(params.enc_key_len);
        let client_write_iv = take(params.fixed_iv_len);
        let server_write_iv = take(params.fixed_iv_len);
        Ok(Self {
            client_write_mac_key,
            server_write_mac_key,
            client_write_key,
            server_write_key,
            client_write_iv,
            server_write_iv,
        })
    }

    pub fn client(&self) -> DirectionKeys<'_> {
        DirectionKeys {
            mac_key: &self.client_write_mac_key,
            key: &self.client_write_key,
            iv: &self.client_write_iv,
        }
    }

    pub fn server(&self) -> DirectionKeys<'_> {
        DirectionKeys {
            mac_key: &self.server_write_mac_key,
            key: &self.server_write_key,
            iv: &self.server_write_iv,
        }
    }
}

/// verify_data = PRF(master, label, Hash(transcript))[0..12].
pub fn compute_verify_data(
    alg: HashAlgId,
    master_secret: &[u8],
    label: &[u8],
    transcript_hash: &[u8],
) -> Result<Vec<u8>, TlsError> {
    prf(alg, master_secret, label, transcript_hash, VERIFY_DATA_LEN)
}
