//! TLS 1.3 key schedule (RFC 8446 section 7.1).
//!
//! The schedule advances through three extraction stages: early secret,
//! handshake secret, master secret. Each stage must be entered in order;
//! deriving from the wrong stage is a caller bug surfaced as an error.

use ferrotls_crypto::hmac::Hmac;
use ferrotls_types::TlsError;
use zeroize::Zeroize;

use super::hkdf::{derive_secret, hkdf_expand_label, hkdf_extract};
use super::CipherSuiteParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScheduleStage {
    Initial,
    EarlySecret,
    HandshakeSecret,
    MasterSecret,
}

pub struct KeySchedule {
    params: CipherSuiteParams,
    stage: KeyScheduleStage,
    current_secret: Vec<u8>,
}

impl Drop for KeySchedule {
    fn drop(&mut self) {
        self.current_secret.zeroize();
    }
}

impl KeySchedule {
    pub fn new(params: CipherSuiteParams) -> Self {
        Self {
            params,
            stage: KeyScheduleStage::Initial,
            current_secret: Vec::new(),
        }
    }

    pub fn stage(&self) -> KeyScheduleStage {
        self.stage
    }

    fn require_stage(&self, want: KeyScheduleStage, op: &str) -> Result<(), TlsError> {
        if self.stage != want {
            return Err(TlsError::HandshakeFailed(format!(
                "key schedule: {op} in stage {:?}",
                self.stage
            )));
        }
        Ok(())
    }

    /// Early-Secret = HKDF-Extract(0, PSK or 0^hash_len).
    pub fn derive_early_secret(&mut self, psk: Option<&[u8]>) -> Result<(), TlsError> {
        self.require_stage(KeyScheduleStage::Initial, "derive_early_secret")?;
        let zeros = vec![0u8; self.params.hash_len()];
        let ikm = psk.unwrap_or(&zeros);
        self.current_secret = hkdf_extract(self.params.hash_alg, &[], ikm)?;
        self.stage = KeyScheduleStage::EarlySecret;
        Ok(())
    }

    /// binder_key = Derive-Secret(Early, "res binder" | "ext binder", Hash("")).
    pub fn derive_binder_key(&mut self, external: bool) -> Result<Vec<u8>, TlsError> {
        self.require_stage(KeyScheduleStage::EarlySecret, "derive_binder_key")?;
        let label = if external { "ext binder" } else { "res binder" };
        let empty = ferrotls_crypto::hash::hash(self.params.hash_alg, &[])?;
        derive_secret(self.params.hash_alg, &self.current_secret, label, &empty)
    }

    /// client_early_traffic_secret over the ClientHello transcript.
    pub fn derive_early_traffic_secret(
        &mut self,
        transcript_hash: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        self.require_stage(KeyScheduleStage::EarlySecret, "derive_early_traffic_secret")?;
        derive_secret(
            self.params.hash_alg,
            &self.current_secret,
            "c e traffic",
            transcript_hash,
        )
    }

    /// Handshake-Secret = HKDF-Extract(Derive-Secret(Early, "derived", ""), DHE).
    pub fn derive_handshake_secret(&mut self, dhe_shared: &[u8]) -> Result<(), TlsError> {
        self.require_stage(KeyScheduleStage::EarlySecret, "derive_handshake_secret")?;
        let empty = ferrotls_crypto::hash::hash(self.params.hash_alg, &[])?;
        let salt = derive_secret(self.params.hash_alg, &self.current_secret, "derived", &empty)?;
        self.current_secret = hkdf_extract(self.params.hash_alg, &salt, dhe_shared)?;
        self.stage = KeyScheduleStage::HandshakeSecret;
        Ok(())
    }

    /// (client_hs_traffic_secret, server_hs_traffic_secret) over CH..SH.
    pub fn derive_handshake_traffic_secrets(
        &self,
        transcript_hash: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), TlsError> {
        self.require_stage(
            KeyScheduleStage::HandshakeSecret,
            "derive_handshake_traffic_secrets",
        )?;
        let client = derive_secret(
            self.params.hash_alg,
            &self.current_secret,
            "c hs traffic",
            transcript_hash,
        )?;
        let server = derive_secret(
            self.params.hash_alg,
            &self.current_secret,
            "s hs traffic",
            transcript_hash,
        )?;
        Ok((client, server))
    }

    /// Master-Secret = HKDF-Extract(Derive-Secret(HS, "derived", ""), 0^hash_len).
    pub fn derive_master_secret(&mut self) -> Result<(), TlsError> {
        self.require_stage(KeyScheduleStage::HandshakeSecret, "derive_master_secret")?;
        let empty = ferrotls_crypto::hash::hash(self.params.hash_alg, &[])?;
        let salt = derive_secret(self.params.hash_alg, &self.current_secret, "derived", &empty)?;
        let zeros = vec![0u8; self.params.hash_len()];
        self.current_secret = hkdf_extract(self.params.hash_alg, &salt, &zeros)?;
        self.stage = KeyScheduleStage::MasterSecret;
        Ok(())
    }

    /// (client_app_traffic_secret_0, server_app_traffic_secret_0) over CH..SF.
    pub fn derive_app_traffic_secrets(
        &self,
        transcript_hash: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), TlsError> {
        self.require_stage(KeyScheduleStage::MasterSecret, "derive_app_traffic_secrets")?;
        let client = derive_secret(
            self.params.hash_alg,
            &self.current_secret,
            "c ap traffic",
            transcript_hash,
        )?;
        let server = derive_secret(
            self.params.hash_alg,
            &self.current_secret,
            "s ap traffic",
            transcript_hash,
        )?;
        Ok((client, server))
    }

    /// exporter_master_secret over CH..SF.
    pub fn derive_exporter_master_secret(
        &self,
        transcript_hash: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        self.require_stage(
            KeyScheduleStage::MasterSecret,
            "derive_exporter_master_secret",
        )?;
        derive_secret(
            self.params.hash_alg,
            &self.current_secret,
            "exp master",
            transcript_hash,
        )
    }

    /// resumption_master_secret over CH..client Finished.
    pub fn derive_resumption_master_secret(
        &self,
        transcript_hash: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        self.require_stage(
            KeyScheduleStage::MasterSecret,
            "derive_resumption_master_secret",
        )?;
        derive_secret(
            self.params.hash_alg,
            &self.current_secret,
            "res master",
            transcript_hash,
        )
    }

    /// finished_key = HKDF-Expand-Label(base_secret, "finished", "", hash_len).
    pub fn derive_finished_key(&self, base_secret: &[u8]) -> Result<Vec<u8>, TlsError> {
        hkdf_expand_label(
            self.params.hash_alg,
            base_secret,
            "finished",
            &[],
            self.params.hash_len(),
        )
    }

    /// verify_data = HMAC(finished_key, transcript_hash).
    pub fn compute_finished_verify_data(
        &self,
        base_secret: &[u8],
        transcript_hash: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let mut finished_key = self.derive_finished_key(base_secret)?;
        let out = Hmac::mac(self.params.hash_alg, &finished_key, transcript_hash)?;
        finished_key.zeroize();
        Ok(out)
    }

    /// PSK = HKDF-Expand-Label(resumption_master, "resumption", nonce, hash_len).
    pub fn derive_resumption_psk(
        &self,
        resumption_master: &[u8],
        ticket_nonce: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        hkdf_expand_label(
            self.params.hash_alg,
            resumption_master,
            "resumption",
            ticket_nonce,
            self.params.hash_len(),
        )
    }

    /// next_secret = HKDF-Expand-Label(secret, "traffic upd", "", hash_len).
    pub fn update_traffic_secret(&self, secret: &[u8]) -> Result<Vec<u8>, TlsError> {
        hkdf_expand_label(
            self.params.hash_alg,
            secret,
            "traffic upd",
            &[],
            self.params.hash_len(),
        )
    }
}
