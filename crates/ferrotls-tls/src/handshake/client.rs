//! Client handshake driver.
//!
//! Consumes raw handshake messages and yields `Actions` for the record
//! layer, so the whole exchange is testable without a transport. The TLS
//! 1.3 path lives here; the TLS 1.2 continuation after a downgraded
//! ServerHello is in `client12`.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use ferrotls_types::TlsError;

use super::codec::{
    Certificate13, CertificateVerify, ClientHello, DecodeContext, Finished, HandshakePayload,
    KeyUpdateRequest, NewSessionTicket13, ServerHello, decode_handshake,
};
use super::key_exchange::ActiveKeyShare;
use super::verify::{select_scheme, sign_with_key, signature_context, verify_with_peer_key};
use super::{Actions, HandshakeState, HandshakeType, KeyActivation, Outbound, transition};
use crate::config::{PeerPublicKey, TlsConfig};
use crate::crypt::key_schedule::KeySchedule;
use crate::crypt::traffic_keys::TrafficKeys;
use crate::crypt::transcript::TranscriptHash;
use crate::crypt::{CipherSuiteParams, Tls12CipherSuiteParams, is_tls12_suite, is_tls13_suite};
use crate::extensions::{
    ExtensionPayload, ExtensionType, PSK_MODE_DHE_KE, PskIdentity, find_extension,
};
use crate::session::TlsSession;
use crate::{CipherSuite, TlsRole, TlsVersion};

const MAX_KEY_UPDATES: u32 = 128;

pub struct ClientHandshake {
    pub(crate) config: Arc<TlsConfig>,
    pub(crate) state: HandshakeState,
    pub(crate) transcript: TranscriptHash,
    pub(crate) random: [u8; 32],
    pub(crate) session_id: Vec<u8>,
    pub(crate) share: Option<ActiveKeyShare>,
    pub(crate) version: Option<TlsVersion>,

    // TLS 1.3 progress.
    params: Option<CipherSuiteParams>,
    key_schedule: Option<KeySchedule>,
    offered_psk: Option<TlsSession>,
    psk_in_use: bool,
    hrr_seen: bool,
    client_hs_secret: Vec<u8>,
    server_hs_secret: Vec<u8>,
    client_app_secret: Vec<u8>,
    server_app_secret: Vec<u8>,
    resumption_master: Vec<u8>,
    cert_request_context: Option<Vec<u8>>,
    peer_key: Option<PeerPublicKey>,
    key_updates: u32,
    pending_early_data: Option<Vec<u8>>,
    early_data_in_flight: bool,

    // TLS 1.2 progress, driven from `client12`.
    pub(crate) server_random: [u8; 32],
    pub(crate) params12: Option<Tls12CipherSuiteParams>,
    pub(crate) master_secret12: Vec<u8>,
    pub(crate) peer_key12: Option<PeerPublicKey>,
    pub(crate) pending_read12: Option<KeyActivation>,
    pub(crate) offered_ticket12: Option<Vec<u8>>,
    pub(crate) new_ticket12: Option<Vec<u8>>,
    pub(crate) cert_requested12: bool,
    pub(crate) server_kx_public12: Vec<u8>,
    pub(crate) abbreviated12: bool,
    pub(crate) client_finished_sent12: bool,
    pub(crate) latest_session: Option<TlsSession>,
}

impl Drop for ClientHandshake {
    fn drop(&mut self) {
        self.client_hs_secret.zeroize();
        self.server_hs_secret.zeroize();
        self.client_app_secret.zeroize();
        self.server_app_secret.zeroize();
        self.resumption_master.zeroize();
        self.master_secret12.zeroize();
    }
}

impl ClientHandshake {
    pub fn new(config: Arc<TlsConfig>) -> Result<Self, TlsError> {
        let mut random = [0u8; 32];
        getrandom::getrandom(&mut random)
            .map_err(|_| TlsError::HandshakeFailed("random generation failed".to_string()))?;

        let offered_psk = if config.session_resumption {
            config
                .resumption_session
                .as_ref()
                .filter(|s| s.version == TlsVersion::Tls13)
                .cloned()
        } else {
            None
        };
        let offered_ticket12 = if config.session_resumption {
            config
                .resumption_session
                .as_ref()
                .filter(|s| s.version == TlsVersion::Tls12)
                .map(|s| s.ticket.clone())
        } else {
            None
        };

        Ok(Self {
            config,
            state: HandshakeState::Idle,
            transcript: TranscriptHash::new(),
            random,
            session_id: Vec::new(),
            share: None,
            version: None,
            params: None,
            key_schedule: None,
            offered_psk,
            psk_in_use: false,
            hrr_seen: false,
            client_hs_secret: Vec::new(),
            server_hs_secret: Vec::new(),
            client_app_secret: Vec::new(),
            server_app_secret: Vec::new(),
            resumption_master: Vec::new(),
            cert_request_context: None,
            peer_key: None,
            key_updates: 0,
            pending_early_data: None,
            early_data_in_flight: false,
            server_random: [0u8; 32],
            params12: None,
            master_secret12: Vec::new(),
            peer_key12: None,
            pending_read12: None,
            offered_ticket12,
            new_ticket12: None,
            cert_requested12: false,
            server_kx_public12: Vec::new(),
            abbreviated12: false,
            client_finished_sent12: false,
            latest_session: None,
        })
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn version(&self) -> Option<TlsVersion> {
        self.version
    }

    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.params
            .as_ref()
            .map(|p| p.suite)
            .or_else(|| self.params12.as_ref().map(|p| p.suite))
    }

    pub fn is_connected(&self) -> bool {
        self.state == HandshakeState::Connected
    }

    /// Whether a session was resumed, by PSK or by ticket.
    pub fn resumed(&self) -> bool {
        self.psk_in_use || self.abbreviated12
    }

    pub fn used_hello_retry(&self) -> bool {
        self.hrr_seen
    }

    /// The most recent resumable session issued by the peer.
    pub fn latest_session(&self) -> Option<&TlsSession> {
        self.latest_session.as_ref()
    }

    /// Build and queue the ClientHello. `early_data` is sent 0-RTT when a
    /// TLS 1.3 session with an early data allowance is being resumed.
    pub fn start(&mut self, early_data: Option<Vec<u8>>) -> Result<Actions, TlsError> {
        if self.state != HandshakeState::Idle {
            return Err(TlsError::HandshakeFailed("handshake already started".to_string()));
        }

        let offer_early = match (&early_data, &self.offered_psk) {
            (Some(data), Some(session)) => {
                session.max_early_data > 0 && data.len() <= session.max_early_data as usize
            }
            _ => false,
        };
        if early_data.is_some() && !offer_early {
            return Err(TlsError::HandshakeFailed(
                "early data requires a resumable session with an allowance".to_string(),
            ));
        }

        let encoded = self.build_client_hello(offer_early)?;
        self.transcript.update(&encoded);

        let mut actions = Actions::none();
        actions.outbound.push(Outbound::Handshake(encoded));

        if offer_early {
            let (params, early_keys) = self.derive_early_keys()?;
            actions
                .outbound
                .push(Outbound::Activate(KeyActivation::Tls13Write(params, early_keys)));
            if let Some(data) = early_data {
                actions.outbound.push(Outbound::ApplicationData(data));
            }
            self.early_data_in_flight = true;
        }

        self.state = HandshakeState::WaitServerHello;
        Ok(actions)
    }

    fn supported_wire_versions(&self) -> Vec<u16> {
        let mut versions = Vec::new();
        if self.config.max_version >= TlsVersion::Tls13 {
            versions.push(TlsVersion::Tls13.wire());
        }
        if self.config.min_version <= TlsVersion::Tls12 {
            versions.push(TlsVersion::Tls12.wire());
        }
        versions
    }

    fn build_client_hello(&mut self, offer_early: bool) -> Result<Vec<u8>, TlsError> {
        if self.share.is_none() {
            let group = self
                .config
                .supported_groups
                .first()
                .copied()
                .ok_or(TlsError::NoSharedGroup)?;
            self.share = Some(ActiveKeyShare::generate(group)?);
        }
        let share = match &self.share {
            Some(s) => s,
            None => return Err(TlsError::NoSharedGroup),
        };

        let mut extensions = Vec::new();
        if let Some(name) = &self.config.server_name {
            extensions.push(ExtensionPayload::ServerName(name.clone()));
        }
        extensions.push(ExtensionPayload::SupportedGroups(
            self.config.supported_groups.clone(),
        ));
        extensions.push(ExtensionPayload::EcPointFormats(vec![0]));
        extensions.push(ExtensionPayload::SignatureAlgorithms(
            self.config.signature_algorithms.clone(),
        ));
        extensions.push(ExtensionPayload::SupportedVersionsClient(
            self.supported_wire_versions(),
        ));
        if self.config.max_version >= TlsVersion::Tls13 {
            extensions.push(ExtensionPayload::KeyShareClient(vec![
                crate::extensions::KeyShareEntry {
                    group: share.group(),
                    key_exchange: share.public_bytes()?,
                },
            ]));
            extensions.push(ExtensionPayload::PskKeyExchangeModes(vec![PSK_MODE_DHE_KE]));
        }
        if let Some(ticket) = &self.offered_ticket12 {
            extensions.push(ExtensionPayload::SessionTicket(ticket.clone()));
        } else if self.config.min_version <= TlsVersion::Tls12 {
            extensions.push(ExtensionPayload::SessionTicket(Vec::new()));
        }
        extensions.push(ExtensionPayload::RenegotiationInfo(Vec::new()));
        if offer_early {
            extensions.push(ExtensionPayload::EarlyDataIndication);
        }

        // The pre_shared_key offer must come last so the binder can cover
        // everything before it.
        let (psk_offer, binder_len) = match &self.offered_psk {
            Some(session) => {
                let hash_len = CipherSuiteParams::from_suite(session.cipher_suite)?.hash_len();
                let now = crate::session::unix_now();
                (
                    Some(ExtensionPayload::PreSharedKeyOffer {
                        identities: vec![PskIdentity {
                            identity: session.ticket.clone(),
                            obfuscated_ticket_age: session.obfuscated_age(now),
                        }],
                        binders: vec![vec![0u8; hash_len]],
                    }),
                    hash_len,
                )
            }
            None => (None, 0),
        };
        if let Some(offer) = psk_offer {
            extensions.push(offer);
        }

        let ch = HandshakePayload::ClientHello(ClientHello {
            legacy_version: 0x0303,
            random: self.random,
            session_id: self.session_id.clone(),
            cipher_suites: self.config.cipher_suites.clone(),
            compression_methods: vec![0],
            extensions,
        });
        let mut encoded = ch.encode().map_err(TlsError::from)?;

        if let Some(session) = &self.offered_psk {
            // Binder = HMAC over the transcript up to the binders list.
            let params = CipherSuiteParams::from_suite(session.cipher_suite)?;
            let mut ks = KeySchedule::new(params.clone());
            ks.derive_early_secret(Some(&session.secret))?;
            let binder_key = ks.derive_binder_key(false)?;

            let truncated_len = encoded.len() - (binder_len + 3);
            let mut context = self.transcript.buffer().to_vec();
            context.extend_from_slice(&encoded[..truncated_len]);
            let partial_hash = ferrotls_crypto::hash::hash(params.hash_alg, &context)?;
            let binder = ks.compute_finished_verify_data(&binder_key, &partial_hash)?;
            let start = encoded.len() - binder_len;
            encoded[start..].copy_from_slice(&binder);
            self.key_schedule = Some(ks);
        }
        Ok(encoded)
    }

    fn derive_early_keys(&mut self) -> Result<(CipherSuiteParams, TrafficKeys), TlsError> {
        let session = self
            .offered_psk
            .as_ref()
            .ok_or_else(|| TlsError::HandshakeFailed("no session for early data".to_string()))?;
        let params = CipherSuiteParams::from_suite(session.cipher_suite)?;
        let ks = self
            .key_schedule
            .as_mut()
            .ok_or_else(|| TlsError::HandshakeFailed("key schedule missing".to_string()))?;
        // Early traffic keys hang off the ClientHello alone.
        let ch_hash = ferrotls_crypto::hash::hash(
            params.hash_alg,
            self.transcript.buffer(),
        )?;
        let secret = ks.derive_early_traffic_secret(&ch_hash)?;
        let keys = TrafficKeys::derive(&params, &secret)?;
        Ok((params, keys))
    }

    /// Feed one complete handshake message, header included.
    pub fn handle_message(&mut self, raw: &[u8]) -> Result<Actions, TlsError> {
        let msg_type = HandshakeType::from_u8(raw[0])
            .map_err(|t| TlsError::DecodeError(format!("unknown handshake type {t}")))?;
        let next = transition(TlsRole::Client, self.state, msg_type)
            .map_err(|_| TlsError::UnexpectedMessage(format!("{:?}", self.state)))?;
        log::trace!("client {:?} + {msg_type:?} -> {next:?}", self.state);

        let ctx = DecodeContext {
            version: self.version.unwrap_or(TlsVersion::Tls13),
            kx: self.params12.as_ref().map(|p| p.kx),
        };
        let payload = decode_handshake(ctx, msg_type, &raw[4..])?;

        self.state = next;
        match payload {
            HandshakePayload::ServerHello(sh) => self.handle_server_hello(sh, raw),
            HandshakePayload::EncryptedExtensions(exts) => {
                self.transcript.update(raw);
                self.handle_encrypted_extensions(&exts)
            }
            HandshakePayload::CertificateRequest(cr) => {
                self.transcript.update(raw);
                match cr {
                    super::codec::CertificateRequest::Tls13 { context, .. } => {
                        self.cert_request_context = Some(context);
                        Ok(Actions::none())
                    }
                    super::codec::CertificateRequest::Tls12 { .. } => {
                        // Answered with an empty Certificate in the client
                        // flight after ServerHelloDone.
                        self.cert_requested12 = true;
                        Ok(Actions::none())
                    }
                }
            }
            HandshakePayload::Certificate13(cert) => {
                self.transcript.update(raw);
                self.handle_certificate13(cert)
            }
            HandshakePayload::CertificateVerify(cv) => self.handle_certificate_verify(cv, raw),
            HandshakePayload::Finished(fin) => match self.version {
                Some(TlsVersion::Tls12) => self.handle_finished12(fin, raw),
                _ => self.handle_server_finished(fin, raw),
            },
            HandshakePayload::NewSessionTicket13(nst) => self.handle_new_session_ticket(nst),
            HandshakePayload::KeyUpdate(ku) => self.handle_key_update(ku),
            HandshakePayload::Certificate12(cert) => {
                self.transcript.update(raw);
                self.handle_certificate12(cert)
            }
            HandshakePayload::ServerKeyExchange(ske) => {
                self.transcript.update(raw);
                self.handle_server_key_exchange12(ske)
            }
            HandshakePayload::ServerHelloDone => {
                self.transcript.update(raw);
                self.handle_server_hello_done12()
            }
            HandshakePayload::NewSessionTicket12(nst) => {
                self.transcript.update(raw);
                self.new_ticket12 = Some(nst.ticket);
                Ok(Actions::none())
            }
            other => Err(TlsError::UnexpectedMessage(format!(
                "{:?} at the client",
                other.msg_type()
            ))),
        }
    }

    /// A change_cipher_spec record arrived.
    pub fn handle_ccs(&mut self) -> Result<Actions, TlsError> {
        match self.version {
            // Middlebox compatibility noise under TLS 1.3.
            Some(TlsVersion::Tls13) | None => Ok(Actions::none()),
            Some(TlsVersion::Tls12) => {
                let mut actions = Actions::none();
                if let Some(activation) = self.pending_read12.take() {
                    actions.outbound.push(Outbound::Activate(activation));
                }
                Ok(actions)
            }
        }
    }

    fn handle_server_hello(&mut self, sh: ServerHello, raw: &[u8]) -> Result<Actions, TlsError> {
        if sh.compression_method != 0 {
            return Err(TlsError::DecodeError("nonzero compression".to_string()));
        }
        if !self.config.cipher_suites.contains(&sh.cipher_suite) {
            return Err(TlsError::NoSharedCipherSuite);
        }

        let selected = match find_extension(&sh.extensions, ExtensionType::SUPPORTED_VERSIONS) {
            Some(ExtensionPayload::SupportedVersionsServer(v)) => {
                TlsVersion::from_wire(*v).ok_or(TlsError::UnsupportedVersion)?
            }
            _ => TlsVersion::Tls12,
        };
        if selected < self.config.min_version || selected > self.config.max_version {
            return Err(TlsError::UnsupportedVersion);
        }

        match selected {
            TlsVersion::Tls13 => {
                if !is_tls13_suite(sh.cipher_suite) {
                    return Err(TlsError::NoSharedCipherSuite);
                }
                if sh.is_hello_retry_request() {
                    self.handle_hello_retry(sh, raw)
                } else {
                    self.handle_server_hello13(sh, raw)
                }
            }
            TlsVersion::Tls12 => {
                if !is_tls12_suite(sh.cipher_suite) {
                    return Err(TlsError::NoSharedCipherSuite);
                }
                self.transcript.update(raw);
                self.begin_tls12(sh)
            }
        }
    }

    fn handle_hello_retry(&mut self, sh: ServerHello, raw: &[u8]) -> Result<Actions, TlsError> {
        if self.hrr_seen {
            return Err(TlsError::HandshakeFailed(
                "second HelloRetryRequest".to_string(),
            ));
        }
        self.hrr_seen = true;
        self.state = HandshakeState::WaitServerHello;

        let params = CipherSuiteParams::from_suite(sh.cipher_suite)?;
        let group = match find_extension(&sh.extensions, ExtensionType::KEY_SHARE) {
            Some(ExtensionPayload::KeyShareHelloRetry(group)) => *group,
            _ => {
                return Err(TlsError::DecodeError(
                    "HelloRetryRequest without key_share".to_string(),
                ))
            }
        };
        if !self.config.supported_groups.contains(&group) {
            return Err(TlsError::NoSharedGroup);
        }
        if let Some(share) = &self.share {
            if share.group() == group {
                return Err(TlsError::HandshakeFailed(
                    "HelloRetryRequest for a group already offered".to_string(),
                ));
            }
        }

        // Transcript restarts from message_hash(ClientHello1) || HRR.
        self.transcript.set_alg(params.hash_alg);
        self.transcript.replace_with_message_hash()?;
        self.transcript.update(raw);

        // Early data does not survive a retry.
        self.pending_early_data = None;
        self.early_data_in_flight = false;
        self.key_schedule = None;

        log::debug!("HelloRetryRequest for group {:#06x}", group.0);
        self.share = Some(ActiveKeyShare::generate(group)?);
        let encoded = self.build_client_hello(false)?;
        self.transcript.update(&encoded);

        let mut actions = Actions::none();
        actions.outbound.push(Outbound::Handshake(encoded));
        Ok(actions)
    }

    fn handle_server_hello13(&mut self, sh: ServerHello, raw: &[u8]) -> Result<Actions, TlsError> {
        let params = CipherSuiteParams::from_suite(sh.cipher_suite)?;
        self.transcript.set_alg(params.hash_alg);
        self.transcript.update(raw);
        self.server_random = sh.random;

        let share = self
            .share
            .as_ref()
            .ok_or_else(|| TlsError::HandshakeFailed("no key share generated".to_string()))?;
        let server_share = match find_extension(&sh.extensions, ExtensionType::KEY_SHARE) {
            Some(ExtensionPayload::KeyShareServer(entry)) => entry,
            _ => {
                return Err(TlsError::DecodeError(
                    "ServerHello without key_share".to_string(),
                ))
            }
        };
        if server_share.group != share.group() {
            return Err(TlsError::NoSharedGroup);
        }
        let mut shared = share.shared_secret(&server_share.key_exchange)?;

        let psk_selected = matches!(
            find_extension(&sh.extensions, ExtensionType::PRE_SHARED_KEY),
            Some(ExtensionPayload::PreSharedKeySelected(0))
        );

        let mut ks = match (psk_selected, self.key_schedule.take(), &self.offered_psk) {
            (true, Some(ks), Some(session)) => {
                // The PSK hash must match the negotiated suite.
                let psk_params = CipherSuiteParams::from_suite(session.cipher_suite)?;
                if psk_params.hash_alg != params.hash_alg {
                    return Err(TlsError::HandshakeFailed(
                        "PSK hash does not match negotiated suite".to_string(),
                    ));
                }
                self.psk_in_use = true;
                ks
            }
            (true, _, _) => {
                return Err(TlsError::HandshakeFailed(
                    "server selected a PSK that was not offered".to_string(),
                ))
            }
            (false, _, _) => {
                let mut ks = KeySchedule::new(params.clone());
                ks.derive_early_secret(None)?;
                ks
            }
        };

        ks.derive_handshake_secret(&shared)?;
        shared.zeroize();
        let hash = self.transcript.current_hash()?;
        let (client_hs, server_hs) = ks.derive_handshake_traffic_secrets(&hash)?;
        let server_keys = TrafficKeys::derive(&params, &server_hs)?;
        self.client_hs_secret = client_hs;
        self.server_hs_secret = server_hs;
        self.key_schedule = Some(ks);
        self.version = Some(TlsVersion::Tls13);
        log::debug!(
            "negotiated TLS 1.3, suite {:#06x}, psk_in_use {}",
            params.suite.0,
            self.psk_in_use
        );
        self.params = Some(params.clone());

        let mut actions = Actions::none();
        actions
            .outbound
            .push(Outbound::Activate(KeyActivation::Tls13Read(params, server_keys)));
        Ok(actions)
    }

    fn handle_encrypted_extensions(
        &mut self,
        exts: &[ExtensionPayload],
    ) -> Result<Actions, TlsError> {
        let accepted = find_extension(exts, ExtensionType::EARLY_DATA).is_some();
        if accepted && !self.early_data_in_flight {
            return Err(TlsError::HandshakeFailed(
                "server accepted early data that was never offered".to_string(),
            ));
        }
        if !accepted {
            // Rejected early data is simply abandoned.
            self.early_data_in_flight = false;
        }
        Ok(Actions::none())
    }

    fn handle_certificate13(&mut self, cert: Certificate13) -> Result<Actions, TlsError> {
        if self.psk_in_use {
            return Err(TlsError::UnexpectedMessage(
                "Certificate in a PSK handshake".to_string(),
            ));
        }
        let leaf = cert
            .entries
            .first()
            .ok_or_else(|| TlsError::BadCertificate("empty certificate list".to_string()))?;
        self.peer_key = self.decode_peer_certificate(&leaf.cert_data)?;
        Ok(Actions::none())
    }

    pub(crate) fn decode_peer_certificate(
        &self,
        der: &[u8],
    ) -> Result<Option<PeerPublicKey>, TlsError> {
        match &self.config.certificate_decoder {
            Some(decoder) => {
                let key = decoder(der)
                    .map_err(|e| TlsError::BadCertificate(e.to_string()))?;
                Ok(Some(key))
            }
            None if self.config.verify_peer => Err(TlsError::BadCertificate(
                "peer verification enabled without a certificate decoder".to_string(),
            )),
            None => Ok(None),
        }
    }

    fn handle_certificate_verify(
        &mut self,
        cv: CertificateVerify,
        raw: &[u8],
    ) -> Result<Actions, TlsError> {
        let hash = self.transcript.current_hash()?;
        if let Some(peer_key) = &self.peer_key {
            if !self.config.signature_algorithms.contains(&cv.scheme) {
                return Err(TlsError::CertVerifyFailed(
                    "signature scheme was not offered".to_string(),
                ));
            }
            let message = signature_context(true, &hash);
            verify_with_peer_key(peer_key, cv.scheme, &message, &cv.signature)?;
        } else if self.config.verify_peer {
            return Err(TlsError::CertVerifyFailed(
                "no peer key to verify against".to_string(),
            ));
        }
        self.transcript.update(raw);
        Ok(Actions::none())
    }

    fn handle_server_finished(&mut self, fin: Finished, raw: &[u8]) -> Result<Actions, TlsError> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let ks = self
            .key_schedule
            .as_mut()
            .ok_or_else(|| TlsError::HandshakeFailed("key schedule missing".to_string()))?;

        let hash = self.transcript.current_hash()?;
        let expected = ks.compute_finished_verify_data(&self.server_hs_secret, &hash)?;
        if expected.ct_eq(&fin.verify_data).unwrap_u8() != 1 {
            return Err(TlsError::HandshakeFailed(
                "Finished verification failed".to_string(),
            ));
        }
        self.transcript.update(raw);

        // Server application keys start right after its Finished.
        ks.derive_master_secret()?;
        let sf_hash = self.transcript.current_hash()?;
        let (client_app, server_app) = ks.derive_app_traffic_secrets(&sf_hash)?;
        self.client_app_secret = client_app;
        self.server_app_secret = server_app.clone();
        let server_app_keys = TrafficKeys::derive(&params, &server_app)?;

        let mut actions = Actions::none();
        actions.outbound.push(Outbound::Activate(KeyActivation::Tls13Read(
            params.clone(),
            server_app_keys,
        )));

        if self.early_data_in_flight {
            // EndOfEarlyData goes out under the early traffic keys still in
            // effect for the write direction.
            let eoed = HandshakePayload::EndOfEarlyData.encode().map_err(TlsError::from)?;
            self.transcript.update(&eoed);
            actions.outbound.push(Outbound::Handshake(eoed));
            self.early_data_in_flight = false;
        }

        let client_hs_keys = TrafficKeys::derive(&params, &self.client_hs_secret)?;
        actions.outbound.push(Outbound::Activate(KeyActivation::Tls13Write(
            params.clone(),
            client_hs_keys,
        )));

        if let Some(context) = self.cert_request_context.take() {
            actions.outbound.extend(self.client_credentials(&context)?);
        }

        let ks = match self.key_schedule.as_mut() {
            Some(ks) => ks,
            None => return Err(TlsError::HandshakeFailed("key schedule missing".to_string())),
        };
        let fin_hash = self.transcript.current_hash()?;
        let verify_data = ks.compute_finished_verify_data(&self.client_hs_secret, &fin_hash)?;
        let fin_msg = HandshakePayload::Finished(Finished { verify_data })
            .encode()
            .map_err(TlsError::from)?;
        self.transcript.update(&fin_msg);
        actions.outbound.push(Outbound::Handshake(fin_msg));

        let final_hash = self.transcript.current_hash()?;
        self.resumption_master = ks.derive_resumption_master_secret(&final_hash)?;

        let client_app_keys = TrafficKeys::derive(&params, &self.client_app_secret)?;
        actions.outbound.push(Outbound::Activate(KeyActivation::Tls13Write(
            params,
            client_app_keys,
        )));

        actions.connected = true;
        Ok(actions)
    }

    /// Certificate (and CertificateVerify if a key is configured) in
    /// response to a CertificateRequest.
    fn client_credentials(&mut self, context: &[u8]) -> Result<Vec<Outbound>, TlsError> {
        let mut out = Vec::new();
        let entries = self
            .config
            .certificate_chain
            .iter()
            .map(|der| super::codec::CertificateEntry {
                cert_data: der.clone(),
                extensions: Vec::new(),
            })
            .collect::<Vec<_>>();
        let has_credentials = !entries.is_empty() && self.config.private_key.is_some();

        let cert_msg = HandshakePayload::Certificate13(Certificate13 {
            context: context.to_vec(),
            entries: if has_credentials { entries } else { Vec::new() },
        })
        .encode()
        .map_err(TlsError::from)?;
        self.transcript.update(&cert_msg);
        out.push(Outbound::Handshake(cert_msg));

        if has_credentials {
            let key = match &self.config.private_key {
                Some(k) => k,
                None => return Ok(out),
            };
            let scheme = select_scheme(key, &self.config.signature_algorithms, true)?;
            let hash = self.transcript.current_hash()?;
            let message = signature_context(false, &hash);
            let signature = sign_with_key(key, scheme, &message)?;
            let cv_msg = HandshakePayload::CertificateVerify(CertificateVerify {
                scheme,
                signature,
            })
            .encode()
            .map_err(TlsError::from)?;
            self.transcript.update(&cv_msg);
            out.push(Outbound::Handshake(cv_msg));
        }
        Ok(out)
    }

    fn handle_new_session_ticket(
        &mut self,
        nst: NewSessionTicket13,
    ) -> Result<Actions, TlsError> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let ks = self
            .key_schedule
            .as_ref()
            .ok_or_else(|| TlsError::HandshakeFailed("key schedule missing".to_string()))?;
        let psk = ks.derive_resumption_psk(&self.resumption_master, &nst.nonce)?;

        let max_early_data = match find_extension(&nst.extensions, ExtensionType::EARLY_DATA) {
            Some(ExtensionPayload::EarlyDataMaxSize(max)) => *max,
            _ => 0,
        };
        let session = TlsSession {
            version: TlsVersion::Tls13,
            cipher_suite: params.suite,
            secret: psk,
            ticket: nst.ticket.clone(),
            lifetime: nst.lifetime,
            age_add: nst.age_add,
            max_early_data,
            created_at: crate::session::unix_now(),
        };
        self.latest_session = Some(session.clone());
        self.store_session(nst.ticket, session);
        Ok(Actions::none())
    }

    pub(crate) fn store_session(&self, key: Vec<u8>, session: TlsSession) {
        if let Some(cache) = &self.config.session_cache {
            if let Ok(mut cache) = cache.lock() {
                use crate::session::SessionCache;
                cache.put(key, session);
            }
        }
    }

    fn handle_key_update(&mut self, ku: KeyUpdateRequest) -> Result<Actions, TlsError> {
        self.key_updates += 1;
        if self.key_updates > MAX_KEY_UPDATES {
            return Err(TlsError::HandshakeFailed(
                "too many key updates".to_string(),
            ));
        }
        let params = self
            .params
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let ks = self
            .key_schedule
            .as_ref()
            .ok_or_else(|| TlsError::HandshakeFailed("key schedule missing".to_string()))?;

        self.server_app_secret = ks.update_traffic_secret(&self.server_app_secret)?;
        let read_keys = TrafficKeys::derive(&params, &self.server_app_secret)?;

        let mut actions = Actions::none();
        actions.outbound.push(Outbound::Activate(KeyActivation::Tls13Read(
            params.clone(),
            read_keys,
        )));

        if ku.update_requested {
            let reply = HandshakePayload::KeyUpdate(KeyUpdateRequest {
                update_requested: false,
            })
            .encode()
            .map_err(TlsError::from)?;
            actions.outbound.push(Outbound::Handshake(reply));
            self.client_app_secret = ks.update_traffic_secret(&self.client_app_secret)?;
            let write_keys = TrafficKeys::derive(&params, &self.client_app_secret)?;
            actions
                .outbound
                .push(Outbound::Activate(KeyActivation::Tls13Write(params, write_keys)));
        }
        Ok(actions)
    }

    /// Request a key update for our write direction.
    pub fn request_key_update(&mut self) -> Result<Actions, TlsError> {
        if self.state != HandshakeState::Connected || self.version != Some(TlsVersion::Tls13) {
            return Err(TlsError::HandshakeFailed(
                "key update outside an established TLS 1.3 connection".to_string(),
            ));
        }
        let params = self
            .params
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let ks = self
            .key_schedule
            .as_ref()
            .ok_or_else(|| TlsError::HandshakeFailed("key schedule missing".to_string()))?;
        let msg = HandshakePayload::KeyUpdate(KeyUpdateRequest {
            update_requested: true,
        })
        .encode()
        .map_err(TlsError::from)?;
        self.client_app_secret = ks.update_traffic_secret(&self.client_app_secret)?;
        let write_keys = TrafficKeys::derive(&params, &self.client_app_secret)?;

        let mut actions = Actions::none();
        actions.outbound.push(Outbound::Handshake(msg));
        actions
            .outbound
            .push(Outbound::Activate(KeyActivation::Tls13Write(params, write_keys)));
        Ok(actions)
    }
}
