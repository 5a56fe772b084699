//! Server handshake driver.
//!
//! Mirror image of the client driver: raw handshake messages in, `Actions`
//! out. TLS 1.3 negotiation and flights live here; the TLS 1.2 path taken
//! after version negotiation is in `server12`.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use ferrotls_types::TlsError;

use super::codec::{
    Certificate13, CertificateEntry, CertificateVerify, ClientHello, DecodeContext, Finished,
    HandshakePayload, KeyUpdateRequest, NewSessionTicket13, ServerHello, decode_handshake,
    HELLO_RETRY_REQUEST_RANDOM,
};
use super::key_exchange::ActiveKeyShare;
use super::verify::{select_scheme, sign_with_key, signature_context};
use super::{Actions, HandshakeState, HandshakeType, KeyActivation, Outbound, transition};
use crate::config::TlsConfig;
use crate::crypt::key_schedule::KeySchedule;
use crate::crypt::traffic_keys::TrafficKeys;
use crate::crypt::transcript::TranscriptHash;
use crate::crypt::{CipherSuiteParams, NamedGroup, SignatureScheme, Tls12CipherSuiteParams,
    is_tls13_suite};
use crate::extensions::{
    ExtensionPayload, ExtensionType, KeyShareEntry, PSK_MODE_DHE_KE, find_extension,
};
use crate::session::{
    TlsSession, decode_session_state, decrypt_session_ticket, encode_session_state,
    encrypt_session_ticket, unix_now,
};
use crate::{CipherSuite, TlsRole, TlsVersion};

const MAX_KEY_UPDATES: u32 = 128;
const TICKET_LIFETIME_SECS: u32 = 7200;

pub struct ServerHandshake {
    pub(crate) config: Arc<TlsConfig>,
    pub(crate) state: HandshakeState,
    pub(crate) transcript: TranscriptHash,
    pub(crate) random: [u8; 32],
    pub(crate) version: Option<TlsVersion>,
    pub(crate) client_random: [u8; 32],
    pub(crate) session_id_echo: Vec<u8>,
    pub(crate) peer_signature_algorithms: Vec<SignatureScheme>,

    // TLS 1.3 progress.
    params: Option<CipherSuiteParams>,
    key_schedule: Option<KeySchedule>,
    psk_in_use: bool,
    hrr_sent: bool,
    client_hs_secret: Vec<u8>,
    server_hs_secret: Vec<u8>,
    client_app_secret: Vec<u8>,
    server_app_secret: Vec<u8>,
    resumption_master: Vec<u8>,
    early_accepted: bool,
    early_rejected: bool,
    ticket_counter: u64,
    key_updates: u32,

    // TLS 1.2 progress, driven from `server12`.
    pub(crate) params12: Option<Tls12CipherSuiteParams>,
    pub(crate) master_secret12: Vec<u8>,
    pub(crate) pending_read12: Option<KeyActivation>,
    pub(crate) share12: Option<ActiveKeyShare>,
    pub(crate) abbreviated12: bool,
    pub(crate) peer_offered_ticket_ext12: bool,
    pub(crate) client_finished_seen12: bool,
}

impl Drop for ServerHandshake {
    fn drop(&mut self) {
        self.client_hs_secret.zeroize();
        self.server_hs_secret.zeroize();
        self.client_app_secret.zeroize();
        self.server_app_secret.zeroize();
        self.resumption_master.zeroize();
        self.master_secret12.zeroize();
    }
}

impl ServerHandshake {
    pub fn new(config: Arc<TlsConfig>) -> Result<Self, TlsError> {
        let mut random = [0u8; 32];
        getrandom::getrandom(&mut random)
            .map_err(|_| TlsError::HandshakeFailed("random generation failed".to_string()))?;
        Ok(Self {
            config,
            state: HandshakeState::WaitClientHello,
            transcript: TranscriptHash::new(),
            random,
            version: None,
            client_random: [0u8; 32],
            session_id_echo: Vec::new(),
            peer_signature_algorithms: Vec::new(),
            params: None,
            key_schedule: None,
            psk_in_use: false,
            hrr_sent: false,
            client_hs_secret: Vec::new(),
            server_hs_secret: Vec::new(),
            client_app_secret: Vec::new(),
            server_app_secret: Vec::new(),
            resumption_master: Vec::new(),
            early_accepted: false,
            early_rejected: false,
            ticket_counter: 0,
            key_updates: 0,
            params12: None,
            master_secret12: Vec::new(),
            pending_read12: None,
            share12: None,
            abbreviated12: false,
            peer_offered_ticket_ext12: false,
            client_finished_seen12: false,
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

    pub fn early_data_accepted(&self) -> bool {
        self.early_accepted
    }

    /// Rejected 0-RTT leaves records on the wire the server cannot decrypt.
    /// The record consumer drops those until the handshake keys take over.
    pub fn tolerates_undecryptable(&self) -> bool {
        self.early_rejected && self.state != HandshakeState::Connected
    }

    pub fn handle_message(&mut self, raw: &[u8]) -> Result<Actions, TlsError> {
        let msg_type = HandshakeType::from_u8(raw[0])
            .map_err(|t| TlsError::DecodeError(format!("unknown handshake type {t}")))?;
        let next = transition(TlsRole::Server, self.state, msg_type)
            .map_err(|_| TlsError::UnexpectedMessage(format!("{:?}", self.state)))?;
        log::trace!("server {:?} + {msg_type:?} -> {next:?}", self.state);

        let ctx = DecodeContext {
            version: self.version.unwrap_or(TlsVersion::Tls13),
            kx: self.params12.as_ref().map(|p| p.kx),
        };
        let payload = decode_handshake(ctx, msg_type, &raw[4..])?;

        self.state = next;
        match payload {
            HandshakePayload::ClientHello(ch) => self.handle_client_hello(ch, raw),
            HandshakePayload::EndOfEarlyData => {
                self.transcript.update(raw);
                self.handle_end_of_early_data()
            }
            HandshakePayload::Finished(fin) => match self.version {
                Some(TlsVersion::Tls12) => self.handle_client_finished12(fin, raw),
                _ => self.handle_client_finished(fin, raw),
            },
            HandshakePayload::ClientKeyExchange(cke) => {
                self.transcript.update(raw);
                self.handle_client_key_exchange12(cke)
            }
            HandshakePayload::KeyUpdate(ku) => self.handle_key_update(ku),
            other => Err(TlsError::UnexpectedMessage(format!(
                "{:?} at the server",
                other.msg_type()
            ))),
        }
    }

    pub fn handle_ccs(&mut self) -> Result<Actions, TlsError> {
        match self.version {
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

    fn handle_client_hello(&mut self, ch: ClientHello, raw: &[u8]) -> Result<Actions, TlsError> {
        if !ch.compression_methods.contains(&0) {
            return Err(TlsError::DecodeError(
                "null compression not offered".to_string(),
            ));
        }
        self.client_random = ch.random;
        self.session_id_echo = ch.session_id.clone();
        if let Some(ExtensionPayload::SignatureAlgorithms(schemes)) =
            find_extension(&ch.extensions, ExtensionType::SIGNATURE_ALGORITHMS)
        {
            self.peer_signature_algorithms = schemes.clone();
        }

        let tls13_offered = match find_extension(&ch.extensions, ExtensionType::SUPPORTED_VERSIONS)
        {
            Some(ExtensionPayload::SupportedVersionsClient(versions)) => {
                versions.contains(&TlsVersion::Tls13.wire())
            }
            _ => false,
        };

        if tls13_offered && self.config.max_version >= TlsVersion::Tls13 {
            self.handle_client_hello13(ch, raw)
        } else if self.config.min_version <= TlsVersion::Tls12 {
            self.version = Some(TlsVersion::Tls12);
            self.handle_client_hello12(ch, raw)
        } else {
            Err(TlsError::UnsupportedVersion)
        }
    }

    fn handle_client_hello13(
        &mut self,
        ch: ClientHello,
        raw: &[u8],
    ) -> Result<Actions, TlsError> {
        let suite = self
            .config
            .cipher_suites
            .iter()
            .copied()
            .find(|s| is_tls13_suite(*s) && ch.cipher_suites.contains(s))
            .ok_or(TlsError::NoSharedCipherSuite)?;
        let params = CipherSuiteParams::from_suite(suite)?;
        self.transcript.set_alg(params.hash_alg);

        let client_shares: &[KeyShareEntry] =
            match find_extension(&ch.extensions, ExtensionType::KEY_SHARE) {
                Some(ExtensionPayload::KeyShareClient(entries)) => entries,
                _ => &[],
            };
        let usable_share = client_shares
            .iter()
            .find(|e| self.config.supported_groups.contains(&e.group) && e.group.is_supported());

        let client_share = match usable_share {
            Some(share) => share.clone(),
            None => {
                // A mutually supported group without a share means one
                // round of HelloRetryRequest.
                let offered_groups = match find_extension(
                    &ch.extensions,
                    ExtensionType::SUPPORTED_GROUPS,
                ) {
                    Some(ExtensionPayload::SupportedGroups(groups)) => groups.clone(),
                    _ => Vec::new(),
                };
                let retry_group = offered_groups
                    .iter()
                    .copied()
                    .find(|g| self.config.supported_groups.contains(g) && g.is_supported())
                    .ok_or(TlsError::NoSharedGroup)?;
                if self.hrr_sent {
                    return Err(TlsError::HandshakeFailed(
                        "no usable key share after retry".to_string(),
                    ));
                }
                return self.send_hello_retry(suite, retry_group, raw);
            }
        };

        self.transcript.update(raw);

        // PSK resumption, first identity only. A ticket that fails to
        // decrypt or validate falls back to a full handshake.
        let mut offered_psk: Option<TlsSession> = None;
        let mut binder_offer_len = 0usize;
        if let (Some(ExtensionPayload::PreSharedKeyOffer { identities, binders }), Some(key)) = (
            find_extension(&ch.extensions, ExtensionType::PRE_SHARED_KEY),
            self.config.ticket_key.as_ref(),
        ) {
            let modes_ok = matches!(
                find_extension(&ch.extensions, ExtensionType::PSK_KEY_EXCHANGE_MODES),
                Some(ExtensionPayload::PskKeyExchangeModes(modes)) if modes.contains(&PSK_MODE_DHE_KE)
            );
            if modes_ok && binders.len() == identities.len() {
                binder_offer_len = 2 + binders.iter().map(|b| 1 + b.len()).sum::<usize>();
                if let Some(identity) = identities.first() {
                    offered_psk = decrypt_session_ticket(key, &identity.identity)
                        .and_then(|state| decode_session_state(&state))
                        .filter(|s| {
                            s.version == TlsVersion::Tls13
                                && !s.is_expired(unix_now())
                                && CipherSuiteParams::from_suite(s.cipher_suite)
                                    .map(|p| p.hash_alg == params.hash_alg)
                                    .unwrap_or(false)
                        });
                }
            }
        }

        let mut key_schedule = KeySchedule::new(params.clone());
        if let Some(session) = &offered_psk {
            key_schedule.derive_early_secret(Some(&session.secret))?;
            let binder = match find_extension(&ch.extensions, ExtensionType::PRE_SHARED_KEY) {
                Some(ExtensionPayload::PreSharedKeyOffer { binders, .. }) => match binders.first()
                {
                    Some(b) => b.clone(),
                    None => Vec::new(),
                },
                _ => Vec::new(),
            };
            self.verify_binder(&mut key_schedule, &params, raw, binder_offer_len, &binder)?;
            self.psk_in_use = true;
        } else {
            key_schedule.derive_early_secret(None)?;
        }

        // 0-RTT is honored only when the resumed session allows it and the
        // suite is unchanged.
        let early_offered = find_extension(&ch.extensions, ExtensionType::EARLY_DATA).is_some();
        if early_offered {
            let allowed = self.psk_in_use
                && self.config.max_early_data_size > 0
                && offered_psk
                    .as_ref()
                    .map(|s| s.max_early_data > 0 && s.cipher_suite == suite)
                    .unwrap_or(false);
            if allowed {
                self.early_accepted = true;
            } else {
                self.early_rejected = true;
            }
        }

        // Early traffic keys bind to the ClientHello alone and must come
        // off the schedule before the handshake secret is mixed in.
        let early_keys = if self.early_accepted {
            let ch_hash = ferrotls_crypto::hash::hash(params.hash_alg, raw)?;
            let early_secret = key_schedule.derive_early_traffic_secret(&ch_hash)?;
            Some(TrafficKeys::derive(&params, &early_secret)?)
        } else {
            None
        };

        // Our flight, starting with the ServerHello.
        let share = ActiveKeyShare::generate(client_share.group)?;
        let mut shared = share.shared_secret(&client_share.key_exchange)?;

        let mut extensions = vec![
            ExtensionPayload::SupportedVersionsServer(TlsVersion::Tls13.wire()),
            ExtensionPayload::KeyShareServer(KeyShareEntry {
                group: share.group(),
                key_exchange: share.public_bytes()?,
            }),
        ];
        if self.psk_in_use {
            extensions.push(ExtensionPayload::PreSharedKeySelected(0));
        }
        let sh = HandshakePayload::ServerHello(ServerHello {
            legacy_version: 0x0303,
            random: self.random,
            session_id_echo: self.session_id_echo.clone(),
            cipher_suite: suite,
            compression_method: 0,
            extensions,
        })
        .encode()
        .map_err(TlsError::from)?;
        self.transcript.update(&sh);

        key_schedule.derive_handshake_secret(&shared)?;
        shared.zeroize();
        let hash = self.transcript.current_hash()?;
        let (client_hs, server_hs) = key_schedule.derive_handshake_traffic_secrets(&hash)?;
        let server_hs_keys = TrafficKeys::derive(&params, &server_hs)?;
        self.client_hs_secret = client_hs;
        self.server_hs_secret = server_hs;

        let mut actions = Actions::none();
        actions.outbound.push(Outbound::Handshake(sh));
        actions.outbound.push(Outbound::ChangeCipherSpec);
        actions.outbound.push(Outbound::Activate(KeyActivation::Tls13Write(
            params.clone(),
            server_hs_keys,
        )));

        // EncryptedExtensions.
        let mut ee = Vec::new();
        if matches!(
            find_extension(&ch.extensions, ExtensionType::SERVER_NAME),
            Some(ExtensionPayload::ServerName(_))
        ) {
            ee.push(ExtensionPayload::ServerName(String::new()));
        }
        if self.early_accepted {
            ee.push(ExtensionPayload::EarlyDataIndication);
        }
        let ee_msg = HandshakePayload::EncryptedExtensions(ee)
            .encode()
            .map_err(TlsError::from)?;
        self.transcript.update(&ee_msg);
        actions.outbound.push(Outbound::Handshake(ee_msg));

        if !self.psk_in_use {
            actions.outbound.extend(self.server_credentials()?);
        }

        let fin_hash = self.transcript.current_hash()?;
        let verify_data =
            key_schedule.compute_finished_verify_data(&self.server_hs_secret, &fin_hash)?;
        let fin_msg = HandshakePayload::Finished(Finished { verify_data })
            .encode()
            .map_err(TlsError::from)?;
        self.transcript.update(&fin_msg);
        actions.outbound.push(Outbound::Handshake(fin_msg));

        key_schedule.derive_master_secret()?;
        let sf_hash = self.transcript.current_hash()?;
        let (client_app, server_app) = key_schedule.derive_app_traffic_secrets(&sf_hash)?;
        let server_app_keys = TrafficKeys::derive(&params, &server_app)?;
        self.client_app_secret = client_app;
        self.server_app_secret = server_app;
        actions.outbound.push(Outbound::Activate(KeyActivation::Tls13Write(
            params.clone(),
            server_app_keys,
        )));

        // Read direction: early traffic keys until EndOfEarlyData, the
        // client handshake keys otherwise.
        if let Some(early_keys) = early_keys {
            actions
                .outbound
                .push(Outbound::Activate(KeyActivation::Tls13Read(params.clone(), early_keys)));
            self.state = HandshakeState::WaitEndOfEarlyData;
        } else {
            let client_hs_keys = TrafficKeys::derive(&params, &self.client_hs_secret)?;
            actions.outbound.push(Outbound::Activate(KeyActivation::Tls13Read(
                params.clone(),
                client_hs_keys,
            )));
        }

        log::debug!(
            "negotiated TLS 1.3, suite {:#06x}, psk_in_use {}, early_accepted {}",
            suite.0,
            self.psk_in_use,
            self.early_accepted
        );
        self.version = Some(TlsVersion::Tls13);
        self.params = Some(params);
        self.key_schedule = Some(key_schedule);
        Ok(actions)
    }

    fn verify_binder(
        &self,
        key_schedule: &mut KeySchedule,
        params: &CipherSuiteParams,
        raw_ch: &[u8],
        binder_offer_len: usize,
        binder: &[u8],
    ) -> Result<(), TlsError> {
        if binder_offer_len == 0 || binder_offer_len >= raw_ch.len() {
            return Err(TlsError::DecodeError("malformed binder list".to_string()));
        }
        let binder_key = key_schedule.derive_binder_key(false)?;
        let truncated = &raw_ch[..raw_ch.len() - binder_offer_len];

        // Transcript prefix covers an earlier HelloRetryRequest exchange;
        // the current ClientHello is the buffer tail.
        let buffered = self.transcript.buffer();
        let prefix_len = buffered.len() - raw_ch.len();
        let mut context = buffered[..prefix_len].to_vec();
        context.extend_from_slice(truncated);
        let partial_hash = ferrotls_crypto::hash::hash(params.hash_alg, &context)?;
        let expected = key_schedule.compute_finished_verify_data(&binder_key, &partial_hash)?;
        if expected.ct_eq(binder).unwrap_u8() != 1 {
            return Err(TlsError::CertVerifyFailed(
                "PSK binder verification failed".to_string(),
            ));
        }
        Ok(())
    }

    fn send_hello_retry(
        &mut self,
        suite: CipherSuite,
        group: NamedGroup,
        raw_ch: &[u8],
    ) -> Result<Actions, TlsError> {
        self.hrr_sent = true;
        self.state = HandshakeState::WaitClientHello;

        self.transcript.update(raw_ch);
        self.transcript.replace_with_message_hash()?;

        let hrr = HandshakePayload::ServerHello(ServerHello {
            legacy_version: 0x0303,
            random: HELLO_RETRY_REQUEST_RANDOM,
            session_id_echo: self.session_id_echo.clone(),
            cipher_suite: suite,
            compression_method: 0,
            extensions: vec![
                ExtensionPayload::SupportedVersionsServer(TlsVersion::Tls13.wire()),
                ExtensionPayload::KeyShareHelloRetry(group),
            ],
        })
        .encode()
        .map_err(TlsError::from)?;
        self.transcript.update(&hrr);

        let mut actions = Actions::none();
        actions.outbound.push(Outbound::Handshake(hrr));
        actions.outbound.push(Outbound::ChangeCipherSpec);
        Ok(actions)
    }

    /// Certificate, CertificateVerify.
    fn server_credentials(&mut self) -> Result<Vec<Outbound>, TlsError> {
        let key = self.config.private_key.as_ref().ok_or_else(|| {
            TlsError::HandshakeFailed("server has no private key configured".to_string())
        })?;
        if self.config.certificate_chain.is_empty() {
            return Err(TlsError::HandshakeFailed(
                "server has no certificate configured".to_string(),
            ));
        }
        let scheme = select_scheme(key, &self.peer_signature_algorithms, true)?;

        let mut out = Vec::new();
        let cert_msg = HandshakePayload::Certificate13(Certificate13 {
            context: Vec::new(),
            entries: self
                .config
                .certificate_chain
                .iter()
                .map(|der| CertificateEntry {
                    cert_data: der.clone(),
                    extensions: Vec::new(),
                })
                .collect(),
        })
        .encode()
        .map_err(TlsError::from)?;
        self.transcript.update(&cert_msg);
        out.push(Outbound::Handshake(cert_msg));

        let hash = self.transcript.current_hash()?;
        let message = signature_context(true, &hash);
        let signature = sign_with_key(key, scheme, &message)?;
        let cv_msg = HandshakePayload::CertificateVerify(CertificateVerify { scheme, signature })
            .encode()
            .map_err(TlsError::from)?;
        self.transcript.update(&cv_msg);
        out.push(Outbound::Handshake(cv_msg));
        Ok(out)
    }

    fn handle_end_of_early_data(&mut self) -> Result<Actions, TlsError> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let client_hs_keys = TrafficKeys::derive(&params, &self.client_hs_secret)?;
        let mut actions = Actions::none();
        actions
            .outbound
            .push(Outbound::Activate(KeyActivation::Tls13Read(params, client_hs_keys)));
        Ok(actions)
    }

    fn handle_client_finished(&mut self, fin: Finished, raw: &[u8]) -> Result<Actions, TlsError> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let ks = self
            .key_schedule
            .as_mut()
            .ok_or_else(|| TlsError::HandshakeFailed("key schedule missing".to_string()))?;

        let hash = self.transcript.current_hash()?;
        let expected = ks.compute_finished_verify_data(&self.client_hs_secret, &hash)?;
        if expected.ct_eq(&fin.verify_data).unwrap_u8() != 1 {
            return Err(TlsError::HandshakeFailed(
                "Finished verification failed".to_string(),
            ));
        }
        self.transcript.update(raw);

        let final_hash = self.transcript.current_hash()?;
        self.resumption_master = ks.derive_resumption_master_secret(&final_hash)?;

        let client_app_keys = TrafficKeys::derive(&params, &self.client_app_secret)?;
        let mut actions = Actions::none();
        actions
            .outbound
            .push(Outbound::Activate(KeyActivation::Tls13Read(params, client_app_keys)));

        if self.config.session_resumption && self.config.ticket_key.is_some() {
            if let Some(nst) = self.issue_ticket()? {
                actions.outbound.push(Outbound::Handshake(nst));
            }
        }
        actions.connected = true;
        Ok(actions)
    }

    fn issue_ticket(&mut self) -> Result<Option<Vec<u8>>, TlsError> {
        let params = match &self.params {
            Some(p) => p.clone(),
            None => return Ok(None),
        };
        let ks = match &self.key_schedule {
            Some(ks) => ks,
            None => return Ok(None),
        };
        let key = match &self.config.ticket_key {
            Some(k) => k,
            None => return Ok(None),
        };

        self.ticket_counter += 1;
        let mut nonce = [0u8; 12];
        nonce[4..].copy_from_slice(&self.ticket_counter.to_be_bytes());
        let psk = ks.derive_resumption_psk(&self.resumption_master, &nonce)?;

        let mut age_add_bytes = [0u8; 4];
        getrandom::getrandom(&mut age_add_bytes)
            .map_err(|_| TlsError::HandshakeFailed("random generation failed".to_string()))?;
        let age_add = u32::from_be_bytes(age_add_bytes);

        let session = TlsSession {
            version: TlsVersion::Tls13,
            cipher_suite: params.suite,
            secret: psk,
            ticket: Vec::new(),
            lifetime: TICKET_LIFETIME_SECS,
            age_add,
            max_early_data: self.config.max_early_data_size,
            created_at: unix_now(),
        };
        let state = encode_session_state(&session);
        let ticket = match encrypt_session_ticket(key, &state) {
            Some(t) => t,
            None => return Ok(None),
        };

        let mut extensions = Vec::new();
        if self.config.max_early_data_size > 0 {
            extensions.push(ExtensionPayload::EarlyDataMaxSize(
                self.config.max_early_data_size,
            ));
        }
        let nst = HandshakePayload::NewSessionTicket13(NewSessionTicket13 {
            lifetime: TICKET_LIFETIME_SECS,
            age_add,
            nonce: nonce.to_vec(),
            ticket,
            extensions,
        })
        .encode()
        .map_err(TlsError::from)?;
        Ok(Some(nst))
    }

    fn handle_key_update(&mut self, ku: KeyUpdateRequest) -> Result<Actions, TlsError> {
        self.key_updates += 1;
        if self.key_updates > MAX_KEY_UPDATES {
            return Err(TlsError::HandshakeFailed("too many key updates".to_string()));
        }
        let params = self
            .params
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let ks = self
            .key_schedule
            .as_ref()
            .ok_or_else(|| TlsError::HandshakeFailed("key schedule missing".to_string()))?;

        self.client_app_secret = ks.update_traffic_secret(&self.client_app_secret)?;
        let read_keys = TrafficKeys::derive(&params, &self.client_app_secret)?;

        let mut actions = Actions::none();
        actions
            .outbound
            .push(Outbound::Activate(KeyActivation::Tls13Read(params.clone(), read_keys)));

        if ku.update_requested {
            let reply = HandshakePayload::KeyUpdate(KeyUpdateRequest {
                update_requested: false,
            })
            .encode()
            .map_err(TlsError::from)?;
            actions.outbound.push(Outbound::Handshake(reply));
            self.server_app_secret = ks.update_traffic_secret(&self.server_app_secret)?;
            let write_keys = TrafficKeys::derive(&params, &self.server_app_secret)?;
            actions
                .outbound
                .push(Outbound::Activate(KeyActivation::Tls13Write(params, write_keys)));
        }
        Ok(actions)
    }
}
