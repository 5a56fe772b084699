//! TLS 1.2 side of the server handshake, entered when the ClientHello
//! carries no TLS 1.3 supported_versions offer.

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use ferrotls_crypto::rsa::RsaPadding;
use ferrotls_types::TlsError;

use super::codec::{
    Certificate12, ClientHello, ClientKeyExchange, Finished, HandshakePayload, NewSessionTicket12,
    ServerHello, ServerKeyExchange, ServerKeyExchangeParams,
};
use super::key_exchange::ActiveKeyShare;
use super::server::ServerHandshake;
use super::verify::{select_scheme, sign_with_key};
use super::{Actions, HandshakeState, KeyActivation, Outbound, OwnedKeys};
use crate::config::PrivateKey;
use crate::crypt::key_schedule12::{
    compute_verify_data, derive_master_secret, DirectionKeys, Tls12KeyBlock,
};
use crate::crypt::{
    AuthAlg, KeyExchangeAlg, NamedGroup, SignatureScheme, Tls12CipherSuiteParams, is_tls12_suite,
};
use crate::extensions::{ExtensionPayload, ExtensionType, find_extension};
use crate::session::{
    TlsSession, decode_session_state, decrypt_session_ticket, encode_session_state,
    encrypt_session_ticket, unix_now,
};
use crate::{CipherSuite, TlsVersion};

const TICKET_LIFETIME_SECS: u32 = 7200;

fn owned(keys: DirectionKeys<'_>) -> OwnedKeys {
    OwnedKeys {
        mac_key: keys.mac_key.to_vec(),
        key: keys.key.to_vec(),
        iv: keys.iv.to_vec(),
    }
}

impl ServerHandshake {
    pub(crate) fn handle_client_hello12(
        &mut self,
        ch: ClientHello,
        raw: &[u8],
    ) -> Result<Actions, TlsError> {
        self.peer_offered_ticket_ext12 =
            find_extension(&ch.extensions, ExtensionType::SESSION_TICKET).is_some();

        // An offered ticket that decrypts to a live TLS 1.2 session takes
        // the abbreviated path.
        let resumed = self.decrypt_offered_ticket12(&ch);
        if let Some(session) = resumed {
            return self.resume_abbreviated12(session, raw);
        }

        let suite = self.select_suite12(&ch)?;
        let params = Tls12CipherSuiteParams::from_suite(suite)?;
        self.transcript.set_alg(params.prf_alg);
        self.transcript.update(raw);

        let config = self.config.clone();
        let key = config.private_key.as_ref().ok_or_else(|| {
            TlsError::HandshakeFailed("server has no private key configured".to_string())
        })?;
        if self.config.certificate_chain.is_empty() {
            return Err(TlsError::HandshakeFailed(
                "server has no certificate configured".to_string(),
            ));
        }

        let mut actions = Actions::none();
        let sh = self.build_server_hello12(suite, params.kx)?;
        self.transcript.update(&sh);
        actions.outbound.push(Outbound::Handshake(sh));

        let cert_msg = HandshakePayload::Certificate12(Certificate12 {
            chain: self.config.certificate_chain.clone(),
        })
        .encode()
        .map_err(TlsError::from)?;
        self.transcript.update(&cert_msg);
        actions.outbound.push(Outbound::Handshake(cert_msg));

        match params.kx {
            KeyExchangeAlg::Ecdhe => {
                let group = self
                    .shared_ec_group12(&ch)
                    .ok_or(TlsError::NoSharedGroup)?;
                let share = ActiveKeyShare::generate(group)?;
                let ske_params = ServerKeyExchangeParams::Ecdhe {
                    group,
                    public: share.public_bytes()?,
                };
                let ske = self.sign_server_key_exchange(key, ske_params)?;
                self.transcript.update(&ske);
                actions.outbound.push(Outbound::Handshake(ske));
                self.share12 = Some(share);
            }
            KeyExchangeAlg::Dhe => {
                let share = ActiveKeyShare::generate(NamedGroup::FFDHE2048)?;
                let dh = share.dh_params().ok_or_else(|| {
                    TlsError::HandshakeFailed("DH parameters unavailable".to_string())
                })?;
                let ske_params = ServerKeyExchangeParams::Dhe {
                    p: dh.p_bytes(),
                    g: dh.g_bytes(),
                    public: share.public_bytes()?,
                };
                let ske = self.sign_server_key_exchange(key, ske_params)?;
                self.transcript.update(&ske);
                actions.outbound.push(Outbound::Handshake(ske));
                self.share12 = Some(share);
            }
            KeyExchangeAlg::Rsa => {}
        }

        let shd = HandshakePayload::ServerHelloDone
            .encode()
            .map_err(TlsError::from)?;
        self.transcript.update(&shd);
        actions.outbound.push(Outbound::Handshake(shd));

        log::debug!("negotiated TLS 1.2, suite {:#06x}", suite.0);
        self.params12 = Some(params);
        self.state = HandshakeState::Tls12WaitClientKeyExchange;
        Ok(actions)
    }

    fn decrypt_offered_ticket12(&self, ch: &ClientHello) -> Option<TlsSession> {
        let ticket = match find_extension(&ch.extensions, ExtensionType::SESSION_TICKET) {
            Some(ExtensionPayload::SessionTicket(t)) if !t.is_empty() => t,
            _ => return None,
        };
        let key = self.config.ticket_key.as_ref()?;
        if !self.config.session_resumption {
            return None;
        }
        decrypt_session_ticket(key, ticket)
            .and_then(|state| decode_session_state(&state))
            .filter(|s| {
                s.version == TlsVersion::Tls12
                    && !s.is_expired(unix_now())
                    && ch.cipher_suites.contains(&s.cipher_suite)
                    && self.config.cipher_suites.contains(&s.cipher_suite)
            })
    }

    fn resume_abbreviated12(
        &mut self,
        session: TlsSession,
        raw_ch: &[u8],
    ) -> Result<Actions, TlsError> {
        let params = Tls12CipherSuiteParams::from_suite(session.cipher_suite)?;
        self.transcript.set_alg(params.prf_alg);
        self.transcript.update(raw_ch);
        self.master_secret12 = session.secret.clone();
        self.abbreviated12 = true;
        log::debug!(
            "resuming TLS 1.2 session, suite {:#06x}",
            session.cipher_suite.0
        );

        let mut actions = Actions::none();
        let sh = self.build_server_hello12(session.cipher_suite, params.kx)?;
        self.transcript.update(&sh);
        actions.outbound.push(Outbound::Handshake(sh));

        // Renew the ticket under the current key.
        if let Some(nst) = self.issue_ticket12(&params)? {
            self.transcript.update(&nst);
            actions.outbound.push(Outbound::Handshake(nst));
        }

        let block = Tls12KeyBlock::derive(
            &params,
            &self.master_secret12,
            &self.client_random,
            &self.random,
        )?;
        self.pending_read12 = Some(KeyActivation::Tls12Read(
            params.clone(),
            owned(block.client()),
        ));
        actions.outbound.push(Outbound::ChangeCipherSpec);
        actions.outbound.push(Outbound::Activate(KeyActivation::Tls12Write(
            params.clone(),
            owned(block.server()),
        )));

        let hash = self.transcript.current_hash()?;
        let verify_data =
            compute_verify_data(params.prf_alg, &self.master_secret12, b"server finished", &hash)?;
        let fin_msg = HandshakePayload::Finished(Finished { verify_data })
            .encode()
            .map_err(TlsError::from)?;
        self.transcript.update(&fin_msg);
        actions.outbound.push(Outbound::Handshake(fin_msg));

        self.params12 = Some(params);
        self.state = HandshakeState::Tls12WaitClientFinished;
        Ok(actions)
    }

    fn build_server_hello12(
        &self,
        suite: CipherSuite,
        kx: KeyExchangeAlg,
    ) -> Result<Vec<u8>, TlsError> {
        let mut extensions = vec![ExtensionPayload::RenegotiationInfo(Vec::new())];
        if kx == KeyExchangeAlg::Ecdhe {
            extensions.push(ExtensionPayload::EcPointFormats(vec![0]));
        }
        if self.peer_offered_ticket_ext12
            && self.config.session_resumption
            && self.config.ticket_key.is_some()
        {
            extensions.push(ExtensionPayload::SessionTicket(Vec::new()));
        }
        HandshakePayload::ServerHello(ServerHello {
            legacy_version: 0x0303,
            random: self.random,
            session_id_echo: Vec::new(),
            cipher_suite: suite,
            compression_method: 0,
            extensions,
        })
        .encode()
        .map_err(TlsError::from)
    }

    fn select_suite12(&self, ch: &ClientHello) -> Result<CipherSuite, TlsError> {
        let key = self.config.private_key.as_ref();
        self.config
            .cipher_suites
            .iter()
            .copied()
            .find(|suite| {
                if !is_tls12_suite(*suite) || !ch.cipher_suites.contains(suite) {
                    return false;
                }
                let params = match Tls12CipherSuiteParams::from_suite(*suite) {
                    Ok(p) => p,
                    Err(_) => return false,
                };
                let key_matches = match (params.auth, key) {
                    (AuthAlg::Rsa, Some(PrivateKey::Rsa { .. })) => true,
                    (AuthAlg::Ecdsa, Some(PrivateKey::Ecdsa { .. })) => true,
                    _ => false,
                };
                if !key_matches {
                    return false;
                }
                match params.kx {
                    KeyExchangeAlg::Ecdhe => self.shared_ec_group12(ch).is_some(),
                    KeyExchangeAlg::Dhe => true,
                    KeyExchangeAlg::Rsa => matches!(key, Some(PrivateKey::Rsa { .. })),
                }
            })
            .ok_or(TlsError::NoSharedCipherSuite)
    }

    fn shared_ec_group12(&self, ch: &ClientHello) -> Option<NamedGroup> {
        let offered = match find_extension(&ch.extensions, ExtensionType::SUPPORTED_GROUPS) {
            Some(ExtensionPayload::SupportedGroups(groups)) => groups.clone(),
            // No extension means the peer takes any curve we pick.
            _ => self.config.supported_groups.clone(),
        };
        offered
            .iter()
            .copied()
            .find(|g| self.config.supported_groups.contains(g) && g.curve_id().is_some())
    }

    fn sign_server_key_exchange(
        &self,
        key: &PrivateKey,
        params: ServerKeyExchangeParams,
    ) -> Result<Vec<u8>, TlsError> {
        let offered = if self.peer_signature_algorithms.is_empty() {
            // Absent signature_algorithms implies the SHA-256 defaults.
            match key {
                PrivateKey::Rsa { .. } => vec![SignatureScheme::RSA_PKCS1_SHA256],
                PrivateKey::Ecdsa { .. } => vec![SignatureScheme::ECDSA_SECP256R1_SHA256],
            }
        } else {
            self.peer_signature_algorithms.clone()
        };
        let scheme = select_scheme(key, &offered, false)?;

        let ske = ServerKeyExchange {
            params,
            scheme,
            signature: Vec::new(),
        };
        let mut message = Vec::with_capacity(64);
        message.extend_from_slice(&self.client_random);
        message.extend_from_slice(&self.random);
        message.extend_from_slice(&ske.params_bytes()?);
        let signature = sign_with_key(key, scheme, &message)?;

        HandshakePayload::ServerKeyExchange(ServerKeyExchange {
            signature,
            ..ske
        })
        .encode()
        .map_err(TlsError::from)
    }

    pub(crate) fn handle_client_key_exchange12(
        &mut self,
        cke: ClientKeyExchange,
    ) -> Result<Actions, TlsError> {
        let params = self
            .params12
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;

        let mut pre_master = match (cke, params.kx) {
            (ClientKeyExchange::Ecdh(public), KeyExchangeAlg::Ecdhe)
            | (ClientKeyExchange::Dh(public), KeyExchangeAlg::Dhe) => {
                let share = self.share12.as_ref().ok_or_else(|| {
                    TlsError::HandshakeFailed("no key exchange state".to_string())
                })?;
                share.shared_secret(&public)?
            }
            (ClientKeyExchange::Rsa(encrypted), KeyExchangeAlg::Rsa) => {
                self.decrypt_rsa_premaster12(&encrypted)?
            }
            _ => {
                return Err(TlsError::UnexpectedMessage(
                    "ClientKeyExchange does not match the cipher suite".to_string(),
                ))
            }
        };

        self.master_secret12 = derive_master_secret(
            params.prf_alg,
            &pre_master,
            &self.client_random,
            &self.random,
        )?;
        pre_master.zeroize();

        let block = Tls12KeyBlock::derive(
            &params,
            &self.master_secret12,
            &self.client_random,
            &self.random,
        )?;
        self.pending_read12 = Some(KeyActivation::Tls12Read(params, owned(block.client())));
        Ok(Actions::none())
    }

    /// Bad RSA padding or a wrong version byte is answered with a random
    /// premaster secret, so the failure only surfaces as a Finished
    /// mismatch (RFC 5246 section 7.4.7.1).
    fn decrypt_rsa_premaster12(&self, encrypted: &[u8]) -> Result<Vec<u8>, TlsError> {
        let key = match &self.config.private_key {
            Some(PrivateKey::Rsa { n, d, e, p, q }) => {
                ferrotls_crypto::rsa::RsaPrivateKey::new(n, d, e, p, q)?
            }
            _ => {
                return Err(TlsError::HandshakeFailed(
                    "static RSA requires an RSA server key".to_string(),
                ))
            }
        };

        let mut fallback = vec![0u8; 48];
        getrandom::getrandom(&mut fallback)
            .map_err(|_| TlsError::HandshakeFailed("random generation failed".to_string()))?;
        fallback[0] = 0x03;
        fallback[1] = 0x03;

        let decrypted = match key.decrypt(RsaPadding::Pkcs1v15Encrypt, encrypted) {
            Ok(pms) => pms,
            Err(_) => return Ok(fallback),
        };
        if decrypted.len() != 48 || decrypted[0] != 0x03 || decrypted[1] != 0x03 {
            return Ok(fallback);
        }
        Ok(decrypted)
    }

    pub(crate) fn handle_client_finished12(
        &mut self,
        fin: Finished,
        raw: &[u8],
    ) -> Result<Actions, TlsError> {
        let params = self
            .params12
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let hash = self.transcript.current_hash()?;
        let expected =
            compute_verify_data(params.prf_alg, &self.master_secret12, b"client finished", &hash)?;
        if expected.ct_eq(&fin.verify_data).unwrap_u8() != 1 {
            return Err(TlsError::HandshakeFailed(
                "Finished verification failed".to_string(),
            ));
        }
        self.transcript.update(raw);
        self.client_finished_seen12 = true;

        let mut actions = Actions::none();
        if !self.abbreviated12 {
            if self.peer_offered_ticket_ext12
                && self.config.session_resumption
                && self.config.ticket_key.is_some()
            {
                if let Some(nst) = self.issue_ticket12(&params)? {
                    self.transcript.update(&nst);
                    actions.outbound.push(Outbound::Handshake(nst));
                }
            }

            let block = Tls12KeyBlock::derive(
                &params,
                &self.master_secret12,
                &self.client_random,
                &self.random,
            )?;
            actions.outbound.push(Outbound::ChangeCipherSpec);
            actions.outbound.push(Outbound::Activate(KeyActivation::Tls12Write(
                params.clone(),
                owned(block.server()),
            )));

            let hash = self.transcript.current_hash()?;
            let verify_data = compute_verify_data(
                params.prf_alg,
                &self.master_secret12,
                b"server finished",
                &hash,
            )?;
            let fin_msg = HandshakePayload::Finished(Finished { verify_data })
                .encode()
                .map_err(TlsError::from)?;
            self.transcript.update(&fin_msg);
            actions.outbound.push(Outbound::Handshake(fin_msg));
        }
        actions.connected = true;
        Ok(actions)
    }

    fn issue_ticket12(
        &self,
        params: &Tls12CipherSuiteParams,
    ) -> Result<Option<Vec<u8>>, TlsError> {
        let key = match &self.config.ticket_key {
            Some(k) => k,
            None => return Ok(None),
        };
        let session = TlsSession {
            version: TlsVersion::Tls12,
            cipher_suite: params.suite,
            secret: self.master_secret12.clone(),
            ticket: Vec::new(),
            lifetime: TICKET_LIFETIME_SECS,
            age_add: 0,
            max_early_data: 0,
            created_at: unix_now(),
        };
        let state = encode_session_state(&session);
        let ticket = match encrypt_session_ticket(key, &state) {
            Some(t) => t,
            None => return Ok(None),
        };
        let nst = HandshakePayload::NewSessionTicket12(NewSessionTicket12 {
            lifetime_hint: TICKET_LIFETIME_SECS,
            ticket,
        })
        .encode()
        .map_err(TlsError::from)?;
        Ok(Some(nst))
    }
}
