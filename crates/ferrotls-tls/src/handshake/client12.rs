//! TLS 1.2 continuation of the client handshake, entered when the
//! ServerHello carries no supported_versions selection.

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use ferrotls_crypto::rsa::{RsaPadding, RsaPublicKey};
use ferrotls_types::TlsError;

use super::client::ClientHandshake;
use super::codec::{
    Certificate12, ClientKeyExchange, Finished, HandshakePayload, ServerHello, ServerKeyExchange,
    ServerKeyExchangeParams,
};
use super::key_exchange::ActiveKeyShare;
use super::verify::verify_with_peer_key;
use super::{Actions, HandshakeState, KeyActivation, Outbound, OwnedKeys};
use crate::config::PeerPublicKey;
use crate::crypt::key_schedule12::{
    compute_verify_data, derive_master_secret, DirectionKeys, Tls12KeyBlock,
};
use crate::crypt::{KeyExchangeAlg, Tls12CipherSuiteParams};
use crate::session::TlsSession;
use crate::TlsVersion;

fn owned(keys: DirectionKeys<'_>) -> OwnedKeys {
    OwnedKeys {
        mac_key: keys.mac_key.to_vec(),
        key: keys.key.to_vec(),
        iv: keys.iv.to_vec(),
    }
}

impl ClientHandshake {
    /// The ServerHello selected TLS 1.2. The transcript already covers it.
    pub(crate) fn begin_tls12(&mut self, sh: ServerHello) -> Result<Actions, TlsError> {
        let params = Tls12CipherSuiteParams::from_suite(sh.cipher_suite)?;
        self.transcript.set_alg(params.prf_alg);
        self.version = Some(TlsVersion::Tls12);
        self.server_random = sh.random;
        self.session_id = sh.session_id_echo;
        self.state = HandshakeState::Tls12WaitCertificate;

        // A ticket offer the server accepts leads straight to its Finished.
        // Preload the resumed master secret; a Certificate message rescinds
        // it and the handshake proceeds in full.
        if self.offered_ticket12.is_some() {
            if let Some(session) = &self.config.resumption_session {
                if session.cipher_suite == sh.cipher_suite {
                    self.master_secret12 = session.secret.clone();
                    self.abbreviated12 = true;
                    let block = Tls12KeyBlock::derive(
                        &params,
                        &self.master_secret12,
                        &self.random,
                        &self.server_random,
                    )?;
                    self.pending_read12 = Some(KeyActivation::Tls12Read(
                        params.clone(),
                        owned(block.server()),
                    ));
                }
            }
        }

        self.params12 = Some(params);
        Ok(Actions::none())
    }

    pub(crate) fn handle_certificate12(
        &mut self,
        cert: Certificate12,
    ) -> Result<Actions, TlsError> {
        // Full handshake after all; drop any resumption preload.
        self.abbreviated12 = false;
        self.master_secret12.zeroize();
        self.master_secret12.clear();
        self.pending_read12 = None;

        let leaf = cert
            .chain
            .first()
            .ok_or_else(|| TlsError::BadCertificate("empty certificate list".to_string()))?;
        self.peer_key12 = self.decode_peer_certificate(leaf)?;
        Ok(Actions::none())
    }

    pub(crate) fn handle_server_key_exchange12(
        &mut self,
        ske: ServerKeyExchange,
    ) -> Result<Actions, TlsError> {
        let params = self
            .params12
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;

        // Signature covers client_random || server_random || params.
        if let Some(peer_key) = &self.peer_key12 {
            if !self.config.signature_algorithms.contains(&ske.scheme) {
                return Err(TlsError::CertVerifyFailed(
                    "signature scheme was not offered".to_string(),
                ));
            }
            let mut message = Vec::with_capacity(64);
            message.extend_from_slice(&self.random);
            message.extend_from_slice(&self.server_random);
            message.extend_from_slice(&ske.params_bytes()?);
            verify_with_peer_key(peer_key, ske.scheme, &message, &ske.signature)?;
        } else if self.config.verify_peer {
            return Err(TlsError::CertVerifyFailed(
                "no peer key to verify against".to_string(),
            ));
        }

        match (&ske.params, params.kx) {
            (ServerKeyExchangeParams::Ecdhe { group, public }, KeyExchangeAlg::Ecdhe) => {
                if !self.config.supported_groups.contains(group) {
                    return Err(TlsError::NoSharedGroup);
                }
                self.share = Some(ActiveKeyShare::generate(*group)?);
                self.server_kx_public12 = public.clone();
            }
            (ServerKeyExchangeParams::Dhe { p, g, public }, KeyExchangeAlg::Dhe) => {
                self.share = Some(ActiveKeyShare::from_explicit_dh(p, g)?);
                self.server_kx_public12 = public.clone();
            }
            _ => {
                return Err(TlsError::UnexpectedMessage(
                    "ServerKeyExchange does not match the cipher suite".to_string(),
                ))
            }
        }
        Ok(Actions::none())
    }

    pub(crate) fn handle_server_hello_done12(&mut self) -> Result<Actions, TlsError> {
        let params = self
            .params12
            .clone()
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated parameters".to_string()))?;
        let mut actions = Actions::none();

        if self.cert_requested12 {
            let cert_msg = HandshakePayload::Certificate12(Certificate12 { chain: Vec::new() })
                .encode()
                .map_err(TlsError::from)?;
            self.transcript.update(&cert_msg);
            actions.outbound.push(Outbound::Handshake(cert_msg));
        }

        let (cke, mut pre_master) = self.build_client_key_exchange12(&params)?;
        let cke_msg = HandshakePayload::ClientKeyExchange(cke)
            .encode()
            .map_err(TlsError::from)?;
        self.transcript.update(&cke_msg);
        actions.outbound.push(Outbound::Handshake(cke_msg));

        self.master_secret12 = derive_master_secret(
            params.prf_alg,
            &pre_master,
            &self.random,
            &self.server_random,
        )?;
        pre_master.zeroize();

        let block = Tls12KeyBlock::derive(
            &params,
            &self.master_secret12,
            &self.random,
            &self.server_random,
        )?;
        self.pending_read12 = Some(KeyActivation::Tls12Read(
            params.clone(),
            owned(block.server()),
        ));

        actions.outbound.push(Outbound::ChangeCipherSpec);
        actions.outbound.push(Outbound::Activate(KeyActivation::Tls12Write(
            params.clone(),
            owned(block.client()),
        )));

        let hash = self.transcript.current_hash()?;
        let verify_data =
            compute_verify_data(params.prf_alg, &self.master_secret12, b"client finished", &hash)?;
        let fin_msg = HandshakePayload::Finished(Finished { verify_data })
            .encode()
            .map_err(TlsError::from)?;
        self.transcript.update(&fin_msg);
        actions.outbound.push(Outbound::Handshake(fin_msg));
        self.client_finished_sent12 = true;
        Ok(actions)
    }

    fn build_client_key_exchange12(
        &mut self,
        params: &Tls12CipherSuiteParams,
    ) -> Result<(ClientKeyExchange, Vec<u8>), TlsError> {
        match params.kx {
            KeyExchangeAlg::Ecdhe | KeyExchangeAlg::Dhe => {
                let share = self.share.as_ref().ok_or_else(|| {
                    TlsError::HandshakeFailed("no ServerKeyExchange received".to_string())
                })?;
                let public = share.public_bytes()?;
                let pre_master = share.shared_secret(&self.server_kx_public12)?;
                let cke = if params.kx == KeyExchangeAlg::Ecdhe {
                    ClientKeyExchange::Ecdh(public)
                } else {
                    ClientKeyExchange::Dh(public)
                };
                Ok((cke, pre_master))
            }
            KeyExchangeAlg::Rsa => {
                // Premaster = offered_version || 46 random bytes, encrypted
                // to the server key.
                let (n, e) = match &self.peer_key12 {
                    Some(PeerPublicKey::Rsa { n, e }) => (n.clone(), e.clone()),
                    _ => {
                        return Err(TlsError::BadCertificate(
                            "static RSA requires an RSA server key".to_string(),
                        ))
                    }
                };
                let mut pre_master = vec![0u8; 48];
                pre_master[0] = 0x03;
                pre_master[1] = 0x03;
                getrandom::getrandom(&mut pre_master[2..]).map_err(|_| {
                    TlsError::HandshakeFailed("random generation failed".to_string())
                })?;
                let key = RsaPublicKey::new(&n, &e)?;
                let encrypted = key.encrypt(RsaPadding::Pkcs1v15Encrypt, &pre_master)?;
                Ok((ClientKeyExchange::Rsa(encrypted), pre_master))
            }
        }
    }

    pub(crate) fn handle_finished12(
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
            compute_verify_data(params.prf_alg, &self.master_secret12, b"server finished", &hash)?;
        if expected.ct_eq(&fin.verify_data).unwrap_u8() != 1 {
            return Err(TlsError::HandshakeFailed(
                "Finished verification failed".to_string(),
            ));
        }
        self.transcript.update(raw);

        let mut actions = Actions::none();
        if !self.client_finished_sent12 {
            // Abbreviated handshake: the server spoke first, answer with our
            // own ChangeCipherSpec and Finished.
            let block = Tls12KeyBlock::derive(
                &params,
                &self.master_secret12,
                &self.random,
                &self.server_random,
            )?;
            actions.outbound.push(Outbound::ChangeCipherSpec);
            actions.outbound.push(Outbound::Activate(KeyActivation::Tls12Write(
                params.clone(),
                owned(block.client()),
            )));
            let hash = self.transcript.current_hash()?;
            let verify_data = compute_verify_data(
                params.prf_alg,
                &self.master_secret12,
                b"client finished",
                &hash,
            )?;
            let fin_msg = HandshakePayload::Finished(Finished { verify_data })
                .encode()
                .map_err(TlsError::from)?;
            self.transcript.update(&fin_msg);
            actions.outbound.push(Outbound::Handshake(fin_msg));
            self.client_finished_sent12 = true;
        }

        self.remember_session12(&params);
        actions.connected = true;
        Ok(actions)
    }

    fn remember_session12(&mut self, params: &Tls12CipherSuiteParams) {
        let ticket = match self.new_ticket12.take().or_else(|| self.offered_ticket12.clone()) {
            Some(t) if !t.is_empty() => t,
            _ => return,
        };
        let session = TlsSession {
            version: TlsVersion::Tls12,
            cipher_suite: params.suite,
            secret: self.master_secret12.clone(),
            ticket: ticket.clone(),
            lifetime: 7200,
            age_add: 0,
            max_early_data: 0,
            created_at: crate::session::unix_now(),
        };
        self.latest_session = Some(session.clone());
        self.store_session(ticket, session);
    }
}
