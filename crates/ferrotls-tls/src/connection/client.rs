//! Client side of a stream-backed connection.

use std::io::{Read, Write};
use std::sync::Arc;

use ferrotls_types::TlsError;

use super::{ConnectionCore, ConnectionState};
use crate::alert::{Alert, AlertDescription};
use crate::config::TlsConfig;
use crate::handshake::client::ClientHandshake;
use crate::record::ContentType;
use crate::{CipherSuite, TlsConnection, TlsVersion};

pub struct TlsClientConnection<S> {
    core: ConnectionCore<S>,
    driver: ClientHandshake,
    early_data: Option<Vec<u8>>,
}

impl<S: Read + Write> TlsClientConnection<S> {
    pub fn new(stream: S, config: Arc<TlsConfig>) -> Result<Self, TlsError> {
        let core = ConnectionCore::new(stream, config.max_fragment_size);
        let driver = ClientHandshake::new(config)?;
        Ok(Self {
            core,
            driver,
            early_data: None,
        })
    }

    /// Queue application data to send 0-RTT with the ClientHello. Only
    /// honored when resuming a session that granted an early data
    /// allowance.
    pub fn new_with_early_data(
        stream: S,
        config: Arc<TlsConfig>,
        early_data: Vec<u8>,
    ) -> Result<Self, TlsError> {
        let mut conn = Self::new(stream, config)?;
        conn.early_data = Some(early_data);
        Ok(conn)
    }

    pub fn state(&self) -> ConnectionState {
        self.core.state
    }

    pub fn is_resumed(&self) -> bool {
        self.driver.resumed()
    }

    pub fn used_hello_retry(&self) -> bool {
        self.driver.used_hello_retry()
    }

    /// The most recent resumable session, for later reconnects.
    pub fn latest_session(&self) -> Option<&crate::session::TlsSession> {
        self.driver.latest_session()
    }

    /// Post-handshake rekey of our write direction, asking the peer to do
    /// the same.
    pub fn request_key_update(&mut self) -> Result<(), TlsError> {
        let actions = self.driver.request_key_update()?;
        self.core.apply_outbound(actions.outbound)
    }

    /// Read and dispatch one record.
    fn step(&mut self) -> Result<(), TlsError> {
        let record = self.core.next_record()?;
        let (content_type, payload) = match self.core.record_layer.open_record(record) {
            Ok(opened) => opened,
            Err(e) => return Err(self.core.fail(e)),
        };
        match content_type {
            ContentType::Handshake => {
                self.core.joiner.push(&payload);
                loop {
                    let frame = match self.core.joiner.next() {
                        Ok(Some(frame)) => frame,
                        Ok(None) => break,
                        Err(e) => return Err(self.core.fail(e)),
                    };
                    let actions = match self.driver.handle_message(&frame.raw) {
                        Ok(actions) => actions,
                        Err(e) => return Err(self.core.fail(e)),
                    };
                    let connected = actions.connected;
                    self.core.apply_outbound(actions.outbound)?;
                    if connected {
                        self.core.state = ConnectionState::Connected;
                    }
                }
                Ok(())
            }
            ContentType::ChangeCipherSpec => {
                if payload != [1] {
                    return Err(self
                        .core
                        .fail(TlsError::DecodeError("bad change_cipher_spec".to_string())));
                }
                let actions = match self.driver.handle_ccs() {
                    Ok(actions) => actions,
                    Err(e) => return Err(self.core.fail(e)),
                };
                self.core.apply_outbound(actions.outbound)
            }
            ContentType::Alert => self.handle_alert(&payload),
            ContentType::ApplicationData => {
                if self.core.state != ConnectionState::Connected {
                    return Err(self.core.fail(TlsError::UnexpectedMessage(
                        "application data during the handshake".to_string(),
                    )));
                }
                self.core.plaintext_in.extend_from_slice(&payload);
                Ok(())
            }
        }
    }

    fn handle_alert(&mut self, payload: &[u8]) -> Result<(), TlsError> {
        let alert = Alert::parse(payload)?;
        log::debug!("received alert {:?}", alert.description);
        if alert.description == AlertDescription::CloseNotify {
            self.core.state = ConnectionState::Closed;
            Ok(())
        } else {
            self.core.state = ConnectionState::Error;
            Err(TlsError::AlertReceived(format!("{:?}", alert.description)))
        }
    }
}

impl<S: Read + Write> TlsConnection for TlsClientConnection<S> {
    fn handshake(&mut self) -> Result<(), TlsError> {
        if self.core.state != ConnectionState::Handshaking {
            return Err(TlsError::HandshakeFailed(
                "connection is not in handshake state".to_string(),
            ));
        }
        let actions = match self.driver.start(self.early_data.take()) {
            Ok(actions) => actions,
            Err(e) => return Err(self.core.fail(e)),
        };
        self.core.apply_outbound(actions.outbound)?;

        while self.core.state == ConnectionState::Handshaking {
            self.step()?;
        }
        match self.core.state {
            ConnectionState::Connected => Ok(()),
            _ => Err(TlsError::ConnectionClosed),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        loop {
            if !self.core.plaintext_in.is_empty() {
                let n = buf.len().min(self.core.plaintext_in.len());
                buf[..n].copy_from_slice(&self.core.plaintext_in[..n]);
                self.core.plaintext_in.drain(..n);
                return Ok(n);
            }
            match self.core.state {
                ConnectionState::Connected => self.step()?,
                ConnectionState::Closed => return Ok(0),
                _ => return Err(TlsError::ConnectionClosed),
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TlsError> {
        if self.core.state != ConnectionState::Connected {
            return Err(TlsError::ConnectionClosed);
        }
        self.core.send_app_data(data)?;
        Ok(data.len())
    }

    fn shutdown(&mut self) -> Result<(), TlsError> {
        self.core.close()
    }

    fn version(&self) -> Option<TlsVersion> {
        self.driver.version()
    }

    fn cipher_suite(&self) -> Option<CipherSuite> {
        self.driver.cipher_suite()
    }
}
