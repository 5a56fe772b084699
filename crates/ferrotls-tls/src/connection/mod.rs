//! Stream-backed TLS connections.
//!
//! The handshake drivers are pure state machines; this module owns the
//! transport, feeds them records, and carries out the `Actions` they
//! return. `TlsClientConnection` and `TlsServerConnection` implement the
//! `TlsConnection` trait over any `Read + Write` stream.

pub mod client;
pub mod server;

#[cfg(test)]
mod tests;

use std::io::{Read, Write};

use ferrotls_types::TlsError;

use crate::alert::{Alert, AlertDescription, alert_for_error};
use crate::crypt::key_schedule12::DirectionKeys;
use crate::handshake::{KeyActivation, Outbound};
use crate::record::joiner::HandshakeJoiner;
use crate::record::{ContentType, Record, RecordLayer, parse_record};

pub use client::TlsClientConnection;
pub use server::TlsServerConnection;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Handshaking,
    Connected,
    Closed,
    Error,
}

/// Transport plumbing shared by both connection ends.
pub(crate) struct ConnectionCore<S> {
    stream: S,
    pub(crate) record_layer: RecordLayer,
    pub(crate) joiner: HandshakeJoiner,
    recv_buf: Vec<u8>,
    pub(crate) plaintext_in: Vec<u8>,
    pub(crate) state: ConnectionState,
}

impl<S: Read + Write> ConnectionCore<S> {
    pub(crate) fn new(stream: S, max_fragment_size: usize) -> Self {
        Self {
            stream,
            record_layer: RecordLayer::new(max_fragment_size),
            joiner: HandshakeJoiner::new(),
            recv_buf: Vec::new(),
            plaintext_in: Vec::new(),
            state: ConnectionState::Handshaking,
        }
    }

    /// Block until one full record is available.
    pub(crate) fn next_record(&mut self) -> Result<Record, TlsError> {
        loop {
            if let Some((record, consumed)) = parse_record(&self.recv_buf)? {
                self.recv_buf.drain(..consumed);
                return Ok(record);
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(TlsError::ConnectionClosed);
            }
            self.recv_buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn send_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<(), TlsError> {
        let record = self.record_layer.seal_record(content_type, payload)?;
        self.stream.write_all(&record)?;
        Ok(())
    }

    /// Handshake messages can exceed one record; split on the fragment
    /// limit.
    fn send_handshake(&mut self, msg: &[u8]) -> Result<(), TlsError> {
        for chunk in msg.chunks(self.record_layer.max_fragment_size()) {
            self.send_record(ContentType::Handshake, chunk)?;
        }
        Ok(())
    }

    pub(crate) fn send_app_data(&mut self, data: &[u8]) -> Result<(), TlsError> {
        for chunk in data.chunks(self.record_layer.max_fragment_size()) {
            self.send_record(ContentType::ApplicationData, chunk)?;
        }
        Ok(())
    }

    pub(crate) fn send_alert(&mut self, alert: Alert) -> Result<(), TlsError> {
        log::debug!("sending alert {:?}", alert.description);
        self.send_record(ContentType::Alert, &alert.to_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    /// Notify the peer before tearing down; transport failures at this
    /// point are moot.
    pub(crate) fn send_fatal_alert(&mut self, description: AlertDescription) {
        let _ = self.send_alert(Alert::fatal(description));
        self.state = ConnectionState::Error;
    }

    fn activate(&mut self, activation: KeyActivation) -> Result<(), TlsError> {
        match activation {
            KeyActivation::Tls13Write(params, keys) => {
                self.record_layer.activate_tls13_write(&params, &keys)
            }
            KeyActivation::Tls13Read(params, keys) => {
                self.record_layer.activate_tls13_read(&params, &keys)
            }
            KeyActivation::Tls12Write(params, keys) => self.record_layer.activate_tls12_write(
                &params,
                &DirectionKeys {
                    mac_key: &keys.mac_key,
                    key: &keys.key,
                    iv: &keys.iv,
                },
            ),
            KeyActivation::Tls12Read(params, keys) => self.record_layer.activate_tls12_read(
                &params,
                &DirectionKeys {
                    mac_key: &keys.mac_key,
                    key: &keys.key,
                    iv: &keys.iv,
                },
            ),
        }
    }

    /// Carry out one flight in order: every message goes out under the
    /// write keys in effect when it is reached.
    pub(crate) fn apply_outbound(&mut self, outbound: Vec<Outbound>) -> Result<(), TlsError> {
        for item in outbound {
            match item {
                Outbound::Handshake(msg) => self.send_handshake(&msg)?,
                Outbound::ApplicationData(data) => self.send_app_data(&data)?,
                Outbound::ChangeCipherSpec => {
                    self.send_record(ContentType::ChangeCipherSpec, &[1])?
                }
                Outbound::Activate(activation) => self.activate(activation)?,
            }
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Map an error to its alert, tell the peer, and poison the connection.
    pub(crate) fn fail(&mut self, err: TlsError) -> TlsError {
        self.send_fatal_alert(alert_for_error(&err));
        err
    }

    pub(crate) fn close(&mut self) -> Result<(), TlsError> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        let result = self.send_alert(Alert::close_notify());
        self.state = ConnectionState::Closed;
        result
    }
}
