//! Handshake message types, connection states and the per-role legality
//! table that gates message dispatch.

pub mod client;
pub mod client12;
pub mod codec;
pub mod key_exchange;
pub mod server;
pub mod server12;
pub mod verify;

use zeroize::Zeroize;

use crate::alert::{Alert, AlertDescription};
use crate::crypt::traffic_keys::TrafficKeys;
use crate::crypt::{CipherSuiteParams, Tls12CipherSuiteParams};
use crate::TlsRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeType {
    ClientHello = 1,
    ServerHello = 2,
    NewSessionTicket = 4,
    EndOfEarlyData = 5,
    EncryptedExtensions = 8,
    Certificate = 11,
    ServerKeyExchange = 12,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    CertificateVerify = 15,
    ClientKeyExchange = 16,
    Finished = 20,
    KeyUpdate = 24,
    // Synthetic transcript entry after HelloRetryRequest, never on the wire.
    MessageHash = 254,
}

impl HandshakeType {
    pub fn from_u8(v: u8) -> Result<Self, u8> {
        match v {
            1 => Ok(Self::ClientHello),
            2 => Ok(Self::ServerHello),
            4 => Ok(Self::NewSessionTicket),
            5 => Ok(Self::EndOfEarlyData),
            8 => Ok(Self::EncryptedExtensions),
            11 => Ok(Self::Certificate),
            12 => Ok(Self::ServerKeyExchange),
            13 => Ok(Self::CertificateRequest),
            14 => Ok(Self::ServerHelloDone),
            15 => Ok(Self::CertificateVerify),
            16 => Ok(Self::ClientKeyExchange),
            20 => Ok(Self::Finished),
            24 => Ok(Self::KeyUpdate),
            254 => Ok(Self::MessageHash),
            other => Err(other),
        }
    }
}

/// Where a connection stands in its handshake. The TLS 1.2 states carry a
/// `Tls12` prefix; version selection happens while leaving WaitServerHello
/// or WaitClientHello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    // Client, both versions.
    WaitServerHello,
    // Client, TLS 1.3.
    WaitEncryptedExtensions,
    WaitCertCertReq,
    WaitCertVerify,
    WaitFinished,
    // Client, TLS 1.2.
    Tls12WaitCertificate,
    Tls12WaitServerKeyExchange,
    Tls12WaitServerHelloDone,
    Tls12WaitTicketOrFinished,
    Tls12WaitFinished,
    // Server, both versions.
    WaitClientHello,
    // Server, TLS 1.3.
    WaitEndOfEarlyData,
    WaitClientFinished,
    // Server, TLS 1.2.
    Tls12WaitClientKeyExchange,
    Tls12WaitClientFinished,
    // Terminal.
    Connected,
    Closed,
    Error,
}

/// TLS 1.2 per-direction record keys in owned form.
#[derive(Debug)]
pub struct OwnedKeys {
    pub mac_key: Vec<u8>,
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl Drop for OwnedKeys {
    fn drop(&mut self) {
        self.mac_key.zeroize();
        self.key.zeroize();
        self.iv.zeroize();
    }
}

/// A record protection change requested by a handshake driver.
#[derive(Debug)]
pub enum KeyActivation {
    Tls13Write(CipherSuiteParams, TrafficKeys),
    Tls13Read(CipherSuiteParams, TrafficKeys),
    Tls12Write(Tls12CipherSuiteParams, OwnedKeys),
    Tls12Read(Tls12CipherSuiteParams, OwnedKeys),
}

/// One step of a handshake flight, in the order the record layer must
/// apply it.
#[derive(Debug)]
pub enum Outbound {
    /// A complete encoded handshake message, sent under the write keys in
    /// effect when it is reached.
    Handshake(Vec<u8>),
    /// Application data, used for early data.
    ApplicationData(Vec<u8>),
    ChangeCipherSpec,
    Activate(KeyActivation),
}

/// What a driver wants done after consuming one event.
#[derive(Debug, Default)]
pub struct Actions {
    pub outbound: Vec<Outbound>,
    /// The handshake completed with this event.
    pub connected: bool,
}

impl Actions {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Decide whether `incoming` is legal in `state` for `role`, and what state
/// the default successful handling leads to. Drivers may refine the
/// returned state after semantic processing, for example on HelloRetryRequest
/// or when TLS 1.2 is negotiated. Illegal messages map to a fatal
/// unexpected_message alert.
pub fn transition(
    role: TlsRole,
    state: HandshakeState,
    incoming: HandshakeType,
) -> Result<HandshakeState, Alert> {
    use HandshakeState as S;
    use HandshakeType as T;

    let next = match (role, state, incoming) {
        (TlsRole::Client, S::WaitServerHello, T::ServerHello) => S::WaitEncryptedExtensions,
        (TlsRole::Client, S::WaitEncryptedExtensions, T::EncryptedExtensions) => S::WaitCertCertReq,
        (TlsRole::Client, S::WaitCertCertReq, T::CertificateRequest) => S::WaitCertCertReq,
        (TlsRole::Client, S::WaitCertCertReq, T::Certificate) => S::WaitCertVerify,
        // PSK handshakes authenticate without a certificate flight.
        (TlsRole::Client, S::WaitCertCertReq, T::Finished) => S::Connected,
        (TlsRole::Client, S::WaitCertVerify, T::CertificateVerify) => S::WaitFinished,
        (TlsRole::Client, S::WaitFinished, T::Finished) => S::Connected,

        (TlsRole::Client, S::Tls12WaitCertificate, T::Certificate) => S::Tls12WaitServerKeyExchange,
        // Abbreviated ticket resumption: the server jumps straight to its
        // ticket renewal and Finished.
        (TlsRole::Client, S::Tls12WaitCertificate, T::NewSessionTicket) => S::Tls12WaitFinished,
        (TlsRole::Client, S::Tls12WaitCertificate, T::Finished) => S::Connected,
        (TlsRole::Client, S::Tls12WaitServerKeyExchange, T::ServerKeyExchange) => {
            S::Tls12WaitServerHelloDone
        }
        (TlsRole::Client, S::Tls12WaitServerKeyExchange, T::CertificateRequest) => {
            S::Tls12WaitServerHelloDone
        }
        // Static RSA key exchange has no ServerKeyExchange.
        (TlsRole::Client, S::Tls12WaitServerKeyExchange, T::ServerHelloDone) => {
            S::Tls12WaitTicketOrFinished
        }
        (TlsRole::Client, S::Tls12WaitServerHelloDone, T::CertificateRequest) => {
            S::Tls12WaitServerHelloDone
        }
        (TlsRole::Client, S::Tls12WaitServerHelloDone, T::ServerHelloDone) => {
            S::Tls12WaitTicketOrFinished
        }
        (TlsRole::Client, S::Tls12WaitTicketOrFinished, T::NewSessionTicket) => S::Tls12WaitFinished,
        (TlsRole::Client, S::Tls12WaitTicketOrFinished, T::Finished) => S::Connected,
        (TlsRole::Client, S::Tls12WaitFinished, T::Finished) => S::Connected,

        (TlsRole::Client, S::Connected, T::NewSessionTicket) => S::Connected,
        (_, S::Connected, T::KeyUpdate) => S::Connected,

        (TlsRole::Server, S::WaitClientHello, T::ClientHello) => S::WaitClientFinished,
        (TlsRole::Server, S::WaitEndOfEarlyData, T::EndOfEarlyData) => S::WaitClientFinished,
        (TlsRole::Server, S::WaitClientFinished, T::Finished) => S::Connected,

        (TlsRole::Server, S::Tls12WaitClientKeyExchange, T::ClientKeyExchange) => {
            S::Tls12WaitClientFinished
        }
        (TlsRole::Server, S::Tls12WaitClientFinished, T::Finished) => S::Connected,

        _ => return Err(Alert::fatal(AlertDescription::UnexpectedMessage)),
    };
    Ok(next)
}
