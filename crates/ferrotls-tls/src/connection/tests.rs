use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use ferrotls_crypto::ecdsa::EcdsaKeyPair;
use ferrotls_types::EccCurveId;

use super::{ConnectionState, TlsClientConnection, TlsServerConnection};
use crate::config::{CertificateDecoder, PeerPublicKey, PrivateKey, TlsConfig};
use crate::crypt::NamedGroup;
use crate::handshake::client::ClientHandshake;
use crate::session::TlsSession;
use crate::{CipherSuite, TlsConnection, TlsError, TlsVersion};

/// In-memory duplex transport. Writes are delivered in chunks of at most
/// `write_chunk` bytes so record reassembly across reads gets exercised.
struct PipeEnd {
    rx: mpsc::Receiver<Vec<u8>>,
    tx: mpsc::Sender<Vec<u8>>,
    pending: Vec<u8>,
    write_chunk: usize,
}

impl Read for PipeEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv() {
                Ok(data) => self.pending = data,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Write for PipeEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.chunks(self.write_chunk) {
            self.tx
                .send(chunk.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn pipe_pair(write_chunk: usize) -> (PipeEnd, PipeEnd) {
    let (tx_a, rx_b) = mpsc::channel();
    let (tx_b, rx_a) = mpsc::channel();
    (
        PipeEnd {
            rx: rx_a,
            tx: tx_a,
            pending: Vec::new(),
            write_chunk,
        },
        PipeEnd {
            rx: rx_b,
            tx: tx_b,
            pending: Vec::new(),
            write_chunk,
        },
    )
}

/// Test identity: the "certificate" is the raw P-256 public point and the
/// decoder hands it straight back.
struct TestIdentity {
    private_key: Vec<u8>,
    public_point: Vec<u8>,
}

fn new_identity() -> TestIdentity {
    let pair = EcdsaKeyPair::generate(EccCurveId::NistP256).unwrap();
    TestIdentity {
        private_key: pair.private_key_bytes(),
        public_point: pair.public_key_bytes().unwrap(),
    }
}

fn raw_point_decoder() -> CertificateDecoder {
    Arc::new(|der: &[u8]| {
        Ok(PeerPublicKey::Ecdsa {
            curve_id: EccCurveId::NistP256,
            point: der.to_vec(),
        })
    })
}

fn server_config(identity: &TestIdentity) -> TlsConfig {
    TlsConfig::builder()
        .certificate_chain(vec![identity.public_point.clone()])
        .private_key(PrivateKey::Ecdsa {
            curve_id: EccCurveId::NistP256,
            private_key: identity.private_key.clone(),
        })
        .build()
        .unwrap()
}

fn client_config() -> TlsConfig {
    TlsConfig::builder()
        .server_name("loopback.test")
        .certificate_decoder(raw_point_decoder())
        .build()
        .unwrap()
}

/// Server side of one echo exchange: receive a line, answer, then absorb
/// the close. Returns what it read.
fn run_echo_server(
    mut conn: TlsServerConnection<PipeEnd>,
    reply: &'static [u8],
) -> (Vec<u8>, Option<TlsVersion>, Option<CipherSuite>, bool) {
    conn.handshake().unwrap();
    let mut buf = [0u8; 1024];
    let n = conn.read(&mut buf).unwrap();
    conn.write(reply).unwrap();
    let mut tail = [0u8; 16];
    let closed = conn.read(&mut tail).unwrap() == 0;
    (
        buf[..n].to_vec(),
        conn.version(),
        conn.cipher_suite(),
        closed,
    )
}

#[test]
fn test_tls13_loopback() {
    let identity = new_identity();
    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new(server_config(&identity));

    let server = thread::spawn(move || {
        let conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        run_echo_server(conn, b"world")
    });

    let mut conn = TlsClientConnection::new(client_end, Arc::new(client_config())).unwrap();
    conn.handshake().unwrap();
    assert_eq!(conn.version(), Some(TlsVersion::Tls13));
    assert_eq!(
        conn.cipher_suite(),
        Some(CipherSuite::TLS_AES_128_GCM_SHA256)
    );
    assert!(!conn.is_resumed());

    conn.write(b"hello").unwrap();
    let mut buf = [0u8; 16];
    let n = conn.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"world");
    conn.shutdown().unwrap();
    drop(conn);

    let (received, version, suite, closed) = server.join().unwrap();
    assert_eq!(received, b"hello");
    assert_eq!(version, Some(TlsVersion::Tls13));
    assert_eq!(suite, Some(CipherSuite::TLS_AES_128_GCM_SHA256));
    assert!(closed);
}

#[test]
fn test_tls13_loopback_chunked_transport() {
    let identity = new_identity();
    // 100-byte delivery forces records to straddle reads.
    let (client_end, server_end) = pipe_pair(100);
    let server_cfg = Arc::new(server_config(&identity));

    let server = thread::spawn(move || {
        let conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        run_echo_server(conn, b"pong")
    });

    let mut conn = TlsClientConnection::new(client_end, Arc::new(client_config())).unwrap();
    conn.handshake().unwrap();
    conn.write(b"ping").unwrap();
    let mut buf = [0u8; 16];
    let n = conn.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"pong");
    conn.shutdown().unwrap();
    drop(conn);

    let (received, ..) = server.join().unwrap();
    assert_eq!(received, b"ping");
}

#[test]
fn test_tls13_large_writes_fragment() {
    let identity = new_identity();
    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new(server_config(&identity));
    let payload = vec![0x5A_u8; 40_000];
    let expected = payload.clone();

    let server = thread::spawn(move || {
        let mut conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        conn.handshake().unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        while received.len() < 40_000 {
            let n = conn.read(&mut buf).unwrap();
            assert!(n > 0);
            received.extend_from_slice(&buf[..n]);
        }
        conn.write(b"ok").unwrap();
        received
    });

    let mut conn = TlsClientConnection::new(client_end, Arc::new(client_config())).unwrap();
    conn.handshake().unwrap();
    assert_eq!(conn.write(&payload).unwrap(), payload.len());
    let mut buf = [0u8; 16];
    let n = conn.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"ok");
    drop(conn);

    assert_eq!(server.join().unwrap(), expected);
}

#[test]
fn test_tls13_hello_retry() {
    let identity = new_identity();
    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new({
        let mut cfg = server_config(&identity);
        cfg.supported_groups = vec![NamedGroup::SECP256R1];
        cfg
    });

    let server = thread::spawn(move || {
        let conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        run_echo_server(conn, b"retry ok")
    });

    let client_cfg = Arc::new({
        let mut cfg = client_config();
        // The first key share goes out for P-384, which the server
        // declines in favor of P-256.
        cfg.supported_groups = vec![NamedGroup::SECP384R1, NamedGroup::SECP256R1];
        cfg
    });
    let mut conn = TlsClientConnection::new(client_end, client_cfg).unwrap();
    conn.handshake().unwrap();
    assert!(conn.used_hello_retry());
    conn.write(b"after retry").unwrap();
    let mut buf = [0u8; 16];
    let n = conn.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"retry ok");
    conn.shutdown().unwrap();
    drop(conn);

    let (received, ..) = server.join().unwrap();
    assert_eq!(received, b"after retry");
}

fn ticketing_server_config(identity: &TestIdentity, max_early_data: u32) -> TlsConfig {
    TlsConfig::builder()
        .certificate_chain(vec![identity.public_point.clone()])
        .private_key(PrivateKey::Ecdsa {
            curve_id: EccCurveId::NistP256,
            private_key: identity.private_key.clone(),
        })
        .ticket_key([0x42; 32])
        .max_early_data_size(max_early_data)
        .build()
        .unwrap()
}

/// First connection: full handshake, pump one exchange so the session
/// ticket gets processed, and hand the session back.
fn establish_session(
    identity: &TestIdentity,
    max_early_data: u32,
    max_version: TlsVersion,
) -> TlsSession {
    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new(ticketing_server_config(identity, max_early_data));

    let server = thread::spawn(move || {
        let conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        run_echo_server(conn, b"bye")
    });

    let client_cfg = Arc::new({
        let mut cfg = client_config();
        cfg.max_version = max_version;
        cfg
    });
    let mut conn = TlsClientConnection::new(client_end, client_cfg).unwrap();
    conn.handshake().unwrap();
    conn.write(b"hi").unwrap();
    let mut buf = [0u8; 16];
    conn.read(&mut buf).unwrap();
    let session = conn.latest_session().cloned().expect("no session issued");
    conn.shutdown().unwrap();
    drop(conn);
    server.join().unwrap();
    session
}

#[test]
fn test_tls13_session_resumption() {
    let identity = new_identity();
    let session = establish_session(&identity, 0, TlsVersion::Tls13);
    assert_eq!(session.version, TlsVersion::Tls13);

    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new(ticketing_server_config(&identity, 0));
    let server = thread::spawn(move || {
        let mut conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        conn.handshake().unwrap();
        let resumed = conn.is_resumed();
        let mut buf = [0u8; 16];
        let n = conn.read(&mut buf).unwrap();
        (resumed, buf[..n].to_vec())
    });

    let client_cfg = Arc::new({
        let mut cfg = client_config();
        cfg.resumption_session = Some(session);
        cfg
    });
    let mut conn = TlsClientConnection::new(client_end, client_cfg).unwrap();
    conn.handshake().unwrap();
    assert!(conn.is_resumed());
    conn.write(b"resumed").unwrap();
    drop(conn);

    let (server_resumed, received) = server.join().unwrap();
    assert!(server_resumed);
    assert_eq!(received, b"resumed");
}

#[test]
fn test_tls13_early_data() {
    let identity = new_identity();
    let session = establish_session(&identity, 4096, TlsVersion::Tls13);
    assert!(session.max_early_data >= 4096);

    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new(ticketing_server_config(&identity, 4096));
    let server = thread::spawn(move || {
        let mut conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        conn.handshake().unwrap();
        let accepted = conn.early_data_accepted();
        // Early data is first in the stream, regular data follows.
        let mut buf = [0u8; 64];
        let mut received = Vec::new();
        while received.len() < b"zero rtt!more data".len() {
            let n = conn.read(&mut buf).unwrap();
            assert!(n > 0);
            received.extend_from_slice(&buf[..n]);
        }
        (accepted, received)
    });

    let client_cfg = Arc::new({
        let mut cfg = client_config();
        cfg.resumption_session = Some(session);
        cfg
    });
    let mut conn =
        TlsClientConnection::new_with_early_data(client_end, client_cfg, b"zero rtt!".to_vec())
            .unwrap();
    conn.handshake().unwrap();
    assert!(conn.is_resumed());
    conn.write(b"more data").unwrap();
    drop(conn);

    let (accepted, received) = server.join().unwrap();
    assert!(accepted);
    assert_eq!(received, b"zero rtt!more data");
}

#[test]
fn test_tls12_loopback() {
    let identity = new_identity();
    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new(server_config(&identity));

    let server = thread::spawn(move || {
        let conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        run_echo_server(conn, b"old world")
    });

    let client_cfg = Arc::new({
        let mut cfg = client_config();
        cfg.max_version = TlsVersion::Tls12;
        cfg
    });
    let mut conn = TlsClientConnection::new(client_end, client_cfg).unwrap();
    conn.handshake().unwrap();
    assert_eq!(conn.version(), Some(TlsVersion::Tls12));
    assert_eq!(
        conn.cipher_suite(),
        Some(CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256)
    );

    conn.write(b"old hello").unwrap();
    let mut buf = [0u8; 16];
    let n = conn.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"old world");
    conn.shutdown().unwrap();
    drop(conn);

    let (received, version, suite, _) = server.join().unwrap();
    assert_eq!(received, b"old hello");
    assert_eq!(version, Some(TlsVersion::Tls12));
    assert_eq!(
        suite,
        Some(CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256)
    );
}

#[test]
fn test_tls12_cbc_loopback() {
    let identity = new_identity();
    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new({
        let mut cfg = server_config(&identity);
        cfg.cipher_suites = vec![CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256];
        cfg
    });

    let server = thread::spawn(move || {
        let conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        run_echo_server(conn, b"cbc world")
    });

    let client_cfg = Arc::new({
        let mut cfg = client_config();
        cfg.max_version = TlsVersion::Tls12;
        cfg.cipher_suites = vec![CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256];
        cfg
    });
    let mut conn = TlsClientConnection::new(client_end, client_cfg).unwrap();
    conn.handshake().unwrap();
    assert_eq!(
        conn.cipher_suite(),
        Some(CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256)
    );
    conn.write(b"cbc hello").unwrap();
    let mut buf = [0u8; 16];
    let n = conn.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"cbc world");
    conn.shutdown().unwrap();
    drop(conn);

    let (received, ..) = server.join().unwrap();
    assert_eq!(received, b"cbc hello");
}

#[test]
fn test_tls12_ticket_resumption() {
    let identity = new_identity();
    let session = establish_session(&identity, 0, TlsVersion::Tls12);
    assert_eq!(session.version, TlsVersion::Tls12);
    assert!(!session.ticket.is_empty());

    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new(ticketing_server_config(&identity, 0));
    let server = thread::spawn(move || {
        let mut conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        conn.handshake().unwrap();
        let resumed = conn.is_resumed();
        let mut buf = [0u8; 32];
        let n = conn.read(&mut buf).unwrap();
        (resumed, buf[..n].to_vec())
    });

    let client_cfg = Arc::new({
        let mut cfg = client_config();
        cfg.max_version = TlsVersion::Tls12;
        cfg.resumption_session = Some(session);
        cfg
    });
    let mut conn = TlsClientConnection::new(client_end, client_cfg).unwrap();
    conn.handshake().unwrap();
    assert!(conn.is_resumed());
    assert_eq!(conn.version(), Some(TlsVersion::Tls12));
    conn.write(b"abbreviated").unwrap();
    drop(conn);

    let (server_resumed, received) = server.join().unwrap();
    assert!(server_resumed);
    assert_eq!(received, b"abbreviated");
}

#[test]
fn test_version_mismatch_sends_protocol_version_alert() {
    let identity = new_identity();
    let (client_end, server_end) = pipe_pair(1 << 20);
    let server_cfg = Arc::new({
        let mut cfg = server_config(&identity);
        cfg.min_version = TlsVersion::Tls13;
        cfg
    });

    let server = thread::spawn(move || {
        let mut conn = TlsServerConnection::new(server_end, server_cfg).unwrap();
        let err = conn.handshake().unwrap_err();
        (err, conn.state())
    });

    // The client caps at 1.2, so its supported_versions never offers 1.3
    // and the server has nothing left to negotiate.
    let client_cfg = Arc::new({
        let mut cfg = client_config();
        cfg.max_version = TlsVersion::Tls12;
        cfg
    });
    let mut conn = TlsClientConnection::new(client_end, client_cfg).unwrap();
    match conn.handshake().unwrap_err() {
        TlsError::AlertReceived(desc) => assert!(desc.contains("ProtocolVersion")),
        other => panic!("expected a protocol_version alert, got {other:?}"),
    }
    assert_eq!(conn.state(), ConnectionState::Error);
    assert_eq!(conn.version(), None);

    let (server_err, server_state) = server.join().unwrap();
    assert!(matches!(server_err, TlsError::UnsupportedVersion));
    assert_eq!(server_state, ConnectionState::Error);
}

#[test]
fn test_driver_rejects_out_of_order_message() {
    let config = Arc::new(client_config());
    let mut driver = ClientHandshake::new(config).unwrap();
    driver.start(None).unwrap();

    // A Finished before the ServerHello is never legal.
    let mut finished = vec![20, 0, 0, 12];
    finished.extend_from_slice(&[0u8; 12]);
    let err = driver.handle_message(&finished).unwrap_err();
    assert!(matches!(err, TlsError::UnexpectedMessage(_)));
}

#[test]
fn test_handshake_required_before_write() {
    let (client_end, _server_end) = pipe_pair(1 << 20);
    let mut conn = TlsClientConnection::new(client_end, Arc::new(client_config())).unwrap();
    assert!(conn.write(b"too soon").is_err());
    assert_eq!(conn.state(), ConnectionState::Handshaking);
}
