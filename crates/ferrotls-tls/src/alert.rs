//! TLS alert protocol (RFC 8446 section 6).

use ferrotls_types::TlsError;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

impl AlertLevel {
    pub fn from_u8(v: u8) -> Result<Self, u8> {
        match v {
            1 => Ok(AlertLevel::Warning),
            2 => Ok(AlertLevel::Fatal),
            other => Err(other),
        }
    }
}

/// Alert description codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    BadRecordMac = 20,
    RecordOverflow = 22,
    HandshakeFailure = 40,
    BadCertificate = 42,
    UnsupportedCertificate = 43,
    CertificateRevoked = 44,
    CertificateExpired = 45,
    CertificateUnknown = 46,
    IllegalParameter = 47,
    UnknownCa = 48,
    AccessDenied = 49,
    DecodeError = 50,
    DecryptError = 51,
    ProtocolVersion = 70,
    InsufficientSecurity = 71,
    InternalError = 80,
    InappropriateFallback = 86,
    UserCanceled = 90,
    MissingExtension = 109,
    UnsupportedExtension = 110,
    UnrecognizedName = 112,
    BadCertificateStatusResponse = 113,
    UnknownPskIdentity = 115,
    CertificateRequired = 116,
    NoApplicationProtocol = 120,
}

impl AlertDescription {
    pub fn from_u8(v: u8) -> Result<Self, u8> {
        use AlertDescription::*;
        Ok(match v {
            0 => CloseNotify,
            10 => UnexpectedMessage,
            20 => BadRecordMac,
            22 => RecordOverflow,
            40 => HandshakeFailure,
            42 => BadCertificate,
            43 => UnsupportedCertificate,
            44 => CertificateRevoked,
            45 => CertificateExpired,
            46 => CertificateUnknown,
            47 => IllegalParameter,
            48 => UnknownCa,
            49 => AccessDenied,
            50 => DecodeError,
            51 => DecryptError,
            70 => ProtocolVersion,
            71 => InsufficientSecurity,
            80 => InternalError,
            86 => InappropriateFallback,
            90 => UserCanceled,
            109 => MissingExtension,
            110 => UnsupportedExtension,
            112 => UnrecognizedName,
            113 => BadCertificateStatusResponse,
            115 => UnknownPskIdentity,
            116 => CertificateRequired,
            120 => NoApplicationProtocol,
            other => return Err(other),
        })
    }
}

/// A two-byte alert message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub fn fatal(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Fatal,
            description,
        }
    }

    pub fn close_notify() -> Self {
        Self {
            level: AlertLevel::Warning,
            description: AlertDescription::CloseNotify,
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.level as u8, self.description as u8]
    }

    pub fn parse(data: &[u8]) -> Result<Self, TlsError> {
        if data.len() != 2 {
            return Err(TlsError::DecodeError("alert must be 2 bytes".into()));
        }
        let level = AlertLevel::from_u8(data[0])
            .map_err(|v| TlsError::DecodeError(format!("unknown alert level {v}")))?;
        let description = AlertDescription::from_u8(data[1])
            .map_err(|v| TlsError::DecodeError(format!("unknown alert description {v}")))?;
        Ok(Self { level, description })
    }
}

/// Map an internal error to the alert the peer should see before teardown.
pub fn alert_for_error(err: &TlsError) -> AlertDescription {
    match err {
        TlsError::DecodeError(_) => AlertDescription::DecodeError,
        TlsError::UnexpectedMessage(_) => AlertDescription::UnexpectedMessage,
        TlsError::UnsupportedVersion => AlertDescription::ProtocolVersion,
        TlsError::CertVerifyFailed(_) => AlertDescription::DecryptError,
        TlsError::BadCertificate(_) => AlertDescription::BadCertificate,
        TlsError::RecordError(_) => AlertDescription::BadRecordMac,
        TlsError::NoSharedCipherSuite | TlsError::NoSharedGroup => {
            AlertDescription::HandshakeFailure
        }
        TlsError::HandshakeFailed(_) | TlsError::SessionExpired => {
            AlertDescription::HandshakeFailure
        }
        _ => AlertDescription::InternalError,
    }
}
