/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    // General errors
    #[error("null or empty input")]
    NullInput,
    #[error("invalid argument")]
    InvalidArg,
    #[error("operation not supported")]
    NotSupported,
    #[error("invalid key")]
    InvalidKey,

    // Buffer errors
    #[error("buffer length not enough: need {need}, got {got}")]
    BufferTooSmall { need: usize, got: usize },
    #[error("input data too long")]
    InputOverflow,

    // BigNum errors
    #[error("big number: division by zero")]
    BnDivisionByZero,
    #[error("big number: no modular inverse")]
    BnNoInverse,
    #[error("big number: malformed number string")]
    BnParseFail,
    #[error("big number: random generation failed")]
    BnRandGenFail,
    #[error("big number: prime generation failed")]
    BnPrimeGenFail,

    // RSA errors
    #[error("rsa: invalid key bits")]
    RsaInvalidKeyBits,
    #[error("rsa: verification failed")]
    RsaVerifyFail,
    #[error("rsa: invalid padding")]
    RsaInvalidPadding,

    // ECC errors
    #[error("ecc: point at infinity")]
    EccPointAtInfinity,
    #[error("ecc: point not on curve")]
    EccPointNotOnCurve,
    #[error("ecc: invalid private key")]
    EccInvalidPrivateKey,
    #[error("ecc: invalid public key")]
    EccInvalidPublicKey,
    #[error("ecc: unknown curve")]
    EccUnknownCurve,
    #[error("ecc: invalid curve parameters")]
    EccInvalidCurveParams,

    // ECDSA errors
    #[error("ecdsa: verification failed")]
    EcdsaVerifyFail,

    // DH errors
    #[error("dh: invalid peer public value")]
    DhInvalidPublic,

    // Symmetric cipher errors
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("invalid iv length")]
    InvalidIvLength,
    #[error("aead: tag verification failed")]
    AeadTagVerifyFail,
    #[error("invalid padding")]
    InvalidPadding,

    // Encoding errors
    #[error("decode: asn1 buffer failed")]
    DecodeAsn1Fail,
}

/// TLS protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
    #[error("alert received: {0}")]
    AlertReceived(String),
    #[error("record layer error: {0}")]
    RecordError(String),
    #[error("malformed message: {0}")]
    DecodeError(String),
    #[error("unexpected message in state {0}")]
    UnexpectedMessage(String),
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("no shared cipher suite")]
    NoSharedCipherSuite,
    #[error("no shared named group")]
    NoSharedGroup,
    #[error("certificate verification failed: {0}")]
    CertVerifyFailed(String),
    #[error("bad certificate: {0}")]
    BadCertificate(String),
    #[error("session expired")]
    SessionExpired,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}
