use crate::fields;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TlsError {
    // Framing: short or over-long fields, unknown wire codes. Always fatal.
    #[error("invalid length")]
    InvalidLengthError,
    #[error("Invalid handshake type.")]
    InvalidHandshakeTypeError,
    #[error("Invalid content type.")]
    InvalidContentTypeError,
    #[error("Invalid compression method.")]
    InvalidCompressionMethodError,
    #[error("unexpected message: {}", _0)]
    UnexpectedMessageError(&'static str),
    #[error("malformed {}", _0)]
    DecodeError(&'static str),

    // Negotiation failures, fatal before any secret material exists.
    #[error("unsupported protocol version {}.{}", _0, _1)]
    UnsupportedVersionError(u8, u8),
    #[error("no common ciphers")]
    NoCommonCiphersError,
    #[error("cipher not offered: {:x?}", _0)]
    CipherNotOfferedError(fields::Uint16),
    #[error("host name does not match peer certificate: {}", _0)]
    HostnameMismatchError(String),
    #[error("peer requires a client certificate")]
    CertificateRequiredError,

    // Trust decisions. Each reason is distinct so callers can tell an
    // expired root from an expired leaf or a broken chain link.
    #[error("certificate expired")]
    ExpiredError,
    #[error("certificate not yet valid")]
    NotYetValidError,
    #[error("root CA expired")]
    RootCaExpiredError,
    #[error("unrecognized issuer: {}", _0)]
    UnrecognizedIssuerError(String),
    #[error("broken chain link at {}", _0)]
    BrokenChainLinkError(String),
    #[error("certificate chain too long")]
    CertificateChainTooLongError,
    #[error("unauthorized intermediate CA: {}", _0)]
    UnauthorizedIntermediateCaError(String),
    #[error("unrecognized critical extension")]
    BadExtensionError,
    #[error("inappropriate key usage")]
    InappropriateKeyUsageError,
    #[error("signature verification failed")]
    VerificationFailedError,
    #[error("unsupported signature algorithm")]
    UnsupportedSignatureAlgorithmError,

    // Cryptographic primitive failures.
    #[error("Unspecified ring error")]
    UnspecifiedRingError,
    #[error("unsupported named curve {:#06x}", _0)]
    UnsupportedCurveError(u16),
    #[error("RSA operation failed: {}", _0)]
    RsaOperationError(&'static str),

    // Transport.
    #[error("peer sent fatal alert {}", _0)]
    PeerAlertError(u8),
    #[error("transport closed")]
    TransportClosedError,

    #[error("{}", _0)]
    StdIoError(#[from] std::io::Error),
    #[error("{}", _0)]
    TryFromIntError(#[from] std::num::TryFromIntError),
    #[error("{}", _0)]
    TryFromSliceError(#[from] std::array::TryFromSliceError),
    #[error("{}", _0)]
    SystemTimeError(#[from] std::time::SystemTimeError),
}
