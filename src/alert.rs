use crate::errors::TlsError;

#[derive(Debug, Copy, Clone, PartialEq, Primitive)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

#[derive(Debug, Copy, Clone, PartialEq, Primitive)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    BadRecordMac = 20,
    DecompressionFailure = 30,
    HandshakeFailure = 40,
    NoCertificate = 41,
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
    UserCanceled = 90,
    NoRenegotiation = 100,
}

/// The alert the peer receives when a handshake dies with `err`.
pub fn description_for(err: &TlsError) -> AlertDescription {
    match err {
        TlsError::InvalidLengthError
        | TlsError::InvalidHandshakeTypeError
        | TlsError::InvalidContentTypeError
        | TlsError::DecodeError(_) => AlertDescription::DecodeError,

        TlsError::UnexpectedMessageError(_) => AlertDescription::UnexpectedMessage,

        TlsError::UnsupportedVersionError(_, _) => AlertDescription::ProtocolVersion,
        TlsError::InvalidCompressionMethodError | TlsError::CipherNotOfferedError(_) => AlertDescription::IllegalParameter,
        TlsError::NoCommonCiphersError => AlertDescription::HandshakeFailure,

        TlsError::ExpiredError | TlsError::RootCaExpiredError => AlertDescription::CertificateExpired,
        TlsError::NotYetValidError => AlertDescription::CertificateExpired,
        TlsError::UnrecognizedIssuerError(_) => AlertDescription::UnknownCa,
        TlsError::BrokenChainLinkError(_)
        | TlsError::CertificateChainTooLongError
        | TlsError::UnauthorizedIntermediateCaError(_)
        | TlsError::VerificationFailedError => AlertDescription::BadCertificate,
        TlsError::BadExtensionError
        | TlsError::InappropriateKeyUsageError
        | TlsError::UnsupportedSignatureAlgorithmError => AlertDescription::UnsupportedCertificate,
        TlsError::HostnameMismatchError(_) => AlertDescription::BadCertificate,
        TlsError::CertificateRequiredError => AlertDescription::NoCertificate,

        _ => AlertDescription::HandshakeFailure,
    }
}
