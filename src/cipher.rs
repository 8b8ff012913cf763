use crate::errors;
use crate::fields;
use crate::x509;

pub type CipherSuiteId = fields::Uint16;

pub const TLS_RSA_WITH_RC4_128_MD5: CipherSuiteId = fields::Uint16(0x0004);
pub const TLS_RSA_WITH_RC4_128_SHA: CipherSuiteId = fields::Uint16(0x0005);
pub const TLS_ECDH_ECDSA_WITH_RC4_128_SHA: CipherSuiteId = fields::Uint16(0xc002);

/// Server-side scan order. First offered-and-enabled suite wins.
pub const SERVER_PREFERENCE: [CipherSuiteId; 3] = [
    TLS_ECDH_ECDSA_WITH_RC4_128_SHA,
    TLS_RSA_WITH_RC4_128_SHA,
    TLS_RSA_WITH_RC4_128_MD5,
];

pub fn client_offer() -> Vec<CipherSuiteId> {
    vec![
        TLS_ECDH_ECDSA_WITH_RC4_128_SHA,
        TLS_RSA_WITH_RC4_128_SHA,
        TLS_RSA_WITH_RC4_128_MD5,
    ]
}

/// Which family of key exchange a suite performs. Every per-suite decision in
/// the engine matches on this, so a new family extends one enum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyExchangeKind {
    Rsa,
    Ecdh,
}

impl KeyExchangeKind {
    /// keyUsage bits the peer's leaf certificate must carry (when the
    /// certificate declares keyUsage at all).
    pub fn required_key_usage(self) -> i32 {
        match self {
            KeyExchangeKind::Rsa => x509::KU_KEY_ENCIPHERMENT,
            KeyExchangeKind::Ecdh => x509::KU_KEY_AGREEMENT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MacAlgorithm {
    Md5,
    Sha1,
}

impl MacAlgorithm {
    pub fn mac_length(self) -> usize {
        match self {
            MacAlgorithm::Md5 => 16,
            MacAlgorithm::Sha1 => 20,
        }
    }
}

#[derive(Clone, Copy)]
pub struct SuiteParameters {
    pub key_exchange: KeyExchangeKind,
    pub mac_algorithm: MacAlgorithm,
    pub enc_key_length: usize,
    pub mac_key_length: usize,
}

impl SuiteParameters {
    /// Bytes of key material the record layer consumes: two MAC keys and two
    /// RC4 keys. No IVs for a stream cipher.
    pub fn key_block_length(&self) -> usize {
        2 * self.mac_key_length + 2 * self.enc_key_length
    }
}

pub fn parameters(suite: CipherSuiteId) -> Result<SuiteParameters, errors::TlsError> {
    match suite {
        TLS_RSA_WITH_RC4_128_MD5 => Ok(SuiteParameters {
            key_exchange: KeyExchangeKind::Rsa,
            mac_algorithm: MacAlgorithm::Md5,
            enc_key_length: 16,
            mac_key_length: 16,
        }),
        TLS_RSA_WITH_RC4_128_SHA => Ok(SuiteParameters {
            key_exchange: KeyExchangeKind::Rsa,
            mac_algorithm: MacAlgorithm::Sha1,
            enc_key_length: 16,
            mac_key_length: 20,
        }),
        TLS_ECDH_ECDSA_WITH_RC4_128_SHA => Ok(SuiteParameters {
            key_exchange: KeyExchangeKind::Ecdh,
            mac_algorithm: MacAlgorithm::Sha1,
            enc_key_length: 16,
            mac_key_length: 20,
        }),
        _ => Err(errors::TlsError::CipherNotOfferedError(suite)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_block_length_counts_macs_and_keys() {
        let p = parameters(TLS_RSA_WITH_RC4_128_SHA).expect("suite parameters");
        assert_eq!(p.key_block_length(), 2 * 20 + 2 * 16);
        let p = parameters(TLS_RSA_WITH_RC4_128_MD5).expect("suite parameters");
        assert_eq!(p.key_block_length(), 2 * 16 + 2 * 16);
    }

    #[test]
    fn unknown_suite_is_an_error() {
        assert!(parameters(fields::Uint16(0x1234)).is_err());
    }
}
