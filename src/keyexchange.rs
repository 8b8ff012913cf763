//! Premaster secret agreement for both key exchange families.

use ring::agreement::{self, EphemeralPrivateKey, UnparsedPublicKey};
use ring::rand::SecureRandom;
use zeroize::Zeroizing;

use crate::cipher::KeyExchangeKind;
use crate::errors::TlsError;
use crate::extensions::{CURVE_SECP256R1, CURVE_SECP384R1};
use crate::fields;
use crate::pack::Pack;
use crate::record::ProtocolVersion;
use crate::rsa::RsaPrivateKey;
use crate::x509::PublicKey;

pub const RSA_PREMASTER_LENGTH: usize = 48;

fn curve_algorithm(curve: u16) -> Result<&'static agreement::Algorithm, TlsError> {
    match curve {
        CURVE_SECP256R1 => Ok(&agreement::ECDH_P256),
        CURVE_SECP384R1 => Ok(&agreement::ECDH_P384),
        other => Err(TlsError::UnsupportedCurveError(other)),
    }
}

/// Produce the premaster secret and the ClientKeyExchange body for the
/// negotiated method.
///
/// RSA: 48 bytes, the first two echoing the version the client proposed,
/// encrypted to the server key. TLS wraps the ciphertext in a two-byte
/// length, SSLv3 sends it bare. ECDH: an ephemeral key on the server
/// certificate's curve, the shared point hashed out by ring, the public
/// point sent with a one-byte length.
pub fn client_premaster(
    kind: KeyExchangeKind,
    proposed_version: ProtocolVersion,
    negotiated_version: ProtocolVersion,
    server_key: &PublicKey,
    rand: &dyn SecureRandom,
) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), TlsError> {
    match (kind, server_key) {
        (KeyExchangeKind::Rsa, PublicKey::Rsa(key)) => {
            let mut premaster = Zeroizing::new(vec![0u8; RSA_PREMASTER_LENGTH]);
            rand.fill(&mut premaster[2..])
                .map_err(|_| TlsError::UnspecifiedRingError)?;
            let (major, minor) = proposed_version.tuple();
            premaster[0] = major;
            premaster[1] = minor;

            let ciphertext = key.public_encrypt(&premaster, rand)?;
            let body = if negotiated_version.is_tls() {
                let mut body = fields::Uint16(ciphertext.len() as u16).pack();
                body.extend_from_slice(&ciphertext);
                body
            } else {
                ciphertext
            };
            Ok((premaster, body))
        }
        (KeyExchangeKind::Ecdh, PublicKey::Ec { curve, point }) => {
            let algorithm = curve_algorithm(*curve)?;
            let ephemeral = EphemeralPrivateKey::generate(algorithm, rand)
                .map_err(|_| TlsError::UnspecifiedRingError)?;
            let public = ephemeral
                .compute_public_key()
                .map_err(|_| TlsError::UnspecifiedRingError)?;

            let peer = UnparsedPublicKey::new(algorithm, point);
            let premaster =
                agreement::agree_ephemeral(ephemeral, &peer, (), |shared| {
                    Ok(Zeroizing::new(shared.to_vec()))
                })
                .map_err(|_| TlsError::UnspecifiedRingError)?;

            let mut body = vec![public.as_ref().len() as u8];
            body.extend_from_slice(public.as_ref());
            Ok((premaster, body))
        }
        _ => Err(TlsError::UnexpectedMessageError(
            "key exchange does not match server key",
        )),
    }
}

/// Server side of the RSA exchange: unwrap, decrypt and vet the premaster.
/// The embedded version must be the one the client proposed in its hello,
/// which defeats rollback.
pub fn server_premaster_rsa(
    key: &RsaPrivateKey,
    negotiated_version: ProtocolVersion,
    client_proposed: ProtocolVersion,
    exchange: &[u8],
) -> Result<Zeroizing<Vec<u8>>, TlsError> {
    let ciphertext = if negotiated_version.is_tls() {
        if exchange.len() < 2 {
            return Err(TlsError::InvalidLengthError);
        }
        let length = usize::from(u16::from_be_bytes([exchange[0], exchange[1]]));
        if exchange.len() != 2 + length {
            return Err(TlsError::InvalidLengthError);
        }
        &exchange[2..]
    } else {
        exchange
    };

    let premaster = key.decrypt(ciphertext)?;
    if premaster.len() != RSA_PREMASTER_LENGTH {
        return Err(TlsError::RsaOperationError("bad premaster length"));
    }
    let (major, minor) = client_proposed.tuple();
    if premaster[0] != major || premaster[1] != minor {
        return Err(TlsError::RsaOperationError("premaster version mismatch"));
    }
    Ok(premaster)
}
