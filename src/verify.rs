//! Certificate chain verification against a trust store.
//!
//! Chains arrive leaf-first. Each link is either anchored by a trust store
//! certificate whose subject matches the issuer, or signed by the next
//! certificate in the chain, which must be a CA with certSign authority and
//! an unexhausted path length.

use md5::{Digest, Md5};
use sha1::Sha1;

use crate::errors::TlsError;
use crate::rsa::RsaPublicKey;
use crate::truststore::TrustStore;
use crate::x509::{self, Certificate, PublicKey, SignatureAlgorithm};

/// The subjects that authenticated the leaf, most trusted first: the anchor,
/// then each intermediate, then the leaf itself.
#[derive(Debug)]
pub struct AuthPath {
    pub subjects: Vec<String>,
}

pub fn verify_chain(
    chain: &[Certificate],
    now: u64,
    required_key_usage: Option<i32>,
    required_ext_key_usage: Option<i32>,
    trust_store: &dyn TrustStore,
) -> Result<AuthPath, TlsError> {
    if chain.is_empty() {
        return Err(TlsError::CertificateRequiredError);
    }

    for cert in chain {
        if cert.bad_extension {
            return Err(TlsError::BadExtensionError);
        }
        cert.check_validity(now)?;
    }

    let leaf = &chain[0];
    if let Some(required) = required_key_usage {
        if leaf.key_usage != -1 && leaf.key_usage & required != required {
            return Err(TlsError::InappropriateKeyUsageError);
        }
    }
    if let Some(required) = required_ext_key_usage {
        if leaf.ext_key_usage != -1 && leaf.ext_key_usage & required != required {
            return Err(TlsError::InappropriateKeyUsageError);
        }
    }

    for (i, cert) in chain.iter().enumerate() {
        let anchors = trust_store.certificates_for_subject(&cert.issuer);
        if !anchors.is_empty() {
            for anchor in &anchors {
                if verify_signature(cert, &anchor.public_key).is_ok() {
                    if anchor.check_validity(now).is_err() {
                        return Err(TlsError::RootCaExpiredError);
                    }
                    let mut subjects = vec![anchor.subject.clone()];
                    subjects.extend(chain[..=i].iter().rev().map(|c| c.subject.clone()));
                    return Ok(AuthPath { subjects });
                }
            }
            return Err(TlsError::VerificationFailedError);
        }

        // Not anchored, so the next chain certificate must vouch for it.
        let issuer = match chain.get(i + 1) {
            Some(issuer) => issuer,
            None => return Err(TlsError::UnrecognizedIssuerError(cert.issuer.clone())),
        };
        if issuer.subject != cert.issuer {
            return Err(TlsError::BrokenChainLinkError(cert.issuer.clone()));
        }
        if issuer.has_basic_constraints && !issuer.is_ca {
            return Err(TlsError::UnauthorizedIntermediateCaError(
                issuer.subject.clone(),
            ));
        }
        if issuer.key_usage != -1 && issuer.key_usage & x509::KU_KEY_CERT_SIGN == 0 {
            return Err(TlsError::UnauthorizedIntermediateCaError(
                issuer.subject.clone(),
            ));
        }
        // chain[i+1] signs chain[i]; i CAs already sit below it.
        if let Some(path_len) = issuer.path_len_constraint {
            if (path_len as usize) < i {
                return Err(TlsError::CertificateChainTooLongError);
            }
        }
        verify_signature(cert, &issuer.public_key)?;
    }

    Err(TlsError::UnrecognizedIssuerError(
        chain[chain.len() - 1].issuer.clone(),
    ))
}

/// Check a certificate's signature with the issuer's public key.
pub fn verify_signature(cert: &Certificate, issuer_key: &PublicKey) -> Result<(), TlsError> {
    let key = match issuer_key {
        PublicKey::Rsa(key) => key,
        PublicKey::Ec { .. } => return Err(TlsError::UnsupportedSignatureAlgorithmError),
    };
    match cert.signature_algorithm {
        SignatureAlgorithm::Md2WithRsa => Err(TlsError::UnsupportedSignatureAlgorithmError),
        SignatureAlgorithm::Md5WithRsa => {
            verify_rsa(key, &cert.signature, &Md5::digest(&cert.tbs_bytes))
        }
        SignatureAlgorithm::Sha1WithRsa => {
            verify_rsa(key, &cert.signature, &Sha1::digest(&cert.tbs_bytes))
        }
    }
}

fn verify_rsa(key: &RsaPublicKey, signature: &[u8], digest: &[u8]) -> Result<(), TlsError> {
    key.verify_pkcs1(signature, digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truststore::TrustAnchors;
    use crate::x509::tests::gateway_cert_der;

    fn store_with_gateway() -> TrustAnchors {
        let store = TrustAnchors::new();
        let cert = Certificate::from_der(&gateway_cert_der()).unwrap();
        store.install("gateway-root", 0, cert);
        store
    }

    #[test]
    fn self_signed_anchor_verifies() {
        let cert = Certificate::from_der(&gateway_cert_der()).unwrap();
        let store = store_with_gateway();
        let path = verify_chain(
            &[cert.clone()],
            cert.not_before + 1,
            Some(x509::KU_KEY_ENCIPHERMENT),
            Some(x509::EKU_SERVER_AUTH),
            &store,
        )
        .unwrap();
        assert_eq!(path.subjects.len(), 2);
        assert_eq!(path.subjects[0], cert.subject);
        assert_eq!(path.subjects[1], cert.subject);
    }

    #[test]
    fn empty_chain_requires_certificate() {
        let store = store_with_gateway();
        assert!(matches!(
            verify_chain(&[], 0, None, None, &store),
            Err(TlsError::CertificateRequiredError)
        ));
    }

    #[test]
    fn unknown_issuer_is_named() {
        let cert = Certificate::from_der(&gateway_cert_der()).unwrap();
        let store = TrustAnchors::new();
        match verify_chain(&[cert.clone()], cert.not_before + 1, None, None, &store) {
            Err(TlsError::UnrecognizedIssuerError(issuer)) => assert_eq!(issuer, cert.issuer),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn tampered_signature_fails() {
        let mut cert = Certificate::from_der(&gateway_cert_der()).unwrap();
        cert.signature[5] ^= 0x40;
        let store = store_with_gateway();
        assert!(matches!(
            verify_chain(&[cert.clone()], cert.not_before + 1, None, None, &store),
            Err(TlsError::VerificationFailedError)
        ));
    }

    #[test]
    fn missing_leaf_key_usage_bit_is_rejected() {
        let cert = Certificate::from_der(&gateway_cert_der()).unwrap();
        let store = store_with_gateway();
        assert!(matches!(
            verify_chain(
                &[cert.clone()],
                cert.not_before + 1,
                Some(x509::KU_KEY_AGREEMENT),
                None,
                &store,
            ),
            Err(TlsError::InappropriateKeyUsageError)
        ));
    }

    #[test]
    fn expired_leaf_is_rejected() {
        let cert = Certificate::from_der(&gateway_cert_der()).unwrap();
        let store = store_with_gateway();
        assert!(matches!(
            verify_chain(&[cert.clone()], cert.not_after + 1, None, None, &store),
            Err(TlsError::ExpiredError)
        ));
    }
}
