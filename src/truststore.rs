use std::sync::Mutex;

use crate::x509::Certificate;

/// Source of trust anchors, looked up by the exact flattened subject name.
pub trait TrustStore {
    fn certificates_for_subject(&self, subject: &str) -> Vec<Certificate>;
}

#[derive(Clone)]
pub struct TrustedCertEntry {
    pub nickname: String,
    pub trust_flags: u8,
    pub certificate: Certificate,
}

/// In-memory anchor list behind one mutex. Installs are append-only until a
/// nickname is removed, and several anchors may share a subject.
pub struct TrustAnchors {
    entries: Mutex<Vec<TrustedCertEntry>>,
}

impl TrustAnchors {
    pub fn new() -> TrustAnchors {
        TrustAnchors {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn install(&self, nickname: &str, trust_flags: u8, certificate: Certificate) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(TrustedCertEntry {
            nickname: nickname.to_string(),
            trust_flags,
            certificate,
        });
    }

    pub fn remove(&self, nickname: &str) -> bool {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = entries.len();
        entries.retain(|entry| entry.nickname != nickname);
        entries.len() != before
    }

    pub fn certificate_for_nickname(&self, nickname: &str) -> Option<Certificate> {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .iter()
            .find(|entry| entry.nickname == nickname)
            .map(|entry| entry.certificate.clone())
    }
}

impl TrustStore for TrustAnchors {
    fn certificates_for_subject(&self, subject: &str) -> Vec<Certificate> {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .iter()
            .filter(|entry| entry.certificate.subject == subject)
            .map(|entry| entry.certificate.clone())
            .collect()
    }
}
