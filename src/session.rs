use std::sync::Mutex;

use zeroize::Zeroizing;

use crate::crypto::{MasterSecret, MASTER_SECRET_LENGTH};
use crate::x509::Certificate;

pub const CACHE_CAPACITY: usize = 4;

/// One resumable session. Clients key entries by (host, port), servers by
/// session id with an empty host.
#[derive(Clone)]
pub struct Session {
    pub host: String,
    pub port: u16,
    pub id: Vec<u8>,
    pub master_secret: Zeroizing<MasterSecret>,
    pub peer_certificate: Option<Certificate>,
}

impl Session {
    pub fn new(
        host: &str,
        port: u16,
        id: Vec<u8>,
        master_secret: &MasterSecret,
        peer_certificate: Option<Certificate>,
    ) -> Session {
        let mut secret = Zeroizing::new([0u8; MASTER_SECRET_LENGTH]);
        secret.copy_from_slice(master_secret);
        Session {
            host: host.to_string(),
            port,
            id,
            master_secret: secret,
            peer_certificate,
        }
    }
}

struct CacheInner {
    slots: [Option<Session>; CACHE_CAPACITY],
    evict_cursor: usize,
}

/// Fixed-slot session cache. A new entry overwrites a same-peer slot first,
/// then takes a free slot, then evicts in round-robin order.
pub struct SessionCache {
    inner: Mutex<CacheInner>,
}

impl SessionCache {
    pub fn new() -> SessionCache {
        SessionCache {
            inner: Mutex::new(CacheInner {
                slots: [None, None, None, None],
                evict_cursor: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<CacheInner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get_by_peer(&self, host: &str, port: u16) -> Option<Session> {
        let inner = self.lock();
        inner
            .slots
            .iter()
            .flatten()
            .find(|s| s.host == host && s.port == port)
            .cloned()
    }

    pub fn get_by_id(&self, id: &[u8]) -> Option<Session> {
        let inner = self.lock();
        inner.slots.iter().flatten().find(|s| s.id == id).cloned()
    }

    pub fn add(&self, session: Session) {
        let mut inner = self.lock();
        // Client entries are unique per (host, port); server entries carry
        // an empty host and are keyed by session id alone.
        if let Some(slot) = inner.slots.iter_mut().flatten().find(|s| {
            if session.host.is_empty() {
                s.host.is_empty() && s.id == session.id
            } else {
                s.host == session.host && s.port == session.port
            }
        }) {
            *slot = session;
            return;
        }
        if let Some(slot) = inner.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(session);
            return;
        }
        let cursor = inner.evict_cursor;
        inner.slots[cursor] = Some(session);
        inner.evict_cursor = (cursor + 1) % CACHE_CAPACITY;
    }

    /// Drop the entry matching peer and id, if any. Used after a fatal
    /// handshake failure so a bad session is never resumed.
    pub fn delete(&self, host: &str, port: u16, id: &[u8]) {
        let mut inner = self.lock();
        for slot in inner.slots.iter_mut() {
            let matches = slot
                .as_ref()
                .map(|s| s.host == host && s.port == port && (id.is_empty() || s.id == id))
                .unwrap_or(false);
            if matches {
                *slot = None;
            }
        }
    }
}
