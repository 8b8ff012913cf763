//! In-memory record transport, one endpoint per side of an mpsc channel
//! pair. Records travel whole and in order, so this exercises the engine's
//! message logic without sockets or record protection.

use std::sync::mpsc::{channel, Receiver, Sender};

use num_traits::FromPrimitive;
use zeroize::Zeroizing;

use crate::alert::{AlertDescription, AlertLevel};
use crate::cipher::{self, CipherSuiteId};
use crate::crypto::{self, ConnectionEnd, MasterSecret};
use crate::errors::TlsError;
use crate::fields::Random;
use crate::record::{ContentType, ProtocolVersion};
use crate::transport::record_layer::RecordLayer;

struct Frame {
    content_type: ContentType,
    body: Vec<u8>,
}

/// Keying material as installed by `init_keys`, kept around so tests can
/// compare both endpoints' derivations.
pub struct InstalledKeys {
    pub master_secret: Zeroizing<MasterSecret>,
    pub key_block: Zeroizing<Vec<u8>>,
}

pub struct LoopbackEndpoint {
    version: ProtocolVersion,
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
    keys: Option<InstalledKeys>,
}

/// Two connected endpoints speaking the given record version.
pub fn pair(version: ProtocolVersion) -> (LoopbackEndpoint, LoopbackEndpoint) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();
    (
        LoopbackEndpoint {
            version,
            tx: a_tx,
            rx: a_rx,
            keys: None,
        },
        LoopbackEndpoint {
            version,
            tx: b_tx,
            rx: b_rx,
            keys: None,
        },
    )
}

impl LoopbackEndpoint {
    pub fn installed_keys(&self) -> Option<&InstalledKeys> {
        self.keys.as_ref()
    }
}

impl RecordLayer for LoopbackEndpoint {
    /// Blocks for the next record of the expected type. Warning alerts are
    /// skipped, a fatal alert or close becomes an error.
    fn read_record(&mut self, expected: ContentType) -> Result<Vec<u8>, TlsError> {
        loop {
            let frame = self.rx.recv().map_err(|_| TlsError::TransportClosedError)?;
            if frame.content_type == ContentType::Alert {
                if frame.body.len() != 2 {
                    return Err(TlsError::InvalidLengthError);
                }
                match AlertLevel::from_u8(frame.body[0]) {
                    Some(AlertLevel::Warning) => continue,
                    _ => return Err(TlsError::PeerAlertError(frame.body[1])),
                }
            }
            if frame.content_type != expected {
                return Err(TlsError::UnexpectedMessageError("wrong record type"));
            }
            return Ok(frame.body);
        }
    }

    fn write_record(&mut self, content_type: ContentType, body: &[u8]) -> Result<(), TlsError> {
        self.tx
            .send(Frame {
                content_type,
                body: body.to_vec(),
            })
            .map_err(|_| TlsError::TransportClosedError)
    }

    fn send_alert(
        &mut self,
        level: AlertLevel,
        description: AlertDescription,
    ) -> Result<(), TlsError> {
        self.write_record(ContentType::Alert, &[level as u8, description as u8])
    }

    fn init_keys(
        &mut self,
        _end: ConnectionEnd,
        suite: CipherSuiteId,
        client_random: &Random,
        server_random: &Random,
        master_secret: &MasterSecret,
    ) -> Result<(), TlsError> {
        let parameters = cipher::parameters(suite)?;
        let key_block = crypto::key_block(
            self.version,
            master_secret,
            &server_random.0,
            &client_random.0,
            parameters.key_block_length(),
        );
        let mut master = Zeroizing::new([0u8; crypto::MASTER_SECRET_LENGTH]);
        master.copy_from_slice(master_secret);
        self.keys = Some(InstalledKeys {
            master_secret: master,
            key_block,
        });
        Ok(())
    }
}
