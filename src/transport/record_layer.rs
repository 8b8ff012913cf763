use crate::alert::{AlertDescription, AlertLevel};
use crate::cipher::CipherSuiteId;
use crate::crypto::{ConnectionEnd, MasterSecret};
use crate::errors::TlsError;
use crate::fields::Random;
use crate::record::ContentType;

/// Seam between the handshake engine and whatever moves records. The engine
/// asks for records of a particular type; how alerts interleave and when the
/// pending cipher state activates is the transport's business.
pub trait RecordLayer {
    /// The body of the next record of the expected type.
    fn read_record(&mut self, expected: ContentType) -> Result<Vec<u8>, TlsError>;

    fn write_record(&mut self, content_type: ContentType, body: &[u8]) -> Result<(), TlsError>;

    fn send_alert(&mut self, level: AlertLevel, description: AlertDescription)
        -> Result<(), TlsError>;

    /// Install keying material for the connection once the master secret is
    /// known. Called before either side's ChangeCipherSpec goes out.
    fn init_keys(
        &mut self,
        end: ConnectionEnd,
        suite: CipherSuiteId,
        client_random: &Random,
        server_random: &Random,
        master_secret: &MasterSecret,
    ) -> Result<(), TlsError>;
}
