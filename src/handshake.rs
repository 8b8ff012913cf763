//! Handshake message framing and the individual message bodies.
//!
//! Every message starts with a one-byte type and a three-byte big-endian
//! body length. Records may carry several messages or split one across
//! records, so reading goes through `MessageStream`, which refills its
//! buffer from the record layer until a whole message is available.

use num_traits::FromPrimitive;

use crate::cipher::CipherSuiteId;
use crate::errors;
use crate::extensions::ExtensionList;
use crate::fields;
use crate::pack::Pack;
use crate::record::{ContentType, ProtocolVersion};
use crate::transport::record_layer::RecordLayer;

pub const HEADER_LENGTH: usize = 4;
pub const SESSION_ID_MAX_LENGTH: usize = 32;

const COMPRESSION_NULL: u8 = 0;

#[derive(Debug, Copy, Clone, Primitive, PartialEq)]
#[repr(u8)]
pub enum HandshakeType {
    HelloRequest = 0,
    ClientHello = 1,
    ServerHello = 2,
    Certificate = 11,
    ServerKeyExchange = 12,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    CertificateVerify = 15,
    ClientKeyExchange = 16,
    Finished = 20,
}

/// Prepend the four-byte handshake header to a message body.
pub fn frame(msg_type: HandshakeType, body: &[u8]) -> Result<Vec<u8>, errors::TlsError> {
    let mut message = Vec::with_capacity(HEADER_LENGTH + body.len());
    message.push(msg_type as u8);
    message.extend_from_slice(&fields::uint24_from_usize(body.len())?.pack());
    message.extend_from_slice(body);
    Ok(message)
}

/// A received handshake message, header included, so the whole thing can be
/// folded into the transcript as-is.
pub struct RawMessage {
    pub msg_type: HandshakeType,
    pub bytes: Vec<u8>,
}

impl RawMessage {
    pub fn body(&self) -> &[u8] {
        &self.bytes[HEADER_LENGTH..]
    }
}

/// Reassembles handshake messages from handshake records.
pub struct MessageStream {
    buffer: Vec<u8>,
}

impl MessageStream {
    pub fn new() -> MessageStream {
        MessageStream { buffer: Vec::new() }
    }

    pub fn next(&mut self, transport: &mut dyn RecordLayer) -> Result<RawMessage, errors::TlsError> {
        loop {
            if self.buffer.len() >= HEADER_LENGTH {
                let body_length = fields::uint24_to_usize(fields::uint24_from_be_bytes([
                    self.buffer[1],
                    self.buffer[2],
                    self.buffer[3],
                ]));
                let total = HEADER_LENGTH + body_length;
                if self.buffer.len() >= total {
                    let msg_type = HandshakeType::from_u8(self.buffer[0])
                        .ok_or(errors::TlsError::InvalidHandshakeTypeError)?;
                    let rest = self.buffer.split_off(total);
                    let bytes = std::mem::replace(&mut self.buffer, rest);
                    return Ok(RawMessage { msg_type, bytes });
                }
            }
            let record = transport.read_record(ContentType::Handshake)?;
            if record.is_empty() {
                return Err(errors::TlsError::TransportClosedError);
            }
            self.buffer.extend_from_slice(&record);
        }
    }
}

/// Variable-length session id with a one-byte length prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionId(pub Vec<u8>);

impl Pack for SessionId {
    fn empty() -> Self {
        SessionId(Vec::new())
    }

    fn pack(&self) -> Vec<u8> {
        let mut bytes = vec![self.0.len() as u8];
        bytes.extend_from_slice(&self.0);
        bytes
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        let mut length = fields::Uint8::empty();
        let mut rest = length.unpack(v)?;
        let length = usize::from(length.0);
        if length > SESSION_ID_MAX_LENGTH || rest.len() < length {
            return Err(errors::TlsError::InvalidLengthError);
        }
        self.0 = rest.drain(..length).collect();
        Ok(rest)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientHello {
    pub version: ProtocolVersion,
    pub random: fields::Random,
    pub session_id: SessionId,
    pub cipher_suites: Vec<CipherSuiteId>,
    pub compression_methods: Vec<u8>,
    pub extensions: Option<ExtensionList>,
}

impl Pack for ClientHello {
    fn empty() -> Self {
        ClientHello {
            version: ProtocolVersion::empty(),
            random: fields::Random::empty(),
            session_id: SessionId::empty(),
            cipher_suites: Vec::new(),
            compression_methods: vec![COMPRESSION_NULL],
            extensions: None,
        }
    }

    fn pack(&self) -> Vec<u8> {
        let mut bytes = self.version.pack();
        bytes.extend_from_slice(&self.random.pack());
        bytes.extend_from_slice(&self.session_id.pack());
        bytes.extend_from_slice(&fields::Uint16(self.cipher_suites.len() as u16 * 2).pack());
        for suite in &self.cipher_suites {
            bytes.extend_from_slice(&suite.pack());
        }
        bytes.push(self.compression_methods.len() as u8);
        bytes.extend_from_slice(&self.compression_methods);
        if let Some(extensions) = &self.extensions {
            bytes.extend_from_slice(&extensions.pack());
        }
        bytes
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        let mut rest = self.version.unpack(v)?;
        let mut rest = self.random.unpack(&mut rest)?;
        let mut rest = self.session_id.unpack(&mut rest)?;

        let mut suites_length = fields::Uint16::empty();
        let mut rest = suites_length.unpack(&mut rest)?;
        let suites_length = usize::from(suites_length.0);
        if suites_length % 2 != 0 || rest.len() < suites_length {
            return Err(errors::TlsError::InvalidLengthError);
        }
        self.cipher_suites.clear();
        let mut suite_bytes: Vec<u8> = rest.drain(..suites_length).collect();
        while !suite_bytes.is_empty() {
            let mut suite = fields::Uint16::empty();
            suite_bytes = suite.unpack(&mut suite_bytes)?;
            self.cipher_suites.push(suite);
        }

        let mut compression_count = fields::Uint8::empty();
        let mut rest = compression_count.unpack(&mut rest)?;
        let compression_count = usize::from(compression_count.0);
        if compression_count == 0 || rest.len() < compression_count {
            return Err(errors::TlsError::InvalidLengthError);
        }
        self.compression_methods = rest.drain(..compression_count).collect();

        if rest.is_empty() {
            self.extensions = None;
            Ok(rest)
        } else {
            let mut extensions = ExtensionList::empty();
            let rest = extensions.unpack(&mut rest)?;
            self.extensions = Some(extensions);
            Ok(rest)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerHello {
    pub version: ProtocolVersion,
    pub random: fields::Random,
    pub session_id: SessionId,
    pub cipher_suite: CipherSuiteId,
    pub compression_method: u8,
}

impl Pack for ServerHello {
    fn empty() -> Self {
        ServerHello {
            version: ProtocolVersion::empty(),
            random: fields::Random::empty(),
            session_id: SessionId::empty(),
            cipher_suite: fields::Uint16(0),
            compression_method: COMPRESSION_NULL,
        }
    }

    fn pack(&self) -> Vec<u8> {
        let mut bytes = self.version.pack();
        bytes.extend_from_slice(&self.random.pack());
        bytes.extend_from_slice(&self.session_id.pack());
        bytes.extend_from_slice(&self.cipher_suite.pack());
        bytes.push(self.compression_method);
        bytes
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        let mut rest = self.version.unpack(v)?;
        let mut rest = self.random.unpack(&mut rest)?;
        let mut rest = self.session_id.unpack(&mut rest)?;
        let mut rest = self.cipher_suite.unpack(&mut rest)?;
        let mut compression = fields::Uint8::empty();
        let rest = compression.unpack(&mut rest)?;
        self.compression_method = compression.0;
        // Any trailing extensions block is tolerated and ignored.
        Ok(rest)
    }
}

/// The Certificate message: a three-byte total length around a list of
/// three-byte-length-prefixed DER certificates, leaf first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CertificateChainMsg {
    pub ders: Vec<Vec<u8>>,
}

impl Pack for CertificateChainMsg {
    fn empty() -> Self {
        CertificateChainMsg { ders: Vec::new() }
    }

    fn pack(&self) -> Vec<u8> {
        let mut list = Vec::new();
        for der in &self.ders {
            if let Ok(length) = fields::uint24_from_usize(der.len()) {
                list.extend_from_slice(&length.pack());
                list.extend_from_slice(der);
            }
        }
        let mut bytes = match fields::uint24_from_usize(list.len()) {
            Ok(length) => length.pack(),
            Err(_) => return Vec::new(),
        };
        bytes.append(&mut list);
        bytes
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        let mut total = fields::Uint24::empty();
        let mut rest = total.unpack(v)?;
        let total = fields::uint24_to_usize(total);
        if rest.len() < total {
            return Err(errors::TlsError::InvalidLengthError);
        }
        let leftover: Vec<u8> = rest.drain(total..).collect();
        self.ders.clear();
        while !rest.is_empty() {
            let mut length = fields::Uint24::empty();
            rest = length.unpack(&mut rest)?;
            let length = fields::uint24_to_usize(length);
            if rest.len() < length {
                return Err(errors::TlsError::InvalidLengthError);
            }
            self.ders.push(rest.drain(..length).collect());
        }
        Ok(leftover)
    }
}

/// Client key exchange carries a key-exchange-specific blob whose framing
/// differs per method and version, so it stays opaque here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientKeyExchange {
    pub exchange: Vec<u8>,
}

impl Pack for ClientKeyExchange {
    fn empty() -> Self {
        ClientKeyExchange {
            exchange: Vec::new(),
        }
    }

    fn pack(&self) -> Vec<u8> {
        self.exchange.clone()
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        self.exchange = v.drain(..).collect();
        Ok(Vec::new())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Finished {
    pub verify_data: Vec<u8>,
}

impl Pack for Finished {
    fn empty() -> Self {
        Finished {
            verify_data: Vec::new(),
        }
    }

    fn pack(&self) -> Vec<u8> {
        self.verify_data.clone()
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        self.verify_data = v.drain(..).collect();
        Ok(Vec::new())
    }
}

/// What a completed handshake agreed on.
#[derive(Clone, Debug)]
pub struct NegotiatedParameters {
    pub version: ProtocolVersion,
    pub cipher_suite: CipherSuiteId,
    pub session_id: Vec<u8>,
    pub resumed: bool,
    pub peer_subject: Option<String>,
}
