use crate::errors;
use crate::fields;
use crate::pack::Pack;

use num_traits::FromPrimitive;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProtocolVersion {
    pub major: fields::Uint8,
    pub minor: fields::Uint8,
}

impl ProtocolVersion {
    pub fn tuple(self) -> (u8, u8) {
        (self.major.0, self.minor.0)
    }

    /// TLS 1.0 and later use the PRF; 3.0 is SSLv3.
    pub fn is_tls(self) -> bool {
        self.tuple() >= (3, 1)
    }
}

impl Pack for ProtocolVersion {
    fn empty() -> Self {
        Self {
            major: fields::Uint8(0),
            minor: fields::Uint8(0),
        }
    }

    fn pack(&self) -> Vec<u8> {
        vec![self.major.0, self.minor.0]
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        match v.len() {
            0..=1 => Err(errors::TlsError::InvalidLengthError),
            _ => {
                let rest: Vec<u8> = v.drain(2..).collect();
                self.major = fields::Uint8(v[0]);
                self.minor = fields::Uint8(v[1]);
                Ok(rest)
            }
        }
    }
}

pub const SSL_3_0: ProtocolVersion = ProtocolVersion {
    major: fields::Uint8(3),
    minor: fields::Uint8(0),
};

pub const TLS_1_0: ProtocolVersion = ProtocolVersion {
    major: fields::Uint8(3),
    minor: fields::Uint8(1),
};

#[derive(Debug, Copy, Clone, Primitive, PartialEq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl Pack for ContentType {
    fn empty() -> Self {
        ContentType::Handshake
    }

    fn pack(&self) -> Vec<u8> {
        vec![*self as u8]
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        match v.len() {
            0 => Err(errors::TlsError::InvalidContentTypeError),
            _ => {
                let rest: Vec<u8> = v.drain(1..).collect();
                *self = Self::from_u8(v[0]).ok_or_else(|| errors::TlsError::InvalidContentTypeError)?;
                Ok(rest)
            }
        }
    }
}

// ChangeCipherSpec is its own record type carrying a single 0x01 byte, not a
// handshake message.
pub const CHANGE_CIPHER_SPEC_BODY: [u8; 1] = [1];
