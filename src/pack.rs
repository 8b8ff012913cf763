use crate::errors;
use crate::fields;

use byteorder::{BigEndian, ByteOrder};

pub trait Pack {
    fn empty() -> Self;
    fn len(&self) -> usize {
        self.pack().len()
    }
    fn pack(&self) -> Vec<u8>;
    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError>;
}

impl Pack for fields::Uint8 {
    fn empty() -> Self {
        fields::Uint8(0)
    }

    fn pack(&self) -> Vec<u8> {
        vec![self.0]
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        match v.len() {
            0 => Err(errors::TlsError::InvalidLengthError),
            _ => {
                let rest: Vec<u8> = v.drain(1..).collect();
                self.0 = v[0];
                Ok(rest)
            }
        }
    }
}

impl Pack for fields::Uint16 {
    fn empty() -> Self {
        fields::Uint16(0)
    }

    fn pack(&self) -> Vec<u8> {
        let mut bytes = [0; 2];
        BigEndian::write_u16(&mut bytes, self.0);
        bytes.to_vec()
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        match v.len() {
            0..=1 => Err(errors::TlsError::InvalidLengthError),
            _ => {
                let rest: Vec<u8> = v.drain(2..).collect();
                self.0 = u16::from_be_bytes([v[0], v[1]]);
                Ok(rest)
            }
        }
    }
}

impl Pack for fields::Uint24 {
    fn empty() -> Self {
        fields::Uint24([0; 3])
    }

    fn pack(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        match v.len() {
            0..=2 => Err(errors::TlsError::InvalidLengthError),
            _ => {
                let rest: Vec<u8> = v.drain(3..).collect();
                self.0 = [v[0], v[1], v[2]];
                Ok(rest)
            }
        }
    }
}

impl Pack for fields::Random {
    fn empty() -> Self {
        fields::Random([0; fields::RANDOM_LENGTH])
    }

    fn pack(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        match v.len() {
            0..=31 => Err(errors::TlsError::InvalidLengthError),
            _ => {
                let rest: Vec<u8> = v.drain(fields::RANDOM_LENGTH..).collect();
                let mut random = [0; fields::RANDOM_LENGTH];
                random.copy_from_slice(&v[..fields::RANDOM_LENGTH]);
                self.0 = random;
                Ok(rest)
            }
        }
    }
}
