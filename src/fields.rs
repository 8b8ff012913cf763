use crate::errors;

use byteorder::{BigEndian, ByteOrder};
use ring::rand::SecureRandom;
use std::convert::TryFrom;
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Uint8(pub u8);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Uint16(pub u16);

// In network order (Big Endian)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Uint24(pub [u8; 3]);

pub fn uint24_from_be_bytes(bytes: [u8; 3]) -> Uint24 {
    Uint24(bytes)
}

pub fn uint24_to_usize(i: Uint24) -> usize {
    BigEndian::read_u24(&i.0) as usize
}

pub fn uint24_from_usize(i: usize) -> Result<Uint24, errors::TlsError> {
    if i > 0xff_ffff {
        return Err(errors::TlsError::InvalidLengthError);
    }
    let mut buf = [0; 3];
    BigEndian::write_u24(&mut buf, u32::try_from(i)?);
    Ok(Uint24(buf))
}

pub const RANDOM_LENGTH: usize = 32;

/// 32-byte hello nonce: 4 bytes of gmt_unix_time followed by 28 random bytes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Random(pub [u8; RANDOM_LENGTH]);

impl Random {
    pub fn new(rand: &dyn SecureRandom) -> Result<Random, errors::TlsError> {
        let mut bytes = [0; RANDOM_LENGTH];
        rand.fill(&mut bytes).map_err(|_| errors::TlsError::UnspecifiedRingError)?;

        let gmt_unix_time = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;
        let gmt_unix_time = u32::try_from(gmt_unix_time.as_secs()).unwrap_or(u32::max_value());
        BigEndian::write_u32(&mut bytes[..4], gmt_unix_time);
        Ok(Random(bytes))
    }
}
