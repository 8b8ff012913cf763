//! Hello extensions. Only the elliptic-curve pair is understood; anything
//! else is carried opaquely and ignored.

use crate::errors;
use crate::fields;
use crate::pack::Pack;

pub const EXT_SUPPORTED_CURVES: u16 = 10;
pub const EXT_EC_POINT_FORMATS: u16 = 11;

pub const CURVE_SECP256R1: u16 = 23;
pub const CURVE_SECP384R1: u16 = 24;

const POINT_FORMAT_UNCOMPRESSED: u8 = 0;

#[derive(Clone, Debug, PartialEq)]
pub struct Extension {
    pub ext_type: fields::Uint16,
    pub data: Vec<u8>,
}

impl Pack for Extension {
    fn empty() -> Self {
        Extension {
            ext_type: fields::Uint16(0),
            data: Vec::new(),
        }
    }

    fn pack(&self) -> Vec<u8> {
        let mut bytes = self.ext_type.pack();
        bytes.extend_from_slice(&fields::Uint16(self.data.len() as u16).pack());
        bytes.extend_from_slice(&self.data);
        bytes
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        let mut rest = self.ext_type.unpack(v)?;
        let mut length = fields::Uint16::empty();
        let mut rest = length.unpack(&mut rest)?;
        let length = usize::from(length.0);
        if rest.len() < length {
            return Err(errors::TlsError::InvalidLengthError);
        }
        self.data = rest.drain(..length).collect();
        Ok(rest)
    }
}

/// The extensions block of a hello, including its own two-byte length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtensionList {
    pub extensions: Vec<Extension>,
}

impl Pack for ExtensionList {
    fn empty() -> Self {
        ExtensionList {
            extensions: Vec::new(),
        }
    }

    fn pack(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for extension in &self.extensions {
            body.extend_from_slice(&extension.pack());
        }
        let mut bytes = fields::Uint16(body.len() as u16).pack();
        bytes.append(&mut body);
        bytes
    }

    fn unpack(&mut self, v: &mut Vec<u8>) -> Result<Vec<u8>, errors::TlsError> {
        let mut length = fields::Uint16::empty();
        let rest = length.unpack(v)?;
        let length = usize::from(length.0);
        if rest.len() < length {
            return Err(errors::TlsError::InvalidLengthError);
        }
        let mut rest = rest;
        let leftover: Vec<u8> = rest.drain(length..).collect();
        self.extensions.clear();
        while !rest.is_empty() {
            let mut extension = Extension::empty();
            rest = extension.unpack(&mut rest)?;
            self.extensions.push(extension);
        }
        Ok(leftover)
    }
}

impl ExtensionList {
    pub fn find(&self, ext_type: u16) -> Option<&Extension> {
        self.extensions
            .iter()
            .find(|e| e.ext_type == fields::Uint16(ext_type))
    }

    pub fn push_supported_curves(&mut self, curves: &[u16]) {
        let mut data = fields::Uint16(curves.len() as u16 * 2).pack();
        for curve in curves {
            data.extend_from_slice(&fields::Uint16(*curve).pack());
        }
        self.extensions.push(Extension {
            ext_type: fields::Uint16(EXT_SUPPORTED_CURVES),
            data,
        });
    }

    pub fn push_ec_point_formats(&mut self) {
        self.extensions.push(Extension {
            ext_type: fields::Uint16(EXT_EC_POINT_FORMATS),
            data: vec![1, POINT_FORMAT_UNCOMPRESSED],
        });
    }

    /// Curves the peer listed, empty when the extension is absent or
    /// malformed.
    pub fn curves(&self) -> Vec<u16> {
        let data = match self.find(EXT_SUPPORTED_CURVES) {
            Some(extension) => &extension.data,
            None => return Vec::new(),
        };
        if data.len() < 2 {
            return Vec::new();
        }
        let length = usize::from(u16::from_be_bytes([data[0], data[1]]));
        if length % 2 != 0 || data.len() < 2 + length {
            return Vec::new();
        }
        data[2..2 + length]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect()
    }

    pub fn offers_uncompressed_point(&self) -> bool {
        match self.find(EXT_EC_POINT_FORMATS) {
            Some(extension) => {
                extension.data.len() >= 2
                    && extension.data[1..1 + usize::from(extension.data[0]).min(extension.data.len() - 1)]
                        .contains(&POINT_FORMAT_UNCOMPRESSED)
            }
            None => false,
        }
    }
}
