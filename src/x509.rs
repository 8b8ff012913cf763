//! Strict X.509v1-v3 certificate parsing over raw DER.
//!
//! The reader rejects anything outside the shapes this engine needs: short
//! and two-byte-at-most long lengths, definite lengths only, and every
//! length bounds-checked against the enclosing value. Unknown non-critical
//! extensions are skipped, unknown critical extensions poison the
//! certificate.

use crate::errors::TlsError;
use crate::rsa::RsaPublicKey;

const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_NULL: u8 = 0x05;
const TAG_OID: u8 = 0x06;
const TAG_UTC_TIME: u8 = 0x17;
const TAG_GENERALIZED_TIME: u8 = 0x18;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_SET: u8 = 0x31;

const OID_RSA_ENCRYPTION: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
const OID_MD2_WITH_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x02];
const OID_MD5_WITH_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x04];
const OID_SHA1_WITH_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x05];
const OID_EC_PUBLIC_KEY: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
const OID_SECP256R1: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];
const OID_SECP384R1: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x22];
const OID_EMAIL_ADDRESS: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x01];

const OID_EXT_KEY_USAGE: &[u8] = &[0x55, 0x1d, 0x0f];
const OID_EXT_SUBJECT_ALT_NAME: &[u8] = &[0x55, 0x1d, 0x11];
const OID_EXT_BASIC_CONSTRAINTS: &[u8] = &[0x55, 0x1d, 0x13];
const OID_EXT_EXTENDED_KEY_USAGE: &[u8] = &[0x55, 0x1d, 0x25];
const OID_ID_KP_PREFIX: &[u8] = &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03];

// keyUsage bit positions, as a mask. -1 in `key_usage` means the extension
// was absent and no restriction applies.
pub const KU_DIGITAL_SIGNATURE: i32 = 1 << 0;
pub const KU_KEY_ENCIPHERMENT: i32 = 1 << 2;
pub const KU_KEY_AGREEMENT: i32 = 1 << 4;
pub const KU_KEY_CERT_SIGN: i32 = 1 << 5;

pub const EKU_SERVER_AUTH: i32 = 1 << 0;
pub const EKU_CLIENT_AUTH: i32 = 1 << 1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SignatureAlgorithm {
    Md2WithRsa,
    Md5WithRsa,
    Sha1WithRsa,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Ec { curve: u16, point: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubjectAltName {
    Email(String),
    Dns(String),
    Uri(String),
    Raw(u8, Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct Certificate {
    pub version: u8,
    pub serial: Vec<u8>,
    pub issuer: String,
    pub subject: String,
    pub not_before: u64,
    pub not_after: u64,
    pub public_key: PublicKey,
    pub signature_algorithm: SignatureAlgorithm,
    pub tbs_bytes: Vec<u8>,
    pub signature: Vec<u8>,
    pub has_basic_constraints: bool,
    pub is_ca: bool,
    pub path_len_constraint: Option<u32>,
    pub key_usage: i32,
    pub ext_key_usage: i32,
    pub subject_alt_name: Option<SubjectAltName>,
    pub bad_extension: bool,
}

/// Cursor over a DER byte slice.
struct Der<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Der<'a> {
    fn new(bytes: &'a [u8]) -> Der<'a> {
        Der { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn peek_tag(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn read_byte(&mut self) -> Result<u8, TlsError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(TlsError::DecodeError("truncated DER"))?;
        self.pos += 1;
        Ok(b)
    }

    /// Definite-form length, at most two length bytes, bounds-checked
    /// against what is left in this value.
    fn read_length(&mut self) -> Result<usize, TlsError> {
        let first = self.read_byte()?;
        let length = if first < 0x80 {
            usize::from(first)
        } else {
            let count = usize::from(first & 0x7f);
            if count == 0 || count > 2 {
                return Err(TlsError::DecodeError("unsupported DER length form"));
            }
            let mut length = 0usize;
            for _ in 0..count {
                length = (length << 8) | usize::from(self.read_byte()?);
            }
            length
        };
        if length > self.remaining() {
            return Err(TlsError::DecodeError("DER length exceeds input"));
        }
        Ok(length)
    }

    fn expect(&mut self, tag: u8) -> Result<&'a [u8], TlsError> {
        let start = self.pos;
        let actual = self.read_byte()?;
        if actual != tag {
            self.pos = start;
            return Err(TlsError::DecodeError("unexpected DER tag"));
        }
        let length = self.read_length()?;
        let contents = &self.bytes[self.pos..self.pos + length];
        self.pos += length;
        Ok(contents)
    }

    /// Contents of the next value regardless of tag, returning the tag too.
    fn read_any(&mut self) -> Result<(u8, &'a [u8]), TlsError> {
        let tag = self.read_byte()?;
        let length = self.read_length()?;
        let contents = &self.bytes[self.pos..self.pos + length];
        self.pos += length;
        Ok((tag, contents))
    }

    /// The full encoding (tag, length, contents) of the next value.
    fn read_raw(&mut self) -> Result<&'a [u8], TlsError> {
        let start = self.pos;
        self.read_byte()?;
        let length = self.read_length()?;
        self.pos += length;
        Ok(&self.bytes[start..self.pos])
    }
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Certificate, TlsError> {
        let mut outer = Der::new(der);
        let cert_body = outer.expect(TAG_SEQUENCE)?;
        if outer.remaining() != 0 {
            return Err(TlsError::DecodeError("trailing bytes after certificate"));
        }

        let mut cert = Der::new(cert_body);
        let tbs_bytes = cert.read_raw()?;
        if tbs_bytes.first() != Some(&TAG_SEQUENCE) {
            return Err(TlsError::DecodeError("tbsCertificate is not a sequence"));
        }
        let outer_algorithm = parse_signature_algorithm(cert.expect(TAG_SEQUENCE)?)?;
        let signature = parse_bit_string(cert.expect(TAG_BIT_STRING)?)?;
        if cert.remaining() != 0 {
            return Err(TlsError::DecodeError("trailing bytes in certificate"));
        }

        let mut tbs_outer = Der::new(tbs_bytes);
        let mut tbs = Der::new(tbs_outer.expect(TAG_SEQUENCE)?);

        // Explicit [0] version, absent means v1.
        let version = if tbs.peek_tag() == Some(0xa0) {
            let version_bytes = tbs.expect(0xa0)?;
            let mut inner = Der::new(version_bytes);
            let v = parse_small_integer(inner.expect(TAG_INTEGER)?)?;
            if v > 2 {
                return Err(TlsError::DecodeError("unsupported certificate version"));
            }
            v as u8 + 1
        } else {
            1
        };

        let serial = tbs.expect(TAG_INTEGER)?.to_vec();
        if serial.is_empty() {
            return Err(TlsError::DecodeError("empty serial number"));
        }

        let tbs_algorithm = parse_signature_algorithm(tbs.expect(TAG_SEQUENCE)?)?;
        if tbs_algorithm != outer_algorithm {
            return Err(TlsError::DecodeError("signature algorithm mismatch"));
        }

        let issuer = parse_name(tbs.expect(TAG_SEQUENCE)?)?;

        let mut validity = Der::new(tbs.expect(TAG_SEQUENCE)?);
        let not_before = parse_time(&mut validity)?;
        let not_after = parse_time(&mut validity)?;
        if validity.remaining() != 0 {
            return Err(TlsError::DecodeError("trailing bytes in validity"));
        }

        let subject = parse_name(tbs.expect(TAG_SEQUENCE)?)?;
        let public_key = parse_subject_public_key_info(tbs.expect(TAG_SEQUENCE)?)?;

        let mut has_basic_constraints = false;
        let mut is_ca = false;
        let mut path_len_constraint = None;
        let mut key_usage = -1i32;
        let mut ext_key_usage = -1i32;
        let mut subject_alt_name = None;
        let mut bad_extension = false;

        while tbs.remaining() > 0 {
            let (tag, contents) = tbs.read_any()?;
            match tag {
                // issuerUniqueID / subjectUniqueID, ignored.
                0x81 | 0x82 | 0xa1 | 0xa2 => {}
                0xa3 => {
                    if version < 3 {
                        return Err(TlsError::DecodeError("extensions on pre-v3 certificate"));
                    }
                    let mut extensions = Der::new(Der::new(contents).expect(TAG_SEQUENCE)?);
                    while extensions.remaining() > 0 {
                        let mut extension = Der::new(extensions.expect(TAG_SEQUENCE)?);
                        let oid = extension.expect(TAG_OID)?;
                        let critical = if extension.peek_tag() == Some(TAG_BOOLEAN) {
                            extension.expect(TAG_BOOLEAN)? != [0x00]
                        } else {
                            false
                        };
                        let value = extension.expect(TAG_OCTET_STRING)?;

                        if oid == OID_EXT_BASIC_CONSTRAINTS {
                            has_basic_constraints = true;
                            let mut bc = Der::new(Der::new(value).expect(TAG_SEQUENCE)?);
                            if bc.peek_tag() == Some(TAG_BOOLEAN) {
                                is_ca = bc.expect(TAG_BOOLEAN)? != [0x00];
                            }
                            if bc.peek_tag() == Some(TAG_INTEGER) {
                                path_len_constraint =
                                    Some(parse_small_integer(bc.expect(TAG_INTEGER)?)?);
                            }
                        } else if oid == OID_EXT_KEY_USAGE {
                            key_usage = parse_key_usage(value)?;
                        } else if oid == OID_EXT_EXTENDED_KEY_USAGE {
                            ext_key_usage = parse_ext_key_usage(value)?;
                        } else if oid == OID_EXT_SUBJECT_ALT_NAME {
                            subject_alt_name = parse_subject_alt_name(value)?;
                        } else if critical {
                            bad_extension = true;
                        }
                    }
                }
                _ => return Err(TlsError::DecodeError("unexpected tbsCertificate field")),
            }
        }

        Ok(Certificate {
            version,
            serial,
            issuer,
            subject,
            not_before,
            not_after,
            public_key,
            signature_algorithm: outer_algorithm,
            tbs_bytes: tbs_bytes.to_vec(),
            signature,
            has_basic_constraints,
            is_ca,
            path_len_constraint,
            key_usage,
            ext_key_usage,
            subject_alt_name,
            bad_extension,
        })
    }

    /// Inclusive validity window check against a unix timestamp.
    pub fn check_validity(&self, now: u64) -> Result<(), TlsError> {
        if now < self.not_before {
            return Err(TlsError::NotYetValidError);
        }
        if now > self.not_after {
            return Err(TlsError::ExpiredError);
        }
        Ok(())
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Hostname check against the SAN DNS name when present, otherwise the
    /// subject CN. A name starting with '.' matches any host under that
    /// suffix.
    pub fn host_matches(&self, host: &str) -> bool {
        let name = match &self.subject_alt_name {
            Some(SubjectAltName::Dns(dns)) => Some(dns.clone()),
            _ => name_attribute(&self.subject, "CN"),
        };
        let name = match name {
            Some(n) => n,
            None => return false,
        };
        let name = name.to_ascii_lowercase();
        let host = host.to_ascii_lowercase();
        if name.starts_with('.') {
            host.ends_with(&name)
        } else {
            host == name
        }
    }
}

fn parse_signature_algorithm(contents: &[u8]) -> Result<SignatureAlgorithm, TlsError> {
    let mut algorithm = Der::new(contents);
    let oid = algorithm.expect(TAG_OID)?;
    if algorithm.peek_tag() == Some(TAG_NULL) {
        algorithm.expect(TAG_NULL)?;
    }
    match oid {
        o if o == OID_MD2_WITH_RSA => Ok(SignatureAlgorithm::Md2WithRsa),
        o if o == OID_MD5_WITH_RSA => Ok(SignatureAlgorithm::Md5WithRsa),
        o if o == OID_SHA1_WITH_RSA => Ok(SignatureAlgorithm::Sha1WithRsa),
        _ => Err(TlsError::UnsupportedSignatureAlgorithmError),
    }
}

fn parse_bit_string(contents: &[u8]) -> Result<Vec<u8>, TlsError> {
    if contents.is_empty() || contents[0] != 0 {
        return Err(TlsError::DecodeError("unsupported BIT STRING padding"));
    }
    Ok(contents[1..].to_vec())
}

fn parse_small_integer(contents: &[u8]) -> Result<u32, TlsError> {
    if contents.is_empty() || contents.len() > 4 {
        return Err(TlsError::DecodeError("integer out of range"));
    }
    let mut value = 0u32;
    for b in contents {
        value = (value << 8) | u32::from(*b);
    }
    Ok(value)
}

/// Distinguished name flattened to "attr=value;attr=value". Attribute order
/// is preserved so byte-equal names compare equal as strings.
fn parse_name(contents: &[u8]) -> Result<String, TlsError> {
    let mut name = String::new();
    let mut rdns = Der::new(contents);
    while rdns.remaining() > 0 {
        let mut set = Der::new(rdns.expect(TAG_SET)?);
        while set.remaining() > 0 {
            let mut attribute = Der::new(set.expect(TAG_SEQUENCE)?);
            let oid = attribute.expect(TAG_OID)?;
            let (_, value) = attribute.read_any()?;

            let label = match oid {
                [0x55, 0x04, last] => match last {
                    3 => Some("CN"),
                    4 => Some("SN"),
                    6 => Some("C"),
                    7 => Some("L"),
                    8 => Some("ST"),
                    9 => Some("STREET"),
                    10 => Some("O"),
                    11 => Some("OU"),
                    _ => None,
                },
                o if o == OID_EMAIL_ADDRESS => Some("E"),
                _ => None,
            };

            if !name.is_empty() {
                name.push(';');
            }
            match label {
                Some(label) => name.push_str(label),
                None => name.push_str(&hex::encode(oid)),
            }
            name.push('=');
            name.push_str(
                std::str::from_utf8(value)
                    .map_err(|_| TlsError::DecodeError("non-UTF8 name attribute"))?,
            );
        }
    }
    Ok(name)
}

/// First value of the given attribute in a flattened name.
pub fn name_attribute(name: &str, attribute: &str) -> Option<String> {
    for part in name.split(';') {
        let mut kv = part.splitn(2, '=');
        if kv.next() == Some(attribute) {
            return kv.next().map(str::to_string);
        }
    }
    None
}

fn digits(bytes: &[u8]) -> Result<u64, TlsError> {
    let mut value = 0u64;
    for b in bytes {
        if !b.is_ascii_digit() {
            return Err(TlsError::DecodeError("non-digit in time field"));
        }
        value = value * 10 + u64::from(b - b'0');
    }
    Ok(value)
}

/// UTCTime (2-digit year, window at 2050) or GeneralizedTime, both forms
/// seconds-precision Zulu only, to a unix timestamp.
fn parse_time(validity: &mut Der) -> Result<u64, TlsError> {
    let (tag, contents) = validity.read_any()?;
    let (year, rest) = match tag {
        TAG_UTC_TIME => {
            if contents.len() != 13 {
                return Err(TlsError::DecodeError("bad UTCTime length"));
            }
            let yy = digits(&contents[..2])?;
            let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
            (year, &contents[2..])
        }
        TAG_GENERALIZED_TIME => {
            if contents.len() != 15 {
                return Err(TlsError::DecodeError("bad GeneralizedTime length"));
            }
            (digits(&contents[..4])?, &contents[4..])
        }
        _ => return Err(TlsError::DecodeError("unexpected time tag")),
    };
    if rest[10] != b'Z' {
        return Err(TlsError::DecodeError("non-Zulu time"));
    }
    let month = digits(&rest[..2])?;
    let day = digits(&rest[2..4])?;
    let hour = digits(&rest[4..6])?;
    let minute = digits(&rest[6..8])?;
    let second = digits(&rest[8..10])?;
    if month == 0 || month > 12 || day == 0 || day > 31 || hour > 23 || minute > 59 || second > 60 {
        return Err(TlsError::DecodeError("time field out of range"));
    }
    let days = days_from_civil(year as i64, month as i64, day as i64);
    if days < 0 {
        return Err(TlsError::DecodeError("time before epoch"));
    }
    Ok(days as u64 * 86400 + hour * 3600 + minute * 60 + second)
}

// Howard Hinnant's civil-to-days algorithm.
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

fn parse_subject_public_key_info(contents: &[u8]) -> Result<PublicKey, TlsError> {
    let mut spki = Der::new(contents);
    let mut algorithm = Der::new(spki.expect(TAG_SEQUENCE)?);
    let oid = algorithm.expect(TAG_OID)?;

    if oid == OID_RSA_ENCRYPTION {
        let key_bytes = parse_bit_string(spki.expect(TAG_BIT_STRING)?)?;
        let mut rsa = Der::new(&key_bytes);
        let mut key = Der::new(rsa.expect(TAG_SEQUENCE)?);
        let modulus = key.expect(TAG_INTEGER)?;
        let exponent = key.expect(TAG_INTEGER)?;
        Ok(PublicKey::Rsa(RsaPublicKey::from_components(
            modulus, exponent,
        )?))
    } else if oid == OID_EC_PUBLIC_KEY {
        let curve_oid = algorithm.expect(TAG_OID)?;
        let curve = match curve_oid {
            o if o == OID_SECP256R1 => 23,
            o if o == OID_SECP384R1 => 24,
            _ => return Err(TlsError::DecodeError("unsupported named curve")),
        };
        let point = parse_bit_string(spki.expect(TAG_BIT_STRING)?)?;
        Ok(PublicKey::Ec { curve, point })
    } else {
        Err(TlsError::DecodeError("unsupported public key algorithm"))
    }
}

/// keyUsage BIT STRING, MSB-first bit n becoming mask bit 1<<n.
fn parse_key_usage(value: &[u8]) -> Result<i32, TlsError> {
    let bits = Der::new(value).expect(TAG_BIT_STRING)?;
    if bits.is_empty() {
        return Err(TlsError::DecodeError("empty keyUsage"));
    }
    let unused = usize::from(bits[0]);
    let total = (bits.len() - 1) * 8;
    if unused > 7 || unused > total {
        return Err(TlsError::DecodeError("keyUsage unused bits"));
    }
    // The leading byte counts trailing pad bits, which carry no usage.
    let mut mask = 0i32;
    for n in 0..total - unused {
        if bits[1 + n / 8] & (0x80 >> (n % 8)) != 0 {
            mask |= 1 << n;
        }
    }
    Ok(mask)
}

/// extendedKeyUsage purposes in the id-kp arc become mask bits; purposes
/// outside the arc are tolerated but contribute nothing.
fn parse_ext_key_usage(value: &[u8]) -> Result<i32, TlsError> {
    let mut purposes = Der::new(Der::new(value).expect(TAG_SEQUENCE)?);
    let mut mask = 0i32;
    while purposes.remaining() > 0 {
        let oid = purposes.expect(TAG_OID)?;
        if oid.len() == OID_ID_KP_PREFIX.len() + 1 && oid.starts_with(OID_ID_KP_PREFIX) {
            let purpose = oid[oid.len() - 1];
            if (1..=8).contains(&purpose) {
                mask |= 1 << (purpose - 1);
            }
        }
    }
    Ok(mask)
}

/// Only the first GeneralName is retained, matching what hostname checks
/// consume.
fn parse_subject_alt_name(value: &[u8]) -> Result<Option<SubjectAltName>, TlsError> {
    let mut names = Der::new(Der::new(value).expect(TAG_SEQUENCE)?);
    if names.remaining() == 0 {
        return Ok(None);
    }
    let (tag, contents) = names.read_any()?;
    let as_string = |contents: &[u8]| -> Result<String, TlsError> {
        Ok(std::str::from_utf8(contents)
            .map_err(|_| TlsError::DecodeError("non-UTF8 general name"))?
            .to_string())
    };
    Ok(Some(match tag & 0x1f {
        1 => SubjectAltName::Email(as_string(contents)?),
        2 => SubjectAltName::Dns(as_string(contents)?),
        6 => SubjectAltName::Uri(as_string(contents)?),
        t => SubjectAltName::Raw(t, contents.to_vec()),
    }))
}
