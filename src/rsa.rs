//! Raw RSA with PKCS#1 v1.5 padding over num-bigint arithmetic.
//!
//! The keys handled here come out of certificate SubjectPublicKeyInfo blocks
//! or test fixtures, never from files, so there is no key-file parsing.

use num_bigint::BigUint;
use ring::rand::SecureRandom;
use zeroize::Zeroizing;

use crate::errors::TlsError;

const MIN_PAD_LENGTH: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub struct RsaPublicKey {
    modulus: BigUint,
    exponent: BigUint,
    modulus_length: usize,
}

impl RsaPublicKey {
    /// Build a key from DER INTEGER contents. A single leading zero byte on
    /// the modulus is sign padding and is dropped.
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> Result<RsaPublicKey, TlsError> {
        let modulus = if modulus.len() > 1 && modulus[0] == 0 {
            &modulus[1..]
        } else {
            modulus
        };
        if modulus.is_empty() || exponent.is_empty() {
            return Err(TlsError::RsaOperationError("empty key component"));
        }
        Ok(RsaPublicKey {
            modulus: BigUint::from_bytes_be(modulus),
            exponent: BigUint::from_bytes_be(exponent),
            modulus_length: modulus.len(),
        })
    }

    pub fn modulus_length(&self) -> usize {
        self.modulus_length
    }

    /// EME-PKCS1-v1_5 block type 2 encryption.
    pub fn public_encrypt(
        &self,
        plaintext: &[u8],
        rand: &dyn SecureRandom,
    ) -> Result<Vec<u8>, TlsError> {
        let k = self.modulus_length;
        if plaintext.len() + MIN_PAD_LENGTH + 3 > k {
            return Err(TlsError::RsaOperationError("plaintext too long for modulus"));
        }

        let mut block = vec![0u8; k];
        block[1] = 0x02;
        let pad_length = k - 3 - plaintext.len();
        rand.fill(&mut block[2..2 + pad_length])
            .map_err(|_| TlsError::UnspecifiedRingError)?;
        for byte in block[2..2 + pad_length].iter_mut() {
            // Padding bytes must be nonzero, the zero byte is the delimiter.
            while *byte == 0 {
                let mut replacement = [0u8; 1];
                rand.fill(&mut replacement)
                    .map_err(|_| TlsError::UnspecifiedRingError)?;
                *byte = replacement[0];
            }
        }
        block[2 + pad_length] = 0x00;
        block[3 + pad_length..].copy_from_slice(plaintext);

        let m = BigUint::from_bytes_be(&block);
        if m >= self.modulus {
            return Err(TlsError::RsaOperationError("message out of range"));
        }
        Ok(left_pad(&m.modpow(&self.exponent, &self.modulus).to_bytes_be(), k))
    }

    /// EMSA-PKCS1-v1_5 signature check. The recovered payload may be a bare
    /// digest or a DigestInfo structure ending in the digest, both are
    /// accepted since old CAs emitted either.
    pub fn verify_pkcs1(&self, signature: &[u8], digest: &[u8]) -> Result<(), TlsError> {
        let k = self.modulus_length;
        if signature.len() != k {
            return Err(TlsError::VerificationFailedError);
        }
        let s = BigUint::from_bytes_be(signature);
        if s >= self.modulus {
            return Err(TlsError::VerificationFailedError);
        }
        let em = left_pad(&s.modpow(&self.exponent, &self.modulus).to_bytes_be(), k);

        if em.len() < MIN_PAD_LENGTH + 3 || em[0] != 0x00 || em[1] != 0x01 {
            return Err(TlsError::VerificationFailedError);
        }
        let mut i = 2;
        while i < em.len() && em[i] == 0xff {
            i += 1;
        }
        if i < MIN_PAD_LENGTH + 2 || i >= em.len() || em[i] != 0x00 {
            return Err(TlsError::VerificationFailedError);
        }
        let payload = &em[i + 1..];
        if payload.len() < digest.len() || &payload[payload.len() - digest.len()..] != digest {
            return Err(TlsError::VerificationFailedError);
        }
        Ok(())
    }
}

pub struct RsaPrivateKey {
    modulus: BigUint,
    exponent: BigUint,
    modulus_length: usize,
}

impl RsaPrivateKey {
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> Result<RsaPrivateKey, TlsError> {
        let modulus = if modulus.len() > 1 && modulus[0] == 0 {
            &modulus[1..]
        } else {
            modulus
        };
        if modulus.is_empty() || exponent.is_empty() {
            return Err(TlsError::RsaOperationError("empty key component"));
        }
        Ok(RsaPrivateKey {
            modulus: BigUint::from_bytes_be(modulus),
            exponent: BigUint::from_bytes_be(exponent),
            modulus_length: modulus.len(),
        })
    }

    /// Undo block type 2 padding and return the embedded plaintext.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, TlsError> {
        let k = self.modulus_length;
        if ciphertext.len() != k {
            return Err(TlsError::RsaOperationError("ciphertext length mismatch"));
        }
        let c = BigUint::from_bytes_be(ciphertext);
        if c >= self.modulus {
            return Err(TlsError::RsaOperationError("ciphertext out of range"));
        }
        let em = Zeroizing::new(left_pad(
            &c.modpow(&self.exponent, &self.modulus).to_bytes_be(),
            k,
        ));

        if em[0] != 0x00 || em[1] != 0x02 {
            return Err(TlsError::RsaOperationError("bad padding header"));
        }
        let mut i = 2;
        while i < em.len() && em[i] != 0x00 {
            i += 1;
        }
        if i < MIN_PAD_LENGTH + 2 || i >= em.len() {
            return Err(TlsError::RsaOperationError("padding delimiter missing"));
        }
        Ok(Zeroizing::new(em[i + 1..].to_vec()))
    }

    /// EMSA-PKCS1-v1_5 block type 1 signature over an already-hashed payload.
    pub fn sign_pkcs1(&self, payload: &[u8]) -> Result<Vec<u8>, TlsError> {
        let k = self.modulus_length;
        if payload.len() + MIN_PAD_LENGTH + 3 > k {
            return Err(TlsError::RsaOperationError("payload too long for modulus"));
        }
        let mut block = vec![0xffu8; k];
        block[0] = 0x00;
        block[1] = 0x01;
        block[k - payload.len() - 1] = 0x00;
        block[k - payload.len()..].copy_from_slice(payload);

        let m = BigUint::from_bytes_be(&block);
        Ok(left_pad(&m.modpow(&self.exponent, &self.modulus).to_bytes_be(), k))
    }
}

fn left_pad(bytes: &[u8], length: usize) -> Vec<u8> {
    let mut out = vec![0u8; length.saturating_sub(bytes.len())];
    out.extend_from_slice(bytes);
    out
}
