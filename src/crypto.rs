//! Keying material derivation for both protocol versions.
//!
//! TLS 1.0 uses the PRF of RFC 2246 section 5: the MD5 and SHA-1 halves of
//! the secret are expanded with P_hash and XORed together. SSLv3 predates the
//! PRF and instead runs numbered MD5-over-SHA1 rounds ("A", "BB", "CCC", ..)
//! for the master secret and key block, and a pad1/pad2 construction for the
//! Finished hashes.

use md5::{Digest, Md5};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::digest::TranscriptDigest;
use crate::record::ProtocolVersion;

pub const MASTER_SECRET_LENGTH: usize = 48;

pub type MasterSecret = [u8; MASTER_SECRET_LENGTH];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConnectionEnd {
    Client,
    Server,
}

const HMAC_BLOCK_LENGTH: usize = 64;

/// RFC 2104 HMAC over any 64-byte-block digest. The message is taken as a
/// sequence of parts so callers never concatenate into a scratch buffer.
fn hmac<D: Digest>(secret: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut key = [0u8; HMAC_BLOCK_LENGTH];
    if secret.len() > HMAC_BLOCK_LENGTH {
        key[..D::output_size()].copy_from_slice(&D::digest(secret));
    } else {
        key[..secret.len()].copy_from_slice(secret);
    }

    let mut ipad = [0x36u8; HMAC_BLOCK_LENGTH];
    let mut opad = [0x5cu8; HMAC_BLOCK_LENGTH];
    for i in 0..HMAC_BLOCK_LENGTH {
        ipad[i] ^= key[i];
        opad[i] ^= key[i];
    }

    let mut inner = D::new();
    inner.input(&ipad[..]);
    for part in parts {
        inner.input(part);
    }
    let inner_hash = inner.result();

    let mut outer = D::new();
    outer.input(&opad[..]);
    outer.input(&inner_hash[..]);
    outer.result().to_vec()
}

/// P_hash(secret, seed) from RFC 2246: A(i) chained HMACs, one output block
/// per iteration, truncated to the requested length.
fn p_hash<D: Digest>(secret: &[u8], seed: &[u8], output_length: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(output_length);
    let mut a = hmac::<D>(secret, &[seed]);
    while output.len() < output_length {
        let block = hmac::<D>(secret, &[&a, seed]);
        let take = std::cmp::min(block.len(), output_length - output.len());
        output.extend_from_slice(&block[..take]);
        a = hmac::<D>(secret, &[&a]);
    }
    output
}

pub fn prf(secret: &[u8], label: &[u8], seed: &[u8], output_length: usize) -> Vec<u8> {
    let half = (secret.len() + 1) / 2;
    let s1 = &secret[..half];
    let s2 = &secret[secret.len() - half..];

    let mut label_seed = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label);
    label_seed.extend_from_slice(seed);

    let md5_stream = p_hash::<Md5>(s1, &label_seed, output_length);
    let sha1_stream = p_hash::<Sha1>(s2, &label_seed, output_length);
    md5_stream
        .iter()
        .zip(sha1_stream.iter())
        .map(|(m, s)| m ^ s)
        .collect()
}

/// One SSLv3 derivation round: MD5(secret || SHA1(label || secret || seed)).
/// Round i uses the letter 'A'+i repeated i+1 times as its label.
fn ssl3_rounds(secret: &[u8], seed: &[u8], output_length: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(output_length);
    let mut round = 0u8;
    while output.len() < output_length {
        let label = vec![b'A' + round; usize::from(round) + 1];

        let mut sha1 = Sha1::new();
        sha1.input(&label);
        sha1.input(secret);
        sha1.input(seed);
        let inner = sha1.result();

        let mut md5 = Md5::new();
        md5.input(secret);
        md5.input(&inner[..]);
        let block = md5.result();

        let take = std::cmp::min(block.len(), output_length - output.len());
        output.extend_from_slice(&block[..take]);
        round += 1;
    }
    output
}

pub fn master_secret(
    version: ProtocolVersion,
    premaster: &[u8],
    client_random: &[u8],
    server_random: &[u8],
) -> Zeroizing<MasterSecret> {
    let mut seed = Vec::with_capacity(client_random.len() + server_random.len());
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);

    let derived = if version.is_tls() {
        Zeroizing::new(prf(premaster, b"master secret", &seed, MASTER_SECRET_LENGTH))
    } else {
        Zeroizing::new(ssl3_rounds(premaster, &seed, MASTER_SECRET_LENGTH))
    };
    let mut out = Zeroizing::new([0u8; MASTER_SECRET_LENGTH]);
    out.copy_from_slice(&derived);
    out
}

/// Key block expansion. Note the random order flips relative to the master
/// secret derivation: server random first.
pub fn key_block(
    version: ProtocolVersion,
    master: &MasterSecret,
    server_random: &[u8],
    client_random: &[u8],
    output_length: usize,
) -> Zeroizing<Vec<u8>> {
    let mut seed = Vec::with_capacity(server_random.len() + client_random.len());
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    if version.is_tls() {
        Zeroizing::new(prf(master, b"key expansion", &seed, output_length))
    } else {
        Zeroizing::new(ssl3_rounds(master, &seed, output_length))
    }
}

const SSL3_SENDER_CLIENT: [u8; 4] = [0x43, 0x4c, 0x4e, 0x54];
const SSL3_SENDER_SERVER: [u8; 4] = [0x53, 0x52, 0x56, 0x52];

const SSL3_MD5_PAD_LENGTH: usize = 48;
const SSL3_SHA1_PAD_LENGTH: usize = 40;

pub const TLS_FINISHED_LENGTH: usize = 12;
pub const SSL3_FINISHED_LENGTH: usize = 36;

/// The verify_data carried in a Finished message, computed over the given
/// transcript state. TLS emits 12 PRF bytes, SSLv3 the 36-byte pad-based
/// MD5||SHA1 pair.
pub fn finished_verify_data(
    version: ProtocolVersion,
    master: &MasterSecret,
    end: ConnectionEnd,
    transcript: TranscriptDigest,
) -> Vec<u8> {
    if version.is_tls() {
        let (md5_hash, sha1_hash) = transcript.finish();
        let label: &[u8] = match end {
            ConnectionEnd::Client => b"client finished",
            ConnectionEnd::Server => b"server finished",
        };
        let mut seed = Vec::with_capacity(md5_hash.len() + sha1_hash.len());
        seed.extend_from_slice(&md5_hash);
        seed.extend_from_slice(&sha1_hash);
        prf(master, label, &seed, TLS_FINISHED_LENGTH)
    } else {
        let sender = match end {
            ConnectionEnd::Client => SSL3_SENDER_CLIENT,
            ConnectionEnd::Server => SSL3_SENDER_SERVER,
        };
        let (mut md5, mut sha1) = transcript.into_parts();

        md5.input(sender);
        md5.input(&master[..]);
        md5.input([0x36u8; SSL3_MD5_PAD_LENGTH]);
        let md5_inner = md5.result();
        let mut md5_outer = Md5::new();
        md5_outer.input(&master[..]);
        md5_outer.input([0x5cu8; SSL3_MD5_PAD_LENGTH]);
        md5_outer.input(&md5_inner[..]);

        sha1.input(sender);
        sha1.input(&master[..]);
        sha1.input([0x36u8; SSL3_SHA1_PAD_LENGTH]);
        let sha1_inner = sha1.result();
        let mut sha1_outer = Sha1::new();
        sha1_outer.input(&master[..]);
        sha1_outer.input([0x5cu8; SSL3_SHA1_PAD_LENGTH]);
        sha1_outer.input(&sha1_inner[..]);

        let mut verify = Vec::with_capacity(SSL3_FINISHED_LENGTH);
        verify.extend_from_slice(&md5_outer.result());
        verify.extend_from_slice(&sha1_outer.result());
        verify
    }
}
