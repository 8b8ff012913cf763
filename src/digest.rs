use md5::{Digest, Md5};
use sha1::Sha1;

pub const MD5_LENGTH: usize = 16;
pub const SHA1_LENGTH: usize = 20;

/// Running MD5 and SHA-1 over every handshake message, in order. Both
/// protocol versions need the pair, so they are kept in lockstep and
/// snapshotted together.
#[derive(Clone)]
pub struct TranscriptDigest {
    md5: Md5,
    sha1: Sha1,
}

impl TranscriptDigest {
    pub fn new() -> TranscriptDigest {
        TranscriptDigest {
            md5: Md5::new(),
            sha1: Sha1::new(),
        }
    }

    pub fn update(&mut self, message: &[u8]) {
        self.md5.input(message);
        self.sha1.input(message);
    }

    /// A copy of the current state, so Finished computations can run over a
    /// point-in-time transcript while the live one keeps absorbing messages.
    pub fn snapshot(&self) -> TranscriptDigest {
        self.clone()
    }

    pub fn finish(self) -> ([u8; MD5_LENGTH], [u8; SHA1_LENGTH]) {
        let mut md5_out = [0u8; MD5_LENGTH];
        md5_out.copy_from_slice(&self.md5.result());
        let mut sha1_out = [0u8; SHA1_LENGTH];
        sha1_out.copy_from_slice(&self.sha1.result());
        (md5_out, sha1_out)
    }

    /// The live hash states, for the SSLv3 Finished construction which keeps
    /// hashing past the transcript.
    pub(crate) fn into_parts(self) -> (Md5, Sha1) {
        (self.md5, self.sha1)
    }
}
