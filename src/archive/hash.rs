//! Content hashing for package archives

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha512};
use std::io::{self, Read};

/// Computes a digest over a byte stream
pub trait HashProvider: Send + Sync {
    /// Algorithm name as reported to feed clients
    fn algorithm(&self) -> &'static str;

    /// Consume `reader` to the end and return the digest bytes
    fn digest(&self, reader: &mut dyn Read) -> io::Result<Vec<u8>>;

    /// Digest encoded as standard padded base64
    fn digest_base64(&self, reader: &mut dyn Read) -> io::Result<String> {
        Ok(STANDARD.encode(self.digest(reader)?))
    }
}

/// SHA-512 digests
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha512Hasher;

impl HashProvider for Sha512Hasher {
    fn algorithm(&self) -> &'static str {
        "SHA512"
    }

    fn digest(&self, reader: &mut dyn Read) -> io::Result<Vec<u8>> {
        let mut hasher = Sha512::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize().to_vec())
    }
}
