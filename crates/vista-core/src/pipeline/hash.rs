//! BLAKE3 content hashing, used to verify downloaded model files.

use blake3::Hasher as Blake3Hasher;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Content hashing helpers.
pub struct Hasher;

impl Hasher {
    /// BLAKE3 hex digest of a file, streamed in 64KB chunks.
    pub fn content_hash(path: &Path) -> std::io::Result<String> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = Blake3Hasher::new();

        let mut buffer = [0u8; 65536];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize().to_hex().to_string())
    }
}
