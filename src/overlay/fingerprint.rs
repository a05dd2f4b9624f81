//! Content fingerprints for regular files using BLAKE3.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{OverlayError, Result};
use crate::overlay::types::Fingerprint;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hash the full content of the file at `path`.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let file = File::open(path).map_err(|e| OverlayError::io(path, e))?;
    fingerprint_reader(file).map_err(|e| OverlayError::io(path, e))
}

pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<Fingerprint> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(fingerprint_of(hasher))
}

pub fn fingerprint_bytes(content: &[u8]) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content);
    fingerprint_of(hasher)
}

fn fingerprint_of(hasher: blake3::Hasher) -> Fingerprint {
    Fingerprint(*hasher.finalize().as_bytes())
}
