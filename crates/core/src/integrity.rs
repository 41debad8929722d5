use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Streams the file through blake3 in fixed-size chunks so arbitrarily
/// large files never load fully into memory. A missing or unreadable file
/// surfaces as an error, never as a bogus digest.
pub fn digest(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0_u8; 64 * 1024];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// True iff both files currently hold byte-identical content.
pub fn verify(path_a: &Path, path_b: &Path) -> Result<bool> {
    Ok(digest(path_a)? == digest(path_b)?)
}
