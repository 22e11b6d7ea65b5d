use sha2::{digest::Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Lowercase hex SHA-256 of an in-memory buffer.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn sha256_file(path: &Path) -> Result<String, String> {
    let file = File::open(path).map_err(|e| format!("open_failed:{e}"))?;
    hash_stream(file)
}

pub fn hash_stream<R: Read>(reader: R) -> Result<String, String> {
    let mut reader = BufReader::new(reader);
    let mut buffer = [0u8; 8192];
    let mut hasher = Sha256::new();
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| format!("read_failed:{e}"))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hex digests compare case-insensitively, ignoring surrounding whitespace.
pub fn hashes_match(reference: &str, computed: &str) -> bool {
    let cleaned_ref = reference.trim().to_ascii_lowercase();
    let cleaned_hash = computed.trim().to_ascii_lowercase();
    !cleaned_ref.is_empty() && cleaned_ref == cleaned_hash
}
