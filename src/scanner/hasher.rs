//! Chunked content hashing.
//!
//! # Overview
//! [`compute_digest`] streams a file through an MD5 or SHA-256 accumulator
//! in fixed [`CHUNK_SIZE`] reads, so memory use is constant regardless of
//! file size. It never touches the hash cache; caching is the coordinator's
//! job.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::Md5;
use sha2::digest::Output;
use sha2::{Digest, Sha256};

use super::{HashAlgorithm, HashError};

/// Read buffer size for streaming hashes (8 KiB).
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Compute the lowercase hexadecimal digest of a file's content.
///
/// # Errors
///
/// - [`HashError::NotFound`] if the file vanished
/// - [`HashError::PermissionDenied`] if it cannot be read
/// - [`HashError::NotAFile`] if the path is a directory or special file
/// - [`HashError::Io`] for any other read failure
///
/// # Example
///
/// ```no_run
/// use picdupe::scanner::{compute_digest, HashAlgorithm};
/// use std::path::Path;
///
/// let digest = compute_digest(Path::new("photo.jpg"), HashAlgorithm::Md5).unwrap();
/// assert_eq!(digest.len(), 32);
/// ```
pub fn compute_digest(path: &Path, algorithm: HashAlgorithm) -> Result<String, HashError> {
    let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;

    let metadata = file.metadata().map_err(|e| HashError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(HashError::NotAFile(path.to_path_buf()));
    }

    let digest = match algorithm {
        HashAlgorithm::Md5 => digest_reader::<Md5, _>(file),
        HashAlgorithm::Sha256 => digest_reader::<Sha256, _>(file),
    };

    digest.map_err(|e| HashError::from_io(path, e))
}

/// Digest an in-memory buffer. Produces the same value as
/// [`compute_digest`] over a file with identical content.
#[must_use]
pub fn digest_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Md5 => format!("{:x}", Md5::digest(data)),
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
    }
}

fn digest_reader<D: Digest, R: Read>(mut reader: R) -> io::Result<String>
where
    Output<D>: std::fmt::LowerHex,
{
    let mut hasher = D::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}
