//! Content hashing for scan correlation.
//!
//! BLAKE3 is always computed. MD5 (`md-5` feature) and SHA-256 (`sha2`
//! feature) can be switched on for correlation with systems that key on
//! those digests. Hashes are never used for scan decisions.

use crate::core::types::ContentHash;

use std::io::{self, Read};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Computes [`ContentHash`] values from bytes or readers.
///
/// # Examples
///
/// ```rust
/// use scanbroker::core::ContentHasher;
///
/// let hasher = ContentHasher::new();
/// let hash = hasher.hash_bytes(b"hello world");
/// assert_eq!(hash, hasher.hash_bytes(b"hello world"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    #[cfg(feature = "md-5")]
    compute_md5: bool,
    #[cfg(feature = "sha2")]
    compute_sha256: bool,
}

impl ContentHasher {
    /// Creates a new `ContentHasher` (BLAKE3 only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables MD5 computation.
    #[cfg(feature = "md-5")]
    pub fn with_md5(mut self, enabled: bool) -> Self {
        self.compute_md5 = enabled;
        self
    }

    /// Enables or disables SHA-256 computation.
    #[cfg(feature = "sha2")]
    pub fn with_sha256(mut self, enabled: bool) -> Self {
        self.compute_sha256 = enabled;
        self
    }

    /// Hashes an in-memory slice.
    pub fn hash_bytes(&self, data: &[u8]) -> ContentHash {
        let mut state = HashState::new(self);
        state.update(data);
        state.finalize()
    }

    /// Hashes everything a reader yields, streaming in 64 KiB reads.
    pub fn hash_reader<R: Read + ?Sized>(&self, reader: &mut R) -> io::Result<ContentHash> {
        let mut state = HashState::new(self);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.update(&buffer[..read]);
        }
        Ok(state.finalize())
    }
}

struct HashState {
    blake3: blake3::Hasher,
    #[cfg(feature = "md-5")]
    md5: Option<md5::Md5>,
    #[cfg(feature = "sha2")]
    sha256: Option<sha2::Sha256>,
}

impl HashState {
    #[cfg_attr(not(any(feature = "md-5", feature = "sha2")), allow(unused_variables))]
    fn new(config: &ContentHasher) -> Self {
        Self {
            blake3: blake3::Hasher::new(),
            #[cfg(feature = "md-5")]
            md5: config
                .compute_md5
                .then(<md5::Md5 as md5::Digest>::new),
            #[cfg(feature = "sha2")]
            sha256: config
                .compute_sha256
                .then(<sha2::Sha256 as sha2::Digest>::new),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        self.blake3.update(chunk);
        #[cfg(feature = "md-5")]
        if let Some(h) = self.md5.as_mut() {
            md5::Digest::update(h, chunk);
        }
        #[cfg(feature = "sha2")]
        if let Some(h) = self.sha256.as_mut() {
            sha2::Digest::update(h, chunk);
        }
    }

    fn finalize(self) -> ContentHash {
        #[allow(unused_mut)]
        let mut hash = ContentHash::new(self.blake3.finalize().to_hex().to_string());
        #[cfg(feature = "md-5")]
        {
            hash.md5 = self
                .md5
                .map(|h| format!("{:x}", md5::Digest::finalize(h)));
        }
        #[cfg(feature = "sha2")]
        {
            hash.sha256 = self
                .sha256
                .map(|h| format!("{:x}", sha2::Digest::finalize(h)));
        }
        hash
    }
}
