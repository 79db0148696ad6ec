//! Chunked streaming scan of files.
//!
//! Files are never submitted whole. The scanner opens the file and an engine
//! stream, then feeds fixed-size blocks until EOF or until a chunk yields a
//! decisive verdict. Both handles are scoped to [`StreamingFileScanner::scan`]
//! and released on every exit path.

use crate::core::{
    ContentHash, ContentHasher, ContentType, DetectionEngine, EngineContext, FileType, ResultBuilder,
    ScanContext, ScanResult, Verdict,
};
use crate::scan::archive;

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Scans one file through the engine's streaming primitive.
#[derive(Debug)]
pub struct StreamingFileScanner<'a> {
    engine: &'a dyn EngineContext,
    path: &'a Path,
    block_size: usize,
    accept_encrypted_zip: bool,
    file_type: FileType,
    hasher: Option<&'a ContentHasher>,
    detection_engine: Option<DetectionEngine>,
}

impl<'a> StreamingFileScanner<'a> {
    /// Creates a scanner; `block_size` is clamped to at least one byte.
    pub fn new(
        engine: &'a dyn EngineContext,
        path: &'a Path,
        block_size: usize,
        accept_encrypted_zip: bool,
    ) -> Self {
        Self {
            engine,
            path,
            block_size: block_size.max(1),
            accept_encrypted_zip,
            file_type: FileType::Unknown,
            hasher: None,
            detection_engine: None,
        }
    }

    /// Sets the file type found by the signature reader.
    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    /// Hashes the file before streaming it.
    pub fn with_hasher(mut self, hasher: Option<&'a ContentHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Records the detection engine on the result.
    pub fn with_detection_engine(mut self, engine: Option<DetectionEngine>) -> Self {
        self.detection_engine = engine;
        self
    }

    /// Runs the scan. Failures come back as `ApplicationError` results.
    pub fn scan(&self) -> ScanResult {
        let fallback = self.builder(self.context(0, None));

        let mut file = match File::open(self.path) {
            Ok(file) => file,
            Err(e) => return self.io_failure(&fallback, "opening", &e),
        };
        let context = match self.describe(&mut file) {
            Ok(context) => context,
            Err(e) => return self.io_failure(&fallback, "reading", &e),
        };
        let builder = self.builder(context);

        if self.file_type == FileType::Zip {
            let encrypted = archive::has_encrypted_entry(&mut file)
                .and_then(|encrypted| file.seek(SeekFrom::Start(0)).map(|_| encrypted));
            match encrypted {
                Ok(false) => {}
                Ok(true) if self.accept_encrypted_zip => {
                    tracing::warn!(
                        path = %self.path.display(),
                        "Archive contains encrypted entries, scanning best-effort"
                    );
                }
                Ok(true) => {
                    return builder.to_blocked_result(format!(
                        "Archive {} contains encrypted entries",
                        self.path.display()
                    ));
                }
                Err(e) => return self.io_failure(&builder, "inspecting", &e),
            }
        }

        self.stream(&mut file, &builder)
    }

    fn context(&self, length: u64, hash: Option<ContentHash>) -> ScanContext {
        ScanContext::new(
            self.engine.name(),
            self.path.display().to_string(),
            ContentType::File,
            length,
        )
        .with_file_type(self.file_type)
        .with_content_hash(hash)
    }

    fn builder(&self, context: ScanContext) -> ResultBuilder {
        ResultBuilder::new(context).with_engine(self.detection_engine.clone())
    }

    /// Reads length and hash, leaving the file positioned at the start.
    fn describe(&self, file: &mut File) -> io::Result<ScanContext> {
        let length = file.metadata()?.len();
        let hash = match self.hasher {
            Some(hasher) => {
                let hash = hasher.hash_reader(file)?;
                file.seek(SeekFrom::Start(0))?;
                Some(hash)
            }
            None => None,
        };
        Ok(self.context(length, hash))
    }

    /// Feeds `reader` to a fresh engine stream in `block_size` chunks.
    fn stream<R: Read>(&self, reader: &mut R, builder: &ResultBuilder) -> ScanResult {
        let context = builder.context();
        let mut stream = match self
            .engine
            .open_stream(&context.content_name, context.content_length)
        {
            Ok(stream) => stream,
            Err(e) => return builder.to_error_result(&e),
        };

        // The metadata length may be stale, so blocks are always full size.
        let mut block = vec![0u8; self.block_size];
        let mut offset = 0u64;
        loop {
            let filled = match read_block(reader, &mut block) {
                Ok(filled) => filled,
                Err(e) => return self.io_failure(builder, "reading", &e),
            };
            if filled == 0 {
                break;
            }

            let code = match stream.scan_chunk(&block[..filled], offset) {
                Ok(code) => code,
                Err(e) => return builder.to_error_result(&e),
            };
            offset += filled as u64;

            if Verdict::from_result_code(code).is_decisive() {
                tracing::debug!(
                    path = %self.path.display(),
                    offset,
                    result_code = code,
                    "Decisive verdict, stopping stream"
                );
                return builder.to_result(code);
            }
            if filled < block.len() {
                break;
            }
        }

        builder.to_outcome_result(stream.finish())
    }

    fn io_failure(&self, builder: &ResultBuilder, action: &str, error: &io::Error) -> ScanResult {
        tracing::warn!(
            path = %self.path.display(),
            error = %error,
            "I/O failure while {action} file"
        );
        builder.to_local_result(
            Verdict::ApplicationError,
            format!("I/O error while {action} {}: {error}", self.path.display()),
        )
    }
}

/// Fills `block` from `reader`, returning fewer bytes only at EOF.
fn read_block<R: Read>(reader: &mut R, block: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < block.len() {
        match reader.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
