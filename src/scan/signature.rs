//! Cheap, local pre-checks on a file path.
//!
//! `FileSignatureReader` answers three questions before any engine call:
//! does the file exist, is it blocked outright, and what kind of file is
//! it. Blocking is a policy decision (extension blocklist) or, on Windows,
//! the OS refusing to open a file that real-time protection already flagged.
//!
//! # Invariants
//! - No engine primitive is ever invoked here.
//! - The file handle opened for sniffing lives only as long as the reader.

use crate::core::FileType;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Bytes read for magic sniffing; enough for the ustar marker at 257.
pub const HEADER_LEN: usize = 512;

/// `ERROR_VIRUS_INFECTED`.
#[cfg(windows)]
const ERROR_VIRUS_INFECTED: i32 = 225;

/// `ERROR_VIRUS_DELETED`.
#[cfg(windows)]
const ERROR_VIRUS_DELETED: i32 = 226;

/// Pre-scan inspection of one file, scoped to a single `scan_file` call.
#[derive(Debug)]
pub struct FileSignatureReader<'a> {
    path: &'a Path,
    exists: bool,
    extension_blocked: bool,
    open_blocked: bool,
    file_type: FileType,
}

impl<'a> FileSignatureReader<'a> {
    /// Inspects `path` against the given extension blocklist.
    ///
    /// Blocklist entries match case-insensitively, with or without a
    /// leading dot.
    pub fn new(path: &'a Path, blocked_extensions: &[String]) -> Self {
        let exists = path.is_file();
        let mut reader = Self {
            path,
            exists,
            extension_blocked: false,
            open_blocked: false,
            file_type: FileType::Unknown,
        };
        if !exists {
            return reader;
        }

        reader.extension_blocked = is_extension_blocked(path, blocked_extensions);
        if reader.extension_blocked {
            return reader;
        }

        match read_header(path) {
            Ok(header) => {
                reader.file_type = sniff_file_type(&header).unwrap_or_else(|| file_type_from_path(path));
            }
            Err(e) if is_blocked_by_os(&e) => reader.open_blocked = true,
            Err(e) => {
                // The streaming scanner reports unreadable files.
                tracing::debug!(path = %path.display(), error = %e, "Could not read file header");
                reader.file_type = file_type_from_path(path);
            }
        }
        reader
    }

    /// Returns the inspected path.
    pub fn path(&self) -> &Path {
        self.path
    }

    /// Returns `true` if the path is an existing regular file.
    pub fn file_exists(&self) -> bool {
        self.exists
    }

    /// Returns `true` if the file must not be scanned.
    pub fn is_file_blocked(&self) -> bool {
        self.extension_blocked || self.open_blocked
    }

    /// Returns why the file is blocked, if it is.
    pub fn blocked_reason(&self) -> Option<String> {
        if self.extension_blocked {
            Some(format!(
                "File extension of {} is blocked",
                self.path.display()
            ))
        } else if self.open_blocked {
            Some(format!(
                "Access to {} was denied because it contains a virus",
                self.path.display()
            ))
        } else {
            None
        }
    }

    /// Returns the sniffed file type.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }
}

fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64).read_to_end(&mut header)?;
    Ok(header)
}

#[cfg(windows)]
fn is_blocked_by_os(error: &io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(ERROR_VIRUS_INFECTED) | Some(ERROR_VIRUS_DELETED)
    )
}

#[cfg(not(windows))]
fn is_blocked_by_os(_error: &io::Error) -> bool {
    false
}

fn is_extension_blocked(path: &Path, blocked: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    blocked
        .iter()
        .map(|b| b.trim_start_matches('.'))
        .any(|b| !b.is_empty() && b.eq_ignore_ascii_case(ext))
}

/// Classifies a file by its leading bytes.
pub fn sniff_file_type(header: &[u8]) -> Option<FileType> {
    if header.len() >= 4
        && header[0] == b'P'
        && header[1] == b'K'
        && matches!((header[2], header[3]), (3, 4) | (5, 6) | (7, 8))
    {
        return Some(FileType::Zip);
    }
    if header.starts_with(&[0x1F, 0x8B]) {
        return Some(FileType::Gzip);
    }
    if header.starts_with(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]) {
        return Some(FileType::SevenZip);
    }
    if header.starts_with(b"Rar!\x1A\x07") {
        return Some(FileType::Rar);
    }
    if header.len() >= 262 && &header[257..262] == b"ustar" {
        return Some(FileType::Tar);
    }
    None
}

/// Classifies a file by its name alone.
pub fn file_type_from_path(path: &Path) -> FileType {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return FileType::Unknown;
    };
    let name = name.to_ascii_lowercase();
    if name.ends_with(".zip") {
        FileType::Zip
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") || name.ends_with(".gz") {
        FileType::Gzip
    } else if name.ends_with(".tar") {
        FileType::Tar
    } else if name.ends_with(".7z") {
        FileType::SevenZip
    } else if name.ends_with(".rar") {
        FileType::Rar
    } else {
        FileType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.bin");
        let reader = FileSignatureReader::new(&path, &[]);

        assert!(!reader.file_exists());
        assert!(!reader.is_file_blocked());
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        let reader = FileSignatureReader::new(dir.path(), &[]);
        assert!(!reader.file_exists());
    }

    #[test]
    fn test_blocked_extension_matches_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "setup.EXE", b"MZ");

        let reader = FileSignatureReader::new(&path, &[".exe".to_string()]);
        assert!(reader.file_exists());
        assert!(reader.is_file_blocked());
        assert!(reader.blocked_reason().unwrap().contains("setup.EXE"));

        let reader = FileSignatureReader::new(&path, &["dll".to_string()]);
        assert!(!reader.is_file_blocked());
        assert_eq!(reader.blocked_reason(), None);
    }

    #[test]
    fn test_sniffs_magic_before_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "archive.dat", b"PK\x03\x04rest-of-header");
        assert_eq!(FileSignatureReader::new(&path, &[]).file_type(), FileType::Zip);

        let path = write(&dir, "notes.zip", b"just text");
        assert_eq!(FileSignatureReader::new(&path, &[]).file_type(), FileType::Zip);

        let path = write(&dir, "notes.txt", b"just text");
        assert_eq!(FileSignatureReader::new(&path, &[]).file_type(), FileType::Unknown);
    }

    #[test]
    fn test_sniff_file_type() {
        assert_eq!(sniff_file_type(b"\x1F\x8B\x08"), Some(FileType::Gzip));
        assert_eq!(
            sniff_file_type(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C, 0, 4]),
            Some(FileType::SevenZip)
        );
        assert_eq!(sniff_file_type(b"Rar!\x1A\x07\x00"), Some(FileType::Rar));
        assert_eq!(sniff_file_type(b"PK\x01\x02"), None);
        assert_eq!(sniff_file_type(b""), None);

        let mut tar = vec![0u8; HEADER_LEN];
        tar[257..262].copy_from_slice(b"ustar");
        assert_eq!(sniff_file_type(&tar), Some(FileType::Tar));
    }

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(file_type_from_path(Path::new("a/b.TGZ")), FileType::Gzip);
        assert_eq!(file_type_from_path(Path::new("b.tar")), FileType::Tar);
        assert_eq!(file_type_from_path(Path::new("b.7z")), FileType::SevenZip);
        assert_eq!(file_type_from_path(Path::new("noext")), FileType::Unknown);
    }
}
