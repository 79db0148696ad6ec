//! ZIP metadata check for encrypted entries.
//!
//! # Invariants
//! - All sizes/offsets are untrusted and validated against the file length.
//! - Only metadata is read; entry payloads are never decompressed.
//! - Malformed metadata yields "no encrypted entries": the engine still
//!   scans the raw bytes, which is the conservative outcome.
//!
//! # Algorithm
//! - Locate the end-of-central-directory record in the file tail and walk
//!   the central directory, checking general purpose flag bit 0.
//! - Without a usable central directory (Zip64, truncated archives), walk
//!   local file headers from the start instead.

use std::io::{self, Read, Seek, SeekFrom};

const SIG_EOCD: u32 = 0x0605_4b50;
const SIG_CDFH: u32 = 0x0201_4b50;
const SIG_LFH: u32 = 0x0403_4b50;

const EOCD_MIN_LEN: usize = 22;
const EOCD_SEARCH_MAX: u64 = 66 * 1024; // 64 KiB comment + header margin
const CDFH_LEN: usize = 46;
const LFH_LEN: usize = 30;

/// Central directories larger than this are walked via local headers.
const CD_READ_MAX: u64 = 16 * 1024 * 1024;

const FLAG_ENCRYPTED: u16 = 0x0001;
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Returns `true` if any entry of the ZIP archive is encrypted.
///
/// The reader position is left unspecified; callers rewind before reuse.
pub fn has_encrypted_entry<R: Read + Seek>(reader: &mut R) -> io::Result<bool> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    match central_directory_bounds(reader, file_len)? {
        Some((offset, size)) => scan_central_directory(reader, offset, size),
        None => scan_local_headers(reader, file_len),
    }
}

fn le16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Finds `(offset, size)` of the central directory, if usable.
fn central_directory_bounds<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
) -> io::Result<Option<(u64, u64)>> {
    if file_len < EOCD_MIN_LEN as u64 {
        return Ok(None);
    }
    let tail_len = file_len.min(EOCD_SEARCH_MAX);
    reader.seek(SeekFrom::Start(file_len - tail_len))?;
    let mut tail = vec![0u8; tail_len as usize];
    reader.read_exact(&mut tail)?;

    let Some(pos) = (0..=tail.len() - EOCD_MIN_LEN)
        .rev()
        .find(|&i| le32(&tail, i) == SIG_EOCD)
    else {
        return Ok(None);
    };

    let cd_size = le32(&tail, pos + 12);
    let cd_offset = le32(&tail, pos + 16);
    if cd_size == u32::MAX || cd_offset == u32::MAX {
        // Zip64
        return Ok(None);
    }
    let (cd_offset, cd_size) = (u64::from(cd_offset), u64::from(cd_size));
    if cd_offset.saturating_add(cd_size) > file_len || cd_size > CD_READ_MAX {
        return Ok(None);
    }
    Ok(Some((cd_offset, cd_size)))
}

fn scan_central_directory<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    size: u64,
) -> io::Result<bool> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut cd = vec![0u8; size as usize];
    reader.read_exact(&mut cd)?;

    let mut pos = 0usize;
    while pos + CDFH_LEN <= cd.len() {
        if le32(&cd, pos) != SIG_CDFH {
            break;
        }
        if le16(&cd, pos + 8) & FLAG_ENCRYPTED != 0 {
            return Ok(true);
        }
        let name_len = le16(&cd, pos + 28) as usize;
        let extra_len = le16(&cd, pos + 30) as usize;
        let comment_len = le16(&cd, pos + 32) as usize;
        pos += CDFH_LEN + name_len + extra_len + comment_len;
    }
    Ok(false)
}

fn scan_local_headers<R: Read + Seek>(reader: &mut R, file_len: u64) -> io::Result<bool> {
    let mut offset = 0u64;
    let mut header = [0u8; LFH_LEN];
    while offset + LFH_LEN as u64 <= file_len {
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(&mut header)?;
        if le32(&header, 0) != SIG_LFH {
            break;
        }
        let flags = le16(&header, 6);
        if flags & FLAG_ENCRYPTED != 0 {
            return Ok(true);
        }
        let compressed = u64::from(le32(&header, 18));
        if flags & FLAG_DATA_DESCRIPTOR != 0 && compressed == 0 {
            // Payload length unknown without inflating; stop here.
            break;
        }
        let name_len = u64::from(le16(&header, 26));
        let extra_len = u64::from(le16(&header, 28));
        offset += LFH_LEN as u64 + name_len + extra_len + compressed;
    }
    Ok(false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Builds a minimal stored-entry ZIP archive.
    pub(crate) fn build_zip(entries: &[(&str, &[u8], bool)], with_central_directory: bool) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();
        for (name, data, encrypted) in entries {
            let flags: u16 = if *encrypted { FLAG_ENCRYPTED } else { 0 };
            let local_offset = out.len() as u32;

            out.extend_from_slice(&SIG_LFH.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes()); // version needed
            out.extend_from_slice(&flags.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // stored
            out.extend_from_slice(&[0u8; 8]); // time, date, crc
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(data);

            central.extend_from_slice(&SIG_CDFH.to_le_bytes());
            central.extend_from_slice(&20u16.to_le_bytes()); // version made by
            central.extend_from_slice(&20u16.to_le_bytes()); // version needed
            central.extend_from_slice(&flags.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&[0u8; 8]);
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&[0u8; 12]); // extra, comment, disk, attrs
            central.extend_from_slice(&local_offset.to_le_bytes());
            central.extend_from_slice(name.as_bytes());
        }
        if with_central_directory {
            let cd_offset = out.len() as u32;
            out.extend_from_slice(&central);
            out.extend_from_slice(&SIG_EOCD.to_le_bytes());
            out.extend_from_slice(&[0u8; 4]); // disk numbers
            out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
            out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
            out.extend_from_slice(&(central.len() as u32).to_le_bytes());
            out.extend_from_slice(&cd_offset.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_plain_archive() {
        let zip = build_zip(&[("a.txt", b"alpha", false), ("b.txt", b"beta", false)], true);
        assert!(!has_encrypted_entry(&mut Cursor::new(zip)).unwrap());
    }

    #[test]
    fn test_encrypted_entry_in_central_directory() {
        let zip = build_zip(&[("a.txt", b"alpha", false), ("secret.txt", b"xxxx", true)], true);
        assert!(has_encrypted_entry(&mut Cursor::new(zip)).unwrap());
    }

    #[test]
    fn test_local_header_fallback() {
        let zip = build_zip(&[("a.txt", b"alpha", false), ("secret.txt", b"xxxx", true)], false);
        assert!(has_encrypted_entry(&mut Cursor::new(zip)).unwrap());

        let zip = build_zip(&[("a.txt", b"alpha", false)], false);
        assert!(!has_encrypted_entry(&mut Cursor::new(zip)).unwrap());
    }

    #[test]
    fn test_garbage_is_not_encrypted() {
        assert!(!has_encrypted_entry(&mut Cursor::new(b"PK\x03\x04".to_vec())).unwrap());
        assert!(!has_encrypted_entry(&mut Cursor::new(Vec::new())).unwrap());
        assert!(!has_encrypted_entry(&mut Cursor::new(vec![0xAB; 4096])).unwrap());
    }
}
