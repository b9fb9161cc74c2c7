//! Per-file positioned I/O. Every call opens and closes its own handle.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::StorageError;

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Read up to `buf.len()` bytes at `offset`, never past `file_len`.
///
/// A missing or short file is not an error: it yields fewer bytes.
pub fn read_file_at(path: &Path, file_len: u64, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let limit = file_len.saturating_sub(offset).min(buf.len() as u64) as usize;
    let buf = &mut buf[..limit];
    if buf.is_empty() {
        return Ok(0);
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut n = 0;
    while n < buf.len() {
        match file.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(read) => n += read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(n)
}

/// Write all of `data` at `offset`, creating the file and its parents.
pub fn write_file_at(path: &Path, data: &[u8], offset: u64) -> Result<usize, StorageError> {
    ensure_parent_dir(path)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.seek(SeekFrom::Start(offset))?;

    let mut n = 0;
    while n < data.len() {
        match file.write(&data[n..]) {
            Ok(0) => {
                return Err(StorageError::ShortWrite {
                    path: path.to_path_buf(),
                    written: n,
                    wanted: data.len(),
                });
            }
            Ok(written) => n += written,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(n)
}

/// Open (creating if missing) and fsync a file.
pub fn fsync_file(path: &Path) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.sync_all()
}

pub fn create_zero_length_file(path: &Path) -> io::Result<()> {
    ensure_parent_dir(path)?;
    File::create(path).map(drop)
}

/// Current on-disk size, `None` if the file cannot be stat'ed
pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|m| m.len())
}
