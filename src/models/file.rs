use serde::Deserialize;
use std::path::PathBuf;

/// A file of an opened torrent, as laid out on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    /// Sanitized absolute path, always a descendant of the torrent's base directory
    pub path: PathBuf,
    /// File size in bytes
    pub length: u64,
}

/// File entry in multi-file mode
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileEntry {
    pub length: u64,
    pub path: Vec<String>,
    #[serde(default)]
    pub attr: Option<String>,
}

impl FileEntry {
    /// Padding files (BEP 47) carry no payload a user would select.
    pub fn is_padding(&self) -> bool {
        self.attr.as_deref().is_some_and(|a| a.contains('p'))
    }
}
