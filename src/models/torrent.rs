use serde::Deserialize;
use serde_bencode::value::Value;
use sha1::{Digest, Sha1};

use super::file::FileEntry;
use super::piece::{InfoHash, Piece};
use crate::error::MetainfoError;
use crate::piece::{calculate_num_pieces, piece_at};

/// Info dictionary for the torrent
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "piece length")]
    pub piece_length: u64,

    #[serde(default)]
    pub pieces: Option<serde_bytes::ByteBuf>,

    #[serde(default)]
    pub private: Option<u8>,

    // Multi-file mode
    #[serde(default)]
    pub files: Option<Vec<FileEntry>>,

    // Single-file mode
    #[serde(default)]
    pub length: Option<u64>,
}

/// Torrent metainfo structure as loaded from a `.torrent` file
#[derive(Debug, Clone)]
pub struct Torrent {
    pub announce: Option<String>,
    pub announce_list: Option<Vec<Vec<String>>>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub creation_date: Option<i64>,
    pub info: Info,
    pub info_hash: InfoHash,
}

#[derive(Deserialize)]
struct RawTorrent {
    #[serde(default)]
    announce: Option<String>,
    #[serde(rename = "announce-list", default)]
    announce_list: Option<Vec<Vec<String>>>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(rename = "created by", default)]
    created_by: Option<String>,
    #[serde(rename = "creation date", default)]
    creation_date: Option<i64>,
    #[serde(default)]
    info: Option<Value>,
}

impl Torrent {
    /// Decode a bencoded `.torrent`. The info hash is taken over the re-encoded
    /// info dictionary, which is canonical for well-formed metainfo.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetainfoError> {
        let raw: RawTorrent = serde_bencode::from_bytes(bytes)?;
        let info_value = raw.info.ok_or(MetainfoError::MissingInfo)?;
        let info_bytes = serde_bencode::to_bytes(&info_value)?;
        if info_bytes.is_empty() {
            return Err(MetainfoError::MissingInfo);
        }
        let info: Info = serde_bencode::from_bytes(&info_bytes)?;
        if info.piece_length == 0 {
            return Err(MetainfoError::InvalidPieceLength(0));
        }
        if info.files.is_none() && info.length.is_none() {
            return Err(MetainfoError::MissingFiles);
        }

        let info_hash = InfoHash(Sha1::digest(&info_bytes).into());

        Ok(Torrent {
            announce: raw.announce,
            announce_list: raw.announce_list,
            comment: raw.comment,
            created_by: raw.created_by,
            creation_date: raw.creation_date,
            info,
            info_hash,
        })
    }

    /// Sum of all file lengths, `None` on overflow
    pub fn total_size(&self) -> Option<u64> {
        self.info.total_length()
    }
}

impl Info {
    /// The torrent's name, if it has a usable one
    pub fn best_name(&self) -> Option<&str> {
        if self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }

    /// Files in declaration order; a single-file torrent becomes one entry
    /// with an empty path, stored under the torrent name.
    pub fn upverted_files(&self) -> Vec<FileEntry> {
        match (&self.files, self.length) {
            (Some(files), _) => files.clone(),
            (None, Some(length)) => vec![FileEntry {
                length,
                path: Vec::new(),
                attr: None,
            }],
            (None, None) => Vec::new(),
        }
    }

    pub fn is_multi_file(&self) -> bool {
        self.files.is_some()
    }

    /// Sum of all file lengths, `None` on overflow
    pub fn total_length(&self) -> Option<u64> {
        self.upverted_files()
            .iter()
            .try_fold(0u64, |acc, f| acc.checked_add(f.length))
    }

    pub fn piece_count(&self) -> u64 {
        calculate_num_pieces(self.total_length().unwrap_or(0), self.piece_length)
    }

    pub fn piece(&self, index: u32) -> Option<Piece> {
        piece_at(index, self.piece_length, self.total_length()?)
    }
}
