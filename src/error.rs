use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file {index}: path {path:?} is not a sub path of {base:?}")]
    PathEscape {
        index: usize,
        path: PathBuf,
        base: PathBuf,
    },

    /// The requested range runs past the end of the torrent (or of the piece
    /// it was addressed through).
    #[error("end of data: range {offset}+{len} runs past {limit}")]
    EndOfData { offset: u64, len: u64, limit: u64 },

    #[error("invalid piece index: {0}")]
    InvalidPieceIndex(u32),

    #[error("piece length must be non-zero")]
    ZeroPieceLength,

    /// The range is inside the torrent but not all of it is on disk yet.
    #[error("incomplete read at {offset}: got {read} of {wanted} bytes")]
    Incomplete {
        offset: u64,
        read: usize,
        wanted: usize,
    },

    #[error("short write to {path:?}: wrote {written} of {wanted} bytes")]
    ShortWrite {
        path: PathBuf,
        written: usize,
        wanted: usize,
    },

    #[error("completion tracker: {0}")]
    Tracker(#[from] CompletionError),

    #[error("files do not cover piece {index} extent {start}+{len}")]
    Geometry { index: u32, start: u64, len: u64 },

    #[error("total torrent length overflows u64")]
    Overflow,

    #[error("{0} pieces do not fit a u32 piece index")]
    TooManyPieces(u64),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt completion store {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode completion store: {0}")]
    Encode(serde_json::Error),

    #[error("completion store is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum MetainfoError {
    #[error("bencode decode error: {0}")]
    Decode(#[from] serde_bencode::Error),

    #[error("torrent has no info dictionary")]
    MissingInfo,

    #[error("invalid piece length: {0}")]
    InvalidPieceLength(u64),

    #[error("info has neither `length` nor `files`")]
    MissingFiles,
}
