//! # torsift
//!
//! Selective-download storage for BitTorrent clients.
//!
//! The crate maps a torrent's linear piece space onto its files on disk,
//! tracks which pieces are verified complete, and lets a caller wait for and
//! persist only the files it actually wants. The torrent engine (peers,
//! scheduling, hash checks) lives elsewhere and talks to this crate through
//! [`storage::TorrentStorage`] and its [`storage::PieceHandle`]s.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use torsift::completion::JsonFileCompletion;
//! use torsift::models::Torrent;
//! use torsift::storage::FileStorage;
//! use torsift::waiter::{wait_for_pieces, WaitOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = Torrent::from_bytes(&std::fs::read("archive.torrent")?)?;
//! let dir = std::path::Path::new("downloads");
//! let completion = Arc::new(JsonFileCompletion::open_in_dir(dir)?);
//! let storage = FileStorage::new(dir, completion)
//!     .with_file_filter(|p| p.extension().is_some_and(|e| e == "pdf"));
//! let opened = storage.open_torrent(&torrent.info, torrent.info_hash)?;
//!
//! let wanted = opened.wanted_pieces(|p| p.extension().is_some_and(|e| e == "pdf"));
//! // ... hand `opened` to the engine, which writes pieces and marks them ...
//! let outcome = wait_for_pieces(&opened, wanted, WaitOptions::default());
//! if outcome.is_completed() {
//!     opened.flush()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod piece;
pub mod segments;
pub mod storage;
pub mod waiter;

// Re-export main types for convenience
pub use completion::{JsonFileCompletion, MemoryCompletion, PieceCompletion};
pub use error::{CompletionError, MetainfoError, StorageError};
pub use models::{Completion, InfoHash, Piece, PieceKey, Torrent};
pub use segments::{Extent, SegmentIndex};
pub use storage::{FileStorage, PieceHandle, TorrentStorage};
pub use waiter::{PendingPieceWaiter, PendingSet, WaitOptions, WaitOutcome, wait_for_pieces};
