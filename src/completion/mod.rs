//! Piece completion stores.
//!
//! The storage layer depends only on [`PieceCompletion`]; which store backs a
//! torrent is chosen by whoever builds the [`FileStorage`](crate::storage::FileStorage).

mod json;
mod memory;

pub use json::JsonFileCompletion;
pub use memory::MemoryCompletion;

use crate::error::CompletionError;
use crate::models::PieceKey;

/// Maps `(info-hash, piece-index)` to a completion flag.
///
/// Implementations are shared between concurrent piece callbacks and must
/// synchronize internally.
pub trait PieceCompletion: Send + Sync {
    /// A missing entry is `Ok(false)`.
    fn get(&self, key: PieceKey) -> Result<bool, CompletionError>;

    fn set(&self, key: PieceKey, complete: bool) -> Result<(), CompletionError>;

    fn close(&self) -> Result<(), CompletionError> {
        Ok(())
    }
}
