use tracing::{error, warn};

use super::{TorrentStorage, io};
use crate::error::StorageError;
use crate::events::PieceStateChange;
use crate::models::{Completion, Piece, PieceKey};
use crate::segments::Extent;

/// View of one piece: reads and writes are relative to the piece start and
/// cannot leave `[piece.offset, piece.offset + piece.length)`.
pub struct PieceHandle<'a> {
    storage: &'a TorrentStorage,
    piece: Piece,
}

impl<'a> PieceHandle<'a> {
    pub(super) fn new(storage: &'a TorrentStorage, piece: Piece) -> Self {
        Self { storage, piece }
    }

    pub fn piece(&self) -> Piece {
        self.piece
    }

    pub fn key(&self) -> PieceKey {
        PieceKey {
            info_hash: self.storage.info_hash,
            index: self.piece.index,
        }
    }

    fn section_end(&self, off: u64, len: usize) -> StorageError {
        StorageError::EndOfData {
            offset: self.piece.offset.saturating_add(off),
            len: len as u64,
            limit: self.piece.end(),
        }
    }

    /// Read at `off` within the piece. A read running past the piece end
    /// fills what lies inside and then reports [`StorageError::EndOfData`].
    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize, StorageError> {
        let available = self.piece.length.saturating_sub(off);
        if (buf.len() as u64) <= available {
            return self.storage.read_at(buf, self.piece.offset + off);
        }
        let inside = available as usize;
        self.storage
            .read_at(&mut buf[..inside], self.piece.offset + off)?;
        buf[inside..].fill(0);
        Err(self.section_end(off, buf.len()))
    }

    /// The whole piece
    pub fn read(&self) -> Result<Vec<u8>, StorageError> {
        let mut buf = vec![0u8; self.piece.length as usize];
        self.read_at(&mut buf, 0)?;
        Ok(buf)
    }

    /// Write at `off` within the piece. Nothing is written if `data` would
    /// run past the piece end.
    pub fn write_at(&self, data: &[u8], off: u64) -> Result<usize, StorageError> {
        if off.saturating_add(data.len() as u64) > self.piece.length {
            return Err(self.section_end(off, data.len()));
        }
        self.storage.write_at(data, self.piece.offset + off)
    }

    /// Completion as recorded by the tracker, cross-checked against the files.
    ///
    /// A piece recorded complete whose files are now shorter than the piece
    /// needs is downgraded, and the downgrade is written back.
    pub fn completion(&self) -> Completion {
        let key = self.key();
        let complete = match self.storage.completion.get(key) {
            Ok(complete) => complete,
            Err(err) => {
                error!(%err, piece = key.index, "error getting piece completion");
                return Completion::unknown();
            }
        };

        if complete && !self.files_hold_piece() {
            warn!(
                piece = key.index,
                info_hash = %key.info_hash,
                "piece marked complete but its files are short, marking incomplete"
            );
            if let Err(err) = self.storage.completion.set(key, false) {
                error!(%err, piece = key.index, "error persisting completion downgrade");
            }
            self.publish(Completion::known(false));
            return Completion::known(false);
        }
        Completion::known(complete)
    }

    fn files_hold_piece(&self) -> bool {
        let located = self
            .storage
            .index
            .locate(Extent::new(self.piece.offset, self.piece.length));
        // Handles are only built for pieces the index covers.
        assert!(
            located.is_covered(),
            "files do not cover piece {} extent",
            self.piece.index
        );
        located.into_iter().all(|seg| {
            let file = &self.storage.files[seg.file_index];
            io::file_size(&file.path).is_some_and(|size| size >= seg.extent.end())
        })
    }

    pub fn mark_complete(&self) -> Result<(), StorageError> {
        self.storage.completion.set(self.key(), true)?;
        self.publish(Completion::known(true));
        Ok(())
    }

    pub fn mark_not_complete(&self) -> Result<(), StorageError> {
        self.storage.completion.set(self.key(), false)?;
        self.publish(Completion::known(false));
        Ok(())
    }

    fn publish(&self, completion: Completion) {
        self.storage.events.publish(PieceStateChange {
            index: self.piece.index,
            completion,
        });
    }
}
