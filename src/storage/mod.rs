//! File-backed torrent storage.
//!
//! A [`FileStorage`] is the client-wide configuration: a base directory, the
//! completion store every torrent shares, and an optional file filter that
//! decides which files a [`TorrentStorage::flush`] makes durable.
//!
//! ```no_run
//! use std::sync::Arc;
//! use torsift::completion::MemoryCompletion;
//! use torsift::models::Torrent;
//! use torsift::storage::FileStorage;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = Torrent::from_bytes(&std::fs::read("book.torrent")?)?;
//! let storage = FileStorage::new("./downloads", Arc::new(MemoryCompletion::new()))
//!     .with_file_filter(|path| path.ends_with("book.epub"));
//! let opened = storage.open_torrent(&torrent.info, torrent.info_hash)?;
//!
//! let piece = opened.piece(0)?;
//! piece.write_at(&[0u8; 16], 0)?;
//! piece.mark_complete()?;
//! opened.flush()?;
//! # Ok(())
//! # }
//! ```

mod io;
mod path;
mod piece;

pub use path::{is_sub_path, join_lexical};
pub use piece::PieceHandle;

use std::collections::BTreeSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::completion::PieceCompletion;
use crate::error::StorageError;
use crate::events::{PieceEventBus, Subscription};
use crate::models::{Completion, Info, InfoHash, Piece, TorrentFile};
use crate::piece::{calculate_num_pieces, piece_at, pieces_overlapping};
use crate::segments::{Extent, SegmentIndex};
use crate::waiter::{PendingSet, PieceStates};

/// Predicate over sanitized file paths
pub type FileFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Client-wide storage configuration
pub struct FileStorage {
    base_dir: PathBuf,
    completion: Arc<dyn PieceCompletion>,
    file_filter: Option<FileFilter>,
}

impl FileStorage {
    /// Create a storage rooted at `base_dir` backed by `completion`.
    pub fn new(base_dir: impl Into<PathBuf>, completion: Arc<dyn PieceCompletion>) -> Self {
        Self {
            base_dir: base_dir.into(),
            completion,
            file_filter: None,
        }
    }

    /// Only files matching `filter` are made durable by [`TorrentStorage::flush`].
    pub fn with_file_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.file_filter = Some(Arc::new(filter));
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// On-disk path of a file: `base / name / components...`
    pub fn file_path(&self, info: &Info, components: &[String]) -> PathBuf {
        let parts = info
            .best_name()
            .into_iter()
            .chain(components.iter().map(String::as_str));
        join_lexical(&self.base_dir, parts)
    }

    pub fn open_torrent(
        &self,
        info: &Info,
        info_hash: InfoHash,
    ) -> Result<TorrentStorage, StorageError> {
        let files = info
            .upverted_files()
            .into_iter()
            .map(|entry| TorrentFile {
                path: self.file_path(info, &entry.path),
                length: entry.length,
            })
            .collect();
        TorrentStorage::open(
            &self.base_dir,
            files,
            info.piece_length,
            info_hash,
            Arc::clone(&self.completion),
            self.file_filter.clone(),
        )
    }

    /// Release the completion store.
    pub fn close(&self) -> Result<(), StorageError> {
        self.completion.close()?;
        Ok(())
    }
}

/// Storage of one opened torrent: its files, segment index and completion view
pub struct TorrentStorage {
    files: Vec<TorrentFile>,
    index: SegmentIndex,
    info_hash: InfoHash,
    piece_length: u64,
    piece_count: u32,
    /// Pieces overlapping each file, in file order
    file_pieces: Vec<Range<u32>>,
    completion: Arc<dyn PieceCompletion>,
    file_filter: Option<FileFilter>,
    events: PieceEventBus,
}

impl TorrentStorage {
    /// Open a torrent whose file paths are already computed.
    ///
    /// Every path must lie below `base_dir`. Zero-length files are created
    /// right away since no piece will ever write them.
    pub fn open(
        base_dir: &Path,
        files: Vec<TorrentFile>,
        piece_length: u64,
        info_hash: InfoHash,
        completion: Arc<dyn PieceCompletion>,
        file_filter: Option<FileFilter>,
    ) -> Result<Self, StorageError> {
        if piece_length == 0 {
            return Err(StorageError::ZeroPieceLength);
        }
        for (i, file) in files.iter().enumerate() {
            if !is_sub_path(base_dir, &file.path) {
                return Err(StorageError::PathEscape {
                    index: i,
                    path: file.path.clone(),
                    base: base_dir.to_path_buf(),
                });
            }
        }
        for file in files.iter().filter(|f| f.length == 0) {
            io::create_zero_length_file(&file.path)?;
        }
        let index = SegmentIndex::build(files.iter().map(|f| f.length))?;
        let num_pieces = calculate_num_pieces(index.total_length(), piece_length);
        let piece_count =
            u32::try_from(num_pieces).map_err(|_| StorageError::TooManyPieces(num_pieces))?;
        let file_pieces = (0..files.len())
            .map(|i| {
                let extent = index.file_extent(i);
                pieces_overlapping(extent.start, extent.length, piece_length)
                    .ok_or(StorageError::TooManyPieces(num_pieces))
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            %info_hash,
            files = files.len(),
            total = index.total_length(),
            "opened torrent storage"
        );

        Ok(Self {
            files,
            index,
            info_hash,
            piece_length,
            piece_count,
            file_pieces,
            completion,
            file_filter,
            events: PieceEventBus::new(),
        })
    }

    pub fn files(&self) -> &[TorrentFile] {
        &self.files
    }

    pub fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    pub fn segment_index(&self) -> &SegmentIndex {
        &self.index
    }

    pub fn total_length(&self) -> u64 {
        self.index.total_length()
    }

    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    pub fn piece_count(&self) -> u32 {
        self.piece_count
    }

    /// Feed of piece state changes; the engine may publish into it as well.
    pub fn events(&self) -> &PieceEventBus {
        &self.events
    }

    /// Read `buf.len()` bytes of the torrent's linear space at `offset`.
    ///
    /// Bytes that are not on disk yet read as zero. A file that is short in
    /// the middle of the range is fine as long as later files fill the rest;
    /// only when the tail of the buffer stays unfilled does the call fail
    /// with [`StorageError::Incomplete`]. A range running past the last file
    /// fails with [`StorageError::EndOfData`].
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, StorageError> {
        let located = self.index.locate(Extent::new(offset, buf.len() as u64));
        let covered = located.is_covered();

        // End of the last byte actually read from disk
        let mut filled = 0;
        let mut pos = 0;
        for seg in located {
            let len = seg.extent.length as usize;
            let file = &self.files[seg.file_index];
            let dst = &mut buf[pos..pos + len];
            let read = io::read_file_at(&file.path, file.length, dst, seg.extent.start)?;
            if read < len {
                dst[read..].fill(0);
            }
            if read > 0 {
                filled = pos + read;
            }
            pos += len;
        }
        buf[pos..].fill(0);

        if !covered {
            return Err(StorageError::EndOfData {
                offset,
                len: buf.len() as u64,
                limit: self.total_length(),
            });
        }
        if filled < buf.len() {
            return Err(StorageError::Incomplete {
                offset,
                read: filled,
                wanted: buf.len(),
            });
        }
        Ok(filled)
    }

    /// Write `data` into the torrent's linear space at `offset`.
    ///
    /// The first failing file aborts the rest. Callers must not issue
    /// overlapping writes concurrently; disjoint ranges of one file are fine.
    pub fn write_at(&self, data: &[u8], offset: u64) -> Result<usize, StorageError> {
        let located = self.index.locate(Extent::new(offset, data.len() as u64));
        if !located.is_covered() {
            return Err(StorageError::EndOfData {
                offset,
                len: data.len() as u64,
                limit: self.total_length(),
            });
        }

        let mut n = 0;
        for seg in located {
            let file = &self.files[seg.file_index];
            let len = seg.extent.length as usize;
            trace!(file = %file.path.display(), at = seg.extent.start, len, "write segment");
            n += io::write_file_at(&file.path, &data[n..n + len], seg.extent.start)?;
        }
        Ok(n)
    }

    /// Handle for piece `index` of this torrent
    pub fn piece(&self, index: u32) -> Result<PieceHandle<'_>, StorageError> {
        let piece = piece_at(index, self.piece_length, self.total_length())
            .ok_or(StorageError::InvalidPieceIndex(index))?;
        Ok(PieceHandle::new(self, piece))
    }

    /// Handle for an engine-supplied piece descriptor.
    pub fn piece_at(&self, piece: Piece) -> Result<PieceHandle<'_>, StorageError> {
        if !self.index.locate(Extent::new(piece.offset, piece.length)).is_covered() {
            return Err(StorageError::Geometry {
                index: piece.index,
                start: piece.offset,
                len: piece.length,
            });
        }
        Ok(PieceHandle::new(self, piece))
    }

    /// Fsync the files selected by the configured filter (all files if none).
    pub fn flush(&self) -> Result<(), StorageError> {
        match &self.file_filter {
            Some(filter) => self.flush_with(Some(filter.as_ref() as &dyn Fn(&Path) -> bool)),
            None => self.flush_with(None),
        }
    }

    /// Fsync every file for which `filter` holds, in declaration order.
    ///
    /// Filtered-out files are not opened or created. The first error stops
    /// the pass; files already synced stay synced.
    pub fn flush_with(&self, filter: Option<&dyn Fn(&Path) -> bool>) -> Result<(), StorageError> {
        for file in &self.files {
            if let Some(filter) = filter {
                if !filter(&file.path) {
                    debug!(path = %file.path.display(), "skipping unwanted file");
                    continue;
                }
            }
            io::fsync_file(&file.path)?;
        }
        Ok(())
    }

    /// Pieces overlapping file `file_index`
    pub fn file_piece_range(&self, file_index: usize) -> Range<u32> {
        self.file_pieces[file_index].clone()
    }

    /// Every piece overlapping a file whose path satisfies `filter`
    pub fn wanted_pieces<F>(&self, filter: F) -> PendingSet
    where
        F: Fn(&Path) -> bool,
    {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| filter(&f.path))
            .flat_map(|(i, _)| self.file_piece_range(i))
            .collect::<BTreeSet<u32>>()
    }

    /// Per-torrent close; the shared completion store stays open.
    pub fn close(&self) -> Result<(), StorageError> {
        self.events.close();
        Ok(())
    }
}

impl PieceStates for TorrentStorage {
    fn piece_completion(&self, index: u32) -> Completion {
        match self.piece(index) {
            Ok(piece) => piece.completion(),
            Err(_) => Completion::unknown(),
        }
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}
