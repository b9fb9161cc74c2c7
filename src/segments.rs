//! Mapping from the torrent's linear byte space onto its files.
//!
//! A [`SegmentIndex`] is built once from the declared file lengths. Any linear
//! [`Extent`] can then be decomposed with [`SegmentIndex::locate`] into an
//! ordered sequence of per-file [`Segment`]s.

use crate::error::StorageError;

/// A `(start, length)` byte range, either in linear torrent space or in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub start: u64,
    pub length: u64,
}

impl Extent {
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Exclusive end, saturating so that absurd requests stay out of range.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }
}

/// Part of a located extent that falls inside one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub file_index: usize,
    /// Extent relative to the start of the file
    pub extent: Extent,
}

/// Immutable prefix-sum index over the file list
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    lengths: Vec<u64>,
    /// Cumulative end offset of each file
    ends: Vec<u64>,
}

impl SegmentIndex {
    /// Build from file lengths in declaration order.
    pub fn build<I>(lengths: I) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = u64>,
    {
        let lengths: Vec<u64> = lengths.into_iter().collect();
        let mut ends = Vec::with_capacity(lengths.len());
        let mut offset = 0u64;
        for &len in &lengths {
            offset = offset.checked_add(len).ok_or(StorageError::Overflow)?;
            ends.push(offset);
        }
        Ok(Self { lengths, ends })
    }

    pub fn total_length(&self) -> u64 {
        self.ends.last().copied().unwrap_or(0)
    }

    pub fn file_count(&self) -> usize {
        self.lengths.len()
    }

    /// Linear extent occupied by file `index`
    pub fn file_extent(&self, index: usize) -> Extent {
        let length = self.lengths[index];
        Extent::new(self.ends[index] - length, length)
    }

    /// Decompose `extent` into per-file segments in ascending linear order.
    ///
    /// The returned sequence can be cloned to restart it. Stopping early is
    /// just breaking out of the loop.
    pub fn locate(&self, extent: Extent) -> Locate<'_> {
        let requested_end = extent.end();
        let end = requested_end.min(self.total_length());
        // First file whose end lies beyond the start; an offset exactly at a
        // file's end belongs to the next file, and empty files are skipped.
        let next_file = self.ends.partition_point(|&e| e <= extent.start);
        Locate {
            index: self,
            next_file,
            pos: extent.start,
            end,
            covered: extent
                .start
                .checked_add(extent.length)
                .is_some_and(|e| e <= self.total_length()),
        }
    }
}

/// Finite, restartable sequence of segments produced by [`SegmentIndex::locate`]
#[derive(Debug, Clone)]
pub struct Locate<'a> {
    index: &'a SegmentIndex,
    next_file: usize,
    pos: u64,
    end: u64,
    covered: bool,
}

impl Locate<'_> {
    /// Whether iterating to the end visits the whole requested extent.
    /// False only if the extent runs past the last declared file.
    pub fn is_covered(&self) -> bool {
        self.covered
    }
}

impl Iterator for Locate<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        while self.pos < self.end && self.next_file < self.index.file_count() {
            let i = self.next_file;
            self.next_file += 1;
            let file = self.index.file_extent(i);
            if file.end() <= self.pos {
                continue;
            }
            let take = self.end.min(file.end()) - self.pos;
            let segment = Segment {
                file_index: i,
                extent: Extent::new(self.pos - file.start, take),
            };
            self.pos += take;
            return Some(segment);
        }
        None
    }
}
