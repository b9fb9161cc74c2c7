use std::ops::Range;

use crate::models::Piece;

/// Calculate the number of pieces for a given total size and piece length
pub fn calculate_num_pieces(total_size: u64, piece_length: u64) -> u64 {
    total_size.div_ceil(piece_length)
}

/// Geometry of piece `index`; the last piece may be short.
pub fn piece_at(index: u32, piece_length: u64, total_size: u64) -> Option<Piece> {
    let offset = u64::from(index).checked_mul(piece_length)?;
    if offset >= total_size {
        return None;
    }
    let length = piece_length.min(total_size - offset);
    Some(Piece::new(index, offset, length))
}

/// Half-open range of piece indices overlapping `[start, start + length)`.
///
/// `None` if an index does not fit in `u32`.
pub fn pieces_overlapping(start: u64, length: u64, piece_length: u64) -> Option<Range<u32>> {
    let begin = u32::try_from(start / piece_length).ok()?;
    if length == 0 {
        return Some(begin..begin);
    }
    let end = start.checked_add(length)?.div_ceil(piece_length);
    Some(begin..u32::try_from(end).ok()?)
}
