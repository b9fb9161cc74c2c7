mod file;
mod piece;
mod torrent;

pub use file::{FileEntry, TorrentFile};
pub use piece::{Completion, InfoHash, Piece, PieceKey};
pub use torrent::{Info, Torrent};
