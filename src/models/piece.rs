use std::fmt;
use std::str::FromStr;

/// SHA-1 of the bencoded info dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InfoHash(pub [u8; 20]);

impl InfoHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for InfoHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Key of the completion store: one entry per (torrent, piece)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceKey {
    pub info_hash: InfoHash,
    pub index: u32,
}

/// Geometry of a single piece in the torrent's linear byte space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub index: u32,
    pub offset: u64,
    pub length: u64,
}

impl Piece {
    pub fn new(index: u32, offset: u64, length: u64) -> Self {
        Self {
            index,
            offset,
            length,
        }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Completion state of a piece.
///
/// `ok == false` means the tracker itself failed; callers must treat that as
/// not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Completion {
    pub complete: bool,
    pub ok: bool,
}

impl Completion {
    /// The state a piece is in once its bytes are written and verified.
    pub const VERIFIED: Completion = Completion {
        complete: true,
        ok: true,
    };

    pub fn known(complete: bool) -> Self {
        Self { complete, ok: true }
    }

    pub fn unknown() -> Self {
        Self {
            complete: false,
            ok: false,
        }
    }

    pub fn is_verified(&self) -> bool {
        *self == Self::VERIFIED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_hash_hex() {
        let hash = InfoHash([0xab; 20]);
        let hex = hash.to_string();
        assert_eq!(hex.len(), 40);
        assert_eq!(hex.parse::<InfoHash>().unwrap(), hash);
        assert!("abc".parse::<InfoHash>().is_err());
    }

    #[test]
    fn test_completion_sentinel() {
        assert!(Completion::known(true).is_verified());
        assert!(!Completion::known(false).is_verified());
        assert!(!Completion::unknown().is_verified());
        // A failed lookup never counts as complete, even if the flag is set.
        assert!(!Completion { complete: true, ok: false }.is_verified());
    }
}
