use parking_lot::RwLock;
use std::collections::HashMap;

use super::PieceCompletion;
use crate::error::CompletionError;
use crate::models::PieceKey;

/// Process-memory completion store; forgets everything on exit.
#[derive(Debug, Default)]
pub struct MemoryCompletion {
    pieces: RwLock<HashMap<PieceKey, bool>>,
}

impl MemoryCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pieces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.read().is_empty()
    }
}

impl PieceCompletion for MemoryCompletion {
    fn get(&self, key: PieceKey) -> Result<bool, CompletionError> {
        Ok(self.pieces.read().get(&key).copied().unwrap_or(false))
    }

    fn set(&self, key: PieceKey, complete: bool) -> Result<(), CompletionError> {
        self.pieces.write().insert(key, complete);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InfoHash;
    use std::sync::Arc;
    use std::thread;

    fn key(index: u32) -> PieceKey {
        PieceKey {
            info_hash: InfoHash([7; 20]),
            index,
        }
    }

    #[test]
    fn test_missing_is_incomplete() {
        let store = MemoryCompletion::new();
        assert!(!store.get(key(0)).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_get() {
        let store = MemoryCompletion::new();
        store.set(key(3), true).unwrap();
        assert!(store.get(key(3)).unwrap());
        assert!(!store.get(key(4)).unwrap());
        store.set(key(3), false).unwrap();
        assert!(!store.get(key(3)).unwrap());

        let other = PieceKey {
            info_hash: InfoHash([8; 20]),
            index: 3,
        };
        store.set(key(3), true).unwrap();
        assert!(!store.get(other).unwrap());
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(MemoryCompletion::new());
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        let k = key(t * 100 + i);
                        store.set(k, true).unwrap();
                        assert!(store.get(k).unwrap());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 800);
    }
}
