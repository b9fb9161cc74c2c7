use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::PieceCompletion;
use crate::config::{COMPLETION_FILE_NAME, COMPLETION_TMP_SUFFIX};
use crate::error::CompletionError;
use crate::models::{InfoHash, PieceKey};

/// On-disk layout: completed piece indices per hex info hash
#[derive(Debug, Default, Serialize, Deserialize)]
struct CompletionFile {
    version: u32,
    torrents: BTreeMap<String, BTreeSet<u32>>,
}

const FORMAT_VERSION: u32 = 1;

#[derive(Debug)]
struct State {
    torrents: BTreeMap<InfoHash, BTreeSet<u32>>,
    closed: bool,
}

/// Durable completion store kept as a JSON file in a data directory.
///
/// Every change rewrites the whole file through a temporary sibling and a
/// rename, so a crash leaves either the old or the new state behind.
#[derive(Debug)]
pub struct JsonFileCompletion {
    path: PathBuf,
    state: Mutex<State>,
}

impl JsonFileCompletion {
    /// Open (or start) the store in `dir`.
    pub fn open_in_dir(dir: &Path) -> Result<Self, CompletionError> {
        Self::open(dir.join(COMPLETION_FILE_NAME))
    }

    pub fn open(path: PathBuf) -> Result<Self, CompletionError> {
        let torrents = match fs::read(&path) {
            Ok(bytes) => {
                let file: CompletionFile =
                    serde_json::from_slice(&bytes).map_err(|source| CompletionError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                decode_torrents(&path, file)?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), torrents = torrents.len(), "opened completion store");
        Ok(Self {
            path,
            state: Mutex::new(State {
                torrents,
                closed: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &State) -> Result<(), CompletionError> {
        let file = CompletionFile {
            version: FORMAT_VERSION,
            torrents: state
                .torrents
                .iter()
                .filter(|(_, pieces)| !pieces.is_empty())
                .map(|(hash, pieces)| (hash.to_hex(), pieces.clone()))
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(CompletionError::Encode)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(COMPLETION_TMP_SUFFIX);
        let tmp_path = PathBuf::from(tmp_name);

        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(&bytes)?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn decode_torrents(
    path: &Path,
    file: CompletionFile,
) -> Result<BTreeMap<InfoHash, BTreeSet<u32>>, CompletionError> {
    let mut torrents = BTreeMap::new();
    for (hex, pieces) in file.torrents {
        let hash = hex.parse::<InfoHash>().map_err(|e| CompletionError::Corrupt {
            path: path.to_path_buf(),
            source: serde::de::Error::custom(format!("bad info hash {hex:?}: {e}")),
        })?;
        torrents.insert(hash, pieces);
    }
    Ok(torrents)
}

impl PieceCompletion for JsonFileCompletion {
    fn get(&self, key: PieceKey) -> Result<bool, CompletionError> {
        let state = self.state.lock();
        if state.closed {
            return Err(CompletionError::Closed);
        }
        Ok(state
            .torrents
            .get(&key.info_hash)
            .is_some_and(|pieces| pieces.contains(&key.index)))
    }

    fn set(&self, key: PieceKey, complete: bool) -> Result<(), CompletionError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CompletionError::Closed);
        }
        let pieces = state.torrents.entry(key.info_hash).or_default();
        let changed = if complete {
            pieces.insert(key.index)
        } else {
            pieces.remove(&key.index)
        };
        if !changed {
            return Ok(());
        }
        if let Err(err) = self.persist(&state) {
            // Memory must not claim what the file does not hold.
            let pieces = state.torrents.entry(key.info_hash).or_default();
            if complete {
                pieces.remove(&key.index);
            } else {
                pieces.insert(key.index);
            }
            return Err(err);
        }
        Ok(())
    }

    fn close(&self) -> Result<(), CompletionError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(index: u32) -> PieceKey {
        PieceKey {
            info_hash: InfoHash([0x11; 20]),
            index,
        }
    }

    #[test]
    fn test_round_trip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileCompletion::open_in_dir(dir.path()).unwrap();
            store.set(key(1), true).unwrap();
            store.set(key(5), true).unwrap();
            store.set(key(5), false).unwrap();
            store.close().unwrap();
        }

        let store = JsonFileCompletion::open_in_dir(dir.path()).unwrap();
        assert!(store.get(key(1)).unwrap());
        assert!(!store.get(key(5)).unwrap());
        assert!(!store.get(key(2)).unwrap());
    }

    #[test]
    fn test_closed_store_rejects_access() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCompletion::open_in_dir(dir.path()).unwrap();
        store.close().unwrap();
        assert!(matches!(store.get(key(0)), Err(CompletionError::Closed)));
        assert!(matches!(store.set(key(0), true), Err(CompletionError::Closed)));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(COMPLETION_FILE_NAME), b"{ nope").unwrap();
        let err = JsonFileCompletion::open_in_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CompletionError::Corrupt { .. }));

        fs::write(
            dir.path().join(COMPLETION_FILE_NAME),
            br#"{"version":1,"torrents":{"zz":[1]}}"#,
        )
        .unwrap();
        let err = JsonFileCompletion::open_in_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CompletionError::Corrupt { .. }));
    }

    #[test]
    fn test_failed_persist_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");
        let store = JsonFileCompletion::open_in_dir(&store_dir).unwrap();
        store.set(key(1), true).unwrap();

        // A regular file where the store directory was makes every write fail.
        fs::remove_dir_all(&store_dir).unwrap();
        fs::write(&store_dir, b"not a dir").unwrap();

        assert!(store.set(key(2), true).is_err());
        assert!(!store.get(key(2)).unwrap());
        assert!(store.set(key(1), false).is_err());
        assert!(store.get(key(1)).unwrap());
    }

    #[test]
    fn test_unset_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCompletion::open_in_dir(dir.path()).unwrap();
        store.set(key(9), false).unwrap();
        assert!(!store.path().exists());
    }
}
