use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::completion::{JsonFileCompletion, MemoryCompletion, PieceCompletion};
use crate::config::{CompletionKind, UserConfig};
use crate::models::Torrent;
use crate::storage::{FileStorage, TorrentStorage};

#[derive(Parser, Debug)]
#[command(
    name = "torsift",
    version,
    about = "Inspect and maintain selective BitTorrent downloads on disk",
    author = "torsift contributors"
)]
pub struct Args {
    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show how a torrent's files map onto its pieces
    Layout(LayoutArgs),
    /// Check which pieces of a torrent are complete on disk
    Status(StatusArgs),
    /// Fsync the downloaded files, optionally only the selected ones
    Flush(FlushArgs),
}

#[derive(ClapArgs, Debug)]
pub struct LayoutArgs {
    /// The .torrent file
    #[arg(value_name = "TORRENT")]
    pub torrent: PathBuf,

    /// Mark files matching this glob pattern (file name or relative path)
    #[arg(short = 's', long = "select", value_name = "PATTERN")]
    pub select: Option<String>,

    /// Print the layout as JSON
    #[arg(long = "json")]
    pub json: bool,
}

/// Options shared by the commands that open a torrent's storage
#[derive(ClapArgs, Debug)]
pub struct StorageArgs {
    /// The .torrent file
    #[arg(value_name = "TORRENT")]
    pub torrent: PathBuf,

    /// Data directory holding the torrent's files (defaults to the configured
    /// data dir, then the current directory)
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Only consider files matching this glob pattern
    #[arg(short = 's', long = "select", value_name = "PATTERN")]
    pub select: Option<String>,

    /// Completion store to use (overrides the config file)
    #[arg(long = "completion", value_enum)]
    pub completion: Option<CompletionKind>,
}

#[derive(ClapArgs, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Number of threads for checking pieces (defaults to number of CPU cores)
    #[arg(short = 't', long = "threads", value_name = "N")]
    pub threads: Option<usize>,
}

#[derive(ClapArgs, Debug)]
pub struct FlushArgs {
    #[command(flatten)]
    pub storage: StorageArgs,
}

/// Glob over file paths, matched against the file name or the path relative
/// to a base directory
#[derive(Debug, Clone)]
pub struct Selector {
    pattern: Pattern,
    base: PathBuf,
}

impl Selector {
    pub fn new(pattern: &str, base: impl Into<PathBuf>) -> Result<Self> {
        let pattern = Pattern::new(pattern)
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        Ok(Self {
            pattern,
            base: base.into(),
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let relative = path.strip_prefix(&self.base).unwrap_or(path);
        self.pattern.matches(&file_name) || self.pattern.matches(&relative.to_string_lossy())
    }
}

pub fn load_torrent(path: &Path) -> Result<Torrent> {
    let content = fs::read(path)
        .with_context(|| format!("Failed to read torrent file: {}", path.display()))?;
    Torrent::from_bytes(&content)
        .with_context(|| format!("Failed to parse torrent file: {}", path.display()))
}

/// Everything a storage command works on
pub struct Opened {
    pub torrent: Torrent,
    pub client: FileStorage,
    pub storage: TorrentStorage,
    pub selector: Option<Selector>,
    pub data_dir: PathBuf,
}

impl StorageArgs {
    pub fn data_dir(&self, config: &UserConfig) -> Result<PathBuf> {
        match (&self.dir, config.data_dir()) {
            (Some(dir), _) => Ok(dir.clone()),
            (None, Some(dir)) => Ok(dir),
            (None, None) => std::env::current_dir().context("Failed to resolve current directory"),
        }
    }

    pub fn open(&self, config: &UserConfig) -> Result<Opened> {
        let torrent = load_torrent(&self.torrent)?;
        let data_dir = self.data_dir(config)?;

        let completion: Arc<dyn PieceCompletion> = match self.completion.unwrap_or(config.completion) {
            CompletionKind::Memory => Arc::new(MemoryCompletion::new()),
            CompletionKind::Json => Arc::new(
                JsonFileCompletion::open_in_dir(&data_dir)
                    .context("Failed to open completion store")?,
            ),
        };

        let selector = self
            .select
            .as_deref()
            .map(|p| Selector::new(p, &data_dir))
            .transpose()?;

        let mut client = FileStorage::new(&data_dir, completion);
        if let Some(sel) = selector.clone() {
            client = client.with_file_filter(move |path| sel.matches(path));
        }
        let storage = client
            .open_torrent(&torrent.info, torrent.info_hash)
            .context("Failed to open torrent storage")?;

        Ok(Opened {
            torrent,
            client,
            storage,
            selector,
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_name_or_relative_path() {
        let sel = Selector::new("*.epub", "/data").unwrap();
        assert!(sel.matches(Path::new("/data/lib/book.epub")));
        assert!(!sel.matches(Path::new("/data/lib/book.pdf")));

        let sel = Selector::new("lib/*", "/data").unwrap();
        assert!(sel.matches(Path::new("/data/lib/book.pdf")));
        assert!(!sel.matches(Path::new("/data/other/book.pdf")));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Selector::new("[", "/").is_err());
    }

    #[test]
    fn test_parse_args() {
        let args = Args::parse_from(["torsift", "status", "a.torrent", "-d", "/tmp/x", "-s", "*.bin", "-t", "2"]);
        match args.command {
            Command::Status(status) => {
                assert_eq!(status.storage.torrent, PathBuf::from("a.torrent"));
                assert_eq!(status.storage.dir, Some(PathBuf::from("/tmp/x")));
                assert_eq!(status.threads, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
