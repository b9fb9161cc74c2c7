use anyhow::{Context, Result};
use console::{Emoji, style};

use torsift::cli::FlushArgs;
use torsift::config::UserConfig;

static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "OK");

pub fn flush_files(args: FlushArgs, config: &UserConfig) -> Result<()> {
    let opened = args.storage.open(config)?;
    let storage = &opened.storage;

    let (flushed, skipped) = match &opened.selector {
        Some(sel) => {
            let flushed = storage.files().iter().filter(|f| sel.matches(&f.path)).count();
            (flushed, storage.files().len() - flushed)
        }
        None => (storage.files().len(), 0),
    };

    storage.flush().context("Failed to flush torrent files")?;
    storage.close()?;
    opened.client.close()?;

    println!(
        "{} Flushed {} file(s) of {}",
        SUCCESS,
        style(flushed).green().bold(),
        style(&opened.torrent.info.name).bold()
    );
    if skipped > 0 {
        println!("Skipped {} unselected file(s)", style(skipped).dim());
    }

    Ok(())
}
