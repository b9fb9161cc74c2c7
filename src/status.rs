use anyhow::{Context, Result};
use console::{Emoji, style};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use rayon::prelude::*;

use torsift::cli::StatusArgs;
use torsift::config::UserConfig;
use torsift::waiter::PieceStates;

static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "OK");
static WARN: Emoji<'_, '_> = Emoji("⚠️ ", "WARN");
static ERROR: Emoji<'_, '_> = Emoji("❌ ", "ERR");

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    complete: u64,
    incomplete: u64,
    unknown: u64,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            complete: self.complete + other.complete,
            incomplete: self.incomplete + other.incomplete,
            unknown: self.unknown + other.unknown,
        }
    }
}

pub fn show_status(args: StatusArgs, config: &UserConfig) -> Result<()> {
    let opened = args.storage.open(config)?;
    let storage = &opened.storage;

    println!("Checking torrent: {}", style(&opened.torrent.info.name).bold());
    println!("Data directory: {}", style(opened.data_dir.display()).cyan());

    let pieces: Vec<u32> = match &opened.selector {
        Some(sel) => storage.wanted_pieces(|p| sel.matches(p)).into_iter().collect(),
        None => (0..storage.piece_count()).collect(),
    };

    let threads = args.threads.unwrap_or_else(num_cpus::get);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Failed to build thread pool")?;

    let pb = ProgressBar::new(pieces.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} Checking pieces")?
            .progress_chars("#>-"),
    );

    let tally = pool.install(|| {
        pieces
            .par_iter()
            .map(|&index| {
                let completion = storage.piece_completion(index);
                pb.inc(1);
                match (completion.ok, completion.complete) {
                    (true, true) => Tally { complete: 1, ..Tally::default() },
                    (true, false) => Tally { incomplete: 1, ..Tally::default() },
                    (false, _) => Tally { unknown: 1, ..Tally::default() },
                }
            })
            .reduce(Tally::default, Tally::merge)
    });
    pb.finish_and_clear();

    let scope = if opened.selector.is_some() { "Selected pieces" } else { "Pieces" };
    println!(
        "{:<17} {} ({} per piece)",
        style(format!("{}:", scope)).bold(),
        pieces.len(),
        HumanBytes(storage.piece_length())
    );
    println!("{:<17} {}", style("Complete:").bold(), style(tally.complete).green());
    println!("{:<17} {}", style("Incomplete:").bold(), style(tally.incomplete).yellow());
    if tally.unknown > 0 {
        println!("{:<17} {}", style("Unknown:").bold(), style(tally.unknown).red());
    }

    opened.storage.close()?;
    opened.client.close()?;

    if tally.unknown > 0 {
        println!("\n{} {}", ERROR, style("Completion store could not be read for some pieces").red().bold());
    } else if tally.incomplete == 0 {
        println!("\n{} {}", SUCCESS, style("All pieces complete").green().bold());
    } else {
        println!("\n{} {}", WARN, style("Download incomplete").yellow().bold());
    }

    Ok(())
}
