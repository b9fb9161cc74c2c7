use anyhow::{Context, Result};
use console::{Emoji, style};
use indicatif::HumanBytes;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use torsift::cli::{LayoutArgs, Selector, load_torrent};
use torsift::piece::pieces_overlapping;
use torsift::segments::SegmentIndex;

static INFO: Emoji<'_, '_> = Emoji("ℹ️ ", "i ");
static FILES: Emoji<'_, '_> = Emoji("📁 ", "f ");

#[derive(Debug, Serialize)]
struct FileLayout {
    path: String,
    length: u64,
    offset: u64,
    first_piece: u32,
    end_piece: u32,
    padding: bool,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct Layout {
    name: String,
    info_hash: String,
    total_size: u64,
    piece_length: u64,
    piece_count: u64,
    files: Vec<FileLayout>,
    wanted_pieces: Option<usize>,
}

pub fn show_layout(args: LayoutArgs) -> Result<()> {
    let torrent = load_torrent(&args.torrent)?;
    let info = &torrent.info;

    let selector = args
        .select
        .as_deref()
        .map(|p| Selector::new(p, PathBuf::new()))
        .transpose()?;

    let entries = info.upverted_files();
    let index = SegmentIndex::build(entries.iter().map(|f| f.length))
        .context("Torrent file lengths overflow")?;

    let mut files = Vec::with_capacity(entries.len());
    let mut wanted = BTreeSet::new();
    for (i, entry) in entries.iter().enumerate() {
        let mut rel = PathBuf::new();
        rel.extend(info.best_name());
        rel.extend(&entry.path);

        let extent = index.file_extent(i);
        let pieces = pieces_overlapping(extent.start, extent.length, info.piece_length)
            .with_context(|| format!("Too many pieces to index file {}", rel.display()))?;
        let padding = entry.is_padding();
        let selected = !padding && selector.as_ref().is_some_and(|s| s.matches(&rel));
        if selected {
            wanted.extend(pieces.clone());
        }
        files.push(FileLayout {
            path: rel.to_string_lossy().into_owned(),
            length: entry.length,
            offset: extent.start,
            first_piece: pieces.start,
            end_piece: pieces.end,
            padding,
            selected,
        });
    }

    let layout = Layout {
        name: info.name.clone(),
        info_hash: torrent.info_hash.to_hex(),
        total_size: index.total_length(),
        piece_length: info.piece_length,
        piece_count: info.piece_count(),
        files,
        wanted_pieces: selector.as_ref().map(|_| wanted.len()),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&layout).context("Failed to serialize layout")?;
        println!("{}", json);
        return Ok(());
    }

    println!("{} {}", INFO, style("Torrent Layout:").bold());
    println!("{:<15} {}", style("Name:").bold(), style(&layout.name).cyan());
    println!("{:<15} {}", style("Info Hash:").bold(), layout.info_hash);
    if let Some(comment) = &torrent.comment {
        println!("{:<15} {}", style("Comment:").bold(), comment);
    }
    if let Some(created_by) = &torrent.created_by {
        println!("{:<15} {}", style("Created By:").bold(), created_by);
    }
    if let Some(date) = torrent.creation_date {
        let datetime = chrono::DateTime::from_timestamp(date, 0)
            .map(|dt| dt.to_string())
            .unwrap_or_else(|| date.to_string());
        println!("{:<15} {}", style("Date:").bold(), datetime);
    }
    println!("{:<15} {}", style("Total Size:").bold(), style(HumanBytes(layout.total_size)).green());
    println!("{:<15} {}", style("Piece Size:").bold(), style(HumanBytes(layout.piece_length)).yellow());
    println!("{:<15} {}", style("Piece Count:").bold(), layout.piece_count);

    println!("\n{} {}", FILES, style("Files:").bold());
    for file in &layout.files {
        let marker = if file.selected { style("*").green().bold() } else { style(" ") };
        let pieces = if file.padding {
            style("padding".to_string()).dim()
        } else if file.first_piece == file.end_piece {
            style("no pieces".to_string()).dim()
        } else {
            style(format!("pieces {}..{}", file.first_piece, file.end_piece)).dim()
        };
        println!(
            "{} {:<40} {:>10}  {}",
            marker,
            file.path,
            HumanBytes(file.length).to_string(),
            pieces
        );
    }

    if let Some(count) = layout.wanted_pieces {
        println!("\n{:<15} {}", style("Wanted Pieces:").bold(), count);
    }

    Ok(())
}
