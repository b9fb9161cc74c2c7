use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use torsift::cli::{Args, Command};
use torsift::config::UserConfig;

mod flush;
mod layout;
mod status;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .unwrap_or(());
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = UserConfig::load()?;

    match args.command {
        Command::Layout(layout_args) => layout::show_layout(layout_args),
        Command::Status(status_args) => status::show_status(status_args, &config),
        Command::Flush(flush_args) => flush::flush_files(flush_args, &config),
    }
}
