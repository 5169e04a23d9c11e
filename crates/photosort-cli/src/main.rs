use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use photosort_core::{CancellationToken, Mode, PlaceOptions, SortOptions};

#[derive(Parser, Debug)]
#[command(name = "photosort", version, about = "Sorts photos from one directory to another")]
struct Cli {
    /// Source folder
    #[arg(short = 's', long = "source-folder")]
    source: PathBuf,

    /// Destination folder with archived sorted photos
    #[arg(short = 'd', long = "destination-folder")]
    destination: PathBuf,

    /// Delete each source file after it was copied and verified
    #[arg(long = "move")]
    move_files: bool,

    /// JSON file listing recognized media extensions: {"extensions": [...]}
    #[arg(long)]
    media_types: Option<PathBuf>,

    /// Compare SHA-256 of source and destination after each copy
    #[arg(long)]
    verify: bool,

    /// Do not copy modification times onto archived files
    #[arg(long)]
    no_preserve_mtime: bool,

    /// Octal mode for created directories (before umask)
    #[arg(long, default_value = "755", value_parser = parse_octal)]
    dir_mode: u32,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only print errors and the final summary
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_octal(s: &str) -> Result<u32, String> {
    let mode = u32::from_str_radix(s.trim_start_matches("0o"), 8).map_err(|e| e.to_string())?;
    if mode > 0o7777 {
        return Err(format!("{s} is not a valid permission mode"));
    }
    Ok(mode)
}

impl Cli {
    fn sort_options(&self) -> SortOptions {
        SortOptions {
            source: self.source.clone(),
            archive: self.destination.clone(),
            mode: if self.move_files { Mode::Move } else { Mode::Copy },
            media_types: self.media_types.clone(),
            place: PlaceOptions {
                dir_mode: self.dir_mode,
                preserve_mtime: !self.no_preserve_mtime,
                verify_checksum: self.verify,
            },
        }
    }

    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("photosort_core={default_level},photosort={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    let t_total = std::time::Instant::now();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nCancelling after the current file...");
            cancel.cancel();
        })
        .context("installing Ctrl-C handler")?;
    }

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}")
            .context("progress bar template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(200));

    let options = cli.sort_options();
    let result = photosort_core::sort_tree_with_control(&options, &cancel, &|_stage, current, total, message| {
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(message.to_string());
    });
    pb.finish_and_clear();
    let result = result?;

    for warning in &result.warnings {
        tracing::warn!(%warning, "skipped during scan");
    }
    eprintln!(
        "Done! {} ({:.2}s)",
        result.summary(),
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
