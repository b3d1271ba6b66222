//! Command-line interface for release asset selection and extraction.
//!
//! `relget detect` picks the asset built for a platform from a list of names;
//! `relget extract` pulls the wanted executable or files out of a downloaded
//! asset. Nothing is fetched over the network.

use clap::{Parser, Subcommand};
use relget::{
    build_detector, build_extractor, checksum_sidecar, ExtractedFile, MatcherConfig, MatcherTable,
    Selection, System,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "relget")]
#[command(version, about = "Pick and unpack release assets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose the asset matching a platform
    Detect {
        /// Asset names or URLs to choose from
        #[arg(required = true)]
        names: Vec<String>,

        /// Target system as os/arch, or `all` (default: this machine)
        #[arg(short, long)]
        system: Option<String>,

        /// Asset name filter; prefix with ^ to exclude (repeatable)
        #[arg(short, long = "asset")]
        asset: Vec<String>,

        /// JSON file with extra or replacement platform matchers
        #[arg(long)]
        matchers: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a file from a downloaded asset
    Extract {
        /// Downloaded asset
        archive: PathBuf,

        /// Executable to look for (default: derived from the asset name)
        #[arg(long)]
        tool: Option<String>,

        /// Glob selecting files to extract instead of an executable
        #[arg(short, long)]
        file: Option<String>,

        /// Extract every match instead of requiring a single one
        #[arg(long)]
        all: bool,

        /// Copy the asset as-is without extracting
        #[arg(short, long)]
        download_only: bool,

        /// Destination file or directory; `-` writes to stdout
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Serialize)]
struct DetectReport<'a> {
    selection: &'a Selection<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<&'a str>,
}

fn main() {
    // Logs go to stderr so that `--to -` output stays clean
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Detect {
            names,
            system,
            asset,
            matchers,
            json,
        } => handle_detect(names, system, asset, matchers, json),
        Commands::Extract {
            archive,
            tool,
            file,
            all,
            download_only,
            to,
        } => handle_extract(archive, tool, file, all, download_only, to),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn handle_detect(
    names: Vec<String>,
    system: Option<String>,
    filters: Vec<String>,
    matchers: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = match matchers {
        Some(path) => MatcherTable::with_config(&MatcherConfig::load(&path)?)?,
        None => MatcherTable::builtin()?,
    };
    let system = match system {
        Some(s) => s.parse::<System>()?,
        None => System::host(),
    };
    debug!(%system, "detecting");

    let detector = build_detector(&system, &filters, &table)?;
    let selection = detector.detect(&names)?;

    if json {
        let checksum = match &selection {
            Selection::Resolved(asset) => checksum_sidecar(asset, &names),
            Selection::Ambiguous { .. } => None,
        };
        let report = DetectReport {
            selection: &selection,
            checksum,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        // Still fail on ambiguity so scripts can tell the cases apart
        selection.into_resolved()?;
        return Ok(());
    }

    match selection {
        Selection::Resolved(asset) => {
            println!("{}", asset);
            if let Some(sum) = checksum_sidecar(&asset, &names) {
                println!("checksum: {}", sum);
            }
            Ok(())
        }
        Selection::Ambiguous { candidates, reason } => {
            for candidate in &candidates {
                println!("{}", candidate);
            }
            Err(relget::Error::Ambiguous { reason, candidates }.into())
        }
    }
}

fn handle_extract(
    archive: PathBuf,
    tool: Option<String>,
    file: Option<String>,
    all: bool,
    download_only: bool,
    to: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(&archive)?;
    let asset_name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("not a file name: {}", archive.display()))?;

    let extractor = build_extractor(
        asset_name,
        tool.as_deref().unwrap_or(""),
        file.as_deref(),
        download_only,
    )?;

    let items = match extractor.extract(&data, all)? {
        Selection::Resolved(item) => vec![item],
        Selection::Ambiguous { candidates, .. } if all => candidates,
        ambiguous @ Selection::Ambiguous { .. } => {
            for candidate in ambiguous.candidates() {
                println!("{}", candidate);
            }
            ambiguous.into_resolved()?;
            return Ok(());
        }
    };

    match to.as_deref() {
        Some("-") => write_stdout(&items),
        Some(to) => write_items(&items, Path::new(to)),
        None => write_items(&items, Path::new(".")),
    }
}

fn write_stdout(items: &[ExtractedFile<'_>]) -> Result<(), Box<dyn std::error::Error>> {
    let [item] = items else {
        return Err(format!("cannot write {} items to stdout", items.len()).into());
    };
    let contents = item
        .contents()
        .ok_or_else(|| format!("cannot write directory {} to stdout", item))?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(contents)?;
    stdout.flush()?;
    Ok(())
}

fn write_items(items: &[ExtractedFile<'_>], to: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let dests = destinations(items, to, to.is_dir())?;
    for (item, dest) in items.iter().zip(&dests) {
        item.write(dest)?;
        info!("extracted {} to {}", item, dest.display());
    }
    Ok(())
}

/// Where each item goes. A single item may be written to an explicit file
/// path; otherwise items land in `to` under their own names, which must not
/// collide.
fn destinations(
    items: &[ExtractedFile<'_>],
    to: &Path,
    to_is_dir: bool,
) -> Result<Vec<PathBuf>, String> {
    if let [_] = items {
        if !to_is_dir {
            return Ok(vec![to.to_path_buf()]);
        }
    }

    let mut seen: HashMap<&str, &ExtractedFile<'_>> = HashMap::new();
    let mut dests = Vec::with_capacity(items.len());
    for item in items {
        if let Some(first) = seen.insert(item.name.as_str(), item) {
            return Err(format!(
                "{} and {} would both be written to {}; select one with --file",
                first,
                item,
                to.join(&item.name).display()
            ));
        }
        dests.push(to.join(&item.name));
    }
    Ok(dests)
}
