//! # relget
//!
//! Release asset selection and archive extraction.
//!
//! Given the asset names published with a software release, this library picks
//! the one built for a target platform, then pulls the wanted executable (or
//! any files matching a glob) out of the downloaded archive.
//!
//! ## Supported Formats
//!
//! - ZIP
//! - TAR (plain, gzip, bzip2, xz, zstd)
//! - Single files compressed with gzip, bzip2, xz or zstd
//! - Anything else is treated as a plain single file
//!
//! ## Example
//!
//! ```rust,no_run
//! use relget::{build_detector, build_extractor, MatcherTable, Selection, System};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let assets = vec![
//!     "rg-13.0.0-x86_64-unknown-linux-musl.tar.gz".to_string(),
//!     "rg-13.0.0-x86_64-apple-darwin.tar.gz".to_string(),
//! ];
//!
//! let table = MatcherTable::builtin()?;
//! let detector = build_detector(&"linux/amd64".parse::<System>()?, &[], &table)?;
//! let asset = detector.detect(&assets)?.into_resolved()?;
//!
//! let data = std::fs::read(&asset)?;
//! let extractor = build_extractor(&asset, "rg", None, false)?;
//! match extractor.extract(&data, false)? {
//!     Selection::Resolved(file) => file.write(Path::new(&file.name))?,
//!     Selection::Ambiguous { candidates, reason } => {
//!         println!("{}:", reason);
//!         for candidate in candidates {
//!             println!("  {}", candidate);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod chooser;
pub mod config;
pub mod detector;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod safety;
pub mod selection;

// Re-export main types
pub use archive::{Archive, ArchiveFormat, Compression, Entry, EntryType};
pub use chooser::{BinaryChooser, Choice, Chooser, GlobChooser, LiteralFileChooser};
pub use config::{MatcherConfig, MatcherSpec, System};
pub use detector::{
    checksum_sidecar, AllDetector, Detector, DetectorChain, SingleAssetDetector, SystemDetector,
};
pub use error::Error;
pub use extract::{ExtractedFile, Extractor, SingleFileExtractor};
pub use matcher::{Matcher, MatcherTable};
pub use selection::Selection;

use detector::base_name;
use tracing::debug;

/// Build the detector for `system`, preceded by `asset_filters` if any.
///
/// Each filter narrows the asset list by substring; a leading `^` keeps the
/// assets that do *not* contain the rest of the filter.
///
/// # Errors
///
/// Returns [`Error::UnsupportedSystem`] if `system` names an OS or
/// architecture missing from `table`.
pub fn build_detector(
    system: &System,
    asset_filters: &[String],
    table: &MatcherTable,
) -> Result<Box<dyn Detector>, Error> {
    let platform: Box<dyn Detector> = match system {
        System::All => Box::new(AllDetector),
        System::Target { os, arch } => Box::new(SystemDetector::from_table(table, os, arch)?),
    };
    debug!(%system, filters = asset_filters.len(), "building detector");

    if asset_filters.is_empty() {
        return Ok(platform);
    }
    let filters = asset_filters
        .iter()
        .map(|f| SingleAssetDetector::from_filter(f))
        .collect();
    Ok(Box::new(DetectorChain::new(filters, platform)))
}

/// Build the extractor for the downloaded asset `asset_name`.
///
/// With `download_only` the asset is passed through untouched. Otherwise a
/// `file_glob` selects entries by pattern, or else the executable named `tool`
/// is looked for; an empty `tool` is derived from the asset name.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`] if `file_glob` does not compile.
pub fn build_extractor(
    asset_name: &str,
    tool: &str,
    file_glob: Option<&str>,
    download_only: bool,
) -> Result<Box<dyn Extractor>, Error> {
    let filename = base_name(asset_name);
    if download_only {
        return Ok(Box::new(SingleFileExtractor::passthrough(filename)));
    }

    let tool = if tool.is_empty() {
        archive::strip_archive_suffix(filename)
    } else {
        tool
    };
    let chooser: Box<dyn Chooser> = match file_glob {
        Some(pattern) => Box::new(GlobChooser::new(pattern)?),
        None => Box::new(BinaryChooser::new(tool)),
    };
    debug!(asset = filename, tool, chooser = %chooser, "building extractor");
    Ok(extract::new_extractor(filename, tool, chooser))
}
