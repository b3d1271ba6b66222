//! Asset detection: narrowing a release's asset names down to one.
//!
//! Every detector returns the same shape: a resolved name, an ambiguous list
//! the caller can pick from, or [`Error::NotFound`] when nothing survived.

use crate::error::Error;
use crate::matcher::{Matcher, MatcherTable};
use crate::selection::{resolve, Selection};
use tracing::{debug, trace};

/// Suffixes of checksum files published next to an asset.
pub const CHECKSUM_SUFFIXES: &[&str] = &[".sha256", ".sha256sum"];

/// Selects an asset from a list of names.
pub trait Detector {
    /// Narrow `assets` to a direct match, or return the remaining candidates.
    fn detect(&self, assets: &[String]) -> Result<Selection<String>, Error>;
}

/// Whether `name` is a checksum sidecar rather than a real asset.
pub fn is_checksum_sidecar(name: &str) -> bool {
    CHECKSUM_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Find the checksum sidecar published for `asset`, if any.
pub fn checksum_sidecar<'a>(asset: &str, assets: &'a [String]) -> Option<&'a str> {
    assets
        .iter()
        .find(|a| {
            CHECKSUM_SUFFIXES
                .iter()
                .any(|suffix| a.strip_suffix(suffix) == Some(asset))
        })
        .map(String::as_str)
}

/// Final path component of a URL or archive path.
pub(crate) fn base_name(name: &str) -> &str {
    name.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(name)
}

/// Matches every asset. A lone asset is a direct match; several are returned
/// as candidates so the caller can choose or take them all.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllDetector;

impl Detector for AllDetector {
    fn detect(&self, assets: &[String]) -> Result<Selection<String>, Error> {
        let all = assets
            .iter()
            .filter(|a| !is_checksum_sidecar(a))
            .cloned()
            .collect();
        resolve(
            all,
            |n| format!("{} matches found", n),
            || "no assets found".to_string(),
        )
    }
}

/// Finds an asset by name, or with `anti`, every asset not containing it.
#[derive(Debug, Clone)]
pub struct SingleAssetDetector {
    asset: String,
    anti: bool,
}

impl SingleAssetDetector {
    /// Match assets whose base name contains `asset`.
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            anti: false,
        }
    }

    /// Match assets whose base name does not contain `asset`.
    pub fn anti(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            anti: true,
        }
    }

    /// Parse a filter; a leading `^` selects anti mode.
    pub fn from_filter(filter: &str) -> Self {
        match filter.strip_prefix('^') {
            Some(rest) => Self::anti(rest),
            None => Self::new(filter),
        }
    }
}

impl Detector for SingleAssetDetector {
    fn detect(&self, assets: &[String]) -> Result<Selection<String>, Error> {
        let mut candidates = Vec::new();
        for asset in assets.iter().filter(|a| !is_checksum_sidecar(a)) {
            let base = base_name(asset);
            if self.anti {
                if !base.contains(&self.asset) {
                    candidates.push(asset.clone());
                }
                continue;
            }
            if base == self.asset {
                return Ok(Selection::Resolved(asset.clone()));
            }
            if base.contains(&self.asset) {
                candidates.push(asset.clone());
            }
        }

        let (prefix, verb) = if self.anti {
            ("^", "excluding")
        } else {
            ("", "for")
        };
        resolve(
            candidates,
            |n| format!("{} candidates found {} asset `{}`", n, verb, self.asset),
            || format!("asset `{}{}` not found", prefix, self.asset),
        )
    }
}

/// Matches a particular OS/architecture pair using tiered precedence.
#[derive(Debug, Clone)]
pub struct SystemDetector {
    os: Matcher,
    arch: Matcher,
}

impl SystemDetector {
    /// Detector for explicit matchers.
    pub fn new(os: Matcher, arch: Matcher) -> Self {
        Self { os, arch }
    }

    /// Detector for the named OS/architecture from `table`.
    pub fn from_table(table: &MatcherTable, os: &str, arch: &str) -> Result<Self, Error> {
        Ok(Self::new(table.os(os)?.clone(), table.arch(arch)?.clone()))
    }
}

impl Detector for SystemDetector {
    fn detect(&self, assets: &[String]) -> Result<Selection<String>, Error> {
        let mut priority = Vec::new();
        let mut matches = Vec::new();
        let mut os_only = Vec::new();
        let mut all = Vec::new();

        for asset in assets.iter().filter(|a| !is_checksum_sidecar(a)) {
            let base = base_name(asset);
            let os = self.os.evaluate(base);
            let arch = self.arch.is_match(base);
            trace!(asset = %base, os = os.matched, priority = os.priority, arch, "classified");

            if os.priority && arch {
                priority.push(asset.clone());
            }
            if os.matched && arch {
                matches.push(asset.clone());
            }
            if os.matched {
                os_only.push(asset.clone());
            }
            all.push(asset.clone());
        }

        // Strict precedence: the first non-empty tier decides.
        let tiers = [
            (priority, "priority matches found"),
            (matches, "matches found"),
            (os_only, "candidates found (unsure architecture)"),
        ];
        for (tier, label) in tiers {
            if tier.is_empty() {
                continue;
            }
            debug!(os = self.os.name(), arch = self.arch.name(), count = tier.len(), "{}", label);
            return resolve(tier, |n| format!("{} {}", n, label), || format!("no {}", label));
        }

        debug!(
            os = self.os.name(),
            arch = self.arch.name(),
            count = all.len(),
            "no platform match, falling back to every asset"
        );
        // A release with a single asset is taken as-is.
        resolve(
            all,
            |n| {
                format!(
                    "{} candidates found, none matching {}/{}",
                    n,
                    self.os.name(),
                    self.arch.name()
                )
            },
            || "no candidates found".to_string(),
        )
    }
}

/// Asset-name filters applied in order, then a terminal platform detector.
pub struct DetectorChain {
    filters: Vec<SingleAssetDetector>,
    system: Box<dyn Detector>,
}

impl DetectorChain {
    /// Chain `filters` in front of `system`.
    pub fn new(filters: Vec<SingleAssetDetector>, system: Box<dyn Detector>) -> Self {
        Self { filters, system }
    }
}

impl Detector for DetectorChain {
    fn detect(&self, assets: &[String]) -> Result<Selection<String>, Error> {
        let mut working = assets.to_vec();

        for filter in &self.filters {
            match filter.detect(&working)? {
                Selection::Resolved(asset) => {
                    debug!(asset = %asset, filter = %filter.asset, "asset filter resolved");
                    return Ok(Selection::Resolved(asset));
                }
                Selection::Ambiguous { candidates, .. } => {
                    debug!(count = candidates.len(), filter = %filter.asset, "asset filter narrowed");
                    working = candidates;
                }
            }
        }

        match self.system.detect(&working)? {
            Selection::Resolved(asset) => Ok(Selection::Resolved(asset)),
            Selection::Ambiguous { .. } => {
                // The caller picks from everything the filters let through.
                working.retain(|asset| !is_checksum_sidecar(asset));
                Ok(Selection::Ambiguous {
                    reason: format!("{} candidates found for asset chain", working.len()),
                    candidates: working,
                })
            }
        }
    }
}
