//! Configuration types: matcher table extensions and target system descriptors.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Serialized form of one platform matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherSpec {
    /// Platform name (e.g. "linux", "amd64")
    pub name: String,

    /// Regex a name must match
    pub pattern: String,

    /// Regex that vetoes a primary match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anti: Option<String>,

    /// Regex marking a match as stronger evidence (e.g. an AppImage suffix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// Additional or replacement matchers layered over the built-in table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Operating system matchers
    #[serde(default)]
    pub os: Vec<MatcherSpec>,

    /// Architecture matchers
    #[serde(default)]
    pub arch: Vec<MatcherSpec>,
}

impl MatcherConfig {
    /// Load a JSON matcher document from disk.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Which platform to select assets for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum System {
    /// Do not filter by platform; every asset is a candidate.
    All,

    /// A specific OS/architecture pair, named as in the matcher table.
    Target {
        /// Operating system name (e.g. "linux")
        os: String,
        /// Architecture name (e.g. "amd64")
        arch: String,
    },
}

impl System {
    /// The system this binary runs on.
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            other => other,
        };
        System::Target {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }
}

impl Default for System {
    fn default() -> Self {
        Self::host()
    }
}

impl FromStr for System {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(System::All);
        }
        match s.split_once('/') {
            Some((os, arch)) if !os.is_empty() && !arch.is_empty() => Ok(System::Target {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
            _ => Err(Error::UnsupportedSystem(format!(
                "system descriptor must be os/arch or `all`, got `{}`",
                s
            ))),
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            System::All => write!(f, "all"),
            System::Target { os, arch } => write!(f, "{}/{}", os, arch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_system() {
        assert_eq!("all".parse::<System>().unwrap(), System::All);
        assert_eq!(
            "linux/arm64".parse::<System>().unwrap(),
            System::Target {
                os: "linux".into(),
                arch: "arm64".into()
            }
        );
        assert!("linux".parse::<System>().is_err());
        assert!("/amd64".parse::<System>().is_err());
    }

    #[test]
    fn test_system_display_round_trips() {
        let system: System = "darwin/amd64".parse().unwrap();
        assert_eq!(system.to_string(), "darwin/amd64");
    }

    #[test]
    fn test_host_uses_table_names() {
        match System::host() {
            System::Target { os, arch } => {
                assert_ne!(os, "macos");
                assert_ne!(arch, "x86_64");
                assert_ne!(arch, "aarch64");
            }
            System::All => panic!("host should be a concrete target"),
        }
    }

    #[test]
    fn test_load_matcher_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("matchers.json");
        fs::write(
            &path,
            r#"{"arch": [{"name": "ppc64le", "pattern": "(?i)ppc64le"}]}"#,
        )
        .unwrap();

        let config = MatcherConfig::load(&path).unwrap();
        assert!(config.os.is_empty());
        assert_eq!(config.arch[0].name, "ppc64le");
        assert_eq!(config.arch[0].anti, None);
    }

    #[test]
    fn test_load_invalid_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("matchers.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(MatcherConfig::load(&path), Err(Error::Config(_))));
    }
}
