//! Platform matchers: regex classifiers for operating systems and architectures.
//!
//! A [`Matcher`] scores an opaque asset name against one platform dimension.
//! The built-in table encodes common release naming conventions; it is data,
//! not logic, and can be extended through [`crate::config::MatcherConfig`].

use crate::config::{MatcherConfig, MatcherSpec};
use crate::error::Error;
use regex::Regex;

/// Built-in operating system matchers: `(name, pattern, anti, priority)`.
const BUILTIN_OS: &[(&str, &str, Option<&str>, Option<&str>)] = &[
    ("darwin", r"(?i)(darwin|mac.?os|osx)", None, None),
    ("windows", r"(?i)(^win|[^r]win|windows)", None, None),
    (
        "linux",
        r"(?i)(linux|ubuntu)",
        Some(r"(?i)(android)"),
        Some(r"(?i)\.appimage$"),
    ),
    ("netbsd", r"(?i)(netbsd)", None, None),
    ("freebsd", r"(?i)(freebsd)", None, None),
    ("openbsd", r"(?i)(openbsd)", None, None),
    ("android", r"(?i)(android)", None, None),
    ("illumos", r"(?i)(illumos)", None, None),
    ("solaris", r"(?i)(solaris)", None, None),
    ("plan9", r"(?i)(plan9)", None, None),
];

/// Built-in architecture matchers.
const BUILTIN_ARCH: &[(&str, &str, Option<&str>, Option<&str>)] = &[
    ("amd64", r"(?i)(x64|amd64|x86(-|_)?64)", None, None),
    ("386", r"(?i)(x32|amd32|x86(-|_)?32|i?386)", None, None),
    ("arm", r"(?i)(arm32|armv6|arm\b)", None, None),
    ("arm64", r"(?i)(arm64|armv8|aarch64)", None, None),
    ("riscv64", r"(?i)(riscv64)", None, None),
];

/// Result of evaluating a [`Matcher`] against one name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Primary pattern matched and the anti pattern did not
    pub matched: bool,
    /// Priority pattern matched and the anti pattern did not; holds even
    /// when the primary pattern misses (e.g. an AppImage without an OS name)
    pub priority: bool,
}

/// One platform classifier.
#[derive(Debug, Clone)]
pub struct Matcher {
    name: String,
    pattern: Regex,
    anti: Option<Regex>,
    priority: Option<Regex>,
}

impl Matcher {
    /// Compile a matcher from its pattern strings.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        anti: Option<&str>,
        priority: Option<&str>,
    ) -> Result<Self, Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            anti: anti.map(Regex::new).transpose()?,
            priority: priority.map(Regex::new).transpose()?,
        })
    }

    /// Compile a matcher from its configuration form.
    pub fn from_spec(spec: &MatcherSpec) -> Result<Self, Error> {
        Self::new(
            spec.name.clone(),
            &spec.pattern,
            spec.anti.as_deref(),
            spec.priority.as_deref(),
        )
    }

    /// The platform name this matcher classifies (e.g. `linux`, `amd64`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate `candidate` against this matcher.
    pub fn evaluate(&self, candidate: &str) -> MatchOutcome {
        let vetoed = self.anti.as_ref().is_some_and(|anti| anti.is_match(candidate));
        let matched = !vetoed && self.pattern.is_match(candidate);
        let priority = !vetoed
            && self
                .priority
                .as_ref()
                .is_some_and(|priority| priority.is_match(candidate));
        MatchOutcome { matched, priority }
    }

    /// Shorthand for `evaluate(candidate).matched`.
    pub fn is_match(&self, candidate: &str) -> bool {
        self.evaluate(candidate).matched
    }
}

/// The operating system and architecture matchers known to a detector.
#[derive(Debug, Clone)]
pub struct MatcherTable {
    os: Vec<Matcher>,
    arch: Vec<Matcher>,
}

impl MatcherTable {
    /// The built-in table.
    pub fn builtin() -> Result<Self, Error> {
        Ok(Self {
            os: compile_builtin(BUILTIN_OS)?,
            arch: compile_builtin(BUILTIN_ARCH)?,
        })
    }

    /// The built-in table with `config` layered on top.
    pub fn with_config(config: &MatcherConfig) -> Result<Self, Error> {
        let mut table = Self::builtin()?;
        table.extend(config)?;
        Ok(table)
    }

    /// Add or replace matchers. An entry named like an existing one replaces it.
    pub fn extend(&mut self, config: &MatcherConfig) -> Result<(), Error> {
        for spec in &config.os {
            upsert(&mut self.os, Matcher::from_spec(spec)?);
        }
        for spec in &config.arch {
            upsert(&mut self.arch, Matcher::from_spec(spec)?);
        }
        Ok(())
    }

    /// Look up the operating system matcher called `name`.
    pub fn os(&self, name: &str) -> Result<&Matcher, Error> {
        self.os
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::UnsupportedSystem(format!("unknown OS `{}`", name)))
    }

    /// Look up the architecture matcher called `name`.
    pub fn arch(&self, name: &str) -> Result<&Matcher, Error> {
        self.arch
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::UnsupportedSystem(format!("unknown arch `{}`", name)))
    }
}

fn compile_builtin(
    table: &[(&str, &str, Option<&str>, Option<&str>)],
) -> Result<Vec<Matcher>, Error> {
    table
        .iter()
        .map(|(name, pattern, anti, priority)| Matcher::new(*name, pattern, *anti, *priority))
        .collect()
}

fn upsert(matchers: &mut Vec<Matcher>, matcher: Matcher) {
    match matchers.iter_mut().find(|m| m.name == matcher.name) {
        Some(existing) => *existing = matcher,
        None => matchers.push(matcher),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MatcherTable {
        MatcherTable::builtin().unwrap()
    }

    #[test]
    fn test_builtin_table_compiles() {
        let table = table();
        for name in ["darwin", "windows", "linux", "freebsd", "plan9"] {
            assert_eq!(table.os(name).unwrap().name(), name);
        }
        for name in ["amd64", "386", "arm", "arm64", "riscv64"] {
            assert_eq!(table.arch(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_unknown_system() {
        let table = table();
        assert!(matches!(table.os("beos"), Err(Error::UnsupportedSystem(_))));
        assert!(matches!(table.arch("vax"), Err(Error::UnsupportedSystem(_))));
    }

    #[test]
    fn test_linux_anti_and_priority() {
        let table = table();
        let linux = table.os("linux").unwrap();

        assert!(linux.is_match("tool-linux-amd64.tar.gz"));
        assert!(!linux.is_match("tool-linux-android-arm64.tar.gz"));

        let outcome = linux.evaluate("tool-linux-amd64.AppImage");
        assert!(outcome.matched && outcome.priority);

        let outcome = linux.evaluate("tool-linux-amd64.tar.gz");
        assert!(outcome.matched && !outcome.priority);
    }

    #[test]
    fn test_priority_without_primary_match() {
        let table = table();
        let linux = table.os("linux").unwrap();

        let outcome = linux.evaluate("nvim-x86_64.appimage");
        assert!(!outcome.matched);
        assert!(outcome.priority);

        let outcome = linux.evaluate("tool-android-arm64.AppImage");
        assert_eq!(outcome, MatchOutcome::default());
    }

    #[test]
    fn test_windows_does_not_match_darwin() {
        let table = table();
        let windows = table.os("windows").unwrap();
        assert!(!windows.is_match("tool-darwin-amd64.tar.gz"));
        assert!(windows.is_match("tool-windows-amd64.zip"));
        assert!(windows.is_match("tool-x86_64-pc-win64.zip"));
        assert!(windows.is_match("win64-tool.zip"));
    }

    #[test]
    fn test_arch_patterns() {
        let table = table();
        let amd64 = table.arch("amd64").unwrap();
        let arm = table.arch("arm").unwrap();
        let arm64 = table.arch("arm64").unwrap();

        assert!(amd64.is_match("tool-x86_64-unknown-linux-musl.tar.gz"));
        assert!(!amd64.is_match("tool-linux-arm64.tar.gz"));
        assert!(arm64.is_match("tool-aarch64-apple-darwin.tar.gz"));
        assert!(arm.is_match("tool-linux-arm.tar.gz"));
        assert!(!arm.is_match("tool-linux-arm64.tar.gz"));
    }

    #[test]
    fn test_extend_replaces_and_adds() {
        let config: MatcherConfig = serde_json::from_str(
            r#"{
                "os": [{"name": "linux", "pattern": "(?i)gnu"}],
                "arch": [{"name": "loong64", "pattern": "(?i)loong(arch)?64"}]
            }"#,
        )
        .unwrap();
        let table = MatcherTable::with_config(&config).unwrap();

        let linux = table.os("linux").unwrap();
        assert!(linux.is_match("tool-x86_64-unknown-gnu.tar.gz"));
        assert!(!linux.is_match("tool-linux.tar.gz"));
        assert!(table.arch("loong64").unwrap().is_match("tool-loongarch64"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = Matcher::new("bad", "(unclosed", None, None);
        assert!(matches!(result, Err(Error::InvalidPattern(_))));
    }
}
