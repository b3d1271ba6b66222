//! Choosers decide which archive entries are worth extracting.

use crate::detector::base_name;
use crate::error::Error;
use globset::{GlobBuilder, GlobMatcher};
use std::fmt;

/// Suffixes that are never executables, whatever their mode says.
pub const NON_EXECUTABLE_SUFFIXES: &[&str] = &[".deb", ".1", ".txt"];

/// Classification of one archive entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Choice {
    /// Extract immediately without asking
    pub direct: bool,
    /// Extract if it is the only candidate, or if the caller takes all
    pub possible: bool,
}

impl Choice {
    /// Whether the entry is selected at all.
    pub fn is_selected(&self) -> bool {
        self.direct || self.possible
    }
}

/// Selects entries from an archive.
pub trait Chooser: fmt::Display {
    /// Classify the entry called `name`.
    fn choose(&self, name: &str, is_dir: bool, mode: u32) -> Choice;
}

fn has_suffix_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Strip `suffix` from the end of `name`, ignoring ASCII case.
pub(crate) fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    has_suffix_ignore_case(name, suffix).then(|| &name[..name.len() - suffix.len()])
}

/// Whether `name` is on the non-executable denylist.
pub fn is_definitely_not_exec(name: &str) -> bool {
    NON_EXECUTABLE_SUFFIXES
        .iter()
        .any(|suffix| has_suffix_ignore_case(name, suffix))
}

/// Whether a file called `name` with permission bits `mode` is likely an
/// executable: `.exe` and `.appimage` files, files without an extension, and
/// files with any execute bit set, unless the name is on the denylist.
pub fn is_exec(name: &str, mode: u32) -> bool {
    if is_definitely_not_exec(name) {
        return false;
    }
    has_suffix_ignore_case(name, ".exe")
        || has_suffix_ignore_case(name, ".appimage")
        || !base_name(name).contains('.')
        || mode & 0o111 != 0
}

/// Selects executables. One called `tool` (optionally with `.exe` or
/// `.appimage`) is a direct match; any other executable is a possible match.
#[derive(Debug, Clone)]
pub struct BinaryChooser {
    tool: String,
}

impl BinaryChooser {
    /// Chooser for the executable named `tool`.
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }
}

impl Chooser for BinaryChooser {
    fn choose(&self, name: &str, is_dir: bool, mode: u32) -> Choice {
        if is_dir {
            return Choice::default();
        }
        let base = base_name(name);
        let named = base == self.tool
            || strip_suffix_ignore_case(base, ".exe") == Some(self.tool.as_str())
            || strip_suffix_ignore_case(base, ".appimage") == Some(self.tool.as_str());
        let possible = is_exec(name, mode);
        Choice {
            direct: named && possible,
            possible,
        }
    }
}

impl fmt::Display for BinaryChooser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exe `{}`", self.tool)
    }
}

/// Selects a file by path, matching on base name and trailing path.
#[derive(Debug, Clone)]
pub struct LiteralFileChooser {
    file: String,
}

impl LiteralFileChooser {
    /// Chooser for `file`, e.g. `bin/tool` or just `tool`.
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }
}

impl Chooser for LiteralFileChooser {
    fn choose(&self, name: &str, _is_dir: bool, _mode: u32) -> Choice {
        Choice {
            direct: false,
            possible: base_name(name) == base_name(&self.file) && name.ends_with(&self.file),
        }
    }
}

impl fmt::Display for LiteralFileChooser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.file)
    }
}

/// Selects entries matching a glob, or everything for `*` and `/`.
#[derive(Debug, Clone)]
pub struct GlobChooser {
    pattern: String,
    matcher: GlobMatcher,
    all: bool,
}

impl GlobChooser {
    /// Compile `pattern`; `*` and `/` select every entry.
    pub fn new(pattern: impl Into<String>) -> Result<Self, Error> {
        let pattern = pattern.into();
        let matcher = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()?
            .compile_matcher();
        let all = pattern == "*" || pattern == "/";
        Ok(Self {
            pattern,
            matcher,
            all,
        })
    }
}

impl Chooser for GlobChooser {
    fn choose(&self, name: &str, _is_dir: bool, _mode: u32) -> Choice {
        if self.all {
            return Choice {
                direct: true,
                possible: true,
            };
        }
        let trimmed = name.trim_end_matches('/');
        Choice {
            direct: false,
            possible: self.matcher.is_match(base_name(trimmed)) || self.matcher.is_match(trimmed),
        }
    }
}

impl fmt::Display for GlobChooser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_exec() {
        assert!(is_exec("tool.exe", 0o644));
        assert!(is_exec("Tool.AppImage", 0o644));
        assert!(is_exec("bin/tool", 0o644));
        assert!(is_exec("tool.sh", 0o755));
        assert!(!is_exec("README.md", 0o644));
        assert!(is_exec("dist-1.0/README", 0o644));
    }

    #[test]
    fn test_denylist_overrides_mode() {
        assert!(!is_exec("tool.deb", 0o755));
        assert!(!is_exec("man/tool.1", 0o755));
        assert!(!is_exec("LICENSE.txt", 0o777));
    }

    #[test]
    fn test_binary_chooser_exe_without_exec_bit() {
        let chooser = BinaryChooser::new("rg");
        let choice = chooser.choose("rg.exe", false, 0o644);
        assert_eq!(
            choice,
            Choice {
                direct: true,
                possible: true
            }
        );
    }

    #[test]
    fn test_binary_chooser_classification() {
        let chooser = BinaryChooser::new("rg");
        assert!(chooser.choose("ripgrep-13/rg", false, 0o755).direct);
        assert!(chooser.choose("fd.AppImage", false, 0o644).possible);
        assert!(!chooser.choose("fd.AppImage", false, 0o644).direct);
        assert!(!chooser.choose("rg/", true, 0o755).is_selected());
        assert!(!chooser.choose("doc/rg.1", false, 0o755).is_selected());
        assert!(!chooser.choose("complete/rg.bash", false, 0o644).is_selected());
    }

    #[test]
    fn test_literal_file_chooser() {
        let chooser = LiteralFileChooser::new("bin/tool");
        assert!(chooser.choose("pkg/bin/tool", false, 0).possible);
        assert!(!chooser.choose("pkg/lib/tool", false, 0).possible);
        assert!(!chooser.choose("pkg/bin/tool", false, 0).direct);
    }

    #[test]
    fn test_glob_chooser() {
        let chooser = GlobChooser::new("*.md").unwrap();
        assert!(chooser.choose("pkg/README.md", false, 0o644).possible);
        assert!(!chooser.choose("pkg/README.md", false, 0o644).direct);
        assert!(!chooser.choose("pkg/tool", false, 0o755).possible);

        let chooser = GlobChooser::new("pkg/*").unwrap();
        assert!(chooser.choose("pkg/tool", false, 0o755).possible);
        assert!(!chooser.choose("pkg/sub/tool", false, 0o755).possible);
    }

    #[test]
    fn test_glob_chooser_all() {
        let chooser = GlobChooser::new("*").unwrap();
        let choice = chooser.choose("anything/at/all", true, 0);
        assert!(choice.direct && choice.possible);
    }

    #[test]
    fn test_glob_chooser_invalid() {
        assert!(matches!(GlobChooser::new("[unclosed"), Err(Error::InvalidPattern(_))));
    }
}
