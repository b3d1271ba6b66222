//! Extraction of a chosen file or directory from a downloaded asset.

use crate::archive::{dispatch, ArchiveFormat, Compression, Entry, EntryType};
use crate::chooser::{is_definitely_not_exec, is_exec, strip_suffix_ignore_case, Chooser};
use crate::detector::base_name;
use crate::error::Error;
use crate::safety::join_within;
use crate::selection::{resolve, Selection};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Permission bits for a single file extracted from a non-archive asset,
/// before the executable bit is derived.
pub const DEFAULT_FILE_MODE: u32 = 0o666;

/// Reads an asset's bytes and selects what to extract from it.
pub trait Extractor {
    /// Select from `data`. A single direct hit returns immediately unless
    /// `allow_multiple` is set, in which case every hit is collected.
    fn extract<'a>(
        &self,
        data: &'a [u8],
        allow_multiple: bool,
    ) -> Result<Selection<ExtractedFile<'a>>, Error>;
}

enum Payload<'a> {
    /// Contents already read from the asset.
    File(Vec<u8>),
    /// A directory; its contents are read from the asset again when written.
    Directory {
        data: &'a [u8],
        format: ArchiveFormat,
        compression: Compression,
        prefix: String,
    },
}

/// A file or directory selected for extraction.
pub struct ExtractedFile<'a> {
    /// Suggested destination file name
    pub name: String,
    /// Path inside the asset
    pub archive_name: String,
    mode: u32,
    payload: Payload<'a>,
}

impl ExtractedFile<'_> {
    /// Permission bits to write with: the entry's own bits, plus the execute
    /// bits when the (renamed) file looks executable.
    pub fn mode(&self) -> u32 {
        if is_exec(&self.name, self.mode) {
            self.mode | 0o111
        } else {
            self.mode
        }
    }

    /// Whether this item is a whole directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.payload, Payload::Directory { .. })
    }

    /// The file's bytes; `None` for a directory.
    pub fn contents(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::File(data) => Some(data),
            Payload::Directory { .. } => None,
        }
    }

    /// Materialize this item at `to`.
    ///
    /// A file replaces whatever exists at `to`. A directory is recreated under
    /// `to`, regular files first and links last; already-written files are
    /// left in place if a later write fails.
    pub fn write(&self, to: &Path) -> Result<(), Error> {
        match &self.payload {
            Payload::File(data) => {
                debug!(from = %self.archive_name, to = %to.display(), mode = %format_args!("{:o}", self.mode()), "writing file");
                write_file(data, to, self.mode())
            }
            Payload::Directory {
                data,
                format,
                compression,
                prefix,
            } => {
                debug!(from = %self.archive_name, to = %to.display(), "writing directory");
                write_directory(data, *format, *compression, prefix, to)
            }
        }
    }
}

impl fmt::Display for ExtractedFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.archive_name)
    }
}

impl fmt::Debug for ExtractedFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractedFile")
            .field("name", &self.name)
            .field("archive_name", &self.archive_name)
            .field("mode", &format_args!("{:o}", self.mode()))
            .field("is_dir", &self.is_dir())
            .finish()
    }
}

/// Pick a destination name for `file`.
///
/// `.exe` names are kept, a trailing `.appimage` is stripped, anything else
/// takes `guess`. Names on the non-executable denylist are never renamed.
pub fn rename(file: &str, guess: &str) -> String {
    if is_definitely_not_exec(file) {
        return file.to_string();
    }
    if let Some(stripped) = strip_suffix_ignore_case(file, ".appimage") {
        return stripped.to_string();
    }
    if strip_suffix_ignore_case(file, ".exe").is_some() {
        return file.to_string();
    }
    guess.to_string()
}

/// Build the extractor for an asset called `filename`, dispatching on its
/// suffix. An empty `tool` falls back to `filename` as the rename hint.
pub fn new_extractor(filename: &str, tool: &str, chooser: Box<dyn Chooser>) -> Box<dyn Extractor> {
    let (format, compression) = dispatch(filename);
    let tool = if tool.is_empty() { filename } else { tool };
    debug!(filename, ?format, ?compression, "selected extractor");
    match format {
        Some(format) => Box::new(ArchiveExtractor::new(format, compression, chooser)),
        None => Box::new(SingleFileExtractor::new(filename, tool, compression)),
    }
}

/// Extracts entries selected by a [`Chooser`] from an archive.
pub struct ArchiveExtractor {
    format: ArchiveFormat,
    compression: Compression,
    chooser: Box<dyn Chooser>,
}

impl ArchiveExtractor {
    /// Extractor for archives of `format`, decompressed with `compression`.
    pub fn new(format: ArchiveFormat, compression: Compression, chooser: Box<dyn Chooser>) -> Self {
        Self {
            format,
            compression,
            chooser,
        }
    }
}

impl Extractor for ArchiveExtractor {
    fn extract<'a>(
        &self,
        data: &'a [u8],
        allow_multiple: bool,
    ) -> Result<Selection<ExtractedFile<'a>>, Error> {
        let mut archive = self.format.open(data, self.compression)?;
        let mut dirs: Vec<String> = Vec::new();
        let mut candidates = Vec::new();

        while let Some(entry) = archive.next_entry()? {
            // Descendants of a selected directory are written with it.
            if dirs.iter().any(|dir| entry.name.starts_with(dir.as_str())) {
                continue;
            }
            if entry.is_link() {
                continue;
            }

            let choice = self.chooser.choose(&entry.name, entry.is_dir(), entry.mode);
            trace!(entry = %entry.name, direct = choice.direct, possible = choice.possible, "chose");
            if !choice.is_selected() {
                continue;
            }

            let payload = if entry.is_dir() {
                dirs.push(entry.name.clone());
                Payload::Directory {
                    data,
                    format: self.format,
                    compression: self.compression,
                    prefix: entry.name.clone(),
                }
            } else {
                Payload::File(archive.read_all()?)
            };
            let is_dir = entry.is_dir();
            let file = extracted(entry, payload);

            if choice.direct && !is_dir && !allow_multiple {
                debug!(entry = %file.archive_name, "direct match");
                return Ok(Selection::Resolved(file));
            }
            candidates.push(file);
        }

        resolve(
            candidates,
            |n| format!("{} candidates for target {} found", n, self.chooser),
            || format!("target {} not found in archive", self.chooser),
        )
    }
}

fn extracted<'a>(entry: Entry, payload: Payload<'a>) -> ExtractedFile<'a> {
    let base = base_name(&entry.name);
    let name = rename(base, base);
    ExtractedFile {
        name,
        archive_name: entry.name,
        mode: entry.mode,
        payload,
    }
}

/// Treats the whole (decompressed) asset as one file.
#[derive(Debug, Clone)]
pub struct SingleFileExtractor {
    name: String,
    rename: String,
    compression: Compression,
}

impl SingleFileExtractor {
    /// Extractor for the asset `name`, renamed after `rename` where the
    /// rename heuristic allows.
    pub fn new(name: impl Into<String>, rename: impl Into<String>, compression: Compression) -> Self {
        Self {
            name: name.into(),
            rename: rename.into(),
            compression,
        }
    }

    /// Extractor that copies the asset unchanged under its own name.
    pub fn passthrough(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, Compression::None)
    }
}

impl Extractor for SingleFileExtractor {
    fn extract<'a>(
        &self,
        data: &'a [u8],
        _allow_multiple: bool,
    ) -> Result<Selection<ExtractedFile<'a>>, Error> {
        let contents = self.compression.decompress(data)?.into_owned();
        Ok(Selection::Resolved(ExtractedFile {
            name: rename(&self.name, &self.rename),
            archive_name: self.name.clone(),
            mode: DEFAULT_FILE_MODE,
            payload: Payload::File(contents),
        }))
    }
}

/// Replace `path` with a fresh file holding `data` and permission bits `mode`.
pub(crate) fn write_file(data: &[u8], path: &Path, mode: u32) -> Result<(), Error> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;

    // The umask may have masked bits off at create time.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

fn write_directory(
    data: &[u8],
    format: ArchiveFormat,
    compression: Compression,
    prefix: &str,
    to: &Path,
) -> Result<(), Error> {
    let mut archive = format.open(data, compression)?;
    let mut links = Vec::new();
    fs::create_dir_all(to)?;

    while let Some(entry) = archive.next_entry()? {
        let Some(relative) = entry.name.strip_prefix(prefix) else {
            continue;
        };
        let dest = join_within(to, relative)?;
        match entry.entry_type {
            EntryType::Normal => {
                let contents = archive.read_all()?;
                trace!(entry = %entry.name, to = %dest.display(), "writing");
                write_file(&contents, &dest, entry.mode)?;
            }
            EntryType::Directory => fs::create_dir_all(&dest)?,
            EntryType::HardLink | EntryType::SymLink => links.push((entry, dest)),
            EntryType::Other => {}
        }
    }

    // Links go last so that their targets already exist.
    for (entry, dest) in links {
        create_link(&entry, prefix, to, &dest)?;
    }
    Ok(())
}

fn create_link(entry: &Entry, prefix: &str, to: &Path, dest: &Path) -> Result<(), Error> {
    let target = entry
        .link_name
        .as_deref()
        .ok_or_else(|| Error::Malformed(format!("link `{}` has no target", entry.name)))?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let result = match entry.entry_type {
        EntryType::HardLink => {
            // Hard link targets are archive paths; map them into the destination.
            let source = join_within(to, target.strip_prefix(prefix).unwrap_or(target))?;
            fs::hard_link(source, dest)
        }
        _ => symlink(target, dest),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            warn!(link = %dest.display(), "link already exists, keeping it");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn symlink(target: &str, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &str, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &str, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}
