//! Format-agnostic sequential access to archive entries.
//!
//! Two orthogonal pieces are combined through a suffix table:
//! - a [`Compression`] transform wrapping the raw byte stream
//! - an [`ArchiveFormat`] producing an [`Archive`] over the (decompressed) bytes
//!
//! Extraction code only ever talks to the [`Archive`] trait.

use crate::error::Error;
use std::borrow::Cow;
use std::io::{self, BufReader, Cursor, Read};
use std::ops::Range;
use tracing::trace;

/// Kind of an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Regular file
    Normal,
    /// Directory
    Directory,
    /// Hard link to another entry
    HardLink,
    /// Symbolic link
    SymLink,
    /// Device, fifo, sparse or other unsupported record
    Other,
}

/// One record read from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Archive-relative path; directories always end with `/`
    pub name: String,
    /// Link target for hard and symbolic links
    pub link_name: Option<String>,
    /// Unix permission bits
    pub mode: u32,
    /// Entry kind
    pub entry_type: EntryType,
}

impl Entry {
    /// Whether this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Whether this entry is a hard or symbolic link.
    pub fn is_link(&self) -> bool {
        matches!(self.entry_type, EntryType::HardLink | EntryType::SymLink)
    }
}

/// Sequential reader over archive entries.
pub trait Archive {
    /// Advance to the next entry. Returns `None` at the end, and keeps
    /// returning `None` on further calls.
    fn next_entry(&mut self) -> Result<Option<Entry>, Error>;

    /// Contents of the entry returned by the last successful `next_entry`.
    /// Fails with [`Error::Malformed`] before the first entry or past the end.
    fn read_all(&mut self) -> Result<Vec<u8>, Error>;
}

/// Decompression transform applied to a raw byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Bytes are passed through unchanged
    None,
    /// gzip (multi-member streams included)
    Gzip,
    /// bzip2
    Bzip2,
    /// xz
    Xz,
    /// Zstandard
    Zstd,
}

impl Compression {
    /// Wrap `reader` so that reading yields decompressed bytes.
    pub fn wrap<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>, Error> {
        match self {
            Compression::None => Ok(Box::new(reader)),
            Compression::Gzip => Ok(Box::new(flate2::read::MultiGzDecoder::new(reader))),
            Compression::Bzip2 => Ok(Box::new(bzip2::read::BzDecoder::new(reader))),
            Compression::Xz => {
                // lzma-rs decodes in one pass rather than as a stream
                let mut input = BufReader::new(reader);
                let mut out = Vec::new();
                lzma_rs::xz_decompress(&mut input, &mut out)
                    .map_err(|e| Error::Malformed(format!("xz: {:?}", e)))?;
                Ok(Box::new(Cursor::new(out)))
            }
            Compression::Zstd => {
                let decoder = zstd::stream::read::Decoder::new(reader)
                    .map_err(|e| Error::Malformed(format!("zstd: {}", e)))?;
                Ok(Box::new(decoder))
            }
        }
    }

    /// Decompress all of `data`.
    pub fn decompress<'a>(self, data: &'a [u8]) -> Result<Cow<'a, [u8]>, Error> {
        if self == Compression::None {
            return Ok(Cow::Borrowed(data));
        }
        let mut out = Vec::new();
        self.wrap(data)?
            .read_to_end(&mut out)
            .map_err(|e| Error::Malformed(format!("{:?} stream: {}", self, e)))?;
        Ok(Cow::Owned(out))
    }
}

/// Container format of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// tar, possibly wrapped in a compression transform
    Tar,
    /// zip; compression is per entry
    Zip,
}

impl ArchiveFormat {
    /// Open `data` as an archive of this format.
    pub fn open<'a>(
        self,
        data: &'a [u8],
        compression: Compression,
    ) -> Result<Box<dyn Archive + 'a>, Error> {
        match self {
            ArchiveFormat::Tar => Ok(Box::new(TarArchive::new(data, compression)?)),
            ArchiveFormat::Zip => Ok(Box::new(ZipArchive::new(data)?)),
        }
    }
}

/// Filename suffixes in priority order; longer suffixes come first since
/// they nest (`.tar.gz` before `.gz`).
const SUFFIX_TABLE: &[(&str, Option<ArchiveFormat>, Compression)] = &[
    (".tar.gz", Some(ArchiveFormat::Tar), Compression::Gzip),
    (".tgz", Some(ArchiveFormat::Tar), Compression::Gzip),
    (".tar.bz2", Some(ArchiveFormat::Tar), Compression::Bzip2),
    (".tbz", Some(ArchiveFormat::Tar), Compression::Bzip2),
    (".tar.xz", Some(ArchiveFormat::Tar), Compression::Xz),
    (".txz", Some(ArchiveFormat::Tar), Compression::Xz),
    (".tar.zst", Some(ArchiveFormat::Tar), Compression::Zstd),
    (".tar", Some(ArchiveFormat::Tar), Compression::None),
    (".zip", Some(ArchiveFormat::Zip), Compression::None),
    (".gz", None, Compression::Gzip),
    (".bz2", None, Compression::Bzip2),
    (".xz", None, Compression::Xz),
    (".zst", None, Compression::Zstd),
];

/// Pick the archive format and compression for a file name.
///
/// `None` means the file is not an archive and should be copied as one file
/// after applying the compression transform.
pub fn dispatch(filename: &str) -> (Option<ArchiveFormat>, Compression) {
    SUFFIX_TABLE
        .iter()
        .find(|(suffix, _, _)| filename.ends_with(suffix))
        .map(|&(_, format, compression)| (format, compression))
        .unwrap_or((None, Compression::None))
}

/// `filename` without the archive or compression suffix [`dispatch`] keys on.
pub fn strip_archive_suffix(filename: &str) -> &str {
    SUFFIX_TABLE
        .iter()
        .find_map(|(suffix, _, _)| filename.strip_suffix(suffix))
        .unwrap_or(filename)
}

/// tar archive over an in-memory buffer.
///
/// The decompressed stream is indexed once on open; `read_all` slices
/// file contents out of that buffer.
pub struct TarArchive<'a> {
    data: Cow<'a, [u8]>,
    entries: Vec<(Entry, Range<usize>)>,
    cursor: usize,
    current: Option<usize>,
}

impl<'a> TarArchive<'a> {
    /// Decompress `data` with `compression` and index its records.
    pub fn new(data: &'a [u8], compression: Compression) -> Result<Self, Error> {
        let data = compression.decompress(data)?;
        let entries = index_tar(&data)?;
        Ok(Self {
            data,
            entries,
            cursor: 0,
            current: None,
        })
    }
}

fn index_tar(data: &[u8]) -> Result<Vec<(Entry, Range<usize>)>, Error> {
    let malformed = |e: io::Error| Error::Malformed(format!("tar: {}", e));
    let mut archive = tar::Archive::new(data);
    let mut index = Vec::new();

    for entry in archive.entries().map_err(malformed)? {
        let entry = entry.map_err(malformed)?;
        let header = entry.header();

        let entry_type = match header.entry_type() {
            tar::EntryType::Regular | tar::EntryType::Continuous => EntryType::Normal,
            tar::EntryType::Directory => EntryType::Directory,
            tar::EntryType::Link => EntryType::HardLink,
            tar::EntryType::Symlink => EntryType::SymLink,
            _ => EntryType::Other,
        };
        if entry_type == EntryType::Other {
            trace!(kind = ?header.entry_type(), "skipping tar record");
            continue;
        }

        let mut name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if entry_type == EntryType::Directory && !name.ends_with('/') {
            name.push('/');
        }
        let link_name = entry
            .link_name_bytes()
            .map(|link| String::from_utf8_lossy(&link).into_owned());
        let mode = header.mode().map_err(malformed)? & 0o7777;

        let start = usize::try_from(entry.raw_file_position())
            .map_err(|_| Error::Malformed("tar: entry offset out of range".to_string()))?;
        let len = usize::try_from(entry.size())
            .map_err(|_| Error::Malformed("tar: entry size out of range".to_string()))?;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::Malformed(format!("tar: truncated entry `{}`", name)))?;

        index.push((
            Entry {
                name,
                link_name,
                mode,
                entry_type,
            },
            start..end,
        ));
    }

    Ok(index)
}

impl Archive for TarArchive<'_> {
    fn next_entry(&mut self) -> Result<Option<Entry>, Error> {
        match self.entries.get(self.cursor) {
            Some((entry, _)) => {
                self.current = Some(self.cursor);
                self.cursor += 1;
                Ok(Some(entry.clone()))
            }
            None => {
                self.current = None;
                Ok(None)
            }
        }
    }

    fn read_all(&mut self) -> Result<Vec<u8>, Error> {
        let (_, range) = self
            .current
            .and_then(|i| self.entries.get(i))
            .ok_or_else(no_current_entry)?;
        Ok(self.data[range.clone()].to_vec())
    }
}

/// zip archive over an in-memory buffer.
///
/// The central directory is read eagerly, so iteration is index based.
pub struct ZipArchive<'a> {
    archive: zip::ZipArchive<Cursor<&'a [u8]>>,
    entries: Vec<Entry>,
    cursor: usize,
    current: Option<usize>,
}

impl<'a> ZipArchive<'a> {
    /// Read the central directory of `data`.
    pub fn new(data: &'a [u8]) -> Result<Self, Error> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            let name = file.name().to_string();
            let is_dir = name.ends_with('/');
            let raw_mode = file.unix_mode();
            let mode = raw_mode.map(|m| m & 0o7777).unwrap_or(if is_dir {
                0o755
            } else {
                0o644
            });
            let entry_type = match raw_mode {
                _ if is_dir => EntryType::Directory,
                Some(m) if m & 0o170000 == 0o120000 => EntryType::SymLink,
                _ => EntryType::Normal,
            };
            entries.push(Entry {
                name,
                link_name: None,
                mode,
                entry_type,
            });
        }

        Ok(Self {
            archive,
            entries,
            cursor: 0,
            current: None,
        })
    }

    fn read_index(&mut self, index: usize) -> Result<Vec<u8>, Error> {
        let mut file = self.archive.by_index(index)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::Malformed(format!("zip: {}: {}", file.name(), e)))?;
        Ok(data)
    }
}

impl Archive for ZipArchive<'_> {
    fn next_entry(&mut self) -> Result<Option<Entry>, Error> {
        let index = self.cursor;
        let Some(mut entry) = self.entries.get(index).cloned() else {
            self.current = None;
            return Ok(None);
        };
        self.cursor += 1;
        self.current = Some(index);

        // zip stores a symlink's target as the entry's contents
        if entry.entry_type == EntryType::SymLink {
            let target = self.read_index(index)?;
            entry.link_name = Some(String::from_utf8_lossy(&target).into_owned());
        }
        Ok(Some(entry))
    }

    fn read_all(&mut self) -> Result<Vec<u8>, Error> {
        let index = self.current.ok_or_else(no_current_entry)?;
        self.read_index(index)
    }
}

fn no_current_entry() -> Error {
    Error::Malformed("read past the last archive entry".to_string())
}
