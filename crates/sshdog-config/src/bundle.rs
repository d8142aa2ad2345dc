//! Optional resource bundle shipped with the executable.
//!
//! A bundle is a flat set of named blobs (`port`, `daemon`, `authorized_keys`,
//! host keys, ...). It can be appended to the executable as a zip archive,
//! compiled into the binary, or sit next to the process as a directory or
//! `<name>.zip` archive. [`BundleLocator`] tries those places in that order
//! and keeps the first hit.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::str::Utf8Error;

use rust_embed::RustEmbed;
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

/// Where a located bundle came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOrigin {
    /// Zip archive appended to the running executable.
    Appended {
        /// Executable carrying the archive.
        executable: PathBuf,
    },
    /// Files compiled into the binary.
    Embedded,
    /// Directory next to the process.
    Directory {
        /// Bundle directory.
        path: PathBuf,
    },
    /// Zip archive next to the process.
    Archive {
        /// Archive file.
        path: PathBuf,
    },
}

impl fmt::Display for BundleOrigin {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Appended { executable } => {
                write!(formatter, "appended:{}", executable.display())
            }
            Self::Embedded => formatter.write_str("embedded"),
            Self::Directory { path } => write!(formatter, "directory:{}", path.display()),
            Self::Archive { path } => write!(formatter, "archive:{}", path.display()),
        }
    }
}

/// Errors raised while locating or reading a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// No strategy produced a bundle.
    #[error("resource bundle '{name}' not found")]
    NotFound {
        /// Requested bundle name.
        name: String,
    },
    /// The bundle has no entry with this name.
    #[error("bundle entry '{name}' not found")]
    EntryNotFound {
        /// Requested entry.
        name: String,
    },
    /// The entry exists but is not UTF-8 text.
    #[error("bundle entry '{name}' is not valid UTF-8: {source}")]
    NotUtf8 {
        /// Requested entry.
        name: String,
        /// Decoding error.
        #[source]
        source: Utf8Error,
    },
    /// Reading from the filesystem failed.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A zip archive could not be read.
    #[error("failed to read archive '{path}': {source}")]
    Archive {
        /// Archive path.
        path: PathBuf,
        /// Underlying archive error.
        #[source]
        source: ZipError,
    },
}

/// Read-only collection of named blobs.
#[derive(Debug, Clone)]
pub struct ResourceBundle {
    origin: BundleOrigin,
    entries: BTreeMap<String, Vec<u8>>,
}

impl ResourceBundle {
    /// Builds a bundle from already-loaded entries.
    pub fn from_entries<I, K, V>(origin: BundleOrigin, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            origin,
            entries: entries
                .into_iter()
                .map(|(name, data)| (name.into(), data.into()))
                .collect(),
        }
    }

    /// Where the bundle was found.
    #[must_use]
    pub const fn origin(&self) -> &BundleOrigin {
        &self.origin
    }

    /// Raw contents of an entry.
    pub fn bytes(&self, name: &str) -> Result<&[u8], BundleError> {
        self.entries
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| BundleError::EntryNotFound {
                name: name.to_owned(),
            })
    }

    /// Contents of an entry as UTF-8 text.
    pub fn string(&self, name: &str) -> Result<&str, BundleError> {
        let bytes = self.bytes(name)?;
        std::str::from_utf8(bytes).map_err(|source| BundleError::NotUtf8 {
            name: name.to_owned(),
            source,
        })
    }

    /// Whether an entry is present. Contents are not inspected.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entry names in lexical order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One way of finding a bundle.
pub trait LocateStrategy: Send + Sync {
    /// Short identifier used in diagnostics.
    fn label(&self) -> &'static str;

    /// Returns `Ok(None)` when this strategy has no bundle to offer.
    fn locate(&self, name: &str) -> Result<Option<ResourceBundle>, BundleError>;
}

/// Result of consulting a single strategy.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The strategy found nothing.
    Absent,
    /// The strategy failed; treated as absent.
    Failed(BundleError),
    /// The strategy produced the bundle.
    Found(BundleOrigin),
}

/// Record of a strategy consulted by [`BundleLocator::locate_with`].
#[derive(Debug)]
pub struct LocateAttempt {
    /// Strategy label.
    pub strategy: &'static str,
    /// What happened.
    pub outcome: AttemptOutcome,
}

/// Ordered list of strategies; the first success wins.
pub struct BundleLocator {
    strategies: Vec<Box<dyn LocateStrategy>>,
}

impl BundleLocator {
    /// Builds a locator from an explicit strategy order.
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn LocateStrategy>>) -> Self {
        Self { strategies }
    }

    /// Appended archive, then embedded files, then `workdir`.
    #[must_use]
    pub fn system(workdir: &Path) -> Self {
        let mut strategies: Vec<Box<dyn LocateStrategy>> = Vec::with_capacity(3);
        if let Ok(executable) = std::env::current_exe() {
            strategies.push(Box::new(AppendedArchive::new(executable)));
        }
        strategies.push(Box::new(EmbeddedBundle));
        strategies.push(Box::new(WorkingDirectory::new(workdir)));
        Self::new(strategies)
    }

    /// Locates `name`, discarding per-strategy details.
    pub fn locate(&self, name: &str) -> Result<ResourceBundle, BundleError> {
        self.locate_with(name, |_| {})
    }

    /// Locates `name`, handing a record of every consulted strategy to
    /// `observe`.
    pub fn locate_with(
        &self,
        name: &str,
        mut observe: impl FnMut(LocateAttempt),
    ) -> Result<ResourceBundle, BundleError> {
        for strategy in &self.strategies {
            let (outcome, bundle) = match strategy.locate(name) {
                Ok(Some(bundle)) => (AttemptOutcome::Found(bundle.origin().clone()), Some(bundle)),
                Ok(None) => (AttemptOutcome::Absent, None),
                Err(error) => (AttemptOutcome::Failed(error), None),
            };
            observe(LocateAttempt {
                strategy: strategy.label(),
                outcome,
            });
            if let Some(found) = bundle {
                return Ok(found);
            }
        }
        Err(BundleError::NotFound {
            name: name.to_owned(),
        })
    }
}

impl fmt::Debug for BundleLocator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.strategies.iter().map(|strategy| strategy.label()))
            .finish()
    }
}

/// Zip archive appended to an executable; entries live under `<name>/`.
#[derive(Debug, Clone)]
pub struct AppendedArchive {
    executable: PathBuf,
}

impl AppendedArchive {
    /// Inspects `executable` for an appended archive.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl LocateStrategy for AppendedArchive {
    fn label(&self) -> &'static str {
        "appended"
    }

    fn locate(&self, name: &str) -> Result<Option<ResourceBundle>, BundleError> {
        let file = File::open(&self.executable).map_err(|source| BundleError::Io {
            path: self.executable.clone(),
            source,
        })?;
        let prefix = format!("{name}/");
        let Some(entries) = read_archive(&self.executable, file, Some(&prefix))? else {
            return Ok(None);
        };
        Ok(non_empty(
            BundleOrigin::Appended {
                executable: self.executable.clone(),
            },
            entries,
        ))
    }
}

#[derive(RustEmbed)]
#[folder = "embedded/"]
#[exclude = ".*"]
struct EmbeddedFiles;

/// Files compiled in from the crate's `embedded/` directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedBundle;

impl LocateStrategy for EmbeddedBundle {
    fn label(&self) -> &'static str {
        "embedded"
    }

    fn locate(&self, _name: &str) -> Result<Option<ResourceBundle>, BundleError> {
        let entries = EmbeddedFiles::iter()
            .filter_map(|path| {
                EmbeddedFiles::get(&path).map(|file| (path.into_owned(), file.data.into_owned()))
            })
            .collect::<BTreeMap<_, _>>();
        Ok(non_empty(BundleOrigin::Embedded, entries))
    }
}

/// `<root>/<name>` directory, or failing that `<root>/<name>.zip`.
#[derive(Debug, Clone)]
pub struct WorkingDirectory {
    root: PathBuf,
}

impl WorkingDirectory {
    /// Looks for bundles under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LocateStrategy for WorkingDirectory {
    fn label(&self) -> &'static str {
        "working_directory"
    }

    fn locate(&self, name: &str) -> Result<Option<ResourceBundle>, BundleError> {
        let directory = self.root.join(name);
        if directory.is_dir() {
            let mut entries = BTreeMap::new();
            read_directory(&directory, "", &mut entries)?;
            return Ok(non_empty(BundleOrigin::Directory { path: directory }, entries));
        }

        let archive = self.root.join(format!("{name}.zip"));
        if archive.is_file() {
            let file = File::open(&archive).map_err(|source| BundleError::Io {
                path: archive.clone(),
                source,
            })?;
            let Some(entries) = read_archive(&archive, file, None)? else {
                return Ok(None);
            };
            return Ok(non_empty(BundleOrigin::Archive { path: archive }, entries));
        }

        Ok(None)
    }
}

fn non_empty(origin: BundleOrigin, entries: BTreeMap<String, Vec<u8>>) -> Option<ResourceBundle> {
    if entries.is_empty() {
        None
    } else {
        Some(ResourceBundle { origin, entries })
    }
}

/// Reads every file entry, optionally restricted to `prefix` (which is
/// stripped). Returns `Ok(None)` when `reader` holds no zip archive.
fn read_archive<R: Read + Seek>(
    path: &Path,
    reader: R,
    prefix: Option<&str>,
) -> Result<Option<BTreeMap<String, Vec<u8>>>, BundleError> {
    let archive_error = |source| BundleError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let mut archive = match ZipArchive::new(reader) {
        Ok(archive) => archive,
        Err(ZipError::InvalidArchive(_)) => return Ok(None),
        Err(source) => return Err(archive_error(source)),
    };

    let mut entries = BTreeMap::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(archive_error)?;
        if file.is_dir() {
            continue;
        }
        let relative = match prefix {
            Some(prefix) => match file.name().strip_prefix(prefix) {
                Some(rest) if !rest.is_empty() => rest.to_owned(),
                _ => continue,
            },
            None => file.name().to_owned(),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|source| BundleError::Io {
                path: path.join(&relative),
                source,
            })?;
        entries.insert(relative, data);
    }
    Ok(Some(entries))
}

fn read_directory(
    directory: &Path,
    prefix: &str,
    entries: &mut BTreeMap<String, Vec<u8>>,
) -> Result<(), BundleError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BundleError::Io { path, source }
    };
    for entry in fs::read_dir(directory).map_err(io_error(directory))? {
        let entry = entry.map_err(io_error(directory))?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let name = if prefix.is_empty() {
            file_name
        } else {
            format!("{prefix}/{file_name}")
        };
        if path.is_dir() {
            read_directory(&path, &name, entries)?;
        } else {
            let data = fs::read(&path).map_err(io_error(&path))?;
            entries.insert(name, data);
        }
    }
    Ok(())
}
