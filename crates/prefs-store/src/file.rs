use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use prefs_types::Value;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::batch::EditBatch;
use crate::error::{StoreError, StoreResult};
use crate::traits::KeyValueStore;

/// Magic prefix of the header line.
const HEADER_PREFIX: &str = "prefs-v1 crc32=";

/// Flush strategy for commits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` the new image before it replaces the old one, then the
    /// directory after the rename.
    #[default]
    EveryCommit,
    /// Rely on OS page-cache buffering (faster, survives process crashes but
    /// not power loss).
    OsDefault,
}

/// Configuration for a [`FileStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Sync/flush strategy.
    pub sync_mode: SyncMode,
    /// Create missing parent directories on open.
    pub create_dirs: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            create_dirs: true,
        }
    }
}

/// Crash-safe, single-file key-value store.
///
/// On-disk format:
/// ```text
/// prefs-v1 crc32=<8 hex digits>\n
/// <JSON object: key -> {"type": ..., "value": ...}>
/// ```
///
/// The CRC32 covers the JSON body. Every commit writes a complete new image
/// to a temporary file in the same directory and renames it over the target,
/// so the file on disk is always either the previous or the next image. The
/// in-memory view is swapped only after the rename succeeds.
pub struct FileStore {
    path: PathBuf,
    config: FileStoreConfig,
    entries: RwLock<BTreeMap<String, Value>>,
}

impl FileStore {
    /// Open (or lazily create) the store file at `path`.
    ///
    /// A missing file opens as an empty store; nothing is written until the
    /// first commit.
    pub fn open(path: impl AsRef<Path>, config: FileStoreConfig) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if config.create_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = read_image(&path)?;
        debug!(path = %path.display(), entries = entries.len(), "opened file store");

        Ok(Self {
            path,
            config,
            entries: RwLock::new(entries),
        })
    }

    /// Path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    /// Re-read the file, picking up commits made by other handles.
    pub fn reload(&self) -> StoreResult<()> {
        let fresh = read_image(&self.path)?;
        *self.entries.write()? = fresh;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, Value>) -> StoreResult<()> {
        let image = encode_image(entries)?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&image)?;
        tmp.flush()?;
        if self.config.sync_mode == SyncMode::EveryCommit {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        if self.config.sync_mode == SyncMode::EveryCommit {
            sync_dir(dir)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entries.read()?.get(key).cloned())
    }

    fn get_all(&self) -> StoreResult<BTreeMap<String, Value>> {
        Ok(self.entries.read()?.clone())
    }

    fn commit_batch(&self, batch: EditBatch) -> StoreResult<()> {
        batch.check_storable()?;
        let ops = batch.len();
        let mut entries = self.entries.write()?;

        let mut next = entries.clone();
        batch.apply_to(&mut next);
        self.persist(&next)?;
        *entries = next;

        debug!(path = %self.path.display(), ops, entries = entries.len(), "file commit");
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.read()?.contains_key(key))
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|e| e.len()).ok();
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("entry_count", &count)
            .finish()
    }
}

fn encode_image(entries: &BTreeMap<String, Value>) -> StoreResult<Vec<u8>> {
    let body =
        serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&body);

    let mut image = format!("{HEADER_PREFIX}{crc:08x}\n").into_bytes();
    image.extend_from_slice(&body);
    Ok(image)
}

/// Flush the directory entry so the rename itself survives power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn read_image(path: &Path) -> StoreResult<BTreeMap<String, Value>> {
    match fs::read(path) {
        Ok(bytes) => decode_image(path, &bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn decode_image(path: &Path, bytes: &[u8]) -> StoreResult<BTreeMap<String, Value>> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let newline = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| corrupt("missing header line".into()))?;
    let (header, body) = (&bytes[..newline], &bytes[newline + 1..]);

    let expected = std::str::from_utf8(header)
        .ok()
        .and_then(|h| h.strip_prefix(HEADER_PREFIX))
        .and_then(|hex| u32::from_str_radix(hex.trim(), 16).ok())
        .ok_or_else(|| corrupt("malformed header".into()))?;

    let actual = crc32fast::hash(body);
    if actual != expected {
        return Err(corrupt(format!(
            "checksum mismatch: expected {expected:08x}, computed {actual:08x}"
        )));
    }

    serde_json::from_slice(body).map_err(|e| corrupt(e.to_string()))
}
