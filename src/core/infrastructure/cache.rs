use chrono::Utc;
use data_encoding::HEXLOWER;
use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::CacheError;

/// On-disk record layout version. Any other value is discarded as corrupt.
pub const CACHE_VERSION: u8 = 1;
pub const DEFAULT_TTL_SECS: i64 = 30 * 24 * 60 * 60;

const KEY_BYTES: usize = 12;
const ENTRY_EXTENSION: &str = "bin";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricEntry {
    pub version: u8,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    pub duration: f64,
    pub instrumental: bool,
    pub plain_lyrics: String,
    pub synced_lyrics: String,
    /// User-adjusted sync offset in seconds
    pub sync_offset: f64,
    pub created_at: i64,
    pub expires_at: i64,
}

impl LyricEntry {
    fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub size_bytes: u64,
}

/// Two-tier lyric store: an in-memory map in front of one file per key.
///
/// When the backing directory is unusable the cache runs memory-only and
/// every file-tier operation quietly reports a miss or an empty result.
pub struct DiskCache {
    base_path: Option<PathBuf>,
    mem_cache: RwLock<HashMap<String, LyricEntry>>,
    ttl_secs: i64,
    temp_counter: AtomicU64,
}

impl DiskCache {
    pub fn open(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        let base_path = match fs::create_dir_all(&cache_dir) {
            Ok(()) => Some(cache_dir),
            Err(e) => {
                warn!(
                    "Lyrics cache directory {} unavailable, using memory only: {}",
                    cache_dir.display(),
                    e
                );
                None
            }
        };

        Self::with_base_path(base_path)
    }

    pub fn in_memory() -> Self {
        Self::with_base_path(None)
    }

    fn with_base_path(base_path: Option<PathBuf>) -> Self {
        Self {
            base_path,
            mem_cache: RwLock::new(HashMap::new()),
            ttl_secs: DEFAULT_TTL_SECS,
            temp_counter: AtomicU64::new(0),
        }
    }

    /// Directory holding persisted entries, `None` in memory-only mode
    pub fn path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn get(&self, artist: &str, title: &str) -> Result<LyricEntry, CacheError> {
        if artist.is_empty() || title.is_empty() {
            return Err(CacheError::Miss);
        }

        let key = generate_key(artist, title);
        let now = Utc::now().timestamp();

        let cached = self.mem_read().get(&key).cloned();
        if let Some(entry) = cached {
            if !entry.is_expired_at(now) {
                debug!("Memory cache hit for: {} - {}", artist, title);
                return Ok(entry);
            }
            self.mem_write().remove(&key);
        }

        let Some(file_path) = self.file_path(&key) else {
            return Err(CacheError::Miss);
        };

        let entry = match read_from_disk(&file_path) {
            Ok(entry) => entry,
            Err(CacheError::Corrupt) => {
                debug!("Removing corrupt cache file for: {} - {}", artist, title);
                remove_quietly(&file_path);
                return Err(CacheError::Corrupt);
            }
            Err(e) => return Err(e),
        };

        if entry.is_expired_at(now) {
            debug!("Cache entry expired for: {} - {}", artist, title);
            remove_quietly(&file_path);
            return Err(CacheError::Expired);
        }

        debug!("Disk cache hit for: {} - {}", artist, title);
        self.mem_write().insert(key, entry.clone());
        Ok(entry)
    }

    /// Stamp `entry` with a fresh TTL and store it in both tiers.
    ///
    /// The memory tier is updated before the file write, so a failed write
    /// still leaves the entry usable for this process.
    pub fn set(&self, artist: &str, title: &str, mut entry: LyricEntry) -> Result<(), CacheError> {
        if artist.is_empty() || title.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let key = generate_key(artist, title);
        let now = Utc::now().timestamp();
        entry.version = CACHE_VERSION;
        entry.created_at = now;
        entry.expires_at = now + self.ttl_secs;

        self.mem_write().insert(key.clone(), entry.clone());

        match self.file_path(&key) {
            Some(file_path) => self.write_to_disk(&file_path, &entry),
            None => Ok(()),
        }
    }

    /// Persist a new sync offset for an existing entry.
    pub fn update_offset(&self, artist: &str, title: &str, offset: f64) -> Result<LyricEntry, CacheError> {
        let mut entry = self.get(artist, title)?;
        entry.sync_offset = offset;
        self.set(artist, title, entry)?;
        self.get(artist, title)
    }

    pub fn delete(&self, artist: &str, title: &str) -> Result<(), CacheError> {
        if artist.is_empty() || title.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let key = generate_key(artist, title);
        self.mem_write().remove(&key);

        let Some(file_path) = self.file_path(&key) else {
            return Ok(());
        };

        match fs::remove_file(&file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.mem_write().clear();

        let mut removed = 0usize;
        for path in self.cache_files(&[ENTRY_EXTENSION, TEMP_EXTENSION])? {
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        info!("Lyrics cache cleared, removed {} files", removed);
        Ok(())
    }

    /// Remove every persisted entry that is undecodable, has a foreign
    /// version, or has expired. Returns how many files were removed.
    pub fn prune(&self) -> Result<usize, CacheError> {
        let now = Utc::now().timestamp();
        self.mem_write().retain(|_, entry| !entry.is_expired_at(now));

        let mut pruned = 0usize;
        for path in self.cache_files(&[ENTRY_EXTENSION])? {
            let stale = match read_from_disk(&path) {
                Ok(entry) => entry.is_expired_at(now),
                Err(_) => true,
            };

            if stale {
                remove_quietly(&path);
                pruned += 1;
            }
        }

        info!("Lyrics cache prune removed {} entries", pruned);
        Ok(pruned)
    }

    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();
        for path in self.cache_files(&[ENTRY_EXTENSION])? {
            if let Ok(metadata) = fs::metadata(&path) {
                stats.total_entries += 1;
                stats.size_bytes += metadata.len();
            }
        }
        Ok(stats)
    }

    /// Every decodable entry on disk. Undecodable files are skipped.
    pub fn list_all(&self) -> Result<Vec<LyricEntry>, CacheError> {
        Ok(self
            .cache_files(&[ENTRY_EXTENSION])?
            .iter()
            .filter_map(|path| read_from_disk(path).ok())
            .collect())
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        self.base_path
            .as_ref()
            .map(|base| base.join(format!("{}.{}", key, ENTRY_EXTENSION)))
    }

    fn cache_files(&self, extensions: &[&str]) -> Result<Vec<PathBuf>, CacheError> {
        let Some(base) = &self.base_path else {
            return Ok(Vec::new());
        };

        let dir = match fs::read_dir(base) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| extensions.contains(&ext))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Write to a uniquely named temp file, sync it, then rename it over the
    /// destination. Readers only ever see a complete file at `file_path`.
    fn write_to_disk(&self, file_path: &Path, entry: &LyricEntry) -> Result<(), CacheError> {
        let bytes = bincode::serialize(entry)?;
        let tmp_path = file_path.with_extension(format!(
            "{}.{}.{}",
            std::process::id(),
            self.temp_counter.fetch_add(1, Ordering::Relaxed),
            TEMP_EXTENSION
        ));

        let result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&tmp_path, file_path)
        })();

        if let Err(e) = result {
            remove_quietly(&tmp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn mem_read(&self) -> RwLockReadGuard<'_, HashMap<String, LyricEntry>> {
        self.mem_cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn mem_write(&self) -> RwLockWriteGuard<'_, HashMap<String, LyricEntry>> {
        self.mem_cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hex SHA-256 of `lower(artist)|lower(title)`, truncated to 12 bytes.
pub fn generate_key(artist: &str, title: &str) -> String {
    let normalized = format!("{}|{}", artist.to_lowercase(), title.to_lowercase());
    let hash = digest(&SHA256, normalized.as_bytes());
    HEXLOWER.encode(&hash.as_ref()[..KEY_BYTES])
}

fn read_from_disk(file_path: &Path) -> Result<LyricEntry, CacheError> {
    let bytes = match fs::read(file_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(CacheError::Miss),
        Err(e) => return Err(e.into()),
    };

    let entry: LyricEntry = bincode::deserialize(&bytes).map_err(|_| CacheError::Corrupt)?;
    if entry.version != CACHE_VERSION {
        return Err(CacheError::Corrupt);
    }

    Ok(entry)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            debug!("Failed to remove cache file {}: {}", path.display(), e);
        }
    }
}
