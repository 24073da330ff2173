use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::{info, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const CACHE_VERSION: u32 = 1;
const INDEX_FILE: &str = "index.json";
const MAX_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheIndex {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub file: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub fetched_at: String,
    pub len: u64,
    pub sha256: String,
}

/// Downloaded files on disk plus a JSON index of their validators and digests.
pub struct FileCache {
    dir: PathBuf,
    index: Mutex<Option<CacheIndex>>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the local copy of `url`, revalidating it when one is cached.
    ///
    /// A `304` keeps the cached file. If every attempt fails and a verified
    /// copy exists, that copy is used.
    pub fn fetch(&self, client: &Client, url: &str, key: &str) -> Result<PathBuf> {
        let cached = self.verified_entry(key);

        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_fetch(client, url, key, cached.as_ref()) {
                Ok(path) => return Ok(path),
                Err(err) => {
                    warn!("fetch {url} attempt {attempt}/{MAX_ATTEMPTS} failed: {err:#}");
                    last_err = Some(err);
                    if attempt < MAX_ATTEMPTS {
                        let sleep_ms = 500_u64.saturating_mul(attempt as u64);
                        std::thread::sleep(Duration::from_millis(sleep_ms));
                    }
                }
            }
        }

        if let Some(entry) = cached {
            warn!("using cached {} after failed revalidation", entry.file);
            return Ok(self.dir.join(entry.file));
        }
        Err(last_err.unwrap_or_else(|| anyhow!("download failed for {url}")))
    }

    fn try_fetch(
        &self,
        client: &Client,
        url: &str,
        key: &str,
        cached: Option<&CacheEntry>,
    ) -> Result<PathBuf> {
        let mut req = client.get(url);
        if let Some(entry) = cached {
            if let Some(etag) = entry.etag.as_ref() {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = entry.last_modified.as_ref() {
                req = req.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let resp = req.send().with_context(|| format!("request {url}"))?;
        let status = resp.status();
        if status == StatusCode::NOT_MODIFIED {
            let Some(entry) = cached else {
                return Err(anyhow!("received 304 without a cached file"));
            };
            info!("{key} not modified, reusing cached file");
            let mut entry = entry.clone();
            entry.fetched_at = Utc::now().to_rfc3339();
            let path = self.dir.join(&entry.file);
            self.update_index(key, entry)?;
            return Ok(path);
        }

        let resp = resp
            .error_for_status()
            .with_context(|| format!("status for {url}"))?;
        let etag = header_text(resp.headers(), ETAG);
        let last_modified = header_text(resp.headers(), LAST_MODIFIED);
        let bytes = resp.bytes().with_context(|| format!("read body {url}"))?;
        info!("downloaded {key} ({} bytes)", bytes.len());
        self.store(key, &bytes, etag, last_modified)
    }

    /// Writes `bytes` under `key` and records it in the index.
    pub fn store(
        &self,
        key: &str,
        bytes: &[u8],
        etag: Option<String>,
        last_modified: Option<String>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create cache dir {}", self.dir.display()))?;
        let file = key.to_string();
        let path = self.dir.join(&file);
        let tmp = path.with_extension("part");
        fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display()))?;

        let entry = CacheEntry {
            file,
            etag,
            last_modified,
            fetched_at: Utc::now().to_rfc3339(),
            len: bytes.len() as u64,
            sha256: digest(bytes),
        };
        self.update_index(key, entry)?;
        Ok(path)
    }

    /// The index entry for `key`, if its file is present and still matches the digest.
    pub fn verified_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = {
            let mut guard = self.index.lock().unwrap_or_else(PoisonError::into_inner);
            let index = guard.get_or_insert_with(|| load_index(&self.dir));
            index.entries.get(key).cloned()
        }?;
        let bytes = fs::read(self.dir.join(&entry.file)).ok()?;
        if bytes.len() as u64 != entry.len || digest(&bytes) != entry.sha256 {
            warn!("cached {key} failed digest check, treating as miss");
            return None;
        }
        Some(entry)
    }

    fn update_index(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let mut guard = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        let index = guard.get_or_insert_with(|| load_index(&self.dir));
        index.version = CACHE_VERSION;
        index.entries.insert(key.to_string(), entry);
        save_index(&self.dir, index)
    }
}

fn header_text(
    headers: &reqwest::header::HeaderMap,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn load_index(dir: &Path) -> CacheIndex {
    let Ok(raw) = fs::read_to_string(dir.join(INDEX_FILE)) else {
        return CacheIndex::default();
    };
    let index = serde_json::from_str::<CacheIndex>(&raw).unwrap_or_default();
    if index.version != CACHE_VERSION {
        return CacheIndex::default();
    }
    index
}

fn save_index(dir: &Path, index: &CacheIndex) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create cache dir {}", dir.display()))?;
    let path = dir.join(INDEX_FILE);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(index).context("serialize cache index")?;
    fs::write(&tmp, json).context("write cache index")?;
    fs::rename(&tmp, &path).context("swap cache index")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_file_verifies_until_tampered() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let path = cache
            .store("play_by_play_2022.parquet", b"PAR1 data", Some("\"abc\"".into()), None)
            .unwrap();
        assert!(path.exists());

        let entry = cache.verified_entry("play_by_play_2022.parquet").unwrap();
        assert_eq!(entry.len, 9);
        assert_eq!(entry.etag.as_deref(), Some("\"abc\""));
        assert_eq!(entry.sha256.len(), 64);

        fs::write(&path, b"PAR1 evil").unwrap();
        assert!(cache.verified_entry("play_by_play_2022.parquet").is_none());
    }

    #[test]
    fn index_survives_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        FileCache::new(dir.path())
            .store("a.parquet", b"one", None, Some("Mon, 01 Jan 2024 00:00:00 GMT".into()))
            .unwrap();
        let reopened = FileCache::new(dir.path());
        let entry = reopened.verified_entry("a.parquet").unwrap();
        assert_eq!(
            entry.last_modified.as_deref(),
            Some("Mon, 01 Jan 2024 00:00:00 GMT")
        );
        assert!(reopened.verified_entry("b.parquet").is_none());
    }
}
