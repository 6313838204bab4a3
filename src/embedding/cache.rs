//! Embedding cache: SHA-256-keyed LRU over [`EmbeddingProvider`] with
//! at-most-once computation per key and optional disk persistence.
//!
//! Grounded on `llmspell-memory::embeddings::cached::CachedEmbeddingService`
//! (SHA-256 keys, `parking_lot::Mutex`-guarded LRU) layered over this
//! crate's [`crate::cache::LruCache`] instead of the `lru` crate directly,
//! since the generic cache here already provides the `entries()` /
//! `set_with_expiry()` snapshot-restore pair persistence needs.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex as PLMutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cache::LruCache;

use super::provider::{EmbeddingError, EmbeddingProvider};

const PERSIST_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmbeddingCacheError {
    #[error("embedding provider error: {0}")]
    Provider(#[from] EmbeddingError),

    #[error("invalid cache persist path: {0}")]
    InvalidPath(String),

    #[error("cache persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache persistence serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Configuration for [`EmbeddingCache`], read per spec's `EMBEDDINGS_*`
/// environment variables at construction time.
#[derive(Debug, Clone)]
pub struct EmbeddingCacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
    pub persist_enabled: bool,
    pub persist_path: Option<PathBuf>,
    pub persist_gzip: bool,
    pub auto_save_interval: Duration,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(24 * 3600),
            persist_enabled: false,
            persist_path: None,
            persist_gzip: false,
            auto_save_interval: Duration::ZERO,
        }
    }
}

impl EmbeddingCacheConfig {
    /// Read `EMBEDDINGS_CACHE_*` overrides from the environment, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("EMBEDDINGS_CACHE_MAX_ENTRIES") {
            if let Ok(n) = v.parse() {
                cfg.max_entries = n;
            }
        }
        if let Ok(v) = std::env::var("EMBEDDINGS_CACHE_TTL") {
            if let Ok(secs) = v.parse::<u64>() {
                cfg.ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("EMBEDDINGS_CACHE_ENABLED") {
            cfg.persist_enabled = matches!(v.as_str(), "true" | "1");
        }
        if let Ok(v) = std::env::var("EMBEDDINGS_CACHE_PERSIST") {
            cfg.persist_enabled = cfg.persist_enabled || matches!(v.as_str(), "true" | "1");
        }
        if let Ok(v) = std::env::var("EMBEDDINGS_CACHE_PATH") {
            cfg.persist_path = Some(PathBuf::from(v));
        }
        cfg
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    embedding: Vec<f32>,
    expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachePersistFile {
    version: u32,
    created_at: DateTime<Utc>,
    entries: Vec<PersistedEntry>,
}

/// SHA-256-keyed embedding cache with at-most-once computation and
/// optional atomic on-disk persistence.
pub struct EmbeddingCache {
    lru: LruCache<String, Vec<f32>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    pending: PLMutex<HashMap<String, Arc<Notify>>>,
    dirty: AtomicBool,
    config: EmbeddingCacheConfig,
    auto_save: PLMutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl EmbeddingCache {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, config: EmbeddingCacheConfig) -> Arc<Self> {
        let cache = Arc::new(Self {
            lru: LruCache::new(config.max_entries, config.ttl),
            provider,
            pending: PLMutex::new(HashMap::new()),
            dirty: AtomicBool::new(false),
            config,
            auto_save: PLMutex::new(None),
            closed: AtomicBool::new(false),
        });

        if cache.config.persist_enabled {
            if let Some(path) = cache.config.persist_path.clone() {
                if let Err(e) = cache.load(&path) {
                    tracing::warn!(error = %e, "failed to load embedding cache from disk");
                } else {
                    tracing::info!(?path, "embedding cache loaded from disk");
                }
            }
        }

        if cache.config.auto_save_interval > Duration::ZERO && cache.config.persist_path.is_some() {
            let weak = Arc::downgrade(&cache);
            let interval = cache.config.auto_save_interval;
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    let Some(cache) = weak.upgrade() else { break };
                    if cache.dirty.swap(false, Ordering::AcqRel) {
                        if let Some(path) = cache.config.persist_path.clone() {
                            if let Err(e) = cache.save(&path) {
                                tracing::warn!(error = %e, "embedding cache auto-save failed");
                            }
                        }
                    }
                }
            });
            *cache.auto_save.lock() = Some(handle);
        }

        cache
    }

    /// Look up or compute the embedding for `text`, deduping concurrent
    /// requests for the same key so the provider is called at most once.
    pub async fn get_or_compute(&self, text: &str) -> Result<Vec<f32>, EmbeddingCacheError> {
        let key = fingerprint(text);

        if let Some(v) = self.lru.get(&key) {
            tracing::debug!(%key, "embedding cache hit");
            return Ok(v);
        }

        let notify = {
            let mut pending = self.pending.lock();
            if let Some(existing) = pending.get(&key) {
                Some(existing.clone())
            } else {
                pending.insert(key.clone(), Arc::new(Notify::new()));
                None
            }
        };

        if let Some(notify) = notify {
            notify.notified().await;
            return self
                .lru
                .get(&key)
                .ok_or_else(|| EmbeddingCacheError::Provider(EmbeddingError::Cancelled));
        }

        tracing::debug!(%key, "embedding cache miss, computing");
        let result = match &self.provider {
            Some(provider) => provider.embed(text).await.map_err(EmbeddingCacheError::from),
            None => Err(EmbeddingCacheError::Provider(EmbeddingError::Provider(
                "no embedding provider configured".to_string(),
            ))),
        };

        if let Ok(ref vector) = result {
            self.lru.set(key.clone(), vector.clone());
            self.dirty.store(true, Ordering::Release);
        }

        if let Some(notify) = self.pending.lock().remove(&key) {
            notify.notify_waiters();
        }

        result
    }

    fn validate_path(path: &Path) -> Result<(), EmbeddingCacheError> {
        let cleaned = path.to_string_lossy();
        if cleaned == "." || cleaned == "/" || cleaned.is_empty() {
            return Err(EmbeddingCacheError::InvalidPath(cleaned.to_string()));
        }
        Ok(())
    }

    /// Atomically write the current, non-expired entries to `path`.
    pub fn save(&self, path: &Path) -> Result<(), EmbeddingCacheError> {
        Self::validate_path(path)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o750));
                }
            }
        }

        let now_instant = Instant::now();
        let now_utc = Utc::now();
        let entries = self
            .lru
            .entries()
            .into_iter()
            .map(|(key, embedding, expiry)| {
                let expiry = expiry.map(|inst| {
                    let offset = inst.saturating_duration_since(now_instant);
                    now_utc + chrono::Duration::from_std(offset).unwrap_or_default()
                });
                PersistedEntry {
                    key,
                    embedding,
                    expiry,
                }
            })
            .collect();

        let file = CachePersistFile {
            version: PERSIST_FORMAT_VERSION,
            created_at: now_utc,
            entries,
        };

        let json = serde_json::to_vec(&file)?;
        let payload = if self.config.persist_gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&json)?;
            encoder.finish()?
        } else {
            json
        };

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, payload)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load entries from `path`, skipping already-expired ones and
    /// respecting `max_entries`.
    pub fn load(&self, path: &Path) -> Result<(), EmbeddingCacheError> {
        Self::validate_path(path)?;
        if !path.exists() {
            return Ok(());
        }

        let raw = std::fs::read(path)?;
        let json = if self.config.persist_gzip {
            let mut decoder = GzDecoder::new(raw.as_slice());
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            out
        } else {
            raw
        };

        let file: CachePersistFile = serde_json::from_slice(&json)?;
        let now_instant = Instant::now();
        let now_utc = Utc::now();

        for (loaded, entry) in file.entries.into_iter().enumerate() {
            if self.config.max_entries > 0 && loaded >= self.config.max_entries {
                break;
            }
            if let Some(expiry) = entry.expiry {
                if expiry <= now_utc {
                    continue;
                }
                let remaining = (expiry - now_utc).to_std().unwrap_or(Duration::ZERO);
                self.lru
                    .set_with_expiry(entry.key, entry.embedding, Some(now_instant + remaining));
            } else {
                self.lru.set_with_expiry(entry.key, entry.embedding, None);
            }
        }
        Ok(())
    }

    /// Stop the auto-save task (if any) and perform a final save.
    /// Idempotent — safe to call more than once.
    pub fn close(&self) -> Result<(), EmbeddingCacheError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(handle) = self.auto_save.lock().take() {
            handle.abort();
        }
        if let Some(path) = self.config.persist_path.clone() {
            if self.config.persist_enabled {
                self.save(&path)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }
}

impl Drop for EmbeddingCache {
    fn drop(&mut self) {
        if let Some(handle) = self.auto_save.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::mock::MockProvider;

    fn provider() -> Arc<dyn EmbeddingProvider> {
        Arc::new(MockProvider::new(8))
    }

    #[tokio::test]
    async fn computes_and_caches() {
        let cache = EmbeddingCache::new(Some(provider()), EmbeddingCacheConfig::default());
        let a = cache.get_or_compute("hello world").await.unwrap();
        let b = cache.get_or_compute("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn no_provider_errors() {
        let cache = EmbeddingCache::new(None, EmbeddingCacheConfig::default());
        assert!(cache.get_or_compute("x").await.is_err());
    }

    #[tokio::test]
    async fn concurrent_requests_compute_once() {
        let cache = EmbeddingCache::new(Some(provider()), EmbeddingCacheConfig::default());
        let cache2 = Arc::clone(&cache);
        let (a, b) = tokio::join!(
            cache.get_or_compute("same text"),
            cache2.get_or_compute("same text")
        );
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = EmbeddingCache::new(Some(provider()), EmbeddingCacheConfig::default());
        let original = cache.get_or_compute("persist me").await.unwrap();
        cache.save(&path).unwrap();

        let restored = EmbeddingCache::new(Some(provider()), EmbeddingCacheConfig::default());
        restored.load(&path).unwrap();
        let key = fingerprint("persist me");
        assert_eq!(restored.lru.get(&key), Some(original));
    }

    #[tokio::test]
    async fn rejects_dot_and_slash_paths() {
        let cache = EmbeddingCache::new(Some(provider()), EmbeddingCacheConfig::default());
        assert!(cache.save(Path::new(".")).is_err());
        assert!(cache.save(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let cache = EmbeddingCache::new(Some(provider()), EmbeddingCacheConfig::default());
        cache.close().unwrap();
        cache.close().unwrap();
    }
}
