//! On-disk cache of compressed feed payloads.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::FeedSource;
use crate::config::FeedCacheConfig;
use crate::errors::PipelineError;
use catalog_shared::FeedDescriptor;

/// What [`FeedCache::ensure_fresh`] did for a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The cached payload was young enough and reused as is.
    Fresh,
    /// The payload was downloaded and written to the cache.
    Downloaded { bytes: usize },
}

/// Keeps one compressed payload per feed and refreshes it when stale.
pub struct FeedCache {
    config: FeedCacheConfig,
    source: Arc<dyn FeedSource>,
}

impl FeedCache {
    pub fn new(config: FeedCacheConfig, source: Arc<dyn FeedSource>) -> Self {
        Self { config, source }
    }

    /// Cache file location for `feed`.
    pub fn path_for(&self, feed: &FeedDescriptor) -> PathBuf {
        self.config.dir.join(feed.cache_file_name())
    }

    /// Make sure the cache holds a payload for `feed` younger than the maximum age.
    ///
    /// A fresh download is written to a temporary file in the cache directory
    /// and renamed into place, so readers never observe a partial payload.
    #[instrument(skip(self, feed), fields(feed = %feed.label()))]
    pub async fn ensure_fresh(&self, feed: &FeedDescriptor) -> Result<CacheStatus, PipelineError> {
        let path = self.path_for(feed);

        if self.is_fresh(&path).await? {
            debug!(path = %path.display(), "Using cached feed");
            return Ok(CacheStatus::Fresh);
        }

        let url = feed
            .json_gz_url()
            .ok_or_else(|| PipelineError::MissingFeedUrl(feed.label()))?;
        let payload = self.source.download(url).await?;

        tokio::fs::create_dir_all(&self.config.dir)
            .await
            .map_err(|e| PipelineError::cache(format!("{}: {}", self.config.dir.display(), e)))?;

        let temp = self
            .config
            .dir
            .join(format!(".{}.{}.tmp", feed.cache_file_name(), Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&temp, &payload).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(PipelineError::cache(format!("{}: {}", temp.display(), e)));
        }
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(PipelineError::cache(format!("{}: {}", path.display(), e)));
        }

        info!(bytes = payload.len(), path = %path.display(), "Feed downloaded");
        Ok(CacheStatus::Downloaded {
            bytes: payload.len(),
        })
    }

    async fn is_fresh(&self, path: &Path) -> Result<bool, PipelineError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(PipelineError::cache(format!("{}: {}", path.display(), e))),
        };
        let modified = metadata
            .modified()
            .map_err(|e| PipelineError::cache(format!("{}: {}", path.display(), e)))?;

        // A modification time in the future counts as fresh.
        Ok(match SystemTime::now().duration_since(modified) {
            Ok(age) => age <= self.config.max_age,
            Err(_) => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSource {
        payload: Vec<u8>,
        downloads: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(payload: &[u8]) -> Self {
            Self {
                payload: payload.to_vec(),
                downloads: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn downloads(&self) -> usize {
            self.downloads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedSource for CountingSource {
        async fn fetch_manifest(&self) -> Result<Vec<FeedDescriptor>, PipelineError> {
            Ok(Vec::new())
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PipelineError::download(format!("{}: 503", url)));
            }
            Ok(self.payload.clone())
        }
    }

    fn feed(with_url: bool) -> FeedDescriptor {
        let mut feed_urls = HashMap::new();
        if with_url {
            feed_urls.insert(
                "json.gz".to_string(),
                "https://feeds.example.com/7.ljson.gz".to_string(),
            );
        }
        FeedDescriptor {
            publisher_id: 1885,
            shop_id: 7,
            active: true,
            start_date: None,
            end_date: None,
            feed_urls,
        }
    }

    fn cache_in(dir: &tempfile::TempDir, source: Arc<CountingSource>) -> FeedCache {
        FeedCache::new(FeedCacheConfig::new(dir.path()), source)
    }

    #[tokio::test]
    async fn test_missing_entry_is_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource::new(b"payload"));
        let cache = cache_in(&dir, source.clone());

        let status = cache.ensure_fresh(&feed(true)).await.unwrap();

        assert_eq!(status, CacheStatus::Downloaded { bytes: 7 });
        assert_eq!(source.downloads(), 1);
        let path = cache.path_for(&feed(true));
        assert!(path.ends_with("1885_7.ljson.gz"));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_fresh_entry_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource::new(b"new"));
        let cache = cache_in(&dir, source.clone());
        std::fs::write(cache.path_for(&feed(true)), b"old").unwrap();

        let status = cache.ensure_fresh(&feed(true)).await.unwrap();

        assert_eq!(status, CacheStatus::Fresh);
        assert_eq!(source.downloads(), 0);
        assert_eq!(std::fs::read(cache.path_for(&feed(true))).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_stale_entry_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource::new(b"new"));
        let cache = cache_in(&dir, source.clone());
        let path = cache.path_for(&feed(true));
        std::fs::write(&path, b"old").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(25 * 60 * 60))
            .unwrap();
        drop(file);

        let status = cache.ensure_fresh(&feed(true)).await.unwrap();

        assert_eq!(status, CacheStatus::Downloaded { bytes: 3 });
        assert_eq!(source.downloads(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_missing_url_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource::new(b"payload"));
        let cache = cache_in(&dir, source.clone());

        let result = cache.ensure_fresh(&feed(false)).await;

        assert!(matches!(result, Err(PipelineError::MissingFeedUrl(label)) if label == "1885/7"));
        assert_eq!(source.downloads(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource {
            fail: true,
            ..CountingSource::new(b"")
        });
        let cache = cache_in(&dir, source.clone());

        let result = cache.ensure_fresh(&feed(true)).await;

        assert!(matches!(result, Err(PipelineError::DownloadError(_))));
        assert!(!cache.path_for(&feed(true)).exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cache_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource::new(b"payload"));
        let cache = FeedCache::new(FeedCacheConfig::new(dir.path().join("nested/feeds")), source);

        cache.ensure_fresh(&feed(true)).await.unwrap();

        assert!(dir.path().join("nested/feeds/1885_7.ljson.gz").exists());
    }
}
