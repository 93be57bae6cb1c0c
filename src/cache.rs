use crate::backend::SearchBackend;
use crate::error::UnfluffedError;
use crate::model::{
    AdvancedSearchRequest, AdvancedSearchResponse, BasicSearchRequest, BasicSearchResponse,
    Category, CountryCode, Product,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub struct Cache {
    dir: PathBuf,
    read_enabled: bool,
}

const CATEGORIES_TTL: Duration = Duration::from_secs(24 * 60 * 60); // 24 hours
const SEARCH_TTL: Duration = Duration::from_secs(60 * 60); // 1 hour

impl Cache {
    /// Create a cache. When `no_cache` is true, reads are skipped but writes still happen.
    pub fn new(cache_dir: PathBuf, no_cache: bool) -> Self {
        Self {
            dir: cache_dir,
            read_enabled: !no_cache,
        }
    }

    pub fn get_categories<T: DeserializeOwned>(&self) -> Option<T> {
        if !self.read_enabled {
            return None;
        }
        self.read_cached(&self.dir.join("categories.json"), CATEGORIES_TTL)
    }

    pub fn set_categories<T: Serialize>(&self, data: &T) -> Result<(), UnfluffedError> {
        self.write_cached(&self.dir.join("categories.json"), data)
    }

    pub fn get_search<R: Serialize, T: DeserializeOwned>(
        &self,
        kind: &str,
        request: &R,
    ) -> Option<T> {
        if !self.read_enabled {
            return None;
        }
        let key = self.search_key(kind, request).ok()?;
        let path = self.dir.join(format!("search_{}.json", key));
        self.read_cached(&path, SEARCH_TTL)
    }

    pub fn set_search<R: Serialize, T: Serialize>(
        &self,
        kind: &str,
        request: &R,
        data: &T,
    ) -> Result<(), UnfluffedError> {
        let key = self.search_key(kind, request)?;
        let path = self.dir.join(format!("search_{}.json", key));
        self.write_cached(&path, data)
    }

    fn search_key<R: Serialize>(&self, kind: &str, request: &R) -> Result<String, UnfluffedError> {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(serde_json::to_vec(request)?);
        let result = hasher.finalize();
        Ok(hex::encode(&result[..8])) // 16 hex chars
    }

    fn read_cached<T: DeserializeOwned>(&self, path: &Path, ttl: Duration) -> Option<T> {
        let metadata = std::fs::metadata(path).ok()?;
        let modified = metadata.modified().ok()?;
        let age = SystemTime::now().duration_since(modified).ok()?;
        if age > ttl {
            tracing::debug!("Cache expired for {}", path.display());
            return None;
        }
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(data) => {
                tracing::info!("Cache hit for {}", path.display());
                Some(data)
            }
            Err(e) => {
                tracing::warn!("Cache parse error for {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_cached<T: Serialize>(&self, path: &Path, data: &T) -> Result<(), UnfluffedError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| UnfluffedError::Cache(format!("Failed to create cache dir: {}", e)))?;
        let content = serde_json::to_string_pretty(data)?;
        std::fs::write(path, content)
            .map_err(|e| UnfluffedError::Cache(format!("Failed to write cache: {}", e)))?;
        tracing::debug!("Cached to {}", path.display());
        Ok(())
    }
}

/// Serves searches and categories from the on-disk cache when fresh.
/// Suggestions and single-product lookups always go to the backend so prices stay live.
pub struct CachedBackend<B> {
    inner: B,
    cache: Cache,
}

impl<B: SearchBackend> CachedBackend<B> {
    pub fn new(inner: B, cache: Cache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<B: SearchBackend> SearchBackend for CachedBackend<B> {
    async fn basic_search(
        &self,
        request: &BasicSearchRequest,
    ) -> Result<BasicSearchResponse, UnfluffedError> {
        if let Some(cached) = self.cache.get_search("basic", request) {
            return Ok(cached);
        }
        let response = self.inner.basic_search(request).await?;
        if let Err(e) = self.cache.set_search("basic", request, &response) {
            tracing::debug!("Failed to cache search results: {}", e);
        }
        Ok(response)
    }

    async fn advanced_search(
        &self,
        request: &AdvancedSearchRequest,
    ) -> Result<AdvancedSearchResponse, UnfluffedError> {
        if let Some(cached) = self.cache.get_search("advanced", request) {
            return Ok(cached);
        }
        let response = self.inner.advanced_search(request).await?;
        if let Err(e) = self.cache.set_search("advanced", request, &response) {
            tracing::debug!("Failed to cache search results: {}", e);
        }
        Ok(response)
    }

    async fn suggestions(&self, text: &str) -> Result<Vec<String>, UnfluffedError> {
        self.inner.suggestions(text).await
    }

    async fn categories(&self) -> Result<Vec<Category>, UnfluffedError> {
        if let Some(cached) = self.cache.get_categories() {
            return Ok(cached);
        }
        let categories = self.inner.categories().await?;
        if let Err(e) = self.cache.set_categories(&categories) {
            tracing::debug!("Failed to cache categories: {}", e);
        }
        Ok(categories)
    }

    async fn product(&self, asin: &str, country: CountryCode) -> Result<Product, UnfluffedError> {
        self.inner.product(asin, country).await
    }
}
