use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when resolving an image URL to bytes
#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Image host returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Image at {0} is empty")]
    Empty(String),

    #[error("Image at {url} is {size} bytes, limit is {limit}")]
    TooLarge { url: String, size: usize, limit: usize },
}

/// Source of candidate image bytes
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Arc<[u8]>, ImageFetchError>;
}

/// Downloads images over HTTP and keeps recently used ones in memory
///
/// Candidate photos are compared against every new sighting, so the same
/// URLs are fetched over and over. Photos are never mutated once stored,
/// which makes URL-keyed caching safe. The cache is weighed in bytes.
pub struct HttpImageFetcher {
    client: Client,
    cache: moka::future::Cache<String, Arc<[u8]>>,
    max_bytes: usize,
}

impl HttpImageFetcher {
    /// `cache_capacity_bytes` bounds the summed size of cached images,
    /// `max_bytes` bounds a single download
    pub fn new(
        timeout: Duration,
        cache_capacity_bytes: u64,
        max_bytes: usize,
    ) -> Result<Self, ImageFetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        let cache = moka::future::Cache::builder()
            .weigher(|_url: &String, bytes: &Arc<[u8]>| -> u32 {
                bytes.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(cache_capacity_bytes)
            .time_to_idle(Duration::from_secs(3600))
            .build();

        Ok(Self {
            client,
            cache,
            max_bytes,
        })
    }

    /// Number of images currently held in memory
    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }

    fn too_large(&self, url: &str, size: usize) -> ImageFetchError {
        ImageFetchError::TooLarge {
            url: url.to_string(),
            size,
            limit: self.max_bytes,
        }
    }

    async fn download(&self, url: &str) -> Result<Arc<[u8]>, ImageFetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.max_bytes {
                return Err(self.too_large(url, length));
            }
        }

        // Chunked bodies carry no length, so stop reading once past the limit
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large(url, bytes.len() + chunk.len()));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ImageFetchError::Empty(url.to_string()));
        }

        Ok(Arc::from(bytes))
    }
}

#[async_trait]
impl ImageSource for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Arc<[u8]>, ImageFetchError> {
        if let Some(bytes) = self.cache.get(url).await {
            tracing::trace!("Image cache hit: {}", url);
            return Ok(bytes);
        }

        let bytes = self.download(url).await?;
        self.cache.insert(url.to_string(), bytes.clone()).await;

        tracing::debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}
