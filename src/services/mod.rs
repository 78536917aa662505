// Service exports
pub mod cache;
pub mod gemini;
pub mod images;
pub mod oracle;
pub mod postgres;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use gemini::{GeminiClient, GeminiConfig};
pub use images::{HttpImageFetcher, ImageFetchError, ImageSource};
pub use oracle::{Comparison, FaceComparator, OracleError};
pub use postgres::{PostgresClient, PostgresError};
pub use store::SightingStore;
