pub mod redis;
pub mod snapshot;

pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use self::snapshot::{MovieStore, SimilarityMatrix};
