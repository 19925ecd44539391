pub mod cache;

mod macros;

pub use self::cache::create_redis_client;
pub use self::cache::Cache;
pub use self::cache::CacheKey;
pub use self::cache::CacheWriterHandle;
