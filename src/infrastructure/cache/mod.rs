pub mod counter_store;
pub mod page_cache;

pub use counter_store::{CacheError, CounterStore, InMemoryCounterStore, RedisCounterStore};
pub use page_cache::PageCache;
