//! Caching patterns built on top of a [`CacheStore`](crate::CacheStore)

pub mod class_cache;

pub use class_cache::{ClassCache, ClassCacheBuilder};
