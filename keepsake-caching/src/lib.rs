//! Call-result caching for Keepsake
//!
//! [`ClassCache`] wraps a [`CacheTarget`] and answers repeated calls from a
//! [`CacheStore`]. Keys come from the target's type name, the lower-cased
//! method name and the arguments ([`key`]); which methods are cached is
//! decided by [`PatternOptions`] ([`policy`]).
//!
//! Stores are resolved by name through [`StorageFactory`], which wraps them
//! in a [`PluggableStore`] carrying the configured storage plugins.

pub mod errors;
pub mod factory;
pub mod key;
pub mod pattern;
pub mod pluggable;
pub mod plugins;
pub mod policy;
pub mod stats;
pub mod store;
pub mod stores;
pub mod target;

// Re-export main types
pub use errors::{CacheError, CacheResult, PatternError, PatternResult};
pub use factory::{storage_adapters, StorageFactory};
pub use key::{callable_identity, canonical_json, generate_arguments_key, generate_callback_key};
pub use pattern::{ClassCache, ClassCacheBuilder};
pub use pluggable::PluggableStore;
pub use plugins::{
    storage_plugins, ErrorDisposition, PluginOptions, StoragePlugin, WriteShield,
};
pub use policy::{should_cache, PatternOptions};
pub use stats::CacheStats;
pub use store::{CacheEntry, CacheStore, CallValue, StorageAdapter};
pub use target::{CacheTarget, MemberTable, StaticMembers};

// Re-export store implementations
pub use stores::InMemoryStore;

#[cfg(feature = "moka")]
pub use stores::MokaStore;
