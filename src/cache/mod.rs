//! Cache module - caching primitives built on Moka.
//!
//! - `TypedCache` / `CacheRegistry` - named read-through caches owned by repositories
//! - `LoadingCache` - single-flight async loader (admin lists, matchers)
//! - `EphemeralStore` - pending state with per-entry TTL and typed namespaces
//!
//! ## Usage
//!
//! ```rust,ignore
//! let cache = registry.get_or_create::<i64, FloodSettings>("antiflood", CacheConfig::chat_settings());
//! let settings = cache.get_or_load(chat_id, || load_from_store(chat_id)).await?;
//! ```

mod config;
mod ephemeral;
mod loading;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use ephemeral::{EphemeralStore, Namespace};
pub use loading::LoadingCache;
pub use registry::CacheRegistry;
pub use typed::TypedCache;
