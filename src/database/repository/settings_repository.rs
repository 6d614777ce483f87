//! Per-chat settings documents with cache-first reads.
//!
//! Every settings collection (antiflood, blacklist, locks, ...) stores one
//! document per chat keyed by `chat_id`, so a single generic repository
//! serves them all.

use mongodb::Collection;
use mongodb::bson::doc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::Database;
use crate::database::models::*;
use crate::database::store::StoreResult;
use crate::error::StoreError;

/// A settings document owned by one chat.
pub trait ChatScoped: Clone + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;

    fn defaults(chat_id: i64) -> Self;
    fn chat_id(&self) -> i64;
}

macro_rules! chat_scoped {
    ($ty:ty, $collection:literal) => {
        impl ChatScoped for $ty {
            const COLLECTION: &'static str = $collection;

            fn defaults(chat_id: i64) -> Self {
                <$ty>::new(chat_id)
            }

            fn chat_id(&self) -> i64 {
                self.chat_id
            }
        }
    };
}

chat_scoped!(FloodSettings, "antiflood");
chat_scoped!(BlacklistSettings, "blacklists");
chat_scoped!(WarnSettings, "warns_settings");
chat_scoped!(LockSettings, "locks");
chat_scoped!(DisabledCommands, "disabled");
chat_scoped!(CaptchaSettings, "captcha_settings");
chat_scoped!(JoinSettings, "join_settings");
chat_scoped!(ReportSettings, "report_settings");
chat_scoped!(PinSettings, "pins");

pub struct SettingsRepository<T: ChatScoped> {
    collection: Collection<T>,
    cache: TypedCache<i64, T>,
}

impl<T: ChatScoped> SettingsRepository<T> {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection(T::COLLECTION),
            cache: cache.get_or_create(T::COLLECTION, CacheConfig::chat_settings()),
        }
    }

    /// Settings for `chat_id`, or the defaults when the chat has none stored.
    pub async fn get(&self, chat_id: i64) -> StoreResult<T> {
        self.cache
            .get_or_load(chat_id, || async {
                let stored = self.collection.find_one(doc! { "chat_id": chat_id }).await?;
                Ok::<_, StoreError>(stored.unwrap_or_else(|| T::defaults(chat_id)))
            })
            .await
    }

    /// Save settings (upsert).
    pub async fn save(&self, settings: &T) -> StoreResult<()> {
        let chat_id = settings.chat_id();
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.collection
            .replace_one(doc! { "chat_id": chat_id }, settings)
            .with_options(options)
            .await?;

        self.cache.insert(chat_id, settings.clone());
        debug!("Saved {} for chat {}", T::COLLECTION, chat_id);
        Ok(())
    }

    /// Read-modify-write. Returns the closure's result.
    pub async fn update<R>(&self, chat_id: i64, f: impl FnOnce(&mut T) -> R) -> StoreResult<R> {
        let mut settings = self.get(chat_id).await?;
        let result = f(&mut settings);
        self.save(&settings).await?;
        Ok(result)
    }
}
