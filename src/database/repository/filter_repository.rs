//! Filter repository with a per-chat cache of the full filter list.

use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::doc;
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::Database;
use crate::database::models::FilterEntry;
use crate::database::store::StoreResult;
use crate::error::StoreError;

pub struct FilterRepository {
    collection: Collection<FilterEntry>,
    /// ChatID -> filters sorted by keyword
    cache: TypedCache<i64, Vec<FilterEntry>>,
}

impl FilterRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("filters"),
            cache: cache.get_or_create("filters", CacheConfig::chat_settings()),
        }
    }

    pub async fn get_all(&self, chat_id: i64) -> StoreResult<Vec<FilterEntry>> {
        self.cache
            .get_or_load(chat_id, || async {
                let cursor = self.collection.find(doc! { "chat_id": chat_id }).await?;
                let mut filters: Vec<FilterEntry> = cursor.try_collect().await?;
                filters.sort_by(|a, b| a.keyword.cmp(&b.keyword));
                Ok::<_, StoreError>(filters)
            })
            .await
    }

    /// Save a filter (upsert on chat + keyword).
    pub async fn save(&self, filter: &FilterEntry) -> StoreResult<()> {
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.collection
            .replace_one(
                doc! { "chat_id": filter.chat_id, "keyword": &filter.keyword },
                filter,
            )
            .with_options(options)
            .await?;

        self.cache.invalidate(&filter.chat_id);
        debug!("Saved filter '{}' in chat {}", filter.keyword, filter.chat_id);
        Ok(())
    }

    pub async fn delete(&self, chat_id: i64, keyword: &str) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "chat_id": chat_id, "keyword": keyword.trim().to_lowercase() })
            .await?;
        self.cache.invalidate(&chat_id);
        Ok(result.deleted_count > 0)
    }

    pub async fn delete_all(&self, chat_id: i64) -> StoreResult<()> {
        self.collection
            .delete_many(doc! { "chat_id": chat_id })
            .await?;
        self.cache.invalidate(&chat_id);
        Ok(())
    }
}
