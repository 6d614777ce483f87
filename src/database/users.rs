//! User and chat repository with cache-first architecture.
//!
//! Provides user storage and resolution with dual-index caching:
//! - By user ID (primary)
//! - By username (for @username resolution)

use mongodb::Collection;
use mongodb::bson::doc;
use tracing::debug;

use super::Database;
use super::models::{ChatRecord, UserRecord};
use super::store::StoreResult;
use crate::cache::{CacheConfig, CacheRegistry, TypedCache};

pub struct UserRepo {
    collection: Collection<UserRecord>,
    chats: Collection<ChatRecord>,
    cache_by_id: TypedCache<u64, UserRecord>,
    cache_by_username: TypedCache<String, u64>, // username (lowercase) -> user_id
    chat_cache: TypedCache<i64, ChatRecord>,
}

impl UserRepo {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("users"),
            chats: db.collection("chats"),
            cache_by_id: cache.get_or_create("users_by_id", CacheConfig::lookup()),
            cache_by_username: cache.get_or_create("users_by_username", CacheConfig::lookup()),
            chat_cache: cache.get_or_create("chats", CacheConfig::lookup()),
        }
    }

    /// Upsert user data; skips the write when nothing changed.
    pub async fn upsert(&self, user: &UserRecord) -> StoreResult<()> {
        if let Some(cached) = self.cache_by_id.get(&user.user_id) {
            if cached.username == user.username
                && cached.first_name == user.first_name
                && cached.last_name == user.last_name
            {
                return Ok(());
            }
            // Drop the stale username mapping
            if let Some(old) = &cached.username {
                if Some(old) != user.username.as_ref() {
                    self.cache_by_username.invalidate(old);
                }
            }
        }

        self.cache_by_id.insert(user.user_id, user.clone());
        if let Some(username) = &user.username {
            self.cache_by_username.insert(username.clone(), user.user_id);
        }

        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();
        self.collection
            .replace_one(doc! { "user_id": user.user_id as i64 }, user)
            .with_options(options)
            .await?;

        debug!("Upserted user {} (@{:?})", user.user_id, user.username);
        Ok(())
    }

    pub async fn get_by_id(&self, user_id: u64) -> StoreResult<Option<UserRecord>> {
        if let Some(user) = self.cache_by_id.get(&user_id) {
            return Ok(Some(user));
        }

        let result = self
            .collection
            .find_one(doc! { "user_id": user_id as i64 })
            .await?;

        if let Some(user) = &result {
            self.cache_by_id.insert(user_id, user.clone());
            if let Some(username) = &user.username {
                self.cache_by_username.insert(username.clone(), user_id);
            }
        }

        Ok(result)
    }

    /// Get user by username (case-insensitive, leading @ ignored).
    pub async fn get_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let username = username.trim_start_matches('@').to_lowercase();

        if let Some(user_id) = self.cache_by_username.get(&username) {
            return self.get_by_id(user_id).await;
        }

        let result = self
            .collection
            .find_one(doc! { "username": &username })
            .await?;

        if let Some(user) = &result {
            self.cache_by_id.insert(user.user_id, user.clone());
            self.cache_by_username.insert(username, user.user_id);
        }

        Ok(result)
    }

    pub async fn upsert_chat(&self, chat: &ChatRecord) -> StoreResult<()> {
        if let Some(cached) = self.chat_cache.get(&chat.chat_id) {
            if cached.title == chat.title && cached.username == chat.username {
                return Ok(());
            }
        }

        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();
        self.chats
            .replace_one(doc! { "chat_id": chat.chat_id }, chat)
            .with_options(options)
            .await?;

        self.chat_cache.insert(chat.chat_id, chat.clone());
        Ok(())
    }
}
