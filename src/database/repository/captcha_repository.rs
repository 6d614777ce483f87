//! Pending captcha attempts.

use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::doc;

use crate::database::Database;
use crate::database::models::CaptchaAttempt;
use crate::database::store::StoreResult;

pub struct CaptchaRepository {
    collection: Collection<CaptchaAttempt>,
}

impl CaptchaRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("captcha_attempts"),
        }
    }

    pub async fn save(&self, attempt: &CaptchaAttempt) -> StoreResult<()> {
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();
        self.collection
            .replace_one(
                doc! { "chat_id": attempt.chat_id, "user_id": attempt.user_id as i64 },
                attempt,
            )
            .with_options(options)
            .await?;
        Ok(())
    }

    pub async fn get(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<CaptchaAttempt>> {
        Ok(self
            .collection
            .find_one(doc! { "chat_id": chat_id, "user_id": user_id as i64 })
            .await?)
    }

    pub async fn delete(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "chat_id": chat_id, "user_id": user_id as i64 })
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn expired(&self, now: i64) -> StoreResult<Vec<CaptchaAttempt>> {
        let cursor = self
            .collection
            .find(doc! { "expires_at": { "$lte": now } })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
