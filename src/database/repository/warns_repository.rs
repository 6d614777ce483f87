//! Warn ledger repository.
//!
//! Ledgers are never cached: the increment must be read back from the
//! database so concurrent warns observe each other.

use mongodb::Collection;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use tracing::debug;

use crate::database::Database;
use crate::database::models::WarnLedger;
use crate::database::store::StoreResult;

pub struct WarnsRepository {
    collection: Collection<WarnLedger>,
}

impl WarnsRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("warns_users"),
        }
    }

    pub async fn get(&self, chat_id: i64, user_id: u64) -> StoreResult<WarnLedger> {
        let filter = doc! { "chat_id": chat_id, "user_id": user_id as i64 };
        Ok(self
            .collection
            .find_one(filter)
            .await?
            .unwrap_or_else(|| WarnLedger::new(chat_id, user_id)))
    }

    /// Increment and append in one atomic document update.
    pub async fn add_warning(&self, chat_id: i64, user_id: u64, reason: &str) -> StoreResult<WarnLedger> {
        let filter = doc! { "chat_id": chat_id, "user_id": user_id as i64 };
        let update = doc! {
            "$inc": { "count": 1 },
            "$push": { "reasons": reason },
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let ledger = self
            .collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?
            .unwrap_or_else(|| WarnLedger {
                count: 1,
                reasons: vec![reason.to_string()],
                ..WarnLedger::new(chat_id, user_id)
            });

        debug!("User {} in chat {} now has {} warns", user_id, chat_id, ledger.count);
        Ok(ledger)
    }

    /// Decrement only when positive. Reasons stay as they are.
    pub async fn remove_warning(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        let filter = doc! {
            "chat_id": chat_id,
            "user_id": user_id as i64,
            "count": { "$gt": 0 },
        };
        let result = self
            .collection
            .update_one(filter, doc! { "$inc": { "count": -1 } })
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn reset(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "chat_id": chat_id, "user_id": user_id as i64 })
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn reset_all(&self, chat_id: i64) -> StoreResult<()> {
        let result = self
            .collection
            .delete_many(doc! { "chat_id": chat_id })
            .await?;
        debug!("Reset {} warn ledgers in chat {}", result.deleted_count, chat_id);
        Ok(())
    }
}
