//! Bot team roster (read-only; managed outside the bot).

use mongodb::Collection;
use mongodb::bson::doc;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::Database;
use crate::database::models::{TeamMember, TeamRole, TeamStatus};
use crate::database::store::StoreResult;
use crate::error::StoreError;

pub struct TeamRepository {
    collection: Collection<TeamMember>,
    cache: TypedCache<u64, TeamStatus>,
}

impl TeamRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("team"),
            cache: cache.get_or_create("team", CacheConfig::team()),
        }
    }

    pub async fn status(&self, user_id: u64) -> StoreResult<TeamStatus> {
        self.cache
            .get_or_load(user_id, || async {
                let member = self.collection.find_one(doc! { "user_id": user_id as i64 }).await?;
                Ok::<_, StoreError>(match member {
                    Some(TeamMember { role: TeamRole::Dev, .. }) => TeamStatus { dev: true, sudo: false },
                    Some(TeamMember { role: TeamRole::Sudo, .. }) => TeamStatus { dev: false, sudo: true },
                    None => TeamStatus::default(),
                })
            })
            .await
    }
}
