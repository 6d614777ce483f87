//! Drops the cached admin list when a member crosses the admin boundary
//! or an admin's rights are edited.

use async_trait::async_trait;
use tracing::info;

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::error::Result;
use crate::platform::{Update, UpdateKind};

pub struct AdminRefreshHandler;

#[async_trait]
impl Handler for AdminRefreshHandler {
    fn name(&self) -> &'static str {
        "admin_refresh"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        if let UpdateKind::ChatMember(change) = &update.kind {
            if change.admin_status_changed() {
                info!(
                    chat_id = change.chat.id,
                    user_id = change.user.id,
                    "admin status changed, refreshing admin cache"
                );
                state.admins.invalidate(change.chat.id).await;
            }
        }
        Ok(Propagation::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::testing::state_for;
    use crate::platform::fake::{admin_member, group, user};
    use crate::platform::{AdminRights, ChatMemberUpdate, MemberStatus};

    const CHAT: i64 = -100;

    fn promoted(old: MemberStatus, new: MemberStatus) -> Update {
        edited(old, new, AdminRights::default(), AdminRights::default())
    }

    fn edited(old: MemberStatus, new: MemberStatus, old_rights: AdminRights, new_rights: AdminRights) -> Update {
        Update::new(UpdateKind::ChatMember(ChatMemberUpdate {
            chat: group(CHAT),
            from: user(1, "Owner"),
            user: user(5, "Bob"),
            old_status: old,
            new_status: new,
            old_rights,
            new_rights,
        }))
    }

    #[tokio::test]
    async fn test_promotion_invalidates_cache() {
        let t = state_for(CHAT);
        assert!(!t.admins.is_admin(CHAT, 5).await.unwrap());
        t.platform.add_admin(CHAT, admin_member(5, AdminRights::default()));

        // unrelated change keeps the stale list
        AdminRefreshHandler
            .handle(&t, &promoted(MemberStatus::Left, MemberStatus::Member))
            .await
            .unwrap();
        assert!(!t.admins.is_admin(CHAT, 5).await.unwrap());

        AdminRefreshHandler
            .handle(&t, &promoted(MemberStatus::Member, MemberStatus::Administrator))
            .await
            .unwrap();
        assert!(t.admins.is_admin(CHAT, 5).await.unwrap());
    }

    #[tokio::test]
    async fn test_rights_edit_invalidates_cache() {
        let t = state_for(CHAT);
        t.platform.add_admin(CHAT, admin_member(5, AdminRights::default()));
        assert!(!t.admins.can_user_restrict(CHAT, 5).await.unwrap());

        let granted = AdminRights {
            can_restrict: true,
            ..AdminRights::default()
        };
        t.platform.remove_admin(CHAT, 5);
        t.platform.add_admin(CHAT, admin_member(5, granted));

        // same rights on both sides keeps the cached entry
        AdminRefreshHandler
            .handle(&t, &promoted(MemberStatus::Administrator, MemberStatus::Administrator))
            .await
            .unwrap();
        assert!(!t.admins.can_user_restrict(CHAT, 5).await.unwrap());

        AdminRefreshHandler
            .handle(
                &t,
                &edited(MemberStatus::Administrator, MemberStatus::Administrator, AdminRights::default(), granted),
            )
            .await
            .unwrap();
        assert!(t.admins.can_user_restrict(CHAT, 5).await.unwrap());
    }
}
