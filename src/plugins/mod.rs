//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding a variant to [`Command`] and routing it in `run_command()`

pub mod admin;
pub mod antiflood;
pub mod ban;
pub mod blacklist;
pub mod callbacks;
pub mod captcha;
pub mod disabling;
pub mod filters;
pub mod join;
pub mod locks;
pub mod mute;
pub mod pin;
pub mod reports;
pub mod warn;

use async_trait::async_trait;
use teloxide::utils::command::BotCommands;
use tracing::debug;

use crate::bot::dispatcher::Dispatcher;
use crate::bot::handler::{Handler, Propagation, group};
use crate::bot::state::AppState;
use crate::error::{ModerationError, Result};
use crate::platform::{Message, SendOptions, Update};
use crate::utils::{Target, resolve_target};

pub use callbacks::CallbackHandler;

/// All bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    // Antiflood commands
    #[command(description = "Show the antiflood settings")]
    Flood,

    #[command(description = "Set the flood limit (3-100) or off")]
    Setflood,

    #[command(description = "Set the flood action: ban, kick or mute")]
    Setfloodmode,

    #[command(description = "Delete the whole flood burst: on or off")]
    Delflood,

    // Blacklist commands
    #[command(description = "List blacklisted words")]
    Blacklists,

    #[command(description = "Blacklist one or more words")]
    Addblacklist,

    #[command(description = "Remove a blacklisted word")]
    Rmblacklist,

    #[command(description = "Set the blacklist action")]
    Blaction,

    #[command(description = "Remove every blacklisted word")]
    Remallbl,

    // Lock commands
    #[command(description = "Lock a content type")]
    Lock,

    #[command(description = "Unlock a content type")]
    Unlock,

    #[command(description = "Show the current locks")]
    Locks,

    #[command(description = "List lockable types")]
    Locktypes,

    // Warn commands
    #[command(description = "Warn a user")]
    Warn,

    #[command(description = "Warn a user silently")]
    Swarn,

    #[command(description = "Warn a user and delete the replied message")]
    Dwarn,

    #[command(description = "Reset a user's warns")]
    Resetwarns,

    #[command(description = "Remove a user's latest warn")]
    Rmwarn,

    #[command(description = "Show a user's warns")]
    Warns,

    #[command(description = "Show the warn settings")]
    Warnings,

    #[command(description = "Set the warn limit (1-100)")]
    Setwarnlimit,

    #[command(description = "Set the warn action: ban, kick or mute")]
    Setwarnmode,

    #[command(description = "Reset every warn in the chat")]
    Resetallwarns,

    // Ban commands
    #[command(description = "Ban a user")]
    Ban,

    #[command(description = "Temporarily ban a user")]
    Tban,

    #[command(description = "Kick a user")]
    Kick,

    #[command(description = "Unban a user")]
    Unban,

    // Mute commands
    #[command(description = "Mute a user")]
    Mute,

    #[command(description = "Temporarily mute a user")]
    Tmute,

    #[command(description = "Unmute a user")]
    Unmute,

    #[command(description = "Pick a restriction for a user")]
    Restrict,

    // Admin commands
    #[command(description = "Promote a user to admin")]
    Promote,

    #[command(description = "Demote an admin")]
    Demote,

    #[command(description = "Reload the admin list")]
    Admincache,

    // Pin commands
    #[command(description = "Pin the replied message")]
    Pin,

    #[command(description = "Unpin the replied or latest message")]
    Unpin,

    #[command(description = "Unpin every message")]
    Unpinall,

    #[command(description = "Link to the pinned message")]
    Pinned,

    #[command(description = "Post a message and pin it")]
    Permapin,

    #[command(description = "Unpin linked channel posts: on or off")]
    Antichannelpin,

    #[command(description = "Delete linked channel posts: on or off")]
    Cleanlinked,

    // Report commands
    #[command(description = "Report the replied message to the admins")]
    Report,

    #[command(description = "Report settings: on, off, block, unblock, showblocklist")]
    Reports,

    // Disabling commands
    #[command(description = "Disable a command for members")]
    Disable,

    #[command(description = "Enable a command again")]
    Enable,

    #[command(description = "List disabled commands")]
    Disabled,

    // Captcha commands
    #[command(description = "Turn the join captcha on or off")]
    Captcha,

    #[command(description = "Set the captcha mode: math, text or image")]
    Captchamode,

    #[command(description = "Set the captcha timeout in minutes (1-10)")]
    Captchatime,

    #[command(description = "Set the captcha failure action")]
    Captchaaction,

    #[command(description = "Set the captcha attempts (1-10)")]
    Captchatries,

    // Filter commands
    #[command(description = "Add an auto-reply filter")]
    Filter,

    #[command(description = "Remove a filter")]
    Stop,

    #[command(description = "List filters")]
    Filters,

    #[command(description = "Remove every filter")]
    Stopall,

    // Join request commands
    #[command(description = "Auto-approve join requests: on or off")]
    Autoapprove,
}

/// Commands members can be barred from with `/disable`.
pub const DISABLEABLE: [&str; 8] = [
    "blacklists",
    "filters",
    "flood",
    "locks",
    "locktypes",
    "report",
    "warnings",
    "warns",
];

impl Command {
    /// Name checked against the chat's disabled list, when the command can be disabled.
    pub fn disableable(&self) -> Option<&'static str> {
        let name = match self {
            Self::Blacklists => "blacklists",
            Self::Filters => "filters",
            Self::Flood => "flood",
            Self::Locks => "locks",
            Self::Locktypes => "locktypes",
            Self::Report => crate::events::reports::REPORT_COMMAND,
            Self::Warnings => "warnings",
            Self::Warns => "warns",
            _ => return None,
        };
        Some(name)
    }
}

/// Parses commands addressed to this bot and runs them.
pub struct CommandHandler;

#[async_trait]
impl Handler for CommandHandler {
    fn name(&self) -> &'static str {
        "commands"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        let Some(text) = msg.text.as_deref() else {
            return Ok(Propagation::Continue);
        };
        if !text.starts_with('/') {
            return Ok(Propagation::Continue);
        }
        let Ok(command) = Command::parse(text, &state.bot.username) else {
            return Ok(Propagation::Continue);
        };

        if let Some(name) = command.disableable() {
            if msg.chat.is_group()
                && state.store.is_command_disabled(msg.chat.id, name).await?
                && !state.admins.is_message_admin(msg).await?
            {
                debug!(chat_id = msg.chat.id, command = name, "ignoring disabled command");
                return Ok(Propagation::Continue);
            }
        }

        if let Err(e) = run_command(state, msg, command).await {
            return Ok(e.report(state.platform.as_ref(), msg.chat.id, Some(msg.id)).await);
        }
        Ok(Propagation::EndGroups)
    }
}

async fn run_command(state: &AppState, msg: &Message, command: Command) -> Result<()> {
    match command {
        Command::Flood => antiflood::flood_command(state, msg).await,
        Command::Setflood => antiflood::setflood_command(state, msg).await,
        Command::Setfloodmode => antiflood::setfloodmode_command(state, msg).await,
        Command::Delflood => antiflood::delflood_command(state, msg).await,

        Command::Blacklists => blacklist::blacklists_command(state, msg).await,
        Command::Addblacklist => blacklist::addblacklist_command(state, msg).await,
        Command::Rmblacklist => blacklist::rmblacklist_command(state, msg).await,
        Command::Blaction => blacklist::blaction_command(state, msg).await,
        Command::Remallbl => blacklist::remallbl_command(state, msg).await,

        Command::Lock => locks::lock_command(state, msg).await,
        Command::Unlock => locks::unlock_command(state, msg).await,
        Command::Locks => locks::locks_command(state, msg).await,
        Command::Locktypes => locks::locktypes_command(state, msg).await,

        Command::Warn => warn::warn_command(state, msg).await,
        Command::Swarn => warn::swarn_command(state, msg).await,
        Command::Dwarn => warn::dwarn_command(state, msg).await,
        Command::Resetwarns => warn::resetwarns_command(state, msg).await,
        Command::Rmwarn => warn::rmwarn_command(state, msg).await,
        Command::Warns => warn::warns_command(state, msg).await,
        Command::Warnings => warn::warnings_command(state, msg).await,
        Command::Setwarnlimit => warn::setwarnlimit_command(state, msg).await,
        Command::Setwarnmode => warn::setwarnmode_command(state, msg).await,
        Command::Resetallwarns => warn::resetallwarns_command(state, msg).await,

        Command::Ban => ban::ban_command(state, msg).await,
        Command::Tban => ban::tban_command(state, msg).await,
        Command::Kick => ban::kick_command(state, msg).await,
        Command::Unban => ban::unban_command(state, msg).await,
        Command::Restrict => ban::restrict_command(state, msg).await,

        Command::Mute => mute::mute_command(state, msg).await,
        Command::Tmute => mute::tmute_command(state, msg).await,
        Command::Unmute => mute::unmute_command(state, msg).await,

        Command::Promote => admin::promote_command(state, msg).await,
        Command::Demote => admin::demote_command(state, msg).await,
        Command::Admincache => admin::admincache_command(state, msg).await,

        Command::Pin => pin::pin_command(state, msg).await,
        Command::Unpin => pin::unpin_command(state, msg).await,
        Command::Unpinall => pin::unpinall_command(state, msg).await,
        Command::Pinned => pin::pinned_command(state, msg).await,
        Command::Permapin => pin::permapin_command(state, msg).await,
        Command::Antichannelpin => pin::antichannelpin_command(state, msg).await,
        Command::Cleanlinked => pin::cleanlinked_command(state, msg).await,

        Command::Report => reports::report_command(state, msg).await,
        Command::Reports => reports::reports_command(state, msg).await,

        Command::Disable => disabling::disable_command(state, msg).await,
        Command::Enable => disabling::enable_command(state, msg).await,
        Command::Disabled => disabling::disabled_command(state, msg).await,

        Command::Captcha => captcha::captcha_command(state, msg).await,
        Command::Captchamode => captcha::captchamode_command(state, msg).await,
        Command::Captchatime => captcha::captchatime_command(state, msg).await,
        Command::Captchaaction => captcha::captchaaction_command(state, msg).await,
        Command::Captchatries => captcha::captchatries_command(state, msg).await,

        Command::Filter => filters::filter_command(state, msg).await,
        Command::Stop => filters::stop_command(state, msg).await,
        Command::Filters => filters::filters_command(state, msg).await,
        Command::Stopall => filters::stopall_command(state, msg).await,

        Command::Autoapprove => join::autoapprove_command(state, msg).await,
    }
}

/// Register the command and callback handlers.
pub fn register(dispatcher: &mut Dispatcher) {
    dispatcher
        .add_handler(group::DEFAULT, CommandHandler)
        .add_handler(group::DEFAULT, CallbackHandler);
}

/// Admin rights a command may require from its caller or from the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Right {
    Restrict,
    Pin,
    Promote,
    ChangeInfo,
    Delete,
    Invite,
}

impl Right {
    fn denied_key(self) -> &'static str {
        match self {
            Self::Restrict => "errors.need_restrict",
            Self::Pin => "errors.need_pin",
            Self::Promote => "errors.need_promote",
            Self::ChangeInfo => "errors.need_change_info",
            Self::Delete => "errors.need_delete",
            Self::Invite => "errors.need_invite",
        }
    }
}

/// Send an HTML reply to `msg`.
pub(crate) async fn reply(state: &AppState, msg: &Message, text: &str) -> Result<()> {
    state
        .platform
        .send_message(msg.chat.id, text, SendOptions::html().reply_to(msg.id))
        .await?;
    Ok(())
}

pub(crate) fn require_group(msg: &Message) -> Result<()> {
    if msg.chat.is_group() {
        Ok(())
    } else {
        Err(ModerationError::Validation("errors.group_only"))
    }
}

pub(crate) async fn require_admin(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    if state.admins.is_message_admin(msg).await? {
        Ok(())
    } else {
        Err(ModerationError::PermissionDenied("errors.admin_only"))
    }
}

/// Whether `user_id` holds `right` in `chat_id`.
pub(crate) async fn user_has_right(
    state: &AppState,
    chat_id: i64,
    user_id: u64,
    right: Right,
) -> Result<bool> {
    let admins = &state.admins;
    match right {
        Right::Restrict => admins.can_user_restrict(chat_id, user_id).await,
        Right::Pin => admins.can_user_pin(chat_id, user_id).await,
        Right::Promote => admins.can_user_promote(chat_id, user_id).await,
        Right::ChangeInfo => admins.can_user_change_info(chat_id, user_id).await,
        Right::Delete => admins.can_user_delete(chat_id, user_id).await,
        Right::Invite => admins.can_invite(chat_id, user_id).await,
    }
}

/// Caller must be a group admin holding `right`. Anonymous admins hold every right.
pub(crate) async fn require_user_right(state: &AppState, msg: &Message, right: Right) -> Result<()> {
    require_group(msg)?;
    if msg.is_anonymous_admin() {
        return Ok(());
    }
    let Some(user_id) = msg.sender_id() else {
        return Err(ModerationError::PermissionDenied(right.denied_key()));
    };
    if user_has_right(state, msg.chat.id, user_id, right).await? {
        Ok(())
    } else {
        Err(ModerationError::PermissionDenied(right.denied_key()))
    }
}

pub(crate) async fn require_bot_right(state: &AppState, chat_id: i64, right: Right) -> Result<()> {
    let admins = &state.admins;
    let allowed = match right {
        Right::Restrict => admins.can_bot_restrict(chat_id).await?,
        Right::Pin => admins.can_bot_pin(chat_id).await?,
        Right::Promote => admins.can_bot_promote(chat_id).await?,
        Right::Delete => admins.can_bot_delete(chat_id).await?,
        Right::ChangeInfo | Right::Invite => true,
    };
    if allowed {
        Ok(())
    } else {
        Err(ModerationError::PermissionDenied("errors.bot_rights"))
    }
}

/// Only the chat creator (or a bot owner) may run this.
pub(crate) async fn require_chat_owner(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let owner = match msg.sender_id() {
        Some(user_id) => state.admins.is_owner(msg.chat.id, user_id).await?,
        None => false,
    };
    if owner {
        Ok(())
    } else {
        Err(ModerationError::PermissionDenied("errors.owner_only"))
    }
}

/// The user the command acts on. The bot itself is never a valid target.
pub(crate) async fn require_target(state: &AppState, msg: &Message) -> Result<Target> {
    let target = resolve_target(state.store.as_ref(), msg)
        .await?
        .ok_or(ModerationError::TargetInvalid("errors.no_target"))?;
    if target.user_id == state.bot.id {
        return Err(ModerationError::TargetInvalid("errors.target_self"));
    }
    Ok(target)
}

/// Lowercase argument text of the command in `msg`.
pub(crate) fn args(msg: &Message) -> &str {
    crate::utils::command_args(msg.text.as_deref().unwrap_or_default())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::bot::state::testing::state_for;
    use crate::database::Store;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/warn @bob rude", "warden_bot").ok(), Some(Command::Warn));
        assert_eq!(
            Command::parse("/setflood@warden_bot 5", "warden_bot").ok(),
            Some(Command::Setflood)
        );
        assert!(Command::parse("/warn@other_bot", "warden_bot").is_err());
        assert!(Command::parse("/nosuchcommand", "warden_bot").is_err());
    }

    #[test]
    fn test_disableable_names_match_list() {
        for cmd in [Command::Flood, Command::Warns, Command::Locks, Command::Filters, Command::Report] {
            let name = cmd.disableable().unwrap();
            assert!(DISABLEABLE.contains(&name));
        }
        assert_eq!(Command::Ban.disableable(), None);
    }

    #[tokio::test]
    async fn test_disabled_command_ignored_for_members() {
        let t = state_for(CHAT);
        promote_admin(&t);
        t.store.disable_command(CHAT, "flood").await.unwrap();

        let flow = run(&t, &member(5, "Bob"), "/flood").await;
        assert_eq!(flow, Propagation::Continue);
        assert!(t.platform.sent_texts().is_empty());

        let flow = run(&t, &admin(), "/flood").await;
        assert_eq!(flow, Propagation::EndGroups);
        assert_eq!(t.platform.sent_texts().len(), 1);
    }

    #[tokio::test]
    async fn test_non_admin_gets_refusal() {
        let t = state_for(CHAT);
        run(&t, &member(5, "Bob"), "/setflood 5").await;
        let sent = t.platform.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].contains("errors."));
        assert!(!t.store.get_flood_settings(CHAT).await.unwrap().is_enabled());
    }
}
