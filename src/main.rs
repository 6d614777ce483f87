//! Warden - moderation enforcement core for a Telegram group-admin bot.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `platform` - Domain update model, `Platform` trait and the teloxide adapter
//! - `database` - `Store` contract with MongoDB and in-memory backends
//! - `cache` - Moka-based caches (loading, ephemeral, typed)
//! - `permissions` - Admin oracle with single-flight caching
//! - `matcher` - Aho-Corasick automata per chat
//! - `security` - Rate limiting and input validation gate
//! - `moderation` - Sanction executor and warn ledger
//! - `captcha` - Join verification
//! - `bot` - Dispatcher, shared state, periodic tasks and runtime
//! - `events` - Non-command handlers (antiflood, locks, blacklist, ...)
//! - `plugins` - Command handlers and button callbacks

mod bot;
mod cache;
mod captcha;
mod config;
mod database;
mod error;
mod events;
mod i18n;
mod matcher;
mod moderation;
mod permissions;
mod platform;
mod plugins;
mod security;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bot::{AppState, BotIdentity};
use cache::CacheRegistry;
use config::{Config, StoreBackend};
use database::{Database, MemoryStore, MongoStore, Store};
use platform::telegram::TelegramPlatform;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warden=info,teloxide=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Warden...");

    let config = Config::from_env()?;
    info!("Bot mode: {:?}, store: {:?}", config.bot_mode, config.store_backend);

    // Repository caches; empty with the memory backend
    let store_caches = CacheRegistry::new();
    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory store, state is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Mongo => {
            let uri = config.mongodb_uri.as_deref().unwrap_or_default();
            info!("Connecting to MongoDB...");
            let db = Database::connect(uri, &config.mongodb_database).await?;
            db.ensure_indexes().await?;
            Arc::new(MongoStore::new(&db, &store_caches))
        }
    };

    // Throttle respects Telegram's global and per-chat send limits
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    let username = config
        .bot_username
        .clone()
        .unwrap_or_else(|| me.username().to_string());
    info!("Using bot username: @{}", username);

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let state = Arc::new(AppState::new(
        Arc::new(TelegramPlatform::new(bot.clone())),
        store,
        BotIdentity {
            id: me.id.0,
            username,
        },
        config.owner_ids.clone(),
        config.limits.clone(),
    ));

    let dispatcher = bot::build_dispatcher();
    info!("Dispatcher ready with {} handlers", dispatcher.handler_count());

    let mut tasks = bot::tasks::spawn_all(Arc::clone(&state));
    tasks.spawn("store_cache_maintenance", bot::tasks::CACHE_MAINTENANCE, move || {
        let caches = store_caches.clone();
        async move {
            caches.run_pending_tasks();
            debug!(entries = ?caches.entry_counts(), "store caches maintained");
        }
    });
    let result = bot::run(&config, bot, dispatcher, state).await;

    tasks.shutdown().await;
    info!("Warden stopped");
    result
}
