//! Bot runtime - feeds updates from polling or webhook into the dispatcher.

use std::fmt::Debug;
use std::sync::Arc;

use futures::StreamExt;
use teloxide::types::AllowedUpdate;
use teloxide::update_listeners::{AsUpdateStream, UpdateListener, polling_default};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::dispatcher::Dispatcher;
use super::state::AppState;
use super::webhook;
use crate::config::{BotMode, Config};
use crate::platform::telegram::{ThrottledBot, convert_update};

/// Updates processed at the same time.
const MAX_CONCURRENT_UPDATES: usize = 64;

const ALLOWED_UPDATES: [AllowedUpdate; 4] = [
    AllowedUpdate::Message,
    AllowedUpdate::CallbackQuery,
    AllowedUpdate::ChatMember,
    AllowedUpdate::ChatJoinRequest,
];

/// Run the bot with the configured mode until Ctrl+C.
pub async fn run(
    config: &Config,
    bot: ThrottledBot,
    dispatcher: Dispatcher,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    let dispatcher = Arc::new(dispatcher);
    match config.bot_mode {
        BotMode::Polling => {
            info!("Starting bot in polling mode...");
            let listener = polling_default(bot).await;
            drive(listener, dispatcher, state).await;
        }
        BotMode::Webhook => {
            info!("Starting bot in webhook mode...");
            let listener = webhook::listener(config, &bot).await?;
            drive(listener, dispatcher, state).await;
        }
    }
    Ok(())
}

async fn drive<L>(mut listener: L, dispatcher: Arc<Dispatcher>, state: Arc<AppState>)
where
    L: UpdateListener,
    L::Err: Debug,
{
    listener.hint_allowed_updates(&mut ALLOWED_UPDATES.into_iter());
    let stop = listener.stop_token();
    let workers = Arc::new(Semaphore::new(MAX_CONCURRENT_UPDATES));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    let stream = listener.as_stream();
    tokio::pin!(stream);

    loop {
        tokio::select! {
            signal = &mut ctrl_c, if !stopping => {
                if let Err(e) = signal {
                    error!("failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown requested, stopping update listener...");
                stop.stop();
                stopping = true;
            }
            next = stream.next() => match next {
                Some(Ok(update)) => {
                    let Ok(permit) = Arc::clone(&workers).acquire_owned().await else {
                        break;
                    };
                    let update = convert_update(update);
                    let dispatcher = Arc::clone(&dispatcher);
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        dispatcher.process(&state, &update).await;
                        drop(permit);
                    });
                }
                Some(Err(e)) => warn!("Error from update listener: {:?}", e),
                None => break,
            }
        }
    }

    // wait for in-flight updates
    if let Err(e) = workers.acquire_many(MAX_CONCURRENT_UPDATES as u32).await {
        error!("worker pool closed early: {}", e);
    }
    debug!("update listener drained");
}
