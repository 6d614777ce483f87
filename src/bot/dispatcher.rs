//! Ordered handler groups.
//!
//! Groups run in ascending order; inside a group handlers run in
//! registration order. A handler error, timeout or panic is logged and
//! treated as `Continue`.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error};

use super::handler::{Handler, Propagation};
use super::state::AppState;
use crate::platform::Update;
use crate::{events, plugins, security};

#[derive(Default)]
pub struct Dispatcher {
    groups: BTreeMap<i32, Vec<Arc<dyn Handler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` at the end of `group`. Only called at startup.
    pub fn add_handler(&mut self, group: i32, handler: impl Handler + 'static) -> &mut Self {
        self.groups.entry(group).or_default().push(Arc::new(handler));
        self
    }

    pub fn handler_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Run `update` through every group until a handler ends propagation.
    pub async fn dispatch(&self, state: &AppState, update: &Update) {
        let deadline = state.limits.handler_timeout;

        'groups: for (&group, handlers) in &self.groups {
            for handler in handlers {
                match run_guarded(handler.as_ref(), state, update, deadline, group).await {
                    Propagation::Continue => {}
                    Propagation::EndChain => continue 'groups,
                    Propagation::EndGroups => {
                        debug!(group, handler = handler.name(), "propagation ended");
                        break 'groups;
                    }
                }
            }
        }
    }

    /// Security gate first, then the handler groups.
    pub async fn process(&self, state: &AppState, update: &Update) {
        if security::screen(state, update).await == Propagation::EndGroups {
            return;
        }
        self.dispatch(state, update).await;
    }
}

/// Build the dispatcher with every event handler and the command surface.
pub fn build_dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    events::register(&mut dispatcher);
    plugins::register(&mut dispatcher);
    dispatcher
}

async fn run_guarded(
    handler: &dyn Handler,
    state: &AppState,
    update: &Update,
    deadline: Duration,
    group: i32,
) -> Propagation {
    let name = handler.name();
    let call = AssertUnwindSafe(handler.handle(state, update)).catch_unwind();

    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(Ok(propagation))) => propagation,
        Ok(Ok(Err(e))) => {
            error!(handler = name, group, "handler failed: {}", e);
            Propagation::Continue
        }
        Ok(Err(_)) => {
            error!(handler = name, group, "handler panicked");
            Propagation::Continue
        }
        Err(_) => {
            error!(handler = name, group, "handler timed out after {:?}", deadline);
            Propagation::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::bot::state::testing::state_for;
    use crate::error::{ModerationError, Result};
    use crate::platform::UpdateKind;

    struct Scripted {
        name: &'static str,
        outcome: Outcome,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[derive(Clone, Copy)]
    enum Outcome {
        Return(Propagation),
        Fail,
        Panic,
        Hang,
    }

    #[async_trait]
    impl Handler for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(&self, _state: &AppState, _update: &Update) -> Result<Propagation> {
            self.log.lock().push(self.name);
            match self.outcome {
                Outcome::Return(p) => Ok(p),
                Outcome::Fail => Err(ModerationError::Internal("boom".to_string())),
                Outcome::Panic => panic!("handler panicked"),
                Outcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Propagation::Continue)
                }
            }
        }
    }

    fn scripted(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str, outcome: Outcome) -> Scripted {
        Scripted {
            name,
            outcome,
            log: Arc::clone(log),
        }
    }

    const CONTINUE: Outcome = Outcome::Return(Propagation::Continue);

    #[tokio::test]
    async fn test_groups_run_in_ascending_order() {
        let t = state_for(-1);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .add_handler(9, scripted(&log, "filters", CONTINUE))
            .add_handler(-2, scripted(&log, "antispam", CONTINUE))
            .add_handler(0, scripted(&log, "first", CONTINUE))
            .add_handler(0, scripted(&log, "second", CONTINUE));

        dispatcher.dispatch(&t, &Update::new(UpdateKind::Other)).await;
        assert_eq!(*log.lock(), vec!["antispam", "first", "second", "filters"]);
    }

    #[tokio::test]
    async fn test_end_chain_and_end_groups() {
        let t = state_for(-1);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .add_handler(0, scripted(&log, "a", Outcome::Return(Propagation::EndChain)))
            .add_handler(0, scripted(&log, "skipped", CONTINUE))
            .add_handler(1, scripted(&log, "b", Outcome::Return(Propagation::EndGroups)))
            .add_handler(2, scripted(&log, "never", CONTINUE));

        dispatcher.dispatch(&t, &Update::new(UpdateKind::Other)).await;
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failures_are_contained() {
        let t = state_for(-1);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .add_handler(0, scripted(&log, "fail", Outcome::Fail))
            .add_handler(1, scripted(&log, "panic", Outcome::Panic))
            .add_handler(2, scripted(&log, "after", CONTINUE));

        dispatcher.dispatch(&t, &Update::new(UpdateKind::Other)).await;
        assert_eq!(*log.lock(), vec!["fail", "panic", "after"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_continue() {
        let t = state_for(-1);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .add_handler(0, scripted(&log, "hang", Outcome::Hang))
            .add_handler(1, scripted(&log, "after", CONTINUE));

        dispatcher.dispatch(&t, &Update::new(UpdateKind::Other)).await;
        assert_eq!(*log.lock(), vec!["hang", "after"]);
        assert_eq!(dispatcher.handler_count(), 2);
    }

    #[tokio::test]
    async fn test_full_pipeline_enforces_new_blacklist() {
        use crate::platform::fake::{Call, text_message};
        use crate::plugins::testing::{CHAT, admin, member, promote_admin};

        let t = state_for(CHAT);
        promote_admin(&t);
        let dispatcher = build_dispatcher();
        assert!(dispatcher.handler_count() > 10);

        let command = text_message(CHAT, 1, &admin(), "/addblacklist spam");
        dispatcher.process(&t, &Update::new(UpdateKind::Message(command))).await;

        let spam = text_message(CHAT, 2, &member(5, "Bob"), "buy spam now");
        dispatcher.process(&t, &Update::new(UpdateKind::Message(spam))).await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Delete { message_id: 2, .. })), 1);
    }
}
