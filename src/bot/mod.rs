//! Bot module - dispatcher, shared state and runtime.

pub mod dispatcher;
pub mod handler;
mod runtime;
pub mod state;
pub mod tasks;
mod webhook;

pub use dispatcher::{Dispatcher, build_dispatcher};
pub use runtime::run;
pub use state::{AppState, BotIdentity};
