//! Error kinds shared by every enforcement engine.
//!
//! Handlers never let these escape the dispatcher: they are translated into
//! a user-visible reply plus a propagation decision via [`ModerationError::report`].

use thiserror::Error;
use tracing::{debug, error};

use crate::bot::handler::Propagation;
use crate::i18n::get_text;
use crate::platform::{Platform, SendOptions};

pub type Result<T, E = ModerationError> = std::result::Result<T, E>;

/// Classification of a failed platform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    NotFound,
    PermissionDenied,
    BadRequest,
    RateLimited,
    Network,
    Timeout,
    Other,
}

/// Error returned by the messaging platform as `(kind, message)`.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == PlatformErrorKind::NotFound
    }
}

/// Persistent store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("serialization: {0}")]
    Serialization(String),
}

/// The user-facing error kinds of the moderation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    TargetInvalid,
    Transient,
    NotFound,
    Validation,
    Internal,
}

#[derive(Debug, Error)]
pub enum ModerationError {
    /// Carries the i18n key of the refusal text.
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("invalid target: {0}")]
    TargetInvalid(&'static str),

    #[error("transient platform failure: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Carries the i18n key of the usage hint.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ModerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::TargetInvalid(_) => ErrorKind::TargetInvalid,
            Self::Transient(_) => ErrorKind::Transient,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Presentation key for the reply sent to the chat, if any.
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied(key) | Self::TargetInvalid(key) | Self::Validation(key) => {
                Some(key)
            }
            Self::Transient(_) => Some("errors.transient"),
            Self::Internal(_) => Some("errors.internal"),
            Self::NotFound(_) => None,
        }
    }

    /// Log the error, reply once in `chat_id` and decide how the pipeline continues.
    pub async fn report(
        &self,
        platform: &dyn Platform,
        chat_id: i64,
        reply_to: Option<i32>,
    ) -> Propagation {
        match self.kind() {
            ErrorKind::NotFound => {
                debug!(chat_id, "ignoring not-found: {}", self);
                return Propagation::Continue;
            }
            ErrorKind::Transient | ErrorKind::Internal => error!(chat_id, "{}", self),
            _ => debug!(chat_id, "{}", self),
        }

        if let Some(key) = self.message_key() {
            let opts = SendOptions {
                reply_to,
                ..SendOptions::html()
            };
            if let Err(e) = platform.send_message(chat_id, &get_text("en", key), opts).await {
                error!(chat_id, "failed to deliver error reply: {}", e);
            }
        }

        Propagation::EndGroups
    }
}

impl From<PlatformError> for ModerationError {
    fn from(e: PlatformError) -> Self {
        match e.kind {
            PlatformErrorKind::NotFound => Self::NotFound(e.message),
            PlatformErrorKind::PermissionDenied => Self::PermissionDenied("errors.bot_rights"),
            PlatformErrorKind::BadRequest => Self::TargetInvalid("errors.bad_target"),
            PlatformErrorKind::RateLimited
            | PlatformErrorKind::Network
            | PlatformErrorKind::Timeout => Self::Transient(e.message),
            PlatformErrorKind::Other => Self::Internal(e.message),
        }
    }
}

impl From<StoreError> for ModerationError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Treat a not-found platform error as success.
pub trait IgnoreNotFound {
    fn ignore_not_found(self) -> std::result::Result<(), PlatformError>;
}

impl<T> IgnoreNotFound for std::result::Result<T, PlatformError> {
    fn ignore_not_found(self) -> std::result::Result<(), PlatformError> {
        match self {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_mapping() {
        let e: ModerationError = PlatformError::new(PlatformErrorKind::Timeout, "slow").into();
        assert_eq!(e.kind(), ErrorKind::Transient);

        let e: ModerationError = PlatformError::new(PlatformErrorKind::NotFound, "gone").into();
        assert_eq!(e.kind(), ErrorKind::NotFound);
        assert!(e.message_key().is_none());

        let e: ModerationError =
            PlatformError::new(PlatformErrorKind::PermissionDenied, "no rights").into();
        assert_eq!(e.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_ignore_not_found() {
        let r: std::result::Result<(), PlatformError> =
            Err(PlatformError::new(PlatformErrorKind::NotFound, "message to delete not found"));
        assert!(r.ignore_not_found().is_ok());

        let r: std::result::Result<(), PlatformError> =
            Err(PlatformError::new(PlatformErrorKind::Network, "reset"));
        assert!(r.ignore_not_found().is_err());
    }
}
