//! Inline keyboard callback data.
//!
//! Wire format is `<namespace>.<action>(.<arg>)*`. Every button the bot emits
//! is built from a [`Callback`] and every press is parsed back into one, so
//! `Callback::parse(&cb.to_data()) == Ok(cb)` holds for all values.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackParseError {
    #[error("empty callback data")]
    Empty,
    #[error("namespace {namespace} expects {expected} fields, got {got}")]
    Arity {
        namespace: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid field {0:?}")]
    Field(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnrestrictAction {
    Unmute,
    Unban,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictAction {
    Ban,
    Kick,
    Mute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAction {
    Accept,
    Decline,
    Ban,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    Kick,
    Ban,
    Delete,
    Resolve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Unrestrict { action: UnrestrictAction, user_id: u64 },
    Restrict { action: RestrictAction, user_id: u64 },
    RemoveWarn { user_id: u64 },
    ResetAllWarns { confirm: bool },
    RemoveAllBlacklist { confirm: bool },
    RemoveAllFilters { confirm: bool },
    CaptchaVerify { attempt_id: u64, user_id: u64, answer: String },
    CaptchaRefresh { attempt_id: u64, user_id: u64 },
    JoinRequest { action: JoinAction, user_id: u64 },
    UnpinAll { confirm: bool },
    /// Settle a report on `user_id` about `message_id`.
    Report { action: ReportAction, user_id: u64, message_id: i32 },
    /// A namespace this bot does not act on.
    Unhandled { namespace: String },
}

const UNRESTRICT: &str = "unrestrict";
const RESTRICT: &str = "restrict";
const RM_WARN: &str = "rmWarn";
const RM_ALL_WARNS: &str = "rmAllChatWarns";
const RM_ALL_BLACKLIST: &str = "rmAllBlacklist";
const RM_ALL_FILTERS: &str = "rmAllFilters";
const CAPTCHA_VERIFY: &str = "captcha_verify";
const CAPTCHA_REFRESH: &str = "captcha_refresh";
const JOIN_REQUEST: &str = "join_request";
const UNPIN_ALL: &str = "unpinallbtn";
const REPORT: &str = "report";

impl Callback {
    pub fn parse(data: &str) -> Result<Self, CallbackParseError> {
        if data.is_empty() {
            return Err(CallbackParseError::Empty);
        }

        let mut parts = data.split('.');
        let namespace = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let cb = match namespace {
            UNRESTRICT => {
                arity(UNRESTRICT, &args, 2)?;
                let action = match args[0] {
                    "unmute" => UnrestrictAction::Unmute,
                    "unban" => UnrestrictAction::Unban,
                    other => return Err(CallbackParseError::Field(other.to_string())),
                };
                Self::Unrestrict {
                    action,
                    user_id: id(args[1])?,
                }
            }
            RESTRICT => {
                arity(RESTRICT, &args, 2)?;
                let action = match args[0] {
                    "ban" => RestrictAction::Ban,
                    "kick" => RestrictAction::Kick,
                    "mute" => RestrictAction::Mute,
                    other => return Err(CallbackParseError::Field(other.to_string())),
                };
                Self::Restrict {
                    action,
                    user_id: id(args[1])?,
                }
            }
            RM_WARN => {
                arity(RM_WARN, &args, 1)?;
                Self::RemoveWarn {
                    user_id: id(args[0])?,
                }
            }
            RM_ALL_WARNS => Self::ResetAllWarns {
                confirm: yes_no(RM_ALL_WARNS, &args)?,
            },
            RM_ALL_BLACKLIST => Self::RemoveAllBlacklist {
                confirm: yes_no(RM_ALL_BLACKLIST, &args)?,
            },
            RM_ALL_FILTERS => Self::RemoveAllFilters {
                confirm: yes_no(RM_ALL_FILTERS, &args)?,
            },
            CAPTCHA_VERIFY => {
                arity(CAPTCHA_VERIFY, &args, 3)?;
                if args[2].is_empty() {
                    return Err(CallbackParseError::Field(String::new()));
                }
                Self::CaptchaVerify {
                    attempt_id: id(args[0])?,
                    user_id: id(args[1])?,
                    answer: args[2].to_string(),
                }
            }
            CAPTCHA_REFRESH => {
                arity(CAPTCHA_REFRESH, &args, 2)?;
                Self::CaptchaRefresh {
                    attempt_id: id(args[0])?,
                    user_id: id(args[1])?,
                }
            }
            JOIN_REQUEST => {
                arity(JOIN_REQUEST, &args, 2)?;
                let action = match args[0] {
                    "accept" => JoinAction::Accept,
                    "decline" => JoinAction::Decline,
                    "ban" => JoinAction::Ban,
                    other => return Err(CallbackParseError::Field(other.to_string())),
                };
                Self::JoinRequest {
                    action,
                    user_id: id(args[1])?,
                }
            }
            UNPIN_ALL => Self::UnpinAll {
                confirm: yes_no(UNPIN_ALL, &args)?,
            },
            REPORT => {
                arity(REPORT, &args, 3)?;
                let action = match args[0] {
                    "kick" => ReportAction::Kick,
                    "ban" => ReportAction::Ban,
                    "delete" => ReportAction::Delete,
                    "resolved" => ReportAction::Resolve,
                    other => return Err(CallbackParseError::Field(other.to_string())),
                };
                Self::Report {
                    action,
                    user_id: id(args[1])?,
                    message_id: args[2]
                        .parse()
                        .map_err(|_| CallbackParseError::Field(args[2].to_string()))?,
                }
            }
            other => Self::Unhandled {
                namespace: other.to_string(),
            },
        };

        Ok(cb)
    }

    /// Encode for use as inline button data.
    pub fn to_data(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrestrict { action, user_id } => {
                let action = match action {
                    UnrestrictAction::Unmute => "unmute",
                    UnrestrictAction::Unban => "unban",
                };
                write!(f, "{UNRESTRICT}.{action}.{user_id}")
            }
            Self::Restrict { action, user_id } => {
                let action = match action {
                    RestrictAction::Ban => "ban",
                    RestrictAction::Kick => "kick",
                    RestrictAction::Mute => "mute",
                };
                write!(f, "{RESTRICT}.{action}.{user_id}")
            }
            Self::RemoveWarn { user_id } => write!(f, "{RM_WARN}.{user_id}"),
            Self::ResetAllWarns { confirm } => write!(f, "{RM_ALL_WARNS}.{}", yes(*confirm)),
            Self::RemoveAllBlacklist { confirm } => {
                write!(f, "{RM_ALL_BLACKLIST}.{}", yes(*confirm))
            }
            Self::RemoveAllFilters { confirm } => write!(f, "{RM_ALL_FILTERS}.{}", yes(*confirm)),
            Self::CaptchaVerify {
                attempt_id,
                user_id,
                answer,
            } => write!(f, "{CAPTCHA_VERIFY}.{attempt_id}.{user_id}.{answer}"),
            Self::CaptchaRefresh {
                attempt_id,
                user_id,
            } => write!(f, "{CAPTCHA_REFRESH}.{attempt_id}.{user_id}"),
            Self::JoinRequest { action, user_id } => {
                let action = match action {
                    JoinAction::Accept => "accept",
                    JoinAction::Decline => "decline",
                    JoinAction::Ban => "ban",
                };
                write!(f, "{JOIN_REQUEST}.{action}.{user_id}")
            }
            Self::UnpinAll { confirm } => write!(f, "{UNPIN_ALL}.{}", yes(*confirm)),
            Self::Report {
                action,
                user_id,
                message_id,
            } => {
                let action = match action {
                    ReportAction::Kick => "kick",
                    ReportAction::Ban => "ban",
                    ReportAction::Delete => "delete",
                    ReportAction::Resolve => "resolved",
                };
                write!(f, "{REPORT}.{action}.{user_id}.{message_id}")
            }
            Self::Unhandled { namespace } => write!(f, "{namespace}"),
        }
    }
}

impl FromStr for Callback {
    type Err = CallbackParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn arity(namespace: &'static str, args: &[&str], expected: usize) -> Result<(), CallbackParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CallbackParseError::Arity {
            namespace,
            expected,
            got: args.len(),
        })
    }
}

fn id(raw: &str) -> Result<u64, CallbackParseError> {
    raw.parse()
        .map_err(|_| CallbackParseError::Field(raw.to_string()))
}

fn yes_no(namespace: &'static str, args: &[&str]) -> Result<bool, CallbackParseError> {
    arity(namespace, args, 1)?;
    match args[0] {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(CallbackParseError::Field(other.to_string())),
    }
}

fn yes(confirm: bool) -> &'static str {
    if confirm { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestrict_wire_format() {
        let cb = Callback::Unrestrict {
            action: UnrestrictAction::Unmute,
            user_id: 42,
        };
        assert_eq!(cb.to_data(), "unrestrict.unmute.42");
        assert_eq!(Callback::parse("unrestrict.unmute.42"), Ok(cb));
    }

    #[test]
    fn test_every_variant_survives_format_then_parse() {
        let all = vec![
            Callback::Unrestrict { action: UnrestrictAction::Unban, user_id: 1 },
            Callback::Restrict { action: RestrictAction::Kick, user_id: 2 },
            Callback::RemoveWarn { user_id: 3 },
            Callback::ResetAllWarns { confirm: true },
            Callback::RemoveAllBlacklist { confirm: false },
            Callback::RemoveAllFilters { confirm: true },
            Callback::CaptchaVerify { attempt_id: 9, user_id: 4, answer: "-12".to_string() },
            Callback::CaptchaRefresh { attempt_id: 9, user_id: 4 },
            Callback::JoinRequest { action: JoinAction::Decline, user_id: 5 },
            Callback::UnpinAll { confirm: false },
            Callback::Report { action: ReportAction::Resolve, user_id: 6, message_id: 40 },
            Callback::Unhandled { namespace: "helpq".to_string() },
        ];

        for cb in all {
            assert_eq!(Callback::parse(&cb.to_data()), Ok(cb.clone()), "{}", cb);
        }
    }

    #[test]
    fn test_rejects_bad_arity_and_fields() {
        assert!(matches!(
            Callback::parse("rmWarn"),
            Err(CallbackParseError::Arity { expected: 1, got: 0, .. })
        ));
        assert!(Callback::parse("unrestrict.unmute.abc").is_err());
        assert!(Callback::parse("unrestrict.explode.1").is_err());
        assert!(Callback::parse("rmAllBlacklist.maybe").is_err());
        assert!(Callback::parse("report.kick.5").is_err());
        assert!(Callback::parse("report.kick.5.x").is_err());
        assert_eq!(Callback::parse(""), Err(CallbackParseError::Empty));
    }
}
