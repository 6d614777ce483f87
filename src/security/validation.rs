//! Message content validation.

use thiserror::Error;

pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Script-injection fragments, compared against lowercased text.
const SCRIPT_FRAGMENTS: [&str; 7] = [
    "<script",
    "javascript:",
    "data:text/html",
    "vbscript:",
    "onload=",
    "onerror=",
    "onclick=",
];

/// SQL injection sigils, compared against uppercased text.
const SQL_SIGILS: [&str; 3] = ["' OR '1'='1", "; DROP TABLE", "UNION SELECT"];

/// NoSQL operator sigils, compared case-sensitively.
const NOSQL_SIGILS: [&str; 5] = ["$where", "$regex", "$ne", "$gt", "$lt"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message has {0} characters")]
    TooLong(usize),

    #[error("script fragment {0:?}")]
    Script(&'static str),

    #[error("injection sigil {0:?}")]
    Injection(&'static str),
}

pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    let chars = text.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(ValidationError::TooLong(chars));
    }

    let lower = text.to_lowercase();
    if let Some(fragment) = SCRIPT_FRAGMENTS.iter().find(|f| lower.contains(*f)) {
        return Err(ValidationError::Script(fragment));
    }

    let upper = text.to_uppercase();
    if let Some(sigil) = SQL_SIGILS.iter().find(|s| upper.contains(*s)) {
        return Err(ValidationError::Injection(sigil));
    }

    if let Some(sigil) = NOSQL_SIGILS.iter().find(|s| text.contains(*s)) {
        return Err(ValidationError::Injection(sigil));
    }

    Ok(())
}
