//! Keyword matching for blacklists and filters.

mod automaton;
mod cache;

pub use automaton::{Match, Matcher, fingerprint};
pub use cache::{CachedMatcher, MatcherCache, MatcherNamespace};
