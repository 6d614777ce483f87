//! Whole-word, case-insensitive multi-pattern matching.
//!
//! A trigger matches when it is preceded by the start of the text or an
//! ASCII whitespace character, and followed by a word boundary, the same
//! shape as the regular expression `(^|\s)pattern\b`.
//!
//! Word characters are ASCII only (`[A-Za-z0-9_]`). Any non-ASCII character,
//! including accented and Cyrillic letters, counts as a non-word character,
//! so `caf` matches inside `café` and a trigger ending in a non-ASCII letter
//! only matches when followed by an ASCII word character. Case folding is
//! ASCII-only on ASCII input; non-ASCII input is lowercased before searching
//! and offsets then refer to the lowercased text.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use aho_corasick::{AhoCorasick, BuildError, MatchKind};

/// One occurrence of a trigger. Offsets are byte offsets, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub pattern: String,
    pub start: usize,
    pub end: usize,
}

pub struct Matcher {
    automaton: Option<AhoCorasick>,
    patterns: Vec<String>,
    fingerprint: u64,
}

impl Matcher {
    /// Build over `triggers`; they are lowercased, deduplicated and sorted.
    pub fn new<I, S>(triggers: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = normalize(triggers);
        let fingerprint = fingerprint_sorted(&patterns);

        let automaton = if patterns.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .match_kind(MatchKind::Standard)
                    .build(&patterns)?,
            )
        };

        Ok(Self {
            automaton,
            patterns,
            fingerprint,
        })
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if any trigger matches; stops at the first one.
    pub fn has_match(&self, text: &str) -> bool {
        let Some(ac) = &self.automaton else {
            return false;
        };
        let haystack = fold(text);
        ac.find_overlapping_iter(haystack.as_ref())
            .any(|m| is_whole_word(&haystack, m.start(), m.end()))
    }

    /// Every whole-word occurrence, by start offset then longest pattern first.
    pub fn find_matches(&self, text: &str) -> Vec<Match> {
        let Some(ac) = &self.automaton else {
            return Vec::new();
        };
        let haystack = fold(text);
        let mut matches: Vec<Match> = ac
            .find_overlapping_iter(haystack.as_ref())
            .filter(|m| is_whole_word(&haystack, m.start(), m.end()))
            .map(|m| Match {
                pattern: self.patterns[m.pattern().as_usize()].clone(),
                start: m.start(),
                end: m.end(),
            })
            .collect();

        matches.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| (b.end - b.start).cmp(&(a.end - a.start)))
        });
        matches
    }

    /// First match in `find_matches` order.
    pub fn first_match(&self, text: &str) -> Option<Match> {
        self.find_matches(text).into_iter().next()
    }
}

fn normalize<I, S>(triggers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut patterns: Vec<String> = triggers
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    patterns.sort();
    patterns.dedup();
    patterns
}

/// Fingerprint of a trigger list, independent of order and case.
pub fn fingerprint<I, S>(triggers: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fingerprint_sorted(&normalize(triggers))
}

fn fingerprint_sorted(patterns: &[String]) -> u64 {
    let mut hasher = DefaultHasher::new();
    patterns.hash(&mut hasher);
    hasher.finish()
}

fn fold(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.to_lowercase())
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    if before.is_some_and(|c| !c.is_ascii_whitespace()) {
        return false;
    }

    // `\b` after the match: word-ness must change between the last matched
    // char and the next char (end of text counts as non-word).
    let last = text[start..end].chars().next_back();
    let next = text[end..].chars().next();
    last.is_some_and(is_word_char) != next.is_some_and(is_word_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(triggers: &[&str]) -> Matcher {
        Matcher::new(triggers).unwrap()
    }

    #[test]
    fn test_case_insensitive_whole_word() {
        let m = matcher(&["spam", "scam"]);
        assert!(m.has_match("Check this SCAM offer"));
        assert_eq!(
            m.find_matches("Check this SCAM offer"),
            vec![Match { pattern: "scam".to_string(), start: 11, end: 15 }]
        );
    }

    #[test]
    fn test_requires_whitespace_or_start_before() {
        let m = matcher(&["spam"]);
        assert!(m.has_match("spam at start"));
        assert!(!m.has_match("antispam"));
        assert!(!m.has_match("#spam"));
        assert!(m.has_match("line\nspam"));
    }

    #[test]
    fn test_requires_word_boundary_after() {
        let m = matcher(&["foo"]);
        assert!(!m.has_match("foobar"));
        assert!(!m.has_match("foo_bar"));
        assert!(m.has_match("foo-bar"));
        assert!(m.has_match("foo!"));
        assert!(m.has_match("foo"));
    }

    #[test]
    fn test_non_ascii_letters_are_not_word_chars() {
        // Only ASCII counts as \w, so the accented letter ends the word.
        let m = matcher(&["caf"]);
        assert!(m.has_match("un café"));

        // A trigger ending in a non-word char needs a word char after it.
        let m = matcher(&["привет"]);
        assert!(!m.has_match("привет"));
        assert!(m.has_match("привет1"));
    }

    #[test]
    fn test_ordering_by_offset_then_length() {
        let m = matcher(&["new", "new york", "york"]);
        let found = m.find_matches("i love new york");
        let patterns: Vec<&str> = found.iter().map(|m| m.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["new york", "new", "york"]);
        assert_eq!(found[0].start, 7);
        assert_eq!(found[1].start, 7);
        assert_eq!(found[2].start, 11);
    }

    #[test]
    fn test_every_occurrence_is_reported() {
        let m = matcher(&["ab"]);
        let starts: Vec<usize> = m.find_matches("ab x ab ab").iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![0, 5, 8]);
    }

    #[test]
    fn test_matches_agree_with_naive_scan() {
        let triggers = ["a", "ab", "b c", "c", "cab"];
        let m = matcher(&triggers);
        let text = "a ab b c cab ab_ c! a";

        let mut expected = Vec::new();
        for t in triggers {
            for (start, _) in text.match_indices(t) {
                if is_whole_word(text, start, start + t.len()) {
                    expected.push((start, t.len()));
                }
            }
        }
        expected.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let got: Vec<(usize, usize)> = m
            .find_matches(text)
            .iter()
            .map(|m| (m.start, m.end - m.start))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_fingerprint_ignores_order_and_case() {
        assert_eq!(fingerprint(["Foo", "bar"]), fingerprint(["bar", "foo"]));
        assert_ne!(fingerprint(["foo"]), fingerprint(["foo", "bar"]));
        assert_eq!(matcher(&["foo"]).fingerprint(), fingerprint(["FOO"]));
    }

    #[test]
    fn test_empty_matcher() {
        let m = matcher(&[]);
        assert!(m.is_empty());
        assert!(!m.has_match("anything"));
        assert!(m.find_matches("anything").is_empty());
    }
}
