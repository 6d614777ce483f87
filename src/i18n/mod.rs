//! Internationalization (i18n) module.
//!
//! Every user-visible string goes through here. Translations are embedded at
//! compile time with `include_str!` and parsed once on first use.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::warn;

/// Global translation store: LangCode -> nested key tree.
static TRANSLATIONS: Lazy<HashMap<&'static str, Value>> = Lazy::new(|| {
    let mut map = HashMap::new();

    match serde_json::from_str(include_str!("en.json")) {
        Ok(val) => {
            map.insert("en", val);
        }
        Err(e) => warn!("Failed to parse en.json: {}", e),
    }

    map
});

/// Get text for a key in a specific language.
/// Supports nested keys via dot notation, e.g., "antiflood.muted".
/// Falls back to English, then to the key itself.
pub fn get_text(lang: &str, key: &str) -> String {
    if let Some(text) = TRANSLATIONS.get(lang).and_then(|val| resolve_key(val, key)) {
        return text;
    }

    if lang != "en" {
        if let Some(text) = TRANSLATIONS.get("en").and_then(|val| resolve_key(val, key)) {
            return text;
        }
    }

    key.to_string()
}

/// `get_text` with `{name}` placeholders substituted from `args`.
pub fn get_text_with(lang: &str, key: &str, args: &[(&str, &str)]) -> String {
    let mut text = get_text(lang, key);
    for (name, value) in args {
        text = text.replace(&format!("{{{name}}}"), value);
    }
    text
}

fn resolve_key(val: &Value, key: &str) -> Option<String> {
    let mut current = val;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    current.as_str().map(|s| s.to_string())
}
