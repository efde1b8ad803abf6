// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Placeholder resolution for finished replies.
//!
//! The server replaces URLs in generated text with opaque tokens such as
//! `__URL_0__` and sends the token table separately. The matcher is built
//! from the table's own keys and applied in a single pass, so URL values are
//! never rescanned and every key is honoured regardless of what surrounds it.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use smartrag_core::UrlMapping;
use tracing::{debug, warn};

/// `__` + alphanumeric segments joined by single underscores + `__`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__[A-Za-z0-9]+(?:_[A-Za-z0-9]+)*__").expect("placeholder pattern is valid")
});

/// Replaces every occurrence of every mapping key in `text` with its URL.
///
/// Where keys overlap at the same position the longest key wins. Tokens
/// without a mapping entry stay verbatim.
pub fn resolve_placeholders(text: &str, mapping: &UrlMapping) -> String {
    let mut keys: Vec<&str> = mapping
        .keys()
        .map(String::as_str)
        .filter(|key| !key.is_empty())
        .collect();
    if keys.is_empty() {
        return text.to_string();
    }
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let pattern = keys
        .iter()
        .map(|key| regex::escape(key))
        .collect::<Vec<_>>()
        .join("|");

    let resolved = match Regex::new(&pattern) {
        Ok(matcher) => matcher
            .replace_all(text, |caps: &Captures<'_>| {
                mapping.get(&caps[0]).cloned().unwrap_or_default()
            })
            .into_owned(),
        Err(err) => {
            warn!(error = %err, keys = keys.len(), "url mapping too large for one pass, replacing keys in turn");
            keys.iter().fold(text.to_string(), |acc, key| {
                acc.replace(*key, mapping.get(*key).map(String::as_str).unwrap_or_default())
            })
        }
    };

    for token in PLACEHOLDER.find_iter(text).map(|m| m.as_str()) {
        if !mapping.contains_key(token) {
            debug!(token, "placeholder has no mapping entry, leaving it verbatim");
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> UrlMapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let table = mapping(&[("__U0__", "https://x.test")]);
        assert_eq!(
            resolve_placeholders("see __U0__ now, again __U0__", &table),
            "see https://x.test now, again https://x.test"
        );
    }

    #[test]
    fn multiple_tokens_with_underscores() {
        let table = mapping(&[
            ("__URL_0__", "https://a.test"),
            ("__URL_1__", "https://b.test"),
        ]);
        assert_eq!(
            resolve_placeholders("[a](__URL_0__) [b](__URL_1__)", &table),
            "[a](https://a.test) [b](https://b.test)"
        );
    }

    #[test]
    fn adjacent_tokens_are_separate() {
        let table = mapping(&[("__A__", "1"), ("__B__", "2")]);
        assert_eq!(resolve_placeholders("__A____B__", &table), "12");
    }

    #[test]
    fn unmapped_token_is_left_verbatim() {
        let table = mapping(&[("__URL_0__", "https://a.test")]);
        assert_eq!(
            resolve_placeholders("__URL_0__ and __URL_9__", &table),
            "https://a.test and __URL_9__"
        );
    }

    #[test]
    fn empty_mapping_leaves_text_untouched() {
        let text = "nothing __URL_0__ to do";
        assert_eq!(resolve_placeholders(text, &UrlMapping::new()), text);
    }

    #[test]
    fn urls_with_regex_metacharacters_are_inserted_literally() {
        let table = mapping(&[("__URL_0__", "https://x.test/a?b=$1&c=(d)")]);
        assert_eq!(
            resolve_placeholders("go __URL_0__", &table),
            "go https://x.test/a?b=$1&c=(d)"
        );
    }

    #[test]
    fn replaced_urls_are_not_rescanned() {
        let table = mapping(&[("__A__", "__B__"), ("__B__", "https://b.test")]);
        assert_eq!(resolve_placeholders("__A__", &table), "__B__");
    }

    #[test]
    fn non_grammar_keys_are_replaced_literally() {
        let table = mapping(&[("{{link}}", "https://c.test"), ("__URL_0__", "https://a.test")]);
        assert_eq!(
            resolve_placeholders("{{link}} / __URL_0__", &table),
            "https://c.test / https://a.test"
        );
    }

    #[test]
    fn mapped_token_after_unmapped_underscores_is_replaced() {
        let table = mapping(&[("__URL_0__", "https://a.test")]);
        assert_eq!(
            resolve_placeholders("call __init__URL_0__ and __bold__ __URL_0__", &table),
            "call __inithttps://a.test and __bold__ https://a.test"
        );
    }

    #[test]
    fn longest_key_wins_at_same_position() {
        let table = mapping(&[("__URL_1__", "short"), ("__URL_1__x", "long")]);
        assert_eq!(resolve_placeholders("__URL_1__x __URL_1__", &table), "long short");
    }

    #[test]
    #[tracing_test::traced_test]
    fn unmapped_tokens_are_logged() {
        let table = mapping(&[("__URL_0__", "https://a.test")]);
        resolve_placeholders("__URL_0__ __URL__0__ __URL_7__", &table);
        assert!(logs_contain("placeholder has no mapping entry"));
        assert!(logs_contain("__URL_7__"));
    }
}
