//! Text helpers shared by the blog and search layers.

use std::fmt::Write as _;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use uuid::Uuid;

/// Reading speed used for [`reading_time`].
const WORDS_PER_MINUTE: usize = 200;

/// Opening tag wrapped around highlighted matches.
pub const HIGHLIGHT_OPEN: &str = r#"<mark class="search-highlight">"#;

/// Closing tag wrapped around highlighted matches.
pub const HIGHLIGHT_CLOSE: &str = "</mark>";

/// Derive a URL slug from a title.
///
/// Lowercases, strips diacritics, collapses every run of characters outside
/// `[a-z0-9]` into a single `-` and trims dashes from both ends.
///
/// ```
/// assert_eq!(bujadevil::text::generate_slug("Écrire du Rust, vite !"), "ecrire-du-rust-vite");
/// ```
#[must_use]
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Estimated reading time in whole minutes, never less than one.
#[must_use]
pub fn reading_time(content: &str) -> u32 {
    let words = content.split_whitespace().count().max(1);
    u32::try_from(words.div_ceil(WORDS_PER_MINUTE)).unwrap_or(u32::MAX)
}

/// Shorten `text` to at most `max_chars` characters, adding an ellipsis.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head.trim_end())
}

/// Wrap every case-insensitive occurrence of `term` in `<mark>` tags.
///
/// The term is matched literally; regex metacharacters have no effect.
#[must_use]
pub fn highlight(text: &str, term: &str) -> String {
    if term.is_empty() {
        return text.to_string();
    }
    match Regex::new(&format!("(?i){}", regex::escape(term))) {
        Ok(re) => re
            .replace_all(text, format!("{HIGHLIGHT_OPEN}$0{HIGHLIGHT_CLOSE}").as_str())
            .into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Case-insensitive substring test. `needle` must already be lowercase.
#[must_use]
pub fn contains_lower(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Loose email shape check: `something@something.something`, no spaces.
///
/// # Panics
///
/// Panics if the built-in pattern fails to compile.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email pattern"))
        .is_match(email)
}

/// Generate a record identifier such as `id_3f9a1c2b7_lx2k9q1m`.
///
/// A random part keeps ids unique; the base-36 millisecond suffix keeps them
/// roughly sortable by creation time.
#[must_use]
pub fn generate_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    format!("id_{}_{}", &random[..9], to_base36(millis))
}

/// Generate an opaque session token.
#[must_use]
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Percent-encode a URL component the way browsers' `encodeURIComponent` does.
#[must_use]
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

/// Page metadata returned next to a slice of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number that was requested.
    pub current: usize,
    /// Number of pages.
    pub total: usize,
    /// There is a page after this one.
    pub has_next: bool,
    /// There is a page before this one.
    pub has_prev: bool,
    /// Number of items across all pages.
    pub total_count: usize,
}

/// Cut one page out of `items`.
///
/// `page` is 1-based; `page` and `limit` below 1 are treated as 1. A page
/// past the end yields no items.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> (Vec<T>, Pagination) {
    let page = page.max(1);
    let limit = limit.max(1);
    let total_count = items.len();
    let start = (page - 1).saturating_mul(limit);
    let end = start.saturating_add(limit);

    let slice = items.into_iter().skip(start).take(limit).collect();
    let pagination = Pagination {
        current: page,
        total: total_count.div_ceil(limit),
        has_next: end < total_count,
        has_prev: page > 1,
        total_count,
    };
    (slice, pagination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_slug_basic() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(
            generate_slug("Bienvenue sur BujaDevil"),
            "bienvenue-sur-bujadevil"
        );
    }

    #[test]
    fn test_generate_slug_accents_and_punctuation() {
        assert_eq!(
            generate_slug("Découverte: Une app qui change la productivité"),
            "decouverte-une-app-qui-change-la-productivite"
        );
        assert_eq!(generate_slug("  --Next.js 14!!  "), "next-js-14");
    }

    #[test]
    fn test_generate_slug_empty_when_no_alphanumerics() {
        assert_eq!(generate_slug("!!! ???"), "");
        assert_eq!(generate_slug(""), "");
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time("one two three"), 1);
        let long = "word ".repeat(401);
        assert_eq!(reading_time(&long), 3);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("hello world again", 6), "hello...");
        assert_eq!(truncate("éééé", 2), "éé...");
    }

    #[test]
    fn test_highlight_case_insensitive() {
        assert_eq!(
            highlight("Rust and rust", "RUST"),
            r#"<mark class="search-highlight">Rust</mark> and <mark class="search-highlight">rust</mark>"#
        );
    }

    #[test]
    fn test_highlight_escapes_metacharacters() {
        assert_eq!(
            highlight("c++ (fast)", "c++"),
            r#"<mark class="search-highlight">c++</mark> (fast)"#
        );
        assert_eq!(highlight("anything", ""), "anything");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_generate_id_shape_and_uniqueness() {
        let a = generate_id();
        let b = generate_id();
        assert!(a.starts_with("id_"));
        assert_eq!(a.split('_').count(), 3);
        assert_ne!(a, b);
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("Josué Raoult"), "Josu%C3%A9%20Raoult");
        assert_eq!(encode_uri_component("a&b=c"), "a%26b%3Dc");
        assert_eq!(encode_uri_component("it's (ok)"), "it's%20(ok)");
    }

    #[test]
    fn test_paginate() {
        let (page, info) = paginate((1..=25).collect::<Vec<_>>(), 2, 10);
        assert_eq!(page, (11..=20).collect::<Vec<_>>());
        assert_eq!(info.total, 3);
        assert!(info.has_next);
        assert!(info.has_prev);
        assert_eq!(info.total_count, 25);

        let (last, info) = paginate((1..=25).collect::<Vec<_>>(), 3, 10);
        assert_eq!(last.len(), 5);
        assert!(!info.has_next);
    }

    #[test]
    fn test_paginate_out_of_range_and_zero() {
        let (page, info) = paginate(vec![1, 2, 3], 9, 2);
        assert!(page.is_empty());
        assert!(!info.has_next);

        let (page, info) = paginate(vec![1, 2, 3], 0, 0);
        assert_eq!(page, vec![1]);
        assert_eq!(info.current, 1);
    }

    #[test]
    fn test_contains_lower() {
        assert!(contains_lower("Hello World", "world"));
        assert!(!contains_lower("Hello", "bye"));
    }
}
