//! Transcript text cleanup.
//!
//! Transcripts arrive with link spam, hard line breaks, and arbitrary length.
//! [`sanitize`] runs a fixed sequence of passes, each `&str -> String`.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of sanitized text, in characters.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Strip URLs, collapse whitespace, and cap the length of raw transcript text.
pub fn sanitize(raw: &str) -> String {
    let mut result = strip_urls(raw);
    result = collapse_whitespace(&result);
    result = truncate_chars(&result, MAX_TEXT_CHARS);
    result
}

// ---------------------------------------------------------------------------
// Pass 1: Remove URLs
// ---------------------------------------------------------------------------

fn strip_urls(text: &str) -> String {
    static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"https?://\S+|www\.\S+").expect("valid regex")
    });

    URL_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Collapse whitespace
// ---------------------------------------------------------------------------

/// Any run of whitespace (newlines included) becomes one space; ends trimmed.
fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Truncate
// ---------------------------------------------------------------------------

/// Keep at most `max` characters. A space left dangling by the cut is dropped.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_http_and_https_urls() {
        let out = sanitize("see https://x.com/y and http://a.b/c?d=1 now");
        assert_eq!(out, "see and now");
    }

    #[test]
    fn strips_bare_www() {
        let out = sanitize("visit www.shop.example/deal today");
        assert_eq!(out, "visit today");
    }

    #[test]
    fn collapses_whitespace_and_newlines() {
        assert_eq!(sanitize("  multiple   spaces  "), "multiple spaces");
        assert_eq!(sanitize("line one\n\n\tline two\r\n"), "line one line two");
    }

    #[test]
    fn url_removal_then_collapse() {
        let out = sanitize("... sustainable fashion is huge https://x.com/y ...");
        assert_eq!(out, "... sustainable fashion is huge ...");
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize(" \n\t "), "");
        assert_eq!(sanitize("https://only.a/link"), "");
    }

    #[test]
    fn truncates_to_limit() {
        let long = "a".repeat(2500);
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn truncation_respects_multibyte_chars() {
        let long = "é".repeat(1200);
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), MAX_TEXT_CHARS);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn truncation_drops_dangling_space() {
        let mut raw = "b".repeat(MAX_TEXT_CHARS - 1);
        raw.push_str(" tail words here");
        let out = sanitize(&raw);
        assert_eq!(out, "b".repeat(MAX_TEXT_CHARS - 1));
        assert_eq!(sanitize(&out), out);
    }

    #[test]
    fn output_never_contains_url_and_is_bounded() {
        let long = "word https://z.io/q ".repeat(200);
        let samples = [
            "plain text",
            "mix https://a.io/x www.b.io/y text",
            "https://a.io/1https://a.io/2",
            "  www.example.com  \n  trailing",
            long.as_str(),
        ];
        for s in samples {
            let out = sanitize(s);
            assert!(!out.contains("http://"), "{out}");
            assert!(!out.contains("https://"), "{out}");
            assert!(!out.contains("www."), "{out}");
            assert!(out.chars().count() <= MAX_TEXT_CHARS);
        }
    }

    #[test]
    fn sanitize_is_idempotent() {
        let spaced = "z ".repeat(700);
        let samples = [
            "  hello   world  ",
            "creators love https://tiktok.com/@x thrift hauls",
            "tabs\tand\nnewlines",
            spaced.as_str(),
        ];
        for s in samples {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once);
        }
    }
}
