//! Property-based tests for the highlighting engine
//!
//! Whatever the input, highlighting must:
//! - produce balanced, properly nested spans
//! - keep every input character, in order, once markup is removed
//! - be deterministic

use std::path::PathBuf;
use std::sync::OnceLock;

use hilite::Registry;
use proptest::prelude::*;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("grammars");
        let mut registry = Registry::new();
        registry.load_dir(&dir).unwrap();
        registry
    })
}

/// Remove span markup and decode the three escaped characters
fn strip_markup(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(i) = rest.find('<') {
        text.push_str(&rest[..i]);
        let close = rest[i..].find('>').expect("unterminated tag") + i;
        rest = &rest[close + 1..];
    }
    text.push_str(rest);
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

/// Nesting depth never goes negative and ends at zero
fn is_balanced(html: &str) -> bool {
    let mut depth = 0usize;
    let mut rest = html;
    while let Some(i) = rest.find('<') {
        rest = &rest[i..];
        if rest.starts_with("</span>") {
            if depth == 0 {
                return false;
            }
            depth -= 1;
        } else if rest.starts_with("<span class=\"") {
            depth += 1;
        } else {
            return false;
        }
        rest = &rest[1..];
    }
    depth == 0
}

fn language_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["cpp", "c", "css", "ini", "javascript", "html", "xml", "nope"])
}

/// Text assembled from fragments the bundled grammars react to
fn source_strategy() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        prop::sample::select(vec![
            "<", ">", "</", "/>", "<!--", "-->", "<style>", "</style>", "<script>", "</script>",
            "{", "}", ":", ";", "=", "\"", "'", "`", "\\", "//", "/*", "*/", "#", "[", "]",
            "\n", " ", "\t", "&", "class ", "function ", "if", "return", "on", "0x1F", "42",
        ])
        .prop_map(str::to_string),
        "[a-zA-Z_]{1,8}",
        "\\PC{1,4}",
    ];
    prop::collection::vec(fragment, 0..40).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn test_spans_balance(language in language_strategy(), source in source_strategy()) {
        let html = registry().highlight(language, &source);
        prop_assert!(is_balanced(&html), "unbalanced output: {}", html);
    }

    #[test]
    fn test_text_preserved(language in language_strategy(), source in source_strategy()) {
        let html = registry().highlight(language, &source);
        prop_assert_eq!(strip_markup(&html), source);
    }

    #[test]
    fn test_arbitrary_text_preserved(language in language_strategy(), source in "\\PC{0,200}") {
        let html = registry().highlight(language, &source);
        prop_assert!(is_balanced(&html));
        prop_assert_eq!(strip_markup(&html), source);
    }

    #[test]
    fn test_deterministic(language in language_strategy(), source in source_strategy()) {
        let first = registry().highlight_detailed(language, &source);
        let second = registry().highlight_detailed(language, &source);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_language_only_escapes(source in "\\PC{0,100}") {
        let html = registry().highlight("nope", &source);
        prop_assert!(!html.contains("<span"));
        prop_assert_eq!(strip_markup(&html), source);
    }
}
