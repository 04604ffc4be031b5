//! Pattern matcher and compiled rules
//!
//! This module defines the stateless pattern matcher and the compiled
//! form of a grammar rule (a "Contain").

use fancy_regex::Regex;
use tracing::warn;

use super::tokens::{KeywordCategory, KeywordTable};

/// Null-width pattern that matches at every position
pub const ALWAYS_MATCH: &str = r"\B|\b";

/// Default lexeme pattern used to split text into candidate keywords
pub const DEFAULT_LEXEMES: &str = "[a-zA-Z][a-zA-Z0-9_]*";

/// A compiled regular expression
///
/// Every pattern is compiled in multi-line mode and case-insensitive
/// when its language is. The matcher keeps no search state; callers pass
/// the offset explicitly.
#[derive(Debug, Clone)]
pub struct Matcher {
    /// Pattern as written in the grammar
    source: String,
    regex: Regex,
}

impl Matcher {
    /// Compile a pattern
    ///
    /// Flags are set as a prefix, not a group, so a pattern with an
    /// unbalanced `)` fails here instead of closing the wrapper.
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self, fancy_regex::Error> {
        let flags = if case_sensitive { "m" } else { "mi" };
        let regex = Regex::new(&format!("(?{flags}){pattern}"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Pattern as written in the grammar
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Find the first match at or after `start` (byte offsets)
    pub fn find_at(&self, text: &str, start: usize) -> Option<(usize, usize)> {
        if start > text.len() {
            return None;
        }
        match self.regex.find_from_pos(text, start) {
            Ok(found) => found.map(|m| (m.start(), m.end())),
            Err(err) => {
                warn!(pattern = %self.source, "pattern search failed: {}", err);
                None
            }
        }
    }

    /// Test whether the pattern matches anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        match self.regex.is_match(text) {
            Ok(matched) => matched,
            Err(err) => {
                warn!(pattern = %self.source, "pattern test failed: {}", err);
                false
            }
        }
    }
}

/// Join patterns into one alternation, preserving order
///
/// Members must already compile on their own. Returns None when there is
/// nothing to join.
pub fn join_alternation<'a, I>(patterns: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let joined: Vec<String> = patterns
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|p| format!("(?:{p})"))
        .collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join("|"))
    }
}

/// Begin pattern synthesized from a rule's keyword list
pub fn keyword_begin_pattern(words: &[String]) -> Option<String> {
    if words.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    Some(format!(r"\b(?:{})\s", alternatives.join("|")))
}

/// Stable index of a rule inside its language's rule arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) usize);

/// Behaviour flags of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleFlags {
    /// Wrap the rule's text in a span named after the rule
    pub show_name: bool,
    /// End matching chains to the enclosing rule
    pub ends_with_parent: bool,
    /// Begin pattern is synthesized from the keyword list
    pub begin_with_keyword: bool,
    /// Begin delimiter is emitted outside the span
    pub exclude_begin: bool,
    /// End delimiter is emitted outside the span
    pub exclude_end: bool,
    /// Begin delimiter is not consumed and gets re-scanned
    pub return_begin: bool,
    /// End delimiter is not consumed and gets re-scanned
    pub return_end: bool,
    /// Keyword lookup falls back to the language table
    pub ref_language_keywords: bool,
    /// The language's top-level rules may start inside this rule
    pub ref_language_contains: bool,
}

impl Default for RuleFlags {
    fn default() -> Self {
        Self {
            show_name: true,
            ends_with_parent: false,
            begin_with_keyword: false,
            exclude_begin: false,
            exclude_end: false,
            return_begin: false,
            return_end: false,
            ref_language_keywords: false,
            ref_language_contains: false,
        }
    }
}

/// Keyword classification settings of a rule
#[derive(Debug, Clone)]
pub struct KeywordScope {
    pub table: KeywordTable,
    /// Tokenizer for classification; None when nothing can match
    pub lexemes: Option<Matcher>,
}

/// How the text captured by a rule is rendered
#[derive(Debug, Clone)]
pub enum RuleContent {
    /// Classify words against keyword tables
    Keywords(KeywordScope),
    /// Delegate to another language, resolved at highlight time
    SubLanguage(String),
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    /// Full name as declared, used for references
    pub name: String,
    /// Span class (the name up to the first `|`)
    pub class_name: String,
    pub flags: RuleFlags,
    /// Weight added to the session relevance when entered
    pub relevance: i32,
    /// None when the rule can only be reached as a continuation
    pub begin: Option<Matcher>,
    /// None when the rule only ends through its parent
    pub end: Option<Matcher>,
    /// End alternation including chained ancestors
    pub terminator_end: String,
    /// Everything that can open or close a scope while this rule is active
    pub terminators: Option<Matcher>,
    /// Child rules in priority order
    pub children: Vec<RuleId>,
    pub content: RuleContent,
    /// Static parent, None at top level
    pub parent: Option<RuleId>,
    /// Rule entered right after this one ends
    pub starts: Option<RuleId>,
    /// Owner when this rule is a continuation
    pub continuation_of: Option<RuleId>,
    /// Only reachable by reference, never a top-level candidate
    pub reference: bool,
}

impl Rule {
    /// Whether a matched lexeme opens this rule
    pub fn begins(&self, lexeme: &str) -> bool {
        self.begin.as_ref().is_some_and(|m| m.is_match(lexeme))
    }

    /// Whether a matched lexeme closes this rule
    pub fn ends(&self, lexeme: &str) -> bool {
        self.end.as_ref().is_some_and(|m| m.is_match(lexeme))
    }

    pub fn sub_language(&self) -> Option<&str> {
        match &self.content {
            RuleContent::SubLanguage(name) => Some(name),
            RuleContent::Keywords(_) => None,
        }
    }

    /// Category of a word in this rule's own table
    pub fn keyword(&self, word: &str) -> Option<KeywordCategory> {
        match &self.content {
            RuleContent::Keywords(scope) => scope.table.lookup(word),
            RuleContent::SubLanguage(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_at_uses_explicit_offset() {
        let m = Matcher::new(r"\d+", true).unwrap();
        assert_eq!(m.find_at("abc 123 def", 0), Some((4, 7)));
        assert_eq!(m.find_at("abc 123 def", 5), Some((5, 7)));
        assert_eq!(m.find_at("abc 123 def", 7), None);
        assert_eq!(m.find_at("abc", 10), None);
    }

    #[test]
    fn test_word_boundary_sees_preceding_text() {
        let m = Matcher::new(r"\bif\b", true).unwrap();
        // "if" inside "elif" is not at a word boundary even when
        // the search starts in the middle of the word
        assert_eq!(m.find_at("elif", 2), None);
        assert_eq!(m.find_at("x if", 1), Some((2, 4)));
    }

    #[test]
    fn test_case_insensitive() {
        let m = Matcher::new("select", false).unwrap();
        assert!(m.is_match("SELECT *"));
        let strict = Matcher::new("select", true).unwrap();
        assert!(!strict.is_match("SELECT *"));
    }

    #[test]
    fn test_multiline_anchors() {
        let m = Matcher::new(r"^#.*$", true).unwrap();
        assert_eq!(m.find_at("a\n# c\nb", 0), Some((2, 5)));
    }

    #[test]
    fn test_lookaround() {
        let m = Matcher::new(r"(?<=\$)\w+(?=\()", true).unwrap();
        assert_eq!(m.find_at("$foo(1)", 0), Some((1, 4)));
        assert!(!m.is_match("foo(1)"));
    }

    #[test]
    fn test_always_match_is_null_width() {
        let m = Matcher::new(ALWAYS_MATCH, true).unwrap();
        assert_eq!(m.find_at("abc", 1), Some((1, 1)));
        assert_eq!(m.find_at("", 0), Some((0, 0)));
        assert!(m.is_match("\""));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Matcher::new("(unclosed", true).is_err());
    }

    #[test]
    fn test_unbalanced_close_rejected() {
        assert!(Matcher::new("a)(b", true).is_err());
        assert!(Matcher::new("x)|(y", false).is_err());
        assert!(Matcher::new("a|b", false).unwrap().is_match("B"));
    }

    #[test]
    fn test_join_alternation() {
        assert_eq!(join_alternation(["a", "", "b|c"]), Some("(?:a)|(?:b|c)".to_string()));
        assert_eq!(join_alternation(Vec::<&str>::new()), None);
        assert_eq!(join_alternation([""]), None);
    }

    #[test]
    fn test_keyword_begin_pattern_escapes() {
        let words = vec!["c++".to_string(), "def".to_string()];
        let pattern = keyword_begin_pattern(&words).unwrap();
        let m = Matcher::new(&pattern, true).unwrap();
        assert!(m.is_match("def "));
        assert!(!m.is_match("define "));
        assert_eq!(keyword_begin_pattern(&[]), None);
    }
}
