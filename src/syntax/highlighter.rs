//! The highlighting engine
//!
//! A [`Highlighter`] runs one [`Session`] per call. The session scans the
//! text with the terminator alternation of the innermost open scope and
//! decides, for every match, whether it opens a child rule, closes an
//! open rule (possibly several, through `EndsWithParent` chains) or is
//! plain text.
//!
//! Text between matches is buffered and classified lazily, when the
//! scope changes: either split into keywords with the scope's lexeme
//! pattern, or handed to another language for sub-language rules.

use tracing::debug;

use super::language::Language;
use super::markup::{escape, escape_into, open_span, wrap_into, CLOSE_SPAN};
use super::registry::Registry;
use super::rules::{Matcher, RuleContent, RuleId};
use super::tokens::KeywordCategory;

/// Deepest allowed chain of sub-language delegations
const MAX_SUB_LANGUAGE_DEPTH: usize = 32;

/// Consecutive steps without progress before a character is forced through
const STALL_LIMIT: usize = 64;

/// Result of highlighting one piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    /// Annotated text
    pub value: String,
    /// Sum of the relevance of every rule entered
    pub relevance: i32,
    /// Canonical name of the language used, None for passthrough
    pub language: Option<String>,
}

/// Highlighting entry point bound to a registry
#[derive(Debug, Clone, Copy)]
pub struct Highlighter<'r> {
    registry: &'r Registry,
}

impl<'r> Highlighter<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Highlight `text` with the language registered as `name`
    ///
    /// Unknown languages produce the escaped text without markup.
    pub fn highlight(&self, name: &str, text: &str) -> Highlight {
        match self.registry.get(name) {
            Some(language) => self.highlight_language(language, text),
            None => {
                debug!(language = name, "unknown language, passing text through");
                Highlight {
                    value: escape(text),
                    relevance: 0,
                    language: None,
                }
            }
        }
    }

    pub fn highlight_language(&self, language: &Language, text: &str) -> Highlight {
        Session::new(self.registry, language, text, 0).run()
    }
}

/// State of a single highlight call
struct Session<'a> {
    registry: &'a Registry,
    language: &'a Language,
    text: &'a str,
    /// Sub-language nesting depth of this session
    depth: usize,
    output: String,
    /// Text seen but not yet classified
    pending: String,
    /// Open rules, innermost last
    stack: Vec<RuleId>,
    relevance: i32,
}

impl<'a> Session<'a> {
    fn new(registry: &'a Registry, language: &'a Language, text: &'a str, depth: usize) -> Self {
        Self {
            registry,
            language,
            text,
            depth,
            output: String::with_capacity(text.len() * 2),
            pending: String::new(),
            stack: Vec::new(),
            relevance: 0,
        }
    }

    fn run(mut self) -> Highlight {
        let text = self.text;
        let mut cursor = 0;
        let mut stalled = 0;

        while let Some((start, end)) = self.terminators().and_then(|t| t.find_at(text, cursor)) {
            self.pending.push_str(&text[cursor..start]);
            let next = start + self.process_lexeme(start, end);

            if next > cursor {
                cursor = next;
                stalled = 0;
                continue;
            }
            stalled += 1;
            if stalled > STALL_LIMIT {
                let Some(ch) = text[cursor..].chars().next() else {
                    break;
                };
                debug!(
                    language = %self.language.name(),
                    offset = cursor,
                    "no progress, consuming one character as text"
                );
                self.pending.push(ch);
                cursor += ch.len_utf8();
                stalled = 0;
            }
        }

        self.pending.push_str(&text[cursor..]);
        self.flush();

        let language = self.language;
        for id in self.stack.drain(..) {
            if language.rule(id).flags.show_name {
                self.output.push_str(CLOSE_SPAN);
            }
        }

        Highlight {
            value: self.output,
            relevance: self.relevance,
            language: Some(language.name().to_string()),
        }
    }

    /// Terminator alternation of the innermost open scope
    fn terminators(&self) -> Option<&'a Matcher> {
        let language = self.language;
        match self.stack.last() {
            Some(&id) => language.rule(id).terminators.as_ref(),
            None => language.terminators(),
        }
    }

    /// Handle the terminator match `start..end`, returning the bytes consumed
    fn process_lexeme(&mut self, start: usize, end: usize) -> usize {
        let language = self.language;
        let text = self.text;
        let lexeme = &text[start..end];

        let entered = match self.stack.last() {
            Some(&top) => language.find_child(top, lexeme),
            None => language.find_top_level(lexeme),
        };
        if let Some(id) = entered {
            self.flush();
            self.enter(id, lexeme);
            return if language.rule(id).flags.return_begin {
                0
            } else {
                lexeme.len()
            };
        }

        if let Some(depth) = self.find_exit(lexeme) {
            let rule = language.rule(self.stack[depth]);
            let flags = rule.flags;
            if !(flags.return_end || flags.exclude_end) {
                self.pending.push_str(lexeme);
            }
            self.flush();
            for id in self.stack.drain(depth..) {
                if language.rule(id).flags.show_name {
                    self.output.push_str(CLOSE_SPAN);
                }
            }
            if flags.exclude_end && !flags.return_end {
                escape_into(&mut self.output, lexeme);
            }
            if let Some(next) = rule.starts {
                self.enter(next, "");
            }
            return if flags.return_end { 0 } else { lexeme.len() };
        }

        // Illegal or otherwise unclaimed match: keep it as text
        self.pending.push_str(lexeme);
        if lexeme.is_empty() {
            let step = text[end..].chars().next().map_or(0, char::len_utf8);
            self.pending.push_str(&text[end..end + step]);
            return step;
        }
        lexeme.len()
    }

    /// Stack depth of the rule closed by `lexeme`
    ///
    /// Walks outwards from the innermost rule for as long as rules end
    /// with their parent.
    fn find_exit(&self, lexeme: &str) -> Option<usize> {
        for (depth, &id) in self.stack.iter().enumerate().rev() {
            let rule = self.language.rule(id);
            if rule.ends(lexeme) {
                return Some(depth);
            }
            if !rule.flags.ends_with_parent {
                return None;
            }
        }
        None
    }

    fn enter(&mut self, id: RuleId, lexeme: &str) {
        let rule = self.language.rule(id);
        let flags = rule.flags;
        if flags.exclude_begin && !flags.return_begin {
            escape_into(&mut self.output, lexeme);
        }
        if flags.show_name {
            open_span(&mut self.output, &rule.class_name);
        }
        if !flags.return_begin && !flags.exclude_begin {
            self.pending.push_str(lexeme);
        }
        self.stack.push(id);
        self.relevance = self.relevance.saturating_add(rule.relevance);
    }

    /// Classify and emit the pending text under the innermost scope
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let buffer = std::mem::take(&mut self.pending);
        let language = self.language;

        let top = self.stack.last().copied();
        let Some(id) = top else {
            classify(&mut self.output, &buffer, language.lexemes(), |word| {
                language.keyword(word)
            });
            return;
        };

        let rule = language.rule(id);
        match &rule.content {
            RuleContent::Keywords(scope) => {
                let fallback = rule.flags.ref_language_keywords;
                classify(&mut self.output, &buffer, scope.lexemes.as_ref(), |word| {
                    rule.keyword(word)
                        .or_else(|| if fallback { language.keyword(word) } else { None })
                });
            }
            RuleContent::SubLanguage(name) => self.delegate(name, &buffer),
        }
    }

    /// Highlight `buffer` with another language and wrap the result
    fn delegate(&mut self, name: &str, buffer: &str) {
        let sub = if self.depth < MAX_SUB_LANGUAGE_DEPTH {
            self.registry.get(name)
        } else {
            debug!(language = name, depth = self.depth, "sub-language nesting too deep");
            None
        };
        let Some(sub) = sub else {
            debug!(language = name, "sub-language unavailable, emitting text");
            escape_into(&mut self.output, buffer);
            return;
        };

        let inner = Session::new(self.registry, sub, buffer, self.depth + 1).run();
        open_span(&mut self.output, name);
        self.output.push_str(&inner.value);
        self.output.push_str(CLOSE_SPAN);
        self.relevance = self.relevance.saturating_add(inner.relevance);
    }
}

/// Emit `text`, wrapping every lexeme that is a keyword
fn classify<F>(out: &mut String, text: &str, lexemes: Option<&Matcher>, lookup: F)
where
    F: Fn(&str) -> Option<KeywordCategory>,
{
    let Some(lexemes) = lexemes else {
        escape_into(out, text);
        return;
    };

    let mut last = 0;
    let mut pos = 0;
    while let Some((start, end)) = lexemes.find_at(text, pos) {
        if start == end {
            match text[start..].chars().next() {
                Some(ch) => {
                    pos = start + ch.len_utf8();
                    continue;
                }
                None => break,
            }
        }
        escape_into(out, &text[last..start]);
        let word = &text[start..end];
        match lookup(word) {
            Some(category) => wrap_into(out, category.class_name(), word),
            None => escape_into(out, word),
        }
        last = end;
        pos = end;
    }
    escape_into(out, &text[last..]);
}
