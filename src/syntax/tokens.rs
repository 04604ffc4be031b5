//! Keyword categories and keyword tables
//!
//! This module defines the fixed set of keyword categories a grammar
//! can declare and the lookup tables built from them.

use std::collections::HashMap;

/// Semantic category of a keyword entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// Reserved words (if, while, return)
    Keyword,
    /// Literal values (true, false, null)
    Literal,
    /// Named constants
    Constant,
    /// Type names
    Type,
    /// Shell-style commands
    Command,
    /// Properties (CSS properties, attribute names)
    Property,
    /// Built-in functions and objects
    BuiltIn,
    /// Titles (function or section names)
    Title,
}

impl KeywordCategory {
    /// CSS class emitted around a keyword of this category
    pub fn class_name(&self) -> &'static str {
        match self {
            KeywordCategory::Keyword => "keyword",
            KeywordCategory::Literal => "literal",
            KeywordCategory::Constant => "constant",
            KeywordCategory::Type => "type",
            KeywordCategory::Command => "command",
            KeywordCategory::Property => "property",
            KeywordCategory::BuiltIn => "built_in",
            KeywordCategory::Title => "title",
        }
    }

    /// Parse a category from its grammar element name (`<BuiltIn>` etc.)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Keyword" => Some(KeywordCategory::Keyword),
            "Literal" => Some(KeywordCategory::Literal),
            "Constant" => Some(KeywordCategory::Constant),
            "Type" => Some(KeywordCategory::Type),
            "Command" => Some(KeywordCategory::Command),
            "Property" => Some(KeywordCategory::Property),
            "BuiltIn" => Some(KeywordCategory::BuiltIn),
            "Title" => Some(KeywordCategory::Title),
            _ => None,
        }
    }
}

/// A keyword lookup table
///
/// Case-insensitive tables fold their entries at build time and the
/// candidate word at lookup time. The first declaration of a word wins.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    case_sensitive: bool,
    entries: HashMap<String, KeywordCategory>,
    /// Words in declaration order, as written
    words: Vec<String>,
}

impl KeywordTable {
    pub fn new<'a, I>(entries: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = &'a (KeywordCategory, String)>,
    {
        let mut table = Self {
            case_sensitive,
            entries: HashMap::new(),
            words: Vec::new(),
        };
        for (category, word) in entries {
            table.words.push(word.clone());
            table.entries.entry(table.fold(word)).or_insert(*category);
        }
        table
    }

    fn fold(&self, word: &str) -> String {
        if self.case_sensitive {
            word.to_string()
        } else {
            word.to_lowercase()
        }
    }

    /// Look up the category of a word
    pub fn lookup(&self, word: &str) -> Option<KeywordCategory> {
        if self.case_sensitive {
            self.entries.get(word).copied()
        } else {
            self.entries.get(&word.to_lowercase()).copied()
        }
    }

    /// Declared words, in declaration order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
