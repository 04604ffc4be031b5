//! Compiled language definitions
//!
//! A [`Language`] owns its rules in a dense arena; rules refer to each
//! other (children, parent, continuation) through [`RuleId`] indices.

use super::rules::{Matcher, Rule, RuleId};
use super::tokens::{KeywordCategory, KeywordTable};

/// A compiled grammar for one source language
#[derive(Debug, Clone)]
pub struct Language {
    pub(crate) name: String,
    pub(crate) keywords: KeywordTable,
    /// Word tokenizer for language-level keywords
    pub(crate) lexemes: Option<Matcher>,
    /// Union of the top-level begin patterns and the illegal pattern
    pub(crate) terminators: Option<Matcher>,
    /// Non-reference rules in declaration order
    pub(crate) top_level: Vec<RuleId>,
    pub(crate) rules: Vec<Rule>,
}

impl Language {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keyword(&self, word: &str) -> Option<KeywordCategory> {
        self.keywords.lookup(word)
    }

    pub fn lexemes(&self) -> Option<&Matcher> {
        self.lexemes.as_ref()
    }

    pub fn terminators(&self) -> Option<&Matcher> {
        self.terminators.as_ref()
    }

    /// Get a rule by id
    ///
    /// Ids are only ever handed out by this language, so they are
    /// always in range.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Find the first rule declared with this full name
    pub fn find_rule(&self, name: &str) -> Option<RuleId> {
        self.rules.iter().position(|r| r.name == name).map(RuleId)
    }

    /// Rules that can start at top level, in priority order
    pub fn top_level(&self) -> &[RuleId] {
        &self.top_level
    }

    /// First top-level rule whose begin pattern accepts the lexeme
    pub fn find_top_level(&self, lexeme: &str) -> Option<RuleId> {
        self.top_level
            .iter()
            .copied()
            .find(|&id| self.rule(id).begins(lexeme))
    }

    /// First rule that can be entered from inside `parent`
    ///
    /// Children win over the language's top-level rules.
    pub fn find_child(&self, parent: RuleId, lexeme: &str) -> Option<RuleId> {
        let rule = self.rule(parent);
        rule.children
            .iter()
            .copied()
            .find(|&id| self.rule(id).begins(lexeme))
            .or_else(|| {
                if rule.flags.ref_language_contains {
                    self.find_top_level(lexeme)
                } else {
                    None
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::compiler::compile;
    use crate::syntax::grammar::{GrammarDef, RuleDef};
    use crate::syntax::tokens::KeywordCategory;

    fn sample() -> super::Language {
        let grammar = GrammarDef::new("test")
            .keyword(KeywordCategory::Keyword, "if")
            .rule(RuleDef::new("escape").begin(r"\\."))
            .rule(RuleDef::new("string").begin("\"").end("\"").contains("escape"))
            .rule(RuleDef::new("number").begin(r"\d+"));
        compile(&grammar).unwrap()
    }

    #[test]
    fn test_top_level_excludes_references() {
        let lang = sample();
        let names: Vec<&str> = lang
            .top_level()
            .iter()
            .map(|&id| lang.rule(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["string", "number"]);
    }

    #[test]
    fn test_find_top_level_in_declaration_order() {
        let lang = sample();
        assert_eq!(lang.find_top_level("\""), lang.find_rule("string"));
        assert_eq!(lang.find_top_level("42"), lang.find_rule("number"));
        // References are not top-level candidates
        assert_eq!(lang.find_top_level("\\n"), None);
    }

    #[test]
    fn test_find_child() {
        let lang = sample();
        let string = lang.find_rule("string").unwrap();
        assert_eq!(lang.find_child(string, "\\n"), lang.find_rule("escape"));
        assert_eq!(lang.find_child(string, "42"), None);
    }

    #[test]
    fn test_language_keywords() {
        let lang = sample();
        assert_eq!(lang.keyword("if"), Some(KeywordCategory::Keyword));
        assert!(lang.lexemes().is_some());
        assert_eq!(lang.rule_count(), 3);
    }
}
