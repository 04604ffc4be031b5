//! Grammar compiler
//!
//! Turns a [`GrammarDef`] into a [`Language`]: resolves rule references
//! into arena indices, synthesizes default and keyword-derived patterns,
//! chains `EndsWithParent` end patterns and builds the terminator
//! alternation of every scope.
//!
//! Every pattern is compiled here, so a grammar that loads successfully
//! can never fail while highlighting.

use tracing::debug;

use super::grammar::{GrammarDef, RuleDef};
use super::language::Language;
use super::rules::{
    join_alternation, keyword_begin_pattern, KeywordScope, Matcher, Rule, RuleContent, RuleFlags,
    RuleId, ALWAYS_MATCH, DEFAULT_LEXEMES,
};
use super::tokens::KeywordTable;
use crate::error::{HiliteError, Result};

/// Placeholder rule name for language-level patterns in errors
const LANGUAGE_SCOPE: &str = "<language>";

/// Compile a grammar description
pub fn compile(grammar: &GrammarDef) -> Result<Language> {
    let links = Links::resolve(grammar)?;
    let mut compiler = Compiler {
        grammar,
        links,
        terminator_ends: vec![EndState::Pending; grammar.rules.len()],
    };
    compiler.run()
}

/// Rule relationships, resolved to indices
struct Links {
    children: Vec<Vec<usize>>,
    parent: Vec<Option<usize>>,
    reference: Vec<bool>,
    starts: Vec<Option<usize>>,
    continuation_of: Vec<Option<usize>>,
}

impl Links {
    fn resolve(grammar: &GrammarDef) -> Result<Self> {
        let count = grammar.rules.len();
        let mut links = Links {
            children: vec![Vec::new(); count],
            parent: vec![None; count],
            reference: vec![false; count],
            starts: vec![None; count],
            continuation_of: vec![None; count],
        };

        for (index, def) in grammar.rules.iter().enumerate() {
            if def.ref_self {
                links.children[index].push(index);
            }
            for reference in &def.refs {
                let target = find_by_name(&grammar.rules, &reference.name, index).ok_or_else(|| {
                    HiliteError::UndefinedRule {
                        language: grammar.name.clone(),
                        rule: def.name.clone(),
                        target: reference.name.clone(),
                    }
                })?;
                if reference.mark_reference {
                    links.reference[target] = true;
                }
                if target != index {
                    links.parent[target] = Some(index);
                }
                links.children[index].push(target);
            }
            if let Some(name) = &def.starts {
                let target = find_by_name(&grammar.rules, name, index).ok_or_else(|| {
                    HiliteError::UndefinedContinuation {
                        language: grammar.name.clone(),
                        rule: def.name.clone(),
                        target: name.clone(),
                    }
                })?;
                links.reference[target] = true;
                links.starts[index] = Some(target);
                links.continuation_of[target] = Some(index);
            }
        }
        Ok(links)
    }

    /// Static parent; a continuation sits in its owner's slot
    fn static_parent(&self, index: usize) -> Option<usize> {
        let mut current = index;
        for _ in 0..=self.parent.len() {
            match self.continuation_of[current] {
                Some(owner) if owner != current => current = owner,
                _ => return self.parent[current],
            }
        }
        None
    }
}

/// Nearest preceding declaration, else the first following one
fn find_by_name(rules: &[RuleDef], name: &str, from: usize) -> Option<usize> {
    rules[..from]
        .iter()
        .rposition(|r| r.name == name)
        .or_else(|| {
            rules[from + 1..]
                .iter()
                .position(|r| r.name == name)
                .map(|p| from + 1 + p)
        })
        .or_else(|| (rules[from].name == name).then_some(from))
}

#[derive(Clone)]
enum EndState {
    Pending,
    InProgress,
    Done(String),
}

struct Compiler<'g> {
    grammar: &'g GrammarDef,
    links: Links,
    terminator_ends: Vec<EndState>,
}

impl<'g> Compiler<'g> {
    fn pattern(&self, rule: &str, pattern: &str) -> Result<Matcher> {
        Matcher::new(pattern, self.grammar.case_sensitive).map_err(|err| {
            HiliteError::InvalidPattern {
                language: self.grammar.name.clone(),
                rule: rule.to_string(),
                pattern: pattern.to_string(),
                message: err.to_string(),
            }
        })
    }

    fn begin_source(&self, index: usize) -> Option<String> {
        let def = &self.grammar.rules[index];
        if def.begin_with_keyword {
            let words: Vec<String> = def.keywords.iter().map(|(_, w)| w.clone()).collect();
            keyword_begin_pattern(&words)
        } else if def.begin.is_empty() {
            None
        } else {
            Some(def.begin.clone())
        }
    }

    fn end_source(&self, index: usize) -> String {
        let def = &self.grammar.rules[index];
        if def.end.is_empty() && !def.ends_with_parent {
            ALWAYS_MATCH.to_string()
        } else {
            def.end.clone()
        }
    }

    /// Own end pattern, extended with the parent's when chained
    fn terminator_end(&mut self, index: usize) -> String {
        match &self.terminator_ends[index] {
            EndState::Done(end) => return end.clone(),
            // Cyclic parent chain contributes nothing
            EndState::InProgress => return String::new(),
            EndState::Pending => {}
        }
        self.terminator_ends[index] = EndState::InProgress;

        let own = self.end_source(index);
        let mut end = own.clone();
        if self.grammar.rules[index].ends_with_parent {
            if let Some(parent) = self.links.static_parent(index).filter(|&p| p != index) {
                let inherited = self.terminator_end(parent);
                end = join_alternation([own.as_str(), inherited.as_str()]).unwrap_or_default();
            }
        }

        self.terminator_ends[index] = EndState::Done(end.clone());
        end
    }

    fn run(&mut self) -> Result<Language> {
        let grammar = self.grammar;
        let count = grammar.rules.len();
        let begins: Vec<Option<String>> = (0..count).map(|i| self.begin_source(i)).collect();
        let top_level: Vec<usize> = (0..count).filter(|&i| !self.links.reference[i]).collect();

        let mut rules = Vec::with_capacity(count);
        for (index, def) in grammar.rules.iter().enumerate() {
            let begin = match &begins[index] {
                Some(source) => Some(self.pattern(&def.name, source)?),
                None => None,
            };
            let own_end = self.end_source(index);
            let end = if own_end.is_empty() {
                None
            } else {
                Some(self.pattern(&def.name, &own_end)?)
            };
            if !def.illegal.is_empty() {
                self.pattern(&def.name, &def.illegal)?;
            }

            let terminator_end = self.terminator_end(index);
            let mut members: Vec<&str> = self.links.children[index]
                .iter()
                .filter_map(|&c| begins[c].as_deref())
                .collect();
            if def.ref_language_contains {
                members.extend(top_level.iter().filter_map(|&t| begins[t].as_deref()));
            }
            members.push(&terminator_end);
            members.push(&def.illegal);
            let terminators = match join_alternation(members) {
                Some(source) => Some(self.pattern(&def.name, &source)?),
                None => None,
            };

            let content = match &def.sub_language {
                Some(language) => {
                    if !def.keywords.is_empty() {
                        debug!(rule = %def.name, "keywords ignored on sub-language rule");
                    }
                    RuleContent::SubLanguage(language.clone())
                }
                None => {
                    let lexemes = if !def.keywords.is_empty() || def.ref_language_keywords {
                        let source = if def.lexemes.is_empty() {
                            DEFAULT_LEXEMES
                        } else {
                            def.lexemes.as_str()
                        };
                        Some(self.pattern(&def.name, source)?)
                    } else {
                        None
                    };
                    RuleContent::Keywords(KeywordScope {
                        table: KeywordTable::new(&def.keywords, grammar.case_sensitive),
                        lexemes,
                    })
                }
            };

            rules.push(Rule {
                name: def.name.clone(),
                class_name: def.name.split('|').next().unwrap_or_default().to_string(),
                flags: RuleFlags {
                    show_name: def.show_name,
                    ends_with_parent: def.ends_with_parent,
                    begin_with_keyword: def.begin_with_keyword,
                    exclude_begin: def.exclude_begin,
                    exclude_end: def.exclude_end,
                    return_begin: def.return_begin,
                    return_end: def.return_end,
                    ref_language_keywords: def.ref_language_keywords,
                    ref_language_contains: def.ref_language_contains,
                },
                relevance: def.relevance,
                begin,
                end,
                terminator_end,
                terminators,
                children: self.links.children[index].iter().copied().map(RuleId).collect(),
                content,
                parent: self.links.static_parent(index).map(RuleId),
                starts: self.links.starts[index].map(RuleId),
                continuation_of: self.links.continuation_of[index].map(RuleId),
                reference: self.links.reference[index],
            });
        }

        let lexemes = if grammar.keywords.is_empty() {
            None
        } else {
            let source = if grammar.lexemes.is_empty() {
                DEFAULT_LEXEMES
            } else {
                grammar.lexemes.as_str()
            };
            Some(self.pattern(LANGUAGE_SCOPE, source)?)
        };
        if !grammar.illegal.is_empty() {
            self.pattern(LANGUAGE_SCOPE, &grammar.illegal)?;
        }
        let mut members: Vec<&str> = top_level.iter().filter_map(|&t| begins[t].as_deref()).collect();
        members.push(&grammar.illegal);
        let terminators = match join_alternation(members) {
            Some(source) => Some(self.pattern(LANGUAGE_SCOPE, &source)?),
            None => None,
        };

        debug!(
            language = %grammar.name,
            rules = count,
            top_level = top_level.len(),
            "compiled grammar"
        );

        Ok(Language {
            name: grammar.name.clone(),
            keywords: KeywordTable::new(&grammar.keywords, grammar.case_sensitive),
            lexemes,
            terminators,
            top_level: top_level.into_iter().map(RuleId).collect(),
            rules,
        })
    }
}
