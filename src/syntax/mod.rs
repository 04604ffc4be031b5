//! Grammar-driven syntax highlighting
//!
//! Grammars are declared as [`GrammarDef`] values (usually loaded from
//! XML documents), compiled into [`Language`]s and stored in a
//! [`Registry`]. The [`Highlighter`] scans text against a language and
//! produces `<span class="...">` markup.

mod compiler;
mod grammar;
mod highlighter;
mod language;
pub mod markup;
mod registry;
mod rules;
mod tokens;

pub use compiler::compile;
pub use grammar::{GrammarDef, RuleDef, RuleRef};
pub use highlighter::{Highlight, Highlighter};
pub use language::Language;
pub use registry::{Registry, DEFAULT_ALIASES};
pub use rules::{KeywordScope, Matcher, Rule, RuleContent, RuleFlags, RuleId};
pub use tokens::{KeywordCategory, KeywordTable};
