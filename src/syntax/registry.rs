//! Language registry
//!
//! The registry owns every compiled language, keyed by canonical name,
//! and resolves aliases (`c` → `cpp`, `html` → `xml`, `js` →
//! `javascript`) at lookup time. It is filled once at startup and only
//! read afterwards, so it can be shared between threads behind an `Arc`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::compiler::compile;
use super::grammar::GrammarDef;
use super::highlighter::{Highlight, Highlighter};
use super::language::Language;
use crate::error::{HiliteError, Result};

/// Aliases every registry starts with
pub const DEFAULT_ALIASES: [(&str, &str); 3] = [("c", "cpp"), ("html", "xml"), ("js", "javascript")];

/// Compiled languages by canonical name
#[derive(Debug, Clone)]
pub struct Registry {
    languages: HashMap<String, Language>,
    /// Alias -> canonical name
    aliases: HashMap<String, String>,
}

impl Registry {
    /// Create an empty registry with the default aliases
    pub fn new() -> Self {
        Self {
            languages: HashMap::new(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(alias, name)| (alias.to_string(), name.to_string()))
                .collect(),
        }
    }

    /// Compile every `(name, source)` grammar document
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for (name, source) in sources {
            registry.register_source(name.as_ref(), source.as_ref())?;
        }
        Ok(registry)
    }

    /// Compile and store a grammar description
    pub fn register(&mut self, grammar: GrammarDef) -> Result<()> {
        let language = compile(&grammar)?;
        info!(
            language = %grammar.name,
            rules = language.rule_count(),
            "registered language"
        );
        if self.languages.insert(grammar.name.clone(), language).is_some() {
            warn!(language = %grammar.name, "replaced previously registered language");
        }
        Ok(())
    }

    /// Parse, compile and store an XML grammar document
    pub fn register_source(&mut self, name: &str, source: &str) -> Result<()> {
        self.register(GrammarDef::from_xml(name, source)?)
    }

    /// Read and register a grammar file
    pub fn load_file(&mut self, name: &str, path: &Path) -> Result<()> {
        let source = fs::read_to_string(path).map_err(|e| HiliteError::io(path, e))?;
        self.register_source(name, &source)
    }

    /// Register every `*.xml` file in `dir`, named after its file stem
    ///
    /// Files are loaded in sorted order. Returns the number of grammars
    /// loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let entries = fs::read_dir(dir).map_err(|e| HiliteError::io(dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| HiliteError::io(dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "xml") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!(path = %path.display(), "skipping grammar with non UTF-8 name");
                continue;
            };
            self.load_file(name, path)?;
        }
        Ok(paths.len())
    }

    /// Map `alias` to the canonical language `name`
    pub fn add_alias(&mut self, alias: &str, name: &str) {
        self.aliases.insert(alias.to_string(), name.to_string());
    }

    /// Canonical name for `name`
    pub fn resolve<'n>(&'n self, name: &'n str) -> &'n str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Look up a language by name or alias
    pub fn get(&self, name: &str) -> Option<&Language> {
        self.languages
            .get(self.resolve(name))
            .or_else(|| self.languages.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered canonical names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Aliases as `(alias, canonical)` pairs, sorted by alias
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        let mut aliases: Vec<(&str, &str)> = self
            .aliases
            .iter()
            .map(|(a, n)| (a.as_str(), n.as_str()))
            .collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// Highlight `text` as language `name`, returning the annotated text
    pub fn highlight(&self, name: &str, text: &str) -> String {
        self.highlight_detailed(name, text).value
    }

    pub fn highlight_detailed(&self, name: &str, text: &str) -> Highlight {
        Highlighter::new(self).highlight(name, text)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
