//! Grammar descriptions and the XML grammar loader
//!
//! A [`GrammarDef`] is the declarative, uncompiled form of a language.
//! It is usually read from an XML grammar document:
//!
//! ```text
//! <Language casesensitive="true">
//!   <Keywords><Keyword>if</Keyword><Literal>true</Literal></Keywords>
//!   <Contains>
//!     <Contain name="string">
//!       <Begin>"</Begin>
//!       <End>"</End>
//!     </Contain>
//!   </Contains>
//! </Language>
//! ```
//!
//! The document is decoded with quick-xml into a small element tree,
//! which is then walked into the description. Compilation happens in
//! [`super::compiler`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::tokens::KeywordCategory;
use crate::error::{HiliteError, Result};

/// A reference from one rule to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRef {
    /// Full name of the referenced rule
    pub name: String,
    /// Whether the reference marks its target as reference-only
    pub mark_reference: bool,
}

impl RuleRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mark_reference: true,
        }
    }
}

/// Declarative form of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    pub name: String,
    pub begin: String,
    pub end: String,
    pub show_name: bool,
    pub ends_with_parent: bool,
    pub begin_with_keyword: bool,
    pub exclude_begin: bool,
    pub exclude_end: bool,
    pub return_begin: bool,
    pub return_end: bool,
    pub ref_language_keywords: bool,
    pub ref_language_contains: bool,
    pub ref_self: bool,
    pub relevance: i32,
    pub illegal: String,
    pub lexemes: String,
    pub keywords: Vec<(KeywordCategory, String)>,
    pub refs: Vec<RuleRef>,
    pub starts: Option<String>,
    pub sub_language: Option<String>,
}

impl RuleDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            begin: String::new(),
            end: String::new(),
            show_name: true,
            ends_with_parent: false,
            begin_with_keyword: false,
            exclude_begin: false,
            exclude_end: false,
            return_begin: false,
            return_end: false,
            ref_language_keywords: false,
            ref_language_contains: false,
            ref_self: false,
            relevance: 1,
            illegal: String::new(),
            lexemes: String::new(),
            keywords: Vec::new(),
            refs: Vec::new(),
            starts: None,
            sub_language: None,
        }
    }

    pub fn begin(mut self, pattern: &str) -> Self {
        self.begin = pattern.to_string();
        self
    }

    pub fn end(mut self, pattern: &str) -> Self {
        self.end = pattern.to_string();
        self
    }

    pub fn keyword(mut self, category: KeywordCategory, word: &str) -> Self {
        self.keywords.push((category, word.to_string()));
        self
    }

    pub fn contains(mut self, name: &str) -> Self {
        self.refs.push(RuleRef::new(name));
        self
    }

    pub fn starts(mut self, name: &str) -> Self {
        self.starts = Some(name.to_string());
        self
    }

    pub fn sub_language(mut self, language: &str) -> Self {
        self.sub_language = Some(language.to_string());
        self
    }
}

/// Declarative form of a language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarDef {
    pub name: String,
    pub case_sensitive: bool,
    pub keywords: Vec<(KeywordCategory, String)>,
    pub illegal: String,
    pub lexemes: String,
    /// Rules in declaration order
    pub rules: Vec<RuleDef>,
}

impl GrammarDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            case_sensitive: true,
            keywords: Vec::new(),
            illegal: String::new(),
            lexemes: String::new(),
            rules: Vec::new(),
        }
    }

    pub fn keyword(mut self, category: KeywordCategory, word: &str) -> Self {
        self.keywords.push((category, word.to_string()));
        self
    }

    pub fn rule(mut self, rule: RuleDef) -> Self {
        self.rules.push(rule);
        self
    }

    /// Parse an XML grammar document
    pub fn from_xml(name: &str, source: &str) -> Result<Self> {
        let root = parse_document(name, source)?;
        let language = root
            .into_iter()
            .find(|e| e.name == "Language")
            .ok_or_else(|| xml_error(name, "missing <Language> root element"))?;
        Ok(grammar_from_element(name, &language))
    }
}

/// Minimal element tree produced from the XML event stream
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    /// Concatenated text and CDATA content, untrimmed
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn flag(&self) -> bool {
        self.text.trim() == "true"
    }
}

fn xml_error(language: &str, message: impl Into<String>) -> HiliteError {
    HiliteError::Xml {
        language: language.to_string(),
        message: message.into(),
    }
}

fn start_element(language: &str, e: &BytesStart<'_>) -> Result<Element> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| xml_error(language, format!("invalid tag name: {err}")))?
        .to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(language, format!("attribute error: {err}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| xml_error(language, format!("attribute key error: {err}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| xml_error(language, format!("attribute value error: {err}")))?
            .to_string();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Element::default()
    })
}

/// Decode a document into its top-level elements
fn parse_document(language: &str, source: &str) -> Result<Vec<Element>> {
    let mut reader = Reader::from_str(source);
    let mut stack: Vec<Element> = Vec::new();
    let mut roots = Vec::new();

    let close = |stack: &mut Vec<Element>, roots: &mut Vec<Element>, element: Element| {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => roots.push(element),
        }
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(start_element(language, e)?),
            Ok(Event::Empty(ref e)) => {
                let element = start_element(language, e)?;
                close(&mut stack, &mut roots, element);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| xml_error(language, "unbalanced closing tag"))?;
                close(&mut stack, &mut roots, element);
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| xml_error(language, format!("text error: {err}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e)
                    .map_err(|err| xml_error(language, format!("CDATA error: {err}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(text);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(xml_error(
                    language,
                    format!("parse error at position {}: {err}", reader.buffer_position()),
                ));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error(language, "unexpected end of document"));
    }
    Ok(roots)
}

fn keywords_from_element(element: &Element) -> Vec<(KeywordCategory, String)> {
    element
        .children
        .iter()
        .filter_map(|k| KeywordCategory::from_tag(&k.name).map(|c| (c, k.text.clone())))
        .collect()
}

fn grammar_from_element(name: &str, element: &Element) -> GrammarDef {
    let mut grammar = GrammarDef::new(name);
    // Case sensitive unless explicitly disabled
    grammar.case_sensitive = element.attribute("casesensitive") != Some("false");

    for child in &element.children {
        match child.name.as_str() {
            "Contains" => {
                grammar.rules.extend(
                    child
                        .children
                        .iter()
                        .filter(|c| c.name == "Contain")
                        .map(rule_from_element),
                );
            }
            "Illegal" => grammar.illegal = child.text.clone(),
            "Keywords" => grammar.keywords.extend(keywords_from_element(child)),
            "Lexems" => grammar.lexemes = child.text.clone(),
            _ => {}
        }
    }
    grammar
}

fn rule_from_element(element: &Element) -> RuleDef {
    let mut rule = RuleDef::new(element.attribute("name").unwrap_or_default());
    rule.ref_language_contains = element.attribute("refLanguageContains") == Some("true");

    for child in &element.children {
        match child.name.as_str() {
            "Keywords" => {
                if child.attribute("refLanguageKeywords") == Some("true") {
                    rule.ref_language_keywords = true;
                }
                rule.keywords.extend(keywords_from_element(child));
            }
            "RefContains" => {
                if child.attribute("refSelf") == Some("true") {
                    rule.ref_self = true;
                }
                rule.refs.extend(
                    child
                        .children
                        .iter()
                        .filter(|r| r.name == "RefContain")
                        .map(|r| RuleRef {
                            name: r.text.trim().to_string(),
                            mark_reference: r.attribute("notSetRef").is_none(),
                        }),
                );
            }
            "ShowClassName" => rule.show_name = child.text.trim() != "false",
            "Begin" => rule.begin = child.text.clone(),
            "End" => rule.end = child.text.clone(),
            "EndsWithParent" => rule.ends_with_parent = child.flag(),
            "Relevance" => rule.relevance = child.text.trim().parse().unwrap_or(0),
            "Illegal" => rule.illegal = child.text.clone(),
            "BeginWithKeyword" => rule.begin_with_keyword = child.flag(),
            "Lexems" => rule.lexemes = child.text.clone(),
            "Starts" => rule.starts = Some(child.text.trim().to_string()),
            "ExcludeBegin" => rule.exclude_begin = child.flag(),
            "ExcludeEnd" => rule.exclude_end = child.flag(),
            "ReturnBegin" => rule.return_begin = child.flag(),
            "ReturnEnd" => rule.return_end = child.flag(),
            "SubLanguage" => {
                let language = child.text.trim();
                if !language.is_empty() {
                    rule.sub_language = Some(language.to_string());
                }
            }
            _ => {}
        }
    }
    rule
}
