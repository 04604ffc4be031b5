//! hilite - grammar-driven syntax highlighting to HTML spans

pub mod config;
pub mod error;
pub mod syntax;
pub mod worker;

pub use config::Config;
pub use error::{HiliteError, Result};
pub use syntax::{GrammarDef, Highlight, Highlighter, Registry, RuleDef};
pub use worker::{HighlightOutcome, HighlightRequest, HighlightWorker};
