//! hilite - highlight source text as HTML spans
//!
//! ```bash
//! # Highlight a file, language taken from its extension
//! hilite -g grammars src/main.cpp
//!
//! # Highlight stdin
//! echo 'int x;' | hilite -g grammars -l cpp
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hilite::{Config, HiliteError, Registry, Result};

/// Grammar-driven syntax highlighter producing HTML spans
#[derive(Parser, Debug)]
#[command(name = "hilite")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to highlight (stdin when omitted)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Language name or alias
    #[arg(short, long, value_name = "NAME")]
    language: Option<String>,

    /// Additional grammar directory
    #[arg(short, long = "grammars", value_name = "DIR")]
    grammars: Vec<PathBuf>,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// List registered languages and aliases
    #[arg(long)]
    list: bool,

    /// Print the relevance score to stderr
    #[arg(long)]
    relevance: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let registry = config.build_registry(&args.grammars)?;
    tracing::info!(languages = registry.len(), "grammars loaded");

    if args.list {
        print_languages(&registry);
        return Ok(());
    }

    let language = pick_language(args, &config, &registry)
        .ok_or_else(|| HiliteError::Config("no language given; use --language".to_string()))?;

    let text = match &args.file {
        Some(path) => fs::read_to_string(path).map_err(|e| HiliteError::io(path, e))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| HiliteError::io("<stdin>", e))?;
            text
        }
    };

    let result = registry.highlight_detailed(&language, &text);
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(result.value.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| HiliteError::io("<stdout>", e))?;

    if args.relevance {
        eprintln!("relevance: {}", result.relevance);
    }
    Ok(())
}

/// `--language`, then the configured default, then the file extension
fn pick_language(args: &Args, config: &Config, registry: &Registry) -> Option<String> {
    args.language
        .clone()
        .or_else(|| config.default_language.clone())
        .or_else(|| {
            args.file
                .as_deref()
                .and_then(Path::extension)
                .and_then(|ext| ext.to_str())
                .filter(|ext| registry.contains(ext))
                .map(str::to_string)
        })
}

fn print_languages(registry: &Registry) {
    for name in registry.names() {
        println!("{}", name);
    }
    let aliases = registry.aliases();
    if !aliases.is_empty() {
        println!();
        for (alias, name) in aliases {
            println!("{} -> {}", alias, name);
        }
    }
}
