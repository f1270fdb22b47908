//! Command-line front end for the tagnav tags engine
//!
//! Usage:
//!   tagnav lookup <symbol> [--language <id>] [--kind <kind>]
//!   tagnav records <symbol>
//!   tagnav at <file> <line> <column>
//!   tagnav reindex
//!   tagnav regenerate [--language <lang>]... [--exclude <glob>]...
//!   tagnav symbols [--prefix <prefix>]
//!   tagnav files

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tagnav_engine::{CancellationToken, GenerationArgs, IndexSummary, TagsEngine};
use tagnav_symbols::{
    DefinitionKind, ResolvedLocation, line_column_to_byte_offset, symbol_at_offset,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tagnav", version, about = "Jump to C/C++ definitions using a ctags index")]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the definitions of a symbol
    Lookup {
        symbol: String,
        /// Editor language id of the requesting document
        #[arg(long)]
        language: Option<String>,
        /// Only definitions of this kind (ctags letter or name, e.g. `s` or `struct`)
        #[arg(long)]
        kind: Option<String>,
    },
    /// Print the raw tags records of a symbol without resolving them
    Records { symbol: String },
    /// Look up the symbol under a cursor position (1-based line, 0-based column)
    At {
        file: PathBuf,
        line: usize,
        column: usize,
    },
    /// Load the existing tags file
    Reindex,
    /// Run ctags and load the new tags file
    Regenerate {
        #[arg(long = "language")]
        languages: Vec<String>,
        #[arg(long = "exclude")]
        excludes: Vec<String>,
    },
    /// List indexed symbols
    Symbols {
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// List the source files referenced by the index
    Files,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let engine = TagsEngine::open(&root)
        .with_context(|| format!("Failed to open workspace {}", root.display()))?;
    tracing::debug!("Using {}", engine.config());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::Lookup {
            symbol,
            language,
            kind,
        } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            engine.activate(&cancel).await?;
            let locations = match (language, kind) {
                (Some(language), _) if !engine.config().handles_language(&language) => Vec::new(),
                (_, Some(kind)) => engine.lookup_by_kind(&symbol, kind).await,
                (Some(language), None) => engine.lookup_for_language(&language, &symbol).await,
                (None, None) => engine.lookup(&symbol).await,
            };
            print_locations(&symbol, &locations);
        }
        Command::At { file, line, column } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let symbol = line_column_to_byte_offset(&content, line, column)
                .and_then(|offset| symbol_at_offset(&content, offset))
                .with_context(|| format!("No symbol at {}:{}:{}", file.display(), line, column))?;

            engine.activate(&cancel).await?;
            let locations = engine.lookup(&symbol.name).await;
            print_locations(&symbol.name, &locations);
        }
        Command::Records { symbol } => {
            engine.activate(&cancel).await?;
            for record in engine.definitions(&symbol) {
                let kind = record
                    .definition_kind()
                    .map(|kind| kind.as_str())
                    .unwrap_or("-");
                println!("{}\t{}\t{}\t{}", record.symbol, record.path.display(), record.address, kind);
            }
        }
        Command::Reindex => {
            let summary = engine.reindex().await?;
            report(&summary);
        }
        Command::Regenerate {
            languages,
            excludes,
        } => {
            let args = if languages.is_empty() && excludes.is_empty() {
                engine.configured_args()
            } else {
                GenerationArgs::new(languages, excludes)
            };
            let summary = engine
                .regenerate(&args, &cancel)
                .await
                .context("Generating tags failed")?;
            report(&summary);
        }
        Command::Symbols { prefix } => {
            engine.activate(&cancel).await?;
            let snapshot = engine.snapshot();
            for (name, records) in snapshot.index().search_prefix(&prefix) {
                println!("{}\t{}", name, records.len());
            }
        }
        Command::Files => {
            engine.activate(&cancel).await?;
            let snapshot = engine.snapshot();
            for file in snapshot.index().files() {
                println!("{}", file.display());
            }
        }
    }

    Ok(())
}

fn parse_kind(kind: &str) -> anyhow::Result<DefinitionKind> {
    let mut letters = kind.chars();
    let from_letter = match (letters.next(), letters.next()) {
        (Some(letter), None) => DefinitionKind::from_letter(letter),
        _ => None,
    };
    match from_letter.or_else(|| DefinitionKind::from_name(kind)) {
        Some(kind) => Ok(kind),
        None => bail!("Unknown definition kind \"{}\"", kind),
    }
}

fn print_locations(symbol: &str, locations: &[ResolvedLocation]) {
    if locations.is_empty() {
        eprintln!("\"{}\" has no matches", symbol);
    }
    for location in locations {
        println!("{}", location);
    }
}

fn report(summary: &IndexSummary) {
    println!(
        "Tags index loaded: {} symbols, {} records",
        summary.symbols, summary.records
    );
    if summary.skipped_lines > 0 {
        println!("Skipped {} malformed lines", summary.skipped_lines);
    }
}
