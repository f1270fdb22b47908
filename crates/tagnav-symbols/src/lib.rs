//! Tags index for C/C++ codebases
//!
//! This crate turns a `ctags` tags file into an in-memory symbol index and
//! resolves tag addresses to concrete source lines for go-to-definition:
//!
//! - [`parse`] / [`load_tags_file`] read exuberant-tags formatted text
//! - [`ResolveBatch`] turns numeric and ex-style search pattern addresses into lines
//! - [`IndexStore`] holds the current index and swaps it atomically
//! - [`symbol_at_offset`] finds the identifier under a cursor in C/C++ text
//!
//! # Example
//!
//! ```no_run
//! use tagnav_symbols::{IndexStore, parse};
//! use std::path::Path;
//!
//! let content = "main\tsrc/main.c\t/^int main(void)$/;\"\tf\n";
//! let store = IndexStore::new();
//! store.swap(parse(content).unwrap());
//!
//! let locations = store.get().resolve(Path::new("/work/project"), "main");
//! for location in locations {
//!     println!("{location}");
//! }
//! ```

mod address;
mod index;
mod query;
mod resolver;
mod store;
mod tags;

pub use address::{AddressSpec, SearchPattern};
pub use index::{DefinitionKind, TagRecord, TagScope, TagsIndex};
pub use query::{QuerySymbol, QuerySymbolKind, line_column_to_byte_offset, symbol_at_offset};
pub use resolver::{ResolveBatch, ResolvedLocation};
pub use store::{IndexSnapshot, IndexStore};
pub use tags::{LineError, ParseWarning, load_tags_file, parse};

use std::path::PathBuf;

/// Failure to produce a usable index from a tags file
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Tags file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read tags file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tags file contains no usable records ({skipped} malformed lines skipped)")]
    NoRecords { skipped: usize },
}

/// Failure to resolve a single tag address to a line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Source file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Pattern {pattern:?} not found in {}", path.display())]
    PatternNotFound { path: PathBuf, pattern: String },

    #[error("Line {line} is out of range for {}", path.display())]
    OutOfRange { path: PathBuf, line: usize },
}

pub type Result<T> = std::result::Result<T, ParseError>;
