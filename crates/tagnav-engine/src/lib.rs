//! Tags index engine for tagnav
//!
//! Runs the `ctags` generator for a workspace, keeps the parsed index in
//! memory and answers go-to-definition queries. The editor side needs only
//! [`TagsEngine::reindex`], [`TagsEngine::regenerate`] and [`TagsEngine::lookup`].

pub mod engine;
pub mod error;
pub mod generator;

pub use engine::{IndexSummary, TagsEngine};
pub use error::{EngineError, EngineResult, GenerationError};
pub use generator::{CtagsGenerator, GenerationArgs, TagsGenerator};
pub use tokio_util::sync::CancellationToken;
