//! Workspace-scoped tags engine
//!
//! [`TagsEngine`] is the surface the editor integration talks to: it loads or
//! regenerates the tags file for one workspace root and answers definition
//! lookups from the current index snapshot.

use crate::error::{EngineError, EngineResult, GenerationError};
use crate::generator::{CtagsGenerator, GenerationArgs, TagsGenerator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagnav_config::TagsConfig;
use tagnav_symbols::{
    DefinitionKind, IndexSnapshot, IndexStore, ResolvedLocation, TagRecord, TagsIndex,
    load_tags_file,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Outcome of a successful load, suitable for a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    pub symbols: usize,
    pub records: usize,
    pub skipped_lines: usize,
    pub generation: u64,
}

impl IndexSummary {
    fn of(snapshot: &IndexSnapshot) -> Self {
        let index = snapshot.index();
        Self {
            symbols: index.symbol_count(),
            records: index.record_count(),
            skipped_lines: index.warnings().len(),
            generation: snapshot.generation(),
        }
    }
}

/// Tags index engine for a single workspace root
pub struct TagsEngine<G = CtagsGenerator> {
    root: PathBuf,
    tags_path: PathBuf,
    config: TagsConfig,
    generator: G,
    store: IndexStore,
    /// Held while the tags file is read or replaced
    regeneration: Mutex<()>,
}

impl TagsEngine<CtagsGenerator> {
    /// Open a workspace, reading `.tagnav/config.toml` when present
    pub fn open(root: impl Into<PathBuf>) -> EngineResult<Self> {
        let root = root.into();
        let config = TagsConfig::load_or_default(&root)?;
        Ok(Self::with_config(root, config))
    }

    pub fn with_config(root: impl Into<PathBuf>, config: TagsConfig) -> Self {
        let generator = CtagsGenerator::from_config(&config);
        Self::with_generator(root, config, generator)
    }
}

impl<G: TagsGenerator> TagsEngine<G> {
    pub fn with_generator(root: impl Into<PathBuf>, config: TagsConfig, generator: G) -> Self {
        let root = root.into();
        let tags_path = config.tags_path(&root);
        Self {
            root,
            tags_path,
            config,
            generator,
            store: IndexStore::new(),
            regeneration: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tags_path(&self) -> &Path {
        &self.tags_path
    }

    pub fn config(&self) -> &TagsConfig {
        &self.config
    }

    /// The index currently served to lookups
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.store.get()
    }

    /// Arguments derived from the workspace configuration
    pub fn configured_args(&self) -> GenerationArgs {
        GenerationArgs::from(&self.config)
    }

    pub fn is_regenerating(&self) -> bool {
        self.regeneration.try_lock().is_err()
    }

    /// Load the existing tags file without running the generator
    ///
    /// Fails with [`EngineError::Parse`] when the file is missing or has no
    /// usable records; the caller is expected to fall back to [`Self::regenerate`].
    /// Waits for a running regeneration and then loads the file it produced.
    pub async fn reindex(&self) -> EngineResult<IndexSummary> {
        let _guard = self.regeneration.lock().await;
        let index = load_blocking(self.tags_path.clone()).await?;
        Ok(self.install(index))
    }

    /// Run the generator and replace the index with its output
    ///
    /// At most one regeneration runs at a time; a concurrent call fails with
    /// [`EngineError::AlreadyRunning`] without touching the running one. On any
    /// failure the previous tags file and index stay in place.
    pub async fn regenerate(
        &self,
        args: &GenerationArgs,
        cancel: &CancellationToken,
    ) -> EngineResult<IndexSummary> {
        let _guard = self
            .regeneration
            .try_lock()
            .map_err(|_| EngineError::AlreadyRunning)?;

        let staging = staging_path(&self.tags_path);
        remove_if_present(&staging).await;

        tracing::info!("Generating tags index ({})", args);
        if let Err(err) = self
            .generator
            .generate(&self.root, &staging, args, cancel)
            .await
        {
            tracing::warn!("Generating tags failed: {}", err);
            remove_if_present(&staging).await;
            return Err(err.into());
        }

        let index = match load_blocking(staging.clone()).await {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!("Generated tags file is unusable: {}", err);
                remove_if_present(&staging).await;
                return Err(err);
            }
        };

        if cancel.is_cancelled() {
            remove_if_present(&staging).await;
            return Err(GenerationError::Cancelled.into());
        }

        tokio::fs::rename(&staging, &self.tags_path).await?;
        Ok(self.install(index))
    }

    /// Startup path: load the existing tags file, regenerating when that fails
    pub async fn activate(&self, cancel: &CancellationToken) -> EngineResult<IndexSummary> {
        match self.reindex().await {
            Ok(summary) => Ok(summary),
            Err(err) => {
                tracing::info!("No usable tags index ({}), regenerating", err);
                self.regenerate(&self.configured_args(), cancel).await
            }
        }
    }

    /// React to a saved document
    ///
    /// Returns `Ok(None)` when nothing was regenerated: saving is not
    /// configured to regenerate, the language is not handled, or a
    /// regeneration is already in flight and will pick the change up.
    pub async fn document_saved(
        &self,
        language_id: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<IndexSummary>> {
        if !self.config.regenerate_on_save || !self.config.handles_language(language_id) {
            return Ok(None);
        }

        match self.regenerate(&self.configured_args(), cancel).await {
            Ok(summary) => Ok(Some(summary)),
            Err(EngineError::AlreadyRunning) => {
                tracing::debug!("Save coalesced into running regeneration");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve all definitions of `symbol`
    ///
    /// Records whose file moved or changed since indexing are left out; an
    /// unknown symbol yields an empty list. Never regenerates.
    pub async fn lookup(&self, symbol: &str) -> Vec<ResolvedLocation> {
        self.resolve_with(symbol, |snapshot, root, query| snapshot.resolve(root, query))
            .await
    }

    /// [`Self::lookup`] restricted to definitions of one kind
    pub async fn lookup_by_kind(&self, symbol: &str, kind: DefinitionKind) -> Vec<ResolvedLocation> {
        self.resolve_with(symbol, move |snapshot, root, query| {
            snapshot.resolve_kind(root, query, kind)
        })
        .await
    }

    /// Unresolved records for `symbol` as stored in the tags file
    pub fn definitions(&self, symbol: &str) -> Vec<TagRecord> {
        self.store.lookup(symbol)
    }

    async fn resolve_with<F>(&self, symbol: &str, resolve: F) -> Vec<ResolvedLocation>
    where
        F: FnOnce(&IndexSnapshot, &Path, &str) -> Vec<ResolvedLocation> + Send + 'static,
    {
        if !self.store.is_loaded() {
            tracing::debug!("Lookup for \"{}\" before any tags index was loaded", symbol);
        }

        let snapshot = self.store.get();
        let root = self.root.clone();
        let query = symbol.to_string();

        match tokio::task::spawn_blocking(move || {
            resolve(snapshot.as_ref(), root.as_path(), query.as_str())
        }).await {
            Ok(locations) => {
                if locations.is_empty() {
                    tracing::debug!("\"{}\" has no matches", symbol);
                }
                locations
            }
            Err(err) => {
                tracing::warn!("Lookup for \"{}\" failed: {}", symbol, err);
                Vec::new()
            }
        }
    }

    /// Lookup for a document of `language_id`; other languages get no results
    pub async fn lookup_for_language(
        &self,
        language_id: &str,
        symbol: &str,
    ) -> Vec<ResolvedLocation> {
        if !self.config.handles_language(language_id) {
            return Vec::new();
        }
        self.lookup(symbol).await
    }

    fn install(&self, index: TagsIndex) -> IndexSummary {
        let snapshot = self.store.swap(index);
        let summary = IndexSummary::of(&snapshot);
        tracing::info!(
            "Tags index loaded: {} symbols, {} records (generation {})",
            summary.symbols,
            summary.records,
            summary.generation
        );
        summary
    }
}

async fn load_blocking(path: PathBuf) -> EngineResult<TagsIndex> {
    let index = tokio::task::spawn_blocking(move || load_tags_file(&path)).await??;
    Ok(index)
}

/// Sibling file the generator writes into before it replaces the tags file
fn staging_path(tags_path: &Path) -> PathBuf {
    let mut name = tags_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    tags_path.with_file_name(name)
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!("Failed to remove {}: {}", path.display(), err),
    }
}
