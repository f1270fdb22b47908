//! Tags generator process management

use crate::error::GenerationError;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::process::{Output, Stdio};
use tagnav_config::TagsConfig;
use tokio::process::{Child, Command};
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;

const ALL_LANGUAGES: &str = "all";

/// What to index: a language set and exclusion globs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationArgs {
    languages: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl Default for GenerationArgs {
    fn default() -> Self {
        Self {
            languages: vec![ALL_LANGUAGES.to_string()],
            exclude_patterns: Vec::new(),
        }
    }
}

impl GenerationArgs {
    /// Normalize a language set and exclude list
    ///
    /// Languages are de-duplicated in first-seen order; an empty set or one
    /// naming `all` becomes `all`.
    pub fn new<L, E>(languages: L, exclude_patterns: E) -> Self
    where
        L: IntoIterator,
        L::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for language in languages {
            let language = language.as_ref().trim();
            if !language.is_empty() && !unique.iter().any(|seen| seen == language) {
                unique.push(language.to_string());
            }
        }
        if unique.is_empty() || unique.iter().any(|l| l.eq_ignore_ascii_case(ALL_LANGUAGES)) {
            unique = vec![ALL_LANGUAGES.to_string()];
        }

        let exclude_patterns = exclude_patterns
            .into_iter()
            .map(|pattern| pattern.as_ref().trim().to_string())
            .filter(|pattern| !pattern.is_empty())
            .collect();

        Self {
            languages: unique,
            exclude_patterns,
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    /// One `--languages=` argument followed by one `--exclude=` per pattern
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(1 + self.exclude_patterns.len());
        args.push(format!("--languages={}", self.languages.join(",")));
        args.extend(
            self.exclude_patterns
                .iter()
                .map(|pattern| format!("--exclude={}", pattern)),
        );
        args
    }
}

impl From<&TagsConfig> for GenerationArgs {
    fn from(config: &TagsConfig) -> Self {
        Self::new(config.languages(), config.exclude_patterns())
    }
}

impl fmt::Display for GenerationArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_args().join(" "))
    }
}

/// Something that can write a tags file for a workspace
///
/// The engine only relies on this contract: on `Ok(())` a tags file exists at
/// `output`; on error nothing about the previous tags file may be assumed to
/// have changed except `output` itself.
pub trait TagsGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        workspace: &Path,
        output: &Path,
        args: &GenerationArgs,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), GenerationError>> + Send;
}

/// Runs an exuberant/universal `ctags` executable
#[derive(Debug, Clone)]
pub struct CtagsGenerator {
    program: String,
    extra_args: Vec<String>,
    timeout: Option<Duration>,
}

impl Default for CtagsGenerator {
    fn default() -> Self {
        Self::new("ctags")
    }
}

impl CtagsGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &TagsConfig) -> Self {
        Self {
            program: config.program.clone(),
            extra_args: config.extra_args.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full argument list passed to the generator
    pub fn command_line(&self, output: &Path, args: &GenerationArgs) -> Vec<String> {
        let mut argv = args.to_args();
        argv.extend(self.extra_args.iter().cloned());
        argv.push("-R".to_string());
        argv.push("-f".to_string());
        argv.push(output.to_string_lossy().to_string());
        argv.push(".".to_string());
        argv
    }

    async fn run(
        &self,
        workspace: &Path,
        output: &Path,
        args: &GenerationArgs,
        cancel: &CancellationToken,
    ) -> Result<(), GenerationError> {
        let program = which::which(&self.program)
            .map_err(|_| GenerationError::ProgramNotFound(self.program.clone()))?;
        let argv = self.command_line(output, args);

        tracing::info!(
            "Generating tags index: {} {} (in {})",
            program.display(),
            argv.join(" "),
            workspace.display()
        );

        let mut cmd = Command::new(&program);
        cmd.args(&argv)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            GenerationError::SpawnFailed(format!("{}: {}", program.display(), e))
        })?;

        // Dropping the wait future drops the child, which kills the process.
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Tags generation cancelled, killing {}", program.display());
                return Err(GenerationError::Cancelled);
            }
            result = wait_with_limit(child, self.timeout) => result?,
        };

        if result.status.success() {
            tracing::info!("Tags generator finished successfully");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            tracing::warn!(
                "Tags generator failed with status {}: {}",
                result.status,
                stderr
            );
            Err(GenerationError::CommandFailed {
                code: result.status.code(),
                stderr,
            })
        }
    }
}

impl TagsGenerator for CtagsGenerator {
    fn generate(
        &self,
        workspace: &Path,
        output: &Path,
        args: &GenerationArgs,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), GenerationError>> + Send {
        self.run(workspace, output, args, cancel)
    }
}

async fn wait_with_limit(child: Child, limit: Option<Duration>) -> Result<Output, GenerationError> {
    let wait = child.wait_with_output();
    match limit {
        Some(limit) => timeout(limit, wait)
            .await
            .map_err(|_| GenerationError::TimedOut(limit))?
            .map_err(GenerationError::from),
        None => wait.await.map_err(GenerationError::from),
    }
}
