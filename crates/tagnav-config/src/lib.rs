use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const WORKSPACE_DIR: &str = ".tagnav";
const WORKSPACE_FILE: &str = "config.toml";
const DEFAULT_TAGS_FILE: &str = ".tags";
const DEFAULT_PROGRAM: &str = "ctags";
const ALL_LANGUAGES: &str = "all";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagsConfig {
    /// Tags file location, relative to the workspace root
    #[serde(default = "default_tags_file")]
    pub tags_file: String,
    /// Generator executable, looked up on `PATH` unless it is a path
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Passed to the generator after the language and exclude arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub regenerate_on_save: bool,
    /// Editor language identifiers routed to the tags lookup
    #[serde(default = "default_document_languages")]
    pub document_languages: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            tags_file: default_tags_file(),
            program: default_program(),
            languages: default_languages(),
            exclude_patterns: Vec::new(),
            extra_args: Vec::new(),
            regenerate_on_save: false,
            document_languages: default_document_languages(),
            timeout_secs: None,
        }
    }
}

impl TagsConfig {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = config_path(root);
        let contents = fs::read_to_string(&path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.normalize();
        Ok(config)
    }

    pub fn load_or_default(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(root) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, root: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = config_path(&root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// Absolute location of the tags file for a workspace
    pub fn tags_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.tags_file)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Whether documents of `language_id` should be answered from the tags index
    pub fn handles_language(&self, language_id: &str) -> bool {
        self.document_languages
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(language_id))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.iter().map(|entry| entry.as_str())
    }

    pub fn exclude_patterns(&self) -> impl Iterator<Item = &str> {
        self.exclude_patterns.iter().map(|entry| entry.as_str())
    }

    fn normalize(&mut self) {
        self.tags_file = self.tags_file.trim().to_string();
        if self.tags_file.is_empty() {
            self.tags_file = default_tags_file();
        }

        self.program = self.program.trim().to_string();
        if self.program.is_empty() {
            self.program = default_program();
        }

        normalize_list(&mut self.languages, true);
        if self.languages.is_empty() {
            self.languages = default_languages();
        }

        normalize_list(&mut self.exclude_patterns, false);
        normalize_list(&mut self.document_languages, true);
        self.extra_args.retain(|entry| !entry.trim().is_empty());
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse tagnav configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize tagnav configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn config_path(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join(WORKSPACE_DIR).join(WORKSPACE_FILE)
}

/// Trims entries and drops empties; `dedup` also removes repeats, keeping first occurrence.
fn normalize_list(entries: &mut Vec<String>, dedup: bool) {
    let mut normalized: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries.drain(..) {
        let entry = entry.trim().to_string();
        if entry.is_empty() || (dedup && normalized.contains(&entry)) {
            continue;
        }
        normalized.push(entry);
    }
    *entries = normalized;
}

fn default_tags_file() -> String {
    DEFAULT_TAGS_FILE.to_string()
}

fn default_program() -> String {
    DEFAULT_PROGRAM.to_string()
}

fn default_languages() -> Vec<String> {
    vec![ALL_LANGUAGES.to_string()]
}

fn default_document_languages() -> Vec<String> {
    vec!["c".to_string(), "cpp".to_string()]
}

impl fmt::Display for TagsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TagsConfig(tags_file={:?}, program={:?})",
            self.tags_file, self.program
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = TagsConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, TagsConfig::default());
        assert_eq!(config.languages().collect::<Vec<_>>(), vec!["all"]);
        assert!(config.handles_language("cpp"));
        assert!(config.handles_language("C"));
        assert!(!config.handles_language("rust"));
    }

    #[test]
    fn load_and_save_round_trip() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let mut config = TagsConfig::default();
        config.languages = vec!["C".into(), "C++".into()];
        config.exclude_patterns = vec!["build".into(), "third_party/*".into()];
        config.regenerate_on_save = true;
        config.timeout_secs = Some(90);
        config.save(root).unwrap();

        let loaded = TagsConfig::load(root).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(loaded.tags_path(root), root.join(".tags"));
    }

    #[test]
    fn partial_file_fills_defaults_and_normalizes() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(WORKSPACE_DIR)).unwrap();
        fs::write(
            config_path(root),
            r#"
tags_file = "  "
languages = [" C ", "C", "", "C++"]
exclude_patterns = [" out ", ""]
"#,
        )
        .unwrap();

        let config = TagsConfig::load(root).unwrap();
        assert_eq!(config.tags_file, ".tags");
        assert_eq!(config.program, "ctags");
        assert_eq!(config.languages, vec!["C".to_string(), "C++".to_string()]);
        assert_eq!(config.exclude_patterns().collect::<Vec<_>>(), vec!["out"]);
        assert_eq!(config.document_languages, vec!["c", "cpp"]);
        assert!(!config.regenerate_on_save);
    }

    #[test]
    fn empty_language_list_falls_back_to_all() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(WORKSPACE_DIR)).unwrap();
        fs::write(config_path(root), "languages = []\n").unwrap();

        let config = TagsConfig::load(root).unwrap();
        assert_eq!(config.languages, vec!["all".to_string()]);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(WORKSPACE_DIR)).unwrap();
        fs::write(config_path(root), "languages = [").unwrap();

        let err = TagsConfig::load_or_default(root).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
