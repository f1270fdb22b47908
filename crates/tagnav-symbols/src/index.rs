//! Core tag record and index types

use crate::address::AddressSpec;
use crate::tags::ParseWarning;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single definition entry from a tags file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    /// Symbol name, case-sensitive
    pub symbol: String,
    /// File containing the definition, absolute or relative to the workspace root
    pub path: PathBuf,
    /// Where inside `path` the definition lives
    pub address: AddressSpec,
    /// Single-letter ctags kind (`f`, `s`, `d`, ...)
    pub kind: Option<char>,
    /// 1-based line from a `line:` extension field
    pub line_hint: Option<usize>,
    /// Enclosing scope from a `class:`/`struct:`/`namespace:` style field
    pub scope: Option<TagScope>,
    pub signature: Option<String>,
}

impl TagRecord {
    pub fn new(symbol: impl Into<String>, path: impl Into<PathBuf>, address: AddressSpec) -> Self {
        Self {
            symbol: symbol.into(),
            path: path.into(),
            address,
            kind: None,
            line_hint: None,
            scope: None,
            signature: None,
        }
    }

    /// The C/C++ definition kind for this record, if the kind letter is known
    pub fn definition_kind(&self) -> Option<DefinitionKind> {
        self.kind.and_then(DefinitionKind::from_letter)
    }
}

/// Enclosing scope of a tag, e.g. `class:Widget`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScope {
    pub kind: String,
    pub name: String,
}

/// The kind of definition, as classified by ctags for C/C++
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Class,
    Macro,
    Enumerator,
    Function,
    Enum,
    Member,
    Namespace,
    Prototype,
    Struct,
    Typedef,
    Union,
    Variable,
    ExternVariable,
}

impl DefinitionKind {
    /// Map a ctags C/C++ kind letter
    pub fn from_letter(letter: char) -> Option<Self> {
        Some(match letter {
            'c' => DefinitionKind::Class,
            'd' => DefinitionKind::Macro,
            'e' => DefinitionKind::Enumerator,
            'f' => DefinitionKind::Function,
            'g' => DefinitionKind::Enum,
            'm' => DefinitionKind::Member,
            'n' => DefinitionKind::Namespace,
            'p' => DefinitionKind::Prototype,
            's' => DefinitionKind::Struct,
            't' => DefinitionKind::Typedef,
            'u' => DefinitionKind::Union,
            'v' => DefinitionKind::Variable,
            'x' => DefinitionKind::ExternVariable,
            _ => return None,
        })
    }

    /// Map a long kind name as written with `--fields=+K`
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "class" => DefinitionKind::Class,
            "macro" => DefinitionKind::Macro,
            "enumerator" => DefinitionKind::Enumerator,
            "function" => DefinitionKind::Function,
            "enum" => DefinitionKind::Enum,
            "member" => DefinitionKind::Member,
            "namespace" => DefinitionKind::Namespace,
            "prototype" => DefinitionKind::Prototype,
            "struct" => DefinitionKind::Struct,
            "typedef" => DefinitionKind::Typedef,
            "union" => DefinitionKind::Union,
            "variable" => DefinitionKind::Variable,
            "externvar" => DefinitionKind::ExternVariable,
            _ => return None,
        })
    }

    pub fn letter(&self) -> char {
        match self {
            DefinitionKind::Class => 'c',
            DefinitionKind::Macro => 'd',
            DefinitionKind::Enumerator => 'e',
            DefinitionKind::Function => 'f',
            DefinitionKind::Enum => 'g',
            DefinitionKind::Member => 'm',
            DefinitionKind::Namespace => 'n',
            DefinitionKind::Prototype => 'p',
            DefinitionKind::Struct => 's',
            DefinitionKind::Typedef => 't',
            DefinitionKind::Union => 'u',
            DefinitionKind::Variable => 'v',
            DefinitionKind::ExternVariable => 'x',
        }
    }

    /// Get the display name for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Class => "class",
            DefinitionKind::Macro => "macro",
            DefinitionKind::Enumerator => "enumerator",
            DefinitionKind::Function => "function",
            DefinitionKind::Enum => "enum",
            DefinitionKind::Member => "member",
            DefinitionKind::Namespace => "namespace",
            DefinitionKind::Prototype => "prototype",
            DefinitionKind::Struct => "struct",
            DefinitionKind::Typedef => "typedef",
            DefinitionKind::Union => "union",
            DefinitionKind::Variable => "variable",
            DefinitionKind::ExternVariable => "extern variable",
        }
    }
}

/// Parsed tags file
///
/// Maps each symbol to its definitions in tags-file order. The same symbol may
/// be defined several times (overloads, per-platform implementations, ...),
/// and all of them are kept.
#[derive(Debug, Default, Clone)]
pub struct TagsIndex {
    /// Map from symbol name to its records, in file order
    definitions: HashMap<String, Vec<TagRecord>>,
    record_count: usize,
    /// Lines skipped while parsing
    warnings: Vec<ParseWarning>,
}

impl TagsIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record after any existing records for the same symbol
    pub fn insert(&mut self, record: TagRecord) {
        self.definitions
            .entry(record.symbol.clone())
            .or_default()
            .push(record);
        self.record_count += 1;
    }

    pub(crate) fn push_warning(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    /// Look up the records for a symbol (exact, case-sensitive)
    pub fn lookup(&self, symbol: &str) -> &[TagRecord] {
        self.definitions
            .get(symbol)
            .map(|records| records.as_slice())
            .unwrap_or_default()
    }

    /// Look up records with a filter for kind
    pub fn lookup_by_kind(&self, symbol: &str, kind: DefinitionKind) -> Vec<&TagRecord> {
        self.lookup(symbol)
            .iter()
            .filter(|record| record.definition_kind() == Some(kind))
            .collect()
    }

    /// Get the number of distinct symbols
    pub fn symbol_count(&self) -> usize {
        self.definitions.len()
    }

    /// Get the total number of records (including multiple definitions for same symbol)
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Lines that were skipped while parsing
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Get all symbol names
    pub fn symbol_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(|s| s.as_str())
    }

    /// Distinct files referenced by the index
    pub fn files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = self
            .definitions
            .values()
            .flatten()
            .map(|record| record.path.as_path())
            .collect();
        files.sort();
        files.dedup();
        files
    }

    /// Search for symbols starting with a prefix, sorted by name
    pub fn search_prefix(&self, prefix: &str) -> Vec<(&str, &[TagRecord])> {
        let mut matches: Vec<(&str, &[TagRecord])> = self
            .definitions
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, records)| (name.as_str(), records.as_slice()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(b.0));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, path: &str, line: usize) -> TagRecord {
        TagRecord::new(symbol, path, AddressSpec::Numeric(line))
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut index = TagsIndex::new();
        index.insert(record("bar", "a.c", 3));
        index.insert(record("foo", "a.c", 7));
        index.insert(record("bar", "b.c", 10));

        let paths: Vec<_> = index.lookup("bar").iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("a.c"), PathBuf::from("b.c")]);
        assert_eq!(index.symbol_count(), 2);
        assert_eq!(index.record_count(), 3);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut index = TagsIndex::new();
        index.insert(record("Foo", "a.c", 1));

        assert_eq!(index.lookup("Foo").len(), 1);
        assert!(index.lookup("foo").is_empty());
        assert!(index.lookup("doesNotExist").is_empty());
    }

    #[test]
    fn test_lookup_by_kind() {
        let mut index = TagsIndex::new();
        let mut function = record("point", "a.c", 1);
        function.kind = Some('f');
        let mut structure = record("point", "a.h", 2);
        structure.kind = Some('s');
        index.insert(function);
        index.insert(structure);

        let structs = index.lookup_by_kind("point", DefinitionKind::Struct);
        assert_eq!(structs.len(), 1);
        assert_eq!(structs[0].path, PathBuf::from("a.h"));
    }

    #[test]
    fn test_search_prefix_and_files() {
        let mut index = TagsIndex::new();
        index.insert(record("list_push", "list.c", 1));
        index.insert(record("list_pop", "list.c", 9));
        index.insert(record("map_get", "map.c", 4));

        let names: Vec<_> = index.search_prefix("list_").iter().map(|m| m.0).collect();
        assert_eq!(names, vec!["list_pop", "list_push"]);
        assert_eq!(index.files(), vec![Path::new("list.c"), Path::new("map.c")]);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DefinitionKind::from_letter('f'), Some(DefinitionKind::Function));
        assert_eq!(DefinitionKind::from_name("struct"), Some(DefinitionKind::Struct));
        assert_eq!(DefinitionKind::from_name("externvar").map(|k| k.letter()), Some('x'));
        assert_eq!(DefinitionKind::from_letter('z'), None);
        assert_eq!(DefinitionKind::Macro.as_str(), "macro");
    }
}
