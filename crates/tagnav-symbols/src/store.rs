//! Index store with atomic replacement
//!
//! Readers take an `Arc` snapshot and keep using it for the whole lookup, so a
//! concurrent [`IndexStore::swap`] never exposes a half-built index.

use crate::index::{DefinitionKind, TagRecord, TagsIndex};
use crate::resolver::{ResolveBatch, ResolvedLocation};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// One complete, immutable version of the index
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    index: TagsIndex,
    generation: u64,
}

impl IndexSnapshot {
    pub fn index(&self) -> &TagsIndex {
        &self.index
    }

    /// 0 for the initial empty snapshot, then incremented on every swap
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lookup(&self, symbol: &str) -> &[TagRecord] {
        self.index.lookup(symbol)
    }

    /// Resolve every definition of `symbol`, dropping records that fail
    ///
    /// Results keep tags-file order. Relative record paths are taken from
    /// `root`. Source files are read again on every call, so a file edited or
    /// deleted since the last lookup drops its record.
    pub fn resolve(&self, root: &Path, symbol: &str) -> Vec<ResolvedLocation> {
        resolve_records(root, symbol, self.index.lookup(symbol))
    }

    /// Like [`Self::resolve`], keeping only records of one kind
    pub fn resolve_kind(
        &self,
        root: &Path,
        symbol: &str,
        kind: DefinitionKind,
    ) -> Vec<ResolvedLocation> {
        resolve_records(root, symbol, self.index.lookup_by_kind(symbol, kind))
    }
}

fn resolve_records<'a>(
    root: &Path,
    symbol: &str,
    records: impl IntoIterator<Item = &'a TagRecord>,
) -> Vec<ResolvedLocation> {
    let mut batch = ResolveBatch::new(root);
    let mut locations = Vec::new();

    for record in records {
        match batch.resolve_record(record) {
            Ok(location) => {
                tracing::debug!("\"{}\" matches {}", symbol, location);
                locations.push(location);
            }
            Err(err) => {
                tracing::debug!("Dropping stale tag for \"{}\": {}", symbol, err);
            }
        }
    }

    if batch.cached_files() > 0 {
        tracing::debug!(
            "Resolved \"{}\" from {} source files",
            symbol,
            batch.cached_files()
        );
    }
    locations
}

/// Holder of the current index for one workspace
#[derive(Debug, Default)]
pub struct IndexStore {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl IndexStore {
    /// Create a store holding an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot
    pub fn get(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replace the index; every later `get` sees the new one
    ///
    /// The generation is numbered under the write lock, so installs are
    /// numbered in the order readers observe them.
    pub fn swap(&self, index: TagsIndex) -> Arc<IndexSnapshot> {
        let mut current = self.current.write();
        let snapshot = Arc::new(IndexSnapshot {
            index,
            generation: current.generation + 1,
        });
        *current = Arc::clone(&snapshot);
        snapshot
    }

    /// Records for `symbol` in the current snapshot
    pub fn lookup(&self, symbol: &str) -> Vec<TagRecord> {
        self.get().lookup(symbol).to_vec()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().generation > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_starts_empty() {
        let store = IndexStore::new();
        assert!(!store.is_loaded());
        assert_eq!(store.get().generation(), 0);
        assert!(store.lookup("main").is_empty());
    }

    #[test]
    fn test_swap_is_visible_to_later_reads() {
        let store = IndexStore::new();
        let before = store.get();

        store.swap(parse("main\tmain.c\t1\n").unwrap());

        assert!(store.is_loaded());
        assert_eq!(store.get().generation(), 1);
        assert_eq!(store.lookup("main").len(), 1);
        // A snapshot taken earlier keeps seeing the old index.
        assert!(before.lookup("main").is_empty());
    }

    #[test]
    fn test_resolve_drops_stale_records_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.c"), "int helper(void)\n{\n}\n").unwrap();
        fs::write(dir.path().join("b.c"), "// helper moved away\n").unwrap();

        let store = IndexStore::new();
        store.swap(
            parse(
                "helper\ta.c\t/^int helper(void)$/;\"\tf\n\
                 helper\tb.c\t/^int helper(void)$/;\"\tf\n\
                 helper\tmissing.c\t7;\"\tf\n",
            )
            .unwrap(),
        );

        let locations = store.get().resolve(dir.path(), "helper");
        assert_eq!(
            locations,
            vec![ResolvedLocation {
                path: dir.path().join("a.c"),
                lineno: 0
            }]
        );
    }

    #[test]
    fn test_edited_or_deleted_file_drops_record_on_next_resolve() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.c");
        fs::write(&file, "\nint value;\n").unwrap();

        let store = IndexStore::new();
        store.swap(parse("value\ta.c\t/^int value;$/;\"\tv\n").unwrap());
        let snapshot = store.get();
        assert_eq!(snapshot.resolve(dir.path(), "value")[0].lineno, 1);

        fs::write(&file, "int value;\n").unwrap();
        assert_eq!(snapshot.resolve(dir.path(), "value")[0].lineno, 0);

        fs::write(&file, "long value;\n").unwrap();
        assert!(snapshot.resolve(dir.path(), "value").is_empty());

        fs::remove_file(&file).unwrap();
        assert!(snapshot.resolve(dir.path(), "value").is_empty());
    }

    #[test]
    fn test_generations_follow_install_order() {
        let store = Arc::new(IndexStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.swap(parse("main\tmain.c\t1\n").unwrap()))
            })
            .collect();
        let mut generations: Vec<u64> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().generation())
            .collect();
        generations.sort();

        assert_eq!(generations, (1..=8).collect::<Vec<_>>());
        assert_eq!(store.get().generation(), 8);
    }

    #[test]
    fn test_resolve_kind_filters_records() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("point.h"), "struct point {\n};\nint point(void);\n").unwrap();

        let store = IndexStore::new();
        store.swap(
            parse(
                "point\tpoint.h\t/^struct point {$/;\"\ts\n\
                 point\tpoint.h\t/^int point(void);$/;\"\tp\n",
            )
            .unwrap(),
        );

        let structs = store
            .get()
            .resolve_kind(dir.path(), "point", DefinitionKind::Struct);
        assert_eq!(
            structs,
            vec![ResolvedLocation {
                path: dir.path().join("point.h"),
                lineno: 0
            }]
        );
    }
}
