//! Tags file parser
//!
//! Reads the exuberant-tags format written by `ctags`:
//!
//! ```text
//! !_TAG_FILE_FORMAT	2	/extended format/
//! main	src/main.c	/^int main(void)$/;"	f	line:12
//! MAX_LEN	src/util.h	4;"	d
//! ```
//!
//! Lines that cannot be understood are skipped and recorded as warnings so a
//! single bad entry never costs the whole index.

use crate::address::{AddressSpec, SearchPattern};
use crate::index::{DefinitionKind, TagRecord, TagScope, TagsIndex};
use crate::{ParseError, Result};
use std::fmt;
use std::io;
use std::path::Path;

const METADATA_PREFIX: &str = "!_TAG_";
const EXTENSION_MARKER: &str = ";\"";
const SCOPE_KEYS: &[&str] = &["class", "struct", "namespace", "union", "enum", "function"];

/// A tags-file line that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number in the tags file
    pub line_number: usize,
    pub reason: LineError,
}

/// Why a tags-file line was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    WrongFieldCount,
    EmptyField,
    UnterminatedPattern,
    InvalidAddress,
    TrailingGarbage,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LineError::WrongFieldCount => "expected symbol, path and address fields",
            LineError::EmptyField => "empty symbol or path",
            LineError::UnterminatedPattern => "unterminated search pattern",
            LineError::InvalidAddress => "address is neither a line number nor a pattern",
            LineError::TrailingGarbage => "unexpected text after the address",
        };
        f.write_str(text)
    }
}

/// Parse tags-file content into an index
///
/// Fails with [`ParseError::NoRecords`] when no line yields a record, which
/// callers treat as "no usable index".
pub fn parse(content: &str) -> Result<TagsIndex> {
    let mut index = TagsIndex::new();

    for (idx, line) in content.lines().enumerate() {
        if line.is_empty() || line.starts_with(METADATA_PREFIX) {
            continue;
        }
        match parse_line(line) {
            Ok(record) => index.insert(record),
            Err(reason) => {
                let line_number = idx + 1;
                tracing::debug!("Skipping tags line {}: {}", line_number, reason);
                index.push_warning(ParseWarning {
                    line_number,
                    reason,
                });
            }
        }
    }

    let skipped = index.warnings().len();
    if index.is_empty() {
        return Err(ParseError::NoRecords { skipped });
    }
    if skipped > 0 {
        tracing::warn!(
            "Skipped {} malformed tags lines ({} records loaded)",
            skipped,
            index.record_count()
        );
    }

    Ok(index)
}

/// Read and parse a tags file from disk
pub fn load_tags_file(path: &Path) -> Result<TagsIndex> {
    let bytes = std::fs::read(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            ParseError::Missing(path.to_path_buf())
        } else {
            ParseError::Unreadable {
                path: path.to_path_buf(),
                source: err,
            }
        }
    })?;

    let index = parse(&String::from_utf8_lossy(&bytes))?;
    tracing::info!(
        "Loaded {} tags for {} symbols from {}",
        index.record_count(),
        index.symbol_count(),
        path.display()
    );
    Ok(index)
}

fn parse_line(line: &str) -> std::result::Result<TagRecord, LineError> {
    // Patterns may contain tabs, so only the first two separate fields.
    let mut fields = line.splitn(3, '\t');
    let (Some(symbol), Some(path), Some(rest)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(LineError::WrongFieldCount);
    };
    if symbol.is_empty() || path.is_empty() {
        return Err(LineError::EmptyField);
    }

    let (address, rest) = split_address(rest)?;
    let mut record = TagRecord::new(symbol, path, address);

    if let Some(extensions) = rest.strip_prefix(EXTENSION_MARKER) {
        apply_extension_fields(&mut record, extensions);
    } else if !rest.is_empty() {
        return Err(LineError::TrailingGarbage);
    }

    Ok(record)
}

/// Split the address off the front of the third field
fn split_address(field: &str) -> std::result::Result<(AddressSpec, &str), LineError> {
    let Some(first) = field.chars().next() else {
        return Err(LineError::InvalidAddress);
    };

    match first {
        '0'..='9' => {
            let end = field
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(field.len());
            let line = field[..end]
                .parse::<usize>()
                .map_err(|_| LineError::InvalidAddress)?;
            Ok((AddressSpec::Numeric(line), &field[end..]))
        }
        '/' | '?' => {
            let body = &field[1..];
            let close = find_closing_delimiter(body, first).ok_or(LineError::UnterminatedPattern)?;
            let pattern = SearchPattern::from_raw(&body[..close], first);
            Ok((AddressSpec::Pattern(pattern), &body[close + 1..]))
        }
        _ => Err(LineError::InvalidAddress),
    }
}

/// Byte offset of the first unescaped `delimiter` in `body`
fn find_closing_delimiter(body: &str, delimiter: char) -> Option<usize> {
    let mut escaped = false;
    for (offset, c) in body.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delimiter {
            return Some(offset);
        }
    }
    None
}

/// Best-effort parse of the tab-separated fields after `;"`
fn apply_extension_fields(record: &mut TagRecord, extensions: &str) {
    for field in extensions.split('\t').filter(|field| !field.is_empty()) {
        let Some((key, value)) = field.split_once(':') else {
            record.kind = kind_from_field(field).or(record.kind);
            continue;
        };

        match key {
            "kind" => record.kind = kind_from_field(value).or(record.kind),
            "line" => record.line_hint = value.parse().ok(),
            "signature" => record.signature = Some(value.to_string()),
            _ if SCOPE_KEYS.contains(&key) => {
                record.scope = Some(TagScope {
                    kind: key.to_string(),
                    name: value.to_string(),
                });
            }
            _ => {}
        }
    }
}

fn kind_from_field(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Some(letter),
        (Some(_), Some(_)) => DefinitionKind::from_name(value).map(|kind| kind.letter()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_metadata_lines_are_ignored() {
        let content = "!_TAG_FILE_FORMAT\t2\t/extended format/\n\
                       !_TAG_FILE_SORTED\t1\t/0=unsorted/\n\
                       main\tmain.c\t3;\"\tf\n";
        let index = parse(content).unwrap();
        assert_eq!(index.record_count(), 1);
        assert!(index.warnings().is_empty());
    }

    #[test]
    fn test_numeric_address() {
        let index = parse("MAX_LEN\tutil.h\t4;\"\td\n").unwrap();
        let record = &index.lookup("MAX_LEN")[0];
        assert_eq!(record.address, AddressSpec::Numeric(4));
        assert_eq!(record.path, PathBuf::from("util.h"));
        assert_eq!(record.definition_kind(), Some(DefinitionKind::Macro));
    }

    #[test]
    fn test_numeric_address_without_extensions() {
        let index = parse("MAX_LEN\tutil.h\t4\n").unwrap();
        assert_eq!(index.lookup("MAX_LEN")[0].address, AddressSpec::Numeric(4));
        assert_eq!(index.lookup("MAX_LEN")[0].kind, None);
    }

    #[test]
    fn test_pattern_address_with_extension_fields() {
        let content = "area\tshape.cpp\t/^double Circle::area() const$/;\"\tf\tline:12\tclass:Circle\tsignature:() const\n";
        let index = parse(content).unwrap();
        let record = &index.lookup("area")[0];

        assert_eq!(
            record.address,
            AddressSpec::Pattern(SearchPattern::new("double Circle::area() const", true, true))
        );
        assert_eq!(record.kind, Some('f'));
        assert_eq!(record.line_hint, Some(12));
        assert_eq!(
            record.scope,
            Some(TagScope {
                kind: "class".into(),
                name: "Circle".into()
            })
        );
        assert_eq!(record.signature.as_deref(), Some("() const"));
    }

    #[test]
    fn test_long_kind_names() {
        let index = parse("Point\tgeo.h\t/^struct Point {$/;\"\tkind:struct\n").unwrap();
        assert_eq!(index.lookup("Point")[0].kind, Some('s'));

        let index = parse("Point\tgeo.h\t/^struct Point {$/;\"\tstruct\n").unwrap();
        assert_eq!(index.lookup("Point")[0].kind, Some('s'));
    }

    #[test]
    fn test_pattern_containing_tabs_and_escapes() {
        let content = "ratio\tmath.c\t/^int\tratio(int a, int b) { return a \\/ b; }$/;\"\tf\n";
        let index = parse(content).unwrap();
        match &index.lookup("ratio")[0].address {
            AddressSpec::Pattern(pattern) => {
                assert_eq!(pattern.text, "int\tratio(int a, int b) { return a / b; }")
            }
            other => panic!("expected pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_backward_search_pattern() {
        let index = parse("flag\tf.c\t?^static int flag;$?;\"\tv\n").unwrap();
        assert_eq!(
            index.lookup("flag")[0].address,
            AddressSpec::Pattern(SearchPattern::new("static int flag;", true, true))
        );
    }

    #[test]
    fn test_malformed_lines_are_skipped_with_warnings() {
        let content = "good\ta.c\t1;\"\tf\n\
                       missing_fields\ta.c\n\
                       \tempty.c\t2\n\
                       open\ta.c\t/^int open(\n\
                       weird\ta.c\tsomewhere\n\
                       junk\ta.c\t7xyz\n\
                       also_good\tb.c\t/^int also_good;$/\n";
        let index = parse(content).unwrap();

        assert_eq!(index.record_count(), 2);
        let reasons: Vec<_> = index
            .warnings()
            .iter()
            .map(|w| (w.line_number, w.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                (2, LineError::WrongFieldCount),
                (3, LineError::EmptyField),
                (4, LineError::UnterminatedPattern),
                (5, LineError::InvalidAddress),
                (6, LineError::TrailingGarbage),
            ]
        );
    }

    #[test]
    fn test_zero_records_is_an_error() {
        let err = parse("!_TAG_FILE_FORMAT\t2\t/extended format/\nbroken\n").unwrap_err();
        assert!(matches!(err, ParseError::NoRecords { skipped: 1 }));

        assert!(matches!(parse(""), Err(ParseError::NoRecords { skipped: 0 })));
    }

    #[test]
    fn test_multiple_definitions_keep_file_order() {
        let content = "bar\ta.c\t3;\"\tf\nbar\tb.c\t10;\"\tf\n";
        let index = parse(content).unwrap();
        let locations: Vec<_> = index
            .lookup("bar")
            .iter()
            .map(|r| (r.path.clone(), r.address.clone()))
            .collect();
        assert_eq!(
            locations,
            vec![
                (PathBuf::from("a.c"), AddressSpec::Numeric(3)),
                (PathBuf::from("b.c"), AddressSpec::Numeric(10)),
            ]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let index = parse("main\tmain.c\t/^int main(void)$/;\"\tf\r\n").unwrap();
        assert_eq!(index.lookup("main")[0].kind, Some('f'));
    }

    #[test]
    fn test_load_tags_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tags");

        let err = load_tags_file(&path).unwrap_err();
        assert!(matches!(err, ParseError::Missing(_)));

        std::fs::write(&path, b"caf\xe9\tmenu.c\t1;\"\tv\nmain\tmain.c\t2\n").unwrap();
        let index = load_tags_file(&path).unwrap();
        assert_eq!(index.record_count(), 2);
        assert_eq!(index.lookup("main").len(), 1);
    }
}
