//! Symbol under the cursor
//!
//! Finds the identifier to look up in the tags index for a position in C/C++
//! source. tree-sitter classifies the node at the cursor; when it cannot
//! (broken code, non-C text) a plain identifier scan is used instead.

use tree_sitter::{Node, Parser, Point, TreeCursor};

/// The identifier found at a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySymbol {
    /// The name to look up (e.g. "vector" from "std::vector")
    pub name: String,
    /// The full text around the name (e.g. "std::vector")
    pub qualified: String,
    /// Byte range of `qualified` in the source
    pub byte_range: std::ops::Range<usize>,
    pub kind: QuerySymbolKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySymbolKind {
    TypeIdentifier,
    QualifiedName,
    Namespace,
    Identifier,
    FieldIdentifier,
    /// Found by the lexical fallback
    Word,
}

const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "auto", "bool", "break", "case", "catch", "char", "class", "const",
    "constexpr", "continue", "decltype", "default", "delete", "do", "double", "else", "enum",
    "explicit", "extern", "false", "float", "for", "friend", "goto", "if", "inline", "int",
    "long", "mutable", "namespace", "new", "noexcept", "nullptr", "operator", "private",
    "protected", "public", "register", "return", "short", "signed", "sizeof", "static",
    "struct", "switch", "template", "this", "throw", "true", "try", "typedef", "typename",
    "union", "unsigned", "using", "virtual", "void", "volatile", "while",
];

/// Safely extract a string slice from content using a byte range
fn safe_slice(content: &str, range: std::ops::Range<usize>) -> Option<&str> {
    content.get(range)
}

/// Find the symbol to look up at a byte offset in C/C++ code
///
/// Primitive types and keywords yield `None`.
pub fn symbol_at_offset(content: &str, byte_offset: usize) -> Option<QuerySymbol> {
    if content.is_empty() || byte_offset >= content.len() || content.as_bytes().contains(&0) {
        return None;
    }

    match syntax_symbol(content, byte_offset) {
        Some(found) => found,
        None => word_at_offset(content, byte_offset),
    }
}

/// `Some(None)` means the syntax tree positively rules out a symbol here
fn syntax_symbol(content: &str, byte_offset: usize) -> Option<Option<QuerySymbol>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_cpp::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(content, None)?;

    let mut cursor = tree.walk();
    descend_to_point(&mut cursor, offset_to_point(content, byte_offset));

    loop {
        let node = cursor.node();
        match node.kind() {
            "primitive_type" | "sized_type_specifier" => return Some(None),
            "type_identifier" => {
                return Some(simple(content, node, QuerySymbolKind::TypeIdentifier));
            }
            "namespace_identifier" => {
                return Some(simple(content, node, QuerySymbolKind::Namespace));
            }
            "field_identifier" => {
                return Some(simple(content, node, QuerySymbolKind::FieldIdentifier));
            }
            "identifier" => return Some(simple(content, node, QuerySymbolKind::Identifier)),
            "qualified_identifier" => return Some(qualified(content, node)),
            "ERROR" => return None,
            _ => {}
        }

        if !cursor.goto_parent() {
            return None;
        }
    }
}

fn simple(content: &str, node: Node<'_>, kind: QuerySymbolKind) -> Option<QuerySymbol> {
    let name = safe_slice(content, node.byte_range())?.to_string();

    // A name inside `ns::name` or `ns::name<T>` keeps the qualified text for display.
    let mut outermost = None;
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "qualified_identifier" => outermost = Some(parent),
            "template_type" | "template_function" => {}
            _ => break,
        }
        current = parent;
    }

    if let Some(outer) = outermost {
        if let Some(full) = safe_slice(content, outer.byte_range()) {
            return Some(QuerySymbol {
                name,
                qualified: full.to_string(),
                byte_range: outer.byte_range(),
                kind,
            });
        }
    }

    Some(QuerySymbol {
        qualified: name.clone(),
        name,
        byte_range: node.byte_range(),
        kind,
    })
}

fn qualified(content: &str, node: Node<'_>) -> Option<QuerySymbol> {
    let full_text = safe_slice(content, node.byte_range())?.to_string();
    let name = node
        .child_by_field_name("name")
        .and_then(|name_node| safe_slice(content, name_node.byte_range()))
        .map(|name| name.split('<').next().unwrap_or(name).trim().to_string())
        .unwrap_or_else(|| full_text.rsplit("::").next().unwrap_or(&full_text).to_string());

    Some(QuerySymbol {
        name,
        qualified: full_text,
        byte_range: node.byte_range(),
        kind: QuerySymbolKind::QualifiedName,
    })
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Lexical fallback: the `[A-Za-z0-9_]+` run around the offset
fn word_at_offset(content: &str, byte_offset: usize) -> Option<QuerySymbol> {
    let bytes = content.as_bytes();
    if !is_ident_byte(bytes[byte_offset]) {
        return None;
    }

    let start = bytes[..byte_offset]
        .iter()
        .rposition(|&b| !is_ident_byte(b))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let end = bytes[byte_offset..]
        .iter()
        .position(|&b| !is_ident_byte(b))
        .map(|idx| byte_offset + idx)
        .unwrap_or(bytes.len());

    let word = safe_slice(content, start..end)?;
    if word.as_bytes()[0].is_ascii_digit() || KEYWORDS.contains(&word) {
        return None;
    }

    Some(QuerySymbol {
        name: word.to_string(),
        qualified: word.to_string(),
        byte_range: start..end,
        kind: QuerySymbolKind::Word,
    })
}

/// Convert a byte offset to a tree-sitter Point (row, column)
fn offset_to_point(content: &str, byte_offset: usize) -> Point {
    let prefix = &content.as_bytes()[..byte_offset.min(content.len())];
    let row = prefix.iter().filter(|&&b| b == b'\n').count();
    let last_newline = prefix
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    Point::new(row, byte_offset.saturating_sub(last_newline))
}

/// Descend the tree cursor to the deepest node containing the given point
fn descend_to_point(cursor: &mut TreeCursor, point: Point) {
    while cursor.goto_first_child() {
        let mut found_child = false;
        loop {
            let node = cursor.node();
            let (start, end) = (node.start_position(), node.end_position());
            if (start.row, start.column) <= (point.row, point.column)
                && (point.row, point.column) < (end.row, end.column)
            {
                found_child = true;
                break;
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }

        if !found_child {
            cursor.goto_parent();
            break;
        }
    }
}

/// Get the byte offset for a given line and column in content
///
/// # Arguments
/// * `content` - The source code content
/// * `line` - 1-indexed line number
/// * `column` - 0-indexed column number, in characters
///
/// # Returns
/// `Some(offset)` if the line exists; columns past the end clamp to the line end
pub fn line_column_to_byte_offset(content: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }

    let mut line_start = 0;
    for _ in 1..line {
        let newline = content[line_start..].find('\n')?;
        line_start += newline + 1;
    }

    let line_text = content[line_start..]
        .split('\n')
        .next()
        .unwrap_or_default();
    let offset = line_text
        .char_indices()
        .nth(column)
        .map(|(idx, _)| idx)
        .unwrap_or(line_text.len());
    Some(line_start + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_type_identifier() {
        let content = "MyStruct foo;";
        let symbol = symbol_at_offset(content, 0).unwrap();
        assert_eq!(symbol.name, "MyStruct");
        assert_eq!(symbol.kind, QuerySymbolKind::TypeIdentifier);
    }

    #[test]
    fn test_find_qualified_type() {
        let content = "std::vector<int> v;";
        // Position in the middle of "vector"
        let symbol = symbol_at_offset(content, 6).unwrap();
        assert_eq!(symbol.name, "vector");
        assert!(symbol.qualified.starts_with("std::vector"));
    }

    #[test]
    fn test_primitive_type_returns_none() {
        assert!(symbol_at_offset("int x;", 0).is_none());
    }

    #[test]
    fn test_function_call_identifier() {
        let content = "void run(void) {\n  helper(1);\n}\n";
        let offset = content.find("helper").unwrap() + 2;
        let symbol = symbol_at_offset(content, offset).unwrap();
        assert_eq!(symbol.name, "helper");
    }

    #[test]
    fn test_method_impl_class_name() {
        let content = "void foo::bar() { }";
        let symbol = symbol_at_offset(content, 5).unwrap();
        assert!(
            symbol.name == "foo" || symbol.qualified.contains("foo"),
            "Expected 'foo' but got name={}, qualified={}",
            symbol.name,
            symbol.qualified
        );
    }

    #[test]
    fn test_out_of_bounds_and_whitespace() {
        assert!(symbol_at_offset("", 0).is_none());
        assert!(symbol_at_offset("foo", 3).is_none());
        assert!(symbol_at_offset("a  b", 1).is_none());
    }

    #[test]
    fn test_word_fallback() {
        let symbol = word_at_offset("  call_me(now);", 4).unwrap();
        assert_eq!(symbol.name, "call_me");
        assert_eq!(symbol.byte_range, 2..9);
        assert_eq!(symbol.kind, QuerySymbolKind::Word);

        assert!(word_at_offset("return 1;", 2).is_none());
        assert!(word_at_offset("x = 42;", 5).is_none());
    }

    #[test]
    fn test_line_column_to_offset() {
        let content = "line1\nline2\nline3";
        assert_eq!(line_column_to_byte_offset(content, 1, 0), Some(0));
        assert_eq!(line_column_to_byte_offset(content, 1, 2), Some(2));
        assert_eq!(line_column_to_byte_offset(content, 2, 2), Some(8));
        assert_eq!(line_column_to_byte_offset(content, 3, 0), Some(12));
        assert_eq!(line_column_to_byte_offset(content, 2, 99), Some(11));
    }

    #[test]
    fn test_line_column_invalid_line() {
        let content = "line1\nline2";
        assert_eq!(line_column_to_byte_offset(content, 0, 0), None);
        assert_eq!(line_column_to_byte_offset(content, 5, 0), None);
    }

    #[test]
    fn test_offset_to_point() {
        let point = offset_to_point("line1\nline2\nline3", 6);
        assert_eq!(point.row, 1);
        assert_eq!(point.column, 0);
    }
}
