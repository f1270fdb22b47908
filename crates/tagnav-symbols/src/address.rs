//! Tag address specifications
//!
//! The third field of a tags line locates the definition either by a 1-based
//! line number or by an ex-mode search command such as `/^int main(void)$/`.

use std::fmt;

/// How a tag locates its definition inside the referenced file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AddressSpec {
    /// 1-based line number, as stored in the tags file
    Numeric(usize),
    /// Literal search pattern with optional line anchors
    Pattern(SearchPattern),
}

/// An unescaped ex-mode search pattern
///
/// ctags writes patterns as escaped literals, so matching is plain text
/// comparison rather than regular expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchPattern {
    pub text: String,
    pub anchored_start: bool,
    pub anchored_end: bool,
}

impl SearchPattern {
    pub fn new(text: impl Into<String>, anchored_start: bool, anchored_end: bool) -> Self {
        Self {
            text: text.into(),
            anchored_start,
            anchored_end,
        }
    }

    /// Build a pattern from the raw text between the delimiters of an ex search
    pub(crate) fn from_raw(raw: &str, delimiter: char) -> Self {
        let mut body = raw;

        let anchored_start = body.starts_with('^');
        if anchored_start {
            body = &body[1..];
        }

        let anchored_end = body.ends_with('$') && !ends_with_escape(&body[..body.len() - 1]);
        if anchored_end {
            body = &body[..body.len() - 1];
        }

        Self {
            text: unescape(body, delimiter),
            anchored_start,
            anchored_end,
        }
    }

    /// Check whether a single line (without its terminator) satisfies the pattern
    pub fn matches(&self, line: &str) -> bool {
        match (self.anchored_start, self.anchored_end) {
            (true, true) => line == self.text,
            (true, false) => line.starts_with(&self.text),
            (false, true) => line.ends_with(&self.text),
            (false, false) => line.contains(&self.text),
        }
    }
}

impl fmt::Display for SearchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.anchored_start {
            f.write_str("^")?;
        }
        f.write_str(&self.text)?;
        if self.anchored_end {
            f.write_str("$")?;
        }
        Ok(())
    }
}

impl fmt::Display for AddressSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressSpec::Numeric(line) => write!(f, "{}", line),
            AddressSpec::Pattern(pattern) => write!(f, "/{}/", pattern),
        }
    }
}

/// Whether `text` ends in an odd number of backslashes (escaping whatever follows)
fn ends_with_escape(text: &str) -> bool {
    text.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Undo ctags escaping of the delimiter, `/`, `?` and `\`
///
/// Any other backslash sequence is kept verbatim.
fn unescape(body: &str, delimiter: char) -> String {
    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if next == '\\' || next == '/' || next == '?' || next == delimiter => {
                text.push(next)
            }
            Some(next) => {
                text.push('\\');
                text.push(next);
            }
            None => text.push('\\'),
        }
    }

    text
}
