use std::io;

use thiserror::Error;

/// A failed parse. Every grammar failure carries the 0-based index of the
/// line it was detected on.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read input")]
    Read(#[from] io::Error),

    /// A `Key=Value` line appeared before any section header.
    #[error("key outside of section on line {line}")]
    SectionlessKey { line: usize },

    /// A section header or `Key=Value` line interrupted an unfinished
    /// multiline value; `line` points at the unterminated fragment.
    #[error("incomplete multiline value on line {line}")]
    IncompleteMultiline { line: usize },

    /// A non-blank line that matches nothing in the grammar.
    #[error("syntax error {text:?} on line {line}")]
    Syntax { text: String, line: usize },
}

impl ParseError {
    /// The 0-based line number, for failures that came from the grammar
    /// rather than from the underlying reader.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match *self {
            Self::Read(_) => None,
            Self::SectionlessKey { line }
            | Self::IncompleteMultiline { line }
            | Self::Syntax { line, .. } => Some(line),
        }
    }
}
