//! Input file formats.

use std::fmt;

use itertools::Itertools;
use thiserror::Error;

pub mod tiga;

use self::tiga::grammar::NodeKind;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The input does not derive from the grammar.
    ///
    /// Reports the farthest position any rule reached together with everything that
    /// would have been accepted there.
    #[error("Syntax error at line {line}, column {column}: expected {expected}.")]
    Syntax {
        offset: usize,
        line: usize,
        column: usize,
        expected: String,
    },
    /// A reduction received children the grammar can never produce.
    #[error("Malformed `{node:?}` node: {detail}.")]
    Internal { node: NodeKind, detail: String },
    #[error("Integer literal `{literal}` does not fit into 64 bits.")]
    IntegerRange { literal: String },
}

impl ParseError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, ParseError::Syntax { .. })
    }
}

/// Something a grammar rule looked for at a given position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Expected {
    Tag(&'static str),
    Class(&'static str),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Tag(tag) => write!(f, "{tag:?}"),
            Expected::Class(class) => write!(f, "{class}"),
        }
    }
}

/// Whitespace sensitive scanner with backtracking.
///
/// Failed matches never move the cursor. The farthest failure is remembered so that a
/// rejected input can be reported at the point where matching actually got stuck.
pub(crate) struct Cursor<'i> {
    input: &'i str,
    position: usize,
    farthest: usize,
    expected: Vec<Expected>,
}

impl<'i> Cursor<'i> {
    pub fn new(input: &'i str) -> Self {
        Self {
            input,
            position: 0,
            farthest: 0,
            expected: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn reset(&mut self, position: usize) {
        self.position = position;
    }

    pub fn tail(&self) -> &'i str {
        &self.input[self.position..]
    }

    /// The input consumed since *start*.
    pub fn slice(&self, start: usize) -> &'i str {
        &self.input[start..self.position]
    }

    pub fn is_at_end(&self) -> bool {
        self.position == self.input.len()
    }

    pub fn fail(&mut self, expected: Expected) {
        if self.position > self.farthest {
            self.farthest = self.position;
            self.expected.clear();
        }
        if self.position == self.farthest && !self.expected.contains(&expected) {
            self.expected.push(expected);
        }
    }

    pub fn consume_tag(&mut self, tag: &'static str) -> Option<&'i str> {
        if self.tail().starts_with(tag) {
            let start = self.position;
            self.position += tag.len();
            Some(self.slice(start))
        } else {
            self.fail(Expected::Tag(tag));
            None
        }
    }

    /// Consumes the longest prefix of characters satisfying *predicate*, possibly empty.
    pub fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> &'i str {
        let start = self.position;
        let length = self
            .tail()
            .char_indices()
            .find(|(_, c)| !predicate(*c))
            .map_or(self.tail().len(), |(idx, _)| idx);
        self.position += length;
        self.slice(start)
    }

    /// Like [Cursor::consume_while] but at least one character must match.
    pub fn consume_some(
        &mut self,
        predicate: impl Fn(char) -> bool,
        expected: &'static str,
    ) -> Option<&'i str> {
        let consumed = self.consume_while(predicate);
        if consumed.is_empty() {
            self.fail(Expected::Class(expected));
            None
        } else {
            Some(consumed)
        }
    }

    pub fn consume_whitespace(&mut self) -> &'i str {
        self.consume_while(char::is_whitespace)
    }

    pub fn consume_newline(&mut self) -> Option<&'i str> {
        let start = self.position;
        if self.tail().starts_with("\r\n") {
            self.position += 2;
        } else if self.tail().starts_with('\n') {
            self.position += 1;
        } else {
            self.fail(Expected::Class("newline"));
            return None;
        }
        Some(self.slice(start))
    }

    /// Consumes an optionally negated decimal integer.
    pub fn consume_number(&mut self) -> Option<&'i str> {
        let start = self.position;
        if self.tail().starts_with('-') {
            self.position += 1;
        }
        if self.consume_some(|c| c.is_ascii_digit(), "integer").is_some() {
            Some(self.slice(start))
        } else {
            self.reset(start);
            None
        }
    }

    /// Builds the syntax error for the farthest failure seen so far.
    pub fn error(&self) -> ParseError {
        let prefix = &self.input[..self.farthest];
        let line = prefix.matches('\n').count() + 1;
        let column = prefix
            .rsplit_once('\n')
            .map_or(prefix, |(_, last)| last)
            .chars()
            .count()
            + 1;
        let expected = if self.expected.is_empty() {
            "valid input".to_owned()
        } else {
            self.expected.iter().join(" or ")
        };
        ParseError::Syntax {
            offset: self.farthest,
            line,
            column,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_tag_does_not_move() {
        let mut cursor = Cursor::new("State: (A )");
        assert!(cursor.consume_tag("Initial").is_none());
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.consume_tag("State:"), Some("State:"));
        assert_eq!(cursor.consume_whitespace(), " ");
        assert_eq!(cursor.tail(), "(A )");
    }

    #[test]
    fn numbers_may_be_negative() {
        let mut cursor = Cursor::new("-12 x");
        assert_eq!(cursor.consume_number(), Some("-12"));
        let mut cursor = Cursor::new("-x");
        assert_eq!(cursor.consume_number(), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn newline_accepts_carriage_return() {
        let mut cursor = Cursor::new("\r\nx");
        assert_eq!(cursor.consume_newline(), Some("\r\n"));
        assert!(cursor.consume_newline().is_none());
    }

    #[test]
    fn error_reports_farthest_failure() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.consume_tag("ab");
        cursor.consume_newline();
        cursor.consume_tag("c");
        cursor.fail(Expected::Tag("e"));
        cursor.reset(0);
        cursor.fail(Expected::Tag("x"));
        cursor.reset(4);
        cursor.fail(Expected::Class("digit"));
        match cursor.error() {
            ParseError::Syntax {
                offset,
                line,
                column,
                expected,
            } => {
                assert_eq!(offset, 4);
                assert_eq!(line, 2);
                assert_eq!(column, 2);
                assert_eq!(expected, "\"e\" or digit");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
