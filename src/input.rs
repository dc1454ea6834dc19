// Copyright (c) 2018 Fabian Schuiki

//! Character sources for the parser.

use std::fmt;
use std::str::Chars;

use crate::codepoint::CodePoint;

/// A stream of characters that can be used as parser input.
///
/// The parser pulls one character at a time. The end of the input is
/// signalled by `None`; the stream must keep returning `None` afterwards.
pub trait CharacterInput {
    /// Consume the next character in the stream.
    fn next(&mut self) -> Option<char>;
}

impl<'a, T: CharacterInput + ?Sized> CharacterInput for &'a mut T {
    fn next(&mut self) -> Option<char> {
        (**self).next()
    }
}

/// A wrapper for using iterators as parser input.
pub struct IterInput<I> {
    iter: I,
    done: bool,
}

impl<I: Iterator<Item = char>> IterInput<I> {
    /// Create a new iterator input.
    pub fn new(iter: I) -> IterInput<I> {
        IterInput { iter, done: false }
    }
}

impl<I: Iterator<Item = char>> CharacterInput for IterInput<I> {
    fn next(&mut self) -> Option<char> {
        if self.done {
            return None;
        }
        let c = self.iter.next();
        self.done = c.is_none();
        c
    }
}

/// A string used as parser input.
pub struct StrInput<'a> {
    chars: Chars<'a>,
}

impl<'a> StrInput<'a> {
    /// Create a new string input.
    pub fn new(text: &'a str) -> StrInput<'a> {
        StrInput {
            chars: text.chars(),
        }
    }
}

impl<'a> From<&'a str> for StrInput<'a> {
    fn from(text: &'a str) -> StrInput<'a> {
        StrInput::new(text)
    }
}

impl<'a> CharacterInput for StrInput<'a> {
    fn next(&mut self) -> Option<char> {
        self.chars.next()
    }
}

/// A location in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// The number of characters preceding the location.
    pub offset: usize,
    /// The 1-based line number.
    pub line: usize,
    /// The 1-based column number, counted in characters.
    pub column: usize,
}

impl Default for Location {
    fn default() -> Location {
        Location {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A cursor over the input that keeps the current and the following code
/// point at hand, and tracks the location of the current one.
pub(crate) struct Lookahead<I> {
    input: I,
    current: CodePoint,
    next: CodePoint,
    location: Location,
}

impl<I: CharacterInput> Lookahead<I> {
    pub fn new(mut input: I) -> Lookahead<I> {
        let current = pull(&mut input);
        let next = if current.is_eof() {
            CodePoint::EOF
        } else {
            pull(&mut input)
        };
        Lookahead {
            input,
            current,
            next,
            location: Location::default(),
        }
    }

    /// The code point at the current location.
    pub fn current(&self) -> CodePoint {
        self.current
    }

    /// The code point following the current one.
    pub fn peek(&self) -> CodePoint {
        self.next
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Move on to the next code point. Does nothing at the end of the input.
    pub fn advance(&mut self) {
        if self.current.is_eof() {
            return;
        }
        if self.current == CodePoint::from('\n') {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
        self.location.offset += 1;
        self.current = self.next;
        if !self.next.is_eof() {
            self.next = pull(&mut self.input);
        }
    }
}

fn pull<I: CharacterInput>(input: &mut I) -> CodePoint {
    input.next().map(CodePoint::from).unwrap_or(CodePoint::EOF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookahead_tracks_location() {
        let mut la = Lookahead::new(StrInput::new("a\nb"));
        assert_eq!(la.current(), CodePoint::from('a'));
        assert_eq!(la.peek(), CodePoint::from('\n'));
        la.advance();
        la.advance();
        assert_eq!(la.current(), CodePoint::from('b'));
        assert_eq!(la.peek(), CodePoint::EOF);
        assert_eq!(
            la.location(),
            Location {
                offset: 2,
                line: 2,
                column: 1
            }
        );
        la.advance();
        assert!(la.current().is_eof());
        la.advance();
        assert!(la.current().is_eof());
        assert_eq!(la.location().offset, 3);
    }

    #[test]
    fn iterator_input_is_fused() {
        let mut input = IterInput::new("xy".chars());
        assert_eq!(input.next(), Some('x'));
        assert_eq!(input.next(), Some('y'));
        assert_eq!(input.next(), None);
        assert_eq!(input.next(), None);
    }

    #[test]
    fn empty_input() {
        let la = Lookahead::new(StrInput::new(""));
        assert!(la.current().is_eof());
        assert!(la.peek().is_eof());
        assert_eq!(la.location().to_string(), "1:1");
    }
}
