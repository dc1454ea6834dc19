// Copyright (c) 2018 Fabian Schuiki

//! A reader for the textual ATerm syntax.

use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use crate::Term;

/// An error encountered while reading a term.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected `{found}` at offset {offset}")]
    Unexpected { offset: usize, found: char },
    #[error("integer out of range at offset {offset}")]
    IntegerRange { offset: usize },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("trailing input at offset {offset}")]
    Trailing { offset: usize },
}

/// Read a single term from its textual representation.
///
/// Annotations (`t{a,b}`) are accepted and discarded. Surrounding whitespace
/// is ignored, anything else after the term is an error.
pub fn read(text: &str) -> Result<Term, ReadError> {
    let mut reader = Reader {
        input: text.char_indices().peekable(),
    };
    let term = reader.term()?;
    reader.skip_whitespace();
    match reader.input.next() {
        Some((offset, _)) => Err(ReadError::Trailing { offset }),
        None => Ok(term),
    }
}

/// Checks whether a character may appear in an unquoted constructor name after
/// the first character.
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*' || c == '+' || c == '$'
}

struct Reader<'a> {
    input: Peekable<CharIndices<'a>>,
}

impl<'a> Reader<'a> {
    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.input.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.skip_whitespace();
        self.input.peek().cloned()
    }

    fn term(&mut self) -> Result<Term, ReadError> {
        let term = match self.peek() {
            None => return Err(ReadError::UnexpectedEnd),
            Some((_, '[')) => {
                self.input.next();
                Term::List(self.sequence(']')?)
            }
            Some((_, '(')) => {
                self.input.next();
                Term::Appl(String::new(), self.sequence(')')?)
            }
            Some((offset, '"')) => {
                self.input.next();
                let text = self.string(offset)?;
                match self.input.peek() {
                    Some(&(_, '(')) => {
                        self.input.next();
                        Term::Appl(text, self.sequence(')')?)
                    }
                    _ => Term::Str(text),
                }
            }
            Some((offset, c)) if c == '-' || c.is_ascii_digit() => self.integer(offset)?,
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.name();
                match self.input.peek() {
                    Some(&(_, '(')) => {
                        self.input.next();
                        Term::Appl(name, self.sequence(')')?)
                    }
                    _ => Term::Appl(name, Vec::new()),
                }
            }
            Some((offset, found)) => return Err(ReadError::Unexpected { offset, found }),
        };

        // Annotations carry nothing the tables need.
        if let Some((_, '{')) = self.peek() {
            self.input.next();
            self.sequence('}')?;
        }
        Ok(term)
    }

    /// Read a comma-separated sequence of terms up to and including the
    /// closing delimiter.
    fn sequence(&mut self, close: char) -> Result<Vec<Term>, ReadError> {
        let mut items = Vec::new();
        if let Some((_, c)) = self.peek() {
            if c == close {
                self.input.next();
                return Ok(items);
            }
        }
        loop {
            items.push(self.term()?);
            match self.peek() {
                Some((_, ',')) => {
                    self.input.next();
                }
                Some((_, c)) if c == close => {
                    self.input.next();
                    return Ok(items);
                }
                Some((offset, found)) => return Err(ReadError::Unexpected { offset, found }),
                None => return Err(ReadError::UnexpectedEnd),
            }
        }
    }

    fn name(&mut self) -> String {
        let mut buffer = String::new();
        while let Some(&(_, c)) = self.input.peek() {
            if !is_name_char(c) {
                break;
            }
            buffer.push(c);
            self.input.next();
        }
        buffer
    }

    fn integer(&mut self, offset: usize) -> Result<Term, ReadError> {
        let mut buffer = String::new();
        if let Some(&(_, '-')) = self.input.peek() {
            buffer.push('-');
            self.input.next();
        }
        while let Some(&(_, c)) = self.input.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            buffer.push(c);
            self.input.next();
        }
        if buffer == "-" {
            return match self.input.peek() {
                Some(&(offset, found)) => Err(ReadError::Unexpected { offset, found }),
                None => Err(ReadError::UnexpectedEnd),
            };
        }
        buffer
            .parse()
            .map(Term::Int)
            .map_err(|_| ReadError::IntegerRange { offset })
    }

    /// Read the remainder of a quoted string whose opening quote has been
    /// consumed.
    fn string(&mut self, offset: usize) -> Result<String, ReadError> {
        let mut buffer = String::new();
        let mut escaped = false;
        for (_, c) in &mut self.input {
            if escaped {
                buffer.push(match c {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    c => c,
                });
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                return Ok(buffer);
            } else {
                buffer.push(c);
            }
        }
        Err(ReadError::UnterminatedString { offset })
    }
}
