// Copyright (c) 2018 Fabian Schuiki

//! A minimal model of annotated terms (ATerms).
//!
//! Parse tables, production descriptions and imploded syntax trees are all
//! exchanged as ATerms. This crate provides the term type itself, a reader for
//! the textual ATerm syntax, and a writer via `Display`.

#![deny(missing_docs)]

use std::fmt;
use std::str::FromStr;

mod read;

pub use crate::read::{read, ReadError};

/// A term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// An integer, e.g. `42`.
    Int(i64),
    /// A quoted string, e.g. `"keyword"`.
    Str(String),
    /// A constructor application, e.g. `range(9,10)` or `no-attrs`.
    Appl(String, Vec<Term>),
    /// A list of terms, e.g. `[1,2,3]`.
    List(Vec<Term>),
}

impl Term {
    /// Create a constructor application.
    pub fn appl<S: Into<String>>(name: S, args: Vec<Term>) -> Term {
        Term::Appl(name.into(), args)
    }

    /// Create a constructor application without arguments.
    pub fn constant<S: Into<String>>(name: S) -> Term {
        Term::Appl(name.into(), Vec::new())
    }

    /// Create a string term.
    pub fn string<S: Into<String>>(value: S) -> Term {
        Term::Str(value.into())
    }

    /// The integer value of this term, if it is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Term::Int(v) => Some(v),
            _ => None,
        }
    }

    /// The string value of this term, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Term::Str(ref s) => Some(s),
            _ => None,
        }
    }

    /// The elements of this term, if it is a list.
    pub fn as_list(&self) -> Option<&[Term]> {
        match *self {
            Term::List(ref items) => Some(items),
            _ => None,
        }
    }

    /// The arguments of this term, if it is an application of `name` with
    /// exactly `arity` arguments.
    pub fn as_appl(&self, name: &str, arity: usize) -> Option<&[Term]> {
        match *self {
            Term::Appl(ref n, ref args) if n == name && args.len() == arity => Some(args),
            _ => None,
        }
    }

    /// Check whether this term is an application of `name` with `arity`
    /// arguments.
    pub fn is_appl(&self, name: &str, arity: usize) -> bool {
        self.as_appl(name, arity).is_some()
    }

    /// The constructor name of this term, if it is an application.
    pub fn name(&self) -> Option<&str> {
        match *self {
            Term::Appl(ref n, _) => Some(n),
            _ => None,
        }
    }

    /// The arguments of this term, if it is an application.
    pub fn args(&self) -> Option<&[Term]> {
        match *self {
            Term::Appl(_, ref args) => Some(args),
            _ => None,
        }
    }
}

impl FromStr for Term {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Term, ReadError> {
        read(s)
    }
}

impl From<i64> for Term {
    fn from(v: i64) -> Term {
        Term::Int(v)
    }
}

impl From<Vec<Term>> for Term {
    fn from(v: Vec<Term>) -> Term {
        Term::List(v)
    }
}

/// Check whether a constructor name can be written without quotes.
fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => (),
        _ => return false,
    }
    chars.all(read::is_name_char)
}

fn write_escaped(f: &mut fmt::Formatter, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

fn write_seq(f: &mut fmt::Formatter, items: &[Term]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Term::Int(v) => write!(f, "{}", v),
            Term::Str(ref s) => write_escaped(f, s),
            Term::List(ref items) => {
                write!(f, "[")?;
                write_seq(f, items)?;
                write!(f, "]")
            }
            Term::Appl(ref name, ref args) => {
                if name.is_empty() {
                    // Tuple.
                } else if is_plain_name(name) {
                    write!(f, "{}", name)?;
                } else {
                    write_escaped(f, name)?;
                }
                if args.is_empty() && is_plain_name(name) {
                    return Ok(());
                }
                write!(f, "(")?;
                write_seq(f, args)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let t: Term = "goto([range(9,10),13,32],21)".parse().unwrap();
        let args = t.as_appl("goto", 2).unwrap();
        assert_eq!(args[0].as_list().unwrap().len(), 3);
        assert_eq!(args[1].as_int(), Some(21));
        assert!(t.as_appl("goto", 3).is_none());
        assert!(!t.is_appl("action", 2));
    }

    #[test]
    fn display() {
        let t = Term::appl(
            "Add",
            vec![Term::Int(1), Term::string("a\"b"), Term::List(vec![])],
        );
        assert_eq!(t.to_string(), "Add(1,\"a\\\"b\",[])");
        assert_eq!(Term::constant("no-attrs").to_string(), "no-attrs");
        assert_eq!(Term::constant("<START>").to_string(), "\"<START>\"()");
        assert_eq!(
            Term::appl("", vec![Term::Int(1), Term::Int(2)]).to_string(),
            "(1,2)"
        );
        assert_eq!(
            read("(1, 2)").unwrap(),
            Term::appl("", vec![Term::Int(1), Term::Int(2)])
        );
    }

    #[test]
    fn display_reads_back() {
        let text = "prod([lit(\"\\\"\"),cf(opt(layout))],sort(\"S\"),attrs([term(cons(\"S\"))]))";
        let t = read(text).unwrap();
        assert_eq!(read(&t.to_string()).unwrap(), t);
    }
}
