// Copyright (c) 2018 Fabian Schuiki

//! Grammar symbols and production attributes.
//!
//! These are the values a parse table uses to describe its productions, read
//! from `prod(children, result, attrs)` terms. They carry no behaviour beyond
//! structural equality and a human-readable notation.

use std::fmt;

use crate::aterm::Term;
use crate::codepoint::CodePointSet;
use crate::read::{self, InvalidTableError};

/// A symbol of a production.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A sort, e.g. `Exp` or the start sort `<START>`.
    Sort(String),
    /// A parameterized sort, e.g. `List[[Exp]]`.
    ParameterizedSort(String, Vec<Symbol>),
    /// A case-sensitive literal.
    Lit(String),
    /// A case-insensitive literal.
    CiLit(String),
    /// A character class.
    CharClass(CodePointSet),
    /// The context-free variant of a symbol.
    Cf(Box<Symbol>),
    /// The lexical variant of a symbol.
    Lex(Box<Symbol>),
    /// A variable of a symbol.
    Varsym(Box<Symbol>),
    /// Layout.
    Layout,
    /// The empty symbol `()`.
    Empty,
    Opt(Box<Symbol>),
    Iter(Box<Symbol>),
    IterStar(Box<Symbol>),
    IterSep(Box<Symbol>, Box<Symbol>),
    IterStarSep(Box<Symbol>, Box<Symbol>),
    Alt(Box<Symbol>, Box<Symbol>),
    Seq(Box<Symbol>, Vec<Symbol>),
}

impl Symbol {
    /// Read a symbol from its term representation.
    pub fn from_term(term: &Term) -> Result<Symbol, InvalidTableError> {
        let boxed = |t: &Term| Symbol::from_term(t).map(Box::new);
        let name = match term.name() {
            Some(name) => name,
            None => return Err(InvalidTableError::shape("symbol", term)),
        };
        let args = term.args().unwrap_or(&[]);
        let symbol = match (name, args.len()) {
            ("sort", 1) => Symbol::Sort(string_arg(&args[0], term)?),
            ("parameterized-sort", 2) => Symbol::ParameterizedSort(
                string_arg(&args[0], term)?,
                list_arg(&args[1], term)?
                    .iter()
                    .map(Symbol::from_term)
                    .collect::<Result<_, _>>()?,
            ),
            ("lit", 1) => Symbol::Lit(string_arg(&args[0], term)?),
            ("ci-lit", 1) => Symbol::CiLit(string_arg(&args[0], term)?),
            ("char-class", 1) => {
                Symbol::CharClass(read::character_set(list_arg(&args[0], term)?)?)
            }
            ("cf", 1) => Symbol::Cf(boxed(&args[0])?),
            ("lex", 1) => Symbol::Lex(boxed(&args[0])?),
            ("varsym", 1) => Symbol::Varsym(boxed(&args[0])?),
            ("layout", 0) => Symbol::Layout,
            ("empty", 0) => Symbol::Empty,
            ("opt", 1) => Symbol::Opt(boxed(&args[0])?),
            ("iter", 1) => Symbol::Iter(boxed(&args[0])?),
            ("iter-star", 1) => Symbol::IterStar(boxed(&args[0])?),
            ("iter-sep", 2) => Symbol::IterSep(boxed(&args[0])?, boxed(&args[1])?),
            ("iter-star-sep", 2) => Symbol::IterStarSep(boxed(&args[0])?, boxed(&args[1])?),
            ("alt", 2) => Symbol::Alt(boxed(&args[0])?, boxed(&args[1])?),
            ("seq", 2) => Symbol::Seq(
                boxed(&args[0])?,
                list_arg(&args[1], term)?
                    .iter()
                    .map(Symbol::from_term)
                    .collect::<Result<_, _>>()?,
            ),
            _ => return Err(InvalidTableError::shape("symbol", term)),
        };
        Ok(symbol)
    }

    /// Strip the `cf`, `lex` and `varsym` wrappers off a symbol.
    pub fn inner(&self) -> &Symbol {
        match *self {
            Symbol::Cf(ref s) | Symbol::Lex(ref s) | Symbol::Varsym(ref s) => s.inner(),
            ref s => s,
        }
    }

    /// Check whether this symbol is layout, in any variant.
    pub fn is_layout(&self) -> bool {
        match *self.inner() {
            Symbol::Layout => true,
            Symbol::Opt(ref s) | Symbol::Iter(ref s) | Symbol::IterStar(ref s) => s.is_layout(),
            _ => false,
        }
    }

    /// Check whether this symbol is a literal.
    pub fn is_literal(&self) -> bool {
        match *self.inner() {
            Symbol::Lit(_) | Symbol::CiLit(_) => true,
            _ => false,
        }
    }

    /// Check whether this symbol is lexical, i.e. its derivations are yielded
    /// as strings rather than trees.
    pub fn is_lexical(&self) -> bool {
        match *self {
            Symbol::Lex(ref s) => !s.is_layout(),
            Symbol::Varsym(ref s) => s.is_lexical(),
            Symbol::CharClass(_) => true,
            _ => false,
        }
    }

    /// Check whether this symbol is an iteration, i.e. its derivations are
    /// flattened into a list.
    pub fn is_list(&self) -> bool {
        match *self.inner() {
            Symbol::Iter(_)
            | Symbol::IterStar(_)
            | Symbol::IterSep(..)
            | Symbol::IterStarSep(..) => true,
            _ => false,
        }
    }

    /// Check whether this symbol is an optional.
    pub fn is_optional(&self) -> bool {
        match *self.inner() {
            Symbol::Opt(_) => true,
            _ => false,
        }
    }
}

fn string_arg(arg: &Term, term: &Term) -> Result<String, InvalidTableError> {
    arg.as_str()
        .map(String::from)
        .ok_or_else(|| InvalidTableError::shape("symbol", term))
}

fn list_arg<'a>(arg: &'a Term, term: &Term) -> Result<&'a [Term], InvalidTableError> {
    arg.as_list()
        .ok_or_else(|| InvalidTableError::shape("symbol", term))
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Symbol::Sort(ref s) => write!(f, "{}", s),
            Symbol::ParameterizedSort(ref s, ref params) => {
                write!(f, "{}[[", s)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, "]]")
            }
            Symbol::Lit(ref s) => write!(f, "{:?}", s),
            Symbol::CiLit(ref s) => write!(f, "'{}'", s),
            Symbol::CharClass(ref cc) => write!(f, "{:?}", cc),
            Symbol::Cf(ref s) => write!(f, "<{}-CF>", s),
            Symbol::Lex(ref s) => write!(f, "<{}-LEX>", s),
            Symbol::Varsym(ref s) => write!(f, "<{}-VAR>", s),
            Symbol::Layout => write!(f, "LAYOUT"),
            Symbol::Empty => write!(f, "()"),
            Symbol::Opt(ref s) => write!(f, "{}?", s),
            Symbol::Iter(ref s) => write!(f, "{}+", s),
            Symbol::IterStar(ref s) => write!(f, "{}*", s),
            Symbol::IterSep(ref s, ref sep) => write!(f, "{{{} {}}}+", s, sep),
            Symbol::IterStarSep(ref s, ref sep) => write!(f, "{{{} {}}}*", s, sep),
            Symbol::Alt(ref a, ref b) => write!(f, "({} | {})", a, b),
            Symbol::Seq(ref head, ref tail) => {
                write!(f, "({}", head)?;
                for s in tail {
                    write!(f, " {}", s)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The disambiguation status of a production.
///
/// The discriminant is the number that reduce actions carry in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No disambiguation attribute.
    Normal = 0,
    /// Derivations of this production reject their span.
    Reject = 1,
    /// Derivations of this production win over competing ones.
    Prefer = 2,
    /// Derivations of this production lose against competing ones.
    Avoid = 4,
}

impl Status {
    /// Decode the status number of a reduce action.
    pub fn from_code(code: i64) -> Option<Status> {
        match code {
            0 => Some(Status::Normal),
            1 => Some(Status::Reject),
            2 => Some(Status::Prefer),
            4 => Some(Status::Avoid),
            _ => None,
        }
    }

    /// The rank of this status when filtering ambiguities. Higher wins.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Status::Avoid => 0,
            Status::Normal | Status::Reject => 1,
            Status::Prefer => 2,
        }
    }
}

/// The type tag of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductionType {
    /// A regular production.
    Normal,
    /// A production added for error recovery.
    Recovery,
    /// A production added for syntactic completion.
    Completion,
}

/// The attributes of a production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attributes {
    /// The constructor given by a `cons("…")` attribute.
    pub constructor: Option<String>,
    /// The disambiguation status.
    pub status: Status,
    /// Whether the production is a bracket production.
    pub bracket: bool,
    /// Whether the production is a recovery production.
    pub recover: bool,
    /// Whether the production is a completion production.
    pub completion: bool,
}

impl Default for Attributes {
    fn default() -> Attributes {
        Attributes {
            constructor: None,
            status: Status::Normal,
            bracket: false,
            recover: false,
            completion: false,
        }
    }
}

impl Attributes {
    /// Read the attributes from a `no-attrs` or `attrs([...])` term.
    ///
    /// Attributes that do not affect parsing or imploding are ignored.
    pub fn from_term(term: &Term) -> Result<Attributes, InvalidTableError> {
        let mut attrs = Attributes::default();
        if term.is_appl("no-attrs", 0) {
            return Ok(attrs);
        }
        let list = term
            .as_appl("attrs", 1)
            .and_then(|args| args[0].as_list())
            .ok_or_else(|| InvalidTableError::shape("attrs/1", term))?;
        for attr in list {
            attrs.add(attr);
        }
        Ok(attrs)
    }

    fn add(&mut self, attr: &Term) {
        match (attr.name(), attr.args().map(|a| a.len())) {
            (Some("reject"), Some(0)) => self.status = Status::Reject,
            (Some("prefer"), Some(0)) => self.status = Status::Prefer,
            (Some("avoid"), Some(0)) => self.status = Status::Avoid,
            (Some("bracket"), Some(0)) => self.bracket = true,
            (Some("recover"), Some(0)) => self.recover = true,
            (Some("completion"), Some(0)) => self.completion = true,
            (Some("cons"), Some(1)) => {
                if let Some(c) = attr.args().and_then(|a| a[0].as_str()) {
                    self.constructor = Some(c.to_string());
                }
            }
            // `atom(reject)`, `term(cons("Add"))` and friends wrap the
            // interesting part in one more constructor.
            (Some("atom"), Some(1)) | (Some("term"), Some(1)) => {
                if let Some(args) = attr.args() {
                    self.add(&args[0]);
                }
            }
            _ => (),
        }
    }

    /// The type tag these attributes imply.
    pub fn production_type(&self) -> ProductionType {
        if self.recover {
            ProductionType::Recovery
        } else if self.completion {
            ProductionType::Completion
        } else {
            ProductionType::Normal
        }
    }
}
