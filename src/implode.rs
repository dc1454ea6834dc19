// Copyright (c) 2018 Fabian Schuiki

//! Imploding parse forests into abstract syntax terms.
//!
//! The imploder follows the usual SDF conventions:
//!
//! - productions with a `cons("C")` attribute become applications `C(...)`;
//! - injections, i.e. productions without constructor and a single relevant
//!   child, pass that child through;
//! - lexical and literal subtrees become strings;
//! - literals and layout do not show up as children;
//! - iterations become flat lists;
//! - optionals become `Some(x)` or `None`;
//! - bracket productions pass their child through;
//! - all other productions become tuples.

use thiserror::Error;

use crate::aterm::Term;
use crate::forest::{Forest, Node, NodeId};
use crate::table::{ParseTable, Production};

/// The configuration of an imploder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplodeConfig {
    allow_ambiguity: bool,
}

impl ImplodeConfig {
    /// Create a default configuration, which rejects ambiguities.
    pub fn new() -> ImplodeConfig {
        ImplodeConfig::default()
    }

    /// Turn ambiguities into `amb([...])` terms instead of failing.
    pub fn allow_ambiguity(mut self, allow: bool) -> ImplodeConfig {
        self.allow_ambiguity = allow;
        self
    }
}

/// An error encountered while imploding a forest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImplodeError {
    /// The forest contains an ambiguity and ambiguities are not allowed.
    #[error("ambiguity of {alternatives} alternatives at offset {offset}")]
    Ambiguous {
        /// The input offset where the ambiguity starts.
        offset: usize,
        /// The number of alternatives.
        alternatives: usize,
    },
    /// The forest contains a cyclic derivation.
    #[error("cyclic derivation of `{production}` at offset {offset}")]
    Cycle {
        /// The input offset where the cycle starts.
        offset: usize,
        /// The production that derives itself.
        production: String,
    },
}

/// Implodes parse forests built with a parse table.
#[derive(Debug, Clone, Copy)]
pub struct Imploder<'t> {
    table: &'t ParseTable,
    config: ImplodeConfig,
}

impl<'t> Imploder<'t> {
    /// Create an imploder with the default configuration.
    pub fn new(table: &'t ParseTable) -> Imploder<'t> {
        Imploder::with_config(table, ImplodeConfig::default())
    }

    /// Create an imploder with a custom configuration.
    pub fn with_config(table: &'t ParseTable, config: ImplodeConfig) -> Imploder<'t> {
        Imploder { table, config }
    }

    /// Implode the tree rooted at a node.
    ///
    /// The forest is walked with an explicit stack, so arbitrarily deep trees
    /// are fine.
    pub fn implode(&self, forest: &Forest, root: NodeId) -> Result<Term, ImplodeError> {
        let mut pending: Vec<Pending<'t>> = Vec::new();
        let mut node = root;
        'descend: loop {
            let mut step = self.enter(forest, node)?;
            loop {
                let term = match step {
                    Step::Done(term) => term,
                    Step::Descend(mut p) => match p.todo.pop() {
                        Some((child, splice)) => {
                            p.splice = splice;
                            pending.push(p);
                            node = child;
                            continue 'descend;
                        }
                        None => self.finish(p),
                    },
                };
                match pending.pop() {
                    Some(mut parent) => {
                        parent.push(term);
                        step = Step::Descend(parent);
                    }
                    None => return Ok(term),
                }
            }
        }
    }

    /// Start imploding a node. Nodes with children to implode first are
    /// returned as pending.
    fn enter(&self, forest: &Forest, id: NodeId) -> Result<Step<'t>, ImplodeError> {
        match forest[id] {
            Node::Application {
                label,
                ref children,
            } => {
                let table = self.table;
                let prod = table.production(label);
                if prod.result.is_literal() || prod.result.is_lexical() {
                    return Ok(Step::Done(Term::Str(forest.yield_string(id))));
                }
                // Nested iterations are spliced into the enclosing list.
                let todo = prod
                    .rhs
                    .iter()
                    .zip(children)
                    .filter(|&(symbol, _)| !symbol.is_layout() && !symbol.is_literal())
                    .map(|(symbol, &child)| (child, prod.result.is_list() && symbol.is_list()))
                    .rev()
                    .collect();
                Ok(Step::Descend(Pending::new(Shape::Production(prod), todo)))
            }
            Node::Ambiguity { ref alternatives } => {
                if !self.config.allow_ambiguity {
                    return Err(ImplodeError::Ambiguous {
                        offset: forest.span(id).start,
                        alternatives: alternatives.len(),
                    });
                }
                let todo = alternatives.iter().rev().map(|&alt| (alt, false)).collect();
                Ok(Step::Descend(Pending::new(Shape::Ambiguity, todo)))
            }
            Node::Cycle { label } => Err(ImplodeError::Cycle {
                offset: forest.span(id).start,
                production: self.table.production(label).to_string(),
            }),
            Node::Character(c) => Ok(Step::Done(Term::Str(
                c.as_char().map(String::from).unwrap_or_default(),
            ))),
        }
    }

    fn finish(&self, pending: Pending<'t>) -> Term {
        match pending.shape {
            Shape::Production(prod) => self.build(prod, pending.kids),
            Shape::Ambiguity => Term::appl("amb", vec![Term::List(pending.kids)]),
        }
    }

    fn build(&self, prod: &Production, mut kids: Vec<Term>) -> Term {
        if prod.result.is_list() {
            return Term::List(kids);
        }
        if prod.result.is_optional() {
            return match kids.pop() {
                Some(kid) => Term::appl("Some", vec![kid]),
                None => Term::constant("None"),
            };
        }
        if prod.attrs.bracket || (prod.attrs.constructor.is_none() && kids.len() == 1) {
            if let Some(kid) = kids.pop() {
                return kid;
            }
        }
        if let Some(ref cons) = prod.attrs.constructor {
            return Term::appl(cons.as_str(), kids);
        }
        Term::appl("", kids)
    }
}

/// What a pending node implodes to once its children are done.
enum Shape<'t> {
    Production(&'t Production),
    Ambiguity,
}

/// A node whose children are being imploded.
struct Pending<'t> {
    shape: Shape<'t>,
    /// The children still to implode, last one first, and whether lists
    /// they implode to are spliced.
    todo: Vec<(NodeId, bool)>,
    splice: bool,
    kids: Vec<Term>,
}

impl<'t> Pending<'t> {
    fn new(shape: Shape<'t>, todo: Vec<(NodeId, bool)>) -> Pending<'t> {
        Pending {
            shape,
            kids: Vec::with_capacity(todo.len()),
            todo,
            splice: false,
        }
    }

    fn push(&mut self, kid: Term) {
        match kid {
            Term::List(items) if self.splice && self.kids.is_empty() => self.kids = items,
            Term::List(items) if self.splice => self.kids.extend(items),
            kid => self.kids.push(kid),
        }
    }
}

enum Step<'t> {
    Done(Term),
    Descend(Pending<'t>),
}
