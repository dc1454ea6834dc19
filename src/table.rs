// Copyright (c) 2018 Fabian Schuiki

//! The parse table model.
//!
//! A parse table is the precomputed automaton the GLR runtime executes. It maps
//! states and characters to shift and reduce actions, states and symbols to
//! goto targets, and holds the productions and priorities needed to build and
//! filter the parse forest. Tables are produced by the [`read`] module and are
//! immutable afterwards, so a single table may be shared across threads.
//!
//! [`read`]: ../read/index.html

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use bit_set::BitSet;
use indexmap::IndexSet;

use crate::aterm::Term;
use crate::codepoint::{CodePoint, CodePointSet};
use crate::read::{self, InvalidTableError};
use crate::symbol::{Attributes, ProductionType, Status, Symbol};

/// A parse table.
#[derive(Debug, Clone)]
pub struct ParseTable {
    pub(crate) version: u32,
    pub(crate) initial: StateId,
    pub(crate) productions: Vec<Production>,
    pub(crate) symbols: IndexSet<Symbol>,
    pub(crate) shifts: Shifts,
    pub(crate) gotos: Gotos,
    pub(crate) reductions: Reductions,
    pub(crate) accepts: Vec<CodePointSet>,
    pub(crate) priorities: Priorities,
    pub(crate) rejectable: BitSet,
}

impl ParseTable {
    /// Decode a parse table from its term representation.
    pub fn from_term(term: &Term) -> Result<ParseTable, InvalidTableError> {
        read::read_table(term)
    }

    /// The version of the table format this table was read from.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The state parsing starts in.
    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    /// The number of states in the table.
    pub fn num_states(&self) -> usize {
        self.accepts.len()
    }

    /// The productions of the table, indexed by label.
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Access a single production.
    pub fn production(&self, label: Label) -> &Production {
        &self.productions[label.as_usize()]
    }

    /// Access an interned symbol.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.as_usize()]
    }

    /// Look up the id of a symbol, if any production derives it.
    pub fn symbol_id(&self, symbol: &Symbol) -> Option<SymbolId> {
        self.symbols.get_full(symbol).map(|(i, _)| SymbolId(i))
    }

    /// The shift actions of the table.
    pub fn shifts(&self) -> &Shifts {
        &self.shifts
    }

    /// The goto actions of the table.
    pub fn gotos(&self) -> &Gotos {
        &self.gotos
    }

    /// The reduce actions of the table.
    pub fn reductions(&self) -> &Reductions {
        &self.reductions
    }

    /// Check whether a state accepts the input upon seeing a code point.
    pub fn accepts(&self, state: StateId, cp: CodePoint) -> bool {
        self.accepts[state.as_usize()].contains(cp)
    }

    /// The priority relation of the table.
    pub fn priorities(&self) -> &Priorities {
        &self.priorities
    }

    /// Check whether a state may be reached by the derivation of a reject
    /// production.
    ///
    /// Frames in such states are acted upon last at each input position, such
    /// that rejections are known before their derivations are extended.
    pub fn is_rejectable(&self, state: StateId) -> bool {
        self.rejectable.contains(state.as_usize())
    }
}

impl FromStr for ParseTable {
    type Err = InvalidTableError;

    fn from_str(s: &str) -> Result<ParseTable, InvalidTableError> {
        read::read_table_str(s)
    }
}

impl Index<Label> for ParseTable {
    type Output = Production;

    fn index(&self, index: Label) -> &Production {
        self.production(index)
    }
}

/// A unique state identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(usize);

impl StateId {
    /// Create a state id from a usize.
    pub fn from_usize(id: usize) -> StateId {
        StateId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A production label.
///
/// Labels are 0-based indices into the production table. The table format
/// numbers them from 257 upwards, sharing one index space with characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(usize);

impl Label {
    /// Create a label from a usize.
    pub fn from_usize(id: usize) -> Label {
        Label(id)
    }

    /// Obtain the label as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A unique identifier of a symbol interned in a parse table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(usize);

impl SymbolId {
    /// Create a symbol id from a usize.
    pub fn from_usize(id: usize) -> SymbolId {
        SymbolId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// A production of the grammar the table was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    /// The label of the production.
    pub label: Label,
    /// The symbols the production derives, in order.
    pub rhs: Vec<Symbol>,
    /// The symbol the production produces.
    pub result: Symbol,
    /// The interned id of `result`.
    pub symbol: SymbolId,
    /// The attributes of the production.
    pub attrs: Attributes,
}

impl Production {
    /// The number of children a derivation of this production has.
    pub fn arity(&self) -> usize {
        self.rhs.len()
    }

    /// The disambiguation status of the production.
    pub fn status(&self) -> Status {
        self.attrs.status
    }

    /// Check whether derivations of this production reject their span.
    pub fn is_reject(&self) -> bool {
        self.attrs.status == Status::Reject
    }

    /// The type tag of the production.
    pub fn production_type(&self) -> ProductionType {
        self.attrs.production_type()
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for symbol in &self.rhs {
            write!(f, "{} ", symbol)?;
        }
        write!(f, "-> {}", self.result)?;
        if let Some(ref c) = self.attrs.constructor {
            write!(f, " {{cons({:?})}}", c)?;
        }
        Ok(())
    }
}

/// The shift actions of a parse table.
#[derive(Debug, Clone, Default)]
pub struct Shifts {
    pub(crate) states: Vec<Vec<(CodePointSet, StateId)>>,
}

impl Shifts {
    /// The state to shift to from `state` upon reading `cp`, if any.
    pub fn get(&self, state: StateId, cp: CodePoint) -> Option<StateId> {
        self.states[state.as_usize()]
            .iter()
            .find(|&&(ref chars, _)| chars.contains(cp))
            .map(|&(_, next)| next)
    }
}

/// The goto actions of a parse table.
#[derive(Debug, Clone, Default)]
pub struct Gotos {
    pub(crate) states: Vec<HashMap<SymbolId, StateId>>,
}

impl Gotos {
    /// The state to go to from `state` after reducing to `symbol`, if any.
    pub fn get(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.states[state.as_usize()].get(&symbol).cloned()
    }
}

/// A reduction by a production, possibly restricted by the characters that
/// follow the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// The production to reduce by.
    pub production: Label,
    /// Characters that may not follow the current one for the reduction to
    /// apply.
    pub lookahead: Vec<CodePointSet>,
}

impl Reduction {
    /// Check whether the reduction applies given the code point following the
    /// current one.
    pub fn permits(&self, next: CodePoint) -> bool {
        !self.lookahead.iter().any(|set| set.contains(next))
    }
}

/// The reduce actions of a parse table.
#[derive(Debug, Clone, Default)]
pub struct Reductions {
    pub(crate) states: Vec<Vec<(CodePointSet, Vec<Reduction>)>>,
}

impl Reductions {
    /// The reductions to perform in `state` upon reading `cp`.
    ///
    /// Reductions are returned in declaration order, each production at most
    /// once.
    pub fn get(&self, state: StateId, cp: CodePoint) -> Vec<&Reduction> {
        let mut seen = HashSet::new();
        self.states[state.as_usize()]
            .iter()
            .filter(|&&(ref chars, _)| chars.contains(cp))
            .flat_map(|&(_, ref reductions)| reductions.iter())
            .filter(|r| seen.insert(r.production))
            .collect()
    }
}

/// A priority between two productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Priority {
    /// The production whose derivations win.
    pub winner: Label,
    /// The production whose derivations may not appear beneath the winner.
    pub loser: Label,
    /// The argument position the priority is restricted to, if any.
    pub argument: Option<usize>,
}

/// The priority relation of a parse table.
#[derive(Debug, Clone, Default)]
pub struct Priorities {
    all: Vec<Priority>,
    greater: HashSet<(Label, Label)>,
    argument: HashSet<(Label, usize, Label)>,
}

impl Priorities {
    /// Add a priority to the relation.
    ///
    /// Reflexive priorities are ignored.
    pub(crate) fn add(&mut self, prio: Priority) {
        if prio.winner == prio.loser {
            return;
        }
        let fresh = match prio.argument {
            None => self.greater.insert((prio.winner, prio.loser)),
            Some(arg) => self.argument.insert((prio.winner, arg, prio.loser)),
        };
        if fresh {
            self.all.push(prio);
        }
    }

    /// Check whether a derivation of `child` may not appear as argument `arg`
    /// of a derivation of `parent`.
    pub fn forbids(&self, parent: Label, arg: usize, child: Label) -> bool {
        self.greater.contains(&(parent, child)) || self.argument.contains(&(parent, arg, child))
    }

    /// Check whether the relation is empty.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// The number of priorities in the relation.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// An iterator over the priorities.
    pub fn iter(&self) -> std::slice::Iter<'_, Priority> {
        self.all.iter()
    }
}
