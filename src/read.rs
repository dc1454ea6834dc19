// Copyright (c) 2018 Fabian Schuiki

//! Decoding of SDF2 parse tables.
//!
//! A table is an ATerm of the form
//! `parse-table(version, initial, labels, states([...]), priorities([...]))`.
//! Characters and production labels share one index space: indices up to 255
//! are characters, 256 is the end of the input, and everything from 257
//! upwards is a label. Gotos and action sets list characters and labels in
//! a single list of integers and `range(lo, hi)` terms, which this module
//! partitions again.
//!
//! Decoding either yields a complete, cross-checked table or fails; no partial
//! table is ever returned.

use std::collections::HashMap;

use bit_set::BitSet;
use indexmap::IndexSet;
use log::debug;
use thiserror::Error;

use crate::aterm::{self, ReadError, Term};
use crate::codepoint::{CodePoint, CodePointSet};
use crate::symbol::{Attributes, ProductionType, Status, Symbol};
use crate::table::{
    Gotos, Label, ParseTable, Priorities, Priority, Production, Reduction, Reductions, Shifts,
    StateId, SymbolId,
};

/// The highest index denoting a character. This is the 8-bit end of input.
const CHARACTER_MAX: i64 = 256;
/// The lowest index denoting a label.
const LABEL_BASE: i64 = 257;
/// The table versions this decoder understands.
const VERSIONS: [i64; 2] = [4, 6];

/// An error encountered while decoding a parse table.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTableError {
    #[error("unsupported parse table version {0}, only versions 4 and 6 are supported")]
    Version(i64),
    #[error("expected {expected}, found `{found}`")]
    Shape { expected: String, found: String },
    #[error("index {0} is a character, not a production label")]
    NotALabel(i64),
    #[error("label index {index} lies outside the {count} productions")]
    LabelRange { index: i64, count: usize },
    #[error("production {0} is defined more than once")]
    DuplicateProduction(usize),
    #[error("state index {index} lies outside the {count} states")]
    StateRange { index: i64, count: usize },
    #[error("state {0} is defined more than once")]
    DuplicateState(usize),
    #[error("invalid character index {0}")]
    Character(i64),
    #[error("reduce by production {label} declares arity {declared}, but the production has {actual} children")]
    Arity {
        label: usize,
        declared: i64,
        actual: usize,
    },
    #[error("reduce by production {label} declares status {declared}, but the production has status {actual}")]
    Status {
        label: usize,
        declared: i64,
        actual: i64,
    },
    #[error("state {state} has conflicting gotos on `{symbol}` to {first} and {second}")]
    ConflictingGoto {
        state: usize,
        symbol: String,
        first: StateId,
        second: StateId,
    },
    #[error("multi-character lookahead restrictions are not supported")]
    MultipleLookahead,
    #[error("unknown priority `{0}`")]
    UnknownPriority(String),
    #[error("syntax error in parse table: {0}")]
    Syntax(#[from] ReadError),
}

impl InvalidTableError {
    /// Create an error for a term that does not have the expected shape.
    pub fn shape<S: Into<String>>(expected: S, term: &Term) -> InvalidTableError {
        let mut found = term.to_string();
        if found.len() > 80 {
            let mut end = 77;
            while !found.is_char_boundary(end) {
                end -= 1;
            }
            found.truncate(end);
            found.push_str("...");
        }
        InvalidTableError::Shape {
            expected: expected.into(),
            found,
        }
    }
}

/// Decode a parse table from the textual ATerm representation.
pub fn read_table_str(text: &str) -> Result<ParseTable, InvalidTableError> {
    let term = aterm::read(text)?;
    read_table(&term)
}

/// Decode a parse table from its term representation.
pub fn read_table(term: &Term) -> Result<ParseTable, InvalidTableError> {
    let pt = expect(term, "parse-table", 5)?;
    let version = int(&pt[0])?;
    if !VERSIONS.contains(&version) {
        return Err(InvalidTableError::Version(version));
    }

    let productions = read_productions(list(&pt[2])?)?;
    let state_list = list(&expect(&pt[3], "states", 1)?[0])?;
    let num_states = state_list.len();
    let initial = state(&pt[1], num_states)?;
    let states = read_states(state_list, &productions)?;
    let priorities = read_priorities(
        list(&expect(&pt[4], "priorities", 1)?[0])?,
        productions.len(),
    )?;

    // Intern the result symbols of all productions.
    let mut symbols = IndexSet::new();
    let productions: Vec<Production> = productions
        .into_iter()
        .enumerate()
        .map(|(i, (rhs, result, attrs))| {
            let (id, _) = symbols.insert_full(result.clone());
            Production {
                label: Label::from_usize(i),
                rhs,
                result,
                symbol: SymbolId::from_usize(id),
                attrs,
            }
        })
        .collect();

    let shifts = create_shifts(&states);
    let gotos = create_gotos(&states, &productions, &symbols)?;
    let reductions = create_reductions(&states);
    let accepts = states
        .iter()
        .map(|s| {
            let mut set = CodePointSet::new();
            for a in s.actions.iter().filter(|a| a.accept) {
                set.union_with(&a.characters);
            }
            set
        })
        .collect();
    let rejectable = find_rejectable(&gotos, &productions, symbols.len());

    let special = productions
        .iter()
        .filter(|p| p.production_type() != ProductionType::Normal)
        .count();
    debug!(
        "read parse table version {} with {} states, {} productions ({} recovery or completion), {} priorities",
        version,
        num_states,
        productions.len(),
        special,
        priorities.len()
    );

    Ok(ParseTable {
        version: version as u32,
        initial,
        productions,
        symbols,
        shifts,
        gotos,
        reductions,
        accepts,
        priorities,
        rejectable,
    })
}

/// A state as it appears in the table, before the actions are split up.
struct RawState {
    gotos: Vec<RawGoto>,
    actions: Vec<RawAction>,
}

struct RawGoto {
    characters: CodePointSet,
    labels: Vec<Label>,
    next: StateId,
}

struct RawAction {
    characters: CodePointSet,
    shift: Option<StateId>,
    reductions: Vec<Reduction>,
    accept: bool,
}

type RawProduction = (Vec<Symbol>, Symbol, Attributes);

fn expect<'a>(term: &'a Term, name: &str, arity: usize) -> Result<&'a [Term], InvalidTableError> {
    term.as_appl(name, arity)
        .ok_or_else(|| InvalidTableError::shape(format!("{}/{}", name, arity), term))
}

fn int(term: &Term) -> Result<i64, InvalidTableError> {
    term.as_int()
        .ok_or_else(|| InvalidTableError::shape("integer", term))
}

fn list(term: &Term) -> Result<&[Term], InvalidTableError> {
    term.as_list()
        .ok_or_else(|| InvalidTableError::shape("list", term))
}

fn state(term: &Term, count: usize) -> Result<StateId, InvalidTableError> {
    let index = int(term)?;
    if index < 0 || index as usize >= count {
        return Err(InvalidTableError::StateRange { index, count });
    }
    Ok(StateId::from_usize(index as usize))
}

/// Map a raw index from the shared index space to a label.
fn label(index: i64, count: usize) -> Result<Label, InvalidTableError> {
    if index < LABEL_BASE {
        return Err(InvalidTableError::NotALabel(index));
    }
    let i = (index - LABEL_BASE) as usize;
    if i >= count {
        return Err(InvalidTableError::LabelRange { index, count });
    }
    Ok(Label::from_usize(i))
}

/// Read the productions from a list of `label(prod(...), index)` terms.
fn read_productions(terms: &[Term]) -> Result<Vec<RawProduction>, InvalidTableError> {
    let count = terms.len();
    let mut result: Vec<Option<RawProduction>> = vec![None; count];
    for term in terms {
        let args = expect(term, "label", 2)?;
        let label = label(int(&args[1])?, count)?;
        let prod = expect(&args[0], "prod", 3)?;
        let rhs = list(&prod[0])?
            .iter()
            .map(Symbol::from_term)
            .collect::<Result<Vec<_>, _>>()?;
        let result_symbol = Symbol::from_term(&prod[1])?;
        let attrs = Attributes::from_term(&prod[2])?;
        let slot = &mut result[label.as_usize()];
        if slot.is_some() {
            return Err(InvalidTableError::DuplicateProduction(label.as_usize()));
        }
        *slot = Some((rhs, result_symbol, attrs));
    }
    // Every label is in range and unique, so all slots are filled.
    Ok(result.into_iter().flatten().collect())
}

/// Parse the characters of a list of integers and `range(lo, hi)` terms.
///
/// Labels in the list are ignored. The 8-bit end-of-input marker is replaced
/// by `CodePoint::EOF`.
pub(crate) fn character_set(terms: &[Term]) -> Result<CodePointSet, InvalidTableError> {
    let mut set = CodePointSet::new();
    for term in terms {
        let (lo, hi) = range(term)?;
        if lo > CHARACTER_MAX {
            continue;
        }
        let hi = hi.min(CHARACTER_MAX);
        set.insert_range(code_point(lo)?, code_point(hi)?);
    }
    let eof8 = code_point(CHARACTER_MAX)?;
    if set.contains(eof8) {
        set.remove(eof8);
        set.insert(CodePoint::EOF);
    }
    Ok(set)
}

/// Parse the labels of a list of integers and `range(lo, hi)` terms.
///
/// Characters in the list are ignored.
fn label_set(terms: &[Term], count: usize) -> Result<Vec<Label>, InvalidTableError> {
    let mut labels = Vec::new();
    for term in terms {
        let (lo, hi) = range(term)?;
        let lo = lo.max(LABEL_BASE);
        for index in lo..=hi {
            labels.push(label(index, count)?);
        }
    }
    Ok(labels)
}

fn range(term: &Term) -> Result<(i64, i64), InvalidTableError> {
    if let Some(v) = term.as_int() {
        Ok((v, v))
    } else if let Some(args) = term.as_appl("range", 2) {
        Ok((int(&args[0])?, int(&args[1])?))
    } else {
        Err(InvalidTableError::shape("character, label or range/2", term))
    }
}

fn code_point(index: i64) -> Result<CodePoint, InvalidTableError> {
    if index < 0 || index > i64::from(std::u32::MAX) {
        return Err(InvalidTableError::Character(index));
    }
    CodePoint::new(index as u32).ok_or(InvalidTableError::Character(index))
}

/// Read the states from a list of `state-rec(index, gotos, actions)` terms.
///
/// State indices must cover `0..n` exactly, where `n` is the length of the
/// list. Out of range and repeated indices are errors, which rules out gaps.
fn read_states(
    terms: &[Term],
    productions: &[RawProduction],
) -> Result<Vec<RawState>, InvalidTableError> {
    let count = terms.len();
    let mut result: Vec<Option<RawState>> = (0..count).map(|_| None).collect();
    for term in terms {
        let args = expect(term, "state-rec", 3)?;
        let index = state(&args[0], count)?.as_usize();
        let gotos = list(&args[1])?
            .iter()
            .map(|t| read_goto(t, count, productions.len()))
            .collect::<Result<Vec<_>, _>>()?;
        let actions = list(&args[2])?
            .iter()
            .map(|t| read_action(t, count, productions))
            .collect::<Result<Vec<_>, _>>()?;
        let slot = &mut result[index];
        if slot.is_some() {
            return Err(InvalidTableError::DuplicateState(index));
        }
        *slot = Some(RawState { gotos, actions });
    }
    // Every index is in range and unique, so all slots are filled.
    Ok(result.into_iter().flatten().collect())
}

/// Read a `goto(set, next)` term.
fn read_goto(
    term: &Term,
    num_states: usize,
    num_productions: usize,
) -> Result<RawGoto, InvalidTableError> {
    let args = expect(term, "goto", 2)?;
    let set = list(&args[0])?;
    Ok(RawGoto {
        characters: character_set(set)?,
        labels: label_set(set, num_productions)?,
        next: state(&args[1], num_states)?,
    })
}

/// Read an `action(set, items)` term.
fn read_action(
    term: &Term,
    num_states: usize,
    productions: &[RawProduction],
) -> Result<RawAction, InvalidTableError> {
    let args = expect(term, "action", 2)?;
    let mut action = RawAction {
        characters: character_set(list(&args[0])?)?,
        shift: None,
        reductions: Vec::new(),
        accept: false,
    };
    for item in list(&args[1])? {
        if item.is_appl("accept", 0) {
            action.accept = true;
        } else if let Some(a) = item.as_appl("shift", 1) {
            action.shift = Some(state(&a[0], num_states)?);
        } else if let Some(a) = item
            .as_appl("reduce", 3)
            .or_else(|| item.as_appl("reduce", 4))
        {
            action.reductions.push(read_reduce(a, productions)?);
        } else {
            return Err(InvalidTableError::shape("accept, shift/1 or reduce/3,4", item));
        }
    }
    Ok(action)
}

/// Read the arguments of a `reduce(arity, label, status[, lookahead])` term
/// and check them against the production.
fn read_reduce(
    args: &[Term],
    productions: &[RawProduction],
) -> Result<Reduction, InvalidTableError> {
    let arity = int(&args[0])?;
    let label = label(int(&args[1])?, productions.len())?;
    let status = int(&args[2])?;
    let (ref rhs, _, ref attrs) = productions[label.as_usize()];

    if arity < 0 || arity as usize != rhs.len() {
        return Err(InvalidTableError::Arity {
            label: label.as_usize(),
            declared: arity,
            actual: rhs.len(),
        });
    }
    if Status::from_code(status) != Some(attrs.status) {
        return Err(InvalidTableError::Status {
            label: label.as_usize(),
            declared: status,
            actual: attrs.status as i64,
        });
    }

    let lookahead = match args.get(3) {
        Some(t) => read_lookahead(list(t)?)?,
        None => Vec::new(),
    };
    Ok(Reduction {
        production: label,
        lookahead,
    })
}

/// Read the lookahead restrictions of a reduce action.
///
/// Two encodings exist: `look(char-class(set), next)` and
/// `follow-restriction([char-class(set), next...])`. Either way, a non-empty
/// `next` part would restrict characters further ahead, which is not
/// supported.
fn read_lookahead(terms: &[Term]) -> Result<Vec<CodePointSet>, InvalidTableError> {
    let mut result = Vec::with_capacity(terms.len());
    for term in terms {
        let (class, next) = if let Some(args) = term.as_appl("look", 2) {
            let class = match args[0].as_list() {
                Some(l) => l,
                None => list(&expect(&args[0], "char-class", 1)?[0])?,
            };
            (class, list(&args[1])?)
        } else if let Some(args) = term.as_appl("follow-restriction", 1) {
            let items = list(&args[0])?;
            let first = items
                .first()
                .ok_or_else(|| InvalidTableError::shape("char-class/1", term))?;
            (list(&expect(first, "char-class", 1)?[0])?, &items[1..])
        } else {
            return Err(InvalidTableError::shape("look/2 or follow-restriction/1", term));
        };
        if !next.is_empty() {
            return Err(InvalidTableError::MultipleLookahead);
        }
        result.push(character_set(class)?);
    }
    Ok(result)
}

/// Read the priorities.
///
/// Only the "greater" relations matter to the runtime; associativity
/// declarations are accepted and dropped, as are reflexive priorities.
fn read_priorities(terms: &[Term], count: usize) -> Result<Priorities, InvalidTableError> {
    let mut prios = Priorities::default();
    for term in terms {
        match (term.name(), term.args()) {
            (Some("gtr-prio"), Some(a)) if a.len() == 2 => prios.add(Priority {
                winner: label(int(&a[0])?, count)?,
                loser: label(int(&a[1])?, count)?,
                argument: None,
            }),
            (Some("arg-gtr-prio"), Some(a)) if a.len() == 3 => {
                let arg = int(&a[1])?;
                if arg < 0 {
                    return Err(InvalidTableError::shape("argument position", &a[1]));
                }
                prios.add(Priority {
                    winner: label(int(&a[0])?, count)?,
                    loser: label(int(&a[2])?, count)?,
                    argument: Some(arg as usize),
                })
            }
            (Some("left-prio"), _)
            | (Some("right-prio"), _)
            | (Some("non-assoc"), _)
            | (Some("assoc"), _) => (),
            _ => return Err(InvalidTableError::UnknownPriority(term.to_string())),
        }
    }
    Ok(prios)
}

/// Collect the shift actions of each state.
///
/// Reading the end of the input is a shift as well: the table expresses it as
/// a goto on the end-of-input character out of the accepting state.
fn create_shifts(states: &[RawState]) -> Shifts {
    let states = states
        .iter()
        .map(|state| {
            let mut shifts: Vec<(CodePointSet, StateId)> = state
                .actions
                .iter()
                .filter_map(|a| a.shift.map(|next| (a.characters.clone(), next)))
                .collect();
            if let Some(g) = state
                .gotos
                .iter()
                .find(|g| g.characters.contains(CodePoint::EOF))
            {
                shifts.push((g.characters.clone(), g.next));
            }
            shifts
        })
        .collect();
    Shifts { states }
}

/// Collect the goto actions of each state, keyed by the result symbol of the
/// productions they list.
///
/// Gotos on characters duplicate the shift actions and are dropped.
fn create_gotos(
    states: &[RawState],
    productions: &[Production],
    symbols: &IndexSet<Symbol>,
) -> Result<Gotos, InvalidTableError> {
    let mut result = Vec::with_capacity(states.len());
    for (index, state) in states.iter().enumerate() {
        let mut gotos = HashMap::new();
        for g in &state.gotos {
            for &label in &g.labels {
                let symbol = productions[label.as_usize()].symbol;
                if let Some(first) = gotos.insert(symbol, g.next) {
                    if first != g.next {
                        return Err(InvalidTableError::ConflictingGoto {
                            state: index,
                            symbol: symbols[symbol.as_usize()].to_string(),
                            first,
                            second: g.next,
                        });
                    }
                }
            }
        }
        result.push(gotos);
    }
    Ok(Gotos { states: result })
}

/// Collect the reduce actions of each state, grouped by character set.
fn create_reductions(states: &[RawState]) -> Reductions {
    let states = states
        .iter()
        .map(|state| {
            state
                .actions
                .iter()
                .filter(|a| !a.reductions.is_empty())
                .map(|a| (a.characters.clone(), a.reductions.clone()))
                .collect()
        })
        .collect();
    Reductions { states }
}

/// Find the states entered by a goto on the result of a reject production.
fn find_rejectable(gotos: &Gotos, productions: &[Production], num_symbols: usize) -> BitSet {
    let mut reject_symbols = BitSet::with_capacity(num_symbols);
    for p in productions.iter().filter(|p| p.is_reject()) {
        reject_symbols.insert(p.symbol.as_usize());
    }
    let mut rejectable = BitSet::new();
    for state in &gotos.states {
        for (symbol, next) in state {
            if reject_symbols.contains(symbol.as_usize()) {
                rejectable.insert(next.as_usize());
            }
        }
    }
    rejectable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(text: &str) -> CodePointSet {
        let t = aterm::read(text).unwrap();
        character_set(t.as_list().unwrap()).unwrap()
    }

    fn cp(v: u32) -> CodePoint {
        CodePoint::new(v).unwrap()
    }

    #[test]
    fn character_ranges() {
        let set = chars("[range(9,10),13,32]");
        for &v in &[9, 10, 13, 32] {
            assert!(set.contains(cp(v)), "{} should be a member", v);
        }
        for &v in &[11, 31, 33] {
            assert!(!set.contains(cp(v)), "{} should not be a member", v);
        }
    }

    #[test]
    fn eof_is_remapped() {
        let set = chars("[97,256]");
        assert!(set.contains(CodePoint::EOF));
        assert!(!set.contains(cp(256)));
        assert!(set.contains(cp(97)));

        let set = chars("[range(250,300)]");
        assert!(set.contains(CodePoint::EOF));
        assert!(set.contains(cp(255)));
        assert!(!set.contains(cp(256)));
        assert!(!set.contains(cp(257)));
    }

    #[test]
    fn labels_are_partitioned() {
        let t = aterm::read("[97,range(255,259),300]").unwrap();
        let items = t.as_list().unwrap();
        let labels = label_set(&items[..2], 10).unwrap();
        assert_eq!(
            labels,
            vec![Label::from_usize(0), Label::from_usize(1), Label::from_usize(2)]
        );
        assert_eq!(
            label_set(items, 10),
            Err(InvalidTableError::LabelRange {
                index: 300,
                count: 10
            })
        );
        let set = character_set(items).unwrap();
        assert_eq!(set.ranges(), &[(97, 97), (255, 255)]);
        assert!(set.contains(CodePoint::EOF));
    }

    #[test]
    fn lookahead_encodings() {
        let t = aterm::read("[look(char-class([42,47]),[]),follow-restriction([char-class([range(48,57)])])]")
            .unwrap();
        let sets = read_lookahead(t.as_list().unwrap()).unwrap();
        assert_eq!(sets.len(), 2);
        assert!(sets[0].contains(cp(42)));
        assert!(sets[1].contains(cp(50)));
    }

    #[test]
    fn multi_character_lookahead_is_rejected() {
        for text in &[
            "[look(char-class([42]),[look(char-class([47]),[])])]",
            "[follow-restriction([char-class([42]),char-class([47])])]",
        ] {
            let t = aterm::read(text).unwrap();
            assert_eq!(
                read_lookahead(t.as_list().unwrap()),
                Err(InvalidTableError::MultipleLookahead)
            );
        }
    }

    #[test]
    fn priorities() {
        let t = aterm::read(
            "[gtr-prio(258,257),arg-gtr-prio(257,2,257),left-prio(257,257),non-assoc(258,257)]",
        )
        .unwrap();
        let prios = read_priorities(t.as_list().unwrap(), 2).unwrap();
        assert_eq!(prios.len(), 1);
        assert!(prios.forbids(Label::from_usize(1), 0, Label::from_usize(0)));

        let t = aterm::read("[gtr-prio(258,400)]").unwrap();
        assert!(read_priorities(t.as_list().unwrap(), 2).is_err());
        let t = aterm::read("[frob-prio(258,257)]").unwrap();
        assert!(read_priorities(t.as_list().unwrap(), 2).is_err());
    }

    #[test]
    fn shape_errors_are_truncated() {
        let long = format!("[{}]", vec!["1"; 100].join(","));
        let t = aterm::read(&long).unwrap();
        match InvalidTableError::shape("thing", &t) {
            InvalidTableError::Shape { found, .. } => assert_eq!(found.len(), 80),
            e => panic!("unexpected error {:?}", e),
        }
    }
}
