// Copyright (c) 2018 Fabian Schuiki

//! Decoding of parse tables and the character sets they contain.

use proptest::prelude::*;
use sglr::codepoint::{CodePoint, CodePointSet};
use sglr::read::{read_table_str, InvalidTableError};
use sglr::symbol::{Status, Symbol};
use sglr::table::{Label, ParseTable, StateId};

const KEYWORD: &str = include_str!("tables/keyword.tbl");
const REJECT: &str = include_str!("tables/reject.tbl");
const PRIORITY: &str = include_str!("tables/priority.tbl");

fn cp(v: u32) -> CodePoint {
    CodePoint::new(v).unwrap()
}

#[test]
fn keyword_table() {
    let table: ParseTable = KEYWORD.parse().unwrap();
    assert_eq!(table.version(), 4);
    assert_eq!(table.initial_state(), StateId::from_usize(0));
    assert_eq!(table.num_states(), 12);
    assert_eq!(table.productions().len(), 3);

    let lit = table.production(Label::from_usize(0));
    assert_eq!(lit.arity(), 7);
    assert_eq!(lit.result, Symbol::Lit("keyword".to_string()));
    assert!(lit.result.is_literal());
    let s = table.production(Label::from_usize(1));
    assert_eq!(s.attrs.constructor.as_ref().map(String::as_str), Some("Keyword"));

    let s0 = StateId::from_usize(0);
    assert_eq!(
        table.shifts().get(s0, cp('k' as u32)),
        Some(StateId::from_usize(1))
    );
    assert_eq!(table.shifts().get(s0, cp('x' as u32)), None);
    let goto = table.gotos().get(s0, lit.symbol);
    assert_eq!(goto, Some(StateId::from_usize(8)));
    assert_eq!(table.symbol_id(&lit.result), Some(lit.symbol));
    assert_eq!(table.symbol(lit.symbol), &lit.result);
    assert_eq!(table.symbol_id(&Symbol::Sort("T".to_string())), None);

    let s7 = StateId::from_usize(7);
    let reductions = table.reductions().get(s7, CodePoint::EOF);
    assert_eq!(reductions.len(), 1);
    assert_eq!(reductions[0].production, Label::from_usize(0));
    assert!(table.reductions().get(s7, cp('k' as u32)).is_empty());

    assert!(table.accepts(StateId::from_usize(10), CodePoint::EOF));
    assert!(!table.accepts(StateId::from_usize(9), CodePoint::EOF));
    assert!(table.priorities().is_empty());
}

#[test]
fn reject_states_are_marked() {
    let table: ParseTable = REJECT.parse().unwrap();
    let reject = table.production(Label::from_usize(2));
    assert!(reject.is_reject());
    assert_eq!(reject.status(), Status::Reject);
    let rejectable: Vec<usize> = (0..table.num_states())
        .filter(|&s| table.is_rejectable(StateId::from_usize(s)))
        .collect();
    assert_eq!(rejectable, vec![5]);
}

#[test]
fn priorities_are_decoded() {
    let table: ParseTable = PRIORITY.parse().unwrap();
    let prios = table.priorities();
    // The associativity declaration is dropped.
    assert_eq!(prios.len(), 1);
    let add = Label::from_usize(1);
    let mul = Label::from_usize(2);
    assert!(prios.forbids(mul, 0, add));
    assert!(prios.forbids(mul, 2, add));
    assert!(!prios.forbids(add, 0, mul));
}

#[test]
fn syntax_errors_are_wrapped() {
    match read_table_str("parse-table(4, 0, [") {
        Err(InvalidTableError::Syntax(_)) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }
}

#[test]
fn malformed_tables_are_rejected() {
    // With as many records as states, a gap always shows up as a duplicate.
    let gap = KEYWORD.replace("state-rec(11, [], [])", "state-rec(10, [], [])");
    match read_table_str(&gap) {
        Err(InvalidTableError::DuplicateState(10)) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let bad_shift = KEYWORD.replace("shift(7)", "shift(12)");
    match read_table_str(&bad_shift) {
        Err(InvalidTableError::StateRange {
            index: 12,
            count: 12,
        }) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let bad_initial = KEYWORD.replacen("parse-table(4, 0,", "parse-table(4, -1,", 1);
    match read_table_str(&bad_initial) {
        Err(InvalidTableError::StateRange { index: -1, .. }) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let character_label = KEYWORD.replace("reduce(1, 259, 0)", "reduce(1, 99, 0)");
    match read_table_str(&character_label) {
        Err(InvalidTableError::NotALabel(99)) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let duplicate_label = KEYWORD.replace("cons(\"Keyword\"))])), 258)", "cons(\"Keyword\"))])), 257)");
    match read_table_str(&duplicate_label) {
        Err(InvalidTableError::DuplicateProduction(0)) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let conflicting = KEYWORD.replace("goto([258], 9)", "goto([258], 9), goto([258], 8)");
    match read_table_str(&conflicting) {
        Err(InvalidTableError::ConflictingGoto {
            state: 0,
            first,
            second,
            ..
        }) => {
            assert_eq!(first, StateId::from_usize(9));
            assert_eq!(second, StateId::from_usize(8));
        }
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let bad_arity = KEYWORD.replace("reduce(7, 257, 0)", "reduce(6, 257, 0)");
    match read_table_str(&bad_arity) {
        Err(InvalidTableError::Arity {
            label: 0,
            declared: 6,
            actual: 7,
        }) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let bad_status = KEYWORD.replace("reduce(1, 259, 0)", "reduce(1, 259, 1)");
    match read_table_str(&bad_status) {
        Err(InvalidTableError::Status { label: 2, .. }) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let bad_label = KEYWORD.replace("reduce(1, 259, 0)", "reduce(1, 300, 0)");
    match read_table_str(&bad_label) {
        Err(InvalidTableError::LabelRange { index: 300, .. }) => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }

    let bad_shape = KEYWORD.replace("no-attrs), 259)", "42), 259)");
    match read_table_str(&bad_shape) {
        Err(InvalidTableError::Shape { ref expected, .. }) if expected == "attrs/1" => (),
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }
}

#[test]
fn version_6_is_supported() {
    let text = KEYWORD.replacen("parse-table(4,", "parse-table(6,", 1);
    let table = read_table_str(&text).unwrap();
    assert_eq!(table.version(), 6);
}

proptest! {
    #[test]
    fn unsupported_versions_are_rejected(version in any::<i32>()) {
        prop_assume!(version != 4 && version != 6);
        let text = KEYWORD.replacen(
            "parse-table(4,",
            &format!("parse-table({},", version),
            1,
        );
        match read_table_str(&text) {
            Err(InvalidTableError::Version(v)) => prop_assert_eq!(v, i64::from(version)),
            r => prop_assert!(false, "unexpected result {:?}", r.map(|_| ())),
        }
    }

    #[test]
    fn character_sets_match_a_naive_model(
        ops in prop::collection::vec((any::<bool>(), 0u32..64, 0u32..64), 0..24)
    ) {
        let mut set = CodePointSet::new();
        let mut model = [false; 64];
        for &(insert, lo, hi) in &ops {
            if insert {
                set.insert_range(cp(lo), cp(hi));
            } else {
                set.remove_range(cp(lo), cp(hi));
            }
            if lo <= hi {
                for slot in &mut model[lo as usize..=hi as usize] {
                    *slot = insert;
                }
            }
        }
        for (v, &member) in model.iter().enumerate() {
            prop_assert_eq!(set.contains(cp(v as u32)), member);
        }
        prop_assert!(!set.contains(CodePoint::EOF));
        prop_assert_eq!(set.is_empty(), !model.iter().any(|&m| m));

        // The ranges stay sorted, disjoint and non-adjacent.
        for pair in set.ranges().windows(2) {
            prop_assert!(pair[0].1 + 1 < pair[1].0);
        }
    }
}
