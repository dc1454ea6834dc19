// Copyright (c) 2018 Fabian Schuiki

//! End-to-end parses over small hand-written tables.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use sglr::aterm::Term;
use sglr::forest::{Forest, Node, NodeId};
use sglr::glr::{ParseResult, Parser, ParserConfig};
use sglr::implode::{ImplodeConfig, ImplodeError, Imploder};
use sglr::table::ParseTable;

fn table(text: &str) -> ParseTable {
    text.parse().unwrap()
}

fn parse(table: &ParseTable, input: &str) -> ParseResult {
    let result = Parser::new(table).parse_str(input);
    assert!(
        result.success,
        "parsing {:?} failed: {:?}",
        input, result.messages
    );
    result
}

fn render(table: &ParseTable, result: &ParseResult) -> String {
    result
        .forest
        .pretty(table, result.root.unwrap())
        .to_string()
}

/// The number of distinct trees a node stands for.
fn count_trees(forest: &Forest, id: NodeId) -> usize {
    match forest[id] {
        Node::Application { ref children, .. } => {
            children.iter().map(|&c| count_trees(forest, c)).product()
        }
        Node::Ambiguity { ref alternatives } => {
            alternatives.iter().map(|&a| count_trees(forest, a)).sum()
        }
        Node::Cycle { .. } => 0,
        Node::Character(_) => 1,
    }
}

#[test]
fn keyword() {
    let table = table(include_str!("tables/keyword.tbl"));
    let result = parse(&table, "keyword");
    let root = result.root.unwrap();
    assert_eq!(render(&table, &result), "<START>(S(\"keyword\"))");
    assert!(!result.forest.has_ambiguity(root));
    assert_eq!(result.forest.yield_string(root), "keyword");

    let term = Imploder::new(&table).implode(&result.forest, root).unwrap();
    assert_eq!(term.to_string(), "Keyword");
}

#[test]
fn keyword_prefix_fails_at_end() {
    let table = table(include_str!("tables/keyword.tbl"));
    let result = Parser::new(&table).parse_str("keyw");
    assert!(!result.success);
    assert_eq!(
        result.messages[0].to_string(),
        "error: 1:5: unexpected end of input"
    );
}

#[test]
fn reject_production_removes_derivation() {
    let table = table(include_str!("tables/reject.tbl"));
    let result = parse(&table, "ths");
    let root = result.root.unwrap();
    assert_eq!(render(&table, &result), "<START>(E(T(\"ths\")))");
    assert!(!result.forest.has_ambiguity(root));
}

#[test]
fn priorities_resolve_operator_nesting() {
    let table = table(include_str!("tables/priority.tbl"));

    let result = parse(&table, "a+a*a");
    let root = result.root.unwrap();
    assert!(!result.forest.has_ambiguity(root));
    assert_eq!(
        render(&table, &result),
        "<START>(E(E('a'), '+', E(E('a'), '*', E('a'))))"
    );
    let term = Imploder::new(&table).implode(&result.forest, root).unwrap();
    assert_eq!(
        term.to_string(),
        "Add(Var(\"a\"),\"+\",Mul(Var(\"a\"),\"*\",Var(\"a\")))"
    );

    let result = parse(&table, "a*a+a");
    let root = result.root.unwrap();
    assert!(!result.forest.has_ambiguity(root));
    let term = Imploder::new(&table).implode(&result.forest, root).unwrap();
    assert_eq!(
        term.to_string(),
        "Add(Mul(Var(\"a\"),\"*\",Var(\"a\")),\"+\",Var(\"a\"))"
    );
}

#[test]
fn unresolved_ambiguity_is_kept() {
    let table = table(include_str!("tables/priority.tbl"));
    let result = parse(&table, "a+a+a");
    let root = result.root.unwrap();
    assert!(result.forest.has_ambiguity(root));
    assert!(!result.forest.has_cycle(root));

    match Imploder::new(&table).implode(&result.forest, root) {
        Err(ImplodeError::Ambiguous {
            offset: 0,
            alternatives: 2,
        }) => (),
        r => panic!("unexpected implosion {:?}", r),
    }
    let config = ImplodeConfig::new().allow_ambiguity(true);
    let term = Imploder::with_config(&table, config)
        .implode(&result.forest, root)
        .unwrap();
    let text = term.to_string();
    assert!(text.starts_with("amb([Add("), "{}", text);
    assert!(text.contains("Add(Var(\"a\"),\"+\",Add("), "{}", text);
    assert!(text.contains("Add(Add("), "{}", text);
}

#[test]
fn reject_without_alternative_is_reported() {
    let text = include_str!("tables/reject.tbl").replace(
        "reduce(1, 258, 0), reduce(1, 259, 1), reduce(1, 260, 0)",
        "reduce(1, 258, 0), reduce(1, 259, 1)",
    );
    let table = table(&text);
    let result = Parser::new(&table).parse_str("ths");
    assert!(!result.success);
    assert_eq!(
        result.messages[0].to_string(),
        "error: 1:4: I is rejected by a reject production"
    );
    assert_eq!(result.messages[1].text, "unexpected end of input");
}

#[test]
fn derivations_over_empty_suffixes_are_complete() {
    let table = table(include_str!("tables/epsilon.tbl"));
    let result = parse(&table, "a+a+a");
    let root = result.root.unwrap();
    assert_eq!(count_trees(&result.forest, root), 2);

    let config = ImplodeConfig::new().allow_ambiguity(true);
    let imploder = Imploder::with_config(&table, config);
    let text = imploder.implode(&result.forest, root).unwrap().to_string();
    assert!(
        text.contains("Add(Add(Var(\"a\"),\"+\",Var(\"a\"),()),\"+\",Var(\"a\"),())"),
        "{}",
        text
    );
    assert!(
        text.contains("Add(Var(\"a\"),\"+\",Add(Var(\"a\"),\"+\",Var(\"a\"),()),())"),
        "{}",
        text
    );

    for &(input, trees) in &[("a", 1), ("a+a", 1), ("a+a+a+a", 5), ("a+a+a+a+a", 14)] {
        let result = parse(&table, input);
        assert_eq!(
            count_trees(&result.forest, result.root.unwrap()),
            trees,
            "{}",
            input
        );
    }
}

#[test]
fn long_lexical_iterations() {
    let table = table(include_str!("tables/lexical.tbl"));
    let input = "a".repeat(100_000);
    let result = parse(&table, &input);
    let root = result.root.unwrap();
    assert_eq!(result.forest.yield_string(root), input);
    let term = Imploder::new(&table).implode(&result.forest, root).unwrap();
    assert_eq!(term, Term::Str(input));
}

#[test]
fn cycles_are_detected() {
    let table = table(include_str!("tables/cycle.tbl"));
    let result = parse(&table, "a");
    let root = result.root.unwrap();
    assert_eq!(render(&table, &result), "<START>(amb(A('a'), cycle(A)))");
    assert!(result.forest.has_cycle(root));

    let config = ImplodeConfig::new().allow_ambiguity(true);
    match Imploder::with_config(&table, config).implode(&result.forest, root) {
        Err(ImplodeError::Cycle { offset: 0, .. }) => (),
        r => panic!("unexpected implosion {:?}", r),
    }
}

#[test]
fn follow_restriction_filters_reductions() {
    let text = include_str!("tables/follow.tbl");
    let table = table(text);
    let result = parse(&table, "abc");
    let root = result.root.unwrap();
    assert!(!result.forest.has_ambiguity(root));
    assert_eq!(render(&table, &result), "<START>(S(A('a'), 'b', 'c'))");

    // Without the restriction both derivations of `a` survive.
    let unrestricted = table_without_restriction(text);
    let result = parse(&unrestricted, "abc");
    assert!(result.forest.has_ambiguity(result.root.unwrap()));
}

fn table_without_restriction(text: &str) -> ParseTable {
    let text = text.replace(", [follow-restriction([char-class([99])])]", "");
    table(&text)
}

#[test]
fn unexpected_character_is_reported() {
    let table = table(include_str!("tables/follow.tbl"));
    let result = Parser::new(&table).parse_str("abd");
    assert!(!result.success);
    assert_eq!(
        result.messages[0].to_string(),
        "error: 1:3: unexpected 'd'"
    );
}

#[test]
fn cancelled_parse_fails() {
    let table = table(include_str!("tables/keyword.tbl"));
    let flag = Arc::new(AtomicBool::new(true));
    let config = ParserConfig::new().cancellation(flag);
    let result = Parser::with_config(&table, config).parse_str("keyword");
    assert!(!result.success);
    assert_eq!(result.messages[0].text, "parse cancelled");
}

#[test]
fn tables_are_shared_between_threads() {
    let table = Arc::new(table(include_str!("tables/keyword.tbl")));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let table = table.clone();
            thread::spawn(move || Parser::new(&table).parse_str("keyword").success)
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
