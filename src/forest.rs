// Copyright (c) 2018 Fabian Schuiki

//! The parse forest.
//!
//! A forest is an arena of nodes that reference each other by id. Identical
//! subderivations are shared, so the forest is a DAG rather than a tree. Every
//! node records the span of the input it covers.
//!
//! Nodes are immutable once they are visible to the caller. While parsing, the
//! runtime may still turn the node of a stack link into an ambiguity in place,
//! such that every derivation already built on top of the link sees the new
//! alternative.

use std::collections::HashSet;
use std::fmt;
use std::ops::Index;

use crate::codepoint::CodePoint;
use crate::table::{Label, ParseTable};
use crate::Pretty;

/// A unique node identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a node id from a usize.
    pub fn from_usize(id: usize) -> NodeId {
        NodeId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A node in the parse forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// A derivation of a production.
    Application {
        /// The production.
        label: Label,
        /// One node per symbol of the production.
        children: Vec<NodeId>,
    },
    /// Alternative derivations of the same span.
    Ambiguity {
        /// The alternatives, none of which is itself an ambiguity.
        alternatives: Vec<NodeId>,
    },
    /// A derivation of a production that contains itself.
    Cycle {
        /// The production.
        label: Label,
    },
    /// A character of the input.
    Character(CodePoint),
}

impl Node {
    /// The production of an application or cycle.
    pub fn label(&self) -> Option<Label> {
        match *self {
            Node::Application { label, .. } | Node::Cycle { label } => Some(label),
            _ => None,
        }
    }
}

/// The range of input offsets a node covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// The offset of the first character.
    pub start: usize,
    /// The offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    /// Check whether the span covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// The outcome of merging a derivation into an existing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Merge {
    /// The derivation is already present.
    Duplicate,
    /// The derivation loses against the present ones.
    Avoided,
    /// The derivation wins against the present ones and replaced them.
    Preferred,
    /// The derivation was added as an alternative.
    Ambiguous,
    /// The derivation contains the node itself and was added as a cycle.
    Cycle,
}

/// A parse forest.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: Vec<Node>,
    spans: Vec<Span>,
}

impl Forest {
    /// Create an empty forest.
    pub fn new() -> Forest {
        Forest::default()
    }

    /// The number of nodes in the forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the forest is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node to the forest.
    pub fn add(&mut self, node: Node, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.spans.push(span);
        id
    }

    /// Access a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// The span of the input a node covers.
    pub fn span(&self, id: NodeId) -> Span {
        self.spans[id.0]
    }

    /// The derivations a node stands for: the alternatives of an ambiguity,
    /// or the node itself.
    pub fn alternatives(&self, id: NodeId) -> Vec<NodeId> {
        match self.nodes[id.0] {
            Node::Ambiguity { ref alternatives } => alternatives.clone(),
            _ => vec![id],
        }
    }

    /// Check whether any ambiguity is reachable from a node.
    pub fn has_ambiguity(&self, root: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut todo = vec![root];
        while let Some(id) = todo.pop() {
            if !seen.insert(id) {
                continue;
            }
            match self.nodes[id.0] {
                Node::Ambiguity { .. } => return true,
                Node::Application { ref children, .. } => todo.extend(children.iter().cloned()),
                _ => (),
            }
        }
        false
    }

    /// Check whether any cycle is reachable from a node.
    pub fn has_cycle(&self, root: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut todo = vec![root];
        while let Some(id) = todo.pop() {
            if !seen.insert(id) {
                continue;
            }
            match self.nodes[id.0] {
                Node::Cycle { .. } => return true,
                Node::Application { ref children, .. } => todo.extend(children.iter().cloned()),
                Node::Ambiguity { ref alternatives } => {
                    todo.extend(alternatives.iter().cloned())
                }
                Node::Character(_) => (),
            }
        }
        false
    }

    /// The characters a node derives.
    ///
    /// Ambiguities contribute their first alternative, cycles nothing.
    pub fn yield_string(&self, id: NodeId) -> String {
        let mut s = String::new();
        let mut todo = vec![id];
        while let Some(id) = todo.pop() {
            match self.nodes[id.0] {
                Node::Application { ref children, .. } => {
                    todo.extend(children.iter().rev().cloned())
                }
                Node::Ambiguity { ref alternatives } => todo.extend(alternatives.first().cloned()),
                Node::Cycle { .. } => (),
                Node::Character(c) => s.extend(c.as_char()),
            }
        }
        s
    }

    /// Overwrite a node.
    pub(crate) fn replace(&mut self, id: NodeId, node: Node) {
        self.nodes[id.0] = node;
    }

    /// Drop all nodes added after the forest had `len` nodes.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
        self.spans.truncate(len);
    }

    /// Merge another derivation of the same span into a node.
    ///
    /// A derivation that contains the node itself is replaced by a cycle. A
    /// derivation that is structurally identical to one of the node's
    /// alternatives is dropped. Otherwise the `prefer` and `avoid` statuses of
    /// the productions decide whether the derivation is dropped, replaces the
    /// node's content, or becomes an additional alternative. The node's id
    /// stays valid throughout.
    pub(crate) fn merge(&mut self, table: &ParseTable, target: NodeId, node: Node) -> Merge {
        let span = self.spans[target.0];
        let (node, cyclic) = match node.label() {
            Some(label) if self.reaches(&node, target) => (Node::Cycle { label }, true),
            _ => (node, false),
        };

        let present = self.alternatives(target);
        if present.iter().any(|&id| self.nodes[id.0] == node) {
            return Merge::Duplicate;
        }

        let own = rank(table, &node);
        let best = present
            .iter()
            .map(|&id| rank(table, &self.nodes[id.0]))
            .max()
            .unwrap_or(own);
        if own < best {
            return Merge::Avoided;
        }
        if own > best {
            self.nodes[target.0] = node;
            return Merge::Preferred;
        }

        let added = self.add(node, span);
        let moved = match self.nodes[target.0] {
            Node::Ambiguity {
                ref mut alternatives,
            } => {
                alternatives.push(added);
                None
            }
            ref other => Some(other.clone()),
        };
        if let Some(old) = moved {
            let old = self.add(old, span);
            self.nodes[target.0] = Node::Ambiguity {
                alternatives: vec![old, added],
            };
        }
        if cyclic {
            Merge::Cycle
        } else {
            Merge::Ambiguous
        }
    }

    /// Check whether a derivation contains a node.
    ///
    /// Only nodes covering the same span as the target can contain it, so the
    /// search does not descend into anything else.
    fn reaches(&self, node: &Node, target: NodeId) -> bool {
        let span = self.spans[target.0];
        let mut seen = HashSet::new();
        let mut todo: Vec<NodeId> = match *node {
            Node::Application { ref children, .. } => children.clone(),
            _ => return false,
        };
        while let Some(id) = todo.pop() {
            if id == target {
                return true;
            }
            if self.spans[id.0] != span || !seen.insert(id) {
                continue;
            }
            match self.nodes[id.0] {
                Node::Application { ref children, .. } => todo.extend(children.iter().cloned()),
                Node::Ambiguity { ref alternatives } => {
                    todo.extend(alternatives.iter().cloned())
                }
                _ => (),
            }
        }
        false
    }

    /// Apply the priorities of a table to the children of a derivation of
    /// `parent`.
    ///
    /// Returns `None` if a child violates a priority. Ambiguous children are
    /// narrowed down to their permitted alternatives; the ambiguity itself is
    /// left untouched since other derivations may share it.
    pub(crate) fn filter_priorities(
        &mut self,
        table: &ParseTable,
        parent: Label,
        children: &[NodeId],
    ) -> Option<Vec<NodeId>> {
        let prios = table.priorities();
        if prios.is_empty() {
            return Some(children.to_vec());
        }
        let mut result = Vec::with_capacity(children.len());
        for (arg, &child) in children.iter().enumerate() {
            let permitted = |node: &Node| match node.label() {
                Some(label) => !prios.forbids(parent, arg, label),
                None => true,
            };
            let narrowed = match self.nodes[child.0] {
                Node::Ambiguity { ref alternatives } => {
                    let kept: Vec<NodeId> = alternatives
                        .iter()
                        .cloned()
                        .filter(|id| permitted(&self.nodes[id.0]))
                        .collect();
                    if kept.is_empty() {
                        return None;
                    }
                    if kept.len() == alternatives.len() {
                        None
                    } else {
                        Some(kept)
                    }
                }
                ref node => {
                    if !permitted(node) {
                        return None;
                    }
                    None
                }
            };
            result.push(match narrowed {
                None => child,
                Some(ref kept) if kept.len() == 1 => kept[0],
                Some(kept) => {
                    let span = self.spans[child.0];
                    self.add(Node::Ambiguity { alternatives: kept }, span)
                }
            });
        }
        Some(result)
    }

    /// Render a node and its descendants in a human-readable notation.
    pub fn pretty<'a>(
        &'a self,
        table: &'a ParseTable,
        id: NodeId,
    ) -> Pretty<(&'a ParseTable, &'a Forest), NodeId> {
        Pretty::new((table, self), id)
    }
}

/// The rank of a derivation when filtering ambiguities. Higher wins.
fn rank(table: &ParseTable, node: &Node) -> u8 {
    match node.label() {
        Some(label) => table.production(label).status().rank(),
        None => 1,
    }
}

impl Index<NodeId> for Forest {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Node {
        self.node(index)
    }
}

/// A piece of pending output of the pretty printer.
enum Piece {
    Node(NodeId),
    Text(&'static str),
}

impl<'a> fmt::Display for Pretty<(&'a ParseTable, &'a Forest), NodeId> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (table, forest) = self.ctx;
        let mut todo = vec![Piece::Node(self.item)];
        while let Some(piece) = todo.pop() {
            let id = match piece {
                Piece::Node(id) => id,
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
            };
            let args: Vec<NodeId> = match forest[id] {
                Node::Application {
                    label,
                    ref children,
                } => {
                    let prod = &table[label];
                    if prod.result.is_literal() || prod.result.is_lexical() {
                        write!(f, "{:?}", forest.yield_string(id))?;
                        continue;
                    }
                    write!(f, "{}(", prod.result.inner())?;
                    prod.rhs
                        .iter()
                        .zip(children)
                        .filter(|&(symbol, _)| !symbol.is_layout())
                        .map(|(_, &child)| child)
                        .collect()
                }
                Node::Ambiguity { ref alternatives } => {
                    write!(f, "amb(")?;
                    alternatives.clone()
                }
                Node::Cycle { label } => {
                    write!(f, "cycle({})", table[label].result.inner())?;
                    continue;
                }
                Node::Character(c) => {
                    write!(f, "{}", c)?;
                    continue;
                }
            };
            todo.push(Piece::Text(")"));
            for (i, &arg) in args.iter().enumerate().rev() {
                todo.push(Piece::Node(arg));
                if i > 0 {
                    todo.push(Piece::Text(", "));
                }
            }
        }
        Ok(())
    }
}
