// Copyright (c) 2018 Fabian Schuiki

//! The GLR parser runtime.
//!
//! The parser executes a parse table directly over the characters of the
//! input. All frames at the current input position are kept in an active set,
//! at most one per state. Each position is processed in two phases:
//!
//! 1. The *reduce* phase works off a queue of frames. For every frame, every
//!    reduction applicable to the current character is performed along every
//!    path of the production's length. The resulting derivation is linked
//!    into the frame the goto leads to, creating that frame if needed. A link
//!    added to a frame after other frames have acted triggers their
//!    reductions again, limited to the paths through the new link. Frames in
//!    states that a reject production can lead to are acted upon last, such
//!    that their rejection is known before anything is built on top of them.
//! 2. The *shift* phase moves every live frame with a shift action on the
//!    current character to the next position.
//!
//! At the end of the input, the frames in accepting states yield the parse
//! trees. If no frame survives a position, the configured [`ErrorHandler`]
//! decides whether to skip the offending character or to give up.
//!
//! [`ErrorHandler`]: trait.ErrorHandler.html

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, trace, warn};

use crate::codepoint::CodePoint;
use crate::forest::{Forest, Merge, Node, NodeId, Span};
use crate::input::{CharacterInput, Location, Lookahead, StrInput};
use crate::stack::{self, FrameId, LinkId, Rejection, Stack};
use crate::table::{Label, ParseTable, Reduction, StateId};

/// The number of frames below which the stack is never pruned.
const PRUNE_MIN: usize = 256;

/// The configuration of a parser.
pub struct ParserConfig {
    cancel: Option<Arc<AtomicBool>>,
    handler: Box<dyn ErrorHandler>,
}

impl Default for ParserConfig {
    fn default() -> ParserConfig {
        ParserConfig {
            cancel: None,
            handler: Box::new(FailingErrorHandler),
        }
    }
}

impl ParserConfig {
    /// Create a default configuration.
    ///
    /// The default configuration cannot be cancelled and fails as soon as
    /// the input cannot be parsed any further.
    pub fn new() -> ParserConfig {
        ParserConfig::default()
    }

    /// Check a flag between input positions and abort the parse once it is
    /// set.
    pub fn cancellation(mut self, flag: Arc<AtomicBool>) -> ParserConfig {
        self.cancel = Some(flag);
        self
    }

    /// Use a different error handler.
    pub fn error_handler<H: ErrorHandler + 'static>(mut self, handler: H) -> ParserConfig {
        self.handler = Box::new(handler);
        self
    }
}

/// A parser for the language described by a parse table.
pub struct Parser<'t> {
    table: &'t ParseTable,
    config: ParserConfig,
}

impl<'t> Parser<'t> {
    /// Create a parser with the default configuration.
    pub fn new(table: &'t ParseTable) -> Parser<'t> {
        Parser::with_config(table, ParserConfig::default())
    }

    /// Create a parser with a custom configuration.
    pub fn with_config(table: &'t ParseTable, config: ParserConfig) -> Parser<'t> {
        Parser { table, config }
    }

    /// Parse a string.
    pub fn parse_str(&mut self, text: &str) -> ParseResult {
        self.parse(StrInput::new(text))
    }

    /// Parse a stream of characters.
    pub fn parse<I: CharacterInput>(&mut self, input: I) -> ParseResult {
        let mut input = Lookahead::new(input);
        let mut run = Run::new(self.table);
        let mut messages = Vec::new();
        let mut skipped = 0;

        let root = loop {
            if self.is_cancelled() {
                debug!("parse cancelled at {}", input.location());
                messages.push(Message {
                    kind: MessageKind::Error,
                    text: "parse cancelled".to_string(),
                    location: Some(input.location()),
                });
                break None;
            }

            let current = input.current();
            run.offset = input.location().offset;
            let checkpoint = run.checkpoint();
            run.reduce(current, input.peek());
            if current.is_eof() {
                if let Some(root) = run.accept() {
                    break Some(root);
                }
            } else if run.shift(current) {
                input.advance();
                run.prune();
                continue;
            }

            // No frame survived this position.
            if let Some(text) = run.rejected_derivation() {
                debug!("{} at {}", text, input.location());
                messages.push(Message {
                    kind: MessageKind::Error,
                    text,
                    location: Some(input.location()),
                });
            }
            let recovery = {
                let mut state = ParseState {
                    location: input.location(),
                    states: run.active.keys().cloned().collect(),
                    skipped,
                    messages: &mut messages,
                };
                self.config.handler.handle(current, &mut state)
            };
            match recovery {
                Recovery::Skip if !current.is_eof() => {
                    debug!("skipping {} at {}", current, input.location());
                    run.restore(checkpoint);
                    input.advance();
                    skipped += 1;
                }
                _ => break None,
            }
        };

        ParseResult {
            success: root.is_some(),
            root,
            forest: run.forest,
            messages,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.config
            .cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// The result of a parse.
#[derive(Debug)]
pub struct ParseResult {
    /// Whether the input was accepted.
    pub success: bool,
    /// The root of the parse forest, if the input was accepted.
    pub root: Option<NodeId>,
    /// The forest built during the parse.
    pub forest: Forest,
    /// The diagnostics emitted during the parse, in order.
    pub messages: Vec<Message>,
}

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The severity of the message.
    pub kind: MessageKind,
    /// The text of the message.
    pub text: String,
    /// The location in the input the message refers to.
    pub location: Option<Location>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: ", self.kind)?;
        if let Some(loc) = self.location {
            write!(f, "{}: ", loc)?;
        }
        write!(f, "{}", self.text)
    }
}

/// The severity of a diagnostic message.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    Info,
    Warning,
    Error,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MessageKind::Info => write!(f, "info"),
            MessageKind::Warning => write!(f, "warning"),
            MessageKind::Error => write!(f, "error"),
        }
    }
}

/// A view of a parse that got stuck, handed to the error handler.
pub struct ParseState<'a> {
    location: Location,
    states: Vec<StateId>,
    skipped: usize,
    messages: &'a mut Vec<Message>,
}

impl<'a> ParseState<'a> {
    /// The location of the offending character.
    pub fn location(&self) -> Location {
        self.location
    }

    /// The states of the frames that were live before the offending
    /// character.
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    /// The number of characters skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Emit a diagnostic at the location of the offending character.
    pub fn report<S: Into<String>>(&mut self, kind: MessageKind, text: S) {
        self.messages.push(Message {
            kind,
            text: text.into(),
            location: Some(self.location),
        });
    }
}

/// The decision of an error handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Drop the offending character and continue with the next one.
    Skip,
    /// Give up and fail the parse.
    Abandon,
}

/// A strategy to deal with input that cannot be parsed.
pub trait ErrorHandler {
    /// Called when no frame survives the `unexpected` character.
    ///
    /// The end of the input cannot be skipped; returning `Recovery::Skip` for
    /// it abandons the parse.
    fn handle(&mut self, unexpected: CodePoint, parse: &mut ParseState) -> Recovery;
}

/// An error handler that reports the offending character and gives up.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingErrorHandler;

impl ErrorHandler for FailingErrorHandler {
    fn handle(&mut self, unexpected: CodePoint, parse: &mut ParseState) -> Recovery {
        parse.report(MessageKind::Error, format!("unexpected {}", unexpected));
        Recovery::Abandon
    }
}

/// An error handler that skips a limited number of offending characters.
#[derive(Debug, Clone, Copy)]
pub struct SkippingErrorHandler {
    limit: usize,
}

impl SkippingErrorHandler {
    /// Create a handler that skips at most `limit` characters per parse.
    pub fn new(limit: usize) -> SkippingErrorHandler {
        SkippingErrorHandler { limit }
    }
}

impl ErrorHandler for SkippingErrorHandler {
    fn handle(&mut self, unexpected: CodePoint, parse: &mut ParseState) -> Recovery {
        if unexpected.is_eof() || parse.skipped() >= self.limit {
            parse.report(MessageKind::Error, format!("unexpected {}", unexpected));
            return Recovery::Abandon;
        }
        parse.report(
            MessageKind::Warning,
            format!("skipping unexpected {}", unexpected),
        );
        Recovery::Skip
    }
}

/// The processing status of an active frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Waiting in one of the queues.
    Queued,
    /// Its reductions have been performed.
    Acted,
    /// Passed over because all of its links were rejected.
    Skipped,
}

#[derive(Debug, Clone, Copy)]
struct Active {
    frame: FrameId,
    status: Status,
}

/// Everything needed to undo the work done at one input position.
struct Checkpoint {
    active: IndexMap<StateId, Active>,
    stack: stack::Checkpoint,
    forest_len: usize,
    nodes: Vec<(NodeId, Node)>,
}

/// The state of a single parse.
struct Run<'t> {
    table: &'t ParseTable,
    stack: Stack,
    forest: Forest,
    /// The frames at the current position, by state.
    active: IndexMap<StateId, Active>,
    queue: VecDeque<FrameId>,
    delayed: VecDeque<FrameId>,
    offset: usize,
    current: CodePoint,
    next: CodePoint,
    prune_mark: usize,
}

impl<'t> Run<'t> {
    fn new(table: &'t ParseTable) -> Run<'t> {
        let mut stack = Stack::new();
        let initial = table.initial_state();
        let frame = stack.add_frame(initial, 0);
        let mut active = IndexMap::new();
        active.insert(
            initial,
            Active {
                frame,
                status: Status::Queued,
            },
        );
        Run {
            table,
            stack,
            forest: Forest::new(),
            active,
            queue: VecDeque::new(),
            delayed: VecDeque::new(),
            offset: 0,
            current: CodePoint::EOF,
            next: CodePoint::EOF,
            prune_mark: PRUNE_MIN,
        }
    }

    /// Perform all reductions at the current position.
    fn reduce(&mut self, current: CodePoint, next: CodePoint) {
        self.current = current;
        self.next = next;
        trace!(
            "reducing {} frames on {} at offset {}",
            self.active.len(),
            current,
            self.offset
        );
        let frames: Vec<FrameId> = self
            .active
            .values_mut()
            .map(|a| {
                a.status = Status::Queued;
                a.frame
            })
            .collect();
        for frame in frames {
            self.enqueue(frame);
        }
        while let Some(frame) = self.dequeue() {
            self.act(frame);
        }
    }

    fn enqueue(&mut self, frame: FrameId) {
        if self.table.is_rejectable(self.stack[frame].state) {
            self.delayed.push_back(frame);
        } else {
            self.queue.push_back(frame);
        }
    }

    fn dequeue(&mut self) -> Option<FrameId> {
        match self.queue.pop_front() {
            Some(frame) => Some(frame),
            None => self.delayed.pop_front(),
        }
    }

    fn set_status(&mut self, state: StateId, status: Status) {
        if let Some(a) = self.active.get_mut(&state) {
            a.status = status;
        }
    }

    /// Perform the reductions of a frame.
    fn act(&mut self, frame: FrameId) {
        let state = self.stack[frame].state;
        if self.stack.is_rejected(frame) {
            trace!("skipping rejected {:?} in {}", frame, state);
            self.set_status(state, Status::Skipped);
            return;
        }
        self.set_status(state, Status::Acted);
        let table = self.table;
        for reduction in table.reductions().get(state, self.current) {
            if reduction.permits(self.next) {
                self.do_reductions(frame, reduction, None);
            }
        }
    }

    /// Perform a reduction along all paths leading back from a frame,
    /// optionally only those through a specific link.
    fn do_reductions(&mut self, frame: FrameId, reduction: &Reduction, through: Option<LinkId>) {
        let arity = self.table.production(reduction.production).arity();
        for path in self.stack.find_paths(frame, arity, through) {
            let children = path.parse_trees(&self.stack);
            self.reducer(path.frame(), reduction.production, children);
        }
    }

    /// Link a derivation of a production into the frame reached from
    /// `ancestor` through the production's goto.
    fn reducer(&mut self, ancestor: FrameId, label: Label, children: Vec<NodeId>) {
        let table = self.table;
        let prod = table.production(label);
        let from = self.stack[ancestor].state;
        let target = match table.gotos().get(from, prod.symbol) {
            Some(target) => target,
            None => {
                warn!("no goto from {} on {}", from, prod.result);
                return;
            }
        };
        let span = Span::new(self.stack[ancestor].offset, self.offset);

        let (children, rejection) = if prod.is_reject() {
            (children, Some(Rejection::Reject))
        } else {
            match self.forest.filter_priorities(table, label, &children) {
                Some(filtered) => (filtered, None),
                None => (children, Some(Rejection::Priority)),
            }
        };
        if let Some(r) = rejection {
            trace!("{:?} derivation of {}", r, prod);
        }
        let node = Node::Application { label, children };

        let existing = self.active.get(&target).map(|a| a.frame);
        match existing {
            None => {
                let frame = self.stack.add_frame(target, self.offset);
                let node = self.forest.add(node, span);
                self.stack.add_link(frame, ancestor, node, rejection);
                self.active.insert(
                    target,
                    Active {
                        frame,
                        status: Status::Queued,
                    },
                );
                self.enqueue(frame);
            }
            Some(frame) => match self.stack.find_link(frame, ancestor) {
                Some(link) => self.merge(frame, link, node, rejection),
                None => {
                    let node = self.forest.add(node, span);
                    let link = self.stack.add_link(frame, ancestor, node, rejection);
                    if rejection.is_none() {
                        self.link_added(frame, link);
                    }
                }
            },
        }
    }

    /// Merge a derivation into an existing link.
    fn merge(&mut self, frame: FrameId, link: LinkId, node: Node, rejection: Option<Rejection>) {
        let target = self.stack[link].node;
        match (self.stack[link].rejection, rejection) {
            (Some(Rejection::Reject), _) => (),
            (_, Some(Rejection::Reject)) => {
                trace!("rejecting {:?} of {:?}", link, frame);
                self.stack.set_rejection(link, Some(Rejection::Reject));
            }
            (_, Some(Rejection::Priority)) => (),
            (Some(Rejection::Priority), None) => {
                trace!("reviving {:?} of {:?}", link, frame);
                self.forest.replace(target, node);
                self.stack.set_rejection(link, None);
                self.link_added(frame, link);
            }
            (None, None) => match self.forest.merge(self.table, target, node) {
                Merge::Duplicate => (),
                outcome => trace!("merged into {} of {:?}: {:?}", target, link, outcome),
            },
        }
    }

    /// React to a live link that was added to an active frame.
    ///
    /// Frames that have already acted missed every path through the new
    /// link, including those that reach it over empty derivations on top of
    /// `frame`. Their reductions are redone, limited to such paths.
    fn link_added(&mut self, frame: FrameId, link: LinkId) {
        let state = self.stack[frame].state;
        if let Some(Status::Skipped) = self.active.get(&state).map(|a| a.status) {
            self.set_status(state, Status::Queued);
            self.enqueue(frame);
        }
        let acted: Vec<FrameId> = self
            .active
            .values()
            .filter(|a| a.status == Status::Acted)
            .map(|a| a.frame)
            .collect();
        let table = self.table;
        for other in acted {
            if self.stack.is_rejected(other) {
                continue;
            }
            let state = self.stack[other].state;
            for reduction in table.reductions().get(state, self.current) {
                if reduction.permits(self.next) {
                    self.do_reductions(other, reduction, Some(link));
                }
            }
        }
    }

    /// Shift the live frames over a character. Returns false if none could.
    fn shift(&mut self, c: CodePoint) -> bool {
        let Run {
            table,
            ref mut stack,
            ref mut forest,
            ref active,
            offset,
            ..
        } = *self;
        let mut next: IndexMap<StateId, Active> = IndexMap::new();
        let mut leaf = None;
        for a in active.values() {
            if stack.is_rejected(a.frame) {
                continue;
            }
            let target = match table.shifts().get(stack[a.frame].state, c) {
                Some(target) => target,
                None => continue,
            };
            let node = *leaf.get_or_insert_with(|| {
                forest.add(Node::Character(c), Span::new(offset, offset + 1))
            });
            let to = next
                .entry(target)
                .or_insert_with(|| Active {
                    frame: stack.add_frame(target, offset + 1),
                    status: Status::Queued,
                })
                .frame;
            stack.add_link(to, a.frame, node, None);
        }
        if next.is_empty() {
            return false;
        }
        trace!("shifted {} into {} frames", c, next.len());
        self.active = next;
        true
    }

    /// Collect the parse trees of the accepting frames.
    fn accept(&mut self) -> Option<NodeId> {
        let mut trees = Vec::new();
        for a in self.active.values() {
            let frame = &self.stack[a.frame];
            if !self.table.accepts(frame.state, CodePoint::EOF) {
                continue;
            }
            for &l in &frame.links {
                let link = &self.stack[l];
                if !link.is_rejected() && !trees.contains(&link.node) {
                    trees.push(link.node);
                }
            }
        }
        debug!("{} accepted parse trees", trees.len());
        match trees.len() {
            0 => None,
            1 => Some(trees[0]),
            _ => {
                let mut alternatives = Vec::new();
                for tree in trees {
                    for alt in self.forest.alternatives(tree) {
                        if !alternatives.contains(&alt) {
                            alternatives.push(alt);
                        }
                    }
                }
                let span = Span::new(0, self.offset);
                Some(self.forest.add(Node::Ambiguity { alternatives }, span))
            }
        }
    }

    /// Describe a derivation at the current position that was rejected,
    /// leaving its frame without any live link.
    ///
    /// Reject productions take precedence over priority conflicts.
    fn rejected_derivation(&self) -> Option<String> {
        let mut found: Option<(Rejection, Label)> = None;
        for a in self.active.values() {
            if a.status != Status::Skipped {
                continue;
            }
            for &l in &self.stack[a.frame].links {
                let link = &self.stack[l];
                let (rejection, label) = match (link.rejection, self.forest[link.node].label()) {
                    (Some(r), Some(label)) => (r, label),
                    _ => continue,
                };
                match found {
                    Some((Rejection::Reject, _)) => (),
                    Some(_) if rejection == Rejection::Priority => (),
                    _ => found = Some((rejection, label)),
                }
            }
        }
        found.map(|(rejection, label)| {
            let prod = self.table.production(label);
            match rejection {
                Rejection::Reject => format!("{} is rejected by a reject production", prod.result),
                Rejection::Priority => format!("{} violates a priority", prod.result),
            }
        })
    }

    /// Drop unreachable frames once the stack has doubled in size.
    fn prune(&mut self) {
        if self.stack.num_frames() < 2 * self.prune_mark {
            return;
        }
        let before = self.stack.num_frames();
        let roots: Vec<FrameId> = self.active.values().map(|a| a.frame).collect();
        let map = self.stack.prune(&roots);
        for a in self.active.values_mut() {
            if let Some(frame) = map[a.frame.as_usize()] {
                a.frame = frame;
            }
        }
        self.prune_mark = self.stack.num_frames().max(PRUNE_MIN);
        debug!(
            "pruned stack from {} to {} frames",
            before,
            self.stack.num_frames()
        );
    }

    fn checkpoint(&self) -> Checkpoint {
        let frames: Vec<FrameId> = self.active.values().map(|a| a.frame).collect();
        let stack = self.stack.checkpoint(&frames);
        let nodes = stack
            .links()
            .map(|l| (l.node, self.forest.node(l.node).clone()))
            .collect();
        Checkpoint {
            active: self.active.clone(),
            stack,
            forest_len: self.forest.len(),
            nodes,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.stack.restore(&checkpoint.stack);
        self.forest.truncate(checkpoint.forest_len);
        for (id, node) in checkpoint.nodes {
            self.forest.replace(id, node);
        }
        self.active = checkpoint.active;
        self.queue.clear();
        self.delayed.clear();
    }
}
