// Copyright (c) 2018 Fabian Schuiki

//! The graph-structured stack.
//!
//! Frames and links live in an arena and refer to each other by id. A frame
//! sits at an input offset in a parse table state; its links lead back to the
//! frames it was reached from, each carrying the forest node of the traversed
//! symbol. Links are only ever added to frames at the current input offset, so
//! the graph grows monotonically forward. Frames that no active frame can reach
//! any more are dropped by `prune`.

use std::fmt;
use std::ops::Index;
use std::rc::Rc;

use bit_set::BitSet;

use crate::forest::NodeId;
use crate::table::StateId;

/// A unique frame identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// Create a frame id from a usize.
    pub fn from_usize(id: usize) -> FrameId {
        FrameId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// A unique link identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(usize);

impl LinkId {
    /// Create a link id from a usize.
    pub fn from_usize(id: usize) -> LinkId {
        LinkId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Debug for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// The reason a link is excluded from reductions and the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// A reject production matched the span. Permanent.
    Reject,
    /// All derivations so far violate a priority. Lifted as soon as a valid
    /// derivation arrives.
    Priority,
}

/// A frame of the stack.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The parse table state.
    pub state: StateId,
    /// The input offset the frame sits at.
    pub offset: usize,
    /// The links back to the predecessors of this frame.
    pub links: Vec<LinkId>,
}

/// A link from a frame back to one of its predecessors.
#[derive(Debug, Clone)]
pub struct Link {
    /// The predecessor frame.
    pub frame: FrameId,
    /// The forest node of the symbol between the two frames.
    pub node: NodeId,
    /// Why the link is rejected, if it is.
    pub rejection: Option<Rejection>,
}

impl Link {
    /// Check whether the link is rejected.
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }
}

/// A graph-structured stack.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    frames: Vec<Frame>,
    links: Vec<Link>,
}

impl Stack {
    /// Create an empty stack.
    pub fn new() -> Stack {
        Stack::default()
    }

    /// The number of frames on the stack.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// The number of links on the stack.
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Add a frame without any links.
    pub fn add_frame(&mut self, state: StateId, offset: usize) -> FrameId {
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            state,
            offset,
            links: Vec::new(),
        });
        id
    }

    /// Add a link from `frame` back to `pred`.
    pub fn add_link(
        &mut self,
        frame: FrameId,
        pred: FrameId,
        node: NodeId,
        rejection: Option<Rejection>,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link {
            frame: pred,
            node,
            rejection,
        });
        self.frames[frame.0].links.push(id);
        id
    }

    /// Access a frame.
    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.0]
    }

    /// Access a link.
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    /// Change the rejection of a link.
    pub fn set_rejection(&mut self, id: LinkId, rejection: Option<Rejection>) {
        self.links[id.0].rejection = rejection;
    }

    /// Find the link from `frame` back to `pred`, if there is one.
    pub fn find_link(&self, frame: FrameId, pred: FrameId) -> Option<LinkId> {
        self.frames[frame.0]
            .links
            .iter()
            .cloned()
            .find(|&l| self.links[l.0].frame == pred)
    }

    /// Check whether a frame has links and all of them are rejected.
    ///
    /// Nothing may be built on top of such a frame. The initial frame has no
    /// links and is always live.
    pub fn is_rejected(&self, frame: FrameId) -> bool {
        let links = &self.frames[frame.0].links;
        !links.is_empty() && links.iter().all(|&l| self.links[l.0].is_rejected())
    }

    /// Find all paths of `length` links leading back from a frame.
    ///
    /// Rejected links are never traversed. If `through` is given, only paths
    /// that contain that link somewhere are returned; such paths have at least
    /// one link.
    pub fn find_paths(
        &self,
        frame: FrameId,
        length: usize,
        through: Option<LinkId>,
    ) -> Vec<Rc<StackPath>> {
        if through.is_some() && length == 0 {
            return Vec::new();
        }
        let mut paths = vec![(StackPath::empty(frame), through.is_none())];
        for _ in 0..length {
            let mut next = Vec::new();
            for &(ref path, seen) in &paths {
                for &link in &self.frames[path.frame.0].links {
                    if self.links[link.0].is_rejected() {
                        continue;
                    }
                    let seen = seen || through == Some(link);
                    next.push((StackPath::extend(path, self, link), seen));
                }
            }
            paths = next;
        }
        paths
            .into_iter()
            .filter(|&(_, seen)| seen)
            .map(|(path, _)| path)
            .collect()
    }

    /// Drop all frames and links that cannot be reached from `roots`.
    ///
    /// Ids change in the process. Returns the new id of each old frame, or
    /// `None` if it was dropped.
    pub fn prune(&mut self, roots: &[FrameId]) -> Vec<Option<FrameId>> {
        let mut live = BitSet::with_capacity(self.frames.len());
        let mut todo = roots.to_vec();
        while let Some(id) = todo.pop() {
            if !live.insert(id.0) {
                continue;
            }
            todo.extend(self.frames[id.0].links.iter().map(|&l| self.links[l.0].frame));
        }

        let mut map = vec![None; self.frames.len()];
        let mut frames = Vec::with_capacity(live.len());
        for (i, frame) in std::mem::replace(&mut self.frames, Vec::new())
            .into_iter()
            .enumerate()
        {
            if live.contains(i) {
                map[i] = Some(FrameId(frames.len()));
                frames.push(frame);
            }
        }

        let old_links = std::mem::replace(&mut self.links, Vec::new());
        for frame in &mut frames {
            let mut links = Vec::with_capacity(frame.links.len());
            for &l in &frame.links {
                let link = &old_links[l.0];
                if let Some(pred) = map[link.frame.0] {
                    links.push(LinkId(self.links.len()));
                    self.links.push(Link {
                        frame: pred,
                        ..link.clone()
                    });
                }
            }
            frame.links = links;
        }
        self.frames = frames;
        map
    }

    /// Take a snapshot of a set of frames, such that everything added to the
    /// stack afterwards can be undone by `restore`.
    pub(crate) fn checkpoint(&self, frames: &[FrameId]) -> Checkpoint {
        Checkpoint {
            num_frames: self.frames.len(),
            num_links: self.links.len(),
            frames: frames
                .iter()
                .map(|&f| {
                    let links = self.frames[f.0]
                        .links
                        .iter()
                        .map(|&l| (l, self.links[l.0].clone()))
                        .collect();
                    (f, links)
                })
                .collect(),
        }
    }

    /// Undo everything done to the stack since a checkpoint was taken.
    pub(crate) fn restore(&mut self, checkpoint: &Checkpoint) {
        self.frames.truncate(checkpoint.num_frames);
        self.links.truncate(checkpoint.num_links);
        for &(frame, ref links) in &checkpoint.frames {
            self.frames[frame.0].links = links.iter().map(|&(id, _)| id).collect();
            for &(id, ref link) in links {
                self.links[id.0] = link.clone();
            }
        }
    }
}

/// A snapshot of the frames at one input position.
#[derive(Debug, Clone)]
pub(crate) struct Checkpoint {
    num_frames: usize,
    num_links: usize,
    frames: Vec<(FrameId, Vec<(LinkId, Link)>)>,
}

impl Checkpoint {
    /// The links of the frames in the snapshot.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.frames
            .iter()
            .flat_map(|&(_, ref links)| links.iter().map(|&(_, ref link)| link))
    }
}

impl Index<FrameId> for Stack {
    type Output = Frame;

    fn index(&self, index: FrameId) -> &Frame {
        self.frame(index)
    }
}

impl Index<LinkId> for Stack {
    type Output = Link;

    fn index(&self, index: LinkId) -> &Link {
        self.link(index)
    }
}

/// A path through the stack, from an ancestor frame forward to the frame a
/// reduction starts at.
///
/// Paths are built backwards one link at a time and share their tails, so
/// enumerating all paths of a reduction does not copy link lists around.
#[derive(Debug)]
pub struct StackPath {
    frame: FrameId,
    step: Option<(LinkId, Rc<StackPath>)>,
    rejected: bool,
    length: usize,
}

impl StackPath {
    /// The path of no links that starts and ends at `frame`.
    pub fn empty(frame: FrameId) -> Rc<StackPath> {
        Rc::new(StackPath {
            frame,
            step: None,
            rejected: false,
            length: 0,
        })
    }

    /// Prepend a link of the path's ancestor frame to a path.
    pub fn extend(rest: &Rc<StackPath>, stack: &Stack, link: LinkId) -> Rc<StackPath> {
        let l = stack.link(link);
        Rc::new(StackPath {
            frame: l.frame,
            step: Some((link, rest.clone())),
            rejected: rest.rejected || l.is_rejected(),
            length: rest.length + 1,
        })
    }

    /// The ancestor frame the path starts at.
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// The number of links on the path.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check whether the path has no links.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Check whether any link on the path was rejected when the path was
    /// built.
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    /// The links of the path, deepest first.
    pub fn links(&self) -> Vec<LinkId> {
        let mut links = Vec::with_capacity(self.length);
        let mut path = self;
        while let Some((link, ref rest)) = path.step {
            links.push(link);
            path = &**rest;
        }
        links
    }

    /// The forest node of each link on the path, deepest first.
    pub fn parse_trees(&self, stack: &Stack) -> Vec<NodeId> {
        self.links()
            .into_iter()
            .map(|l| stack.link(l).node)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(i: usize) -> StateId {
        StateId::from_usize(i)
    }

    fn n(i: usize) -> NodeId {
        NodeId::from_usize(i)
    }

    /// Two branches `f0 <- f1 <- f3` and `f0 <- f2 <- f3`.
    fn diamond() -> (Stack, [FrameId; 4], [LinkId; 4]) {
        let mut stack = Stack::new();
        let f0 = stack.add_frame(s(0), 0);
        let f1 = stack.add_frame(s(1), 1);
        let f2 = stack.add_frame(s(2), 1);
        let f3 = stack.add_frame(s(3), 2);
        let l0 = stack.add_link(f1, f0, n(0), None);
        let l1 = stack.add_link(f2, f0, n(1), None);
        let l2 = stack.add_link(f3, f1, n(2), None);
        let l3 = stack.add_link(f3, f2, n(3), None);
        (stack, [f0, f1, f2, f3], [l0, l1, l2, l3])
    }

    #[test]
    fn paths_enumerate_all_branches() {
        let (stack, f, _) = diamond();
        let paths = stack.find_paths(f[3], 2, None);
        assert_eq!(paths.len(), 2);
        let trees: Vec<_> = paths.iter().map(|p| p.parse_trees(&stack)).collect();
        assert_eq!(trees, vec![vec![n(0), n(2)], vec![n(1), n(3)]]);
        assert!(paths.iter().all(|p| p.frame() == f[0] && p.len() == 2));

        let empty = stack.find_paths(f[3], 0, None);
        assert_eq!(empty.len(), 1);
        assert!(empty[0].is_empty());
        assert_eq!(empty[0].frame(), f[3]);
    }

    #[test]
    fn paths_skip_rejected_links() {
        let (mut stack, f, l) = diamond();
        stack.set_rejection(l[3], Some(Rejection::Reject));
        let paths = stack.find_paths(f[3], 2, None);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].links(), vec![l[0], l[2]]);
        assert!(!paths[0].is_rejected());
        assert!(!stack.is_rejected(f[3]));
        stack.set_rejection(l[2], Some(Rejection::Priority));
        assert!(stack.is_rejected(f[3]));
        assert!(!stack.is_rejected(f[0]));
    }

    #[test]
    fn paths_through_a_link() {
        let (stack, f, l) = diamond();
        let paths = stack.find_paths(f[3], 2, Some(l[3]));
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].links(), vec![l[1], l[3]]);
        assert!(stack.find_paths(f[3], 0, Some(l[3])).is_empty());
        assert!(stack.find_paths(f[3], 1, Some(l[0])).is_empty());
    }

    #[test]
    fn paths_through_a_deeper_link() {
        let (mut stack, f, l) = diamond();
        // An empty derivation on top of f3 at the same offset.
        let f4 = stack.add_frame(s(4), 2);
        let l4 = stack.add_link(f4, f[3], n(4), None);
        let paths = stack.find_paths(f4, 3, Some(l[1]));
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].links(), vec![l[1], l[3], l4]);
        assert_eq!(paths[0].frame(), f[0]);
        assert_eq!(stack.find_paths(f4, 3, Some(l4)).len(), 2);
        assert_eq!(stack.find_paths(f4, 3, None).len(), 2);
    }

    #[test]
    fn pruning_keeps_reachable_frames() {
        let (mut stack, f, _) = diamond();
        let dead = stack.add_frame(s(9), 2);
        stack.add_link(dead, f[1], n(9), None);
        let map = stack.prune(&[f[2]]);
        assert_eq!(stack.num_frames(), 2);
        assert_eq!(stack.num_links(), 1);
        assert_eq!(map[f[3].as_usize()], None);
        assert_eq!(map[dead.as_usize()], None);
        let f2 = map[f[2].as_usize()].unwrap();
        let f0 = map[f[0].as_usize()].unwrap();
        assert_eq!(stack[f2].state, s(2));
        assert_eq!(stack.find_link(f2, f0).map(|l| stack[l].node), Some(n(1)));
    }

    #[test]
    fn restore_undoes_changes() {
        let (mut stack, f, l) = diamond();
        let cp = stack.checkpoint(&[f[3]]);
        let f4 = stack.add_frame(s(4), 2);
        stack.add_link(f4, f[0], n(4), None);
        stack.add_link(f[3], f[0], n(5), None);
        stack.set_rejection(l[2], Some(Rejection::Reject));
        stack.restore(&cp);
        assert_eq!(stack.num_frames(), 4);
        assert_eq!(stack.num_links(), 4);
        assert_eq!(stack[f[3]].links, vec![l[2], l[3]]);
        assert!(!stack[l[2]].is_rejected());
    }
}
