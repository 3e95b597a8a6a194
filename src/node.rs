// The rope is a B-tree where every leaf holds exactly one element and every leaf sits at the same
// depth. Nodes are reference counted and never mutated while shared: anything which edits a node
// either owns it outright (refcount of 1, so Arc::make_mut / Arc::try_unwrap hand it over) or
// clones it first.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;

use crate::traits::{Element, Metric, Summary};

// Debug builds use much narrower nodes than the element type asks for, so tests with a few
// hundred elements still end up with deep trees and plenty of node boundaries.
#[cfg(debug_assertions)]
const FANOUT_CAP: usize = 6;
#[cfg(not(debug_assertions))]
const FANOUT_CAP: usize = usize::MAX;

#[inline]
pub(crate) fn max_children<E: Element>() -> usize {
    E::Summary::MAX_CHILDREN.min(FANOUT_CAP)
}

#[inline]
pub(crate) fn min_children<E: Element>() -> usize {
    max_children::<E>() / 2
}

pub(crate) struct Node<E: Element>(Arc<NodeBody<E>>);

#[derive(Clone)]
pub(crate) struct NodeBody<E: Element> {
    height: u8,
    /// The number of elements (leaves) in this subtree.
    count: usize,
    /// Always the sum of the children's summaries (or the element's summary for a leaf).
    summary: E::Summary,
    val: NodeVal<E>,
}

#[derive(Clone)]
enum NodeVal<E: Element> {
    Leaf(E),
    Inner(Vec<Node<E>>),
}

/// The outcome of offering two adjacent elements to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rebalanced {
    /// The right element was absorbed. Only the left one survives.
    IntoLeft,
    /// The left element was absorbed. Only the right one survives.
    IntoRight,
    Both,
}

/// Give an undersized element the chance to merge with its neighbour. Elements which are both a
/// reasonable size are left alone.
pub(crate) fn rebalance_pair<E: Element>(left: &mut E, right: &mut E) -> Rebalanced {
    if left.is_undersized() {
        if left.rebalance_with_next(right) {
            return Rebalanced::IntoLeft;
        }
    } else if right.is_undersized() && right.rebalance_with_prev(left) {
        return Rebalanced::IntoRight;
    }
    Rebalanced::Both
}

#[inline]
fn contains(size: usize, offset: usize, prefer_end: bool) -> bool {
    offset < size || (prefer_end && offset == size)
}

impl<E: Element> Clone for Node<E> {
    fn clone(&self) -> Self {
        Node(Arc::clone(&self.0))
    }
}

impl<E: Element> NodeBody<E> {
    fn children(&self) -> &[Node<E>] {
        match &self.val {
            NodeVal::Inner(children) => children,
            NodeVal::Leaf(_) => panic!("children() called on a leaf node"),
        }
    }
}

impl<E: Element> Node<E> {
    pub(crate) fn leaf(element: E) -> Self {
        Node(Arc::new(NodeBody {
            height: 0,
            count: 1,
            summary: element.summary(),
            val: NodeVal::Leaf(element),
        }))
    }

    /// Wrap 2..=max_children same-height nodes in a new parent.
    pub(crate) fn from_children(children: Vec<Node<E>>) -> Self {
        debug_assert!(children.len() >= 2);
        debug_assert!(children.len() <= max_children::<E>());

        let height = children[0].height() + 1;
        let mut count = 0;
        let mut summary = E::Summary::zero();
        for child in &children {
            debug_assert_eq!(child.height() + 1, height);
            count += child.count();
            summary.add(child.summary());
        }

        Node(Arc::new(NodeBody {
            height,
            count,
            summary,
            val: NodeVal::Inner(children),
        }))
    }

    /// Like from_children, but if there are too many children for one node the children are
    /// shared between two nodes under a new parent. Both halves end up with at least
    /// min_children.
    fn from_children_balanced(mut children: Vec<Node<E>>) -> Self {
        let max = max_children::<E>();
        let n = children.len();
        if n <= max {
            Node::from_children(children)
        } else {
            // This leans left, like the builder does.
            let split = max.min(n - min_children::<E>());
            let right = children.split_off(split);
            Node::from_children(vec![Node::from_children(children), Node::from_children(right)])
        }
    }

    #[inline]
    pub(crate) fn height(&self) -> u8 {
        self.0.height
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.0.count
    }

    #[inline]
    pub(crate) fn summary(&self) -> &E::Summary {
        &self.0.summary
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.0.height == 0
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn children(&self) -> &[Node<E>] {
        self.0.children()
    }

    pub(crate) fn element(&self) -> &E {
        match &self.0.val {
            NodeVal::Leaf(element) => element,
            NodeVal::Inner(_) => panic!("element() called on an internal node"),
        }
    }

    /// Take the children out of this node. They're moved if we hold the only reference, and
    /// cloned (which just bumps their refcounts) otherwise.
    pub(crate) fn into_children(self) -> Vec<Node<E>> {
        match Arc::try_unwrap(self.0) {
            Ok(body) => match body.val {
                NodeVal::Inner(children) => children,
                NodeVal::Leaf(_) => panic!("into_children() called on a leaf node"),
            },
            Err(shared) => shared.children().to_vec(),
        }
    }

    pub(crate) fn into_element(self) -> E {
        match Arc::try_unwrap(self.0) {
            Ok(body) => match body.val {
                NodeVal::Leaf(element) => element,
                NodeVal::Inner(_) => panic!("into_element() called on an internal node"),
            },
            Err(shared) => match &shared.val {
                NodeVal::Leaf(element) => element.clone(),
                NodeVal::Inner(_) => panic!("into_element() called on an internal node"),
            },
        }
    }

    /// Can this node sit under a parent without breaking the balancing rules?
    pub(crate) fn is_ok_child(&self) -> bool {
        match &self.0.val {
            NodeVal::Leaf(element) => !element.is_undersized(),
            NodeVal::Inner(children) => children.len() >= min_children::<E>(),
        }
    }

    /// Find the child holding the element at ordinal `pos`. Returns (slot, ordinal within the
    /// child).
    pub(crate) fn child_at_position(&self, mut pos: usize) -> (usize, usize) {
        let children = self.children();
        let last = children.len() - 1;
        for (slot, child) in children[..last].iter().enumerate() {
            if pos < child.count() {
                return (slot, pos);
            }
            pos -= child.count();
        }
        (last, pos)
    }

    /// Find the child containing `offset` in the given metric. Returns (slot, offset remaining
    /// within the child, number of elements skipped in earlier children).
    ///
    /// With `prefer_end`, an offset sitting exactly on the boundary between two children resolves
    /// to the end of the first one. Otherwise it resolves to the start of the second.
    pub(crate) fn child_at_offset<M: Metric<E>>(&self, offset: usize, metric: &M, prefer_end: bool) -> (usize, usize, usize) {
        let children = self.children();
        let last = children.len() - 1;
        let mut remaining = offset;
        let mut skipped = 0;
        for (slot, child) in children[..last].iter().enumerate() {
            let size = metric.size(child.summary());
            if contains(size, remaining, prefer_end) {
                return (slot, remaining, skipped);
            }
            remaining -= size;
            skipped += child.count();
        }
        (last, remaining, skipped)
    }

    /// Find the element containing `offset`, returning its ordinal and the offset remaining inside
    /// it. Returns None if the offset is past the end of this subtree (or exactly at the end,
    /// without `prefer_end`).
    pub(crate) fn seek<M: Metric<E>>(&self, offset: usize, metric: &M, prefer_end: bool) -> Option<(usize, usize)> {
        if !contains(metric.size(self.summary()), offset, prefer_end) {
            return None;
        }

        let mut node = self;
        let mut remaining = offset;
        let mut ordinal = 0;
        while !node.is_leaf() {
            let (slot, rest, skipped) = node.child_at_offset(remaining, metric, prefer_end);
            node = &node.children()[slot];
            remaining = rest;
            ordinal += skipped;
        }
        Some((ordinal, remaining))
    }

    pub(crate) fn element_at(&self, mut pos: usize) -> &E {
        let mut node = self;
        while !node.is_leaf() {
            let (slot, rest) = node.child_at_position(pos);
            node = &node.children()[slot];
            pos = rest;
        }
        node.element()
    }

    /// Mutate the element at ordinal `pos` in place, cloning any shared node on the way down.
    /// Ancestor summaries are patched by subtracting the child's old summary and adding the new
    /// one.
    pub(crate) fn update_at<R>(&mut self, pos: usize, f: impl FnOnce(&mut E) -> R) -> R {
        let body = Arc::make_mut(&mut self.0);
        match &mut body.val {
            NodeVal::Leaf(element) => {
                let result = f(element);
                body.summary = element.summary();
                result
            }
            NodeVal::Inner(children) => {
                let mut slot = children.len() - 1;
                let mut rest = pos;
                for (i, child) in children.iter().enumerate() {
                    if rest < child.count() {
                        slot = i;
                        break;
                    }
                    rest -= child.count();
                }

                let child = &mut children[slot];
                let old = child.summary().clone();
                let result = child.update_at(rest, f);
                body.summary.subtract(&old);
                body.summary.add(child.summary());
                result
            }
        }
    }

    fn merge_leaves(left: Node<E>, right: Node<E>) -> Node<E> {
        debug_assert!(left.is_leaf() && right.is_leaf());
        let mut left = left.into_element();
        let mut right = right.into_element();
        match rebalance_pair(&mut left, &mut right) {
            Rebalanced::IntoLeft => Node::leaf(left),
            Rebalanced::IntoRight => Node::leaf(right),
            Rebalanced::Both => Node::from_children(vec![Node::leaf(left), Node::leaf(right)]),
        }
    }

    /// Concatenate two trees. The shorter tree is attached along the facing edge of the taller one
    /// at the matching depth, so this is O(height difference) node rebuilds. Uniquely owned nodes
    /// along that edge are reused rather than copied.
    ///
    /// Both inputs may be under-full roots, but all of their children must satisfy the balancing
    /// rules. The result has height max(h1, h2) or one more than that.
    pub(crate) fn concat(left: Node<E>, right: Node<E>) -> Node<E> {
        let h1 = left.height();
        let h2 = right.height();

        match h1.cmp(&h2) {
            Ordering::Less => {
                let mut children = right.into_children();
                if h1 + 1 == h2 && left.is_ok_child() {
                    children.insert(0, left);
                    return Node::from_children_balanced(children);
                }

                let joined = Node::concat(left, children.remove(0));
                if joined.height() + 1 == h2 {
                    children.insert(0, joined);
                } else {
                    let mut merged = joined.into_children();
                    merged.append(&mut children);
                    children = merged;
                }
                Node::from_children_balanced(children)
            }
            Ordering::Equal => {
                if left.is_ok_child() && right.is_ok_child() {
                    Node::from_children(vec![left, right])
                } else if h1 == 0 {
                    Node::merge_leaves(left, right)
                } else {
                    let mut children = left.into_children();
                    children.extend(right.into_children());
                    Node::from_children_balanced(children)
                }
            }
            Ordering::Greater => {
                let mut children = left.into_children();
                if h2 + 1 == h1 && right.is_ok_child() {
                    children.push(right);
                    return Node::from_children_balanced(children);
                }

                // Inner nodes always have at least 2 children.
                let last = children.pop().expect("internal node with no children");
                let joined = Node::concat(last, right);
                if joined.height() + 1 == h1 {
                    children.push(joined);
                } else {
                    children.extend(joined.into_children());
                }
                Node::from_children_balanced(children)
            }
        }
    }

    /// Walk the whole subtree checking every structural invariant. `lone` is set when the rope
    /// holds exactly one element, which is then allowed to be undersized.
    pub(crate) fn check(&self, is_root: bool, lone: bool) {
        match &self.0.val {
            NodeVal::Leaf(element) => {
                element.check();
                assert_eq!(self.0.height, 0);
                assert_eq!(self.0.count, 1);
                assert!(!element.is_empty(), "Empty element stored in rope");
                assert!(lone || !element.is_undersized(), "Undersized element in a rope with multiple elements");
                assert_eq!(self.0.summary, element.summary());
            }
            NodeVal::Inner(children) => {
                assert!(children.len() <= max_children::<E>());
                if is_root {
                    assert!(children.len() >= 2, "Root node has a single child");
                } else {
                    assert!(children.len() >= min_children::<E>(), "Internal node is under-full");
                }

                let mut summary = E::Summary::zero();
                let mut count = 0;
                for child in children {
                    assert_eq!(child.height() + 1, self.0.height, "Leaves at different depths");
                    child.check(false, lone);
                    summary.add(child.summary());
                    count += child.count();
                }
                assert_eq!(summary, self.0.summary);
                assert_eq!(count, self.0.count);
            }
        }
    }

    pub(crate) fn print(&self, depth: usize) where E: Debug {
        let indent = "  ".repeat(depth);
        match &self.0.val {
            NodeVal::Leaf(element) => println!("{}{:?}", indent, element),
            NodeVal::Inner(children) => {
                println!("{}height {} count {} summary {:?}", indent, self.0.height, self.0.count, self.0.summary);
                for child in children {
                    child.print(depth + 1);
                }
            }
        }
    }
}
