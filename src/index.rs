use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};

use crate::node::Node;
use crate::traits::{Element, Metric};
use crate::Rope;

/// A position within one particular rope value, pointing at an element (or at the end of the
/// rope).
///
/// Indexes remember the path from the root down to their element, so stepping to a neighbouring
/// element only has to climb as far as the nearest common ancestor. An index is only meaningful
/// for the rope it was made from. Passing it to any other rope (including a later edited version
/// of the same rope) panics.
pub struct Index<E: Element> {
    // The root of the rope this index was taken from.
    root: Option<Node<E>>,

    // Each internal node from the root down to the element's parent, along with the slot of the
    // child taken out of it. Empty when the whole rope is a single leaf (or no leaf at all).
    //
    // The end index keeps the path to the last element, so stepping back from it is free.
    nodes: Vec<(Node<E>, usize)>,

    // The element's ordinal. Equal to the number of elements for the end index.
    position: usize,
}

impl<E: Element> Index<E> {
    /// The ordinal of the element this index points at.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Walk down from the child at the deepest stored slot, always taking the first (or last)
    /// child, until reaching a leaf.
    fn descend_edge(&mut self, rightmost: bool) {
        let Some((parent, slot)) = self.nodes.last() else { return; };
        let mut node = parent.children()[*slot].clone();
        while !node.is_leaf() {
            let slot = if rightmost { node.children().len() - 1 } else { 0 };
            let child = node.children()[slot].clone();
            self.nodes.push((node, slot));
            node = child;
        }
    }
}

impl<E: Element> Clone for Index<E> {
    fn clone(&self) -> Self {
        Index {
            root: self.root.clone(),
            nodes: self.nodes.clone(),
            position: self.position,
        }
    }
}

impl<E: Element> Debug for Index<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let slots: Vec<usize> = self.nodes.iter().map(|(_, slot)| *slot).collect();
        f.debug_struct("Index")
            .field("position", &self.position)
            .field("slots", &slots)
            .finish()
    }
}

// Comparisons only make sense between indexes into the same rope, and only look at positions.
impl<E: Element> PartialEq for Index<E> {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl<E: Element> Eq for Index<E> {}

impl<E: Element> PartialOrd for Index<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Element> Ord for Index<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position.cmp(&other.position)
    }
}

impl<E: Element> Rope<E> {
    pub(crate) fn validate(&self, index: &Index<E>) {
        let same = match (&self.root, &index.root) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        };
        assert!(same, "Index does not belong to this rope");
    }

    /// Build the path down to the element with ordinal `n`. `n` must be in bounds.
    fn path_to(&self, n: usize) -> Vec<(Node<E>, usize)> {
        let mut nodes = Vec::new();
        let Some(mut node) = self.root.as_ref() else { return nodes; };
        let mut pos = n;
        while !node.is_leaf() {
            let (slot, rest) = node.child_at_position(pos);
            nodes.push((node.clone(), slot));
            node = &node.children()[slot];
            pos = rest;
        }
        nodes
    }

    pub fn start_index(&self) -> Index<E> {
        self.nth_index(0)
    }

    pub fn end_index(&self) -> Index<E> {
        let len = self.len();
        Index {
            root: self.root.clone(),
            nodes: if len == 0 { Vec::new() } else { self.path_to(len - 1) },
            position: len,
        }
    }

    /// The index of the element with ordinal `n`. `n == len()` gives the end index.
    pub fn nth_index(&self, n: usize) -> Index<E> {
        let len = self.len();
        assert!(n <= len, "Position {} out of bounds (rope has {} elements)", n, len);
        if n == len { return self.end_index(); }

        Index {
            root: self.root.clone(),
            nodes: self.path_to(n),
            position: n,
        }
    }

    /// Find the element containing `offset` in the given metric. Returns its index, along with
    /// the offset remaining within that element.
    ///
    /// When `offset` lands exactly between two elements, `prefer_end` picks which one you get:
    /// the end of the earlier element (remainder equal to its size), or the start of the later
    /// one (remainder 0). An offset at the very end of the rope resolves to the end index unless
    /// `prefer_end` is set.
    pub fn index_at<M: Metric<E>>(&self, offset: usize, metric: &M, prefer_end: bool) -> (Index<E>, usize) {
        let size = self.size(metric);
        assert!(offset <= size, "Offset {} out of bounds (rope size {})", offset, size);

        match self.root.as_ref().and_then(|root| root.seek(offset, metric, prefer_end)) {
            Some((ordinal, remainder)) => (self.nth_index(ordinal), remainder),
            None => (self.end_index(), 0),
        }
    }

    /// Move `delta` units (in the given metric) from `index`. Returns the index of the element
    /// which contains the target position and the offset of the target within that element.
    ///
    /// If the target is past the end of the rope, the end index is returned along with how far
    /// past the end the target was. Moving before the start of the rope panics.
    pub fn index_offset_by<M: Metric<E>>(&self, index: &Index<E>, delta: isize, metric: &M, prefer_end: bool) -> (Index<E>, usize) {
        let base = self.offset_of(index, metric);
        let target = base.checked_add_signed(delta)
            .unwrap_or_else(|| panic!("Cannot move {} from offset {}", delta, base));

        let size = self.size(metric);
        if target > size {
            (self.end_index(), target - size)
        } else {
            self.index_at(target, metric, prefer_end)
        }
    }

    /// The offset (in the given metric) of the start of the element `index` points at.
    pub fn offset_of<M: Metric<E>>(&self, index: &Index<E>, metric: &M) -> usize {
        self.validate(index);
        if index.position == self.len() {
            return self.size(metric);
        }

        let mut offset = 0;
        for (node, slot) in &index.nodes {
            for child in &node.children()[..*slot] {
                offset += metric.size(child.summary());
            }
        }
        offset
    }

    /// `offset_of(to) - offset_of(from)`.
    pub fn distance<M: Metric<E>>(&self, from: &Index<E>, to: &Index<E>, metric: &M) -> isize {
        self.offset_of(to, metric) as isize - self.offset_of(from, metric) as isize
    }

    /// Move an index to the next element (or to the end of the rope).
    pub fn step_forward(&self, index: &mut Index<E>) {
        self.validate(index);
        let len = self.len();
        assert!(index.position < len, "Cannot step past the end of the rope");

        // The path to the last element doubles as the end index's path.
        index.position += 1;
        if index.position == len { return; }

        // Climb to the nearest ancestor with a next child. There must be one, since this isn't
        // the last element.
        while let Some((node, slot)) = index.nodes.last_mut() {
            if *slot + 1 < node.children().len() {
                *slot += 1;
                break;
            }
            index.nodes.pop();
        }
        index.descend_edge(false);
    }

    /// Move an index to the previous element. Stepping back from the end index lands on the last
    /// element.
    pub fn step_back(&self, index: &mut Index<E>) {
        self.validate(index);
        assert!(index.position > 0, "Cannot step back past the start of the rope");

        let at_end = index.position == self.len();
        index.position -= 1;
        if at_end { return; }

        while let Some((_, slot)) = index.nodes.last_mut() {
            if *slot > 0 {
                *slot -= 1;
                break;
            }
            index.nodes.pop();
        }
        index.descend_edge(true);
    }

    pub fn index_after(&self, index: &Index<E>) -> Index<E> {
        let mut next = index.clone();
        self.step_forward(&mut next);
        next
    }

    pub fn index_before(&self, index: &Index<E>) -> Index<E> {
        let mut prev = index.clone();
        self.step_back(&mut prev);
        prev
    }

    /// The element at `index`, or None for the end index.
    pub fn get(&self, index: &Index<E>) -> Option<&E> {
        self.validate(index);
        if index.position >= self.len() { return None; }

        let mut node = self.root.as_ref()?;
        for (_, slot) in &index.nodes {
            node = &node.children()[*slot];
        }
        Some(node.element())
    }
}

impl<E: Element> std::ops::Index<&Index<E>> for Rope<E> {
    type Output = E;

    fn index(&self, index: &Index<E>) -> &E {
        match self.get(index) {
            Some(element) => element,
            None => panic!("Cannot read the element at the end index"),
        }
    }
}
