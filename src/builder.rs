use std::ops::Range;

use crate::node::{max_children, rebalance_pair, Node, Rebalanced};
use crate::traits::Element;
use crate::Rope;

/// An append-only accumulator for building ropes in amortized O(1) per element.
///
/// Appending n elements to a rope one at a time costs O(n log n). The builder instead keeps a
/// stack of partially filled levels - like the digits of a counter - and only seals a level into
/// a node (carrying it up a level) when it fills. Whole subtrees of existing ropes can be pushed
/// in too, in which case they're shared rather than copied.
///
/// ```
/// use sumrope::Builder;
/// use rope_testdata::Chunk;
///
/// let mut builder = Builder::new();
/// builder.push(Chunk::from("hello "));
/// builder.push(Chunk::from("world"));
/// let rope = builder.finish();
/// assert_eq!(rope.len(), 2);
/// ```
pub struct Builder<E: Element> {
    // Partially built levels, in strictly descending height order from the bottom of the stack.
    // Every level holds 1..max_children nodes of the same height. Everything in a level comes
    // after everything in the levels below it on the stack.
    //
    // If a level holds more than one node, all of them satisfy the balancing rules. A lone node
    // might not (eg an undersized element, or the under-full root of a small rope).
    levels: Vec<Vec<Node<E>>>,

    // The most recently pushed element, held back so the next element can be offered to it for
    // merging before it gets sealed into a leaf.
    tip: Option<E>,
}

impl<E: Element> Builder<E> {
    pub fn new() -> Self {
        Builder {
            levels: Vec::new(),
            tip: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty() && self.tip.is_none()
    }

    /// Append an element. Empty elements are dropped.
    pub fn push(&mut self, element: E) {
        if element.is_empty() { return; }

        let mut element = element;
        match self.tip.take() {
            None => self.tip = Some(element),
            Some(mut prev) => match rebalance_pair(&mut prev, &mut element) {
                Rebalanced::IntoLeft => self.tip = Some(prev),
                Rebalanced::IntoRight => self.tip = Some(element),
                Rebalanced::Both => {
                    self.push_node(Node::leaf(prev));
                    self.tip = Some(element);
                }
            },
        }
    }

    /// Append the entire contents of a rope. The rope's tree is reused as-is.
    pub fn push_rope(&mut self, rope: Rope<E>) {
        if let Some(root) = rope.root {
            self.flush_tip();
            self.push_node(root);
        }
    }

    /// Append the elements with ordinals in `range` from the subtree at `node`. Subtrees which lie
    /// entirely inside the range are pushed whole; only the two edges of the range get walked.
    pub(crate) fn push_positions(&mut self, node: &Node<E>, range: Range<usize>) {
        if range.is_empty() { return; }

        if range.start == 0 && range.end == node.count() {
            self.flush_tip();
            self.push_node(node.clone());
            return;
        }

        // Leaves have a count of 1, so a partially covered node is always an internal node.
        let mut start = 0;
        for child in node.children() {
            let end = start + child.count();
            if end > range.start {
                let lo = range.start.max(start) - start;
                let hi = range.end.min(end) - start;
                self.push_positions(child, lo..hi);
            }
            if end >= range.end { break; }
            start = end;
        }
    }

    fn flush_tip(&mut self) {
        if let Some(element) = self.tip.take() {
            self.push_node(Node::leaf(element));
        }
    }

    fn push_node(&mut self, mut node: Node<E>) {
        loop {
            let Some(level) = self.levels.last_mut() else {
                self.levels.push(vec![node]);
                return;
            };

            let height = node.height();
            if level[0].height() > height {
                self.levels.push(vec![node]);
                return;
            } else if level[0].height() < height {
                // The new node is taller than the level on top of the stack. Fold that level into
                // it and try again.
                node = Node::concat(self.pop_level(), node);
            } else {
                Self::push_sibling(level, node);
                if level.len() < max_children::<E>() {
                    return;
                }
                // Carry.
                node = self.pop_level();
            }
        }
    }

    fn push_sibling(level: &mut Vec<Node<E>>, node: Node<E>) {
        let height = node.height();
        match level.pop() {
            None => level.push(node),
            Some(last) if last.is_ok_child() && node.is_ok_child() => {
                level.push(last);
                level.push(node);
            }
            Some(last) => {
                let merged = Node::concat(last, node);
                if merged.height() == height {
                    level.push(merged);
                } else {
                    level.extend(merged.into_children());
                }
            }
        }
    }

    fn pop_level(&mut self) -> Node<E> {
        match self.levels.pop() {
            Some(mut nodes) if nodes.len() == 1 => nodes.remove(0),
            Some(nodes) => Node::from_children(nodes),
            None => unreachable!("pop_level called on an empty builder"),
        }
    }

    /// Close every open level and return the finished rope.
    pub fn finish(mut self) -> Rope<E> {
        self.flush_tip();
        if self.levels.is_empty() {
            return Rope::new();
        }

        let mut node = self.pop_level();
        while !self.levels.is_empty() {
            node = Node::concat(self.pop_level(), node);
        }
        trace_event!(height = node.height(), elements = node.count(), "builder finished");
        Rope { root: Some(node) }
    }
}

impl<E: Element> Default for Builder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> Extend<E> for Builder<E> {
    fn extend<T: IntoIterator<Item = E>>(&mut self, iter: T) {
        for element in iter {
            self.push(element);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::*;

    #[test]
    fn empty_builder() {
        let builder = Builder::<Run>::new();
        assert!(builder.is_empty());
        let rope = builder.finish();
        assert!(rope.is_empty());
        rope.check();
    }

    #[test]
    fn builds_deep_trees() {
        for n in [1, 2, 5, 6, 7, 36, 37, 100, 1000] {
            let mut builder = Builder::new();
            builder.extend(runs(n, 3));
            let rope = builder.finish();
            rope.check();
            assert_eq!(rope.len(), n as usize);
            assert_eq!(flatten(&rope), (0..n * 3).collect::<Vec<_>>());
        }
    }

    #[test]
    fn merges_undersized_elements() {
        let mut builder = Builder::new();
        for i in 0..20 {
            builder.push(run(i, 1));
        }
        let rope = builder.finish();
        rope.check();
        assert!(rope.len() < 20);
        assert_eq!(rope.summary().len, 20);
        assert_eq!(flatten(&rope), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn drops_empty_elements() {
        let mut builder = Builder::new();
        builder.push(run(0, 3));
        builder.push(Run(vec![]));
        builder.push(run(3, 3));
        let rope = builder.finish();
        rope.check();
        assert_eq!(rope.len(), 2);
    }

    #[test]
    fn push_rope_shares_structure() {
        let a: Rope<Run> = runs(50, 3).into_iter().collect();
        let a_root = a.root.clone().unwrap();

        let mut builder = Builder::new();
        builder.push(run(1000, 1));
        builder.push_rope(a.clone());
        builder.push(run(2000, 1));
        let rope = builder.finish();
        rope.check();

        let mut expected = vec![1000];
        expected.extend(0..150);
        expected.push(2000);
        assert_eq!(flatten(&rope), expected);

        // Internal nodes away from the two seams are reused verbatim.
        fn internal_nodes(node: &Node<Run>, out: &mut Vec<Node<Run>>) {
            if !node.is_leaf() {
                out.push(node.clone());
                for child in node.children() {
                    internal_nodes(child, out);
                }
            }
        }
        let mut before = vec![];
        internal_nodes(&a_root, &mut before);
        let mut after = vec![];
        internal_nodes(rope.root.as_ref().unwrap(), &mut after);
        assert!(after.iter().any(|n| before.iter().any(|orig| orig.ptr_eq(n))));
    }

    #[test]
    fn push_positions_slices() {
        let rope: Rope<Run> = runs(100, 2).into_iter().collect();
        let root = rope.root.as_ref().unwrap();

        for (start, end) in [(0, 0), (0, 100), (10, 90), (33, 34), (99, 100), (0, 37), (64, 100)] {
            let mut builder = Builder::new();
            builder.push_positions(root, start..end);
            let slice = builder.finish();
            slice.check();
            assert_eq!(slice.len(), end - start);
            assert_eq!(flatten(&slice), (start as u32 * 2..end as u32 * 2).collect::<Vec<_>>());
        }
    }
}
