// Editing operations. Almost every edit here is a splice: the untouched elements on either side of
// the edit are pushed into a builder as whole shared subtrees, the (at most two) elements cut in
// half by the edit get split, and whatever is being inserted goes in between. Only the nodes along
// the two edges of the edited range are ever rebuilt.

use std::iter;
use std::ops::Range;

use crate::builder::Builder;
use crate::index::Index;
use crate::node::Node;
use crate::traits::{Element, Metric};
use crate::Rope;

/// A location between two items of content: `local` units into the element with the given
/// ordinal. Positions are normalized so `local` is always strictly inside the element. A position
/// at the very end of an element is expressed as the start of the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Position {
    ordinal: usize,
    local: usize,
}

impl Position {
    fn at_element(ordinal: usize) -> Self {
        Position { ordinal, local: 0 }
    }
}

impl<E: Element> Rope<E> {
    fn locate<M: Metric<E>>(&self, offset: usize, metric: &M, prefer_end: bool) -> Position {
        let size = self.size(metric);
        assert!(offset <= size, "Offset {} out of bounds (rope size {})", offset, size);

        let Some(root) = &self.root else {
            return Position::at_element(0);
        };
        match root.seek(offset, metric, prefer_end) {
            None => Position::at_element(root.count()),
            Some((ordinal, remainder)) => {
                let element = root.element_at(ordinal);
                let local = metric.index(remainder, element);
                if local >= element.len() {
                    Position::at_element(ordinal + 1)
                } else {
                    Position { ordinal, local }
                }
            }
        }
    }

    /// Replace the content between `start` and `end` with `elements`.
    fn splice<I: IntoIterator<Item = E>>(&mut self, start: Position, end: Position, elements: I) {
        debug_assert!(start <= end);
        let Some(root) = self.root.clone() else {
            *self = elements.into_iter().collect();
            return;
        };
        trace_event!(start = start.ordinal, end = end.ordinal, elements = root.count(), "splice");

        let mut builder = Builder::new();
        builder.push_positions(&root, 0..start.ordinal);
        if start.local > 0 {
            let mut head = root.element_at(start.ordinal).clone();
            head.split_off(start.local);
            builder.push(head);
        }

        builder.extend(elements);

        let mut resume = end.ordinal;
        if end.local > 0 {
            let mut element = root.element_at(end.ordinal).clone();
            builder.push(element.split_off(end.local));
            resume += 1;
        }
        builder.push_positions(&root, resume..root.count());

        *self = builder.finish();
    }

    /// Insert an element at `offset`. If the offset lands inside an existing element, that
    /// element is split in two around the new one.
    pub fn insert<M: Metric<E>>(&mut self, offset: usize, element: E, metric: &M) {
        let at = self.locate(offset, metric, false);
        if element.is_empty() { return; }
        self.splice(at, at, iter::once(element));
    }

    /// Insert an element directly before the element at `index`. Inserting at the end index
    /// appends.
    pub fn insert_at_index(&mut self, index: Index<E>, element: E) {
        self.validate(&index);
        let at = Position::at_element(index.position());
        drop(index);
        if element.is_empty() { return; }
        self.splice(at, at, iter::once(element));
    }

    /// Remove and return the element at `index`. Its neighbours are rebalanced with each other if
    /// either is undersized.
    pub fn remove(&mut self, index: Index<E>) -> E {
        let removed = match self.get(&index) {
            Some(element) => element.clone(),
            None => panic!("Cannot remove the end index"),
        };
        let pos = index.position();
        drop(index);

        self.splice(Position::at_element(pos), Position::at_element(pos + 1), iter::empty());
        removed
    }

    /// Remove and return the whole element containing `offset`. An offset on the boundary
    /// between two elements picks the later one.
    pub fn remove_at<M: Metric<E>>(&mut self, offset: usize, metric: &M) -> E {
        let (index, _) = self.index_at(offset, metric, false);
        assert!(index.position() < self.len(), "No element at offset {}", offset);
        self.remove(index)
    }

    /// Remove the content in `range`. Elements which straddle either end of the range are split
    /// and their outside parts kept.
    pub fn remove_range<M: Metric<E>>(&mut self, range: Range<usize>, metric: &M) {
        self.replace_range(range, metric, iter::empty());
    }

    /// Replace the content in `range` with a sequence of elements, in a single pass.
    pub fn replace_range<M, I>(&mut self, range: Range<usize>, metric: &M, elements: I)
        where M: Metric<E>, I: IntoIterator<Item = E>
    {
        assert!(range.start <= range.end, "Invalid range {:?}", range);
        let start = self.locate(range.start, metric, false);
        let end = if range.is_empty() { start } else { self.locate(range.end, metric, true) };

        let mut elements = elements.into_iter().filter(|e| !e.is_empty()).peekable();
        if start >= end && elements.peek().is_none() { return; }
        self.splice(start, end.max(start), elements);
    }

    /// Copy out the content in `range` as a new rope. Whole subtrees are shared with self.
    pub fn extract<M: Metric<E>>(&self, range: Range<usize>, metric: &M) -> Rope<E> {
        assert!(range.start <= range.end, "Invalid range {:?}", range);
        let start = self.locate(range.start, metric, false);
        let end = if range.is_empty() { start } else { self.locate(range.end, metric, true) };

        let Some(root) = &self.root else { return Rope::new(); };
        if start >= end { return Rope::new(); }

        let mut builder = Builder::new();
        if start.ordinal == end.ordinal {
            let mut element = root.element_at(start.ordinal).clone();
            element.split_off(end.local);
            builder.push(element.split_off(start.local));
        } else {
            let mut first_whole = start.ordinal;
            if start.local > 0 {
                let mut element = root.element_at(start.ordinal).clone();
                builder.push(element.split_off(start.local));
                first_whole += 1;
            }
            builder.push_positions(root, first_whole..end.ordinal);
            if end.local > 0 {
                let mut element = root.element_at(end.ordinal).clone();
                element.split_off(end.local);
                builder.push(element);
            }
        }
        builder.finish()
    }

    /// Split the rope in two at `offset`. Self keeps everything before the offset, and everything
    /// after it is returned.
    pub fn split_off<M: Metric<E>>(&mut self, offset: usize, metric: &M) -> Rope<E> {
        let size = self.size(metric);
        let tail = self.extract(offset..size, metric);
        self.remove_range(offset..size, metric);
        tail
    }

    /// Modify the element at `index`. Only the nodes on the path to the element are copied (and
    /// only if they're shared with another rope).
    ///
    /// The closure edits a copy of the element, which is written back once it returns. If the
    /// closure panics the rope is left as it was.
    ///
    /// If the closure leaves the element empty it's removed. If it leaves it undersized, it's
    /// rebalanced with a neighbour.
    pub fn update<R>(&mut self, index: Index<E>, f: impl FnOnce(&mut E) -> R) -> R {
        self.validate(&index);
        let pos = index.position();
        assert!(pos < self.len(), "Cannot update the end index");
        // The index holds references to the path. Let go of them so the path can be edited in
        // place when nothing else shares it.
        drop(index);

        let Some(root) = self.root.as_mut() else { unreachable!() };
        let mut element = root.element_at(pos).clone();
        let result = f(&mut element);

        if element.is_empty() || (root.count() > 1 && element.is_undersized()) {
            self.splice(Position::at_element(pos), Position::at_element(pos + 1), iter::once(element));
        } else {
            root.update_at(pos, |e| *e = element);
        }
        result
    }

    /// Append an element to the end of the rope.
    pub fn append(&mut self, element: E) {
        if element.is_empty() { return; }
        let leaf = Node::leaf(element);
        self.root = Some(match self.root.take() {
            Some(root) => Node::concat(root, leaf),
            None => leaf,
        });
    }

    /// Concatenate two ropes. This is O(log n): the shorter tree is attached to the facing edge
    /// of the taller one, and the two elements meeting at the seam are rebalanced.
    pub fn join(a: Rope<E>, b: Rope<E>) -> Rope<E> {
        match (a.root, b.root) {
            (Some(left), Some(right)) => {
                trace_event!(left = left.count(), right = right.count(), "join");
                Rope { root: Some(Node::concat(left, right)) }
            }
            (left, right) => Rope { root: left.or(right) },
        }
    }

    /// Append the whole of `other` to this rope.
    pub fn append_rope(&mut self, other: Rope<E>) {
        let this = std::mem::take(self);
        *self = Rope::join(this, other);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::*;

    fn rope_of(n: u32, len: u32) -> Rope<Run> {
        runs(n, len).into_iter().collect()
    }

    fn without(range: Range<u32>, total: u32) -> Vec<u32> {
        (0..total).filter(|v| !range.contains(v)).collect()
    }

    #[test]
    fn locate_normalizes_element_ends() {
        let rope = rope_of(10, 4);
        assert_eq!(rope.locate(8, &Len, false), Position { ordinal: 2, local: 0 });
        assert_eq!(rope.locate(8, &Len, true), Position { ordinal: 2, local: 0 });
        assert_eq!(rope.locate(9, &Len, true), Position { ordinal: 2, local: 1 });
        assert_eq!(rope.locate(40, &Len, true), Position { ordinal: 10, local: 0 });
        assert_eq!(Rope::<Run>::new().locate(0, &Len, false), Position { ordinal: 0, local: 0 });
    }

    #[test]
    #[should_panic]
    fn locate_out_of_bounds() {
        rope_of(10, 4).locate(41, &Len, false);
    }

    #[test]
    fn insert_splits_elements() {
        let mut rope = rope_of(10, 6);
        rope.insert(15, Run(vec![100, 101, 102]), &Len);
        rope.check();

        let mut expected: Vec<u32> = (0..15).collect();
        expected.extend([100, 101, 102]);
        expected.extend(15..60);
        assert_eq!(flatten(&rope), expected);
        assert_eq!(rope.len(), 12);
    }

    #[test]
    fn insert_at_boundaries() {
        let mut rope = rope_of(5, 3);
        rope.insert(0, run(100, 3), &Len);
        rope.insert(18, run(200, 3), &Len);
        rope.insert(9, run(300, 3), &Len);
        rope.check();

        let mut expected = vec![100, 101, 102];
        expected.extend(0..6);
        expected.extend([300, 301, 302]);
        expected.extend(6..15);
        expected.extend([200, 201, 202]);
        assert_eq!(flatten(&rope), expected);
        assert_eq!(rope.len(), 8);
    }

    #[test]
    fn insert_into_empty() {
        let mut rope = Rope::new();
        rope.insert(0, run(0, 1), &Len);
        rope.check();
        assert_eq!(rope.len(), 1);

        rope.insert(1, run(1, 1), &Len);
        rope.check();
        assert_eq!(flatten(&rope), vec![0, 1]);

        rope.insert(0, Run(vec![]), &Len);
        assert_eq!(rope.size(&Len), 2);
    }

    #[test]
    fn insert_at_index_places_before() {
        let mut rope = rope_of(20, 2);
        let index = rope.nth_index(7);
        rope.insert_at_index(index, run(100, 2));
        rope.check();
        assert_eq!(rope[&rope.nth_index(7)], run(100, 2));
        assert_eq!(rope[&rope.nth_index(8)], run(14, 2));

        let end = rope.end_index();
        rope.insert_at_index(end, run(200, 2));
        assert_eq!(rope.last(), Some(&run(200, 2)));
    }

    #[test]
    fn remove_returns_element() {
        let mut rope = rope_of(30, 3);
        let index = rope.nth_index(12);
        assert_eq!(rope.remove(index), run(36, 3));
        rope.check();
        assert_eq!(rope.len(), 29);
        assert_eq!(flatten(&rope), without(36..39, 90));
    }

    #[test]
    fn remove_at_offset() {
        let mut rope = rope_of(10, 4);
        // Offset 8 sits between elements 1 and 2, and removes element 2.
        assert_eq!(rope.remove_at(8, &Len), run(8, 4));
        assert_eq!(rope.remove_at(1, &Len), run(0, 4));
        rope.check();
        assert_eq!(rope.len(), 8);
        assert_eq!(rope.size(&Len), 32);
    }

    #[test]
    #[should_panic]
    fn remove_at_end_panics() {
        let mut rope = rope_of(10, 4);
        rope.remove_at(40, &Len);
    }

    #[test]
    fn remove_range_literal() {
        // 10 elements of length 10.
        let base = rope_of(10, 10);
        base.check();

        let mut rope = base.clone();
        rope.remove_range(50..70, &Len);
        rope.check();
        assert_eq!(flatten(&rope), without(50..70, 100));

        let mut rope = base.clone();
        rope.remove_range(0..100, &Len);
        rope.check();
        assert!(rope.is_empty());
        assert_eq!(rope.summary(), RunSummary::default());

        let mut rope = base.clone();
        rope.remove_range(30..30, &Len);
        rope.check();
        assert_eq!(rope, base);
        assert!(rope.root.as_ref().unwrap().ptr_eq(base.root.as_ref().unwrap()));

        let mut rope = base.clone();
        rope.remove_range(33..37, &Len);
        rope.check();
        assert_eq!(flatten(&rope), without(33..37, 100));

        // Base is untouched by any of it.
        base.check();
        assert_eq!(flatten(&base), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn remove_range_every_span() {
        let base = rope_of(12, 3);
        for start in 0..=36 {
            for end in start..=36 {
                let mut rope = base.clone();
                rope.remove_range(start as usize..end as usize, &Len);
                rope.check();
                assert_eq!(flatten(&rope), without(start..end, 36));
            }
        }
    }

    #[test]
    fn replace_range_splices() {
        let mut rope = rope_of(20, 4);
        rope.replace_range(10..30, &Len, vec![run(100, 3), Run(vec![]), run(200, 5)]);
        rope.check();

        let mut expected: Vec<u32> = (0..10).collect();
        expected.extend(100..103);
        expected.extend(200..205);
        expected.extend(30..80);
        assert_eq!(flatten(&rope), expected);
    }

    #[test]
    fn extract_slices() {
        let rope = rope_of(30, 4);
        for (start, end) in [(0, 0), (0, 120), (5, 7), (4, 8), (3, 50), (60, 120), (119, 120)] {
            let slice = rope.extract(start..end, &Len);
            slice.check();
            assert_eq!(flatten(&slice), (start as u32..end as u32).collect::<Vec<_>>());
        }
        rope.check();
    }

    #[test]
    fn split_off_halves() {
        let mut rope = rope_of(30, 4);
        let tail = rope.split_off(50, &Len);
        rope.check();
        tail.check();
        assert_eq!(flatten(&rope), (0..50).collect::<Vec<_>>());
        assert_eq!(flatten(&tail), (50..120).collect::<Vec<_>>());

        let rest = rope.split_off(50, &Len);
        assert!(rest.is_empty());
    }

    #[test]
    fn update_in_place() {
        let mut rope = rope_of(40, 3);
        let snapshot = rope.clone();

        let index = rope.nth_index(9);
        let old_len = rope.update(index, |r| {
            let len = r.0.len();
            r.0.push(1000);
            len
        });
        assert_eq!(old_len, 3);
        rope.check();
        assert_eq!(rope.size(&Len), 121);
        assert_eq!(rope[&rope.nth_index(9)].0, vec![27, 28, 29, 1000]);

        snapshot.check();
        assert_eq!(flatten(&snapshot), (0..120).collect::<Vec<_>>());
    }

    #[test]
    fn update_rebalances_and_drops() {
        let mut rope = rope_of(40, 3);

        // Shrinking an element below the minimum merges it with a neighbour.
        let index = rope.nth_index(20);
        rope.update(index, |r| { r.0.truncate(1); });
        rope.check();
        assert_eq!(rope.size(&Len), 118);

        // Emptying an element removes it.
        let index = rope.nth_index(0);
        rope.update(index, |r| r.0.clear());
        rope.check();
        assert_eq!(flatten(&rope)[..3], [3, 4, 5]);
        assert_eq!(rope.size(&Len), 115);
    }

    #[test]
    fn panicking_update_leaves_rope_unchanged() {
        let mut rope = rope_of(40, 3);
        let before = rope.clone();
        let summary = rope.summary();

        let index = rope.nth_index(17);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            rope.update(index, |r| {
                r.0.push(1000);
                r.0.push(1001);
                panic!("update failed half way");
            })
        }));
        assert!(result.is_err());

        rope.check();
        assert_eq!(rope.summary(), summary);
        assert_eq!(rope, before);
        assert_eq!(flatten(&rope), (0..120).collect::<Vec<_>>());
    }

    #[test]
    fn append_and_join() {
        let mut a = rope_of(17, 3);
        a.append(run(51, 3));
        a.append(run(54, 1));
        a.check();
        assert_eq!(flatten(&a), (0..55).collect::<Vec<_>>());

        let b: Rope<Run> = (0..40).map(|i| run(55 + i * 2, 2)).collect();
        let joined = Rope::join(a.clone(), b.clone());
        joined.check();
        assert_eq!(flatten(&joined), (0..135).collect::<Vec<_>>());

        let mut c = a.clone();
        c.append_rope(Rope::new());
        assert_eq!(c, a);
        let mut d = Rope::new();
        d.append_rope(b.clone());
        assert_eq!(d, b);
    }

    #[test]
    fn edits_leave_snapshots_alone() {
        let base = rope_of(50, 3);
        let mut edited = base.clone();
        for i in 0..20 {
            edited.insert(i * 7, run(1000 + i as u32 * 2, 2), &Len);
            edited.remove_range(i * 3..i * 3 + 2, &Len);
        }
        edited.check();
        base.check();
        assert_eq!(flatten(&base), (0..150).collect::<Vec<_>>());
    }
}
