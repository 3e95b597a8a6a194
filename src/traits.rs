//! The contracts a client payload has to satisfy to be stored in a [`Rope`](crate::Rope).
//!
//! The rope itself doesn't know what an element *is*. It only knows how to add up element
//! summaries, how to cut an element in two and how to ask two neighbouring elements to even
//! themselves out. Coordinate systems ("how far into the rope is this?") are supplied separately
//! as [`Metric`]s, so the same rope can be addressed in bytes, characters, lines or whatever else
//! the summary tracks.

use std::fmt::Debug;

/// An aggregate over a run of elements. This is a commutative monoid with an inverse for values
/// which were actually added.
pub trait Summary: Clone + Debug + PartialEq {
    /// The maximum number of children an internal node may hold for ropes of this element type.
    /// Small elements make wide nodes worthwhile.
    ///
    /// Must be at least 4 and must fit in `CHILD_COUNT_BITS` (ie, `MAX_CHILDREN <= 1 <<
    /// CHILD_COUNT_BITS`).
    const MAX_CHILDREN: usize;

    /// The number of bits needed to store a child slot (or a child count) in a node.
    const CHILD_COUNT_BITS: u32;

    fn zero() -> Self;

    fn is_zero(&self) -> bool;

    /// Accumulate `other` into self.
    fn add(&mut self, other: &Self);

    /// Remove `other` from self. Only valid if `other` was previously added.
    fn subtract(&mut self, other: &Self);
}

/// A single item stored at a leaf of the rope.
pub trait Element: Clone {
    type Summary: Summary;

    fn summary(&self) -> Self::Summary;

    /// Length in local index units. This is the coordinate space [`Metric::index`] maps into and
    /// [`Element::split_off`] takes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements which report themselves as undersized get offered to their neighbours for
    /// merging. A rope with more than one element never stores an undersized element.
    fn is_undersized(&self) -> bool;

    /// Truncate self at local index `at`, returning everything from `at` onwards as a new element.
    fn split_off(&mut self, at: usize) -> Self;

    /// Move content between self and the element which follows it, so that neither is
    /// undersized. Returns true if `next` has been fully absorbed into self (and is now empty).
    ///
    /// If this returns false, neither element may be undersized afterwards.
    fn rebalance_with_next(&mut self, next: &mut Self) -> bool;

    /// Like [`Element::rebalance_with_next`], but with the element which precedes self. Returns
    /// true if `prev` has been fully absorbed into self.
    fn rebalance_with_prev(&mut self, prev: &mut Self) -> bool;

    /// Structural self-validation. Called by [`Rope::check`](crate::Rope::check).
    fn check(&self) {}
}

/// A coordinate system over a rope.
///
/// Metrics are passed into each call rather than baked into the rope type, so one rope can be
/// addressed through several unrelated metrics in the same program.
pub trait Metric<E: Element> {
    /// Project a summary onto this metric's offset space.
    fn size(&self, summary: &E::Summary) -> usize;

    /// Convert an offset in this metric (relative to the start of `element`) into a local index
    /// within the element. `offset` must be in `0..=self.size(&element.summary())`.
    fn index(&self, offset: usize, element: &E) -> usize;
}
