use std::fmt::{Debug, Formatter};

use crate::builder::Builder;
use crate::node::Node;
use crate::traits::{Element, Metric, Summary};

/// A persistent sequence of elements stored in a balanced tree.
///
/// The rope is a value type. Cloning is O(1) and shares the whole tree; every editing method
/// copies only the nodes it needs to change, leaving other clones untouched.
pub struct Rope<E: Element> {
    // None for the empty rope. Otherwise the root holds at least one element, and if it's an
    // internal node it has at least 2 children.
    pub(crate) root: Option<Node<E>>,
}

impl<E: Element> Rope<E> {
    pub fn new() -> Self {
        Rope { root: None }
    }

    pub fn builder() -> Builder<E> {
        Builder::new()
    }

    /// The number of elements in the rope.
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.count())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The sum of the summaries of every element.
    pub fn summary(&self) -> E::Summary {
        match &self.root {
            Some(root) => root.summary().clone(),
            None => E::Summary::zero(),
        }
    }

    /// The total size of the rope in the given metric.
    pub fn size<M: Metric<E>>(&self, metric: &M) -> usize {
        match &self.root {
            Some(root) => metric.size(root.summary()),
            None => 0,
        }
    }

    pub fn first(&self) -> Option<&E> {
        self.root.as_ref().map(|root| root.element_at(0))
    }

    pub fn last(&self) -> Option<&E> {
        self.root.as_ref().map(|root| root.element_at(root.count() - 1))
    }

    /// Check the internal consistency of the rope. This walks the whole tree, so it's slow. It
    /// panics if anything is wrong.
    pub fn check(&self) {
        let max = E::Summary::MAX_CHILDREN;
        let bits = E::Summary::CHILD_COUNT_BITS;
        assert!(max >= 4, "MAX_CHILDREN must be at least 4");
        assert!(bits < 64 && max <= 1 << bits, "MAX_CHILDREN does not fit in CHILD_COUNT_BITS");

        if let Some(root) = &self.root {
            root.check(true, root.count() == 1);
        }
    }

    /// Dump the tree structure to stdout.
    pub fn print(&self) where E: Debug {
        match &self.root {
            None => println!("(empty rope)"),
            Some(root) => {
                println!("elements: {}\theight: {}\tsummary: {:?}", root.count(), root.height(), root.summary());
                root.print(0);
            }
        }
    }
}

impl<E: Element> Default for Rope<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> Clone for Rope<E> {
    fn clone(&self) -> Self {
        Rope { root: self.root.clone() }
    }
}

impl<E: Element + Debug> Debug for Rope<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// Ropes compare element by element. Two ropes holding the same content chunked differently are
// not equal.
impl<E: Element + PartialEq> PartialEq for Rope<E> {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (&self.root, &other.root) {
            if a.ptr_eq(b) { return true; }
        }
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<E: Element + Eq> Eq for Rope<E> {}

impl<E: Element> FromIterator<E> for Rope<E> {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        let mut builder = Builder::new();
        builder.extend(iter);
        builder.finish()
    }
}

impl<E: Element> Extend<E> for Rope<E> {
    fn extend<T: IntoIterator<Item = E>>(&mut self, iter: T) {
        let mut builder = Builder::new();
        builder.push_rope(std::mem::take(self));
        builder.extend(iter);
        *self = builder.finish();
    }
}

impl<E: Element> From<Builder<E>> for Rope<E> {
    fn from(builder: Builder<E>) -> Self {
        builder.finish()
    }
}
