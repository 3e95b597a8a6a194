use std::iter::FusedIterator;
use std::slice;

use crate::node::Node;
use crate::traits::Element;
use crate::Rope;

/// An iterator over the elements in a rope, in order.
pub struct Iter<'a, E: Element> {
    // One slice iterator per level of the tree we're currently inside.
    stack: Vec<slice::Iter<'a, Node<E>>>,
    remaining: usize,
}

impl<'a, E: Element> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<&'a E> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                None => { self.stack.pop(); }
                Some(node) if node.is_leaf() => {
                    self.remaining -= 1;
                    return Some(node.element());
                }
                Some(node) => self.stack.push(node.children().iter()),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, E: Element> ExactSizeIterator for Iter<'a, E> {}
impl<'a, E: Element> FusedIterator for Iter<'a, E> {}

impl<E: Element> Rope<E> {
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            stack: self.root.iter().map(|root| slice::from_ref(root).iter()).collect(),
            remaining: self.len(),
        }
    }
}

impl<'a, E: Element> IntoIterator for &'a Rope<E> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Iter<'a, E> {
        self.iter()
    }
}
