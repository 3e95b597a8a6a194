//! # SumRope
//!
//! A persistent rope: a balanced B-tree holding an ordered sequence of elements you define.
//!
//! Each element carries a *summary* (eg its length in bytes, characters and lines) and every
//! internal node caches the sum of its children's summaries. Any quantity the summary tracks can
//! then be used as a coordinate system - a [`Metric`] - to find, insert and remove content in
//! O(log n) time.
//!
//! Ropes are cheap to clone. Clones share their tree, and edits only copy the nodes along the path
//! they touch, so old versions stay valid and unchanged for as long as you hold onto them.
//!
//! ```
//! use sumrope::Rope;
//! use rope_testdata::{Chunk, Chars};
//!
//! let mut rope: Rope<Chunk> = ["Hi ", "there ", "world"].into_iter().map(Chunk::from).collect();
//! let snapshot = rope.clone();
//!
//! rope.insert(3, Chunk::from("out "), &Chars);
//! rope.remove_range(0..3, &Chars);
//!
//! assert_eq!(rope_testdata::flatten(&rope), "out there world");
//! assert_eq!(rope_testdata::flatten(&snapshot), "Hi there world");
//! ```
//!
//! Positions inside a particular rope value can also be held as an [`Index`], which can be stepped
//! forwards and backwards through the elements without searching from the root each time.

#[macro_use]
mod macros;

mod traits;
mod node;
mod builder;
mod rope;
mod index;
mod edit;
mod iter;

#[cfg(test)]
mod testing;

pub use traits::{Element, Metric, Summary};
pub use builder::Builder;
pub use rope::Rope;
pub use index::Index;
pub use iter::Iter;
