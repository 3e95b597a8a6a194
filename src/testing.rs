// A tiny element type for the unit tests. Integration tests use the string chunks from
// rope-testdata instead.

use crate::traits::{Element, Metric, Summary};
use crate::Rope;

pub(crate) const MIN_RUN: usize = 2;
pub(crate) const MAX_RUN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Run(pub Vec<u32>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RunSummary {
    pub runs: usize,
    pub len: usize,
}

impl Summary for RunSummary {
    const MAX_CHILDREN: usize = 8;
    const CHILD_COUNT_BITS: u32 = 3;

    fn zero() -> Self { Self::default() }
    fn is_zero(&self) -> bool { *self == Self::default() }

    fn add(&mut self, other: &Self) {
        self.runs += other.runs;
        self.len += other.len;
    }

    fn subtract(&mut self, other: &Self) {
        self.runs -= other.runs;
        self.len -= other.len;
    }
}

impl Element for Run {
    type Summary = RunSummary;

    fn summary(&self) -> RunSummary {
        RunSummary { runs: 1, len: self.0.len() }
    }

    fn len(&self) -> usize { self.0.len() }

    fn is_undersized(&self) -> bool { self.0.len() < MIN_RUN }

    fn split_off(&mut self, at: usize) -> Self {
        Run(self.0.split_off(at))
    }

    fn rebalance_with_next(&mut self, next: &mut Self) -> bool {
        if self.0.len() + next.0.len() <= MAX_RUN {
            self.0.append(&mut next.0);
            return true;
        }
        while self.0.len() < MIN_RUN {
            self.0.push(next.0.remove(0));
        }
        while next.0.len() < MIN_RUN {
            let v = self.0.pop().unwrap();
            next.0.insert(0, v);
        }
        false
    }

    fn rebalance_with_prev(&mut self, prev: &mut Self) -> bool {
        if prev.0.len() + self.0.len() <= MAX_RUN {
            prev.0.append(&mut self.0);
            std::mem::swap(&mut self.0, &mut prev.0);
            return true;
        }
        prev.rebalance_with_next(self)
    }

    fn check(&self) {
        assert!(!self.0.is_empty());
    }
}

/// Measures runs by the number of values in them.
pub(crate) struct Len;

impl Metric<Run> for Len {
    fn size(&self, summary: &RunSummary) -> usize { summary.len }

    fn index(&self, offset: usize, element: &Run) -> usize {
        assert!(offset <= element.0.len());
        offset
    }
}

/// Measures runs by counting them.
pub(crate) struct Runs;

impl Metric<Run> for Runs {
    fn size(&self, summary: &RunSummary) -> usize { summary.runs }

    fn index(&self, offset: usize, element: &Run) -> usize {
        assert!(offset <= 1);
        if offset == 0 { 0 } else { element.0.len() }
    }
}

pub(crate) fn run(start: u32, len: u32) -> Run {
    Run((start..start + len).collect())
}

/// `n` runs of `len` consecutive values each, starting from 0.
pub(crate) fn runs(n: u32, len: u32) -> Vec<Run> {
    (0..n).map(|i| run(i * len, len)).collect()
}

pub(crate) fn flatten(rope: &Rope<Run>) -> Vec<u32> {
    rope.iter().flat_map(|r| r.0.iter().copied()).collect()
}
