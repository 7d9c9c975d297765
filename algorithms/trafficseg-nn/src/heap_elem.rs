use std::cmp::{Ordering, Reverse};

use noisy_float::{checkers::NumChecker, NoisyFloat};
use trafficseg::Float;

pub(crate) struct HeapElem<D: Ord, T> {
    pub(crate) dist: D,
    pub(crate) elem: T,
}

impl<D: Ord, T> PartialEq for HeapElem<D, T> {
    fn eq(&self, other: &Self) -> bool {
        self.dist.eq(&other.dist)
    }
}
impl<D: Ord, T> Eq for HeapElem<D, T> {}

impl<D: Ord, T> PartialOrd for HeapElem<D, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: Ord, T> Ord for HeapElem<D, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist.cmp(&other.dist)
    }
}

/// Pops the closest point first, equal distances pop the smaller index first
pub(crate) type MinHeapElem<F> = HeapElem<Reverse<(NoisyFloat<F, NumChecker>, usize)>, usize>;

impl<F: Float> MinHeapElem<F> {
    pub(crate) fn new(dist: F, idx: usize) -> Self {
        Self {
            dist: Reverse((NoisyFloat::new(dist), idx)),
            elem: idx,
        }
    }

    pub(crate) fn into_pair(self) -> (usize, F) {
        let Reverse((dist, _)) = self.dist;
        (self.elem, dist.raw())
    }
}
