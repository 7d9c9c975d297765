use std::collections::BinaryHeap;

use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};
use trafficseg::Float;

use crate::{distance::Distance, heap_elem::MinHeapElem, NnError, Point};

/// Brute force nearest neighbour search
///
/// Every query computes the distance to all points of the batch, which is the right trade-off for
/// the few hundred intervals of a traffic dataset and works with any [`Distance`], metric or not.
#[derive(Debug, Clone)]
pub struct LinearSearch<'a, F: Float, D: Distance<F>>(ArrayView2<'a, F>, D);

impl<'a, F: Float, D: Distance<F>> LinearSearch<'a, F, D> {
    /// Index the rows of `batch`
    ///
    /// Fails with `NnError::ZeroDimension` if the batch has rows without features.
    pub fn from_batch<DT: Data<Elem = F>>(
        batch: &'a ArrayBase<DT, Ix2>,
        dist_fn: D,
    ) -> Result<Self, NnError> {
        if batch.ncols() == 0 && batch.nrows() > 0 {
            Err(NnError::ZeroDimension)
        } else {
            Ok(Self(batch.view(), dist_fn))
        }
    }

    /// The `k` closest points to `point` as `(row index, distance)`, closest first
    ///
    /// Points at equal distance are returned in row order. If `point` is itself part of the batch
    /// it is its own nearest neighbour.
    pub fn k_nearest(&self, point: Point<F>, k: usize) -> Result<Vec<(usize, F)>, NnError> {
        self.check_dimension(&point)?;

        let mut heap = BinaryHeap::with_capacity(self.0.nrows());
        for (idx, pt) in self.0.rows().into_iter().enumerate() {
            let dist = self.1.rdistance(point.view(), pt);
            heap.push(MinHeapElem::new(dist, idx));
        }

        Ok((0..k.min(heap.len()))
            .filter_map(|_| heap.pop())
            .map(|elem| {
                let (idx, rdist) = elem.into_pair();
                (idx, self.1.rdist_to_dist(rdist))
            })
            .collect())
    }

    fn check_dimension(&self, point: &Point<F>) -> Result<(), NnError> {
        if point.len() != self.0.ncols() {
            Err(NnError::DimensionMismatch {
                expected: self.0.ncols(),
                found: point.len(),
            })
        } else {
            Ok(())
        }
    }
}

/// Symmetric matrix of the distances between all rows of `records`
///
/// The diagonal is zero.
pub fn pairwise_distances<F: Float, D: Distance<F>>(
    records: &ArrayBase<impl Data<Elem = F>, Ix2>,
    dist_fn: &D,
) -> Array2<F> {
    let n = records.nrows();
    let mut distances = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = dist_fn.distance(records.row(i), records.row(j));
            distances[[i, j]] = dist;
            distances[[j, i]] = dist;
        }
    }

    distances
}
