//! Low dimensional layout: curve fit, initial positions and stochastic gradient descent
use ndarray::{Array1, Array2};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use trafficseg::Float;

use crate::graph::Edge;

const CURVE_POINTS: usize = 300;
const CURVE_MAX_ITERATIONS: usize = 200;
const GRADIENT_CLIP: f64 = 4.0;
const LAYOUT_SCALE: f64 = 10.0;

/// Membership of two projected points at distance `x`
fn curve<F: Float>(x: F, a: F, b: F) -> F {
    F::one() / (F::one() + a * x.powf(F::cast(2.0) * b))
}

/// Fit `a` and `b` of `1 / (1 + a * x^(2b))` to the offset exponential decay given by
/// `min_dist` and `spread`
///
/// The curve is fitted by least squares on `[0, 3 * spread]` with a Levenberg-Marquardt
/// iteration starting at `a = b = 1`.
pub(crate) fn find_ab_params<F: Float>(spread: F, min_dist: F) -> (F, F) {
    let xs = Array1::linspace(F::zero(), F::cast(3.0) * spread, CURVE_POINTS);
    let ys = xs.mapv(|x| {
        if x < min_dist {
            F::one()
        } else {
            (-(x - min_dist) / spread).exp()
        }
    });
    let cost = |a: F, b: F| {
        xs.iter()
            .zip(ys.iter())
            .map(|(&x, &y)| (curve(x, a, b) - y).powi(2))
            .sum::<F>()
    };

    let (two, ten) = (F::cast(2.0), F::cast(10.0));
    let (mut a, mut b) = (F::one(), F::one());
    let mut current = cost(a, b);
    let mut damping = F::cast(1e-3);

    for _ in 0..CURVE_MAX_ITERATIONS {
        // normal equations J^T J and gradient J^T r of the residuals
        let (mut jaa, mut jab, mut jbb) = (F::zero(), F::zero(), F::zero());
        let (mut ga, mut gb) = (F::zero(), F::zero());
        for (&x, &y) in xs.iter().zip(ys.iter()) {
            // both derivatives vanish at the origin
            if x <= F::zero() {
                continue;
            }
            let u = x.powf(two * b);
            let g = F::one() / (F::one() + a * u);
            let residual = g - y;
            let da = -u * g * g;
            let db = -two * a * u * x.ln() * g * g;

            jaa += da * da;
            jab += da * db;
            jbb += db * db;
            ga += da * residual;
            gb += db * residual;
        }

        let (maa, mbb) = (jaa * (F::one() + damping), jbb * (F::one() + damping));
        let det = maa * mbb - jab * jab;
        if det.abs() <= F::min_positive_value() {
            break;
        }
        let next_a = a - (mbb * ga - jab * gb) / det;
        let next_b = b - (maa * gb - jab * ga) / det;

        let candidate = if next_a > F::zero() && next_b > F::zero() {
            cost(next_a, next_b)
        } else {
            F::infinity()
        };
        if candidate < current {
            a = next_a;
            b = next_b;
            current = candidate;
            damping /= ten;
        } else {
            damping *= ten;
            if damping > F::cast(1e10) {
                break;
            }
        }
    }

    (a, b)
}

/// Uniformly random positions of `n` points in the plane, every axis rescaled to `[0, 10]`
pub(crate) fn random_layout<F: Float, R: Rng>(n: usize, rng: &mut R) -> Array2<F> {
    let scale = F::cast(LAYOUT_SCALE);
    let mut embedding = Array2::random_using((n, 2), Uniform::new(-scale, scale), rng);
    rescale(&mut embedding);
    embedding
}

fn rescale<F: Float>(embedding: &mut Array2<F>) {
    let scale = F::cast(LAYOUT_SCALE);
    for mut column in embedding.columns_mut() {
        let (min, max) = column
            .iter()
            .fold((F::infinity(), F::neg_infinity()), |(min, max), &x| {
                (min.min(x), max.max(x))
            });
        let range = max - min;
        if range > F::zero() {
            column.mapv_inplace(|x| scale * (x - min) / range);
        } else {
            column.fill(F::zero());
        }
    }
}

/// Settings of the layout optimisation
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Optimizer<F> {
    pub a: F,
    pub b: F,
    pub repulsion_strength: F,
    pub learning_rate: F,
    pub negative_sample_rate: usize,
    pub n_epochs: usize,
}

impl<F: Float> Optimizer<F> {
    /// Move the points of `embedding` along the edges of the neighbour graph
    ///
    /// Every sample of an edge pulls its two ends together and pushes the head away from
    /// `negative_sample_rate` random points. The step size decays linearly to zero over the
    /// epochs and every gradient component is clipped to `[-4, 4]`.
    pub fn optimize<R: Rng>(&self, embedding: &mut Array2<F>, edges: &[Edge<F>], rng: &mut R) {
        let n_vertices = embedding.nrows();
        let dim = embedding.ncols();
        let (a, b) = (self.a, self.b);
        let two = F::cast(2.0);
        let clip = F::cast(GRADIENT_CLIP);
        let clamp = |x: F| x.max(-clip).min(clip);

        let epochs_per_negative_sample = edges
            .iter()
            .map(|edge| edge.epochs_per_sample / F::cast(self.negative_sample_rate))
            .collect::<Vec<_>>();
        let mut next_sample = edges
            .iter()
            .map(|edge| edge.epochs_per_sample)
            .collect::<Vec<_>>();
        let mut next_negative_sample = epochs_per_negative_sample.clone();

        let mut alpha = self.learning_rate;
        for epoch in 0..self.n_epochs {
            let now = F::cast(epoch);

            for (idx, edge) in edges.iter().enumerate() {
                if next_sample[idx] > now {
                    continue;
                }
                let (j, k) = (edge.head, edge.tail);

                let dist_squared = squared_distance(embedding, j, k);
                let grad_coeff = if dist_squared > F::zero() {
                    -two * a * b * dist_squared.powf(b - F::one())
                        / (a * dist_squared.powf(b) + F::one())
                } else {
                    F::zero()
                };
                for d in 0..dim {
                    let grad = clamp(grad_coeff * (embedding[[j, d]] - embedding[[k, d]]));
                    embedding[[j, d]] += grad * alpha;
                    embedding[[k, d]] -= grad * alpha;
                }
                next_sample[idx] += edge.epochs_per_sample;

                if self.negative_sample_rate == 0 {
                    continue;
                }
                let n_negative = ((now - next_negative_sample[idx])
                    / epochs_per_negative_sample[idx])
                    .floor()
                    .to_usize()
                    .unwrap_or(0);

                for _ in 0..n_negative {
                    let k = rng.gen_range(0..n_vertices);
                    if j == k {
                        continue;
                    }

                    let dist_squared = squared_distance(embedding, j, k);
                    let grad_coeff = if dist_squared > F::zero() {
                        two * self.repulsion_strength * b
                            / ((F::cast(1e-3) + dist_squared)
                                * (a * dist_squared.powf(b) + F::one()))
                    } else {
                        F::zero()
                    };
                    for d in 0..dim {
                        let grad = if grad_coeff > F::zero() {
                            clamp(grad_coeff * (embedding[[j, d]] - embedding[[k, d]]))
                        } else {
                            clip
                        };
                        embedding[[j, d]] += grad * alpha;
                    }
                }
                next_negative_sample[idx] += F::cast(n_negative) * epochs_per_negative_sample[idx];
            }

            alpha = self.learning_rate * (F::one() - now / F::cast(self.n_epochs));
        }
    }
}

fn squared_distance<F: Float>(embedding: &Array2<F>, j: usize, k: usize) -> F {
    embedding
        .row(j)
        .iter()
        .zip(embedding.row(k).iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn curve_parameters_of_the_default_settings() {
        let (a, b) = find_ab_params(1.0f64, 0.1);
        assert_abs_diff_eq!(a, 1.577, epsilon = 1e-2);
        assert_abs_diff_eq!(b, 0.895, epsilon = 1e-2);
    }

    #[test]
    fn curve_parameters_follow_min_dist() {
        let (a, b) = find_ab_params(2.0f64, 0.5);
        assert!(a > 0.0 && b > 0.0);

        // the fitted curve stays close to the target membership
        for &(x, y) in &[(0.25, 1.0), (2.5, (-1.0f64).exp())] {
            assert_abs_diff_eq!(curve(x, a, b), y, epsilon = 0.1);
        }

        // a larger minimum distance keeps far points alike for longer
        let (a_far, b_far) = find_ab_params(2.0f64, 1.5);
        assert!(curve(1.5, a_far, b_far) > curve(1.5, a, b));
    }

    #[test]
    fn random_layout_spans_the_unit_box() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let layout: Array2<f64> = random_layout(20, &mut rng);

        assert_eq!(layout.dim(), (20, 2));
        for column in layout.columns() {
            let min = column.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert_abs_diff_eq!(min, 0.0);
            assert_abs_diff_eq!(max, 10.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_columns_collapse_to_zero() {
        let mut layout = array![[3.0, 1.0], [3.0, 2.0]];
        rescale(&mut layout);
        assert_eq!(layout, array![[0.0, 0.0], [0.0, 10.0]]);
    }

    #[test]
    fn connected_points_move_closer() {
        let mut embedding = array![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];
        let edges = vec![
            Edge {
                head: 0,
                tail: 3,
                epochs_per_sample: 1.0,
            },
            Edge {
                head: 3,
                tail: 0,
                epochs_per_sample: 1.0,
            },
        ];
        let (a, b) = find_ab_params(1.0, 0.1);
        let optimizer = Optimizer {
            a,
            b,
            repulsion_strength: 1.0,
            learning_rate: 1.0,
            negative_sample_rate: 0,
            n_epochs: 50,
        };

        let before = squared_distance(&embedding, 0, 3);
        let mut rng = Xoshiro256Plus::seed_from_u64(1);
        optimizer.optimize(&mut embedding, &edges, &mut rng);

        assert!(squared_distance(&embedding, 0, 3) < before);
        // points without edges stay put when there is no repulsion
        assert_eq!(embedding.row(1), array![10.0, 0.0]);
        assert_eq!(embedding.row(2), array![0.0, 10.0]);
    }
}
