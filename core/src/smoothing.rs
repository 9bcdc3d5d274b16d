//! Cubic smoothing spline.
//!
//! Fits the smoothest cubic spline `g` whose weighted residual sum of squares
//! `Σ wᵢ (yᵢ − g(xᵢ))²` stays within a smoothing budget `s`. For a fixed
//! penalty `λ` the fit minimises `Σ wᵢ (yᵢ − gᵢ)² + λ ∫ g''²`, which reduces to
//! the banded system `(R + λ Qᵀ W⁻¹ Q) γ = Qᵀ y` with `g = y − λ W⁻¹ Q γ`
//! (Reinsch). `λ` is then searched in log space until the residual meets `s`.
//!
//! When the least-squares cubic polynomial already fits within `s` no knots
//! are needed and that cubic is the result.

use chrono::Datelike;
use tracing::debug;

use crate::models::DailySeries;

/// Below this many points no smoothing is attempted.
pub const MIN_SMOOTHING_POINTS: usize = 4;

/// Residual budget per data point (`s = 0.8 · n`).
pub const SMOOTHING_FACTOR_PER_POINT: f64 = 0.8;

/// Degree of the polynomial returned when it already meets the budget.
const CUBIC_DEGREE: usize = 3;

const BISECTION_STEPS: usize = 100;
const MAX_EXPANSIONS: usize = 60;

/// Smooth a daily series against ordinal dates.
///
/// Returns one smoothed value per point, in series order, or `None` when the
/// series has fewer than [`MIN_SMOOTHING_POINTS`] points.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn smooth_daily_series(series: &DailySeries) -> Option<Vec<f64>> {
    if series.len() < MIN_SMOOTHING_POINTS {
        debug!(points = series.len(), "not enough points to smooth");
        return None;
    }
    let xs: Vec<f64> = series
        .points()
        .iter()
        .map(|p| f64::from(p.date.num_days_from_ce()))
        .collect();
    let ys = series.weights();
    let s = SMOOTHING_FACTOR_PER_POINT * ys.len() as f64;
    Some(smoothing_spline(&xs, &ys, s))
}

#[derive(Debug, Clone, Copy)]
struct Knot {
    x: f64,
    y: f64,
    w: f64,
}

/// Evaluate the smoothing spline for `(xs, ys)` at the data points.
///
/// Input need not be sorted; output follows input order. Points sharing an
/// `x` are merged into one knot weighted by their count.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn smoothing_spline(xs: &[f64], ys: &[f64], s: f64) -> Vec<f64> {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len().min(ys.len());
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    // knot_of[i] is the knot index for input point i
    let mut knot_of = vec![0; n];
    let mut knots: Vec<Knot> = Vec::new();
    let mut sums: Vec<f64> = Vec::new();
    for &i in &order {
        if knots.last().is_some_and(|k| k.x == xs[i]) {
            let last = knots.len() - 1;
            knots[last].w += 1.0;
            sums[last] += ys[i];
        } else {
            knots.push(Knot {
                x: xs[i],
                y: 0.0,
                w: 1.0,
            });
            sums.push(ys[i]);
        }
        knot_of[i] = knots.len() - 1;
    }
    for (k, sum) in knots.iter_mut().zip(&sums) {
        k.y = sum / k.w;
    }

    let within: f64 = (0..n)
        .map(|i| (ys[i] - knots[knot_of[i]].y).powi(2))
        .sum();
    let budget = s - within;

    let fitted = fit_knots(&knots, budget);
    (0..n).map(|i| fitted[knot_of[i]]).collect()
}

#[allow(clippy::cast_precision_loss)]
fn fit_knots(knots: &[Knot], budget: f64) -> Vec<f64> {
    let means: Vec<f64> = knots.iter().map(|k| k.y).collect();
    if knots.len() <= CUBIC_DEGREE + 1 || budget <= 0.0 {
        return means;
    }

    if let Some(cubic) = weighted_polynomial(knots, CUBIC_DEGREE) {
        if residual(knots, &cubic) <= budget {
            debug!("least-squares cubic within smoothing budget");
            return cubic;
        }
    }

    let mean_gap = (knots[knots.len() - 1].x - knots[0].x) / (knots.len() - 1) as f64;
    let scale = mean_gap.powi(3);

    let mut lo = scale * 1e-12;
    let mut hi = scale;
    for _ in 0..MAX_EXPANSIONS {
        if residual(knots, &reinsch_fit(knots, hi)) >= budget {
            break;
        }
        lo = hi;
        hi *= 10.0;
    }

    for _ in 0..BISECTION_STEPS {
        let mid = ((lo.ln() + hi.ln()) * 0.5).exp();
        if residual(knots, &reinsch_fit(knots, mid)) > budget {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    debug!(lambda = lo, "smoothing penalty selected");
    reinsch_fit(knots, lo)
}

fn residual(knots: &[Knot], fitted: &[f64]) -> f64 {
    knots
        .iter()
        .zip(fitted)
        .map(|(k, g)| k.w * (k.y - g).powi(2))
        .sum()
}

/// Weighted least-squares polynomial of `degree`, evaluated at the knots.
/// `None` when the normal equations are singular.
#[allow(clippy::float_cmp)]
fn weighted_polynomial(knots: &[Knot], degree: usize) -> Option<Vec<f64>> {
    let total: f64 = knots.iter().map(|k| k.w).sum();
    let x_mean = knots.iter().map(|k| k.w * k.x).sum::<f64>() / total;
    let x_scale = knots
        .iter()
        .map(|k| (k.x - x_mean).abs())
        .fold(0.0, f64::max);
    if x_scale == 0.0 {
        return None;
    }
    let t = |x: f64| (x - x_mean) / x_scale;
    let powers = |x: f64| -> Vec<f64> {
        std::iter::successors(Some(1.0), |p| Some(p * t(x)))
            .take(degree + 1)
            .collect()
    };

    let size = degree + 1;
    let mut normal = vec![vec![0.0; size]; size];
    let mut rhs = vec![0.0; size];
    for k in knots {
        let phi = powers(k.x);
        for (r, pr) in phi.iter().enumerate() {
            rhs[r] += k.w * pr * k.y;
            for (c, pc) in phi.iter().enumerate() {
                normal[r][c] += k.w * pr * pc;
            }
        }
    }

    let coeffs = solve_dense(normal, rhs)?;
    Some(
        knots
            .iter()
            .map(|k| {
                powers(k.x)
                    .iter()
                    .zip(&coeffs)
                    .map(|(p, c)| p * c)
                    .sum()
            })
            .collect(),
    )
}

/// Gaussian elimination with partial pivoting.
#[allow(clippy::needless_range_loop)]
fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for c in col..n {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|c| a[row][c] * x[c]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Smoothing spline values at the knots for a fixed penalty `lambda`.
/// Requires at least three knots with strictly increasing `x`.
fn reinsch_fit(knots: &[Knot], lambda: f64) -> Vec<f64> {
    let m = knots.len();
    let inner = m - 2;
    let h: Vec<f64> = knots.windows(2).map(|p| p[1].x - p[0].x).collect();
    let winv: Vec<f64> = knots.iter().map(|k| 1.0 / k.w).collect();

    // Column c of Q has entries at rows c, c+1, c+2.
    let q: Vec<[f64; 3]> = (0..inner)
        .map(|c| {
            let a = 1.0 / h[c];
            let e = 1.0 / h[c + 1];
            [a, -a - e, e]
        })
        .collect();

    let mut band = Band::zeros(inner);
    let mut rhs = vec![0.0; inner];
    for c in 0..inner {
        let [qa, qb, qe] = q[c];
        band.diag[c] = (h[c] + h[c + 1]) / 3.0
            + lambda * (qa * qa * winv[c] + qb * qb * winv[c + 1] + qe * qe * winv[c + 2]);
        if c + 1 < inner {
            let next = q[c + 1];
            band.off1[c] = h[c + 1] / 6.0
                + lambda * (qb * next[0] * winv[c + 1] + qe * next[1] * winv[c + 2]);
        }
        if c + 2 < inner {
            band.off2[c] = lambda * qe * q[c + 2][0] * winv[c + 2];
        }
        rhs[c] = qa * knots[c].y + qb * knots[c + 1].y + qe * knots[c + 2].y;
    }

    let gamma = band.solve(&rhs);

    let mut q_gamma = vec![0.0; m];
    for (c, g) in gamma.iter().enumerate() {
        for (offset, coeff) in q[c].iter().enumerate() {
            q_gamma[c + offset] += coeff * g;
        }
    }

    knots
        .iter()
        .zip(winv.iter().zip(&q_gamma))
        .map(|(k, (wi, qg))| k.y - lambda * wi * qg)
        .collect()
}

/// Symmetric positive-definite pentadiagonal matrix.
#[derive(Debug, Clone)]
struct Band {
    diag: Vec<f64>,
    off1: Vec<f64>,
    off2: Vec<f64>,
}

impl Band {
    fn zeros(n: usize) -> Self {
        Self {
            diag: vec![0.0; n],
            off1: vec![0.0; n],
            off2: vec![0.0; n],
        }
    }

    /// LDLᵀ factorisation followed by forward/back substitution.
    fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.diag.len();
        let mut d = vec![0.0; n];
        let mut l1 = vec![0.0; n];
        let mut l2 = vec![0.0; n];

        for i in 0..n {
            let mut di = self.diag[i];
            let mut li1 = self.off1[i];
            if i >= 1 {
                di -= l1[i - 1] * l1[i - 1] * d[i - 1];
                li1 -= l2[i - 1] * l1[i - 1] * d[i - 1];
            }
            if i >= 2 {
                di -= l2[i - 2] * l2[i - 2] * d[i - 2];
            }
            d[i] = di;
            l1[i] = li1 / di;
            l2[i] = self.off2[i] / di;
        }

        let mut z = b.to_vec();
        for i in 0..n {
            if i >= 1 {
                z[i] -= l1[i - 1] * z[i - 1];
            }
            if i >= 2 {
                z[i] -= l2[i - 2] * z[i - 2];
            }
        }
        for i in 0..n {
            z[i] /= d[i];
        }
        for i in (0..n).rev() {
            if i + 1 < n {
                z[i] -= l1[i] * z[i + 1];
            }
            if i + 2 < n {
                z[i] -= l2[i] * z[i + 2];
            }
        }
        z
    }
}
