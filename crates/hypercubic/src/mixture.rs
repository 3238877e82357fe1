//! Diagonal-covariance Gaussian mixture fitted by expectation maximisation.
//!
//! Only what the cluster extractors need: a seeded fit followed by hard assignments.
//! Columns are standardised first so no feature dominates the likelihood by scale alone.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{Continuous, Normal};

const VARIANCE_FLOOR: f64 = 1e-6;

pub struct GaussianMixture {
    n_components: usize,
    max_iter: usize,
    tolerance: f64,
    seed: u64,
}

struct Component {
    weight: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl GaussianMixture {
    pub fn new(n_components: usize, seed: u64) -> Self {
        Self {
            n_components: n_components.max(1),
            max_iter: 100,
            tolerance: 1e-6,
            seed,
        }
    }

    /// Fit on `rows` and return the most likely component of each row.
    pub fn fit_predict(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        let n = rows.len();
        if n == 0 {
            return Vec::new();
        }
        let k = self.n_components.min(n);
        if k == 1 {
            return vec![0; n];
        }
        let data = standardise(rows);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut components = initial_components(&data, k, &mut rng);

        let mut responsibilities = vec![vec![0.0; k]; n];
        let mut previous = f64::NEG_INFINITY;
        for _ in 0..self.max_iter {
            let log_likelihood = expectation(&data, &components, &mut responsibilities);
            maximisation(&data, &responsibilities, &mut components);
            if (log_likelihood - previous).abs() < self.tolerance * n as f64 {
                break;
            }
            previous = log_likelihood;
        }
        expectation(&data, &components, &mut responsibilities);

        responsibilities
            .iter()
            .map(|r| {
                r.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (c, &p)| {
                        if p > best.1 {
                            (c, p)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect()
    }
}

fn standardise(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len() as f64;
    let d = rows[0].len();
    let stats: Vec<(f64, f64)> = (0..d)
        .map(|j| {
            let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
            let std = if var > 0.0 { var.sqrt() } else { 1.0 };
            (mean, std)
        })
        .collect();
    rows.iter()
        .map(|r| {
            r.iter()
                .zip(stats.iter())
                .map(|(x, (mean, std))| (x - mean) / std)
                .collect()
        })
        .collect()
}

/// k-means++ style seeding: the first centre is random, the next ones are drawn
/// proportionally to their squared distance from the closest chosen centre.
fn initial_components(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Component> {
    let n = data.len();
    let d = data[0].len();
    let mut centres: Vec<usize> = vec![rng.random_range(0..n)];
    while centres.len() < k {
        let dists: Vec<f64> = data
            .iter()
            .map(|p| {
                centres
                    .iter()
                    .map(|&c| crate::point::squared_euclidean(p, &data[c]))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = dists.iter().sum();
        let chosen = if total <= 0.0 {
            rng.random_range(0..n)
        } else {
            let threshold = rng.random_range(0.0..total);
            let mut cumulative = 0.0;
            let mut chosen = n - 1;
            for (i, dist) in dists.iter().enumerate() {
                cumulative += dist;
                if cumulative >= threshold && *dist > 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        centres.push(chosen);
    }

    centres
        .into_iter()
        .map(|c| Component {
            weight: 1.0 / k as f64,
            means: data[c].clone(),
            variances: vec![1.0; d],
        })
        .collect()
}

fn log_density(x: &[f64], component: &Component) -> f64 {
    x.iter()
        .zip(component.means.iter().zip(component.variances.iter()))
        .map(|(&v, (&mean, &var))| match Normal::new(mean, var.sqrt()) {
            Ok(normal) => normal.ln_pdf(v),
            Err(_) => f64::NEG_INFINITY,
        })
        .sum::<f64>()
        + component.weight.ln()
}

/// Fill responsibilities in place and return the total log likelihood.
fn expectation(data: &[Vec<f64>], components: &[Component], resp: &mut [Vec<f64>]) -> f64 {
    let mut total = 0.0;
    for (x, r) in data.iter().zip(resp.iter_mut()) {
        let logs: Vec<f64> = components.iter().map(|c| log_density(x, c)).collect();
        let max = logs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            r.iter_mut().for_each(|v| *v = 1.0 / components.len() as f64);
            continue;
        }
        let sum: f64 = logs.iter().map(|l| (l - max).exp()).sum();
        let log_norm = max + sum.ln();
        for (v, l) in r.iter_mut().zip(logs.iter()) {
            *v = (l - log_norm).exp();
        }
        total += log_norm;
    }
    total
}

fn maximisation(data: &[Vec<f64>], resp: &[Vec<f64>], components: &mut [Component]) {
    let n = data.len() as f64;
    for (c, component) in components.iter_mut().enumerate() {
        let mass: f64 = resp.iter().map(|r| r[c]).sum();
        if mass <= f64::EPSILON {
            continue;
        }
        component.weight = mass / n;
        for j in 0..component.means.len() {
            let mean = data
                .iter()
                .zip(resp.iter())
                .map(|(x, r)| r[c] * x[j])
                .sum::<f64>()
                / mass;
            let var = data
                .iter()
                .zip(resp.iter())
                .map(|(x, r)| r[c] * (x[j] - mean).powi(2))
                .sum::<f64>()
                / mass;
            component.means[j] = mean;
            component.variances[j] = var.max(VARIANCE_FLOOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f64>> {
        let mut rows = Vec::new();
        for i in 0..30 {
            let jitter = (i % 5) as f64 * 0.01;
            rows.push(vec![0.1 + jitter, 0.2 - jitter]);
            rows.push(vec![5.0 + jitter, 4.8 + jitter]);
        }
        rows
    }

    #[test]
    fn separates_two_blobs() {
        let rows = two_blobs();
        let labels = GaussianMixture::new(2, 7).fit_predict(&rows);
        assert_eq!(labels.len(), rows.len());
        for pair in labels.chunks(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert!(labels.iter().step_by(2).all(|&l| l == labels[0]));
    }

    #[test]
    fn same_seed_same_assignment() {
        let rows = two_blobs();
        let a = GaussianMixture::new(2, 3).fit_predict(&rows);
        let b = GaussianMixture::new(2, 3).fit_predict(&rows);
        assert_eq!(a, b);
    }

    #[test]
    fn tiny_inputs() {
        assert!(GaussianMixture::new(2, 0).fit_predict(&[]).is_empty());
        assert_eq!(GaussianMixture::new(2, 0).fit_predict(&[vec![1.0]]), vec![0]);
    }
}
