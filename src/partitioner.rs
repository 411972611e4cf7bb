//! Cluster Partitioner - seeded k-means over (latitude, longitude)

use crate::coordinate::Coordinate;
use crate::error::{ClusterError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

pub type GroupId = usize;

pub trait Partitioner {
    /// Assign each point to one of `k` groups. The output is order-aligned with `points`.
    fn partition(&self, points: &[Coordinate], k: usize) -> Result<Vec<GroupId>>;
}

/// Outcome of one k-means fit.
#[derive(Debug, Clone)]
pub struct KMeansReport {
    pub assignments: Vec<GroupId>,
    pub centroids: Vec<Coordinate>,
    pub inertia: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct KMeansPartitioner {
    pub seed: u64,
    pub max_iter: usize,
    pub n_init: usize,
    pub tol: f64,
}

impl Default for KMeansPartitioner {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iter: 300,
            n_init: 1,
            tol: 1e-4,
        }
    }
}

impl KMeansPartitioner {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn fit(&self, points: &[Coordinate], k: usize) -> Result<KMeansReport> {
        if k == 0 || points.len() < k {
            return Err(ClusterError::InsufficientData {
                resolved: points.len(),
                requested: k,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let tol = self.tol * mean_variance(points);

        let mut best: Option<KMeansReport> = None;
        for _ in 0..self.n_init.max(1) {
            let centroids = init_plus_plus(points, k, &mut rng);
            let report = lloyd(points, centroids, self.max_iter.max(1), tol);
            if best.as_ref().map_or(true, |b| report.inertia < b.inertia) {
                best = Some(report);
            }
        }

        // n_init >= 1 so a report always exists
        let report = best.ok_or_else(|| ClusterError::Config("n_init must be at least 1".to_string()))?;
        debug!(
            "k-means converged after {} iterations, inertia {:.6}",
            report.iterations, report.inertia
        );
        Ok(report)
    }
}

impl Partitioner for KMeansPartitioner {
    fn partition(&self, points: &[Coordinate], k: usize) -> Result<Vec<GroupId>> {
        info!("Grouping {} postcodes into {} groups...", points.len(), k);
        Ok(self.fit(points, k)?.assignments)
    }
}

fn mean_variance(points: &[Coordinate]) -> f64 {
    let n = points.len() as f64;
    let mean_lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let mean_lon = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    let var_lat = points.iter().map(|p| (p.latitude - mean_lat).powi(2)).sum::<f64>() / n;
    let var_lon = points.iter().map(|p| (p.longitude - mean_lon).powi(2)).sum::<f64>() / n;
    (var_lat + var_lon) / 2.0
}

fn nearest(point: &Coordinate, centroids: &[Coordinate]) -> (GroupId, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, c) in centroids.iter().enumerate() {
        let d = point.distance_sq(c);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

/// Index drawn with probability proportional to `weights`; uniform if they sum to zero.
fn weighted_index(weights: &[f64], rng: &mut StdRng) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return rng.gen_range(0..weights.len());
    }
    let mut target = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if target < *w {
            return i;
        }
        target -= w;
    }
    weights.len() - 1
}

/// Greedy k-means++: each new centre is the best of `2 + ln k` sampled candidates.
fn init_plus_plus(points: &[Coordinate], k: usize, rng: &mut StdRng) -> Vec<Coordinate> {
    let n_trials = 2 + (k as f64).ln() as usize;
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut closest: Vec<f64> = points.iter().map(|p| p.distance_sq(&centroids[0])).collect();

    while centroids.len() < k {
        let mut best_candidate = None;
        let mut best_potential = f64::INFINITY;
        let mut best_closest = Vec::new();

        for _ in 0..n_trials {
            let idx = weighted_index(&closest, rng);
            let candidate = points[idx];
            let updated: Vec<f64> = points
                .iter()
                .zip(&closest)
                .map(|(p, d)| d.min(p.distance_sq(&candidate)))
                .collect();
            let potential: f64 = updated.iter().sum();
            if potential < best_potential {
                best_potential = potential;
                best_candidate = Some(candidate);
                best_closest = updated;
            }
        }

        match best_candidate {
            Some(candidate) => {
                centroids.push(candidate);
                closest = best_closest;
            }
            None => centroids.push(points[rng.gen_range(0..points.len())]),
        }
    }
    centroids
}

fn lloyd(points: &[Coordinate], mut centroids: Vec<Coordinate>, max_iter: usize, tol: f64) -> KMeansReport {
    let k = centroids.len();
    let mut assignments: Vec<GroupId> = points.iter().map(|p| nearest(p, &centroids).0).collect();
    let mut iterations = 0;

    while iterations < max_iter {
        iterations += 1;

        let mut sums = vec![(0.0, 0.0); k];
        let mut counts = vec![0usize; k];
        for (p, &g) in points.iter().zip(&assignments) {
            sums[g].0 += p.latitude;
            sums[g].1 += p.longitude;
            counts[g] += 1;
        }

        let mut updated = centroids.clone();
        for j in 0..k {
            if counts[j] > 0 {
                updated[j] = Coordinate::new(sums[j].0 / counts[j] as f64, sums[j].1 / counts[j] as f64);
            }
        }
        relocate_empty(points, &assignments, &mut updated, &counts);

        let shift: f64 = centroids.iter().zip(&updated).map(|(a, b)| a.distance_sq(b)).sum();
        centroids = updated;

        let next: Vec<GroupId> = points.iter().map(|p| nearest(p, &centroids).0).collect();
        let changed = next != assignments;
        assignments = next;

        if !changed || shift <= tol {
            break;
        }
    }

    let inertia = points
        .iter()
        .zip(&assignments)
        .map(|(p, &g)| p.distance_sq(&centroids[g]))
        .sum();

    KMeansReport {
        assignments,
        centroids,
        inertia,
        iterations,
    }
}

/// Move each empty cluster's centre onto the point farthest from its current centre.
fn relocate_empty(points: &[Coordinate], assignments: &[GroupId], centroids: &mut [Coordinate], counts: &[usize]) {
    let empty: Vec<usize> = (0..counts.len()).filter(|&j| counts[j] == 0).collect();
    if empty.is_empty() {
        return;
    }

    let mut by_distance: Vec<(usize, f64)> = points
        .iter()
        .zip(assignments)
        .map(|(p, &g)| p.distance_sq(&centroids[g]))
        .enumerate()
        .collect();
    by_distance.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for (j, (idx, _)) in empty.into_iter().zip(by_distance) {
        centroids[j] = points[idx];
    }
}
