//! Outlet segmentation.
//!
//! Aggregates per-outlet sales/quantity features and partitions them with a
//! fixed-cluster k-means (Lloyd's iterations over z-scored features). The
//! initialization spreads centroids across the sales range deterministically,
//! so repeated runs on the same data give the same segments.

use crate::dataset::Dataset;
use crate::metrics;
use crate::resolver::{ColumnMap, Role};
use crate::AnalyticsError;
use serde::Serialize;

const MAX_ITERATIONS: usize = 100;

/// Aggregated features for one outlet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutletFeatures {
    pub outlet: String,
    pub total_sales: f64,
    pub total_quantity: f64,
}

/// An outlet with its assigned segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedOutlet {
    pub outlet: String,
    pub total_sales: f64,
    pub total_quantity: f64,
    pub segment: usize,
}

/// Aggregate per-outlet features. Requires the outlet and sales roles;
/// quantity defaults to zero when absent.
pub fn prepare_outlet_features(
    dataset: &Dataset,
    columns: &ColumnMap,
) -> Result<Vec<OutletFeatures>, AnalyticsError> {
    columns.require(Role::Sales)?;
    let summaries = metrics::group_summary(dataset, columns, Role::Outlet)?;
    Ok(summaries
        .into_iter()
        .map(|g| OutletFeatures {
            outlet: g.key,
            total_sales: g.total_sales,
            total_quantity: g.total_quantity,
        })
        .collect())
}

/// Partition outlets into `clusters` segments.
///
/// Fewer outlets than clusters collapses everything into segment 0, matching
/// the degrade-don't-fail policy of the metric layer. Segment ids are
/// relabeled by ascending mean sales so segment 0 is always the smallest
/// outlets.
pub fn segment_outlets(features: &[OutletFeatures], clusters: usize) -> Vec<SegmentedOutlet> {
    if features.is_empty() {
        return Vec::new();
    }
    if clusters < 2 || features.len() < clusters {
        return features
            .iter()
            .map(|f| SegmentedOutlet {
                outlet: f.outlet.clone(),
                total_sales: f.total_sales,
                total_quantity: f.total_quantity,
                segment: 0,
            })
            .collect();
    }

    let points: Vec<[f64; 2]> = standardize(features);

    // Seed centroids spread along the sales axis: rank outlets by sales and
    // take evenly spaced ones. Deterministic, no RNG.
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a][0]
            .partial_cmp(&points[b][0])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| features[a].outlet.cmp(&features[b].outlet))
    });
    let mut centroids: Vec<[f64; 2]> = (0..clusters)
        .map(|c| points[order[c * (points.len() - 1) / (clusters - 1)]])
        .collect();

    let mut assignments = vec![0usize; points.len()];
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let nearest = nearest_centroid(p, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0.0f64; 2]; clusters];
        let mut counts = vec![0usize; clusters];
        for (i, p) in points.iter().enumerate() {
            sums[assignments[i]][0] += p[0];
            sums[assignments[i]][1] += p[1];
            counts[assignments[i]] += 1;
        }
        for c in 0..clusters {
            // Empty clusters keep their previous centroid.
            if counts[c] > 0 {
                centroids[c] = [
                    sums[c][0] / counts[c] as f64,
                    sums[c][1] / counts[c] as f64,
                ];
            }
        }
    }

    let relabel = relabel_by_mean_sales(features, &assignments, clusters);

    features
        .iter()
        .zip(assignments.iter())
        .map(|(f, &a)| SegmentedOutlet {
            outlet: f.outlet.clone(),
            total_sales: f.total_sales,
            total_quantity: f.total_quantity,
            segment: relabel[a],
        })
        .collect()
}

/// Z-score both feature axes. A zero-variance axis maps to all zeros.
fn standardize(features: &[OutletFeatures]) -> Vec<[f64; 2]> {
    let n = features.len() as f64;
    let mean_sales = features.iter().map(|f| f.total_sales).sum::<f64>() / n;
    let mean_qty = features.iter().map(|f| f.total_quantity).sum::<f64>() / n;
    let std_sales = (features
        .iter()
        .map(|f| (f.total_sales - mean_sales).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();
    let std_qty = (features
        .iter()
        .map(|f| (f.total_quantity - mean_qty).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    features
        .iter()
        .map(|f| {
            [
                if std_sales == 0.0 {
                    0.0
                } else {
                    (f.total_sales - mean_sales) / std_sales
                },
                if std_qty == 0.0 {
                    0.0
                } else {
                    (f.total_quantity - mean_qty) / std_qty
                },
            ]
        })
        .collect()
}

fn nearest_centroid(point: &[f64; 2], centroids: &[[f64; 2]]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let dist =
            (point[0] - centroid[0]).powi(2) + (point[1] - centroid[1]).powi(2);
        if dist < best_dist {
            best_dist = dist;
            best = c;
        }
    }
    best
}

/// Map raw cluster ids to labels ordered by ascending mean sales.
fn relabel_by_mean_sales(
    features: &[OutletFeatures],
    assignments: &[usize],
    clusters: usize,
) -> Vec<usize> {
    let mut sums = vec![0.0f64; clusters];
    let mut counts = vec![0usize; clusters];
    for (f, &a) in features.iter().zip(assignments.iter()) {
        sums[a] += f.total_sales;
        counts[a] += 1;
    }
    let mut means: Vec<(usize, f64)> = (0..clusters)
        .map(|c| {
            (
                c,
                if counts[c] == 0 {
                    f64::INFINITY
                } else {
                    sums[c] / counts[c] as f64
                },
            )
        })
        .collect();
    means.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut relabel = vec![0usize; clusters];
    for (new_label, (old_label, _)) in means.into_iter().enumerate() {
        relabel[old_label] = new_label;
    }
    relabel
}
