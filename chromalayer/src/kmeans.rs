//! Provides the implementation for weighted k-means over color and position

use crate::{
	assign::{nearest_with, FeatureDistance, SummedRoots, WeightedEuclidean},
	Centroid, DistanceMetric, Feature, SamplePoint, Weights,
};
use palette::Srgb;

/// Vector sum of the features in a center, kept at a higher precision
#[derive(Debug, Clone, Copy)]
struct FeatureSum {
	/// Sum of the colors
	rgb: Srgb<f64>,
	/// Sum of the positions
	xy: [f64; 2],
}

impl FeatureSum {
	/// The empty sum
	const ZERO: Self = Self {
		rgb: Srgb::new(0.0, 0.0, 0.0),
		xy: [0.0, 0.0],
	};

	/// Add a feature to this sum
	fn add(&mut self, feature: &Feature) {
		self.rgb.red += f64::from(feature.rgb.red);
		self.rgb.green += f64::from(feature.rgb.green);
		self.rgb.blue += f64::from(feature.rgb.blue);
		self.xy[0] += f64::from(feature.xy[0]);
		self.xy[1] += f64::from(feature.xy[1]);
	}

	/// The average of the `n` features in this sum
	fn mean(&self, n: u32) -> Feature {
		let n = f64::from(n);
		// Sums may need greater precision, but the average can fall back down to a reduced precision
		#[allow(clippy::cast_possible_truncation)]
		let mean = Feature {
			rgb: Srgb::new(
				(self.rgb.red / n) as f32,
				(self.rgb.green / n) as f32,
				(self.rgb.blue / n) as f32,
			),
			xy: [(self.xy[0] / n) as f32, (self.xy[1] / n) as f32],
		};
		mean
	}
}

/// Data for each center/centroid
struct CenterData {
	/// The centroid point
	centroid: Vec<Centroid>,
	/// Vector sum for all data points in this center
	sum: Vec<FeatureSum>,
	/// Number of points in this center
	count: Vec<u32>,
}

impl CenterData {
	/// Create a [`CenterData`] starting from the given centroids
	fn new(centroid: Vec<Centroid>) -> Self {
		let k = centroid.len();
		Self {
			centroid,
			sum: vec![FeatureSum::ZERO; k],
			count: vec![0; k],
		}
	}

	/// Clear the sums and counts for the next assignment pass
	fn reset(&mut self) {
		self.sum.fill(FeatureSum::ZERO);
		self.count.fill(0);
	}
}

/// Result from running k-means
#[derive(Debug, Clone)]
pub struct KmeansResult {
	/// Final centroids, where centroid `i` descends from the `i`-th seed
	pub centroids: Vec<Centroid>,
	/// Number of samples assigned to each centroid in the last iteration
	pub counts: Vec<u32>,
	/// Number of elapsed iterations
	pub iterations: u32,
	/// Total centroid movement in the last iteration
	///
	/// This is infinite if no iterations were run.
	pub drift: f32,
}

impl KmeansResult {
	/// Create an empty result, representing that k-means could not be run
	pub(crate) const fn empty() -> Self {
		Self {
			centroids: Vec::new(),
			counts: Vec::new(),
			iterations: 0,
			drift: f32::INFINITY,
		}
	}
}

/// Choose the starting centroids by copying the first `k` samples.
///
/// If there are fewer than `k` samples, the samples are repeated from the start.
fn first_k(samples: &[SamplePoint], k: u8) -> Vec<Centroid> {
	(0..usize::from(k)).map(|i| samples[i % samples.len()]).collect()
}

/// Assign each sample to its nearest centroid, accumulating the center sums and counts
fn update_assignments<D: FeatureDistance>(
	samples: &[SamplePoint],
	weights: Weights,
	centers: &mut CenterData,
	assignment: &mut [u8],
) {
	centers.reset();
	for (sample, center) in samples.iter().zip(assignment) {
		*center = nearest_with::<D>(weights, sample, &centers.centroid);
		let i = usize::from(*center);
		centers.sum[i].add(sample);
		centers.count[i] += 1;
	}
}

/// For each center, update its centroid using the vector sums and return the total drift
///
/// Centers without any points keep their previous centroid.
fn update_centroids(centers: &mut CenterData) -> f32 {
	let mut total_delta = 0.0;
	for ((centroid, &n), sum) in centers.centroid.iter_mut().zip(&centers.count).zip(&centers.sum) {
		if n == 0 {
			continue;
		}

		let new_centroid = sum.mean(n);
		total_delta += centroid.color_squared_distance(&new_centroid).sqrt()
			+ centroid.spatial_squared_distance(&new_centroid).sqrt();
		*centroid = new_centroid;
	}

	total_delta
}

/// Run k-means with the given distance
fn kmeans<D: FeatureDistance>(
	samples: &[SamplePoint],
	k: u8,
	weights: Weights,
	max_iter: u32,
	convergence: f32,
) -> KmeansResult {
	let mut centers = CenterData::new(first_k(samples, k));
	let mut assignment = vec![0; samples.len()];

	let mut iterations = 0;
	let mut drift = f32::INFINITY;
	while iterations < max_iter {
		update_assignments::<D>(samples, weights, &mut centers, &mut assignment);
		drift = update_centroids(&mut centers);
		iterations += 1;
		if drift < convergence {
			break;
		}
	}

	log::debug!("k-means ran {iterations} iterations over {} samples, final drift {drift}", samples.len());

	KmeansResult {
		centroids: centers.centroid,
		counts: centers.count,
		iterations,
		drift,
	}
}

/// Fit `k` centroids to the samples with weighted k-means.
///
/// The centroids are seeded with the first `k` samples,
/// so the result is deterministic for a given sample order.
/// Clusters that receive no samples keep their centroid unchanged.
///
/// An empty result with no centroids is returned if `samples` is empty or `k` = 0.
#[must_use]
pub fn fit(
	samples: &[SamplePoint],
	k: u8,
	weights: Weights,
	metric: DistanceMetric,
	max_iter: u32,
	convergence_threshold: f32,
) -> KmeansResult {
	if k == 0 || samples.is_empty() {
		KmeansResult::empty()
	} else {
		match metric {
			DistanceMetric::WeightedEuclidean => {
				kmeans::<WeightedEuclidean>(samples, k, weights, max_iter, convergence_threshold)
			},
			DistanceMetric::SummedRoots => kmeans::<SummedRoots>(samples, k, weights, max_iter, convergence_threshold),
		}
	}
}
