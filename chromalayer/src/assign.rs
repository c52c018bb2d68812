//! Nearest centroid assignment under the weighted feature distance

use crate::{Centroid, Feature, Pixel};

/// Weights applied to the color and spatial halves of the feature space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
	/// Color weight, `>= 0.0`
	pub color: f32,
	/// Spatial weight, `>= 0.0`
	pub spatial: f32,
}

/// The ways the color and spatial distances can be combined
///
/// The two metrics do not give the same clusters, so switching between them changes results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
	/// `sqrt(color * |Δrgb|² + spatial * |Δxy|²)`
	#[default]
	WeightedEuclidean,
	/// `color * |Δrgb| + spatial * |Δxy|`
	SummedRoots,
}

impl DistanceMetric {
	/// The distance between two features under this metric
	#[must_use]
	pub fn distance(self, weights: Weights, x: &Feature, y: &Feature) -> f32 {
		match self {
			DistanceMetric::WeightedEuclidean => WeightedEuclidean::distance(weights, x, y),
			DistanceMetric::SummedRoots => SummedRoots::distance(weights, x, y),
		}
	}
}

/// Distance in the weighted feature space
pub(crate) trait FeatureDistance {
	/// A value with the same ordering as [`FeatureDistance::distance`] that is cheaper to compute
	fn key(weights: Weights, x: &Feature, y: &Feature) -> f32;

	/// The distance itself
	fn distance(weights: Weights, x: &Feature, y: &Feature) -> f32;
}

/// Weight the squared sub-distances, then take the root of their sum
pub(crate) struct WeightedEuclidean;

impl FeatureDistance for WeightedEuclidean {
	fn key(weights: Weights, x: &Feature, y: &Feature) -> f32 {
		weights.color * x.color_squared_distance(y) + weights.spatial * x.spatial_squared_distance(y)
	}

	fn distance(weights: Weights, x: &Feature, y: &Feature) -> f32 {
		Self::key(weights, x, y).sqrt()
	}
}

/// Weight each sub-distance after taking its root
pub(crate) struct SummedRoots;

impl FeatureDistance for SummedRoots {
	fn key(weights: Weights, x: &Feature, y: &Feature) -> f32 {
		weights.color * x.color_squared_distance(y).sqrt() + weights.spatial * x.spatial_squared_distance(y).sqrt()
	}

	fn distance(weights: Weights, x: &Feature, y: &Feature) -> f32 {
		Self::key(weights, x, y)
	}
}

/// Index of the closest centroid, taking the first one on ties.
///
/// `centroids` must be non-empty and have at most `u8::MAX + 1` elements.
// i < centroids.len() <= u8::MAX + 1
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn nearest_with<D: FeatureDistance>(weights: Weights, point: &Feature, centroids: &[Centroid]) -> u8 {
	let mut min_dist = f32::INFINITY;
	let mut min_center = 0;
	for (i, centroid) in centroids.iter().enumerate() {
		let dist = D::key(weights, point, centroid);
		if dist < min_dist {
			min_dist = dist;
			min_center = i as u8;
		}
	}
	min_center
}

/// Returns the index of the centroid closest to `point`.
///
/// Ties go to the lowest index. `None` is returned only if `centroids` is empty.
#[must_use]
pub fn nearest(point: &Feature, centroids: &[Centroid], weights: Weights, metric: DistanceMetric) -> Option<u8> {
	if centroids.is_empty() {
		None
	} else {
		Some(match metric {
			DistanceMetric::WeightedEuclidean => nearest_with::<WeightedEuclidean>(weights, point, centroids),
			DistanceMetric::SummedRoots => nearest_with::<SummedRoots>(weights, point, centroids),
		})
	}
}

/// Assign each pixel to its nearest centroid.
///
/// Every pixel becomes unassigned if `centroids` is empty.
pub fn assign_all(pixels: &mut [Pixel], centroids: &[Centroid], weights: Weights, metric: DistanceMetric) {
	fn assign<D: FeatureDistance>(pixels: &mut [Pixel], centroids: &[Centroid], weights: Weights) {
		for pixel in pixels {
			pixel.cluster = Some(nearest_with::<D>(weights, &pixel.feature, centroids));
		}
	}

	if centroids.is_empty() {
		for pixel in pixels {
			pixel.cluster = None;
		}
	} else {
		match metric {
			DistanceMetric::WeightedEuclidean => assign::<WeightedEuclidean>(pixels, centroids, weights),
			DistanceMetric::SummedRoots => assign::<SummedRoots>(pixels, centroids, weights),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tests::feature;

	const WEIGHTS: Weights = Weights { color: 1.0, spatial: 0.1 };

	fn test_centroids() -> Vec<Centroid> {
		vec![
			feature([1.0, 0.0, 0.0], [0.1, 0.1]),
			feature([0.0, 1.0, 0.0], [0.9, 0.1]),
			feature([0.0, 0.0, 1.0], [0.5, 0.9]),
			feature([0.5, 0.5, 0.5], [0.5, 0.5]),
		]
	}

	fn test_pixels() -> Vec<Pixel> {
		let mut pixels = Vec::new();
		let steps = [0.0, 0.2, 0.45, 0.7, 1.0];
		let mut index = 0;
		for &r in &steps {
			for &g in &steps {
				for &b in &steps {
					pixels.push(Pixel {
						feature: feature([r, g, b], [r * 0.99, (g + b) * 0.49]),
						index,
						cluster: None,
					});
					index += 1;
				}
			}
		}
		pixels
	}

	#[test]
	fn weighted_euclidean_distance() {
		let x = feature([1.0, 0.0, 0.0], [0.0, 0.0]);
		let y = feature([0.0, 0.0, 0.0], [0.0, 0.5]);
		let weights = Weights { color: 2.0, spatial: 4.0 };
		let expected = (2.0f32 * 1.0 + 4.0 * 0.25).sqrt();
		let dist = DistanceMetric::WeightedEuclidean.distance(weights, &x, &y);
		assert!((dist - expected).abs() <= 1e-6);
	}

	#[test]
	fn summed_roots_distance() {
		let x = feature([1.0, 0.0, 0.0], [0.0, 0.0]);
		let y = feature([0.0, 0.0, 0.0], [0.0, 0.5]);
		let weights = Weights { color: 2.0, spatial: 4.0 };
		let dist = DistanceMetric::SummedRoots.distance(weights, &x, &y);
		assert!((dist - 4.0).abs() <= 1e-6);
	}

	#[test]
	fn nearest_is_the_minimum_distance() {
		let centroids = test_centroids();
		for metric in [DistanceMetric::WeightedEuclidean, DistanceMetric::SummedRoots] {
			for pixel in test_pixels() {
				let i = usize::from(nearest(&pixel.feature, &centroids, WEIGHTS, metric).unwrap_or(u8::MAX));
				let dist = metric.distance(WEIGHTS, &pixel.feature, &centroids[i]);
				for other in &centroids {
					assert!(dist <= metric.distance(WEIGHTS, &pixel.feature, other));
				}
			}
		}
	}

	#[test]
	fn ties_go_to_the_first_centroid() {
		let c = feature([0.3, 0.3, 0.3], [0.5, 0.5]);
		let centroids = vec![feature([0.0, 0.0, 0.0], [0.0, 0.0]), c, c, c];
		let point = feature([0.3, 0.3, 0.3], [0.5, 0.5]);
		assert_eq!(nearest(&point, &centroids, WEIGHTS, DistanceMetric::WeightedEuclidean), Some(1));
	}

	#[test]
	fn no_centroids_gives_no_cluster() {
		let point = feature([0.3, 0.3, 0.3], [0.5, 0.5]);
		assert_eq!(nearest(&point, &[], WEIGHTS, DistanceMetric::WeightedEuclidean), None);

		let mut pixels = test_pixels();
		assign_all(&mut pixels, &test_centroids(), WEIGHTS, DistanceMetric::WeightedEuclidean);
		assign_all(&mut pixels, &[], WEIGHTS, DistanceMetric::WeightedEuclidean);
		assert!(pixels.iter().all(|pixel| pixel.cluster.is_none()));
	}

	#[test]
	fn assignment_is_idempotent() {
		let centroids = test_centroids();
		let mut pixels = test_pixels();

		assign_all(&mut pixels, &centroids, WEIGHTS, DistanceMetric::WeightedEuclidean);
		let first = pixels.iter().map(|pixel| pixel.cluster).collect::<Vec<_>>();
		assert!(first.iter().all(Option::is_some));

		assign_all(&mut pixels, &centroids, WEIGHTS, DistanceMetric::WeightedEuclidean);
		let second = pixels.iter().map(|pixel| pixel.cluster).collect::<Vec<_>>();

		assert_eq!(first, second);
	}

	#[test]
	fn zero_spatial_weight_ignores_position() {
		let centroids = vec![feature([1.0, 0.0, 0.0], [0.9, 0.9]), feature([0.0, 1.0, 0.0], [0.0, 0.0])];
		let weights = Weights { color: 1.0, spatial: 0.0 };
		let point = feature([0.9, 0.1, 0.0], [0.0, 0.0]);
		assert_eq!(nearest(&point, &centroids, weights, DistanceMetric::WeightedEuclidean), Some(0));
	}
}
