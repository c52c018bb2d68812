//! Extract a color palette from an image and split the image into color layers
//! by performing k-means clustering over color and position.
//!
//! Each pixel is treated as a point in a 5-dimensional feature space:
//! its three RGB components in `[0, 1]` plus its normalized `(x, y)` position.
//! A color weight and a spatial weight control how much each half of the feature space
//! contributes to the distance between two points.
//!
//! # Examples
//!
//! ## Get a 6 color palette and the layers of an image.
//!
//! ```no_run
//! let image = image::open("some image").unwrap().into_rgba8();
//!
//! let mut session = chromalayer::Session::new(chromalayer::Config::default(), 0);
//! session.load(&image);
//!
//! let palette = session.hex_palette();
//! let layers = &session.output().unwrap().layers;
//! ```
//!
//! ## Run the pipeline step by step.
//!
//! ```no_run
//! use chromalayer::{assign, kmeans, quantize, sample, DistanceMetric, Weights};
//! use rand::SeedableRng;
//!
//! let image = image::open("some image").unwrap().into_rgba8();
//! let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(0);
//!
//! let unique = sample::unique_colors(&image, true);
//! let samples = sample::sample(&unique, 100_000, &mut rng);
//!
//! let weights = Weights { color: 1.0, spatial: 0.1 };
//! let result = kmeans::fit(&samples, 6, weights, DistanceMetric::WeightedEuclidean, 50, 0.001);
//!
//! let mut pixels = sample::pixels(&image);
//! assign::assign_all(&mut pixels, &result.centroids, weights, DistanceMetric::WeightedEuclidean);
//! let rendered = quantize::render(&pixels, image.width(), image.height(), &result.centroids);
//! ```
//!
//! # Arguments
//!
//! Here are explanations of the [`Config`] fields shared by the [`Session`] and the free functions.
//!
//! ## Color Weight and Spatial Weight
//!
//! The distance between a pixel and a centroid is
//! `sqrt(color_weight * |Δrgb|² + spatial_weight * |Δxy|²)`.
//!
//! A spatial weight of `0.0` clusters purely by color, so a layer may contain pixels from anywhere in the image.
//! Raising the spatial weight makes clusters more compact in the image plane,
//! until position dominates and the layers become spatial regions regardless of their colors.
//! Both weights should be `>= 0.0`.
//!
//! ## K
//!
//! The number of clusters, and therefore the number of palette colors and layers.
//!
//! If the image has fewer unique colors than `k`, some clusters start from duplicate seeds
//! and remain empty. They still produce a palette entry and a (fully transparent) layer.
//!
//! ## Max Samples
//!
//! k-means is run on at most this many points drawn at random from the image.
//! The full image is only touched when assigning and recoloring the final pixels.
//!
//! ## Max Iterations and Convergence Threshold
//!
//! k-means stops once the total centroid movement in an iteration falls below the convergence threshold,
//! or after the maximum number of iterations.
//!
//! ## Seed
//!
//! The value used to seed the random number generator which draws the samples.
//! Clustering itself is deterministic given the samples.
//!
//! # Logging
//!
//! Sample counts, k-means iterations, and pipeline stages are emitted as `debug` records through the [`log`] crate.
//! Nothing is printed unless the application installs a logger.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::cargo)]
#![warn(clippy::use_debug, clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![warn(clippy::unwrap_used, clippy::unwrap_in_result)]
#![warn(clippy::unneeded_field_pattern, clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::unnecessary_self_imports)]
#![warn(clippy::str_to_string, clippy::string_to_string, clippy::string_slice)]
#![warn(missing_docs, clippy::missing_docs_in_private_items, rustdoc::all)]
#![warn(clippy::float_cmp_const, clippy::lossy_float_literal)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unreadable_literal)]

use palette::Srgb;
use std::time::Duration;

pub mod assign;
pub mod color;
pub mod debounce;
pub mod kmeans;
pub mod quantize;
pub mod sample;
mod session;

pub use assign::{DistanceMetric, Weights};
pub use kmeans::KmeansResult;
pub use quantize::Rendered;
pub use session::{ColorEdit, Edit, Session, SessionError, Stage};

/// Default weight of the color half of the feature space
pub const DEFAULT_COLOR_WEIGHT: f32 = 1.0;
/// Default weight of the spatial half of the feature space
pub const DEFAULT_SPATIAL_WEIGHT: f32 = 0.1;
/// Default number of clusters
pub const DEFAULT_K: u8 = 6;
/// Default cap on the number of k-means samples
pub const DEFAULT_MAX_SAMPLES: u32 = 800_000;
/// Default maximum number of k-means iterations
pub const DEFAULT_MAX_ITER: u32 = 50;
/// Default total centroid movement below which k-means stops
pub const DEFAULT_CONVERGENCE_THRESHOLD: f32 = 0.001;
/// Default quiet period before a manual color edit is rendered
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A point in the combined color and position feature space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
	/// Color with components in `[0, 1]`
	pub rgb: Srgb<f32>,
	/// Normalized `(column / width, row / height)` position in `[0, 1)`
	pub xy: [f32; 2],
}

impl Feature {
	/// Squared euclidean distance between the colors of two features
	#[must_use]
	pub fn color_squared_distance(&self, other: &Self) -> f32 {
		let dr = self.rgb.red - other.rgb.red;
		let dg = self.rgb.green - other.rgb.green;
		let db = self.rgb.blue - other.rgb.blue;
		dr * dr + dg * dg + db * db
	}

	/// Squared euclidean distance between the positions of two features
	#[must_use]
	pub fn spatial_squared_distance(&self, other: &Self) -> f32 {
		let dx = self.xy[0] - other.xy[0];
		let dy = self.xy[1] - other.xy[1];
		dx * dx + dy * dy
	}
}

/// A point drawn from the pixel population for k-means
pub type SamplePoint = Feature;

/// The representative color and position of one cluster
pub type Centroid = Feature;

/// A full resolution pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
	/// Color and normalized position
	pub feature: Feature,
	/// Row-major offset of this pixel in the source image
	pub index: u32,
	/// The assigned cluster, if any
	pub cluster: Option<u8>,
}

/// Parameters for one clustering pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
	/// Weight of the squared color distance, `>= 0.0`
	pub color_weight: f32,
	/// Weight of the squared spatial distance, `>= 0.0`
	pub spatial_weight: f32,
	/// The number of clusters, `>= 1`
	pub k: u8,
	/// The maximum number of samples to run k-means on, `> 0`
	pub max_samples: u32,
	/// The maximum number of k-means iterations
	pub max_iter: u32,
	/// k-means stops once the total centroid movement falls below this value
	pub convergence_threshold: f32,
	/// Sample from the unique colors of the image instead of all of its pixels
	pub dedup: bool,
	/// Leave fully transparent pixels out of the sampled population
	pub skip_transparent: bool,
	/// How color and spatial distances are combined
	pub metric: DistanceMetric,
	/// Quiet period before a manual color edit is rendered
	pub debounce: Duration,
}

impl Config {
	/// The color and spatial weights of this config
	#[must_use]
	pub const fn weights(&self) -> Weights {
		Weights {
			color: self.color_weight,
			spatial: self.spatial_weight,
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			color_weight: DEFAULT_COLOR_WEIGHT,
			spatial_weight: DEFAULT_SPATIAL_WEIGHT,
			k: DEFAULT_K,
			max_samples: DEFAULT_MAX_SAMPLES,
			max_iter: DEFAULT_MAX_ITER,
			convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
			dedup: true,
			skip_transparent: true,
			metric: DistanceMetric::WeightedEuclidean,
			debounce: DEFAULT_DEBOUNCE,
		}
	}
}
