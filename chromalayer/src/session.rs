//! Owns the state of one image and re-runs the pipeline from the stage each edit requires

use crate::{
	assign::assign_all,
	color::to_hex,
	debounce::Debouncer,
	kmeans::{self, KmeansResult},
	quantize::{render, Rendered},
	sample, Centroid, Config, Pixel, SamplePoint,
};
use image::RgbaImage;
use palette::Srgb;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::{
	error::Error,
	fmt::{self, Display},
	time::Instant,
};

/// A step of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	/// Nothing to do
	Idle,
	/// Fitting centroids to the cached samples
	Refitting,
	/// Assigning every pixel to its nearest centroid
	Reassigning,
	/// Painting the recolored image and the layers
	Recoloring,
}

/// A manual change to the color of one centroid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorEdit {
	/// Index of the centroid
	pub index: usize,
	/// The new color, with components in `[0, 1]`
	pub color: Srgb<f32>,
}

/// An edit to the parameters or the palette of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edit {
	/// Set the color weight
	ColorWeight(f32),
	/// Set the spatial weight
	SpatialWeight(f32),
	/// Set the number of clusters, where `0` is raised to `1`
	K(u8),
	/// Overwrite the color of one centroid
	CentroidColor(ColorEdit),
}

impl Edit {
	/// The stage the pipeline is re-entered at for this edit
	#[must_use]
	pub const fn stage(&self) -> Stage {
		match self {
			Edit::ColorWeight(_) | Edit::SpatialWeight(_) | Edit::K(_) => Stage::Refitting,
			Edit::CentroidColor(_) => Stage::Recoloring,
		}
	}
}

/// Errors for edits that cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
	/// A color edit referred to a centroid that does not exist
	CentroidOutOfRange {
		/// The requested centroid
		index: usize,
		/// The number of centroids
		k: usize,
	},
}

impl Display for SessionError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			SessionError::CentroidOutOfRange { index, k } => {
				write!(f, "centroid {index} does not exist, there are {k} centroids")
			},
		}
	}
}

impl Error for SessionError {}

/// The palette and layers of one image, kept up to date across edits.
///
/// Loading an image samples it and runs the full pipeline.
/// Weight and `k` edits refit from the cached samples, reassign every pixel, and render.
/// Centroid color edits only change the palette right away;
/// the render is debounced and happens in [`Session::poll`] once no edit arrived for [`Config::debounce`].
///
/// While no image (or an empty image) is loaded, every operation is a no-op.
#[derive(Debug)]
pub struct Session {
	/// Current parameters
	config: Config,
	/// Source of randomness for sampling
	rng: Xoshiro256PlusPlus,
	/// Width of the loaded image
	width: u32,
	/// Height of the loaded image
	height: u32,
	/// Every pixel of the loaded image
	pixels: Vec<Pixel>,
	/// Size of the population the samples were drawn from
	population: usize,
	/// Samples reused by every refit
	samples: Vec<SamplePoint>,
	/// The latest k-means result, with any manual color edits applied
	fit: KmeansResult,
	/// The latest render
	output: Option<Rendered>,
	/// Pending render for manual color edits
	recolor: Debouncer<ColorEdit>,
	/// Stages run by the most recent pass
	last_pass: Vec<Stage>,
}

impl Session {
	/// Create a session with no image, sampling with a generator seeded from `seed`
	#[must_use]
	pub fn new(config: Config, seed: u64) -> Self {
		Self {
			config,
			rng: Xoshiro256PlusPlus::seed_from_u64(seed),
			width: 0,
			height: 0,
			pixels: Vec::new(),
			population: 0,
			samples: Vec::new(),
			fit: KmeansResult::empty(),
			output: None,
			recolor: Debouncer::new(config.debounce),
			last_pass: Vec::new(),
		}
	}

	/// Replace the current image, resample it, and run the full pipeline.
	///
	/// Loading an empty image unloads the current one.
	pub fn load(&mut self, image: &RgbaImage) {
		let Config { dedup, skip_transparent, max_samples, .. } = self.config;

		self.recolor.cancel();
		self.last_pass.clear();
		self.output = None;
		self.fit.centroids.clear();
		self.fit.counts.clear();
		(self.width, self.height) = image.dimensions();
		self.pixels = sample::pixels(image);

		let population = sample::population(image, dedup, skip_transparent);
		self.population = population.len();
		self.samples = sample::sample(&population, max_samples, &mut self.rng);

		log::debug!(
			"loaded {}x{} image, drew {} samples from {} points",
			self.width,
			self.height,
			self.samples.len(),
			self.population,
		);

		self.run_from(Stage::Refitting);
	}

	/// Apply an edit, returning the stage the pipeline was re-entered at.
	///
	/// Color edits return [`Stage::Idle`], as their render is deferred to [`Session::poll`].
	///
	/// # Errors
	/// Returns [`SessionError::CentroidOutOfRange`] if a color edit refers to a missing centroid.
	pub fn apply(&mut self, edit: Edit, now: Instant) -> Result<Stage, SessionError> {
		match edit {
			Edit::ColorWeight(weight) => {
				// Negative weights do not make sense but will technically work, so this is a debug assert
				debug_assert!(weight >= 0.0);
				self.config.color_weight = weight;
			},
			Edit::SpatialWeight(weight) => {
				debug_assert!(weight >= 0.0);
				self.config.spatial_weight = weight;
			},
			Edit::K(k) => self.config.k = k.max(1),
			Edit::CentroidColor(color_edit) => {
				if self.is_loaded() {
					self.set_centroid_color(color_edit, now)?;
				}
				return Ok(Stage::Idle);
			},
		}

		Ok(if self.is_loaded() { self.run_from(edit.stage()) } else { Stage::Idle })
	}

	/// Set the color weight and refit
	pub fn set_color_weight(&mut self, weight: f32) -> Stage {
		self.apply_param(Edit::ColorWeight(weight))
	}

	/// Set the spatial weight and refit
	pub fn set_spatial_weight(&mut self, weight: f32) -> Stage {
		self.apply_param(Edit::SpatialWeight(weight))
	}

	/// Set the number of clusters and refit
	pub fn set_k(&mut self, k: u8) -> Stage {
		self.apply_param(Edit::K(k))
	}

	/// Overwrite the color of a centroid and schedule a debounced render.
	///
	/// Centroid positions and pixel assignments are left untouched.
	///
	/// # Errors
	/// Returns [`SessionError::CentroidOutOfRange`] if `index` is not a centroid.
	pub fn edit_centroid_color(&mut self, index: usize, color: Srgb<f32>, now: Instant) -> Result<(), SessionError> {
		self.apply(Edit::CentroidColor(ColorEdit { index, color }), now).map(|_| ())
	}

	/// Render the pending color edits if no newer edit arrived within the debounce window.
	///
	/// Returns whether a render happened.
	pub fn poll(&mut self, now: Instant) -> bool {
		let edit = self.recolor.poll(now);
		self.recolor_pending(edit)
	}

	/// Render the pending color edits right away.
	///
	/// Returns whether a render happened.
	pub fn flush(&mut self) -> bool {
		let edit = self.recolor.cancel();
		self.recolor_pending(edit)
	}

	/// When the pending color edit will be rendered by [`Session::poll`], if there is one
	#[must_use]
	pub fn recolor_deadline(&self) -> Option<Instant> {
		self.recolor.deadline()
	}

	/// Whether a color edit is waiting to be rendered
	#[must_use]
	pub const fn is_updating(&self) -> bool {
		self.recolor.is_pending()
	}

	/// Current parameters
	#[must_use]
	pub const fn config(&self) -> &Config {
		&self.config
	}

	/// Dimensions of the loaded image
	#[must_use]
	pub const fn dimensions(&self) -> (u32, u32) {
		(self.width, self.height)
	}

	/// Every pixel of the loaded image with its cluster
	#[must_use]
	pub fn pixels(&self) -> &[Pixel] {
		&self.pixels
	}

	/// The number of points (unique colors, or pixels without dedup) samples were drawn from
	#[must_use]
	pub const fn population_size(&self) -> usize {
		self.population
	}

	/// The cached samples
	#[must_use]
	pub fn samples(&self) -> &[SamplePoint] {
		&self.samples
	}

	/// The current centroids
	#[must_use]
	pub fn centroids(&self) -> &[Centroid] {
		&self.fit.centroids
	}

	/// The latest k-means result, with any manual color edits applied
	#[must_use]
	pub const fn fit(&self) -> &KmeansResult {
		&self.fit
	}

	/// The palette colors with components in `[0, 1]`
	#[must_use]
	pub fn palette(&self) -> Vec<Srgb<f32>> {
		self.fit.centroids.iter().map(|centroid| centroid.rgb).collect()
	}

	/// The palette colors as `#rrggbb` strings
	#[must_use]
	pub fn hex_palette(&self) -> Vec<String> {
		self.fit.centroids.iter().map(|centroid| to_hex(centroid.rgb)).collect()
	}

	/// The latest recolored image and layers, if an image is loaded
	#[must_use]
	pub const fn output(&self) -> Option<&Rendered> {
		self.output.as_ref()
	}

	/// The stages run by the most recent pass, in order
	#[must_use]
	pub fn last_pass(&self) -> &[Stage] {
		&self.last_pass
	}

	/// Whether there is something to cluster
	fn is_loaded(&self) -> bool {
		!self.pixels.is_empty() && !self.samples.is_empty()
	}

	/// Apply an edit that never fails
	fn apply_param(&mut self, edit: Edit) -> Stage {
		debug_assert!(!matches!(edit, Edit::CentroidColor(_)));
		self.apply(edit, Instant::now()).unwrap_or(Stage::Idle)
	}

	/// Overwrite a centroid color and (re)schedule the render
	fn set_centroid_color(&mut self, edit: ColorEdit, now: Instant) -> Result<(), SessionError> {
		let k = self.fit.centroids.len();
		let centroid = self
			.fit
			.centroids
			.get_mut(edit.index)
			.ok_or(SessionError::CentroidOutOfRange { index: edit.index, k })?;

		centroid.rgb = edit.color;
		self.recolor.schedule(edit, now);
		log::debug!("recolor of centroid {} scheduled in {:?}", edit.index, self.recolor.window());
		Ok(())
	}

	/// Render for a released color edit, if any
	fn recolor_pending(&mut self, edit: Option<ColorEdit>) -> bool {
		match edit {
			Some(edit) if self.is_loaded() => {
				log::debug!("rendering color edit of centroid {}", edit.index);
				self.run_from(Stage::Recoloring);
				true
			},
			_ => false,
		}
	}

	/// Record entering a stage
	fn enter(&mut self, stage: Stage) {
		log::debug!("entering {stage:?}");
		self.last_pass.push(stage);
	}

	/// Run the pipeline starting at `stage`
	fn run_from(&mut self, stage: Stage) -> Stage {
		self.last_pass.clear();
		if !self.is_loaded() {
			return Stage::Idle;
		}

		if stage == Stage::Refitting {
			self.enter(Stage::Refitting);
			// The render at the end of this pass supersedes any pending color edit
			self.recolor.cancel();
			let Config { k, metric, max_iter, convergence_threshold, .. } = self.config;
			self.fit = kmeans::fit(
				&self.samples,
				k,
				self.config.weights(),
				metric,
				max_iter,
				convergence_threshold,
			);
		}

		if matches!(stage, Stage::Refitting | Stage::Reassigning) {
			self.enter(Stage::Reassigning);
			assign_all(&mut self.pixels, &self.fit.centroids, self.config.weights(), self.config.metric);
		}

		if stage != Stage::Idle {
			self.enter(Stage::Recoloring);
			self.output = Some(render(&self.pixels, self.width, self.height, &self.fit.centroids));
		}

		stage
	}
}
