//! Specifies the CLI and handles arg parsing

use chromalayer::{color::parse_hex, DistanceMetric};
use clap::{Parser, ValueEnum};
use palette::Srgb;
use std::{
	fmt::{Debug, Display},
	num::ParseFloatError,
	ops::RangeBounds,
	path::PathBuf,
	str::FromStr,
};

/// Supported output formats for the palette colors
#[derive(Copy, Clone, ValueEnum)]
pub enum FormatOutput {
	/// sRGB hexcode
	Hex,
	/// sRGB (r,g,b) triple
	Rgb,
	/// Whitespace with true color background
	Swatch,
}

/// Ways to colorize the output text
#[derive(Copy, Clone, ValueEnum)]
pub enum ColorizeOutput {
	/// Foreground
	Fg,
	/// Background
	Bg,
}

/// How color and spatial distances are combined
#[derive(Copy, Clone, ValueEnum)]
pub enum MetricOption {
	/// sqrt(color_weight * |Δrgb|² + spatial_weight * |Δxy|²)
	WeightedEuclidean,
	/// color_weight * |Δrgb| + spatial_weight * |Δxy|
	SummedRoots,
}

impl From<MetricOption> for DistanceMetric {
	fn from(metric: MetricOption) -> Self {
		match metric {
			MetricOption::WeightedEuclidean => DistanceMetric::WeightedEuclidean,
			MetricOption::SummedRoots => DistanceMetric::SummedRoots,
		}
	}
}

/// A manual override for one palette color
#[derive(Copy, Clone, Debug)]
pub struct ColorOverride {
	/// Index of the palette color
	pub index: usize,
	/// The replacement color
	pub color: Srgb<f32>,
}

/// Extract a color palette from an image by clustering its pixels by color and position,
/// and split the image into one layer per palette color.
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser)]
#[command(version)]
pub struct Options {
	/// The path to the input image
	pub image: PathBuf,

	/// The format to print the colors in
	#[arg(short, long, default_value = "hex")]
	pub output: FormatOutput,

	/// Color the foreground or background for each printed color
	#[arg(short, long)]
	pub colorize: Option<ColorizeOutput>,

	/// Also print the share of the image covered by each color
	#[arg(long)]
	pub percent: bool,

	/// The number of colors (and layers) to find
	#[arg(short, default_value_t = chromalayer::DEFAULT_K, value_parser = clap::value_parser!(u8).range(1..))]
	pub k: u8,

	/// The weight of color differences
	#[arg(long, default_value_t = chromalayer::DEFAULT_COLOR_WEIGHT, value_parser = parse_valid_weight)]
	pub color_weight: f32,

	/// The weight of position differences
	///
	/// Higher values give layers that are more compact in the image,
	/// until position dominates and the layers become regions of the image regardless of color.
	#[arg(long, default_value_t = chromalayer::DEFAULT_SPATIAL_WEIGHT, value_parser = parse_valid_weight)]
	pub spatial_weight: f32,

	/// How color and position differences are combined
	#[arg(long, default_value = "weighted-euclidean")]
	pub metric: MetricOption,

	/// The maximum number of pixels k-means is run on
	#[arg(long, default_value_t = chromalayer::DEFAULT_MAX_SAMPLES, value_parser = clap::value_parser!(u32).range(1..))]
	pub max_samples: u32,

	/// The maximum number of k-means iterations
	#[arg(short = 'i', long, default_value_t = chromalayer::DEFAULT_MAX_ITER)]
	pub max_iter: u32,

	/// The total centroid movement below which k-means stops
	#[arg(short = 'e', long, default_value_t = chromalayer::DEFAULT_CONVERGENCE_THRESHOLD, value_parser = parse_valid_convergence)]
	pub convergence_threshold: f32,

	/// Sample from all pixels instead of one pixel per unique color
	#[arg(long)]
	pub no_dedup: bool,

	/// Include fully transparent pixels when sampling
	#[arg(long)]
	pub keep_transparent: bool,

	/// The maximum width or height of the analyzed image
	///
	/// Larger images are scaled down, keeping their aspect ratio, before sampling and clustering.
	#[arg(short = 'p', long, default_value_t = 2000, value_parser = clap::value_parser!(u32).range(1..))]
	pub max_dimension: u32,

	/// Replace a palette color after clustering, as INDEX=#RRGGBB
	///
	/// Can be given multiple times. Indices start at 0, in the printed order.
	#[arg(long = "set", value_parser = parse_color_override)]
	pub overrides: Vec<ColorOverride>,

	/// Directory to write the recolored image and the layers to as PNG files
	#[arg(short = 'd', long)]
	pub out_dir: Option<PathBuf>,

	/// The seed value used for the random number generator, random if not given
	#[arg(long)]
	pub seed: Option<u64>,

	/// Print additional information, such as timings and the number of k-means iterations
	#[arg(long)]
	pub verbose: bool,
}

/// Parse a float value and ensure it in the provided, valid range
fn parse_float_in_range<T>(s: &str, range: impl RangeBounds<T> + Debug) -> Result<T, String>
where
	T: FromStr<Err = ParseFloatError> + Display + PartialOrd,
{
	let value: T = s.parse().map_err(|e| format!("{e}"))?;
	if range.contains(&value) {
		Ok(value)
	} else {
		Err(format!("{value} is not in {range:?}"))
	}
}

/// Parse a weight and ensure it is >= `0.0`
fn parse_valid_weight(s: &str) -> Result<f32, String> {
	parse_float_in_range(s, 0.0..)
}

/// Parse the convergence number and ensure it is >= `0.0`
fn parse_valid_convergence(s: &str) -> Result<f32, String> {
	parse_float_in_range(s, 0.0..)
}

/// Parse an `INDEX=#RRGGBB` color override
fn parse_color_override(s: &str) -> Result<ColorOverride, String> {
	let (index, hex) = s
		.split_once('=')
		.ok_or_else(|| format!("'{s}' is not of the form INDEX=#RRGGBB"))?;

	let index = index.trim().parse().map_err(|e| format!("invalid index '{index}': {e}"))?;
	let color = parse_hex(hex).map_err(|e| format!("{e}"))?;

	Ok(ColorOverride { index, color })
}
