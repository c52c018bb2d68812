//! Reduce an image to a bounded set of color and position samples

use crate::{Feature, Pixel, SamplePoint};
use image::{Rgba, RgbaImage};
use palette::Srgb;
use rand::Rng;
use std::collections::HashSet;

/// The feature of the pixel at `(x, y)` in a `width` by `height` image
// (u32 as f32) is only inexact for dimensions far beyond any real image
#[allow(clippy::cast_precision_loss)]
fn feature(x: u32, y: u32, width: u32, height: u32, &Rgba([r, g, b, _]): &Rgba<u8>) -> Feature {
	Feature {
		rgb: Srgb::new(r, g, b).into_format(),
		xy: [x as f32 / width as f32, y as f32 / height as f32],
	}
}

/// Whether a pixel is left out of the population
fn skipped(skip_transparent: bool, &Rgba([_, _, _, a]): &Rgba<u8>) -> bool {
	skip_transparent && a == 0
}

/// Returns one sample per unique RGB color, in row-major order of first appearance.
///
/// Each color keeps the position of the first pixel it was seen at.
/// Fully transparent pixels are ignored if `skip_transparent` is set.
#[must_use]
pub fn unique_colors(image: &RgbaImage, skip_transparent: bool) -> Vec<SamplePoint> {
	let (width, height) = image.dimensions();
	let mut unique = Vec::new();

	// Packed Srgb of the colors seen so far
	let mut seen: HashSet<u32> = HashSet::new();

	for (x, y, pixel) in image.enumerate_pixels() {
		if skipped(skip_transparent, pixel) {
			continue;
		}

		let Rgba([r, g, b, _]) = *pixel;
		let key = Srgb::new(r, g, b).into_u32::<palette::rgb::channels::Rgba>();
		if seen.insert(key) {
			unique.push(feature(x, y, width, height, pixel));
		}
	}

	log::debug!("reduced {width}x{height} image to {} unique colors", unique.len());

	unique
}

/// Returns a sample for every pixel, in row-major order.
///
/// Fully transparent pixels are ignored if `skip_transparent` is set.
#[must_use]
pub fn all_colors(image: &RgbaImage, skip_transparent: bool) -> Vec<SamplePoint> {
	let (width, height) = image.dimensions();
	image
		.enumerate_pixels()
		.filter(|(_, _, pixel)| !skipped(skip_transparent, pixel))
		.map(|(x, y, pixel)| feature(x, y, width, height, pixel))
		.collect()
}

/// Returns the population k-means samples are drawn from
#[must_use]
pub fn population(image: &RgbaImage, dedup: bool, skip_transparent: bool) -> Vec<SamplePoint> {
	if dedup {
		unique_colors(image, skip_transparent)
	} else {
		all_colors(image, skip_transparent)
	}
}

/// Draw `min(max_samples, population.len())` samples uniformly at random with replacement.
///
/// The same point can be drawn more than once.
#[must_use]
pub fn sample(population: &[SamplePoint], max_samples: u32, rng: &mut impl Rng) -> Vec<SamplePoint> {
	if population.is_empty() {
		return Vec::new();
	}

	let num_samples = usize::min(max_samples as usize, population.len());
	(0..num_samples)
		.map(|_| population[rng.gen_range(0..population.len())])
		.collect()
}

/// Returns every pixel of the image, transparent ones included, without a cluster.
#[must_use]
pub fn pixels(image: &RgbaImage) -> Vec<Pixel> {
	let (width, height) = image.dimensions();
	image
		.enumerate_pixels()
		.map(|(x, y, pixel)| Pixel {
			feature: feature(x, y, width, height, pixel),
			index: y * width + x,
			cluster: None,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tests::image_from_rows;
	use rand::SeedableRng;
	use rand_xoshiro::Xoshiro256PlusPlus;

	const RED: [u8; 3] = [255, 0, 0];
	const GREEN: [u8; 3] = [0, 255, 0];
	const BLUE: [u8; 3] = [0, 0, 255];

	fn test_image() -> RgbaImage {
		image_from_rows(&[&[RED, GREEN, RED, BLUE], &[GREEN, GREEN, BLUE, RED]])
	}

	#[test]
	fn unique_colors_keeps_the_first_position() {
		let unique = unique_colors(&test_image(), true);

		assert_eq!(unique.len(), 3);
		assert_eq!(unique[0].xy, [0.0, 0.0]);
		assert_eq!(unique[1].xy, [0.25, 0.0]);
		assert_eq!(unique[2].xy, [0.75, 0.0]);
		assert_eq!(unique[2].rgb, Srgb::new(0.0, 0.0, 1.0));
	}

	#[test]
	fn transparent_pixels_are_skipped_when_requested() {
		let mut image = test_image();
		image.put_pixel(0, 0, Rgba([10, 20, 30, 0]));

		let skipping = unique_colors(&image, true);
		assert!(skipping.iter().all(|s| s.rgb != Srgb::new(10u8, 20, 30).into_format::<f32>()));
		assert_eq!(skipping.len(), 3);
		assert_eq!(all_colors(&image, true).len(), 7);

		assert_eq!(unique_colors(&image, false).len(), 4);
		assert_eq!(all_colors(&image, false).len(), 8);
	}

	#[test]
	fn population_selects_dedup_mode() {
		let image = test_image();
		assert_eq!(population(&image, true, true).len(), 3);
		assert_eq!(population(&image, false, true).len(), 8);
	}

	#[test]
	fn sample_is_bounded_by_max_and_population() {
		let population = all_colors(&test_image(), true);
		let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);

		assert_eq!(sample(&population, 3, &mut rng).len(), 3);
		assert_eq!(sample(&population, 100, &mut rng).len(), population.len());
		assert!(sample(&[], 100, &mut rng).is_empty());
	}

	#[test]
	fn sample_draws_from_the_population() {
		let population = unique_colors(&test_image(), true);
		let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);

		for _ in 0..16 {
			for point in sample(&population, 100, &mut rng) {
				assert!(population.contains(&point));
			}
		}
	}

	#[test]
	fn sample_draws_with_replacement() {
		let image = RgbaImage::from_fn(8, 8, |x, y| {
			#[allow(clippy::cast_possible_truncation)]
			let pixel = Rgba([(x * 32) as u8, (y * 32) as u8, 128, u8::MAX]);
			pixel
		});
		let population = unique_colors(&image, true);
		assert_eq!(population.len(), 64);

		let drawn = sample(&population, 1000, &mut Xoshiro256PlusPlus::seed_from_u64(1));
		assert_eq!(drawn.len(), population.len());

		// Drawing every point exactly once would be a permutation
		let distinct = drawn
			.iter()
			.map(|point| (point.xy[0].to_bits(), point.xy[1].to_bits()))
			.collect::<HashSet<_>>();
		assert!(distinct.len() < drawn.len());
	}

	#[test]
	fn sample_is_deterministic_for_a_seed() {
		let population = all_colors(&test_image(), true);
		let a = sample(&population, 5, &mut Xoshiro256PlusPlus::seed_from_u64(7));
		let b = sample(&population, 5, &mut Xoshiro256PlusPlus::seed_from_u64(7));
		assert_eq!(a, b);
	}

	#[test]
	fn pixels_are_row_major() {
		let image = test_image();
		let pixels = pixels(&image);

		assert_eq!(pixels.len(), 8);
		for (i, pixel) in pixels.iter().enumerate() {
			assert_eq!(pixel.index as usize, i);
			assert_eq!(pixel.cluster, None);
		}
		assert_eq!(pixels[5].feature.xy, [0.25, 0.5]);
		assert_eq!(pixels[6].feature.rgb, Srgb::new(0.0, 0.0, 1.0));
	}
}
