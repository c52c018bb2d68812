//! Recolor the image and split it into one layer per cluster

use crate::{color::to_srgb8, Centroid, Pixel};
use image::{Rgba, RgbaImage};

/// The images produced from a set of assigned pixels and centroids
#[derive(Debug, Clone)]
pub struct Rendered {
	/// Every pixel painted with the color of its centroid
	pub recolored: RgbaImage,
	/// For each centroid, an image where only the pixels of that cluster are opaque
	pub layers: Vec<RgbaImage>,
	/// The number of pixels in each cluster
	pub counts: Vec<u32>,
}

/// The opaque 8-bit color of a centroid
fn opaque(centroid: &Centroid) -> Rgba<u8> {
	let color = to_srgb8(centroid.rgb);
	Rgba([color.red, color.green, color.blue, u8::MAX])
}

/// Paint the recolored image and the layers for the given cluster assignments.
///
/// Each layer overlays exactly the pixels of its cluster, so compositing all layers
/// gives back the recolored image. Pixels without a valid cluster stay transparent everywhere.
#[must_use]
pub fn render(pixels: &[Pixel], width: u32, height: u32, centroids: &[Centroid]) -> Rendered {
	let colors = centroids.iter().map(opaque).collect::<Vec<_>>();

	let mut recolored = RgbaImage::new(width, height);
	let mut layers = vec![RgbaImage::new(width, height); centroids.len()];
	let mut counts = vec![0; centroids.len()];

	for pixel in pixels {
		let Some(cluster) = pixel.cluster.map(usize::from).filter(|&c| c < colors.len()) else {
			continue;
		};

		debug_assert!(pixel.index < width * height);
		let (x, y) = (pixel.index % width, pixel.index / width);
		let color = colors[cluster];

		recolored.put_pixel(x, y, color);
		layers[cluster].put_pixel(x, y, color);
		counts[cluster] += 1;
	}

	Rendered { recolored, layers, counts }
}

/// Overlay the layers in order onto a transparent `width` by `height` image.
#[must_use]
pub fn composite(width: u32, height: u32, layers: &[RgbaImage]) -> RgbaImage {
	let mut image = RgbaImage::new(width, height);
	for layer in layers {
		for (dst, src) in image.pixels_mut().zip(layer.pixels()) {
			if src.0[3] != 0 {
				*dst = *src;
			}
		}
	}
	image
}
