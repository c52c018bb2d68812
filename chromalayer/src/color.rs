//! Conversions between centroid colors and 8-bit / hex representations

use palette::{rgb::FromHexError, Srgb};
use std::{
	error::Error,
	fmt::{self, Display},
};

/// Error returned when a string is not a valid `#RRGGBB` color
#[derive(Debug)]
pub struct ParseHexError {
	/// The rejected input
	input: String,
	/// The underlying parse failure
	source: FromHexError,
}

impl Display for ParseHexError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "'{}' is not a valid hex color: {}", self.input, self.source)
	}
}

impl Error for ParseHexError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		Some(&self.source)
	}
}

/// Truncate a `[0, 1]` channel value to 8 bits, i.e. `floor(c * 255)`.
///
/// Values outside of `[0, 1]` saturate and NaN becomes `0`.
#[must_use]
// `as` saturates out of range values
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn channel_to_u8(c: f32) -> u8 {
	(c * 255.0).floor() as u8
}

/// Truncate a color to 8 bits per channel the same way the recolored image does.
#[must_use]
pub fn to_srgb8(color: Srgb<f32>) -> Srgb<u8> {
	Srgb::new(
		channel_to_u8(color.red),
		channel_to_u8(color.green),
		channel_to_u8(color.blue),
	)
}

/// Format a color as a lowercase `#rrggbb` string.
#[must_use]
pub fn to_hex(color: Srgb<f32>) -> String {
	format!("#{:x}", to_srgb8(color))
}

/// Parse a `#RRGGBB` (or `#RGB`) string into a color with components in `[0, 1]`.
///
/// # Errors
/// Returns a [`ParseHexError`] if `hex` is not a valid hex color.
pub fn parse_hex(hex: &str) -> Result<Srgb<f32>, ParseHexError> {
	hex.trim()
		.parse::<Srgb<u8>>()
		.map(|color| color.into_format())
		.map_err(|source| ParseHexError { input: hex.to_owned(), source })
}
