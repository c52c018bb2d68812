//! Extract a color palette from an image and split it into one image layer per palette color.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::unreadable_literal
)]

mod cli;

#[allow(clippy::wildcard_imports)]
use cli::*;

use std::{
    fmt::{self, Display},
    io,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use chromalayer::{color::to_srgb8, Config, Rendered, Session, SessionError};
use clap::Parser;
use colored::Colorize;
use image::{DynamicImage, GenericImageView, RgbaImage};
use palette::Srgb;

/// Record the running time of a function and print the elapsed time
macro_rules! time {
    ($name: literal, $verbose: expr, $func_call: expr) => {{
        let start = Instant::now();
        let result = $func_call;
        if $verbose {
            println!("{} took {}ms", $name, start.elapsed().as_millis());
        }
        result
    }};
}

/// Error cases for loading the image, editing the palette, and writing the results
#[derive(Debug)]
enum AppError {
    /// Failed to read or decode the image file
    ImageLoad(image::ImageError),
    /// A `--set` option referred to a palette color that does not exist
    Edit(SessionError),
    /// Failed to create the output directory
    CreateDir(PathBuf, io::Error),
    /// Failed to encode or write an output image
    ImageSave(PathBuf, image::ImageError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::ImageLoad(e) => write!(f, "Failed to load the image file: {e}"),
            AppError::Edit(e) => write!(f, "Failed to set the palette color: {e}"),
            AppError::CreateDir(path, e) => {
                write!(f, "Failed to create the directory {}: {e}", path.display())
            }
            AppError::ImageSave(path, e) => {
                write!(f, "Failed to write the image {}: {e}", path.display())
            }
        }
    }
}

fn main() -> ExitCode {
    let options = Options::parse();

    let result = generate_and_print_palette(&options);

    // Returning Result<_> uses Debug printing instead of Display
    if let Err(e) = result {
        eprintln!("{e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Load an image, cluster it, print the palette, and write the layers using the given options
fn generate_and_print_palette(options: &Options) -> Result<(), AppError> {
    // Input
    let img = time!(
        "Image loading",
        options.verbose,
        image::open(&options.image).map_err(AppError::ImageLoad)
    )?;
    let img = downscale(img, options.max_dimension, options.verbose).into_rgba8();

    // Processing
    let session = {
        let start = Instant::now();
        let session = cluster(&img, options)?;
        if options.verbose {
            println!(
                "Palette generation took {}ms in total",
                start.elapsed().as_millis()
            );
        }
        session
    };

    // Output
    let palette = session
        .palette()
        .into_iter()
        .map(to_srgb8)
        .collect::<Vec<_>>();
    print_palette(&palette, options);

    if let Some(rendered) = session.output() {
        if options.percent {
            print_percentages(rendered);
        }

        if let Some(dir) = &options.out_dir {
            time!(
                "Writing images",
                options.verbose,
                write_images(dir, rendered)
            )?;
        }
    }

    Ok(())
}

/// Returns the dimensions scaled so that neither exceeds `max_dimension`, keeping the aspect ratio
// the scaled side is at most max_dimension, and at least 1
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let aspect = f64::from(width) / f64::from(height);

    if width > height {
        let height = (f64::from(max_dimension) / aspect).round() as u32;
        (max_dimension, height.max(1))
    } else {
        let width = (f64::from(max_dimension) * aspect).round() as u32;
        (width.max(1), max_dimension)
    }
}

/// Scale the image down if its width or height is larger than `max_dimension`
fn downscale(image: DynamicImage, max_dimension: u32, verbose: bool) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (scaled_width, scaled_height) = scaled_dimensions(width, height, max_dimension);

    if (scaled_width, scaled_height) == (width, height) {
        if verbose {
            println!("Skipping downscaling since the image is within the max dimension");
        }

        image
    } else {
        if verbose {
            println!("Downscaling the image to {scaled_width}x{scaled_height}");
        }

        time!(
            "Image downscaling",
            verbose,
            image.thumbnail_exact(scaled_width, scaled_height)
        )
    }
}

/// Build the clustering config from the options
fn config(options: &Options) -> Config {
    Config {
        color_weight: options.color_weight,
        spatial_weight: options.spatial_weight,
        k: options.k,
        max_samples: options.max_samples,
        max_iter: options.max_iter,
        convergence_threshold: options.convergence_threshold,
        dedup: !options.no_dedup,
        skip_transparent: !options.keep_transparent,
        metric: options.metric.into(),
        ..Config::default()
    }
}

/// Run the clustering pipeline and apply the palette overrides
fn cluster(image: &RgbaImage, options: &Options) -> Result<Session, AppError> {
    let seed = options.seed.unwrap_or_else(rand::random);
    let mut session = Session::new(config(options), seed);

    time!("Clustering", options.verbose, session.load(image));

    if options.verbose {
        let fit = session.fit();
        println!(
            "Reduced image to {} sampling points, drew {} samples",
            session.population_size(),
            session.samples().len()
        );
        println!(
            "k-means took {} iterations with a final drift of {}",
            fit.iterations, fit.drift
        );
    }

    if !options.overrides.is_empty() {
        let now = Instant::now();
        for &ColorOverride { index, color } in &options.overrides {
            session
                .edit_centroid_color(index, color, now)
                .map_err(AppError::Edit)?;
        }

        time!("Recoloring", options.verbose, session.flush());
    }

    Ok(session)
}

/// Print the given colors based off the provided options
fn print_palette(colors: &[Srgb<u8>], options: &Options) {
    match options.output {
        FormatOutput::Hex => color_format_print(colors, options, " ", |color| format!("#{color:x}")),

        FormatOutput::Rgb => color_format_print(colors, options, " ", |color| {
            format!("({},{},{})", color.red, color.green, color.blue)
        }),

        FormatOutput::Swatch => print_colors(colors, "", |color| {
            "   "
                .on_truecolor(color.red, color.green, color.blue)
                .to_string()
        }),
    }
}

/// Print a line of colors using the given format
fn print_colors(colors: &[Srgb<u8>], delimiter: &str, format: impl Fn(Srgb<u8>) -> String) {
    println!(
        "{}",
        colors
            .iter()
            .map(|&color| format(color))
            .collect::<Vec<_>>()
            .join(delimiter)
    );
}

/// Format, colorize, and then print the text for all colors
fn color_format_print(
    colors: &[Srgb<u8>],
    options: &Options,
    delimiter: &str,
    format: impl Fn(Srgb<u8>) -> String,
) {
    match options.colorize {
        Some(ColorizeOutput::Fg) => print_colors(colors, delimiter, |color| {
            format(color)
                .truecolor(color.red, color.green, color.blue)
                .to_string()
        }),

        Some(ColorizeOutput::Bg) => print_colors(colors, delimiter, |color| {
            format(color)
                .on_truecolor(color.red, color.green, color.blue)
                .to_string()
        }),

        None => print_colors(colors, delimiter, format),
    }
}

/// Print the percentage of pixels in each layer
fn print_percentages(rendered: &Rendered) {
    let total = rendered.counts.iter().map(|&n| u64::from(n)).sum::<u64>().max(1);

    // pixel counts are far below the point where (u64 as f64) loses precision
    #[allow(clippy::cast_precision_loss)]
    let percentages = rendered
        .counts
        .iter()
        .map(|&n| format!("{:.1}%", 100.0 * f64::from(n) / total as f64))
        .collect::<Vec<_>>();

    println!("{}", percentages.join(" "));
}

/// The file name of the layer at `index`
fn layer_file_name(index: usize) -> String {
    format!("layer-{index}.png")
}

/// Write the recolored image and each layer as PNG files into `dir`
fn write_images(dir: &Path, rendered: &Rendered) -> Result<(), AppError> {
    std::fs::create_dir_all(dir).map_err(|e| AppError::CreateDir(dir.to_path_buf(), e))?;

    let save = |name: String, image: &RgbaImage| {
        let path = dir.join(name);
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| AppError::ImageSave(path, e))
    };

    save("recolored.png".to_owned(), &rendered.recolored)?;
    for (i, layer) in rendered.layers.iter().enumerate() {
        save(layer_file_name(i), layer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_images_are_not_scaled() {
        assert_eq!(scaled_dimensions(640, 480, 2000), (640, 480));
        assert_eq!(scaled_dimensions(2000, 2000, 2000), (2000, 2000));
    }

    #[test]
    fn scaling_keeps_the_aspect_ratio() {
        assert_eq!(scaled_dimensions(4000, 3000, 2000), (2000, 1500));
        assert_eq!(scaled_dimensions(3000, 4000, 2000), (1500, 2000));
        assert_eq!(scaled_dimensions(5000, 5000, 2000), (2000, 2000));
        assert_eq!(scaled_dimensions(10000, 3, 2000), (2000, 1));
    }

    #[test]
    fn downscale_limits_the_largest_side() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(300, 120));
        let scaled = downscale(image, 100, false);
        assert_eq!(scaled.dimensions(), (100, 40));
    }

    #[test]
    fn layers_are_numbered_from_zero() {
        assert_eq!(layer_file_name(0), "layer-0.png");
        assert_eq!(layer_file_name(11), "layer-11.png");
    }

    #[test]
    fn config_follows_the_options() {
        let options = Options::parse_from([
            "chromalayer",
            "image.png",
            "-k",
            "3",
            "--spatial-weight",
            "2.5",
            "--no-dedup",
            "--metric",
            "summed-roots",
        ]);
        let config = config(&options);

        assert_eq!(config.k, 3);
        assert!((config.spatial_weight - 2.5).abs() <= f32::EPSILON);
        assert!(!config.dedup);
        assert!(config.skip_transparent);
        assert_eq!(config.metric, chromalayer::DistanceMetric::SummedRoots);
    }

    #[test]
    fn overrides_are_rendered() {
        let image = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        let options = Options::parse_from([
            "chromalayer",
            "image.png",
            "-k",
            "1",
            "--seed",
            "0",
            "--set",
            "0=#00ff00",
        ]);

        let session = cluster(&image, &options).map_err(|e| e.to_string());
        let Ok(session) = session else {
            panic!("clustering failed");
        };

        let rendered = session.output().map(|output| output.recolored.clone());
        assert_eq!(rendered, Some(RgbaImage::from_pixel(4, 4, image::Rgba([0, 255, 0, 255]))));
    }
}
