use chromalayer::{assign, kmeans, quantize, sample, Config, DistanceMetric, Session, Weights};
use criterion::{
	black_box, criterion_group, criterion_main, measurement::WallTime, BenchmarkGroup, BenchmarkId, Criterion,
	SamplingMode,
};
use image::{Rgba, RgbaImage};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::time::Duration;

const SIZES: [(u32, u32); 3] = [(160, 90), (480, 270), (1280, 720)];

/// A smooth gradient with a few hard edges, so it has many unique colors and some structure
fn synthetic_image(width: u32, height: u32) -> RgbaImage {
	RgbaImage::from_fn(width, height, |x, y| {
		let r = (x * 255 / width) as u8;
		let g = (y * 255 / height) as u8;
		let b = if (x / 37 + y / 23) % 3 == 0 { 200_u8 } else { 40 };
		Rgba([r, g, b.wrapping_add(r / 4), u8::MAX])
	})
}

fn images() -> Vec<(String, RgbaImage)> {
	SIZES
		.into_iter()
		.map(|(width, height)| (format!("{width}x{height}"), synthetic_image(width, height)))
		.collect()
}

fn create_group<'a>(c: &'a mut Criterion, name: &'a str) -> BenchmarkGroup<'a, WallTime> {
	let mut group = c.benchmark_group(name);
	group
		.sample_size(30)
		.noise_threshold(0.05)
		.sampling_mode(SamplingMode::Flat)
		.warm_up_time(Duration::from_millis(500));
	group
}

const WEIGHTS: Weights = Weights { color: 1.0, spatial: 0.1 };

fn sampling(c: &mut Criterion) {
	let mut group = create_group(c, "sampling");

	for (name, image) in images() {
		group.bench_with_input(BenchmarkId::new("unique", &name), &image, |b, image| {
			b.iter(|| sample::unique_colors(image, black_box(true)));
		});

		let unique = sample::unique_colors(&image, true);
		group.bench_with_input(BenchmarkId::new("draw", &name), &unique, |b, unique| {
			b.iter(|| {
				let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
				sample::sample(unique, black_box(100_000), &mut rng)
			});
		});
	}
}

fn kmeans(c: &mut Criterion) {
	let mut group = create_group(c, "kmeans");

	let samples = images()
		.into_iter()
		.map(|(name, image)| {
			let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
			(name, sample::sample(&sample::unique_colors(&image, true), 100_000, &mut rng))
		})
		.collect::<Vec<_>>();

	fn bench(
		name: &str,
		group: &mut BenchmarkGroup<WallTime>,
		samples: &[(String, Vec<chromalayer::SamplePoint>)],
		k: u8,
		metric: DistanceMetric,
	) {
		for (size, samples) in samples {
			group.bench_with_input(BenchmarkId::new(name, size), samples, |b, samples| {
				b.iter(|| kmeans::fit(samples, black_box(k), WEIGHTS, metric, black_box(50), black_box(0.001)));
			});
		}
	}

	group.measurement_time(Duration::from_secs(2));
	bench("default", &mut group, &samples, 6, DistanceMetric::WeightedEuclidean);
	bench("low k", &mut group, &samples, 3, DistanceMetric::WeightedEuclidean);
	bench("summed roots", &mut group, &samples, 6, DistanceMetric::SummedRoots);

	group.measurement_time(Duration::from_secs(4));
	bench("high k", &mut group, &samples, 16, DistanceMetric::WeightedEuclidean);
}

fn render(c: &mut Criterion) {
	let mut group = create_group(c, "render");

	for (name, image) in images() {
		let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
		let samples = sample::sample(&sample::unique_colors(&image, true), 100_000, &mut rng);
		let fit = kmeans::fit(&samples, 6, WEIGHTS, DistanceMetric::WeightedEuclidean, 50, 0.001);
		let mut pixels = sample::pixels(&image);

		group.bench_function(BenchmarkId::new("assign", &name), |b| {
			b.iter(|| assign::assign_all(&mut pixels, &fit.centroids, WEIGHTS, DistanceMetric::WeightedEuclidean));
		});

		group.bench_function(BenchmarkId::new("layers", &name), |b| {
			b.iter(|| quantize::render(&pixels, image.width(), image.height(), &fit.centroids));
		});
	}
}

fn all_steps(c: &mut Criterion) {
	let mut group = create_group(c, "all steps");
	group.measurement_time(Duration::from_secs(8));

	for (name, image) in images() {
		group.bench_with_input(BenchmarkId::from_parameter(name), &image, |b, image| {
			b.iter(|| {
				let mut session = Session::new(Config::default(), black_box(0));
				session.load(image);
				session
			});
		});
	}
}

criterion_group!(benches, sampling, kmeans, render, all_steps);
criterion_main!(benches);
