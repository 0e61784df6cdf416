//! Benchmark suite for VP8L encoding
//!
//! Measures throughput over synthetic content classes: smooth gradients,
//! incompressible noise and palette imagery.
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use vp8l_benches::{gradient_rgba, noise_rgba, palette_rgba, sizes};
use vp8l_codec::{Encoder, EncoderOptions, RgbaImage};

fn bench_encode_content_classes(c: &mut Criterion) {
	let mut group = c.benchmark_group("vp8l_encode");
	let encoder = Encoder::new(EncoderOptions::default());

	let cases: [(&str, fn(u32, u32) -> Vec<u8>); 3] = [
		("gradient", gradient_rgba),
		("noise", noise_rgba),
		("palette", palette_rgba),
	];
	for (name, generate) in cases {
		for (width, height) in [sizes::TINY, sizes::SMALL] {
			let rgba = generate(width, height);
			group.throughput(Throughput::Bytes(u64::from(width * height * 4)));
			group.bench_with_input(
				BenchmarkId::new(name, format!("{width}x{height}")),
				&rgba,
				|b, rgba| {
					b.iter(|| {
						let image = RgbaImage::new(rgba, width, height).unwrap();
						black_box(encoder.encode_to_vec(&image).unwrap())
					});
				},
			);
		}
	}
	group.finish();
}

fn bench_encode_medium_gradient(c: &mut Criterion) {
	let (width, height) = sizes::MEDIUM;
	let rgba = gradient_rgba(width, height);
	let encoder = Encoder::new(EncoderOptions::default());
	let mut group = c.benchmark_group("vp8l_encode_medium");
	group.sample_size(10);
	group.throughput(Throughput::Bytes(u64::from(width * height * 4)));
	group.bench_function("gradient/512x512", |b| {
		b.iter(|| {
			let image = RgbaImage::new(&rgba, width, height).unwrap();
			black_box(encoder.encode_to_vec(&image).unwrap())
		});
	});
	group.finish();
}

criterion_group!(benches, bench_encode_content_classes, bench_encode_medium_gradient);
criterion_main!(benches);
