//! Round-trip tests: every encoded stream must decode, through an
//! independent WebP decoder, to the exact input pixels.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use vp8l_codec::{Encoder, EncoderOptions, RgbaImage};

fn encode(rgba: &[u8], width: u32, height: u32, options: EncoderOptions) -> Vec<u8> {
	let image = RgbaImage::new(rgba, width, height).unwrap();
	Encoder::new(options).encode_to_vec(&image).unwrap()
}

fn roundtrip_with(rgba: &[u8], width: u32, height: u32, options: EncoderOptions) {
	let webp = encode(rgba, width, height, options);
	let decoded = image::load_from_memory(&webp)
		.expect("independent decoder rejected the stream")
		.to_rgba8();
	assert_eq!(decoded.dimensions(), (width, height));
	assert_eq!(decoded.as_raw().as_slice(), rgba, "{width}x{height} pixels differ");
}

fn roundtrip(rgba: &[u8], width: u32, height: u32) {
	roundtrip_with(rgba, width, height, EncoderOptions::default());
}

#[test]
fn single_red_pixel() {
	roundtrip(&[255, 0, 0, 255], 1, 1);
}

#[test]
fn solid_green_64x64_is_tiny() {
	let rgba: Vec<u8> = (0..64 * 64).flat_map(|_| [0, 255, 0, 255]).collect();
	let webp = encode(&rgba, 64, 64, EncoderOptions::default());
	assert!(webp.len() < 100, "{} bytes", webp.len());
	roundtrip(&rgba, 64, 64);
}

#[test]
fn two_color_checkerboard_8x8() {
	let rgba: Vec<u8> = (0..8u32 * 8)
		.flat_map(|i| {
			let (x, y) = (i % 8, i / 8);
			if (x + y) % 2 == 0 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }
		})
		.collect();
	roundtrip(&rgba, 8, 8);
}

#[test_log::test]
fn monotonic_red_gradient_256x1() {
	let rgba: Vec<u8> = (0..=255u8).flat_map(|r| [r, 0, 0, 255]).collect();
	roundtrip(&rgba, 256, 1);
}

#[test]
fn noise_32x32_with_many_colors() {
	let mut rng = SmallRng::seed_from_u64(0x5eed);
	let rgba: Vec<u8> = (0..32 * 32)
		.flat_map(|_| {
			let v: u32 = rng.random();
			[(v >> 16) as u8, (v >> 8) as u8, v as u8, 255]
		})
		.collect();
	roundtrip(&rgba, 32, 32);
}

#[test]
fn small_palette_images() {
	let palettes: &[&[[u8; 4]]] = &[
		&[[10, 20, 30, 255]],
		&[[0, 0, 0, 255], [255, 255, 255, 255]],
		&[[1, 2, 3, 255], [4, 5, 6, 255], [7, 8, 9, 255], [250, 1, 128, 255]],
	];
	let mut rng = SmallRng::seed_from_u64(42);
	for palette in palettes {
		for (w, h) in [(3u32, 3u32), (16, 16), (40, 23)] {
			let rgba: Vec<u8> = (0..w * h)
				.flat_map(|_| palette[rng.random_range(0..palette.len())])
				.collect();
			roundtrip(&rgba, w, h);
		}
	}
}

#[test]
fn seventeen_colors_skip_index_packing() {
	// 17 colors keeps the palette but packs one index per pixel
	let colors: Vec<[u8; 4]> = (0..17u8).map(|i| [i * 13, 255 - i, i, 255]).collect();
	let mut rng = SmallRng::seed_from_u64(7);
	let rgba: Vec<u8> = (0..29u32 * 31)
		.flat_map(|_| colors[rng.random_range(0..colors.len())])
		.collect();
	roundtrip(&rgba, 29, 31);
}

#[test]
fn translucent_pixels_survive() {
	let mut rng = SmallRng::seed_from_u64(99);
	let rgba: Vec<u8> = (0..24 * 24)
		.flat_map(|_| [rng.random(), rng.random(), 0, rng.random_range(1..=255u8)])
		.collect();
	roundtrip(&rgba, 24, 24);
}

#[test]
fn smooth_two_dimensional_gradient() {
	// favors the predictor and cross-color transforms
	let (w, h) = (96u32, 64u32);
	let rgba: Vec<u8> = (0..h)
		.flat_map(|y| {
			(0..w).flat_map(move |x| {
				let r = (x * 2) as u8;
				let g = (y * 3) as u8;
				let b = r.wrapping_add(g) / 2;
				[r, g, b, 255]
			})
		})
		.collect();
	roundtrip(&rgba, w, h);
}

#[test]
fn vertical_stripes_reach_previous_row() {
	let (w, h) = (48u32, 48u32);
	let rgba: Vec<u8> = (0..h)
		.flat_map(|_| (0..w).flat_map(|x| [if x % 3 == 0 { 200 } else { 17 }, x as u8, 0, 255]))
		.collect();
	roundtrip(&rgba, w, h);
}

#[test]
fn awkward_dimensions() {
	let mut rng = SmallRng::seed_from_u64(3);
	for (w, h) in [(1u32, 64u32), (64, 1), (5, 7), (33, 1), (2, 2), (127, 3)] {
		let rgba: Vec<u8> = (0..w * h)
			.flat_map(|_| [rng.random_range(0..4u8) * 80, 9, 200, 255])
			.collect();
		roundtrip(&rgba, w, h);
	}
}

#[test]
fn exhaustive_crunch_profile_roundtrips() {
	let options = EncoderOptions { quality: 100, method: 6 };
	let mut rng = SmallRng::seed_from_u64(17);
	let rgba: Vec<u8> = (0..20u32 * 20)
		.flat_map(|_| [rng.random_range(0..3u8) * 100, 50, 0, 255])
		.collect();
	roundtrip_with(&rgba, 20, 20, options);
}

#[test]
fn photographic_like_content() {
	// many colors with spatial correlation, large enough for meta tiles
	let (w, h) = (160u32, 120u32);
	let mut rng = SmallRng::seed_from_u64(12345);
	let mut rgba = Vec::with_capacity((w * h * 4) as usize);
	let mut row_base = [128u8, 100, 80];
	for _ in 0..h {
		let mut pix = row_base;
		for _ in 0..w {
			for c in &mut pix {
				*c = c.wrapping_add(rng.random_range(0..5u8)).wrapping_sub(2);
			}
			rgba.extend_from_slice(&[pix[0], pix[1], pix[2], 255]);
		}
		for c in &mut row_base {
			*c = c.wrapping_add(rng.random_range(0..3u8)).wrapping_sub(1);
		}
	}
	roundtrip(&rgba, w, h);
}
