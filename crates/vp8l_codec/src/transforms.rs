//! Spatial predictor and color transforms.
//!
//! Both transforms replace pixels with residuals in place and return the
//! subsampled transform-metadata image: predictor modes packed into the
//! green channel, cross-color multipliers packed into blue/green/red.

use crate::constants::{ARGB_BLACK, NUM_PREDICTOR_MODES};
use crate::pixel::{self, Pixel, average2, sub_pixels};
use crate::utils::sub_sample_size;

/// `(b, r) -= g` on every pixel.
pub(crate) fn apply_subtract_green(pixels: &mut [Pixel]) {
	for pix in pixels.iter_mut() {
		let green = pixel::green(*pix);
		let red = pixel::red(*pix).wrapping_sub(green);
		let blue = pixel::blue(*pix).wrapping_sub(green);
		*pix = (*pix & 0xff00_ff00) | (u32::from(red) << 16) | u32::from(blue);
	}
}

#[inline]
fn clip255(v: i32) -> u32 {
	v.clamp(0, 255) as u32
}

fn clamped_add_subtract_full(c0: Pixel, c1: Pixel, c2: Pixel) -> Pixel {
	let channel = |shift: u32| {
		clip255(
			i32::from((c0 >> shift) as u8) + i32::from((c1 >> shift) as u8)
				- i32::from((c2 >> shift) as u8),
		) << shift
	};
	channel(0) | channel(8) | channel(16) | channel(24)
}

fn clamped_add_subtract_half(c0: Pixel, c1: Pixel, c2: Pixel) -> Pixel {
	let ave = average2(c0, c1);
	let channel = |shift: u32| {
		let a = i32::from((ave >> shift) as u8);
		let b = i32::from((c2 >> shift) as u8);
		clip255(a + (a - b) / 2) << shift
	};
	channel(0) | channel(8) | channel(16) | channel(24)
}

fn select(left: Pixel, top: Pixel, top_left: Pixel) -> Pixel {
	let sum_diff = |a: Pixel, b: Pixel| {
		(0..4)
			.map(|i| {
				let shift = i * 8;
				(i32::from((a >> shift) as u8) - i32::from((b >> shift) as u8)).abs()
			})
			.sum::<i32>()
	};
	// cost of predicting left vs predicting top
	let p_left = sum_diff(top, top_left);
	let p_top = sum_diff(left, top_left);
	if p_left < p_top { left } else { top }
}

/// One of the 14 spatial predictors, for interior pixels.
fn predict(mode: u8, left: Pixel, top: Pixel, top_left: Pixel, top_right: Pixel) -> Pixel {
	match mode {
		0 => ARGB_BLACK,
		1 => left,
		2 => top,
		3 => top_right,
		4 => top_left,
		5 => average2(average2(left, top_right), top),
		6 => average2(left, top_left),
		7 => average2(left, top),
		8 => average2(top_left, top),
		9 => average2(top, top_right),
		10 => average2(average2(left, top_left), average2(top, top_right)),
		11 => select(left, top, top_left),
		12 => clamped_add_subtract_full(left, top, top_left),
		_ => clamped_add_subtract_half(left, top, top_left),
	}
}

/// Summed per-channel residual magnitude, counting wrap-around as distance.
#[inline]
fn residual_error(actual: Pixel, predicted: Pixel) -> u64 {
	let diff = sub_pixels(actual, predicted);
	(0..4)
		.map(|i| {
			let v = u64::from((diff >> (i * 8)) as u8);
			v.min(256 - v)
		})
		.sum()
}

/// Picks the cheapest predictor per tile and replaces pixels with residuals.
///
/// Returns the mode image at `ceil(size / 2^bits)` resolution. Border pixels
/// follow the fixed wire-format rules: black at the origin, left across the
/// first row, top down the first column.
pub(crate) fn predictor_transform(
	pixels: &mut [Pixel],
	width: u32,
	height: u32,
	bits: u32,
) -> Vec<Pixel> {
	let w = width as usize;
	let h = height as usize;
	let orig = pixels.to_vec();
	let tiles_x = sub_sample_size(width, bits) as usize;
	let tiles_y = sub_sample_size(height, bits) as usize;
	let tile_size = 1usize << bits;
	let mut modes = vec![0u8; tiles_x * tiles_y];

	for tile_y in 0..tiles_y {
		for tile_x in 0..tiles_x {
			let x0 = (tile_x * tile_size).max(1);
			let y0 = (tile_y * tile_size).max(1);
			let x1 = ((tile_x + 1) * tile_size).min(w);
			let y1 = ((tile_y + 1) * tile_size).min(h);
			let mut best_mode = 0u8;
			let mut best_err = u64::MAX;
			for mode in 0..NUM_PREDICTOR_MODES as u8 {
				let mut err = 0u64;
				for y in y0..y1 {
					for x in x0..x1 {
						let idx = y * w + x;
						let pred = predict(
							mode,
							orig[idx - 1],
							orig[idx - w],
							orig[idx - w - 1],
							orig[idx - w + 1],
						);
						err += residual_error(orig[idx], pred);
					}
				}
				if err < best_err {
					best_err = err;
					best_mode = mode;
				}
			}
			modes[tile_y * tiles_x + tile_x] = best_mode;
		}
	}

	for y in 0..h {
		for x in 0..w {
			let idx = y * w + x;
			let pred = if x == 0 && y == 0 {
				ARGB_BLACK
			} else if y == 0 {
				orig[idx - 1]
			} else if x == 0 {
				orig[idx - w]
			} else {
				let mode = modes[(y >> bits) * tiles_x + (x >> bits)];
				predict(mode, orig[idx - 1], orig[idx - w], orig[idx - w - 1], orig[idx - w + 1])
			};
			pixels[idx] = sub_pixels(orig[idx], pred);
		}
	}

	modes
		.into_iter()
		.map(|mode| ARGB_BLACK | (u32::from(mode) << 8))
		.collect()
}

/// Per-tile signed multipliers of the cross-color transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Multipliers {
	green_to_red: i8,
	green_to_blue: i8,
	red_to_blue: i8,
}

#[inline]
fn color_transform_delta(multiplier: i8, channel: i8) -> i32 {
	(i32::from(multiplier) * i32::from(channel)) >> 5
}

#[inline]
fn transformed_red(pix: Pixel, green_to_red: i8) -> u8 {
	let delta = color_transform_delta(green_to_red, pixel::green(pix) as i8);
	(i32::from(pixel::red(pix)) - delta) as u8
}

#[inline]
fn transformed_blue(pix: Pixel, m: Multipliers) -> u8 {
	let delta = color_transform_delta(m.green_to_blue, pixel::green(pix) as i8)
		+ color_transform_delta(m.red_to_blue, pixel::red(pix) as i8);
	(i32::from(pixel::blue(pix)) - delta) as u8
}

#[inline]
fn wrap_error(v: u8) -> u64 {
	let v = u64::from(v);
	v.min(256 - v)
}

const DESCENT_SCALES: [i32; 6] = [32, 16, 8, 4, 2, 1];

/// Fits the three multipliers per tile, applies the transform in place and
/// returns the multiplier image.
pub(crate) fn cross_color_transform(
	pixels: &mut [Pixel],
	width: u32,
	height: u32,
	bits: u32,
) -> Vec<Pixel> {
	let w = width as usize;
	let h = height as usize;
	let tiles_x = sub_sample_size(width, bits) as usize;
	let tiles_y = sub_sample_size(height, bits) as usize;
	let tile_size = 1usize << bits;
	let mut data = Vec::with_capacity(tiles_x * tiles_y);

	for tile_y in 0..tiles_y {
		for tile_x in 0..tiles_x {
			let x0 = tile_x * tile_size;
			let y0 = tile_y * tile_size;
			let x1 = (x0 + tile_size).min(w);
			let y1 = (y0 + tile_size).min(h);
			let tile: Vec<usize> = (y0..y1)
				.flat_map(|y| (x0..x1).map(move |x| y * w + x))
				.collect();

			let red_err = |m: i32| -> u64 {
				tile.iter()
					.map(|&i| wrap_error(transformed_red(pixels[i], m as i8)))
					.sum()
			};
			let mut green_to_red = 0i32;
			let mut best = red_err(0);
			for scale in DESCENT_SCALES {
				for candidate in [green_to_red - scale, green_to_red + scale] {
					if (-128..=127).contains(&candidate) {
						let err = red_err(candidate);
						if err < best {
							best = err;
							green_to_red = candidate;
						}
					}
				}
			}

			let blue_err = |gb: i32, rb: i32| -> u64 {
				let m = Multipliers {
					green_to_red: 0,
					green_to_blue: gb as i8,
					red_to_blue: rb as i8,
				};
				tile.iter().map(|&i| wrap_error(transformed_blue(pixels[i], m))).sum()
			};
			let mut green_to_blue = 0i32;
			let mut red_to_blue = 0i32;
			let mut best = blue_err(0, 0);
			for _ in 0..2 {
				for scale in DESCENT_SCALES {
					let moves = [
						(green_to_blue - scale, red_to_blue),
						(green_to_blue + scale, red_to_blue),
						(green_to_blue, red_to_blue - scale),
						(green_to_blue, red_to_blue + scale),
					];
					for (gb, rb) in moves {
						if (-128..=127).contains(&gb) && (-128..=127).contains(&rb) {
							let err = blue_err(gb, rb);
							if err < best {
								best = err;
								green_to_blue = gb;
								red_to_blue = rb;
							}
						}
					}
				}
			}

			let multipliers = Multipliers {
				green_to_red: green_to_red as i8,
				green_to_blue: green_to_blue as i8,
				red_to_blue: red_to_blue as i8,
			};
			for &i in &tile {
				let pix = pixels[i];
				let red = transformed_red(pix, multipliers.green_to_red);
				let blue = transformed_blue(pix, multipliers);
				pixels[i] =
					(pix & 0xff00_ff00) | (u32::from(red) << 16) | u32::from(blue);
			}
			data.push(
				ARGB_BLACK
					| (u32::from(multipliers.red_to_blue as u8) << 16)
					| (u32::from(multipliers.green_to_blue as u8) << 8)
					| u32::from(multipliers.green_to_red as u8),
			);
		}
	}
	data
}
