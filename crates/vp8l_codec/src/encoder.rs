//! The VP8L encoding pipeline and its public entry points.
//!
//! `encode` converts the source to packed BGRA, analyzes which entropy
//! regime fits (plain, spatially predicted, green-subtracted, indexed), then
//! speculatively serializes one bit stream per crunch configuration and
//! keeps the smallest before framing it into a RIFF/WebP container.

use std::io::Write;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::backward_refs::{
	BackwardRefs, LZ77_BOX, LZ77_RLE, LZ77_STANDARD, PixOrCopy, apply_color_cache,
	apply_plane_codes, best_cache_bits, get_backward_references,
};
use crate::bit_sink::BitSink;
use crate::constants::{
	MAX_COLOR_CACHE_BITS, MAX_DIMENSION, MAX_HUFF_IMAGE_SIZE, MAX_HUFFMAN_BITS, MAX_CODE_LENGTH,
	MIN_HUFFMAN_BITS, NUM_LENGTH_CODES, NUM_LITERAL_CODES, NUM_PREDICTOR_MODES,
	TRANSFORM_COLOR_INDEXING, TRANSFORM_CROSS_COLOR, TRANSFORM_PREDICTOR,
	TRANSFORM_SUBTRACT_GREEN,
};
use crate::error::EncodeError;
use crate::hash_chain::HashChain;
use crate::histogram::{Histogram, bits_entropy, build_tile_histograms, cluster_histograms};
use crate::huffman::{HuffmanTreeCode, store_huffman_code};
use crate::palette::Palette;
use crate::pixel::{self, Pixel, pack_bgra, sub_pixels};
use crate::transforms::{apply_subtract_green, cross_color_transform, predictor_transform};
use crate::utils::{bits_log2_floor, fast_log2, prefix_encode, sub_sample_size};

/// Encoder tuning knobs.
///
/// `quality` trades effort for density in `0..=100`; `method` selects how
/// many speculative configurations are evaluated in `0..=6`. The defaults
/// match the fixed profile the encoder was tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderOptions {
	/// Compression effort, `0..=100`.
	pub quality: u8,
	/// Crunch breadth, `0..=6`.
	pub method: u8,
}

impl Default for EncoderOptions {
	fn default() -> Self {
		Self { quality: 75, method: 4 }
	}
}

/// Read-only, row-indexed pixel supplier.
///
/// Implementations convert whatever their storage format is into packed
/// BGRA words (`b | g << 8 | r << 16 | a << 24`).
pub trait PixelSource {
	/// Image width in pixels.
	fn width(&self) -> u32;
	/// Image height in pixels.
	fn height(&self) -> u32;
	/// Fills `row` (of `width` entries) with packed pixels of scanline `y`.
	fn read_row(&self, y: u32, row: &mut [Pixel]);
}

/// Borrowing [`PixelSource`] over an 8-bit RGBA buffer.
#[derive(Debug, Clone, Copy)]
pub struct RgbaImage<'a> {
	data: &'a [u8],
	width: u32,
	height: u32,
}

impl<'a> RgbaImage<'a> {
	/// Wraps `data` (`width * height * 4` bytes, RGBA order).
	pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, EncodeError> {
		let expected = width as usize * height as usize * 4;
		if data.len() != expected {
			return Err(EncodeError::BufferSize { expected, actual: data.len() });
		}
		Ok(Self { data, width, height })
	}
}

impl PixelSource for RgbaImage<'_> {
	fn width(&self) -> u32 {
		self.width
	}

	fn height(&self) -> u32 {
		self.height
	}

	fn read_row(&self, y: u32, row: &mut [Pixel]) {
		let offset = y as usize * self.width as usize * 4;
		for (pix, rgba) in row.iter_mut().zip(self.data[offset..].chunks_exact(4)) {
			*pix = pack_bgra(rgba[2], rgba[1], rgba[0], rgba[3]);
		}
	}
}

/// Entropy regimes a crunch configuration can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntropyMode {
	Direct,
	Spatial,
	SubGreen,
	SpatialSubGreen,
	Palette,
	PaletteAndSpatial,
}

impl EntropyMode {
	fn uses_palette(self) -> bool {
		matches!(self, EntropyMode::Palette | EntropyMode::PaletteAndSpatial)
	}

	fn uses_predictor(self) -> bool {
		matches!(
			self,
			EntropyMode::Spatial | EntropyMode::SpatialSubGreen | EntropyMode::PaletteAndSpatial
		)
	}

	fn uses_subtract_green(self) -> bool {
		matches!(self, EntropyMode::SubGreen | EntropyMode::SpatialSubGreen)
	}
}

#[derive(Debug, Clone, Copy)]
struct SubConfig {
	lz77: u32,
	do_not_cache: bool,
}

#[derive(Debug, Clone)]
struct CrunchConfig {
	mode: EntropyMode,
	subs: Vec<SubConfig>,
}

#[derive(Debug, Clone, Copy)]
enum CacheMode {
	/// Simulate every cache size and keep the best.
	Auto,
	/// Use exactly this many bits (palette streams).
	Fixed(u32),
}

/// The lossless encoder. Cheap to construct; all buffers live per call.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
	options: EncoderOptions,
}

impl Encoder {
	/// Creates an encoder, clamping options into their valid ranges.
	pub fn new(options: EncoderOptions) -> Self {
		Self {
			options: EncoderOptions {
				quality: options.quality.min(100),
				method: options.method.min(6),
			},
		}
	}

	/// Encodes `source` and writes the complete RIFF/WebP file to `out`.
	pub fn encode<S: PixelSource, W: Write>(
		&self,
		source: &S,
		out: &mut W,
	) -> Result<(), EncodeError> {
		let width = source.width();
		let height = source.height();
		if width == 0 || height == 0 {
			return Err(EncodeError::EmptyImage);
		}
		if width >= MAX_DIMENSION || height >= MAX_DIMENSION {
			return Err(EncodeError::TooLarge { width, height, limit: MAX_DIMENSION });
		}

		let w = width as usize;
		let mut bgra = vec![0u32; w * height as usize];
		for y in 0..height {
			source.read_row(y, &mut bgra[y as usize * w..(y as usize + 1) * w]);
		}

		let body = self.encode_stream(&bgra, width, height);

		let vp8l_size = body.len() + 1; // signature byte + bit stream
		let pad = vp8l_size & 1;
		let riff_size = 12 + vp8l_size + pad;
		out.write_all(b"RIFF")?;
		out.write_all(&(riff_size as u32).to_le_bytes())?;
		out.write_all(b"WEBP")?;
		out.write_all(b"VP8L")?;
		out.write_all(&(vp8l_size as u32).to_le_bytes())?;
		out.write_all(&[0x2f])?;
		out.write_all(&body)?;
		if pad == 1 {
			out.write_all(&[0x00])?;
		}
		Ok(())
	}

	/// Encodes `source` into a freshly allocated buffer.
	pub fn encode_to_vec<S: PixelSource>(&self, source: &S) -> Result<Vec<u8>, EncodeError> {
		let mut out = Vec::new();
		self.encode(source, &mut out)?;
		Ok(out)
	}

	/// Serializes the VP8L bit stream (everything after the signature byte).
	fn encode_stream(&self, bgra: &[Pixel], width: u32, height: u32) -> Vec<u8> {
		let quality = self.options.quality;
		let method = self.options.method;

		let palette = Palette::analyze(bgra);
		let use_palette = palette.is_some();
		let palette_len = palette.as_ref().map_or(0, Palette::len);
		let histo_bits = choose_histo_bits(method, use_palette, width, height);
		let transform_bits = choose_transform_bits(method, histo_bits);
		let (mode, red_and_blue_always_zero) =
			analyze_entropy(bgra, width, height, use_palette, palette_len, transform_bits);
		debug!(
			"analysis: {mode:?}, palette {palette_len}, histo bits {histo_bits}, \
			 transform bits {transform_bits}"
		);

		let configs = crunch_configs(self.options, palette.as_ref(), mode);

		let has_alpha = bgra.iter().any(|&p| pixel::alpha(p) != 0xff);
		let mut header = BitSink::with_capacity(bgra.len() * 2);
		header.put_bits(width - 1, 14);
		header.put_bits(height - 1, 14);
		header.put_bits(u32::from(has_alpha), 1);
		header.put_bits(0, 3); // version

		let mut best: Option<BitSink> = None;
		for config in &configs {
			for sub in &config.subs {
				let mut sink = header.clone();
				let mut pixels = bgra.to_vec();
				let mut cur_width = width;
				let mut cache_mode = CacheMode::Auto;

				if config.mode.uses_palette() {
					let Some(palette) = palette.as_ref() else {
						unreachable!("palette modes are only configured when a palette exists")
					};
					sink.put_bits(1, 1);
					sink.put_bits(TRANSFORM_COLOR_INDEXING, 2);
					sink.put_bits(palette.len() as u32 - 1, 8);
					encode_image_no_huffman(
						&mut sink,
						&palette.delta_encoded(),
						palette.len() as u32,
						1,
						20,
					);
					let (bundled, bundled_width) = palette.apply(&pixels, width, height);
					pixels = bundled;
					cur_width = bundled_width;
					let bits = 1 + bits_log2_floor(palette.len() as u32);
					cache_mode = CacheMode::Fixed(bits.min(MAX_COLOR_CACHE_BITS));
				}
				if config.mode.uses_subtract_green() {
					sink.put_bits(1, 1);
					sink.put_bits(TRANSFORM_SUBTRACT_GREEN, 2);
					apply_subtract_green(&mut pixels);
				}
				if config.mode.uses_predictor() {
					sink.put_bits(1, 1);
					sink.put_bits(TRANSFORM_PREDICTOR, 2);
					sink.put_bits(transform_bits - 2, 3);
					let data = predictor_transform(&mut pixels, cur_width, height, transform_bits);
					encode_image_no_huffman(
						&mut sink,
						&data,
						sub_sample_size(cur_width, transform_bits),
						sub_sample_size(height, transform_bits),
						quality,
					);
				}
				if config.mode.uses_predictor()
					&& !red_and_blue_always_zero
					&& !config.mode.uses_palette()
				{
					sink.put_bits(1, 1);
					sink.put_bits(TRANSFORM_CROSS_COLOR, 2);
					sink.put_bits(transform_bits - 2, 3);
					let data = cross_color_transform(&mut pixels, cur_width, height, transform_bits);
					encode_image_no_huffman(
						&mut sink,
						&data,
						sub_sample_size(cur_width, transform_bits),
						sub_sample_size(height, transform_bits),
						quality,
					);
				}
				sink.put_bits(0, 1); // no more transforms

				encode_image(
					&mut sink,
					&pixels,
					cur_width,
					height,
					histo_bits,
					cache_mode,
					sub.lz77,
					sub.do_not_cache,
					quality,
				);

				debug!(
					"crunch {:?}/lz77 {:#x}: {} bits",
					config.mode,
					sub.lz77,
					sink.bit_count()
				);
				match &best {
					Some(b) if b.bit_count() <= sink.bit_count() => {}
					_ => best = Some(sink),
				}
			}
		}

		let mut sink = match best {
			Some(sink) => sink,
			None => header,
		};
		sink.finish();
		sink.as_bytes().to_vec()
	}
}

fn choose_histo_bits(method: u8, use_palette: bool, width: u32, height: u32) -> u32 {
	let mut bits: i32 = if use_palette { 9 } else { 7 };
	bits -= i32::from(method);
	loop {
		let b = bits.max(0) as u32;
		let size = sub_sample_size(width, b) * sub_sample_size(height, b);
		if size <= MAX_HUFF_IMAGE_SIZE {
			break;
		}
		bits += 1;
	}
	(bits.max(0) as u32).clamp(MIN_HUFFMAN_BITS, MAX_HUFFMAN_BITS)
}

fn choose_transform_bits(method: u8, histo_bits: u32) -> u32 {
	let max = if method < 4 {
		6
	} else if method > 4 {
		4
	} else {
		5
	};
	histo_bits.min(max)
}

// Channel histogram slots used by the entropy analysis.
const H_ALPHA: usize = 0;
const H_ALPHA_PRED: usize = 1;
const H_GREEN: usize = 2;
const H_GREEN_PRED: usize = 3;
const H_RED: usize = 4;
const H_RED_PRED: usize = 5;
const H_BLUE: usize = 6;
const H_BLUE_PRED: usize = 7;
const H_RED_SUBGREEN: usize = 8;
const H_RED_PRED_SUBGREEN: usize = 9;
const H_BLUE_SUBGREEN: usize = 10;
const H_BLUE_PRED_SUBGREEN: usize = 11;
const H_PALETTE: usize = 12;
const H_TOTAL: usize = 13;

#[inline]
fn palette_hash(pix: Pixel) -> usize {
	(((u64::from(pix) + u64::from(pix >> 19)) * 0x39c5_fba7) >> 24) as usize & 0xff
}

/// Estimates which entropy regime codes the image cheapest and whether red
/// and blue vanish under it (making the cross-color transform pointless).
fn analyze_entropy(
	pixels: &[Pixel],
	width: u32,
	height: u32,
	use_palette: bool,
	palette_len: usize,
	transform_bits: u32,
) -> (EntropyMode, bool) {
	if use_palette && palette_len <= 16 {
		return (EntropyMode::Palette, true);
	}

	let w = width as usize;
	let mut histo = vec![0u32; H_TOTAL * 256];
	let mut bump = |slot: usize, value: u8| {
		histo[slot * 256 + usize::from(value)] += 1;
	};
	let mut prev_pix = pixels[0];
	for y in 0..height as usize {
		for x in 0..w {
			let idx = y * w + x;
			let pix = pixels[idx];
			let diff = sub_pixels(pix, prev_pix);
			prev_pix = pix;
			// pixels equal to their left or top neighbor are nearly free in
			// every regime; skip them so they do not drown the signal
			if diff == 0 || (y > 0 && pix == pixels[idx - w]) {
				continue;
			}
			bump(H_ALPHA, pixel::alpha(pix));
			bump(H_GREEN, pixel::green(pix));
			bump(H_RED, pixel::red(pix));
			bump(H_BLUE, pixel::blue(pix));
			bump(H_ALPHA_PRED, pixel::alpha(diff));
			bump(H_GREEN_PRED, pixel::green(diff));
			bump(H_RED_PRED, pixel::red(diff));
			bump(H_BLUE_PRED, pixel::blue(diff));
			bump(H_RED_SUBGREEN, pixel::red(pix).wrapping_sub(pixel::green(pix)));
			bump(H_BLUE_SUBGREEN, pixel::blue(pix).wrapping_sub(pixel::green(pix)));
			bump(H_RED_PRED_SUBGREEN, pixel::red(diff).wrapping_sub(pixel::green(diff)));
			bump(H_BLUE_PRED_SUBGREEN, pixel::blue(diff).wrapping_sub(pixel::green(diff)));
			bump(H_PALETTE, palette_hash(pix) as u8);
		}
	}
	// the skip rule removes zeros too eagerly; seed one into each predicted
	// histogram
	for slot in [H_ALPHA_PRED, H_GREEN_PRED, H_RED_PRED, H_BLUE_PRED, H_RED_PRED_SUBGREEN, H_BLUE_PRED_SUBGREEN] {
		histo[slot * 256] += 1;
	}

	let channel_entropy: Vec<f64> =
		(0..H_TOTAL).map(|slot| bits_entropy(&histo[slot * 256..(slot + 1) * 256])).collect();

	let tiles = f64::from(sub_sample_size(width, transform_bits))
		* f64::from(sub_sample_size(height, transform_bits));
	let mut entropy = [0.0f64; 5];
	entropy[0] = channel_entropy[H_ALPHA]
		+ channel_entropy[H_RED]
		+ channel_entropy[H_GREEN]
		+ channel_entropy[H_BLUE];
	entropy[1] = channel_entropy[H_ALPHA_PRED]
		+ channel_entropy[H_RED_PRED]
		+ channel_entropy[H_GREEN_PRED]
		+ channel_entropy[H_BLUE_PRED]
		+ tiles * fast_log2(NUM_PREDICTOR_MODES as u64);
	entropy[2] = channel_entropy[H_ALPHA]
		+ channel_entropy[H_RED_SUBGREEN]
		+ channel_entropy[H_GREEN]
		+ channel_entropy[H_BLUE_SUBGREEN];
	entropy[3] = channel_entropy[H_ALPHA_PRED]
		+ channel_entropy[H_RED_PRED_SUBGREEN]
		+ channel_entropy[H_GREEN_PRED]
		+ channel_entropy[H_BLUE_PRED_SUBGREEN]
		+ tiles * fast_log2(24);
	entropy[4] = channel_entropy[H_PALETTE] + palette_len as f64 * 8.0;

	let modes = [
		EntropyMode::Direct,
		EntropyMode::Spatial,
		EntropyMode::SubGreen,
		EntropyMode::SpatialSubGreen,
		EntropyMode::Palette,
	];
	let last = if use_palette { 4 } else { 3 };
	let mut min_ix = 0;
	for k in 1..=last {
		if entropy[k] < entropy[min_ix] {
			min_ix = k;
		}
	}

	let pairs = [
		(H_RED, H_BLUE),
		(H_RED_PRED, H_BLUE_PRED),
		(H_RED_SUBGREEN, H_BLUE_SUBGREEN),
		(H_RED_PRED_SUBGREEN, H_BLUE_PRED_SUBGREEN),
		(H_RED, H_BLUE),
	];
	let (red_slot, blue_slot) = pairs[min_ix];
	let red_and_blue_always_zero = (1..256).all(|i| {
		histo[red_slot * 256 + i] == 0 && histo[blue_slot * 256 + i] == 0
	});

	(modes[min_ix], red_and_blue_always_zero)
}

fn crunch_configs(
	options: EncoderOptions,
	palette: Option<&Palette>,
	chosen: EntropyMode,
) -> Vec<CrunchConfig> {
	let mut modes = Vec::new();
	if options.method == 6 && options.quality == 100 {
		// exhaustive sweep
		modes.extend([
			EntropyMode::Direct,
			EntropyMode::Spatial,
			EntropyMode::SubGreen,
			EntropyMode::SpatialSubGreen,
		]);
		if palette.is_some() {
			modes.push(EntropyMode::Palette);
			modes.push(EntropyMode::PaletteAndSpatial);
		}
	} else {
		modes.push(chosen);
		if options.quality >= 75 && palette.is_some() && chosen != EntropyMode::PaletteAndSpatial {
			modes.push(EntropyMode::PaletteAndSpatial);
		}
	}
	modes
		.into_iter()
		.map(|mode| {
			let mut subs = vec![SubConfig { lz77: LZ77_STANDARD | LZ77_RLE, do_not_cache: false }];
			let small_palette = palette.is_some_and(|p| p.len() <= 16);
			if mode.uses_palette() && small_palette {
				subs.push(SubConfig { lz77: LZ77_BOX, do_not_cache: true });
			}
			CrunchConfig { mode, subs }
		})
		.collect()
}

/// Serializes one entropy-coded image with meta Huffman support.
#[allow(clippy::too_many_arguments)]
fn encode_image(
	sink: &mut BitSink,
	pixels: &[Pixel],
	width: u32,
	height: u32,
	histo_bits: u32,
	cache_mode: CacheMode,
	lz77_types: u32,
	do_not_cache: bool,
	quality: u8,
) {
	let chain = HashChain::new(pixels);
	let refs_raw = get_backward_references(pixels, &chain, quality, width, lz77_types);
	let cache_bits = match cache_mode {
		CacheMode::Auto => best_cache_bits(pixels, &refs_raw, MAX_COLOR_CACHE_BITS),
		CacheMode::Fixed(bits) => bits,
	};

	let mut candidates: Vec<(u32, BackwardRefs)> = Vec::new();
	if cache_bits > 0 {
		let mut cached = apply_color_cache(&refs_raw, pixels, cache_bits);
		apply_plane_codes(&mut cached, width);
		candidates.push((cache_bits, cached));
	}
	if cache_bits == 0 || do_not_cache {
		let mut plain = refs_raw;
		apply_plane_codes(&mut plain, width);
		candidates.push((0, plain));
	}

	let mut best: Option<BitSink> = None;
	for (bits, refs) in &candidates {
		let mut trial = sink.clone();
		write_image_payload(&mut trial, refs, width, height, histo_bits, *bits, quality);
		match &best {
			Some(b) if b.bit_count() <= trial.bit_count() => {}
			_ => best = Some(trial),
		}
	}
	if let Some(winner) = best {
		*sink = winner;
	}
}

fn write_image_payload(
	sink: &mut BitSink,
	refs: &BackwardRefs,
	width: u32,
	height: u32,
	histo_bits: u32,
	cache_bits: u32,
	quality: u8,
) {
	let tiles_x = sub_sample_size(width, histo_bits);
	let tiles_y = sub_sample_size(height, histo_bits);
	let tile_histograms = build_tile_histograms(refs, width, height, histo_bits, cache_bits);
	let (histograms, symbols) = cluster_histograms(tile_histograms);

	if cache_bits > 0 {
		sink.put_bits(1, 1);
		sink.put_bits(cache_bits, 4);
	} else {
		sink.put_bits(0, 1);
	}

	let multiple = histograms.len() > 1;
	sink.put_bits(u32::from(multiple), 1);
	if multiple {
		sink.put_bits(histo_bits - 2, 3);
		let meta: Vec<Pixel> = symbols.iter().map(|&s| u32::from(s) << 8).collect();
		encode_image_no_huffman(sink, &meta, tiles_x, tiles_y, quality);
	}

	let mut code_groups: Vec<[HuffmanTreeCode; 5]> =
		histograms.iter().map(build_code_group).collect();
	for group in &mut code_groups {
		for code in group.iter_mut() {
			store_huffman_code(sink, code);
			code.clear_if_single_symbol();
		}
	}
	let selector = if multiple { symbols.as_slice() } else { &[] };
	store_image_to_bit_mask(sink, refs, width, histo_bits, selector, tiles_x, &code_groups);
}

/// Serializes an auxiliary image: single Huffman group, no color cache.
fn encode_image_no_huffman(sink: &mut BitSink, pixels: &[Pixel], width: u32, height: u32, quality: u8) {
	debug_assert_eq!(pixels.len(), width as usize * height as usize);
	let chain = HashChain::new(pixels);
	let mut refs = get_backward_references(pixels, &chain, quality, width, LZ77_STANDARD | LZ77_RLE);
	apply_plane_codes(&mut refs, width);
	let histogram = Histogram::from_refs(&refs, 0);
	let mut group = build_code_group(&histogram);
	sink.put_bits(0, 1); // no color cache
	for code in group.iter_mut() {
		store_huffman_code(sink, code);
		code.clear_if_single_symbol();
	}
	store_image_to_bit_mask(sink, &refs, width, 0, &[], 1, std::slice::from_ref(&group));
}

fn build_code_group(histogram: &Histogram) -> [HuffmanTreeCode; 5] {
	[
		HuffmanTreeCode::from_histogram(histogram.literal(), MAX_CODE_LENGTH),
		HuffmanTreeCode::from_histogram(histogram.red(), MAX_CODE_LENGTH),
		HuffmanTreeCode::from_histogram(histogram.blue(), MAX_CODE_LENGTH),
		HuffmanTreeCode::from_histogram(histogram.alpha(), MAX_CODE_LENGTH),
		HuffmanTreeCode::from_histogram(histogram.distance(), MAX_CODE_LENGTH),
	]
}

/// Emits the token stream through the per-tile code groups.
fn store_image_to_bit_mask(
	sink: &mut BitSink,
	refs: &BackwardRefs,
	width: u32,
	histo_bits: u32,
	symbols: &[u16],
	tiles_x: u32,
	code_groups: &[[HuffmanTreeCode; 5]],
) {
	let mut x = 0u32;
	let mut y = 0u32;
	for &token in &refs.tokens {
		let group = if symbols.is_empty() {
			&code_groups[0]
		} else {
			let tile = ((y >> histo_bits) * tiles_x + (x >> histo_bits)) as usize;
			&code_groups[usize::from(symbols[tile])]
		};
		match token {
			PixOrCopy::Literal(pix) => {
				group[0].write_symbol(sink, usize::from(pixel::green(pix)));
				group[1].write_symbol(sink, usize::from(pixel::red(pix)));
				group[2].write_symbol(sink, usize::from(pixel::blue(pix)));
				group[3].write_symbol(sink, usize::from(pixel::alpha(pix)));
			}
			PixOrCopy::CacheIdx(index) => {
				group[0].write_symbol(
					sink,
					NUM_LITERAL_CODES + NUM_LENGTH_CODES + usize::from(index),
				);
			}
			PixOrCopy::Copy { len, dist } => {
				let length = prefix_encode(u32::from(len));
				group[0].write_symbol(sink, NUM_LITERAL_CODES + length.code);
				sink.put_bits(length.extra_value, length.extra_bits);
				let distance = prefix_encode(dist);
				group[4].write_symbol(sink, distance.code);
				sink.put_bits(distance.extra_value, distance.extra_bits);
			}
		}
		x += token.length() as u32;
		while x >= width {
			x -= width;
			y += 1;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn encode_rgba(data: &[u8], w: u32, h: u32) -> Vec<u8> {
		let image = RgbaImage::new(data, w, h).unwrap();
		Encoder::new(EncoderOptions::default()).encode_to_vec(&image).unwrap()
	}

	fn solid_rgba(rgba: [u8; 4], w: u32, h: u32) -> Vec<u8> {
		(0..w * h).flat_map(|_| rgba).collect()
	}

	/// LSB-first reader over the VP8L body (after the 0x2f signature).
	struct BitReader<'a> {
		bytes: &'a [u8],
		pos: usize,
	}

	impl BitReader<'_> {
		fn read(&mut self, n: u32) -> u32 {
			let mut v = 0u32;
			for i in 0..n {
				let bit = (self.bytes[self.pos / 8] >> (self.pos % 8)) & 1;
				v |= u32::from(bit) << i;
				self.pos += 1;
			}
			v
		}
	}

	/// Dimension-only source; dimension checks run before any row is read.
	struct BlackSource {
		width: u32,
		height: u32,
	}

	impl PixelSource for BlackSource {
		fn width(&self) -> u32 {
			self.width
		}

		fn height(&self) -> u32 {
			self.height
		}

		fn read_row(&self, _y: u32, row: &mut [Pixel]) {
			row.fill(0xff00_0000);
		}
	}

	#[test]
	fn rejects_empty_and_oversized_images() {
		let encoder = Encoder::new(EncoderOptions::default());
		let empty = BlackSource { width: 0, height: 4 };
		assert!(matches!(encoder.encode_to_vec(&empty), Err(EncodeError::EmptyImage)));
		let too_wide = BlackSource { width: 16384, height: 1 };
		assert!(matches!(
			encoder.encode_to_vec(&too_wide),
			Err(EncodeError::TooLarge { width: 16384, .. })
		));
		assert!(matches!(
			RgbaImage::new(&[0u8; 8], 1, 1),
			Err(EncodeError::BufferSize { expected: 4, actual: 8 })
		));
	}

	#[test]
	fn container_layout_and_parity() {
		let webp = encode_rgba(&solid_rgba([1, 2, 3, 255], 7, 5), 7, 5);
		assert_eq!(&webp[0..4], b"RIFF");
		assert_eq!(&webp[8..12], b"WEBP");
		assert_eq!(&webp[12..16], b"VP8L");
		assert_eq!(webp[20], 0x2f);
		let riff_size = u32::from_le_bytes(webp[4..8].try_into().unwrap()) as usize;
		let vp8l_size = u32::from_le_bytes(webp[16..20].try_into().unwrap()) as usize;
		assert_eq!(webp.len(), 8 + riff_size);
		assert_eq!(riff_size, 12 + vp8l_size + (vp8l_size & 1));
		assert_eq!(webp.len() % 2, 0);
	}

	#[test]
	fn header_bits_carry_dimensions() {
		let webp = encode_rgba(&solid_rgba([0, 255, 0, 255], 64, 64), 64, 64);
		let mut reader = BitReader { bytes: &webp[21..], pos: 0 };
		assert_eq!(reader.read(14) + 1, 64);
		assert_eq!(reader.read(14) + 1, 64);
		assert_eq!(reader.read(1), 0); // opaque
		assert_eq!(reader.read(3), 0); // version
		// a single-color image starts with the color indexing transform
		assert_eq!(reader.read(1), 1);
		assert_eq!(reader.read(2), TRANSFORM_COLOR_INDEXING);
		assert_eq!(reader.read(8) + 1, 1); // palette of one color
	}

	#[test]
	fn alpha_hint_reflects_transparency() {
		let webp = encode_rgba(&solid_rgba([9, 9, 9, 128], 4, 4), 4, 4);
		let mut reader = BitReader { bytes: &webp[21..], pos: 0 };
		reader.read(28);
		assert_eq!(reader.read(1), 1);
	}

	#[test]
	fn solid_image_compresses_tightly() {
		let webp = encode_rgba(&solid_rgba([0, 255, 0, 255], 64, 64), 64, 64);
		assert!(webp.len() < 100, "{} bytes", webp.len());
	}

	#[test]
	fn output_is_deterministic() {
		let data: Vec<u8> = (0..32u32 * 32 * 4).map(|i| (i.wrapping_mul(2654435761)) as u8).collect();
		let a = encode_rgba(&data, 32, 32);
		let b = encode_rgba(&data, 32, 32);
		assert_eq!(a, b);
	}

	#[test]
	fn gradient_picks_a_spatial_mode() {
		let data: Vec<u8> = (0..=255u8).flat_map(|r| [r, 0, 0, 255]).collect();
		let mut bgra = vec![0u32; 256];
		RgbaImage::new(&data, 256, 1).unwrap().read_row(0, &mut bgra);
		let (mode, rb_zero) = analyze_entropy(&bgra, 256, 1, false, 0, 5);
		assert!(matches!(mode, EntropyMode::Spatial | EntropyMode::SpatialSubGreen));
		// the red deltas are a constant 1, not zero
		assert!(!rb_zero);
	}

	#[test]
	fn histo_bits_shrink_tiles_for_large_images() {
		assert_eq!(choose_histo_bits(4, false, 16, 16), 3);
		assert_eq!(choose_histo_bits(4, true, 16, 16), 5);
		// 8192x8192 at 3 bits would be a million tiles
		let bits = choose_histo_bits(4, false, 8192, 8192);
		let tiles = sub_sample_size(8192, bits) * sub_sample_size(8192, bits);
		assert!(tiles <= MAX_HUFF_IMAGE_SIZE);
		assert!(bits <= MAX_HUFFMAN_BITS);
	}

	#[test]
	fn method_six_quality_hundred_sweeps_all_modes() {
		let options = EncoderOptions { quality: 100, method: 6 };
		let configs = crunch_configs(options, None, EntropyMode::Direct);
		assert_eq!(configs.len(), 4);
	}
}
