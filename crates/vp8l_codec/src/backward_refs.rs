//! LZ77 backward-reference search over the pixel stream.
//!
//! Three flavors produce token streams: a greedy longest-match search, a
//! run-length variant, and a cost-model variant scoring candidates against a
//! preliminary histogram. Distances are kept raw while searching and mapped
//! to the 2-D locality plane codes once a stream is final.

use log::trace;

use crate::constants::{
	HASH_MULTIPLIER, MAX_MATCH_LENGTH, MIN_MATCH_LENGTH, WINDOW_SIZE,
};
use crate::hash_chain::HashChain;
use crate::histogram::Histogram;
use crate::pixel::{self, Pixel};
use crate::utils::prefix_encode;

/// Bit set: greedy longest-match search.
pub(crate) const LZ77_STANDARD: u32 = 1;
/// Bit set: run-length search.
pub(crate) const LZ77_RLE: u32 = 2;
/// Bit set: cost-model search seeded by a preliminary histogram.
pub(crate) const LZ77_BOX: u32 = 4;

/// Offsets reachable through the short distance codes, in code order.
const DISTANCE_MAP: [(i8, i8); 120] = [
	(0, 1), (1, 0), (1, 1), (-1, 1), (0, 2), (2, 0), (1, 2), (-1, 2),
	(2, 1), (-2, 1), (2, 2), (-2, 2), (0, 3), (3, 0), (1, 3), (-1, 3),
	(3, 1), (-3, 1), (2, 3), (-2, 3), (3, 2), (-3, 2), (0, 4), (4, 0),
	(1, 4), (-1, 4), (4, 1), (-4, 1), (3, 3), (-3, 3), (2, 4), (-2, 4),
	(4, 2), (-4, 2), (0, 5), (3, 4), (-3, 4), (4, 3), (-4, 3), (5, 0),
	(1, 5), (-1, 5), (5, 1), (-5, 1), (2, 5), (-2, 5), (5, 2), (-5, 2),
	(4, 4), (-4, 4), (3, 5), (-3, 5), (5, 3), (-5, 3), (0, 6), (6, 0),
	(1, 6), (-1, 6), (6, 1), (-6, 1), (2, 6), (-2, 6), (6, 2), (-6, 2),
	(4, 5), (-4, 5), (5, 4), (-5, 4), (3, 6), (-3, 6), (6, 3), (-6, 3),
	(0, 7), (7, 0), (1, 7), (-1, 7), (5, 5), (-5, 5), (7, 1), (-7, 1),
	(4, 6), (-4, 6), (6, 4), (-6, 4), (2, 7), (-2, 7), (7, 2), (-7, 2),
	(3, 7), (-3, 7), (7, 3), (-7, 3), (5, 6), (-5, 6), (6, 5), (-6, 5),
	(8, 0), (4, 7), (-4, 7), (7, 4), (-7, 4), (8, 1), (8, 2), (6, 6),
	(-6, 6), (8, 3), (5, 7), (-5, 7), (7, 5), (-7, 5), (8, 4), (6, 7),
	(-6, 7), (7, 6), (-7, 6), (8, 5), (7, 7), (-7, 7), (8, 6), (8, 7),
];

/// `plane_codes[dy][dx + 8]` is the 1-based short code of offset `(dx, dy)`.
const PLANE_CODES: [[u8; 17]; 8] = build_plane_codes();

const fn build_plane_codes() -> [[u8; 17]; 8] {
	let mut table = [[0u8; 17]; 8];
	let mut i = 0;
	while i < DISTANCE_MAP.len() {
		let (dx, dy) = DISTANCE_MAP[i];
		table[dy as usize][(dx + 8) as usize] = (i + 1) as u8;
		i += 1;
	}
	table
}

/// One backward-reference token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PixOrCopy {
	/// A verbatim pixel.
	Literal(Pixel),
	/// An index into the color cache.
	CacheIdx(u16),
	/// Copy `len` pixels from `dist` pixels back.
	Copy { len: u16, dist: u32 },
}

impl PixOrCopy {
	/// Pixels produced by this token.
	#[inline]
	pub(crate) fn length(self) -> usize {
		match self {
			PixOrCopy::Literal(_) | PixOrCopy::CacheIdx(_) => 1,
			PixOrCopy::Copy { len, .. } => usize::from(len),
		}
	}
}

/// An ordered token stream covering `width * height` pixels.
#[derive(Debug, Clone, Default)]
pub(crate) struct BackwardRefs {
	pub(crate) tokens: Vec<PixOrCopy>,
}

impl BackwardRefs {
	/// Sum of token lengths; equals the pixel count of the source stream.
	pub(crate) fn length_sum(&self) -> usize {
		self.tokens.iter().map(|t| t.length()).sum()
	}
}

/// Hash-addressed ring of recently seen colors.
///
/// Slots start zeroed on both encoder and decoder sides, so a hit on a
/// never-written slot holding pixel 0 is still consistent.
#[derive(Debug, Clone)]
pub(crate) struct ColorCache {
	bits: u32,
	colors: Vec<Pixel>,
}

impl ColorCache {
	pub(crate) fn new(bits: u32) -> Self {
		debug_assert!(bits > 0);
		Self { bits, colors: vec![0; 1 << bits] }
	}

	#[inline]
	pub(crate) fn index_of(&self, pixel: Pixel) -> u16 {
		(pixel.wrapping_mul(HASH_MULTIPLIER) >> (32 - self.bits)) as u16
	}

	#[inline]
	pub(crate) fn contains(&self, pixel: Pixel) -> bool {
		self.colors[usize::from(self.index_of(pixel))] == pixel
	}

	#[inline]
	pub(crate) fn insert(&mut self, pixel: Pixel) {
		let index = self.index_of(pixel);
		self.colors[usize::from(index)] = pixel;
	}
}

#[inline]
fn match_length(pixels: &[Pixel], earlier: usize, later: usize, max_len: usize) -> usize {
	let mut len = 0;
	while len < max_len && pixels[earlier + len] == pixels[later + len] {
		len += 1;
	}
	len
}

fn max_iters_for_quality(quality: u8) -> u32 {
	8 + u32::from(quality) * u32::from(quality) / 40
}

fn window_size_for_quality(quality: u8, xsize: u32) -> usize {
	let max = if quality > 75 {
		WINDOW_SIZE
	} else if quality > 50 {
		(xsize as usize) << 8
	} else if quality > 25 {
		(xsize as usize) << 6
	} else {
		(xsize as usize) << 4
	};
	max.min(WINDOW_SIZE)
}

/// Greedy longest-match search; nearest match wins among equal lengths.
pub(crate) fn refs_standard(
	pixels: &[Pixel],
	chain: &HashChain,
	quality: u8,
	xsize: u32,
) -> BackwardRefs {
	let window = window_size_for_quality(quality, xsize);
	let max_iters = max_iters_for_quality(quality);
	let mut refs = BackwardRefs::default();
	let mut i = 0;
	while i < pixels.len() {
		let max_len = MAX_MATCH_LENGTH.min(pixels.len() - i);
		let mut best_len = 0;
		let mut best_dist = 0;
		for candidate in chain.candidates(i, window, max_iters) {
			let len = match_length(pixels, candidate, i, max_len);
			if len > best_len {
				best_len = len;
				best_dist = i - candidate;
				if best_len == max_len {
					break;
				}
			}
		}
		if best_len >= MIN_MATCH_LENGTH {
			refs.tokens.push(PixOrCopy::Copy {
				len: best_len as u16,
				dist: best_dist as u32,
			});
			i += best_len;
		} else {
			refs.tokens.push(PixOrCopy::Literal(pixels[i]));
			i += 1;
		}
	}
	refs
}

/// Run-length search: only distance-1 and previous-row copies.
pub(crate) fn refs_rle(pixels: &[Pixel], xsize: u32) -> BackwardRefs {
	let mut refs = BackwardRefs::default();
	if pixels.is_empty() {
		return refs;
	}
	refs.tokens.push(PixOrCopy::Literal(pixels[0]));
	let xsize = xsize as usize;
	let mut i = 1;
	while i < pixels.len() {
		let max_len = MAX_MATCH_LENGTH.min(pixels.len() - i);
		let run = match_length(pixels, i - 1, i, max_len);
		let above = if i >= xsize {
			match_length(pixels, i - xsize, i, max_len)
		} else {
			0
		};
		if run >= above && run >= MIN_MATCH_LENGTH {
			refs.tokens.push(PixOrCopy::Copy { len: run as u16, dist: 1 });
			i += run;
		} else if above >= MIN_MATCH_LENGTH {
			refs.tokens.push(PixOrCopy::Copy {
				len: above as u16,
				dist: xsize as u32,
			});
			i += above;
		} else {
			refs.tokens.push(PixOrCopy::Literal(pixels[i]));
			i += 1;
		}
	}
	refs
}

/// Per-symbol bit costs derived from a preliminary token histogram.
struct CostModel {
	green: Vec<f64>,
	red: Vec<f64>,
	blue: Vec<f64>,
	alpha: Vec<f64>,
	distance: Vec<f64>,
}

impl CostModel {
	fn from_histogram(histogram: &Histogram) -> Self {
		Self {
			green: symbol_costs(histogram.literal()),
			red: symbol_costs(histogram.red()),
			blue: symbol_costs(histogram.blue()),
			alpha: symbol_costs(histogram.alpha()),
			distance: symbol_costs(histogram.distance()),
		}
	}

	fn literal_cost(&self, pixel: Pixel) -> f64 {
		self.green[usize::from(pixel::green(pixel))]
			+ self.red[usize::from(pixel::red(pixel))]
			+ self.blue[usize::from(pixel::blue(pixel))]
			+ self.alpha[usize::from(pixel::alpha(pixel))]
	}

	fn copy_cost(&self, len: usize, dist: usize) -> f64 {
		let length = prefix_encode(len as u32);
		let distance = prefix_encode(dist as u32);
		self.green[256 + length.code]
			+ f64::from(length.extra_bits)
			+ self.distance[distance.code]
			+ f64::from(distance.extra_bits)
	}
}

fn symbol_costs(counts: &[u32]) -> Vec<f64> {
	let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
	let log_total = crate::utils::fast_log2(total.max(1));
	counts
		.iter()
		.map(|&c| {
			if c == 0 {
				// unseen symbols are possible but expensive
				log_total + 10.0
			} else {
				log_total - crate::utils::fast_log2(u64::from(c))
			}
		})
		.collect()
}

/// Cost-model search: candidates are scored in estimated bits per pixel
/// against emitting the current pixel as a literal.
pub(crate) fn refs_box(
	pixels: &[Pixel],
	chain: &HashChain,
	quality: u8,
	xsize: u32,
	seed: &BackwardRefs,
) -> BackwardRefs {
	let seed_histogram = Histogram::from_refs(seed, 0);
	let model = CostModel::from_histogram(&seed_histogram);
	let window = window_size_for_quality(quality, xsize);
	let max_iters = max_iters_for_quality(quality);
	let mut refs = BackwardRefs::default();
	let mut i = 0;
	while i < pixels.len() {
		let max_len = MAX_MATCH_LENGTH.min(pixels.len() - i);
		let mut best: Option<(usize, usize, f64)> = None;
		for candidate in chain.candidates(i, window, max_iters) {
			let len = match_length(pixels, candidate, i, max_len);
			if len < MIN_MATCH_LENGTH {
				continue;
			}
			let dist = i - candidate;
			let per_pixel = model.copy_cost(len, dist) / len as f64;
			if best.is_none_or(|(_, _, cost)| per_pixel < cost) {
				best = Some((len, dist, per_pixel));
			}
		}
		match best {
			Some((len, dist, per_pixel)) if per_pixel < model.literal_cost(pixels[i]) => {
				refs.tokens.push(PixOrCopy::Copy {
					len: len as u16,
					dist: dist as u32,
				});
				i += len;
			}
			_ => {
				refs.tokens.push(PixOrCopy::Literal(pixels[i]));
				i += 1;
			}
		}
	}
	refs
}

/// Maps a raw distance to its wire value: a short 2-D locality code when the
/// offset is in the neighborhood map, otherwise `dist + 120`.
pub(crate) fn distance_to_plane_code(xsize: u32, dist: u32) -> u32 {
	let xsize = i64::from(xsize);
	let dist = i64::from(dist);
	let yoffset = dist / xsize;
	let xoffset = dist - yoffset * xsize;
	if xoffset <= 8 && yoffset < 8 {
		let code = PLANE_CODES[yoffset as usize][(xoffset + 8) as usize];
		if code != 0 {
			return u32::from(code);
		}
	} else if xoffset > xsize - 8 && yoffset < 7 {
		let code = PLANE_CODES[(yoffset + 1) as usize][(xoffset - xsize + 8) as usize];
		if code != 0 {
			return u32::from(code);
		}
	}
	(dist + 120) as u32
}

/// Rewrites every copy distance into its plane code. Done once, after the
/// final token stream is chosen.
pub(crate) fn apply_plane_codes(refs: &mut BackwardRefs, xsize: u32) {
	for token in &mut refs.tokens {
		if let PixOrCopy::Copy { dist, .. } = token {
			*dist = distance_to_plane_code(xsize, *dist);
		}
	}
}

/// Rewrites literals as cache references where the cache holds the color,
/// mirroring the decoder cache state pixel by pixel.
pub(crate) fn apply_color_cache(
	refs: &BackwardRefs,
	pixels: &[Pixel],
	cache_bits: u32,
) -> BackwardRefs {
	debug_assert!(cache_bits > 0);
	let mut cache = ColorCache::new(cache_bits);
	let mut out = BackwardRefs {
		tokens: Vec::with_capacity(refs.tokens.len()),
	};
	let mut pos = 0usize;
	for &token in &refs.tokens {
		match token {
			PixOrCopy::Literal(pix) => {
				if cache.contains(pix) {
					out.tokens.push(PixOrCopy::CacheIdx(cache.index_of(pix)));
				} else {
					out.tokens.push(token);
				}
				cache.insert(pix);
				pos += 1;
			}
			PixOrCopy::Copy { len, .. } => {
				for &covered in &pixels[pos..pos + usize::from(len)] {
					cache.insert(covered);
				}
				out.tokens.push(token);
				pos += usize::from(len);
			}
			PixOrCopy::CacheIdx(_) => debug_assert!(false, "input refs must be cacheless"),
		}
	}
	out
}

/// Simulates every cache size over `refs` and returns the one with the
/// smallest estimated bit count. `refs` must be cacheless.
pub(crate) fn best_cache_bits(pixels: &[Pixel], refs: &BackwardRefs, max_bits: u32) -> u32 {
	if max_bits == 0 {
		return 0;
	}
	let mut histograms: Vec<Histogram> =
		(0..=max_bits).map(Histogram::new).collect();
	let mut caches: Vec<ColorCache> = (1..=max_bits).map(ColorCache::new).collect();
	let mut pos = 0usize;
	for &token in &refs.tokens {
		match token {
			PixOrCopy::Literal(pix) => {
				histograms[0].add_token(token);
				for (cache, histogram) in caches.iter_mut().zip(histograms[1..].iter_mut()) {
					if cache.contains(pix) {
						histogram.add_token(PixOrCopy::CacheIdx(cache.index_of(pix)));
					} else {
						cache.insert(pix);
						histogram.add_token(token);
					}
				}
				pos += 1;
			}
			PixOrCopy::Copy { len, .. } => {
				for histogram in &mut histograms {
					histogram.add_token(token);
				}
				for &covered in &pixels[pos..pos + usize::from(len)] {
					for cache in &mut caches {
						cache.insert(covered);
					}
				}
				pos += usize::from(len);
			}
			PixOrCopy::CacheIdx(_) => debug_assert!(false, "input refs must be cacheless"),
		}
	}
	let mut best_bits = 0;
	let mut best_cost = f64::MAX;
	for (bits, histogram) in histograms.iter().enumerate() {
		let cost = histogram.estimate_bits();
		if cost < best_cost {
			best_cost = cost;
			best_bits = bits as u32;
		}
	}
	best_bits
}

/// Runs the requested search flavors and keeps the stream with the smallest
/// estimated bit count. Distances stay raw; callers map plane codes last.
pub(crate) fn get_backward_references(
	pixels: &[Pixel],
	chain: &HashChain,
	quality: u8,
	xsize: u32,
	lz77_types: u32,
) -> BackwardRefs {
	let mut best: Option<(f64, BackwardRefs)> = None;
	let mut consider = |name: &str, refs: BackwardRefs| {
		let cost = Histogram::from_refs(&refs, 0).estimate_bits();
		trace!("lz77 {name}: {} tokens, {cost:.0} estimated bits", refs.tokens.len());
		match &best {
			Some((best_cost, _)) if *best_cost <= cost => {}
			_ => best = Some((cost, refs)),
		}
	};
	let standard = (lz77_types & (LZ77_STANDARD | LZ77_BOX) != 0)
		.then(|| refs_standard(pixels, chain, quality, xsize));
	if lz77_types & LZ77_BOX != 0 {
		let seed = standard.clone().unwrap_or_default();
		consider("box", refs_box(pixels, chain, quality, xsize, &seed));
	}
	if lz77_types & LZ77_STANDARD != 0 {
		if let Some(refs) = standard {
			consider("standard", refs);
		}
	}
	if lz77_types & LZ77_RLE != 0 {
		consider("rle", refs_rle(pixels, xsize));
	}
	best.map(|(_, refs)| refs).unwrap_or_default()
}
