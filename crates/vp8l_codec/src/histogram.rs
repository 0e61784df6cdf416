//! Symbol frequency accounting and entropy estimation.
//!
//! A histogram tracks the five VP8L symbol populations of a token stream.
//! Costs are estimated in bits: a refined Shannon term plus a streak-based
//! estimate of what transmitting the Huffman code itself costs. Tile
//! histograms are greedily clustered into meta-code groups whenever merging
//! is estimated to be no worse than standing alone.

use crate::backward_refs::{BackwardRefs, PixOrCopy};
use crate::constants::{NUM_DISTANCE_CODES, NUM_LENGTH_CODES, NUM_LITERAL_CODES};
use crate::pixel;
use crate::utils::{fast_slog2, prefix_encode, sub_sample_size};

/// Symbol populations of one meta-code group.
#[derive(Debug, Clone)]
pub(crate) struct Histogram {
	literal: Vec<u32>,
	red: Vec<u32>,
	blue: Vec<u32>,
	alpha: Vec<u32>,
	distance: Vec<u32>,
	cache_bits: u32,
}

impl Histogram {
	/// An empty histogram for streams using `cache_bits` of color cache.
	pub(crate) fn new(cache_bits: u32) -> Self {
		let literal_size = NUM_LITERAL_CODES
			+ NUM_LENGTH_CODES
			+ if cache_bits > 0 { 1 << cache_bits } else { 0 };
		Self {
			literal: vec![0; literal_size],
			red: vec![0; 256],
			blue: vec![0; 256],
			alpha: vec![0; 256],
			distance: vec![0; NUM_DISTANCE_CODES],
			cache_bits,
		}
	}

	/// Accumulates a whole token stream.
	pub(crate) fn from_refs(refs: &BackwardRefs, cache_bits: u32) -> Self {
		let mut histogram = Self::new(cache_bits);
		for &token in &refs.tokens {
			histogram.add_token(token);
		}
		histogram
	}

	/// Counts one token.
	#[inline]
	pub(crate) fn add_token(&mut self, token: PixOrCopy) {
		match token {
			PixOrCopy::Literal(pix) => {
				self.literal[usize::from(pixel::green(pix))] += 1;
				self.red[usize::from(pixel::red(pix))] += 1;
				self.blue[usize::from(pixel::blue(pix))] += 1;
				self.alpha[usize::from(pixel::alpha(pix))] += 1;
			}
			PixOrCopy::CacheIdx(index) => {
				self.literal[NUM_LITERAL_CODES + NUM_LENGTH_CODES + usize::from(index)] += 1;
			}
			PixOrCopy::Copy { len, dist } => {
				self.literal[NUM_LITERAL_CODES + prefix_encode(u32::from(len)).code] += 1;
				self.distance[prefix_encode(dist).code] += 1;
			}
		}
	}

	/// Merges another histogram of the same shape into this one.
	pub(crate) fn add(&mut self, other: &Histogram) {
		debug_assert_eq!(self.cache_bits, other.cache_bits);
		for (a, b) in self.literal.iter_mut().zip(&other.literal) {
			*a += b;
		}
		for (a, b) in self.red.iter_mut().zip(&other.red) {
			*a += b;
		}
		for (a, b) in self.blue.iter_mut().zip(&other.blue) {
			*a += b;
		}
		for (a, b) in self.alpha.iter_mut().zip(&other.alpha) {
			*a += b;
		}
		for (a, b) in self.distance.iter_mut().zip(&other.distance) {
			*a += b;
		}
	}

	pub(crate) fn literal(&self) -> &[u32] {
		&self.literal
	}

	pub(crate) fn red(&self) -> &[u32] {
		&self.red
	}

	pub(crate) fn blue(&self) -> &[u32] {
		&self.blue
	}

	pub(crate) fn alpha(&self) -> &[u32] {
		&self.alpha
	}

	pub(crate) fn distance(&self) -> &[u32] {
		&self.distance
	}

	/// Estimated bits to code the stream and transmit the five trees.
	pub(crate) fn estimate_bits(&self) -> f64 {
		population_cost(&self.literal, None)
			+ population_cost(&self.red, None)
			+ population_cost(&self.blue, None)
			+ population_cost(&self.alpha, None)
			+ population_cost(&self.distance, None)
			+ extra_cost(&self.literal[NUM_LITERAL_CODES..NUM_LITERAL_CODES + NUM_LENGTH_CODES], None)
			+ extra_cost(&self.distance, None)
	}

	/// Estimated bits if `self` and `other` were coded as one group.
	fn estimate_bits_combined(&self, other: &Histogram) -> f64 {
		population_cost(&self.literal, Some(&other.literal))
			+ population_cost(&self.red, Some(&other.red))
			+ population_cost(&self.blue, Some(&other.blue))
			+ population_cost(&self.alpha, Some(&other.alpha))
			+ population_cost(&self.distance, Some(&other.distance))
			+ extra_cost(
				&self.literal[NUM_LITERAL_CODES..NUM_LITERAL_CODES + NUM_LENGTH_CODES],
				Some(&other.literal[NUM_LITERAL_CODES..NUM_LITERAL_CODES + NUM_LENGTH_CODES]),
			)
			+ extra_cost(&self.distance, Some(&other.distance))
	}
}

#[derive(Debug, Default)]
struct BitEntropy {
	entropy: f64,
	sum: u64,
	nonzeros: u32,
	max_val: u32,
}

#[derive(Debug, Default)]
struct Streaks {
	// [is_nonzero] -> number of runs longer than three
	counts: [u64; 2],
	// [is_nonzero][run > 3] -> total length of such runs
	streaks: [[u64; 2]; 2],
}

fn gather_stats(population: &[u32], other: Option<&[u32]>) -> (BitEntropy, Streaks) {
	let mut entropy = BitEntropy::default();
	let mut streaks = Streaks::default();
	let get = |i: usize| population[i] + other.map_or(0, |o| o[i]);
	let mut run_value = get(0);
	let mut run_start = 0usize;
	for i in 1..=population.len() {
		let value = if i < population.len() { get(i) } else { !run_value };
		if value == run_value {
			continue;
		}
		let streak = (i - run_start) as u64;
		if run_value != 0 {
			entropy.sum += u64::from(run_value) * streak;
			entropy.nonzeros += streak as u32;
			entropy.entropy -= fast_slog2(u64::from(run_value)) * streak as f64;
			entropy.max_val = entropy.max_val.max(run_value);
		}
		let nonzero = usize::from(run_value != 0);
		let long = usize::from(streak > 3);
		streaks.counts[nonzero] += u64::from(streak > 3);
		streaks.streaks[nonzero][long] += streak;
		run_value = value;
		run_start = i;
	}
	entropy.entropy += fast_slog2(entropy.sum);
	(entropy, streaks)
}

fn bits_entropy_refine(entropy: &BitEntropy) -> f64 {
	let mix = if entropy.nonzeros < 5 {
		match entropy.nonzeros {
			0 | 1 => return 0.0,
			2 => return 0.99 * entropy.sum as f64 + 0.01 * entropy.entropy,
			3 => 0.95,
			_ => 0.7,
		}
	} else {
		0.627
	};
	let min_limit = 2.0 * entropy.sum as f64 - f64::from(entropy.max_val);
	let min_limit = mix * min_limit + (1.0 - mix) * entropy.entropy;
	entropy.entropy.max(min_limit)
}

/// Refined entropy of a population in bits per stream.
pub(crate) fn bits_entropy(population: &[u32]) -> f64 {
	let (entropy, _) = gather_stats(population, None);
	bits_entropy_refine(&entropy)
}

fn final_huffman_cost(streaks: &Streaks) -> f64 {
	// Baseline: the code-length code lengths, minus a small bias. The streak
	// coefficients penalize histograms whose count runs make a complex tree.
	let mut cost = 57.0 - 9.1;
	cost += streaks.counts[0] as f64 * 1.5625 + 0.234375 * streaks.streaks[0][1] as f64;
	cost += streaks.counts[1] as f64 * 2.578125 + 0.703125 * streaks.streaks[1][1] as f64;
	cost += 1.796875 * streaks.streaks[0][0] as f64;
	cost += 3.28125 * streaks.streaks[1][0] as f64;
	cost
}

fn population_cost(population: &[u32], other: Option<&[u32]>) -> f64 {
	let (entropy, streaks) = gather_stats(population, other);
	bits_entropy_refine(&entropy) + final_huffman_cost(&streaks)
}

/// Extra bits following length or distance prefix symbols.
fn extra_cost(population: &[u32], other: Option<&[u32]>) -> f64 {
	let mut cost = 0.0;
	for i in 2..population.len().saturating_sub(2) {
		let count = population[i + 2] + other.map_or(0, |o| o[i + 2]);
		cost += ((i >> 1) as f64) * f64::from(count);
	}
	cost
}

/// Accumulates one histogram per `2^histo_bits` square tile.
pub(crate) fn build_tile_histograms(
	refs: &BackwardRefs,
	xsize: u32,
	ysize: u32,
	histo_bits: u32,
	cache_bits: u32,
) -> Vec<Histogram> {
	let tiles_x = sub_sample_size(xsize, histo_bits);
	let tiles_y = sub_sample_size(ysize, histo_bits);
	let mut histograms = vec![Histogram::new(cache_bits); (tiles_x * tiles_y) as usize];
	let mut x = 0u32;
	let mut y = 0u32;
	for &token in &refs.tokens {
		let tile = ((y >> histo_bits) * tiles_x + (x >> histo_bits)) as usize;
		histograms[tile].add_token(token);
		x += token.length() as u32;
		while x >= xsize {
			x -= xsize;
			y += 1;
		}
	}
	histograms
}

/// Greedily merges tile histograms into meta-code groups.
///
/// Returns the groups and a per-tile map into them. A tile joins the group
/// with the smallest combined-cost delta unless a fresh group is cheaper.
pub(crate) fn cluster_histograms(tiles: Vec<Histogram>) -> (Vec<Histogram>, Vec<u16>) {
	let mut clusters: Vec<Histogram> = Vec::new();
	let mut cluster_costs: Vec<f64> = Vec::new();
	let mut symbols = Vec::with_capacity(tiles.len());
	for tile in tiles {
		let alone = tile.estimate_bits();
		let mut best: Option<(f64, f64, usize)> = None;
		for (index, cluster) in clusters.iter().enumerate() {
			let combined = cluster.estimate_bits_combined(&tile);
			let delta = combined - cluster_costs[index];
			if best.is_none_or(|(best_delta, _, _)| delta < best_delta) {
				best = Some((delta, combined, index));
			}
		}
		match best {
			Some((delta, combined, index)) if delta <= alone => {
				clusters[index].add(&tile);
				cluster_costs[index] = combined;
				symbols.push(index as u16);
			}
			_ => {
				symbols.push(clusters.len() as u16);
				clusters.push(tile);
				cluster_costs.push(alone);
			}
		}
	}
	(clusters, symbols)
}
