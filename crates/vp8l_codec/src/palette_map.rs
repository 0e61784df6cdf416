//! 3-D RGB lookup table for constant-time nearest-palette-index queries.
//!
//! The RGB cube is quantized to a 32x64x32 grid (5/6/5 bits). Construction
//! seeds each palette entry into its cell, then grows cubes of increasing
//! radius around every entry until all 65536 cells are claimed; queries are
//! a single table read.

use crate::pixel::{self, Pixel};

const R_BITS: u32 = 5;
const G_BITS: u32 = 6;
const B_BITS: u32 = 5;
const R_VAL: i32 = 1 << R_BITS;
const G_VAL: i32 = 1 << G_BITS;
const B_VAL: i32 = 1 << B_BITS;
const MAP_LEN: usize = (R_VAL * G_VAL * B_VAL) as usize;

#[inline]
const fn cell_index(r: i32, g: i32, b: i32) -> usize {
	(b * R_VAL * G_VAL + g * R_VAL + r) as usize
}

/// Immutable map from quantized RGB cells to palette indices.
#[derive(Debug, Clone)]
pub struct PaletteMap3D {
	matches: Vec<u8>,
	palette: Vec<Pixel>,
}

impl PaletteMap3D {
	/// Builds the map for `palette` (1 to 256 entries).
	///
	/// Deterministic: cells contested between entries belong to the lowest
	/// index seeded first, and flood fills claim cells first-writer-wins in
	/// entry order.
	pub fn new(palette: &[Pixel]) -> Self {
		assert!(!palette.is_empty() && palette.len() <= 256);
		let mut matches = vec![0u8; MAP_LEN];
		let mut taken = vec![false; MAP_LEN];
		let mut shares_cell = vec![false; palette.len()];
		let mut remaining = MAP_LEN;

		let cell_of = |color: Pixel| {
			(
				i32::from(pixel::red(color) >> (8 - R_BITS)),
				i32::from(pixel::green(color) >> (8 - G_BITS)),
				i32::from(pixel::blue(color) >> (8 - B_BITS)),
			)
		};

		for (index, &color) in palette.iter().enumerate() {
			let (r, g, b) = cell_of(color);
			let cell = cell_index(r, g, b);
			if taken[cell] {
				// the earlier occupant stops flooding; this entry takes over
				shares_cell[usize::from(matches[cell])] = true;
			} else {
				taken[cell] = true;
				matches[cell] = index as u8;
				remaining -= 1;
			}
		}

		let mut claim = |taken: &mut [bool], r: i32, g: i32, b: i32, index: u8| -> usize {
			if r < 0 || r >= R_VAL || g < 0 || g >= G_VAL || b < 0 || b >= B_VAL {
				return 0;
			}
			let cell = cell_index(r, g, b);
			if taken[cell] {
				return 0;
			}
			taken[cell] = true;
			matches[cell] = index;
			1
		};

		let mut sqstep = 1i32;
		while remaining > 0 && sqstep <= R_VAL.max(G_VAL) {
			for (index, &color) in palette.iter().enumerate() {
				if shares_cell[index] {
					continue;
				}
				let (r0, g0, b0) = cell_of(color);
				let index = index as u8;
				for b in [b0 - sqstep, b0 + sqstep] {
					for g in g0 - sqstep..=g0 + sqstep {
						for r in r0 - sqstep..=r0 + sqstep {
							remaining -= claim(&mut taken, r, g, b, index);
						}
					}
				}
				for g in [g0 - sqstep, g0 + sqstep] {
					for b in b0 - sqstep..=b0 + sqstep {
						for r in r0 - sqstep..=r0 + sqstep {
							remaining -= claim(&mut taken, r, g, b, index);
						}
					}
				}
				for r in [r0 - sqstep, r0 + sqstep] {
					for b in b0 - sqstep..=b0 + sqstep {
						for g in g0 - sqstep..=g0 + sqstep {
							remaining -= claim(&mut taken, r, g, b, index);
						}
					}
				}
			}
			sqstep += 1;
		}
		debug_assert_eq!(remaining, 0);

		Self {
			matches,
			palette: palette.to_vec(),
		}
	}

	/// Returns the palette index nearest to `pixel` and the palette color
	/// stored there. O(1).
	pub fn get_match(&self, pixel: Pixel) -> (u8, Pixel) {
		let r = i32::from(pixel::red(pixel) >> (8 - R_BITS));
		let g = i32::from(pixel::green(pixel) >> (8 - G_BITS));
		let b = i32::from(pixel::blue(pixel) >> (8 - B_BITS));
		let index = self.matches[cell_index(r, g, b)];
		(index, self.palette[usize::from(index)])
	}
}
