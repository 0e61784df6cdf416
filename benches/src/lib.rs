//! Benchmark helpers: deterministic synthetic images for the encoder.
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

/// Generates an RGBA gradient with mild spatial structure.
pub fn gradient_rgba(width: u32, height: u32) -> Vec<u8> {
	let mut rgba = Vec::with_capacity((width * height * 4) as usize);
	for y in 0..height {
		for x in 0..width {
			rgba.extend_from_slice(&[
				(x * 255 / width.max(1)) as u8,
				(y * 255 / height.max(1)) as u8,
				((x + y) % 256) as u8,
				255,
			]);
		}
	}
	rgba
}

/// Generates hash noise; incompressible content exercising the literal path.
pub fn noise_rgba(width: u32, height: u32) -> Vec<u8> {
	let mut state = 0x9e37_79b9u32;
	let mut rgba = Vec::with_capacity((width * height * 4) as usize);
	for _ in 0..width * height {
		state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
		rgba.extend_from_slice(&[(state >> 24) as u8, (state >> 16) as u8, (state >> 8) as u8, 255]);
	}
	rgba
}

/// Generates a dithered image over a 12-color palette.
pub fn palette_rgba(width: u32, height: u32) -> Vec<u8> {
	const COLORS: [[u8; 4]; 12] = [
		[0, 0, 0, 255], [255, 255, 255, 255], [200, 30, 30, 255], [30, 200, 30, 255],
		[30, 30, 200, 255], [200, 200, 30, 255], [30, 200, 200, 255], [200, 30, 200, 255],
		[120, 60, 0, 255], [0, 60, 120, 255], [90, 90, 90, 255], [170, 170, 170, 255],
	];
	let mut rgba = Vec::with_capacity((width * height * 4) as usize);
	for y in 0..height {
		for x in 0..width {
			rgba.extend_from_slice(&COLORS[((x * 7 + y * 3) % 12) as usize]);
		}
	}
	rgba
}

/// Common benchmark sizes.
pub mod sizes {
	/// Tiny image: 64x64.
	pub const TINY: (u32, u32) = (64, 64);
	/// Small image: 256x256.
	pub const SMALL: (u32, u32) = (256, 256);
	/// Medium image: 512x512.
	pub const MEDIUM: (u32, u32) = (512, 512);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generators_fill_the_buffer() {
		assert_eq!(gradient_rgba(8, 4).len(), 8 * 4 * 4);
		assert_eq!(noise_rgba(5, 5).len(), 100);
		assert_eq!(palette_rgba(3, 3).len(), 36);
	}
}
