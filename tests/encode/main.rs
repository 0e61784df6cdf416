//! Facade smoke tests: the root crate re-exports the full codec API.

use vp8l_rs::{Encoder, EncoderOptions, PaletteMap3D, RgbaImage};

#[test]
fn encode_through_the_facade() {
	let rgba: Vec<u8> = (0..16u32 * 16).flat_map(|i| [(i % 4) as u8 * 60, 80, 10, 255]).collect();
	let image = RgbaImage::new(&rgba, 16, 16).unwrap();
	let webp = Encoder::new(EncoderOptions::default()).encode_to_vec(&image).unwrap();
	assert_eq!(&webp[0..4], b"RIFF");
	assert_eq!(&webp[12..16], b"VP8L");

	let decoded = image::load_from_memory(&webp).unwrap().to_rgba8();
	assert_eq!(decoded.as_raw().as_slice(), rgba.as_slice());
}

#[test]
fn palette_map_is_reachable() {
	let palette = [0xff00_0000u32, 0xffff_ffff];
	let map = PaletteMap3D::new(&palette);
	assert_eq!(map.get_match(0xff00_0000).0, 0);
	assert_eq!(map.get_match(0xffff_ffff).0, 1);
}
