//! Lossless WebP (VP8L) encoding for the `vp8l-rs` project.
//!
//! The crate compresses a rectangular raster of packed 32-bit BGRA pixels
//! into a complete RIFF/WebP byte stream using the VP8L lossless format:
//! entropy analysis picks a transform set, spatial and color transforms turn
//! pixels into residuals, an LZ77 pass over the pixel stream produces
//! backward references, and canonical Huffman codes serialize everything
//! through a little-endian bit writer.
//!
//! # Examples
//!
//! ```rust
//! use vp8l_codec::{Encoder, EncoderOptions, RgbaImage};
//!
//! let pixels: Vec<u8> = (0..16u32).flat_map(|i| [i as u8 * 16, 0, 0, 255]).collect();
//! let image = RgbaImage::new(&pixels, 16, 1).unwrap();
//! let webp = Encoder::new(EncoderOptions::default()).encode_to_vec(&image).unwrap();
//! assert_eq!(&webp[8..12], b"WEBP");
//! ```

pub mod bit_sink;
pub mod encoder;
pub mod error;
pub mod palette_map;
pub mod pixel;
pub mod utils;

mod backward_refs;
mod constants;
mod hash_chain;
mod histogram;
mod huffman;
mod palette;
mod transforms;

// Re-export the common entry points at crate root for convenience
pub use bit_sink::BitSink;
pub use encoder::{Encoder, EncoderOptions, PixelSource, RgbaImage};
pub use error::EncodeError;
pub use palette_map::PaletteMap3D;
pub use pixel::Pixel;
