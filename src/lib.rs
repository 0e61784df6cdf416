//! `vp8l-rs` encodes raster images into the lossless WebP (VP8L) format.
//!
//! The actual codec lives in the `vp8l_codec` crate; this facade re-exports
//! its public API so applications only need a single dependency.
//!
//! ```rust
//! use vp8l_rs::{Encoder, EncoderOptions, RgbaImage};
//!
//! let pixels = vec![0u8; 4 * 4 * 4]; // 4x4, RGBA
//! let image = RgbaImage::new(&pixels, 4, 4).unwrap();
//! let webp = Encoder::new(EncoderOptions::default()).encode_to_vec(&image).unwrap();
//! assert_eq!(&webp[..4], b"RIFF");
//! ```

pub use vp8l_codec::*;
