//! Error types for VP8L encoding.

use thiserror::Error;

/// Errors that can occur while encoding a VP8L stream.
#[derive(Debug, Error)]
pub enum EncodeError {
	/// Image dimensions exceed what the 14-bit header fields can carry
	#[error("image dimensions {width}x{height} exceed the VP8L limit of {limit}x{limit}")]
	TooLarge {
		/// Width of the rejected image
		width: u32,
		/// Height of the rejected image
		height: u32,
		/// First dimension value that is no longer representable
		limit: u32,
	},

	/// Width or height is zero
	#[error("image has zero width or height")]
	EmptyImage,

	/// Pixel buffer does not match the declared dimensions
	#[error("pixel buffer holds {actual} bytes, expected {expected}")]
	BufferSize {
		/// Byte count implied by width, height and pixel format
		expected: usize,
		/// Byte count actually supplied
		actual: usize,
	},

	/// Writing to the output sink failed
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
