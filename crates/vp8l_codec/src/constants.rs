//! Constants of the VP8L bit stream format.

/// Number of plain literal codes in the green/literal alphabet.
pub(crate) const NUM_LITERAL_CODES: usize = 256;

/// Number of length prefix codes following the literals.
pub(crate) const NUM_LENGTH_CODES: usize = 24;

/// Size of the distance prefix code alphabet.
pub(crate) const NUM_DISTANCE_CODES: usize = 40;

/// Alphabet size of the code-length code used to transmit Huffman trees.
pub(crate) const CODE_LENGTH_CODES: usize = 19;

/// Depth limit for the five content trees of an entropy image.
pub(crate) const MAX_CODE_LENGTH: u8 = 15;

/// Depth limit for the code-length tree.
pub(crate) const MAX_CODE_LENGTH_TREE_DEPTH: u8 = 7;

/// Largest supported color cache, in address bits.
pub(crate) const MAX_COLOR_CACHE_BITS: u32 = 10;

/// Multiplier hashing a packed pixel into cache and chain buckets.
pub(crate) const HASH_MULTIPLIER: u32 = 0x1e35_a7bd;

/// Address bits of the hash chain bucket table.
pub(crate) const HASH_BITS: u32 = 18;

/// Longest backward-reference copy expressible by the length prefix codes.
pub(crate) const MAX_MATCH_LENGTH: usize = 4096;

/// Shortest copy worth emitting instead of literals.
pub(crate) const MIN_MATCH_LENGTH: usize = 3;

/// Largest usable copy distance; beyond it the prefix code would overflow.
pub(crate) const WINDOW_SIZE: usize = (1 << 20) - 120;

/// Width and height must stay below this limit (14-bit header fields).
pub(crate) const MAX_DIMENSION: u32 = 16384;

/// Largest number of colors an indexed image can carry.
pub(crate) const MAX_PALETTE_SIZE: usize = 256;

/// Cap on the number of tiles of the entropy (meta Huffman) image.
pub(crate) const MAX_HUFF_IMAGE_SIZE: u32 = 2600;

/// Valid range of the entropy image subsampling exponent.
pub(crate) const MIN_HUFFMAN_BITS: u32 = 2;
pub(crate) const MAX_HUFFMAN_BITS: u32 = 9;

/// Transform type tags as they appear in the stream.
pub(crate) const TRANSFORM_PREDICTOR: u32 = 0;
pub(crate) const TRANSFORM_CROSS_COLOR: u32 = 1;
pub(crate) const TRANSFORM_SUBTRACT_GREEN: u32 = 2;
pub(crate) const TRANSFORM_COLOR_INDEXING: u32 = 3;

/// Opaque black, the implicit predictor of the top-left pixel.
pub(crate) const ARGB_BLACK: u32 = 0xff00_0000;

/// Number of spatial predictor modes.
pub(crate) const NUM_PREDICTOR_MODES: usize = 14;
