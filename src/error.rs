//! Error type for the whole crate.

use thiserror::Error;

/// The result type used throughout this crate.
pub type PngResult<T> = Result<T, PngError>;

/// Everything that can go wrong while decoding or encoding a PNG.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PngError {
  /// The first 8 bytes of the input are not the PNG signature.
  #[error("input does not start with the PNG signature")]
  BadSignature,

  /// The input ended in the middle of a chunk or a fixed-size field.
  #[error("input ended before the expected data was read")]
  Truncated,

  /// A typed chunk parser consumed a different number of bytes than the
  /// chunk's declared length.
  #[error("chunk declared {declared} bytes but the parser consumed {consumed}")]
  ChunkLengthMismatch {
    /// bytes the chunk length field promised
    declared: usize,
    /// bytes actually consumed while parsing the body
    consumed: usize,
  },

  /// IHDR failed validation (zero dimensions, or an illegal color
  /// type/bit-depth pairing).
  #[error("invalid IHDR: {0}")]
  BadHeader(&'static str),

  /// PLTE failed validation.
  #[error("invalid PLTE: {0}")]
  BadPalette(&'static str),

  /// An Indexed image had no PLTE chunk by the time the image was finalized.
  #[error("indexed color type requires a PLTE chunk")]
  MissingPalette,

  /// No IDAT chunk was seen before IEND/EOF.
  #[error("no IDAT chunk present")]
  MissingData,

  /// tRNS was present for a color type that forbids it, or an indexed tRNS
  /// chunk appeared before any PLTE.
  #[error("invalid tRNS: {0}")]
  BadTransparency(&'static str),

  /// A scanline's filter-type byte was not in `0..=4`.
  #[error("unrecognized filter type byte {0}")]
  BadFilter(u8),

  /// A (color_type, bit_depth) pairing is not supported by the unpack/pack
  /// path being used.
  #[error("unsupported bit depth {bit_depth} for this operation")]
  BadBitDepth {
    /// the offending bit depth
    bit_depth: u8,
  },

  /// The encoder was asked for a color type it does not implement.
  #[error("unsupported color type for encoding")]
  UnsupportedColorType,

  /// The encoder or decoder was asked to do something it has no code path
  /// for (e.g. a fixed filter index was required but not supplied).
  #[error("unsupported mode: {0}")]
  UnsupportedMode(&'static str),

  /// `interlace != 0`; Adam7 is not implemented.
  #[error("interlaced PNGs are not supported")]
  UnsupportedInterlace,

  /// A second PLTE chunk appeared.
  #[error("duplicate PLTE chunk")]
  DuplicatePalette,

  /// A PLTE chunk appeared after the first IDAT.
  #[error("PLTE chunk appeared after IDAT")]
  PaletteAfterData,

  /// The indexed encoder could not find a palette entry (direct or via the
  /// nearest-color reduction mapping) for a source pixel.
  #[error("no palette entry (direct or reduced) for the requested color")]
  PaletteMiss,

  /// `miniz_oxide` failed to inflate the joined IDAT stream.
  #[error("zlib inflate failed: {0}")]
  Inflate(String),

  /// `miniz_oxide` failed to deflate the filtered scanlines.
  #[error("zlib deflate failed: {0}")]
  Deflate(String),

  /// `rayon::ThreadPoolBuilder::build` failed (e.g. zero threads requested
  /// on a platform that rejects it).
  #[error("failed to build the rayon thread pool: {0}")]
  ThreadPoolBuild(String),
}
