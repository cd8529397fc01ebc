//! The zlib container that wraps the concatenated `IDAT` payload.
//!
//! PNG's compressed data is a single zlib stream (RFC 1950), split across
//! one or more `IDAT` chunks with no relationship between chunk boundaries
//! and DEFLATE block boundaries. This module handles only that framing; the
//! DEFLATE codec itself is delegated to `miniz_oxide`.

use crate::checksum::adler32;
use crate::error::{PngError, PngResult};

/// Default compression level passed to `miniz_oxide`'s DEFLATE encoder.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

/// The fixed zlib header this crate always emits: CM=8 (deflate), CINFO=7
/// (32K window), no preset dictionary.
pub const ZLIB_HEADER: [u8; 2] = [0x78, 0x01];

/// Concatenates every `IDAT` body (in chunk order) and inflates the zlib
/// stream to `expected_len` bytes of filtered scanline data.
///
/// Neither the zlib header's FCHECK bits nor the trailing Adler-32 are
/// verified here, matching this crate's general leniency about checksums
/// on the decode path.
pub fn join_and_inflate(idat_bodies: &[&[u8]], expected_len: usize) -> PngResult<Vec<u8>> {
  let total_len: usize = idat_bodies.iter().map(|b| b.len()).sum();
  let mut joined = Vec::with_capacity(total_len);
  for body in idat_bodies {
    joined.extend_from_slice(body);
  }
  if joined.len() < 6 {
    return Err(PngError::Inflate("IDAT stream is too short to hold a zlib header and trailer".to_string()));
  }
  let mut out = miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(&joined, expected_len)
    .map_err(|e| PngError::Inflate(format!("{e:?}")))?;
  if out.len() < expected_len {
    return Err(PngError::Truncated);
  }
  out.truncate(expected_len);
  Ok(out)
}

/// Wraps `filtered` (the filtered scanline bytes) in a zlib stream: the
/// fixed header above, a raw DEFLATE body, and a trailing big-endian
/// Adler-32 of `filtered` itself (the pre-deflate bytes, per RFC 1950).
#[must_use]
pub fn wrap_and_deflate(filtered: &[u8], level: u8) -> Vec<u8> {
  let mut out = Vec::with_capacity(filtered.len() / 2 + 16);
  out.extend_from_slice(&ZLIB_HEADER);
  out.extend_from_slice(&miniz_oxide::deflate::compress_to_vec(filtered, level));
  out.extend_from_slice(&adler32(filtered).to_be_bytes());
  out
}
