//! Top-level decode orchestration: drives the chunk state machine, then
//! wires together the zlib joiner, filter engine, and unpacker.

use crate::chunk::{expect_exact_length, ChunkIter};
use crate::error::{PngError, PngResult};
use crate::header::Ihdr;
use crate::palette::{Palette, Transparency};
use crate::zlib;

/// A fully decoded image: dense row-major RGBA8, `pixels.len() == width *
/// height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
  /// Image width in pixels.
  pub width: u32,
  /// Image height in pixels.
  pub height: u32,
  /// `width * height * 4` bytes, row-major, RGBA8.
  pub pixels: Vec<u8>,
}

/// Tunables for [`decode`].
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
  /// Number of rayon workers to use for the unpack step. `1` disables the
  /// parallel driver even when the `parallel` feature is enabled.
  pub threads: usize,
}

impl Default for DecodeOptions {
  fn default() -> Self {
    Self {
      #[cfg(feature = "parallel")]
      threads: rayon::current_num_threads(),
      #[cfg(not(feature = "parallel"))]
      threads: 1,
    }
  }
}

#[derive(Default)]
struct Accumulator<'b> {
  ihdr: Option<Ihdr>,
  palette: Option<Palette>,
  trns: Option<Transparency>,
  idat_bodies: Vec<&'b [u8]>,
  seen_idat: bool,
}

/// Decodes a PNG byte stream into a dense RGBA8 image.
pub fn decode(bytes: &[u8]) -> PngResult<DecodedImage> {
  decode_with_options(bytes, &DecodeOptions::default())
}

/// Like [`decode`], but with explicit [`DecodeOptions`].
pub fn decode_with_options(bytes: &[u8], options: &DecodeOptions) -> PngResult<DecodedImage> {
  let mut iter = ChunkIter::new(bytes)?;
  let mut acc: Accumulator<'_> = Accumulator::default();
  let mut first_chunk = true;

  while let Some(chunk) = iter.next_chunk()? {
    if first_chunk {
      first_chunk = false;
      if &chunk.chunk_type != b"IHDR" {
        return Err(PngError::BadHeader("first chunk must be IHDR"));
      }
    }
    match &chunk.chunk_type {
      b"IHDR" => {
        if acc.ihdr.is_some() {
          return Err(PngError::BadHeader("duplicate IHDR"));
        }
        let ihdr = Ihdr::parse(chunk.data)?;
        crate::trace!("IHDR: {ihdr:?}");
        if ihdr.interlace_method != 0 {
          return Err(PngError::UnsupportedInterlace);
        }
        acc.ihdr = Some(ihdr);
      }
      b"PLTE" => {
        let ihdr = acc.ihdr.as_ref().ok_or(PngError::BadHeader("PLTE before IHDR"))?;
        if acc.palette.is_some() {
          return Err(PngError::DuplicatePalette);
        }
        if acc.seen_idat {
          return Err(PngError::PaletteAfterData);
        }
        acc.palette = Some(Palette::parse(chunk.data, ihdr.color_type)?);
      }
      b"tRNS" => {
        let ihdr = acc.ihdr.as_ref().ok_or(PngError::BadHeader("tRNS before IHDR"))?;
        if acc.trns.is_some() {
          return Err(PngError::BadTransparency("duplicate tRNS chunk"));
        }
        acc.trns = Some(Transparency::parse(chunk.data, ihdr.color_type, acc.palette.is_some())?);
      }
      b"IDAT" => {
        acc.seen_idat = true;
        acc.idat_bodies.push(chunk.data);
      }
      b"IEND" => break,
      _ => {
        // Unknown/ancillary chunk: consumed but ignored, per §4.9.
      }
    }
  }

  let ihdr = acc.ihdr.ok_or(PngError::BadHeader("missing IHDR"))?;
  if ihdr.color_type == crate::header::ColorType::Indexed && acc.palette.is_none() {
    return Err(PngError::MissingPalette);
  }
  if acc.idat_bodies.is_empty() {
    return Err(PngError::MissingData);
  }

  let expected_len = ihdr.filter_line_bytes() * ihdr.height as usize;
  let filtered = zlib::join_and_inflate(&acc.idat_bodies, expected_len)?;
  expect_exact_length(expected_len, filtered.len())?;

  let pixels = unpack_to_rgba(&ihdr, &filtered, acc.palette.as_ref(), acc.trns.as_ref(), options)?;

  Ok(DecodedImage { width: ihdr.width, height: ihdr.height, pixels })
}

fn unpack_to_rgba(
  ihdr: &Ihdr,
  filtered: &[u8],
  palette: Option<&Palette>,
  trns: Option<&Transparency>,
  options: &DecodeOptions,
) -> PngResult<Vec<u8>> {
  #[cfg(feature = "parallel")]
  {
    crate::parallel::stripe_rows(ihdr, filtered, palette, trns, options.threads)
  }
  #[cfg(not(feature = "parallel"))]
  {
    let _ = options;
    let raw = crate::filter::unfilter_rows(ihdr, filtered)?;
    crate::unpack::unpack_image(ihdr, &raw, palette, trns)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chunk::write_chunk;

  fn minimal_png(ihdr_body: &[u8], idat: &[u8], extra_chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let mut bytes = crate::chunk::PNG_SIGNATURE.to_vec();
    write_chunk(&mut bytes, b"IHDR", ihdr_body);
    for (chunk_type, data) in extra_chunks {
      write_chunk(&mut bytes, chunk_type, data);
    }
    write_chunk(&mut bytes, b"IDAT", idat);
    write_chunk(&mut bytes, b"IEND", &[]);
    bytes
  }

  fn ihdr_body(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Vec<u8> {
    let mut v = Vec::with_capacity(13);
    v.extend_from_slice(&width.to_be_bytes());
    v.extend_from_slice(&height.to_be_bytes());
    v.push(bit_depth);
    v.push(color_type);
    v.extend_from_slice(&[0, 0, 0]);
    v
  }

  #[test]
  fn decodes_a_single_opaque_red_pixel() {
    let raw_row = [0u8, 255, 0, 0, 255]; // filter None, R=255 G=0 B=0 A=255
    let idat = zlib::wrap_and_deflate(&raw_row, zlib::DEFAULT_COMPRESSION_LEVEL);
    let png = minimal_png(&ihdr_body(1, 1, 8, 6), &idat, &[]);
    let img = decode(&png).unwrap();
    assert_eq!(img.width, 1);
    assert_eq!(img.height, 1);
    assert_eq!(img.pixels, vec![255, 0, 0, 255]);
  }

  #[test]
  fn rejects_interlaced_streams() {
    let mut body = ihdr_body(1, 1, 8, 6);
    body[12] = 1; // interlace = Adam7
    let idat = zlib::wrap_and_deflate(&[0, 0, 0, 0, 0], zlib::DEFAULT_COMPRESSION_LEVEL);
    let png = minimal_png(&body, &idat, &[]);
    assert!(matches!(decode(&png), Err(PngError::UnsupportedInterlace)));
  }

  #[test]
  fn missing_idat_fails() {
    let mut bytes = crate::chunk::PNG_SIGNATURE.to_vec();
    write_chunk(&mut bytes, b"IHDR", &ihdr_body(1, 1, 8, 6));
    write_chunk(&mut bytes, b"IEND", &[]);
    assert!(matches!(decode(&bytes), Err(PngError::MissingData)));
  }

  #[test]
  fn indexed_without_palette_fails() {
    let idat = zlib::wrap_and_deflate(&[0, 0], zlib::DEFAULT_COMPRESSION_LEVEL);
    let png = minimal_png(&ihdr_body(1, 1, 8, 3), &idat, &[]);
    assert!(matches!(decode(&png), Err(PngError::MissingPalette)));
  }

  #[test]
  fn rejects_ancillary_chunk_before_ihdr() {
    let mut bytes = crate::chunk::PNG_SIGNATURE.to_vec();
    write_chunk(&mut bytes, b"tEXt", b"hello");
    write_chunk(&mut bytes, b"IHDR", &ihdr_body(1, 1, 8, 6));
    write_chunk(&mut bytes, b"IEND", &[]);
    assert!(matches!(decode(&bytes), Err(PngError::BadHeader(_))));
  }

  #[test]
  fn rejects_idat_before_ihdr() {
    let raw_row = [0u8, 1, 2, 3, 4];
    let idat = zlib::wrap_and_deflate(&raw_row, zlib::DEFAULT_COMPRESSION_LEVEL);
    let mut bytes = crate::chunk::PNG_SIGNATURE.to_vec();
    write_chunk(&mut bytes, b"IDAT", &idat);
    write_chunk(&mut bytes, b"IHDR", &ihdr_body(1, 1, 8, 6));
    write_chunk(&mut bytes, b"IEND", &[]);
    assert!(matches!(decode(&bytes), Err(PngError::BadHeader(_))));
  }

  #[test]
  fn rejects_duplicate_trns() {
    let raw_row = [0u8, 1]; // filter None, one gray sample
    let idat = zlib::wrap_and_deflate(&raw_row, zlib::DEFAULT_COMPRESSION_LEVEL);
    let trns = [0u8, 0];
    let png = minimal_png(&ihdr_body(1, 1, 8, 0), &idat, &[(b"tRNS", &trns), (b"tRNS", &trns)]);
    assert!(matches!(decode(&png), Err(PngError::BadTransparency(_))));
  }

  #[test]
  fn skips_unknown_ancillary_chunks() {
    let raw_row = [0u8, 1, 2, 3, 4];
    let idat = zlib::wrap_and_deflate(&raw_row, zlib::DEFAULT_COMPRESSION_LEVEL);
    let png = minimal_png(&ihdr_body(1, 1, 8, 6), &idat, &[(b"tEXt", b"hello")]);
    let img = decode(&png).unwrap();
    assert_eq!(img.pixels, vec![1, 2, 3, 4]);
  }
}
