//! Top-level encode orchestration: packs pixels, wraps them in zlib, and
//! emits a well-formed PNG chunk stream.

use crate::chunk::{write_chunk, PNG_SIGNATURE};
use crate::error::{PngError, PngResult};
use crate::header::{ColorType, Ihdr};
use crate::pack::{self, ChannelOrder, FilterStrategy};
use crate::zlib;

/// Which color type the encoder should emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputColorType {
  /// 4 channels, 8 bits each.
  Rgba8,
  /// 3 channels, 8 bits each.
  Rgb8,
  /// Indexed, palette built from the distinct colors in the source.
  Indexed8,
}

/// Tunables for [`encode`].
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
  /// Color type to emit.
  pub color_type: OutputColorType,
  /// Channel order of the *source* `pixels` buffer.
  pub channel_order: ChannelOrder,
  /// Per-row filter selection for `Rgba8`/`Rgb8` output.
  pub filter_strategy: FilterStrategy,
  /// Maximum indexed palette size (only consulted for `Indexed8`).
  pub max_palette_size: usize,
  /// Whether to fold excess colors together via nearest-color reduction
  /// when the source has more distinct colors than `max_palette_size`.
  pub reduce_unindexable_images: bool,
  /// DEFLATE compression level passed to `miniz_oxide`.
  pub compression_level: u8,
}

impl Default for EncodeOptions {
  fn default() -> Self {
    Self {
      color_type: OutputColorType::Rgba8,
      channel_order: ChannelOrder::Rgba,
      filter_strategy: FilterStrategy::Adaptive,
      max_palette_size: 256,
      reduce_unindexable_images: false,
      compression_level: zlib::DEFAULT_COMPRESSION_LEVEL,
    }
  }
}

/// Encodes an RGBA8 (or ABGR8, per `options.channel_order`) pixel buffer as
/// a PNG byte stream.
pub fn encode(pixels: &[u8], width: u32, height: u32, options: &EncodeOptions) -> PngResult<Vec<u8>> {
  if width == 0 || height == 0 {
    return Err(PngError::BadHeader("width and height must be nonzero"));
  }
  if pixels.len() != width as usize * height as usize * 4 {
    return Err(PngError::UnsupportedMode("pixel buffer length does not match width*height*4"));
  }

  let mut out = PNG_SIGNATURE.to_vec();

  match options.color_type {
    OutputColorType::Rgba8 | OutputColorType::Rgb8 => {
      let color_type = if options.color_type == OutputColorType::Rgba8 { ColorType::Rgba } else { ColorType::Rgb };
      let ihdr = Ihdr { width, height, bit_depth: 8, color_type, compression_method: 0, filter_method: 0, interlace_method: 0 };
      write_chunk(&mut out, b"IHDR", &ihdr_body(&ihdr));

      let filtered = pack::pack_direct(&ihdr, pixels, options.channel_order, options.filter_strategy)?;
      let zlib_stream = zlib::wrap_and_deflate(&filtered, options.compression_level);
      write_chunk(&mut out, b"IDAT", &zlib_stream);
    }
    OutputColorType::Indexed8 => {
      let limit = options.max_palette_size.min(256);
      let plan = pack::build_indexed_plan(pixels, limit, options.reduce_unindexable_images);
      if plan.palette.len() > limit {
        return Err(PngError::PaletteMiss);
      }
      // Informational only: `pack_indexed` always emits one full byte per
      // index regardless of how few bits would suffice, so the IHDR bit
      // depth recorded here must stay 8 to match the actual row layout.
      let _ = pack::bit_depth_for_palette_size(plan.palette.len());
      let ihdr = Ihdr { width, height, bit_depth: 8, color_type: ColorType::Indexed, compression_method: 0, filter_method: 0, interlace_method: 0 };
      write_chunk(&mut out, b"IHDR", &ihdr_body(&ihdr));

      let (filtered, plte, trns) = pack::pack_indexed(&ihdr, pixels, &plan)?;
      write_chunk(&mut out, b"PLTE", &plte_body(&plte));
      if trns.iter().any(|&a| a != 255) {
        write_chunk(&mut out, b"tRNS", &trns);
      }
      let zlib_stream = zlib::wrap_and_deflate(&filtered, options.compression_level);
      write_chunk(&mut out, b"IDAT", &zlib_stream);
    }
  }

  write_chunk(&mut out, b"IEND", &[]);
  Ok(out)
}

fn ihdr_body(ihdr: &Ihdr) -> [u8; 13] {
  let mut body = [0u8; 13];
  body[0..4].copy_from_slice(&ihdr.width.to_be_bytes());
  body[4..8].copy_from_slice(&ihdr.height.to_be_bytes());
  body[8] = ihdr.bit_depth;
  body[9] = ihdr.color_type as u8;
  body[10] = ihdr.compression_method;
  body[11] = ihdr.filter_method;
  body[12] = ihdr.interlace_method;
  body
}

fn plte_body(entries: &[crate::palette::Rgb8]) -> Vec<u8> {
  let mut body = Vec::with_capacity(entries.len() * 3);
  for e in entries {
    body.extend_from_slice(&[e.r, e.g, e.b]);
  }
  body
}
