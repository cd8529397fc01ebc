//! IHDR: image dimensions, bit depth, and color type.

use crate::error::{PngError, PngResult};

/// The five PNG color types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ColorType {
  /// Greyscale, 1 channel.
  Grayscale = 0,
  /// Red/Green/Blue, 3 channels.
  Rgb = 2,
  /// Palette index, 1 channel, looked up through `PLTE`.
  Indexed = 3,
  /// Greyscale + Alpha, 2 channels.
  GrayscaleAlpha = 4,
  /// Red/Green/Blue/Alpha, 4 channels.
  Rgba = 6,
}

impl ColorType {
  /// Number of samples per pixel for this color type.
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Grayscale | Self::Indexed => 1,
      Self::GrayscaleAlpha => 2,
      Self::Rgb => 3,
      Self::Rgba => 4,
    }
  }

  /// Whether `bit_depth` is legal for this color type.
  #[must_use]
  pub const fn allows_bit_depth(self, bit_depth: u8) -> bool {
    match self {
      Self::Grayscale => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
      Self::Rgb | Self::GrayscaleAlpha | Self::Rgba => matches!(bit_depth, 8 | 16),
      Self::Indexed => matches!(bit_depth, 1 | 2 | 4 | 8),
    }
  }
}

impl TryFrom<u8> for ColorType {
  type Error = ();
  fn try_from(value: u8) -> Result<Self, ()> {
    Ok(match value {
      0 => Self::Grayscale,
      2 => Self::Rgb,
      3 => Self::Indexed,
      4 => Self::GrayscaleAlpha,
      6 => Self::Rgba,
      _ => return Err(()),
    })
  }
}

/// A parsed and validated `IHDR` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ihdr {
  /// Image width in pixels. Always nonzero.
  pub width: u32,
  /// Image height in pixels. Always nonzero.
  pub height: u32,
  /// Bits per sample.
  pub bit_depth: u8,
  /// Pixel layout.
  pub color_type: ColorType,
  /// Always 0 (DEFLATE); carried for round-trip fidelity.
  pub compression_method: u8,
  /// Always 0 (the five adaptive filters); carried for round-trip fidelity.
  pub filter_method: u8,
  /// 0 = no interlacing (the only value this crate supports), 1 = Adam7.
  pub interlace_method: u8,
}

impl Ihdr {
  /// Bits used by one pixel (samples per pixel × bit depth).
  #[must_use]
  pub const fn bits_per_pixel(&self) -> usize {
    self.color_type.channel_count() * self.bit_depth as usize
  }

  /// Bytes of filtered sample data per scanline, not counting the leading
  /// filter-type byte.
  #[must_use]
  pub const fn row_bytes(&self) -> usize {
    (self.bits_per_pixel() * self.width as usize + 7) / 8
  }

  /// Bytes per scanline including the filter-type byte.
  #[must_use]
  pub const fn filter_line_bytes(&self) -> usize {
    1 + self.row_bytes()
  }

  /// Parses and validates a 13-byte `IHDR` chunk body.
  pub fn parse(body: &[u8]) -> PngResult<Self> {
    let [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =
      *body
    else {
      return Err(PngError::ChunkLengthMismatch { declared: body.len(), consumed: 13 });
    };
    let width = u32::from_be_bytes([w0, w1, w2, w3]);
    let height = u32::from_be_bytes([h0, h1, h2, h3]);
    if width == 0 {
      return Err(PngError::BadHeader("width is zero"));
    }
    if height == 0 {
      return Err(PngError::BadHeader("height is zero"));
    }
    let color_type =
      ColorType::try_from(color_type).map_err(|_| PngError::BadHeader("unknown color type"))?;
    if !color_type.allows_bit_depth(bit_depth) {
      return Err(PngError::BadHeader("bit depth is not legal for this color type"));
    }
    Ok(Self {
      width,
      height,
      bit_depth,
      color_type,
      compression_method,
      filter_method,
      interlace_method,
    })
  }
}
