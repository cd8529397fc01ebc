//! `PLTE` (palette) and `tRNS` (transparency) chunk data.

use bytemuck::{Pod, Zeroable};

use crate::error::{PngError, PngResult};
use crate::header::ColorType;

/// One palette entry: an 8-bit RGB triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct Rgb8 {
  /// red channel
  pub r: u8,
  /// green channel
  pub g: u8,
  /// blue channel
  pub b: u8,
}

/// The `PLTE` chunk: an ordered sequence of RGB colors, indexed from 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
  entries: Vec<Rgb8>,
}

impl Palette {
  /// Parses a `PLTE` chunk body. `color_type` gates which color types may
  /// carry a palette at all.
  pub fn parse(body: &[u8], color_type: ColorType) -> PngResult<Self> {
    if matches!(color_type, ColorType::Grayscale | ColorType::GrayscaleAlpha) {
      return Err(PngError::BadPalette("PLTE is forbidden for grayscale color types"));
    }
    if body.is_empty() {
      return Err(PngError::BadPalette("PLTE must not be empty"));
    }
    if body.len() % 3 != 0 {
      return Err(PngError::BadPalette("PLTE length must be a multiple of 3"));
    }
    if body.len() > 768 {
      return Err(PngError::BadPalette("PLTE has more than 256 entries"));
    }
    let entries = body.chunks_exact(3).map(|c| Rgb8 { r: c[0], g: c[1], b: c[2] }).collect();
    Ok(Self { entries })
  }

  /// Builds a palette directly from entries (used by the encoder).
  #[must_use]
  pub fn from_entries(entries: Vec<Rgb8>) -> Self {
    Self { entries }
  }

  /// The palette entries, in index order.
  #[must_use]
  pub fn entries(&self) -> &[Rgb8] {
    &self.entries
  }

  /// Number of entries.
  #[must_use]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Whether the palette has no entries.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Looks up an index, defaulting to black if out of range (the unpacker
  /// never produces an out-of-range index for a well-formed stream, but we
  /// don't want to panic on a hostile one).
  #[must_use]
  pub fn get(&self, index: usize) -> Rgb8 {
    self.entries.get(index).copied().unwrap_or_default()
  }
}

/// The `tRNS` chunk, polymorphic by color type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transparency {
  /// Grayscale chroma key (full 16-bit value, as declared in the chunk).
  Gray(u16),
  /// RGB chroma key. Each channel is the low 8 bits of its 16-bit field,
  /// matching the reference decoder's narrowing.
  Rgb { r: u8, g: u8, b: u8 },
  /// Per-palette-index alpha bytes.
  Indexed(Vec<u8>),
}

impl Transparency {
  /// Parses a `tRNS` chunk body for the given color type.
  pub fn parse(body: &[u8], color_type: ColorType, has_palette: bool) -> PngResult<Self> {
    match color_type {
      ColorType::Grayscale => {
        let [y0, y1] = *body else {
          return Err(PngError::BadTransparency("grayscale tRNS must be 2 bytes"));
        };
        Ok(Self::Gray(u16::from_be_bytes([y0, y1])))
      }
      ColorType::Rgb => {
        let [r0, r1, g0, g1, b0, b1] = *body else {
          return Err(PngError::BadTransparency("RGB tRNS must be 6 bytes"));
        };
        Ok(Self::Rgb {
          r: u16::from_be_bytes([r0, r1]) as u8,
          g: u16::from_be_bytes([g0, g1]) as u8,
          b: u16::from_be_bytes([b0, b1]) as u8,
        })
      }
      ColorType::Indexed => {
        if !has_palette {
          return Err(PngError::BadTransparency("indexed tRNS requires a prior PLTE"));
        }
        Ok(Self::Indexed(body.to_vec()))
      }
      ColorType::GrayscaleAlpha | ColorType::Rgba => {
        Err(PngError::BadTransparency("tRNS is forbidden when the color type already carries alpha"))
      }
    }
  }

  /// Alpha for a given palette index, defaulting to opaque when the index
  /// is beyond the declared sequence.
  #[must_use]
  pub fn alpha_for_index(&self, index: usize) -> u8 {
    match self {
      Self::Indexed(alphas) => alphas.get(index).copied().unwrap_or(255),
      _ => 255,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_palette_for_grayscale() {
    assert!(Palette::parse(&[0, 0, 0], ColorType::Grayscale).is_err());
  }

  #[test]
  fn rejects_non_multiple_of_three() {
    assert!(Palette::parse(&[0, 0], ColorType::Indexed).is_err());
  }

  #[test]
  fn rejects_empty() {
    assert!(Palette::parse(&[], ColorType::Indexed).is_err());
  }

  #[test]
  fn parses_four_entries() {
    let body = [0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255];
    let palette = Palette::parse(&body, ColorType::Indexed).unwrap();
    assert_eq!(palette.len(), 4);
    assert_eq!(palette.get(1), Rgb8 { r: 255, g: 0, b: 0 });
  }

  #[test]
  fn indexed_trns_without_palette_fails() {
    assert!(Transparency::parse(&[255, 0, 128], ColorType::Indexed, false).is_err());
  }

  #[test]
  fn rgb_trns_narrows_to_low_byte() {
    let trns = Transparency::parse(&[0, 0, 0, 0, 0, 0], ColorType::Rgb, false).unwrap();
    assert_eq!(trns, Transparency::Rgb { r: 0, g: 0, b: 0 });
  }

  #[test]
  fn alpha_palette_defaults_to_opaque() {
    let trns = Transparency::Indexed(vec![10, 20]);
    assert_eq!(trns.alpha_for_index(0), 10);
    assert_eq!(trns.alpha_for_index(5), 255);
  }
}
