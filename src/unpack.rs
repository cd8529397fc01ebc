//! Converts recovered (post-filter) raw scanline bytes into a dense
//! `width * height * 4` RGBA8 buffer, for every supported
//! `(color_type, bit_depth)` combination.

use crate::error::{PngError, PngResult};
use crate::header::{ColorType, Ihdr};
use crate::palette::{Palette, Transparency};

/// Extracts the `index`-th sub-byte sample (bit depth 1, 2, or 4) from a
/// row, MSB-first: the leftmost pixel occupies the most significant bits.
#[inline]
fn subbyte_sample(row: &[u8], bit_depth: u8, index: usize) -> u8 {
  let samples_per_byte = 8 / bit_depth as usize;
  let byte = row[index / samples_per_byte];
  let group = index % samples_per_byte;
  let shift = 8 - bit_depth as usize - group * bit_depth as usize;
  let mask = ((1u16 << bit_depth) - 1) as u8;
  (byte >> shift) & mask
}

/// Scales a sub-byte grayscale sample up to the full 0..=255 range, rounding
/// to nearest (spec: `round(s * 255 / max)`).
#[inline]
fn scale_to_byte(sample: u8, bit_depth: u8) -> u8 {
  let max_sample = (1u32 << bit_depth) - 1;
  (((u32::from(sample) * 255) + max_sample / 2) / max_sample) as u8
}

/// Unpacks one recovered row (`ihdr.row_bytes()` long) into the RGBA8 slice
/// for that row (`width * 4` bytes).
pub fn unpack_row(
  ihdr: &Ihdr,
  row: &[u8],
  palette: Option<&Palette>,
  trns: Option<&Transparency>,
  out_row: &mut [u8],
) -> PngResult<()> {
  let width = ihdr.width as usize;
  match (ihdr.color_type, ihdr.bit_depth) {
    (ColorType::Rgba, 8) => {
      for x in 0..width {
        out_row[x * 4..x * 4 + 4].copy_from_slice(&row[x * 4..x * 4 + 4]);
      }
    }
    (ColorType::Rgba, 16) => {
      for x in 0..width {
        for c in 0..4 {
          out_row[x * 4 + c] = row[x * 8 + c * 2];
        }
      }
    }
    (ColorType::Rgb, 8) => {
      for x in 0..width {
        let (r, g, b) = (row[x * 3], row[x * 3 + 1], row[x * 3 + 2]);
        let alpha = rgb_alpha(trns, r, g, b);
        out_row[x * 4..x * 4 + 3].copy_from_slice(&[r, g, b]);
        out_row[x * 4 + 3] = alpha;
      }
    }
    (ColorType::Rgb, 16) => {
      for x in 0..width {
        let base = x * 6;
        let (r, g, b) = (row[base], row[base + 2], row[base + 4]);
        let alpha = rgb_alpha(trns, r, g, b);
        out_row[x * 4..x * 4 + 3].copy_from_slice(&[r, g, b]);
        out_row[x * 4 + 3] = alpha;
      }
    }
    (ColorType::Grayscale, 1 | 2 | 4) => {
      for x in 0..width {
        let s = subbyte_sample(row, ihdr.bit_depth, x);
        let gray = if ihdr.bit_depth == 1 { if s != 0 { 255 } else { 0 } } else { scale_to_byte(s, ihdr.bit_depth) };
        let alpha = match trns {
          Some(Transparency::Gray(key)) if u16::from(s) == *key => 0,
          _ => 255,
        };
        out_row[x * 4..x * 4 + 4].copy_from_slice(&[gray, gray, gray, alpha]);
      }
    }
    (ColorType::Grayscale, 8) => {
      for x in 0..width {
        let gray = row[x];
        let alpha = match trns {
          Some(Transparency::Gray(key)) if u16::from(gray) == *key => 0,
          _ => 255,
        };
        out_row[x * 4..x * 4 + 4].copy_from_slice(&[gray, gray, gray, alpha]);
      }
    }
    (ColorType::Grayscale, 16) => {
      for x in 0..width {
        let gray = row[x * 2];
        // tRNS gray key is intentionally not applied at 16-bit depth.
        out_row[x * 4..x * 4 + 4].copy_from_slice(&[gray, gray, gray, 255]);
      }
    }
    (ColorType::GrayscaleAlpha, 8) => {
      for x in 0..width {
        let (gray, alpha) = (row[x * 2], row[x * 2 + 1]);
        out_row[x * 4..x * 4 + 4].copy_from_slice(&[gray, gray, gray, alpha]);
      }
    }
    (ColorType::GrayscaleAlpha, 16) => {
      for x in 0..width {
        let base = x * 4;
        let (gray, alpha) = (row[base], row[base + 2]);
        out_row[x * 4..x * 4 + 4].copy_from_slice(&[gray, gray, gray, alpha]);
      }
    }
    (ColorType::Indexed, 1 | 2 | 4) => {
      let palette = palette.ok_or(PngError::MissingPalette)?;
      for x in 0..width {
        let idx = subbyte_sample(row, ihdr.bit_depth, x) as usize;
        write_indexed_pixel(out_row, x, idx, palette, trns);
      }
    }
    (ColorType::Indexed, 8) => {
      let palette = palette.ok_or(PngError::MissingPalette)?;
      for x in 0..width {
        write_indexed_pixel(out_row, x, row[x] as usize, palette, trns);
      }
    }
    (color_type, bit_depth) => {
      let _ = color_type;
      return Err(PngError::BadBitDepth { bit_depth });
    }
  }
  Ok(())
}

#[inline]
fn rgb_alpha(trns: Option<&Transparency>, r: u8, g: u8, b: u8) -> u8 {
  match trns {
    Some(Transparency::Rgb { r: kr, g: kg, b: kb }) if (r, g, b) == (*kr, *kg, *kb) => 0,
    _ => 255,
  }
}

#[inline]
fn write_indexed_pixel(out_row: &mut [u8], x: usize, idx: usize, palette: &Palette, trns: Option<&Transparency>) {
  let color = palette.get(idx);
  let alpha = trns.map_or(255, |t| t.alpha_for_index(idx));
  out_row[x * 4..x * 4 + 4].copy_from_slice(&[color.r, color.g, color.b, alpha]);
}

/// Unpacks an entire recovered (unfiltered) buffer into an RGBA8 image.
pub fn unpack_image(
  ihdr: &Ihdr,
  raw: &[u8],
  palette: Option<&Palette>,
  trns: Option<&Transparency>,
) -> PngResult<Vec<u8>> {
  let row_bytes = ihdr.row_bytes();
  let width = ihdr.width as usize;
  let mut out = vec![0u8; width * ihdr.height as usize * 4];
  for y in 0..ihdr.height as usize {
    let row = &raw[y * row_bytes..(y + 1) * row_bytes];
    let out_row = &mut out[y * width * 4..(y + 1) * width * 4];
    unpack_row(ihdr, row, palette, trns, out_row)?;
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::palette::Rgb8;

  fn ihdr(color_type: ColorType, bit_depth: u8, width: u32, height: u32) -> Ihdr {
    Ihdr { width, height, bit_depth, color_type, compression_method: 0, filter_method: 0, interlace_method: 0 }
  }

  #[test]
  fn rgba8_copies_verbatim() {
    let h = ihdr(ColorType::Rgba, 8, 1, 1);
    let mut out = vec![0u8; 4];
    unpack_row(&h, &[10, 20, 30, 40], None, None, &mut out).unwrap();
    assert_eq!(out, vec![10, 20, 30, 40]);
  }

  #[test]
  fn rgba16_takes_high_byte_per_channel() {
    let h = ihdr(ColorType::Rgba, 16, 1, 1);
    let row = [0xAB, 0x00, 0xCD, 0x00, 0xEF, 0x00, 0x12, 0x00];
    let mut out = vec![0u8; 4];
    unpack_row(&h, &row, None, None, &mut out).unwrap();
    assert_eq!(out, vec![0xAB, 0xCD, 0xEF, 0x12]);
  }

  #[test]
  fn grayscale_1bit_maps_to_black_and_white() {
    let h = ihdr(ColorType::Grayscale, 1, 8, 1);
    let row = [0b1010_0101];
    let mut out = vec![0u8; 32];
    unpack_row(&h, &row, None, None, &mut out).unwrap();
    let expected_gray = [255, 0, 255, 0, 0, 255, 0, 255];
    for (x, &g) in expected_gray.iter().enumerate() {
      assert_eq!(out[x * 4], g, "pixel {x}");
      assert_eq!(out[x * 4 + 3], 255);
    }
  }

  #[test]
  fn grayscale_2bit_uses_corrected_mask_table() {
    let h = ihdr(ColorType::Grayscale, 2, 4, 1);
    // samples 0,1,2,3 packed MSB-first: 00 01 10 11 -> 0b00_01_10_11 = 0x1B
    let row = [0b00_01_10_11];
    let mut out = vec![0u8; 16];
    unpack_row(&h, &row, None, None, &mut out).unwrap();
    assert_eq!(out[0], 0); // sample 0 -> round(0*255/3) = 0
    assert_eq!(out[4], 85); // sample 1 -> round(255/3) = 85
    assert_eq!(out[8], 170); // sample 2 -> round(510/3) = 170
    assert_eq!(out[12], 255); // sample 3 -> round(765/3) = 255
  }

  #[test]
  fn grayscale_4bit_scales_nibbles() {
    let h = ihdr(ColorType::Grayscale, 4, 2, 1);
    let row = [0x0F]; // samples 0, 15
    let mut out = vec![0u8; 8];
    unpack_row(&h, &row, None, None, &mut out).unwrap();
    assert_eq!(out[0], 0);
    assert_eq!(out[4], 255);
  }

  #[test]
  fn grayscale_1bit_trns_key_makes_pixel_transparent() {
    let h = ihdr(ColorType::Grayscale, 1, 2, 1);
    let trns = Transparency::Gray(1);
    let row = [0b1000_0000];
    let mut out = vec![0u8; 8];
    unpack_row(&h, &row, None, Some(&trns), &mut out).unwrap();
    assert_eq!(out[3], 0); // sample 1 matches the key -> transparent
    assert_eq!(out[7], 255); // sample 0 does not match -> opaque
  }

  #[test]
  fn grayscale_16bit_ignores_trns_key() {
    // Regression test for the documented asymmetry: depth-16 grayscale
    // never applies the tRNS gray key, unlike every other grayscale depth.
    let h = ihdr(ColorType::Grayscale, 16, 1, 1);
    let trns = Transparency::Gray(0x00AB);
    let row = [0xAB, 0xCD];
    let mut out = vec![0u8; 4];
    unpack_row(&h, &row, None, Some(&trns), &mut out).unwrap();
    assert_eq!(out[3], 255);
  }

  #[test]
  fn rgb_trns_chroma_key_zeroes_alpha() {
    let h = ihdr(ColorType::Rgb, 8, 2, 1);
    let trns = Transparency::Rgb { r: 0, g: 0, b: 0 };
    let row = [0, 0, 0, 10, 20, 30];
    let mut out = vec![0u8; 8];
    unpack_row(&h, &row, None, Some(&trns), &mut out).unwrap();
    assert_eq!(out[3], 0);
    assert_eq!(out[7], 255);
  }

  #[test]
  fn indexed_looks_up_palette_and_alpha() {
    let h = ihdr(ColorType::Indexed, 4, 2, 1);
    let palette = Palette::from_entries(vec![Rgb8 { r: 1, g: 2, b: 3 }, Rgb8 { r: 4, g: 5, b: 6 }]);
    let trns = Transparency::Indexed(vec![0]);
    let row = [0x01]; // indices 0, 1
    let mut out = vec![0u8; 8];
    unpack_row(&h, &row, Some(&palette), Some(&trns), &mut out).unwrap();
    assert_eq!(&out[0..4], &[1, 2, 3, 0]);
    assert_eq!(&out[4..8], &[4, 5, 6, 255]);
  }

  #[test]
  fn indexed_without_palette_errors() {
    let h = ihdr(ColorType::Indexed, 8, 1, 1);
    let mut out = vec![0u8; 4];
    assert!(matches!(unpack_row(&h, &[0], None, None, &mut out), Err(PngError::MissingPalette)));
  }

  #[test]
  fn unpack_image_handles_multiple_rows() {
    let h = ihdr(ColorType::Grayscale, 8, 2, 2);
    let raw = [0, 255, 128, 64];
    let out = unpack_image(&h, &raw, None, None).unwrap();
    assert_eq!(out.len(), 2 * 2 * 4);
    assert_eq!(out[0], 0);
    assert_eq!(out[4], 255);
    assert_eq!(out[8], 128);
    assert_eq!(out[12], 64);
  }
}
