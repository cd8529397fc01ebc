//! The scanline filter engine: inverting (decode) and applying (encode) the
//! five adaptive filters.
//!
//! From the PNG spec: filters are applied to **bytes**, not to pixels,
//! regardless of the bit depth or color type of the image.

use crate::error::{PngError, PngResult};
use crate::header::Ihdr;

/// Distance in bytes between a byte and its "left" neighbour for filtering
/// purposes. For bit depths under 8 the whole packed byte is the unit (a
/// sub-byte sample has no individually addressable left neighbour); at 8
/// bits and up it's one sample-group per channel, doubled for 16-bit depth.
#[must_use]
pub const fn filter_unit(ihdr: &Ihdr) -> usize {
  if ihdr.bit_depth < 8 {
    1
  } else {
    let channels = ihdr.color_type.channel_count();
    if ihdr.bit_depth == 16 {
      channels * 2
    } else {
      channels
    }
  }
}

/// The PaethPredictor function. Tie-breaking order is `a`, then `b`, then
/// `c`. Computed in `i32` so the subtractions never overflow, per the spec's
/// "performed exactly, without overflow" requirement.
#[must_use]
pub const fn paeth(a: u8, b: u8, c: u8) -> u8 {
  let a = a as i32;
  let b = b as i32;
  let c = c as i32;
  let p = a + b - c;
  let pa = (p - a).abs();
  let pb = (p - b).abs();
  let pc = (p - c).abs();
  if pa <= pb && pa <= pc {
    a as u8
  } else if pb <= pc {
    b as u8
  } else {
    c as u8
  }
}

/// Inverts one filtered scanline in place.
///
/// `current` holds the filtered bytes on entry and the recovered bytes on
/// return. `prev` is the already-recovered previous row (all zero for row
/// 0). `unit` is [`filter_unit`] for this image.
pub fn unfilter_row(filter_type: u8, current: &mut [u8], prev: &[u8], unit: usize) -> PngResult<()> {
  match filter_type {
    0 => {}
    1 => {
      for i in 0..current.len() {
        let left = if i >= unit { current[i - unit] } else { 0 };
        current[i] = current[i].wrapping_add(left);
      }
    }
    2 => {
      for i in 0..current.len() {
        let up = prev.get(i).copied().unwrap_or(0);
        current[i] = current[i].wrapping_add(up);
      }
    }
    3 => {
      for i in 0..current.len() {
        let left = if i >= unit { current[i - unit] } else { 0 };
        let up = prev.get(i).copied().unwrap_or(0);
        let avg = ((left as u16 + up as u16) / 2) as u8;
        current[i] = current[i].wrapping_add(avg);
      }
    }
    4 => {
      for i in 0..current.len() {
        let left = if i >= unit { current[i - unit] } else { 0 };
        let up = prev.get(i).copied().unwrap_or(0);
        let up_left = if i >= unit { prev.get(i - unit).copied().unwrap_or(0) } else { 0 };
        current[i] = current[i].wrapping_add(paeth(left, up, up_left));
      }
    }
    other => return Err(PngError::BadFilter(other)),
  }
  Ok(())
}

/// Inverts every scanline of `filtered` (each `1 + row_bytes` long, leading
/// filter-type byte included) in place, yielding the raw (unfiltered)
/// sample bytes with the filter-type bytes stripped.
pub fn unfilter_rows(ihdr: &Ihdr, filtered: &[u8]) -> PngResult<Vec<u8>> {
  let row_bytes = ihdr.row_bytes();
  let line_bytes = ihdr.filter_line_bytes();
  let unit = filter_unit(ihdr);
  let mut out = Vec::with_capacity(row_bytes * ihdr.height as usize);
  let mut prev = vec![0u8; row_bytes];
  let mut current = vec![0u8; row_bytes];

  for y in 0..ihdr.height as usize {
    let line_start = y * line_bytes;
    let line = filtered
      .get(line_start..line_start + line_bytes)
      .ok_or(PngError::Truncated)?;
    let filter_type = line[0];
    current.copy_from_slice(&line[1..]);
    unfilter_row(filter_type, &mut current, &prev, unit)?;
    out.extend_from_slice(&current);
    std::mem::swap(&mut prev, &mut current);
  }
  Ok(out)
}

/// Applies `filter_type` to one raw scanline, writing the filtered bytes
/// into `out` (which must be `current.len()` long). `prev` is the raw
/// (unfiltered) previous row, all zero for row 0.
pub fn filter_row(filter_type: u8, current: &[u8], prev: &[u8], unit: usize, out: &mut [u8]) {
  match filter_type {
    0 => out.copy_from_slice(current),
    1 => {
      for i in 0..current.len() {
        let left = if i >= unit { current[i - unit] } else { 0 };
        out[i] = current[i].wrapping_sub(left);
      }
    }
    2 => {
      for i in 0..current.len() {
        let up = prev.get(i).copied().unwrap_or(0);
        out[i] = current[i].wrapping_sub(up);
      }
    }
    3 => {
      for i in 0..current.len() {
        let left = if i >= unit { current[i - unit] } else { 0 };
        let up = prev.get(i).copied().unwrap_or(0);
        let avg = ((left as u16 + up as u16) / 2) as u8;
        out[i] = current[i].wrapping_sub(avg);
      }
    }
    4 => {
      for i in 0..current.len() {
        let left = if i >= unit { current[i - unit] } else { 0 };
        let up = prev.get(i).copied().unwrap_or(0);
        let up_left = if i >= unit { prev.get(i - unit).copied().unwrap_or(0) } else { 0 };
        out[i] = current[i].wrapping_sub(paeth(left, up, up_left));
      }
    }
    _ => unreachable!("caller selects from 0..=4"),
  }
}

/// Sum of unsigned byte values, the heuristic this crate uses (per other
/// encoders in the ecosystem) to pick a filter per row: minimize this.
#[must_use]
pub fn byte_sum_heuristic(filtered: &[u8]) -> u64 {
  filtered.iter().map(|&b| u64::from(b)).sum()
}
