//! Packs an RGBA8 source buffer into filtered scanline bytes ready for
//! `zlib::wrap_and_deflate`, for each of the three color types this crate
//! can emit: RGBA8, RGB8, Indexed8.

use crate::error::{PngError, PngResult};
use crate::filter::{byte_sum_heuristic, filter_row, filter_unit};
use crate::header::{ColorType, Ihdr};
use crate::palette::Rgb8;

/// How the caller's source bytes are ordered within each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
  /// Red, Green, Blue, Alpha.
  Rgba,
  /// Alpha, Blue, Green, Red.
  Abgr,
}

/// Per-row filter selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStrategy {
  /// Try filters 1..=4 on every row and keep whichever minimizes
  /// [`byte_sum_heuristic`]. None (0) is intentionally never tried.
  Adaptive,
  /// Use the same filter index for every row.
  Fixed(u8),
}

#[inline]
fn sample_at(pixels: &[u8], pixel_index: usize, channel_order: ChannelOrder, channel: usize) -> u8 {
  let base = pixel_index * 4;
  match channel_order {
    ChannelOrder::Rgba => pixels[base + channel],
    ChannelOrder::Abgr => pixels[base + (3 - channel)],
  }
}

/// Packs an RGBA8 or RGB8 image (`spp` = 4 or 3) into filtered scanlines,
/// selecting a filter per row per `strategy`. Returns the filtered bytes
/// (each row: 1 filter-type byte + `width * spp` sample bytes).
pub fn pack_direct(
  ihdr: &Ihdr,
  pixels: &[u8],
  channel_order: ChannelOrder,
  strategy: FilterStrategy,
) -> PngResult<Vec<u8>> {
  let spp = ihdr.color_type.channel_count();
  if !matches!(ihdr.color_type, ColorType::Rgba | ColorType::Rgb) {
    return Err(PngError::UnsupportedMode("pack_direct only supports RGBA8/RGB8"));
  }
  let width = ihdr.width as usize;
  let height = ihdr.height as usize;
  let row_bytes = width * spp;

  let mut raw_rows = vec![0u8; row_bytes * height];
  for y in 0..height {
    let out = &mut raw_rows[y * row_bytes..(y + 1) * row_bytes];
    for x in 0..width {
      let pixel_index = y * width + x;
      for c in 0..spp {
        out[x * spp + c] = sample_at(pixels, pixel_index, channel_order, c);
      }
    }
  }

  let unit = filter_unit(ihdr);
  let mut out = Vec::with_capacity((1 + row_bytes) * height);
  let mut scratch = vec![0u8; row_bytes];
  let zero_row = vec![0u8; row_bytes];

  for y in 0..height {
    let current = &raw_rows[y * row_bytes..(y + 1) * row_bytes];
    let prev: &[u8] = if y == 0 { &zero_row } else { &raw_rows[(y - 1) * row_bytes..y * row_bytes] };

    let chosen = match strategy {
      FilterStrategy::Fixed(f) => f,
      FilterStrategy::Adaptive => {
        let mut best_filter = 1u8;
        let mut best_sum = u64::MAX;
        for candidate in 1..=4u8 {
          filter_row(candidate, current, prev, unit, &mut scratch);
          let sum = byte_sum_heuristic(&scratch);
          if sum < best_sum {
            best_sum = sum;
            best_filter = candidate;
          }
        }
        best_filter
      }
    };
    if !(0..=4).contains(&chosen) {
      return Err(PngError::UnsupportedMode("fixed filter index out of range"));
    }

    out.push(chosen);
    let line_start = out.len();
    out.resize(line_start + row_bytes, 0);
    filter_row(chosen, current, prev, unit, &mut out[line_start..]);
  }
  Ok(out)
}

/// An (R,G,B,A) color as used while building an indexed palette.
pub type Rgba8 = [u8; 4];

/// The result of building and, if needed, reducing a palette for indexed
/// encoding.
pub struct IndexedPlan {
  /// Final palette, ≤ `limit` entries.
  pub palette: Vec<Rgba8>,
  /// Maps a color not directly present in `palette` to the palette entry it
  /// was folded into during reduction. Empty if no reduction occurred.
  pub reduced: std::collections::HashMap<Rgba8, Rgba8>,
}

fn squared_distance(a: Rgba8, b: Rgba8) -> u32 {
  (0..4).map(|c| { let d = i32::from(a[c]) - i32::from(b[c]); (d * d) as u32 }).sum()
}

/// Scans `pixels` for distinct colors and, if there are more than `limit`,
/// folds the closest pairs together until the palette fits.
#[must_use]
pub fn build_indexed_plan(pixels: &[u8], limit: usize, reduce: bool) -> IndexedPlan {
  let mut palette: Vec<Rgba8> = Vec::new();
  let mut seen = std::collections::HashSet::new();
  for chunk in pixels.chunks_exact(4) {
    let color: Rgba8 = [chunk[0], chunk[1], chunk[2], chunk[3]];
    if seen.insert(color) {
      palette.push(color);
    }
  }

  let mut reduced = std::collections::HashMap::new();
  if palette.len() > limit && reduce {
    while palette.len() > limit {
      let mut best_pair = (0usize, 1usize);
      let mut best_dist = u32::MAX;
      for i in 0..palette.len() {
        for j in (i + 1)..palette.len() {
          let d = squared_distance(palette[i], palette[j]);
          if d < best_dist {
            best_dist = d;
            best_pair = (i, j);
          }
        }
      }
      let (i, j) = best_pair;
      // Drop the higher index (j), folding it into i's color.
      let dropped = palette[j];
      let kept = palette[i];
      palette.remove(j);
      for mapped in reduced.values_mut() {
        if *mapped == dropped {
          *mapped = kept;
        }
      }
      reduced.insert(dropped, kept);
    }
  }
  IndexedPlan { palette, reduced }
}

/// Smallest of `{1,2,4,8}` bits that can index `palette_size` entries.
#[must_use]
pub const fn bit_depth_for_palette_size(palette_size: usize) -> u8 {
  if palette_size <= 2 {
    1
  } else if palette_size <= 4 {
    2
  } else if palette_size <= 16 {
    4
  } else {
    8
  }
}

/// Packs an RGBA8 image as Indexed8: looks up (or reduction-maps) every
/// pixel into `plan.palette`, filters each row (always filter type None),
/// and returns `(filtered_bytes, plte_entries, trns_alphas)`.
pub fn pack_indexed(
  ihdr: &Ihdr,
  pixels: &[u8],
  plan: &IndexedPlan,
) -> PngResult<(Vec<u8>, Vec<Rgb8>, Vec<u8>)> {
  let width = ihdr.width as usize;
  let height = ihdr.height as usize;
  let mut index_of = std::collections::HashMap::with_capacity(plan.palette.len());
  for (i, &color) in plan.palette.iter().enumerate() {
    index_of.insert(color, i);
  }

  let mut out = Vec::with_capacity((1 + width) * height);
  for y in 0..height {
    out.push(0u8); // filter type None
    for x in 0..width {
      let pixel_index = (y * width + x) * 4;
      let color: Rgba8 = pixels[pixel_index..pixel_index + 4].try_into().unwrap();
      let idx = index_of.get(&color).copied().or_else(|| {
        plan.reduced.get(&color).and_then(|mapped| index_of.get(mapped).copied())
      });
      out.push(idx.ok_or(PngError::PaletteMiss)? as u8);
    }
  }

  let plte: Vec<Rgb8> = plan.palette.iter().map(|c| Rgb8 { r: c[0], g: c[1], b: c[2] }).collect();
  let trns: Vec<u8> = plan.palette.iter().map(|c| c[3]).collect();
  Ok((out, plte, trns))
}
