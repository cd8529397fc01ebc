//! Optional row-stripe parallel decode driver, gated behind the `parallel`
//! feature.
//!
//! The filter engine is inherently sequential within a row (each byte may
//! depend on its left/up/up-left neighbours), but a row whose *own* filter
//! is None or Sub does not depend on the previous row at all. That makes
//! such rows valid stripe boundaries: everything from one boundary up to
//! (but not including) the next can be recovered independently of whatever
//! came before it.

use crate::error::PngResult;
use crate::filter::unfilter_row;
use crate::header::Ihdr;
use crate::palette::{Palette, Transparency};
use crate::unpack::unpack_row;

/// A contiguous run of scanlines that can be recovered without any input
/// from rows outside the stripe.
#[derive(Debug, Clone, Copy)]
struct Stripe {
  start_row: usize,
  end_row: usize, // exclusive
}

/// Splits `height` rows into stripes at boundaries where `filter_type(y) ==
/// 0 || filter_type(y) == 1` (i.e. row `y` doesn't need row `y - 1`).
fn plan_stripes(ihdr: &Ihdr, filtered: &[u8]) -> Vec<Stripe> {
  let line_bytes = ihdr.filter_line_bytes();
  let height = ihdr.height as usize;
  let mut stripes = Vec::new();
  let mut start = 0usize;
  for y in 1..height {
    let filter_type = filtered[y * line_bytes];
    if filter_type == 0 || filter_type == 1 {
      stripes.push(Stripe { start_row: start, end_row: y });
      start = y;
    }
  }
  stripes.push(Stripe { start_row: start, end_row: height });
  stripes
}

/// Recovers one stripe's rows, unpacking each into its slice of the shared
/// RGBA8 output buffer as it completes.
fn recover_stripe(
  ihdr: &Ihdr,
  filtered: &[u8],
  stripe: Stripe,
  palette: Option<&Palette>,
  trns: Option<&Transparency>,
  out: &mut [u8],
) -> PngResult<()> {
  let row_bytes = ihdr.row_bytes();
  let line_bytes = ihdr.filter_line_bytes();
  let unit = crate::filter::filter_unit(ihdr);
  let width = ihdr.width as usize;

  let mut prev = vec![0u8; row_bytes];
  let mut current = vec![0u8; row_bytes];
  for (local_y, y) in (stripe.start_row..stripe.end_row).enumerate() {
    let line_start = y * line_bytes;
    let line = &filtered[line_start..line_start + line_bytes];
    current.copy_from_slice(&line[1..]);
    unfilter_row(line[0], &mut current, &prev, unit)?;
    let out_row = &mut out[local_y * width * 4..(local_y + 1) * width * 4];
    unpack_row(ihdr, &current, palette, trns, out_row)?;
    std::mem::swap(&mut prev, &mut current);
  }
  Ok(())
}

/// Decodes `filtered` into the RGBA8 output buffer using up to
/// `thread_count` rayon workers, one per stripe at a time.
///
/// Falls back to purely sequential recovery (but still through the stripe
/// machinery) when `thread_count <= 1` or the `parallel` feature is
/// disabled.
pub fn stripe_rows(
  ihdr: &Ihdr,
  filtered: &[u8],
  palette: Option<&Palette>,
  trns: Option<&Transparency>,
  thread_count: usize,
) -> PngResult<Vec<u8>> {
  let width = ihdr.width as usize;
  let height = ihdr.height as usize;
  let mut out = vec![0u8; width * height * 4];
  let stripes = plan_stripes(ihdr, filtered);

  #[cfg(feature = "parallel")]
  if thread_count > 1 {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(thread_count)
      .build()
      .map_err(|e| crate::error::PngError::ThreadPoolBuild(e.to_string()))?;

    let mut remaining = &mut out[..];
    let mut chunks = Vec::with_capacity(stripes.len());
    for stripe in &stripes {
      let rows = stripe.end_row - stripe.start_row;
      let (head, tail) = remaining.split_at_mut(rows * width * 4);
      chunks.push(head);
      remaining = tail;
    }

    return pool.install(|| {
      stripes
        .par_iter()
        .zip(chunks.into_par_iter())
        .try_for_each(|(&stripe, chunk)| recover_stripe(ihdr, filtered, stripe, palette, trns, chunk))
    })
    .map(|()| out);
  }

  let _ = thread_count;
  for stripe in stripes {
    let rows = stripe.end_row - stripe.start_row;
    let out_slice = &mut out[stripe.start_row * width * 4..(stripe.start_row + rows) * width * 4];
    recover_stripe(ihdr, filtered, stripe, palette, trns, out_slice)?;
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::header::ColorType;

  fn gray8_ihdr(width: u32, height: u32) -> Ihdr {
    Ihdr { width, height, bit_depth: 8, color_type: ColorType::Grayscale, compression_method: 0, filter_method: 0, interlace_method: 0 }
  }

  #[test]
  fn every_row_is_its_own_stripe_when_all_filters_are_none() {
    let ihdr = gray8_ihdr(1, 3);
    let filtered = [0u8, 1, 0, 2, 0, 3];
    let stripes = plan_stripes(&ihdr, &filtered);
    assert_eq!(stripes.len(), 3);
  }

  #[test]
  fn a_run_of_paeth_rows_is_one_stripe() {
    let ihdr = gray8_ihdr(1, 3);
    let filtered = [0u8, 1, 4, 2, 4, 3]; // rows 1, 2 use Paeth(4): can't split there
    let stripes = plan_stripes(&ihdr, &filtered);
    assert_eq!(stripes.len(), 1);
  }

  #[test]
  fn stripe_rows_matches_sequential_unfilter_rows() {
    let ihdr = gray8_ihdr(2, 4);
    let filtered = [0u8, 10, 20, 1, 1, 1, 2, 5, 5, 4, 1, 1];
    let via_stripes = stripe_rows(&ihdr, &filtered, None, None, 1).unwrap();
    let raw = crate::filter::unfilter_rows(&ihdr, &filtered).unwrap();
    let via_unpack = crate::unpack::unpack_image(&ihdr, &raw, None, None).unwrap();
    assert_eq!(via_stripes, via_unpack);
  }
}
