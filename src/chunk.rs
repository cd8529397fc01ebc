//! Chunk framing: splitting a PNG byte stream into `length|type|data|crc`
//! records, and the reverse for encoding.

use crate::byte_io::{ByteReader, ByteWriter};
use crate::checksum::crc32;
use crate::error::{PngError, PngResult};

/// The 8-byte signature every PNG stream must start with.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// A raw, unvalidated chunk straight off the wire.
#[derive(Debug, Clone, Copy)]
pub struct RawChunk<'b> {
  /// 4-byte ASCII chunk type, e.g. `*b"IHDR"`.
  pub chunk_type: [u8; 4],
  /// The chunk body (exactly `length` bytes).
  pub data: &'b [u8],
  /// The CRC-32 the stream claims for this chunk. Not verified by
  /// [`ChunkIter`] itself; see [`verify_crc`].
  pub declared_crc: u32,
}

impl RawChunk<'_> {
  /// The chunk type as a `&str`, if it happens to be valid UTF-8 (PNG chunk
  /// types always are, being restricted to ASCII letters).
  #[must_use]
  pub fn type_str(&self) -> &str {
    core::str::from_utf8(&self.chunk_type).unwrap_or("????")
  }
}

/// Recomputes the CRC-32 over `type + data` and compares it against the
/// chunk's declared value. Decode does not call this automatically.
#[must_use]
pub fn verify_crc(chunk: &RawChunk<'_>) -> bool {
  let mut writer = ByteWriter::new();
  writer.write_bytes(&chunk.chunk_type);
  writer.write_bytes(chunk.data);
  crc32(&writer.into_bytes()) == chunk.declared_crc
}

/// Iterates the chunks of a PNG stream, starting right after the signature.
pub struct ChunkIter<'b> {
  rest: &'b [u8],
}

impl<'b> ChunkIter<'b> {
  /// Checks the 8-byte signature and returns an iterator over the chunks
  /// that follow it.
  pub fn new(bytes: &'b [u8]) -> PngResult<Self> {
    if bytes.len() < 8 || bytes[..8] != PNG_SIGNATURE {
      return Err(PngError::BadSignature);
    }
    Ok(Self { rest: &bytes[8..] })
  }

  /// Reads the next chunk, if any remain.
  ///
  /// Returns `Ok(None)` once the stream is exhausted. A stream that ends
  /// mid-chunk is a [`PngError::Truncated`] error rather than a clean end.
  pub fn next_chunk(&mut self) -> PngResult<Option<RawChunk<'b>>> {
    if self.rest.is_empty() {
      return Ok(None);
    }
    let mut reader = ByteReader::new(self.rest);
    let length = reader.read_u32()? as usize;
    let chunk_type: [u8; 4] = reader.read_bytes(4)?.try_into().unwrap();
    let data = reader.read_bytes(length)?;
    let declared_crc = reader.read_u32()?;

    self.rest = reader.remaining_bytes();
    Ok(Some(RawChunk { chunk_type, data, declared_crc }))
  }
}

impl<'b> Iterator for ChunkIter<'b> {
  type Item = PngResult<RawChunk<'b>>;
  fn next(&mut self) -> Option<Self::Item> {
    self.next_chunk().transpose()
  }
}

/// Checks that a typed sub-parser consumed exactly `declared` bytes,
/// producing [`PngError::ChunkLengthMismatch`] otherwise.
pub fn expect_exact_length(declared: usize, consumed: usize) -> PngResult<()> {
  if declared == consumed {
    Ok(())
  } else {
    Err(PngError::ChunkLengthMismatch { declared, consumed })
  }
}

/// Writes one chunk (`length|type|data|crc`) into `out`.
pub fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
  let mut crc_input = ByteWriter::new();
  crc_input.write_bytes(chunk_type);
  crc_input.write_bytes(data);
  let crc = crc32(&crc_input.into_bytes());

  let mut writer = ByteWriter::new();
  writer.write_u32(data.len() as u32);
  writer.write_bytes(chunk_type);
  writer.write_bytes(data);
  writer.write_u32(crc);
  out.extend_from_slice(&writer.into_bytes());
}

#[cfg(test)]
mod tests {
  use super::*;

  fn make_chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    write_chunk(&mut v, chunk_type, data);
    v
  }

  #[test]
  fn rejects_bad_signature() {
    assert!(matches!(ChunkIter::new(&[0; 8]), Err(PngError::BadSignature)));
  }

  #[test]
  fn rejects_short_input() {
    assert!(matches!(ChunkIter::new(&[1, 2, 3]), Err(PngError::BadSignature)));
  }

  #[test]
  fn round_trips_a_chunk() {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend(make_chunk(b"IEND", &[]));
    let mut it = ChunkIter::new(&bytes).unwrap();
    let chunk = it.next_chunk().unwrap().unwrap();
    assert_eq!(&chunk.chunk_type, b"IEND");
    assert_eq!(chunk.data, &[] as &[u8]);
    assert!(verify_crc(&chunk));
    assert!(it.next_chunk().unwrap().is_none());
  }

  #[test]
  fn truncated_mid_chunk_errors() {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 10]); // claims 10 bytes of data
    bytes.extend_from_slice(b"IDAT");
    bytes.extend_from_slice(&[1, 2, 3]); // but only provides 3
    let mut it = ChunkIter::new(&bytes).unwrap();
    assert!(matches!(it.next_chunk(), Err(PngError::Truncated)));
  }

  #[test]
  fn length_mismatch_is_reported() {
    assert!(expect_exact_length(13, 13).is_ok());
    assert!(matches!(
      expect_exact_length(13, 12),
      Err(PngError::ChunkLengthMismatch { declared: 13, consumed: 12 })
    ));
  }
}

