//! A PNG chunk parser, scanline filter engine, and pixel (un)packer.
//!
//! [`decode::decode`] turns PNG bytes into a dense RGBA8 buffer;
//! [`encode::encode`] turns such a buffer back into a PNG byte stream.
//! Interlaced (Adam7) input is rejected rather than supported.

#![forbid(unsafe_code)]

/// Debug trace, compiled out entirely unless the `trace` feature is
/// enabled so release builds pay nothing for it.
#[macro_export]
macro_rules! trace {
  ($($arg:tt)*) => {
    #[cfg(feature = "trace")] {
      ::std::print!("{file}:{line}> ", file = file!(), line = line!());
      ::std::println!($($arg)*);
    }
  }
}

pub mod byte_io;
pub mod checksum;
pub mod chunk;
pub mod decode;
pub mod encode;
pub mod error;
pub mod filter;
pub mod header;
pub mod pack;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod palette;
pub mod unpack;
pub mod zlib;

pub use decode::{decode, DecodeOptions, DecodedImage};
pub use encode::{encode, EncodeOptions};
pub use error::{PngError, PngResult};
