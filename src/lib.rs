//! # PNG pixel-grid decoder
//! This crate decodes a complete in-memory PNG byte stream into a
//! [`PixelGrid`]: rows of pixels whose channel samples are addressed through
//! a fixed [`PixelLayout`] rather than a raw byte buffer. The two transforms
//! PNG applies before storage, zlib compression of the scanline stream and
//! per-scanline predictive filtering, are both reversed during
//! [`Decoder::decode`].
//!
//! Interlaced images, bit depths below 8 and indexed color are out of scope
//! and rejected while parsing the header. The crate is decode-only.
//!
//! ## Using the decoder
//! ```no_run
//! use pngpix::{Channel, Decoder};
//!
//! let data = std::fs::read("tests/samples/kodim02.png").unwrap();
//! let image = Decoder::new(&data).decode().unwrap();
//!
//! let layout = *image.grid().layout();
//! for row in image.grid().rows() {
//!     for px in row {
//!         let _red = px.channel(&layout, Channel::Red);
//!     }
//! }
//! ```

#![deny(unsafe_code)]

pub mod chunk;
mod common;
mod decoder;
mod filter;

pub use crate::common::*;
pub use crate::decoder::{
    read_image, DecodeOptions, DecodedImage, Decoder, DecodingError, ScanlineDecoder, SIGNATURE,
};
pub use crate::filter::FilterType;
