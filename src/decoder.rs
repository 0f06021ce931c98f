//! The decoding pipeline, from a complete PNG byte stream down to pixels.
//!
//! [`Decoder`] walks the container: it checks the signature, frames the
//! length-prefixed chunk records, verifies their CRCs and accumulates every
//! `IDAT` payload into one buffer (chunk boundaries carry no meaning for the
//! compressed stream). [`ScanlineDecoder`] then does the actual work in a
//! single synchronous pass: inflate the zlib stream, cut it into filter-tagged
//! scanlines according to the pixel layout, and reverse the filter of each
//! scanline against the previously reconstructed one.

use std::error;
use std::fmt;
use std::io::{self, Read};

use crate::chunk::{self, ChunkType};
use crate::common::{HeaderInfo, Pixel, PixelDimensions, PixelGrid, Unit};
use crate::filter::{unfilter, FilterType};

/// PNG file signature.
pub const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Everything that can go wrong while decoding.
///
/// All variants are fatal for the image being decoded: there is no partial
/// result and no recovery once a chunk stream has gone bad.
#[derive(Debug)]
pub enum DecodingError {
    IoError(io::Error),
    /// The stream does not start with the PNG signature.
    InvalidSignature,
    /// The chunk framing ran off the end of the buffer before `IEND`.
    UnexpectedEof,
    CrcMismatch {
        chunk: ChunkType,
        /// CRC from the chunk record.
        crc_val: u32,
        /// CRC computed over the chunk type and data.
        crc_sum: u32,
    },
    UnknownCriticalChunk(ChunkType),
    /// `IEND` was reached without an `IHDR` chunk.
    MissingHeader,
    /// `IEND` was reached without any `IDAT` chunk.
    MissingImageData,
    /// The `IHDR` payload was not exactly 13 bytes long.
    InvalidHeaderLength(usize),
    InvalidDimensions,
    UnsupportedColorType(u8),
    UnsupportedBitDepth(u8),
    UnknownCompressionMethod(u8),
    UnknownFilterMethod(u8),
    UnknownInterlaceMethod(u8),
    /// The accumulated `IDAT` payload is not a valid zlib stream.
    CorruptFlateStream,
    /// The inflated image data is shorter than the header's dimensions and
    /// pixel layout require.
    TruncatedImageData {
        expected: usize,
        actual: usize,
    },
    /// A scanline carried a filter tag outside 0..=4.
    InvalidFilterType(u8),
}

impl fmt::Display for DecodingError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::DecodingError::*;
        match *self {
            IoError(ref err) => write!(fmt, "{}", err),
            InvalidSignature => write!(fmt, "invalid PNG signature"),
            UnexpectedEof => write!(fmt, "unexpected end of the chunk stream"),
            CrcMismatch {
                chunk,
                crc_val,
                crc_sum,
            } => write!(
                fmt,
                "CRC error: expected 0x{:x} have 0x{:x} while decoding {} chunk",
                crc_val, crc_sum, chunk
            ),
            UnknownCriticalChunk(chunk) => {
                write!(fmt, "encountered unknown critical chunk {}", chunk)
            }
            MissingHeader => write!(fmt, "IHDR chunk missing"),
            MissingImageData => write!(fmt, "IDAT chunk missing"),
            InvalidHeaderLength(len) => {
                write!(fmt, "invalid IHDR length {}, expected 13 bytes", len)
            }
            InvalidDimensions => write!(fmt, "image width and height must be nonzero"),
            UnsupportedColorType(n) => write!(fmt, "unsupported color type {}", n),
            UnsupportedBitDepth(n) => write!(fmt, "unsupported bit depth {}", n),
            UnknownCompressionMethod(n) => write!(fmt, "unknown compression method {}", n),
            UnknownFilterMethod(n) => write!(fmt, "unknown filter method {}", n),
            UnknownInterlaceMethod(n) => write!(fmt, "unknown interlace method {}", n),
            CorruptFlateStream => write!(fmt, "corrupt zlib stream in IDAT"),
            TruncatedImageData { expected, actual } => write!(
                fmt,
                "truncated image data: need {} bytes, got {}",
                expected, actual
            ),
            InvalidFilterType(n) => write!(fmt, "invalid filter type {}", n),
        }
    }
}

impl error::Error for DecodingError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DecodingError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodingError {
    fn from(err: io::Error) -> DecodingError {
        DecodingError::IoError(err)
    }
}

/// Knobs for the container driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeOptions {
    ignore_crc: bool,
}

impl DecodeOptions {
    /// When set, chunk CRC fields are read past without verification.
    pub fn set_ignore_crc(&mut self, ignore_crc: bool) {
        self.ignore_crc = ignore_crc;
    }
}

/// Decodes the accumulated `IDAT` payload of one image into pixels.
///
/// Construction runs the whole pipeline; afterwards the decoder is immutable
/// and only exposes the reconstructed [`PixelGrid`].
#[derive(Debug)]
pub struct ScanlineDecoder {
    grid: PixelGrid,
}

impl ScanlineDecoder {
    pub fn new(
        compressed: &[u8],
        header: &HeaderInfo,
    ) -> Result<ScanlineDecoder, DecodingError> {
        let raw = inflate(compressed)?;
        let scanlines = parse_scanlines(&raw, header)?;
        let grid = unfilter_scanlines(scanlines, header);
        Ok(ScanlineDecoder { grid })
    }

    pub fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    pub fn into_grid(self) -> PixelGrid {
        self.grid
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, DecodingError> {
    fdeflate::decompress_to_vec(data).map_err(|_| DecodingError::CorruptFlateStream)
}

/// One row as it sits in the inflated stream: the filter tag plus the still
/// filtered samples.
struct Scanline {
    filter: FilterType,
    pixels: Vec<Pixel>,
}

/// Cuts the inflated buffer into `height` filter-tagged scanlines.
///
/// Each pixel is `bytes_per_pixel` consecutive bytes split into channels per
/// the layout, every channel the big-endian integer of its byte slice. The
/// buffer has to hold exactly `raw_bytes()`; trailing excess is ignored.
fn parse_scanlines(
    raw: &[u8],
    header: &HeaderInfo,
) -> Result<Vec<Scanline>, DecodingError> {
    let expected = header.raw_bytes();
    if raw.len() < expected {
        return Err(DecodingError::TruncatedImageData {
            expected,
            actual: raw.len(),
        });
    }

    let layout = header.pixel_layout();
    let width = header.width as usize;
    let mut lines = Vec::with_capacity(header.height as usize);
    let mut rest = raw;
    for _ in 0..header.height {
        let filter =
            FilterType::from_u8(rest[0]).ok_or(DecodingError::InvalidFilterType(rest[0]))?;
        rest = &rest[1..];
        let mut pixels = Vec::with_capacity(width);
        for _ in 0..width {
            let mut px = Pixel::ZERO;
            for c in 0..layout.channel_count() {
                px.samples[c] = match layout.sample_bytes() {
                    1 => u16::from(rest[0]),
                    _ => u16::from_be_bytes([rest[0], rest[1]]),
                };
                rest = &rest[layout.sample_bytes()..];
            }
            pixels.push(px);
        }
        lines.push(Scanline { filter, pixels });
    }
    Ok(lines)
}

/// Reverses the filter of every scanline, strictly in stream order.
///
/// Row `i` is reconstructed against the already-reconstructed row `i - 1`,
/// so this is a sequential dependency chain. The zero row stands in for the
/// row above the first scanline; it is built once and only ever borrowed.
fn unfilter_scanlines(scanlines: Vec<Scanline>, header: &HeaderInfo) -> PixelGrid {
    let width = header.width as usize;
    let layout = header.pixel_layout();
    let channels = layout.channel_count();
    let sample_max = header.sample_max();

    let zero_row = vec![Pixel::ZERO; width];
    let mut pixels: Vec<Pixel> = Vec::with_capacity(width * scanlines.len());
    for (i, line) in scanlines.into_iter().enumerate() {
        let mut row = line.pixels;
        let previous = if i == 0 {
            &zero_row[..]
        } else {
            &pixels[(i - 1) * width..]
        };
        unfilter(line.filter, channels, sample_max, previous, &mut row);
        pixels.extend_from_slice(&row);
    }
    PixelGrid::new(width, header.height as usize, layout, pixels)
}

/// Container-level decoder over a complete in-memory PNG byte stream.
pub struct Decoder<'a> {
    data: &'a [u8],
    options: DecodeOptions,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Decoder<'a> {
        Decoder::new_with_options(data, DecodeOptions::default())
    }

    pub fn new_with_options(data: &'a [u8], options: DecodeOptions) -> Decoder<'a> {
        Decoder { data, options }
    }

    /// Walks the chunk stream and decodes the image it carries.
    ///
    /// `IDAT` payloads accumulate into one growable buffer; the pixel decode
    /// itself runs once, at `IEND`. Unrecognized ancillary chunks and any
    /// data after `IEND` are ignored.
    pub fn decode(&self) -> Result<DecodedImage, DecodingError> {
        let mut rest = self
            .data
            .strip_prefix(&SIGNATURE[..])
            .ok_or(DecodingError::InvalidSignature)?;

        let mut header: Option<HeaderInfo> = None;
        let mut idat: Vec<u8> = Vec::new();
        let mut saw_idat = false;
        let mut pixel_dims = None;

        loop {
            let (ty, data, remaining) = next_chunk(rest, &self.options)?;
            rest = remaining;
            match ty {
                chunk::IHDR => header = Some(HeaderInfo::parse(data)?),
                chunk::IDAT => {
                    saw_idat = true;
                    idat.extend_from_slice(data);
                }
                chunk::pHYs => pixel_dims = parse_phys(data),
                // A palette may legally accompany a truecolor image as a
                // quantization hint; indexed color itself is rejected at IHDR.
                chunk::PLTE => {}
                chunk::IEND => {
                    let header = header.ok_or(DecodingError::MissingHeader)?;
                    if !saw_idat {
                        return Err(DecodingError::MissingImageData);
                    }
                    let grid = ScanlineDecoder::new(&idat, &header)?.into_grid();
                    return Ok(DecodedImage {
                        header,
                        grid,
                        pixel_dims,
                    });
                }
                other if chunk::is_critical(other) => {
                    return Err(DecodingError::UnknownCriticalChunk(other));
                }
                _ => {}
            }
        }
    }
}

/// Splits one length-prefixed chunk record off the front of `data`.
fn next_chunk<'a>(
    data: &'a [u8],
    options: &DecodeOptions,
) -> Result<(ChunkType, &'a [u8], &'a [u8]), DecodingError> {
    if data.len() < 8 {
        return Err(DecodingError::UnexpectedEof);
    }
    let length = u32::from_be_bytes(data[0..4].try_into().unwrap()) as usize;
    let ty = ChunkType(data[4..8].try_into().unwrap());
    let total = length.checked_add(12).ok_or(DecodingError::UnexpectedEof)?;
    if data.len() < total {
        return Err(DecodingError::UnexpectedEof);
    }
    let payload = &data[8..8 + length];
    let crc_val = u32::from_be_bytes(data[8 + length..total].try_into().unwrap());
    if !options.ignore_crc {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&ty.0);
        hasher.update(payload);
        let crc_sum = hasher.finalize();
        if crc_sum != crc_val {
            return Err(DecodingError::CrcMismatch {
                chunk: ty,
                crc_val,
                crc_sum,
            });
        }
    }
    Ok((ty, payload, &data[total..]))
}

/// Parses a `pHYs` payload. The chunk is advisory, so anything malformed is
/// ignored rather than failing the decode.
fn parse_phys(data: &[u8]) -> Option<PixelDimensions> {
    if data.len() != 9 {
        return None;
    }
    let xppu = u32::from_be_bytes(data[0..4].try_into().unwrap());
    let yppu = u32::from_be_bytes(data[4..8].try_into().unwrap());
    let unit = Unit::from_u8(data[8])?;
    if xppu == 0 || yppu == 0 {
        return None;
    }
    Some(PixelDimensions { xppu, yppu, unit })
}

/// Everything one decode produces: the parsed header, the reconstructed
/// pixel grid and the optional physical-dimensions hint for a renderer.
#[derive(Debug)]
pub struct DecodedImage {
    header: HeaderInfo,
    grid: PixelGrid,
    pixel_dims: Option<PixelDimensions>,
}

impl DecodedImage {
    pub fn header(&self) -> &HeaderInfo {
        &self.header
    }

    pub fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    pub fn into_grid(self) -> PixelGrid {
        self.grid
    }

    pub fn pixel_dims(&self) -> Option<PixelDimensions> {
        self.pixel_dims
    }

    /// Width-to-height ratio of one pixel, when a `pHYs` chunk supplied one.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.pixel_dims.map(|dims| dims.aspect_ratio())
    }
}

/// Reads a complete PNG stream from `r` into memory and decodes it.
pub fn read_image<R: Read>(mut r: R) -> Result<DecodedImage, DecodingError> {
    let mut data = Vec::new();
    r.read_to_end(&mut data)?;
    Decoder::new(&data).decode()
}
