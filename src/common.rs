//! Common types shared across the decoder.

use crate::decoder::DecodingError;

/// Color model of a PNG image, as stored in the `IHDR` chunk.
///
/// Indexed-color images (type 3) need palette expansion and are not
/// supported by this decoder, so the variant does not exist here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorType {
    Grayscale = 0,
    Rgb = 2,
    GrayscaleAlpha = 4,
    Rgba = 6,
}

impl ColorType {
    /// The fixed channel order for pixels of this color type.
    pub fn channels(self) -> &'static [Channel] {
        match self {
            ColorType::Grayscale => &[Channel::Gray],
            ColorType::Rgb => &[Channel::Red, Channel::Green, Channel::Blue],
            ColorType::GrayscaleAlpha => &[Channel::Gray, Channel::Alpha],
            ColorType::Rgba => &[
                Channel::Red,
                Channel::Green,
                Channel::Blue,
                Channel::Alpha,
            ],
        }
    }

    /// Returns the number of samples used per pixel of `ColorType`.
    pub fn samples(self) -> usize {
        self.channels().len()
    }

    pub fn from_u8(n: u8) -> Option<ColorType> {
        match n {
            0 => Some(ColorType::Grayscale),
            2 => Some(ColorType::Rgb),
            4 => Some(ColorType::GrayscaleAlpha),
            6 => Some(ColorType::Rgba),
            _ => None,
        }
    }
}

/// Bit depth of one channel sample.
///
/// PNG also defines depths of 1, 2 and 4 bits for some color types; those
/// pack several samples into one byte and are out of scope here, so only the
/// whole-byte depths are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BitDepth {
    Eight = 8,
    Sixteen = 16,
}

impl BitDepth {
    pub fn from_u8(n: u8) -> Option<BitDepth> {
        match n {
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }

    /// Width of one channel sample in bytes.
    pub fn sample_bytes(self) -> usize {
        self as usize / 8
    }
}

/// A named pixel channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Gray,
    Alpha,
}

/// Byte layout of one pixel: the ordered channel set and the width of each
/// channel, both fixed for the whole image by color type and bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    channels: &'static [Channel],
    sample_bytes: usize,
}

impl PixelLayout {
    pub(crate) fn new(color_type: ColorType, bit_depth: BitDepth) -> PixelLayout {
        PixelLayout {
            channels: color_type.channels(),
            sample_bytes: bit_depth.sample_bytes(),
        }
    }

    /// The channels of one pixel, in stream order.
    pub fn channels(&self) -> &'static [Channel] {
        self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Width of one channel sample in bytes (1 or 2).
    pub fn sample_bytes(&self) -> usize {
        self.sample_bytes
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.channels.len() * self.sample_bytes
    }

    /// Position of `channel` within a pixel, if this layout carries it.
    pub fn position(&self, channel: Channel) -> Option<usize> {
        self.channels.iter().position(|&c| c == channel)
    }
}

/// Parsed contents of the 13-byte `IHDR` payload.
///
/// Immutable once constructed; every size the rest of the decoder needs is
/// derived from these four fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: BitDepth,
    pub color_type: ColorType,
}

impl HeaderInfo {
    /// Parses the `IHDR` payload.
    ///
    /// The trailing compression, filter and interlace method bytes must all
    /// be zero: the PNG spec defines no other value for the first two, and
    /// Adam7 interlacing is unsupported.
    pub fn parse(data: &[u8]) -> Result<HeaderInfo, DecodingError> {
        if data.len() != 13 {
            return Err(DecodingError::InvalidHeaderLength(data.len()));
        }
        let width = u32::from_be_bytes(data[0..4].try_into().unwrap());
        let height = u32::from_be_bytes(data[4..8].try_into().unwrap());
        if width == 0 || height == 0 {
            return Err(DecodingError::InvalidDimensions);
        }
        let bit_depth =
            BitDepth::from_u8(data[8]).ok_or(DecodingError::UnsupportedBitDepth(data[8]))?;
        let color_type =
            ColorType::from_u8(data[9]).ok_or(DecodingError::UnsupportedColorType(data[9]))?;
        if data[10] != 0 {
            return Err(DecodingError::UnknownCompressionMethod(data[10]));
        }
        if data[11] != 0 {
            return Err(DecodingError::UnknownFilterMethod(data[11]));
        }
        if data[12] != 0 {
            return Err(DecodingError::UnknownInterlaceMethod(data[12]));
        }
        Ok(HeaderInfo {
            width,
            height,
            bit_depth,
            color_type,
        })
    }

    /// The byte layout of one pixel.
    pub fn pixel_layout(&self) -> PixelLayout {
        PixelLayout::new(self.color_type, self.bit_depth)
    }

    /// One more than the largest representable sample value. All filter
    /// arithmetic is carried out modulo this.
    pub fn sample_max(&self) -> u32 {
        1 << (self.bit_depth as u32)
    }

    /// Returns the bytes per pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        self.pixel_layout().bytes_per_pixel()
    }

    /// Returns the number of bytes one filtered row occupies in the inflated
    /// stream, including the leading filter-type byte.
    pub fn raw_row_length(&self) -> usize {
        1 + self.width as usize * self.bytes_per_pixel()
    }

    /// Returns the number of bytes the whole inflated image data must occupy.
    pub fn raw_bytes(&self) -> usize {
        self.height as usize * self.raw_row_length()
    }
}

/// One pixel: channel samples in layout order.
///
/// Storage is a fixed four-slot array regardless of color type; slots past
/// the layout's channel count stay zero. Interpretation is positional
/// through [`PixelLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub(crate) samples: [u16; Pixel::MAX_CHANNELS],
}

impl Pixel {
    pub(crate) const MAX_CHANNELS: usize = 4;

    /// The all-zero pixel, shared as the virtual neighbor outside the image.
    pub const ZERO: Pixel = Pixel {
        samples: [0; Pixel::MAX_CHANNELS],
    };

    /// Builds a pixel from samples in layout order.
    ///
    /// Panics if more than four samples are given.
    pub fn new(samples: &[u16]) -> Pixel {
        let mut px = Pixel::ZERO;
        px.samples[..samples.len()].copy_from_slice(samples);
        px
    }

    /// The sample at `index` in layout order.
    pub fn sample(&self, index: usize) -> u16 {
        self.samples[index]
    }

    /// The value of `channel` under `layout`, if the layout carries it.
    pub fn channel(&self, layout: &PixelLayout, channel: Channel) -> Option<u16> {
        layout.position(channel).map(|i| self.samples[i])
    }

    /// Iterates over `(channel, value)` pairs in layout order.
    pub fn channels<'a>(
        &'a self,
        layout: &'a PixelLayout,
    ) -> impl Iterator<Item = (Channel, u16)> + 'a {
        layout
            .channels()
            .iter()
            .zip(self.samples.iter())
            .map(|(&c, &v)| (c, v))
    }
}

/// The reconstructed image: `height` rows of `width` pixels, plus the layout
/// a consumer needs to interpret them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    layout: PixelLayout,
    pixels: Vec<Pixel>,
}

impl PixelGrid {
    pub(crate) fn new(
        width: usize,
        height: usize,
        layout: PixelLayout,
        pixels: Vec<Pixel>,
    ) -> PixelGrid {
        debug_assert_eq!(pixels.len(), width * height);
        PixelGrid {
            width,
            height,
            layout,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    /// The pixels of row `y`, left to right.
    pub fn row(&self, y: usize) -> &[Pixel] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Iterates over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Pixel]> {
        self.pixels.chunks_exact(self.width)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Pixel> {
        if x < self.width && y < self.height {
            Some(&self.pixels[y * self.width + x])
        } else {
            None
        }
    }
}

/// Pixel dimensions information from a `pHYs` chunk, carried through as a
/// display hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelDimensions {
    /// Pixels per unit, X axis
    pub xppu: u32,
    /// Pixels per unit, Y axis
    pub yppu: u32,
    /// Either *Meter* or *Unspecified*
    pub unit: Unit,
}

impl PixelDimensions {
    /// Width-to-height ratio of one pixel.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.yppu) / f64::from(self.xppu)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// Physical unit of the pixel dimensions
pub enum Unit {
    Unspecified = 0,
    Meter = 1,
}

impl Unit {
    pub fn from_u8(n: u8) -> Option<Unit> {
        match n {
            0 => Some(Unit::Unspecified),
            1 => Some(Unit::Meter),
            _ => None,
        }
    }
}
