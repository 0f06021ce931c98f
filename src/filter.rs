//! Scanline filter reversal.
//!
//! Every scanline in the inflated image data is prefixed by a filter-type
//! byte naming the transform the encoder applied to it. Each filter
//! re-expresses a sample relative to already-decoded neighbor samples to
//! help compression; reversing it is the second half of decoding. Unlike a
//! byte-oriented decoder, reconstruction here works on whole channel
//! samples, so arithmetic wraps modulo the sample range of the image's bit
//! depth rather than modulo 256.

use crate::common::Pixel;

/// The per-scanline filter named by a scanline's leading tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterType {
    NoFilter = 0,
    Sub = 1,
    Up = 2,
    Avg = 3,
    Paeth = 4,
}

impl FilterType {
    pub fn from_u8(n: u8) -> Option<FilterType> {
        match n {
            0 => Some(FilterType::NoFilter),
            1 => Some(FilterType::Sub),
            2 => Some(FilterType::Up),
            3 => Some(FilterType::Avg),
            4 => Some(FilterType::Paeth),
            _ => None,
        }
    }
}

/// The Paeth predictor over one channel sample.
///
/// Ties resolve left, then above, then upper-left. The order is fixed by the
/// PNG spec and must match the encoder's bit for bit.
pub(crate) fn paeth_predictor(left: i32, above: i32, upper_left: i32) -> i32 {
    let p = left + above - upper_left;
    let pa = (p - left).abs();
    let pb = (p - above).abs();
    let pc = (p - upper_left).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

fn add_mod(a: u32, b: u32, sample_max: u32) -> u16 {
    ((a + b) % sample_max) as u16
}

/// Reverses `filter` over one scanline in place.
///
/// `previous` is the already-reconstructed row above (the zero row for the
/// first scanline); `current` holds raw filtered samples on entry and
/// reconstructed samples on return. Additions are per-channel modulo
/// `sample_max`; samples widen to 32 bits first so 16-bit depths cannot
/// overflow before the reduction.
pub(crate) fn unfilter(
    filter: FilterType,
    channels: usize,
    sample_max: u32,
    previous: &[Pixel],
    current: &mut [Pixel],
) {
    debug_assert_eq!(previous.len(), current.len());

    match filter {
        FilterType::NoFilter => {}
        FilterType::Sub => {
            // Column 0 keeps its raw value: the virtual left neighbor is zero.
            for x in 1..current.len() {
                let left = current[x - 1];
                for c in 0..channels {
                    current[x].samples[c] = add_mod(
                        u32::from(current[x].samples[c]),
                        u32::from(left.samples[c]),
                        sample_max,
                    );
                }
            }
        }
        FilterType::Up => {
            for (cur, above) in current.iter_mut().zip(previous) {
                for c in 0..channels {
                    cur.samples[c] = add_mod(
                        u32::from(cur.samples[c]),
                        u32::from(above.samples[c]),
                        sample_max,
                    );
                }
            }
        }
        FilterType::Avg => {
            for x in 0..current.len() {
                let left = if x == 0 { Pixel::ZERO } else { current[x - 1] };
                for c in 0..channels {
                    let predicted =
                        (u32::from(left.samples[c]) + u32::from(previous[x].samples[c])) / 2;
                    current[x].samples[c] =
                        add_mod(u32::from(current[x].samples[c]), predicted, sample_max);
                }
            }
        }
        FilterType::Paeth => {
            for x in 0..current.len() {
                let (left, upper_left) = if x == 0 {
                    (Pixel::ZERO, Pixel::ZERO)
                } else {
                    (current[x - 1], previous[x - 1])
                };
                for c in 0..channels {
                    let predicted = paeth_predictor(
                        i32::from(left.samples[c]),
                        i32::from(previous[x].samples[c]),
                        i32::from(upper_left.samples[c]),
                    );
                    current[x].samples[c] = add_mod(
                        u32::from(current[x].samples[c]),
                        predicted as u32,
                        sample_max,
                    );
                }
            }
        }
    }
}
