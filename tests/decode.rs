//! Container-level tests over synthetic in-memory PNG streams.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use pngpix::{chunk, Channel, DecodeOptions, Decoder, DecodingError, Unit, SIGNATURE};

fn write_chunk(out: &mut Vec<u8>, ty: &[u8; 4], data: &[u8]) {
    out.write_u32::<BigEndian>(data.len() as u32).unwrap();
    out.extend_from_slice(ty);
    out.extend_from_slice(data);

    let mut crc = crc32fast::Hasher::new();
    crc.update(ty);
    crc.update(data);
    out.write_u32::<BigEndian>(crc.finalize()).unwrap();
}

fn ihdr_data(width: u32, height: u32, bit_depth: u8, color_type: u8) -> [u8; 13] {
    let mut data = [0; 13];
    data[..4].copy_from_slice(&width.to_be_bytes());
    data[4..8].copy_from_slice(&height.to_be_bytes());
    data[8] = bit_depth;
    data[9] = color_type;
    data
}

fn compress(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).unwrap();
    encoder.finish().unwrap()
}

/// A 2x2 grayscale image, both rows unfiltered, pixels 10/20 and 30/40.
fn minimal_gray_png() -> Vec<u8> {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr_data(2, 2, 8, 0));
    write_chunk(&mut png, b"IDAT", &compress(&[0, 10, 20, 0, 30, 40]));
    write_chunk(&mut png, b"IEND", &[]);
    png
}

fn gray_rows(image: &pngpix::DecodedImage) -> Vec<Vec<u16>> {
    image
        .grid()
        .rows()
        .map(|row| row.iter().map(|px| px.sample(0)).collect())
        .collect()
}

#[test]
fn decodes_a_minimal_grayscale_png() {
    let image = Decoder::new(&minimal_gray_png()).decode().unwrap();
    assert_eq!(image.header().width, 2);
    assert_eq!(image.header().height, 2);
    assert_eq!(gray_rows(&image), vec![vec![10, 20], vec![30, 40]]);
    assert_eq!(image.pixel_dims(), None);
}

#[test]
fn accumulates_idat_payloads_across_chunks() {
    // Chunk boundaries are meaningless for the zlib stream, so splitting the
    // payload anywhere must decode identically.
    let payload = compress(&[0, 10, 20, 0, 30, 40]);
    for split in [1, payload.len() / 2, payload.len() - 1] {
        let mut png = SIGNATURE.to_vec();
        write_chunk(&mut png, b"IHDR", &ihdr_data(2, 2, 8, 0));
        write_chunk(&mut png, b"IDAT", &payload[..split]);
        write_chunk(&mut png, b"IDAT", &payload[split..]);
        write_chunk(&mut png, b"IEND", &[]);

        let image = Decoder::new(&png).decode().unwrap();
        assert_eq!(gray_rows(&image), vec![vec![10, 20], vec![30, 40]]);
    }
}

#[test]
fn reconstructs_rgb_rows_with_mixed_filters() {
    let mut raw = Vec::new();
    raw.extend_from_slice(&[1, 1, 2, 3, 10, 20, 30]); // Sub
    raw.extend_from_slice(&[2, 100, 200, 50, 250, 60, 240]); // Up

    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr_data(2, 2, 8, 2));
    write_chunk(&mut png, b"IDAT", &compress(&raw));
    write_chunk(&mut png, b"IEND", &[]);

    let image = Decoder::new(&png).decode().unwrap();
    let grid = image.grid();
    let layout = *grid.layout();
    let sample = |x: usize, y: usize, ch: Channel| {
        grid.get(x, y).unwrap().channel(&layout, ch).unwrap()
    };

    // Row 0 under Sub: (1,2,3) then (11,22,33).
    assert_eq!(sample(1, 0, Channel::Red), 11);
    assert_eq!(sample(1, 0, Channel::Green), 22);
    assert_eq!(sample(1, 0, Channel::Blue), 33);
    // Row 1 under Up, wrapping modulo 256 in the red channel.
    assert_eq!(sample(0, 1, Channel::Red), 101);
    assert_eq!(sample(1, 1, Channel::Red), (250 + 11) % 256);
    assert_eq!(sample(1, 1, Channel::Green), 82);
    assert_eq!(sample(1, 1, Channel::Blue), (240 + 33) % 256);
}

#[test]
fn detects_crc_corruption() {
    let mut png = minimal_gray_png();
    let last = png.len() - 1;
    png[last] ^= 0xff; // inside the IEND CRC field

    let err = Decoder::new(&png).decode().unwrap_err();
    assert!(matches!(
        err,
        DecodingError::CrcMismatch {
            chunk: chunk::IEND,
            ..
        }
    ));
}

#[test]
fn ignore_crc_skips_verification() {
    let mut png = minimal_gray_png();
    let last = png.len() - 1;
    png[last] ^= 0xff;

    let mut options = DecodeOptions::default();
    options.set_ignore_crc(true);
    let image = Decoder::new_with_options(&png, options).decode().unwrap();
    assert_eq!(gray_rows(&image), vec![vec![10, 20], vec![30, 40]]);
}

#[test]
fn rejects_a_bad_signature() {
    let mut png = minimal_gray_png();
    png[0] = b'G';
    assert!(matches!(
        Decoder::new(&png).decode(),
        Err(DecodingError::InvalidSignature)
    ));
}

#[test]
fn missing_idat_is_an_error() {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr_data(2, 2, 8, 0));
    write_chunk(&mut png, b"IEND", &[]);
    assert!(matches!(
        Decoder::new(&png).decode(),
        Err(DecodingError::MissingImageData)
    ));
}

#[test]
fn missing_ihdr_is_an_error() {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IDAT", &compress(&[0, 10]));
    write_chunk(&mut png, b"IEND", &[]);
    assert!(matches!(
        Decoder::new(&png).decode(),
        Err(DecodingError::MissingHeader)
    ));
}

#[test]
fn unknown_critical_chunks_are_fatal() {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr_data(2, 2, 8, 0));
    write_chunk(&mut png, b"FAKE", &[1, 2, 3]);
    write_chunk(&mut png, b"IDAT", &compress(&[0, 10, 20, 0, 30, 40]));
    write_chunk(&mut png, b"IEND", &[]);

    let err = Decoder::new(&png).decode().unwrap_err();
    assert!(matches!(err, DecodingError::UnknownCriticalChunk(ty) if ty.0 == *b"FAKE"));
}

#[test]
fn unknown_ancillary_chunks_are_skipped() {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr_data(2, 2, 8, 0));
    write_chunk(&mut png, b"tEXt", b"Comment\0not relevant here");
    write_chunk(&mut png, b"IDAT", &compress(&[0, 10, 20, 0, 30, 40]));
    write_chunk(&mut png, b"IEND", &[]);

    let image = Decoder::new(&png).decode().unwrap();
    assert_eq!(gray_rows(&image), vec![vec![10, 20], vec![30, 40]]);
}

#[test]
fn phys_chunk_supplies_an_aspect_hint() {
    let mut phys = Vec::new();
    phys.write_u32::<BigEndian>(144).unwrap();
    phys.write_u32::<BigEndian>(72).unwrap();
    phys.push(1);

    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr_data(2, 2, 8, 0));
    write_chunk(&mut png, b"pHYs", &phys);
    write_chunk(&mut png, b"IDAT", &compress(&[0, 10, 20, 0, 30, 40]));
    write_chunk(&mut png, b"IEND", &[]);

    let image = Decoder::new(&png).decode().unwrap();
    let dims = image.pixel_dims().unwrap();
    assert_eq!(dims.xppu, 144);
    assert_eq!(dims.yppu, 72);
    assert_eq!(dims.unit, Unit::Meter);
    assert_eq!(image.aspect_ratio(), Some(0.5));
}

#[test]
fn malformed_phys_chunks_are_ignored() {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr_data(2, 2, 8, 0));
    write_chunk(&mut png, b"pHYs", &[1, 2, 3]); // wrong length
    write_chunk(&mut png, b"IDAT", &compress(&[0, 10, 20, 0, 30, 40]));
    write_chunk(&mut png, b"IEND", &[]);

    let image = Decoder::new(&png).decode().unwrap();
    assert_eq!(image.pixel_dims(), None);
}

#[test]
fn data_after_iend_is_ignored() {
    let mut png = minimal_gray_png();
    png.extend_from_slice(b"trailing garbage");
    assert!(Decoder::new(&png).decode().is_ok());
}

#[test]
fn truncated_chunk_stream_is_an_error() {
    let png = minimal_gray_png();
    // Cut inside the IHDR chunk record.
    let err = Decoder::new(&png[..30]).decode().unwrap_err();
    assert!(matches!(err, DecodingError::UnexpectedEof));

    // No IEND at all.
    let no_iend = &png[..png.len() - 12];
    assert!(matches!(
        Decoder::new(no_iend).decode(),
        Err(DecodingError::UnexpectedEof)
    ));
}

#[test]
fn interlaced_images_are_rejected_at_the_header() {
    let mut ihdr = ihdr_data(2, 2, 8, 0);
    ihdr[12] = 1; // Adam7
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr);
    write_chunk(&mut png, b"IDAT", &compress(&[0, 10, 20, 0, 30, 40]));
    write_chunk(&mut png, b"IEND", &[]);

    assert!(matches!(
        Decoder::new(&png).decode(),
        Err(DecodingError::UnknownInterlaceMethod(1))
    ));
}

#[test]
fn read_image_drains_any_reader() {
    let png = minimal_gray_png();
    let image = pngpix::read_image(Cursor::new(png)).unwrap();
    assert_eq!(gray_rows(&image), vec![vec![10, 20], vec![30, 40]]);
}
