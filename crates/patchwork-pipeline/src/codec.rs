//! Image decoding and PNG encoding.
//!
//! Converts between encoded image bytes (PNG, JPEG, BMP, WebP) and the
//! interleaved RGBA buffer the segmentation stages operate on. Nothing in
//! here touches the filesystem; callers read and write the bytes.

use image::ImageEncoder;

use crate::types::{RgbaImage, SegmentError};

/// Decode raw image bytes into an 8-bit RGBA buffer.
///
/// Supports whatever formats the `image` crate was built with. Images
/// without an alpha channel get an opaque alpha of 255.
///
/// # Errors
///
/// Returns [`SegmentError::EmptyInput`] if `bytes` is empty.
/// Returns [`SegmentError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, SegmentError> {
    if bytes.is_empty() {
        return Err(SegmentError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

/// Wrap an already-decoded row-major RGBA byte buffer.
///
/// # Errors
///
/// Returns [`SegmentError::BufferSize`] unless `raw` holds exactly
/// `width * height * 4` bytes.
pub fn rgba_from_raw(width: u32, height: u32, raw: Vec<u8>) -> Result<RgbaImage, SegmentError> {
    let actual = raw.len();
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4));
    if expected != Some(actual) {
        return Err(SegmentError::BufferSize {
            width,
            height,
            actual,
        });
    }
    RgbaImage::from_raw(width, height, raw).ok_or(SegmentError::BufferSize {
        width,
        height,
        actual,
    })
}

/// Encode an RGBA buffer as PNG bytes.
///
/// # Errors
///
/// Returns [`SegmentError::ImageEncode`] if PNG encoding fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SegmentError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| SegmentError::ImageEncode(e.to_string()))?;
    Ok(png_bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_returns_error() {
        let result = decode_rgba(&[]);
        assert!(matches!(result, Err(SegmentError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgba(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(SegmentError::ImageDecode(_))));
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn encoded_png_decodes_to_same_pixels() {
        let img = RgbaImage::from_fn(17, 31, |x, y| image::Rgba([x as u8, y as u8, 200, 128]));
        let png = encode_png(&img).unwrap();
        let decoded = decode_rgba(&png).unwrap();
        assert_eq!(decoded.dimensions(), (17, 31));
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn rgb_source_gets_opaque_alpha() {
        let rgb = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buf)
            .write_image(rgb.as_raw(), 2, 2, image::ExtendedColorType::Rgb8)
            .unwrap();

        let decoded = decode_rgba(&buf).unwrap();
        for pixel in decoded.pixels() {
            assert_eq!(pixel.0, [10, 20, 30, 255]);
        }
    }

    #[test]
    fn raw_buffer_must_match_dimensions() {
        assert!(rgba_from_raw(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            rgba_from_raw(2, 2, vec![0; 15]),
            Err(SegmentError::BufferSize { actual: 15, .. })
        ));
        assert!(matches!(
            rgba_from_raw(2, 2, vec![0; 20]),
            Err(SegmentError::BufferSize { actual: 20, .. })
        ));
    }
}
