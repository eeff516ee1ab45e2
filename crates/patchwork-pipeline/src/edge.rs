//! Sobel gradient-magnitude edge filter.
//!
//! Overwrites the color channels of every interior pixel with the
//! gradient magnitude of the channel-averaged gray level, producing a
//! grayscale edge map stored in the same RGBA container. Alpha is kept.
//!
//! Only pixels with a full 3x3 neighborhood are written. The one-pixel
//! border ring keeps its original color: there is no padding and no
//! wraparound.

use crate::types::{Dimensions, RgbaImage, SegmentError};

/// Horizontal Sobel kernel, indexed `[row][column]`.
pub const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];

/// Vertical Sobel kernel, indexed `[row][column]`.
pub const SOBEL_Y: [[i32; 3]; 3] = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

/// Replace each interior pixel's R, G and B with its Sobel gradient
/// magnitude, in place.
///
/// Per pixel: the 9 neighbors are reduced to `(R + G + B) / 3` (integer
/// division), convolved with [`SOBEL_X`] and [`SOBEL_Y`], and the
/// magnitude `round(sqrt(gx^2 + gy^2))` is clamped to 255.
///
/// Convolution reads from a scratch copy of the source so already
/// written pixels never feed back into their neighbors. Images without
/// interior pixels (width or height below 3) are returned unchanged.
///
/// # Errors
///
/// Returns [`SegmentError::Allocation`] if the scratch copy cannot be
/// reserved. `image` is not modified in that case.
pub fn sobel_magnitude_in_place(image: &mut RgbaImage) -> Result<(), SegmentError> {
    let dims = Dimensions::of(image);
    if !dims.has_interior() {
        tracing::warn!(
            width = dims.width,
            height = dims.height,
            "image has no interior pixels, edge filter skipped"
        );
        return Ok(());
    }

    let len = image.as_raw().len();
    let mut source: Vec<u8> = Vec::new();
    source
        .try_reserve_exact(len)
        .map_err(|_| SegmentError::allocation::<u8>(len))?;
    source.extend_from_slice(image.as_raw());

    let width = dims.width as usize;
    let height = dims.height as usize;
    let out: &mut [u8] = image;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let magnitude = gradient_magnitude(&source, width, x, y);
            let pos = (y * width + x) * 4;
            out[pos..pos + 3].fill(magnitude);
        }
    }

    tracing::debug!(
        width = dims.width,
        height = dims.height,
        "sobel edge filter applied"
    );
    Ok(())
}

/// Gradient magnitude at interior position `(x, y)` of a raw RGBA
/// buffer `width` pixels wide.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn gradient_magnitude(source: &[u8], width: usize, x: usize, y: usize) -> u8 {
    let mut gx = 0_i32;
    let mut gy = 0_i32;
    for (ky, (row_x, row_y)) in SOBEL_X.iter().zip(&SOBEL_Y).enumerate() {
        let sy = y + ky - 1;
        for kx in 0..3 {
            let sx = x + kx - 1;
            let gray = channel_average(source, (sy * width + sx) * 4);
            gx += row_x[kx] * gray;
            gy += row_y[kx] * gray;
        }
    }
    let magnitude = f64::from(gx).hypot(f64::from(gy)).round();
    magnitude.min(255.0) as u8
}

/// Truncating average of the R, G and B bytes starting at `idx`.
fn channel_average(source: &[u8], idx: usize) -> i32 {
    (i32::from(source[idx]) + i32::from(source[idx + 1]) + i32::from(source[idx + 2])) / 3
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use image::Rgba;

    fn border_pixels(image: &RgbaImage) -> Vec<Rgba<u8>> {
        let (w, h) = image.dimensions();
        image
            .enumerate_pixels()
            .filter(|(x, y, _)| *x == 0 || *y == 0 || *x == w - 1 || *y == h - 1)
            .map(|(_, _, p)| *p)
            .collect()
    }

    #[test]
    fn uniform_image_has_zero_interior_gradient() {
        let mut img = RgbaImage::from_pixel(6, 5, Rgba([90, 140, 200, 255]));
        sobel_magnitude_in_place(&mut img).unwrap();
        for y in 1..4 {
            for x in 1..5 {
                assert_eq!(img.get_pixel(x, y).0, [0, 0, 0, 255], "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn border_ring_is_left_untouched() {
        let original = RgbaImage::from_fn(9, 7, |x, y| {
            Rgba([(x * 29) as u8, (y * 37) as u8, (x * y * 11) as u8, (x + y) as u8])
        });
        let mut img = original.clone();
        sobel_magnitude_in_place(&mut img).unwrap();
        assert_eq!(border_pixels(&img), border_pixels(&original));
    }

    #[test]
    fn alpha_is_preserved_and_channels_are_equal() {
        let mut img = RgbaImage::from_fn(5, 5, |x, y| {
            Rgba([(x * 60) as u8, (y * 60) as u8, 30, (10 + x * 5 + y) as u8])
        });
        let original = img.clone();
        sobel_magnitude_in_place(&mut img).unwrap();
        for (x, y, p) in img.enumerate_pixels() {
            assert_eq!(p.0[3], original.get_pixel(x, y).0[3]);
            if (1..4).contains(&x) && (1..4).contains(&y) {
                assert_eq!(p.0[0], p.0[1]);
                assert_eq!(p.0[1], p.0[2]);
            }
        }
    }

    #[test]
    fn bright_middle_row_lights_up_adjacent_rows() {
        let mut img = RgbaImage::from_fn(5, 5, |_, y| {
            if y == 2 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        sobel_magnitude_in_place(&mut img).unwrap();
        for x in 1..4 {
            assert_eq!(img.get_pixel(x, 1).0[0], 255);
            assert_eq!(img.get_pixel(x, 2).0[0], 0);
            assert_eq!(img.get_pixel(x, 3).0[0], 255);
        }
    }

    #[test]
    fn horizontal_gradient_uses_channel_average() {
        // Left column gray = (4 + 3 + 2) / 3 = 3; gx = -(1 + 2 + 1) * 3.
        let mut img = RgbaImage::from_fn(3, 3, |x, _| {
            if x == 0 {
                Rgba([4, 3, 2, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        sobel_magnitude_in_place(&mut img).unwrap();
        assert_eq!(img.get_pixel(1, 1).0, [12, 12, 12, 255]);
    }

    #[test]
    fn magnitude_is_rounded() {
        // Single top-left gray of 2: gx = -2, gy = 2, sqrt(8) = 2.83.
        let mut img = RgbaImage::from_fn(3, 3, |x, y| {
            if x == 0 && y == 0 {
                Rgba([2, 2, 2, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        sobel_magnitude_in_place(&mut img).unwrap();
        assert_eq!(img.get_pixel(1, 1).0[0], 3);
    }

    #[test]
    fn too_small_images_are_unchanged() {
        for (w, h) in [(0, 0), (1, 1), (2, 8), (8, 2)] {
            let original = RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 50) as u8, (y * 50) as u8, 7, 9]));
            let mut img = original.clone();
            sobel_magnitude_in_place(&mut img).unwrap();
            assert_eq!(img, original, "{w}x{h}");
        }
    }
}
