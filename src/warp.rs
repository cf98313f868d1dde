//! Inverse-mapped bilinear warping onto a fixed-size canvas.

use image::{GrayImage, ImageBuffer, Pixel, RgbImage};
use nalgebra::{Matrix3, Vector3};

/// How to fill samples that fall outside the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Border {
    /// Clamp to the nearest edge pixel.
    Replicate,
    /// Fill with white (paper background).
    White,
}

/// Warps a grayscale image through `forward` onto an `out_w` x `out_h`
/// canvas. The output dimensions are exact regardless of where the source
/// content lands.
pub fn warp_gray(
    src: &GrayImage,
    forward: &Matrix3<f64>,
    out_w: u32,
    out_h: u32,
    border: Border,
) -> GrayImage {
    warp_pixels(src, forward, out_w, out_h, border)
}

/// RGB variant of [`warp_gray`].
pub fn warp_rgb(
    src: &RgbImage,
    forward: &Matrix3<f64>,
    out_w: u32,
    out_h: u32,
    border: Border,
) -> RgbImage {
    warp_pixels(src, forward, out_w, out_h, border)
}

fn warp_pixels<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    forward: &Matrix3<f64>,
    out_w: u32,
    out_h: u32,
    border: Border,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = P::CHANNEL_COUNT as usize;
    let white_buf = vec![255u8; channels];
    let white = *P::from_slice(&white_buf);

    let Some(inverse) = forward.try_inverse() else {
        return ImageBuffer::from_pixel(out_w, out_h, white);
    };

    let (src_w, src_h) = src.dimensions();
    let max_x = f64::from(src_w - 1);
    let max_y = f64::from(src_h - 1);

    ImageBuffer::from_fn(out_w, out_h, |x, y| {
        let v = inverse * Vector3::new(f64::from(x), f64::from(y), 1.0);
        if v[2].abs() < 1e-12 {
            return white;
        }
        let sx = v[0] / v[2];
        let sy = v[1] / v[2];

        let (sx, sy) = match border {
            Border::White => {
                if sx < 0.0 || sx > max_x || sy < 0.0 || sy > max_y {
                    return white;
                }
                (sx, sy)
            }
            Border::Replicate => (sx.clamp(0.0, max_x), sy.clamp(0.0, max_y)),
        };

        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        let xi = x0 as u32;
        let yi = y0 as u32;
        let xj = (xi + 1).min(src_w - 1);
        let yj = (yi + 1).min(src_h - 1);

        let p00 = src.get_pixel(xi, yi).channels();
        let p10 = src.get_pixel(xj, yi).channels();
        let p01 = src.get_pixel(xi, yj).channels();
        let p11 = src.get_pixel(xj, yj).channels();

        let mut blended = [0u8; 4];
        for c in 0..channels {
            let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
            let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
            blended[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }
        *P::from_slice(&blended[..channels])
    })
}
