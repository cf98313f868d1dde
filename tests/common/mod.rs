//! Synthetic answer-sheet raster shared by the integration tests.
#![allow(dead_code)]

use image::GrayImage;

pub const CANVAS: u32 = 1000;

/// Thin rule center.
pub const THIN_Y: f64 = 199.5;
/// Dash column center.
pub const DASH_X: f64 = 50.5;
/// Topmost dash center.
pub const DASH_TOP_Y: f64 = 79.5;
/// Bottommost dash center.
pub const DASH_BOTTOM_Y: f64 = 919.5;

/// Renders the standard sheet layout: header line, thin rule, and fifteen
/// dash markers down the left margin.
pub fn synthetic_template() -> GrayImage {
    let mut img = GrayImage::from_pixel(CANVAS, CANVAS, image::Luma([255]));
    for x in 10..990u32 {
        for y in 48..56u32 {
            img.put_pixel(x, y, image::Luma([0]));
        }
        if x >= 60 {
            for y in 198..201u32 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
    }
    for i in 0..15u32 {
        let cy = 80 + i * 60;
        for y in cy - 5..cy + 5 {
            for x in 40..62u32 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
    }
    img
}
