//! Synthetic images shared by the unit tests.

use image::{GrayImage, Luma};

/// Bright rims on a black background.
///
/// Each ring is `(center, inner_radius, outer_radius)`; pixels at distance
/// `d` with `inner <= d <= outer` from a center are 180.
pub(crate) fn draw_rings(w: u32, h: u32, rings: &[([f32; 2], f32, f32)]) -> GrayImage {
    draw_rings_with(w, h, rings, 180)
}

pub(crate) fn draw_rings_with(
    w: u32,
    h: u32,
    rings: &[([f32; 2], f32, f32)],
    rim: u8,
) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let hit = rings.iter().any(|&([cx, cy], inner, outer)| {
            let d = (x as f32 - cx).hypot(y as f32 - cy);
            d >= inner && d <= outer
        });
        Luma([if hit { rim } else { 0 }])
    })
}
