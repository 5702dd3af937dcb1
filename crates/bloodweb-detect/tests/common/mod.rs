//! Synthetic 700x700 bloodweb shared by the detector and facade tests.
#![allow(dead_code)]

use bloodweb_detect::{Detector, DetectorParams, TemplateAtlas};
use image::{GrayImage, Luma, Rgb, RgbImage};

pub const SIZE: u32 = 700;
pub const ORIGIN: (f32, f32) = (350.0, 350.0);
pub const A: (f32, f32) = (350.0, 150.0);
pub const B: (f32, f32) = (550.0, 350.0);
pub const C: (f32, f32) = (550.0, 150.0);

pub const TAUPE: Rgb<u8> = Rgb([140, 125, 105]);
pub const RED: Rgb<u8> = Rgb([205, 40, 40]);
pub const NEUTRAL: Rgb<u8> = Rgb([55, 55, 55]);
pub const LINE: Rgb<u8> = Rgb([120, 110, 100]);
const ORIGIN_RIM: Rgb<u8> = Rgb([170, 170, 170]);
const ICON: Rgb<u8> = Rgb([230, 230, 230]);

fn dist(x: u32, y: u32, c: (f32, f32)) -> f32 {
    (x as f32 - c.0).hypot(y as f32 - c.1)
}

pub fn seg_dist(x: u32, y: u32, a: (f32, f32), b: (f32, f32)) -> f32 {
    let (px, py) = (x as f32 - a.0, y as f32 - a.1);
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let t = ((px * dx + py * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);
    (px - t * dx).hypot(py - t * dy)
}

/// Left half of a 36px square: the icon drawn into node A.
pub fn half_square(dx: f32, dy: f32) -> bool {
    dx.abs() <= 18.0 && dy.abs() <= 18.0 && dx < 0.0
}

/// Plus sign drawn into the origin.
pub fn plus(dx: f32, dy: f32) -> bool {
    (dx.abs() <= 4.0 && dy.abs() <= 20.0) || (dy.abs() <= 4.0 && dx.abs() <= 20.0)
}

/// O at the center, A above it (unlocked), B to its right (claimed), C
/// above B (locked). Lines: O-A, O-B, A-C. No line between B and C.
pub fn board() -> RgbImage {
    board_with_rims([TAUPE, RED, NEUTRAL])
}

/// [`board`] with the rims of A, B and C in the given colors.
pub fn board_with_rims(rims: [Rgb<u8>; 3]) -> RgbImage {
    let mut img = RgbImage::new(SIZE, SIZE);
    let lines = [(ORIGIN, A), (ORIGIN, B), (A, C)];
    let nodes = [(A, rims[0]), (B, rims[1]), (C, rims[2])];

    for (x, y, px) in img.enumerate_pixels_mut() {
        if lines.iter().any(|&(a, b)| seg_dist(x, y, a, b) <= 2.5) {
            *px = LINE;
        }
        let d = dist(x, y, ORIGIN);
        if d <= 66.0 {
            *px = if d >= 54.0 { ORIGIN_RIM } else { Rgb([0, 0, 0]) };
        }
        if plus(x as f32 - ORIGIN.0, y as f32 - ORIGIN.1) {
            *px = ICON;
        }
        for &(c, color) in &nodes {
            let d = dist(x, y, c);
            if d <= 44.0 {
                *px = if d >= 34.0 { color } else { Rgb([0, 0, 0]) };
            }
        }
        if half_square(x as f32 - A.0, y as f32 - A.1) {
            *px = ICON;
        }
    }
    img
}

pub fn pattern(size: u32, f: impl Fn(f32, f32) -> bool) -> GrayImage {
    let c = size as f32 / 2.0;
    GrayImage::from_fn(size, size, |x, y| {
        Luma([if f(x as f32 - c, y as f32 - c) { 230 } else { 0 }])
    })
}

pub fn detector_params() -> DetectorParams {
    let mut params = DetectorParams::default();
    params.icons.crop_fraction = 0.5;
    params
}

pub fn detector() -> Detector {
    Detector::new(detector_params())
}

/// A's icon named `a_name`, plus a mirrored decoy.
pub fn atlas_with(a_name: &str) -> TemplateAtlas {
    let mut atlas = TemplateAtlas::new(32).with_fallback_value(5);
    atlas.push(a_name, 700, &pattern(44, half_square)).unwrap();
    atlas
        .push("iconAddon_right", 10, &pattern(44, |dx, dy| half_square(-dx, dy)))
        .unwrap();
    atlas
}

pub fn atlas() -> TemplateAtlas {
    atlas_with("iconAddon_left")
}
