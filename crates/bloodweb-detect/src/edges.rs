//! Sobel gradients and binary edge maps.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use nalgebra::Point2;

type GradientPlane = ImageBuffer<Luma<i16>, Vec<i16>>;

/// Per-pixel Sobel gradient, pointing from dark to bright. Borders are
/// clamped, so the image frame itself is not an edge.
pub struct GradientField {
    pub width: usize,
    pub height: usize,
    gx: GradientPlane,
    gy: GradientPlane,
}

impl GradientField {
    pub fn sobel(img: &GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            gx: horizontal_sobel(img),
            gy: vertical_sobel(img),
        }
    }

    #[inline]
    fn raw(&self, x: usize, y: usize) -> (f32, f32) {
        let i = y * self.width + x;
        (self.gx.as_raw()[i] as f32, self.gy.as_raw()[i] as f32)
    }

    #[inline]
    pub fn magnitude(&self, x: usize, y: usize) -> f32 {
        let (gx, gy) = self.raw(x, y);
        gx.hypot(gy)
    }

    /// Unit gradient direction if the magnitude reaches `threshold`.
    #[inline]
    pub fn direction(&self, x: usize, y: usize, threshold: f32) -> Option<(f32, f32)> {
        let (gx, gy) = self.raw(x, y);
        let m = gx.hypot(gy);
        if m < threshold || m <= f32::EPSILON {
            return None;
        }
        Some((gx / m, gy / m))
    }

    pub fn edge_map(&self, threshold: f32) -> EdgeMap {
        let mut map = EdgeMap::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.magnitude(x, y) >= threshold {
                    map.data[y * self.width + x] = true;
                }
            }
        }
        map
    }
}

/// Binary edge plane.
#[derive(Clone, Debug)]
pub struct EdgeMap {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl EdgeMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn is_edge(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = true;
        }
    }

    /// Remove every edge pixel within `radius` of `center`.
    pub fn clear_disc(&mut self, center: Point2<f32>, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        let r2 = radius * radius;
        let x0 = (center.x - radius).floor().max(0.0) as usize;
        let y0 = (center.y - radius).floor().max(0.0) as usize;
        let x1 = ((center.x + radius).ceil() as usize).min(self.width.saturating_sub(1));
        let y1 = ((center.y + radius).ceil() as usize).min(self.height.saturating_sub(1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - center.x;
                let dy = y as f32 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.data[y * self.width + x] = false;
                }
            }
        }
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&e| e).count()
    }
}
