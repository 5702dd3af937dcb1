use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};

/// Borrowed row-major 8-bit plane.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl<'a> GrayImageView<'a> {
    pub fn from_image(img: &'a GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw(),
        }
    }

    /// Pixel value, `0` outside the plane.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = src.get(x0, y0) as f32;
    let p10 = src.get(x0 + 1, y0) as f32;
    let p01 = src.get(x0, y0 + 1) as f32;
    let p11 = src.get(x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}

/// One screen capture of the board with its derived planes.
///
/// The grayscale and red planes are computed once in [`BoardImage::new`].
/// Owned accessors hand out copies, so callers may draw on them freely.
#[derive(Clone, Debug)]
pub struct BoardImage {
    color: RgbImage,
    gray: GrayImage,
    red: GrayImage,
}

impl BoardImage {
    pub fn new(color: RgbImage) -> Self {
        let gray = imageops::grayscale(&color);
        let red = GrayImage::from_fn(color.width(), color.height(), |x, y| {
            Luma([color.get_pixel(x, y)[0]])
        });
        Self { color, gray, red }
    }

    pub fn from_path(path: impl AsRef<Path>) -> image::ImageResult<Self> {
        Ok(Self::new(image::open(path)?.to_rgb8()))
    }

    /// Rescale a native capture by `1 / ratio` into the canonical resolution.
    ///
    /// `ratio` is native pixels per canonical pixel; `1.0` returns a copy.
    pub fn resized(&self, ratio: f32) -> Self {
        if !ratio.is_finite() || ratio <= 0.0 || (ratio - 1.0).abs() < 1e-6 {
            return self.clone();
        }
        let w = ((self.width() as f32) / ratio).round().max(1.0) as u32;
        let h = ((self.height() as f32) / ratio).round().max(1.0) as u32;
        Self::new(imageops::resize(&self.color, w, h, FilterType::Triangle))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.color.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn color(&self) -> RgbImage {
        self.color.clone()
    }

    pub fn gray(&self) -> GrayImage {
        self.gray.clone()
    }

    pub fn red(&self) -> GrayImage {
        self.red.clone()
    }

    #[inline]
    pub fn color_ref(&self) -> &RgbImage {
        &self.color
    }

    #[inline]
    pub fn gray_ref(&self) -> &GrayImage {
        &self.gray
    }

    #[inline]
    pub fn red_ref(&self) -> &GrayImage {
        &self.red
    }

    pub fn red_view(&self) -> GrayImageView<'_> {
        GrayImageView::from_image(&self.red)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn checker() -> RgbImage {
        RgbImage::from_fn(8, 4, |x, _| {
            if x % 2 == 0 {
                Rgb([200, 10, 10])
            } else {
                Rgb([20, 120, 240])
            }
        })
    }

    #[test]
    fn planes_are_derived_once_and_match_channels() {
        let img = BoardImage::new(checker());
        assert_eq!(img.red_ref().get_pixel(0, 0)[0], 200);
        assert_eq!(img.red_ref().get_pixel(1, 0)[0], 20);
        assert_eq!(img.gray_ref().dimensions(), (8, 4));
        assert!(img.gray_ref().get_pixel(1, 0)[0] > img.gray_ref().get_pixel(0, 0)[0]);
    }

    #[test]
    fn owned_accessors_do_not_alias_the_cache() {
        let img = BoardImage::new(checker());
        let mut gray = img.gray();
        gray.put_pixel(0, 0, Luma([255]));
        let mut red = img.red();
        red.put_pixel(0, 0, Luma([0]));
        assert_ne!(img.gray_ref().get_pixel(0, 0)[0], 255);
        assert_eq!(img.red_ref().get_pixel(0, 0)[0], 200);
    }

    #[test]
    fn resized_halves_dimensions() {
        let img = BoardImage::new(RgbImage::new(100, 60));
        let small = img.resized(2.0);
        assert_eq!((small.width(), small.height()), (50, 30));
        let same = img.resized(1.0);
        assert_eq!((same.width(), same.height()), (100, 60));
    }

    #[test]
    fn view_reads_zero_outside() {
        let img = BoardImage::new(checker());
        let view = img.red_view();
        assert_eq!(view.get(-1, 0), 0);
        assert_eq!(view.get(8, 0), 0);
        assert_eq!(view.get(2, 3), 200);
        approx::assert_abs_diff_eq!(sample_bilinear(&view, 0.5, 0.0), 110.0, epsilon = 1e-3);
    }
}
