//! Native screen pixels <-> canonical reference pixels.

use log::warn;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Width of the canonical reference resolution.
pub const REFERENCE_WIDTH: u32 = 2560;
/// Height of the canonical reference resolution.
pub const REFERENCE_HEIGHT: u32 = 1440;
/// UI scale (percent) of the canonical reference resolution.
pub const REFERENCE_UI_SCALE: u32 = 100;

/// Display resolution plus in-game UI scale (percent).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    pub ui_scale: u32,
}

impl Resolution {
    pub const REFERENCE: Resolution = Resolution {
        width: REFERENCE_WIDTH,
        height: REFERENCE_HEIGHT,
        ui_scale: REFERENCE_UI_SCALE,
    };

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn is_widescreen(&self) -> bool {
        (self.aspect_ratio() - 16.0 / 9.0).abs() <= 0.01
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Linear mapping between the captured screen region and canonical pixels.
///
/// `ratio` is native pixels per canonical pixel, `offset` the top-left
/// corner of the board region on screen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenScale {
    pub ratio: f32,
    pub offset: [i32; 2],
}

impl ScreenScale {
    pub const IDENTITY: ScreenScale = ScreenScale {
        ratio: 1.0,
        offset: [0, 0],
    };

    /// Derive the scale once from the configured display.
    ///
    /// Non-16:9 displays are not supported and fall back to ratio `1.0`.
    pub fn from_resolution(resolution: Resolution, top_left: [i32; 2]) -> Self {
        let ratio = if !resolution.is_widescreen() {
            warn!(
                "unsupported aspect ratio {:.3} ({}x{}), assuming reference scale",
                resolution.aspect_ratio(),
                resolution.width,
                resolution.height
            );
            1.0
        } else {
            resolution.width as f32 / REFERENCE_WIDTH as f32 * resolution.ui_scale as f32
                / REFERENCE_UI_SCALE as f32
        };
        Self {
            ratio,
            offset: top_left,
        }
    }

    /// Canonical board position -> absolute screen pixel.
    pub fn to_screen(&self, p: Point2<f32>) -> [i32; 2] {
        [
            self.offset[0] + (p.x * self.ratio).round() as i32,
            self.offset[1] + (p.y * self.ratio).round() as i32,
        ]
    }

    /// Absolute screen pixel -> canonical board position.
    pub fn to_canonical(&self, screen: [i32; 2]) -> Point2<f32> {
        Point2::new(
            (screen[0] - self.offset[0]) as f32 / self.ratio,
            (screen[1] - self.offset[1]) as f32 / self.ratio,
        )
    }
}

impl Default for ScreenScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}
