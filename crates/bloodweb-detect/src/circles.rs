//! Hough-gradient circle detection.
//!
//! Node rims are brighter than both the node interior and the board
//! background, so the outer boundary of a rim has its gradient pointing at
//! the node center. Every edge pixel votes for the points at distance `r`
//! up its gradient, for every `r` in the configured radius range; the
//! inner boundary of the rim then votes away from the center. Peaks of the
//! Gaussian-smoothed accumulator become candidate centers, and each
//! candidate's radius comes from a histogram of the edge pixels whose
//! gradient points back at it.

use std::f32::consts::TAU;

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::edges::GradientField;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Minimum cosine between an edge gradient and the direction to the center
/// for the pixel to count toward a radius.
const RADIAL_ALIGNMENT: f32 = 0.8;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleParams {
    /// Radius range in canonical pixels.
    pub min_radius: f32,
    pub max_radius: f32,
    /// Sobel magnitude for a pixel to vote.
    pub edge_threshold: f32,
    /// Gaussian sigma of the accumulator smoothing, in pixels.
    pub accum_sigma: f32,
    /// Vote mass needed at a peak, as a fraction of `2π·min_radius`.
    pub min_vote_fraction: f32,
    /// Fraction of the rim that must be covered by aligned edge pixels.
    pub min_support: f32,
    /// Peaks closer than this are merged into the stronger one.
    pub min_center_distance: f32,
    pub max_circles: usize,
}

impl CircleParams {
    /// Regular bloodweb nodes at the canonical resolution.
    pub fn nodes() -> Self {
        Self {
            min_radius: 36.0,
            max_radius: 52.0,
            edge_threshold: 60.0,
            accum_sigma: 2.0,
            min_vote_fraction: 1.0,
            min_support: 0.3,
            min_center_distance: 60.0,
            max_circles: 128,
        }
    }

    /// The larger origin disc in the board center.
    pub fn origin() -> Self {
        Self {
            min_radius: 56.0,
            max_radius: 80.0,
            min_center_distance: 90.0,
            max_circles: 8,
            ..Self::nodes()
        }
    }

    fn radii(&self) -> Vec<f32> {
        (0u32..)
            .map(|k| self.min_radius + k as f32)
            .take_while(|&r| r <= self.max_radius)
            .collect()
    }
}

impl Default for CircleParams {
    fn default() -> Self {
        Self::nodes()
    }
}

/// One circle found in one capture.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircleCandidate {
    pub center: Point2<f32>,
    pub radius: f32,
    /// Vote mass around the peak.
    pub votes: f32,
    /// Rim coverage in `[0, 1]`.
    pub support: f32,
}

/// Axis-aligned pixel window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Square window of half-size `half` around `center`, clipped to the image.
    pub fn around(center: Point2<f32>, half: f32, width: u32, height: u32) -> Option<Self> {
        let x0 = (center.x - half).floor().max(0.0) as u32;
        let y0 = (center.y - half).floor().max(0.0) as u32;
        let x1 = ((center.x + half).ceil().max(0.0) as u32).min(width);
        let y1 = ((center.y + half).ceil().max(0.0) as u32).min(height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// Detect circles inside `roi` (whole image when `None`).
///
/// Candidates come back sorted by decreasing vote mass, in full-image
/// coordinates.
pub fn detect_circles_in(
    img: &GrayImage,
    params: &CircleParams,
    roi: Option<Roi>,
) -> Vec<CircleCandidate> {
    match roi {
        None => detect_circles(img, params),
        Some(roi) => {
            let sub = image::imageops::crop_imm(img, roi.x, roi.y, roi.width, roi.height).to_image();
            let offset = nalgebra::Vector2::new(roi.x as f32, roi.y as f32);
            detect_circles(&sub, params)
                .into_iter()
                .map(|c| CircleCandidate {
                    center: c.center + offset,
                    ..c
                })
                .collect()
        }
    }
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_circles(img: &GrayImage, params: &CircleParams) -> Vec<CircleCandidate> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w < 3 || h < 3 || params.min_radius < 1.0 || params.max_radius < params.min_radius {
        return Vec::new();
    }

    let grad = GradientField::sobel(img);
    let Some(smoothed) = smooth(vote_centers(&grad, params), w, h, params.accum_sigma) else {
        return Vec::new();
    };
    // Smoothing spreads a point mass `m` to a peak of `m / (2π·σ²)`.
    let spread = if params.accum_sigma > 0.0 {
        TAU * params.accum_sigma * params.accum_sigma
    } else {
        1.0
    };
    let threshold = (params.min_vote_fraction * TAU * params.min_radius).max(1.0) / spread;
    let peaks = find_peaks(&smoothed, w, h, threshold, params);

    let mut out = Vec::new();
    for (x, y, peak) in peaks {
        let center = refine_peak(&smoothed, w, h, x, y);
        let Some((radius, support)) = estimate_radius(&grad, center, params) else {
            continue;
        };
        if support < params.min_support {
            log::trace!(
                "circle at ({:.1}, {:.1}) rejected: support {support:.2}",
                center.x,
                center.y
            );
            continue;
        }
        out.push(CircleCandidate {
            center,
            radius,
            votes: peak * spread,
            support,
        });
        if out.len() >= params.max_circles {
            break;
        }
    }
    out
}

/// Bilinear deposit of one vote; `(x, y)` must be at least one pixel away
/// from the right and bottom borders.
#[inline]
fn deposit(acc: &mut [f32], stride: usize, x: f32, y: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let i = y0 * stride + x0;
    acc[i] += (1.0 - fx) * (1.0 - fy);
    acc[i + 1] += fx * (1.0 - fy);
    acc[i + stride] += (1.0 - fx) * fy;
    acc[i + stride + 1] += fx * fy;
}

fn vote_centers(grad: &GradientField, params: &CircleParams) -> Vec<f32> {
    let (w, h) = (grad.width, grad.height);
    let mut acc = vec![0.0f32; w * h];
    let radii = params.radii();
    let x_limit = (w - 1) as f32;
    let y_limit = (h - 1) as f32;

    for y in 0..h {
        for x in 0..w {
            let Some((ux, uy)) = grad.direction(x, y, params.edge_threshold) else {
                continue;
            };
            for &r in &radii {
                let vx = x as f32 + r * ux;
                let vy = y as f32 + r * uy;
                if vx >= 0.0 && vy >= 0.0 && vx < x_limit && vy < y_limit {
                    deposit(&mut acc, w, vx, vy);
                }
            }
        }
    }
    acc
}

fn smooth(acc: Vec<f32>, w: usize, h: usize, sigma: f32) -> Option<Vec<f32>> {
    if sigma <= 0.0 {
        return Some(acc);
    }
    let plane = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w as u32, h as u32, acc)?;
    Some(gaussian_blur_f32(&plane, sigma).into_raw())
}

/// Local maxima at or above `threshold`, strongest first, with greedy
/// suppression inside `min_center_distance`.
fn find_peaks(
    smoothed: &[f32],
    w: usize,
    h: usize,
    threshold: f32,
    params: &CircleParams,
) -> Vec<(usize, usize, f32)> {
    let mut cands = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let v = smoothed[i];
            if v < threshold {
                continue;
            }
            let mut is_max = true;
            'nb: for yy in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for xx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let j = yy * w + xx;
                    if smoothed[j] > v || (smoothed[j] == v && j < i) {
                        is_max = false;
                        break 'nb;
                    }
                }
            }
            if is_max {
                cands.push((x, y, v));
            }
        }
    }

    cands.sort_by(|a, b| b.2.total_cmp(&a.2).then((a.1, a.0).cmp(&(b.1, b.0))));

    let min_d2 = params.min_center_distance * params.min_center_distance;
    let mut kept: Vec<(usize, usize, f32)> = Vec::new();
    for c in cands {
        let close = kept.iter().any(|k| {
            let dx = k.0 as f32 - c.0 as f32;
            let dy = k.1 as f32 - c.1 as f32;
            dx * dx + dy * dy < min_d2
        });
        if !close {
            kept.push(c);
        }
    }
    kept
}

/// Sub-pixel peak from a parabola through the neighbors on each axis.
fn refine_peak(smoothed: &[f32], w: usize, h: usize, x: usize, y: usize) -> Point2<f32> {
    let at = |xx: usize, yy: usize| smoothed[yy * w + xx];
    let vertex = |l: f32, c: f32, r: f32| {
        let curvature = l - 2.0 * c + r;
        if curvature < 0.0 {
            (0.5 * (l - r) / curvature).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };
    let c = at(x, y);
    let dx = if x > 0 && x + 1 < w {
        vertex(at(x - 1, y), c, at(x + 1, y))
    } else {
        0.0
    };
    let dy = if y > 0 && y + 1 < h {
        vertex(at(x, y - 1), c, at(x, y + 1))
    } else {
        0.0
    };
    Point2::new(x as f32 + dx, y as f32 + dy)
}

/// Returns `(radius, support)` from a 1px histogram of the edge pixels
/// whose gradient points at `center`.
fn estimate_radius(
    grad: &GradientField,
    center: Point2<f32>,
    params: &CircleParams,
) -> Option<(f32, f32)> {
    let r_max = params.max_radius + 1.5;
    let r_min = (params.min_radius - 1.5).max(0.0);
    let mut hist = vec![0u32; r_max.ceil() as usize + 2];

    let x0 = (center.x - r_max).floor().max(0.0) as usize;
    let y0 = (center.y - r_max).floor().max(0.0) as usize;
    let x1 = ((center.x + r_max).ceil().max(0.0) as usize).min(grad.width.saturating_sub(1));
    let y1 = ((center.y + r_max).ceil().max(0.0) as usize).min(grad.height.saturating_sub(1));

    for y in y0..=y1 {
        for x in x0..=x1 {
            let Some((ux, uy)) = grad.direction(x, y, params.edge_threshold) else {
                continue;
            };
            let dx = center.x - x as f32;
            let dy = center.y - y as f32;
            let d = dx.hypot(dy);
            if d < r_min || d > r_max || d <= f32::EPSILON {
                continue;
            }
            if (ux * dx + uy * dy) / d < RADIAL_ALIGNMENT {
                continue;
            }
            hist[d.round() as usize] += 1;
        }
    }

    let k_min = (params.min_radius.round() as usize).max(1);
    let k_max = (params.max_radius.round() as usize).min(hist.len() - 2);
    let mut best: Option<(usize, u32)> = None;
    for k in k_min..=k_max {
        let s = hist[k - 1] + hist[k] + hist[k + 1];
        if s > 0 && best.is_none_or(|(_, bs)| s > bs) {
            best = Some((k, s));
        }
    }
    let (k, total) = best?;

    let weighted: f32 = (k - 1..=k + 1).map(|i| i as f32 * hist[i] as f32).sum();
    let radius = weighted / total as f32;
    // Sobel edges are about two pixels thick.
    let support = (total as f32 / (2.0 * TAU * radius)).min(1.0);
    Some((radius, support))
}
