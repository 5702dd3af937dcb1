//! Hough line segments on an edge map.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::edges::EdgeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

const THETA_BINS: usize = 180;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LineParams {
    pub edge_threshold: f32,
    /// Extra margin added to a node radius when masking it out of the edge map.
    pub mask_margin: f32,
    /// Accumulator votes needed for a line.
    pub min_votes: u32,
    /// Suppression window around an accepted line.
    pub rho_window: f32,
    pub theta_window: usize,
    pub max_lines: usize,
    /// Perpendicular search, in pixels, while walking a line.
    pub perpendicular_tolerance: i32,
    /// Missing pixels bridged inside one segment.
    pub gap_tolerance: usize,
    pub min_segment_length: f32,
    /// Slack between a segment end and the masked node rim.
    pub endpoint_tolerance: f32,
}

impl Default for LineParams {
    fn default() -> Self {
        Self {
            edge_threshold: 60.0,
            mask_margin: 6.0,
            min_votes: 30,
            rho_window: 10.0,
            theta_window: 5,
            max_lines: 256,
            perpendicular_tolerance: 1,
            gap_tolerance: 6,
            min_segment_length: 20.0,
            endpoint_tolerance: 10.0,
        }
    }
}

/// Line in normal form: `x·cos θ + y·sin θ = rho`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoughLine {
    pub rho: f32,
    pub theta: f32,
    pub votes: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Point2<f32>,
    pub end: Point2<f32>,
}

impl LineSegment {
    pub fn length(&self) -> f32 {
        (self.end - self.start).norm()
    }
}

/// Strongest lines, with greedy suppression in `(rho, theta)`.
pub fn hough_lines(edges: &EdgeMap, params: &LineParams) -> Vec<HoughLine> {
    let (w, h) = (edges.width(), edges.height());
    let max_rho = ((w * w + h * h) as f32).sqrt().ceil() as i32;
    let rho_bins = (2 * max_rho + 1) as usize;

    let (sin_t, cos_t): (Vec<f32>, Vec<f32>) = (0..THETA_BINS)
        .map(|t| (t as f32).to_radians().sin_cos())
        .unzip();

    let mut acc = vec![0u32; THETA_BINS * rho_bins];
    for y in 0..h {
        for x in 0..w {
            if !edges.is_edge(x as i32, y as i32) {
                continue;
            }
            for t in 0..THETA_BINS {
                let rho = (x as f32 * cos_t[t] + y as f32 * sin_t[t]).round() as i32;
                acc[t * rho_bins + (rho + max_rho) as usize] += 1;
            }
        }
    }

    let mut cands: Vec<(usize, usize, u32)> = acc
        .iter()
        .enumerate()
        .filter(|(_, &v)| v >= params.min_votes)
        .map(|(i, &v)| (i / rho_bins, i % rho_bins, v))
        .collect();
    cands.sort_by(|a, b| b.2.cmp(&a.2).then((a.0, a.1).cmp(&(b.0, b.1))));

    let mut kept: Vec<(usize, usize, u32)> = Vec::new();
    for c in cands {
        let close = kept.iter().any(|k| {
            let dt = k.0.abs_diff(c.0);
            let rk = k.1 as f32 - max_rho as f32;
            let rc = c.1 as f32 - max_rho as f32;
            if dt <= params.theta_window {
                (rk - rc).abs() <= params.rho_window
            } else if THETA_BINS - dt <= params.theta_window {
                // (θ, ρ) and (θ + π, -ρ) are the same line.
                (rk + rc).abs() <= params.rho_window
            } else {
                false
            }
        });
        if close {
            continue;
        }
        kept.push(c);
        if kept.len() >= params.max_lines {
            break;
        }
    }

    kept.into_iter()
        .map(|(t, r, votes)| HoughLine {
            rho: r as f32 - max_rho as f32,
            theta: (t as f32).to_radians(),
            votes,
        })
        .collect()
}

/// Runs of edge pixels along `line`, split at gaps longer than the tolerance.
pub fn segments_on_line(edges: &EdgeMap, line: &HoughLine, params: &LineParams) -> Vec<LineSegment> {
    let (s, c) = line.theta.sin_cos();
    let base = Point2::new(line.rho * c, line.rho * s);
    let dir = nalgebra::Vector2::new(-s, c);
    let normal = nalgebra::Vector2::new(c, s);
    let half = ((edges.width().pow(2) + edges.height().pow(2)) as f32).sqrt().ceil() as i32;
    let tol = params.perpendicular_tolerance.max(0);

    let mut out = Vec::new();
    let mut run: Option<(f32, f32)> = None;
    let mut gap = 0usize;

    let mut close_run = |run: &mut Option<(f32, f32)>| {
        if let Some((t0, t1)) = run.take() {
            if t1 - t0 >= params.min_segment_length {
                out.push(LineSegment {
                    start: base + dir * t0,
                    end: base + dir * t1,
                });
            }
        }
    };

    for i in -half..=half {
        let t = i as f32;
        let p = base + dir * t;
        let hit = (-tol..=tol).any(|k| {
            let q = p + normal * k as f32;
            edges.is_edge(q.x.round() as i32, q.y.round() as i32)
        });
        if hit {
            run = Some(match run {
                Some((t0, _)) => (t0, t),
                None => (t, t),
            });
            gap = 0;
        } else if run.is_some() {
            gap += 1;
            if gap > params.gap_tolerance {
                close_run(&mut run);
                gap = 0;
            }
        }
    }
    close_run(&mut run);
    out
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(edges, params), fields(width = edges.width(), height = edges.height()))
)]
pub fn detect_segments(edges: &EdgeMap, params: &LineParams) -> Vec<LineSegment> {
    let lines = hough_lines(edges, params);
    log::trace!("{} hough lines", lines.len());
    lines
        .iter()
        .flat_map(|l| segments_on_line(edges, l, params))
        .collect()
}
