//! Icon template atlas.
//!
//! Templates are resized to a common square size and stored zero-mean,
//! unit-norm in one contiguous buffer, so the normalized cross-correlation
//! against a patch is a single dot product per template.

use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AtlasError {
    #[error("template `{0}` has no contrast")]
    FlatTemplate(String),
    #[error("template `{0}` is empty")]
    EmptyTemplate(String),
    #[error("duplicate template `{0}`")]
    Duplicate(String),
}

/// One named icon and its desirability value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub identity: String,
    pub value: i32,
}

/// Reference image of an origin variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OriginTemplate {
    pub name: String,
    /// A prestige origin means the board is not a regular bloodweb.
    pub prestige: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IconMatch<'a> {
    pub index: usize,
    pub entry: &'a TemplateEntry,
    /// Normalized cross-correlation in `[-1, 1]`.
    pub score: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OriginMatch<'a> {
    pub template: &'a OriginTemplate,
    pub score: f32,
}

#[derive(Clone, Debug)]
pub struct TemplateAtlas {
    icon_size: u32,
    fallback_value: i32,
    entries: Vec<TemplateEntry>,
    pixels: Vec<f32>,
    origins: Vec<OriginTemplate>,
    origin_pixels: Vec<f32>,
}

impl TemplateAtlas {
    pub const DEFAULT_ICON_SIZE: u32 = 48;

    pub fn new(icon_size: u32) -> Self {
        Self {
            icon_size: icon_size.max(4),
            fallback_value: 0,
            entries: Vec::new(),
            pixels: Vec::new(),
            origins: Vec::new(),
            origin_pixels: Vec::new(),
        }
    }

    #[inline]
    pub fn icon_size(&self) -> u32 {
        self.icon_size
    }

    /// Value given to nodes whose icon could not be resolved.
    pub fn with_fallback_value(mut self, value: i32) -> Self {
        self.fallback_value = value;
        self
    }

    #[inline]
    pub fn fallback_value(&self) -> i32 {
        self.fallback_value
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn origins(&self) -> &[OriginTemplate] {
        &self.origins
    }

    pub fn value_of(&self, identity: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|e| e.identity == identity)
            .map(|e| e.value)
    }

    /// Add an icon. A trailing `.png` in `identity` is dropped.
    pub fn push(&mut self, identity: &str, value: i32, icon: &GrayImage) -> Result<(), AtlasError> {
        let identity = identity.strip_suffix(".png").unwrap_or(identity).to_string();
        if self.entries.iter().any(|e| e.identity == identity) {
            return Err(AtlasError::Duplicate(identity));
        }
        let normalized = self.normalize_checked(&identity, icon)?;
        self.pixels.extend_from_slice(&normalized);
        self.entries.push(TemplateEntry { identity, value });
        Ok(())
    }

    pub fn push_origin(&mut self, name: &str, prestige: bool, icon: &GrayImage) -> Result<(), AtlasError> {
        let name = name.strip_suffix(".png").unwrap_or(name).to_string();
        if self.origins.iter().any(|o| o.name == name) {
            return Err(AtlasError::Duplicate(name));
        }
        let normalized = self.normalize_checked(&name, icon)?;
        self.origin_pixels.extend_from_slice(&normalized);
        self.origins.push(OriginTemplate { name, prestige });
        Ok(())
    }

    fn normalize_checked(&self, name: &str, icon: &GrayImage) -> Result<Vec<f32>, AtlasError> {
        if icon.width() == 0 || icon.height() == 0 {
            return Err(AtlasError::EmptyTemplate(name.to_string()));
        }
        self.normalize(icon)
            .ok_or_else(|| AtlasError::FlatTemplate(name.to_string()))
    }

    /// Resize to the icon size, subtract the mean, scale to unit norm.
    /// `None` for empty or flat patches.
    pub fn normalize(&self, patch: &GrayImage) -> Option<Vec<f32>> {
        if patch.width() == 0 || patch.height() == 0 {
            return None;
        }
        let resized = imageops::resize(patch, self.icon_size, self.icon_size, FilterType::Triangle);
        let mut v: Vec<f32> = resized.as_raw().iter().map(|&p| p as f32).collect();
        let mean = v.iter().sum::<f32>() / v.len() as f32;
        v.iter_mut().for_each(|p| *p -= mean);
        unit_norm(v)
    }

    /// Best icon for an already normalized patch.
    pub fn best_match(&self, normalized: &[f32]) -> Option<IconMatch<'_>> {
        best_in(&self.pixels, self.stride(), normalized).map(|(index, score)| IconMatch {
            index,
            entry: &self.entries[index],
            score,
        })
    }

    /// Best origin variant for an already normalized patch.
    pub fn best_origin_match(&self, normalized: &[f32]) -> Option<OriginMatch<'_>> {
        best_in(&self.origin_pixels, self.stride(), normalized).map(|(index, score)| OriginMatch {
            template: &self.origins[index],
            score,
        })
    }

    #[inline]
    fn stride(&self) -> usize {
        (self.icon_size * self.icon_size) as usize
    }
}

impl Default for TemplateAtlas {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ICON_SIZE)
    }
}

/// Mean of several normalized patches, renormalized.
pub fn average_normalized(patches: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = patches.first()?;
    let mut acc = vec![0.0f32; first.len()];
    for p in patches {
        if p.len() != acc.len() {
            return None;
        }
        acc.iter_mut().zip(p).for_each(|(a, b)| *a += b);
    }
    unit_norm(acc)
}

fn unit_norm(mut v: Vec<f32>) -> Option<Vec<f32>> {
    let norm = v.iter().map(|p| p * p).sum::<f32>().sqrt();
    if norm <= 1e-3 {
        return None;
    }
    v.iter_mut().for_each(|p| *p /= norm);
    Some(v)
}

fn best_in(pixels: &[f32], stride: usize, patch: &[f32]) -> Option<(usize, f32)> {
    if patch.len() != stride || stride == 0 {
        return None;
    }
    let mut best: Option<(usize, f32)> = None;
    for (i, tpl) in pixels.chunks_exact(stride).enumerate() {
        let score: f32 = tpl.iter().zip(patch).map(|(a, b)| a * b).sum();
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn half(w: u32, left_bright: bool) -> GrayImage {
        GrayImage::from_fn(w, w, |x, _| {
            let bright = (x < w / 2) == left_bright;
            Luma([if bright { 220 } else { 20 }])
        })
    }

    fn stripes(w: u32) -> GrayImage {
        GrayImage::from_fn(w, w, |_, y| Luma([if (y / 4) % 2 == 0 { 200 } else { 30 }]))
    }

    #[test]
    fn matches_the_right_icon_across_sizes() {
        let mut atlas = TemplateAtlas::new(32);
        atlas.push("iconLeft.png", 10, &half(64, true)).unwrap();
        atlas.push("iconStripes", 20, &stripes(64)).unwrap();
        assert_eq!(atlas.len(), 2);
        assert_eq!(atlas.value_of("iconLeft"), Some(10));

        let patch = atlas.normalize(&half(50, true)).unwrap();
        let m = atlas.best_match(&patch).unwrap();
        assert_eq!(m.entry.identity, "iconLeft");
        assert!(m.score > 0.9, "score {}", m.score);

        let inverted = atlas.normalize(&half(50, false)).unwrap();
        let m = atlas.best_match(&inverted).unwrap();
        assert!(m.score < 0.5);
    }

    #[test]
    fn flat_and_duplicate_templates_are_rejected() {
        let mut atlas = TemplateAtlas::new(16);
        let flat = GrayImage::from_pixel(20, 20, Luma([128]));
        assert_eq!(atlas.push("flat", 1, &flat), Err(AtlasError::FlatTemplate("flat".into())));
        atlas.push("a", 1, &stripes(20)).unwrap();
        assert_eq!(atlas.push("a.png", 2, &stripes(20)), Err(AtlasError::Duplicate("a".into())));
        assert!(atlas.normalize(&flat).is_none());
    }

    #[test]
    fn empty_atlas_matches_nothing() {
        let atlas = TemplateAtlas::new(16);
        let patch = atlas.normalize(&stripes(16)).unwrap();
        assert!(atlas.best_match(&patch).is_none());
        assert!(atlas.best_origin_match(&patch).is_none());
    }

    #[test]
    fn averaging_keeps_shared_structure() {
        let atlas = TemplateAtlas::new(16);
        let a = atlas.normalize(&half(16, true)).unwrap();
        let b = atlas.normalize(&half(16, true)).unwrap();
        let avg = average_normalized(&[a.clone(), b]).unwrap();
        let dot: f32 = avg.iter().zip(&a).map(|(x, y)| x * y).sum();
        approx::assert_abs_diff_eq!(dot, 1.0, epsilon = 1e-4);
        assert!(average_normalized(&[]).is_none());
    }
}
