//! JSON configuration, template packs and detection reports.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bloodweb_core::{BoardGraph, BoardImage, Connection, NodeRecord, Resolution, ScreenScale};
use bloodweb_detect::{AtlasError, Detector, DetectorParams, TemplateAtlas};
use bloodweb_select::{Round, SelectorParams};
use serde::{Deserialize, Serialize};

use crate::{Timing, WorkerParams};

/// Subdirectory of a template pack holding origin variants.
pub const ORIGINS_DIR: &str = "origins";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("bad template {path}: {source}")]
    Atlas {
        path: PathBuf,
        #[source]
        source: AtlasError,
    },
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

fn default_capture_count() -> usize {
    WorkerParams::default().capture_count
}

fn default_max_capture_attempts() -> usize {
    WorkerParams::default().max_capture_attempts
}

fn default_icon_size() -> u32 {
    TemplateAtlas::DEFAULT_ICON_SIZE
}

/// Everything needed to run the worker or replay saved captures.
///
/// Relative paths are resolved against the directory passed to the
/// loaders, normally the one holding the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodwebConfig {
    /// Template pack: one PNG per icon, origin variants under `origins/`.
    pub atlas_dir: String,
    /// Value table JSON; without it every icon gets the value `0`.
    #[serde(default)]
    pub values_path: Option<String>,
    #[serde(default)]
    pub resolution: Resolution,
    /// Screen position of the board region's top-left corner.
    #[serde(default)]
    pub top_left: [i32; 2],
    #[serde(default = "default_capture_count")]
    pub capture_count: usize,
    #[serde(default = "default_max_capture_attempts")]
    pub max_capture_attempts: usize,
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,
    #[serde(default)]
    pub detector: DetectorParams,
    #[serde(default)]
    pub selector: SelectorParams,
    #[serde(default)]
    pub timing: Timing,
}

impl BloodwebConfig {
    /// Config with defaults for everything but the template pack.
    pub fn new(atlas_dir: impl Into<String>) -> Self {
        Self {
            atlas_dir: atlas_dir.into(),
            values_path: None,
            resolution: Resolution::default(),
            top_left: [0, 0],
            capture_count: default_capture_count(),
            max_capture_attempts: default_max_capture_attempts(),
            icon_size: default_icon_size(),
            detector: DetectorParams::default(),
            selector: SelectorParams::default(),
            timing: Timing::default(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn screen_scale(&self) -> ScreenScale {
        ScreenScale::from_resolution(self.resolution, self.top_left)
    }

    pub fn build_detector(&self) -> Detector {
        Detector::new(self.detector.clone())
    }

    pub fn worker_params(&self) -> WorkerParams {
        WorkerParams {
            capture_count: self.capture_count,
            max_capture_attempts: self.max_capture_attempts,
            selector: self.selector,
            timing: self.timing,
        }
    }

    /// Value table, or an empty one when no path is configured.
    pub fn load_values(&self, base: impl AsRef<Path>) -> Result<ValueTable, ConfigError> {
        match &self.values_path {
            Some(p) => ValueTable::load_json(resolve(base.as_ref(), p)),
            None => Ok(ValueTable::default()),
        }
    }

    pub fn load_atlas(&self, base: impl AsRef<Path>) -> Result<TemplateAtlas, ConfigError> {
        let base = base.as_ref();
        let values = self.load_values(base)?;
        load_atlas_dir(resolve(base, &self.atlas_dir), &values, self.icon_size)
    }
}

fn resolve(base: &Path, p: &str) -> PathBuf {
    let p = Path::new(p);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Icon identity -> value, e.g. `{ "default": 1, "iconAddon_x": 700 }`.
///
/// `default` applies to identities missing from the table and to nodes
/// whose icon could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueTable {
    #[serde(default)]
    pub default: i32,
    #[serde(flatten)]
    pub values: BTreeMap<String, i32>,
}

impl ValueTable {
    /// Value for an identity; a trailing `.png` is ignored.
    pub fn value_of(&self, identity: &str) -> i32 {
        let key = identity.strip_suffix(".png").unwrap_or(identity);
        self.values.get(key).copied().unwrap_or(self.default)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn png_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if path.is_file() && is_png {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn load_gray(path: &Path) -> Result<image::GrayImage, ConfigError> {
    image::open(path)
        .map(|img| img.to_luma8())
        .map_err(|source| ConfigError::Image {
            path: path.to_path_buf(),
            source,
        })
}

fn stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Build an atlas from a template pack directory.
///
/// Every PNG directly in `dir` is an icon named after its file stem. PNGs in
/// `dir/origins/` are origin variants; a name containing `prestige` marks a
/// board that must not be played.
pub fn load_atlas_dir(
    dir: impl AsRef<Path>,
    values: &ValueTable,
    icon_size: u32,
) -> Result<TemplateAtlas, ConfigError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ConfigError::NotADirectory(dir.to_path_buf()));
    }

    let mut atlas = TemplateAtlas::new(icon_size).with_fallback_value(values.default);
    for path in png_files(dir)? {
        let Some(name) = stem(&path) else {
            log::warn!("skipping template with a non-UTF-8 name: {}", path.display());
            continue;
        };
        let icon = load_gray(&path)?;
        atlas
            .push(name, values.value_of(name), &icon)
            .map_err(|source| ConfigError::Atlas {
                path: path.clone(),
                source,
            })?;
    }

    let origins = dir.join(ORIGINS_DIR);
    if origins.is_dir() {
        for path in png_files(&origins)? {
            let Some(name) = stem(&path) else {
                continue;
            };
            let prestige = name.to_ascii_lowercase().contains("prestige");
            let icon = load_gray(&path)?;
            atlas
                .push_origin(name, prestige, &icon)
                .map_err(|source| ConfigError::Atlas {
                    path: path.clone(),
                    source,
                })?;
        }
    }

    log::info!(
        "loaded {} icon(s) and {} origin variant(s) from {}",
        atlas.len(),
        atlas.origins().len(),
        dir.display()
    );
    Ok(atlas)
}

/// Saved screenshots, rescaled into the canonical resolution.
pub fn load_captures(
    paths: &[PathBuf],
    scale: &ScreenScale,
) -> Result<Vec<BoardImage>, ConfigError> {
    paths
        .iter()
        .map(|p| {
            BoardImage::from_path(p)
                .map(|img| img.resized(scale.ratio))
                .map_err(|source| ConfigError::Image {
                    path: p.clone(),
                    source,
                })
        })
        .collect()
}

/// Result of detecting (and optionally planning) one board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardReport {
    pub image_paths: Vec<String>,
    pub config_path: String,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub claim_order: Option<Vec<Round>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BoardReport {
    pub fn new(image_paths: &[PathBuf], config_path: &Path) -> Self {
        Self {
            image_paths: image_paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            config_path: config_path.to_string_lossy().into_owned(),
            nodes: Vec::new(),
            connections: Vec::new(),
            claim_order: None,
            error: None,
        }
    }

    /// Snapshot of the graph as detected, before any claim.
    pub fn set_graph(&mut self, graph: &BoardGraph) {
        self.nodes = graph.records();
        self.connections = graph.connections().to_vec();
        self.error = None;
    }

    pub fn set_claim_order(&mut self, rounds: Vec<Round>) {
        self.claim_order = Some(rounds);
    }

    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
