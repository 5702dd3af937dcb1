#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bloodweb::{PointerDriver, ScreenCapture, WorkerError};
use image::RgbImage;

#[path = "../../../bloodweb-detect/tests/common/mod.rs"]
mod board;
pub use board::*;

/// Template pack on disk: icons, origin variants and a value table.
pub fn write_pack(dir: &Path, prestige: bool) {
    let pack = dir.join("pack");
    std::fs::create_dir_all(pack.join("origins")).unwrap();
    pattern(44, half_square)
        .save(pack.join("iconAddon_left.png"))
        .unwrap();
    pattern(44, |dx, dy| half_square(-dx, dy))
        .save(pack.join("iconAddon_right.png"))
        .unwrap();
    if prestige {
        pattern(66, plus)
            .save(pack.join("origins").join("originPrestige.png"))
            .unwrap();
    }
    std::fs::write(
        dir.join("values.json"),
        r#"{ "default": 5, "iconAddon_left": 700, "iconAddon_right": 10 }"#,
    )
    .unwrap();
}

/// Config matching [`write_pack`] and the synthetic board.
pub fn config_json() -> &'static str {
    r#"{
        "atlas_dir": "pack",
        "values_path": "values.json",
        "icon_size": 32,
        "detector": { "icons": { "crop_fraction": 0.5 } }
    }"#
}

/// Replays a fixed list of frames, repeating the last one.
pub struct FakeCapture {
    frames: Vec<Result<RgbImage, String>>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeCapture {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            frames: vec![Err(msg.to_string())],
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ScreenCapture for FakeCapture {
    fn capture(&mut self) -> Result<RgbImage, WorkerError> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        let frame = &self.frames[i.min(self.frames.len() - 1)];
        frame.clone().map_err(WorkerError::Capture)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Move(i32, i32),
    Press,
    Release,
    Click,
}

#[derive(Clone, Default)]
pub struct RecordingPointer {
    pub events: Arc<Mutex<Vec<Input>>>,
}

impl RecordingPointer {
    pub fn take(&self) -> Vec<Input> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    fn push(&self, e: Input) -> Result<(), WorkerError> {
        self.events.lock().unwrap().push(e);
        Ok(())
    }
}

impl PointerDriver for RecordingPointer {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), WorkerError> {
        self.push(Input::Move(x, y))
    }

    fn press(&mut self) -> Result<(), WorkerError> {
        self.push(Input::Press)
    }

    fn release(&mut self) -> Result<(), WorkerError> {
        self.push(Input::Release)
    }

    fn click(&mut self) -> Result<(), WorkerError> {
        self.push(Input::Click)
    }
}

/// `Move` within `tol` pixels of `(x, y)`.
pub fn moved_near(e: Input, x: f32, y: f32, tol: f32) -> bool {
    match e {
        Input::Move(mx, my) => (mx as f32 - x).abs() <= tol && (my as f32 - y).abs() <= tol,
        _ => false,
    }
}
