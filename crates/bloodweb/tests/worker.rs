mod common;

use std::sync::atomic::Ordering;

use bloodweb::{
    BoardError, CycleOutcome, RecordingObserver, ScreenScale, TemplateAtlas, Timing, Worker,
    WorkerError, WorkerParams,
};
use common::*;
use image::imageops::{self, FilterType};
use image::RgbImage;

fn params() -> WorkerParams {
    WorkerParams {
        timing: Timing::ZERO,
        max_capture_attempts: 2,
        ..WorkerParams::default()
    }
}

fn worker(
    capture: FakeCapture,
    atlas: TemplateAtlas,
    scale: ScreenScale,
) -> Worker<FakeCapture, RecordingPointer> {
    Worker::new(detector(), atlas, params(), scale, capture, RecordingPointer::default())
}

fn assert_claim(events: &[Input], x: f32, y: f32) {
    assert!(moved_near(events[0], x, y, 3.0), "{events:?}");
    assert_eq!(events[1], Input::Press);
    assert_eq!(events[2], Input::Move(0, 0));
    assert_eq!(events[3], Input::Release);
}

#[test]
fn clears_the_board_and_advances() {
    let scale = ScreenScale {
        ratio: 1.0,
        offset: [100, 50],
    };
    let mut w = worker(FakeCapture::new(vec![board()]), atlas(), scale)
        .with_observer(RecordingObserver::default());

    let outcome = w.run_cycle().unwrap();
    assert_eq!(outcome, CycleOutcome::Cleared { claims: 2 });

    // A first, then C which A unlocked, then the level-clear click.
    let events = w.pointer().take();
    assert_eq!(events.len(), 9, "{events:?}");
    assert_claim(&events[0..4], A.0 + 100.0, A.1 + 50.0);
    assert_claim(&events[4..8], C.0 + 100.0, C.1 + 50.0);
    assert_eq!(events[8], Input::Click);

    let obs = w.observer();
    let order: Vec<(usize, u32)> = obs.rounds.iter().map(|(i, id)| (*i, id.slot)).collect();
    assert_eq!(order, vec![(1, 1), (2, 2)]);
    assert_eq!(obs.cleared, vec![2]);
    assert_eq!(obs.raw_nodes, 3);
}

#[test]
fn mystery_box_gets_an_extra_click() {
    let mut w = worker(
        FakeCapture::new(vec![board()]),
        atlas_with("iconHelp_mysteryBox"),
        ScreenScale::IDENTITY,
    );
    w.run_cycle().unwrap();

    let events = w.pointer().take();
    assert_eq!(events.len(), 10, "{events:?}");
    assert_claim(&events[0..4], A.0, A.1);
    assert_eq!(events[4], Input::Click);
    assert_claim(&events[5..9], C.0, C.1);
    assert_eq!(events[9], Input::Click);
}

#[test]
fn native_captures_are_rescaled() {
    let native = imageops::resize(&board(), SIZE * 2, SIZE * 2, FilterType::Nearest);
    let scale = ScreenScale {
        ratio: 2.0,
        offset: [0, 0],
    };
    let mut w = worker(FakeCapture::new(vec![native]), atlas(), scale);
    assert_eq!(w.run_cycle().unwrap(), CycleOutcome::Cleared { claims: 2 });

    let events = w.pointer().take();
    assert!(moved_near(events[0], A.0 * 2.0, A.1 * 2.0, 6.0), "{events:?}");
}

#[test]
fn blank_captures_are_retried_then_given_up() {
    let capture = FakeCapture::new(vec![RgbImage::new(SIZE, SIZE)]);
    let calls = capture.calls.clone();
    let mut w = worker(capture, atlas(), ScreenScale::IDENTITY);

    let err = w.run_cycle().unwrap_err();
    match err {
        WorkerError::GaveUp { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(last, BoardError::InconclusiveDetection { .. }));
        }
        other => panic!("unexpected {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert!(w.pointer().take().is_empty());
}

#[test]
fn recovers_when_a_later_capture_is_usable() {
    let blank = RgbImage::new(SIZE, SIZE);
    let frames = vec![blank.clone(), blank.clone(), blank, board()];
    let capture = FakeCapture::new(frames);
    let calls = capture.calls.clone();
    let mut w = worker(capture, atlas(), ScreenScale::IDENTITY);

    assert_eq!(w.run_cycle().unwrap(), CycleOutcome::Cleared { claims: 2 });
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn prestige_board_pauses_without_input() {
    let mut atlas = atlas();
    atlas
        .push_origin("originPrestige", true, &pattern(66, plus))
        .unwrap();
    let mut w = worker(FakeCapture::new(vec![board()]), atlas, ScreenScale::IDENTITY);

    let err = w.run_cycle().unwrap_err();
    assert!(err.is_pause(), "{err}");
    assert!(w.pointer().take().is_empty());
}

#[test]
fn capture_failure_ends_the_cycle() {
    let mut w = worker(FakeCapture::failing("display gone"), atlas(), ScreenScale::IDENTITY);
    let err = w.run_cycle().unwrap_err();
    assert!(matches!(err, WorkerError::Capture(ref m) if m == "display gone"), "{err}");
    assert!(w.run().is_err());
}

#[test]
fn raised_stop_flag_skips_the_cycle() {
    let capture = FakeCapture::new(vec![board()]);
    let calls = capture.calls.clone();
    let mut w = worker(capture, atlas(), ScreenScale::IDENTITY);
    w.stop_flag().store(true, Ordering::Relaxed);

    assert_eq!(w.run_cycle().unwrap(), CycleOutcome::Stopped { claims: 0 });
    assert!(w.run().is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
