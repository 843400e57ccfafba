use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::PixelFormat;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

fn frame(index: u64) -> FrameBuffer {
    FrameBuffer {
        tick: Tick::new(index, 40),
        width: 1,
        height: 1,
        format: PixelFormat::Rgba8,
        data: vec![1, 2, 3, 255],
    }
}

/// Fails every save whose path contains "bad", panics on "boom".
#[derive(Default)]
struct FlakySink {
    calls: AtomicUsize,
}

impl ImageSink for FlakySink {
    fn save(&self, _frame: &FrameBuffer, path: &Path) -> FramestepResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = path.to_string_lossy();
        if name.contains("boom") {
            panic!("encoder exploded");
        }
        if name.contains("bad") {
            return Err(FramestepError::save("disk full"));
        }
        Ok(())
    }
}

#[test]
fn every_submission_completes_exactly_once() {
    let memory = Arc::new(InMemorySink::new());
    let mut frames = FrameSink::new(memory.clone(), Some(3)).unwrap();
    for i in 0..20 {
        frames.submit(frame(i), PathBuf::from(format!("f_{}.png", i + 1)));
    }
    assert_eq!(frames.submitted(), 20);

    frames.wait_idle();
    assert_eq!(frames.completed(), 20);
    assert_eq!(frames.failed(), 0);
    assert_eq!(frames.outstanding(), 0);
    assert!(frames.pending().iter().all(|p| p.state == SaveState::Saved));

    let ticks: Vec<u64> = memory.frames().iter().map(|(_, f)| f.tick.index()).collect();
    assert_eq!(ticks, (0..20).collect::<Vec<_>>());
}

#[test]
fn failures_and_panics_still_count_as_completed() {
    let sink = Arc::new(FlakySink::default());
    let mut frames = FrameSink::new(sink.clone(), Some(2)).unwrap();
    frames.submit(frame(0), PathBuf::from("ok.png"));
    frames.submit(frame(1), PathBuf::from("bad.png"));
    frames.submit(frame(2), PathBuf::from("boom.png"));
    frames.wait_idle();

    assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    assert_eq!(frames.completed(), 3);
    assert_eq!(frames.failed(), 2);
    match &frames.pending()[1].state {
        SaveState::Failed(reason) => assert!(reason.contains("disk full"), "{reason}"),
        other => panic!("unexpected state {other:?}"),
    }
    match &frames.pending()[2].state {
        SaveState::Failed(reason) => assert!(reason.contains("panicked"), "{reason}"),
        other => panic!("unexpected state {other:?}"),
    }
}

#[test]
fn duplicate_or_unknown_completions_are_ignored() {
    let mut frames = FrameSink::new(Arc::new(InMemorySink::new()), Some(1)).unwrap();
    frames.submit(frame(0), PathBuf::from("a.png"));
    frames.wait_idle();
    assert_eq!(frames.completed(), 1);

    let again = SaveCompletion {
        tick: Tick::new(0, 40),
        path: PathBuf::from("a.png"),
        result: Err("late".to_owned()),
    };
    assert!(!frames.on_completion(again));
    assert_eq!(frames.pending()[0].state, SaveState::Saved);

    let unknown = SaveCompletion {
        tick: Tick::new(9, 40),
        path: PathBuf::from("z.png"),
        result: Ok(()),
    };
    assert!(!frames.on_completion(unknown));
    assert_eq!(frames.completed(), 1);
}

#[test]
fn drain_and_wait_apply_arrived_completions() {
    let mut frames = FrameSink::new(Arc::new(InMemorySink::new()), Some(1)).unwrap();
    assert_eq!(frames.drain_completions(), 0);
    assert!(!frames.wait_completion(Duration::from_millis(1)));

    frames.submit(frame(0), PathBuf::from("a.png"));
    let mut applied = 0;
    while frames.outstanding() > 0 {
        if frames.wait_completion(Duration::from_millis(100)) {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);
}

#[test]
fn zero_threads_is_a_configuration_error() {
    let err = FrameSink::new(Arc::new(InMemorySink::new()), Some(0)).unwrap_err();
    assert!(matches!(err, FramestepError::Config(_)));
}
