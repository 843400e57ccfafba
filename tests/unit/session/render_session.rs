use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::PixelFormat;
use std::sync::atomic::AtomicUsize;

const MOVING: &str = r#"{
  "root": {
    "type": "rectangle",
    "color": "black",
    "children": [
      { "type": "rectangle", "width": 4, "height": 4, "color": "white",
        "animations": [ { "property": "x", "from": 0, "to": 12, "duration_ms": 1000 } ] }
    ]
  }
}"#;

fn small_config() -> RenderConfig {
    RenderConfig {
        width: 16,
        height: 8,
        output_dir: PathBuf::from("out"),
        output_name: "frame".to_owned(),
        output_format: "png".to_owned(),
        save_threads: Some(2),
        ..RenderConfig::default()
    }
}

fn memory_session(cfg: RenderConfig) -> (RenderSession, Arc<InMemorySink>) {
    let memory = Arc::new(InMemorySink::new());
    let session = RenderSession::with_collaborators(
        cfg,
        SessionCollaborators {
            sink: memory.clone(),
            ..SessionCollaborators::default()
        },
    )
    .unwrap();
    (session, memory)
}

fn finished_counter(session: &mut RenderSession) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    session.on_finished(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    count
}

#[test]
fn full_render_saves_every_frame_in_order_and_finishes_once() {
    let (mut session, memory) = memory_session(small_config());
    let finished = finished_counter(&mut session);

    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    assert_eq!(session.status(), SessionStatus::Initialised);
    assert!(session.scene_graph_initialised());
    assert!(session.target_bound());
    assert!(session.clock_running());

    let report = session.run().unwrap();
    assert_eq!(report.calculated_frames, 25);
    assert_eq!(report.actual_frames, 25);
    assert_eq!(report.submitted, 25);
    assert_eq!(report.completed, 25);
    assert_eq!(report.select_frame, None);
    assert!(!report.stopped_early);
    assert_eq!(report.outputs.first(), Some(&PathBuf::from("out/frame_1.png")));
    assert_eq!(report.outputs.last(), Some(&PathBuf::from("out/frame_25.png")));

    let frames = memory.frames();
    let numbers: Vec<u64> = frames.iter().map(|(_, f)| f.tick.frame_number()).collect();
    assert_eq!(numbers, (1..=25).collect::<Vec<_>>());

    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(session.status(), SessionStatus::NotRunning);
    assert!(!session.scene_graph_initialised());
    assert!(!session.target_bound());
    assert!(!session.clock_running());
    assert!(session.is_finished());
}

#[test]
fn zero_calculated_frames_finish_without_rendering() {
    let (mut session, memory) = memory_session(RenderConfig {
        duration_ms: 900,
        ..small_config()
    });
    let finished = finished_counter(&mut session);
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    session.start().unwrap();

    assert_eq!(session.status(), SessionStatus::NotRunning);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(session.actual_frames(), 0);
    assert!(memory.is_empty());
    assert_eq!(session.report().map(|r| r.submitted), Some(0));
}

#[test]
fn single_frame_step_saves_only_the_selected_frame() {
    let (mut session, memory) = memory_session(RenderConfig {
        single_frame: true,
        frame_time_ms: 800,
        ..small_config()
    });
    let finished = finished_counter(&mut session);
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    let report = session.run().unwrap();

    assert_eq!(report.select_frame, Some(20));
    assert_eq!(report.actual_frames, 20);
    assert_eq!(report.outputs, vec![PathBuf::from("out/frame_20.png")]);
    assert_eq!(memory.len(), 1);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[test]
fn single_frame_jump_matches_step_pixels() {
    let render = |seek| {
        let (mut session, memory) = memory_session(RenderConfig {
            single_frame: true,
            frame_time_ms: 600,
            seek,
            ..small_config()
        });
        session.initialise(&SceneSource::inline(MOVING)).unwrap();
        let report = session.run().unwrap();
        let frames = memory.frames();
        assert_eq!(frames.len(), 1);
        (report, frames[0].1.clone())
    };

    let (step_report, step_frame) = render(SeekMode::Step);
    let (jump_report, jump_frame) = render(SeekMode::Jump);
    assert_eq!(step_report.actual_frames, 15);
    assert_eq!(jump_report.actual_frames, 1);
    assert_eq!(step_frame, jump_frame);
    assert_eq!(step_frame.tick, Tick::new(14, 40));
}

#[test]
fn frame_time_below_one_tick_selects_the_first_frame() {
    let (mut session, _memory) = memory_session(RenderConfig {
        single_frame: true,
        frame_time_ms: 10,
        ..small_config()
    });
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    let report = session.run().unwrap();
    assert_eq!(report.outputs, vec![PathBuf::from("out/frame_1.png")]);
}

#[test]
fn reentry_is_a_no_op() {
    let (mut session, memory) = memory_session(small_config());
    let source = SceneSource::inline(MOVING);
    session.initialise(&source).unwrap();
    session.initialise(&source).unwrap();
    session.start().unwrap();
    session.start().unwrap();
    session.initialise(&source).unwrap();
    assert_eq!(session.status(), SessionStatus::Running);

    let report = session.run().unwrap();
    assert_eq!(report.actual_frames, 25);
    assert_eq!(memory.len(), 25);

    // A finished session cannot be reinitialised.
    assert!(matches!(
        session.initialise(&source),
        Err(FramestepError::State(_))
    ));
}

#[test]
fn lifecycle_misuse_is_reported() {
    let (mut session, _memory) = memory_session(small_config());
    assert!(matches!(session.start(), Err(FramestepError::State(_))));
    assert!(matches!(session.step(), Err(FramestepError::State(_))));
    assert!(matches!(session.stop(), Err(FramestepError::State(_))));

    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    assert!(matches!(session.step(), Err(FramestepError::State(_))));
}

#[test]
fn scene_errors_fail_initialisation_without_render_work() {
    let (mut session, memory) = memory_session(small_config());
    let err = session
        .initialise(&SceneSource::inline(r#"{ "root": { "type": "timer" } }"#))
        .unwrap_err();
    assert!(matches!(err, FramestepError::SceneLoad(_)));
    assert_eq!(session.status(), SessionStatus::NotRunning);
    assert!(!session.scene_graph_initialised());
    assert!(!session.clock_running());
    assert!(memory.is_empty());

    // The session can still be initialised with a good scene.
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    assert_eq!(session.run().unwrap().actual_frames, 25);
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let err = RenderSession::new(RenderConfig {
        fps: 0,
        ..RenderConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, FramestepError::Config(_)));
}

#[test]
fn stop_handle_ends_the_loop_before_the_next_cycle() {
    let (mut session, memory) = memory_session(small_config());
    let finished = finished_counter(&mut session);
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    session.start().unwrap();

    for _ in 0..5 {
        assert!(matches!(session.step().unwrap(), Progress::Rendered { .. }));
    }
    let handle = session.stop_handle();
    std::thread::spawn(move || handle.request_stop())
        .join()
        .unwrap();

    let report = match session.step().unwrap() {
        Progress::Finished(report) => report,
        other => panic!("unexpected progress {other:?}"),
    };
    assert!(report.stopped_early);
    assert_eq!(report.actual_frames, 5);
    assert_eq!(report.completed, 5);
    assert_eq!(memory.len(), 5);
    assert!(!session.clock_running());
    assert!(!session.target_bound());
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    // Stepping a finished session just repeats the report.
    assert_eq!(session.step().unwrap(), Progress::Finished(report));
}

#[test]
fn stop_waits_for_outstanding_saves() {
    let (mut session, memory) = memory_session(small_config());
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    session.start().unwrap();
    session.step().unwrap();
    session.step().unwrap();

    let report = session.stop().unwrap();
    assert_eq!(report.submitted, 2);
    assert_eq!(report.completed, 2);
    assert_eq!(memory.len(), 2);
    assert_eq!(session.stop().unwrap(), report);
}

#[test]
fn save_failures_are_counted_and_do_not_stop_the_loop() {
    struct RejectEven;
    impl ImageSink for RejectEven {
        fn save(
            &self,
            frame: &crate::render::target::FrameBuffer,
            _path: &std::path::Path,
        ) -> FramestepResult<()> {
            if frame.tick.frame_number() % 2 == 0 {
                return Err(FramestepError::save("rejected"));
            }
            Ok(())
        }
    }

    let mut session = RenderSession::with_collaborators(
        RenderConfig {
            duration_ms: 1000,
            fps: 10,
            ..small_config()
        },
        SessionCollaborators {
            sink: Arc::new(RejectEven),
            ..SessionCollaborators::default()
        },
    )
    .unwrap();
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    let report = session.run().unwrap();
    assert_eq!(report.submitted, 10);
    assert_eq!(report.completed, 10);
    assert_eq!(report.failed, 5);
    assert_eq!(report.outputs.len(), 5);
    assert!(
        session
            .pending_saves()
            .iter()
            .all(|p| p.state != SaveState::InFlight)
    );
}

#[test]
fn resize_changes_frames_after_the_request() {
    let (mut session, memory) = memory_session(RenderConfig {
        fps: 4,
        ..small_config()
    });
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    session.start().unwrap();
    session.step().unwrap();
    session.resize(8, 4, 1.0).unwrap();
    session.run().unwrap();

    let frames = memory.frames();
    assert_eq!(frames.len(), 4);
    assert_eq!((frames[0].1.width, frames[0].1.height), (16, 8));
    for (_, frame) in &frames[1..] {
        assert_eq!((frame.width, frame.height), (8, 4));
    }
    assert_eq!(session.config().width, 8);

    assert!(matches!(
        session.resize(0, 4, 1.0),
        Err(FramestepError::Config(_))
    ));
}

#[test]
fn graphics_failure_at_init_leaves_the_session_not_running() {
    #[derive(Debug)]
    struct NoContext;
    impl GraphicsContext for NoContext {
        fn make_current(&mut self) -> FramestepResult<()> {
            Err(FramestepError::graphics("no device"))
        }
        fn done_current(&mut self) {}
        fn is_current(&self) -> bool {
            false
        }
        fn flush(&mut self) -> FramestepResult<()> {
            Ok(())
        }
    }

    let mut session = RenderSession::with_collaborators(
        small_config(),
        SessionCollaborators {
            context: Box::new(NoContext),
            sink: Arc::new(InMemorySink::new()),
            ..SessionCollaborators::default()
        },
    )
    .unwrap();
    let err = session
        .initialise(&SceneSource::inline(MOVING))
        .unwrap_err();
    assert!(matches!(err, FramestepError::Graphics(_)));
    assert_eq!(session.status(), SessionStatus::NotRunning);
    assert!(!session.clock_running());
}

#[test]
fn late_finished_callback_fires_immediately() {
    let (mut session, _memory) = memory_session(RenderConfig {
        duration_ms: 0,
        ..small_config()
    });
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    session.run().unwrap();
    let finished = finished_counter(&mut session);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[test]
fn rgb8_frames_drop_alpha() {
    let (mut session, memory) = memory_session(RenderConfig {
        pixel_format: PixelFormat::Rgb8,
        single_frame: true,
        frame_time_ms: 0,
        ..small_config()
    });
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    session.run().unwrap();
    let frames = memory.frames();
    assert_eq!(frames[0].1.format, PixelFormat::Rgb8);
    assert_eq!(frames[0].1.data.len(), 16 * 8 * 3);
}

/// CPU context whose `nth` `make_current` call (1-based) fails once.
#[derive(Debug)]
struct FailsOnce {
    inner: CpuContext,
    calls: usize,
    nth: usize,
}

impl GraphicsContext for FailsOnce {
    fn make_current(&mut self) -> FramestepResult<()> {
        self.calls += 1;
        if self.calls == self.nth {
            return Err(FramestepError::graphics("context lost"));
        }
        self.inner.make_current()
    }
    fn done_current(&mut self) {
        self.inner.done_current();
    }
    fn is_current(&self) -> bool {
        self.inner.is_current()
    }
    fn flush(&mut self) -> FramestepResult<()> {
        self.inner.flush()
    }
}

#[test]
fn lost_context_mid_run_skips_one_frame_and_still_finishes() {
    let memory = Arc::new(InMemorySink::new());
    let mut session = RenderSession::with_collaborators(
        RenderConfig {
            fps: 5,
            ..small_config()
        },
        SessionCollaborators {
            sink: memory.clone(),
            // Call 1 is init, call 3 renders the second frame.
            context: Box::new(FailsOnce {
                inner: CpuContext::new(),
                calls: 0,
                nth: 3,
            }),
            ..SessionCollaborators::default()
        },
    )
    .unwrap();
    let finished = finished_counter(&mut session);
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    session.start().unwrap();

    let mut unavailable = Vec::new();
    let report = loop {
        match session.step().unwrap() {
            Progress::Unavailable { tick, reason } => {
                assert!(reason.contains("context lost"), "{reason}");
                unavailable.push(tick);
            }
            Progress::Finished(report) => break report,
            Progress::Rendered { .. } | Progress::Waiting { .. } => {}
        }
    };

    assert_eq!(unavailable, vec![Tick::new(1, 200)]);
    assert_eq!(report.calculated_frames, 5);
    assert_eq!(report.actual_frames, 4);
    assert_eq!(report.submitted, 4);
    assert_eq!(report.completed, 4);
    assert!(!report.stopped_early);
    let saved: Vec<u64> = memory
        .frames()
        .iter()
        .map(|(_, f)| f.tick.frame_number())
        .collect();
    assert_eq!(saved, vec![1, 3, 4, 5]);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(!session.clock_running());
}

#[test]
fn first_step_after_start_renders_the_first_tick() {
    let (mut session, _memory) = memory_session(small_config());
    session.initialise(&SceneSource::inline(MOVING)).unwrap();
    session.start().unwrap();
    assert_eq!(session.status(), SessionStatus::Running);
    assert_eq!(
        session.step().unwrap(),
        Progress::Rendered {
            tick: Tick::new(0, 40),
            submitted: true,
        }
    );
}
