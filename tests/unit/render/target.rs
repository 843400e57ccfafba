use super::*;
use crate::foundation::core::LogicalSize;

fn spec(w: u32, h: u32, dpr: f64, format: PixelFormat) -> TargetSpec {
    TargetSpec {
        size: LogicalSize::new(w, h),
        dpr,
        format,
    }
}

#[test]
fn create_allocates_size_times_dpr() {
    let mut target = OffscreenTarget::new();
    assert!(!target.is_created());
    assert!(target.create(spec(10, 5, 1.5, PixelFormat::Rgba8)).unwrap());
    assert_eq!(target.pixel_size(), Some((15, 8)));
    assert_eq!(target.allocations(), 1);
}

#[test]
fn same_dimensions_keep_storage_and_new_dimensions_recreate() {
    let mut target = OffscreenTarget::new();
    target
        .create(spec(10, 10, 1.0, PixelFormat::Rgba8Premultiplied))
        .unwrap();
    assert!(
        !target
            .create(spec(5, 5, 2.0, PixelFormat::Rgb8))
            .unwrap()
    );
    assert_eq!(target.allocations(), 1);
    assert_eq!(target.spec().map(|s| s.format), Some(PixelFormat::Rgb8));

    let mut renderer = SceneRenderer::new();
    renderer.initialise();
    target.bind_as_render_destination(&mut renderer).unwrap();
    assert!(target.create(spec(20, 10, 1.0, PixelFormat::Rgb8)).unwrap());
    assert_eq!(target.allocations(), 2);
    assert_eq!(target.pixel_size(), Some((20, 10)));
    // Recreation drops the binding.
    assert!(!target.is_bound());
}

#[test]
fn create_rejects_bad_preconditions() {
    let mut target = OffscreenTarget::new();
    assert!(matches!(
        target.create(spec(0, 10, 1.0, PixelFormat::Rgba8)),
        Err(FramestepError::Config(_))
    ));
    assert!(matches!(
        target.create(spec(10, 10, 0.0, PixelFormat::Rgba8)),
        Err(FramestepError::Config(_))
    ));
    assert!(matches!(
        target.create(spec(1, 1, 0.1, PixelFormat::Rgba8)),
        Err(FramestepError::Graphics(_))
    ));
    assert!(matches!(
        target.create(spec(70_000, 10, 1.0, PixelFormat::Rgba8)),
        Err(FramestepError::Graphics(_))
    ));
    assert!(!target.is_created());
}

#[test]
fn bind_requires_storage() {
    let mut target = OffscreenTarget::new();
    let mut renderer = SceneRenderer::new();
    assert!(target.bind_as_render_destination(&mut renderer).is_err());
    assert!(!renderer.has_destination());
}

#[test]
fn extract_requires_a_flushed_pass() {
    let mut target = OffscreenTarget::new();
    let tick = Tick::new(0, 40);
    assert!(target.extract_image(tick).is_err());

    target
        .create(spec(2, 2, 1.0, PixelFormat::Rgba8Premultiplied))
        .unwrap();
    let mut renderer = SceneRenderer::new();
    renderer.initialise();
    target.bind_as_render_destination(&mut renderer).unwrap();

    target.begin_pass().unwrap();
    assert!(matches!(
        target.extract_image(tick),
        Err(FramestepError::Graphics(_))
    ));
    target.flush().unwrap();

    let frame = target.extract_image(tick).unwrap();
    assert_eq!(frame.tick, tick);
    assert_eq!(frame.data.len(), 2 * 2 * 4);
}

#[test]
fn begin_pass_requires_binding() {
    let mut target = OffscreenTarget::new();
    target
        .create(spec(2, 2, 1.0, PixelFormat::Rgba8Premultiplied))
        .unwrap();
    assert!(target.begin_pass().is_err());
}

#[test]
fn destroy_releases_everything() {
    let mut target = OffscreenTarget::new();
    target
        .create(spec(2, 2, 1.0, PixelFormat::Rgba8Premultiplied))
        .unwrap();
    let mut renderer = SceneRenderer::new();
    renderer.initialise();
    target.bind_as_render_destination(&mut renderer).unwrap();
    target.destroy();
    assert!(!target.is_created());
    assert!(!target.is_bound());
    assert_eq!(target.spec(), None);
}

#[test]
fn frame_buffer_conversions() {
    let frame = FrameBuffer {
        tick: Tick::new(0, 40),
        width: 2,
        height: 1,
        format: PixelFormat::Rgba8Premultiplied,
        data: vec![128, 0, 0, 128, 0, 0, 255, 255],
    };
    assert_eq!(frame.to_rgba8(), vec![255, 0, 0, 128, 0, 0, 255, 255]);
    assert_eq!(frame.to_rgb8(), vec![128, 0, 0, 0, 0, 255]);
    assert_eq!(frame.pixel(1, 0), Some(&[0u8, 0, 255, 255][..]));
    assert_eq!(frame.pixel(2, 0), None);

    let straight = FrameBuffer {
        format: PixelFormat::Rgba8,
        data: vec![255, 0, 0, 128, 0, 0, 255, 255],
        ..frame.clone()
    };
    assert_eq!(straight.to_rgb8(), vec![128, 0, 0, 0, 0, 255]);

    let rgb = FrameBuffer {
        format: PixelFormat::Rgb8,
        data: vec![1, 2, 3, 4, 5, 6],
        ..frame
    };
    assert_eq!(rgb.to_rgba8(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
}
