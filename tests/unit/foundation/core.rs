use super::*;

#[test]
fn tick_elapsed_is_index_times_step() {
    let t = Tick::new(0, 40);
    assert_eq!(t.index(), 0);
    assert_eq!(t.elapsed_ms(), 0);
    assert_eq!(t.frame_number(), 1);

    let t = Tick::new(19, 40);
    assert_eq!(t.elapsed_ms(), 760);
    assert_eq!(t.frame_number(), 20);
}

#[test]
fn ticks_order_by_index() {
    assert!(Tick::new(1, 40) < Tick::new(2, 40));
}

#[test]
fn logical_size_scales_with_rounding() {
    let s = LogicalSize::new(100, 51);
    assert_eq!(s.scaled(1.0), (100, 51));
    assert_eq!(s.scaled(2.0), (200, 102));
    assert_eq!(s.scaled(1.5), (150, 77));
    assert!(LogicalSize::new(0, 10).is_empty());
    assert!(!s.is_empty());
}

#[test]
fn target_spec_rejects_empty_size_and_bad_dpr() {
    let ok = TargetSpec {
        size: LogicalSize::new(8, 8),
        dpr: 1.0,
        format: PixelFormat::Rgba8,
    };
    assert!(ok.validate().is_ok());

    let empty = TargetSpec {
        size: LogicalSize::new(0, 8),
        ..ok
    };
    assert!(matches!(empty.validate(), Err(FramestepError::Config(_))));

    for dpr in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let bad = TargetSpec { dpr, ..ok };
        assert!(bad.validate().is_err(), "dpr {dpr} must be rejected");
    }
}

#[test]
fn pixel_format_layouts() {
    assert_eq!(PixelFormat::Rgba8Premultiplied.bytes_per_pixel(), 4);
    assert_eq!(PixelFormat::Rgba8.bytes_per_pixel(), 4);
    assert_eq!(PixelFormat::Rgb8.bytes_per_pixel(), 3);
    assert!(!PixelFormat::Rgb8.has_alpha());
}

#[test]
fn premultiply_and_back() {
    let p = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(p.a, 128);
    assert_eq!(p.r, 128);
    let s = p.to_straight_rgba();
    assert_eq!(s[0], 255);
    assert_eq!(s[2], 0);
    assert_eq!(unpremultiply([0, 0, 0, 0]), [0, 0, 0, 0]);
    assert_eq!(unpremultiply([10, 20, 30, 255]), [10, 20, 30, 255]);
}
