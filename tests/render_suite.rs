use attractor_cinematic::camera::CameraState;
use attractor_cinematic::render::{
    atomic_add_f32, heatmap, rasterize, tone_map, tone_map_value, AccumBuffer, FrameBuffers,
    FrameEmitter, View,
};
use attractor_cinematic::sim::{Particle, Yaw};
use std::sync::atomic::{AtomicU32, Ordering};

fn camera(scale: f32, cx: f32, cy: f32) -> CameraState {
    CameraState {
        scale,
        center_x: cx,
        center_y: cy,
        base_multiplier: 1.0,
        peak_speed: 10.0,
    }
}

fn close(a: [f32; 3], b: [f32; 3], eps: f32) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= eps)
}

// ── Heatmap ────────────────────────────────────────────────────────────────

#[test]
fn heatmap_endpoints_are_blue_and_white() {
    assert_eq!(heatmap(0.0), [0.0, 0.0, 1.0]);
    assert!(close(heatmap(1.0), [1.0, 1.0, 1.0], 1e-5));
    assert_eq!(heatmap(-3.0), heatmap(0.0));
    assert_eq!(heatmap(42.0), heatmap(1.0));
    assert_eq!(heatmap(f32::NAN), heatmap(0.0));
}

#[test]
fn heatmap_passes_through_cyan_yellow_and_red() {
    assert!(close(heatmap(0.2), [0.0, 1.0, 1.0], 1e-5));
    assert!(close(heatmap(0.5), [1.0, 1.0, 0.0], 1e-5));
    assert!(close(heatmap(0.8), [1.0, 0.0, 0.0], 1e-5));
    // Mid-band: orange between yellow and red, pink between red and white.
    assert!(close(heatmap(0.65), [1.0, 0.5, 0.0], 1e-5));
    assert!(close(heatmap(0.9), [1.0, 0.5, 0.5], 1e-5));
}

#[test]
fn heatmap_is_continuous_at_band_edges() {
    for edge in [0.2f32, 0.5, 0.8] {
        let below = heatmap(edge - 1e-6);
        let at = heatmap(edge);
        assert!(close(below, at, 1e-4), "edge {edge}: {below:?} vs {at:?}");
    }
}

#[test]
fn heatmap_channels_stay_in_unit_range() {
    for i in 0..=1000 {
        let c = heatmap(i as f32 / 1000.0);
        assert!(c.iter().all(|v| (-1e-6..=1.0 + 1e-6).contains(v)), "{c:?}");
    }
}

// ── Tone mapping ───────────────────────────────────────────────────────────

#[test]
fn tone_map_is_monotonic_and_bounded() {
    let mut last = 0u8;
    for i in 0..10_000 {
        let v = tone_map_value(i as f32 * 0.05);
        assert!(v >= last);
        last = v;
    }
    assert_eq!(tone_map_value(f32::MAX), 255);
    assert_eq!(tone_map_value(1e12), 255);
}

#[test]
fn tone_map_fills_every_pixel() {
    let accum = AccumBuffer::new(4, 2).expect("tiny buffer");
    accum.add(0, [1.0, 0.0, 1e9]);
    accum.add(7, [0.5, 0.5, 0.5]);
    let mut out = vec![9u8; 4 * 2 * 3];
    tone_map(&accum, &mut out);

    assert_eq!(out[0], tone_map_value(1.0));
    assert_eq!(out[1], 0);
    assert_eq!(out[2], 255);
    assert_eq!(&out[3..21], &[0u8; 18]);
    assert_eq!(out[21], tone_map_value(0.5));
}

// ── Accumulation ───────────────────────────────────────────────────────────

#[test]
fn atomic_add_loses_no_updates_under_contention() {
    let cell = AtomicU32::new(0);
    let threads = 8;
    let per_thread = 10_000;
    std::thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                for _ in 0..per_thread {
                    atomic_add_f32(&cell, 1.0);
                }
            });
        }
    });
    let total = f32::from_bits(cell.load(Ordering::Relaxed));
    assert_eq!(total, (threads * per_thread) as f32);
}

#[test]
fn concurrent_splats_to_one_pixel_sum_exactly() {
    let accum = AccumBuffer::new(3, 3).expect("tiny buffer");
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..2_500 {
                    accum.add(4, [1.0, 0.5, 0.25]);
                }
            });
        }
    });
    assert_eq!(accum.load(4), [10_000.0, 5_000.0, 2_500.0]);
    assert_eq!(accum.load(0), [0.0; 3]);
}

#[test]
fn clear_resets_accumulation() {
    let mut accum = AccumBuffer::new(2, 2).expect("tiny buffer");
    accum.add(3, [1.0, 2.0, 3.0]);
    accum.clear();
    for px in 0..accum.pixels() {
        assert_eq!(accum.load(px), [0.0; 3]);
    }
}

// ── Projection ─────────────────────────────────────────────────────────────

#[test]
fn projection_centers_the_camera_target() {
    let view = View::new(Yaw::at_frame(0), &camera(10.0, 1.0, 2.0), 64, 32);
    let (pixel, depth) = view.project([1.0, 2.0, 5.0]).expect("on screen");
    assert_eq!(pixel, 16 * 64 + 32);
    assert_eq!(depth, 5.0);

    let (pixel, _) = view.project([2.0, 2.5, 0.0]).expect("on screen");
    assert_eq!(pixel, (16 + 5) * 64 + 32 + 10);
}

#[test]
fn projection_follows_the_camera_yaw() {
    // 314 frames of yaw is just short of a quarter turn: world z becomes
    // screen x (negated) and world x becomes depth.
    let view = View::new(Yaw::at_frame(314), &camera(10.0, 0.0, 0.0), 64, 32);

    let (pixel, depth) = view.project([0.0, 0.0, 2.55]).expect("on screen");
    assert_eq!(pixel, 16 * 64 + 6);
    assert!(depth.abs() < 1e-2, "depth {depth}");

    let (pixel, depth) = view.project([3.0, 1.0, 0.0]).expect("on screen");
    assert_eq!(pixel, (16 + 10) * 64 + 32);
    assert!((depth - 3.0).abs() < 1e-3, "depth {depth}");

    // On-axis at frame 0, off the left edge after the turn.
    assert!(view.project([0.0, 0.0, 4.0]).is_none());
}

#[test]
fn off_screen_particles_are_dropped() {
    let view = View::new(Yaw::at_frame(0), &camera(10.0, 0.0, 0.0), 64, 32);
    assert!(view.project([100.0, 0.0, 0.0]).is_none());
    assert!(view.project([0.0, -2.0, 0.0]).is_none());
    assert!(view.project([f32::NAN, 0.0, 0.0]).is_none());

    let accum = AccumBuffer::new(64, 32).expect("small buffer");
    let ps = [Particle::at([100.0, 0.0, 0.0]), Particle::at([0.0, -50.0, 0.0])];
    rasterize(&ps, view, &accum);
    for px in 0..accum.pixels() {
        assert_eq!(accum.load(px), [0.0; 3]);
    }
}

#[test]
fn rasterize_accumulates_faded_heatmap_colour() {
    let view = View::new(Yaw::at_frame(0), &camera(1.0, 0.0, 0.0), 8, 8);
    let p = Particle {
        pos: [0.0, 0.0, 100.0],
        vel: [0.0, 0.0, 0.0],
    };
    let accum = AccumBuffer::new(8, 8).expect("small buffer");
    rasterize(&[p, p, p], view, &accum);

    // Zero speed is pure blue; depth 100 halves it.
    let px = 4 * 8 + 4;
    assert!(close(accum.load(px), [0.0, 0.0, 1.5], 1e-6));
}

#[test]
fn frame_buffers_reset_between_frames() {
    let mut buffers = FrameBuffers::new(8, 8).expect("small buffer");
    let view = View::new(Yaw::at_frame(0), &camera(1.0, 0.0, 0.0), 8, 8);
    let lit = [Particle::at([0.0, 0.0, 0.0])];

    let first = buffers.render(&lit, view).to_vec();
    assert!(first.iter().any(|&b| b != 0));
    let second = buffers.render(&[], view);
    assert!(second.iter().all(|&b| b == 0));
}

// ── Emitter ────────────────────────────────────────────────────────────────

#[test]
fn emitter_writes_whole_frames_in_order() {
    let mut emitter = FrameEmitter::new(Vec::new(), 2, 1);
    assert_eq!(emitter.frame_len(), 6);
    emitter.emit(&[1, 2, 3, 4, 5, 6]).expect("frame fits");
    emitter.emit(&[7, 8, 9, 10, 11, 12]).expect("frame fits");
    assert_eq!(emitter.frames_written(), 2);
    assert_eq!(emitter.into_inner(), (1..=12).collect::<Vec<u8>>());
}

#[test]
fn emitter_rejects_wrong_sized_frames_without_writing() {
    let mut emitter = FrameEmitter::new(Vec::new(), 2, 2);
    let err = emitter.emit(&[0u8; 5]).expect_err("short frame must fail");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    assert_eq!(emitter.frames_written(), 0);
    assert!(emitter.into_inner().is_empty());
}
