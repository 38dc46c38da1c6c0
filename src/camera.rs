use crate::attractor::Family;
use crate::framing::FramingConfig;
use crate::sim::FrameStats;
use std::f32::consts::PI;

/// Per-frame rate at which the base factor follows the active family.
pub const BASE_LERP: f32 = 0.02;
/// Per-frame rate for scale, center and peak speed tracking.
pub const TRACK_LERP: f32 = 0.005;
pub const DYNAMIC_MIN: f32 = 0.85;
pub const DYNAMIC_MAX: f32 = 1.15;
/// Framing extents are floored here so the scale never divides by ~0.
pub const MIN_TARGET_EXTENT: f32 = 1.0;

/// Smoothed camera accumulators. Only the controller writes these.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub scale: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub base_multiplier: f32,
    pub peak_speed: f32,
}

/// `1 + sin(2π·phase)·amplitude`, one cycle per fragment.
pub fn breathing_factor(frame: u64, fragment_len: u64, amplitude: f32) -> f32 {
    let len = fragment_len.max(1);
    let phase = (frame % len) as f32 / len as f32;
    1.0 + (phase * 2.0 * PI).sin() * amplitude
}

/// Widens the view when the instantaneous peak outruns its running average.
pub fn dynamic_factor(peak_speed: f32, smoothed_peak: f32, coefficient: f32) -> f32 {
    let ratio = peak_speed / (smoothed_peak + 0.001);
    let f = 1.0 + (ratio - 1.0) * coefficient;
    if f.is_nan() {
        return 1.0;
    }
    f.clamp(DYNAMIC_MIN, DYNAMIC_MAX)
}

/// Pixels-per-unit that fits `spread × multiplier` into the fill fraction
/// of the screen, clamped to the configured zoom range.
pub fn target_scale(
    spread_x: f32,
    spread_y: f32,
    multiplier: f32,
    width: usize,
    height: usize,
    cfg: &FramingConfig,
) -> f32 {
    let tw = floor_extent(spread_x * multiplier);
    let th = floor_extent(spread_y * multiplier);
    let sw = width as f32 * cfg.screen_fill_factor / tw;
    let sh = height as f32 * cfg.screen_fill_factor / th;
    sw.min(sh).clamp(cfg.min_zoom, cfg.max_zoom)
}

fn floor_extent(v: f32) -> f32 {
    // NaN fails the comparison and is floored too.
    if v >= MIN_TARGET_EXTENT { v } else { MIN_TARGET_EXTENT }
}

pub struct CameraController {
    state: CameraState,
    width: usize,
    height: usize,
}

impl CameraController {
    pub fn new(cfg: &FramingConfig, family: Family, width: usize, height: usize) -> Self {
        Self {
            state: CameraState {
                scale: cfg.initial_scale().clamp(cfg.min_zoom, cfg.max_zoom),
                center_x: 0.0,
                center_y: 0.0,
                base_multiplier: cfg.base_multiplier(family),
                peak_speed: 1.0,
            },
            width,
            height,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    /// Eases the base factor toward the active family's constant.
    pub fn follow_family(&mut self, cfg: &FramingConfig, family: Family) {
        let target = cfg.base_multiplier(family);
        self.state.base_multiplier += (target - self.state.base_multiplier) * BASE_LERP;
    }

    /// Folds one frame of statistics into the camera.
    pub fn update(
        &mut self,
        cfg: &FramingConfig,
        stats: &FrameStats,
        frame: u64,
        fragment_len: u64,
    ) -> CameraState {
        let s = &mut self.state;

        let breathing = breathing_factor(frame, fragment_len, cfg.zoom_oscillation);
        let dynamic = dynamic_factor(stats.peak_speed, s.peak_speed, cfg.dynamic_adjustment);
        let combined = s.base_multiplier * dynamic * breathing;

        let target = target_scale(
            stats.spread_x,
            stats.spread_y,
            combined,
            self.width,
            self.height,
            cfg,
        );

        s.scale += (target - s.scale) * TRACK_LERP;
        s.scale = s.scale.clamp(cfg.min_zoom, cfg.max_zoom);
        if stats.centroid_x.is_finite() && stats.centroid_y.is_finite() {
            s.center_x += (stats.centroid_x - s.center_x) * TRACK_LERP;
            s.center_y += (stats.centroid_y - s.center_y) * TRACK_LERP;
        }

        let peak = if stats.peak_speed >= 1.0 { stats.peak_speed } else { 1.0 };
        s.peak_speed += (peak - s.peak_speed) * TRACK_LERP;

        *s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breathing_is_neutral_at_fragment_start_and_disabled_at_zero() {
        assert!((breathing_factor(0, 300, 0.3) - 1.0).abs() < 1e-6);
        assert!((breathing_factor(75, 300, 0.3) - 1.3).abs() < 1e-5);
        assert!((breathing_factor(225, 300, 0.3) - 0.7).abs() < 1e-5);
        assert_eq!(breathing_factor(123, 300, 0.0), 1.0);
    }

    #[test]
    fn dynamic_factor_is_clamped() {
        assert_eq!(dynamic_factor(100.0, 1.0, 1.0), DYNAMIC_MAX);
        assert_eq!(dynamic_factor(0.0, 100.0, 1.0), DYNAMIC_MIN);
        assert!((dynamic_factor(50.0, 50.0, 0.0) - 1.0).abs() < 1e-6);
    }
}
