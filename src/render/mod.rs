mod accum;
mod emit;

pub use accum::{atomic_add_f32, AccumBuffer};
pub use emit::FrameEmitter;

use crate::camera::CameraState;
use crate::sim::{AllocError, Particle, Yaw};
use rayon::prelude::*;

pub const EXPOSURE: f32 = 2.5;
pub const TONE_SCALE: f32 = 45.0;
/// Depth attenuation per unit of view-space depth.
pub const DEPTH_FADE: f32 = 0.01;

/// Four-band speed heatmap: blue → cyan → yellow → red → white.
///
/// `t` is clamped to `[0, 1]`. Bands meet at 0.2, 0.5 and 0.8 with no jump.
pub fn heatmap(t: f32) -> [f32; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    if t < 0.2 {
        [0.0, t / 0.2, 1.0]
    } else if t < 0.5 {
        let u = (t - 0.2) / 0.3;
        [u, 1.0, 1.0 - u]
    } else if t < 0.8 {
        [1.0, 1.0 - (t - 0.5) / 0.3, 0.0]
    } else {
        let u = (t - 0.8) / 0.2;
        [1.0, u, u]
    }
}

#[inline]
pub fn depth_fade(depth: f32) -> f32 {
    1.0 / (1.0 + depth.abs() * DEPTH_FADE)
}

/// `ln(1 + v·EXPOSURE)·TONE_SCALE`, clamped into a byte.
#[inline]
pub fn tone_map_value(v: f32) -> u8 {
    let mapped = (v * EXPOSURE).ln_1p() * TONE_SCALE;
    // NaN casts to 0.
    mapped.clamp(0.0, 255.0) as u8
}

/// Everything the projection pass needs, copied into every worker.
#[derive(Clone, Copy, Debug)]
pub struct View {
    pub yaw: Yaw,
    pub scale: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub peak_speed: f32,
    pub width: usize,
    pub height: usize,
}

impl View {
    pub fn new(yaw: Yaw, camera: &CameraState, width: usize, height: usize) -> Self {
        Self {
            yaw,
            scale: camera.scale,
            center_x: camera.center_x,
            center_y: camera.center_y,
            peak_speed: camera.peak_speed,
            width,
            height,
        }
    }

    /// Orthographic projection to `(pixel index, depth)`; `None` when the
    /// particle lands off the grid.
    #[inline]
    pub fn project(&self, pos: [f32; 3]) -> Option<(usize, f32)> {
        let (rx, ry, rz) = self.yaw.rotate(pos);
        let fx = (rx - self.center_x) * self.scale + (self.width / 2) as f32;
        let fy = (ry - self.center_y) * self.scale + (self.height / 2) as f32;
        if !fx.is_finite() || !fy.is_finite() {
            return None;
        }
        // Truncating casts, so (-1, 0) maps onto column 0.
        let px = fx as i64;
        let py = fy as i64;
        if px < 0 || py < 0 || px >= self.width as i64 || py >= self.height as i64 {
            return None;
        }
        Some((py as usize * self.width + px as usize, rz))
    }

    /// Faded heatmap color of a particle.
    #[inline]
    pub fn shade(&self, particle: &Particle, depth: f32) -> [f32; 3] {
        let [r, g, b] = heatmap(particle.speed() / self.peak_speed);
        let fade = depth_fade(depth);
        [r * fade, g * fade, b * fade]
    }
}

/// Splats every particle into `accum`.
pub fn rasterize(particles: &[Particle], view: View, accum: &AccumBuffer) {
    particles.par_iter().for_each(|p| {
        if let Some((pixel, depth)) = view.project(p.pos) {
            accum.add(pixel, view.shade(p, depth));
        }
    });
}

/// Tone maps `accum` into interleaved RGB bytes.
pub fn tone_map(accum: &AccumBuffer, out: &mut [u8]) {
    out.par_chunks_mut(3)
        .enumerate()
        .for_each(|(pixel, rgb)| {
            let [r, g, b] = accum.load(pixel);
            rgb[0] = tone_map_value(r);
            rgb[1] = tone_map_value(g);
            rgb[2] = tone_map_value(b);
        });
}

/// Accumulation and output buffers of one frame size.
pub struct FrameBuffers {
    accum: AccumBuffer,
    rgb: Vec<u8>,
}

impl FrameBuffers {
    pub fn new(width: usize, height: usize) -> Result<Self, AllocError> {
        let accum = AccumBuffer::new(width, height)?;
        let len = accum.pixels().saturating_mul(3);
        let mut rgb = crate::sim::try_alloc("output frame", len)?;
        rgb.resize(len, 0u8);
        Ok(Self { accum, rgb })
    }

    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// Clears, splats and tone maps one frame.
    pub fn render(&mut self, particles: &[Particle], view: View) -> &[u8] {
        self.accum.clear();
        rasterize(particles, view, &self.accum);
        tone_map(&self.accum, &mut self.rgb);
        &self.rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_map_saturates() {
        assert_eq!(tone_map_value(0.0), 0);
        assert_eq!(tone_map_value(1e30), 255);
        assert_eq!(tone_map_value(f32::INFINITY), 255);
        assert_eq!(tone_map_value(f32::NAN), 0);
        assert_eq!(tone_map_value(-10.0), 0);
    }

    #[test]
    fn depth_fade_is_one_at_zero_depth() {
        assert_eq!(depth_fade(0.0), 1.0);
        assert!((depth_fade(-100.0) - 0.5).abs() < 1e-6);
    }
}
