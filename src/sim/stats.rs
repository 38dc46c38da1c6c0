use super::Particle;
use crate::attractor::Vec3;
use rayon::prelude::*;

/// Every n-th particle feeds the framing statistics.
pub const SAMPLE_STRIDE: usize = 100;
/// Camera yaw advance per frame, in radians.
pub const YAW_RATE: f32 = 0.005;

/// Samples per parallel work item; partial sums are combined in index order
/// so the result does not depend on thread scheduling.
const SAMPLES_PER_CHUNK: usize = 512;

/// Rotation of the view around the vertical axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Yaw {
    cos: f32,
    sin: f32,
}

impl Yaw {
    pub fn at_frame(frame: u64) -> Self {
        let theta = frame as f32 * YAW_RATE;
        Self {
            cos: theta.cos(),
            sin: theta.sin(),
        }
    }

    /// View-space `(x, y, depth)` of a world position.
    #[inline]
    pub fn rotate(&self, p: Vec3) -> (f32, f32, f32) {
        let [x, y, z] = p;
        let rx = x * self.cos - z * self.sin;
        let rz = x * self.sin + z * self.cos;
        (rx, y, rz)
    }
}

/// Framing statistics of one frame, in view space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub centroid_x: f32,
    pub centroid_y: f32,
    /// Mean absolute deviation from the centroid.
    pub spread_x: f32,
    pub spread_y: f32,
    pub peak_speed: f32,
    pub samples: usize,
}

#[derive(Clone, Copy, Default)]
struct Moments {
    sum_x: f32,
    sum_y: f32,
    peak: f32,
    n: usize,
}

/// Centroid, spread and peak speed over every `stride`-th particle.
pub fn collect_stats(particles: &[Particle], yaw: Yaw, stride: usize) -> FrameStats {
    let stride = stride.max(1);
    let chunk = stride * SAMPLES_PER_CHUNK;

    let partials: Vec<Moments> = particles
        .par_chunks(chunk)
        .map(|c| {
            let mut m = Moments::default();
            for p in c.iter().step_by(stride) {
                let (rx, ry, _) = yaw.rotate(p.pos);
                m.sum_x += rx;
                m.sum_y += ry;
                m.peak = m.peak.max(p.speed());
                m.n += 1;
            }
            m
        })
        .collect();

    let mut total = Moments::default();
    for m in &partials {
        total.sum_x += m.sum_x;
        total.sum_y += m.sum_y;
        total.peak = total.peak.max(m.peak);
        total.n += m.n;
    }
    if total.n == 0 {
        return FrameStats::default();
    }

    let n = total.n as f32;
    let cx = total.sum_x / n;
    let cy = total.sum_y / n;

    let deviations: Vec<(f32, f32)> = particles
        .par_chunks(chunk)
        .map(|c| {
            let mut dx = 0.0f32;
            let mut dy = 0.0f32;
            for p in c.iter().step_by(stride) {
                let (rx, ry, _) = yaw.rotate(p.pos);
                dx += (rx - cx).abs();
                dy += (ry - cy).abs();
            }
            (dx, dy)
        })
        .collect();

    let (dx, dy) = deviations
        .iter()
        .fold((0.0f32, 0.0f32), |(ax, ay), (x, y)| (ax + x, ay + y));

    FrameStats {
        centroid_x: cx,
        centroid_y: cy,
        spread_x: dx / n,
        spread_y: dy / n,
        peak_speed: total.peak,
        samples: total.n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_zero_is_identity() {
        let (rx, ry, rz) = Yaw::at_frame(0).rotate([1.0, 2.0, 3.0]);
        assert_eq!((rx, ry, rz), (1.0, 2.0, 3.0));
    }

    #[test]
    fn quarter_turn_swaps_x_and_depth() {
        // 314 * 0.005 = 1.57 rad, just short of a quarter turn.
        let yaw = Yaw::at_frame(314);
        let (rx, ry, rz) = yaw.rotate([1.0, 2.0, 3.0]);
        assert!((rx + 3.0).abs() < 5e-3, "rx {rx}");
        assert_eq!(ry, 2.0);
        assert!((rz - 1.0).abs() < 5e-3, "rz {rz}");

        let theta = 314.0f32 * YAW_RATE;
        let (rx, _, rz) = yaw.rotate([2.0, 0.0, -1.0]);
        assert!((rx - (2.0 * theta.cos() + theta.sin())).abs() < 1e-6);
        assert!((rz - (2.0 * theta.sin() - theta.cos())).abs() < 1e-6);
    }

    #[test]
    fn yaw_moves_depth_into_the_centroid_and_spread() {
        let ps: Vec<Particle> = (0..10)
            .map(|i| {
                let z = if i % 2 == 0 { 2.0 } else { 6.0 };
                Particle::at([0.0, i as f32, z])
            })
            .collect();

        let front = collect_stats(&ps, Yaw::at_frame(0), 1);
        assert_eq!(front.centroid_x, 0.0);
        assert_eq!(front.spread_x, 0.0);

        let side = collect_stats(&ps, Yaw::at_frame(314), 1);
        assert!((side.centroid_x + 4.0).abs() < 1e-2, "{side:?}");
        assert!((side.spread_x - 2.0).abs() < 1e-2, "{side:?}");
        assert!((side.centroid_y - front.centroid_y).abs() < 1e-6);
    }

    #[test]
    fn empty_population_yields_zeroes() {
        let stats = collect_stats(&[], Yaw::at_frame(0), SAMPLE_STRIDE);
        assert_eq!(stats, FrameStats::default());
    }

    #[test]
    fn stride_selects_expected_subset() {
        let ps: Vec<Particle> = (0..1000)
            .map(|i| Particle::at([i as f32, 0.0, 0.0]))
            .collect();
        let stats = collect_stats(&ps, Yaw::at_frame(0), 100);
        assert_eq!(stats.samples, 10);
        // Samples at 0, 100, ..., 900.
        assert!((stats.centroid_x - 450.0).abs() < 1e-3);
        assert!((stats.spread_x - 250.0).abs() < 1e-3);
        assert_eq!(stats.spread_y, 0.0);
    }
}
