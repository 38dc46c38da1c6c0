mod stats;

pub use stats::{collect_stats, FrameStats, Yaw, SAMPLE_STRIDE, YAW_RATE};

use crate::attractor::{Family, Params, Vec3};
use rayon::prelude::*;
use std::fmt;

/// Fixed Euler time step.
pub const DT: f32 = 0.012;
/// Half-width of the cube every coordinate must stay inside.
pub const MAX_COORD: f32 = 80.0;
/// Length of the family blend window, in frames.
pub const TRANSITION_FRAMES: u32 = 120;
/// Half-width of the cube the population is seeded in.
pub const SPAWN_EXTENT: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocError {
    pub what: &'static str,
    pub elements: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to allocate {} ({} elements)", self.what, self.elements)
    }
}

impl std::error::Error for AllocError {}

/// Reserves exactly `n` slots, reporting failure instead of aborting.
pub(crate) fn try_alloc<T>(what: &'static str, n: usize) -> Result<Vec<T>, AllocError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n)
        .map_err(|_| AllocError { what, elements: n })?;
    Ok(v)
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
}

impl Particle {
    pub fn at(pos: Vec3) -> Self {
        Self {
            pos,
            vel: [0.0; 3],
        }
    }

    pub fn speed(&self) -> f32 {
        let [vx, vy, vz] = self.vel;
        (vx * vx + vy * vy + vz * vz).sqrt()
    }
}

/// Fixed-size particle population. Allocated once; never grows or shrinks.
pub struct Particles {
    items: Vec<Particle>,
}

impl Particles {
    /// Seeds `n` particles uniformly in the spawn cube.
    pub fn spawn(n: usize, rng: &mut fastrand::Rng) -> Result<Self, AllocError> {
        let mut items = try_alloc("particle state", n)?;
        let span = 2.0 * SPAWN_EXTENT;
        items.extend((0..n).map(|_| {
            Particle::at([
                -SPAWN_EXTENT + rng.f32() * span,
                -SPAWN_EXTENT + rng.f32() * span,
                -SPAWN_EXTENT + rng.f32() * span,
            ])
        }));
        Ok(Self { items })
    }

    pub fn from_positions(positions: impl IntoIterator<Item = Vec3>) -> Self {
        Self {
            items: positions.into_iter().map(Particle::at).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.items
    }
}

/// Which families feed the velocity field, and how far the blend has come.
///
/// Steady when the blend is 1.0 and `previous == current`; transitioning
/// for `TRANSITION_FRAMES` frames after [`Transition::switch_to_next`].
/// The blend is derived from a frame counter so it lands on exactly 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    previous: Family,
    current: Family,
    elapsed: u32,
}

impl Transition {
    pub fn steady(family: Family) -> Self {
        Self {
            previous: family,
            current: family,
            elapsed: TRANSITION_FRAMES,
        }
    }

    pub fn switch_to_next(&mut self) -> Family {
        self.previous = self.current;
        self.current = self.current.next();
        self.elapsed = 0;
        self.current
    }

    pub fn advance(&mut self) {
        if self.elapsed >= TRANSITION_FRAMES {
            return;
        }
        self.elapsed += 1;
        if self.elapsed >= TRANSITION_FRAMES {
            self.previous = self.current;
        }
    }

    pub fn previous(&self) -> Family {
        self.previous
    }

    pub fn current(&self) -> Family {
        self.current
    }

    pub fn blend(&self) -> f32 {
        self.elapsed.min(TRANSITION_FRAMES) as f32 / TRANSITION_FRAMES as f32
    }

    pub fn is_steady(&self) -> bool {
        self.elapsed >= TRANSITION_FRAMES && self.previous == self.current
    }
}

/// Per-frame scalars the physics pass reads. Copied into every worker.
#[derive(Clone, Copy, Debug)]
pub struct StepInputs {
    pub previous: Family,
    pub current: Family,
    pub blend: f32,
    pub params: Params,
}

impl StepInputs {
    pub fn new(transition: &Transition, params: Params) -> Self {
        Self {
            previous: transition.previous(),
            current: transition.current(),
            blend: transition.blend(),
            params,
        }
    }

    /// Blended velocity at `pos`. Both families read the same morphing
    /// parameter record.
    #[inline]
    pub fn velocity(&self, pos: Vec3) -> Vec3 {
        let cur = self.current.velocity(pos, &self.params);
        if self.previous == self.current {
            return cur;
        }
        let prev = self.previous.velocity(pos, &self.params);
        let t = self.blend;
        [
            prev[0] + (cur[0] - prev[0]) * t,
            prev[1] + (cur[1] - prev[1]) * t,
            prev[2] + (cur[2] - prev[2]) * t,
        ]
    }
}

/// Deterministic respawn point for particle `index`, on the diagonal of a
/// 4-unit cube around the origin.
pub fn respawn_position(index: usize) -> Vec3 {
    let hash = ((index as u64).wrapping_mul(1327) % 1000) as f32 / 1000.0;
    let v = (hash - 0.5) * 4.0;
    [v, v, v]
}

#[inline]
fn in_bounds(p: Vec3) -> bool {
    // Written as `<=` so NaN fails the test.
    p.iter().all(|c| c.abs() <= MAX_COORD)
}

/// One Euler step for a single particle. A particle that starts or ends
/// outside the bounding cube (or turns NaN) is respawned with zero velocity.
#[inline]
pub fn step_particle(index: usize, particle: &mut Particle, step: &StepInputs) {
    if !in_bounds(particle.pos) {
        *particle = Particle::at(respawn_position(index));
        return;
    }

    let vel = step.velocity(particle.pos);
    let pos = [
        particle.pos[0] + vel[0] * DT,
        particle.pos[1] + vel[1] * DT,
        particle.pos[2] + vel[2] * DT,
    ];

    if in_bounds(pos) {
        particle.pos = pos;
        particle.vel = vel;
    } else {
        *particle = Particle::at(respawn_position(index));
    }
}

/// Advances the whole population by one step.
pub fn integrate(particles: &mut Particles, step: StepInputs) {
    particles
        .as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, p)| step_particle(i, p, &step));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_reaches_one_after_window() {
        let mut tr = Transition::steady(Family::Aizawa);
        tr.switch_to_next();
        assert_eq!(tr.blend(), 0.0);
        let mut last = 0.0;
        for _ in 0..TRANSITION_FRAMES {
            tr.advance();
            assert!(tr.blend() >= last);
            last = tr.blend();
        }
        assert_eq!(tr.blend(), 1.0);
        assert!(tr.is_steady());
        assert_eq!(tr.previous(), Family::Thomas);
    }

    #[test]
    fn respawn_is_small_and_deterministic() {
        for i in [0usize, 1, 999, 123_456, usize::MAX / 2] {
            let p = respawn_position(i);
            assert_eq!(p, respawn_position(i));
            assert!(p.iter().all(|c| c.abs() <= 2.0));
        }
    }

    #[test]
    fn spawn_fills_cube() {
        let mut rng = fastrand::Rng::with_seed(3);
        let ps = Particles::spawn(256, &mut rng).expect("small allocation");
        assert_eq!(ps.len(), 256);
        for p in ps.as_slice() {
            assert!(p.pos.iter().all(|c| c.abs() <= SPAWN_EXTENT));
            assert_eq!(p.vel, [0.0; 3]);
        }
    }
}
