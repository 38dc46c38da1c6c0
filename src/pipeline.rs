//! Per-frame driver: schedule → morph → physics → statistics → camera →
//! rasterize → tone map. Each stage finishes for the whole population
//! before the next begins.

use crate::attractor::{Family, ParamMorph, Params};
use crate::camera::{CameraController, CameraState};
use crate::chapters::ChapterEvent;
use crate::framing::{FramingConfig, FramingError};
use crate::render::{FrameBuffers, FrameEmitter, View};
use crate::sim::{
    collect_stats, integrate, AllocError, FrameStats, Particles, StepInputs, Transition, Yaw,
    SAMPLE_STRIDE,
};
use std::fmt;
use std::io::{self, Write};
use tracing::{debug, info};

/// Fragments a family stays active for before the cycle advances.
pub const DEFAULT_CYCLE_FRAGMENTS: u32 = 6;
/// Progress is logged once per this many frames.
pub const PROGRESS_INTERVAL: u64 = 60;

/// Everything a run needs besides the framing config.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunPlan {
    pub particles: usize,
    pub width: usize,
    pub height: usize,
    pub fragments: u32,
    pub frames_per_fragment: u32,
    pub cycle_fragments: u32,
    pub start: Family,
    pub seed: u64,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            particles: 2_000_000,
            width: 1920,
            height: 1080,
            fragments: 20,
            frames_per_fragment: 300,
            cycle_fragments: DEFAULT_CYCLE_FRAGMENTS,
            start: Family::Aizawa,
            seed: 0,
        }
    }
}

impl RunPlan {
    pub fn total_frames(&self) -> u64 {
        self.fragments as u64 * self.frames_per_fragment as u64
    }
}

#[derive(Debug)]
pub enum PipelineError {
    Alloc(AllocError),
    Framing(FramingError),
    Plan(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(err) => write!(f, "{err}"),
            Self::Framing(err) => write!(f, "framing config: {err}"),
            Self::Plan(msg) => write!(f, "invalid run plan: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<AllocError> for PipelineError {
    fn from(err: AllocError) -> Self {
        Self::Alloc(err)
    }
}

impl From<FramingError> for PipelineError {
    fn from(err: FramingError) -> Self {
        Self::Framing(err)
    }
}

pub struct Pipeline {
    plan: RunPlan,
    framing: FramingConfig,
    rng: fastrand::Rng,
    particles: Particles,
    morph: ParamMorph,
    transition: Transition,
    camera: CameraController,
    buffers: FrameBuffers,
    frame: u64,
    fragment_ticks: u32,
    stats: FrameStats,
    events: Vec<ChapterEvent>,
}

impl Pipeline {
    /// Allocates every buffer up front; nothing allocates once frames flow.
    pub fn new(plan: RunPlan, framing: FramingConfig) -> Result<Self, PipelineError> {
        if plan.width == 0 || plan.height == 0 {
            return Err(PipelineError::Plan(format!(
                "frame size must be at least 1x1, got {}x{}",
                plan.width, plan.height
            )));
        }
        if plan.frames_per_fragment == 0 || plan.cycle_fragments == 0 {
            return Err(PipelineError::Plan(
                "frames per fragment and cycle length must be >= 1".to_string(),
            ));
        }
        framing.validate()?;

        let mut rng = fastrand::Rng::with_seed(plan.seed);
        let particles = Particles::spawn(plan.particles, &mut rng)?;
        let buffers = FrameBuffers::new(plan.width, plan.height)?;
        let morph = ParamMorph::new(plan.start, &mut rng);
        let camera = CameraController::new(&framing, plan.start, plan.width, plan.height);

        let first = ChapterEvent {
            frame: 0,
            family: plan.start,
            params: morph.current(),
        };
        debug!(
            particles = plan.particles,
            width = plan.width,
            height = plan.height,
            "pipeline allocated"
        );

        Ok(Self {
            plan,
            framing,
            rng,
            particles,
            morph,
            transition: Transition::steady(plan.start),
            camera,
            buffers,
            frame: 0,
            fragment_ticks: 0,
            stats: FrameStats::default(),
            events: vec![first],
        })
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_done(&self) -> bool {
        self.frame >= self.plan.total_frames()
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn params(&self) -> Params {
        self.morph.current()
    }

    pub fn camera(&self) -> CameraState {
        self.camera.state()
    }

    pub fn last_stats(&self) -> FrameStats {
        self.stats
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut Particles {
        &mut self.particles
    }

    /// Drains chapter events produced since the last call.
    pub fn take_events(&mut self) -> Vec<ChapterEvent> {
        std::mem::take(&mut self.events)
    }

    /// Fragment bookkeeping; switches family every `cycle_fragments` ticks.
    fn schedule(&mut self) {
        if self.frame % self.plan.frames_per_fragment as u64 != 0 {
            return;
        }
        self.fragment_ticks += 1;
        if self.fragment_ticks < self.plan.cycle_fragments {
            return;
        }
        self.fragment_ticks = 0;
        let family = self.transition.switch_to_next();
        let target = self.morph.retarget(family, &mut self.rng);
        info!(
            frame = self.frame,
            from = self.transition.previous().name(),
            to = family.name(),
            "family switch"
        );
        self.events.push(ChapterEvent {
            frame: self.frame,
            family,
            params: target,
        });
    }

    /// Simulates and renders one frame, returning its RGB bytes.
    pub fn step(&mut self) -> &[u8] {
        self.schedule();

        let family = self.transition.current();
        self.camera.follow_family(&self.framing, family);
        self.morph.step();
        self.transition.advance();

        let yaw = Yaw::at_frame(self.frame);
        integrate(
            &mut self.particles,
            StepInputs::new(&self.transition, self.morph.current()),
        );

        self.stats = collect_stats(self.particles.as_slice(), yaw, SAMPLE_STRIDE);
        let cam = self.camera.update(
            &self.framing,
            &self.stats,
            self.frame,
            self.plan.frames_per_fragment as u64,
        );

        let view = View::new(yaw, &cam, self.plan.width, self.plan.height);
        self.buffers.render(self.particles.as_slice(), view);

        if self.frame % PROGRESS_INTERVAL == 0 {
            info!(
                frame = self.frame,
                previous = self.transition.previous().name(),
                current = family.name(),
                blend = self.transition.blend(),
                scale = cam.scale,
                "progress"
            );
        }

        self.frame += 1;
        self.buffers.rgb()
    }

    /// Runs every remaining frame into `emitter`, passing chapter events to
    /// `on_event` as they occur. Stops at the first write error.
    pub fn run<W: Write>(
        &mut self,
        emitter: &mut FrameEmitter<W>,
        mut on_event: impl FnMut(&ChapterEvent),
    ) -> io::Result<()> {
        for ev in self.take_events() {
            on_event(&ev);
        }
        while !self.is_done() {
            self.step();
            for ev in self.take_events() {
                on_event(&ev);
            }
            emitter.emit(self.buffers.rgb())?;
        }
        emitter.flush()
    }
}
