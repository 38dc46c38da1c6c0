use crate::chapters::{ChapterLog, CHAPTER_FPS};
use crate::config::Config;
use crate::framing::FramingConfig;
use crate::pipeline::Pipeline;
use crate::render::FrameEmitter;
use anyhow::{bail, Context};
use std::io::{self, BufWriter};
use tracing::info;

/// Installs the stderr log subscriber. stdout is reserved for frames.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Fails only when a subscriber is already installed, which is fine.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

pub fn validate(cfg: &Config) -> anyhow::Result<()> {
    if cfg.fragments == 0 {
        bail!("--fragments must be >= 1");
    }
    if cfg.frames_per_fragment == 0 {
        bail!("--frames-per-fragment must be >= 1");
    }
    if cfg.particles == 0 {
        bail!("--particles must be >= 1");
    }
    if cfg.width == 0 || cfg.height == 0 {
        bail!("--width and --height must be >= 1");
    }
    if cfg.cycle_fragments == 0 {
        bail!("--cycle-fragments must be >= 1");
    }
    Ok(())
}

pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| fastrand::u64(..))
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    validate(&cfg)?;

    let framing = FramingConfig::load(cfg.config.as_deref());
    info!("framing: {}", framing.summary());

    let seed = resolve_seed(cfg.seed);
    let plan = cfg.plan(seed);
    info!(
        seed,
        start = plan.start.name(),
        frames = plan.total_frames(),
        "starting render"
    );

    let mut pipeline = Pipeline::new(plan, framing).context("allocate simulation")?;
    let mut chapters = ChapterLog::create(&cfg.chapters, CHAPTER_FPS);

    let stdout = io::stdout();
    let mut emitter = FrameEmitter::new(BufWriter::new(stdout.lock()), plan.width, plan.height);
    pipeline
        .run(&mut emitter, |ev| chapters.record(ev))
        .context("write frame to stdout")?;

    info!(
        frames = emitter.frames_written(),
        chapters = chapters.written(),
        "done; chapter log written to {}",
        cfg.chapters.display()
    );
    Ok(())
}
