use crate::attractor::Family;
use crate::pipeline::{RunPlan, DEFAULT_CYCLE_FRAGMENTS};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "attractor-cinematic",
    version,
    about = "Particle renderer for morphing chaotic attractors (raw RGB24 frames on stdout)"
)]
pub struct Config {
    /// Number of fragments to render.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub fragments: u32,

    #[arg(short = 'f', long, default_value_t = 300)]
    pub frames_per_fragment: u32,

    #[arg(short = 'p', long, default_value_t = 2_000_000)]
    pub particles: usize,

    /// Framing config file (`key = value` lines).
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Starting attractor, by index (0-4) or name.
    #[arg(short = 's', long, value_parser = parse_family, default_value = "aizawa")]
    pub start: Family,

    #[arg(long, default_value_t = 1920)]
    pub width: usize,

    #[arg(long, default_value_t = 1080)]
    pub height: usize,

    /// Fragments between family switches.
    #[arg(long, default_value_t = DEFAULT_CYCLE_FRAGMENTS)]
    pub cycle_fragments: u32,

    /// RNG seed; a random one is drawn and logged when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_name = "FILE", default_value = "chapters.txt")]
    pub chapters: PathBuf,
}

impl Config {
    pub fn plan(&self, seed: u64) -> RunPlan {
        RunPlan {
            particles: self.particles,
            width: self.width,
            height: self.height,
            fragments: self.fragments,
            frames_per_fragment: self.frames_per_fragment,
            cycle_fragments: self.cycle_fragments,
            start: self.start,
            seed,
        }
    }
}

pub fn parse_family(raw: &str) -> Result<Family, String> {
    Family::parse(raw).ok_or_else(|| {
        let names = Family::all()
            .iter()
            .map(|f| f.name().to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown attractor '{raw}' (expected 0-4 or one of: {names})")
    })
}
