use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use attractor_cinematic::attractor::Family;
use attractor_cinematic::chapters::ChapterLog;
use attractor_cinematic::config::parse_family;
use attractor_cinematic::framing::FramingConfig;
use attractor_cinematic::pipeline::{Pipeline, RunPlan, DEFAULT_CYCLE_FRAGMENTS};
use attractor_cinematic::render::FrameEmitter;
use tracing::info;

const DEFAULT_OUTPUT: &str = "attractors.mp4";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "export_video",
    version,
    about = "Render attractor fragments straight into an MP4 via ffmpeg"
)]
pub(crate) struct Cli {
    #[arg(long, value_name = "MP4", default_value = DEFAULT_OUTPUT)]
    pub(crate) out: PathBuf,

    #[arg(short = 'n', long, default_value_t = 20)]
    pub(crate) fragments: u32,

    #[arg(short = 'f', long, default_value_t = 300)]
    pub(crate) frames_per_fragment: u32,

    #[arg(short = 'p', long, default_value_t = 2_000_000)]
    pub(crate) particles: usize,

    #[arg(short = 'c', long, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    #[arg(short = 's', long, value_parser = parse_family, default_value = "aizawa")]
    pub(crate) start: Family,

    #[arg(long, default_value_t = 1920)]
    pub(crate) width: usize,

    #[arg(long, default_value_t = 1080)]
    pub(crate) height: usize,

    #[arg(long, default_value_t = 60)]
    pub(crate) fps: u32,

    #[arg(long, default_value_t = DEFAULT_CYCLE_FRAGMENTS)]
    pub(crate) cycle_fragments: u32,

    /// x264 constant rate factor.
    #[arg(long, default_value_t = 18)]
    pub(crate) crf: u8,

    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

pub(crate) fn validate_args(args: &Cli) -> Result<()> {
    if args.width == 0 {
        bail!("--width must be >= 1");
    }
    if args.height == 0 {
        bail!("--height must be >= 1");
    }
    if args.fps == 0 {
        bail!("--fps must be >= 1");
    }
    if args.fragments == 0 {
        bail!("--fragments must be >= 1");
    }
    if args.frames_per_fragment == 0 {
        bail!("--frames-per-fragment must be >= 1");
    }
    if args.particles == 0 {
        bail!("--particles must be >= 1");
    }
    if args.cycle_fragments == 0 {
        bail!("--cycle-fragments must be >= 1");
    }
    if args.crf > 51 {
        bail!("--crf must be in 0..=51");
    }
    Ok(())
}

/// Chapter file written next to the video: `clip.mp4` -> `clip.chapters.txt`.
pub(crate) fn chapters_path(out: &Path) -> PathBuf {
    out.with_extension("chapters.txt")
}

pub(crate) fn plan_from_args(args: &Cli, seed: u64) -> RunPlan {
    RunPlan {
        particles: args.particles,
        width: args.width,
        height: args.height,
        fragments: args.fragments,
        frames_per_fragment: args.frames_per_fragment,
        cycle_fragments: args.cycle_fragments,
        start: args.start,
        seed,
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    attractor_cinematic::app::init_logging();
    run(args)
}

fn run(args: Cli) -> Result<()> {
    validate_args(&args)?;

    ensure_ffmpeg_available()?;

    let framing = FramingConfig::load(args.config.as_deref());
    let seed = attractor_cinematic::app::resolve_seed(args.seed);
    let plan = plan_from_args(&args, seed);
    info!(seed, frames = plan.total_frames(), "export starting");

    let mut pipeline = Pipeline::new(plan, framing).context("allocate simulation")?;

    let mut parent = args.out.parent().unwrap_or_else(|| Path::new(""));
    if parent == Path::new("") {
        parent = Path::new(".");
    }
    fs::create_dir_all(parent)
        .with_context(|| format!("create output directory {}", parent.display()))?;

    let chapter_file = chapters_path(&args.out);
    let mut chapters = ChapterLog::create(&chapter_file, u64::from(args.fps));

    let mut ffmpeg = spawn_ffmpeg(&args.out, args.width, args.height, args.fps, args.crf)?;
    let ffmpeg_in = ffmpeg
        .stdin
        .take()
        .context("failed to open ffmpeg stdin for rawvideo input")?;

    let mut emitter = FrameEmitter::new(BufWriter::new(ffmpeg_in), args.width, args.height);
    pipeline
        .run(&mut emitter, |ev| chapters.record(ev))
        .context("write frame to ffmpeg stdin")?;
    let frames = emitter.frames_written();
    drop(emitter);

    let status = ffmpeg.wait().context("wait for ffmpeg")?;
    if !status.success() {
        bail!("ffmpeg exited with status {status}");
    }

    println!(
        "exported {} frames @ {} fps (duration {:.3}s) -> {} (chapters: {})",
        frames,
        args.fps,
        frames as f32 / args.fps as f32,
        args.out.display(),
        chapter_file.display()
    );
    Ok(())
}

fn ensure_ffmpeg_available() -> Result<()> {
    match Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("ffmpeg not found in PATH (install ffmpeg and retry)")
        }
        Err(err) => Err(anyhow!("failed to run ffmpeg: {err}")),
    }
}

fn spawn_ffmpeg(
    out_path: &Path,
    width: usize,
    height: usize,
    fps: u32,
    crf: u8,
) -> Result<std::process::Child> {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-y")
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("rgb24")
        .arg("-video_size")
        .arg(format!("{width}x{height}"))
        .arg("-framerate")
        .arg(fps.to_string())
        .arg("-i")
        .arg("-")
        .arg("-c:v")
        .arg("libx264")
        .arg("-preset")
        .arg("slow")
        .arg("-crf")
        .arg(crf.to_string())
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg("-movflags")
        .arg("+faststart")
        .arg(out_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    cmd.spawn()
        .with_context(|| format!("spawn ffmpeg for output {}", out_path.display()))
}
