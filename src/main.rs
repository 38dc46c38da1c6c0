use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = attractor_cinematic::config::Config::parse();
    attractor_cinematic::app::init_logging();
    attractor_cinematic::app::run(cfg)
}
