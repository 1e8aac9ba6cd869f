mod animator;
mod config;
mod error;
mod format;
mod quiver;
mod render;
mod verifier;

use crate::animator::Animator;
use crate::config::{AnimateConfig, Config, VerifyConfig};
use crate::verifier::Verifier;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Draw every timestep of a simulation output as an arrow plot.
    Animate(AnimateArgs),

    /// Check two simulation outputs hold the same birds at every timestep.
    Verify(VerifyArgs),
}

#[derive(Debug, Args)]
struct AnimateArgs {
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long)]
    output: Option<PathBuf>,

    /// Animated GIF receiving every timestep.
    #[arg(long)]
    animation: Option<PathBuf>,

    /// Skip the animated GIF.
    #[arg(long, conflicts_with = "animation")]
    no_animation: bool,

    #[arg(long)]
    preview: Option<PathBuf>,

    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Do not sleep between timesteps.
    #[arg(long)]
    no_pace: bool,

    /// Wait for Enter after saving the final frame.
    #[arg(long)]
    hold: bool,
}

impl AnimateArgs {
    fn apply(self, cfg: &mut AnimateConfig) {
        if let Some(input) = self.input {
            cfg.input_path = input;
        }
        if let Some(output) = self.output {
            cfg.output_image_path = output;
        }
        if self.animation.is_some() {
            cfg.animation_path = self.animation;
        }
        if self.no_animation {
            cfg.animation_path = None;
        }
        if self.preview.is_some() {
            cfg.preview_path = self.preview;
        }
        if self.frames_dir.is_some() {
            cfg.frames_dir = self.frames_dir;
        }
        if self.no_pace {
            cfg.pace = false;
        }
        if self.hold {
            cfg.hold = true;
        }
    }
}

#[derive(Debug, Args)]
struct VerifyArgs {
    #[arg(long)]
    file_a: Option<PathBuf>,

    #[arg(long)]
    file_b: Option<PathBuf>,

    #[arg(long)]
    tolerance: Option<f64>,

    /// Write a JSON summary here.
    #[arg(long)]
    report: Option<PathBuf>,

    #[arg(long)]
    strict_headers: bool,

    #[arg(long)]
    fail_on_mismatch: bool,
}

impl VerifyArgs {
    fn apply(self, cfg: &mut VerifyConfig) {
        if let Some(file_a) = self.file_a {
            cfg.path_a = file_a;
        }
        if let Some(file_b) = self.file_b {
            cfg.path_b = file_b;
        }
        if let Some(tolerance) = self.tolerance {
            cfg.tolerance = tolerance;
        }
        if self.report.is_some() {
            cfg.report_path = self.report;
        }
        if self.strict_headers {
            cfg.strict_headers = true;
        }
        if self.fail_on_mismatch {
            cfg.fail_on_mismatch = true;
        }
    }
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mut cfg = match &args.config {
        Some(file) => Config::from_file(file).context("failed to load config")?,
        None => Config::default(),
    };

    match args.command {
        Command::Animate(animate_args) => {
            animate_args.apply(&mut cfg.animate);
            cfg.animate.validate().context("invalid animate options")?;
            log::info!("{:#?}", cfg.animate);

            let summary = Animator::new(cfg.animate)
                .run()
                .context("failed to animate")?;
            log::info!(
                "animated {} timesteps into {} frames, skipped {} progress lines",
                summary.timesteps,
                summary.frames,
                summary.progress_lines
            );
        }
        Command::Verify(verify_args) => {
            verify_args.apply(&mut cfg.verify);
            cfg.verify.validate().context("invalid verify options")?;
            log::info!("{:#?}", cfg.verify);

            Verifier::new(cfg.verify).run().context("failed to verify")?;
        }
    }

    Ok(())
}

/// Scratch directory for one unit test, unique per test and per process.
#[cfg(test)]
fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("flocktrace-{}", std::process::id()))
        .join(name);
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).expect("failed to create test directory");
    dir
}
