use crate::config::AnimateConfig;
use crate::format::{BirdState, SimReader, SimulationHeader};
use crate::render::{Animation, draw_frame, draw_timestep, open_animation};
use anyhow::{Context, Result};
use std::{fs, io, thread, time::Duration};

/// Replays a simulation output file as a sequence of arrow plots.
pub struct Animator {
    cfg: AnimateConfig,
}

/// What an animation run went through.
#[derive(Debug, PartialEq)]
pub struct AnimateSummary {
    pub timesteps: usize,
    pub progress_lines: usize,
    /// Frames added to the animation.
    pub frames: usize,
}

impl Animator {
    pub fn new(cfg: AnimateConfig) -> Self {
        Self { cfg }
    }

    /// Render every timestep, then save the last one at full resolution.
    pub fn run(&self) -> Result<AnimateSummary> {
        let mut reader = SimReader::open(&self.cfg.input_path)
            .context("failed to open simulation output")?;
        let header = reader.header().clone();
        log::info!("{header:#?}");

        if let Some(dir) = &self.cfg.frames_dir {
            fs::create_dir_all(dir).with_context(|| format!("failed to create {dir:?}"))?;
        }

        let pause = self.pause(&header)?;
        let animation = self.open_animation(&header)?;

        let mut i_step = 0;
        let mut last_birds = None;
        while let Some(birds) = reader.next_timestep().context("failed to read timestep")? {
            self.render(animation.as_ref(), i_step, &header, &birds)
                .with_context(|| format!("failed to render timestep {i_step}"))?;
            i_step += 1;
            last_birds = Some(birds);

            if let Some(pause) = pause {
                thread::sleep(pause);
            }
        }

        let frames = if animation.is_some() { i_step } else { 0 };
        if let Some(file) = &self.cfg.animation_path {
            drop(animation);
            log::info!("saved {frames} frames to {file:?}");
        }

        if !header.is_count(i_step) {
            log::warn!(
                "read {i_step} timesteps, but the header counts are {} and {}",
                header.timestep_count,
                header.bird_count
            );
        }

        let birds = last_birds.unwrap_or_else(|| {
            log::warn!("no timesteps in {}", reader.label());
            Vec::new()
        });

        let file = &self.cfg.output_image_path;
        draw_frame(file, self.cfg.final_size, &header, &birds)
            .context("failed to save final frame")?;
        log::info!("saved {file:?}");

        if self.cfg.hold {
            wait_for_enter()?;
        }

        Ok(AnimateSummary {
            timesteps: i_step,
            progress_lines: reader.progress_count(),
            frames,
        })
    }

    fn open_animation(&self, header: &SimulationHeader) -> Result<Option<Animation>> {
        let Some(file) = &self.cfg.animation_path else {
            return Ok(None);
        };
        let delay_ms = (1e3 * header.timestep_duration / self.cfg.speedup).round() as u32;
        let animation = open_animation(file, self.cfg.live_size, delay_ms)
            .context("failed to open animation")?;
        Ok(Some(animation))
    }

    fn render(
        &self,
        animation: Option<&Animation>,
        i_step: usize,
        header: &SimulationHeader,
        birds: &[BirdState],
    ) -> Result<()> {
        log::debug!("rendering timestep {i_step} with {} birds", birds.len());

        if let Some(animation) = animation {
            draw_timestep(animation, header, birds)?;
        }
        if let Some(file) = &self.cfg.preview_path {
            draw_frame(file, self.cfg.live_size, header, birds)?;
        }
        if let Some(dir) = &self.cfg.frames_dir {
            let file = dir.join(format!("frame-{i_step:04}.png"));
            draw_frame(file, self.cfg.live_size, header, birds)?;
        }

        Ok(())
    }

    fn pause(&self, header: &SimulationHeader) -> Result<Option<Duration>> {
        if !self.cfg.pace {
            return Ok(None);
        }
        let secs = header.timestep_duration / self.cfg.speedup;
        let pause = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("invalid pause of {secs} s"))?;
        Ok(Some(pause))
    }
}

fn wait_for_enter() -> Result<()> {
    log::info!("press Enter to exit");
    let mut buf = String::new();
    io::stdin()
        .read_line(&mut buf)
        .context("failed to read standard input")?;
    Ok(())
}
