use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    ops::RangeBounds,
    path::{Path, PathBuf},
};

/// Tool configuration.
///
/// Every key is optional and falls back to the [`Default`] value.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub animate: AnimateConfig,
    pub verify: VerifyConfig,
}

/// Parameters of the animate command.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimateConfig {
    /// Simulation output to animate.
    pub input_path: PathBuf,
    /// Image the last timestep is saved to.
    pub output_image_path: PathBuf,
    /// Animated GIF gaining one frame per timestep.
    pub animation_path: Option<PathBuf>,
    /// Image rewritten on every timestep, for a live view.
    pub preview_path: Option<PathBuf>,
    /// Directory receiving one numbered image per timestep.
    pub frames_dir: Option<PathBuf>,

    /// Simulated time divided by this gives the pause between timesteps.
    pub speedup: f64,
    /// Edge length in pixels of live frames.
    pub live_size: u32,
    /// Edge length in pixels of the saved final frame.
    pub final_size: u32,

    /// Sleep between timesteps.
    pub pace: bool,
    /// Wait for Enter after saving the final frame.
    pub hold: bool,
}

impl Default for AnimateConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("res"),
            output_image_path: PathBuf::from("activematter.png"),
            animation_path: Some(PathBuf::from("activematter.gif")),
            preview_path: None,
            frames_dir: None,
            speedup: 5.0,
            live_size: 640,
            final_size: 960,
            pace: true,
            hold: false,
        }
    }
}

impl AnimateConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.speedup, 1e-3..=1e3).context("invalid speedup")?;
        check_num(self.live_size, 16..=8192).context("invalid live frame size")?;
        check_num(self.final_size, 16..=8192).context("invalid final frame size")?;
        Ok(())
    }
}

/// Parameters of the verify command.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Reference output, usually the serial run.
    pub path_a: PathBuf,
    /// Output compared against the reference.
    pub path_b: PathBuf,
    /// JSON file receiving the verification summary.
    pub report_path: Option<PathBuf>,

    /// Largest per-field difference still counted as equal; zero means exact.
    pub tolerance: f64,
    /// Abort when the headers differ instead of only reporting it.
    pub strict_headers: bool,
    /// Exit with an error when any bird is unmatched.
    pub fail_on_mismatch: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            path_a: PathBuf::from("res_verify_serial"),
            path_b: PathBuf::from("res_verify"),
            report_path: None,
            tolerance: 0.0,
            strict_headers: false,
            fail_on_mismatch: false,
        }
    }
}

impl VerifyConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.tolerance, 0.0..=1.0).context("invalid tolerance")?;
        Ok(())
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.animate
            .validate()
            .context("invalid animate section")?;
        self.verify.validate().context("invalid verify section")?;
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
