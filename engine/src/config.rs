use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::image_model::{GenerationRequest, Model, Quality, bedrock};

pub const CONFIG_FILE_NAME: &str = "canvas_batch.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Falls back to `AWS_REGION`, `AWS_DEFAULT_REGION` and then us-east-1.
    pub region: Option<String>,
    pub model: Model,
    pub quality: Quality,
    pub output_dir: PathBuf,
    /// Pause between two batch jobs.
    pub delay_secs: f64,
    pub image: ImageSettings,
    pub test_seed: Option<u64>,
    pub batch_seeds: SeedPolicy,
    /// Replaces the built-in workshop table.
    pub jobs_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: None,
            model: Model::default(),
            quality: Quality::default(),
            output_dir: "images".into(),
            delay_secs: 2.0,
            image: ImageSettings::default(),
            test_seed: Some(123),
            batch_seeds: SeedPolicy::default(),
            jobs_file: None,
        }
    }
}

impl Config {
    pub fn delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.delay_secs)
            .wrap_err_with(|| format!("Invalid delay: {}", self.delay_secs))
    }

    pub fn region(&self) -> String {
        self.region_with(|key| std::env::var(key).ok())
    }

    pub fn region_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        self.region
            .clone()
            .or_else(|| lookup("AWS_REGION"))
            .or_else(|| lookup("AWS_DEFAULT_REGION"))
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| bedrock::DEFAULT_REGION.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            width: GenerationRequest::DEFAULT_WIDTH,
            height: GenerationRequest::DEFAULT_HEIGHT,
            cfg_scale: GenerationRequest::DEFAULT_CFG_SCALE,
        }
    }
}

/// How batch jobs get their seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedPolicy {
    /// Every job uses the same seed.
    Fixed(u64),
    /// Job `i` uses `base + i`.
    PerJob(u64),
    Unseeded,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self::Fixed(42)
    }
}

impl SeedPolicy {
    pub fn seed_for(&self, index: usize) -> Option<u64> {
        match *self {
            SeedPolicy::Fixed(seed) => Some(seed),
            SeedPolicy::PerJob(base) => Some(base.saturating_add(index as u64)),
            SeedPolicy::Unseeded => None,
        }
    }
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path).wrap_err_with(|| format!("Couldn't read {}", path.display()))?;
    ron::from_str(&src).wrap_err_with(|| format!("Couldn't parse {}", path.display()))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join(CONFIG_FILE_NAME))
}

/// Loads `explicit` if given (it has to exist), otherwise the default config
/// file if there is one, otherwise the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_ron_file(path);
    }

    let path = config_path()?;
    if !path.exists() {
        Ok(Config::default())
    } else {
        load_ron_file(&path)
    }
}
