use std::{collections::HashSet, path::Path};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, ensure, eyre},
};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::{
    batch::{Job, is_plain_file_name},
    config::{ImageSettings, SeedPolicy, load_ron_file},
    image_model::GenerationRequest,
};

/// One entry of a job table: what to draw, where to put it and how to call it in the logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub prompt: String,
    pub description: String,
}

impl JobDefinition {
    pub fn new(name: &str, prompt: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            description: description.into(),
        }
    }

    pub fn to_request(&self, settings: &ImageSettings, seed: Option<u64>) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.clone(),
            output_name: self.name.clone(),
            width: settings.width,
            height: settings.height,
            cfg_scale: settings.cfg_scale,
            seed,
        }
    }

    pub fn to_job(&self, settings: &ImageSettings, seed: Option<u64>) -> Job {
        Job {
            request: self.to_request(settings, seed),
            description: self.description.clone(),
        }
    }
}

/// Ordered, non-empty job table with unique names. Fixed once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct JobList(NonEmpty<JobDefinition>);

impl JobList {
    pub fn try_new(jobs: Vec<JobDefinition>) -> Result<Self> {
        let jobs = NonEmpty::from_vec(jobs).ok_or(eyre!("The job list is empty"))?;

        let mut seen = HashSet::new();
        for job in jobs.iter() {
            ensure!(
                !job.name.trim().is_empty(),
                "Job \"{}\" has an empty name",
                job.description
            );
            ensure!(
                is_plain_file_name(&job.name),
                "Job name {:?} is not a plain file name",
                job.name
            );
            // names become file stems, and some file systems ignore case
            ensure!(
                seen.insert(job.name.to_lowercase()),
                "Duplicate job name: {}",
                job.name
            );
        }

        Ok(Self(jobs))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let jobs: Vec<JobDefinition> = load_ron_file(path)?;
        Self::try_new(jobs).wrap_err_with(|| format!("Invalid job file {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobDefinition> {
        self.0.iter()
    }

    pub fn jobs(&self, settings: &ImageSettings, seeds: SeedPolicy) -> Vec<Job> {
        self.iter()
            .enumerate()
            .map(|(i, def)| def.to_job(settings, seeds.seed_for(i)))
            .collect()
    }
}

pub fn test_job() -> JobDefinition {
    JobDefinition::new(
        "test_shirt",
        "A simple red t-shirt on white background, product photography",
        "Test image",
    )
}

const WORKSHOP_JOBS: [(&str, &str, &str); 10] = [
    (
        "01_basic_white_tshirt",
        "A clean white cotton t-shirt on a plain white background, front view, no wrinkles, studio lighting, product photography style, minimalist, high resolution",
        "Basic solid color t-shirt",
    ),
    (
        "02_striped_longsleeve",
        "A navy blue and white horizontal striped long-sleeve shirt, crew neck, regular fit, laid flat on white background, professional product photo, even lighting",
        "Striped long-sleeve shirt",
    ),
    (
        "03_checkered_buttonup",
        "A red and black checkered flannel button-up shirt, classic collar, long sleeves, regular fit, hanging on white background, studio photography",
        "Checkered button-up shirt",
    ),
    (
        "04_oversized_hoodie",
        "An oversized gray hoodie sweatshirt with hood up, loose fit, kangaroo pocket, long sleeves, on plain background, casual streetwear style",
        "Oversized hoodie",
    ),
    (
        "05_floral_blouse",
        "A light pink blouse with small white floral pattern, V-neck, short sleeves, fitted silhouette, on white background, feminine style, soft lighting",
        "Floral print blouse",
    ),
    (
        "06_vintage_band_tshirt",
        "A black vintage-style band t-shirt with distressed graphic print, crew neck, short sleeves, slightly faded, relaxed fit, on neutral background",
        "Vintage band t-shirt",
    ),
    (
        "07_formal_dress_shirt",
        "A crisp white formal dress shirt, French cuffs, spread collar, long sleeves, slim fit, pressed and neat, professional product photography",
        "Formal dress shirt",
    ),
    (
        "08_crop_top",
        "A bright yellow crop top, sleeveless, scoop neckline, fitted style, modern casual wear, on clean white background, good lighting",
        "Crop top",
    ),
    (
        "09_turtleneck_sweater",
        "A burgundy turtleneck sweater, long sleeves, fitted silhouette, ribbed texture, fall/winter style, on neutral background, cozy aesthetic",
        "Turtleneck sweater",
    ),
    (
        "10_tiedye_tshirt",
        "A tie-dye t-shirt with rainbow spiral pattern, crew neck, short sleeves, regular fit, vibrant colors, casual hippie style, bright lighting",
        "Tie-dye t-shirt",
    ),
];

/// The built-in shirt catalogue.
pub fn workshop_jobs() -> JobList {
    let [first, rest @ ..] = &WORKSHOP_JOBS;
    let def = |(name, prompt, description): &(&str, &str, &str)| {
        JobDefinition::new(name, prompt, description)
    };
    JobList(NonEmpty {
        head: def(first),
        tail: rest.iter().map(def).collect(),
    })
}
