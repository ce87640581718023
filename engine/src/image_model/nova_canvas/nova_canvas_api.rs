use color_eyre::{Result, eyre::ensure};
use serde::{Deserialize, Serialize};

use crate::image_model::{GenerationRequest, Quality};

pub const MIN_CFG_SCALE: f32 = 1.1;
pub const MAX_CFG_SCALE: f32 = 10.0;
pub const MIN_SIDE: u32 = 320;
pub const MAX_SIDE: u32 = 4096;
pub const MAX_SEED: u64 = 858_993_459;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody<'a> {
    pub task_type: TaskType,
    pub text_to_image_params: TextToImageParams<'a>,
    pub image_generation_config: ImageGenerationConfig,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    TextImage,
}

#[derive(Debug, Serialize)]
pub struct TextToImageParams<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationConfig {
    pub number_of_images: u32,
    pub quality: Quality,
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl<'a> RequestBody<'a> {
    pub fn text_image(request: &'a GenerationRequest, quality: Quality) -> Self {
        Self {
            task_type: TaskType::TextImage,
            text_to_image_params: TextToImageParams {
                text: &request.prompt,
            },
            image_generation_config: ImageGenerationConfig {
                number_of_images: 1,
                quality,
                width: request.width,
                height: request.height,
                cfg_scale: request.cfg_scale,
                seed: request.seed,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseBody {
    /// base64 encoded PNGs
    #[serde(default)]
    pub images: Option<Vec<String>>,
    /// Set instead of images when the provider refuses, e.g. after moderation.
    #[serde(default)]
    pub error: Option<String>,
}

/// Rejects parameters the provider would refuse anyway, so no call is wasted on them.
pub fn validate(request: &GenerationRequest) -> Result<()> {
    ensure!(
        !request.prompt.trim().is_empty(),
        "Prompt for {} is empty",
        request.output_name
    );
    ensure!(
        (MIN_CFG_SCALE..=MAX_CFG_SCALE).contains(&request.cfg_scale),
        "Guidance scale {} outside of [{MIN_CFG_SCALE}, {MAX_CFG_SCALE}]",
        request.cfg_scale
    );
    for (label, side) in [("width", request.width), ("height", request.height)] {
        ensure!(
            (MIN_SIDE..=MAX_SIDE).contains(&side) && side % 16 == 0,
            "Invalid {label} {side}: must be a multiple of 16 between {MIN_SIDE} and {MAX_SIDE}"
        );
    }
    if let Some(seed) = request.seed {
        ensure!(seed <= MAX_SEED, "Seed {seed} larger than {MAX_SEED}");
    }
    Ok(())
}
