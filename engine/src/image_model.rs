use std::pin::Pin;

use bytes::Bytes;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

pub mod bedrock;
pub mod nova_canvas;
pub use nova_canvas::GenerationClient;

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
pub enum Model {
    #[default]
    #[strum(to_string = "Amazon Nova Canvas")]
    NovaCanvas,
    #[strum(to_string = "Amazon Titan Image Generator v2")]
    TitanImageV2,
}

impl Model {
    pub fn id(&self) -> &'static str {
        match self {
            Model::NovaCanvas => "amazon.nova-canvas-v1:0",
            Model::TitanImageV2 => "amazon.titan-image-generator-v2:0",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Quality {
    Standard,
    #[default]
    Premium,
}

/// One image to generate. `output_name` doubles as the file stem, so it has
/// to be unique within a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub output_name: String,
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f32,
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub const DEFAULT_WIDTH: u32 = 1024;
    pub const DEFAULT_HEIGHT: u32 = 1024;
    pub const DEFAULT_CFG_SCALE: f32 = 8.0;

    pub fn new(prompt: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            output_name: output_name.into(),
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            cfg_scale: Self::DEFAULT_CFG_SCALE,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success { bytes: Vec<u8> },
    /// The endpoint answered but returned no image.
    Empty,
    Failure { reason: String },
}

impl GenerationOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }
}

/// The remote capability: send a serialized request body to a model and get
/// the raw response body back.
pub trait ModelInvoker {
    fn invoke_model<'a>(
        &'a self,
        model_id: &'a str,
        body: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + 'a>>;
}
