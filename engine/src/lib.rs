use crate::image_model::ModelInvoker;

pub mod batch;
pub mod config;
pub mod image_model;
pub mod jobs;

#[cfg(test)]
mod testing;

pub type InvokerBox = Box<dyn ModelInvoker + Send + Sync>;

/// Extension of every written image. The provider always answers with PNG data.
pub const IMAGE_EXT: &str = "png";
