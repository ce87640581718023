use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use color_eyre::{
    Result,
    eyre::{WrapErr as _, bail},
};
use log::debug;

use crate::{
    InvokerBox,
    image_model::{GenerationOutcome, GenerationRequest, Model, Quality},
};

pub mod nova_canvas_api;

use nova_canvas_api::{RequestBody, ResponseBody};

/// Turns a [`GenerationRequest`] into one TEXT_IMAGE call and the answer into
/// a [`GenerationOutcome`]. Nothing raised by the transport escapes `generate`.
pub struct GenerationClient {
    invoker: InvokerBox,
    model: Model,
    quality: Quality,
}

impl GenerationClient {
    pub fn new(invoker: InvokerBox, model: Model) -> Self {
        Self {
            invoker,
            model,
            quality: Quality::default(),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        match self.try_generate(request).await {
            Ok(Some(bytes)) => GenerationOutcome::Success { bytes },
            Ok(None) => GenerationOutcome::Empty,
            Err(e) => GenerationOutcome::failure(format!("{e:#}")),
        }
    }

    async fn try_generate(&self, request: &GenerationRequest) -> Result<Option<Vec<u8>>> {
        nova_canvas_api::validate(request)?;

        let body = serde_json::to_vec(&RequestBody::text_image(request, self.quality))?;
        debug!(
            "Invoking {} with: {}",
            self.model.id(),
            String::from_utf8_lossy(&body)
        );

        let raw = self.invoker.invoke_model(self.model.id(), body).await?;
        let response: ResponseBody =
            serde_json::from_slice(&raw).wrap_err("Malformed response body")?;

        if let Some(err) = response.error {
            bail!("Provider refused the request: {err}");
        }

        let Some(first) = response.images.and_then(|images| images.into_iter().next()) else {
            return Ok(None);
        };

        let bytes = BASE64
            .decode(first.trim())
            .wrap_err("Image is not valid base64")?;
        Ok(Some(bytes))
    }
}
