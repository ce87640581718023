//! Provider stubs shared by the unit tests.

use std::{
    pin::Pin,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use color_eyre::Result;
use serde_json::{Value, json};

use crate::image_model::ModelInvoker;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model_id: String,
    pub body: Value,
}

pub type Calls = Arc<Mutex<Vec<RecordedCall>>>;

type Responder = Box<dyn Fn(&Value) -> Result<Bytes> + Send + Sync>;

pub struct StubInvoker {
    respond: Responder,
    calls: Calls,
}

impl StubInvoker {
    pub fn new(respond: impl Fn(&Value) -> Result<Bytes> + Send + Sync + 'static) -> (Self, Calls) {
        let calls = Calls::default();
        let stub = Self {
            respond: Box::new(respond),
            calls: calls.clone(),
        };
        (stub, calls)
    }
}

impl ModelInvoker for StubInvoker {
    fn invoke_model<'a>(
        &'a self,
        model_id: &'a str,
        body: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + 'a>> {
        Box::pin(async move {
            let body: Value = serde_json::from_slice(&body)?;
            let response = (self.respond)(&body);
            self.calls.lock().unwrap().push(RecordedCall {
                model_id: model_id.to_string(),
                body,
            });
            response
        })
    }
}

pub fn images_response(images: &[&str]) -> Bytes {
    Bytes::from(json!({ "images": images }).to_string())
}
