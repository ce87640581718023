use std::{collections::BTreeMap, pin::Pin, time::Duration};

use bytes::Bytes;
use color_eyre::{
    Result,
    eyre::{bail, ensure},
};
use log::debug;
use reqwest::header::{self, HeaderValue};
use serde::Deserialize;

use crate::image_model::ModelInvoker;

mod error;
pub use error::BedrockApiError;

pub mod sigv4;

pub const SERVICE: &str = "bedrock";
pub const DEFAULT_REGION: &str = "us-east-1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Ambient AWS credentials.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    /// A Bedrock API key, sent as bearer token.
    BearerToken(String),
    AccessKeys {
        access_key: String,
        secret_key: String,
        session_token: Option<String>,
    },
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves credentials from `lookup`; a bearer token is preferred over access keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("AWS_BEARER_TOKEN_BEDROCK") {
            return Ok(Self::BearerToken(token));
        }

        match (get("AWS_ACCESS_KEY_ID"), get("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key), Some(secret_key)) => Ok(Self::AccessKeys {
                access_key,
                secret_key,
                session_token: get("AWS_SESSION_TOKEN"),
            }),
            (Some(_), None) => bail!("AWS_ACCESS_KEY_ID is set but AWS_SECRET_ACCESS_KEY is missing"),
            _ => bail!(
                "No AWS credentials found. Set AWS_BEARER_TOKEN_BEDROCK or AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
            ),
        }
    }
}

#[derive(Debug, Clone)]
enum Auth {
    Bearer(String),
    SigV4(sigv4::Signer),
}

/// [`ModelInvoker`] backed by the Bedrock runtime `InvokeModel` endpoint.
#[derive(Debug, Clone)]
pub struct BedrockRuntime {
    client: reqwest::Client,
    endpoint: String,
    auth: Auth,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message")]
    message: String,
}

impl BedrockRuntime {
    pub fn new(region: &str, credentials: Credentials) -> Result<Self> {
        ensure!(
            !region.is_empty()
                && region
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
            "Invalid AWS region: {region:?}"
        );

        let auth = match credentials {
            Credentials::BearerToken(token) => Auth::Bearer(token),
            Credentials::AccessKeys {
                access_key,
                secret_key,
                session_token,
            } => Auth::SigV4(sigv4::Signer::new(
                access_key,
                secret_key,
                session_token,
                region,
                SERVICE,
            )?),
        };

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            endpoint: format!("https://bedrock-runtime.{region}.amazonaws.com"),
            auth,
        })
    }

    pub fn from_env(region: &str) -> Result<Self> {
        Self::new(region, Credentials::from_env()?)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn invoke_url(&self, model_id: &str) -> String {
        format!(
            "{}/model/{}/invoke",
            self.endpoint.trim_end_matches('/'),
            sigv4::percent_encode(model_id, true)
        )
    }
}

impl ModelInvoker for BedrockRuntime {
    fn invoke_model<'a>(
        &'a self,
        model_id: &'a str,
        body: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.invoke_url(model_id);
            let mut request = self
                .client
                .post(&url)
                .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .header(header::ACCEPT, HeaderValue::from_static("application/json"));

            request = match &self.auth {
                Auth::Bearer(token) => request.bearer_auth(token),
                Auth::SigV4(signer) => {
                    let headers = BTreeMap::from([
                        ("content-type".to_string(), "application/json".to_string()),
                        ("accept".to_string(), "application/json".to_string()),
                    ]);
                    let signature =
                        signer.sign("POST", &url, &headers, &body, sigv4::Timestamp::now()?)?;
                    signature.headers.apply(request)
                }
            };

            debug!("POST {url}");
            let resp = request.body(body).send().await?;

            let status = resp.status();
            let error_type = resp
                .headers()
                .get("x-amzn-errortype")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = resp.bytes().await?;

            if !status.is_success() {
                let message = serde_json::from_slice::<ErrorBody>(&bytes)
                    .map(|b| b.message)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
                return Err(
                    BedrockApiError::from_response(status.as_u16(), error_type.as_deref(), message)
                        .into(),
                );
            }

            Ok(bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use httpmock::{Method::POST, MockServer};

    use super::*;
    use crate::image_model::{GenerationClient, GenerationOutcome, GenerationRequest, Model};

    fn client(server: &MockServer, credentials: Credentials) -> GenerationClient {
        let runtime = BedrockRuntime::new("us-east-1", credentials)
            .unwrap()
            .with_endpoint(server.url(""));
        GenerationClient::new(Box::new(runtime), Model::NovaCanvas)
    }

    fn access_keys() -> Credentials {
        Credentials::AccessKeys {
            access_key: "AKID".into(),
            secret_key: "SECRET".into(),
            session_token: None,
        }
    }

    #[tokio::test]
    async fn signed_request_returns_image() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .header_exists("authorization")
                    .header_exists("x-amz-date")
                    .header_exists("x-amz-content-sha256")
                    .header("content-type", "application/json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"images":["AA=="]}"#);
            })
            .await;

        let outcome = client(&server, access_keys())
            .generate(&GenerationRequest::new("x", "a").with_seed(Some(1)))
            .await;

        mock.assert_async().await;
        assert_eq!(outcome, GenerationOutcome::Success { bytes: vec![0] });
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).header("authorization", "Bearer tok");
                then.status(200).body(r#"{"images":["AA=="]}"#);
            })
            .await;

        let outcome = client(&server, Credentials::BearerToken("tok".into()))
            .generate(&GenerationRequest::new("x", "a"))
            .await;

        mock.assert_async().await;
        assert_eq!(outcome, GenerationOutcome::Success { bytes: vec![0] });
    }

    #[tokio::test]
    async fn error_type_and_message_reach_the_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(400)
                    .header(
                        "x-amzn-ErrorType",
                        "ValidationException:http://internal.amazon.com/coral/com.amazon.bedrock/",
                    )
                    .body(r#"{"message":"width must be a multiple of 64"}"#);
            })
            .await;

        let outcome = client(&server, access_keys())
            .generate(&GenerationRequest::new("x", "a"))
            .await;

        let GenerationOutcome::Failure { reason } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(reason, "Validation error (400): width must be a multiple of 64");
    }

    #[tokio::test]
    async fn raw_error_body_used_when_not_json() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503).body("upstream unavailable");
            })
            .await;

        let outcome = client(&server, Credentials::BearerToken("tok".into()))
            .generate(&GenerationRequest::new("x", "a"))
            .await;

        let GenerationOutcome::Failure { reason } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(reason, "Service unavailable (503): upstream unavailable");
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn bearer_token_preferred() -> Result<()> {
        let creds = Credentials::from_lookup(lookup(&[
            ("AWS_BEARER_TOKEN_BEDROCK", "tok"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]))?;
        assert_eq!(creds, Credentials::BearerToken("tok".into()));
        Ok(())
    }

    #[test]
    fn access_keys_with_session_token() -> Result<()> {
        let creds = Credentials::from_lookup(lookup(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_SESSION_TOKEN", "session"),
        ]))?;
        assert_eq!(
            creds,
            Credentials::AccessKeys {
                access_key: "AKID".into(),
                secret_key: "secret".into(),
                session_token: Some("session".into()),
            }
        );
        Ok(())
    }

    #[test]
    fn missing_credentials_fail() {
        assert!(Credentials::from_lookup(lookup(&[])).is_err());
        assert!(Credentials::from_lookup(lookup(&[("AWS_ACCESS_KEY_ID", "AKID")])).is_err());
        assert!(Credentials::from_lookup(lookup(&[("AWS_BEARER_TOKEN_BEDROCK", " ")])).is_err());
    }

    #[test]
    fn invoke_url_encodes_model_id() -> Result<()> {
        let runtime = BedrockRuntime::new("eu-west-1", Credentials::BearerToken("tok".into()))?;
        assert_eq!(
            runtime.invoke_url("amazon.nova-canvas-v1:0"),
            "https://bedrock-runtime.eu-west-1.amazonaws.com/model/amazon.nova-canvas-v1%3A0/invoke"
        );

        let runtime = runtime.with_endpoint("http://localhost:4566/");
        assert_eq!(
            runtime.invoke_url("m"),
            "http://localhost:4566/model/m/invoke"
        );
        Ok(())
    }

    #[test]
    fn invalid_region_rejected() {
        let err = BedrockRuntime::new("us east 1", Credentials::BearerToken("tok".into()));
        assert!(err.is_err());
    }
}
