use log::debug;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::config::IssuerConfig;
use crate::core::error::{ApiError, ErrorPayload};

/// Authenticated client for the ZeroSSL REST API.
///
/// Every request carries the `access_key` query parameter. Calls are never
/// retried here.
#[derive(Debug, Clone)]
pub struct ZeroSslClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ZeroSslClient {
    pub fn new(config: &IssuerConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                path: config.base_url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POSTs `fields` as a multipart form and decodes the JSON reply.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        let form = fields
            .iter()
            .fold(Form::new(), |form, (name, value)| form.text(*name, value.clone()));
        let request = self.client.post(self.endpoint(path)).multipart(form);
        self.send(path, request).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.client.get(self.endpoint(path));
        self.send(path, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        debug!("[zerossl-http] {path}");
        let response = request
            .query(&[("access_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;
        debug!("[zerossl-http] {path} -> {status}");

        if !status.is_success() {
            return Err(status_error(path, status, body));
        }

        let value: Value = serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })?;
        if let Some(payload) = rejection(&value) {
            return Err(ApiError::Rejected {
                path: path.to_string(),
                payload,
            });
        }
        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

/// ZeroSSL reports many failures as `200 OK` with `{"success": false, "error": {...}}`.
fn rejection(value: &Value) -> Option<ErrorPayload> {
    if value.get("success").and_then(Value::as_bool) != Some(false) {
        return None;
    }
    let payload = value
        .get("error")
        .and_then(|error| serde_json::from_value(error.clone()).ok())
        .unwrap_or_default();
    Some(payload)
}

pub(crate) fn status_error(path: &str, status: StatusCode, body: String) -> ApiError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ApiError::Unauthorized { status };
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ApiError::RateLimited;
    }
    let payload = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("error").cloned())
        .and_then(|error| serde_json::from_value(error).ok());
    ApiError::Status {
        path: path.to_string(),
        status,
        body,
        payload,
    }
}
