use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use shared_config::AppConfig;

use crate::error::ApiError;

/// Thin wrapper over the hospital backend. Owns status-code mapping so every
/// caller sees the same `ApiError` shape, with 409 kept distinct.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        if config.api_base_url.is_empty() {
            return Err(ApiError::NotConfigured("API_BASE_URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    #[instrument(skip(self, auth_token, query, body), fields(%method))]
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self.client.request(method, &url).headers(self.get_headers());

        if let Some(token) = auth_token {
            req = req.bearer_auth(token);
        }
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = extract_message(status, &text);
            if status == StatusCode::CONFLICT {
                warn!("API conflict ({}): {}", status, message);
            } else {
                error!("API error ({}): {}", status, message);
            }
            return Err(ApiError::from_status(status, message));
        }

        let payload = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(payload)?)
    }

    pub async fn get<T>(
        &self,
        path: &str,
        auth_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, Some(auth_token), query, None).await
    }

    pub async fn post<T>(&self, path: &str, auth_token: Option<&str>, body: Value) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, auth_token, &[], Some(body)).await
    }

    pub async fn put<T>(&self, path: &str, auth_token: &str, body: Value) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(auth_token), &[], Some(body)).await
    }
}

/// Pulls the backend's explanation out of an error body: `message`, then
/// `error` (plain or `{ message }`), then the raw text.
fn extract_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidate = value
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| value.get("error").and_then(Value::as_str))
            .or_else(|| {
                value
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
            });
        if let Some(message) = candidate {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string())
    } else {
        trimmed.to_string()
    }
}
