//! # API Client
//!
//! Main HTTP client for backend API communication.
//!
//! The client builds requests, attaches the bearer token found in storage and
//! normalizes every non-2xx response into [`AppError::Http`]. It never
//! redirects or touches session state itself.

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared::ErrorResponse;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ClientConfig;
use crate::core::error::{AppError, Result};
use crate::core::service::{HttpRequest, HttpResponse, KeyValueStore, Method, Transport};
use crate::services::storage::TOKEN_KEY;

/// Which base URL a path is resolved against.
///
/// Most resources live under `/api/v1`; the market-data endpoints are served
/// from `/api` without the version segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiBase {
    Versioned,
    MarketData,
}

/// Parsed 2xx body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Text(String),
}

impl ApiBody {
    /// JSON view of the body. Text that happens to be JSON is parsed, other
    /// text becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            ApiBody::Json(value) => value,
            ApiBody::Text(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        }
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.into_json()).map_err(|e| AppError::Parse(e.to_string()))
    }
}

/// reqwest-backed [`Transport`].
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url()).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read response body: {}", e)))?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

/// HTTP client for communicating with the backend API server.
///
/// Cheap to share behind an `Arc`; every store and the session hold one.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn KeyValueStore>,
    api_base_url: String,
    market_data_base_url: String,
}

impl ApiClient {
    /// Create a reqwest-backed client from configuration.
    pub fn new(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout));
        Self::with_transport(
            transport,
            storage,
            &config.api_base_url,
            &config.market_data_base_url,
        )
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
        api_base_url: &str,
        market_data_base_url: &str,
    ) -> Self {
        Self {
            transport,
            storage,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            market_data_base_url: market_data_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Token currently persisted in storage, if any.
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read auth token from storage");
                None
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiBody> {
        self.request(ApiBase::Versioned, Method::Get, path, &[], None).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<ApiBody> {
        self.request(ApiBase::Versioned, Method::Get, path, query, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Result<ApiBody> {
        let body = body.map(serde_json::to_value).transpose()?;
        self.request(ApiBase::Versioned, Method::Post, path, &[], body).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiBody> {
        let body = serde_json::to_value(body)?;
        self.request(ApiBase::Versioned, Method::Put, path, &[], Some(body)).await
    }

    pub async fn delete<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Result<ApiBody> {
        let body = body.map(serde_json::to_value).transpose()?;
        self.request(ApiBase::Versioned, Method::Delete, path, &[], body).await
    }

    /// GET against the unversioned market-data base.
    pub async fn get_market_data(&self, path: &str) -> Result<ApiBody> {
        self.request(ApiBase::MarketData, Method::Get, path, &[], None).await
    }

    /// Build, authorize and send one request.
    #[tracing::instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn request(
        &self,
        base: ApiBase,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<ApiBody> {
        let base_url = match base {
            ApiBase::Versioned => &self.api_base_url,
            ApiBase::MarketData => &self.market_data_base_url,
        };

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        if let Some(token) = self.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let request = HttpRequest {
            method,
            base_url: base_url.clone(),
            path: path.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            headers,
            body,
        };

        let start = Instant::now();
        tracing::debug!("Sending request");

        let response = self.transport.execute(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                duration_ms = start.elapsed().as_millis(),
                "Request network error"
            );
            e
        })?;

        let duration = start.elapsed();

        if !response.is_success() {
            let error = error_from_response(&response);
            tracing::warn!(
                status = response.status,
                error = %error,
                duration_ms = duration.as_millis(),
                "Request failed"
            );
            return Err(error);
        }

        tracing::debug!(
            status = response.status,
            duration_ms = duration.as_millis(),
            "Request succeeded"
        );

        parse_success_body(response)
    }
}

/// Turn a 2xx response into an [`ApiBody`] by content type.
fn parse_success_body(response: HttpResponse) -> Result<ApiBody> {
    if !response.is_json() {
        return Ok(ApiBody::Text(response.body));
    }

    if response.body.trim().is_empty() {
        return Ok(ApiBody::Json(Value::Object(Default::default())));
    }

    serde_json::from_str(&response.body)
        .map(ApiBody::Json)
        .map_err(|e| {
            tracing::error!(error = %e, "Response parse error");
            AppError::Parse(e.to_string())
        })
}

/// Best-effort structured error from a non-2xx response.
fn error_from_response(response: &HttpResponse) -> AppError {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

    let message = parsed
        .as_ref()
        .and_then(|value| serde_json::from_value::<ErrorResponse>(value.clone()).ok())
        .and_then(|body| body.best_message().map(str::to_string))
        .or_else(|| {
            let text = response.body.trim();
            (parsed.is_none() && !text.is_empty() && text.len() <= 200).then(|| text.to_string())
        })
        .unwrap_or_else(|| format!("Request failed with status {}", response.status));

    let body = parsed.or_else(|| {
        (!response.body.is_empty()).then(|| Value::String(response.body.clone()))
    });

    AppError::Http {
        status: response.status,
        message,
        body,
    }
}
