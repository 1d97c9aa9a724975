//! # In-Memory Transport
//!
//! A scripted [`Transport`] that records every request. Used by the unit
//! tests of the services and stores, and handy for demos without a backend.
//!
//! ```rust
//! use dashboard::core::service::Method;
//! use dashboard::services::mock::{MockResponse, MockTransport};
//! use serde_json::json;
//!
//! let transport = MockTransport::new();
//! transport.on(Method::Get, "/portfolios/user/7/has-active", MockResponse::json(200, json!(true)));
//! assert_eq!(transport.call_count(Method::Get, "/portfolios/user/7/has-active"), 0);
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::time::Duration;

use crate::core::error::{AppError, Result};
use crate::core::service::{HttpRequest, HttpResponse, Method, Transport};

/// Scripted response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Reply(HttpResponse),
    /// Simulated transport failure
    NetworkError(String),
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        MockResponse::Reply(HttpResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        })
    }

    pub fn text(status: u16, body: &str) -> Self {
        MockResponse::Reply(HttpResponse {
            status,
            content_type: Some("text/plain".to_string()),
            body: body.to_string(),
        })
    }

    /// JSON content type with an empty body (e.g. `204`-style replies).
    pub fn empty(status: u16) -> Self {
        MockResponse::Reply(HttpResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: String::new(),
        })
    }

    pub fn not_found() -> Self {
        Self::json(404, json!({ "error": "Not found" }))
    }

    pub fn network_error(message: &str) -> Self {
        MockResponse::NetworkError(message.to_string())
    }
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: String,
    responses: VecDeque<MockResponse>,
    delay: Duration,
}

/// Recording transport with per-route scripted responses.
///
/// Routes match on method and path (query excluded). When a route holds more
/// than one response they are consumed in order and the last one repeats.
/// Unmatched requests answer `404`.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the responses of a route with a single repeating response.
    pub fn on(&self, method: Method, path: &str, response: MockResponse) -> &Self {
        self.on_sequence(method, path, vec![response])
    }

    pub fn on_sequence(&self, method: Method, path: &str, responses: Vec<MockResponse>) -> &Self {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => route.responses = responses.into(),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                responses: responses.into(),
                delay: Duration::ZERO,
            }),
        }
        self
    }

    /// Delay every reply of a route, e.g. to observe in-flight loading state.
    pub fn with_delay(&self, method: Method, path: &str, delay: Duration) -> &Self {
        let mut routes = self.routes.lock();
        if let Some(route) = routes.iter_mut().find(|r| r.method == method && r.path == path) {
            route.delay = delay;
        }
        self
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    /// Paths in call order, formatted as `"METHOD /path"`.
    pub fn call_log(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|call| format!("{} {}", call.method, call.path))
            .collect()
    }

    pub fn last_call(&self, method: Method, path: &str) -> Option<HttpRequest> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|call| call.method == method && call.path == path)
            .cloned()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn next_response(&self, method: Method, path: &str) -> (MockResponse, Duration) {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => {
                let response = if route.responses.len() > 1 {
                    route.responses.pop_front()
                } else {
                    route.responses.front().cloned()
                };
                (
                    response.unwrap_or_else(MockResponse::not_found),
                    route.delay,
                )
            }
            None => (
                MockResponse::json(404, json!({ "error": format!("No mock route for {} {}", method, path) })),
                Duration::ZERO,
            ),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let (response, delay) = self.next_response(request.method, &request.path);
        self.calls.lock().push(request);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match response {
            MockResponse::Reply(reply) => Ok(reply),
            MockResponse::NetworkError(message) => Err(AppError::Network(message)),
        }
    }
}
