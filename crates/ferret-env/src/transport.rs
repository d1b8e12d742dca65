use ferret_model::Method;

/// Header a target may use to echo its own processing time.
pub const LATENCY_HEADER: &str = "X-Request-Latency-ms";

#[derive(Debug, Clone, PartialEq)]
pub struct TargetRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl TargetRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            body: None,
        }
    }

    pub fn post(path: &str, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetResponse {
    pub status: u16,
    /// Parsed JSON body; non-JSON bodies arrive as `{"raw_body": "..."}`.
    pub body: serde_json::Value,
    pub reported_latency_ms: Option<f64>,
}

impl TargetResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Target unreachable: {0}")]
    Unreachable(String),

    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

/// One request/response exchange with the target.
///
/// Abstracted behind a trait so the environment can run against a real HTTP
/// service or the in-process reference target.
pub trait Transport {
    fn send(&mut self, request: &TargetRequest) -> Result<TargetResponse, TransportError>;

    /// Identity of the target recorded in episode artifacts.
    fn target(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, request: &TargetRequest) -> Result<TargetResponse, TransportError> {
        (**self).send(request)
    }

    fn target(&self) -> &str {
        (**self).target()
    }
}
