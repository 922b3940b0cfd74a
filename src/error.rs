//! Error types for rTomcat-Exporter
//!
//! This module defines the error types used throughout the application.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Management interface 에러 (MBean 조회, Jolokia 통신)
#[derive(Error, Debug)]
pub enum JmxError {
    /// MBean이 등록되어 있지 않음 (조회 도중 사라진 경우 포함)
    #[error("MBean not found: {0}")]
    InstanceNotFound(String),

    /// MBean에 해당 속성이 없음
    #[error("Attribute '{attribute}' not found on {object}")]
    AttributeNotFound { object: String, attribute: String },

    /// 잘못된 ObjectName 또는 패턴
    #[error("Invalid ObjectName '{name}': {reason}")]
    MalformedObjectName { name: String, reason: String },

    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// HTTP 요청 실패
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// HTTP 응답 읽기 실패
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// HTTP 상태 코드 에러
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// JSON 파싱 에러
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Jolokia 에러 응답
    #[error("Jolokia error (status {status}): {message}")]
    Jolokia { status: u16, message: String },

    /// 타임아웃
    /// The value is the configured timeout in milliseconds, if known.
    #[error("Request timed out{}", .0.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout(Option<u64>),

    /// 연결 실패
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl JmxError {
    /// 대상 MBean이 사라진 경우인지 확인
    pub fn is_instance_not_found(&self) -> bool {
        matches!(self, JmxError::InstanceNotFound(_))
    }

    /// 속성 누락 에러인지 확인
    pub fn is_attribute_not_found(&self) -> bool {
        matches!(self, JmxError::AttributeNotFound { .. })
    }

    /// 통신 계층 에러인지 확인
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            JmxError::HttpClientInit(_)
                | JmxError::HttpRequest(_)
                | JmxError::HttpResponse(_)
                | JmxError::HttpStatus(_)
                | JmxError::JsonParse(_)
                | JmxError::Jolokia { .. }
                | JmxError::Timeout(..)
                | JmxError::ConnectionFailed(_)
        )
    }

    /// HTTP 상태 코드 추출
    pub fn http_status(&self) -> Option<u16> {
        match self {
            JmxError::HttpStatus(code) => Some(*code),
            JmxError::Jolokia { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Create a Timeout error with known duration
    pub fn timeout_with_duration(ms: u64) -> Self {
        JmxError::Timeout(Some(ms))
    }
}

impl From<reqwest::Error> for JmxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest doesn't expose the configured timeout duration
            JmxError::Timeout(None)
        } else if err.is_connect() {
            JmxError::ConnectionFailed(err.to_string())
        } else if err.is_request() {
            JmxError::HttpRequest(err)
        } else {
            JmxError::HttpResponse(err)
        }
    }
}

/// Managed object discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The assembled name pattern is malformed
    #[error("Configuration error: {0}")]
    Configuration(#[source] JmxError),

    /// The management interface failed to answer the query
    #[error("Discovery failed: {0}")]
    Jmx(#[source] JmxError),
}

/// Metric registry errors
///
/// Both variants indicate a defect in the calling collector, not a runtime
/// condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Label value count differs from the family's label name count
    #[error("Family '{family}' expects {expected} label values, got {actual}")]
    LabelArity {
        family: String,
        expected: usize,
        actual: usize,
    },

    /// Operation not supported by the family's kind
    #[error("Family '{family}' is a {kind}, cannot {operation}")]
    KindMismatch {
        family: String,
        kind: &'static str,
        operation: &'static str,
    },
}

impl RegistryError {
    /// Report a misuse of a metric family
    ///
    /// Panics in debug builds; logged at error level otherwise.
    pub fn report(&self) {
        tracing::error!(error = %self, "Metric family misuse");
        debug_assert!(false, "{}", self);
    }
}

/// Query interceptor configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterceptorConfigError {
    /// Bucket list could not be parsed
    #[error("Invalid bucket list '{value}' for '{key}': {reason}")]
    InvalidBuckets {
        key: String,
        value: String,
        reason: String,
    },

    /// Slow query threshold is not a non-negative integer
    #[error("Invalid threshold '{0}': expected milliseconds as a non-negative integer")]
    InvalidThreshold(String),

    /// Interceptor descriptor is not of the form `Name(key=value,...)`
    #[error("Invalid interceptor descriptor '{0}'")]
    InvalidDescriptor(String),
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Management interface error
    #[error("JMX error: {0}")]
    Jmx(#[from] JmxError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, public_message, log_message) = match self {
            AppError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error",
                e.to_string(),
            ),
            AppError::Jmx(e) => (StatusCode::BAD_GATEWAY, "Upstream error", e.to_string()),
            AppError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error", e),
        };

        tracing::error!(status = %status, error = %log_message, "Request failed");

        (status, public_message).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(JmxError::InstanceNotFound("a:b=c".into()).is_instance_not_found());
        assert!(JmxError::AttributeNotFound {
            object: "a:b=c".into(),
            attribute: "Size".into()
        }
        .is_attribute_not_found());
        assert!(JmxError::Timeout(None).is_communication());
        assert!(JmxError::HttpStatus(503).is_communication());
        assert!(!JmxError::InstanceNotFound("a:b=c".into()).is_communication());
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            JmxError::timeout_with_duration(250).to_string(),
            "Request timed out after 250ms"
        );
        assert_eq!(JmxError::Timeout(None).to_string(), "Request timed out");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(JmxError::HttpStatus(500).http_status(), Some(500));
        let err = JmxError::Jolokia {
            status: 404,
            message: "gone".into(),
        };
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(JmxError::JsonParse("x".into()).http_status(), None);
    }

    #[test]
    fn test_registry_error_message() {
        let err = RegistryError::LabelArity {
            family: "tomcat_threads_total".into(),
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Family 'tomcat_threads_total' expects 1 label values, got 2"
        );
    }

    #[test]
    fn test_app_error_response_status() {
        let response = AppError::Jmx(JmxError::HttpStatus(503)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AppError::Internal("bind failed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
