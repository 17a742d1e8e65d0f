//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트에서 일관된 에러 형식을 제공합니다. 핸들러 실패는
//! 일괄적으로 500으로 표면화됩니다 (요청 본문 파싱 실패는 extractor
//! 계층에서 4xx로 처리됨).

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use forecast_core::ForecastError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "DATA_UNAVAILABLE",
///   "message": "Market data unavailable: provider returned 503",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "DATA_UNAVAILABLE", "MODEL_NOT_READY")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    /// 기본 에러 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// `ForecastError`를 HTTP 에러 응답으로 변환.
///
/// 서비스 실패는 일괄 500으로 표면화하고, 잘못된 입력만 400을
/// 사용합니다.
pub fn into_response_error(err: ForecastError) -> (StatusCode, Json<ApiErrorResponse>) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(ApiErrorResponse::new(err.code(), err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_serialization() {
        let error = ApiErrorResponse::new("NOT_FOUND", "model missing");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains(r#""code":"NOT_FOUND""#));
        assert!(json.contains(r#""message":"model missing""#));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_error_response_with_details() {
        let error = ApiErrorResponse::with_details(
            "INVALID_INPUT",
            "bad symbol",
            serde_json::json!({"field": "symbol"}),
        );
        assert!(error.details.is_some());
    }

    #[test]
    fn test_forecast_error_status_mapping() {
        let (status, body) =
            into_response_error(ForecastError::DataUnavailable("503".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "DATA_UNAVAILABLE");

        let (status, body) =
            into_response_error(ForecastError::InvalidInput("negative price".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "INVALID_INPUT");
    }
}
