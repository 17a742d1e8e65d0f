//! 예측 서비스의 에러 타입.
//!
//! 서비스 전반에서 사용되는 에러 분류 체계를 정의합니다.
//! 하위 크레이트의 에러(`MarketError`, `ModelError`)는 이 타입으로
//! 변환되어 API 계층까지 전파됩니다.

use thiserror::Error;

/// 핵심 예측 서비스 에러.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// 시장 데이터 조회/파싱 실패
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    /// 학습 완료 전 추론 시도
    #[error("Model not ready: {0}")]
    ModelNotReady(String),

    /// 피처 행렬과 스케일러 형상 불일치
    #[error("Scaling error: {0}")]
    Scaling(String),

    /// 아티팩트/메타데이터 저장소 읽기·쓰기 실패
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// 잘못된 입력
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 내부 에러
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 예측 작업을 위한 Result 타입.
pub type ForecastResult<T> = Result<T, ForecastError>;

impl ForecastError {
    /// 재시도 가능한 에러인지 확인합니다.
    ///
    /// 데이터 제공자 장애는 일시적일 수 있으므로 재시도 대상입니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ForecastError::DataUnavailable(_))
    }

    /// 호출자 쪽 문제(4xx 성격)인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ForecastError::InvalidInput(_))
    }

    /// API 에러 응답에 사용할 코드 문자열을 반환합니다.
    pub fn code(&self) -> &'static str {
        match self {
            ForecastError::DataUnavailable(_) => "DATA_UNAVAILABLE",
            ForecastError::ModelNotReady(_) => "MODEL_NOT_READY",
            ForecastError::Scaling(_) => "SCALING_ERROR",
            ForecastError::Persistence(_) => "PERSISTENCE_ERROR",
            ForecastError::InvalidInput(_) => "INVALID_INPUT",
            ForecastError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Internal(err.to_string())
    }
}
