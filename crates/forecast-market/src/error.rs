//! 시장 데이터 에러 타입.

use forecast_core::ForecastError;
use thiserror::Error;

/// 시장 데이터 조회 관련 에러.
#[derive(Debug, Error)]
pub enum MarketError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 제공자가 비정상 상태 코드를 반환
    #[error("Provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// 응답 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 빈 응답 또는 유효한 샘플 없음
    #[error("Provider returned no usable samples for {0}")]
    EmptyData(String),
}

/// 시장 데이터 작업을 위한 Result 타입.
pub type MarketResult<T> = Result<T, MarketError>;

impl MarketError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MarketError::Network(_) | MarketError::Timeout(_) | MarketError::RateLimited
        )
    }

    /// 권장 재시도 대기 시간(밀리초) 반환.
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            MarketError::RateLimited => Some(10_000),
            MarketError::Network(_) => Some(1_000),
            MarketError::Timeout(_) => Some(500),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for MarketError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MarketError::Timeout(err.to_string())
        } else if err.is_connect() {
            MarketError::Network(err.to_string())
        } else if err.is_decode() {
            MarketError::Parse(err.to_string())
        } else {
            MarketError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::Parse(err.to_string())
    }
}

impl From<MarketError> for ForecastError {
    fn from(err: MarketError) -> Self {
        ForecastError::DataUnavailable(err.to_string())
    }
}
