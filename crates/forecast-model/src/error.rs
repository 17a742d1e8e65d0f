//! 모델 파이프라인 에러 타입.

use forecast_core::ForecastError;
use thiserror::Error;

/// 모델 작업에서 발생할 수 있는 에러.
#[derive(Debug, Error)]
pub enum ModelError {
    /// 학습 전 추론/스케일링 시도
    #[error("Model not fitted for {0}")]
    NotFitted(String),

    /// 피처 개수가 스케일러와 불일치
    #[error("Feature shape mismatch: expected {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// 학습에 필요한 데이터 부족
    #[error("Insufficient data: need {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// 학습 실패
    #[error("Training error: {0}")]
    Training(String),

    /// 아티팩트 저장/로드 실패
    #[error("Artifact error: {0}")]
    Artifact(String),
}

/// 모델 작업을 위한 Result 타입.
pub type ModelResult<T> = Result<T, ModelError>;

impl From<ModelError> for ForecastError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFitted(s) => ForecastError::ModelNotReady(s),
            ModelError::ShapeMismatch { .. } => ForecastError::Scaling(err.to_string()),
            ModelError::InsufficientData { .. } => ForecastError::DataUnavailable(err.to_string()),
            ModelError::Training(s) => ForecastError::Internal(s),
            ModelError::Artifact(s) => ForecastError::Persistence(s),
        }
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Artifact(err.to_string())
    }
}

impl From<bincode::Error> for ModelError {
    fn from(err: bincode::Error) -> Self {
        ModelError::Artifact(err.to_string())
    }
}
