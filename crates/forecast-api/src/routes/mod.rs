//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `GET /` - 서비스 정보
//! - `GET /health` - 헬스 체크 (liveness)
//! - `GET /health/ready` - 상세 헬스 체크 (readiness)
//! - `POST /predict` - 가격 예측 (필요 시 lazy 학습)
//! - `POST /train/{symbol}` - 모델 학습/재학습
//! - `GET /models` - 활성 모델 목록

pub mod health;
pub mod models;
pub mod predict;
pub mod train;

pub use health::{health_router, ComponentStatus, HealthResponse};
pub use models::{models_router, ModelsResponse};
pub use predict::{predict_router, PredictionRequest, PredictionResponse};
pub use train::{train_router, TrainResponse};

use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::state::AppState;

/// 서비스 정보 응답 (GET /).
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Crypto Price Forecast API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .nest("/health", health_router())
        .merge(predict_router())
        .merge(train_router())
        .merge(models_router())
}
