//! 모델 학습 endpoint.
//!
//! 학습은 심볼별 single-flight로 직렬화되며, 결과 지표는 메타데이터
//! 저장소에 미러링됩니다 (비치명적).

use axum::extract::{Path, Query, State};
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use forecast_core::ForecastError;

use crate::error::{into_response_error, ApiResult};
use crate::repository::ModelsRepository;
use crate::state::AppState;

/// 학습 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct TrainQuery {
    /// true면 기존 아티팩트를 무시하고 항상 재학습
    #[serde(default)]
    pub retrain: bool,
}

/// 학습 지표 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainMetricsBody {
    pub accuracy: f64,
    pub mae: f64,
    pub mape: f64,
    pub rmse: f64,
    pub training_data_points: usize,
}

/// 학습 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResponse {
    pub message: String,
    pub metrics: TrainMetricsBody,
    /// 기존 모델 재사용 여부
    pub from_cache: bool,
}

/// POST /train/{symbol} - 모델 학습/재학습.
pub async fn train_model(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<TrainQuery>,
) -> ApiResult<Json<TrainResponse>> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(into_response_error(ForecastError::InvalidInput(
            "symbol is empty".to_string(),
        )));
    }

    let outcome = state
        .registry
        .train(state.provider.as_ref(), &symbol, query.retrain)
        .await
        .map_err(into_response_error)?;

    info!(
        symbol = %symbol,
        retrain = query.retrain,
        from_cache = outcome.from_cache,
        directional_accuracy = outcome.metrics.directional_accuracy,
        "Training request completed"
    );

    // 새로 학습한 경우에만 메타데이터 미러링 (비치명적)
    if !outcome.from_cache {
        if let Some(pool) = &state.db_pool {
            ModelsRepository::mirror_training(pool, &symbol, &outcome).await;
        }
    }

    Ok(Json(TrainResponse {
        message: format!("Model trained successfully for {}", symbol),
        metrics: TrainMetricsBody {
            accuracy: outcome.metrics.directional_accuracy,
            mae: outcome.metrics.mae,
            mape: outcome.metrics.mape,
            rmse: outcome.metrics.rmse,
            training_data_points: outcome.metrics.training_data_points,
        },
        from_cache: outcome.from_cache,
    }))
}

/// 학습 라우터 생성.
pub fn train_router() -> Router<Arc<AppState>> {
    Router::new().route("/train/{symbol}", post(train_model))
}
