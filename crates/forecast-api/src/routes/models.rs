//! 모델 목록 endpoint.
//!
//! 메타데이터 저장소의 활성 모델 목록을 반환합니다. 이 엔드포인트는
//! 메타데이터 저장소 뷰이므로 DB가 설정되지 않은 경우 에러를
//! 반환합니다 (빈 목록으로 오설정을 감추지 않음).

use axum::http::StatusCode;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::error::{ApiErrorResponse, ApiResult};
use crate::repository::{ModelRecord, ModelsRepository};
use crate::state::AppState;

/// 모델 목록 응답.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelRecord>,
    pub total: usize,
}

/// GET /models - 활성 모델 목록.
pub async fn list_models(State(state): State<Arc<AppState>>) -> ApiResult<Json<ModelsResponse>> {
    let Some(pool) = &state.db_pool else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiErrorResponse::new(
                "DB_NOT_CONFIGURED",
                "metadata store is not configured (DATABASE_URL unset)",
            )),
        ));
    };

    let models = ModelsRepository::list_active(pool).await.map_err(|err| {
        error!(error = %err, "Failed to list models");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiErrorResponse::new("DB_ERROR", err.to_string())),
        )
    })?;

    let total = models.len();
    Ok(Json(ModelsResponse { models, total }))
}

/// 모델 목록 라우터 생성.
pub fn models_router() -> Router<Arc<AppState>> {
    Router::new().route("/models", get(list_models))
}
