//! 가격 예측 endpoint.
//!
//! 심볼의 파이프라인을 resolve하고(필요하면 lazy 학습), 예측을 생성한 뒤
//! 학습 지표와 예측 기록을 메타데이터 저장소에 미러링합니다. 미러링
//! 실패는 요청 실패로 이어지지 않습니다.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use forecast_core::{ForecastError, Horizon};

use crate::error::{into_response_error, ApiResult};
use crate::repository::{ModelsRepository, NewPrediction, PredictionsRepository};
use crate::state::AppState;

/// 예측 요청.
#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    /// 심볼 (예: "BTC")
    pub symbol: String,
    /// 현재 가격
    pub current_price: f64,
    /// 과거 가격 (최신이 마지막)
    #[serde(default)]
    pub historical_prices: Vec<f64>,
    /// 예측 지평 (기본: 1H)
    #[serde(default)]
    pub horizon: Horizon,
}

/// 예측 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_price: f64,
    pub confidence_level: f64,
    /// 사람이 읽을 수 있는 근거 설명
    pub reasoning: String,
    pub rmse: f64,
    pub mae: f64,
    pub mape: f64,
    /// 모델 요약 정보
    pub model_info: Value,
    /// 피처 스냅샷
    pub features: Value,
}

/// 요청 유효성 검사.
fn validate(request: &PredictionRequest) -> Result<(), ForecastError> {
    if request.symbol.trim().is_empty() {
        return Err(ForecastError::InvalidInput("symbol is empty".to_string()));
    }
    if !request.current_price.is_finite() || request.current_price <= 0.0 {
        return Err(ForecastError::InvalidInput(format!(
            "current_price must be positive, got {}",
            request.current_price
        )));
    }
    if request.historical_prices.iter().any(|p| !p.is_finite()) {
        return Err(ForecastError::InvalidInput(
            "historical_prices contain non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// POST /predict - 가격 예측.
pub async fn predict_price(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictionRequest>,
) -> ApiResult<Json<PredictionResponse>> {
    validate(&request).map_err(into_response_error)?;

    let symbol = request.symbol.trim().to_uppercase();

    let (outcome, prediction) = state
        .registry
        .forecast(
            state.provider.as_ref(),
            &symbol,
            request.current_price,
            &request.historical_prices,
            request.horizon,
        )
        .await
        .map_err(into_response_error)?;

    info!(
        symbol = %symbol,
        predicted_price = prediction.predicted_price,
        confidence = prediction.confidence,
        horizon = %request.horizon,
        from_cache = outcome.from_cache,
        "Prediction served"
    );

    // 메타데이터 미러링 (비치명적)
    if let Some(pool) = &state.db_pool {
        let model_id = if outcome.from_cache {
            ModelsRepository::get_active(pool, &symbol)
                .await
                .ok()
                .flatten()
                .map(|m| m.id)
        } else {
            ModelsRepository::mirror_training(pool, &symbol, &outcome).await
        };

        let record = NewPrediction {
            symbol: symbol.clone(),
            current_price: request.current_price,
            predicted_price: prediction.predicted_price,
            confidence_level: prediction.confidence,
            prediction_horizon: request.horizon.as_str().to_string(),
            predicted_for: chrono::Utc::now() + request.horizon.duration(),
            features: serde_json::to_value(&prediction.features).unwrap_or(Value::Null),
            model_id,
        };
        PredictionsRepository::mirror(pool, &record).await;
    }

    let reasoning = format!(
        "LSTM deep learning model trained on {} data points with {:.1}% directional accuracy",
        outcome.metrics.training_data_points,
        outcome.metrics.directional_accuracy * 100.0
    );

    Ok(Json(PredictionResponse {
        predicted_price: prediction.predicted_price,
        confidence_level: prediction.confidence,
        reasoning,
        rmse: outcome.metrics.rmse,
        mae: outcome.metrics.mae,
        mape: outcome.metrics.mape,
        model_info: serde_json::json!({
            "type": "LSTM",
            "accuracy": outcome.metrics.directional_accuracy,
            "training_points": outcome.metrics.training_data_points,
            "symbol": symbol,
        }),
        features: serde_json::to_value(&prediction.features).unwrap_or(Value::Null),
    }))
}

/// 예측 라우터 생성.
pub fn predict_router() -> Router<Arc<AppState>> {
    Router::new().route("/predict", post(predict_price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::create_test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app(name: &str) -> Router {
        let state = Arc::new(create_test_state(name));
        predict_router().with_state(state)
    }

    fn predict_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_predict_trains_and_returns_prediction() {
        let app = app("predict-full");

        // 상승 추세 이력, 현재가는 학습 범위 중간
        let historical: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let body = serde_json::json!({
            "symbol": "BTC",
            "current_price": 150.0,
            "historical_prices": historical,
            "horizon": "1H",
        });

        let response = app.oneshot(predict_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: PredictionResponse = serde_json::from_slice(&bytes).unwrap();

        assert!(parsed.predicted_price.is_finite());
        assert!(parsed.confidence_level >= 0.60 * 0.85 - 1e-9);
        assert!(parsed.confidence_level <= 0.95 + 1e-9);
        assert!(parsed.reasoning.contains("data points"));
        assert_eq!(parsed.model_info["symbol"], "BTC");
        assert_eq!(parsed.features["trend"], "bullish");
    }

    #[tokio::test]
    async fn test_predict_rejects_negative_price() {
        let app = app("predict-invalid");

        let body = serde_json::json!({
            "symbol": "BTC",
            "current_price": -5.0,
            "historical_prices": [100.0, 101.0],
        });

        let response = app.oneshot(predict_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_predict_rejects_unknown_horizon() {
        let app = app("predict-horizon");

        let body = serde_json::json!({
            "symbol": "BTC",
            "current_price": 100.0,
            "historical_prices": [100.0],
            "horizon": "3Y",
        });

        let response = app.oneshot(predict_request(body)).await.unwrap();
        // 지평 태그는 열거형이므로 extractor 계층에서 거부됨
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_predict_rejects_malformed_body() {
        let app = app("predict-malformed");

        let response = app
            .oneshot(predict_request(serde_json::json!({"symbol": "BTC"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
