//! 예측 기록 Repository.
//!
//! 서빙된 예측마다 `predictions` 테이블에 불변 행을 하나 남깁니다.
//! 행은 생성 시점의 활성 모델(`model_id`)과 연관됩니다.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

/// 새 예측 기록.
#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub symbol: String,
    pub current_price: f64,
    pub predicted_price: f64,
    pub confidence_level: f64,
    /// 지평 태그 ("1H" | "24H" | "7D")
    pub prediction_horizon: String,
    /// 예측 목표 시각
    pub predicted_for: DateTime<Utc>,
    /// 피처 스냅샷 (jsonb)
    pub features: Value,
    /// 생성 시점의 활성 모델 id
    pub model_id: Option<Uuid>,
}

/// 예측 기록 Repository.
pub struct PredictionsRepository;

impl PredictionsRepository {
    /// 예측 기록 삽입. 생성된 행의 id를 반환합니다.
    pub async fn insert(pool: &PgPool, record: &NewPrediction) -> Result<Uuid, sqlx::Error> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO predictions (
                symbol, current_price, predicted_price, confidence_level,
                prediction_horizon, predicted_for, features, model_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&record.symbol)
        .bind(record.current_price)
        .bind(record.predicted_price)
        .bind(record.confidence_level)
        .bind(&record.prediction_horizon)
        .bind(record.predicted_for)
        .bind(&record.features)
        .bind(record.model_id)
        .fetch_one(pool)
        .await?;

        debug!(
            symbol = %record.symbol,
            prediction_id = %id,
            "Prediction recorded"
        );

        Ok(id)
    }

    /// 예측 기록 미러링 (비치명적).
    pub async fn mirror(pool: &PgPool, record: &NewPrediction) -> Option<Uuid> {
        match Self::insert(pool, record).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(
                    symbol = %record.symbol,
                    error = %err,
                    "Failed to record prediction"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_prediction_construction() {
        let record = NewPrediction {
            symbol: "BTC".to_string(),
            current_price: 64_000.0,
            predicted_price: 64_800.0,
            confidence_level: 0.82,
            prediction_horizon: "1H".to_string(),
            predicted_for: Utc::now(),
            features: serde_json::json!({
                "current_price": 64_000.0,
                "volatility": 0.012,
                "trend": "bullish"
            }),
            model_id: None,
        };

        assert_eq!(record.symbol, "BTC");
        assert!(record.predicted_price > record.current_price);
        assert_eq!(record.features["trend"], "bullish");
    }
}
