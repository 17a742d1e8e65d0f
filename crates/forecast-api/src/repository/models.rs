//! 모델 메타데이터 Repository.
//!
//! 학습 결과를 `models` 테이블에 미러링합니다. 키는 (symbol, model_type)
//! 이며 동일 키 행이 있으면 갱신, 없으면 삽입합니다. 심볼당 활성 모델은
//! 하나뿐이고 이전 행은 새 학습 결과로 대체됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use forecast_model::TrainOutcome;

/// 미러링되는 모델 타입 식별자.
const MODEL_TYPE: &str = "LSTM";

/// 모델 메타데이터 레코드.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModelRecord {
    pub id: Uuid,
    /// 표시용 이름 (예: "LSTM Model for BTC")
    pub name: String,
    pub symbol: String,
    pub model_type: String,
    /// 방향 정확도 [0, 1]
    pub accuracy: f64,
    pub mae: f64,
    /// 퍼센트 단위 MAPE
    pub mape: f64,
    pub training_data_points: i32,
    pub last_trained_at: DateTime<Utc>,
    pub hyperparameters: Option<Value>,
    pub validation_metrics: Option<Value>,
    pub is_active: bool,
}

/// 모델 메타데이터 Repository.
pub struct ModelsRepository;

impl ModelsRepository {
    /// 학습 결과 upsert. 갱신/삽입된 행의 id를 반환합니다.
    pub async fn upsert(
        pool: &PgPool,
        symbol: &str,
        outcome: &TrainOutcome,
    ) -> Result<Uuid, sqlx::Error> {
        let hyperparameters = serde_json::to_value(&outcome.hyperparameters).ok();
        let validation_metrics = serde_json::to_value(&outcome.validation).ok();

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO models (
                name, symbol, model_type, accuracy, mae, mape,
                training_data_points, last_trained_at,
                hyperparameters, validation_metrics, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)
            ON CONFLICT (symbol, model_type) DO UPDATE SET
                name = EXCLUDED.name,
                accuracy = EXCLUDED.accuracy,
                mae = EXCLUDED.mae,
                mape = EXCLUDED.mape,
                training_data_points = EXCLUDED.training_data_points,
                last_trained_at = EXCLUDED.last_trained_at,
                hyperparameters = EXCLUDED.hyperparameters,
                validation_metrics = EXCLUDED.validation_metrics,
                is_active = TRUE
            RETURNING id
            "#,
        )
        .bind(format!("LSTM Model for {}", symbol))
        .bind(symbol)
        .bind(MODEL_TYPE)
        .bind(outcome.metrics.directional_accuracy)
        .bind(outcome.metrics.mae)
        .bind(outcome.metrics.mape)
        .bind(outcome.metrics.training_data_points as i32)
        .bind(outcome.trained_at)
        .bind(hyperparameters)
        .bind(validation_metrics)
        .fetch_one(pool)
        .await?;

        debug!(symbol = %symbol, model_id = %id, "Model metadata upserted");

        Ok(id)
    }

    /// 심볼의 활성 모델 조회.
    pub async fn get_active(
        pool: &PgPool,
        symbol: &str,
    ) -> Result<Option<ModelRecord>, sqlx::Error> {
        sqlx::query_as::<_, ModelRecord>(
            r#"
            SELECT id, name, symbol, model_type, accuracy, mae, mape,
                   training_data_points, last_trained_at,
                   hyperparameters, validation_metrics, is_active
            FROM models
            WHERE symbol = $1 AND is_active = TRUE
            ORDER BY last_trained_at DESC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .fetch_optional(pool)
        .await
    }

    /// 전체 활성 모델 목록.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<ModelRecord>, sqlx::Error> {
        sqlx::query_as::<_, ModelRecord>(
            r#"
            SELECT id, name, symbol, model_type, accuracy, mae, mape,
                   training_data_points, last_trained_at,
                   hyperparameters, validation_metrics, is_active
            FROM models
            WHERE is_active = TRUE
            ORDER BY symbol ASC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// 학습 결과 미러링 (비치명적).
    ///
    /// 실패하면 경고만 남깁니다. 학습된 모델은 메타데이터 미러링 실패와
    /// 무관하게 프로세스 내에서 계속 사용할 수 있습니다.
    pub async fn mirror_training(
        pool: &PgPool,
        symbol: &str,
        outcome: &TrainOutcome,
    ) -> Option<Uuid> {
        match Self::upsert(pool, symbol, outcome).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(
                    symbol = %symbol,
                    error = %err,
                    "Failed to mirror training metadata (model remains usable)"
                );
                None
            }
        }
    }
}
