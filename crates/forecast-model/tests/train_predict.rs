//! 학습 → 예측 통합 테스트.
//!
//! 합성 단조 증가 시계열로 실제 LSTM을 학습하고, 방향 정확도와
//! 추세 레이블 속성을 검증합니다.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use forecast_core::{ForecastResult, Horizon, IndicatorRow, MarketHistory, TrendDirection};
use forecast_model::{LstmConfig, LstmRegressor, PipelineConfig, PipelineRegistry};

/// 선형 증가 시계열을 반환하는 합성 제공자.
struct LinearProvider {
    rows: usize,
}

#[async_trait]
impl MarketHistory for LinearProvider {
    async fn fetch_history(
        &self,
        _symbol: &str,
        _lookback_days: u32,
    ) -> ForecastResult<Vec<IndicatorRow>> {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Ok((0..self.rows)
            .map(|i| {
                let price = 100.0 + i as f64;
                IndicatorRow {
                    timestamp: start + Duration::hours(i as i64),
                    price,
                    sma_20: price - 1.0,
                    ema_12: price,
                    ema_26: price,
                    rsi: 55.0,
                    volatility: 2.0,
                }
            })
            .collect())
    }
}

fn tiny_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        window_len: 12,
        train_ratio: 0.8,
        lookback_days: 30,
        model: LstmConfig {
            hidden_sizes: vec![16, 8],
            dense_size: 8,
            dropout: 0.0,
            learning_rate: 0.01,
            epochs: 60,
            batch_size: 8,
            validation_ratio: 0.2,
            early_stopping_patience: 12,
            plateau_patience: 5,
            plateau_factor: 0.5,
            seed: 7,
        },
    }
}

fn test_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "forecast-train-predict-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn monotonic_series_yields_directional_accuracy_at_least_half() {
    let registry = PipelineRegistry::new(
        tiny_pipeline_config(),
        test_dir("accuracy"),
        LstmRegressor::new(tiny_pipeline_config().model),
    );
    let provider = LinearProvider { rows: 140 };

    let outcome = registry.train(&provider, "BTC", false).await.unwrap();

    assert!((0.0..=1.0).contains(&outcome.metrics.directional_accuracy));
    assert!(
        outcome.metrics.directional_accuracy >= 0.5,
        "directional accuracy {} below 0.5 on a monotonic series",
        outcome.metrics.directional_accuracy
    );
    assert!(outcome.metrics.mae.is_finite());
    assert!(outcome.metrics.rmse >= outcome.metrics.mae * 0.99);
    assert!(outcome.metrics.training_data_points > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rising_tail_predicts_bullish() {
    let registry = PipelineRegistry::new(
        tiny_pipeline_config(),
        test_dir("bullish"),
        LstmRegressor::new(tiny_pipeline_config().model),
    );
    let provider = LinearProvider { rows: 140 };

    // 상승 추세의 후행 구간, 현재가는 학습 범위 중간에 둔다
    let historical: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
    let (outcome, prediction) = registry
        .forecast(&provider, "BTC", 150.0, &historical, Horizon::Hour)
        .await
        .unwrap();

    assert!(!outcome.from_cache || outcome.metrics.training_data_points > 0);
    assert!(prediction.predicted_price.is_finite());
    assert_eq!(prediction.trend, TrendDirection::Bullish);
    assert_eq!(prediction.features.trend, prediction.trend);

    // 신뢰도는 항상 허용 범위 안
    assert!(prediction.confidence >= 0.60 * 0.85 - 1e-9);
    assert!(prediction.confidence <= 0.95 + 1e-9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_call_reuses_trained_model() {
    let registry = PipelineRegistry::new(
        tiny_pipeline_config(),
        test_dir("reuse"),
        LstmRegressor::new(tiny_pipeline_config().model),
    );
    let provider = LinearProvider { rows: 140 };

    let first = registry.train(&provider, "ETH", false).await.unwrap();
    let second = registry.train(&provider, "ETH", false).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(
        first.metrics.training_data_points,
        second.metrics.training_data_points
    );
}
