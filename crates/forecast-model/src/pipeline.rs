//! 심볼별 예측 파이프라인과 레지스트리.
//!
//! `SymbolPipeline`은 한 심볼의 train-or-load와 예측을 담당하고,
//! `PipelineRegistry`는 심볼 → 파이프라인 핸들 맵을 관리합니다.
//! 핸들은 `Arc<Mutex<…>>`로 보관되어 심볼별 작업이 직렬화됩니다:
//! 미학습 심볼에 대한 동시 요청 중 두 번째 호출자는 첫 호출자의 학습이
//! 끝날 때까지 대기한 뒤 메모리에 적재된 모델을 재사용하므로, 학습은
//! 정확히 한 번만 수행됩니다 (single-flight).
//!
//! 학습과 추론은 계산량이 크므로 blocking 풀에서 실행하여 요청 이벤트
//! 루프를 막지 않습니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ndarray::{s, Array1};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use forecast_core::{ForecastError, ForecastResult, Horizon, MarketHistory};

use crate::engine::{self, PredictionOutput};
use crate::metrics::{evaluate, Hyperparameters, TrainingMetrics, ValidationSnapshot};
use crate::regressor::{LstmConfig, SequenceRegressor};
use crate::scaler::MinMaxScaler;
use crate::store::{ModelArtifact, ModelStore};
use crate::window::prepare_windows;

/// 파이프라인 설정.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 윈도우 길이
    pub window_len: usize,
    /// 학습/평가 분할 비율 (시간순)
    pub train_ratio: f64,
    /// 학습 데이터 조회 기간 (일)
    pub lookback_days: u32,
    /// 모델 하이퍼파라미터
    pub model: LstmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_len: 60,
            train_ratio: 0.8,
            lookback_days: 730,
            model: LstmConfig::default(),
        }
    }
}

/// train-or-load 결과.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// 평가 지표
    pub metrics: TrainingMetrics,
    /// 학습 하이퍼파라미터
    pub hyperparameters: Hyperparameters,
    /// 검증 지표 스냅샷
    pub validation: ValidationSnapshot,
    /// 학습 완료 시각
    pub trained_at: DateTime<Utc>,
    /// 기존 모델 재사용 여부 (false면 새로 학습)
    pub from_cache: bool,
}

/// 메모리에 적재된 학습 상태.
struct LoadedState<R> {
    regressor: R,
    scaler: MinMaxScaler,
    metrics: TrainingMetrics,
    hyperparameters: Hyperparameters,
    validation: ValidationSnapshot,
    trained_at: DateTime<Utc>,
}

impl<R> LoadedState<R> {
    fn outcome(&self, from_cache: bool) -> TrainOutcome {
        TrainOutcome {
            metrics: self.metrics.clone(),
            hyperparameters: self.hyperparameters.clone(),
            validation: self.validation.clone(),
            trained_at: self.trained_at,
            from_cache,
        }
    }
}

/// 한 심볼의 예측 파이프라인.
pub struct SymbolPipeline<R> {
    symbol: String,
    config: PipelineConfig,
    store: ModelStore,
    template: R,
    state: Option<LoadedState<R>>,
}

impl<R> SymbolPipeline<R>
where
    R: SequenceRegressor + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// 새 파이프라인 생성.
    pub fn new(symbol: String, config: PipelineConfig, store: ModelStore, template: R) -> Self {
        Self {
            symbol,
            config,
            store,
            template,
            state: None,
        }
    }

    /// 메모리에 모델이 적재되어 있는지 확인.
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// train-or-load.
    ///
    /// `retrain=false`이고 메모리 또는 디스크에 사용 가능한 모델이 있으면
    /// 그 지표를 반환합니다. 아티팩트 쌍이 없거나 손상된 경우에는 플래그와
    /// 무관하게 전체 학습을 수행합니다.
    pub async fn train_or_load(
        &mut self,
        provider: &dyn MarketHistory,
        retrain: bool,
    ) -> ForecastResult<TrainOutcome> {
        if !retrain {
            if let Some(state) = &self.state {
                return Ok(state.outcome(true));
            }

            if self.store.has_artifacts(&self.symbol) {
                match self.store.load::<R>(&self.symbol) {
                    Ok((artifact, scaler)) => {
                        info!(symbol = %self.symbol, "Loaded existing model artifacts");
                        let state = LoadedState {
                            regressor: artifact.regressor,
                            scaler,
                            metrics: artifact.metrics,
                            hyperparameters: artifact.hyperparameters,
                            validation: artifact.validation,
                            trained_at: artifact.trained_at,
                        };
                        let outcome = state.outcome(true);
                        self.state = Some(state);
                        return Ok(outcome);
                    }
                    Err(err) => {
                        warn!(
                            symbol = %self.symbol,
                            error = %err,
                            "Artifact load failed, retraining"
                        );
                    }
                }
            }
        }

        self.train(provider).await
    }

    /// 전체 학습 파이프라인: fetch → 윈도우 → fit → 평가 → 저장.
    async fn train(&mut self, provider: &dyn MarketHistory) -> ForecastResult<TrainOutcome> {
        info!(
            symbol = %self.symbol,
            lookback_days = self.config.lookback_days,
            "Training sequence model"
        );

        let rows = provider
            .fetch_history(&self.symbol, self.config.lookback_days)
            .await?;

        let prepared = prepare_windows(&rows, self.config.window_len, self.config.train_ratio)?;

        // fit과 평가는 blocking 풀에서 수행
        let mut regressor = self.template.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let report = regressor.fit(&prepared.train.x, &prepared.train.y)?;

            let n_test = prepared.test.len();
            let mut scaled_preds = Vec::with_capacity(n_test);
            for i in 0..n_test {
                scaled_preds.push(regressor.predict(prepared.test.x.slice(s![i, .., ..]))?);
            }

            // 0 행렬의 가격 열만 채워 역스케일 (스케일러는 전체 열을 요구)
            let actual = prepared.scaler.inverse_price_series(&prepared.test.y)?;
            let predicted = prepared
                .scaler
                .inverse_price_series(&Array1::from(scaled_preds))?;

            let metrics = evaluate(&actual.to_vec(), &predicted.to_vec(), prepared.train.len());

            Ok::<_, crate::error::ModelError>((regressor, report, metrics, prepared.scaler))
        });

        let (regressor, report, metrics, scaler) = handle
            .await
            .map_err(|e| ForecastError::Internal(format!("training task panicked: {}", e)))??;

        let hyperparameters = Hyperparameters {
            sequence_length: self.config.window_len,
            epochs: report.epochs_run,
            batch_size: self.config.model.batch_size,
            learning_rate: self.config.model.learning_rate,
        };
        let validation = ValidationSnapshot {
            val_loss: report.best_val_loss,
            val_mae: report.best_val_mae,
        };
        let trained_at = Utc::now();

        info!(
            symbol = %self.symbol,
            directional_accuracy = metrics.directional_accuracy,
            mae = metrics.mae,
            rmse = metrics.rmse,
            epochs = report.epochs_run,
            "Training finished"
        );

        let artifact = ModelArtifact {
            regressor: regressor.clone(),
            metrics: metrics.clone(),
            hyperparameters: hyperparameters.clone(),
            validation: validation.clone(),
            trained_at,
        };

        // 메모리 상태를 먼저 갱신: 아티팩트 쓰기 실패가 학습 결과를
        // 무효화하지 않도록 함
        let state = LoadedState {
            regressor,
            scaler,
            metrics,
            hyperparameters,
            validation,
            trained_at,
        };
        let outcome = state.outcome(false);
        let scaler_ref = &state.scaler;

        if let Err(err) = self.store.save(&self.symbol, &artifact, scaler_ref) {
            error!(symbol = %self.symbol, error = %err, "Failed to persist model artifacts");
            self.state = Some(state);
            return Err(err.into());
        }
        self.state = Some(state);

        Ok(outcome)
    }

    /// 학습된 모델로 예측.
    ///
    /// 학습 전 호출은 사용 오류이며 `ModelNotReady`를 반환합니다.
    pub async fn predict(
        &self,
        current_price: f64,
        historical: &[f64],
        horizon: Horizon,
    ) -> ForecastResult<PredictionOutput> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| ForecastError::ModelNotReady(self.symbol.clone()))?;

        let regressor = state.regressor.clone();
        let scaler = state.scaler.clone();
        let window_len = self.config.window_len;
        let historical = historical.to_vec();

        let output = tokio::task::spawn_blocking(move || {
            engine::predict(
                &regressor,
                &scaler,
                current_price,
                &historical,
                horizon,
                window_len,
            )
        })
        .await
        .map_err(|e| ForecastError::Internal(format!("inference task panicked: {}", e)))??;

        Ok(output)
    }
}

/// 심볼 → 파이프라인 핸들 레지스트리.
///
/// 핸들 생성은 레지스트리 쓰기 잠금으로, 학습/예측은 심볼별 잠금으로
/// 보호됩니다.
pub struct PipelineRegistry<R> {
    pipelines: RwLock<HashMap<String, Arc<Mutex<SymbolPipeline<R>>>>>,
    config: PipelineConfig,
    artifact_dir: PathBuf,
    template: R,
}

impl<R> PipelineRegistry<R>
where
    R: SequenceRegressor + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// 새 레지스트리 생성.
    pub fn new(config: PipelineConfig, artifact_dir: impl Into<PathBuf>, template: R) -> Self {
        Self {
            pipelines: RwLock::new(HashMap::new()),
            config,
            artifact_dir: artifact_dir.into(),
            template,
        }
    }

    /// 심볼 정규화 (대문자).
    fn normalize(symbol: &str) -> String {
        symbol.trim().to_uppercase()
    }

    /// 심볼 파이프라인 핸들 조회 (없으면 생성).
    async fn handle(&self, symbol: &str) -> ForecastResult<Arc<Mutex<SymbolPipeline<R>>>> {
        let key = Self::normalize(symbol);

        {
            let pipelines = self.pipelines.read().await;
            if let Some(handle) = pipelines.get(&key) {
                return Ok(handle.clone());
            }
        }

        let mut pipelines = self.pipelines.write().await;
        // 쓰기 잠금 획득 사이에 다른 태스크가 먼저 넣었을 수 있음
        if let Some(handle) = pipelines.get(&key) {
            return Ok(handle.clone());
        }

        let store = ModelStore::new(&self.artifact_dir)
            .map_err(|e| ForecastError::Persistence(e.to_string()))?;
        let pipeline = SymbolPipeline::new(
            key.clone(),
            self.config.clone(),
            store,
            self.template.clone(),
        );
        let handle = Arc::new(Mutex::new(pipeline));
        pipelines.insert(key, handle.clone());

        Ok(handle)
    }

    /// train-or-load (심볼별 single-flight).
    pub async fn train(
        &self,
        provider: &dyn MarketHistory,
        symbol: &str,
        retrain: bool,
    ) -> ForecastResult<TrainOutcome> {
        let handle = self.handle(symbol).await?;
        let mut pipeline = handle.lock().await;
        pipeline.train_or_load(provider, retrain).await
    }

    /// train-or-load 후 예측까지 한 번의 잠금으로 수행.
    pub async fn forecast(
        &self,
        provider: &dyn MarketHistory,
        symbol: &str,
        current_price: f64,
        historical: &[f64],
        horizon: Horizon,
    ) -> ForecastResult<(TrainOutcome, PredictionOutput)> {
        let handle = self.handle(symbol).await?;
        let mut pipeline = handle.lock().await;

        let outcome = pipeline.train_or_load(provider, false).await?;
        let prediction = pipeline.predict(current_price, historical, horizon).await?;

        Ok((outcome, prediction))
    }

    /// 레지스트리에 등록된 심볼 목록.
    pub async fn tracked_symbols(&self) -> Vec<String> {
        let pipelines = self.pipelines.read().await;
        let mut symbols: Vec<String> = pipelines.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}
