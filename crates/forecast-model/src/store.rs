//! 모델 아티팩트 저장소.
//!
//! 심볼별로 모델 번들과 스케일러를 각각 하나의 파일로 저장합니다.
//! 두 파일이 모두 존재하면 "학습 완료" 상태로 간주합니다. 버전 관리는
//! 하지 않으며, 새 학습 결과가 이전 아티팩트를 덮어씁니다.
//!
//! 모델 번들에는 가중치 외에 지표 스냅샷과 하이퍼파라미터가 함께
//! 저장되므로, 메타데이터 저장소에 접근할 수 없어도 캐시 로드 경로가
//! 실제 지표를 반환할 수 있습니다.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ModelError, ModelResult};
use crate::metrics::{Hyperparameters, TrainingMetrics, ValidationSnapshot};
use crate::scaler::MinMaxScaler;

/// 학습 결과 번들.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<R> {
    /// 학습된 회귀 모델
    pub regressor: R,
    /// 평가 지표 스냅샷
    pub metrics: TrainingMetrics,
    /// 학습 하이퍼파라미터
    pub hyperparameters: Hyperparameters,
    /// 검증 지표 스냅샷
    pub validation: ValidationSnapshot,
    /// 학습 완료 시각
    pub trained_at: DateTime<Utc>,
}

/// 심볼 키 기반 로컬 아티팩트 저장소.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// 저장소 생성. 디렉터리가 없으면 만듭니다.
    pub fn new(dir: impl Into<PathBuf>) -> ModelResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// 저장소 디렉터리.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 모델 번들 파일 경로.
    pub fn model_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}_lstm_model.bin", symbol))
    }

    /// 스케일러 파일 경로.
    pub fn scaler_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}_scaler.bin", symbol))
    }

    /// 두 아티팩트가 모두 존재하는지 확인.
    ///
    /// 한쪽이라도 없으면 재학습이 필요합니다.
    pub fn has_artifacts(&self, symbol: &str) -> bool {
        self.model_path(symbol).exists() && self.scaler_path(symbol).exists()
    }

    /// 아티팩트 저장.
    pub fn save<R: Serialize>(
        &self,
        symbol: &str,
        artifact: &ModelArtifact<R>,
        scaler: &MinMaxScaler,
    ) -> ModelResult<()> {
        let model_bytes = bincode::serialize(artifact)?;
        let scaler_bytes = bincode::serialize(scaler)?;

        fs::write(self.model_path(symbol), model_bytes)?;
        fs::write(self.scaler_path(symbol), scaler_bytes)?;

        info!(
            symbol = %symbol,
            path = %self.model_path(symbol).display(),
            "Model artifacts saved"
        );

        Ok(())
    }

    /// 아티팩트 로드.
    pub fn load<R: DeserializeOwned>(
        &self,
        symbol: &str,
    ) -> ModelResult<(ModelArtifact<R>, MinMaxScaler)> {
        let model_bytes = fs::read(self.model_path(symbol))?;
        let scaler_bytes = fs::read(self.scaler_path(symbol))?;

        let artifact: ModelArtifact<R> = bincode::deserialize(&model_bytes)?;
        let scaler: MinMaxScaler = bincode::deserialize(&scaler_bytes)?;

        debug!(symbol = %symbol, "Model artifacts loaded");

        Ok((artifact, scaler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressor::{MockRegressor, SequenceRegressor};
    use ndarray::{array, Array1, Array3};

    fn test_store(name: &str) -> ModelStore {
        let dir = std::env::temp_dir().join(format!("forecast-store-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        ModelStore::new(dir).unwrap()
    }

    fn sample_artifact() -> ModelArtifact<MockRegressor> {
        let mut regressor = MockRegressor::new();
        let x = Array3::zeros((4, 3, 2));
        let y = Array1::zeros(4);
        regressor.fit(&x, &y).unwrap();

        ModelArtifact {
            regressor,
            metrics: TrainingMetrics {
                directional_accuracy: 0.61,
                mae: 120.5,
                mape: 1.8,
                rmse: 150.0,
                training_data_points: 1000,
            },
            hyperparameters: Hyperparameters {
                sequence_length: 60,
                epochs: 37,
                batch_size: 32,
                learning_rate: 0.001,
            },
            validation: ValidationSnapshot {
                val_loss: 0.002,
                val_mae: 0.03,
            },
            trained_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_artifacts_detected() {
        let store = test_store("missing");
        assert!(!store.has_artifacts("BTC"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let store = test_store("roundtrip");
        let artifact = sample_artifact();
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let scaler = MinMaxScaler::fit(data.view()).unwrap();

        store.save("BTC", &artifact, &scaler).unwrap();
        assert!(store.has_artifacts("BTC"));

        let (loaded, loaded_scaler): (ModelArtifact<MockRegressor>, _) =
            store.load("BTC").unwrap();
        assert!(loaded.regressor.is_fitted());
        assert_eq!(loaded.metrics.training_data_points, 1000);
        assert_eq!(loaded.hyperparameters.sequence_length, 60);
        assert_eq!(loaded_scaler.n_features(), 2);
    }

    #[test]
    fn test_partial_artifacts_not_trained() {
        let store = test_store("partial");
        let artifact = sample_artifact();
        let data = array![[1.0], [2.0]];
        let scaler = MinMaxScaler::fit(data.view()).unwrap();

        store.save("ETH", &artifact, &scaler).unwrap();
        std::fs::remove_file(store.scaler_path("ETH")).unwrap();

        // 스케일러가 없으면 학습 완료로 보지 않음
        assert!(!store.has_artifacts("ETH"));
    }

    #[test]
    fn test_load_missing_fails() {
        let store = test_store("load-missing");
        let result: ModelResult<(ModelArtifact<MockRegressor>, MinMaxScaler)> = store.load("SOL");
        assert!(matches!(result, Err(ModelError::Artifact(_))));
    }
}
