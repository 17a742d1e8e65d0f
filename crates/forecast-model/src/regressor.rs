//! 시퀀스 회귀 인터페이스와 LSTM 구현.
//!
//! `SequenceRegressor`는 파이프라인이 모델 구현에 접근하는 유일한
//! 통로입니다: 윈도우 데이터셋으로 fit하고, 단일 윈도우로 스칼라를
//! 예측합니다. 구체 네트워크(`network` 모듈)는 이 좁은 인터페이스 뒤에
//! 격리되어 교체 가능합니다.

use ndarray::{s, Array1, Array3, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ModelError, ModelResult};
use crate::network::{AdamOptimizer, LstmNetwork};

/// LSTM 학습 하이퍼파라미터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmConfig {
    /// 층별 은닉 크기
    pub hidden_sizes: Vec<usize>,
    /// dense 헤드 은닉 크기
    pub dense_size: usize,
    /// 층 간 dropout 비율
    pub dropout: f64,
    /// Adam 초기 학습률
    pub learning_rate: f64,
    /// 최대 epoch 수
    pub epochs: usize,
    /// 미니배치 크기
    pub batch_size: usize,
    /// 검증 분할 비율 (학습 파티션의 시간순 마지막 구간)
    pub validation_ratio: f64,
    /// 검증 손실 개선 없이 허용되는 epoch 수 (early stopping)
    pub early_stopping_patience: usize,
    /// 학습률 감쇠 전 대기 epoch 수
    pub plateau_patience: usize,
    /// 학습률 감쇠 계수
    pub plateau_factor: f64,
    /// 가중치 초기화/드롭아웃 시드
    pub seed: u64,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![100, 100, 50],
            dense_size: 25,
            dropout: 0.2,
            learning_rate: 0.001,
            epochs: 100,
            batch_size: 32,
            validation_ratio: 0.2,
            early_stopping_patience: 10,
            plateau_patience: 5,
            plateau_factor: 0.5,
            seed: 42,
        }
    }
}

/// 학습률 하한.
const MIN_LEARNING_RATE: f64 = 1e-6;

/// fit 결과 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    /// 실제 수행된 epoch 수
    pub epochs_run: usize,
    /// 최저 검증 손실 (MSE, 스케일 단위)
    pub best_val_loss: f64,
    /// 최저 검증 손실 시점의 검증 MAE
    pub best_val_mae: f64,
    /// 마지막 epoch의 학습 손실
    pub final_train_loss: f64,
}

/// 시퀀스-투-원 회귀 모델의 좁은 인터페이스.
pub trait SequenceRegressor: Send {
    /// 윈도우 데이터셋으로 모델을 학습합니다.
    fn fit(&mut self, x: &Array3<f64>, y: &Array1<f64>) -> ModelResult<FitReport>;

    /// 단일 윈도우 [timesteps, features]에 대한 스케일된 예측값.
    fn predict(&self, window: ArrayView2<'_, f64>) -> ModelResult<f64>;

    /// fit 완료 여부.
    fn is_fitted(&self) -> bool;
}

/// LSTM 기반 `SequenceRegressor` 구현.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmRegressor {
    config: LstmConfig,
    network: Option<LstmNetwork>,
}

impl LstmRegressor {
    /// 미학습 상태의 회귀 모델 생성.
    pub fn new(config: LstmConfig) -> Self {
        Self {
            config,
            network: None,
        }
    }

    /// 하이퍼파라미터 참조.
    pub fn config(&self) -> &LstmConfig {
        &self.config
    }
}

impl SequenceRegressor for LstmRegressor {
    fn fit(&mut self, x: &Array3<f64>, y: &Array1<f64>) -> ModelResult<FitReport> {
        let n = x.shape()[0];
        if n == 0 {
            return Err(ModelError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let input_size = x.shape()[2];
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut network = LstmNetwork::new(
            input_size,
            &self.config.hidden_sizes,
            self.config.dense_size,
            self.config.dropout,
            &mut rng,
        );
        let mut optimizer = AdamOptimizer::new(&network, self.config.learning_rate);

        // 검증 분할: 학습 파티션의 시간순 마지막 구간
        let n_val = ((n as f64) * self.config.validation_ratio) as usize;
        let n_fit = n - n_val;
        if n_fit == 0 {
            return Err(ModelError::InsufficientData {
                required: 2,
                actual: n,
            });
        }

        let x_val = x.slice(s![n_fit.., .., ..]).to_owned();
        let y_val = y.slice(s![n_fit..]).to_owned();

        let mut best_val_loss = f64::INFINITY;
        let mut best_val_mae = 0.0;
        let mut best_network = network.clone();
        let mut stale_epochs = 0usize;
        let mut plateau_epochs = 0usize;
        let mut epochs_run = 0usize;
        let mut final_train_loss = 0.0;

        for epoch in 1..=self.config.epochs {
            epochs_run = epoch;

            let mut epoch_loss = 0.0;
            let mut n_batches = 0usize;
            let batch_size = self.config.batch_size.max(1);

            for start in (0..n_fit).step_by(batch_size) {
                let end = (start + batch_size).min(n_fit);
                let x_batch = x.slice(s![start..end, .., ..]).to_owned();
                let y_batch = y.slice(s![start..end]).to_owned();

                epoch_loss += network.train_batch(&x_batch, &y_batch, &mut optimizer, &mut rng);
                n_batches += 1;
            }
            let train_loss = epoch_loss / n_batches as f64;
            final_train_loss = train_loss;

            // 검증 샘플이 없으면 학습 손실을 모니터링
            let (val_loss, val_mae) = if n_val > 0 {
                network.evaluate(&x_val, &y_val)
            } else {
                (train_loss, train_loss.sqrt())
            };

            debug!(
                epoch,
                train_loss,
                val_loss,
                lr = optimizer.learning_rate(),
                "Training epoch finished"
            );

            if val_loss < best_val_loss {
                best_val_loss = val_loss;
                best_val_mae = val_mae;
                best_network = network.clone();
                stale_epochs = 0;
                plateau_epochs = 0;
            } else {
                stale_epochs += 1;
                plateau_epochs += 1;
            }

            if stale_epochs >= self.config.early_stopping_patience {
                info!(epoch, best_val_loss, "Early stopping triggered");
                break;
            }

            if plateau_epochs >= self.config.plateau_patience {
                let new_lr =
                    (optimizer.learning_rate() * self.config.plateau_factor).max(MIN_LEARNING_RATE);
                debug!(old_lr = optimizer.learning_rate(), new_lr, "Plateau LR decay");
                optimizer.set_learning_rate(new_lr);
                plateau_epochs = 0;
            }
        }

        // 최저 검증 손실 시점의 가중치 복원
        self.network = Some(best_network);

        info!(
            epochs_run,
            best_val_loss, final_train_loss, "LSTM training complete"
        );

        Ok(FitReport {
            epochs_run,
            best_val_loss,
            best_val_mae,
            final_train_loss,
        })
    }

    fn predict(&self, window: ArrayView2<'_, f64>) -> ModelResult<f64> {
        let network = self
            .network
            .as_ref()
            .ok_or_else(|| ModelError::NotFitted("LSTM regressor".to_string()))?;

        if window.ncols() != network.input_size() {
            return Err(ModelError::ShapeMismatch {
                expected: network.input_size(),
                actual: window.ncols(),
            });
        }

        Ok(network.predict(window))
    }

    fn is_fitted(&self) -> bool {
        self.network.is_some()
    }
}

/// 테스트용 회귀 모델.
///
/// fit 호출 횟수를 기록하고, 예측은 윈도우 마지막 스텝의 가격 열을
/// 그대로 돌려줍니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockRegressor {
    fitted: bool,
    /// fit이 호출된 횟수
    pub fit_calls: u32,
}

impl MockRegressor {
    /// 새 mock 회귀 모델 생성.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceRegressor for MockRegressor {
    fn fit(&mut self, x: &Array3<f64>, _y: &Array1<f64>) -> ModelResult<FitReport> {
        if x.shape()[0] == 0 {
            return Err(ModelError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        self.fitted = true;
        self.fit_calls += 1;
        Ok(FitReport {
            epochs_run: 1,
            best_val_loss: 0.0,
            best_val_mae: 0.0,
            final_train_loss: 0.0,
        })
    }

    fn predict(&self, window: ArrayView2<'_, f64>) -> ModelResult<f64> {
        if !self.fitted {
            return Err(ModelError::NotFitted("mock regressor".to_string()));
        }
        Ok(window[[window.nrows() - 1, 0]])
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array3};

    /// 테스트용 소형 설정.
    fn tiny_config() -> LstmConfig {
        LstmConfig {
            hidden_sizes: vec![12, 8],
            dense_size: 8,
            dropout: 0.0,
            learning_rate: 0.01,
            epochs: 40,
            batch_size: 8,
            validation_ratio: 0.2,
            early_stopping_patience: 10,
            plateau_patience: 5,
            plateau_factor: 0.5,
            seed: 42,
        }
    }

    /// 레이블 = 마지막 스텝 가격인 선형 데이터셋.
    fn linear_dataset(n: usize, seq: usize) -> (Array3<f64>, Array1<f64>) {
        let x = Array3::from_shape_fn((n, seq, 2), |(s_idx, t, f)| {
            if f == 0 {
                (s_idx + t) as f64 / (n + seq) as f64
            } else {
                0.5
            }
        });
        let y = Array1::from_shape_fn(n, |s_idx| (s_idx + seq) as f64 / (n + seq) as f64);
        (x, y)
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let regressor = LstmRegressor::new(tiny_config());
        let window = ndarray::Array2::zeros((10, 2));
        let err = regressor.predict(window.view()).unwrap_err();
        assert!(matches!(err, ModelError::NotFitted(_)));
        assert!(!regressor.is_fitted());
    }

    #[test]
    fn test_fit_then_predict_tracks_trend() {
        let mut regressor = LstmRegressor::new(tiny_config());
        let (x, y) = linear_dataset(40, 10);

        let report = regressor.fit(&x, &y).unwrap();
        assert!(regressor.is_fitted());
        assert!(report.epochs_run >= 1);
        assert!(report.best_val_loss.is_finite());

        // 학습 데이터 범위 안의 윈도우에서 유한한 예측
        let window = x.slice(ndarray::s![20, .., ..]);
        let pred = regressor.predict(window).unwrap();
        assert!(pred.is_finite());
        // 레이블 근처의 값이어야 함 (느슨한 허용 오차)
        assert!((pred - y[20]).abs() < 0.25);
    }

    #[test]
    fn test_fit_empty_dataset_fails() {
        let mut regressor = LstmRegressor::new(tiny_config());
        let x = Array3::zeros((0, 10, 2));
        let y = Array1::zeros(0);
        assert!(matches!(
            regressor.fit(&x, &y),
            Err(ModelError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_predict_shape_mismatch() {
        let mut regressor = LstmRegressor::new(tiny_config());
        let (x, y) = linear_dataset(20, 10);
        regressor.fit(&x, &y).unwrap();

        let window = ndarray::Array2::zeros((10, 5));
        let err = regressor.predict(window.view()).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { expected: 2, actual: 5 }));
    }

    #[test]
    fn test_mock_regressor_single_flight_counter() {
        let mut mock = MockRegressor::new();
        let (x, y) = linear_dataset(10, 5);

        assert!(!mock.is_fitted());
        mock.fit(&x, &y).unwrap();
        mock.fit(&x, &y).unwrap();
        assert_eq!(mock.fit_calls, 2);

        let window = x.slice(ndarray::s![0, .., ..]);
        let pred = mock.predict(window).unwrap();
        assert_eq!(pred, x[[0, 4, 0]]);
    }
}
