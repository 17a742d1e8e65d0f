//! 평가 지표 계산.
//!
//! 테스트 파티션에 대한 회귀 오차 지표와 방향 정확도를 계산합니다.
//! 모든 지표는 가격 단위(역스케일)로 계산된 값을 입력으로 받습니다.

use serde::{Deserialize, Serialize};

/// 평균 절대 오차 (MAE).
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// 제곱근 평균 제곱 오차 (RMSE).
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    mse.sqrt()
}

/// 평균 절대 백분율 오차 (MAPE, 비율 단위).
///
/// 실제값이 0인 지점은 건너뜁니다.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (a, p) in actual.iter().zip(predicted) {
        if *a != 0.0 {
            sum += ((a - p) / a).abs();
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// 방향 정확도.
///
/// 연속 스텝 간 가격 변화 부호가 실제와 예측에서 일치하는 비율입니다.
/// 테스트 지점이 2개 미만이면 판정할 변화가 없으므로 0.5를 반환합니다.
pub fn directional_accuracy(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() < 2 || predicted.len() < 2 {
        return 0.5;
    }

    let steps = actual.len().min(predicted.len()) - 1;
    let mut matches = 0usize;
    for i in 0..steps {
        let actual_up = actual[i + 1] > actual[i];
        let predicted_up = predicted[i + 1] > predicted[i];
        if actual_up == predicted_up {
            matches += 1;
        }
    }
    matches as f64 / steps as f64
}

/// 학습 결과 지표 스냅샷.
///
/// 아티팩트에 함께 저장되며 메타데이터 저장소로 미러링됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// 방향 정확도 [0, 1]
    pub directional_accuracy: f64,
    /// 평균 절대 오차 (가격 단위)
    pub mae: f64,
    /// 평균 절대 백분율 오차 (퍼센트)
    pub mape: f64,
    /// 제곱근 평균 제곱 오차 (가격 단위)
    pub rmse: f64,
    /// 학습 샘플 수
    pub training_data_points: usize,
}

/// 학습 하이퍼파라미터 (메타데이터 저장소의 jsonb 컬럼에 기록).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub sequence_length: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

/// 검증 지표 스냅샷 (학습 중 최저값).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSnapshot {
    pub val_loss: f64,
    pub val_mae: f64,
}

/// 테스트 파티션 평가.
///
/// 가격 단위의 실제/예측 시퀀스로부터 지표 스냅샷을 계산합니다.
pub fn evaluate(
    actual: &[f64],
    predicted: &[f64],
    training_data_points: usize,
) -> TrainingMetrics {
    TrainingMetrics {
        directional_accuracy: directional_accuracy(actual, predicted),
        mae: mean_absolute_error(actual, predicted),
        mape: mean_absolute_percentage_error(actual, predicted) * 100.0,
        rmse: root_mean_squared_error(actual, predicted),
        training_data_points,
    }
}
