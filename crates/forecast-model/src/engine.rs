//! 라이브 예측 엔진.
//!
//! 최근 가격으로 추론용 윈도우를 구성하고, 학습된 회귀 모델로 다음
//! 가격을 예측한 뒤 휴리스틱 신뢰도를 계산합니다.
//!
//! # 알려진 근사
//!
//! 라이브 경로의 피처는 학습 경로보다 단순하게 재구성됩니다:
//! EMA(12)/EMA(26)는 지수 평활 없이 원시 가격을 그대로 사용하고,
//! RSI는 중립값 50으로 고정됩니다. 학습 시점 지표와의 이 불일치는
//! 알려진 근사이며, 라이브 피처를 바꾸면 기존에 학습된 모델과의
//! 호환이 깨지므로 의도적으로 유지됩니다.
//!
//! # 패딩 편향
//!
//! 과거 가격이 윈도우 길이보다 짧으면 앞쪽을 현재 가격으로 채웁니다.
//! 이는 합성된 평탄한 이력을 주입하므로 초기 예측이 현재 가격 쪽으로
//! 치우칩니다.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use forecast_core::{Horizon, TrendDirection, FEATURE_COUNT};

use crate::error::ModelResult;
use crate::regressor::SequenceRegressor;
use crate::scaler::MinMaxScaler;

/// 기본 신뢰도.
const BASE_CONFIDENCE: f64 = 0.85;

/// 신뢰도 하한/상한 (지평 감쇠 적용 전).
const CONFIDENCE_FLOOR: f64 = 0.60;
const CONFIDENCE_CEIL: f64 = 0.95;

/// 변동성 비율 계산에 쓰는 후행 구간 길이.
const VOLATILITY_SPAN: usize = 24;

/// 후행 구간이 부족할 때의 기본 변동성 비율.
const DEFAULT_VOLATILITY_RATIO: f64 = 0.05;

/// 응답에 포함되는 피처 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// 요청 시점의 현재 가격
    pub current_price: f64,
    /// 후행 변동성 비율 (σ / 현재가)
    pub volatility: f64,
    /// 윈도우 마지막 20개 가격의 평균
    pub sma_20: f64,
    /// 추세 레이블
    pub trend: TrendDirection,
}

/// 예측 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutput {
    /// 예측 가격
    pub predicted_price: f64,
    /// 신뢰도 [0, 1]
    pub confidence: f64,
    /// 추세 레이블
    pub trend: TrendDirection,
    /// 피처 스냅샷
    pub features: FeatureSnapshot,
}

/// 모집단 표준편차.
fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// 추론 윈도우용 가격 수열 구성.
///
/// 과거 가격의 후행 `window_len`개를 사용하고, 부족하면 앞쪽을 현재
/// 가격으로 채웁니다 (모듈 문서의 패딩 편향 참조).
pub fn build_price_window(current_price: f64, historical: &[f64], window_len: usize) -> Vec<f64> {
    let tail_start = historical.len().saturating_sub(window_len);
    let tail = &historical[tail_start..];

    let mut window = Vec::with_capacity(window_len);
    window.resize(window_len - tail.len(), current_price);
    window.extend_from_slice(tail);
    window
}

/// 가격 수열에서 단순화된 라이브 피처 행렬을 만듭니다.
///
/// 열 순서는 학습 피처와 동일하지만 EMA/RSI는 근사값입니다
/// (모듈 문서 참조).
pub fn live_feature_matrix(prices: &[f64]) -> Array2<f64> {
    let mut matrix = Array2::zeros((prices.len(), FEATURE_COUNT));

    for (i, &price) in prices.iter().enumerate() {
        let sma_start = i.saturating_sub(19);
        let sma_20 = prices[sma_start..=i].iter().sum::<f64>() / (i - sma_start + 1) as f64;

        let vol = if i > 0 {
            let vol_start = i.saturating_sub(VOLATILITY_SPAN - 1);
            population_std(&prices[vol_start..=i])
        } else {
            0.0
        };

        matrix[[i, 0]] = price;
        matrix[[i, 1]] = sma_20;
        matrix[[i, 2]] = price; // EMA(12) 근사
        matrix[[i, 3]] = price; // EMA(26) 근사
        matrix[[i, 4]] = 50.0; // 중립 RSI
        matrix[[i, 5]] = vol;
    }

    matrix
}

/// 후행 변동성 비율 (σ / 현재가).
///
/// 후행 구간이 `VOLATILITY_SPAN`보다 짧으면 기본값을 사용합니다.
pub fn volatility_ratio(prices: &[f64], current_price: f64) -> f64 {
    if prices.len() < VOLATILITY_SPAN || current_price <= 0.0 {
        return DEFAULT_VOLATILITY_RATIO;
    }
    population_std(&prices[prices.len() - VOLATILITY_SPAN..]) / current_price
}

/// 신뢰도 휴리스틱.
///
/// 기본 신뢰도에서 변동성 비율의 2배를 빼고 [0.60, 0.95]로 클램프한 뒤
/// 지평 감쇠 계수를 곱합니다.
pub fn confidence(vol_ratio: f64, horizon: Horizon) -> f64 {
    let raw = BASE_CONFIDENCE - vol_ratio * 2.0;
    raw.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEIL) * horizon.confidence_factor()
}

/// 학습된 모델로 예측을 수행합니다.
///
/// # 인자
/// * `regressor` - 학습 완료된 회귀 모델
/// * `scaler` - 학습 시점에 fit된 스케일러
/// * `current_price` - 현재 가격
/// * `historical` - 과거 가격 (최신이 마지막)
/// * `horizon` - 예측 지평
/// * `window_len` - 윈도우 길이
pub fn predict<R: SequenceRegressor>(
    regressor: &R,
    scaler: &MinMaxScaler,
    current_price: f64,
    historical: &[f64],
    horizon: Horizon,
    window_len: usize,
) -> ModelResult<PredictionOutput> {
    let prices = build_price_window(current_price, historical, window_len);
    let features = live_feature_matrix(&prices);
    let scaled = scaler.transform(features.view())?;

    let scaled_prediction = regressor.predict(scaled.view())?;
    let predicted_price = scaler.inverse_price(scaled_prediction)?;

    let vol_ratio = volatility_ratio(&prices, current_price);
    let confidence = confidence(vol_ratio, horizon);
    let trend = TrendDirection::from_prices(current_price, predicted_price);

    let sma_start = prices.len().saturating_sub(20);
    let sma_20 = prices[sma_start..].iter().sum::<f64>() / (prices.len() - sma_start) as f64;

    debug!(
        current_price,
        predicted_price,
        confidence,
        %horizon,
        %trend,
        "Prediction generated"
    );

    Ok(PredictionOutput {
        predicted_price,
        confidence,
        trend,
        features: FeatureSnapshot {
            current_price,
            volatility: vol_ratio,
            sma_20,
            trend,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressor::MockRegressor;
    use ndarray::Array2 as NdArray2;

    #[test]
    fn test_padding_short_history() {
        // 과거 10개 + 현재가 100 → 길이 60, 앞 50개는 100
        let historical: Vec<f64> = (0..10).map(|i| 200.0 + i as f64).collect();
        let window = build_price_window(100.0, &historical, 60);

        assert_eq!(window.len(), 60);
        assert!(window[..50].iter().all(|&p| p == 100.0));
        assert_eq!(window[50], 200.0);
        assert_eq!(window[59], 209.0);
    }

    #[test]
    fn test_no_padding_with_long_history() {
        let historical: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let window = build_price_window(999.0, &historical, 60);

        assert_eq!(window.len(), 60);
        assert_eq!(window[0], 40.0);
        assert_eq!(window[59], 99.0);
    }

    #[test]
    fn test_live_feature_matrix_shape_and_approximations() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let matrix = live_feature_matrix(&prices);

        assert_eq!(matrix.shape(), &[60, FEATURE_COUNT]);
        // EMA 열은 원시 가격, RSI는 50 고정
        assert_eq!(matrix[[30, 2]], prices[30]);
        assert_eq!(matrix[[30, 3]], prices[30]);
        assert!(matrix.column(4).iter().all(|&v| v == 50.0));
        // 첫 행의 변동성은 0
        assert_eq!(matrix[[0, 5]], 0.0);
    }

    #[test]
    fn test_confidence_clamp_bounds() {
        // 극단적 변동성에서도 [0.60 × 0.85, 0.95] 범위 유지
        for &ratio in &[0.0, 0.01, 0.1, 0.5, 10.0] {
            for &horizon in &[Horizon::Hour, Horizon::Day, Horizon::Week] {
                let c = confidence(ratio, horizon);
                assert!(c >= CONFIDENCE_FLOOR * Horizon::Week.confidence_factor());
                assert!(c <= CONFIDENCE_CEIL);
            }
        }
    }

    #[test]
    fn test_confidence_horizon_derating() {
        let hour = confidence(0.0, Horizon::Hour);
        let day = confidence(0.0, Horizon::Day);
        let week = confidence(0.0, Horizon::Week);

        assert_eq!(hour, 0.95);
        assert!(day < hour);
        assert!(week < day);
    }

    #[test]
    fn test_volatility_ratio_default_for_short_window() {
        assert_eq!(volatility_ratio(&[100.0; 10], 100.0), 0.05);
    }

    #[test]
    fn test_predict_with_mock_regressor() {
        // mock은 마지막 스케일된 가격을 그대로 반환 → 역변환하면 현재가 근처
        let fit_data = NdArray2::from_shape_fn((100, FEATURE_COUNT), |(i, j)| match j {
            0 => 100.0 + i as f64,
            4 => 50.0,
            _ => 100.0 + i as f64,
        });
        let scaler = MinMaxScaler::fit(fit_data.view()).unwrap();

        let mut regressor = MockRegressor::new();
        let x = ndarray::Array3::zeros((2, 3, FEATURE_COUNT));
        let y = ndarray::Array1::zeros(2);
        regressor.fit(&x, &y).unwrap();

        let historical: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let output = predict(
            &regressor,
            &scaler,
            179.0,
            &historical,
            Horizon::Hour,
            60,
        )
        .unwrap();

        // 윈도우 마지막 가격 179가 역변환으로 복원됨
        assert!((output.predicted_price - 179.0).abs() < 1e-6);
        assert_eq!(output.trend, TrendDirection::Bearish);
        assert!(output.confidence > 0.0 && output.confidence <= 0.95);
        assert_eq!(output.features.current_price, 179.0);
    }
}
