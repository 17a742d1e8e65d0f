//! 기술 지표 계산.
//!
//! 가격 시계열에 대해 고정된 순서로 지표를 계산합니다:
//! SMA(20) → EMA(12) → EMA(26) → RSI(14) → 롤링 표준편차(24).
//!
//! 롤링 창이 채워지지 않은 선행 구간의 행은 제거되며, 유지되는 행의
//! 모든 지표 값은 유한합니다. 시간봉 기준 제거 행 수는 가장 긴 창인
//! 변동성(24)이 결정합니다.
//!
//! # RSI 0 나눗셈 정책
//!
//! 창 내 평균 하락폭이 0이면 공식이 정의되지 않습니다. 이 구현은
//! 극한값인 100으로 고정합니다 (상승만 있는 창 = 최대 과매수).

use serde::{Deserialize, Serialize};
use tracing::debug;

use forecast_core::{IndicatorRow, PricePoint};

/// 지표 계산 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// SMA 기간 (기본: 20)
    pub sma_period: usize,
    /// 단기 EMA span (기본: 12)
    pub ema_fast_span: usize,
    /// 장기 EMA span (기본: 26)
    pub ema_slow_span: usize,
    /// RSI 기간 (기본: 14)
    pub rsi_period: usize,
    /// 변동성(표준편차) 창 (기본: 24)
    pub volatility_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_period: 20,
            ema_fast_span: 12,
            ema_slow_span: 26,
            rsi_period: 14,
            volatility_window: 24,
        }
    }
}

impl IndicatorConfig {
    /// 모든 지표가 정의되기까지 필요한 선행 행 수.
    pub fn warmup_rows(&self) -> usize {
        let sma = self.sma_period - 1;
        let rsi = self.rsi_period;
        let vol = self.volatility_window - 1;
        sma.max(rsi).max(vol)
    }
}

/// 단순 이동평균 (SMA).
///
/// 처음 `period - 1`개 시점은 `None`입니다.
pub fn sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; prices.len()];
    if period == 0 || prices.len() < period {
        return result;
    }

    let mut window_sum: f64 = prices[..period].iter().sum();
    result[period - 1] = Some(window_sum / period as f64);

    for i in period..prices.len() {
        window_sum += prices[i] - prices[i - period];
        result[i] = Some(window_sum / period as f64);
    }

    result
}

/// 지수 이동평균 (EMA).
///
/// 첫 값으로 시드하는 재귀식 `ema = α·p + (1-α)·ema_prev`,
/// `α = 2 / (span + 1)`. 모든 시점에서 정의됩니다.
pub fn ema(prices: &[f64], span: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(prices.len());
    let mut current = prices[0];
    result.push(current);

    for &price in &prices[1..] {
        current = alpha * price + (1.0 - alpha) * current;
        result.push(current);
    }

    result
}

/// RSI (Relative Strength Index).
///
/// RSI = 100 − 100 / (1 + RS), RS = 평균 상승폭 / 평균 하락폭.
/// 상승/하락폭은 인접 가격 차분에서 계산하며, 평균은 `period`개 차분의
/// 단순 롤링 평균입니다. 처음 `period`개 시점은 `None`입니다.
/// 평균 하락폭이 0이면 100으로 고정합니다 (모듈 문서 참조).
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return result;
    }

    // 차분에서 상승/하락폭 분리 (인덱스 i의 차분 = p[i] - p[i-1])
    let mut gains = vec![0.0; prices.len()];
    let mut losses = vec![0.0; prices.len()];
    for i in 1..prices.len() {
        let delta = prices[i] - prices[i - 1];
        if delta > 0.0 {
            gains[i] = delta;
        } else {
            losses[i] = -delta;
        }
    }

    // i번째 행의 창은 차분 인덱스 i-period+1 ..= i, 최초 유효 행은 i = period
    for i in period..prices.len() {
        let start = i + 1 - period;
        let avg_gain: f64 = gains[start..=i].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[start..=i].iter().sum::<f64>() / period as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
        result[i] = Some(value);
    }

    result
}

/// 롤링 표준편차.
///
/// 표본 추정량(분모 n−1)을 사용합니다. 처음 `window - 1`개 시점은
/// `None`입니다.
pub fn rolling_std(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; prices.len()];
    if window < 2 || prices.len() < window {
        return result;
    }

    for i in (window - 1)..prices.len() {
        let slice = &prices[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
        result[i] = Some(var.sqrt());
    }

    result
}

/// 가격 시계열에 지표를 계산하고 선행 미정의 구간을 제거합니다.
///
/// 반환되는 행 수는 `points.len() - warmup_rows()`이며 (부족하면 빈 벡터),
/// 모든 행의 지표 값은 유한합니다.
pub fn annotate(points: &[PricePoint], config: &IndicatorConfig) -> Vec<IndicatorRow> {
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();

    let sma_series = sma(&prices, config.sma_period);
    let ema_fast = ema(&prices, config.ema_fast_span);
    let ema_slow = ema(&prices, config.ema_slow_span);
    let rsi_series = rsi(&prices, config.rsi_period);
    let vol_series = rolling_std(&prices, config.volatility_window);

    let mut rows = Vec::new();
    for (i, point) in points.iter().enumerate() {
        let (Some(sma_20), Some(rsi_v), Some(volatility)) =
            (sma_series[i], rsi_series[i], vol_series[i])
        else {
            continue;
        };

        rows.push(IndicatorRow {
            timestamp: point.timestamp,
            price: point.price,
            sma_20,
            ema_12: ema_fast[i],
            ema_26: ema_slow[i],
            rsi: rsi_v,
            volatility,
        });
    }

    debug!(
        total = points.len(),
        dropped = points.len() - rows.len(),
        retained = rows.len(),
        "Indicator warmup rows dropped"
    );

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_points(prices: &[f64]) -> Vec<PricePoint> {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(start + Duration::hours(i as i64), p))
            .collect()
    }

    #[test]
    fn test_sma_window() {
        let prices = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&prices, 3);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(2.0));
        assert_eq!(result[3], Some(3.0));
        assert_eq!(result[4], Some(4.0));
    }

    #[test]
    fn test_ema_defined_everywhere() {
        let prices = vec![10.0, 11.0, 12.0];
        let result = ema(&prices, 3);
        assert_eq!(result.len(), 3);
        assert_eq!(result[0], 10.0);
        // alpha = 0.5: 0.5*11 + 0.5*10 = 10.5
        assert!((result[1] - 10.5).abs() < 1e-12);
        assert!((result[2] - 11.25).abs() < 1e-12);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&prices, 14);
        assert_eq!(result[13], None);
        assert_eq!(result[14], Some(100.0));
        assert_eq!(result[29], Some(100.0));
    }

    #[test]
    fn test_rsi_balanced_is_50() {
        // 상승 1, 하락 1이 교대로 나타나면 avg_gain == avg_loss
        let prices: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let result = rsi(&prices, 14);
        let value = result[20].unwrap();
        assert!((value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_bounds() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        for value in rsi(&prices, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rolling_std_constant_is_zero() {
        let prices = vec![5.0; 30];
        let result = rolling_std(&prices, 24);
        assert_eq!(result[22], None);
        assert_eq!(result[23], Some(0.0));
    }

    #[test]
    fn test_rolling_std_sample_estimator() {
        let prices = vec![1.0, 2.0, 3.0, 4.0];
        let result = rolling_std(&prices, 4);
        // 표본 분산 = ((−1.5)² + (−0.5)² + 0.5² + 1.5²) / 3 = 5/3
        let expected = (5.0_f64 / 3.0).sqrt();
        assert!((result[3].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_annotate_drop_count_matches_largest_window() {
        let config = IndicatorConfig::default();
        let prices: Vec<f64> = (0..100).map(|i| 100.0 + (i as f64 * 0.3).cos()).collect();
        let points = make_points(&prices);

        let rows = annotate(&points, &config);

        // 24포인트 변동성 창이 최장 lookback: 선행 23행 제거
        assert_eq!(config.warmup_rows(), 23);
        assert_eq!(rows.len(), points.len() - 23);
        assert!(rows.iter().all(|r| r.is_finite()));
        assert_eq!(rows[0].timestamp, points[23].timestamp);
    }

    #[test]
    fn test_annotate_short_series_is_empty() {
        let config = IndicatorConfig::default();
        let points = make_points(&[100.0; 10]);
        assert!(annotate(&points, &config).is_empty());
    }
}
