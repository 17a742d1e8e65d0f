//! 시계열 및 예측 도메인 타입.
//!
//! 가격 시계열, 지표 확장 행, 예측 지평(horizon), 추세 레이블 등
//! 서비스 전반에서 공유되는 구조체를 정의합니다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 모델 입력 피처 개수.
///
/// 열 순서: price, sma_20, ema_12, ema_26, rsi, volatility.
pub const FEATURE_COUNT: usize = 6;

/// 시점별 가격 샘플.
///
/// 제공자로부터 수신한 원시 시계열의 한 지점입니다.
/// 시퀀스 내에서 타임스탬프는 엄격히 증가해야 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// 샘플 시각 (UTC)
    pub timestamp: DateTime<Utc>,
    /// 가격 (USD)
    pub price: f64,
}

impl PricePoint {
    /// 새 가격 샘플 생성.
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// 기술 지표가 계산된 시계열 행.
///
/// 선행 구간에서 지표가 정의되지 않는 행은 생성 단계에서 제거되므로,
/// 유지된 행의 모든 필드는 유한(finite)해야 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// 샘플 시각 (UTC)
    pub timestamp: DateTime<Utc>,
    /// 가격
    pub price: f64,
    /// 20기간 단순 이동평균
    pub sma_20: f64,
    /// 12기간 지수 이동평균
    pub ema_12: f64,
    /// 26기간 지수 이동평균
    pub ema_26: f64,
    /// 14기간 RSI
    pub rsi: f64,
    /// 24기간 롤링 표준편차
    pub volatility: f64,
}

impl IndicatorRow {
    /// 모델 입력 순서대로 피처 벡터를 반환합니다.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.price,
            self.sma_20,
            self.ema_12,
            self.ema_26,
            self.rsi,
            self.volatility,
        ]
    }

    /// 모든 피처가 유한한지 확인합니다.
    pub fn is_finite(&self) -> bool {
        self.features().iter().all(|v| v.is_finite())
    }
}

/// 예측 지평.
///
/// 예측이 목표로 하는 미래 시점까지의 거리입니다.
/// 지평이 길수록 신뢰도 감쇠 계수가 커집니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    /// 1시간 후
    #[serde(rename = "1H")]
    Hour,
    /// 24시간 후
    #[serde(rename = "24H")]
    Day,
    /// 7일 후
    #[serde(rename = "7D")]
    Week,
}

impl Default for Horizon {
    fn default() -> Self {
        Self::Hour
    }
}

impl Horizon {
    /// 예측 목표 시점까지의 시간 간격.
    pub fn duration(&self) -> Duration {
        match self {
            Horizon::Hour => Duration::hours(1),
            Horizon::Day => Duration::hours(24),
            Horizon::Week => Duration::days(7),
        }
    }

    /// 지평별 신뢰도 감쇠 계수.
    ///
    /// 짧은 지평은 감쇠 없음, 긴 지평일수록 신뢰도를 낮춥니다.
    pub fn confidence_factor(&self) -> f64 {
        match self {
            Horizon::Hour => 1.0,
            Horizon::Day => 0.95,
            Horizon::Week => 0.85,
        }
    }

    /// 태그 문자열 반환.
    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Hour => "1H",
            Horizon::Day => "24H",
            Horizon::Week => "7D",
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 예측 추세 레이블.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// 예측가 > 현재가
    Bullish,
    /// 예측가 <= 현재가
    Bearish,
}

impl TrendDirection {
    /// 현재가와 예측가로부터 추세를 판정합니다.
    pub fn from_prices(current: f64, predicted: f64) -> Self {
        if predicted > current {
            TrendDirection::Bullish
        } else {
            TrendDirection::Bearish
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Bullish => f.write_str("bullish"),
            TrendDirection::Bearish => f.write_str("bearish"),
        }
    }
}
