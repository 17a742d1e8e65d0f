//! 시장 데이터 제공자 trait.
//!
//! 과거 가격 시계열을 조회하고 기술 지표를 계산해 반환하는
//! 통합 인터페이스입니다. 구현체는 `forecast-market` 크레이트에 있으며,
//! 테스트에서는 합성 데이터를 반환하는 mock 구현을 사용합니다.

use async_trait::async_trait;

use crate::domain::IndicatorRow;
use crate::error::ForecastResult;

/// 지표가 계산된 과거 시세 제공자 trait.
#[async_trait]
pub trait MarketHistory: Send + Sync {
    /// 심볼의 시간봉 과거 데이터를 조회하고 지표를 계산해 반환합니다.
    ///
    /// 반환되는 행은 시간순으로 정렬되며, 지표가 정의되지 않는
    /// 선행 구간은 제거된 상태입니다.
    ///
    /// # 인자
    /// * `symbol` - 심볼 (예: "BTC", "ETH")
    /// * `lookback_days` - 조회 기간 (일)
    ///
    /// # 에러
    /// 제공자 호출 실패 또는 응답 파싱 실패 시
    /// `ForecastError::DataUnavailable`을 반환합니다.
    async fn fetch_history(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> ForecastResult<Vec<IndicatorRow>>;
}
