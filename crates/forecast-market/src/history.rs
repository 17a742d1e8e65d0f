//! 지표가 계산된 과거 데이터 제공자.
//!
//! 시세 클라이언트와 지표 계산을 묶어 `MarketHistory` trait을 구현합니다.
//! 파이프라인은 이 trait을 통해서만 시장 데이터에 접근합니다.

use async_trait::async_trait;
use tracing::{info, warn};

use forecast_core::{ForecastError, ForecastResult, IndicatorRow, MarketHistory};

use crate::client::CoinGeckoClient;
use crate::indicators::{annotate, IndicatorConfig};

/// 지표가 계산된 과거 시세 제공자.
pub struct HistoryFetcher {
    client: CoinGeckoClient,
    config: IndicatorConfig,
}

impl HistoryFetcher {
    /// 새 제공자 생성.
    pub fn new(client: CoinGeckoClient) -> Self {
        Self {
            client,
            config: IndicatorConfig::default(),
        }
    }

    /// 지표 파라미터 지정.
    pub fn with_indicator_config(mut self, config: IndicatorConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl MarketHistory for HistoryFetcher {
    async fn fetch_history(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> ForecastResult<Vec<IndicatorRow>> {
        let points = self.client.fetch_prices(symbol, lookback_days).await?;

        let rows = annotate(&points, &self.config);
        if rows.is_empty() {
            warn!(
                symbol = %symbol,
                samples = points.len(),
                warmup = self.config.warmup_rows(),
                "Not enough samples to compute indicators"
            );
            return Err(ForecastError::DataUnavailable(format!(
                "{}: {} samples insufficient for indicator warmup ({})",
                symbol,
                points.len(),
                self.config.warmup_rows()
            )));
        }

        info!(
            symbol = %symbol,
            samples = points.len(),
            rows = rows.len(),
            "History annotated with indicators"
        );

        Ok(rows)
    }
}
