//! CoinGecko 호환 시세 제공자 클라이언트.
//!
//! `/coins/{id}/market_chart` 엔드포인트에서 시간봉 가격 시계열을
//! 조회합니다. 일시적 장애(네트워크, 타임아웃, rate limit)에 대해서는
//! 제한된 횟수의 백오프 재시도를 수행하고, 그 외의 실패는 즉시
//! 호출자에게 전파합니다.
//!
//! # 심볼 형식
//!
//! 주요 코인 티커는 제공자 coin id로 매핑되며(예: "BTC" → "bitcoin"),
//! 매핑에 없는 심볼은 소문자로 변환해 그대로 전달합니다 (best-effort).

use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use forecast_core::PricePoint;

use crate::error::{MarketError, MarketResult};

/// 재시도 최대 횟수 (최초 시도 포함).
const MAX_ATTEMPTS: u32 = 3;

/// 백오프 기본 대기 시간 (밀리초).
const BASE_BACKOFF_MS: u64 = 500;

/// `market_chart` 응답 payload.
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// (timestamp-ms, price) 쌍의 목록
    prices: Vec<(f64, f64)>,
}

/// CoinGecko 호환 시세 클라이언트.
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoinGeckoClient {
    /// 새 클라이언트 생성.
    ///
    /// # 인자
    /// * `base_url` - 제공자 base URL (끝의 '/'는 제거됨)
    /// * `timeout` - 요청 타임아웃
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> MarketResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::Network(format!("HTTP client build failed: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { http, base_url })
    }

    /// 티커 심볼을 제공자 coin id로 변환.
    ///
    /// 알려지지 않은 심볼은 소문자로 변환해 그대로 반환합니다.
    pub fn coin_id(symbol: &str) -> String {
        match symbol.to_uppercase().as_str() {
            "BTC" => "bitcoin".to_string(),
            "ETH" => "ethereum".to_string(),
            "ADA" => "cardano".to_string(),
            "DOT" => "polkadot".to_string(),
            "LINK" => "chainlink".to_string(),
            "SOL" => "solana".to_string(),
            "BNB" => "binancecoin".to_string(),
            "XRP" => "ripple".to_string(),
            _ => symbol.to_lowercase(),
        }
    }

    /// 심볼의 시간봉 가격 시계열 조회.
    ///
    /// 일시적 에러에 대해 최대 2회 재시도하며, 반환되는 시계열은
    /// 시간 오름차순으로 정렬됩니다.
    ///
    /// # 인자
    /// * `symbol` - 티커 심볼 (예: "BTC")
    /// * `lookback_days` - 조회 기간 (일)
    pub async fn fetch_prices(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> MarketResult<Vec<PricePoint>> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.fetch_prices_once(symbol, lookback_days).await {
                Ok(points) => return Ok(points),
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let delay = err
                        .retry_delay_ms()
                        .unwrap_or(BASE_BACKOFF_MS << (attempt - 1));
                    warn!(
                        symbol = %symbol,
                        attempt,
                        delay_ms = delay,
                        error = %err,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// 단일 시도 조회.
    async fn fetch_prices_once(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> MarketResult<Vec<PricePoint>> {
        let coin_id = Self::coin_id(symbol);
        let url = format!("{}/coins/{}/market_chart", self.base_url, coin_id);

        debug!(symbol = %symbol, coin_id = %coin_id, days = lookback_days, "Fetching market chart");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("vs_currency", "usd"),
                ("days", &lookback_days.to_string()),
                ("interval", "hourly"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(MarketError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: MarketChartResponse = response.json().await?;
        let points = Self::to_price_points(symbol, payload)?;

        info!(symbol = %symbol, samples = points.len(), "Market chart fetched");

        Ok(points)
    }

    /// 응답 payload를 검증하고 `PricePoint` 시계열로 변환.
    fn to_price_points(
        symbol: &str,
        payload: MarketChartResponse,
    ) -> MarketResult<Vec<PricePoint>> {
        if payload.prices.is_empty() {
            return Err(MarketError::EmptyData(symbol.to_string()));
        }

        let mut points = Vec::with_capacity(payload.prices.len());
        for (ts_ms, price) in payload.prices {
            if !price.is_finite() {
                return Err(MarketError::Parse(format!(
                    "non-finite price in payload for {}",
                    symbol
                )));
            }
            let timestamp = Utc
                .timestamp_millis_opt(ts_ms as i64)
                .single()
                .ok_or_else(|| {
                    MarketError::Parse(format!("invalid timestamp {} for {}", ts_ms, symbol))
                })?;
            points.push(PricePoint::new(timestamp, price));
        }

        // 시간 오름차순 정렬, 중복 타임스탬프는 첫 값 유지
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_body(n: usize) -> String {
        let prices: Vec<String> = (0..n)
            .map(|i| format!("[{}, {}]", 1_700_000_000_000_u64 + i as u64 * 3_600_000, 100.0 + i as f64))
            .collect();
        format!("{{\"prices\": [{}]}}", prices.join(","))
    }

    #[test]
    fn test_coin_id_known_symbols() {
        assert_eq!(CoinGeckoClient::coin_id("BTC"), "bitcoin");
        assert_eq!(CoinGeckoClient::coin_id("btc"), "bitcoin");
        assert_eq!(CoinGeckoClient::coin_id("SOL"), "solana");
        assert_eq!(CoinGeckoClient::coin_id("XRP"), "ripple");
    }

    #[test]
    fn test_coin_id_unknown_passthrough() {
        assert_eq!(CoinGeckoClient::coin_id("DOGE"), "doge");
        assert_eq!(CoinGeckoClient::coin_id("NewCoin"), "newcoin");
    }

    #[tokio::test]
    async fn test_fetch_prices_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chart_body(48))
            .create_async()
            .await;

        let client =
            CoinGeckoClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let points = client.fetch_prices("BTC", 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(points.len(), 48);
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(points[0].price, 100.0);
    }

    #[tokio::test]
    async fn test_fetch_prices_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let client =
            CoinGeckoClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = client.fetch_prices("BTC", 2).await.unwrap_err();

        assert!(matches!(err, MarketError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_fetch_prices_malformed_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{\"unexpected\": true}")
            .create_async()
            .await;

        let client =
            CoinGeckoClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = client.fetch_prices("BTC", 2).await.unwrap_err();

        assert!(matches!(err, MarketError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_prices_empty_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{\"prices\": []}")
            .create_async()
            .await;

        let client =
            CoinGeckoClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = client.fetch_prices("BTC", 2).await.unwrap_err();

        assert!(matches!(err, MarketError::EmptyData(_)));
    }

    #[test]
    fn test_to_price_points_sorts_and_dedups() {
        let payload = MarketChartResponse {
            prices: vec![
                (3_600_000.0, 103.0),
                (0.0, 100.0),
                (3_600_000.0, 104.0),
                (7_200_000.0, 105.0),
            ],
        };
        let points = CoinGeckoClient::to_price_points("BTC", payload).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].price, 100.0);
        // 동일 타임스탬프 중 첫 값이 유지됨
        assert_eq!(points[1].price, 103.0);
    }

    #[test]
    fn test_to_price_points_rejects_nan() {
        let payload = MarketChartResponse {
            prices: vec![(0.0, f64::NAN)],
        };
        let err = CoinGeckoClient::to_price_points("BTC", payload).unwrap_err();
        assert!(matches!(err, MarketError::Parse(_)));
    }
}
