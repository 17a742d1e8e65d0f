//! # Forecast Market
//!
//! 시장 데이터 조회 및 기술 지표 계산을 제공합니다.
//!
//! - `client` - CoinGecko 호환 시세 제공자 클라이언트
//! - `indicators` - SMA/EMA/RSI/변동성 지표 계산
//! - `history` - 지표가 계산된 과거 데이터 제공자 (`MarketHistory` 구현)

pub mod client;
pub mod error;
pub mod history;
pub mod indicators;

pub use client::CoinGeckoClient;
pub use error::{MarketError, MarketResult};
pub use history::HistoryFetcher;
pub use indicators::IndicatorConfig;
