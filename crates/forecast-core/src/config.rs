//! 서비스 설정.
//!
//! 모든 설정은 환경변수에서 로드됩니다. `.env` 파일은 바이너리 진입점에서
//! `dotenvy`로 로드한 뒤 이 모듈을 사용합니다.
//!
//! # 환경변수
//!
//! - `API_HOST` - 바인딩 호스트 (기본: "127.0.0.1")
//! - `API_PORT` - 바인딩 포트 (기본: 8000)
//! - `DATABASE_URL` - PostgreSQL 연결 문자열 (선택; 없으면 메타데이터 미러링 비활성)
//! - `MODEL_DIR` - 모델/스케일러 아티팩트 디렉터리 (기본: "models")
//! - `PROVIDER_BASE_URL` - 시세 제공자 base URL (기본: CoinGecko v3)
//! - `LOOKBACK_DAYS` - 학습 데이터 조회 기간 (기본: 730)
//! - `HTTP_TIMEOUT_SECS` - 외부 HTTP 호출 타임아웃 (기본: 30)

use std::net::SocketAddr;
use std::path::PathBuf;

/// 애플리케이션 설정.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 바인딩할 호스트 주소
    pub host: String,
    /// 바인딩할 포트
    pub port: u16,
    /// PostgreSQL 연결 문자열 (없으면 메타데이터 저장소 비활성)
    pub database_url: Option<String>,
    /// 모델 아티팩트 디렉터리
    pub artifact_dir: PathBuf,
    /// 시세 제공자 base URL
    pub provider_base_url: String,
    /// 학습 데이터 조회 기간 (일)
    pub lookback_days: u32,
    /// 외부 HTTP 호출 타임아웃 (초)
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_url: None,
            artifact_dir: PathBuf::from("models"),
            provider_base_url: "https://api.coingecko.com/api/v3".to_string(),
            lookback_days: 730,
            http_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// 환경변수에서 설정 로드.
    ///
    /// 파싱에 실패한 값은 기본값으로 대체됩니다.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            artifact_dir: std::env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            provider_base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or(defaults.provider_base_url),
            lookback_days: std::env::var("LOOKBACK_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lookback_days),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
        }
    }

    /// 소켓 주소 반환.
    ///
    /// # Errors
    /// `host:port` 형식이 유효하지 않으면 `AddrParseError`를 반환합니다.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
