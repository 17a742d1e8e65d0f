//! 예측 서비스 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다. 시장 데이터 제공자, 심볼별
//! 파이프라인 레지스트리, 선택적 메타데이터 저장소 연결을 구성한 뒤
//! `/predict`, `/train/{symbol}`, `/models`, `/health` 엔드포인트를
//! 제공합니다.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use forecast_api::routes::create_api_router;
use forecast_api::state::AppState;
use forecast_core::{init_logging, AppConfig, LogConfig, MarketHistory};
use forecast_market::{CoinGeckoClient, HistoryFetcher};
use forecast_model::{LstmRegressor, PipelineConfig, PipelineRegistry};

/// 전역 요청 타임아웃.
///
/// 학습 요청은 수 분이 걸릴 수 있으므로 넉넉하게 잡습니다.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// CORS 미들웨어 구성.
///
/// `CORS_ORIGINS` 환경변수가 설정되어 있으면 해당 origin만 허용하고,
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// 메타데이터 저장소 연결 시도.
///
/// 연결 실패는 치명적이지 않습니다: 미러링만 비활성화됩니다.
async fn connect_metadata_store(database_url: &str) -> Option<sqlx::PgPool> {
    match PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
    {
        Ok(pool) => {
            if sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok() {
                info!("Connected to metadata store");
                Some(pool)
            } else {
                error!("Failed to verify metadata store connection");
                None
            }
        }
        Err(err) => {
            error!("Failed to connect to metadata store: {}", err);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    init_logging(&LogConfig::from_env()).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    info!("Starting Forecast API server...");

    let config = AppConfig::from_env();
    let addr = config.socket_addr().map_err(|e| {
        error!(
            host = %config.host,
            port = config.port,
            error = %e,
            "Invalid socket address, check API_HOST / API_PORT"
        );
        e
    })?;

    // 시장 데이터 제공자
    let client = CoinGeckoClient::new(
        &config.provider_base_url,
        Duration::from_secs(config.http_timeout_secs),
    )?;
    let provider: Arc<dyn MarketHistory> = Arc::new(HistoryFetcher::new(client));
    info!(base_url = %config.provider_base_url, "Market data provider ready");

    // 심볼별 파이프라인 레지스트리
    let pipeline_config = PipelineConfig {
        lookback_days: config.lookback_days,
        ..Default::default()
    };
    let template = LstmRegressor::new(pipeline_config.model.clone());
    let registry = PipelineRegistry::new(pipeline_config, &config.artifact_dir, template);

    let mut state = AppState::new(registry, provider, &config.artifact_dir);

    // 메타데이터 저장소 연결 (DATABASE_URL 설정 시)
    if let Some(database_url) = &config.database_url {
        if let Some(pool) = connect_metadata_store(database_url).await {
            state = state.with_db_pool(pool);
        }
    } else {
        warn!("DATABASE_URL not set, metadata mirroring disabled");
    }

    let state = Arc::new(state);
    info!(
        version = %state.version,
        has_db = state.has_db(),
        artifact_dir = %config.artifact_dir.display(),
        "Application state initialized"
    );

    // 라우터 구성
    let app = create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(cors_layer());

    info!(%addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 수신 시 종료를 시작합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
