//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 시작 시 한 번 구성되어 Arc로 래핑된 뒤 Axum의 State
//! extractor를 통해 핸들러에 주입됩니다. 전역 가변 상태는 없습니다.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use forecast_core::MarketHistory;
use forecast_model::{LstmRegressor, PipelineRegistry};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 심볼별 파이프라인 레지스트리 (single-flight 학습)
    pub registry: Arc<PipelineRegistry<LstmRegressor>>,

    /// 시장 데이터 제공자
    pub provider: Arc<dyn MarketHistory>,

    /// 메타데이터 저장소 연결 풀 (없으면 미러링 비활성)
    pub db_pool: Option<PgPool>,

    /// 모델 아티팩트 디렉터리
    pub artifact_dir: PathBuf,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: DateTime<Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    pub fn new(
        registry: PipelineRegistry<LstmRegressor>,
        provider: Arc<dyn MarketHistory>,
        artifact_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            provider,
            db_pool: None,
            artifact_dir: artifact_dir.into(),
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 연결 설정.
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 데이터베이스 설정 여부 확인.
    pub fn has_db(&self) -> bool {
        self.db_pool.is_some()
    }

    /// 데이터베이스 연결 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        match &self.db_pool {
            Some(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
            None => false,
        }
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
