//! # Forecast API
//!
//! 가격 예측 서비스의 REST API 서버입니다.
//!
//! - `routes` - HTTP 엔드포인트 (`/predict`, `/train/{symbol}`, `/models`, `/health`)
//! - `state` - 모든 핸들러에서 공유되는 애플리케이션 상태
//! - `repository` - 메타데이터 저장소 (`models`, `predictions` 테이블)
//! - `error` - 통합 에러 응답

pub mod error;
pub mod repository;
pub mod routes;
pub mod state;
