//! 메타데이터 저장소 repository 계층.
//!
//! `models` / `predictions` 테이블에 대한 접근을 담당합니다.
//! 모든 repository는 상태 없는 구조체이며 `&PgPool`을 받는 연관 함수로
//! 구성됩니다.

pub mod models;
pub mod predictions;

pub use models::{ModelRecord, ModelsRepository};
pub use predictions::{NewPrediction, PredictionsRepository};
