//! 시퀀스 윈도우 준비.
//!
//! 지표 행 시계열을 고정 길이 윈도우와 다음 스텝 레이블로 변환합니다.
//! 스케일러는 학습 윈도우와 그 레이블이 덮는 행 구간에만 fit하며,
//! 평가 구간의 통계가 섞이는 데이터 누수를 차단합니다.

use ndarray::{s, Array1, Array2, Array3};
use tracing::debug;

use forecast_core::{IndicatorRow, FEATURE_COUNT};

use crate::error::{ModelError, ModelResult};
use crate::scaler::MinMaxScaler;

/// 윈도우 데이터셋 (X: [samples, window, features], y: 스케일된 다음 가격).
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    pub x: Array3<f64>,
    pub y: Array1<f64>,
}

impl WindowedDataset {
    /// 샘플 수.
    pub fn len(&self) -> usize {
        self.x.shape()[0]
    }

    /// 샘플이 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 윈도우 준비 결과.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// 학습 구간에만 fit된 스케일러
    pub scaler: MinMaxScaler,
    /// 학습 파티션 (시간순 앞 80%)
    pub train: WindowedDataset,
    /// 평가 파티션 (시간순 뒤 20%)
    pub test: WindowedDataset,
}

/// 지표 행을 피처 행렬로 변환합니다.
///
/// 열 순서는 `IndicatorRow::features`와 동일합니다.
pub fn feature_matrix(rows: &[IndicatorRow]) -> Array2<f64> {
    let mut matrix = Array2::zeros((rows.len(), FEATURE_COUNT));
    for (i, row) in rows.iter().enumerate() {
        for (j, value) in row.features().into_iter().enumerate() {
            matrix[[i, j]] = value;
        }
    }
    matrix
}

/// 윈도우/레이블 생성과 시간순 분할.
///
/// stride 1, lookahead 1: 윈도우 i는 행 `i..i+window_len`, 레이블은
/// 행 `i+window_len`의 스케일된 가격입니다. 총 윈도우 수는
/// `rows.len() − window_len`입니다.
///
/// # 인자
/// * `rows` - 지표 행 (시간순)
/// * `window_len` - 윈도우 길이
/// * `train_ratio` - 학습 파티션 비율 (시간순 분할, 셔플 없음)
pub fn prepare_windows(
    rows: &[IndicatorRow],
    window_len: usize,
    train_ratio: f64,
) -> ModelResult<PreparedData> {
    // 최소 한 개의 학습 윈도우가 필요
    if rows.len() <= window_len {
        return Err(ModelError::InsufficientData {
            required: window_len + 1,
            actual: rows.len(),
        });
    }

    let n_windows = rows.len() - window_len;
    let n_train = ((n_windows as f64) * train_ratio) as usize;
    let n_train = n_train.max(1).min(n_windows);

    // 학습 윈도우와 레이블이 덮는 행: 0 .. n_train-1+window_len (포함)
    let fit_rows = n_train + window_len;

    let matrix = feature_matrix(rows);
    let scaler = MinMaxScaler::fit(matrix.slice(s![..fit_rows, ..]))?;
    let scaled = scaler.transform(matrix.view())?;

    let mut x = Array3::zeros((n_windows, window_len, FEATURE_COUNT));
    let mut y = Array1::zeros(n_windows);

    for i in 0..n_windows {
        x.slice_mut(s![i, .., ..])
            .assign(&scaled.slice(s![i..i + window_len, ..]));
        y[i] = scaled[[i + window_len, 0]];
    }

    let train = WindowedDataset {
        x: x.slice(s![..n_train, .., ..]).to_owned(),
        y: y.slice(s![..n_train]).to_owned(),
    };
    let test = WindowedDataset {
        x: x.slice(s![n_train.., .., ..]).to_owned(),
        y: y.slice(s![n_train..]).to_owned(),
    };

    debug!(
        rows = rows.len(),
        windows = n_windows,
        train = train.len(),
        test = test.len(),
        "Windows prepared"
    );

    Ok(PreparedData {
        scaler,
        train,
        test,
    })
}
