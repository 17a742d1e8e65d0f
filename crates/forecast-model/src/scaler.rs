//! 열 단위 min-max 스케일링.
//!
//! 학습 구간의 통계로 한 번만 fit하고, 이후 모든 변환과 역변환에서
//! 동일한 파라미터를 재사용합니다. fit 이후 파라미터를 변경하면 그
//! 스케일에 맞춰 학습된 모델이 무효화되므로 변경 API는 제공하지
//! 않습니다.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// 열 단위 [0, 1] min-max 스케일러.
///
/// 상수 열(max == min)은 0.0으로 매핑되고, 역변환 시 해당 열의 최솟값을
/// 돌려줍니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min_vals: Array1<f64>,
    max_vals: Array1<f64>,
}

impl MinMaxScaler {
    /// 피처 행렬에 스케일러를 fit합니다.
    ///
    /// # 에러
    /// 행이 없으면 `InsufficientData`를 반환합니다.
    pub fn fit(data: ArrayView2<'_, f64>) -> ModelResult<Self> {
        if data.nrows() == 0 {
            return Err(ModelError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let min_vals = data.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let max_vals = data.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));

        Ok(Self { min_vals, max_vals })
    }

    /// fit된 피처 개수.
    pub fn n_features(&self) -> usize {
        self.min_vals.len()
    }

    /// 열 범위 (max − min).
    fn range(&self, col: usize) -> f64 {
        self.max_vals[col] - self.min_vals[col]
    }

    /// 행렬 전체를 [0, 1] 범위로 변환합니다.
    ///
    /// # 에러
    /// 열 개수가 fit 시점과 다르면 `ShapeMismatch`를 반환합니다.
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        self.check_shape(data.ncols())?;

        let mut scaled = data.to_owned();
        for (col, mut column) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            let min = self.min_vals[col];
            let range = self.range(col);
            if range == 0.0 {
                column.fill(0.0);
            } else {
                column.mapv_inplace(|v| (v - min) / range);
            }
        }

        Ok(scaled)
    }

    /// 스케일된 행렬을 원래 단위로 역변환합니다.
    pub fn inverse_transform(&self, data: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        self.check_shape(data.ncols())?;

        let mut restored = data.to_owned();
        for (col, mut column) in restored.axis_iter_mut(Axis(1)).enumerate() {
            let min = self.min_vals[col];
            let range = self.range(col);
            column.mapv_inplace(|v| v * range + min);
        }

        Ok(restored)
    }

    /// 스케일된 가격(0번 열) 시퀀스를 가격 단위로 역변환합니다.
    ///
    /// 스케일러는 전체 열을 요구하므로, 가격 열만 채운 0 행렬을 만들어
    /// 역변환한 뒤 0번 열을 추출합니다.
    pub fn inverse_price_series(&self, scaled: &Array1<f64>) -> ModelResult<Array1<f64>> {
        let mut padded = Array2::zeros((scaled.len(), self.n_features()));
        padded.column_mut(0).assign(scaled);

        let restored = self.inverse_transform(padded.view())?;
        Ok(restored.column(0).to_owned())
    }

    /// 단일 스케일된 가격을 역변환합니다.
    pub fn inverse_price(&self, scaled: f64) -> ModelResult<f64> {
        let series = self.inverse_price_series(&Array1::from_elem(1, scaled))?;
        Ok(series[0])
    }

    fn check_shape(&self, actual: usize) -> ModelResult<()> {
        if actual != self.n_features() {
            return Err(ModelError::ShapeMismatch {
                expected: self.n_features(),
                actual,
            });
        }
        Ok(())
    }
}
