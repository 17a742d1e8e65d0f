//! 스택 LSTM 회귀 네트워크.
//!
//! 시퀀스-투-원 회귀를 위한 다층 LSTM과 dense 헤드를 구현합니다.
//! 게이트 가중치는 층마다 [i; f; g; o] 순서로 쌓인 융합 행렬로 보관하고,
//! 학습은 BPTT(backpropagation through time)와 Adam 옵티마이저로
//! 수행합니다. 층 사이와 마지막 은닉 상태에는 inverted dropout을
//! 적용합니다 (추론 시에는 비활성).

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 시그모이드 활성화.
fn sigmoid(x: ArrayView1<'_, f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

/// 하이퍼볼릭 탄젠트 활성화.
fn tanh(x: ArrayView1<'_, f64>) -> Array1<f64> {
    x.mapv(f64::tanh)
}

/// 외적 `a ⊗ b` → (len(a), len(b)) 행렬.
fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let a2 = a.view().insert_axis(Axis(1));
    let b2 = b.view().insert_axis(Axis(0));
    a2.dot(&b2)
}

/// LSTM 셀 (한 층).
///
/// 융합 게이트 레이아웃: `z = w_x·x + w_h·h_prev + b`, `z`의 행 블록은
/// 차례로 input/forget/cell/output 게이트에 해당합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    input_size: usize,
    hidden_size: usize,
    w_x: Array2<f64>,
    w_h: Array2<f64>,
    b: Array1<f64>,
}

/// 한 타임스텝의 순전파 중간값 (역전파에 필요).
#[derive(Debug, Clone)]
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
    c: Array1<f64>,
    h: Array1<f64>,
}

/// 셀 파라미터와 같은 형상의 기울기/모멘트 버퍼.
#[derive(Debug, Clone)]
pub struct CellGrads {
    w_x: Array2<f64>,
    w_h: Array2<f64>,
    b: Array1<f64>,
}

impl LstmCell {
    /// 새 셀 생성. 가중치는 `±1/√hidden` 균등 분포로 초기화하고,
    /// forget 게이트 bias는 1.0으로 시작합니다.
    fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        let mut b = Array1::zeros(4 * hidden_size);
        b.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        Self {
            input_size,
            hidden_size,
            w_x: Array2::random_using((4 * hidden_size, input_size), dist, rng),
            w_h: Array2::random_using((4 * hidden_size, hidden_size), dist, rng),
            b,
        }
    }

    fn zero_grads(&self) -> CellGrads {
        CellGrads {
            w_x: Array2::zeros(self.w_x.raw_dim()),
            w_h: Array2::zeros(self.w_h.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        }
    }

    /// 단일 타임스텝 순전파.
    fn forward_step(&self, x: &Array1<f64>, h_prev: &Array1<f64>, c_prev: &Array1<f64>) -> StepCache {
        let h = self.hidden_size;
        let z = self.w_x.dot(x) + self.w_h.dot(h_prev) + &self.b;

        let i = sigmoid(z.slice(s![0..h]));
        let f = sigmoid(z.slice(s![h..2 * h]));
        let g = tanh(z.slice(s![2 * h..3 * h]));
        let o = sigmoid(z.slice(s![3 * h..4 * h]));

        let c = &f * c_prev + &i * &g;
        let tanh_c = c.mapv(f64::tanh);
        let h_next = &o * &tanh_c;

        StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            tanh_c,
            c,
            h: h_next,
        }
    }

    /// 단일 타임스텝 역전파.
    ///
    /// `dh`/`dc_in`은 이 스텝의 은닉/셀 상태에 대한 기울기이며,
    /// 반환값은 (입력, 이전 은닉, 이전 셀 상태)에 대한 기울기입니다.
    fn backward_step(
        &self,
        cache: &StepCache,
        dh: &Array1<f64>,
        dc_in: &Array1<f64>,
        grads: &mut CellGrads,
    ) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
        let h = self.hidden_size;

        let d_o = dh * &cache.tanh_c;
        let dpre_o = &d_o * &cache.o.mapv(|v| v * (1.0 - v));

        let dc = dc_in + &(&(dh * &cache.o) * &cache.tanh_c.mapv(|v| 1.0 - v * v));

        let d_f = &dc * &cache.c_prev;
        let dpre_f = &d_f * &cache.f.mapv(|v| v * (1.0 - v));

        let d_i = &dc * &cache.g;
        let dpre_i = &d_i * &cache.i.mapv(|v| v * (1.0 - v));

        let d_g = &dc * &cache.i;
        let dpre_g = &d_g * &cache.g.mapv(|v| 1.0 - v * v);

        let mut dz = Array1::zeros(4 * h);
        dz.slice_mut(s![0..h]).assign(&dpre_i);
        dz.slice_mut(s![h..2 * h]).assign(&dpre_f);
        dz.slice_mut(s![2 * h..3 * h]).assign(&dpre_g);
        dz.slice_mut(s![3 * h..4 * h]).assign(&dpre_o);

        grads.w_x = &grads.w_x + &outer(&dz, &cache.x);
        grads.w_h = &grads.w_h + &outer(&dz, &cache.h_prev);
        grads.b = &grads.b + &dz;

        let dx = self.w_x.t().dot(&dz);
        let dh_prev = self.w_h.t().dot(&dz);
        let dc_prev = &dc * &cache.f;

        (dx, dh_prev, dc_prev)
    }

    fn init_state(&self) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }
}

/// 완전연결 층 (선형 활성화).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

/// Dense 층의 기울기/모멘트 버퍼.
#[derive(Debug, Clone)]
pub struct DenseGrads {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl Dense {
    fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / input_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        Self {
            weights: Array2::random_using((output_size, input_size), dist, rng),
            bias: Array1::zeros(output_size),
        }
    }

    fn zero_grads(&self) -> DenseGrads {
        DenseGrads {
            weights: Array2::zeros(self.weights.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        self.weights.dot(x) + &self.bias
    }

    /// 역전파: 출력 기울기에서 파라미터 기울기를 누적하고 입력 기울기를
    /// 반환합니다.
    fn backward(&self, x: &Array1<f64>, dy: &Array1<f64>, grads: &mut DenseGrads) -> Array1<f64> {
        grads.weights = &grads.weights + &outer(dy, x);
        grads.bias = &grads.bias + dy;
        self.weights.t().dot(dy)
    }
}

/// 네트워크 전체 기울기.
#[derive(Debug, Clone)]
pub struct NetworkGrads {
    cells: Vec<CellGrads>,
    dense_hidden: DenseGrads,
    dense_out: DenseGrads,
}

/// 한 샘플의 순전파 캐시.
struct ForwardCache {
    layers: Vec<Vec<StepCache>>,
    masks: Vec<Vec<Array1<f64>>>,
    final_mask: Array1<f64>,
    final_hidden_dropped: Array1<f64>,
    dense_hidden_out: Array1<f64>,
    prediction: f64,
}

/// 스택 LSTM 회귀 네트워크.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmNetwork {
    input_size: usize,
    hidden_sizes: Vec<usize>,
    dropout: f64,
    cells: Vec<LstmCell>,
    dense_hidden: Dense,
    dense_out: Dense,
}

impl LstmNetwork {
    /// 새 네트워크 생성.
    ///
    /// # 인자
    /// * `input_size` - 입력 피처 수
    /// * `hidden_sizes` - 층별 은닉 크기 (예: [100, 100, 50])
    /// * `dense_size` - dense 헤드 은닉 크기
    /// * `dropout` - 층 간 dropout 비율 [0, 1)
    pub fn new(
        input_size: usize,
        hidden_sizes: &[usize],
        dense_size: usize,
        dropout: f64,
        rng: &mut StdRng,
    ) -> Self {
        assert!(!hidden_sizes.is_empty(), "at least one LSTM layer required");
        assert!((0.0..1.0).contains(&dropout), "dropout must be in [0, 1)");

        let mut cells = Vec::with_capacity(hidden_sizes.len());
        let mut in_size = input_size;
        for &hidden in hidden_sizes {
            cells.push(LstmCell::new(in_size, hidden, rng));
            in_size = hidden;
        }

        let last_hidden = *hidden_sizes.last().unwrap();
        let dense_hidden = Dense::new(last_hidden, dense_size, rng);
        let dense_out = Dense::new(dense_size, 1, rng);

        Self {
            input_size,
            hidden_sizes: hidden_sizes.to_vec(),
            dropout,
            cells,
            dense_hidden,
            dense_out,
        }
    }

    /// 입력 피처 수.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// 추론 순전파 (dropout 비활성).
    ///
    /// # 인자
    /// * `window` - [timesteps, features] 입력 시퀀스
    pub fn predict(&self, window: ArrayView2<'_, f64>) -> f64 {
        let seq_len = window.nrows();
        let mut states: Vec<(Array1<f64>, Array1<f64>)> =
            self.cells.iter().map(|c| c.init_state()).collect();

        for t in 0..seq_len {
            let mut input = window.row(t).to_owned();
            for (l, cell) in self.cells.iter().enumerate() {
                let (h_prev, c_prev) = &states[l];
                let cache = cell.forward_step(&input, h_prev, c_prev);
                input = cache.h.clone();
                states[l] = (cache.h, cache.c);
            }
        }

        let final_hidden = &states[self.cells.len() - 1].0;
        let d1 = self.dense_hidden.forward(final_hidden);
        self.dense_out.forward(&d1)[0]
    }

    /// 학습 순전파 (dropout 활성, 역전파용 캐시 유지).
    fn forward_train(&self, window: ArrayView2<'_, f64>, rng: &mut StdRng) -> ForwardCache {
        let seq_len = window.nrows();
        let n_layers = self.cells.len();
        let keep = 1.0 - self.dropout;

        let mut layers: Vec<Vec<StepCache>> = vec![Vec::with_capacity(seq_len); n_layers];
        let mut masks: Vec<Vec<Array1<f64>>> = vec![Vec::with_capacity(seq_len); n_layers - 1];
        let mut states: Vec<(Array1<f64>, Array1<f64>)> =
            self.cells.iter().map(|c| c.init_state()).collect();

        for t in 0..seq_len {
            let mut input = window.row(t).to_owned();
            for (l, cell) in self.cells.iter().enumerate() {
                let (h_prev, c_prev) = &states[l];
                let cache = cell.forward_step(&input, h_prev, c_prev);
                states[l] = (cache.h.clone(), cache.c.clone());

                if l < n_layers - 1 {
                    let mask = self.sample_mask(cache.h.len(), keep, rng);
                    input = &cache.h * &mask;
                    masks[l].push(mask);
                } else {
                    input = cache.h.clone();
                }
                layers[l].push(cache);
            }
        }

        let final_hidden = states[n_layers - 1].0.clone();
        let final_mask = self.sample_mask(final_hidden.len(), keep, rng);
        let final_hidden_dropped = &final_hidden * &final_mask;

        let dense_hidden_out = self.dense_hidden.forward(&final_hidden_dropped);
        let prediction = self.dense_out.forward(&dense_hidden_out)[0];

        ForwardCache {
            layers,
            masks,
            final_mask,
            final_hidden_dropped,
            dense_hidden_out,
            prediction,
        }
    }

    /// inverted dropout 마스크 샘플링.
    fn sample_mask(&self, len: usize, keep: f64, rng: &mut StdRng) -> Array1<f64> {
        if keep >= 1.0 {
            return Array1::ones(len);
        }
        Array1::from_shape_fn(len, |_| {
            if rng.gen::<f64>() < keep {
                1.0 / keep
            } else {
                0.0
            }
        })
    }

    /// 한 샘플에 대한 BPTT.
    ///
    /// `d_pred`는 손실의 예측값에 대한 기울기입니다.
    fn backward(&self, cache: &ForwardCache, d_pred: f64, grads: &mut NetworkGrads) {
        let n_layers = self.cells.len();
        let seq_len = cache.layers[0].len();

        // dense 헤드 역전파
        let dy = Array1::from_elem(1, d_pred);
        let d_dense_hidden =
            self.dense_out
                .backward(&cache.dense_hidden_out, &dy, &mut grads.dense_out);
        let d_final_dropped = self.dense_hidden.backward(
            &cache.final_hidden_dropped,
            &d_dense_hidden,
            &mut grads.dense_hidden,
        );
        let d_final_hidden = &d_final_dropped * &cache.final_mask;

        // 위 층에서 내려오는 타임스텝별 은닉 기울기
        let mut dh_above: Vec<Array1<f64>> = (0..seq_len)
            .map(|t| {
                if t == seq_len - 1 {
                    d_final_hidden.clone()
                } else {
                    Array1::zeros(self.hidden_sizes[n_layers - 1])
                }
            })
            .collect();

        for l in (0..n_layers).rev() {
            let cell = &self.cells[l];
            let mut dh_next = Array1::zeros(self.hidden_sizes[l]);
            let mut dc_next = Array1::zeros(self.hidden_sizes[l]);
            let mut dx_steps: Vec<Array1<f64>> = Vec::with_capacity(seq_len);

            for t in (0..seq_len).rev() {
                let dh = &dh_above[t] + &dh_next;
                let (dx, dh_prev, dc_prev) =
                    cell.backward_step(&cache.layers[l][t], &dh, &dc_next, &mut grads.cells[l]);
                dx_steps.push(dx);
                dh_next = dh_prev;
                dc_next = dc_prev;
            }
            dx_steps.reverse();

            if l > 0 {
                // 아래 층의 출력 기울기 = 입력 기울기 × dropout 마스크
                dh_above = dx_steps
                    .into_iter()
                    .enumerate()
                    .map(|(t, dx)| &dx * &cache.masks[l - 1][t])
                    .collect();
            }
        }
    }

    /// 기울기 버퍼 초기화.
    pub fn zero_grads(&self) -> NetworkGrads {
        NetworkGrads {
            cells: self.cells.iter().map(|c| c.zero_grads()).collect(),
            dense_hidden: self.dense_hidden.zero_grads(),
            dense_out: self.dense_out.zero_grads(),
        }
    }

    /// 미니배치 학습 스텝: 평균 MSE 손실을 반환하고 기울기를 적용합니다.
    ///
    /// # 인자
    /// * `x` - [samples, timesteps, features] 배치
    /// * `y` - 스케일된 레이블
    /// * `optimizer` - Adam 상태
    /// * `rng` - dropout 마스크용 RNG
    pub fn train_batch(
        &mut self,
        x: &ndarray::Array3<f64>,
        y: &Array1<f64>,
        optimizer: &mut AdamOptimizer,
        rng: &mut StdRng,
    ) -> f64 {
        let n = x.shape()[0];
        debug_assert_eq!(n, y.len());

        let mut grads = self.zero_grads();
        let mut loss = 0.0;

        for s_idx in 0..n {
            let window = x.slice(s![s_idx, .., ..]);
            let cache = self.forward_train(window, rng);
            let err = cache.prediction - y[s_idx];
            loss += err * err;

            // d(MSE)/d(pred) = 2·err / n
            let d_pred = 2.0 * err / n as f64;
            self.backward(&cache, d_pred, &mut grads);
        }

        optimizer.step(self, &grads);

        loss / n as f64
    }

    /// 데이터셋에 대한 추론 손실 (MSE)과 MAE.
    pub fn evaluate(&self, x: &ndarray::Array3<f64>, y: &Array1<f64>) -> (f64, f64) {
        let n = x.shape()[0];
        if n == 0 {
            return (0.0, 0.0);
        }

        let mut mse = 0.0;
        let mut mae = 0.0;
        for s_idx in 0..n {
            let pred = self.predict(x.slice(s![s_idx, .., ..]));
            let err = pred - y[s_idx];
            mse += err * err;
            mae += err.abs();
        }
        (mse / n as f64, mae / n as f64)
    }
}

/// Adam 옵티마이저.
///
/// 모멘트 버퍼는 네트워크 파라미터와 같은 형상으로 보관하며 직렬화
/// 대상이 아닙니다 (아티팩트에는 가중치만 저장).
pub struct AdamOptimizer {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step_count: u64,
    m: NetworkGrads,
    v: NetworkGrads,
}

impl AdamOptimizer {
    /// 네트워크 형상에 맞는 옵티마이저 생성.
    pub fn new(network: &LstmNetwork, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step_count: 0,
            m: network.zero_grads(),
            v: network.zero_grads(),
        }
    }

    /// 현재 학습률.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// 학습률 변경 (plateau 감쇠용).
    pub fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }

    /// 기울기를 적용합니다.
    fn step(&mut self, network: &mut LstmNetwork, grads: &NetworkGrads) {
        self.step_count += 1;
        let bc1 = 1.0 - self.beta1.powi(self.step_count as i32);
        let bc2 = 1.0 - self.beta2.powi(self.step_count as i32);

        for l in 0..network.cells.len() {
            Self::update2(
                &mut network.cells[l].w_x,
                &grads.cells[l].w_x,
                &mut self.m.cells[l].w_x,
                &mut self.v.cells[l].w_x,
                self.learning_rate,
                self.beta1,
                self.beta2,
                self.epsilon,
                bc1,
                bc2,
            );
            Self::update2(
                &mut network.cells[l].w_h,
                &grads.cells[l].w_h,
                &mut self.m.cells[l].w_h,
                &mut self.v.cells[l].w_h,
                self.learning_rate,
                self.beta1,
                self.beta2,
                self.epsilon,
                bc1,
                bc2,
            );
            Self::update1(
                &mut network.cells[l].b,
                &grads.cells[l].b,
                &mut self.m.cells[l].b,
                &mut self.v.cells[l].b,
                self.learning_rate,
                self.beta1,
                self.beta2,
                self.epsilon,
                bc1,
                bc2,
            );
        }

        Self::update2(
            &mut network.dense_hidden.weights,
            &grads.dense_hidden.weights,
            &mut self.m.dense_hidden.weights,
            &mut self.v.dense_hidden.weights,
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            bc1,
            bc2,
        );
        Self::update1(
            &mut network.dense_hidden.bias,
            &grads.dense_hidden.bias,
            &mut self.m.dense_hidden.bias,
            &mut self.v.dense_hidden.bias,
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            bc1,
            bc2,
        );
        Self::update2(
            &mut network.dense_out.weights,
            &grads.dense_out.weights,
            &mut self.m.dense_out.weights,
            &mut self.v.dense_out.weights,
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            bc1,
            bc2,
        );
        Self::update1(
            &mut network.dense_out.bias,
            &grads.dense_out.bias,
            &mut self.m.dense_out.bias,
            &mut self.v.dense_out.bias,
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            bc1,
            bc2,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn update2(
        param: &mut Array2<f64>,
        grad: &Array2<f64>,
        m: &mut Array2<f64>,
        v: &mut Array2<f64>,
        lr: f64,
        b1: f64,
        b2: f64,
        eps: f64,
        bc1: f64,
        bc2: f64,
    ) {
        ndarray::Zip::from(param)
            .and(grad)
            .and(m)
            .and(v)
            .for_each(|p, &g, m, v| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                let m_hat = *m / bc1;
                let v_hat = *v / bc2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }

    #[allow(clippy::too_many_arguments)]
    fn update1(
        param: &mut Array1<f64>,
        grad: &Array1<f64>,
        m: &mut Array1<f64>,
        v: &mut Array1<f64>,
        lr: f64,
        b1: f64,
        b2: f64,
        eps: f64,
        bc1: f64,
        bc2: f64,
    ) {
        ndarray::Zip::from(param)
            .and(grad)
            .and(m)
            .and(v)
            .for_each(|p, &g, m, v| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                let m_hat = *m / bc1;
                let v_hat = *v / bc2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use rand::SeedableRng;

    fn small_network(rng: &mut StdRng) -> LstmNetwork {
        LstmNetwork::new(3, &[8, 4], 4, 0.0, rng)
    }

    #[test]
    fn test_predict_shape_and_determinism() {
        let mut rng = StdRng::seed_from_u64(7);
        let network = small_network(&mut rng);

        let window = Array2::from_shape_fn((10, 3), |(t, f)| (t as f64 + f as f64) * 0.01);
        let a = network.predict(window.view());
        let b = network.predict(window.view());

        assert!(a.is_finite());
        assert_eq!(a, b);
    }

    #[test]
    fn test_seeded_init_is_reproducible() {
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let net_a = small_network(&mut rng_a);
        let net_b = small_network(&mut rng_b);

        let window = Array2::zeros((5, 3));
        assert_eq!(net_a.predict(window.view()), net_b.predict(window.view()));
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut network = small_network(&mut rng);
        let mut optimizer = AdamOptimizer::new(&network, 0.01);

        // 간단한 패턴: 레이블 = 마지막 스텝의 0번 피처
        let n = 16;
        let x = Array3::from_shape_fn((n, 6, 3), |(s_idx, t, f)| {
            if f == 0 {
                (s_idx as f64 / n as f64) * (t as f64 + 1.0) / 6.0
            } else {
                0.1
            }
        });
        let y = Array1::from_shape_fn(n, |s_idx| x[[s_idx, 5, 0]]);

        let first_loss = network.train_batch(&x, &y, &mut optimizer, &mut rng);
        let mut last_loss = first_loss;
        for _ in 0..60 {
            last_loss = network.train_batch(&x, &y, &mut optimizer, &mut rng);
        }

        assert!(
            last_loss < first_loss * 0.5,
            "loss did not decrease: {} -> {}",
            first_loss,
            last_loss
        );
    }

    #[test]
    fn test_evaluate_empty_dataset() {
        let mut rng = StdRng::seed_from_u64(3);
        let network = small_network(&mut rng);

        let x = Array3::zeros((0, 6, 3));
        let y = Array1::zeros(0);
        assert_eq!(network.evaluate(&x, &y), (0.0, 0.0));
    }

    #[test]
    fn test_serde_round_trip_preserves_weights() {
        let mut rng = StdRng::seed_from_u64(5);
        let network = small_network(&mut rng);

        let bytes = bincode::serialize(&network).unwrap();
        let restored: LstmNetwork = bincode::deserialize(&bytes).unwrap();

        let window = Array2::from_shape_fn((8, 3), |(t, f)| (t * 3 + f) as f64 * 0.02);
        assert_eq!(
            network.predict(window.view()),
            restored.predict(window.view())
        );
    }

    #[test]
    fn test_dropout_mask_inference_path_unaffected() {
        let mut rng = StdRng::seed_from_u64(9);
        let network = LstmNetwork::new(3, &[8], 4, 0.5, &mut rng);

        // 추론 경로는 dropout 없이 결정적이어야 함
        let window = Array2::from_elem((6, 3), 0.3);
        assert_eq!(network.predict(window.view()), network.predict(window.view()));
    }
}
