use ndarray::{s, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use crate::utils::sigmoid;

/// LSTM cell holding trained parameters, evaluated in inference mode only.
///
/// Implements the standard LSTM equations:
/// - i_t = σ(W_xi * x_t + W_hi * h_t-1 + b_i)
/// - f_t = σ(W_xf * x_t + W_hf * h_t-1 + b_f)
/// - g_t = tanh(W_xg * x_t + W_hg * h_t-1 + b_g)
/// - o_t = σ(W_xo * x_t + W_ho * h_t-1 + b_o)
/// - c_t = f_t ⊙ c_t-1 + i_t ⊙ g_t
/// - h_t = o_t ⊙ tanh(c_t)
#[derive(Clone, Debug)]
pub struct LSTMCell {
    pub w_ih: Array2<f64>,  // input-to-hidden weights (4*hidden_size, input_size)
    pub w_hh: Array2<f64>,  // hidden-to-hidden weights (4*hidden_size, hidden_size)
    pub b_ih: Array2<f64>,  // input-to-hidden bias (4*hidden_size, 1)
    pub b_hh: Array2<f64>,  // hidden-to-hidden bias (4*hidden_size, 1)
    pub hidden_size: usize,
}

impl LSTMCell {
    /// Creates a cell with uniform random weights in [-0.1, 0.1) and zero biases
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        let dist = Uniform::new(-0.1, 0.1);

        LSTMCell {
            w_ih: Array2::random((4 * hidden_size, input_size), dist),
            w_hh: Array2::random((4 * hidden_size, hidden_size), dist),
            b_ih: Array2::zeros((4 * hidden_size, 1)),
            b_hh: Array2::zeros((4 * hidden_size, 1)),
            hidden_size,
        }
    }

    pub fn input_size(&self) -> usize {
        self.w_ih.ncols()
    }

    /// Checks that all parameter matrices agree with `hidden_size`.
    pub fn is_consistent(&self) -> bool {
        let gates = 4 * self.hidden_size;
        self.w_ih.nrows() == gates
            && self.w_hh.dim() == (gates, self.hidden_size)
            && self.b_ih.dim() == (gates, 1)
            && self.b_hh.dim() == (gates, 1)
    }

    /// One timestep. `input` is (input_size, 1), `hx`/`cx` are (hidden_size, 1).
    pub fn forward(&self, input: &Array2<f64>, hx: &Array2<f64>, cx: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        let h = self.hidden_size;

        // All gates at once: [input_gate, forget_gate, cell_gate, output_gate]
        let gates = &self.w_ih.dot(input) + &self.b_ih + &self.w_hh.dot(hx) + &self.b_hh;

        let input_gate = gates.slice(s![0..h, ..]).map(|&x| sigmoid(x));
        let forget_gate = gates.slice(s![h..2 * h, ..]).map(|&x| sigmoid(x));
        let cell_gate = gates.slice(s![2 * h..3 * h, ..]).map(|&x| x.tanh());
        let output_gate = gates.slice(s![3 * h..4 * h, ..]).map(|&x| sigmoid(x));

        let cy = &forget_gate * cx + &input_gate * &cell_gate;
        let hy = &output_gate * &cy.map(|&x| x.tanh());

        (hy, cy)
    }
}
