use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

/// Fully connected output head.
///
/// Performs `output = weight · input + bias` where weight has shape
/// (output_size, input_size) and bias has shape (output_size, 1).
#[derive(Clone, Debug)]
pub struct LinearLayer {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
    pub input_size: usize,
    pub output_size: usize,
}

impl LinearLayer {
    /// Xavier/Glorot uniform initialisation
    pub fn new(input_size: usize, output_size: usize) -> Self {
        let range = (2.0 / (input_size + output_size) as f64).sqrt();

        Self {
            weight: Array2::random((output_size, input_size), Uniform::new(-range, range)),
            bias: Array2::zeros((output_size, 1)),
            input_size,
            output_size,
        }
    }

    /// Builds a layer from trained parameters. Returns `None` when the bias is
    /// not shaped (output_size, 1).
    pub fn from_weights(weight: Array2<f64>, bias: Array2<f64>) -> Option<Self> {
        let (output_size, input_size) = weight.dim();
        if bias.dim() != (output_size, 1) {
            return None;
        }

        Some(Self {
            weight,
            bias,
            input_size,
            output_size,
        })
    }

    /// `input` is (input_size, batch); returns (output_size, batch).
    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        &self.weight.dot(input) + &self.bias
    }

    /// Applies the layer to one column vector and returns a flat row.
    pub fn forward_vector(&self, input: &Array2<f64>) -> Array1<f64> {
        self.forward(input).column(0).to_owned()
    }

    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}
