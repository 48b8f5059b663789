use ndarray::{Array2, ArrayView2, Axis};

use crate::layers::linear::LinearLayer;
use crate::models::lstm_network::LSTMNetwork;
use crate::predictor::SequenceModel;

/// Stacked LSTM followed by a dense head on the final hidden state.
///
/// Maps a (timesteps, input_size) window to a single (1, output_size) row,
/// which is how the chunk forecaster expects a trained model to behave.
#[derive(Clone, Debug)]
pub struct LstmRegressor {
    network: LSTMNetwork,
    head: LinearLayer,
}

impl LstmRegressor {
    /// Randomly initialised regressor, mostly useful for demos and tests.
    pub fn new(input_size: usize, hidden_size: usize, num_layers: usize, output_size: usize) -> Self {
        Self {
            network: LSTMNetwork::new(input_size, hidden_size, num_layers),
            head: LinearLayer::new(hidden_size, output_size),
        }
    }

    /// Combines trained parts. Returns `None` when the head does not consume
    /// the network's hidden size or the network itself is malformed.
    pub fn from_parts(network: LSTMNetwork, head: LinearLayer) -> Option<Self> {
        if head.input_size != network.hidden_size || !network.is_consistent() {
            return None;
        }
        Some(Self { network, head })
    }

    pub fn network(&self) -> &LSTMNetwork {
        &self.network
    }

    pub fn head(&self) -> &LinearLayer {
        &self.head
    }
}

impl SequenceModel for LstmRegressor {
    fn input_size(&self) -> usize {
        self.network.input_size
    }

    fn output_size(&self) -> usize {
        self.head.output_size
    }

    fn infer(&self, window: ArrayView2<f64>) -> Array2<f64> {
        let state = self.network.forward_sequence(window);
        match state.top_hidden() {
            Some(hidden) => self.head.forward_vector(hidden).insert_axis(Axis(0)),
            // zero-layer network: head sees a zero hidden state
            None => self
                .head
                .forward_vector(&Array2::zeros((self.network.hidden_size, 1)))
                .insert_axis(Axis(0)),
        }
    }
}
