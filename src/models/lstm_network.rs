use ndarray::{Array2, ArrayView2};

use crate::layers::lstm_cell::LSTMCell;

/// Hidden and cell state of every layer after a pass over a sequence.
#[derive(Clone, Debug)]
pub struct NetworkState {
    pub hidden: Vec<Array2<f64>>,
    pub cell: Vec<Array2<f64>>,
}

impl NetworkState {
    fn zeros(num_layers: usize, hidden_size: usize) -> Self {
        Self {
            hidden: vec![Array2::zeros((hidden_size, 1)); num_layers],
            cell: vec![Array2::zeros((hidden_size, 1)); num_layers],
        }
    }

    /// Hidden state of the top layer.
    pub fn top_hidden(&self) -> Option<&Array2<f64>> {
        self.hidden.last()
    }
}

/// Multi-layer LSTM network for sequence modeling
///
/// Stacks multiple LSTM cells where the output of layer i becomes
/// the input to layer i+1. Each layer carries its own hidden and cell
/// state across timesteps.
#[derive(Clone, Debug)]
pub struct LSTMNetwork {
    cells: Vec<LSTMCell>,
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
}

impl LSTMNetwork {
    /// Creates a new multi-layer LSTM network
    ///
    /// First layer accepts `input_size` dimensions, subsequent layers
    /// accept `hidden_size` dimensions from the previous layer.
    pub fn new(input_size: usize, hidden_size: usize, num_layers: usize) -> Self {
        let cells = (0..num_layers)
            .map(|i| {
                let layer_input_size = if i == 0 { input_size } else { hidden_size };
                LSTMCell::new(layer_input_size, hidden_size)
            })
            .collect();

        LSTMNetwork {
            cells,
            input_size,
            hidden_size,
            num_layers,
        }
    }

    /// Creates a network from existing cells (used for deserialization)
    pub fn from_cells(cells: Vec<LSTMCell>, input_size: usize, hidden_size: usize, num_layers: usize) -> Self {
        LSTMNetwork {
            cells,
            input_size,
            hidden_size,
            num_layers,
        }
    }

    /// Get reference to the cells (used for serialization)
    pub fn get_cells(&self) -> &[LSTMCell] {
        &self.cells
    }

    /// True when layer count and every cell's shape match the declared sizes.
    pub fn is_consistent(&self) -> bool {
        self.cells.len() == self.num_layers
            && self.cells.iter().enumerate().all(|(i, cell)| {
                let expected_input = if i == 0 { self.input_size } else { self.hidden_size };
                cell.is_consistent() && cell.hidden_size == self.hidden_size && cell.input_size() == expected_input
            })
    }

    /// One timestep through every layer, updating `state` in place.
    pub fn step(&self, input: &Array2<f64>, state: &mut NetworkState) {
        let mut current_input = input.clone();

        for (layer, cell) in self.cells.iter().enumerate() {
            let (hy, cy) = cell.forward(&current_input, &state.hidden[layer], &state.cell[layer]);
            current_input = hy.clone();
            state.hidden[layer] = hy;
            state.cell[layer] = cy;
        }
    }

    /// Runs the network over a (timesteps, input_size) matrix, one row per
    /// timestep, starting from zero state.
    pub fn forward_sequence(&self, sequence: ArrayView2<f64>) -> NetworkState {
        let mut state = NetworkState::zeros(self.num_layers, self.hidden_size);

        for row in sequence.rows() {
            let input = row.to_owned().insert_axis(ndarray::Axis(1));
            self.step(&input, &mut state);
        }

        state
    }
}
