/// Single-timestep LSTM cell.
pub mod lstm_cell;

/// Dense output head.
pub mod linear;
