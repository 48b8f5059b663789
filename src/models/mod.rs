/// Stacked LSTM network.
pub mod lstm_network;

/// LSTM network with a dense head, usable as a forecasting sequence model.
pub mod regressor;
