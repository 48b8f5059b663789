/// Numeric helpers shared by the network layers and the step predictor.

/// Sigmoid activation function: σ(x) = 1 / (1 + e^(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Number of NaN or infinite entries in `values`.
pub fn count_non_finite<'a, I>(values: I) -> usize
where
    I: IntoIterator<Item = &'a f64>,
{
    values.into_iter().filter(|v| !v.is_finite()).count()
}
