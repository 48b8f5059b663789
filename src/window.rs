use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::ForecastError;
use crate::schema::TargetIndexSet;

/// The trailing `len` scaled feature rows the model conditions on.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceWindow {
    rows: Array2<f64>,
}

impl SequenceWindow {
    /// Seeds a window from the most recent `length` rows of `history`.
    pub fn seed(history: &Array2<f64>, length: usize) -> Result<Self, ForecastError> {
        let available = history.nrows();
        if length == 0 || available < length {
            return Err(ForecastError::InsufficientHistory {
                required: length,
                available,
            });
        }

        Ok(Self {
            rows: history.slice(s![available - length.., ..]).to_owned(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    pub fn width(&self) -> usize {
        self.rows.ncols()
    }

    pub fn rows(&self) -> &Array2<f64> {
        &self.rows
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.rows.view()
    }

    pub fn last_row(&self) -> ArrayView1<'_, f64> {
        self.rows.row(self.rows.nrows() - 1)
    }

    /// Target columns of every row, (len, targets).
    pub fn target_values(&self, targets: &TargetIndexSet) -> Array2<f64> {
        self.rows.select(Axis(1), targets.positions())
    }

    /// Builds the next day's window: the last row repeated `len` times with
    /// the target columns overwritten by `prediction`.
    ///
    /// `prediction` is (1, targets), broadcast to every row, or
    /// (len, targets), applied row by row.
    pub fn synthesize_next(&self, prediction: &Array2<f64>, targets: &TargetIndexSet) -> Result<Self, ForecastError> {
        let len = self.len();
        let (pred_rows, pred_cols) = prediction.dim();
        if pred_cols != targets.len() || (pred_rows != 1 && pred_rows != len) {
            return Err(ForecastError::ModelShape {
                rows: pred_rows,
                cols: pred_cols,
                window_len: len,
                targets: targets.len(),
            });
        }

        let baseline = self.last_row();
        let mut next = Array2::zeros((len, self.width()));
        for mut row in next.rows_mut() {
            row.assign(&baseline);
        }

        for (target, &column) in targets.positions().iter().enumerate() {
            let mut col = next.column_mut(column);
            if pred_rows == 1 {
                col.fill(prediction[[0, target]]);
            } else {
                col.assign(&prediction.column(target));
            }
        }

        Ok(Self { rows: next })
    }
}
