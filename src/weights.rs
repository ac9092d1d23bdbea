// AHP priority vector: normalize each column to sum 1, then average the rows.

use crate::models::Category;
use crate::parse::parse_lenient_f64;
use serde::{Deserialize, Serialize};

/// Square reciprocal comparison matrix. Cell `(i, j)` says how many times more
/// important item `i` is than item `j`; `(j, i)` always holds the reciprocal.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseMatrix {
    size: usize,
    cells: Vec<f64>,
}

impl PairwiseMatrix {
    /// All items equally important.
    pub fn neutral(size: usize) -> Self {
        Self {
            size,
            cells: vec![1.0; size * size],
        }
    }

    /// Number of cells strictly above the diagonal.
    pub fn upper_triangle_len(size: usize) -> usize {
        size * size.saturating_sub(1) / 2
    }

    /// Builds a matrix from raw upper-triangle cells in row-major order:
    /// `(0,1), (0,2), …, (0,n-1), (1,2), …`. Missing, unparseable, zero and
    /// negative cells are read as 1.
    pub fn from_upper_triangle<S: AsRef<str>>(size: usize, cells: &[S]) -> Self {
        let expected = Self::upper_triangle_len(size);
        if cells.len() > expected {
            log::warn!(
                "ignoring {} extra pairwise cells (expected {expected})",
                cells.len() - expected
            );
        }
        let mut matrix = Self::neutral(size);
        let mut raw = cells.iter();
        for i in 0..size {
            for j in (i + 1)..size {
                let value = raw
                    .next()
                    .and_then(|cell| parse_lenient_f64(cell.as_ref()))
                    .unwrap_or(1.0);
                matrix.compare(i, j, value);
            }
        }
        matrix
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.size + col]
    }

    /// Records that `i` is `value` times as important as `j`, and the
    /// reciprocal for `(j, i)`. The diagonal stays 1.
    pub fn compare(&mut self, i: usize, j: usize, value: f64) {
        if i == j || i >= self.size || j >= self.size {
            return;
        }
        let value = if value.is_finite() && value > 0.0 {
            value
        } else {
            1.0
        };
        self.cells[i * self.size + j] = value;
        self.cells[j * self.size + i] = 1.0 / value;
    }

    fn column_sums(&self) -> Vec<f64> {
        (0..self.size)
            .map(|col| (0..self.size).map(|row| self.get(row, col)).sum())
            .collect()
    }
}

/// Relative importance per category, index-aligned with [`Category::ALL`].
///
/// Both a vector summing to 1 and one summing to the matrix size are valid;
/// scoring only ever looks at ratios between weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    pub fn uniform(size: usize) -> Self {
        if size == 0 {
            return Self(Vec::new());
        }
        Self(vec![1.0 / size as f64; size])
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Weight of `category`; 0 when the vector is too short to cover it.
    pub fn weight(&self, category: Category) -> f64 {
        self.0.get(category.index()).copied().unwrap_or(0.0)
    }

    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        if sum <= 0.0 || !sum.is_finite() {
            return self.clone();
        }
        Self(self.0.iter().map(|w| w / sum).collect())
    }

    /// True when the vector can weight every category.
    pub fn fits_categories(&self) -> bool {
        self.0.len() == Category::COUNT
            && self.0.iter().all(|w| w.is_finite() && *w >= 0.0)
            && self.sum() > 0.0
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::uniform(Category::COUNT)
    }
}

pub fn compute_weights(matrix: &PairwiseMatrix, normalize: bool) -> WeightVector {
    let n = matrix.size();
    if n == 0 {
        return WeightVector::from_values(Vec::new());
    }
    let col_sums = matrix.column_sums();
    let raw: Vec<f64> = (0..n)
        .map(|row| {
            let row_total: f64 = (0..n).map(|col| matrix.get(row, col) / col_sums[col]).sum();
            row_total / n as f64
        })
        .collect();
    let weights = WeightVector::from_values(raw);
    log::debug!("computed weights {:?} (normalize={normalize})", weights.values());
    if normalize {
        weights.normalized()
    } else {
        weights
    }
}
