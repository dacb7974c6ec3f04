use std::sync::atomic::{AtomicUsize, Ordering};

static MATRIX_OPS: AtomicUsize = AtomicUsize::new(0);

pub fn reset_matrix_ops() {
    MATRIX_OPS.store(0, Ordering::SeqCst);
}

/// Number of matrix-vector products since the last reset.
pub fn matrix_ops_count() -> usize {
    MATRIX_OPS.load(Ordering::SeqCst)
}

pub(crate) fn inc_ops() {
    MATRIX_OPS.fetch_add(1, Ordering::SeqCst);
}

/// Dense row-major matrix. Rows are samples, columns are features.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(r: usize, c: usize) -> Self {
        Matrix {
            rows: r,
            cols: c,
            data: vec![0.0; r * c],
        }
    }

    pub fn from_vec(r: usize, c: usize, v: Vec<f64>) -> Self {
        assert_eq!(v.len(), r * c);
        Matrix {
            rows: r,
            cols: c,
            data: v,
        }
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        if rows.is_empty() {
            return Matrix::zeros(0, 0);
        }
        let cols = rows[0].len();
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            assert_eq!(row.len(), cols);
            data.extend_from_slice(row);
        }
        Matrix::from_vec(rows.len(), cols, data)
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, v: f64) {
        self.data[r * self.cols + c] = v;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// `X w` for the full matrix.
    pub fn matvec(&self, w: &[f64]) -> Vec<f64> {
        inc_ops();
        assert_eq!(self.cols, w.len());
        self.data.chunks(self.cols).map(|row| dot(row, w)).collect()
    }

    /// Largest squared row norm, the usual per-sample Lipschitz factor.
    pub fn max_row_norm_sq(&self) -> f64 {
        if self.cols == 0 {
            return 0.0;
        }
        self.data
            .chunks(self.cols)
            .map(norm_sq)
            .fold(0.0, f64::max)
    }

    /// Copy the selected rows into a new matrix, in the given order.
    pub fn select_rows(&self, idx: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(idx.len() * self.cols);
        for &i in idx {
            data.extend_from_slice(self.row(i));
        }
        Matrix::from_vec(idx.len(), self.cols, data)
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn norm_sq(a: &[f64]) -> f64 {
    dot(a, a)
}

/// `y += alpha * x`
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// `x - step * g`, the forward (gradient) half of a proximal step.
pub fn gradient_step(x: &[f64], step: f64, g: &[f64]) -> Vec<f64> {
    debug_assert_eq!(x.len(), g.len());
    x.iter().zip(g).map(|(&xi, &gi)| xi - step * gi).collect()
}

/// `(1 - gamma) * a + gamma * b`
pub fn lerp(a: &[f64], b: &[f64], gamma: f64) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&ai, &bi)| (1.0 - gamma) * ai + gamma * bi)
        .collect()
}

pub fn all_finite(a: &[f64]) -> bool {
    a.iter().all(|x| x.is_finite())
}
