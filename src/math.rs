use na::{Matrix3, Matrix3xX, Vector3};

pub trait ApproxEqual {
    type Epsilon: Copy;
    fn approx_eq(&self, other: Self, eps: Self::Epsilon) -> bool;
    fn default_epsilon() -> Self::Epsilon;
}

impl ApproxEqual for f64 {
    type Epsilon = f64;

    fn approx_eq(&self, other: Self, eps: Self::Epsilon) -> bool {
        (self - other).abs() < eps
    }

    fn default_epsilon() -> Self::Epsilon {
        1e-8
    }
}

/// Returns the first off-diagonal element that is not zero within `eps`, if any.
pub fn first_off_diagonal(a_matrix: &Matrix3<f64>, eps: f64) -> Option<(usize, usize, f64)> {
    for row in 0..3 {
        for col in 0..3 {
            if row != col && !a_matrix[(row, col)].approx_eq(0.0, eps) {
                return Some((row, col, a_matrix[(row, col)]));
            }
        }
    }
    None
}

pub fn is_diagonal(a_matrix: &Matrix3<f64>) -> bool {
    first_off_diagonal(a_matrix, f64::default_epsilon()).is_none()
}

/// Stacks `columns` into a 3×N matrix. No columns gives a 3×0 matrix.
pub fn matrix_from_columns(columns: &[Vector3<f64>]) -> Matrix3xX<f64> {
    if columns.is_empty() {
        return Matrix3xX::zeros(0);
    }
    Matrix3xX::from_columns(columns)
}

/// Rounds `value` through single precision.
pub fn round_to_f32(value: f64) -> f64 {
    value as f32 as f64
}
