//! Ordinary least squares with intercept.

use serde::Serialize;

/// `y ≈ intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OlsFit {
    pub slope: f64,
    pub intercept: f64,
}

impl OlsFit {
    /// Fit `y` on `x`. Both slices have the same, non-zero length.
    ///
    /// A constant regressor `c` has no unique solution; the minimum-norm
    /// least-squares solution is returned instead:
    /// `slope = ȳ·c / (1 + c²)`, `intercept = ȳ / (1 + c²)`.
    pub fn fit(x: &[f64], y: &[f64]) -> Self {
        debug_assert_eq!(x.len(), y.len());
        debug_assert!(!x.is_empty());

        let n = x.len() as f64;
        let mean_x = x.iter().sum::<f64>() / n;
        let mean_y = y.iter().sum::<f64>() / n;

        let constant = x.iter().all(|&v| v == x[0]);
        let (mut sxx, mut sxy) = (0.0, 0.0);
        if !constant {
            for (&xi, &yi) in x.iter().zip(y) {
                let dx = xi - mean_x;
                sxx += dx * dx;
                sxy += dx * (yi - mean_y);
            }
        }

        if constant || sxx == 0.0 {
            let c = x[0];
            let norm = 1.0 + c * c;
            return Self {
                slope: mean_y * c / norm,
                intercept: mean_y / norm,
            };
        }

        let slope = sxy / sxx;
        Self {
            slope,
            intercept: mean_y - slope * mean_x,
        }
    }
}
