//! Feature scaling

use crate::error::{CarPriceError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Z-score scaler over matrix columns: `(x - mean) / std`
///
/// The standard deviation is the population one. Columns with zero spread get
/// a scale of 1 so constants pass through unchanged (minus the mean).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    with_mean: bool,
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            with_mean: true,
            mean: None,
            scale: None,
        }
    }

    /// Scale only, keep zeros at zero
    pub fn without_mean() -> Self {
        Self {
            with_mean: false,
            ..Self::new()
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.scale.is_some()
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(CarPriceError::Data(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| CarPriceError::Data("cannot compute column means".to_string()))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(CarPriceError::NotFitted("StandardScaler".to_string())),
        };
        if x.ncols() != scale.len() {
            return Err(CarPriceError::Shape {
                expected: format!("{} columns", scale.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.to_owned();
        if self.with_mean {
            out -= mean;
        }
        out /= scale;
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
