//! Logistic Regression for binary classification
//!
//! Batch gradient descent on standardized features with an L2 penalty.
//! The penalty follows the inverse-strength convention: with `c = 1.0` the
//! objective is `0.5 * ||w||^2 + c * sum(log_loss)`, averaged over samples.

use crate::model::ModelError;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Logistic regression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Maximum gradient steps
    pub max_iter: usize,
    /// Stop when the loss changes by less than this
    pub tolerance: f64,
    /// Inverse L2 regularization strength
    pub c: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-6,
            c: 1.0,
        }
    }
}

/// Logistic Regression classifier
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    config: LogisticConfig,
    /// Fitted coefficients, in standardized feature space
    coefficients: Option<Array1<f64>>,
    intercept: Option<f64>,
    means: Option<Array1<f64>>,
    scales: Option<Array1<f64>>,
    /// Loss history during training
    pub cost_history: Vec<f64>,
    /// Whether the tolerance was reached before `max_iter`
    pub converged: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticConfig::default())
    }
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            coefficients: None,
            intercept: None,
            means: None,
            scales: None,
            cost_history: Vec::new(),
            converged: false,
        }
    }

    /// Sigmoid activation function
    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let exp_z = z.exp();
            exp_z / (1.0 + exp_z)
        }
    }

    /// Compute log loss (binary cross-entropy)
    fn log_loss(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let eps = 1e-15;
        let n = y_true.len() as f64;

        -y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&y, &p)| {
                let p_clipped = p.clamp(eps, 1.0 - eps);
                y * p_clipped.ln() + (1.0 - y) * (1.0 - p_clipped).ln()
            })
            .sum::<f64>()
            / n
    }

    fn standardize(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        let (means, scales) = match (&self.means, &self.scales) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(ModelError::NotFitted),
        };
        if x.ncols() != means.len() {
            return Err(ModelError::DimensionMismatch {
                expected: means.len(),
                got: x.ncols(),
            });
        }
        Ok((x - means) / scales)
    }

    /// Fit using gradient descent
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        let n = x.nrows();
        if n == 0 {
            return Err(ModelError::InsufficientData {
                required: 1,
                found: 0,
            });
        }
        if y.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                got: y.len(),
            });
        }
        let n_samples = n as f64;

        let means = x.mean_axis(Axis(0)).ok_or(ModelError::NotFitted)?;
        // Constant columns are only centered
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        self.means = Some(means);
        self.scales = Some(scales);
        let xs = self.standardize(x)?;

        let alpha = 1.0 / (self.config.c * n_samples);
        // Step size from the Lipschitz bound of the averaged loss gradient
        let lipschitz = 0.25 * xs.iter().map(|v| v * v).sum::<f64>() / n_samples + 0.25 + alpha;
        let learning_rate = 1.0 / lipschitz;

        let mut weights = Array1::<f64>::zeros(xs.ncols());
        let mut bias = 0.0;

        self.cost_history.clear();
        self.converged = false;

        for iter in 0..self.config.max_iter {
            let linear = xs.dot(&weights) + bias;
            let predictions = linear.mapv(Self::sigmoid);

            let errors = &predictions - y;
            let dw = xs.t().dot(&errors) / n_samples + &weights * alpha;
            let db = errors.sum() / n_samples;

            weights = &weights - &(dw * learning_rate);
            bias -= learning_rate * db;

            let cost = Self::log_loss(y, &predictions)
                + 0.5 * alpha * weights.iter().map(|w| w * w).sum::<f64>();
            self.cost_history.push(cost);

            if iter > 0 && (self.cost_history[iter - 1] - cost).abs() < self.config.tolerance {
                debug!(iterations = iter + 1, "Logistic regression converged");
                self.converged = true;
                break;
            }
        }

        if !self.converged {
            warn!(
                max_iter = self.config.max_iter,
                "Logistic regression stopped before reaching tolerance"
            );
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(ModelError::Diverged("logistic regression"));
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);

        Ok(())
    }

    /// Predict probabilities of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let weights = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        let bias = self.intercept.ok_or(ModelError::NotFitted)?;

        let xs = self.standardize(x)?;
        Ok((xs.dot(weights) + bias).mapv(Self::sigmoid))
    }

    /// Predict class labels (0 or 1)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn iterations(&self) -> usize {
        self.cost_history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let base = i as f64;
            if j == 0 {
                base
            } else {
                (base * 0.37).sin() * 5.0 + 100.0
            }
        });
        let y = Array1::from_shape_fn(n, |i| if i >= n / 2 { 1.0 } else { 0.0 });
        (x, y)
    }

    #[test]
    fn test_fit_separable_data() {
        let (x, y) = separable();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        let correct = pred.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        let accuracy = correct as f64 / y.len() as f64;
        assert!(accuracy > 0.9, "accuracy {}", accuracy);

        // Loss decreases from the all-zero start
        assert!(model.cost_history.last().unwrap() < &model.cost_history[0]);
        assert!(model.iterations() <= 1000);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = separable();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LogisticRegression::default();
        let x = Array2::zeros((1, 2));
        assert!(matches!(model.predict(&x), Err(ModelError::NotFitted)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let (x, y) = separable();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        let wrong = Array2::zeros((3, 5));
        assert!(matches!(
            model.predict(&wrong),
            Err(ModelError::DimensionMismatch { expected: 2, got: 5 })
        ));
    }
}
