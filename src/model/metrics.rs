//! Classification metrics: accuracy, per-class report and confusion matrix

use crate::model::ModelError;
use serde::Serialize;
use std::fmt;

/// Binary confusion matrix; rows are actual classes, columns predicted (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[f64], predicted: &[f64]) -> Result<Self, ModelError> {
        if actual.len() != predicted.len() {
            return Err(ModelError::DimensionMismatch {
                expected: actual.len(),
                got: predicted.len(),
            });
        }

        let mut matrix = [[0usize; 2]; 2];
        for (&a, &p) in actual.iter().zip(predicted) {
            matrix[usize::from(a > 0.5)][usize::from(p > 0.5)] += 1;
        }
        Ok(Self { matrix })
    }

    pub fn true_negatives(&self) -> usize {
        self.matrix[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.matrix[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.matrix[1][0]
    }

    pub fn true_positives(&self) -> usize {
        self.matrix[1][1]
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_negatives() + self.true_positives()) as f64 / total as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .matrix
            .iter()
            .flatten()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1);
        let [[tn, fp], [fn_, tp]] = self.matrix;
        writeln!(f, "[[{:>w$} {:>w$}]", tn, fp, w = width)?;
        write!(f, " [{:>w$} {:>w$}]]", fn_, tp, w = width)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 with macro and weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = (0..2)
            .map(|c| {
                let tp = cm.matrix[c][c];
                let predicted = cm.matrix[0][c] + cm.matrix[1][c];
                let support = cm.matrix[c][0] + cm.matrix[c][1];
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: c.to_string(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let total = cm.total();
        let average = |label: &str, weight: &dyn Fn(&ClassMetrics) -> f64, norm: f64| {
            let norm = if norm > 0.0 { norm } else { 1.0 };
            ClassMetrics {
                label: label.to_string(),
                precision: classes.iter().map(|m| weight(m) * m.precision).sum::<f64>() / norm,
                recall: classes.iter().map(|m| weight(m) * m.recall).sum::<f64>() / norm,
                f1: classes.iter().map(|m| weight(m) * m.f1).sum::<f64>() / norm,
                support: total,
            }
        };

        let macro_avg = average("macro avg", &|_| 1.0, classes.len() as f64);
        let weighted_avg = average("weighted avg", &|m| m.support as f64, total as f64);

        Self {
            accuracy: cm.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for m in [&self.macro_avg, &self.weighted_avg] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

/// Held-out evaluation of one fitted model.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub model: String,
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
}

impl Evaluation {
    pub fn new(model: &str, actual: &[f64], predicted: &[f64]) -> Result<Self, ModelError> {
        let confusion = ConfusionMatrix::from_labels(actual, predicted)?;
        let report = ClassificationReport::from_confusion(&confusion);
        Ok(Self {
            model: model.to_string(),
            accuracy: confusion.accuracy(),
            report,
            confusion,
        })
    }
}
