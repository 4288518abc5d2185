//! Held-out evaluation: accuracy plus a per-class precision/recall/F1 report.
//!
//! Diagnostic only. A poor report never prevents a model from being saved.

use ndarray::Array1;
use recommender_types::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Number of true samples of this class.
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub correct_count: usize,
    pub total_count: usize,
    /// Rows are actual classes, columns predicted classes.
    pub confusion: Vec<Vec<usize>>,
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
}

impl ClassificationReport {
    /// Build the report from encoded predictions and actuals.
    ///
    /// Classes without support are kept so the table lists every known label.
    pub fn from_predictions(
        predictions: &Array1<usize>,
        actuals: &Array1<usize>,
        labels: &[String],
    ) -> Result<Self> {
        if predictions.len() != actuals.len() {
            bail!(
                "Got {} predictions for {} actual values",
                predictions.len(),
                actuals.len()
            );
        }
        if actuals.is_empty() {
            bail!("Cannot evaluate on an empty test set");
        }

        let n_classes = labels.len();
        let mut confusion = vec![vec![0usize; n_classes]; n_classes];
        for (&pred, &actual) in predictions.iter().zip(actuals.iter()) {
            if pred >= n_classes || actual >= n_classes {
                bail!("Class index out of range for {} labels", n_classes);
            }
            confusion[actual][pred] += 1;
        }

        let total_count = actuals.len();
        let correct_count: usize = (0..n_classes).map(|i| confusion[i][i]).sum();

        let mut classes = Vec::with_capacity(n_classes);
        for (class_idx, label) in labels.iter().enumerate() {
            let true_positive = confusion[class_idx][class_idx];
            let predicted: usize = (0..n_classes).map(|i| confusion[i][class_idx]).sum();
            let support: usize = confusion[class_idx].iter().sum();

            let precision = ratio(true_positive, predicted);
            let recall = ratio(true_positive, support);
            classes.push(ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1_score: f1(precision, recall),
                support,
            });
        }

        let macro_avg = average(&classes, |_| 1.0);
        let weighted_avg = average(&classes, |c| c.support as f64);

        Ok(ClassificationReport {
            accuracy: correct_count as f64 / total_count as f64,
            correct_count,
            total_count,
            confusion,
            classes,
            macro_avg,
            weighted_avg,
        })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 { num as f64 / den as f64 } else { 0.0 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

fn average(classes: &[ClassMetrics], weight: impl Fn(&ClassMetrics) -> f64) -> AveragedMetrics {
    let total: f64 = classes.iter().map(&weight).sum();
    if total == 0.0 {
        return AveragedMetrics {
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
        };
    }
    let avg = |field: fn(&ClassMetrics) -> f64| {
        classes.iter().map(|c| field(c) * weight(c)).sum::<f64>() / total
    };
    AveragedMetrics {
        precision: avg(|c| c.precision),
        recall: avg(|c| c.recall),
        f1_score: avg(|c| c.f1_score),
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9}",
                c.label, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9.2}  {:>9}",
            "accuracy", "", "", self.accuracy, self.total_count
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9}",
                name, avg.precision, avg.recall, avg.f1_score, self.total_count
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    #[test]
    fn test_perfect_predictions() {
        let actual = array![0, 1, 2, 1];
        let report = ClassificationReport::from_predictions(&actual, &actual, &labels()).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.correct_count, 4);
        for c in &report.classes {
            assert_eq!(c.precision, 1.0);
            assert_eq!(c.recall, 1.0);
            assert_eq!(c.f1_score, 1.0);
        }
        assert_eq!(report.classes[1].support, 2);
    }

    #[test]
    fn test_per_class_metrics() {
        // actual:    A A B B C
        // predicted: A B B B A
        let actual = array![0, 0, 1, 1, 2];
        let predicted = array![0, 1, 1, 1, 0];
        let report =
            ClassificationReport::from_predictions(&predicted, &actual, &labels()).unwrap();

        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(report.confusion[0], vec![1, 1, 0]);
        assert_eq!(report.confusion[2], vec![1, 0, 0]);

        let a = &report.classes[0];
        assert!((a.precision - 0.5).abs() < 1e-12);
        assert!((a.recall - 0.5).abs() < 1e-12);

        let b = &report.classes[1];
        assert!((b.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(b.recall, 1.0);
        assert!((b.f1_score - 0.8).abs() < 1e-12);

        let c = &report.classes[2];
        assert_eq!(c.precision, 0.0);
        assert_eq!(c.f1_score, 0.0);

        let expected_macro_recall = (0.5 + 1.0 + 0.0) / 3.0;
        assert!((report.macro_avg.recall - expected_macro_recall).abs() < 1e-12);
        // weighted recall equals accuracy
        assert!((report.weighted_avg.recall - report.accuracy).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let result =
            ClassificationReport::from_predictions(&array![0, 1], &array![0], &labels());
        assert!(result.is_err());
    }

    #[test]
    fn test_display_lists_every_label() {
        let actual = array![0, 1, 2];
        let report = ClassificationReport::from_predictions(&actual, &actual, &labels()).unwrap();
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        for label in labels() {
            assert!(text.lines().any(|l| l.trim_start().starts_with(&label)));
        }
    }
}
