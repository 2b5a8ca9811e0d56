//! Classification metrics: per-class precision / recall / F1 and
//! the confusion matrix.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f32,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// Rows are true classes, columns predicted classes
    pub confusion_matrix: Vec<Vec<usize>>,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 { 0.0 } else { num as f32 / den as f32 }
}

impl ClassificationReport {
    pub fn compute(y_true: &[usize], y_pred: &[usize], labels: &[String]) -> Self {
        let n = labels.len();
        let mut confusion = vec![vec![0usize; n]; n];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t < n && p < n {
                confusion[t][p] += 1;
            }
        }

        let classes: Vec<ClassMetrics> = (0..n)
            .map(|c| {
                let tp = confusion[c][c];
                let support: usize = confusion[c].iter().sum();
                let predicted: usize = confusion.iter().map(|row| row[c]).sum();

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics { label: labels[c].clone(), precision, recall, f1, support }
            })
            .collect();

        let total: usize = classes.iter().map(|c| c.support).sum();
        let correct: usize = (0..n).map(|c| confusion[c][c]).sum();

        let average = |label: &str, weight: &dyn Fn(&ClassMetrics) -> f32, norm: f32| {
            let norm = if norm > 0.0 { norm } else { 1.0 };
            ClassMetrics {
                label: label.to_string(),
                precision: classes.iter().map(|c| c.precision * weight(c)).sum::<f32>() / norm,
                recall: classes.iter().map(|c| c.recall * weight(c)).sum::<f32>() / norm,
                f1: classes.iter().map(|c| c.f1 * weight(c)).sum::<f32>() / norm,
                support: total,
            }
        };

        let macro_avg = average("macro avg", &|_: &ClassMetrics| 1.0, n as f32);
        let weighted_avg = average("weighted avg", &|c: &ClassMetrics| c.support as f32, total as f32);

        Self {
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
            confusion_matrix: confusion,
            classes,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.classes.iter().map(|c| c.label.len()).max().unwrap_or(0).max(12);
        let row = |f: &mut fmt::Formatter<'_>, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )
        };

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for class in &self.classes {
            row(f, class)?;
        }
        writeln!(f)?;
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.macro_avg.support)?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted_avg)?;

        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows = true, columns = predicted):")?;
        for (label, counts) in self.classes.iter().zip(&self.confusion_matrix) {
            let cells: Vec<String> = counts.iter().map(|c| format!("{c:>6}")).collect();
            writeln!(f, "{:>width$} {}", label.label, cells.join(""))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["heavy".to_string(), "low".to_string()]
    }

    #[test]
    fn test_perfect_predictions() {
        let report = ClassificationReport::compute(&[0, 1, 1], &[0, 1, 1], &labels());
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.confusion_matrix, vec![vec![1, 0], vec![0, 2]]);
        assert_eq!(report.macro_avg.f1, 1.0);
    }

    #[test]
    fn test_precision_recall() {
        // true:  0 0 1 1
        // pred:  0 1 1 1
        let report = ClassificationReport::compute(&[0, 0, 1, 1], &[0, 1, 1, 1], &labels());

        assert_eq!(report.accuracy, 0.75);
        assert_eq!(report.classes[0].precision, 1.0);
        assert_eq!(report.classes[0].recall, 0.5);
        assert!((report.classes[1].precision - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(report.classes[1].recall, 1.0);
        assert_eq!(report.confusion_matrix, vec![vec![1, 1], vec![0, 2]]);
        assert_eq!(report.weighted_avg.support, 4);
    }

    #[test]
    fn test_class_never_predicted() {
        let report = ClassificationReport::compute(&[0, 1], &[1, 1], &labels());
        assert_eq!(report.classes[0].precision, 0.0);
        assert_eq!(report.classes[0].f1, 0.0);
    }

    #[test]
    fn test_display_lists_classes() {
        let report = ClassificationReport::compute(&[0, 1], &[0, 1], &labels());
        let text = report.to_string();
        assert!(text.contains("heavy"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("Confusion matrix"));
    }
}
