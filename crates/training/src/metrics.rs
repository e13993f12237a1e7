//! Confusion matrix and per-class precision/recall/F1.
//!
//! Undefined ratios (no predicted or no actual members of a class) count as 0.0.

use serde::Serialize;
use std::fmt;

/// Counts indexed `[actual][predicted]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    num_classes: usize,
    counts: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinarySummary {
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub tn: u64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn ratio(num: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            counts: vec![0; num_classes * num_classes],
        }
    }

    /// Build from paired labels. The class count grows to cover every label seen.
    pub fn from_predictions(actual: &[i64], predicted: &[i64], num_classes: usize) -> Self {
        let seen = actual
            .iter()
            .chain(predicted)
            .copied()
            .max()
            .map(|m| (m.max(0) + 1) as usize)
            .unwrap_or(0);
        let mut cm = Self::new(num_classes.max(seen));
        for (a, p) in actual.iter().zip(predicted) {
            cm.record(*a, *p);
        }
        cm
    }

    /// Negative labels are ignored.
    pub fn record(&mut self, actual: i64, predicted: i64) {
        if actual < 0 || predicted < 0 {
            return;
        }
        let (a, p) = (actual as usize, predicted as usize);
        if a >= self.num_classes || p >= self.num_classes {
            self.grow(a.max(p) + 1);
        }
        self.counts[a * self.num_classes + p] += 1;
    }

    fn grow(&mut self, num_classes: usize) {
        let mut grown = Self::new(num_classes);
        for a in 0..self.num_classes {
            for p in 0..self.num_classes {
                grown.counts[a * num_classes + p] = self.get(a, p);
            }
        }
        *self = grown;
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn get(&self, actual: usize, predicted: usize) -> u64 {
        if actual >= self.num_classes || predicted >= self.num_classes {
            return 0;
        }
        self.counts[actual * self.num_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn correct(&self) -> u64 {
        (0..self.num_classes).map(|c| self.get(c, c)).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Row sum: samples whose true label is `class`.
    pub fn support(&self, class: usize) -> u64 {
        (0..self.num_classes).map(|p| self.get(class, p)).sum()
    }

    /// Column sum: samples predicted as `class`.
    pub fn predicted(&self, class: usize) -> u64 {
        (0..self.num_classes).map(|a| self.get(a, class)).sum()
    }

    pub fn class_metrics(&self, class: usize) -> ClassMetrics {
        let tp = self.get(class, class);
        let precision = ratio(tp, self.predicted(class));
        let recall = ratio(tp, self.support(class));
        ClassMetrics {
            precision,
            recall,
            f1: f1(precision, recall),
            support: self.support(class),
        }
    }

    /// One-vs-rest counts for `positive`.
    pub fn binary(&self, positive: usize) -> BinarySummary {
        let tp = self.get(positive, positive);
        let fp = self.predicted(positive) - tp;
        let fn_ = self.support(positive) - tp;
        let tn = self.total() - tp - fp - fn_;
        let m = self.class_metrics(positive);
        BinarySummary {
            tp,
            fp,
            fn_,
            tn,
            precision: m.precision,
            recall: m.recall,
            f1: m.f1,
        }
    }

    /// Rows `actual <name>`, columns `pred <name>`.
    pub fn render(&self, names: &[String]) -> String {
        let name = |c: usize| names.get(c).cloned().unwrap_or_else(|| c.to_string());
        let col_labels: Vec<String> = (0..self.num_classes)
            .map(|c| format!("pred {}", name(c)))
            .collect();
        let row_labels: Vec<String> = (0..self.num_classes)
            .map(|c| format!("actual {}", name(c)))
            .collect();
        let row_w = row_labels.iter().map(String::len).max().unwrap_or(0);
        let widest_count = self.counts.iter().max().copied().unwrap_or(0);
        let col_w = col_labels
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(widest_count.to_string().len());

        let mut out = format!("{:row_w$}", "");
        for label in &col_labels {
            out.push_str(&format!("  {label:>col_w$}"));
        }
        out.push('\n');
        for (a, label) in row_labels.iter().enumerate() {
            out.push_str(&format!("{label:<row_w$}"));
            for p in 0..self.num_classes {
                out.push_str(&format!("  {:>col_w$}", self.get(a, p)));
            }
            out.push('\n');
        }
        out
    }
}

/// Per-class table with accuracy, macro and support-weighted averages.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<(String, ClassMetrics)>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub total: u64,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix, names: &[String]) -> Self {
        let classes: Vec<(String, ClassMetrics)> = (0..cm.num_classes())
            .map(|c| {
                let name = names.get(c).cloned().unwrap_or_else(|| c.to_string());
                (name, cm.class_metrics(c))
            })
            .collect();
        let total = cm.total();
        let n = classes.len().max(1) as f64;

        let mut macro_avg = ClassMetrics {
            support: total,
            ..Default::default()
        };
        let mut weighted_avg = macro_avg;
        for (_, m) in &classes {
            macro_avg.precision += m.precision / n;
            macro_avg.recall += m.recall / n;
            macro_avg.f1 += m.f1 / n;
            let w = ratio(m.support, total);
            weighted_avg.precision += m.precision * w;
            weighted_avg.recall += m.recall * w;
            weighted_avg.f1 += m.f1 * w;
        }

        Self {
            classes,
            accuracy: cm.accuracy(),
            macro_avg,
            weighted_avg,
            total,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_w = self
            .classes
            .iter()
            .map(|(name, _)| name.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);
        writeln!(
            f,
            "{:>name_w$} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in &self.classes {
            writeln!(
                f,
                "{name:>name_w$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>name_w$} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        for (label, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{label:>name_w$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}
