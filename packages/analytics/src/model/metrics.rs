//! Held-out classification metrics.

use crime_analysis_analytics_models::{ConfusionMatrix, EvaluationMetrics};

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Scores `predicted` against `actual`. Positive is violent; any ratio
/// with a zero denominator is 0.
#[must_use]
pub fn evaluate(predicted: &[bool], actual: &[bool], train_rows: usize) -> EvaluationMetrics {
    let mut confusion = ConfusionMatrix::default();
    for (&p, &a) in predicted.iter().zip(actual) {
        confusion.record(p, a);
    }

    let accuracy = ratio(
        confusion.true_positive + confusion.true_negative,
        confusion.total(),
    );
    let precision = ratio(
        confusion.true_positive,
        confusion.true_positive + confusion.false_positive,
    );
    let recall = ratio(
        confusion.true_positive,
        confusion.true_positive + confusion.false_negative,
    );
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvaluationMetrics {
        accuracy,
        precision,
        recall,
        f1,
        confusion,
        train_rows,
        test_rows: predicted.len().min(actual.len()),
    }
}
