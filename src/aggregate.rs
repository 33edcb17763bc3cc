//! # Aggregator
//! Folds classification results into batch statistics.
//!
//! `BatchTally` is the partial (combinable) form; `BatchStatistics` is the
//! finished, serializable one. Confidences are summed in fixed-point
//! millionths so partial tallies combine exactly in any grouping or order.

use serde::{Deserialize, Serialize};
use std::iter::Sum;

use crate::classifier::ClassificationResult;
use crate::policy::Label;

const CONFIDENCE_SCALE: f64 = 1_000_000.0;

/// Partial statistics over some subset of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub errors: u64,
    /// Sum of non-error confidences, in millionths.
    confidence_micros: u64,
}

impl BatchTally {
    pub fn record(&mut self, result: &ClassificationResult) {
        self.total += 1;
        match result.label {
            Label::Positive => self.positive += 1,
            Label::Negative => self.negative += 1,
            Label::Undetermined => self.neutral += 1,
            Label::Error => {
                self.errors += 1;
                return;
            }
        }
        self.confidence_micros += to_micros(result.confidence);
    }

    /// Field-wise sum of two disjoint partial tallies.
    pub fn combine(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            positive: self.positive + other.positive,
            negative: self.negative + other.negative,
            neutral: self.neutral + other.neutral,
            errors: self.errors + other.errors,
            confidence_micros: self.confidence_micros + other.confidence_micros,
        }
    }

    pub fn finish(&self) -> BatchStatistics {
        let scored = self.total - self.errors;
        let avg_confidence = if scored == 0 {
            0.0
        } else {
            (self.confidence_micros as f64 / scored as f64 / CONFIDENCE_SCALE) as f32
        };
        BatchStatistics {
            total: self.total,
            positive: self.positive,
            negative: self.negative,
            neutral: self.neutral,
            errors: self.errors,
            avg_confidence,
        }
    }
}

fn to_micros(confidence: f32) -> u64 {
    (f64::from(confidence.clamp(0.0, 1.0)) * CONFIDENCE_SCALE).round() as u64
}

impl<'a> FromIterator<&'a ClassificationResult> for BatchTally {
    fn from_iter<I: IntoIterator<Item = &'a ClassificationResult>>(iter: I) -> Self {
        let mut tally = BatchTally::default();
        for r in iter {
            tally.record(r);
        }
        tally
    }
}

impl Sum for BatchTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(BatchTally::default(), BatchTally::combine)
    }
}

/// Summary of a batch. `total == positive + negative + neutral + errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub errors: u64,
    /// Mean confidence of non-error results; 0 when there are none.
    pub avg_confidence: f32,
}

/// Fold an ordered sequence of results into statistics.
pub fn fold<'a, I>(results: I) -> BatchStatistics
where
    I: IntoIterator<Item = &'a ClassificationResult>,
{
    results.into_iter().collect::<BatchTally>().finish()
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Human-readable (Russian) report built only from the statistics fields.
pub fn render_summary(stats: &BatchStatistics) -> String {
    let total = stats.total;
    if total == 0 {
        return "Нет данных для отображения".to_string();
    }
    format!(
        "📊 СТАТИСТИКА АНАЛИЗА:\n\n\
         ✅ Позитивные: {} ({:.1}%)\n\
         ❌ Негативные: {} ({:.1}%)\n\
         😐 Нейтральные: {} ({:.1}%)\n\
         ⚠️ Ошибки: {}\n\n\
         📈 Всего отзывов: {}\n\
         🎯 Средняя уверенность: {:.1}%\n",
        stats.positive,
        percent(stats.positive, total),
        stats.negative,
        percent(stats.negative, total),
        stats.neutral,
        percent(stats.neutral, total),
        stats.errors,
        total,
        f64::from(stats.avg_confidence) * 100.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Emotion;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn res(label: Label, confidence: f32) -> ClassificationResult {
        let emotion = match label {
            Label::Positive => Emotion::Delighted,
            Label::Negative => Emotion::Angry,
            Label::Undetermined => Emotion::Neutral,
            Label::Error => Emotion::Failed,
        };
        ClassificationResult {
            original_text: String::new(),
            label,
            confidence,
            emotion,
        }
    }

    #[test]
    fn counts_buckets_and_averages_non_errors() {
        let rs = vec![
            res(Label::Positive, 0.9),
            res(Label::Negative, 0.7),
            res(Label::Undetermined, 0.5),
            res(Label::Error, 0.0),
        ];
        let s = fold(&rs);
        assert_eq!(s.total, 4);
        assert_eq!(
            (s.positive, s.negative, s.neutral, s.errors),
            (1, 1, 1, 1)
        );
        assert!((s.avg_confidence - 0.7).abs() < 1e-6, "{}", s.avg_confidence);
    }

    #[test]
    fn empty_and_all_error_batches_average_zero() {
        assert_eq!(
            fold(&Vec::<ClassificationResult>::new()),
            BatchStatistics::default()
        );
        let s = fold(&[res(Label::Error, 0.0), res(Label::Error, 0.0)]);
        assert_eq!(s.total, 2);
        assert_eq!(s.errors, 2);
        assert_eq!(s.avg_confidence, 0.0);
    }

    #[test]
    fn partition_fold_matches_sequential_fold() {
        let mut rng = StdRng::seed_from_u64(0x5E17_2026);
        let labels = [
            Label::Positive,
            Label::Negative,
            Label::Undetermined,
            Label::Error,
        ];
        for _ in 0..50 {
            let n = rng.random_range(0..200);
            let rs: Vec<_> = (0..n)
                .map(|_| {
                    let label = labels[rng.random_range(0..labels.len())];
                    let c = if label == Label::Error {
                        0.0
                    } else {
                        rng.random_range(0.5..=0.98)
                    };
                    res(label, c)
                })
                .collect();

            let sequential = fold(&rs);

            // Random disjoint partitions, combined in reverse order.
            let mut parts = Vec::new();
            let mut start = 0;
            while start < rs.len() {
                let len = rng.random_range(1..=rs.len() - start);
                parts.push(rs[start..start + len].iter().collect::<BatchTally>());
                start += len;
            }
            let combined: BatchTally = parts.into_iter().rev().sum();

            assert_eq!(combined.finish(), sequential);
            assert_eq!(
                sequential.total,
                sequential.positive + sequential.negative + sequential.neutral + sequential.errors
            );
        }
    }

    #[test]
    fn summary_guards_empty_batch() {
        assert_eq!(
            render_summary(&BatchStatistics::default()),
            "Нет данных для отображения"
        );
    }

    #[test]
    fn summary_reports_percentages() {
        let s = BatchStatistics {
            total: 4,
            positive: 2,
            negative: 1,
            neutral: 1,
            errors: 0,
            avg_confidence: 0.75,
        };
        let text = render_summary(&s);
        assert!(text.contains("Позитивные: 2 (50.0%)"), "{text}");
        assert!(text.contains("Негативные: 1 (25.0%)"), "{text}");
        assert!(text.contains("Всего отзывов: 4"), "{text}");
        assert!(text.contains("Средняя уверенность: 75.0%"), "{text}");
    }
}
