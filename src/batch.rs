//! Batch sources and batch classification.
//!
//! A `BatchSource` is validated at the boundary (file name, encoding,
//! size, at least one non-blank line) before anything is classified.
//! Items are classified independently; the parallel path splits the
//! ordered items into contiguous chunks on scoped threads and combines the
//! per-chunk tallies, so results and statistics match the sequential path.

use serde::Serialize;
use std::thread;
use tracing::{info, warn};

use crate::aggregate::{BatchStatistics, BatchTally};
use crate::classifier::{classify_with, ClassificationResult, SentimentStrategy};
use crate::error::BatchSourceError;

/// Upload size limit inherited from the web form (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Non-empty, ordered list of trimmed review texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSource {
    items: Vec<String>,
}

impl BatchSource {
    /// One review per line; lines are trimmed and blank lines dropped.
    pub fn from_lines(content: &str) -> Result<Self, BatchSourceError> {
        let items: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect();
        Self::from_items(items)
    }

    pub fn from_items(items: Vec<String>) -> Result<Self, BatchSourceError> {
        if items.is_empty() {
            return Err(BatchSourceError::Empty);
        }
        Ok(Self { items })
    }

    /// Validate an uploaded `.txt` file and split it into items.
    pub fn from_upload(
        filename: Option<&str>,
        bytes: &[u8],
        max_bytes: usize,
    ) -> Result<Self, BatchSourceError> {
        let name = filename.map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(BatchSourceError::NoFilename);
        }
        if !name.to_ascii_lowercase().ends_with(".txt") {
            return Err(BatchSourceError::UnsupportedExtension);
        }
        if bytes.len() > max_bytes {
            return Err(BatchSourceError::TooLarge { limit: max_bytes });
        }
        let content = std::str::from_utf8(bytes).map_err(|_| BatchSourceError::NotUtf8)?;
        Self::from_lines(content.trim_start_matches('\u{feff}'))
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-item results (input order) plus their statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<ClassificationResult>,
    pub statistics: BatchStatistics,
}

/// Classify every item on the current thread.
pub fn classify_batch(strategy: &dyn SentimentStrategy, source: &BatchSource) -> BatchReport {
    let results: Vec<ClassificationResult> = source
        .items()
        .iter()
        .map(|t| classify_with(strategy, t))
        .collect();
    let statistics = results.iter().collect::<BatchTally>().finish();
    info!(
        items = statistics.total,
        errors = statistics.errors,
        "batch classified"
    );
    BatchReport {
        results,
        statistics,
    }
}

/// Classify items on up to `workers` scoped threads. Output order and
/// statistics are identical to [`classify_batch`].
pub fn classify_batch_parallel(
    strategy: &dyn SentimentStrategy,
    source: &BatchSource,
    workers: usize,
) -> BatchReport {
    let items = source.items();
    let workers = workers.clamp(1, items.len().max(1));
    if workers == 1 {
        return classify_batch(strategy, source);
    }
    let chunk_size = items.len().div_ceil(workers);

    let parts: Vec<(Vec<ClassificationResult>, BatchTally)> = thread::scope(|s| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| {
                let handle = s.spawn(move || {
                    let results: Vec<ClassificationResult> =
                        chunk.iter().map(|t| classify_with(strategy, t)).collect();
                    let tally = results.iter().collect::<BatchTally>();
                    (results, tally)
                });
                (chunk, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(chunk, handle)| {
                handle.join().unwrap_or_else(|_| {
                    warn!(items = chunk.len(), "batch worker died, marking chunk as errors");
                    let results: Vec<ClassificationResult> =
                        chunk.iter().map(ClassificationResult::error).collect();
                    let tally = results.iter().collect::<BatchTally>();
                    (results, tally)
                })
            })
            .collect()
    });

    let mut results = Vec::with_capacity(items.len());
    let mut tally = BatchTally::default();
    for (chunk_results, chunk_tally) in parts {
        results.extend(chunk_results);
        tally = tally.combine(chunk_tally);
    }
    let statistics = tally.finish();
    info!(
        items = statistics.total,
        errors = statistics.errors,
        workers,
        "batch classified"
    );
    BatchReport {
        results,
        statistics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::error::ScoringError;
    use crate::policy::{Label, Verdict};

    #[test]
    fn lines_are_trimmed_and_blank_lines_dropped() {
        let src = BatchSource::from_lines("  первый отзыв \n\n   \r\nвторой\n").expect("valid");
        assert_eq!(src.items(), ["первый отзыв", "второй"]);
    }

    #[test]
    fn empty_source_is_rejected() {
        assert_eq!(
            BatchSource::from_lines(" \n\n\t\n"),
            Err(BatchSourceError::Empty)
        );
        assert_eq!(BatchSource::from_lines(""), Err(BatchSourceError::Empty));
    }

    #[test]
    fn upload_validation() {
        let max = DEFAULT_MAX_UPLOAD_BYTES;
        assert_eq!(
            BatchSource::from_upload(None, b"x", max),
            Err(BatchSourceError::NoFilename)
        );
        assert_eq!(
            BatchSource::from_upload(Some(""), b"x", max),
            Err(BatchSourceError::NoFilename)
        );
        assert_eq!(
            BatchSource::from_upload(Some("reviews.csv"), b"x", max),
            Err(BatchSourceError::UnsupportedExtension)
        );
        assert_eq!(
            BatchSource::from_upload(Some("reviews.txt"), &[0xff, 0xfe, 0x00], max),
            Err(BatchSourceError::NotUtf8)
        );
        assert_eq!(
            BatchSource::from_upload(Some("reviews.txt"), b"\n\n", max),
            Err(BatchSourceError::Empty)
        );
        assert_eq!(
            BatchSource::from_upload(Some("reviews.txt"), b"abcdef", 3),
            Err(BatchSourceError::TooLarge { limit: 3 })
        );
        let ok = BatchSource::from_upload(
            Some("Reviews.TXT"),
            "\u{feff}Отличный фильм\nПолное говно!".as_bytes(),
            max,
        )
        .expect("valid upload");
        assert_eq!(ok.items(), ["Отличный фильм", "Полное говно!"]);
    }

    #[test]
    fn scenario_three_item_batch() {
        let src = BatchSource::from_items(vec![
            "Отличный и интересный фильм".into(),
            "Полное говно!".into(),
            "ок".into(),
        ])
        .expect("non-empty");
        let report = classify_batch(Classifier::builtin().as_ref(), &src);
        let s = report.statistics;
        assert_eq!(
            (s.total, s.positive, s.negative, s.neutral, s.errors),
            (3, 1, 1, 1, 0)
        );
        assert_eq!(report.results[0].label, Label::Positive);
        assert_eq!(report.results[1].label, Label::Negative);
        assert_eq!(report.results[2].label, Label::Undetermined);
    }

    /// Fails on every text containing "сбой".
    struct Flaky;

    impl SentimentStrategy for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }
        fn verdict(&self, text: &str) -> Result<Verdict, ScoringError> {
            if text.contains("сбой") {
                return Err(ScoringError::Strategy {
                    name: "flaky",
                    reason: "forced".into(),
                });
            }
            Classifier::builtin().verdict(text)
        }
    }

    #[test]
    fn failing_items_do_not_abort_the_batch() {
        let src = BatchSource::from_lines("сбой один\nОтличный фильм\nсбой два\nПолное говно!")
            .expect("valid");
        let report = classify_batch_parallel(&Flaky, &src, 3);
        assert_eq!(report.results.len(), 4);
        assert_eq!(report.statistics.errors, 2);
        assert_eq!(report.results[0].label, Label::Error);
        assert_eq!(report.results[0].confidence, 0.0);
        assert_eq!(report.results[3].label, Label::Negative);
        // Errors are excluded from the average.
        let expected = (report.results[1].confidence + report.results[3].confidence) / 2.0;
        assert!((report.statistics.avg_confidence - expected).abs() < 1e-5);
    }

    #[test]
    fn parallel_matches_sequential() {
        let lines = [
            "Фильм просто великолепен!",
            "Полное говно!",
            "Нормальный фильм",
            "Не рекомендую этот фильм",
            "Очень скучный фильм",
            "Отличный и интересный фильм",
            "Фильм не плохой",
            "ок",
            "Смотрел на одном дыхании, берет за душу",
            "Сюжетные дыры и персонажи картонные",
            "Средне, ничего особенного",
        ];
        let src = BatchSource::from_items(lines.iter().map(|s| s.to_string()).collect())
            .expect("non-empty");
        let classifier = Classifier::builtin();
        let sequential = classify_batch(classifier.as_ref(), &src);
        for workers in [1, 2, 3, 4, 7, 64] {
            let parallel = classify_batch_parallel(classifier.as_ref(), &src, workers);
            assert_eq!(parallel, sequential, "workers = {workers}");
        }
    }
}
