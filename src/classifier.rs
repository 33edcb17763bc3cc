// src/classifier.rs
//! Classification entry point: normalize → score → decide, with per-item
//! fault containment, plus a thread-safe handle for full-replace reloads.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::error::{LexiconError, ScoringError};
use crate::lexicon::{LexiconConfig, LexiconStore};
use crate::normalize::normalize;
use crate::policy::{DecisionPolicy, Emotion, Label, StrongConfidence, Verdict};
use crate::scorer::Scorer;

/// Result for one review. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub original_text: String,
    pub label: Label,
    /// In `[0, 1]`; `0.0` for `ERROR`.
    pub confidence: f32,
    pub emotion: Emotion,
}

impl ClassificationResult {
    pub fn from_verdict(text: impl Into<String>, v: Verdict) -> Self {
        Self {
            original_text: text.into(),
            label: v.label,
            confidence: v.confidence,
            emotion: v.emotion,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::from_verdict(text, Verdict::error())
    }
}

/// Anything that can label a text: the rule-based [`Classifier`] or an
/// alternative (e.g. a trained model) with the same contract.
pub trait SentimentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn verdict(&self, text: &str) -> Result<Verdict, ScoringError>;
}

/// Classify `text` with `strategy`, turning errors and panics into an
/// `ERROR` result instead of propagating them.
pub fn classify_with(strategy: &dyn SentimentStrategy, text: &str) -> ClassificationResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| strategy.verdict(text)))
        .unwrap_or_else(|payload| Err(ScoringError::Panicked(panic_message(&*payload))));

    match outcome {
        Ok(verdict) => {
            debug!(
                id = %anon_hash(text),
                strategy = strategy.name(),
                label = verdict.label.as_str(),
                confidence = verdict.confidence,
                "classified"
            );
            ClassificationResult::from_verdict(text, verdict)
        }
        Err(err) => {
            warn!(id = %anon_hash(text), strategy = strategy.name(), error = %err, "classification failed");
            ClassificationResult::error(text)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Short, non-reversible id for log lines. Review text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Rule-based classifier over one immutable lexicon + policy.
#[derive(Debug, Clone)]
pub struct Classifier {
    lexicon: LexiconStore,
    policy: DecisionPolicy,
}

static BUILTIN: Lazy<Arc<Classifier>> = Lazy::new(|| {
    let cfg = LexiconConfig::builtin().expect("built-in lexicon parses");
    Arc::new(Classifier::from_config(&cfg).expect("built-in lexicon is valid"))
});

impl Classifier {
    pub fn from_config(cfg: &LexiconConfig) -> Result<Self, LexiconError> {
        let lexicon = LexiconStore::from_config(cfg)?;
        let strong = StrongConfidence::from_config(&cfg.strong)?;
        let policy = DecisionPolicy::new(cfg.policy.clone(), strong)?;
        Ok(Self { lexicon, policy })
    }

    /// Shared classifier over the embedded default lexicon.
    pub fn builtin() -> Arc<Self> {
        BUILTIN.clone()
    }

    pub fn lexicon(&self) -> &LexiconStore {
        &self.lexicon
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Full per-item classification; never fails.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        classify_with(self, text)
    }
}

impl SentimentStrategy for Classifier {
    fn name(&self) -> &'static str {
        "rule-based"
    }

    fn verdict(&self, text: &str) -> Result<Verdict, ScoringError> {
        let normalized = normalize(text);
        let outcome = Scorer::new(&self.lexicon).score(&normalized)?;
        Ok(self.policy.decide(&outcome))
    }
}

/* ----------------------------
Thread-safe handle + reload
---------------------------- */

/// Shared, swappable classifier. Readers take a snapshot `Arc` and release
/// the lock at once, so a running batch keeps the lexicon it started with.
#[derive(Clone)]
pub struct ClassifierHandle {
    inner: Arc<RwLock<Arc<Classifier>>>,
}

impl ClassifierHandle {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(classifier)),
        }
    }

    pub fn snapshot(&self) -> Arc<Classifier> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, classifier: Classifier) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(classifier);
    }

    /// Build a classifier from `path` (or the built-in lexicon when the file
    /// is absent) and swap it in. On error the current one stays active.
    pub fn reload_from(&self, path: &Path) -> anyhow::Result<()> {
        let cfg = LexiconConfig::load_or_builtin(path)?;
        let classifier = Classifier::from_config(&cfg)
            .map_err(|e| anyhow::anyhow!("lexicon at {} is invalid: {}", path.display(), e))?;
        self.replace(classifier);
        info!(path = %path.display(), "lexicon reloaded");
        Ok(())
    }
}

/// Polls `path` mtime every 2s and reloads the handle on change.
pub fn start_hot_reload_thread(handle: ClassifierHandle, path: PathBuf) {
    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            poll_once(&handle, &path, &mut last_mtime);
            thread::sleep(poll);
        }
    });
}

/// One hot-reload step. The first sighting only records the mtime; a later,
/// newer mtime triggers a reload. Returns `true` when a new classifier was
/// swapped in.
fn poll_once(
    handle: &ClassifierHandle,
    path: &Path,
    last_mtime: &mut Option<SystemTime>,
) -> bool {
    let Ok(mtime) = fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };
    let changed = last_mtime.is_some_and(|prev| mtime > prev);
    *last_mtime = Some(mtime);
    if !changed {
        return false;
    }

    let result = handle.reload_from(path);
    crate::metrics::record_reload(result.is_ok());
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "hot reload rejected, keeping previous lexicon");
            false
        }
    }
}
