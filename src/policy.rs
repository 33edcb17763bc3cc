//! policy.rs: maps score tallies and strong-indicator hits to a label,
//! a confidence and an emotion glyph.
//!
//! Every breakpoint is a named field of [`PolicyConfig`] so a different
//! policy can be loaded from the lexicon TOML without touching the scorer.
//! Confidence never decreases as `|total_score|` grows.

use serde::{Deserialize, Serialize};

use crate::error::LexiconError;
use crate::lexicon::{Polarity, StrongConfig};
use crate::scorer::{ScoreOutcome, ScoreTally, StrongHit};

/// Closed label set of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Positive,
    Negative,
    Undetermined,
    Error,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Positive => "POSITIVE",
            Label::Negative => "NEGATIVE",
            Label::Undetermined => "UNDETERMINED",
            Label::Error => "ERROR",
        }
    }

    /// Display label used by the Russian UI.
    pub fn label_ru(self) -> &'static str {
        match self {
            Label::Positive => "ПОЗИТИВНЫЙ",
            Label::Negative => "НЕГАТИВНЫЙ",
            Label::Undetermined => "НЕОПРЕДЕЛЕНО",
            Label::Error => "ОШИБКА",
        }
    }
}

impl From<Polarity> for Label {
    fn from(p: Polarity) -> Self {
        match p {
            Polarity::Positive => Label::Positive,
            Polarity::Negative => Label::Negative,
        }
    }
}

/// Glyph derived from (label, confidence tier). Not an independent signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    #[serde(rename = "😊")]
    Delighted,
    #[serde(rename = "🙂")]
    Pleased,
    #[serde(rename = "😐")]
    Neutral,
    #[serde(rename = "🙁")]
    Displeased,
    #[serde(rename = "😠")]
    Angry,
    #[serde(rename = "❌")]
    Failed,
}

impl Emotion {
    pub fn glyph(self) -> &'static str {
        match self {
            Emotion::Delighted => "😊",
            Emotion::Pleased => "🙂",
            Emotion::Neutral => "😐",
            Emotion::Displeased => "🙁",
            Emotion::Angry => "😠",
            Emotion::Failed => "❌",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Strong indicator or high-threshold score.
    High,
    Moderate,
    Flat,
}

fn emotion_for(label: Label, tier: Tier) -> Emotion {
    match (label, tier) {
        (Label::Positive, Tier::High) => Emotion::Delighted,
        (Label::Positive, _) => Emotion::Pleased,
        (Label::Negative, Tier::High) => Emotion::Angry,
        (Label::Negative, _) => Emotion::Displeased,
        (Label::Undetermined, _) => Emotion::Neutral,
        (Label::Error, _) => Emotion::Failed,
    }
}

/// Outcome of the decision policy for one text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub label: Label,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub emotion: Emotion,
}

impl Verdict {
    pub fn new(label: Label, confidence: f32, tier: Tier) -> Self {
        Self {
            label,
            confidence: clamp01(confidence),
            emotion: emotion_for(label, tier),
        }
    }

    pub fn undetermined(confidence: f32) -> Self {
        Self::new(Label::Undetermined, confidence, Tier::Flat)
    }

    pub fn error() -> Self {
        Self::new(Label::Error, 0.0, Tier::Flat)
    }
}

/* ----------------------------
Policy constants
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Neutral markers needed before a small score is called undetermined.
    pub neutral_min_count: usize,
    /// `|total_score|` at or below this counts as "small".
    pub neutral_margin: u32,
    pub high_threshold: u32,
    pub high_base: f32,
    pub high_step: f32,
    pub high_cap: f32,
    pub moderate_threshold: u32,
    pub moderate_base: f32,
    pub moderate_step: f32,
    pub moderate_cap: f32,
    pub undetermined_confidence: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            neutral_min_count: 2,
            neutral_margin: 1,
            high_threshold: 4,
            high_base: 0.80,
            high_step: 0.02,
            high_cap: 0.95,
            moderate_threshold: 1,
            moderate_base: 0.60,
            moderate_step: 0.05,
            moderate_cap: 0.75,
            undetermined_confidence: 0.5,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), LexiconError> {
        for (name, value) in [
            ("policy.high_base", self.high_base),
            ("policy.high_cap", self.high_cap),
            ("policy.moderate_base", self.moderate_base),
            ("policy.moderate_cap", self.moderate_cap),
            ("policy.undetermined_confidence", self.undetermined_confidence),
        ] {
            check_unit(name, value)?;
        }
        if self.high_step < 0.0 || self.moderate_step < 0.0 {
            return Err(LexiconError::NonMonotonic(
                "confidence steps must be non-negative".into(),
            ));
        }
        if self.moderate_threshold == 0 || self.moderate_threshold > self.high_threshold {
            return Err(LexiconError::NonMonotonic(format!(
                "need 0 < moderate_threshold ({}) <= high_threshold ({})",
                self.moderate_threshold, self.high_threshold
            )));
        }
        let high_floor = self.high_confidence(self.high_threshold as f32);
        if self.moderate_cap > high_floor {
            return Err(LexiconError::NonMonotonic(format!(
                "moderate_cap ({}) exceeds the lowest high-tier confidence ({high_floor})",
                self.moderate_cap
            )));
        }
        let moderate_floor = self.moderate_confidence(self.moderate_threshold as f32);
        if self.undetermined_confidence > moderate_floor {
            return Err(LexiconError::NonMonotonic(format!(
                "undetermined_confidence ({}) exceeds the lowest moderate confidence ({moderate_floor})",
                self.undetermined_confidence
            )));
        }
        Ok(())
    }

    fn high_confidence(&self, magnitude: f32) -> f32 {
        (self.high_base + magnitude * self.high_step).min(self.high_cap)
    }

    fn moderate_confidence(&self, magnitude: f32) -> f32 {
        (self.moderate_base + magnitude * self.moderate_step).min(self.moderate_cap)
    }
}

/// Strong-indicator confidence: `min(base + hits * increment, cap)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrongConfidence {
    pub base: f32,
    pub increment: f32,
    pub cap: f32,
}

impl StrongConfidence {
    pub fn from_config(cfg: &StrongConfig) -> Result<Self, LexiconError> {
        check_unit("strong.base", cfg.base)?;
        check_unit("strong.cap", cfg.cap)?;
        if cfg.increment < 0.0 || cfg.base > cfg.cap {
            return Err(LexiconError::NonMonotonic(format!(
                "strong confidence needs increment >= 0 and base <= cap (base {}, increment {}, cap {})",
                cfg.base, cfg.increment, cfg.cap
            )));
        }
        Ok(Self {
            base: cfg.base,
            increment: cfg.increment,
            cap: cfg.cap,
        })
    }

    pub fn confidence(&self, hits: usize) -> f32 {
        (self.base + hits as f32 * self.increment).min(self.cap)
    }
}

/// Deterministic cascade from scorer output to [`Verdict`].
#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    cfg: PolicyConfig,
    strong: StrongConfidence,
}

impl DecisionPolicy {
    pub fn new(cfg: PolicyConfig, strong: StrongConfidence) -> Result<Self, LexiconError> {
        cfg.validate()?;
        Ok(Self { cfg, strong })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.cfg
    }

    pub fn decide(&self, outcome: &ScoreOutcome) -> Verdict {
        match outcome {
            ScoreOutcome::TooShort => Verdict::undetermined(self.cfg.undetermined_confidence),
            ScoreOutcome::Strong(hit) => self.decide_strong(hit),
            ScoreOutcome::Weighted {
                tally,
                neutral_count,
            } => self.decide_tally(tally, *neutral_count),
        }
    }

    fn decide_strong(&self, hit: &StrongHit) -> Verdict {
        Verdict::new(
            hit.polarity.into(),
            self.strong.confidence(hit.terms.len()),
            Tier::High,
        )
    }

    fn decide_tally(&self, tally: &ScoreTally, neutral_count: usize) -> Verdict {
        let c = &self.cfg;
        let total = tally.total();
        let magnitude = total.unsigned_abs();
        let polarity = if total > 0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        };

        // 1) Several neutral markers and only a small lean either way.
        if neutral_count >= c.neutral_min_count && magnitude <= u64::from(c.neutral_margin) {
            return Verdict::undetermined(c.undetermined_confidence);
        }
        // 2) Clear lean.
        if magnitude >= u64::from(c.high_threshold) {
            return Verdict::new(
                polarity.into(),
                c.high_confidence(magnitude as f32),
                Tier::High,
            );
        }
        // 3) Moderate lean.
        if magnitude >= u64::from(c.moderate_threshold) {
            return Verdict::new(
                polarity.into(),
                c.moderate_confidence(magnitude as f32),
                Tier::Moderate,
            );
        }
        // 4) Tie with activity, or no signal at all.
        Verdict::undetermined(c.undetermined_confidence)
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), LexiconError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LexiconError::InvalidConfidence { name, value })
    }
}

fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
