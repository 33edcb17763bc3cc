//! scorer.rs: applies the lexicon to a normalized review.
//!
//! Order of evaluation:
//! 1. texts shorter than `MIN_TEXT_CHARS` short-circuit,
//! 2. strong indicators (negative before positive) short-circuit,
//! 3. weighted words and phrases for both polarities,
//! 4. next-token modifiers (intensifiers add to the matched polarity,
//!    negations add to the opposite one).

use serde::Serialize;

use crate::error::ScoringError;
use crate::lexicon::{LexiconStore, ModifierEffect, Polarity, TermKind};
use crate::normalize::Normalized;

/// Strong sets are consulted in this order; the first set with a hit wins.
pub const STRONG_PRIORITY: [Polarity; 2] = [Polarity::Negative, Polarity::Positive];

/// Running polarity scores for one classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreTally {
    pub positive_score: u32,
    pub negative_score: u32,
}

impl ScoreTally {
    /// `positive_score - negative_score`.
    pub fn total(&self) -> i64 {
        i64::from(self.positive_score) - i64::from(self.negative_score)
    }

    pub fn has_activity(&self) -> bool {
        self.positive_score > 0 || self.negative_score > 0
    }

    pub fn add(&mut self, polarity: Polarity, weight: u32) -> Result<(), ScoringError> {
        let slot = match polarity {
            Polarity::Positive => &mut self.positive_score,
            Polarity::Negative => &mut self.negative_score,
        };
        *slot = slot
            .checked_add(weight)
            .ok_or(ScoringError::ScoreOverflow { weight })?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrongHit {
    pub polarity: Polarity,
    /// Matched strong terms, in configuration order.
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreOutcome {
    TooShort,
    Strong(StrongHit),
    Weighted {
        tally: ScoreTally,
        neutral_count: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    lexicon: &'a LexiconStore,
}

impl<'a> Scorer<'a> {
    pub fn new(lexicon: &'a LexiconStore) -> Self {
        Self { lexicon }
    }

    pub fn score(&self, input: &Normalized) -> Result<ScoreOutcome, ScoringError> {
        if input.is_too_short() {
            return Ok(ScoreOutcome::TooShort);
        }
        let text = input.text();

        if let Some(hit) = self.strong_hit(text) {
            return Ok(ScoreOutcome::Strong(hit));
        }

        let mut tally = self.weighted_tally(text)?;
        self.apply_modifiers(&input.tokens(), &mut tally)?;

        Ok(ScoreOutcome::Weighted {
            tally,
            neutral_count: self.lexicon.neutral_count(text),
        })
    }

    fn strong_hit(&self, text: &str) -> Option<StrongHit> {
        STRONG_PRIORITY.into_iter().find_map(|polarity| {
            let terms = self.lexicon.strong().hits(text, polarity);
            if terms.is_empty() {
                None
            } else {
                Some(StrongHit {
                    polarity,
                    terms: terms.into_iter().map(str::to_owned).collect(),
                })
            }
        })
    }

    /// Sum the weights of every matched word and phrase.
    pub fn weighted_tally(&self, text: &str) -> Result<ScoreTally, ScoringError> {
        let mut tally = ScoreTally::default();
        for polarity in [Polarity::Positive, Polarity::Negative] {
            for kind in [TermKind::Word, TermKind::Phrase] {
                for entry in self.lexicon.matches(text, polarity, kind) {
                    tally.add(polarity, entry.weight)?;
                }
            }
        }
        Ok(tally)
    }

    /// Each trigger looks only at its own next token; adjacent triggers are
    /// evaluated independently.
    pub fn apply_modifiers(
        &self,
        tokens: &[&str],
        tally: &mut ScoreTally,
    ) -> Result<(), ScoringError> {
        for pair in tokens.windows(2) {
            let (trigger, next) = (pair[0], pair[1]);
            let Some(effect) = self.lexicon.modifier_for(trigger) else {
                continue;
            };
            let Some(found) = self.lexicon.token_polarity(next) else {
                continue;
            };
            let target = match effect {
                ModifierEffect::Intensify => found,
                ModifierEffect::Negate => found.inverted(),
            };
            tally.add(target, self.lexicon.bonus(effect))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconConfig;
    use crate::normalize::normalize;

    fn builtin() -> LexiconStore {
        let cfg = LexiconConfig::builtin().expect("builtin");
        LexiconStore::from_config(&cfg).expect("valid")
    }

    fn score(store: &LexiconStore, raw: &str) -> ScoreOutcome {
        Scorer::new(store).score(&normalize(raw)).expect("score")
    }

    fn tally_of(outcome: ScoreOutcome) -> ScoreTally {
        match outcome {
            ScoreOutcome::Weighted { tally, .. } => tally,
            other => panic!("expected weighted outcome, got {other:?}"),
        }
    }

    #[test]
    fn short_text_short_circuits() {
        let s = builtin();
        assert_eq!(score(&s, "  ок "), ScoreOutcome::TooShort);
        // Strong term shorter than the limit is never consulted.
        assert_eq!(score(&s, ""), ScoreOutcome::TooShort);
    }

    #[test]
    fn strong_negative_beats_strong_positive() {
        let s = builtin();
        match score(&s, "Шедевр операторской работы, но сюжет провал") {
            ScoreOutcome::Strong(hit) => {
                assert_eq!(hit.polarity, Polarity::Negative);
                assert_eq!(hit.terms, vec!["провал".to_string()]);
            }
            other => panic!("expected strong hit, got {other:?}"),
        }
    }

    #[test]
    fn strong_hits_are_counted() {
        let s = builtin();
        match score(&s, "отстой и кошмар") {
            ScoreOutcome::Strong(hit) => assert_eq!(hit.terms.len(), 2),
            other => panic!("expected strong hit, got {other:?}"),
        }
    }

    #[test]
    fn words_and_phrases_accumulate() {
        let s = builtin();
        let t = tally_of(score(&s, "Отличный и интересный фильм"));
        assert_eq!(t.positive_score, 4);
        assert_eq!(t.negative_score, 0);

        // "глубокий" (word, 2) + "глубокий смысл" (phrase, 3).
        let t = tally_of(score(&s, "глубокий смысл"));
        assert_eq!(t.positive_score, 5);
    }

    #[test]
    fn intensifier_adds_to_matched_polarity() {
        let s = builtin();
        let t = tally_of(score(&s, "Очень скучный фильм"));
        assert_eq!(t.negative_score, 4);
        assert_eq!(t.positive_score, 0);
    }

    #[test]
    fn negation_inverts_polarity() {
        let s = builtin();
        // "рекомендую" (+2 pos), "не рекомендую" (+2 neg), negated positive (+2 neg).
        let t = tally_of(score(&s, "Не рекомендую этот фильм"));
        assert_eq!(t.positive_score, 2);
        assert_eq!(t.negative_score, 4);

        // negated negative counts toward positive
        let t = tally_of(score(&s, "Фильм не плохой"));
        assert_eq!(t.positive_score, 2);
        assert_eq!(t.negative_score, 2);
    }

    #[test]
    fn adjacent_triggers_each_see_their_own_next_token() {
        let s = builtin();
        // "очень" -> "очень" (no polarity), second "очень" -> "хороший" (+2).
        let t = tally_of(score(&s, "очень очень хороший"));
        assert_eq!(t.positive_score, 4);
        // "не" -> "очень" (no polarity); "очень" -> "хороший" (+2 pos);
        // "не очень" collocation (+2 neg) and "хороший" (+2 pos).
        let t = tally_of(score(&s, "не очень хороший"));
        assert_eq!(t.positive_score, 4);
        assert_eq!(t.negative_score, 2);
    }

    #[test]
    fn trailing_trigger_is_ignored() {
        let s = builtin();
        let t = tally_of(score(&s, "хороший, но не"));
        assert_eq!(t.positive_score, 2);
        assert_eq!(t.negative_score, 0);
    }

    #[test]
    fn neutral_markers_are_counted() {
        let s = builtin();
        match score(&s, "Нормальный фильм") {
            ScoreOutcome::Weighted {
                tally,
                neutral_count,
            } => {
                assert!(!tally.has_activity());
                assert_eq!(neutral_count, 1);
            }
            other => panic!("expected weighted outcome, got {other:?}"),
        }
    }

    #[test]
    fn overflow_is_reported() {
        let toml = r#"
[strong]

[[groups]]
polarity = "positive"
kind = "word"
weight = 4294967295
terms = ["ха", "хаха"]
"#;
        let cfg = LexiconConfig::from_toml_str(toml).expect("parse");
        let store = LexiconStore::from_config(&cfg).expect("valid");
        let err = Scorer::new(&store)
            .score(&normalize("хахаха"))
            .unwrap_err();
        assert!(matches!(err, ScoringError::ScoreOverflow { .. }));
    }
}
