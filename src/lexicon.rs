// src/lexicon.rs
//! Lexicon store: weighted positive/negative terms, strong indicators,
//! neutral markers and context modifiers.
//!
//! The store is compiled once from a [`LexiconConfig`] (TOML) and never
//! mutated afterwards. Reloading builds a fresh store and swaps it in whole
//! (see `classifier::ClassifierHandle`).
//!
//! Matching is plain substring search over the normalized (lowercased) text,
//! so a term also hits inside longer words ("умный" inside "безумный").

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LexiconError;
use crate::policy::PolicyConfig;

// --- env defaults & names ---
pub const DEFAULT_LEXICON_CONFIG_PATH: &str = "config/lexicon.toml";
pub const ENV_LEXICON_CONFIG_PATH: &str = "LEXICON_CONFIG_PATH";

/// Lexicon shipped with the crate; used when no config file is present.
pub const BUILTIN_LEXICON_TOML: &str = include_str!("../config/lexicon.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Word,
    Phrase,
}

impl TermKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TermKind::Word => "word",
            TermKind::Phrase => "phrase",
        }
    }
}

/// One weighted term of the compiled lexicon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    pub term: String,
    pub weight: u32,
    pub polarity: Polarity,
    pub kind: TermKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierEffect {
    Intensify,
    Negate,
}

/// A context modifier; its scope is always the next token only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierRule {
    pub trigger: String,
    pub effect: ModifierEffect,
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct LexiconConfig {
    pub strong: StrongConfig,
    #[serde(default)]
    pub neutral: Vec<String>,
    #[serde(default)]
    pub modifiers: ModifierConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub groups: Vec<TermGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrongConfig {
    #[serde(default = "default_strong_base")]
    pub base: f32,
    #[serde(default = "default_strong_increment")]
    pub increment: f32,
    #[serde(default = "default_strong_cap")]
    pub cap: f32,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub positive: Vec<String>,
}

fn default_strong_base() -> f32 {
    0.86
}
fn default_strong_increment() -> f32 {
    0.05
}
fn default_strong_cap() -> f32 {
    0.98
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModifierConfig {
    #[serde(default = "default_bonus")]
    pub intensify_bonus: u32,
    #[serde(default = "default_bonus")]
    pub negate_bonus: u32,
    #[serde(default)]
    pub intensifiers: Vec<String>,
    #[serde(default)]
    pub negations: Vec<String>,
}

fn default_bonus() -> u32 {
    2
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            intensify_bonus: default_bonus(),
            negate_bonus: default_bonus(),
            intensifiers: Vec::new(),
            negations: Vec::new(),
        }
    }
}

/// A list of terms sharing polarity, kind and weight.
#[derive(Debug, Clone, Deserialize)]
pub struct TermGroup {
    pub polarity: Polarity,
    pub kind: TermKind,
    pub weight: u32,
    pub terms: Vec<String>,
}

impl LexiconConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, LexiconError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, LexiconError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The embedded default lexicon.
    pub fn builtin() -> Result<Self, LexiconError> {
        Self::from_toml_str(BUILTIN_LEXICON_TOML)
    }

    /// Resolve `LEXICON_CONFIG_PATH` (or the default path) and load it.
    /// A missing file falls back to the embedded lexicon; a present but
    /// invalid file is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_LEXICON_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LEXICON_CONFIG_PATH));
        Self::load_or_builtin(&path)
    }

    pub fn load_or_builtin(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "lexicon config not found, using built-in lexicon");
            return Ok(Self::builtin()?);
        }
        Self::from_path(path).map_err(|e| {
            anyhow::anyhow!("Failed to load lexicon config at {}: {}", path.display(), e)
        })
    }
}

/* ----------------------------
Compiled store
---------------------------- */

/// Strong indicators per polarity. Any hit bypasses weighted scoring.
#[derive(Debug, Clone, Default)]
pub struct StrongIndicatorSet {
    negative: Vec<String>,
    positive: Vec<String>,
}

impl StrongIndicatorSet {
    pub fn terms(&self, polarity: Polarity) -> &[String] {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }

    /// Strong terms of `polarity` found in `text`, in configuration order.
    pub fn hits<'a>(&'a self, text: &str, polarity: Polarity) -> Vec<&'a str> {
        self.terms(polarity)
            .iter()
            .filter(|t| text.contains(t.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Read-only lexicon used by the scorer.
#[derive(Debug, Clone)]
pub struct LexiconStore {
    entries: Vec<LexiconEntry>,
    strong: StrongIndicatorSet,
    neutral: Vec<String>,
    modifiers: Vec<ModifierRule>,
    intensify_bonus: u32,
    negate_bonus: u32,
}

impl LexiconStore {
    /// Validate and compile a config. Terms are trimmed, lowercased and
    /// deduplicated (first occurrence wins).
    pub fn from_config(cfg: &LexiconConfig) -> Result<Self, LexiconError> {
        let mut seen: HashSet<(Polarity, TermKind, String)> = HashSet::new();
        let mut entries = Vec::new();

        for group in &cfg.groups {
            if group.weight == 0 {
                return Err(LexiconError::ZeroWeight {
                    polarity: group.polarity.as_str(),
                    kind: group.kind.as_str(),
                });
            }
            let section = format!("{} {} group", group.polarity.as_str(), group.kind.as_str());
            for raw in &group.terms {
                let term = clean_term(raw, &section)?;
                if seen.insert((group.polarity, group.kind, term.clone())) {
                    entries.push(LexiconEntry {
                        term,
                        weight: group.weight,
                        polarity: group.polarity,
                        kind: group.kind,
                    });
                }
            }
        }

        let strong = StrongIndicatorSet {
            negative: clean_list(&cfg.strong.negative, "strong.negative")?,
            positive: clean_list(&cfg.strong.positive, "strong.positive")?,
        };
        let neutral = clean_list(&cfg.neutral, "neutral")?;

        let mut modifiers = Vec::new();
        for trigger in clean_list(&cfg.modifiers.intensifiers, "modifiers.intensifiers")? {
            modifiers.push(ModifierRule {
                trigger,
                effect: ModifierEffect::Intensify,
            });
        }
        for trigger in clean_list(&cfg.modifiers.negations, "modifiers.negations")? {
            if modifiers.iter().any(|m| m.trigger == trigger) {
                continue;
            }
            modifiers.push(ModifierRule {
                trigger,
                effect: ModifierEffect::Negate,
            });
        }

        Ok(Self {
            entries,
            strong,
            neutral,
            modifiers,
            intensify_bonus: cfg.modifiers.intensify_bonus,
            negate_bonus: cfg.modifiers.negate_bonus,
        })
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    pub fn strong(&self) -> &StrongIndicatorSet {
        &self.strong
    }

    pub fn modifiers(&self) -> &[ModifierRule] {
        &self.modifiers
    }

    /// Every configured term of `polarity`/`kind` that is a substring of `text`.
    pub fn matches<'a>(
        &'a self,
        text: &'a str,
        polarity: Polarity,
        kind: TermKind,
    ) -> impl Iterator<Item = &'a LexiconEntry> + 'a {
        self.entries.iter().filter(move |e| {
            e.polarity == polarity && e.kind == kind && text.contains(e.term.as_str())
        })
    }

    pub fn neutral_count(&self, text: &str) -> usize {
        self.neutral
            .iter()
            .filter(|t| text.contains(t.as_str()))
            .count()
    }

    pub fn modifier_for(&self, token: &str) -> Option<ModifierEffect> {
        self.modifiers
            .iter()
            .find(|m| m.trigger == token)
            .map(|m| m.effect)
    }

    pub fn bonus(&self, effect: ModifierEffect) -> u32 {
        match effect {
            ModifierEffect::Intensify => self.intensify_bonus,
            ModifierEffect::Negate => self.negate_bonus,
        }
    }

    /// Polarity of a single token for modifier lookahead: positive when it
    /// contains any positive word or strong term, else negative likewise.
    pub fn token_polarity(&self, token: &str) -> Option<Polarity> {
        [Polarity::Positive, Polarity::Negative]
            .into_iter()
            .find(|&p| self.token_has(token, p))
    }

    fn token_has(&self, token: &str, polarity: Polarity) -> bool {
        self.entries
            .iter()
            .filter(|e| e.polarity == polarity && e.kind == TermKind::Word)
            .any(|e| token.contains(e.term.as_str()))
            || self
                .strong
                .terms(polarity)
                .iter()
                .any(|t| token.contains(t.as_str()))
    }
}

fn clean_term(raw: &str, section: &str) -> Result<String, LexiconError> {
    let term = raw.trim().to_lowercase();
    if term.is_empty() {
        return Err(LexiconError::EmptyTerm {
            section: section.to_string(),
        });
    }
    Ok(term)
}

fn clean_list(raw: &[String], section: &str) -> Result<Vec<String>, LexiconError> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for r in raw {
        let term = clean_term(r, section)?;
        if !out.contains(&term) {
            out.push(term);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_TOML: &str = r#"
neutral = ["Средне"]

[strong]
negative = ["провал"]
positive = ["шедевр", "  Шедевр "]

[modifiers]
intensifiers = ["очень"]
negations = ["не"]

[[groups]]
polarity = "positive"
kind = "word"
weight = 2
terms = ["Хороший", "хороший", "умный"]

[[groups]]
polarity = "positive"
kind = "phrase"
weight = 3
terms = ["берет за душу"]

[[groups]]
polarity = "negative"
kind = "word"
weight = 2
terms = ["скучный"]
"#;

    fn store() -> LexiconStore {
        let cfg = LexiconConfig::from_toml_str(SMALL_TOML).expect("parse");
        LexiconStore::from_config(&cfg).expect("compile")
    }

    #[test]
    fn builtin_lexicon_compiles() {
        let cfg = LexiconConfig::builtin().expect("builtin parses");
        let store = LexiconStore::from_config(&cfg).expect("builtin validates");
        assert!(store.entries().len() > 100);
        assert!(!store.strong().terms(Polarity::Negative).is_empty());
        assert_eq!(store.modifier_for("не"), Some(ModifierEffect::Negate));
        assert_eq!(store.modifier_for("очень"), Some(ModifierEffect::Intensify));
    }

    #[test]
    fn terms_are_lowercased_and_deduplicated() {
        let s = store();
        let positives: Vec<_> = s
            .entries()
            .iter()
            .filter(|e| e.polarity == Polarity::Positive && e.kind == TermKind::Word)
            .map(|e| e.term.as_str())
            .collect();
        assert_eq!(positives, vec!["хороший", "умный"]);
        assert_eq!(s.strong().terms(Polarity::Positive), ["шедевр".to_string()]);
    }

    #[test]
    fn matches_are_substring_and_ordered() {
        let s = store();
        let text = "хороший фильм, берет за душу";
        let words: Vec<_> = s
            .matches(text, Polarity::Positive, TermKind::Word)
            .map(|e| (e.term.as_str(), e.weight))
            .collect();
        assert_eq!(words, vec![("хороший", 2)]);

        let phrases: Vec<_> = s
            .matches(text, Polarity::Positive, TermKind::Phrase)
            .map(|e| (e.term.as_str(), e.weight))
            .collect();
        assert_eq!(phrases, vec![("берет за душу", 3)]);

        // Substring semantics: "умный" is found inside "безумный".
        assert_eq!(
            s.matches("безумный сюжет", Polarity::Positive, TermKind::Word)
                .count(),
            1
        );
    }

    #[test]
    fn token_polarity_prefers_positive() {
        let s = store();
        assert_eq!(s.token_polarity("хороший,"), Some(Polarity::Positive));
        assert_eq!(s.token_polarity("скучный"), Some(Polarity::Negative));
        assert_eq!(s.token_polarity("шедевр!"), Some(Polarity::Positive));
        assert_eq!(s.token_polarity("фильм"), None);
    }

    #[test]
    fn neutral_count_counts_distinct_terms() {
        let s = store();
        assert_eq!(s.neutral_count("средне, очень средне"), 1);
        assert_eq!(s.neutral_count("фильм"), 0);
    }

    #[test]
    fn rejects_empty_term() {
        let toml = r#"
[strong]
negative = ["  "]
"#;
        let cfg = LexiconConfig::from_toml_str(toml).expect("parse");
        let err = LexiconStore::from_config(&cfg).unwrap_err();
        assert!(matches!(err, LexiconError::EmptyTerm { .. }), "{err}");
    }

    #[test]
    fn rejects_zero_weight() {
        let toml = r#"
[strong]

[[groups]]
polarity = "negative"
kind = "phrase"
weight = 0
terms = ["сюжетные дыры"]
"#;
        let cfg = LexiconConfig::from_toml_str(toml).expect("parse");
        let err = LexiconStore::from_config(&cfg).unwrap_err();
        assert!(matches!(err, LexiconError::ZeroWeight { .. }), "{err}");
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let cfg = LexiconConfig::load_or_builtin(Path::new("does/not/exist.toml"))
            .expect("fallback");
        assert!(!cfg.groups.is_empty());
    }
}
