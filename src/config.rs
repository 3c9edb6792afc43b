//! Reconciliation configuration.
//!
//! Every knob the scorer and the batch reconciler use lives here: weights,
//! keyword vocabulary, stop words, confidence tiers and the acceptance
//! threshold. Nothing is hardcoded in the algorithm itself. Configs can be
//! built in code or loaded from TOML; either way they are validated before a
//! [`crate::reconcile::Reconciler`] accepts them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::normalize::{default_stop_words, DEFAULT_MIN_TOKEN_LENGTH};
use crate::similarity::SimilarityMetric;

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Weights of the composite score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub full_string: f64,
    pub token_coverage: f64,
    pub keyword_boost: f64,
    pub roman_numeral: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            full_string: 0.4,
            token_coverage: 0.3,
            keyword_boost: 0.2,
            roman_numeral: 0.1,
        }
    }
}

impl Weights {
    fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("full_string", self.full_string),
            ("token_coverage", self.token_coverage),
            ("keyword_boost", self.keyword_boost),
            ("roman_numeral", self.roman_numeral),
        ];
        for (name, value) in named {
            if !is_non_negative(value) {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}

/// Domain keywords that boost a pair when both names contain them.
pub fn default_keyword_boosts() -> BTreeMap<String, f64> {
    [
        ("tipografia", 0.3),
        ("audiovisual", 0.3),
        ("disseny", 0.2),
        ("projectes", 0.2),
        ("taller", 0.2),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Everything the pairwise scorer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: Weights,
    /// keyword -> increment, matched against normalized keys
    pub keyword_boosts: BTreeMap<String, f64>,
    /// Tokens excluded from coverage scoring
    pub stop_words: FxHashSet<String>,
    pub min_token_length: usize,
    /// Added to R when both trailing numerals agree
    pub roman_agree_bonus: f64,
    /// Subtracted from R when both trailing numerals are present but differ
    pub roman_conflict_penalty: f64,
    pub metric: SimilarityMetric,
    /// Identical non-empty keys score 1.0 outright
    pub exact_match_shortcut: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            keyword_boosts: default_keyword_boosts(),
            stop_words: default_stop_words(),
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
            roman_agree_bonus: 0.3,
            roman_conflict_penalty: 0.2,
            metric: SimilarityMetric::default(),
            exact_match_shortcut: true,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;

        for (keyword, &value) in &self.keyword_boosts {
            if !is_non_negative(value) {
                return Err(ConfigError::InvalidKeywordBoost {
                    keyword: keyword.clone(),
                    value,
                });
            }
        }

        for (name, value) in [
            ("roman_agree_bonus", self.roman_agree_bonus),
            ("roman_conflict_penalty", self.roman_conflict_penalty),
        ] {
            if !is_non_negative(value) {
                return Err(ConfigError::InvalidRomanAdjustment { name, value });
            }
        }

        if self.min_token_length == 0 {
            return Err(ConfigError::ZeroMinTokenLength);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Batch policy
// ---------------------------------------------------------------------------

/// Labeled lower bound of a confidence bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceTier {
    pub label: String,
    pub min_score: f64,
}

impl ConfidenceTier {
    pub fn new(label: &str, min_score: f64) -> Self {
        Self {
            label: label.to_string(),
            min_score,
        }
    }
}

/// high >= 0.8, medium >= 0.6, low below that.
pub fn default_tiers() -> Vec<ConfidenceTier> {
    vec![
        ConfidenceTier::new("high", 0.8),
        ConfidenceTier::new("medium", 0.6),
        ConfidenceTier::new("low", 0.0),
    ]
}

/// Order in which the batch reconciler visits source records.
///
/// With exclusive targets the order decides who gets a contested target, so it
/// is always an explicit choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrder {
    /// Input order
    #[default]
    AsGiven,
    /// Longest normalized key first (stable), so specific names claim before generic ones
    LongestKeyFirst,
}

fn default_exclusive_targets() -> bool {
    true
}

/// Full configuration of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Minimum score to accept a match. No default: callers pick it (0.5 and 0.6 are typical).
    pub acceptance_threshold: f64,
    #[serde(default = "default_exclusive_targets")]
    pub exclusive_targets: bool,
    #[serde(default = "default_tiers")]
    pub confidence_tiers: Vec<ConfidenceTier>,
    #[serde(default)]
    pub source_order: SourceOrder,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl ReconcileConfig {
    /// Default scoring and tiers with the given threshold, validated.
    pub fn new(acceptance_threshold: f64) -> Result<Self, ConfigError> {
        let config = Self {
            acceptance_threshold,
            exclusive_targets: true,
            confidence_tiers: default_tiers(),
            source_order: SourceOrder::default(),
            scoring: ScoringConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;

        let t = self.acceptance_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::ThresholdOutOfRange(t));
        }

        let Some(lowest) = self.confidence_tiers.last() else {
            return Err(ConfigError::EmptyTiers);
        };
        let mut previous: Option<f64> = None;
        for tier in &self.confidence_tiers {
            if !(0.0..=1.0).contains(&tier.min_score) {
                return Err(ConfigError::TierOutOfRange {
                    label: tier.label.clone(),
                    min_score: tier.min_score,
                });
            }
            if previous.is_some_and(|p| tier.min_score >= p) {
                return Err(ConfigError::TiersNotDescending {
                    label: tier.label.clone(),
                });
            }
            previous = Some(tier.min_score);
        }
        if lowest.min_score > t {
            return Err(ConfigError::TiersDoNotCoverThreshold {
                lowest: lowest.min_score,
                threshold: t,
            });
        }

        Ok(())
    }

    /// Label of the first tier whose lower bound `score` reaches.
    pub fn tier_for(&self, score: f64) -> &str {
        self.confidence_tiers
            .iter()
            .find(|tier| score >= tier.min_score)
            .or(self.confidence_tiers.last())
            .map(|tier| tier.label.as_str())
            .unwrap_or("")
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
