//! Core data models for name reconciliation.
//!
//! Records come in from spreadsheet exports (source side) and the database
//! (target side); candidates, pairs and the report come out of a
//! reconciliation pass and are discarded after it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_key;

// ============================================================================
// Records
// ============================================================================

/// A named record on either side of a reconciliation.
///
/// `names` holds every display name the record is known by, most
/// authoritative first (e.g. Catalan title, then Spanish). `attributes`
/// carries extra columns through the pass untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub id: String,
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl NameRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            names: vec![name.into()],
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_names(id: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            id: id.into(),
            names,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// First name with a non-empty matching key.
    ///
    /// Falls back to the first non-blank name (so reports still show
    /// something like "--"), then to "".
    pub fn display_name(&self) -> &str {
        let mut names = self.names.iter().map(|n| n.as_str());
        names
            .clone()
            .find(|n| !normalize_key(n).is_empty())
            .or_else(|| names.find(|n| !n.trim().is_empty()))
            .unwrap_or("")
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }
}

// ============================================================================
// Scoring Models
// ============================================================================

/// Sub-scores of one (source, target) comparison, kept for auditing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// F: whole-key similarity
    pub full_string: f64,
    /// C: share of source tokens found in the target key
    pub token_coverage: f64,
    /// K: summed keyword increments (uncapped)
    pub keyword_boost: f64,
    /// R: trailing numeral agreement (+) or conflict (-)
    pub roman_numeral: f64,
    /// Keys were identical and the exact-match shortcut applied
    pub exact_key: bool,
    /// Final weighted score clamped to [0, 1]
    pub score: f64,
}

/// Best target found for one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Position of the target in the collection it was chosen from
    pub target_index: usize,
    pub target_id: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

// ============================================================================
// Report Models
// ============================================================================

/// Source accepted against a target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub source: NameRecord,
    pub target: NameRecord,
    pub score: f64,
    pub tier: String,
    pub breakdown: ScoreBreakdown,
}

/// Why a source ended up unmatched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// Source has no usable display name
    EmptyName,
    /// No target left to compare against
    NoCandidates,
    /// Best candidate scored below the acceptance threshold
    BelowThreshold {
        best_score: f64,
        best_target_id: String,
    },
}

impl std::fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "empty name"),
            Self::NoCandidates => write!(f, "no candidates"),
            Self::BelowThreshold {
                best_score,
                best_target_id,
            } => write!(f, "best candidate {best_target_id} scored {best_score:.3}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedSource {
    pub source: NameRecord,
    pub reason: UnmatchedReason,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCount {
    pub label: String,
    pub count: usize,
}

/// Aggregate counts of one pass, folded from the pass results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub total_sources: usize,
    pub total_targets: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub unclaimed_targets: usize,
    pub tiers: Vec<TierCount>,
}

impl MatchSummary {
    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total_sources == 0 {
            0.0
        } else {
            100.0 * self.matched as f64 / self.total_sources as f64
        }
    }

    pub fn tier_count(&self, label: &str) -> usize {
        self.tiers
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.count)
            .unwrap_or(0)
    }

    /// Log summary to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }
}

/// Full outcome of a batch reconciliation.
///
/// Every source is in exactly one of `matches` / `unmatched`; every target is
/// either the target of some match or in `unclaimed_targets`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub acceptance_threshold: f64,
    pub exclusive_targets: bool,
    pub matches: Vec<MatchedPair>,
    pub unmatched: Vec<UnmatchedSource>,
    pub unclaimed_targets: Vec<NameRecord>,
    pub summary: MatchSummary,
}
