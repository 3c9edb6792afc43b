//! Best-match search and batch reconciliation.
//!
//! A [`Reconciler`] owns a validated [`ReconcileConfig`] and nothing else; the
//! set of claimed targets lives only for the duration of one
//! [`Reconciler::reconcile`] call, so one reconciler can serve any number of
//! independent passes.

use crate::config::{ReconcileConfig, SourceOrder};
use crate::error::ConfigError;
use crate::models::{
    MatchCandidate, MatchSummary, MatchedPair, NameRecord, ReconcileReport, ScoreBreakdown,
    TierCount, UnmatchedReason, UnmatchedSource,
};
use crate::scoring::{PreparedKey, Scorer};
use rustc_hash::FxHashSet;

// ============================================================================
// Best-Match Finder
// ============================================================================

/// Outcome of scanning one source against a pool of targets.
#[derive(Clone, Debug, PartialEq)]
pub enum BestMatch {
    Accepted(MatchCandidate),
    Rejected(UnmatchedReason),
}

/// Highest-scoring target among `candidates`, first one wins ties.
///
/// `candidates` yields `(index, id, prepared key)` in a stable order.
/// Targets without a usable name are never candidates.
fn scan<'a>(
    scorer: &Scorer,
    source: &PreparedKey,
    candidates: impl Iterator<Item = (usize, &'a str, &'a PreparedKey)>,
) -> Option<(usize, &'a str, ScoreBreakdown)> {
    let mut best: Option<(usize, &'a str, ScoreBreakdown)> = None;
    for (index, id, target) in candidates {
        if target.is_empty() {
            continue;
        }
        let breakdown = scorer.score_prepared(source, target);
        if best.as_ref().map_or(true, |(_, _, b)| breakdown.score > b.score) {
            best = Some((index, id, breakdown));
        }
    }
    best
}

/// Judge the best candidate of a scan against the threshold.
fn decide(
    source: &PreparedKey,
    best: Option<(usize, &str, ScoreBreakdown)>,
    threshold: f64,
) -> BestMatch {
    if source.is_empty() {
        return BestMatch::Rejected(UnmatchedReason::EmptyName);
    }
    match best {
        None => BestMatch::Rejected(UnmatchedReason::NoCandidates),
        Some((index, id, breakdown)) if breakdown.score >= threshold => {
            BestMatch::Accepted(MatchCandidate {
                target_index: index,
                target_id: id.to_string(),
                score: breakdown.score,
                breakdown,
            })
        }
        Some((_, id, breakdown)) => BestMatch::Rejected(UnmatchedReason::BelowThreshold {
            best_score: breakdown.score,
            best_target_id: id.to_string(),
        }),
    }
}

/// Find the best target for one raw source name.
///
/// Returns `None` for an empty source name, an empty target list, or when
/// the best score stays below `threshold`.
pub fn find_best_match(
    scorer: &Scorer,
    source_name: &str,
    targets: &[NameRecord],
    threshold: f64,
) -> Option<MatchCandidate> {
    match evaluate(scorer, source_name, targets, threshold) {
        BestMatch::Accepted(candidate) => Some(candidate),
        BestMatch::Rejected(_) => None,
    }
}

/// Like [`find_best_match`], but reports why a source was rejected.
pub fn evaluate(
    scorer: &Scorer,
    source_name: &str,
    targets: &[NameRecord],
    threshold: f64,
) -> BestMatch {
    let source = scorer.prepare(source_name);
    if source.is_empty() {
        return BestMatch::Rejected(UnmatchedReason::EmptyName);
    }
    let prepared: Vec<PreparedKey> = targets.iter().map(|t| scorer.prepare(t.display_name())).collect();
    let best = scan(
        scorer,
        &source,
        targets
            .iter()
            .zip(&prepared)
            .enumerate()
            .map(|(i, (t, p))| (i, t.id.as_str(), p)),
    );
    decide(&source, best, threshold)
}

// ============================================================================
// Batch Reconciler
// ============================================================================

/// Validated configuration plus a scorer built from it.
#[derive(Clone, Debug)]
pub struct Reconciler {
    config: ReconcileConfig,
    scorer: Scorer,
}

impl Reconciler {
    /// Validate `config` and build a reconciler; malformed configs fail here.
    pub fn new(config: ReconcileConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let scorer = Scorer::new(config.scoring.clone());
        Ok(Self { config, scorer })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Score two raw names with this reconciler's scoring config.
    pub fn score(&self, source_name: &str, target_name: &str) -> ScoreBreakdown {
        self.scorer.score(source_name, target_name)
    }

    /// Best target for one source name at the configured threshold.
    pub fn best_match(&self, source_name: &str, targets: &[NameRecord]) -> Option<MatchCandidate> {
        find_best_match(&self.scorer, source_name, targets, self.config.acceptance_threshold)
    }

    /// Match every source against the targets.
    pub fn reconcile(&self, sources: &[NameRecord], targets: &[NameRecord]) -> ReconcileReport {
        self.reconcile_with_progress(sources, targets, |_| {})
    }

    /// [`Reconciler::reconcile`] with a callback invoked after each processed source.
    pub fn reconcile_with_progress(
        &self,
        sources: &[NameRecord],
        targets: &[NameRecord],
        mut on_source: impl FnMut(&NameRecord),
    ) -> ReconcileReport {
        let threshold = self.config.acceptance_threshold;
        let exclusive = self.config.exclusive_targets;

        let prepared_targets: Vec<PreparedKey> = targets
            .iter()
            .map(|t| self.scorer.prepare(t.display_name()))
            .collect();
        let prepared_sources: Vec<PreparedKey> = sources
            .iter()
            .map(|s| self.scorer.prepare(s.display_name()))
            .collect();

        let order = processing_order(&prepared_sources, self.config.source_order);

        // Keyed by id: duplicate target rows stand for one database record.
        let mut claimed: FxHashSet<&str> = FxHashSet::default();
        let mut matches = Vec::new();
        let mut unmatched = Vec::new();

        for idx in order {
            let source = &sources[idx];
            let key = &prepared_sources[idx];

            let outcome = if key.is_empty() {
                BestMatch::Rejected(UnmatchedReason::EmptyName)
            } else {
                let pool = targets
                    .iter()
                    .zip(&prepared_targets)
                    .enumerate()
                    .filter(|(_, (t, _))| !(exclusive && claimed.contains(t.id.as_str())))
                    .map(|(i, (t, p))| (i, t.id.as_str(), p));
                decide(key, scan(&self.scorer, key, pool), threshold)
            };

            match outcome {
                BestMatch::Accepted(candidate) => {
                    claimed.insert(targets[candidate.target_index].id.as_str());
                    matches.push(MatchedPair {
                        source: source.clone(),
                        target: targets[candidate.target_index].clone(),
                        score: candidate.score,
                        tier: self.config.tier_for(candidate.score).to_string(),
                        breakdown: candidate.breakdown,
                    });
                }
                BestMatch::Rejected(reason) => unmatched.push(UnmatchedSource {
                    source: source.clone(),
                    reason,
                }),
            }

            on_source(source);
        }

        let unclaimed_targets: Vec<NameRecord> = targets
            .iter()
            .filter(|t| !claimed.contains(t.id.as_str()))
            .cloned()
            .collect();

        let summary = self.summarize(sources.len(), targets.len(), &matches, &unmatched, &unclaimed_targets);

        ReconcileReport {
            acceptance_threshold: threshold,
            exclusive_targets: exclusive,
            matches,
            unmatched,
            unclaimed_targets,
            summary,
        }
    }

    /// Fold pass results into summary counts.
    fn summarize(
        &self,
        total_sources: usize,
        total_targets: usize,
        matches: &[MatchedPair],
        unmatched: &[UnmatchedSource],
        unclaimed: &[NameRecord],
    ) -> MatchSummary {
        let tiers = self
            .config
            .confidence_tiers
            .iter()
            .map(|tier| TierCount {
                label: tier.label.clone(),
                count: matches.iter().filter(|m| m.tier == tier.label).count(),
            })
            .collect();

        MatchSummary {
            total_sources,
            total_targets,
            matched: matches.len(),
            unmatched: unmatched.len(),
            unclaimed_targets: unclaimed.len(),
            tiers,
        }
    }
}

/// Indices of `sources` in the order they should be processed.
fn processing_order(sources: &[PreparedKey], order: SourceOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..sources.len()).collect();
    if order == SourceOrder::LongestKeyFirst {
        // sort_by_key is stable, ties keep input order
        indices.sort_by_key(|&i| std::cmp::Reverse(sources[i].key.len()));
    }
    indices
}

// ============================================================================
// TESTS
// ============================================================================
