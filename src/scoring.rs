//! Pairwise scoring of normalized names.
//!
//! The composite score blends four signals:
//! - F: whole-key similarity (sequence-matcher ratio by default)
//! - C: how many meaningful source tokens appear in the target key
//! - K: domain keywords present on both sides ("tipografia", "taller", ...)
//! - R: agreement of trailing course-part numerals ("Taller I" vs "Taller II")
//!
//! `score = clamp01(wF*F + wC*C + wK*K + wR*R)`

use crate::config::ScoringConfig;
use crate::models::ScoreBreakdown;
use crate::normalize::{key_tokens, normalize_key, trailing_roman_numeral};

// ============================================================================
// Prepared Keys
// ============================================================================

/// A normalized name with the pieces the scorer needs precomputed.
///
/// Targets are prepared once per pass instead of once per comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedKey {
    pub key: String,
    pub tokens: Vec<String>,
    pub numeral: Option<String>,
}

impl PreparedKey {
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// Scores (source, target) pairs with an injected vocabulary and weights.
#[derive(Clone, Debug)]
pub struct Scorer {
    config: ScoringConfig,
    /// Keyword boosts with normalized keywords, so "Disseny" in a config still hits "disseny"
    keywords: Vec<(String, f64)>,
}

impl Scorer {
    /// Build a scorer. The config is assumed validated.
    pub fn new(config: ScoringConfig) -> Self {
        let keywords = config
            .keyword_boosts
            .iter()
            .map(|(k, &v)| (normalize_key(k), v))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { config, keywords }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Normalize a display name and precompute its tokens and numeral.
    pub fn prepare(&self, name: &str) -> PreparedKey {
        let key = normalize_key(name);
        let tokens = key_tokens(&key, &self.config.stop_words, self.config.min_token_length)
            .into_iter()
            .map(str::to_string)
            .collect();
        let numeral = trailing_roman_numeral(&key);
        PreparedKey { key, tokens, numeral }
    }

    /// Score two raw display names.
    pub fn score(&self, source_name: &str, target_name: &str) -> ScoreBreakdown {
        self.score_prepared(&self.prepare(source_name), &self.prepare(target_name))
    }

    /// Score two prepared keys. An empty key on either side scores 0.
    pub fn score_prepared(&self, source: &PreparedKey, target: &PreparedKey) -> ScoreBreakdown {
        if source.is_empty() || target.is_empty() {
            return ScoreBreakdown::default();
        }

        let u = source.key.as_str();
        let s = target.key.as_str();

        let full_string = self.config.metric.similarity(u, s);
        let token_coverage = token_coverage(&source.tokens, s);
        let keyword_boost = self
            .keywords
            .iter()
            .filter(|(k, _)| u.contains(k.as_str()) && s.contains(k.as_str()))
            .map(|(_, v)| v)
            .sum::<f64>();
        let roman_numeral = match (&source.numeral, &target.numeral) {
            (Some(a), Some(b)) if a == b => self.config.roman_agree_bonus,
            (Some(_), Some(_)) => -self.config.roman_conflict_penalty,
            _ => 0.0,
        };

        let w = &self.config.weights;
        let weighted = w.full_string * full_string
            + w.token_coverage * token_coverage
            + w.keyword_boost * keyword_boost
            + w.roman_numeral * roman_numeral;

        let exact_key = self.config.exact_match_shortcut && u == s;
        let score = if exact_key { 1.0 } else { weighted.clamp(0.0, 1.0) };

        ScoreBreakdown {
            full_string,
            token_coverage,
            keyword_boost,
            roman_numeral,
            exact_key,
            score,
        }
    }
}

/// Fraction of `tokens` found verbatim inside `target_key`; 0 when there are no tokens.
pub fn token_coverage(tokens: &[String], target_key: &str) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let found = tokens.iter().filter(|t| target_key.contains(t.as_str())).count();
    found as f64 / tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityMetric;
    use proptest::prelude::*;

    fn scorer() -> Scorer {
        Scorer::new(ScoringConfig::default())
    }

    fn no_shortcut() -> Scorer {
        Scorer::new(ScoringConfig {
            exact_match_shortcut: false,
            ..ScoringConfig::default()
        })
    }

    #[test]
    fn test_prepare() {
        let key = scorer().prepare("Taller de Projectes II");
        assert_eq!(key.key, "taller_de_projectes_ii");
        assert_eq!(key.tokens, vec!["taller", "projectes"]);
        assert_eq!(key.numeral.as_deref(), Some("ii"));
    }

    #[test]
    fn test_exact_key_scores_one() {
        let b = scorer().score("expressio_grafica_i", "Expressió Gràfica I");
        assert!(b.exact_key);
        assert_eq!(b.score, 1.0);
        assert_eq!(b.full_string, 1.0);
        assert_eq!(b.token_coverage, 1.0);
        assert_eq!(b.roman_numeral, 0.3);
    }

    #[test]
    fn test_weighted_components_without_shortcut() {
        let b = no_shortcut().score("taller_i", "Taller I");
        assert!(!b.exact_key);
        assert_eq!(b.keyword_boost, 0.2);
        // 0.4*1 + 0.3*1 + 0.2*0.2 + 0.1*0.3
        assert!((b.score - 0.77).abs() < 1e-9);
    }

    #[test]
    fn test_roman_numeral_penalty() {
        for s in [scorer(), no_shortcut()] {
            let different = s.score("Taller I", "Taller II");
            let same = s.score("Taller I", "Taller I");
            assert_eq!(different.roman_numeral, -0.2);
            assert!(different.score < same.score);
        }
    }

    #[test]
    fn test_roman_numeral_needs_both_sides() {
        let b = scorer().score("Taller", "Taller II");
        assert_eq!(b.roman_numeral, 0.0);
    }

    #[test]
    fn test_keyword_boost_only_when_both_contain() {
        let s = scorer();
        assert_eq!(s.score("tipografia_i", "Fotografia I").keyword_boost, 0.0);
        assert_eq!(s.score("tipografia_ii", "Tipografia I").keyword_boost, 0.3);
        // Both keywords shared: 0.2 + 0.2
        let b = s.score("taller_projectes", "Taller de Projectes");
        assert!((b.keyword_boost - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_config_is_normalized() {
        let mut config = ScoringConfig::default();
        config.keyword_boosts.clear();
        config.keyword_boosts.insert("Fotografía".to_string(), 0.5);
        let s = Scorer::new(config);
        assert_eq!(s.score("fotografia_i", "Fotografia I").keyword_boost, 0.5);
    }

    #[test]
    fn test_token_coverage() {
        let tokens = vec!["historia".to_string(), "disseny".to_string()];
        assert_eq!(token_coverage(&tokens, "historia_del_disseny"), 1.0);
        assert_eq!(token_coverage(&tokens, "historia_de_lart"), 0.5);
        assert_eq!(token_coverage(&[], "historia"), 0.0);
    }

    #[test]
    fn test_empty_name_scores_zero() {
        let s = scorer();
        assert_eq!(s.score("", "Taller I"), ScoreBreakdown::default());
        assert_eq!(s.score("Taller I", " ... "), ScoreBreakdown::default());
    }

    #[test]
    fn test_keyword_sum_is_clamped() {
        let mut config = ScoringConfig::default();
        config.exact_match_shortcut = false;
        config.weights.keyword_boost = 1.0;
        let s = Scorer::new(config);
        let b = s.score("taller_disseny_projectes", "taller_disseny_projectes_audiovisual");
        assert!(b.keyword_boost > 0.5);
        assert_eq!(b.score, 1.0);
    }

    #[test]
    fn test_levenshtein_metric() {
        let config = ScoringConfig {
            metric: SimilarityMetric::NormalizedLevenshtein,
            exact_match_shortcut: false,
            ..ScoringConfig::default()
        };
        let b = Scorer::new(config).score("taller_i", "taller_ii");
        assert!((b.full_string - 8.0 / 9.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_score_bounded(a in "\\PC{0,30}", b in "\\PC{0,30}") {
            for s in [scorer(), no_shortcut()] {
                let score = s.score(&a, &b).score;
                prop_assert!((0.0..=1.0).contains(&score));
            }
        }

        #[test]
        fn prop_exact_match_is_maximal(a in "[a-z ]{1,20}", b in "[a-z ]{1,20}") {
            prop_assume!(!normalize_key(&a).is_empty());
            for s in [scorer(), no_shortcut()] {
                let self_score = s.score(&a, &a).score;
                prop_assert!(self_score >= s.score(&a, &b).score);
            }
        }
    }
}
