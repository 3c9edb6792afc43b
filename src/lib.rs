//! Subject/teacher name reconciliation - shared modules for all binaries.

pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod safety;
pub mod scoring;
pub mod similarity;
pub mod sources;

pub use config::{ConfidenceTier, ReconcileConfig, ScoringConfig, SourceOrder, Weights};
pub use error::ConfigError;
pub use models::{MatchCandidate, NameRecord, ReconcileReport, ScoreBreakdown};
pub use reconcile::{find_best_match, Reconciler};
