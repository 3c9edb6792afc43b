use std::fmt;

/// Configuration rejected at construction time.
///
/// Bad records never produce one of these; they simply fail to match.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// A scoring weight is negative, NaN or infinite.
    InvalidWeight { name: &'static str, value: f64 },
    /// A keyword increment is negative, NaN or infinite.
    InvalidKeywordBoost { keyword: String, value: f64 },
    /// A Roman-numeral adjustment is negative, NaN or infinite.
    InvalidRomanAdjustment { name: &'static str, value: f64 },
    /// Acceptance threshold outside [0, 1].
    ThresholdOutOfRange(f64),
    /// Minimum token length of zero.
    ZeroMinTokenLength,
    /// No confidence tiers configured.
    EmptyTiers,
    /// Tier boundary outside [0, 1].
    TierOutOfRange { label: String, min_score: f64 },
    /// Tier boundaries must strictly decrease.
    TiersNotDescending { label: String },
    /// Lowest tier starts above the acceptance threshold, so some matches would have no tier.
    TiersDoNotCoverThreshold { lowest: f64, threshold: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::InvalidWeight { name, value } => {
                write!(f, "weight '{name}' must be a finite non-negative number, got {value}")
            }
            Self::InvalidKeywordBoost { keyword, value } => {
                write!(f, "keyword '{keyword}' boost must be a finite non-negative number, got {value}")
            }
            Self::InvalidRomanAdjustment { name, value } => {
                write!(f, "'{name}' must be a finite non-negative number, got {value}")
            }
            Self::ThresholdOutOfRange(t) => {
                write!(f, "acceptance threshold must be within [0, 1], got {t}")
            }
            Self::ZeroMinTokenLength => write!(f, "min_token_length must be at least 1"),
            Self::EmptyTiers => write!(f, "at least one confidence tier is required"),
            Self::TierOutOfRange { label, min_score } => {
                write!(f, "tier '{label}' min_score must be within [0, 1], got {min_score}")
            }
            Self::TiersNotDescending { label } => {
                write!(f, "tier '{label}' must have a lower min_score than the tier before it")
            }
            Self::TiersDoNotCoverThreshold { lowest, threshold } => write!(
                f,
                "lowest tier starts at {lowest}, above the acceptance threshold {threshold}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
