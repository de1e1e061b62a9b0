//! Shared primitive types used across every predictor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A segment's unique name within one scenario batch.
pub type SegmentName = String;

/// Service tiers a subscriber can hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Basic,
    AdSupported,
    AdFree,
    Bundle,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Basic, Tier::AdSupported, Tier::AdFree, Tier::Bundle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic       => "basic",
            Self::AdSupported => "ad_supported",
            Self::AdFree      => "ad_free",
            Self::Bundle      => "bundle",
        }
    }

    /// Case-insensitive parse of a tier label.
    pub fn parse(label: &str) -> Option<Tier> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }

    /// Premium tiers are structurally less price-sensitive.
    pub fn is_premium(&self) -> bool {
        matches!(self, Self::AdFree | Self::Bundle)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tier label as supplied by a caller. Unknown labels are kept verbatim
/// so they can be reported; they select the 2-tier default downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TierLabel {
    Known(Tier),
    Other(String),
}

impl TierLabel {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Known(t) => Some(*t),
            Self::Other(_) => None,
        }
    }
}

impl Default for TierLabel {
    fn default() -> Self {
        Self::Known(Tier::AdSupported)
    }
}

impl From<Tier> for TierLabel {
    fn from(t: Tier) -> Self {
        Self::Known(t)
    }
}

impl From<String> for TierLabel {
    fn from(s: String) -> Self {
        match Tier::parse(&s) {
            Some(t) => Self::Known(t),
            None    => Self::Other(s),
        }
    }
}

impl From<TierLabel> for String {
    fn from(label: TierLabel) -> Self {
        match label {
            TierLabel::Known(t) => t.as_str().to_string(),
            TierLabel::Other(s) => s,
        }
    }
}
