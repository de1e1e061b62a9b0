//! Behavioural archetype catalog.
//!
//! Archetypes are fixed parameter vectors describing how a "pure" cohort
//! reacts to price. Segments are never assigned to a single archetype; the
//! profile mixer blends them. Catalog order is significant: it breaks ties
//! when selecting the dominant archetype.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

const LAG_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeKind {
    UltraLoyal,
    ValueConscious,
    DealHunter,
    ContentDriven,
    TierFlexible,
    PremiumSeeker,
    AtRisk,
}

impl ArchetypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UltraLoyal     => "ultra_loyal",
            Self::ValueConscious => "value_conscious",
            Self::DealHunter     => "deal_hunter",
            Self::ContentDriven  => "content_driven",
            Self::TierFlexible   => "tier_flexible",
            Self::PremiumSeeker  => "premium_seeker",
            Self::AtRisk         => "at_risk",
        }
    }
}

impl fmt::Display for ArchetypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the repeat-loss response curve over time.
/// Categorical: inherited from the dominant archetype, never blended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurveShape {
    DelayedRamp,
    Moderate,
    SharpSpikePlateau,
    ConditionalSpike,
    GentleSlope,
    Accelerating,
}

/// Share of the total repeat-loss response landing in each 4-week bucket
/// after a price change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TimeLagDistribution {
    #[serde(rename = "0_4_weeks")]
    pub weeks_0_4:   f64,
    #[serde(rename = "4_8_weeks")]
    pub weeks_4_8:   f64,
    #[serde(rename = "8_12_weeks")]
    pub weeks_8_12:  f64,
    #[serde(rename = "12_16_weeks")]
    pub weeks_12_16: f64,
    #[serde(rename = "16_20_weeks")]
    pub weeks_16_20: f64,
}

impl TimeLagDistribution {
    pub const BUCKETS: usize = 5;

    pub fn from_buckets(b: [f64; 5]) -> Self {
        Self {
            weeks_0_4:   b[0],
            weeks_4_8:   b[1],
            weeks_8_12:  b[2],
            weeks_12_16: b[3],
            weeks_16_20: b[4],
        }
    }

    pub fn buckets(&self) -> [f64; 5] {
        [self.weeks_0_4, self.weeks_4_8, self.weeks_8_12, self.weeks_12_16, self.weeks_16_20]
    }

    pub fn total(&self) -> f64 {
        self.buckets().iter().sum()
    }

    pub fn validate(&self, owner: &str) -> ModelResult<()> {
        if let Some(v) = self.buckets().iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(ModelError::InvalidTimeLag {
                owner:  owner.to_string(),
                reason: format!("bucket value {v} is negative or non-finite"),
            });
        }
        let total = self.total();
        if (total - 1.0).abs() > LAG_SUM_TOLERANCE {
            return Err(ModelError::InvalidTimeLag {
                owner:  owner.to_string(),
                reason: format!("buckets sum to {total:.6}, expected 1.0"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchetypeParams {
    pub acquisition_elasticity:    f64,
    pub repeat_loss_elasticity:    f64,
    pub migration_upgrade:         f64,
    pub migration_downgrade:       f64,
    /// Positive = grows more loyal with tenure; negative = fatigue.
    pub tenure_decay_rate:         f64,
    pub engagement_offset:         f64,
    pub price_history_habituation: f64,
    pub repeat_loss_curve_type:    CurveShape,
    /// Downgrade-to-upgrade speed ratio (> 1 favours downgrades).
    pub migration_asymmetry_factor: f64,
    pub time_lag_distribution:     TimeLagDistribution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Archetype {
    pub kind:  ArchetypeKind,
    pub label: String,
    #[serde(flatten)]
    pub params: ArchetypeParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawCatalog")]
pub struct ArchetypeCatalog {
    archetypes: Vec<Archetype>,
    /// Aggregate of all cohorts, used when no cohort is selected.
    baseline: ArchetypeParams,
}

/// Unchecked wire form; deserialisation always goes through `new`.
#[derive(Deserialize)]
struct RawCatalog {
    archetypes: Vec<Archetype>,
    baseline:   ArchetypeParams,
}

impl TryFrom<RawCatalog> for ArchetypeCatalog {
    type Error = ModelError;

    fn try_from(raw: RawCatalog) -> ModelResult<Self> {
        Self::new(raw.archetypes, raw.baseline)
    }
}

impl ArchetypeCatalog {
    pub fn new(archetypes: Vec<Archetype>, baseline: ArchetypeParams) -> ModelResult<Self> {
        let catalog = Self { archetypes, baseline };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Archetypes in catalog order.
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn baseline(&self) -> &ArchetypeParams {
        &self.baseline
    }

    pub fn get(&self, kind: ArchetypeKind) -> ModelResult<&Archetype> {
        self.archetypes
            .iter()
            .find(|a| a.kind == kind)
            .ok_or_else(|| ModelError::UnknownArchetype { name: kind.as_str().to_string() })
    }

    /// Every archetype appears once and carries a valid lag distribution.
    pub fn validate(&self) -> ModelResult<()> {
        for (i, a) in self.archetypes.iter().enumerate() {
            if self.archetypes[..i].iter().any(|b| b.kind == a.kind) {
                return Err(ModelError::Other(anyhow::anyhow!(
                    "archetype '{}' listed twice in catalog", a.kind
                )));
            }
            a.params.time_lag_distribution.validate(a.kind.as_str())?;
        }
        self.baseline.time_lag_distribution.validate("baseline")?;
        Ok(())
    }

    pub fn builtin() -> Self {
        use ArchetypeKind::*;
        use CurveShape::*;

        #[allow(clippy::too_many_arguments)]
        fn archetype(
            kind: ArchetypeKind,
            label: &str,
            acq: f64,
            rl: f64,
            up: f64,
            down: f64,
            decay: f64,
            engagement: f64,
            habituation: f64,
            curve: CurveShape,
            asymmetry: f64,
            lag: [f64; 5],
        ) -> Archetype {
            Archetype {
                kind,
                label: label.to_string(),
                params: ArchetypeParams {
                    acquisition_elasticity:     acq,
                    repeat_loss_elasticity:     rl,
                    migration_upgrade:          up,
                    migration_downgrade:        down,
                    tenure_decay_rate:          decay,
                    engagement_offset:          engagement,
                    price_history_habituation:  habituation,
                    repeat_loss_curve_type:     curve,
                    migration_asymmetry_factor: asymmetry,
                    time_lag_distribution:      TimeLagDistribution::from_buckets(lag),
                },
            }
        }

        let archetypes = vec![
            archetype(UltraLoyal, "Habitual Streamers, Long-Tenure Loyalists",
                -0.65, 0.25, 1.4, 0.5, 0.08, 0.40, 0.20, DelayedRamp, 1.8,
                [0.05, 0.10, 0.20, 0.35, 0.30]),
            archetype(ValueConscious, "Ad-Value Seekers, Value-Perception Buyers",
                -1.8, 0.9, 0.8, 1.3, 0.03, 0.15, 0.05, Moderate, 2.2,
                [0.15, 0.25, 0.30, 0.20, 0.10]),
            archetype(DealHunter, "Promo-Only Users, Deal-Responsive Acquirers",
                -3.5, 1.6, 0.4, 2.0, 0.01, 0.05, 0.0, SharpSpikePlateau, 4.5,
                [0.40, 0.35, 0.15, 0.07, 0.03]),
            archetype(ContentDriven, "Content-Anchored Viewers, TVOD-to-SVOD Converters",
                -1.2, 0.7, 1.1, 0.9, 0.05, 0.25, 0.12, ConditionalSpike, 2.0,
                [0.12, 0.22, 0.30, 0.25, 0.11]),
            archetype(TierFlexible, "Price-Triggered Downgraders, Tier Switchers",
                -1.6, 0.85, 0.9, 2.7, 0.04, 0.18, 0.08, Moderate, 3.8,
                [0.18, 0.28, 0.28, 0.18, 0.08]),
            archetype(PremiumSeeker, "Ad-Free Loyalists, Ad-Intolerant Upgraders",
                -1.0, 0.4, 1.6, 0.4, 0.06, 0.30, 0.15, GentleSlope, 0.8,
                [0.08, 0.12, 0.18, 0.30, 0.32]),
            archetype(AtRisk, "At-Risk Lapsers, Dormant Subscribers",
                -2.0, 1.2, 0.5, 1.8, -0.02, 0.10, 0.03, Accelerating, 3.2,
                [0.25, 0.30, 0.25, 0.13, 0.07]),
        ];

        let baseline = ArchetypeParams {
            acquisition_elasticity:     -1.6,
            repeat_loss_elasticity:     0.8,
            migration_upgrade:          1.0,
            migration_downgrade:        1.2,
            tenure_decay_rate:          0.05,
            engagement_offset:          0.2,
            price_history_habituation:  0.1,
            repeat_loss_curve_type:     Moderate,
            migration_asymmetry_factor: 2.2,
            time_lag_distribution:      TimeLagDistribution::from_buckets([0.15, 0.25, 0.30, 0.20, 0.10]),
        };

        Self { archetypes, baseline }
    }
}
