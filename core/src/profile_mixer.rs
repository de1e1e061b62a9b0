//! Profile mixer: derives a segment's elasticity profile by blending
//! behavioural archetypes.
//!
//! Two steps:
//!   1. mix():   segment axes → normalised archetype weights (table join).
//!   2. blend(): weights → one ElasticityProfile.
//!
//! Scalars and the time-lag distribution are convex combinations of the
//! archetype values. The curve shape is categorical and is inherited from
//! the dominant archetype. One bounded jitter draw then scales both
//! elasticities, and premium tiers are damped last.

use crate::{
    archetype::{ArchetypeCatalog, ArchetypeKind, ArchetypeParams, CurveShape, TimeLagDistribution},
    config::{MixerConfig, ModelConfig},
    error::{ModelError, ModelResult},
    rng::ModelRng,
    segment_axes::SegmentAxes,
    types::Tier,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Archetype weights summing to 1.0, or empty for the baseline cohort.
///
/// Deserialised maps go through `normalize`, so a raw `{"deal_hunter": 2.0}`
/// arrives as full weight on one archetype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    try_from = "BTreeMap<ArchetypeKind, f64>",
    into = "BTreeMap<ArchetypeKind, f64>"
)]
pub struct ProfileWeights {
    weights: BTreeMap<ArchetypeKind, f64>,
}

/// Tolerance on the weight total accepted by `blend`.
const WEIGHT_TOTAL_TOLERANCE: f64 = 1e-9;

impl ProfileWeights {
    /// Sum raw contributions per archetype and renormalise.
    ///
    /// Fails when any contribution is negative or non-finite, or when the
    /// total is zero: every segment must map to at least one archetype.
    pub fn normalize<I>(raw: I, context: &str) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (ArchetypeKind, f64)>,
    {
        let mut weights: BTreeMap<ArchetypeKind, f64> = BTreeMap::new();
        for (kind, w) in raw {
            if !w.is_finite() || w < 0.0 {
                return Err(ModelError::NegativeWeight {
                    archetype: kind.as_str().to_string(),
                    weight:    w,
                });
            }
            *weights.entry(kind).or_insert(0.0) += w;
        }

        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(ModelError::ZeroWeightTotal { context: context.to_string() });
        }

        for w in weights.values_mut() {
            *w /= total;
        }
        Ok(Self { weights })
    }

    /// No archetype weight at all. Only the baseline cohort carries this;
    /// `blend` rejects it.
    pub(crate) fn empty() -> Self {
        Self { weights: BTreeMap::new() }
    }

    /// Full weight on a single archetype.
    pub fn single(kind: ArchetypeKind) -> Self {
        Self { weights: BTreeMap::from([(kind, 1.0)]) }
    }

    pub fn get(&self, kind: ArchetypeKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeKind, f64)> + '_ {
        self.weights.iter().map(|(k, w)| (*k, *w))
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl TryFrom<BTreeMap<ArchetypeKind, f64>> for ProfileWeights {
    type Error = ModelError;

    fn try_from(raw: BTreeMap<ArchetypeKind, f64>) -> ModelResult<Self> {
        if raw.is_empty() {
            return Ok(Self::empty());
        }
        Self::normalize(raw, "deserialized weights")
    }
}

impl From<ProfileWeights> for BTreeMap<ArchetypeKind, f64> {
    fn from(w: ProfileWeights) -> Self {
        w.weights
    }
}

/// The blended output for one segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElasticityProfile {
    pub acquisition_elasticity:    f64,
    pub repeat_loss_elasticity:    f64,
    pub upgrade_willingness:       f64,
    pub downgrade_propensity:      f64,
    pub asymmetry_factor:          f64,
    pub tenure_decay_rate:         f64,
    pub engagement_offset:         f64,
    pub price_history_habituation: f64,
    pub time_lag_distribution:     TimeLagDistribution,
    pub curve_shape:               CurveShape,
    /// None for the baseline cohort, which is not a blend.
    pub dominant_archetype:        Option<ArchetypeKind>,
    /// Multiplicative jitter applied to both elasticities.
    pub jitter:                    f64,
    pub premium_adjusted:          bool,
    pub weights:                   ProfileWeights,
}

/// Which cohort a hand-picked profile should represent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CohortSelection {
    Baseline,
    Archetype(ArchetypeKind),
}

pub struct ProfileMixer {
    catalog: ArchetypeCatalog,
    config:  MixerConfig,
}

impl ProfileMixer {
    pub fn new(catalog: ArchetypeCatalog, config: MixerConfig) -> Self {
        Self { catalog, config }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.archetypes.clone(), config.mixing.clone())
    }

    pub fn catalog(&self) -> &ArchetypeCatalog {
        &self.catalog
    }

    /// Join the segment's axis values against the contribution table and
    /// normalise.
    pub fn mix(&self, axes: &SegmentAxes) -> ModelResult<ProfileWeights> {
        let mut raw = Vec::new();
        for &(kind, w) in axes.contributions() {
            self.catalog.get(kind)?;
            raw.push((kind, w));
        }
        ProfileWeights::normalize(raw, &format!("segment axes {}", axes.composite_key()))
    }

    /// Blend archetype parameters under `weights`.
    pub fn blend(
        &self,
        weights: &ProfileWeights,
        tier: Option<Tier>,
        rng: &mut ModelRng,
    ) -> ModelResult<ElasticityProfile> {
        let total = weights.total();
        if weights.is_empty() || total == 0.0 {
            return Err(ModelError::ZeroWeightTotal { context: "blend input".into() });
        }
        if (total - 1.0).abs() > WEIGHT_TOTAL_TOLERANCE {
            return Err(ModelError::UnnormalizedWeights { total });
        }
        for (kind, _) in weights.iter() {
            self.catalog.get(kind)?;
        }

        let (params, dominant) = self.blend_params(weights)?;

        let jitter = if self.config.jitter_pct > 0.0 {
            rng.uniform(-self.config.jitter_pct, self.config.jitter_pct)
        } else {
            0.0
        };

        let profile = self.finish(params, weights.clone(), Some(dominant), jitter, tier);

        log::debug!(
            "mixer: dominant={} acq={:.3} rl={:.3} jitter={:+.4} premium={}",
            dominant,
            profile.acquisition_elasticity,
            profile.repeat_loss_elasticity,
            jitter,
            profile.premium_adjusted,
        );

        Ok(profile)
    }

    /// mix() then blend().
    pub fn profile_for(
        &self,
        axes: &SegmentAxes,
        tier: Option<Tier>,
        rng: &mut ModelRng,
    ) -> ModelResult<ElasticityProfile> {
        let weights = self.mix(axes)?;
        self.blend(&weights, tier, rng)
    }

    /// An unjittered profile for one archetype or the all-cohort baseline.
    pub fn cohort_profile(
        &self,
        selection: CohortSelection,
        tier: Option<Tier>,
    ) -> ModelResult<ElasticityProfile> {
        match selection {
            CohortSelection::Baseline => Ok(self.finish(
                self.catalog.baseline().clone(),
                ProfileWeights::empty(),
                None,
                0.0,
                tier,
            )),
            CohortSelection::Archetype(kind) => {
                let archetype = self.catalog.get(kind)?;
                Ok(self.finish(
                    archetype.params.clone(),
                    ProfileWeights::single(kind),
                    Some(kind),
                    0.0,
                    tier,
                ))
            }
        }
    }

    /// Weighted sum of every scalar and lag bucket, plus the argmax
    /// archetype (first in catalog order on ties).
    fn blend_params(&self, weights: &ProfileWeights) -> ModelResult<(ArchetypeParams, ArchetypeKind)> {
        let mut acq = 0.0;
        let mut rl = 0.0;
        let mut up = 0.0;
        let mut down = 0.0;
        let mut decay = 0.0;
        let mut engagement = 0.0;
        let mut habituation = 0.0;
        let mut asymmetry = 0.0;
        let mut lag = [0.0; TimeLagDistribution::BUCKETS];
        let mut dominant: Option<(ArchetypeKind, f64, CurveShape)> = None;

        for archetype in self.catalog.archetypes() {
            let w = weights.get(archetype.kind);
            let p = &archetype.params;

            acq         += p.acquisition_elasticity * w;
            rl          += p.repeat_loss_elasticity * w;
            up          += p.migration_upgrade * w;
            down        += p.migration_downgrade * w;
            decay       += p.tenure_decay_rate * w;
            engagement  += p.engagement_offset * w;
            habituation += p.price_history_habituation * w;
            asymmetry   += p.migration_asymmetry_factor * w;
            for (acc, b) in lag.iter_mut().zip(p.time_lag_distribution.buckets()) {
                *acc += b * w;
            }

            if dominant.is_none_or(|(_, best, _)| w > best) {
                dominant = Some((archetype.kind, w, p.repeat_loss_curve_type));
            }
        }

        let (kind, _, curve) = dominant.ok_or_else(|| ModelError::ZeroWeightTotal {
            context: "empty archetype catalog".into(),
        })?;

        let params = ArchetypeParams {
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
        };
        Ok((params, kind))
    }

    fn finish(
        &self,
        params: ArchetypeParams,
        weights: ProfileWeights,
        dominant: Option<ArchetypeKind>,
        jitter: f64,
        tier: Option<Tier>,
    ) -> ElasticityProfile {
        let premium = tier.is_some_and(|t| t.is_premium());
        let (acq_scale, rl_scale) = if premium {
            (self.config.premium_acquisition_scale, self.config.premium_repeat_loss_scale)
        } else {
            (1.0, 1.0)
        };

        ElasticityProfile {
            acquisition_elasticity:    params.acquisition_elasticity * (1.0 + jitter) * acq_scale,
            repeat_loss_elasticity:    params.repeat_loss_elasticity * (1.0 + jitter) * rl_scale,
            upgrade_willingness:       params.migration_upgrade,
            downgrade_propensity:      params.migration_downgrade,
            asymmetry_factor:          params.migration_asymmetry_factor,
            tenure_decay_rate:         params.tenure_decay_rate,
            engagement_offset:         params.engagement_offset,
            price_history_habituation: params.price_history_habituation,
            time_lag_distribution:     params.time_lag_distribution,
            curve_shape:               params.repeat_loss_curve_type,
            dominant_archetype:        dominant,
            jitter,
            premium_adjusted:          premium,
            weights,
        }
    }
}
