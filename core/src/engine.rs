//! The scenario engine: fans one pricing scenario out across a segment batch.
//!
//! EXECUTION ORDER per evaluate():
//!   1. Validate the scenario and the batch (no prediction runs on bad input)
//!   2. Migration matrix, once per scenario (it has no segment inputs)
//!   3. Per segment, in parallel:
//!        a. Resolve elasticity (mixed profile if the segment has axes)
//!        b. Acquisition
//!        c. Repeat loss
//!
//! RULES:
//!   - Segments never see each other. Results come back in input order.
//!   - Every jitter draw comes from the segment's own RngBank stream, so a
//!     seeded batch is reproducible regardless of thread scheduling.

use crate::{
    acquisition::{AcquisitionPredictor, AcquisitionResult, SegmentAcquisitionResult},
    config::ModelConfig,
    error::ModelResult,
    migration::{MigrationMatrix, MigrationPredictor, TierTopology},
    profile_mixer::{CohortSelection, ElasticityProfile, ProfileMixer},
    repeat_loss::{Horizon, RepeatLossPredictor, RepeatLossResult, SegmentRepeatLossResult},
    rng::RngBank,
    scenario::{validate_batch, Scenario, Segment},
    types::{SegmentName, Tier},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentEvaluation {
    pub name:        SegmentName,
    pub size:        u64,
    /// The elasticity both predictors were fed.
    pub elasticity:  f64,
    pub profile:     Option<ElasticityProfile>,
    pub acquisition: SegmentAcquisitionResult,
    pub repeat_loss: SegmentRepeatLossResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioEvaluation {
    pub tier_config: TierTopology,
    pub migration:   MigrationMatrix,
    pub segments:    Vec<SegmentEvaluation>,
}

impl ScenarioEvaluation {
    pub fn total_predicted_adds(&self) -> f64 {
        self.segments.iter().map(|s| s.acquisition.predicted_adds).sum()
    }

    pub fn segment(&self, name: &str) -> Option<&SegmentEvaluation> {
        self.segments.iter().find(|s| s.name == name)
    }
}

pub struct ScenarioEngine {
    mixer:       ProfileMixer,
    acquisition: AcquisitionPredictor,
    repeat_loss: RepeatLossPredictor,
    migration:   MigrationPredictor,
    rng_bank:    RngBank,
}

impl ScenarioEngine {
    pub fn new(config: &ModelConfig, seed: u64) -> Self {
        Self::with_rng_bank(config, RngBank::new(seed))
    }

    /// Jitter drawn from an OS-seeded bank. Not reproducible unless the
    /// logged seed is fed back through `new`.
    pub fn from_entropy(config: &ModelConfig) -> Self {
        Self::with_rng_bank(config, RngBank::from_entropy())
    }

    pub fn with_rng_bank(config: &ModelConfig, rng_bank: RngBank) -> Self {
        Self {
            mixer:       ProfileMixer::from_config(config),
            acquisition: AcquisitionPredictor::from_config(config),
            repeat_loss: RepeatLossPredictor::from_config(config),
            migration:   MigrationPredictor::from_config(config),
            rng_bank,
        }
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.master_seed()
    }

    pub fn mixer(&self) -> &ProfileMixer {
        &self.mixer
    }

    // ── Single-axis entry points ─────────────────────────────────────────────

    /// Reference-population acquisition at `scenario.segment_elasticity`.
    pub fn predict_acquisition(&self, scenario: &Scenario) -> ModelResult<AcquisitionResult> {
        scenario.validate()?;
        Ok(self.acquisition.predict(scenario, scenario.segment_elasticity))
    }

    pub fn predict_acquisition_by_segment(
        &self,
        scenario: &Scenario,
        segments: &[Segment],
    ) -> ModelResult<Vec<SegmentAcquisitionResult>> {
        self.check(scenario, segments)?;
        segments
            .par_iter()
            .enumerate()
            .map(|(idx, segment)| {
                let (elasticity, _) = self.resolve_elasticity(scenario, idx, segment)?;
                Ok(self.acquisition.predict_segment(scenario, segment, elasticity))
            })
            .collect()
    }

    pub fn predict_repeat_loss_by_horizon(
        &self,
        scenario: &Scenario,
    ) -> ModelResult<BTreeMap<Horizon, RepeatLossResult>> {
        scenario.validate()?;
        Ok(self.repeat_loss.predict_by_horizon(scenario))
    }

    pub fn predict_repeat_loss_by_segment(
        &self,
        scenario: &Scenario,
        segments: &[Segment],
    ) -> ModelResult<Vec<SegmentRepeatLossResult>> {
        self.check(scenario, segments)?;
        segments
            .par_iter()
            .enumerate()
            .map(|(idx, segment)| {
                let (elasticity, _) = self.resolve_elasticity(scenario, idx, segment)?;
                Ok(self.repeat_loss.predict_segment(scenario, segment, elasticity))
            })
            .collect()
    }

    pub fn predict_migration_matrix(&self, scenario: &Scenario) -> ModelResult<MigrationMatrix> {
        scenario.validate()?;
        Ok(self.migration.predict_matrix(scenario))
    }

    /// Unjittered profile for the baseline cohort or a single archetype.
    pub fn cohort_profile(
        &self,
        selection: CohortSelection,
        tier: Option<Tier>,
    ) -> ModelResult<ElasticityProfile> {
        let profile = self.mixer.cohort_profile(selection, tier)?;
        log::debug!(
            "engine: cohort {:?} acq={:.3} rl={:.3}",
            selection,
            profile.acquisition_elasticity,
            profile.repeat_loss_elasticity,
        );
        Ok(profile)
    }

    // ── Full evaluation ──────────────────────────────────────────────────────

    pub fn evaluate(
        &self,
        scenario: &Scenario,
        segments: &[Segment],
    ) -> ModelResult<ScenarioEvaluation> {
        self.check(scenario, segments)?;

        let migration = self.migration.predict_matrix(scenario);

        let evaluated: Vec<SegmentEvaluation> = segments
            .par_iter()
            .enumerate()
            .map(|(idx, segment)| self.evaluate_segment(scenario, idx, segment))
            .collect::<ModelResult<_>>()?;

        let evaluation = ScenarioEvaluation {
            tier_config: migration.tier_config,
            migration,
            segments: evaluated,
        };

        log::info!(
            "engine: evaluated {} segments price={:.2} topology={} total_adds={:.1} seed={:#x}",
            evaluation.segments.len(),
            scenario.new_price,
            evaluation.tier_config,
            evaluation.total_predicted_adds(),
            self.seed(),
        );

        Ok(evaluation)
    }

    fn evaluate_segment(
        &self,
        scenario: &Scenario,
        idx: usize,
        segment: &Segment,
    ) -> ModelResult<SegmentEvaluation> {
        let (elasticity, profile) = self.resolve_elasticity(scenario, idx, segment)?;

        Ok(SegmentEvaluation {
            name:        segment.name.clone(),
            size:        segment.size,
            elasticity,
            profile,
            acquisition: self.acquisition.predict_segment(scenario, segment, elasticity),
            repeat_loss: self.repeat_loss.predict_segment(scenario, segment, elasticity),
        })
    }

    fn check(&self, scenario: &Scenario, segments: &[Segment]) -> ModelResult<()> {
        scenario.validate()?;
        validate_batch(segments)
    }

    /// A segment with axes gets a mixed profile and uses its acquisition
    /// elasticity; otherwise its own elasticity is used as-is.
    fn resolve_elasticity(
        &self,
        scenario: &Scenario,
        idx: usize,
        segment: &Segment,
    ) -> ModelResult<(f64, Option<ElasticityProfile>)> {
        match &segment.axes {
            Some(axes) => {
                let mut rng = self.rng_bank.for_segment(idx);
                let profile = self.mixer.profile_for(axes, scenario.tier.tier(), &mut rng)?;
                log::debug!(
                    "engine: segment '{}' mixed from {} elasticity={:.3}",
                    segment.name,
                    axes.composite_key(),
                    profile.acquisition_elasticity,
                );
                Ok((profile.acquisition_elasticity, Some(profile)))
            }
            None => Ok((segment.elasticity, None)),
        }
    }
}
