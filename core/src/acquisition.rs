//! Acquisition model: new-customer adds under a price/promo scenario.
//!
//! Poisson GLM with fixed coefficients:
//!   log(adds) = β₀ + β₁·price + β₂·discount_pct + β₃·is_promo + β₄·|elasticity|
//!
//! The interval is the normal approximation with variance = mean.

use crate::{
    config::{AcquisitionCoefficients, ModelConfig},
    scenario::{Scenario, Segment},
    types::SegmentName,
};
use serde::{Deserialize, Serialize};

const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcquisitionResult {
    pub predicted_adds:   f64,
    pub ci_lower:         f64,
    pub ci_upper:         f64,
    /// Point price elasticity, β₁·price.
    pub elasticity:       f64,
    /// Coefficient of variation in percent.
    pub confidence_pct:   f64,
    pub linear_predictor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentAcquisitionResult {
    pub name:               SegmentName,
    pub size:               u64,
    pub predicted_adds:     f64,
    pub elasticity:         f64,
    pub lift_at_minus_5pct: f64,
    pub lift_at_plus_5pct:  f64,
    pub confidence_pct:     f64,
}

pub struct AcquisitionPredictor {
    coefficients: AcquisitionCoefficients,
}

impl AcquisitionPredictor {
    pub fn new(coefficients: AcquisitionCoefficients) -> Self {
        Self { coefficients }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.acquisition.clone())
    }

    pub fn linear_predictor(&self, scenario: &Scenario, segment_elasticity: f64) -> f64 {
        let c = &self.coefficients;
        let is_promo = if scenario.has_promo() { 1.0 } else { 0.0 };

        c.intercept
            + c.price * scenario.new_price
            + c.promo_discount * scenario.discount_pct()
            + c.is_promo * is_promo
            + c.segment_elasticity_factor * segment_elasticity.abs()
    }

    /// Expected adds for the reference population.
    pub fn predict(&self, scenario: &Scenario, segment_elasticity: f64) -> AcquisitionResult {
        let linear_predictor = self.linear_predictor(scenario, segment_elasticity);
        let predicted_adds = linear_predictor.exp();

        let se = predicted_adds.sqrt();
        let ci_lower = (predicted_adds - Z_95 * se).max(0.0);
        let ci_upper = predicted_adds + Z_95 * se;

        let confidence_pct = if predicted_adds > 0.0 {
            se / predicted_adds * 100.0
        } else {
            0.0
        };

        log::debug!(
            "acquisition: price={:.2} discount={:.1} lp={:.4} adds={:.1}",
            scenario.new_price,
            scenario.discount_pct(),
            linear_predictor,
            predicted_adds,
        );

        AcquisitionResult {
            predicted_adds,
            ci_lower,
            ci_upper,
            elasticity: self.coefficients.price * scenario.new_price,
            confidence_pct,
            linear_predictor,
        }
    }

    /// Scale the reference prediction to the segment's population.
    ///
    /// Smaller segments carry more relative uncertainty (1/√adds), capped so
    /// tiny segments never report an implausible spread.
    pub fn predict_segment(
        &self,
        scenario: &Scenario,
        segment: &Segment,
        elasticity: f64,
    ) -> SegmentAcquisitionResult {
        let c = &self.coefficients;
        let base = self.predict(scenario, elasticity);
        let segment_adds = base.predicted_adds * (segment.size as f64 / c.reference_population);

        let confidence = if segment_adds > 0.0 {
            100.0 / segment_adds.max(1.0).sqrt()
        } else {
            c.segment_confidence_fallback_pct
        };

        SegmentAcquisitionResult {
            name:               segment.name.clone(),
            size:               segment.size,
            predicted_adds:     segment_adds,
            elasticity,
            lift_at_minus_5pct: -5.0 * elasticity,
            lift_at_plus_5pct:  5.0 * elasticity,
            confidence_pct:     confidence.min(c.segment_confidence_cap_pct),
        }
    }
}
