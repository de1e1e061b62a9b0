//! Repeat-loss model: attrition after a price change, by time horizon.
//!
//! Logistic regression with a base price-change effect and one
//! price-change interaction per horizon. The 8–12 week interaction is the
//! largest: attrition peaks once the first post-change renewals land.

use crate::{
    config::{ModelConfig, RepeatLossCoefficients},
    numerics::sigmoid,
    scenario::{Scenario, Segment},
    types::SegmentName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Horizon {
    #[serde(rename = "0-4 Weeks")]
    Weeks0To4,
    #[serde(rename = "4-8 Weeks")]
    Weeks4To8,
    #[serde(rename = "8-12 Weeks")]
    Weeks8To12,
    #[serde(rename = "12+ Weeks")]
    Weeks12Plus,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::Weeks0To4,
        Horizon::Weeks4To8,
        Horizon::Weeks8To12,
        Horizon::Weeks12Plus,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Weeks0To4   => "0-4 Weeks",
            Self::Weeks4To8   => "4-8 Weeks",
            Self::Weeks8To12  => "8-12 Weeks",
            Self::Weeks12Plus => "12+ Weeks",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RepeatLossResult {
    pub rate:      f64,
    pub uplift:    f64,
    pub uplift_pp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentRepeatLossResult {
    pub name:       SegmentName,
    pub size:       u64,
    pub multiplier: f64,
    /// Uplift in percentage points, scaled by the segment multiplier.
    pub uplift_pp:  BTreeMap<Horizon, f64>,
}

pub struct RepeatLossPredictor {
    coefficients: RepeatLossCoefficients,
}

impl RepeatLossPredictor {
    pub fn new(coefficients: RepeatLossCoefficients) -> Self {
        Self { coefficients }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.repeat_loss.clone())
    }

    fn horizon_coefficient(&self, horizon: Horizon) -> f64 {
        let h = &self.coefficients.horizons;
        match horizon {
            Horizon::Weeks0To4   => h.weeks_0_4,
            Horizon::Weeks4To8   => h.weeks_4_8,
            Horizon::Weeks8To12  => h.weeks_8_12,
            Horizon::Weeks12Plus => h.weeks_12_plus,
        }
    }

    pub fn log_odds(&self, price_change_pct: f64, horizon: Horizon) -> f64 {
        self.coefficients.intercept
            + self.coefficients.price_change_pct * price_change_pct
            + self.horizon_coefficient(horizon) * price_change_pct
    }

    pub fn predict_by_horizon(&self, scenario: &Scenario) -> BTreeMap<Horizon, RepeatLossResult> {
        let change = scenario.price_change_pct();
        let baseline = scenario.baseline_repeat_loss;

        let results: BTreeMap<_, _> = Horizon::ALL
            .into_iter()
            .map(|h| {
                let rate = sigmoid(self.log_odds(change, h));
                let uplift = rate - baseline;
                (h, RepeatLossResult { rate, uplift, uplift_pp: uplift * 100.0 })
            })
            .collect();

        log::debug!(
            "repeat_loss: change={change:+.2}% baseline={baseline:.3} peak_rate={:.4}",
            results.get(&Horizon::Weeks8To12).map_or(0.0, |r| r.rate),
        );

        results
    }

    /// Maps |elasticity| in [0, cap] onto [floor, floor + span].
    pub fn segment_multiplier(&self, elasticity: f64) -> f64 {
        let c = &self.coefficients;
        c.segment_multiplier_floor
            + (elasticity.abs().min(c.segment_elasticity_cap) / c.segment_elasticity_cap)
                * c.segment_multiplier_span
    }

    pub fn predict_segment(
        &self,
        scenario: &Scenario,
        segment: &Segment,
        elasticity: f64,
    ) -> SegmentRepeatLossResult {
        let multiplier = self.segment_multiplier(elasticity);
        let uplift_pp = self
            .predict_by_horizon(scenario)
            .into_iter()
            .map(|(h, r)| (h, r.uplift_pp * multiplier))
            .collect();

        SegmentRepeatLossResult {
            name: segment.name.clone(),
            size: segment.size,
            multiplier,
            uplift_pp,
        }
    }
}
