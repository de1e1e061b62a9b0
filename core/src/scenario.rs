//! Scenario, promotion and segment input records.
//!
//! Inputs are plain serde records. Every optional field has a documented
//! default; absence is never an error. Predictors only ever borrow them.

use crate::{
    error::{ModelError, ModelResult},
    segment_axes::SegmentAxes,
    types::{SegmentName, TierLabel},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_PRICE: f64 = 8.99;
pub const DEFAULT_SEGMENT_ELASTICITY: f64 = -1.8;
pub const DEFAULT_BASELINE_REPEAT_LOSS: f64 = 0.05;

fn default_price() -> f64 { DEFAULT_PRICE }
fn default_elasticity() -> f64 { DEFAULT_SEGMENT_ELASTICITY }
fn default_baseline_repeat_loss() -> f64 { DEFAULT_BASELINE_REPEAT_LOSS }
fn default_target_segment() -> String { "all".into() }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Promotion {
    /// Percentage off list price, 0–100.
    pub discount_pct: f64,
    #[serde(default)]
    pub duration_months: Option<u32>,
    #[serde(default, alias = "code")]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub eligibility: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Promotion {
    pub fn discount(discount_pct: f64) -> Self {
        Self {
            discount_pct,
            duration_months: None,
            promo_code: None,
            eligibility: None,
            kind: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Length of the promo window in days, when both dates are known.
    pub fn window_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days()),
            _ => None,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        if !(0.0..=100.0).contains(&self.discount_pct) {
            return Err(ModelError::InvalidPromotion {
                reason: format!("discount_pct {} outside [0, 100]", self.discount_pct),
            });
        }
        if let Some(days) = self.window_days() {
            if days < 0 {
                return Err(ModelError::InvalidPromotion {
                    reason: format!("end_date precedes start_date by {} days", -days),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    #[serde(default = "default_price")]
    pub new_price: f64,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub promotion: Option<Promotion>,
    #[serde(default)]
    pub tier: TierLabel,
    #[serde(default = "default_target_segment")]
    pub target_segment: String,
    #[serde(default)]
    pub price_change_pct: Option<f64>,
    #[serde(default = "default_baseline_repeat_loss")]
    pub baseline_repeat_loss: f64,
    /// Elasticity of the reference population behind `predict_acquisition`.
    #[serde(default = "default_elasticity")]
    pub segment_elasticity: f64,
    /// 2-tier migration inputs.
    #[serde(default)]
    pub ad_supported_price: Option<f64>,
    #[serde(default)]
    pub ad_free_price: Option<f64>,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            new_price:            DEFAULT_PRICE,
            current_price:        None,
            promotion:            None,
            tier:                 TierLabel::default(),
            target_segment:       default_target_segment(),
            price_change_pct:     None,
            baseline_repeat_loss: DEFAULT_BASELINE_REPEAT_LOSS,
            segment_elasticity:   DEFAULT_SEGMENT_ELASTICITY,
            ad_supported_price:   None,
            ad_free_price:        None,
            effective_date:       None,
        }
    }
}

impl Scenario {
    pub fn at_price(new_price: f64) -> Self {
        Self { new_price, ..Self::default() }
    }

    pub fn has_promo(&self) -> bool {
        self.promotion.is_some()
    }

    /// Discount in percentage points; 0 without a promotion.
    pub fn discount_pct(&self) -> f64 {
        self.promotion.as_ref().map_or(0.0, |p| p.discount_pct)
    }

    /// Explicit price change, else derived from `current_price`, else 0.
    pub fn price_change_pct(&self) -> f64 {
        if let Some(pct) = self.price_change_pct {
            return pct;
        }
        match self.current_price {
            Some(current) if current > 0.0 => (self.new_price - current) / current * 100.0,
            _ => 0.0,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        check_price("new_price", Some(self.new_price))?;
        check_price("current_price", self.current_price)?;
        check_price("ad_supported_price", self.ad_supported_price)?;
        check_price("ad_free_price", self.ad_free_price)?;
        if !self.price_change_pct().is_finite() {
            return Err(ModelError::InvalidScenario {
                reason: format!("price change {} is not finite", self.price_change_pct()),
            });
        }
        if !self.segment_elasticity.is_finite() {
            return Err(ModelError::InvalidScenario {
                reason: format!("segment_elasticity {} is not finite", self.segment_elasticity),
            });
        }
        if !(0.0..=1.0).contains(&self.baseline_repeat_loss) {
            return Err(ModelError::InvalidScenario {
                reason: format!("baseline_repeat_loss {} outside [0, 1]", self.baseline_repeat_loss),
            });
        }
        if let Some(promo) = &self.promotion {
            promo.validate()?;
        }
        Ok(())
    }
}

fn check_price(field: &str, price: Option<f64>) -> ModelResult<()> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(ModelError::InvalidScenario {
            reason: format!("{field} {p} must be a non-negative number"),
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub name: SegmentName,
    pub size: u64,
    /// Typically negative; the magnitude is the price sensitivity.
    #[serde(default = "default_elasticity")]
    pub elasticity: f64,
    /// When present, the engine mixes a profile instead of using `elasticity`.
    #[serde(default)]
    pub axes: Option<SegmentAxes>,
}

impl Segment {
    pub fn new(name: impl Into<String>, size: u64, elasticity: f64) -> Self {
        Self { name: name.into(), size, elasticity, axes: None }
    }

    pub fn with_axes(mut self, axes: SegmentAxes) -> Self {
        self.axes = Some(axes);
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.size == 0 {
            return Err(ModelError::InvalidSegment {
                name:   self.name.clone(),
                reason: "size must be positive".into(),
            });
        }
        if !self.elasticity.is_finite() {
            return Err(ModelError::InvalidSegment {
                name:   self.name.clone(),
                reason: format!("elasticity {} is not finite", self.elasticity),
            });
        }
        Ok(())
    }
}

/// Validate every segment and reject duplicate names.
pub fn validate_batch(segments: &[Segment]) -> ModelResult<()> {
    let mut seen = HashSet::new();
    for segment in segments {
        segment.validate()?;
        if !seen.insert(segment.name.as_str()) {
            return Err(ModelError::DuplicateSegment { name: segment.name.clone() });
        }
    }
    Ok(())
}
