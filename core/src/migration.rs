//! Tier migration model: one-step multinomial logit over tier moves.
//!
//! For each origin tier the subscriber chooses one of: stay, move to a
//! reachable tier, or cancel. "Stay" is the reference category (utility 0).
//! Each topology fixes which tiers exist and which moves are legal;
//! illegal moves are masked out of the softmax rather than given a
//! sentinel utility, and are reported as 0.0.
//!
//! This is a single transition, not a multi-period chain.

use crate::{
    config::{MigrationCoefficients, ModelConfig, UtilityRow},
    numerics::masked_softmax,
    scenario::Scenario,
    types::{Tier, TierLabel},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const BUNDLE_PRICE_BAND: (f64, f64) = (13.99, 15.99);
const BASIC_PRICE_BAND: (f64, f64) = (1.99, 3.99);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TierTopology {
    #[serde(rename = "2-tier")]
    TwoTier,
    #[serde(rename = "3-tier-bundle")]
    ThreeTierBundle,
    #[serde(rename = "3-tier-basic")]
    ThreeTierBasic,
}

impl TierTopology {
    pub const ALL: [TierTopology; 3] = [
        TierTopology::TwoTier,
        TierTopology::ThreeTierBundle,
        TierTopology::ThreeTierBasic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoTier         => "2-tier",
            Self::ThreeTierBundle => "3-tier-bundle",
            Self::ThreeTierBasic  => "3-tier-basic",
        }
    }

    /// Bundle if labelled so or priced in [13.99, 15.99]; else basic if
    /// labelled so or priced in [1.99, 3.99]; else 2-tier. Both bands are
    /// inclusive at each end.
    pub fn detect(scenario: &Scenario) -> Self {
        let tier = scenario.tier.tier();
        let price = scenario.new_price;
        let in_band = |(lo, hi): (f64, f64)| price >= lo && price <= hi;

        if tier == Some(Tier::Bundle) || in_band(BUNDLE_PRICE_BAND) {
            return Self::ThreeTierBundle;
        }
        if tier == Some(Tier::Basic) || in_band(BASIC_PRICE_BAND) {
            return Self::ThreeTierBasic;
        }
        if let TierLabel::Other(label) = &scenario.tier {
            log::warn!("migration: unrecognised tier label '{label}', using 2-tier layout");
        }
        Self::TwoTier
    }

    /// Tiers that exist in this layout.
    pub fn tiers(&self) -> &'static [Tier] {
        match self {
            Self::TwoTier         => &[Tier::AdSupported, Tier::AdFree],
            Self::ThreeTierBundle => &[Tier::AdSupported, Tier::AdFree, Tier::Bundle],
            Self::ThreeTierBasic  => &[Tier::Basic, Tier::AdSupported, Tier::AdFree],
        }
    }

    /// Tiers reachable in one move from `origin` (stay and cancel are
    /// always available and not listed).
    pub fn reachable(&self, origin: Tier) -> &'static [Tier] {
        use Tier::*;
        match (self, origin) {
            (Self::TwoTier, AdSupported)         => &[AdFree],
            (Self::TwoTier, AdFree)              => &[AdSupported],
            (Self::ThreeTierBundle, AdSupported) => &[AdFree, Bundle],
            (Self::ThreeTierBundle, AdFree)      => &[Bundle, AdSupported],
            (Self::ThreeTierBundle, Bundle)      => &[AdFree, AdSupported],
            (Self::ThreeTierBasic, Basic)        => &[AdSupported, AdFree],
            (Self::ThreeTierBasic, AdSupported)  => &[AdFree, Basic],
            (Self::ThreeTierBasic, AdFree)       => &[AdSupported, Basic],
            _ => &[],
        }
    }
}

impl fmt::Display for TierTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Stay,
    ToBasic,
    ToAdSupported,
    ToAdFree,
    ToBundle,
    Cancel,
}

impl Destination {
    pub fn to(tier: Tier) -> Self {
        match tier {
            Tier::Basic       => Self::ToBasic,
            Tier::AdSupported => Self::ToAdSupported,
            Tier::AdFree      => Self::ToAdFree,
            Tier::Bundle      => Self::ToBundle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stay          => "stay",
            Self::ToBasic       => "to_basic",
            Self::ToAdSupported => "to_ad_supported",
            Self::ToAdFree      => "to_ad_free",
            Self::ToBundle      => "to_bundle",
            Self::Cancel        => "cancel",
        }
    }

    /// Every destination reported for `origin`, in report order.
    pub fn reported_for(origin: Tier) -> Vec<Destination> {
        std::iter::once(Self::Stay)
            .chain(Tier::ALL.into_iter().filter(|t| *t != origin).map(Self::to))
            .chain(std::iter::once(Self::Cancel))
            .collect()
    }

    fn target(&self) -> Option<Tier> {
        match self {
            Self::ToBasic       => Some(Tier::Basic),
            Self::ToAdSupported => Some(Tier::AdSupported),
            Self::ToAdFree      => Some(Tier::AdFree),
            Self::ToBundle      => Some(Tier::Bundle),
            Self::Stay | Self::Cancel => None,
        }
    }
}

/// Driver values a utility row is evaluated against. Unused drivers are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UtilityInputs {
    pub price_gap:            f64,
    pub has_promo:            f64,
    pub tenure_months:        f64,
    pub value_savings_pct:    f64,
    pub content_need:         f64,
    pub price_pressure:       f64,
    pub price_sensitivity:    f64,
    pub content_satisfaction: f64,
}

impl UtilityRow {
    pub fn score(&self, x: &UtilityInputs) -> f64 {
        self.intercept
            + self.price_gap * x.price_gap
            + self.has_promo * x.has_promo
            + self.tenure_months * x.tenure_months
            + self.value_savings_pct * x.value_savings_pct
            + self.content_need * x.content_need
            + self.price_pressure * x.price_pressure
            + self.price_sensitivity * x.price_sensitivity
            + self.content_satisfaction * x.content_satisfaction
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationMatrix {
    pub tier_config: TierTopology,
    /// origin tier → destination → probability.
    pub transitions: BTreeMap<Tier, BTreeMap<Destination, f64>>,
}

impl MigrationMatrix {
    /// 0.0 for unknown origins and unreported destinations.
    pub fn probability(&self, origin: Tier, destination: Destination) -> f64 {
        self.transitions
            .get(&origin)
            .and_then(|row| row.get(&destination))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Scenario-level inputs shared by every utility.
#[derive(Debug, Clone, Copy)]
struct ChoiceContext {
    has_promo: f64,
    /// Ad-free minus ad-supported price (2-tier only).
    price_gap: f64,
}

pub struct MigrationPredictor {
    coefficients: MigrationCoefficients,
}

impl MigrationPredictor {
    pub fn new(coefficients: MigrationCoefficients) -> Self {
        Self { coefficients }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.migration.clone())
    }

    fn context(&self, scenario: &Scenario) -> ChoiceContext {
        let d = &self.coefficients.drivers;
        let ad_supported = scenario.ad_supported_price.unwrap_or(d.default_ad_supported_price);
        let ad_free = scenario.ad_free_price.unwrap_or(d.default_ad_free_price);
        ChoiceContext {
            has_promo: if scenario.has_promo() { 1.0 } else { 0.0 },
            price_gap: ad_free - ad_supported,
        }
    }

    /// Utility of moving `origin` → `dest`, or None when the layout has no
    /// coefficient row for that move.
    fn tier_change_utility(
        &self,
        topology: TierTopology,
        origin: Tier,
        dest: Tier,
        ctx: ChoiceContext,
    ) -> Option<f64> {
        use Tier::*;
        use TierTopology::*;

        let d = &self.coefficients.drivers;
        let two = &self.coefficients.two_tier;
        let bundle = &self.coefficients.bundle;
        let basic = &self.coefficients.basic;

        let base = UtilityInputs { tenure_months: d.avg_tenure_months, ..Default::default() };
        let adjacent = UtilityInputs {
            price_gap: d.adjacent_tier_gap,
            has_promo: ctx.has_promo,
            ..base
        };

        let (row, x) = match (topology, origin, dest) {
            (TwoTier, AdSupported, AdFree) => (
                two.upgrade,
                UtilityInputs { price_gap: ctx.price_gap, has_promo: ctx.has_promo, ..base },
            ),
            (TwoTier, AdFree, AdSupported) => (
                two.downgrade,
                UtilityInputs { price_gap: ctx.price_gap.abs(), has_promo: ctx.has_promo, ..base },
            ),

            (ThreeTierBundle, AdSupported, AdFree) => (two.upgrade, adjacent),
            (ThreeTierBundle, AdSupported, Bundle) => (
                bundle.ad_supported_to_bundle,
                UtilityInputs {
                    value_savings_pct: d.bundle_savings_pct,
                    content_need: d.ad_supported_bundle_content_need,
                    ..base
                },
            ),
            (ThreeTierBundle, AdFree, Bundle) => (
                bundle.ad_free_to_bundle,
                UtilityInputs {
                    value_savings_pct: d.bundle_savings_pct,
                    content_need: d.ad_free_bundle_content_need,
                    ..base
                },
            ),
            (ThreeTierBundle, AdFree, AdSupported) => (two.downgrade, adjacent),
            (ThreeTierBundle, Bundle, AdFree) => (
                bundle.bundle_to_ad_free,
                UtilityInputs { price_pressure: d.bundle_ad_free_price_pressure, ..base },
            ),
            (ThreeTierBundle, Bundle, AdSupported) => (
                bundle.bundle_to_ad_supported,
                UtilityInputs { price_pressure: d.bundle_ad_supported_price_pressure, ..base },
            ),

            (ThreeTierBasic, Basic, AdSupported) => (
                basic.basic_to_ad_supported,
                UtilityInputs { content_need: d.basic_ad_supported_content_need, ..base },
            ),
            (ThreeTierBasic, Basic, AdFree) => (
                basic.basic_to_ad_free,
                UtilityInputs { content_need: d.basic_ad_free_content_need, ..base },
            ),
            (ThreeTierBasic, AdSupported, AdFree) => (two.upgrade, adjacent),
            (ThreeTierBasic, AdSupported, Basic) => (
                basic.ad_supported_to_basic,
                UtilityInputs {
                    price_sensitivity: d.ad_supported_basic_price_sensitivity,
                    content_satisfaction: d.ad_supported_basic_content_dissatisfaction,
                    ..base
                },
            ),
            (ThreeTierBasic, AdFree, AdSupported) => (two.downgrade, adjacent),
            (ThreeTierBasic, AdFree, Basic) => (
                basic.ad_free_to_basic,
                UtilityInputs { price_pressure: d.ad_free_basic_price_pressure, ..base },
            ),

            _ => return None,
        };

        Some(row.score(&x))
    }

    fn cancel_utility(&self, topology: TierTopology, origin: Tier, ctx: ChoiceContext) -> f64 {
        let d = &self.coefficients.drivers;
        let row = &self.coefficients.two_tier.cancel;

        match topology {
            TierTopology::TwoTier => {
                let gap = if origin == Tier::AdFree { ctx.price_gap.abs() } else { ctx.price_gap };
                row.score(&UtilityInputs {
                    price_gap: gap,
                    has_promo: ctx.has_promo,
                    tenure_months: d.avg_tenure_months,
                    ..Default::default()
                })
            }
            TierTopology::ThreeTierBundle | TierTopology::ThreeTierBasic => {
                // Higher tiers are stickier; basic is the least sticky.
                let offset = match origin {
                    Tier::AdSupported => 0.0,
                    Tier::AdFree      => d.ad_free_cancel_offset,
                    Tier::Bundle      => d.bundle_cancel_offset,
                    Tier::Basic       => d.basic_cancel_offset,
                };
                offset
                    + row.score(&UtilityInputs {
                        has_promo: ctx.has_promo,
                        tenure_months: d.avg_tenure_months,
                        ..Default::default()
                    })
            }
        }
    }

    /// Utilities for every reported destination of `origin`; None marks a
    /// move the topology does not allow.
    pub fn utilities(
        &self,
        scenario: &Scenario,
        topology: TierTopology,
        origin: Tier,
    ) -> Vec<(Destination, Option<f64>)> {
        let ctx = self.context(scenario);
        let reachable = topology.reachable(origin);

        Destination::reported_for(origin)
            .into_iter()
            .map(|dest| {
                let u = match dest.target() {
                    None if dest == Destination::Stay => Some(0.0),
                    None => Some(self.cancel_utility(topology, origin, ctx)),
                    Some(t) if reachable.contains(&t) => {
                        self.tier_change_utility(topology, origin, t, ctx)
                    }
                    Some(_) => None,
                };
                (dest, u)
            })
            .collect()
    }

    pub fn predict_matrix(&self, scenario: &Scenario) -> MigrationMatrix {
        let topology = TierTopology::detect(scenario);

        let transitions = topology
            .tiers()
            .iter()
            .map(|&origin| {
                let utilities = self.utilities(scenario, topology, origin);
                let masked: Vec<Option<f64>> = utilities.iter().map(|(_, u)| *u).collect();
                let probs = masked_softmax(&masked);
                let row: BTreeMap<Destination, f64> = utilities
                    .iter()
                    .map(|(d, _)| *d)
                    .zip(probs)
                    .collect();
                (origin, row)
            })
            .collect();

        log::debug!(
            "migration: topology={topology} price={:.2} promo={}",
            scenario.new_price,
            scenario.has_promo(),
        );

        MigrationMatrix { tier_config: topology, transitions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_rows_cover_exactly_the_reachable_moves() {
        let predictor = MigrationPredictor::from_config(&ModelConfig::builtin());
        let ctx = ChoiceContext { has_promo: 0.0, price_gap: 3.0 };

        for topology in TierTopology::ALL {
            for &origin in topology.tiers() {
                for dest in Tier::ALL.into_iter().filter(|t| *t != origin) {
                    let has_row = predictor.tier_change_utility(topology, origin, dest, ctx).is_some();
                    let allowed = topology.reachable(origin).contains(&dest);
                    assert_eq!(
                        has_row, allowed,
                        "{topology}: {origin} -> {dest} row={has_row} reachable={allowed}"
                    );
                }
            }
        }
    }

    #[test]
    fn reported_destinations_exclude_origin() {
        let dests = Destination::reported_for(Tier::AdFree);
        assert_eq!(dests.len(), 5);
        assert!(!dests.contains(&Destination::ToAdFree));
        assert_eq!(dests.first(), Some(&Destination::Stay));
        assert_eq!(dests.last(), Some(&Destination::Cancel));
    }
}
