//! Segment axes and their archetype contributions.
//!
//! A segment is described along three independent axes. Each axis value
//! contributes a fixed partial weight to one or more archetypes; the mixer
//! sums contributions per archetype and normalises. The table below is the
//! whole mapping: adding an axis value means adding one row.

use crate::archetype::ArchetypeKind::{self, *};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type Contribution = (ArchetypeKind, f64);

macro_rules! axis_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                let s = s.trim();
                Self::ALL.iter().copied().find(|v| v.as_str() == s)
            }
        }
    };
}

axis_enum! {
    /// How the segment was acquired.
    AcquisitionOrigin {
        HabitualStreamers      => "habitual_streamers",
        ContentAnchoredViewers => "content_anchored_viewers",
        AtRiskLapsers          => "at_risk_lapsers",
        PromoOnlyUsers         => "promo_only_users",
        DormantCustomers       => "dormant_customers",
    }
}

axis_enum! {
    /// How the segment engages with ads and tiers.
    EngagementStyle {
        AdValueSeekers            => "ad_value_seekers",
        AdTolerantUpgraders       => "ad_tolerant_upgraders",
        AdFreeLoyalists           => "ad_free_loyalists",
        PriceTriggeredDowngraders => "price_triggered_downgraders",
        TvodInclinedBuyers        => "tvod_inclined_buyers",
    }
}

axis_enum! {
    /// How the segment pays.
    MonetizationStyle {
        PlatformBundledAcquirers => "platform_bundled_acquirers",
        TvodToSvodConverters     => "tvod_to_svod_converters",
        ContentTriggeredBuyers   => "content_triggered_buyers",
        DealResponsiveAcquirers  => "deal_responsive_acquirers",
        ValuePerceptionBuyers    => "value_perception_buyers",
    }
}

impl AcquisitionOrigin {
    pub fn contributions(&self) -> &'static [Contribution] {
        match self {
            Self::HabitualStreamers      => &[(UltraLoyal, 0.6), (ContentDriven, 0.2), (ValueConscious, 0.2)],
            Self::ContentAnchoredViewers => &[(ContentDriven, 0.6), (UltraLoyal, 0.25), (ValueConscious, 0.15)],
            Self::AtRiskLapsers          => &[(AtRisk, 0.7), (ValueConscious, 0.2), (TierFlexible, 0.1)],
            Self::PromoOnlyUsers         => &[(DealHunter, 0.7), (ValueConscious, 0.3)],
            Self::DormantCustomers       => &[(AtRisk, 0.6), (DealHunter, 0.25), (ValueConscious, 0.15)],
        }
    }
}

impl EngagementStyle {
    pub fn contributions(&self) -> &'static [Contribution] {
        match self {
            Self::AdValueSeekers            => &[(ValueConscious, 0.5), (DealHunter, 0.3), (TierFlexible, 0.2)],
            Self::AdTolerantUpgraders       => &[(TierFlexible, 0.4), (ValueConscious, 0.3), (PremiumSeeker, 0.3)],
            Self::AdFreeLoyalists           => &[(PremiumSeeker, 0.6), (UltraLoyal, 0.4)],
            Self::PriceTriggeredDowngraders => &[(TierFlexible, 0.5), (DealHunter, 0.3), (AtRisk, 0.2)],
            Self::TvodInclinedBuyers        => &[(ContentDriven, 0.5), (PremiumSeeker, 0.3), (ValueConscious, 0.2)],
        }
    }
}

impl MonetizationStyle {
    pub fn contributions(&self) -> &'static [Contribution] {
        match self {
            Self::PlatformBundledAcquirers => &[(UltraLoyal, 0.4), (ValueConscious, 0.4), (PremiumSeeker, 0.2)],
            Self::TvodToSvodConverters     => &[(ContentDriven, 0.5), (UltraLoyal, 0.3), (PremiumSeeker, 0.2)],
            Self::ContentTriggeredBuyers   => &[(ContentDriven, 0.6), (ValueConscious, 0.25), (UltraLoyal, 0.15)],
            Self::DealResponsiveAcquirers  => &[(DealHunter, 0.6), (ValueConscious, 0.3), (TierFlexible, 0.1)],
            Self::ValuePerceptionBuyers    => &[(ValueConscious, 0.6), (TierFlexible, 0.25), (DealHunter, 0.15)],
        }
    }
}

/// A segment's position on the three axes. Any axis may be unknown, but at
/// least one must be set for the segment to map onto an archetype.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct SegmentAxes {
    #[serde(default)]
    pub acquisition:  Option<AcquisitionOrigin>,
    #[serde(default)]
    pub engagement:   Option<EngagementStyle>,
    #[serde(default)]
    pub monetization: Option<MonetizationStyle>,
}

impl SegmentAxes {
    pub fn new(
        acquisition: AcquisitionOrigin,
        engagement: EngagementStyle,
        monetization: MonetizationStyle,
    ) -> Self {
        Self {
            acquisition:  Some(acquisition),
            engagement:   Some(engagement),
            monetization: Some(monetization),
        }
    }

    /// All contributions from every set axis, in axis order.
    pub fn contributions(&self) -> impl Iterator<Item = &'static Contribution> {
        let acq = self.acquisition.map(|a| a.contributions()).unwrap_or(&[]);
        let eng = self.engagement.map(|e| e.contributions()).unwrap_or(&[]);
        let mon = self.monetization.map(|m| m.contributions()).unwrap_or(&[]);
        acq.iter().chain(eng).chain(mon)
    }

    /// `acquisition|engagement|monetization`, with `*` for an unset axis.
    pub fn composite_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.acquisition.map_or("*", |a| a.as_str()),
            self.engagement.map_or("*", |e| e.as_str()),
            self.monetization.map_or("*", |m| m.as_str()),
        )
    }

    /// Every fully-specified axis combination (125 cells).
    pub fn grid() -> impl Iterator<Item = SegmentAxes> {
        AcquisitionOrigin::ALL.iter().flat_map(|&a| {
            EngagementStyle::ALL.iter().flat_map(move |&e| {
                MonetizationStyle::ALL.iter().map(move |&m| SegmentAxes::new(a, e, m))
            })
        })
    }
}

impl FromStr for SegmentAxes {
    type Err = String;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = key.split('|').collect();
        if parts.len() != 3 {
            return Err(format!("expected 'acquisition|engagement|monetization', got '{key}'"));
        }

        fn axis<T>(raw: &str, parse: fn(&str) -> Option<T>, what: &str) -> Result<Option<T>, String> {
            match raw.trim() {
                "*" | "" => Ok(None),
                s => parse(s).map(Some).ok_or_else(|| format!("unknown {what} value '{s}'")),
            }
        }

        Ok(Self {
            acquisition:  axis(parts[0], AcquisitionOrigin::parse, "acquisition")?,
            engagement:   axis(parts[1], EngagementStyle::parse, "engagement")?,
            monetization: axis(parts[2], MonetizationStyle::parse, "monetization")?,
        })
    }
}
