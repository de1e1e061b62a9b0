//! Coefficient store: every fixed model constant, loaded once.
//!
//! RULE: Coefficients are never fitted at runtime. A ModelConfig is built
//! at startup (from `data/` or from the builtin literals), then passed
//! explicitly to each predictor. Nothing mutates it afterwards.

use crate::archetype::{Archetype, ArchetypeCatalog, ArchetypeParams};
use serde::{Deserialize, Serialize};

// ── Acquisition ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcquisitionCoefficients {
    /// log(baseline adds).
    pub intercept: f64,
    pub price: f64,
    /// Per discount percentage point.
    pub promo_discount: f64,
    pub is_promo: f64,
    pub segment_elasticity_factor: f64,
    /// Population the unscaled prediction refers to.
    pub reference_population: f64,
    pub segment_confidence_cap_pct: f64,
    /// Reported when a segment's scaled adds are not positive.
    pub segment_confidence_fallback_pct: f64,
}

impl Default for AcquisitionCoefficients {
    fn default() -> Self {
        Self {
            intercept:                       6.5,
            price:                           -0.25,
            promo_discount:                  0.03,
            is_promo:                        0.4,
            segment_elasticity_factor:       0.12,
            reference_population:            50_000.0,
            segment_confidence_cap_pct:      15.0,
            segment_confidence_fallback_pct: 10.0,
        }
    }
}

// ── Repeat loss ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HorizonCoefficients {
    pub weeks_0_4:     f64,
    pub weeks_4_8:     f64,
    pub weeks_8_12:    f64,
    pub weeks_12_plus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepeatLossCoefficients {
    /// log-odds of the 5% baseline.
    pub intercept: f64,
    pub price_change_pct: f64,
    /// Price-change interaction per horizon.
    pub horizons: HorizonCoefficients,
    pub segment_multiplier_floor: f64,
    pub segment_multiplier_span: f64,
    pub segment_elasticity_cap: f64,
}

impl Default for RepeatLossCoefficients {
    fn default() -> Self {
        Self {
            intercept:        -2.944,
            price_change_pct: 0.01,
            horizons: HorizonCoefficients {
                weeks_0_4:     0.006,
                weeks_4_8:     0.018,
                weeks_8_12:    0.028,
                weeks_12_plus: 0.008,
            },
            segment_multiplier_floor: 0.7,
            segment_multiplier_span:  0.6,
            segment_elasticity_cap:   4.0,
        }
    }
}

// ── Migration ──────────────────────────────────────────────────────

/// One destination's utility coefficients. Absent terms are zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct UtilityRow {
    pub intercept:            f64,
    pub price_gap:            f64,
    pub has_promo:            f64,
    pub tenure_months:        f64,
    pub value_savings_pct:    f64,
    pub content_need:         f64,
    pub price_pressure:       f64,
    pub price_sensitivity:    f64,
    pub content_satisfaction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwoTierRows {
    pub upgrade:   UtilityRow,
    pub downgrade: UtilityRow,
    pub cancel:    UtilityRow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleRows {
    pub ad_supported_to_bundle:  UtilityRow,
    pub ad_free_to_bundle:       UtilityRow,
    pub bundle_to_ad_free:       UtilityRow,
    pub bundle_to_ad_supported:  UtilityRow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasicRows {
    pub ad_supported_to_basic: UtilityRow,
    pub basic_to_ad_supported: UtilityRow,
    pub ad_free_to_basic:      UtilityRow,
    pub basic_to_ad_free:      UtilityRow,
}

/// Fixed driver values fed into the utility rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationDrivers {
    pub avg_tenure_months: f64,
    pub bundle_savings_pct: f64,
    /// Price gap between adjacent tiers in the 3-tier layouts.
    pub adjacent_tier_gap: f64,
    pub default_ad_supported_price: f64,
    pub default_ad_free_price: f64,

    pub ad_supported_bundle_content_need: f64,
    pub ad_free_bundle_content_need: f64,
    pub basic_ad_supported_content_need: f64,
    pub basic_ad_free_content_need: f64,

    pub bundle_ad_free_price_pressure: f64,
    pub bundle_ad_supported_price_pressure: f64,
    pub ad_free_basic_price_pressure: f64,

    pub ad_supported_basic_price_sensitivity: f64,
    pub ad_supported_basic_content_dissatisfaction: f64,

    /// Cancel-intercept shifts by origin in the 3-tier layouts.
    pub ad_free_cancel_offset: f64,
    pub bundle_cancel_offset: f64,
    pub basic_cancel_offset: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationCoefficients {
    pub two_tier: TwoTierRows,
    pub bundle:   BundleRows,
    pub basic:    BasicRows,
    pub drivers:  MigrationDrivers,
}

impl Default for MigrationCoefficients {
    fn default() -> Self {
        let row = UtilityRow::default();
        Self {
            two_tier: TwoTierRows {
                upgrade:   UtilityRow { intercept: -1.5, price_gap: -0.08, has_promo:  0.4, tenure_months:  0.01,  ..row },
                downgrade: UtilityRow { intercept: -2.8, price_gap:  0.08, has_promo: -0.3, tenure_months: -0.015, ..row },
                cancel:    UtilityRow { intercept: -2.5, price_gap:  0.05, has_promo: -0.2, tenure_months: -0.02,  ..row },
            },
            bundle: BundleRows {
                ad_supported_to_bundle: UtilityRow {
                    intercept: -2.6, value_savings_pct: 0.020, content_need: 0.5, tenure_months: 0.006, ..row
                },
                ad_free_to_bundle: UtilityRow {
                    intercept: -0.5, value_savings_pct: 0.03, content_need: 0.8, tenure_months: 0.012, ..row
                },
                bundle_to_ad_free: UtilityRow {
                    intercept: -4.0, price_pressure: 0.10, tenure_months: -0.018, ..row
                },
                bundle_to_ad_supported: UtilityRow {
                    intercept: -5.0, price_pressure: 0.15, tenure_months: -0.025, ..row
                },
            },
            basic: BasicRows {
                ad_supported_to_basic: UtilityRow {
                    intercept: -1.4, price_sensitivity: 0.12, content_satisfaction: -0.18, tenure_months: -0.010, ..row
                },
                basic_to_ad_supported: UtilityRow {
                    intercept: -1.2, content_need: 0.22, tenure_months: 0.015, ..row
                },
                ad_free_to_basic: UtilityRow {
                    intercept: -2.8, price_pressure: 0.15, tenure_months: -0.018, ..row
                },
                basic_to_ad_free: UtilityRow {
                    intercept: -3.0, content_need: 0.20, tenure_months: 0.010, ..row
                },
            },
            drivers: MigrationDrivers {
                avg_tenure_months:          12.0,
                bundle_savings_pct:         21.0, // $3.99 saved on $18.98 standalone
                adjacent_tier_gap:          3.0,
                default_ad_supported_price: 5.99,
                default_ad_free_price:      8.99,

                ad_supported_bundle_content_need: 0.15,
                ad_free_bundle_content_need:      0.45,
                basic_ad_supported_content_need:  0.40,
                basic_ad_free_content_need:       0.20,

                bundle_ad_free_price_pressure:      2.0,
                bundle_ad_supported_price_pressure: 3.0,
                ad_free_basic_price_pressure:       2.0,

                ad_supported_basic_price_sensitivity:       0.35,
                ad_supported_basic_content_dissatisfaction: 0.20,

                ad_free_cancel_offset: -0.3,
                bundle_cancel_offset:  -0.5,
                basic_cancel_offset:    0.5,
            },
        }
    }
}

// ── Profile mixing ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixerConfig {
    /// Half-width of the multiplicative jitter; 0 disables it.
    pub jitter_pct: f64,
    pub premium_acquisition_scale: f64,
    pub premium_repeat_loss_scale: f64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            jitter_pct:                0.05,
            premium_acquisition_scale: 0.75,
            premium_repeat_loss_scale: 0.70,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchetypeCatalogFile {
    archetypes: Vec<Archetype>,
    baseline:   ArchetypeParams,
    mixing:     MixerConfig,
}

// ── Root ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub acquisition: AcquisitionCoefficients,
    pub repeat_loss: RepeatLossCoefficients,
    pub migration:   MigrationCoefficients,
    pub archetypes:  ArchetypeCatalog,
    pub mixing:      MixerConfig,
}

impl ModelConfig {
    /// Load from the data/ directory.
    /// Without a data directory, use ModelConfig::builtin().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let acquisition: AcquisitionCoefficients =
            read_json(&format!("{data_dir}/coefficients/acquisition.json"))?;
        let repeat_loss: RepeatLossCoefficients =
            read_json(&format!("{data_dir}/coefficients/repeat_loss.json"))?;
        let migration: MigrationCoefficients =
            read_json(&format!("{data_dir}/coefficients/migration.json"))?;

        let catalog_file: ArchetypeCatalogFile =
            read_json(&format!("{data_dir}/archetypes/archetype_catalog.json"))?;
        let archetypes = ArchetypeCatalog::new(catalog_file.archetypes, catalog_file.baseline)
            .map_err(|e| anyhow::anyhow!("Invalid archetype catalog in {data_dir}: {e}"))?;

        log::debug!(
            "config: loaded {} archetypes from {data_dir}",
            archetypes.archetypes().len()
        );

        Ok(Self {
            acquisition,
            repeat_loss,
            migration,
            archetypes,
            mixing: catalog_file.mixing,
        })
    }

    /// The literal coefficient tables.
    pub fn builtin() -> Self {
        Self {
            acquisition: AcquisitionCoefficients::default(),
            repeat_loss: RepeatLossCoefficients::default(),
            migration:   MigrationCoefficients::default(),
            archetypes:  ArchetypeCatalog::builtin(),
            mixing:      MixerConfig::default(),
        }
    }

    /// Builtin tables with jitter switched off, for exact comparisons.
    pub fn without_jitter() -> Self {
        let mut config = Self::builtin();
        config.mixing.jitter_pct = 0.0;
        config
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}
