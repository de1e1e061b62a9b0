use elasticity_core::{
    archetype::{ArchetypeKind, CurveShape},
    config::ModelConfig,
    error::ModelError,
    profile_mixer::{CohortSelection, ProfileMixer, ProfileWeights},
    rng::{ModelRng, RngBank},
    segment_axes::{AcquisitionOrigin, EngagementStyle, MonetizationStyle, SegmentAxes},
    types::Tier,
};

fn mixer(config: &ModelConfig) -> ProfileMixer {
    let _ = env_logger::builder().is_test(true).try_init();
    ProfileMixer::from_config(config)
}

fn promo_only() -> SegmentAxes {
    SegmentAxes {
        acquisition: Some(AcquisitionOrigin::PromoOnlyUsers),
        ..SegmentAxes::default()
    }
}

#[test]
fn weights_sum_to_one_across_the_full_grid() {
    let m = mixer(&ModelConfig::without_jitter());
    let mut rng = ModelRng::seeded(0);
    let mut cells = 0;

    for axes in SegmentAxes::grid() {
        let weights = m.mix(&axes).unwrap();
        assert!(
            (weights.total() - 1.0).abs() < 1e-9,
            "{} weights sum to {}",
            axes.composite_key(),
            weights.total()
        );

        let profile = m.blend(&weights, None, &mut rng).unwrap();
        let lag = profile.time_lag_distribution.total();
        assert!((lag - 1.0).abs() < 1e-9, "{} lag sums to {lag}", axes.composite_key());
        assert!(profile.time_lag_distribution.buckets().iter().all(|b| *b >= 0.0));
        cells += 1;
    }
    assert_eq!(cells, 125);
}

#[test]
fn partially_specified_axes_still_normalise() {
    let m = mixer(&ModelConfig::without_jitter());
    let axes = SegmentAxes {
        engagement: Some(EngagementStyle::AdFreeLoyalists),
        monetization: Some(MonetizationStyle::DealResponsiveAcquirers),
        ..SegmentAxes::default()
    };
    let w = m.mix(&axes).unwrap();
    assert!((w.total() - 1.0).abs() < 1e-9);
    assert!((w.get(ArchetypeKind::PremiumSeeker) - 0.3).abs() < 1e-12);
    assert!((w.get(ArchetypeKind::DealHunter) - 0.3).abs() < 1e-12);
    assert_eq!(w.get(ArchetypeKind::AtRisk), 0.0);
}

#[test]
fn segment_with_no_axes_is_rejected() {
    let m = mixer(&ModelConfig::builtin());
    let err = m.mix(&SegmentAxes::default()).unwrap_err();
    assert!(matches!(err, ModelError::ZeroWeightTotal { .. }), "got {err}");
}

#[test]
fn negative_and_all_zero_weights_are_rejected() {
    let neg = ProfileWeights::normalize([(ArchetypeKind::AtRisk, -0.1)], "test");
    assert!(matches!(neg, Err(ModelError::NegativeWeight { .. })));

    let zero = ProfileWeights::normalize(
        [(ArchetypeKind::AtRisk, 0.0), (ArchetypeKind::DealHunter, 0.0)],
        "test",
    );
    assert!(matches!(zero, Err(ModelError::ZeroWeightTotal { .. })));
}

#[test]
fn deserialized_weights_are_renormalised() {
    let w: ProfileWeights = serde_json::from_str(r#"{ "deal_hunter": 2.0 }"#).unwrap();
    assert_eq!(w.get(ArchetypeKind::DealHunter), 1.0);

    let w: ProfileWeights = serde_json::from_str(r#"{ "deal_hunter": 3.0, "at_risk": 1.0 }"#).unwrap();
    assert!((w.get(ArchetypeKind::DealHunter) - 0.75).abs() < 1e-12);

    let m = mixer(&ModelConfig::without_jitter());
    let p = m.blend(&w, None, &mut ModelRng::seeded(0)).unwrap();
    assert!((p.acquisition_elasticity - (-3.5 * 0.75 + -2.0 * 0.25)).abs() < 1e-12);
    assert!((p.time_lag_distribution.total() - 1.0).abs() < 1e-9);

    assert!(serde_json::from_str::<ProfileWeights>(r#"{ "deal_hunter": -1.0 }"#).is_err());
    assert!(serde_json::from_str::<ProfileWeights>(r#"{ "deal_hunter": 0.0 }"#).is_err());
}

#[test]
fn blend_rejects_empty_weights() {
    let m = mixer(&ModelConfig::without_jitter());
    let empty: ProfileWeights = serde_json::from_str("{}").unwrap();
    assert!(empty.is_empty());

    let err = m.blend(&empty, None, &mut ModelRng::seeded(0)).unwrap_err();
    assert!(matches!(err, ModelError::ZeroWeightTotal { .. }), "got {err}");
}

#[test]
fn scalars_are_a_weighted_sum_not_a_selection() {
    let m = mixer(&ModelConfig::without_jitter());
    let profile = m.profile_for(&promo_only(), None, &mut ModelRng::seeded(1)).unwrap();

    // 0.7 deal_hunter + 0.3 value_conscious
    assert!((profile.acquisition_elasticity - (-3.5 * 0.7 + -1.8 * 0.3)).abs() < 1e-12);
    assert!((profile.repeat_loss_elasticity - (1.6 * 0.7 + 0.9 * 0.3)).abs() < 1e-12);
    assert!((profile.asymmetry_factor - (4.5 * 0.7 + 2.2 * 0.3)).abs() < 1e-12);
    assert!((profile.time_lag_distribution.weeks_0_4 - (0.40 * 0.7 + 0.15 * 0.3)).abs() < 1e-12);

    assert_eq!(profile.dominant_archetype, Some(ArchetypeKind::DealHunter));
    assert_eq!(profile.curve_shape, CurveShape::SharpSpikePlateau);
    assert_eq!(profile.jitter, 0.0);
    assert!(!profile.premium_adjusted);
}

#[test]
fn dominant_ties_go_to_the_earlier_catalog_entry() {
    let m = mixer(&ModelConfig::without_jitter());
    // 0.4 ultra_loyal, 0.4 value_conscious, 0.2 premium_seeker
    let axes = SegmentAxes {
        monetization: Some(MonetizationStyle::PlatformBundledAcquirers),
        ..SegmentAxes::default()
    };
    let weights = m.mix(&axes).unwrap();
    assert_eq!(weights.get(ArchetypeKind::UltraLoyal), weights.get(ArchetypeKind::ValueConscious));

    let profile = m.blend(&weights, None, &mut ModelRng::seeded(0)).unwrap();
    assert_eq!(profile.dominant_archetype, Some(ArchetypeKind::UltraLoyal));
    assert_eq!(profile.curve_shape, CurveShape::DelayedRamp);
}

#[test]
fn premium_tiers_damp_both_elasticities() {
    let m = mixer(&ModelConfig::without_jitter());
    let mut rng = ModelRng::seeded(0);
    let base = m.profile_for(&promo_only(), None, &mut rng).unwrap();

    for tier in [Tier::AdFree, Tier::Bundle] {
        let p = m.profile_for(&promo_only(), Some(tier), &mut rng).unwrap();
        assert!(p.premium_adjusted, "{tier} should be premium");
        assert!((p.acquisition_elasticity - base.acquisition_elasticity * 0.75).abs() < 1e-12);
        assert!((p.repeat_loss_elasticity - base.repeat_loss_elasticity * 0.70).abs() < 1e-12);
        assert_eq!(p.asymmetry_factor, base.asymmetry_factor, "only elasticities are scaled");
    }

    for tier in [Tier::AdSupported, Tier::Basic] {
        let p = m.profile_for(&promo_only(), Some(tier), &mut rng).unwrap();
        assert!(!p.premium_adjusted);
        assert_eq!(p.acquisition_elasticity, base.acquisition_elasticity);
    }
}

#[test]
fn jitter_is_bounded_and_shared_by_both_elasticities() {
    let exact = mixer(&ModelConfig::without_jitter());
    let noisy = mixer(&ModelConfig::builtin());
    let weights = exact.mix(&promo_only()).unwrap();
    let base = exact.blend(&weights, None, &mut ModelRng::seeded(0)).unwrap();

    let bank = RngBank::new(2024);
    let mut saw_nonzero = false;
    for i in 0..200 {
        let p = noisy.blend(&weights, None, &mut bank.for_segment(i)).unwrap();
        let acq_ratio = p.acquisition_elasticity / base.acquisition_elasticity;
        let rl_ratio = p.repeat_loss_elasticity / base.repeat_loss_elasticity;

        assert!((-0.05..0.05).contains(&p.jitter), "jitter {} out of bounds", p.jitter);
        assert!((acq_ratio - (1.0 + p.jitter)).abs() < 1e-9);
        assert!((acq_ratio - rl_ratio).abs() < 1e-9, "same draw must scale both");
        saw_nonzero |= p.jitter != 0.0;
    }
    assert!(saw_nonzero);
}

#[test]
fn cohort_profiles_are_unjittered() {
    let m = mixer(&ModelConfig::builtin());

    let baseline = m.cohort_profile(CohortSelection::Baseline, None).unwrap();
    assert_eq!(baseline.acquisition_elasticity, -1.6);
    assert_eq!(baseline.dominant_archetype, None);
    assert!(baseline.weights.is_empty());

    let hunter = m
        .cohort_profile(CohortSelection::Archetype(ArchetypeKind::DealHunter), Some(Tier::AdFree))
        .unwrap();
    assert!((hunter.acquisition_elasticity - (-3.5 * 0.75)).abs() < 1e-12);
    assert!((hunter.repeat_loss_elasticity - 1.6 * 0.70).abs() < 1e-12);
    assert_eq!(hunter.weights.get(ArchetypeKind::DealHunter), 1.0);
    assert_eq!(hunter.jitter, 0.0);
}

#[test]
fn composite_keys_parse_into_axes() {
    let axes: SegmentAxes = "promo_only_users|*|deal_responsive_acquirers".parse().unwrap();
    assert_eq!(axes.acquisition, Some(AcquisitionOrigin::PromoOnlyUsers));
    assert_eq!(axes.engagement, None);
    assert_eq!(axes.monetization, Some(MonetizationStyle::DealResponsiveAcquirers));
    assert_eq!(axes.composite_key(), "promo_only_users|*|deal_responsive_acquirers");

    assert!("promo_only_users|nonsense|*".parse::<SegmentAxes>().is_err());
    assert!("promo_only_users".parse::<SegmentAxes>().is_err());
}

#[test]
fn weights_serialize_as_a_plain_map() {
    let m = mixer(&ModelConfig::builtin());
    let json = serde_json::to_value(m.mix(&promo_only()).unwrap()).unwrap();
    assert!((json["deal_hunter"].as_f64().unwrap() - 0.7).abs() < 1e-12);
    assert!((json["value_conscious"].as_f64().unwrap() - 0.3).abs() < 1e-12);
}
