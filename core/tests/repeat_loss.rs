use elasticity_core::{
    config::ModelConfig,
    engine::ScenarioEngine,
    repeat_loss::{Horizon, RepeatLossPredictor},
    scenario::{Scenario, Segment},
};

fn predictor() -> RepeatLossPredictor {
    let _ = env_logger::builder().is_test(true).try_init();
    RepeatLossPredictor::from_config(&ModelConfig::builtin())
}

fn with_change(pct: f64) -> Scenario {
    Scenario { price_change_pct: Some(pct), ..Scenario::default() }
}

#[test]
fn sixteen_percent_increase_at_peak_horizon() {
    let p = predictor();
    let results = p.predict_by_horizon(&with_change(16.0));
    let peak = results[&Horizon::Weeks8To12];

    assert!((p.log_odds(16.0, Horizon::Weeks8To12) - (-2.336)).abs() < 1e-9);
    assert!((peak.rate - 0.0883).abs() < 1e-3, "rate = {}", peak.rate);
    assert!((peak.uplift_pp - 3.83).abs() < 0.02, "uplift = {}pp", peak.uplift_pp);
    assert!((peak.uplift * 100.0 - peak.uplift_pp).abs() < 1e-12);
}

#[test]
fn always_reports_four_horizons() {
    let p = predictor();
    let results = p.predict_by_horizon(&with_change(5.0));
    let keys: Vec<_> = results.keys().copied().collect();
    assert_eq!(keys, Horizon::ALL.to_vec());
}

#[test]
fn peak_horizon_dominates_first_month_for_increases() {
    let p = predictor();
    for pct in 1..=40 {
        let r = p.predict_by_horizon(&with_change(pct as f64));
        let early = r[&Horizon::Weeks0To4].uplift;
        let peak = r[&Horizon::Weeks8To12].uplift;
        assert!(peak >= early, "at +{pct}%: 8-12w {peak} < 0-4w {early}");
    }
}

#[test]
fn no_price_change_sits_on_the_baseline() {
    let p = predictor();
    for r in p.predict_by_horizon(&Scenario::default()).values() {
        assert!((r.rate - 0.05).abs() < 1e-3, "rate = {}", r.rate);
        assert!(r.uplift_pp.abs() < 0.1);
    }
}

#[test]
fn price_change_is_derived_from_current_price() {
    let p = predictor();
    let derived = Scenario {
        current_price: Some(7.99),
        ..Scenario::at_price(8.99)
    };
    let explicit = with_change((8.99 - 7.99) / 7.99 * 100.0);

    assert!((derived.price_change_pct() - 12.5156).abs() < 1e-3);
    assert_eq!(p.predict_by_horizon(&derived), p.predict_by_horizon(&explicit));
}

#[test]
fn explicit_change_wins_over_current_price() {
    let s = Scenario {
        current_price: Some(7.99),
        price_change_pct: Some(3.0),
        ..Scenario::at_price(8.99)
    };
    assert_eq!(s.price_change_pct(), 3.0);
}

#[test]
fn custom_baseline_shifts_uplift() {
    let p = predictor();
    let s = Scenario { baseline_repeat_loss: 0.08, ..with_change(16.0) };
    let r = p.predict_by_horizon(&s)[&Horizon::Weeks8To12];
    assert!((r.uplift - (r.rate - 0.08)).abs() < 1e-12);
}

#[test]
fn segment_multiplier_spans_point_seven_to_one_point_three() {
    let p = predictor();
    assert!((p.segment_multiplier(0.0) - 0.7).abs() < 1e-12);
    assert!((p.segment_multiplier(-2.0) - 1.0).abs() < 1e-12);
    assert!((p.segment_multiplier(-4.0) - 1.3).abs() < 1e-12);
    assert!((p.segment_multiplier(-12.0) - 1.3).abs() < 1e-12, "capped at |e| = 4");
    assert!((p.segment_multiplier(2.0) - 1.0).abs() < 1e-12, "sign is ignored");
}

#[test]
fn segment_uplift_is_scaled_by_multiplier() {
    let p = predictor();
    let scenario = with_change(10.0);
    let base = p.predict_by_horizon(&scenario);
    let seg = p.predict_segment(&scenario, &Segment::new("deal", 1_000, -3.0), -3.0);

    assert!((seg.multiplier - 1.15).abs() < 1e-12);
    for h in Horizon::ALL {
        assert!((seg.uplift_pp[&h] - base[&h].uplift_pp * 1.15).abs() < 1e-12);
    }
}

#[test]
fn horizon_labels_serialize_verbatim() {
    let json = serde_json::to_value(predictor().predict_by_horizon(&with_change(16.0))).unwrap();
    assert!(json.get("8-12 Weeks").is_some());
    assert!(json.get("12+ Weeks").is_some());
    assert_eq!(Horizon::Weeks0To4.label(), "0-4 Weeks");
}

#[test]
fn engine_segment_entry_point_preserves_order() {
    let engine = ScenarioEngine::new(&ModelConfig::builtin(), 7);
    let segments = vec![
        Segment::new("loyal", 10_000, -0.5),
        Segment::new("hunters", 4_000, -3.5),
    ];
    let results = engine.predict_repeat_loss_by_segment(&with_change(16.0), &segments).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name, "loyal");
    assert_eq!(results[1].name, "hunters");
    assert!(results[1].multiplier > results[0].multiplier);
}
