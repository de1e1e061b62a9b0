use elasticity_core::{
    archetype::{ArchetypeCatalog, ArchetypeKind},
    config::{ModelConfig, UtilityRow},
};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

#[test]
fn shipped_data_matches_builtin_tables() {
    let _ = env_logger::builder().is_test(true).try_init();
    let loaded = ModelConfig::load(DATA_DIR).expect("data/ should load");
    let builtin = ModelConfig::builtin();

    assert_eq!(loaded.acquisition, builtin.acquisition);
    assert_eq!(loaded.repeat_loss, builtin.repeat_loss);
    assert_eq!(loaded.migration, builtin.migration);
    assert_eq!(loaded.mixing, builtin.mixing);
    assert_eq!(loaded.archetypes, builtin.archetypes);
}

#[test]
fn missing_data_dir_names_the_file() {
    let err = ModelConfig::load("/nonexistent/elasticity-data").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Cannot read"), "unexpected error: {msg}");
    assert!(msg.contains("acquisition.json"), "unexpected error: {msg}");
}

#[test]
fn builtin_catalog_is_ordered_and_valid() {
    let catalog = ArchetypeCatalog::builtin();
    catalog.validate().unwrap();

    let kinds: Vec<_> = catalog.archetypes().iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        [
            ArchetypeKind::UltraLoyal,
            ArchetypeKind::ValueConscious,
            ArchetypeKind::DealHunter,
            ArchetypeKind::ContentDriven,
            ArchetypeKind::TierFlexible,
            ArchetypeKind::PremiumSeeker,
            ArchetypeKind::AtRisk,
        ]
    );
    for a in catalog.archetypes() {
        assert!((a.params.time_lag_distribution.total() - 1.0).abs() < 1e-9, "{}", a.kind);
    }
}

#[test]
fn duplicate_archetypes_are_rejected() {
    let builtin = ArchetypeCatalog::builtin();
    let mut archetypes = builtin.archetypes().to_vec();
    archetypes.push(archetypes[0].clone());
    assert!(ArchetypeCatalog::new(archetypes, builtin.baseline().clone()).is_err());
}

#[test]
fn omitted_utility_terms_default_to_zero() {
    let row: UtilityRow = serde_json::from_str(r#"{ "intercept": -4.0, "price_pressure": 0.1 }"#).unwrap();
    assert_eq!(row.intercept, -4.0);
    assert_eq!(row.price_pressure, 0.1);
    assert_eq!(row.price_gap, 0.0);
    assert_eq!(row.content_need, 0.0);
}

#[test]
fn archetype_json_uses_bucket_labels() {
    let json = serde_json::to_value(ArchetypeCatalog::builtin().archetypes()[2].clone()).unwrap();
    assert_eq!(json["kind"], "deal_hunter");
    assert_eq!(json["repeat_loss_curve_type"], "sharp_spike_plateau");
    assert_eq!(json["time_lag_distribution"]["0_4_weeks"].as_f64(), Some(0.40));
}

#[test]
fn without_jitter_only_changes_the_jitter_width() {
    let exact = ModelConfig::without_jitter();
    let builtin = ModelConfig::builtin();
    assert_eq!(exact.mixing.jitter_pct, 0.0);
    assert_eq!(exact.mixing.premium_acquisition_scale, builtin.mixing.premium_acquisition_scale);
    assert_eq!(exact.migration, builtin.migration);
}
