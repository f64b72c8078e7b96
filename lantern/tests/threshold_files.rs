//! Loading and saving threshold configurations on disk

use lantern::test_util::example_alert;
use lantern::{ExtendednessFilter, Rejection, ThresholdConfig, ThresholdError, ThresholdPreset};
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

#[rstest]
fn test_preset_survives_save_and_load(
    #[values(ThresholdPreset::Strict, ThresholdPreset::Lenient)] preset: ThresholdPreset,
) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(format!("{preset}.json"));

    let config = preset.config();
    config.save_to_file(&path).unwrap();
    let loaded = ThresholdConfig::load_from_file(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_hand_written_config_drives_filter() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.json");
    fs::write(
        &path,
        r#"{
            "snr_floor": 25.0,
            "flux_ext_floor": 1.0,
            "i_ext_floor": 1.0,
            "ellip_ext_floor": 0.1,
            "temp_sci_flux_ratio_floor": 0.1,
            "flux_caps": { "r": 1000.0, "g": 150.0 }
        }"#,
    )
    .unwrap();

    let filter = ExtendednessFilter::with_config(ThresholdConfig::load_from_file(&path).unwrap());

    let mut alert = example_alert();
    assert_eq!(filter.evaluate(&alert).rejection(), Some(Rejection::LowSnr));

    alert.snr = 30.0;
    assert!(filter.evaluate(&alert).is_pass());

    alert.band = "g".to_string();
    assert_eq!(
        filter.evaluate(&alert).rejection(),
        Some(Rejection::TemplateFluxCap)
    );

    alert.band = "i".to_string();
    assert_eq!(
        filter.evaluate(&alert).rejection(),
        Some(Rejection::UnknownBand)
    );
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = ThresholdConfig::load_from_file(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(ThresholdError::Io(_))));
}

#[rstest]
#[case::not_json("snr_floor = 5")]
#[case::missing_field(r#"{"snr_floor": 5.0, "flux_caps": {"r": 1.0}}"#)]
#[case::wrong_type(
    r#"{"snr_floor": "five", "flux_ext_floor": 1.0, "i_ext_floor": 1.0,
        "ellip_ext_floor": 0.1, "temp_sci_flux_ratio_floor": 0.1, "flux_caps": {"r": 1.0}}"#
)]
fn test_invalid_json(#[case] contents: &str) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, contents).unwrap();

    assert!(matches!(
        ThresholdConfig::load_from_file(&path),
        Err(ThresholdError::Json(_))
    ));
}

#[test]
fn test_empty_caps_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no_caps.json");
    fs::write(
        &path,
        r#"{"snr_floor": 5.0, "flux_ext_floor": 1.0, "i_ext_floor": 1.0,
            "ellip_ext_floor": 0.1, "temp_sci_flux_ratio_floor": 0.1, "flux_caps": {}}"#,
    )
    .unwrap();

    assert!(matches!(
        ThresholdConfig::load_from_file(&path),
        Err(ThresholdError::EmptyFluxCaps)
    ));
}
