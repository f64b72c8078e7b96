//! Threshold configuration for the extendedness filter.
//!
//! Thresholds are plain data: a [`ThresholdConfig`] is built once (from a
//! [`ThresholdPreset`] or a JSON file) and never mutated afterwards. To change
//! thresholds at runtime, build a new config and a new filter around it.
//!
//! Two presets ship with the crate. They were tuned independently and disagree
//! in both directions, so neither is a tightened copy of the other:
//!
//! | field                       | `strict`  | `lenient` |
//! |-----------------------------|-----------|-----------|
//! | `snr_floor`                 | 15.0      | 5.0       |
//! | `flux_ext_floor`            | 1.259     | 0.35      |
//! | `i_ext_floor`               | 1.5       | 0.5       |
//! | `ellip_ext_floor`           | 0.2       | 0.2       |
//! | `temp_sci_flux_ratio_floor` | 0.25      | 0.85      |
//! | `flux_caps["r"]`            | 657111.2  | 166872.5  |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThresholdError {
    #[error("Failed to access threshold file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid threshold JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Threshold {field} must be finite")]
    NonFinite { field: String },
    #[error("At least one band flux cap is required")]
    EmptyFluxCaps,
    #[error("Unknown threshold preset '{0}' (expected 'strict' or 'lenient')")]
    UnknownPreset(String),
}

/// Per-band template flux ceilings for the `strict` preset
const STRICT_FLUX_CAPS: [(&str, f64); 6] = [
    ("u", 178286.7),
    ("g", 255131.4),
    ("r", 657111.2),
    ("i", 743053.0),
    ("z", 963585.1),
    ("y", 1013290.7),
];

/// Per-band template flux ceilings for the `lenient` preset
const LENIENT_FLUX_CAPS: [(&str, f64); 6] = [
    ("u", 88644.7),
    ("g", 118074.2),
    ("r", 166872.5),
    ("i", 203090.9),
    ("z", 257254.0),
    ("y", 264794.0),
];

/// Cut thresholds for one filter configuration.
///
/// Every `*_floor` is exclusive: a feature must be strictly greater than its
/// floor to pass. Flux caps are exclusive ceilings on template flux.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum signal-to-noise ratio
    pub snr_floor: f64,
    /// Minimum aperture/PSF flux ratio
    pub flux_ext_floor: f64,
    /// Minimum source/PSF second-moment trace ratio
    pub i_ext_floor: f64,
    /// Minimum excess ellipticity over the PSF
    pub ellip_ext_floor: f64,
    /// Minimum template/science flux ratio (moving-object guard)
    pub temp_sci_flux_ratio_floor: f64,
    /// Maximum template flux per band. Bands missing here always reject.
    pub flux_caps: BTreeMap<String, f64>,
}

impl ThresholdConfig {
    /// Cap for a band, if the band is calibrated
    pub fn flux_cap(&self, band: &str) -> Option<f64> {
        self.flux_caps.get(band).copied()
    }

    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let floors = [
            ("snr_floor", self.snr_floor),
            ("flux_ext_floor", self.flux_ext_floor),
            ("i_ext_floor", self.i_ext_floor),
            ("ellip_ext_floor", self.ellip_ext_floor),
            ("temp_sci_flux_ratio_floor", self.temp_sci_flux_ratio_floor),
        ];
        for (field, value) in floors {
            if !value.is_finite() {
                return Err(ThresholdError::NonFinite {
                    field: field.to_string(),
                });
            }
        }

        if self.flux_caps.is_empty() {
            return Err(ThresholdError::EmptyFluxCaps);
        }
        for (band, cap) in &self.flux_caps {
            if !cap.is_finite() {
                return Err(ThresholdError::NonFinite {
                    field: format!("flux_caps.{band}"),
                });
            }
        }
        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ThresholdError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate
    pub fn load_from_file(path: &Path) -> Result<Self, ThresholdError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        log::info!(
            "Loaded thresholds from {} ({} bands)",
            path.display(),
            config.flux_caps.len()
        );
        log::debug!("{config:?}");
        Ok(config)
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdPreset::default().config()
    }
}

/// Named threshold presets shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdPreset {
    /// High SNR floor and tight extendedness floors, generous flux caps
    #[default]
    Strict,
    /// Low SNR floor and loose extendedness floors, but a tighter
    /// moving-object cut and lower flux caps
    Lenient,
}

impl ThresholdPreset {
    pub const ALL: [ThresholdPreset; 2] = [ThresholdPreset::Strict, ThresholdPreset::Lenient];

    pub fn name(&self) -> &'static str {
        match self {
            ThresholdPreset::Strict => "strict",
            ThresholdPreset::Lenient => "lenient",
        }
    }

    /// Build a fresh config holding this preset's thresholds
    pub fn config(&self) -> ThresholdConfig {
        let (snr, flux_ext, i_ext, ellip_ext, temp_sci, caps) = match self {
            ThresholdPreset::Strict => (15.0, 1.259, 1.5, 0.2, 0.25, &STRICT_FLUX_CAPS),
            ThresholdPreset::Lenient => (5.0, 0.35, 0.5, 0.2, 0.85, &LENIENT_FLUX_CAPS),
        };
        ThresholdConfig {
            snr_floor: snr,
            flux_ext_floor: flux_ext,
            i_ext_floor: i_ext,
            ellip_ext_floor: ellip_ext,
            temp_sci_flux_ratio_floor: temp_sci,
            flux_caps: caps
                .iter()
                .map(|&(band, cap)| (band.to_string(), cap))
                .collect(),
        }
    }
}

impl fmt::Display for ThresholdPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThresholdPreset {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThresholdPreset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ThresholdError::UnknownPreset(s.to_string()))
    }
}
