//! Extendedness filter for lensed/extended AGN candidates.
//!
//! Each alert runs through a fixed sequence of cuts. The first failing cut
//! rejects the alert; an alert that survives every cut passes with its
//! engineered features attached.
//!
//! 1. Quality gate: no raised quality flag, `snr` above floor, and PSF,
//!    aperture and science fluxes sharing one sign.
//! 2. Degeneracy guard: nonzero PSF and science flux, nonzero PSF trace.
//! 3. Extendedness: flux, moment and ellipticity excess all above floor.
//! 4. Moving object: template/science flux ratio above floor.
//! 5. Band cap: template flux below the ceiling for the alert's band.
//!
//! # Usage
//!
//! ```rust
//! use lantern::filter::ExtendednessFilter;
//! use lantern::test_util::example_alert;
//! use lantern::thresholds::ThresholdPreset;
//!
//! let filter = ExtendednessFilter::from_preset(ThresholdPreset::Strict);
//! let features = filter.evaluate(&example_alert()).features().unwrap();
//! assert_eq!(features.flux_ext, 2.0);
//! assert_eq!(features.i_ext, 2.0);
//! ```

use crate::alert::{AlertError, AlertProperties, QualityFlag};
use crate::thresholds::{ThresholdConfig, ThresholdPreset};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Engineered features of an alert that passed every cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureResult {
    pub snr: f64,
    /// Aperture flux over PSF flux
    pub flux_ext: f64,
    /// Source second-moment trace over PSF second-moment trace
    pub i_ext: f64,
    /// Source ellipticity minus PSF ellipticity
    pub ellip_ext: f64,
    /// Template flux over science flux
    pub temp_sci_flux_ratio: f64,
}

/// The cut that rejected an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    QualityFlag(QualityFlag),
    LowSnr,
    FluxSignMismatch,
    ZeroFlux,
    ZeroPsfTrace,
    FluxExtendedness,
    MomentExtendedness,
    EllipticityExtendedness,
    MovingObject,
    UnknownBand,
    TemplateFluxCap,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::QualityFlag(flag) => write!(f, "quality flag {flag} raised"),
            Rejection::LowSnr => f.write_str("snr at or below floor"),
            Rejection::FluxSignMismatch => f.write_str("psf/ap/science flux signs disagree"),
            Rejection::ZeroFlux => f.write_str("zero psf or science flux"),
            Rejection::ZeroPsfTrace => f.write_str("zero psf second-moment trace"),
            Rejection::FluxExtendedness => f.write_str("flux_ext at or below floor"),
            Rejection::MomentExtendedness => f.write_str("i_ext at or below floor"),
            Rejection::EllipticityExtendedness => f.write_str("ellip_ext at or below floor"),
            Rejection::MovingObject => f.write_str("temp_sci_flux_ratio at or below floor"),
            Rejection::UnknownBand => f.write_str("band has no flux cap"),
            Rejection::TemplateFluxCap => f.write_str("template flux at or above band cap"),
        }
    }
}

/// Result of running one alert through the filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum FilterOutcome {
    Pass(FeatureResult),
    Rejected(Rejection),
}

impl FilterOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, FilterOutcome::Pass(_))
    }

    pub fn features(&self) -> Option<FeatureResult> {
        match self {
            FilterOutcome::Pass(features) => Some(*features),
            FilterOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            FilterOutcome::Pass(_) => None,
            FilterOutcome::Rejected(reason) => Some(*reason),
        }
    }
}

impl From<Result<FeatureResult, Rejection>> for FilterOutcome {
    fn from(result: Result<FeatureResult, Rejection>) -> Self {
        match result {
            Ok(features) => FilterOutcome::Pass(features),
            Err(reason) => FilterOutcome::Rejected(reason),
        }
    }
}

fn reject_if(condition: bool, reason: Rejection) -> Result<(), Rejection> {
    if condition {
        Err(reason)
    } else {
        Ok(())
    }
}

fn run_cuts(
    alert: &AlertProperties,
    config: &ThresholdConfig,
) -> Result<FeatureResult, Rejection> {
    // Quality gate
    if let Some(flag) = alert.first_raised_flag() {
        return Err(Rejection::QualityFlag(flag));
    }
    reject_if(alert.snr <= config.snr_floor, Rejection::LowSnr)?;
    reject_if(!alert.flux_signs_agree(), Rejection::FluxSignMismatch)?;

    // Ratio denominators
    reject_if(
        alert.psf_flux == 0.0 || alert.science_flux == 0.0,
        Rejection::ZeroFlux,
    )?;
    let source = alert.source_moments();
    let psf = alert.psf_moments();
    let psf_trace = psf.trace();
    reject_if(psf_trace == 0.0, Rejection::ZeroPsfTrace)?;

    let flux_ext = alert.ap_flux / alert.psf_flux;
    let ellip_ext = source.ellipticity() - psf.ellipticity();
    let i_ext = source.trace() / psf_trace;
    let temp_sci_flux_ratio = alert.template_flux / alert.science_flux;

    reject_if(flux_ext <= config.flux_ext_floor, Rejection::FluxExtendedness)?;
    reject_if(i_ext <= config.i_ext_floor, Rejection::MomentExtendedness)?;
    reject_if(
        ellip_ext <= config.ellip_ext_floor,
        Rejection::EllipticityExtendedness,
    )?;

    reject_if(
        temp_sci_flux_ratio <= config.temp_sci_flux_ratio_floor,
        Rejection::MovingObject,
    )?;

    let cap = config.flux_cap(&alert.band).ok_or(Rejection::UnknownBand)?;
    reject_if(alert.template_flux >= cap, Rejection::TemplateFluxCap)?;

    Ok(FeatureResult {
        snr: alert.snr,
        flux_ext,
        i_ext,
        ellip_ext,
        temp_sci_flux_ratio,
    })
}

/// Run every cut on `alert` using `config`.
///
/// Pure: the same inputs always give the same outcome, and neither input is
/// modified.
pub fn evaluate(alert: &AlertProperties, config: &ThresholdConfig) -> FilterOutcome {
    let outcome = FilterOutcome::from(run_cuts(alert, config));
    if let FilterOutcome::Rejected(reason) = outcome {
        log::trace!("Rejected {band} band alert: {reason}", band = alert.band);
    }
    outcome
}

/// Extendedness filter bound to one immutable threshold snapshot.
///
/// Clones share the snapshot, so a filter can be handed to any number of
/// worker threads.
#[derive(Debug, Clone)]
pub struct ExtendednessFilter {
    config: Arc<ThresholdConfig>,
}

impl ExtendednessFilter {
    pub fn with_config(config: ThresholdConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_preset(preset: ThresholdPreset) -> Self {
        Self::with_config(preset.config())
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// See [`evaluate`]
    pub fn evaluate(&self, alert: &AlertProperties) -> FilterOutcome {
        evaluate(alert, &self.config)
    }

    /// Decode a raw property mapping and evaluate it.
    ///
    /// A malformed mapping is an error rather than a rejection.
    pub fn evaluate_value(&self, properties: Value) -> Result<FilterOutcome, AlertError> {
        let alert = AlertProperties::from_value(properties)?;
        Ok(self.evaluate(&alert))
    }

    /// Evaluate many alerts in parallel. Outcomes are returned in input order.
    pub fn evaluate_batch(&self, alerts: &[AlertProperties]) -> Vec<FilterOutcome> {
        alerts
            .par_iter()
            .map(|alert| evaluate(alert, &self.config))
            .collect()
    }
}

impl Default for ExtendednessFilter {
    fn default() -> Self {
        Self::from_preset(ThresholdPreset::default())
    }
}
