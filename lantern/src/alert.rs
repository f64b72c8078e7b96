//! DIASource alert properties consumed by the filters.
//!
//! Brokers deliver each detection as a flat mapping of named properties. The
//! names are namespaced with [`FIELD_PREFIX`] (`lsst_diaSource_psfFlux`), and
//! the bare DIASource name (`psfFlux`) is accepted as an alias. Properties the
//! filters do not use are ignored.
//!
//! Decoding is strict: a missing property or one of the wrong type is an
//! [`AlertError`], never a filter rejection.

use crate::moments::SecondMoments;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Namespace prefix used by the broker for DIASource properties
pub const FIELD_PREFIX: &str = "lsst_diaSource_";

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Alert properties must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("Malformed alert properties: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Measured properties of a single DIASource detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertProperties {
    #[serde(rename = "lsst_diaSource_psfFlux", alias = "psfFlux")]
    pub psf_flux: f64,
    #[serde(rename = "lsst_diaSource_apFlux", alias = "apFlux")]
    pub ap_flux: f64,
    #[serde(rename = "lsst_diaSource_scienceFlux", alias = "scienceFlux")]
    pub science_flux: f64,
    #[serde(rename = "lsst_diaSource_templateFlux", alias = "templateFlux")]
    pub template_flux: f64,
    #[serde(rename = "lsst_diaSource_snr", alias = "snr")]
    pub snr: f64,
    /// Photometric band, normally one of `ugrizy`
    #[serde(rename = "lsst_diaSource_band", alias = "band")]
    pub band: String,

    #[serde(rename = "lsst_diaSource_ixx", alias = "ixx")]
    pub ixx: f64,
    #[serde(rename = "lsst_diaSource_iyy", alias = "iyy")]
    pub iyy: f64,
    #[serde(rename = "lsst_diaSource_ixy", alias = "ixy")]
    pub ixy: f64,
    #[serde(rename = "lsst_diaSource_ixxPSF", alias = "ixxPSF")]
    pub ixx_psf: f64,
    #[serde(rename = "lsst_diaSource_iyyPSF", alias = "iyyPSF")]
    pub iyy_psf: f64,
    #[serde(rename = "lsst_diaSource_ixyPSF", alias = "ixyPSF")]
    pub ixy_psf: f64,

    #[serde(rename = "lsst_diaSource_apFlux_flag", alias = "apFlux_flag")]
    pub ap_flux_flag: bool,
    #[serde(rename = "lsst_diaSource_psfFlux_flag", alias = "psfFlux_flag")]
    pub psf_flux_flag: bool,
    #[serde(rename = "lsst_diaSource_pixelFlags_cr", alias = "pixelFlags_cr")]
    pub pixel_flags_cr: bool,
    #[serde(rename = "lsst_diaSource_pixelFlags_bad", alias = "pixelFlags_bad")]
    pub pixel_flags_bad: bool,
    #[serde(rename = "lsst_diaSource_pixelFlags_nodata", alias = "pixelFlags_nodata")]
    pub pixel_flags_nodata: bool,
    #[serde(
        rename = "lsst_diaSource_pixelFlags_interpolated",
        alias = "pixelFlags_interpolated"
    )]
    pub pixel_flags_interpolated: bool,
    #[serde(
        rename = "lsst_diaSource_pixelFlags_saturated",
        alias = "pixelFlags_saturated"
    )]
    pub pixel_flags_saturated: bool,
    #[serde(rename = "lsst_diaSource_pixelFlags_suspect", alias = "pixelFlags_suspect")]
    pub pixel_flags_suspect: bool,
}

impl AlertProperties {
    /// Decode from a JSON value holding the property mapping.
    pub fn from_value(value: Value) -> Result<Self, AlertError> {
        let kind = match &value {
            Value::Object(_) => return Ok(serde_json::from_value(value)?),
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
        };
        Err(AlertError::NotAnObject(kind))
    }

    /// Decode from a JSON document holding the property mapping.
    pub fn from_json_str(json: &str) -> Result<Self, AlertError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Second moments of the detected source
    pub fn source_moments(&self) -> SecondMoments {
        SecondMoments::new(self.ixx, self.iyy, self.ixy)
    }

    /// Second moments of the local PSF
    pub fn psf_moments(&self) -> SecondMoments {
        SecondMoments::new(self.ixx_psf, self.iyy_psf, self.ixy_psf)
    }

    pub fn flag(&self, flag: QualityFlag) -> bool {
        match flag {
            QualityFlag::ApFlux => self.ap_flux_flag,
            QualityFlag::PsfFlux => self.psf_flux_flag,
            QualityFlag::CosmicRay => self.pixel_flags_cr,
            QualityFlag::Bad => self.pixel_flags_bad,
            QualityFlag::NoData => self.pixel_flags_nodata,
            QualityFlag::Interpolated => self.pixel_flags_interpolated,
            QualityFlag::Saturated => self.pixel_flags_saturated,
            QualityFlag::Suspect => self.pixel_flags_suspect,
        }
    }

    /// First raised quality flag, in [`QualityFlag::ALL`] order
    pub fn first_raised_flag(&self) -> Option<QualityFlag> {
        QualityFlag::ALL.into_iter().find(|&flag| self.flag(flag))
    }

    /// PSF, aperture and science fluxes are all positive or all negative.
    ///
    /// Uniformly negative fluxes are legitimate for difference-image detections
    /// of a source that faded relative to its template.
    pub fn flux_signs_agree(&self) -> bool {
        let fluxes = [self.psf_flux, self.ap_flux, self.science_flux];
        fluxes.iter().all(|&f| f > 0.0) || fluxes.iter().all(|&f| f < 0.0)
    }
}

/// Data-quality flags carried by a DIASource. A raised flag means the
/// measurement has a known problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    ApFlux,
    PsfFlux,
    CosmicRay,
    Bad,
    NoData,
    Interpolated,
    Saturated,
    Suspect,
}

impl QualityFlag {
    pub const ALL: [QualityFlag; 8] = [
        QualityFlag::ApFlux,
        QualityFlag::PsfFlux,
        QualityFlag::CosmicRay,
        QualityFlag::Bad,
        QualityFlag::NoData,
        QualityFlag::Interpolated,
        QualityFlag::Saturated,
        QualityFlag::Suspect,
    ];

    /// DIASource property name, without [`FIELD_PREFIX`]
    pub fn field_name(&self) -> &'static str {
        match self {
            QualityFlag::ApFlux => "apFlux_flag",
            QualityFlag::PsfFlux => "psfFlux_flag",
            QualityFlag::CosmicRay => "pixelFlags_cr",
            QualityFlag::Bad => "pixelFlags_bad",
            QualityFlag::NoData => "pixelFlags_nodata",
            QualityFlag::Interpolated => "pixelFlags_interpolated",
            QualityFlag::Saturated => "pixelFlags_saturated",
            QualityFlag::Suspect => "pixelFlags_suspect",
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{example_alert, example_alert_json};
    use serde_json::json;

    #[test]
    fn test_decode_prefixed_names() {
        let alert = AlertProperties::from_value(example_alert_json()).unwrap();
        assert_eq!(alert, example_alert());
    }

    #[test]
    fn test_decode_bare_names() {
        let mut bare = serde_json::Map::new();
        if let Value::Object(map) = example_alert_json() {
            for (key, value) in map {
                let key = key.strip_prefix(FIELD_PREFIX).unwrap().to_string();
                bare.insert(key, value);
            }
        }
        let alert = AlertProperties::from_value(Value::Object(bare)).unwrap();
        assert_eq!(alert, example_alert());
    }

    #[test]
    fn test_integer_fluxes_decode_as_floats() {
        // example_alert_json already uses integers for most fields
        let alert = AlertProperties::from_value(example_alert_json()).unwrap();
        assert_eq!(alert.psf_flux, 100.0);
    }

    #[test]
    fn test_extra_properties_are_ignored() {
        let mut value = example_alert_json();
        value["lsst_diaSource_diaSourceId"] = json!(1234567890_u64);
        value["lsst_diaSource_ra"] = json!(150.1);
        assert!(AlertProperties::from_value(value).is_ok());
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let mut value = example_alert_json();
        value
            .as_object_mut()
            .unwrap()
            .remove("lsst_diaSource_templateFlux");
        let err = AlertProperties::from_value(value).unwrap_err();
        assert!(matches!(err, AlertError::Malformed(_)));
        assert!(err.to_string().contains("lsst_diaSource_templateFlux"));
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let mut value = example_alert_json();
        value["lsst_diaSource_psfFlux"] = json!("100.0");
        assert!(matches!(
            AlertProperties::from_value(value),
            Err(AlertError::Malformed(_))
        ));

        let mut value = example_alert_json();
        value["lsst_diaSource_pixelFlags_bad"] = json!(0);
        assert!(matches!(
            AlertProperties::from_value(value),
            Err(AlertError::Malformed(_))
        ));
    }

    #[test]
    fn test_null_flux_is_an_error() {
        let mut value = example_alert_json();
        value["lsst_diaSource_scienceFlux"] = Value::Null;
        assert!(AlertProperties::from_value(value).is_err());
    }

    #[test]
    fn test_non_object_is_an_error() {
        assert!(matches!(
            AlertProperties::from_value(json!([1, 2, 3])),
            Err(AlertError::NotAnObject("an array"))
        ));
        assert!(matches!(
            AlertProperties::from_json_str("42"),
            Err(AlertError::NotAnObject("a number"))
        ));
        assert!(matches!(
            AlertProperties::from_json_str("{not json"),
            Err(AlertError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_band_still_decodes() {
        let mut value = example_alert_json();
        value["lsst_diaSource_band"] = json!("VR");
        assert_eq!(AlertProperties::from_value(value).unwrap().band, "VR");
    }

    #[test]
    fn test_flags() {
        let mut alert = example_alert();
        assert_eq!(alert.first_raised_flag(), None);

        alert.pixel_flags_suspect = true;
        alert.pixel_flags_cr = true;
        assert_eq!(alert.first_raised_flag(), Some(QualityFlag::CosmicRay));
        assert!(alert.flag(QualityFlag::Suspect));
        assert!(!alert.flag(QualityFlag::Saturated));
    }

    #[test]
    fn test_flux_sign_agreement() {
        let mut alert = example_alert();
        assert!(alert.flux_signs_agree());

        alert.psf_flux = -100.0;
        alert.ap_flux = -200.0;
        alert.science_flux = -500.0;
        assert!(alert.flux_signs_agree());

        alert.ap_flux = 200.0;
        assert!(!alert.flux_signs_agree());

        alert.ap_flux = 0.0;
        assert!(!alert.flux_signs_agree());
    }

    #[test]
    fn test_moment_accessors() {
        let alert = example_alert();
        assert_eq!(alert.source_moments(), SecondMoments::new(5.0, 3.0, 1.0));
        assert_eq!(alert.psf_moments().trace(), 4.0);
    }
}
