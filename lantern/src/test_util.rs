//! Alert fixtures shared by unit tests, integration tests and doc examples.

use crate::alert::AlertProperties;
use serde_json::{json, Value};

/// A clean r-band detection that passes the `strict` preset with
/// `flux_ext = 2.0`, `i_ext = 2.0`, `ellip_ext = sqrt(8)/8` and
/// `temp_sci_flux_ratio = 0.4`.
pub fn example_alert() -> AlertProperties {
    AlertProperties {
        psf_flux: 100.0,
        ap_flux: 200.0,
        science_flux: 500.0,
        template_flux: 200.0,
        snr: 20.0,
        band: "r".to_string(),
        ixx: 5.0,
        iyy: 3.0,
        ixy: 1.0,
        ixx_psf: 2.0,
        iyy_psf: 2.0,
        ixy_psf: 0.0,
        ap_flux_flag: false,
        psf_flux_flag: false,
        pixel_flags_cr: false,
        pixel_flags_bad: false,
        pixel_flags_nodata: false,
        pixel_flags_interpolated: false,
        pixel_flags_saturated: false,
        pixel_flags_suspect: false,
    }
}

/// [`example_alert`] as the broker delivers it, with prefixed property names
pub fn example_alert_json() -> Value {
    json!({
        "lsst_diaSource_psfFlux": 100,
        "lsst_diaSource_apFlux": 200,
        "lsst_diaSource_scienceFlux": 500,
        "lsst_diaSource_templateFlux": 200,
        "lsst_diaSource_snr": 20.0,
        "lsst_diaSource_band": "r",
        "lsst_diaSource_ixx": 5,
        "lsst_diaSource_iyy": 3,
        "lsst_diaSource_ixy": 1,
        "lsst_diaSource_ixxPSF": 2,
        "lsst_diaSource_iyyPSF": 2,
        "lsst_diaSource_ixyPSF": 0,
        "lsst_diaSource_apFlux_flag": false,
        "lsst_diaSource_psfFlux_flag": false,
        "lsst_diaSource_pixelFlags_cr": false,
        "lsst_diaSource_pixelFlags_bad": false,
        "lsst_diaSource_pixelFlags_nodata": false,
        "lsst_diaSource_pixelFlags_interpolated": false,
        "lsst_diaSource_pixelFlags_saturated": false,
        "lsst_diaSource_pixelFlags_suspect": false,
    })
}
