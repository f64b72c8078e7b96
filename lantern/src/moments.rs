//! Second-moment shape measurements.
//!
//! DIASource records carry the second moments of both the detected source and
//! the local PSF. Their trace measures size and their ellipticity measures how
//! far the light profile departs from circular.

use serde::{Deserialize, Serialize};

/// Ellipticity from second moments.
///
/// ```text
/// e = sqrt((Ixx - Iyy)^2 + 4 Ixy^2) / (Ixx + Iyy)
/// ```
///
/// A zero trace is a degenerate shape and yields exactly `0.0`.
///
/// # Examples
/// ```rust
/// use lantern::moments::ellipticity;
///
/// assert_eq!(ellipticity(2.0, 2.0, 0.0), 0.0);
/// assert_eq!(ellipticity(1.0, -1.0, 3.0), 0.0);
/// ```
pub fn ellipticity(ixx: f64, iyy: f64, ixy: f64) -> f64 {
    let trace = ixx + iyy;
    if trace == 0.0 {
        return 0.0;
    }
    let diff = ixx - iyy;
    (diff * diff + 4.0 * ixy * ixy).sqrt() / trace
}

/// Second moments `(Ixx, Iyy, Ixy)` of a light profile, in pixel² units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondMoments {
    pub ixx: f64,
    pub iyy: f64,
    pub ixy: f64,
}

impl SecondMoments {
    pub fn new(ixx: f64, iyy: f64, ixy: f64) -> Self {
        Self { ixx, iyy, ixy }
    }

    /// `Ixx + Iyy`, proportional to the squared size of the profile
    pub fn trace(&self) -> f64 {
        self.ixx + self.iyy
    }

    /// See [`ellipticity`]
    pub fn ellipticity(&self) -> f64 {
        ellipticity(self.ixx, self.iyy, self.ixy)
    }
}
