//! Alert-stream filters for lensed and extended AGN candidates.
//!
//! The [`filter`] module decides, one DIASource alert at a time, whether a
//! detection looks like an extended variable source rather than a point
//! source or an artifact. Thresholds live in [`thresholds`] as immutable
//! data; [`alert`] decodes broker property mappings.

pub mod alert;
pub mod filter;
pub mod moments;
pub mod test_util;
pub mod thresholds;

pub use alert::{AlertError, AlertProperties, QualityFlag};
pub use filter::{evaluate, ExtendednessFilter, FeatureResult, FilterOutcome, Rejection};
pub use moments::{ellipticity, SecondMoments};
pub use thresholds::{ThresholdConfig, ThresholdError, ThresholdPreset};
