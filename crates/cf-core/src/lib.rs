//! cf-core: Shared types for CurveForge
//!
//! Values, errors and the parameter boundary used by every other crate.

mod error;
mod params;
mod value;

pub use error::*;
pub use params::*;
pub use value::*;

/// Timeline position in sample frames.
///
/// Signed so that keyframes may sit before the timeline origin.
pub type SamplePos = i64;
