//! Errors for region construction and queries.

use skymath::FrameError;

/// Result type for region operations.
pub type Result<T, E = RegionError> = std::result::Result<T, E>;

/// Error from a region construction or query.
///
/// Once any operation in a call chain fails, the error propagates to
/// the caller and no partially built region or point set is returned.
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    #[error("axis {axis} is undefined in the {what}")]
    UndefinedValue { what: &'static str, axis: usize },
    #[error("point set has {found} axes; expected {expected}")]
    AxisMismatch { expected: usize, found: usize },
    #[error("invalid radius {0}")]
    InvalidRadius(skymath::Float),
    #[error("region has no defined centre")]
    NoCentre,
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl RegionError {
    /// Returns `Ok(())` iff `found` equals `expected`.
    pub(crate) fn check_axes(expected: usize, found: usize) -> Result<()> {
        if expected == found {
            Ok(())
        } else {
            Err(RegionError::AxisMismatch { expected, found })
        }
    }
}
