//! Errors for frame and mapping operations.

/// Error from a frame or mapping operation.
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("point set has {found} axes; expected {expected}")]
    AxisMismatch { expected: usize, found: usize },
    #[error("mapping is not invertible")]
    SingularMapping,
}

impl FrameError {
    /// Returns `Ok(())` iff `found` equals `expected`.
    pub fn check_axes(expected: usize, found: usize) -> Result<(), FrameError> {
        if expected == found {
            Ok(())
        } else {
            Err(FrameError::AxisMismatch { expected, found })
        }
    }
}
