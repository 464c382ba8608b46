//! Point transformations between coordinate systems.

use std::fmt;

use crate::{EPSILON, FrameError, Float, PointSet, Vector};

/// Transformation between two coordinate systems.
///
/// [`BAD`](crate::BAD) input values propagate to the output.
pub trait Mapping: fmt::Debug + Send + Sync {
    /// Transforms points from the input system to the output system.
    fn forward(&self, points: &PointSet) -> Result<PointSet, FrameError>;
    /// Transforms points from the output system back to the input
    /// system.
    fn inverse(&self, points: &PointSet) -> Result<PointSet, FrameError>;
    /// Returns whether this mapping is the identity.
    fn is_unit(&self) -> bool {
        false
    }
}

/// Identity mapping.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnitMap;

impl Mapping for UnitMap {
    fn forward(&self, points: &PointSet) -> Result<PointSet, FrameError> {
        Ok(points.clone())
    }
    fn inverse(&self, points: &PointSet) -> Result<PointSet, FrameError> {
        Ok(points.clone())
    }
    fn is_unit(&self) -> bool {
        true
    }
}

/// Per-axis affine mapping: `out[i] = in[i] * scale[i] + shift[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMap {
    scale: Vector,
    shift: Vector,
}

impl LinearMap {
    /// Constructs an affine mapping from per-axis scales and shifts.
    /// `scale` and `shift` must have the same length, and every scale
    /// component must be invertible.
    pub fn new(scale: Vector, shift: Vector) -> Result<Self, FrameError> {
        FrameError::check_axes(scale.naxes(), shift.naxes())?;
        if scale.iter().any(|s| s.abs() < EPSILON || s.is_nan()) {
            return Err(FrameError::SingularMapping);
        }
        Ok(Self { scale, shift })
    }

    fn apply(
        &self,
        points: &PointSet,
        f: impl Fn(Float, usize) -> Float,
    ) -> Result<PointSet, FrameError> {
        FrameError::check_axes(self.scale.naxes(), points.naxes())?;
        let mut out = points.clone();
        for ax in 0..points.naxes() {
            for ip in 0..points.npoint() {
                out.set(ax, ip, f(points.get(ax, ip), ax));
            }
        }
        Ok(out)
    }
}

impl Mapping for LinearMap {
    fn forward(&self, points: &PointSet) -> Result<PointSet, FrameError> {
        self.apply(points, |x, ax| x * self.scale[ax] + self.shift[ax])
    }
    fn inverse(&self, points: &PointSet) -> Result<PointSet, FrameError> {
        self.apply(points, |x, ax| (x - self.shift[ax]) / self.scale[ax])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_linear_roundtrip() {
        let map = LinearMap::new(vector![2.0, -3.0], vector![1.0, 0.5]).unwrap();
        let ps = PointSet::from_points(2, [&vector![1.0, 2.0], &vector![-4.0, 0.0]]);
        let out = map.forward(&ps).unwrap();
        assert_approx_eq!(out.point(0), vector![3.0, -5.5]);
        let back = map.inverse(&out).unwrap();
        assert_approx_eq!(back.point(0), ps.point(0));
        assert_approx_eq!(back.point(1), ps.point(1));
    }

    #[test]
    fn test_singular_scale_rejected() {
        assert_eq!(
            LinearMap::new(vector![1.0, 0.0], vector![0.0, 0.0]),
            Err(FrameError::SingularMapping),
        );
    }

    #[test]
    fn test_axis_mismatch() {
        let map = LinearMap::new(vector![2.0], vector![0.0]).unwrap();
        let ps = PointSet::new(2, 1);
        assert!(matches!(
            map.forward(&ps),
            Err(FrameError::AxisMismatch { expected: 1, found: 2 })
        ));
    }
}
