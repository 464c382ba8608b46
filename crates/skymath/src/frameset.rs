//! Base/current frame pairs linked by a mapping.

use std::sync::Arc;

use crate::{Frame, FrameError, Mapping, PointSet, UnitMap};

/// A pair of frames linked by a mapping.
///
/// The *base* frame is the one a region's shape is intrinsically
/// defined in; the *current* frame is the one callers interact with.
/// Frames and mappings are immutable and shared.
#[derive(Debug, Clone)]
pub struct FrameSet {
    base: Arc<dyn Frame>,
    current: Arc<dyn Frame>,
    map: Arc<dyn Mapping>,
}

impl FrameSet {
    /// Constructs a frame set with distinct base and current frames.
    pub fn new(base: Arc<dyn Frame>, map: Arc<dyn Mapping>, current: Arc<dyn Frame>) -> Self {
        Self { base, current, map }
    }

    /// Constructs a frame set whose base and current frames are the
    /// same frame, linked by the identity.
    pub fn unit(frame: Arc<dyn Frame>) -> Self {
        Self {
            base: Arc::clone(&frame),
            current: frame,
            map: Arc::new(UnitMap),
        }
    }

    /// Returns the base frame.
    pub fn base(&self) -> &Arc<dyn Frame> {
        &self.base
    }
    /// Returns the current frame.
    pub fn current(&self) -> &Arc<dyn Frame> {
        &self.current
    }
    /// Returns the base-to-current mapping.
    pub fn mapping(&self) -> &Arc<dyn Mapping> {
        &self.map
    }
    /// Returns whether base and current are linked by the identity.
    pub fn is_unit(&self) -> bool {
        self.map.is_unit()
    }

    /// Converts current-frame points to the base frame.
    pub fn to_base(&self, points: &PointSet) -> Result<PointSet, FrameError> {
        FrameError::check_axes(self.current.naxes(), points.naxes())?;
        self.map.inverse(points)
    }

    /// Converts base-frame points to the current frame.
    pub fn to_current(&self, points: &PointSet) -> Result<PointSet, FrameError> {
        FrameError::check_axes(self.base.naxes(), points.naxes())?;
        self.map.forward(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CartesianFrame, LinearMap, assert_approx_eq};

    #[test]
    fn test_unit_frameset() {
        let fs = FrameSet::unit(Arc::new(CartesianFrame::new(2)));
        assert!(fs.is_unit());
        let ps = PointSet::from_points(2, [&vector![1.0, 2.0]]);
        assert_approx_eq!(fs.to_base(&ps).unwrap().point(0), ps.point(0));
    }

    #[test]
    fn test_roundtrip_through_mapping() {
        let frame: Arc<dyn Frame> = Arc::new(CartesianFrame::new(2));
        let map = Arc::new(LinearMap::new(vector![2.0, 2.0], vector![0.0, 1.0]).unwrap());
        let fs = FrameSet::new(Arc::clone(&frame), map, frame);
        assert!(!fs.is_unit());
        let ps = PointSet::from_points(2, [&vector![3.0, 4.0]]);
        let cur = fs.to_current(&ps).unwrap();
        assert_approx_eq!(cur.point(0), vector![6.0, 9.0]);
        let back = fs.to_base(&cur).unwrap();
        assert_approx_eq!(back.point(0), ps.point(0));
    }
}
