//! Elliptical regions over two-axis frames.

use std::f64::consts::TAU;
use std::sync::Arc;

use parking_lot::Mutex;
use skymath::{EPSILON, Float, Frame, FrameSet, PointSet, Vector, is_bad, vector};

use crate::error::{RegionError, Result};
use crate::region::{
    PinResult, Region, RegionData, WhichFrame, annulus_pins, normalized_box, pin_tolerance,
};

/// Geometry derived lazily from the definitional points.
#[derive(Debug, Clone)]
struct EllipseCache {
    centre: Vector,
    a: Float,
    b: Float,
    angle: Float,
    stale: bool,
}

/// An ellipse within a two-axis frame.
///
/// The shape is stored as three definitional points: the centre and the
/// ends of the two semi-axes. The semi-axis lengths and the orientation
/// angle (anticlockwise from the first frame axis) are derived lazily.
/// The figure is evaluated in the frame's coordinates directly, so it
/// is only exact on locally flat frames.
#[derive(Debug)]
pub struct Ellipse {
    data: RegionData,
    cache: Mutex<EllipseCache>,
}

impl Ellipse {
    /// Creates an ellipse within `frame` from its centre, semi-axis
    /// lengths and orientation angle. Negative or undefined semi-axis
    /// lengths and undefined centres or angles are construction errors.
    pub fn new(
        frame: Arc<dyn Frame>,
        centre: &[Float],
        semi_axes: (Float, Float),
        angle: Float,
        uncertainty: Option<Box<dyn Region>>,
    ) -> Result<Self> {
        RegionError::check_axes(2, frame.naxes())?;
        RegionError::check_axes(2, centre.len())?;
        if let Some(axis) = centre.iter().position(|&x| is_bad(x)) {
            return Err(RegionError::UndefinedValue {
                what: "ellipse centre",
                axis,
            });
        }
        let (a, b) = semi_axes;
        if is_bad(a) || a < 0.0 {
            return Err(RegionError::InvalidRadius(a));
        }
        if is_bad(b) || b < 0.0 {
            return Err(RegionError::InvalidRadius(b));
        }
        if is_bad(angle) {
            return Err(RegionError::UndefinedValue {
                what: "ellipse orientation",
                axis: 0,
            });
        }

        let (sin, cos) = angle.sin_cos();
        let end_a = vector![centre[0] + a * cos, centre[1] + a * sin];
        let end_b = vector![centre[0] - b * sin, centre[1] + b * cos];
        let points = PointSet::from_points(2, [&Vector::from(centre), &end_a, &end_b]);
        Ok(Self {
            data: RegionData::new(FrameSet::unit(frame), points, uncertainty),
            cache: Mutex::new(EllipseCache {
                centre: Vector::zero(2),
                a: 0.0,
                b: 0.0,
                angle: 0.0,
                stale: true,
            }),
        })
    }

    /// Returns the semi-axis lengths.
    pub fn semi_axes(&self) -> (Float, Float) {
        let c = self.cached();
        (c.a, c.b)
    }

    /// Returns the orientation angle, anticlockwise from the first
    /// frame axis.
    pub fn angle(&self) -> Float {
        self.cached().angle
    }

    fn cached(&self) -> EllipseCache {
        let mut cache = self.cache.lock();
        if cache.stale {
            let centre = self.data.points.point(0);
            let d1 = &self.data.points.point(1) - &centre;
            let d2 = &self.data.points.point(2) - &centre;
            cache.a = d1[0].hypot(d1[1]);
            cache.b = d2[0].hypot(d2[1]);
            cache.angle = d1[1].atan2(d1[0]);
            cache.centre = centre;
            cache.stale = false;
        }
        cache.clone()
    }

    /// Returns the normalized squared elliptical radius of a point: the
    /// boundary is at one. Degenerate semi-axes collapse to a strip
    /// test of width [`EPSILON`].
    fn figure(&self, cache: &EllipseCache, p: &Vector) -> Float {
        let (sin, cos) = cache.angle.sin_cos();
        let dx = p[0] - cache.centre[0];
        let dy = p[1] - cache.centre[1];
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        let norm = |d: Float, s: Float| {
            if s < EPSILON {
                if d.abs() < EPSILON { 0.0 } else { Float::INFINITY }
            } else {
                let r = d / s;
                r * r
            }
        };
        norm(u, cache.a) + norm(v, cache.b)
    }
}

impl Clone for Ellipse {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            cache: Mutex::new(self.cache.lock().clone()),
        }
    }
}

impl Region for Ellipse {
    fn data(&self) -> &RegionData {
        &self.data
    }
    fn data_mut(&mut self) -> &mut RegionData {
        &mut self.data
    }
    fn clone_region(&self) -> Box<dyn Region> {
        Box::new(self.clone())
    }

    fn mask(&self, base_points: &PointSet, out: &mut PointSet) -> Result<()> {
        RegionError::check_axes(self.data.frameset.base().naxes(), base_points.naxes())?;
        debug_assert_eq!(base_points.npoint(), out.npoint());
        let cache = self.cached();
        let (closed, negated) = (self.data.closed, self.data.negated);
        for ip in 0..base_points.npoint() {
            let inside = if base_points.point_is_bad(ip) {
                false
            } else {
                let f = self.figure(&cache, &base_points.point(ip));
                match (negated, closed) {
                    (false, true) => f <= 1.0,
                    (false, false) => f < 1.0,
                    (true, true) => f >= 1.0,
                    (true, false) => f > 1.0,
                }
            };
            if !inside {
                out.mask_point(ip);
            }
        }
        Ok(())
    }

    fn base_mesh(&self) -> Result<Arc<PointSet>> {
        if let Some(mesh) = &*self.data.base_mesh.lock() {
            return Ok(Arc::clone(mesh));
        }

        let np = self.data.mesh_size;
        let cache = self.cached();
        let (sin, cos) = cache.angle.sin_cos();
        let mut mesh = PointSet::new(2, np);
        let delta = TAU / np as Float;
        for i in 0..np {
            let (st, ct) = (i as Float * delta).sin_cos();
            let u = cache.a * ct;
            let v = cache.b * st;
            mesh.set_point(
                i,
                &vector![
                    cache.centre[0] + u * cos - v * sin,
                    cache.centre[1] + u * sin + v * cos
                ],
            );
        }

        tracing::debug!(npoint = np, "generated ellipse base mesh");
        let mesh = Arc::new(mesh);
        *self.data.base_mesh.lock() = Some(Arc::clone(&mesh));
        Ok(mesh)
    }

    fn base_bounding_box(&self) -> Result<(Vector, Vector)> {
        if let Some(b) = &*self.data.base_box.lock() {
            return Ok(b.clone());
        }
        let cache = self.cached();
        let (sin, cos) = cache.angle.sin_cos();
        let ex = (cache.a * cos).hypot(cache.b * sin);
        let ey = (cache.a * sin).hypot(cache.b * cos);
        let lb = vec![cache.centre[0] - ex, cache.centre[1] - ey];
        let ub = vec![cache.centre[0] + ex, cache.centre[1] + ey];
        let result = normalized_box(self, lb, ub)?;
        *self.data.base_box.lock() = Some(result.clone());
        Ok(result)
    }

    fn centre(&self, frame: WhichFrame) -> Result<Vector> {
        let centre = self.cached().centre;
        match frame {
            WhichFrame::Base => Ok(centre),
            WhichFrame::Current => self.tran_point(centre.as_slice(), true),
        }
    }

    fn set_centre(&mut self, new_centre: &[Float], frame: WhichFrame) -> Result<()> {
        let bc = match frame {
            WhichFrame::Base => {
                RegionError::check_axes(self.data.frameset.base().naxes(), new_centre.len())?;
                Vector::from(new_centre)
            }
            WhichFrame::Current => {
                RegionError::check_axes(self.data.frameset.current().naxes(), new_centre.len())?;
                self.tran_point(new_centre, false)?
            }
        };
        if let Some(axis) = bc.iter().position(is_bad) {
            return Err(RegionError::UndefinedValue {
                what: "new centre",
                axis,
            });
        }
        let _ = self.cached();
        let mut cache = self.cache.lock();
        for ax in 0..self.data.points.naxes() {
            let delta = bc[ax] - self.data.points.get(ax, 0);
            for ip in 0..self.data.points.npoint() {
                self.data.points.set(ax, ip, self.data.points.get(ax, ip) + delta);
            }
            cache.centre[ax] += delta;
        }
        Ok(())
    }

    fn pins(
        &self,
        points: &PointSet,
        unc: Option<&dyn Region>,
        want_mask: bool,
    ) -> Result<PinResult> {
        let frm = Arc::clone(self.data.frameset.base());
        RegionError::check_axes(frm.naxes(), points.naxes())?;
        if let Some(u) = unc {
            RegionError::check_axes(frm.naxes(), u.data().frameset().current().naxes())?;
        }
        let dr2 = 0.5 * pin_tolerance(self, unc)?;
        let cache = self.cached();
        let large = Ellipse::new(
            Arc::clone(&frm),
            cache.centre.as_slice(),
            (cache.a + dr2, cache.b + dr2),
            cache.angle,
            None,
        )?;
        let mut small = Ellipse::new(
            Arc::clone(&frm),
            cache.centre.as_slice(),
            ((cache.a - dr2).max(0.0), (cache.b - dr2).max(0.0)),
            cache.angle,
            None,
        )?;
        small.set_negated(true);
        annulus_pins(&large, &small, points, want_mask)
    }

    fn reset_cache(&self) {
        self.cache.lock().stale = true;
        self.data.clear_caches();
    }

    /// Ellipses have no further shape-specific refit; the result of the
    /// generic pipeline is returned unchanged.
    fn simplify(&self) -> Result<Box<dyn Region>> {
        Ok(self.clone_region())
    }
}

/// Finds the best fitting ellipse through a mesh of points around a
/// given centre in a two-axis frame.
///
/// The orientation comes from the principal axis of the points' second
/// moments about the centre, and each semi-axis length from the RMS
/// extent along it. For points evenly spread on an exact ellipse both
/// recover the true figure. Returns `Ok(None)` when the mesh holds no
/// defined points.
pub fn best_ellipse(
    frame: Arc<dyn Frame>,
    mesh: &PointSet,
    centre: &[Float],
    uncertainty: Option<Box<dyn Region>>,
) -> Result<Option<Ellipse>> {
    RegionError::check_axes(2, frame.naxes())?;
    RegionError::check_axes(2, mesh.naxes())?;
    RegionError::check_axes(2, centre.len())?;
    if let Some(axis) = centre.iter().position(|&x| is_bad(x)) {
        return Err(RegionError::UndefinedValue {
            what: "fit centre",
            axis,
        });
    }

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    let mut n = 0usize;
    for ip in 0..mesh.npoint() {
        if mesh.point_is_bad(ip) {
            continue;
        }
        let dx = mesh.get(0, ip) - centre[0];
        let dy = mesh.get(1, ip) - centre[1];
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
        n += 1;
    }
    if n == 0 {
        return Ok(None);
    }

    let angle = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (sin, cos) = angle.sin_cos();
    // Second moments along and across the principal axis. Points evenly
    // spread on an ellipse satisfy mean(u^2) = a^2 / 2.
    let m_major = (sxx * cos * cos + 2.0 * sxy * sin * cos + syy * sin * sin) / n as Float;
    let m_minor = (sxx * sin * sin - 2.0 * sxy * sin * cos + syy * cos * cos) / n as Float;
    let a = (2.0 * m_major).sqrt();
    let b = (2.0 * m_minor.max(0.0)).sqrt();
    Ok(Some(Ellipse::new(
        frame,
        centre,
        (a, b),
        angle,
        uncertainty,
    )?))
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_4;

    use skymath::{CartesianFrame, assert_approx_eq};

    use super::*;

    fn flat_ellipse(centre: &[Float], axes: (Float, Float), angle: Float) -> Ellipse {
        let frame = Arc::new(CartesianFrame::new(2));
        Ellipse::new(frame, centre, axes, angle, None).unwrap()
    }

    #[test]
    fn test_round_trip_through_definitional_points() {
        let e = flat_ellipse(&[1.0, 2.0], (3.0, 1.0), FRAC_PI_4);
        let (a, b) = e.semi_axes();
        assert_approx_eq!(a, 3.0);
        assert_approx_eq!(b, 1.0);
        assert_approx_eq!(e.angle(), FRAC_PI_4);
        assert_approx_eq!(e.centre(WhichFrame::Base).unwrap(), vector![1.0, 2.0]);
    }

    #[test]
    fn test_containment() {
        let mut e = flat_ellipse(&[0.0, 0.0], (4.0, 2.0), 0.0);
        assert!(e.contains_base_point(&[4.0, 0.0]));
        assert!(e.contains_base_point(&[0.0, 2.0]));
        assert!(e.contains_base_point(&[1.0, 1.0]));
        assert!(!e.contains_base_point(&[0.0, 2.001]));
        assert!(!e.contains_base_point(&[4.0, 1.0]));

        e.set_negated(true);
        assert!(e.contains_base_point(&[4.0, 1.0]));
        assert!(!e.contains_base_point(&[1.0, 1.0]));
    }

    #[test]
    fn test_mesh_lies_on_boundary() {
        let mut e = flat_ellipse(&[1.0, -1.0], (4.0, 2.0), FRAC_PI_4);
        e.set_mesh_size(32);
        let mesh = e.base_mesh().unwrap();
        assert_eq!(mesh.npoint(), 32);
        let cache = e.cached();
        for p in mesh.points() {
            assert_approx_eq!(e.figure(&cache, &p), 1.0);
        }
    }

    #[test]
    fn test_bounding_box_axis_aligned() {
        let e = flat_ellipse(&[0.0, 0.0], (4.0, 2.0), 0.0);
        let (lb, ub) = e.base_bounding_box().unwrap();
        assert_approx_eq!(lb, vector![-4.0, -2.0]);
        assert_approx_eq!(ub, vector![4.0, 2.0]);
    }

    #[test]
    fn test_pins_own_mesh() {
        let e = flat_ellipse(&[0.0, 0.0], (4.0, 2.0), 0.3);
        let mesh = e.base_mesh().unwrap();
        assert!(e.pins(&mesh, None, false).unwrap().all_on);
    }

    #[test]
    fn test_best_ellipse_recovers_figure() {
        let e = flat_ellipse(&[2.0, 3.0], (4.0, 2.0), FRAC_PI_4);
        let mesh = e.base_mesh().unwrap();
        let frame: Arc<dyn Frame> = Arc::new(CartesianFrame::new(2));
        let fit = best_ellipse(frame, &mesh, &[2.0, 3.0], None)
            .unwrap()
            .unwrap();
        let (a, b) = fit.semi_axes();
        assert_approx_eq!(a, 4.0);
        assert_approx_eq!(b, 2.0);
        assert_approx_eq!(fit.angle(), FRAC_PI_4);
        assert!(fit.pins(&mesh, None, false).unwrap().all_on);
    }

    #[test]
    fn test_rejects_other_axis_counts() {
        let frame = Arc::new(CartesianFrame::new(3));
        let err = Ellipse::new(frame, &[0.0, 0.0], (1.0, 1.0), 0.0, None).unwrap_err();
        assert_eq!(
            err,
            RegionError::AxisMismatch {
                expected: 2,
                found: 3
            }
        );
    }
}
