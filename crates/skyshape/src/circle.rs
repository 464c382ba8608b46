//! Circular and spherical regions.

use std::sync::Arc;

use parking_lot::Mutex;
use skymath::{Float, Frame, FrameSet, PointSet, Vector, is_bad, vector};

use crate::boxregion::BoxRegion;
use crate::error::{RegionError, Result};
use crate::region::{
    PinResult, Region, RegionData, WhichFrame, annulus_pins, normalized_box, pin_tolerance,
    uncertainty_in_current,
};

/// How the size of a new circle is specified.
#[derive(Debug, Clone, PartialEq)]
pub enum CircleSize {
    /// A scalar radius, as a geodesic distance within the frame.
    Radius(Float),
    /// A point on the circumference, with one value per frame axis.
    Circumference(Vector),
}

/// Geometry derived lazily from the definitional points.
///
/// While `stale` is set, `centre` and `radius` must not be read; every
/// read path goes through [`Circle::cached`], which recomputes first.
#[derive(Debug, Clone)]
struct CircleCache {
    centre: Vector,
    radius: Float,
    stale: bool,
}

/// A circle or sphere within a frame.
///
/// The shape is stored as two definitional points in the base frame:
/// the centre and one point on the circumference. The centre and the
/// geodesic radius are derived from them lazily and cached.
#[derive(Debug)]
pub struct Circle {
    data: RegionData,
    cache: Mutex<CircleCache>,
}

impl Circle {
    /// Creates a circle or sphere within `frame`.
    ///
    /// `centre` must supply one defined value per frame axis, and a
    /// circumference point (if given) likewise; an undefined coordinate
    /// in either is a construction error, as is a negative or undefined
    /// radius.
    pub fn new(
        frame: Arc<dyn Frame>,
        centre: &[Float],
        size: CircleSize,
        uncertainty: Option<Box<dyn Region>>,
    ) -> Result<Self> {
        let nc = frame.naxes();
        RegionError::check_axes(nc, centre.len())?;
        if let Some(axis) = centre.iter().position(|&x| is_bad(x)) {
            return Err(RegionError::UndefinedValue {
                what: "circle centre",
                axis,
            });
        }

        let circum = match size {
            CircleSize::Radius(r) => {
                if is_bad(r) || r < 0.0 {
                    return Err(RegionError::InvalidRadius(r));
                }
                // Find a point on the circumference: aim along the
                // first axis and move the radius along the geodesic.
                let mut toward = Vector::from(centre);
                toward[0] = frame.axis_offset(0, toward[0], r);
                frame.offset(centre, toward.as_slice(), r)
            }
            CircleSize::Circumference(p) => {
                RegionError::check_axes(nc, p.naxes())?;
                p
            }
        };
        if let Some(axis) = circum.iter().position(is_bad) {
            return Err(RegionError::UndefinedValue {
                what: "circle circumference",
                axis,
            });
        }

        let points = PointSet::from_points(nc, [&Vector::from(centre), &circum]);
        Ok(Self {
            data: RegionData::new(FrameSet::unit(frame), points, uncertainty),
            cache: Mutex::new(CircleCache {
                centre: Vector::zero(nc),
                radius: 0.0,
                stale: true,
            }),
        })
    }

    /// Returns the geodesic radius.
    pub fn radius(&self) -> Float {
        self.cached().1
    }

    /// Returns the cached centre and radius, recomputing them from the
    /// definitional points first if the cache is stale. This is the
    /// only code path that derives them.
    fn cached(&self) -> (Vector, Float) {
        let mut cache = self.cache.lock();
        if cache.stale {
            let frm = self.data.frameset.base();
            let centre = self.data.points.point(0);
            let circum = self.data.points.point(1);
            cache.radius = frm.distance(centre.as_slice(), circum.as_slice());
            cache.centre = centre;
            cache.stale = false;
        }
        (cache.centre.clone(), cache.radius)
    }
}

impl Clone for Circle {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            cache: Mutex::new(self.cache.lock().clone()),
        }
    }
}

impl Region for Circle {
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
        let frm = Arc::clone(self.data.frameset.base());
        RegionError::check_axes(frm.naxes(), base_points.naxes())?;
        debug_assert_eq!(base_points.npoint(), out.npoint());
        let (centre, radius) = self.cached();
        let (closed, negated) = (self.data.closed, self.data.negated);
        for ip in 0..base_points.npoint() {
            let p = base_points.point(ip);
            let d = frm.distance(centre.as_slice(), p.as_slice());
            let inside = if is_bad(d) {
                // An undefined distance puts the point outside
                // regardless of the closed/negated flags.
                false
            } else {
                match (negated, closed) {
                    (false, true) => d <= radius,
                    (false, false) => d < radius,
                    (true, true) => d >= radius,
                    (true, false) => d > radius,
                }
            };
            if !inside {
                out.mask_point(ip);
            }
        }
        Ok(())
    }

    /// Returns a mesh of points on the boundary, in the base frame.
    ///
    /// With one axis the mesh is the two extreme values. With two axes
    /// it is `mesh_size` points at equal geodesic-angle increments
    /// around the centre. With three or more axes no evenly spread
    /// sampling is attempted: the mesh of the bounding box is projected
    /// radially onto the sphere, which is an approximation and not a
    /// genuinely even spread.
    fn base_mesh(&self) -> Result<Arc<PointSet>> {
        if let Some(mesh) = &*self.data.base_mesh.lock() {
            return Ok(Arc::clone(mesh));
        }

        let frm = Arc::clone(self.data.frameset.base());
        let naxes = frm.naxes();
        let np = self.data.mesh_size;
        let (centre, radius) = self.cached();

        let mesh = match naxes {
            1 => {
                // The boundary of a 1-D "circle" is its two extreme
                // values; `mesh_size` is ignored.
                let lo = vector![centre[0] - radius];
                let hi = vector![centre[0] + radius];
                PointSet::from_points(1, [&lo, &hi])
            }
            2 => {
                let delta = std::f64::consts::TAU / np as Float;
                let mut mesh = PointSet::new(2, np);
                for i in 0..np {
                    let p = frm.offset2(centre.as_slice(), i as Float * delta, radius);
                    mesh.set_point(i, &p);
                }
                mesh
            }
            _ => {
                let (lb, _ub) = self.base_bounding_box()?;
                let mut bbox =
                    BoxRegion::new(Arc::clone(&frm), centre.as_slice(), lb.as_slice(), None)?;
                bbox.set_mesh_size(np);
                let box_mesh = bbox.base_mesh()?;
                let mut mesh = PointSet::new(naxes, box_mesh.npoint());
                for ip in 0..box_mesh.npoint() {
                    let p = box_mesh.point(ip);
                    let proj = frm.offset(centre.as_slice(), p.as_slice(), radius);
                    mesh.set_point(ip, &proj);
                }
                mesh
            }
        };

        tracing::debug!(npoint = mesh.npoint(), naxes, "generated circle base mesh");
        let mesh = Arc::new(mesh);
        *self.data.base_mesh.lock() = Some(Arc::clone(&mesh));
        Ok(mesh)
    }

    fn base_bounding_box(&self) -> Result<(Vector, Vector)> {
        if let Some(b) = &*self.data.base_box.lock() {
            return Ok(b.clone());
        }
        let (centre, radius) = self.cached();
        let lb: Vec<Float> = centre.iter().map(|c| c - radius).collect();
        let ub: Vec<Float> = centre.iter().map(|c| c + radius).collect();
        let result = normalized_box(self, lb, ub)?;
        *self.data.base_box.lock() = Some(result.clone());
        Ok(result)
    }

    fn centre(&self, frame: WhichFrame) -> Result<Vector> {
        let (centre, _) = self.cached();
        match frame {
            WhichFrame::Base => Ok(centre),
            WhichFrame::Current => self.tran_point(centre.as_slice(), true),
        }
    }

    /// Moves the centre, translating both definitional points by the
    /// same base-frame delta so the radius is preserved. The cache is
    /// updated in the same step rather than invalidated.
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
            self.data.points.set(ax, 0, self.data.points.get(ax, 0) + delta);
            self.data.points.set(ax, 1, self.data.points.get(ax, 1) + delta);
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
        let drad = pin_tolerance(self, unc)?;
        let (centre, radius) = self.cached();
        let large = Circle::new(
            Arc::clone(&frm),
            centre.as_slice(),
            CircleSize::Radius(radius + 0.5 * drad),
            None,
        )?;
        let mut small = Circle::new(
            Arc::clone(&frm),
            centre.as_slice(),
            CircleSize::Radius((radius - 0.5 * drad).max(0.0)),
            None,
        )?;
        small.set_negated(true);
        annulus_pins(&large, &small, points, want_mask)
    }

    fn reset_cache(&self) {
        self.cache.lock().stale = true;
        self.data.clear_caches();
    }

    /// Attempts to re-express the circle directly in its current frame.
    ///
    /// Circles are not closed under arbitrary coordinate transforms, so
    /// a candidate circle (and, for 2-axis frames, a candidate ellipse)
    /// is fitted through the transformed boundary mesh and adopted only
    /// if the mesh pins its boundary within the region's uncertainty.
    fn simplify(&self) -> Result<Box<dyn Region>> {
        if self.data.frameset.is_unit() {
            return Ok(self.clone_region());
        }

        let mesh = self.current_mesh()?;
        let cen_ps = self.data.frameset.to_current(&self.data.points)?;
        let cen = cen_ps.point(0);
        if cen.any_bad() {
            return Ok(self.clone_region());
        }

        let cur = Arc::clone(self.data.frameset.current());
        let unc = uncertainty_in_current(self)?;

        if let Some(mut fit) =
            best_circle(Arc::clone(&cur), &mesh, cen.as_slice(), Some(unc.clone()))?
        {
            if fit.pins(&mesh, None, false)?.all_on {
                tracing::debug!("adopted best-fit circle in the current frame");
                fit.overlay(self);
                return Ok(Box::new(fit));
            }
        }

        if cur.naxes() == 2 {
            if let Some(mut fit) =
                crate::ellipse::best_ellipse(Arc::clone(&cur), &mesh, cen.as_slice(), Some(unc))?
            {
                if fit.pins(&mesh, None, false)?.all_on {
                    tracing::debug!("adopted best-fit ellipse in the current frame");
                    fit.overlay(self);
                    return Ok(Box::new(fit));
                }
            }
        }

        Ok(self.clone_region())
    }
}

/// Finds the best fitting circle through a mesh of points around a
/// given centre.
///
/// The radius is the RMS per-axis deviation of the defined mesh values
/// from the centre, scaled by the axis count. Returns `Ok(None)` when
/// the mesh holds no defined values at all. The fitted circle inherits
/// the supplied frame and uncertainty.
pub fn best_circle(
    frame: Arc<dyn Frame>,
    mesh: &PointSet,
    centre: &[Float],
    uncertainty: Option<Box<dyn Region>>,
) -> Result<Option<Circle>> {
    let nc = frame.naxes();
    RegionError::check_axes(nc, mesh.naxes())?;
    RegionError::check_axes(nc, centre.len())?;
    if let Some(axis) = centre.iter().position(|&x| is_bad(x)) {
        return Err(RegionError::UndefinedValue {
            what: "fit centre",
            axis,
        });
    }

    let mut s2r = 0.0;
    let mut n = 0usize;
    for ax in 0..nc {
        let c0 = centre[ax];
        for &v in mesh.axis(ax) {
            if !is_bad(v) {
                let d = v - c0;
                s2r += d * d;
                n += 1;
            }
        }
    }
    if n == 0 {
        return Ok(None);
    }
    let radius = (nc as Float * s2r / n as Float).sqrt();
    Ok(Some(Circle::new(
        frame,
        centre,
        CircleSize::Radius(radius),
        uncertainty,
    )?))
}

#[cfg(test)]
mod tests {
    use skymath::{BAD, CartesianFrame, assert_approx_eq};

    use super::*;

    fn unit_circle(centre: &[Float], radius: Float) -> Circle {
        let frame = Arc::new(CartesianFrame::new(centre.len()));
        Circle::new(frame, centre, CircleSize::Radius(radius), None).unwrap()
    }

    #[test]
    fn test_radius_form_round_trip() {
        let c = unit_circle(&[1.0, 2.0], 3.0);
        assert_approx_eq!(c.radius(), 3.0);
        assert_approx_eq!(c.centre(WhichFrame::Base).unwrap(), vector![1.0, 2.0]);
    }

    #[test]
    fn test_circumference_form_round_trip() {
        let frame = Arc::new(CartesianFrame::new(2));
        let c = Circle::new(
            frame,
            &[1.0, 2.0],
            CircleSize::Circumference(vector![1.0, 5.0]),
            None,
        )
        .unwrap();
        assert_approx_eq!(c.radius(), 3.0);
        assert_approx_eq!(c.centre(WhichFrame::Base).unwrap(), vector![1.0, 2.0]);
    }

    #[test]
    fn test_bad_centre_rejected() {
        let frame: Arc<dyn Frame> = Arc::new(CartesianFrame::new(2));
        let err = Circle::new(
            Arc::clone(&frame),
            &[0.0, BAD],
            CircleSize::Radius(1.0),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            RegionError::UndefinedValue {
                what: "circle centre",
                axis: 1
            }
        );
        let err =
            Circle::new(frame, &[0.0, 0.0], CircleSize::Radius(-1.0), None).unwrap_err();
        assert_eq!(err, RegionError::InvalidRadius(-1.0));
    }

    #[test]
    fn test_containment_truth_table() {
        let mut c = unit_circle(&[0.0, 0.0], 5.0);
        let on = vector![5.0, 0.0];
        let out = vector![5.0001, 0.0];
        let inside = vector![1.0, 1.0];

        // closed, not negated: boundary is inside
        assert!(c.contains_base_point(on.as_slice()));
        assert!(c.contains_base_point(inside.as_slice()));
        assert!(!c.contains_base_point(out.as_slice()));

        // open, not negated: boundary is outside
        c.set_closed(false);
        assert!(!c.contains_base_point(on.as_slice()));
        assert!(c.contains_base_point(inside.as_slice()));

        // open, negated
        c.set_negated(true);
        assert!(!c.contains_base_point(on.as_slice()));
        assert!(!c.contains_base_point(inside.as_slice()));
        assert!(c.contains_base_point(out.as_slice()));

        // closed, negated: boundary is inside again
        c.set_closed(true);
        assert!(c.contains_base_point(on.as_slice()));
        assert!(!c.contains_base_point(inside.as_slice()));
    }

    #[test]
    fn test_negation_inverts_every_interior_point() {
        let mut c = unit_circle(&[0.0, 0.0], 2.0);
        let probes = [
            vector![0.0, 0.0],
            vector![1.5, 0.0],
            vector![3.0, 0.0],
            vector![-2.5, 0.5],
        ];
        let plain: Vec<bool> = probes
            .iter()
            .map(|p| c.contains_base_point(p.as_slice()))
            .collect();
        c.set_negated(true);
        for (p, was_inside) in probes.iter().zip(plain) {
            assert_ne!(c.contains_base_point(p.as_slice()), was_inside);
        }
    }

    #[test]
    fn test_transform_masks_outside_points() {
        let c = unit_circle(&[0.0, 0.0], 5.0);
        let pts = PointSet::from_points(
            2,
            [&vector![1.0, 1.0], &vector![9.0, 0.0], &vector![0.0, -4.9]],
        );
        let out = c.transform(&pts, true).unwrap();
        assert!(!out.point_is_bad(0));
        assert!(out.point_is_bad(1));
        assert!(!out.point_is_bad(2));
        assert_approx_eq!(out.point(0), vector![1.0, 1.0]);
    }

    #[test]
    fn test_undefined_input_is_outside() {
        let c = unit_circle(&[0.0, 0.0], 5.0);
        let pts = PointSet::from_points(2, [&vector![BAD, 0.0]]);
        let out = c.transform(&pts, true).unwrap();
        assert!(out.point_is_bad(0));

        // ... even when negated, which would otherwise contain
        // everything far away.
        let mut neg = unit_circle(&[0.0, 0.0], 5.0);
        neg.set_negated(true);
        let out = neg.transform(&pts, true).unwrap();
        assert!(out.point_is_bad(0));
    }

    #[test]
    fn test_recentre_preserves_radius_and_shifts_circumference() {
        let mut c = unit_circle(&[0.0, 0.0], 5.0);
        let before = c.data().points().point(1);
        c.set_centre(&[10.0, -2.0], WhichFrame::Base).unwrap();
        assert_approx_eq!(c.radius(), 5.0);
        assert_approx_eq!(c.centre(WhichFrame::Base).unwrap(), vector![10.0, -2.0]);
        let after = c.data().points().point(1);
        assert_approx_eq!(&after - &before, vector![10.0, -2.0]);
    }

    #[test]
    fn test_one_axis_mesh() {
        let c = unit_circle(&[3.0], 2.0);
        let mesh = c.base_mesh().unwrap();
        assert_eq!(mesh.npoint(), 2);
        assert_approx_eq!(mesh.point(0), vector![1.0]);
        assert_approx_eq!(mesh.point(1), vector![5.0]);
    }

    #[test]
    fn test_mesh_is_memoized_and_invalidated() {
        let mut c = unit_circle(&[0.0, 0.0], 5.0);
        let m1 = c.base_mesh().unwrap();
        let m2 = c.base_mesh().unwrap();
        assert!(Arc::ptr_eq(&m1, &m2));
        c.set_mesh_size(16);
        let m3 = c.base_mesh().unwrap();
        assert_eq!(m3.npoint(), 16);
    }

    #[test]
    fn test_bounding_box() {
        let c = unit_circle(&[1.0, -2.0, 0.5], 2.0);
        let (lb, ub) = c.base_bounding_box().unwrap();
        assert_approx_eq!(lb, vector![-1.0, -4.0, -1.5]);
        assert_approx_eq!(ub, vector![3.0, 0.0, 2.5]);
    }

    #[test]
    fn test_best_circle_empty_mesh() {
        let frame: Arc<dyn Frame> = Arc::new(CartesianFrame::new(2));
        let mesh = PointSet::new(2, 3);
        let fit = best_circle(frame, &mesh, &[0.0, 0.0], None).unwrap();
        assert!(fit.is_none());
    }
}
