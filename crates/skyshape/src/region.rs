//! The shared region contract implemented by every shape variant.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use skymath::{Float, Frame, FrameSet, PointSet, Vector};

use crate::boxregion::BoxRegion;
use crate::error::{RegionError, Result};

/// Default number of points requested for a boundary mesh.
pub const DEFAULT_MESH_SIZE: usize = 200;

/// Fraction of a region's extent used for its default uncertainty box.
pub const DEFAULT_UNC_FRACTION: Float = 1e-6;

/// Selects the base or current frame of a region's frame set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhichFrame {
    /// The frame the shape is intrinsically defined in.
    Base,
    /// The user-facing frame.
    Current,
}

/// Result of a boundary-pin test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinResult {
    /// Whether every supplied point lies on the boundary within
    /// tolerance.
    pub all_on: bool,
    /// Per-point boundary flags, if requested.
    pub mask: Option<Vec<bool>>,
}

/// State shared by every region shape.
///
/// The definitional points hold the minimal shape-defining positions in
/// the base frame (for a circle: the centre and one circumference
/// point). Derived geometry is cached lazily; any mutation of the frame
/// set or the definitional points must invalidate the caches rather
/// than eagerly recompute them.
pub struct RegionData {
    pub(crate) frameset: FrameSet,
    pub(crate) points: PointSet,
    pub(crate) uncertainty: Option<Box<dyn Region>>,
    pub(crate) negated: bool,
    pub(crate) closed: bool,
    pub(crate) mesh_size: usize,
    pub(crate) base_mesh: Mutex<Option<Arc<PointSet>>>,
    pub(crate) base_box: Mutex<Option<(Vector, Vector)>>,
}

impl RegionData {
    /// Creates region state with default attributes and empty caches.
    pub fn new(
        frameset: FrameSet,
        points: PointSet,
        uncertainty: Option<Box<dyn Region>>,
    ) -> Self {
        Self {
            frameset,
            points,
            uncertainty,
            negated: false,
            closed: true,
            mesh_size: DEFAULT_MESH_SIZE,
            base_mesh: Mutex::new(None),
            base_box: Mutex::new(None),
        }
    }

    /// Returns the frame set the region is defined over.
    pub fn frameset(&self) -> &FrameSet {
        &self.frameset
    }
    /// Returns the definitional points, in the base frame.
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// Drops all cached derived geometry.
    pub(crate) fn clear_caches(&self) {
        *self.base_mesh.lock() = None;
        *self.base_box.lock() = None;
    }
}

impl Clone for RegionData {
    fn clone(&self) -> Self {
        Self {
            frameset: self.frameset.clone(),
            points: self.points.clone(),
            uncertainty: self.uncertainty.as_ref().map(|u| u.clone_region()),
            negated: self.negated,
            closed: self.closed,
            mesh_size: self.mesh_size,
            base_mesh: Mutex::new(self.base_mesh.lock().clone()),
            base_box: Mutex::new(self.base_box.lock().clone()),
        }
    }
}

impl fmt::Debug for RegionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionData")
            .field("points", &self.points)
            .field("negated", &self.negated)
            .field("closed", &self.closed)
            .field("mesh_size", &self.mesh_size)
            .finish_non_exhaustive()
    }
}

/// A bounded region of a coordinate frame.
///
/// Shape variants implement the required methods; the provided methods
/// form the generic pipeline shared by all shapes (coordinate
/// conversion, uncertainty handling, attribute access).
pub trait Region: fmt::Debug + Send + Sync {
    /// Returns the shared region state.
    fn data(&self) -> &RegionData;
    /// Returns the shared region state for mutation.
    fn data_mut(&mut self) -> &mut RegionData;
    /// Returns a deep copy of the region.
    fn clone_region(&self) -> Box<dyn Region>;

    /// Classifies base-frame points against the region, masking every
    /// coordinate of each outside point to [`BAD`](skymath::BAD) in
    /// `out`. Inside points are left untouched.
    ///
    /// `base_points` and `out` must have one entry per input point;
    /// `out` is typically a copy of the caller's current-frame input.
    fn mask(&self, base_points: &PointSet, out: &mut PointSet) -> Result<()>;

    /// Returns a mesh of points on the region's boundary in the base
    /// frame. Memoized; the result is shared until the caches are
    /// invalidated.
    fn base_mesh(&self) -> Result<Arc<PointSet>>;

    /// Returns the axis-aligned bounds of the region in the base frame,
    /// ignoring negation.
    fn base_bounding_box(&self) -> Result<(Vector, Vector)>;

    /// Tests whether the supplied base-frame points all lie on the
    /// region's boundary, within the combined positional uncertainty of
    /// this region and (optionally) of the points themselves.
    fn pins(
        &self,
        points: &PointSet,
        unc: Option<&dyn Region>,
        want_mask: bool,
    ) -> Result<PinResult>;

    /// Invalidates all cached derived geometry.
    fn reset_cache(&self);

    /// Returns an equivalent region that is as simple as possible,
    /// ideally one defined directly in the current frame.
    fn simplify(&self) -> Result<Box<dyn Region>>;

    /// Returns the region's centre. Shapes without a natural centre
    /// return [`RegionError::NoCentre`].
    fn centre(&self, frame: WhichFrame) -> Result<Vector> {
        let _ = frame;
        Err(RegionError::NoCentre)
    }

    /// Moves the region's centre, preserving its shape and size. Shapes
    /// without a natural centre return [`RegionError::NoCentre`].
    fn set_centre(&mut self, new_centre: &[Float], frame: WhichFrame) -> Result<()> {
        let _ = (new_centre, frame);
        Err(RegionError::NoCentre)
    }

    /// Classifies current-frame points against the region: outside
    /// points have every output coordinate set to
    /// [`BAD`](skymath::BAD), inside points are copied unchanged.
    ///
    /// `forward` has no semantic effect, since membership is symmetric;
    /// it is retained for uniformity with the general transform
    /// contract.
    fn transform(&self, points: &PointSet, forward: bool) -> Result<PointSet> {
        let _ = forward;
        let base = self.data().frameset.to_base(points)?;
        let mut out = points.clone();
        self.mask(&base, &mut out)?;
        Ok(out)
    }

    /// Returns the boundary mesh converted to the current frame.
    fn current_mesh(&self) -> Result<PointSet> {
        let mesh = self.base_mesh()?;
        Ok(self.data().frameset.to_current(&mesh)?)
    }

    /// Converts a single point between the base and current frames.
    fn tran_point(&self, point: &[Float], forward: bool) -> Result<Vector> {
        let fs = &self.data().frameset;
        let ps = PointSet::from_points(point.len(), [&Vector::from(point)]);
        let out = if forward {
            fs.to_current(&ps)?
        } else {
            fs.to_base(&ps)?
        };
        Ok(out.point(0))
    }

    /// Returns the region's uncertainty region: the stored one, or a
    /// default box [`DEFAULT_UNC_FRACTION`] of the region's extent.
    fn uncertainty(&self) -> Result<Box<dyn Region>> {
        if let Some(u) = &self.data().uncertainty {
            return Ok(u.clone_region());
        }
        let (lb, ub) = self.base_bounding_box()?;
        let mid: Vector = Vector::zip(&lb, &ub).map(|(l, u)| 0.5 * (l + u)).collect();
        let corner: Vector = Vector::zip(&mid, &ub)
            .map(|(m, u)| m + (u - m) * DEFAULT_UNC_FRACTION)
            .collect();
        let unc = BoxRegion::new(
            Arc::clone(self.data().frameset.base()),
            mid.as_slice(),
            corner.as_slice(),
            None,
        )?;
        Ok(Box::new(unc))
    }

    /// Returns whether the containment predicate is inverted.
    fn negated(&self) -> bool {
        self.data().negated
    }
    /// Inverts or restores the containment predicate.
    fn set_negated(&mut self, negated: bool) {
        self.data_mut().negated = negated;
    }
    /// Returns whether the boundary itself counts as inside.
    fn closed(&self) -> bool {
        self.data().closed
    }
    /// Sets whether the boundary itself counts as inside.
    fn set_closed(&mut self, closed: bool) {
        self.data_mut().closed = closed;
    }
    /// Returns the requested boundary-mesh density.
    fn mesh_size(&self) -> usize {
        self.data().mesh_size
    }
    /// Sets the requested boundary-mesh density and drops any cached
    /// mesh.
    fn set_mesh_size(&mut self, mesh_size: usize) {
        self.data_mut().mesh_size = mesh_size.max(2);
        self.reset_cache();
    }

    /// Rebinds the region onto `frame`, making it both base and current
    /// with an identity mapping, and invalidates the caches.
    fn rebind_frame(&mut self, frame: Arc<dyn Frame>) -> Result<()> {
        RegionError::check_axes(self.data().frameset.base().naxes(), frame.naxes())?;
        self.data_mut().frameset = FrameSet::unit(frame);
        self.reset_cache();
        Ok(())
    }

    /// Replaces the region's frame set and invalidates the caches. The
    /// new base frame must match the definitional points' axis count.
    fn set_frameset(&mut self, frameset: FrameSet) -> Result<()> {
        RegionError::check_axes(frameset.base().naxes(), self.data().points.naxes())?;
        self.data_mut().frameset = frameset;
        self.reset_cache();
        Ok(())
    }

    /// Copies the user-visible attributes of `other` onto this region.
    fn overlay(&mut self, other: &dyn Region) {
        let src = other.data();
        let (negated, closed, mesh_size) = (src.negated, src.closed, src.mesh_size);
        let dst = self.data_mut();
        dst.negated = negated;
        dst.closed = closed;
        dst.mesh_size = mesh_size;
        self.reset_cache();
    }

    /// Tests a single base-frame point for membership. Errors and
    /// undefined coordinates count as outside.
    fn contains_base_point(&self, point: &[Float]) -> bool {
        let naxes = self.data().frameset.base().naxes();
        if point.len() != naxes {
            return false;
        }
        let ps = PointSet::from_points(naxes, [&Vector::from(point)]);
        let mut out = ps.clone();
        match self.mask(&ps, &mut out) {
            Ok(()) => !out.point_is_bad(0),
            Err(_) => false,
        }
    }
}

impl Clone for Box<dyn Region> {
    fn clone(&self) -> Self {
        self.clone_region()
    }
}

/// Returns the boundary-pin tolerance half-width for a region: half the
/// combined geodesic diagonals of its own uncertainty bounding box and
/// of the supplied comparison uncertainty's bounding box.
pub(crate) fn pin_tolerance(region: &dyn Region, unc: Option<&dyn Region>) -> Result<Float> {
    let frm = Arc::clone(region.data().frameset.base());
    let tunc = region.uncertainty()?;
    let (lb, ub) = tunc.base_bounding_box()?;
    let l1 = frm.distance(lb.as_slice(), ub.as_slice());
    let l2 = match unc {
        Some(u) => {
            let (lb, ub) = u.base_bounding_box()?;
            frm.distance(lb.as_slice(), ub.as_slice())
        }
        None => 0.0,
    };
    Ok(0.5 * (l1 + l2))
}

/// Tests points against the annulus between an enlarged copy of a
/// region and a shrunk, negated one: a point is on the boundary iff it
/// survives both masks.
pub(crate) fn annulus_pins(
    large: &dyn Region,
    small: &dyn Region,
    points: &PointSet,
    want_mask: bool,
) -> Result<PinResult> {
    let mut masked = points.clone();
    let input = masked.clone();
    large.mask(&input, &mut masked)?;
    let input = masked.clone();
    small.mask(&input, &mut masked)?;

    let mut mask = vec![true; points.npoint()];
    let mut all_on = true;
    for ip in 0..points.npoint() {
        if masked.point_is_bad(ip) {
            mask[ip] = false;
            all_on = false;
            if !want_mask {
                break;
            }
        }
    }
    Ok(PinResult {
        all_on,
        mask: want_mask.then_some(mask),
    })
}

/// Normalizes raw per-axis bounds into a bounding box, letting the base
/// frame widen or clamp them for cyclic axes. The membership probe is a
/// non-negated copy of the region rebound onto its own base frame, so
/// negation and the base-to-current mapping cannot distort the result.
pub(crate) fn normalized_box(
    region: &dyn Region,
    mut lb: Vec<Float>,
    mut ub: Vec<Float>,
) -> Result<(Vector, Vector)> {
    let frm = Arc::clone(region.data().frameset.base());
    let mut probe = region.clone_region();
    probe.rebind_frame(Arc::clone(&frm))?;
    probe.set_negated(false);
    frm.normalize_box(&mut lb, &mut ub, &|pt| probe.contains_base_point(pt));
    Ok((Vector::from(lb.as_slice()), Vector::from(ub.as_slice())))
}

/// Returns a current-frame stand-in for a region's uncertainty: a box
/// over the uncertainty's bounding box mapped through the region's
/// base-to-current transform.
pub(crate) fn uncertainty_in_current(region: &dyn Region) -> Result<Box<dyn Region>> {
    let unc = region.uncertainty()?;
    let (lb, ub) = unc.base_bounding_box()?;
    let fs = region.data().frameset.clone();
    let corners = PointSet::from_points(lb.naxes(), [&lb, &ub]);
    let mapped = fs.to_current(&corners)?;
    let (lb2, ub2) = (mapped.point(0), mapped.point(1));
    let mid: Vector = Vector::zip(&lb2, &ub2).map(|(l, u)| 0.5 * (l + u)).collect();
    let unc = BoxRegion::new(
        Arc::clone(fs.current()),
        mid.as_slice(),
        ub2.as_slice(),
        None,
    )?;
    Ok(Box::new(unc))
}
