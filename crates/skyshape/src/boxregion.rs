//! Axis-aligned box regions.

use std::sync::Arc;

use itertools::Itertools;
use parking_lot::Mutex;
use skymath::{EPSILON, Float, Frame, FrameSet, PointSet, Vector, is_bad, vector};

use crate::error::{RegionError, Result};
use crate::region::{
    PinResult, Region, RegionData, WhichFrame, annulus_pins, normalized_box, pin_tolerance,
};

/// Geometry derived lazily from the definitional points.
#[derive(Debug, Clone)]
struct BoxCache {
    centre: Vector,
    half: Vector,
    stale: bool,
}

/// An axis-aligned box within a frame.
///
/// The shape is stored as two definitional points in the base frame:
/// the centre and one corner. The per-axis half-widths are derived from
/// them lazily and cached.
#[derive(Debug)]
pub struct BoxRegion {
    data: RegionData,
    cache: Mutex<BoxCache>,
}

impl BoxRegion {
    /// Creates an axis-aligned box within `frame`, given its centre and
    /// any one corner. Undefined coordinates in either point are a
    /// construction error.
    pub fn new(
        frame: Arc<dyn Frame>,
        centre: &[Float],
        corner: &[Float],
        uncertainty: Option<Box<dyn Region>>,
    ) -> Result<Self> {
        let nc = frame.naxes();
        RegionError::check_axes(nc, centre.len())?;
        RegionError::check_axes(nc, corner.len())?;
        if let Some(axis) = centre.iter().position(|&x| is_bad(x)) {
            return Err(RegionError::UndefinedValue {
                what: "box centre",
                axis,
            });
        }
        if let Some(axis) = corner.iter().position(|&x| is_bad(x)) {
            return Err(RegionError::UndefinedValue {
                what: "box corner",
                axis,
            });
        }

        let points = PointSet::from_points(nc, [&Vector::from(centre), &Vector::from(corner)]);
        Ok(Self {
            data: RegionData::new(FrameSet::unit(frame), points, uncertainty),
            cache: Mutex::new(BoxCache {
                centre: Vector::zero(nc),
                half: Vector::zero(nc),
                stale: true,
            }),
        })
    }

    /// Returns the per-axis half-widths.
    pub fn half_widths(&self) -> Vector {
        self.cached().1
    }

    /// Returns the cached centre and half-widths, recomputing them from
    /// the definitional points first if the cache is stale.
    fn cached(&self) -> (Vector, Vector) {
        let mut cache = self.cache.lock();
        if cache.stale {
            let centre = self.data.points.point(0);
            let corner = self.data.points.point(1);
            cache.half = Vector::zip(&centre, &corner)
                .map(|(c, k)| (k - c).abs())
                .collect();
            cache.centre = centre;
            cache.stale = false;
        }
        (cache.centre.clone(), cache.half.clone())
    }
}

impl Clone for BoxRegion {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            cache: Mutex::new(self.cache.lock().clone()),
        }
    }
}

impl Region for BoxRegion {
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
        let (centre, half) = self.cached();
        let (closed, negated) = (self.data.closed, self.data.negated);
        for ip in 0..base_points.npoint() {
            // The undefined check must come first: NaN comparisons are
            // all false, which would otherwise put an undefined point
            // inside every negated box.
            let inside = if base_points.point_is_bad(ip) {
                false
            } else {
                let p = base_points.point(ip);
                let strictly_in = Vector::zip(&p, &centre)
                    .zip(half.iter())
                    .all(|((x, c), h)| (x - c).abs() < h);
                let weakly_in = Vector::zip(&p, &centre)
                    .zip(half.iter())
                    .all(|((x, c), h)| (x - c).abs() <= h);
                match (negated, closed) {
                    (false, true) => weakly_in,
                    (false, false) => strictly_in,
                    (true, true) => !strictly_in,
                    (true, false) => !weakly_in,
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
    /// With one axis the mesh is the two face values. With two axes the
    /// perimeter is walked anticlockwise at equal steps. With three or
    /// more axes each face carries a regular grid; the total may exceed
    /// `mesh_size`, so callers should read the count back.
    fn base_mesh(&self) -> Result<Arc<PointSet>> {
        if let Some(mesh) = &*self.data.base_mesh.lock() {
            return Ok(Arc::clone(mesh));
        }

        let naxes = self.data.frameset.base().naxes();
        let np = self.data.mesh_size;
        let (centre, half) = self.cached();

        let mesh = match naxes {
            1 => {
                let lo = vector![centre[0] - half[0]];
                let hi = vector![centre[0] + half[0]];
                PointSet::from_points(1, [&lo, &hi])
            }
            2 => {
                let (hx, hy) = (half[0], half[1]);
                let (x0, y0) = (centre[0] - hx, centre[1] - hy);
                let perim = 4.0 * (hx + hy);
                let mut mesh = PointSet::new(2, np);
                if perim < EPSILON {
                    for i in 0..np {
                        mesh.set_point(i, &centre);
                    }
                } else {
                    let edges = [
                        (vector![x0, y0], vector![1.0, 0.0], 2.0 * hx),
                        (vector![x0 + 2.0 * hx, y0], vector![0.0, 1.0], 2.0 * hy),
                        (
                            vector![x0 + 2.0 * hx, y0 + 2.0 * hy],
                            vector![-1.0, 0.0],
                            2.0 * hx,
                        ),
                        (vector![x0, y0 + 2.0 * hy], vector![0.0, -1.0], 2.0 * hy),
                    ];
                    let step = perim / np as Float;
                    for i in 0..np {
                        let mut t = i as Float * step;
                        for (iedge, (start, dir, len)) in edges.iter().enumerate() {
                            // Rounding can push the walk just past the
                            // final edge, so the last one always takes
                            // the point.
                            if t <= *len || iedge == edges.len() - 1 {
                                mesh.set_point(i, &(start + &dir.scale(t.min(*len))));
                                break;
                            }
                            t -= len;
                        }
                    }
                }
                mesh
            }
            _ => {
                // One regular grid per face. Point counts round up so
                // every face gets the same coverage.
                let per_face = (np / (2 * naxes)).max(1);
                let k = ((per_face as Float)
                    .powf(1.0 / (naxes - 1) as Float)
                    .ceil() as usize)
                    .max(2);
                let samples: Vec<Vec<Float>> = (0..naxes)
                    .map(|ax| {
                        let lo = centre[ax] - half[ax];
                        let span = 2.0 * half[ax];
                        (0..k)
                            .map(|i| lo + span * i as Float / (k - 1) as Float)
                            .collect()
                    })
                    .collect();
                let mut pts: Vec<Vector> = Vec::new();
                for ax in 0..naxes {
                    for bound in [centre[ax] - half[ax], centre[ax] + half[ax]] {
                        for combo in (0..naxes)
                            .filter(|&a| a != ax)
                            .map(|a| samples[a].iter().copied())
                            .multi_cartesian_product()
                        {
                            let mut free = combo.into_iter();
                            let p: Vector = (0..naxes)
                                .map(|a| {
                                    if a == ax {
                                        bound
                                    } else {
                                        free.next().unwrap_or(bound)
                                    }
                                })
                                .collect();
                            pts.push(p);
                        }
                    }
                }
                PointSet::from_points(naxes, pts.iter())
            }
        };

        tracing::debug!(npoint = mesh.npoint(), naxes, "generated box base mesh");
        let mesh = Arc::new(mesh);
        *self.data.base_mesh.lock() = Some(Arc::clone(&mesh));
        Ok(mesh)
    }

    fn base_bounding_box(&self) -> Result<(Vector, Vector)> {
        if let Some(b) = &*self.data.base_box.lock() {
            return Ok(b.clone());
        }
        let (centre, half) = self.cached();
        let lb: Vec<Float> = Vector::zip(&centre, &half).map(|(c, h)| c - h).collect();
        let ub: Vec<Float> = Vector::zip(&centre, &half).map(|(c, h)| c + h).collect();
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
        let dr2 = 0.5 * pin_tolerance(self, unc)?;
        let (centre, half) = self.cached();
        let grown: Vector = Vector::zip(&centre, &half).map(|(c, h)| c + h + dr2).collect();
        let shrunk: Vector = Vector::zip(&centre, &half)
            .map(|(c, h)| c + (h - dr2).max(0.0))
            .collect();
        let large = BoxRegion::new(Arc::clone(&frm), centre.as_slice(), grown.as_slice(), None)?;
        let mut small =
            BoxRegion::new(Arc::clone(&frm), centre.as_slice(), shrunk.as_slice(), None)?;
        small.set_negated(true);
        annulus_pins(&large, &small, points, want_mask)
    }

    fn reset_cache(&self) {
        self.cache.lock().stale = true;
        self.data.clear_caches();
    }

    /// Boxes have no shape-specific refit in the current frame; the
    /// result of the generic pipeline is returned unchanged.
    fn simplify(&self) -> Result<Box<dyn Region>> {
        Ok(self.clone_region())
    }
}
