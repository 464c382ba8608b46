//! Coordinate-system descriptors supplying geodesic primitives.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

use crate::{BAD, EPSILON, Float, Vector, is_bad};

/// Immutable coordinate-system descriptor.
///
/// A frame defines distance and direction over an N-dimensional
/// coordinate space. The metric need not be Euclidean; all geometry
/// built on top of a frame goes through these primitives and never
/// assumes flatness.
///
/// Every primitive propagates the [`BAD`] sentinel: undefined inputs
/// yield undefined outputs, never an error.
pub trait Frame: fmt::Debug + Send + Sync {
    /// Returns the number of axes in the frame.
    fn naxes(&self) -> usize;

    /// Returns the geodesic distance between two points.
    fn distance(&self, a: &[Float], b: &[Float]) -> Float;

    /// Returns the point at geodesic distance `dist` from `a` along the
    /// geodesic through `a` and `b`.
    ///
    /// Returns an all-[`BAD`] point if the direction is undefined (for
    /// instance when `a` and `b` coincide and `dist` is nonzero).
    fn offset(&self, a: &[Float], b: &[Float], dist: Float) -> Vector;

    /// Returns the point at geodesic distance `dist` from `a` in the
    /// direction given by the position angle `angle`. Only meaningful
    /// for 2-axis frames; other frames return an all-[`BAD`] point.
    fn offset2(&self, a: &[Float], angle: Float, dist: Float) -> Vector {
        let _ = (a, angle, dist);
        Vector((0..self.naxes()).map(|_| BAD).collect())
    }

    /// Returns `value` offset by the geodesic distance `dist` along one
    /// axis, the other axis values being held fixed.
    fn axis_offset(&self, axis: usize, value: Float, dist: Float) -> Float {
        let _ = axis;
        value + dist
    }

    /// Adjusts an axis-aligned bounding box so that it genuinely covers
    /// the region described by `contains`, accounting for cyclic axes.
    ///
    /// A naive per-axis min/max is only correct on non-cyclic, locally
    /// flat axes; frames with wraparound axes must widen the box where
    /// the boundary extends past it. `contains` tests whether a point in
    /// this frame lies inside the region the box was derived from. Flat
    /// frames need not do anything.
    fn normalize_box(
        &self,
        lbnd: &mut [Float],
        ubnd: &mut [Float],
        contains: &dyn Fn(&[Float]) -> bool,
    ) {
        let _ = (lbnd, ubnd, contains);
    }
}

/// Flat N-dimensional frame with the Euclidean metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartesianFrame {
    naxes: usize,
}

impl CartesianFrame {
    /// Constructs a flat frame with `naxes` axes.
    pub fn new(naxes: usize) -> Self {
        Self { naxes }
    }
}

impl Frame for CartesianFrame {
    fn naxes(&self) -> usize {
        self.naxes
    }

    fn distance(&self, a: &[Float], b: &[Float]) -> Float {
        (0..self.naxes)
            .map(|i| {
                let d = b[i] - a[i];
                d * d
            })
            .sum::<Float>()
            .sqrt()
    }

    fn offset(&self, a: &[Float], b: &[Float], dist: Float) -> Vector {
        let len = self.distance(a, b);
        if is_bad(len) || len < EPSILON {
            if dist.abs() < EPSILON {
                return a.into();
            }
            return Vector((0..self.naxes).map(|_| BAD).collect());
        }
        let f = dist / len;
        (0..self.naxes).map(|i| a[i] + (b[i] - a[i]) * f).collect()
    }

    /// The position angle is measured anticlockwise from the first axis.
    fn offset2(&self, a: &[Float], angle: Float, dist: Float) -> Vector {
        if self.naxes != 2 {
            return Vector((0..self.naxes).map(|_| BAD).collect());
        }
        vector![a[0] + dist * angle.cos(), a[1] + dist * angle.sin()]
    }
}

/// Two-axis spherical frame holding (longitude, latitude) in radians.
///
/// Distances are great-circle arcs and the longitude axis is cyclic
/// with period 2π.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SkyFrame;

/// Converts (lon, lat) to a unit 3-vector.
fn to_xyz(p: &[Float]) -> [Float; 3] {
    let (lon, lat) = (p[0], p[1]);
    [
        lat.cos() * lon.cos(),
        lat.cos() * lon.sin(),
        lat.sin(),
    ]
}

/// Converts a unit 3-vector back to (lon, lat).
fn to_lonlat(v: [Float; 3]) -> Vector {
    let lon = v[1].atan2(v[0]).rem_euclid(TAU);
    let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
    vector![lon, lat]
}

impl Frame for SkyFrame {
    fn naxes(&self) -> usize {
        2
    }

    fn distance(&self, a: &[Float], b: &[Float]) -> Float {
        let va = to_xyz(a);
        let vb = to_xyz(b);
        let dot: Float = va.iter().zip(&vb).map(|(x, y)| x * y).sum();
        let cross = [
            va[1] * vb[2] - va[2] * vb[1],
            va[2] * vb[0] - va[0] * vb[2],
            va[0] * vb[1] - va[1] * vb[0],
        ];
        let cross_mag = cross.iter().map(|x| x * x).sum::<Float>().sqrt();
        cross_mag.atan2(dot)
    }

    fn offset(&self, a: &[Float], b: &[Float], dist: Float) -> Vector {
        let va = to_xyz(a);
        let vb = to_xyz(b);
        let dot: Float = va.iter().zip(&vb).map(|(x, y)| x * y).sum();
        if is_bad(dot) {
            return vector![BAD, BAD];
        }
        // Component of b perpendicular to a, which fixes the direction
        // of travel along the great circle.
        let perp = [
            vb[0] - dot * va[0],
            vb[1] - dot * va[1],
            vb[2] - dot * va[2],
        ];
        let mag = perp.iter().map(|x| x * x).sum::<Float>().sqrt();
        if mag < EPSILON {
            if dist.abs() < EPSILON {
                return Vector::from(a);
            }
            return vector![BAD, BAD];
        }
        let (sin_d, cos_d) = dist.sin_cos();
        let v = [
            va[0] * cos_d + perp[0] / mag * sin_d,
            va[1] * cos_d + perp[1] / mag * sin_d,
            va[2] * cos_d + perp[2] / mag * sin_d,
        ];
        to_lonlat(v)
    }

    /// The position angle is measured from north (+latitude) towards
    /// east (+longitude).
    fn offset2(&self, a: &[Float], angle: Float, dist: Float) -> Vector {
        let (lon1, lat1) = (a[0], a[1]);
        let (sin_d, cos_d) = dist.sin_cos();
        let lat2 = (lat1.sin() * cos_d + lat1.cos() * sin_d * angle.cos()).asin();
        let lon2 = lon1
            + (angle.sin() * sin_d * lat1.cos())
                .atan2(cos_d - lat1.sin() * lat2.sin());
        vector![lon2.rem_euclid(TAU), lat2]
    }

    fn axis_offset(&self, axis: usize, value: Float, dist: Float) -> Float {
        match axis {
            // Longitude is cyclic.
            0 => (value + dist).rem_euclid(TAU),
            _ => value + dist,
        }
    }

    fn normalize_box(
        &self,
        lbnd: &mut [Float],
        ubnd: &mut [Float],
        contains: &dyn Fn(&[Float]) -> bool,
    ) {
        // Latitude is not cyclic but is bounded by the poles.
        lbnd[1] = lbnd[1].max(-FRAC_PI_2);
        ubnd[1] = ubnd[1].min(FRAC_PI_2);

        // If the region covers a pole, every longitude occurs in it.
        let mut full_lon = ubnd[0] - lbnd[0] >= TAU;
        if !full_lon && contains(&[0.0, FRAC_PI_2]) {
            ubnd[1] = FRAC_PI_2;
            full_lon = true;
        }
        if !full_lon && contains(&[0.0, -FRAC_PI_2]) {
            lbnd[1] = -FRAC_PI_2;
            full_lon = true;
        }

        // A fixed longitude offset shrinks in arc length towards the
        // poles, so the naive box can cut the boundary. Probe outwards
        // at the mid latitude and widen each bound while the region
        // still extends past it.
        if !full_lon {
            let mid_lat = 0.5 * (lbnd[1] + ubnd[1]);
            let step = (0.125 * (ubnd[0] - lbnd[0])).max(EPSILON);
            let mut iters = 0;
            while !full_lon && contains(&[ubnd[0] + EPSILON, mid_lat]) {
                ubnd[0] += step;
                iters += 1;
                full_lon = iters > 64 || ubnd[0] - lbnd[0] >= TAU;
            }
            while !full_lon && contains(&[lbnd[0] - EPSILON, mid_lat]) {
                lbnd[0] -= step;
                iters += 1;
                full_lon = iters > 64 || ubnd[0] - lbnd[0] >= TAU;
            }
        }

        if full_lon {
            log::warn!("bounding box covers all longitudes; widening to the full range");
            lbnd[0] = 0.0;
            ubnd[0] = TAU;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_cartesian_distance() {
        let frm = CartesianFrame::new(2);
        assert_approx_eq!(frm.distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_cartesian_offset() {
        let frm = CartesianFrame::new(2);
        let p = frm.offset(&[0.0, 0.0], &[10.0, 0.0], 4.0);
        assert_approx_eq!(p, vector![4.0, 0.0]);
        // Coincident points leave no direction to move in.
        assert!(frm.offset(&[1.0, 1.0], &[1.0, 1.0], 4.0).any_bad());
        assert_approx_eq!(frm.offset(&[1.0, 1.0], &[1.0, 1.0], 0.0), vector![1.0, 1.0]);
    }

    #[test]
    fn test_cartesian_offset2() {
        let frm = CartesianFrame::new(2);
        assert_approx_eq!(frm.offset2(&[1.0, 2.0], 0.0, 3.0), vector![4.0, 2.0]);
        assert_approx_eq!(frm.offset2(&[1.0, 2.0], FRAC_PI_2, 3.0), vector![1.0, 5.0]);
    }

    #[test]
    fn test_sky_distance() {
        let frm = SkyFrame;
        // Quarter circle from the equator to the pole.
        assert_approx_eq!(frm.distance(&[0.0, 0.0], &[0.0, FRAC_PI_2]), FRAC_PI_2);
        // Antipodal points on the equator.
        assert_approx_eq!(frm.distance(&[0.0, 0.0], &[PI, 0.0]), PI);
        // Longitude is meaningless at the pole.
        assert_approx_eq!(frm.distance(&[1.0, FRAC_PI_2], &[2.0, FRAC_PI_2]), 0.0);
    }

    #[test]
    fn test_sky_offset2_north() {
        let frm = SkyFrame;
        let p = frm.offset2(&[0.0, 0.0], 0.0, 0.25);
        assert_approx_eq!(p, vector![0.0, 0.25]);
        let q = frm.offset2(&[0.0, 0.0], FRAC_PI_2, 0.25);
        assert_approx_eq!(q, vector![0.25, 0.0]);
    }

    #[test]
    fn test_sky_offset_along_geodesic() {
        let frm = SkyFrame;
        let p = frm.offset(&[0.0, 0.0], &[1.0, 0.0], 0.5);
        assert_approx_eq!(p, vector![0.5, 0.0]);
        assert_approx_eq!(frm.distance(&[0.0, 0.0], p.as_slice()), 0.5);
    }

    #[test]
    fn test_bad_propagates_through_distance() {
        let frm = CartesianFrame::new(2);
        assert!(is_bad(frm.distance(&[BAD, 0.0], &[1.0, 1.0])));
        let sky = SkyFrame;
        assert!(is_bad(sky.distance(&[BAD, 0.0], &[1.0, 1.0])));
    }
}
