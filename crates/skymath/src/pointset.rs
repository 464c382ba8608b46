//! Ordered, fixed-size tables of coordinate tuples.

use crate::{BAD, Float, Vector, is_bad};

/// Fixed-size table of coordinate tuples, stored axis-major: one row of
/// `npoint` values per axis.
///
/// Any scalar may hold the [`BAD`] sentinel. Freshly created tables are
/// entirely undefined until written.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    naxes: usize,
    npoint: usize,
    data: Vec<Float>,
}

impl PointSet {
    /// Creates a table of `npoint` points with `naxes` coordinate values
    /// each, every value set to [`BAD`].
    pub fn new(naxes: usize, npoint: usize) -> Self {
        Self {
            naxes,
            npoint,
            data: vec![BAD; naxes * npoint],
        }
    }

    /// Creates a table from a sequence of points, padding or truncating
    /// each to `naxes` values.
    pub fn from_points<'a>(
        naxes: usize,
        points: impl IntoIterator<Item = &'a Vector>,
    ) -> Self {
        let points: Vec<&Vector> = points.into_iter().collect();
        let mut ret = Self::new(naxes, points.len());
        for (ip, p) in points.into_iter().enumerate() {
            ret.set_point(ip, p);
        }
        ret
    }

    /// Returns the number of coordinate values per point.
    pub fn naxes(&self) -> usize {
        self.naxes
    }
    /// Returns the number of points in the table.
    pub fn npoint(&self) -> usize {
        self.npoint
    }

    /// Returns one coordinate value.
    pub fn get(&self, axis: usize, ip: usize) -> Float {
        self.data[axis * self.npoint + ip]
    }
    /// Sets one coordinate value.
    pub fn set(&mut self, axis: usize, ip: usize, value: Float) {
        self.data[axis * self.npoint + ip] = value;
    }

    /// Returns all values for one axis.
    pub fn axis(&self, axis: usize) -> &[Float] {
        &self.data[axis * self.npoint..(axis + 1) * self.npoint]
    }

    /// Returns one point as a vector.
    pub fn point(&self, ip: usize) -> Vector {
        (0..self.naxes).map(|ax| self.get(ax, ip)).collect()
    }
    /// Overwrites one point. Missing components of `point` are written
    /// as zero.
    pub fn set_point(&mut self, ip: usize, point: &Vector) {
        for ax in 0..self.naxes {
            self.set(ax, ip, point.get(ax));
        }
    }

    /// Sets every coordinate of one point to [`BAD`].
    pub fn mask_point(&mut self, ip: usize) {
        for ax in 0..self.naxes {
            self.set(ax, ip, BAD);
        }
    }

    /// Returns whether any coordinate of a point is undefined.
    pub fn point_is_bad(&self, ip: usize) -> bool {
        (0..self.naxes).any(|ax| is_bad(self.get(ax, ip)))
    }

    /// Returns an iterator over the points of the table.
    pub fn points(&self) -> impl Iterator<Item = Vector> + '_ {
        (0..self.npoint).map(|ip| self.point(ip))
    }
}
