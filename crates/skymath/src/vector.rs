//! N-dimensional coordinate vectors.

use std::fmt;
use std::iter::Sum;
use std::ops::*;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::{Float, is_bad};

/// Constructs an N-dimensional vector, using the same syntax as `vec![]`.
#[macro_export]
macro_rules! vector {
    [$($tok:tt)*] => {
        $crate::Vector($crate::smallvec::smallvec![$($tok)*])
    };
}

/// N-dimensional coordinate vector. Indexing out of bounds returns zero.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Vector(pub SmallVec<[Float; 4]>);

impl Vector {
    /// Returns a zero vector with `naxes` components.
    pub fn zero(naxes: usize) -> Self {
        Self(smallvec::smallvec![0.0; naxes])
    }

    /// Returns the number of components in the vector.
    pub fn naxes(&self) -> usize {
        self.0.len()
    }

    /// Returns a component of the vector. If the index is out of bounds,
    /// returns zero.
    pub fn get(&self, axis: usize) -> Float {
        self.0.get(axis).copied().unwrap_or(0.0)
    }

    /// Returns an iterator over the components of the vector.
    pub fn iter(&self) -> impl Iterator<Item = Float> + '_ {
        self.0.iter().copied()
    }

    /// Returns the components as a slice.
    pub fn as_slice(&self) -> &[Float] {
        &self.0
    }

    /// Returns whether any component is undefined.
    pub fn any_bad(&self) -> bool {
        self.iter().any(is_bad)
    }

    /// Pads the vector with zeros up to `naxes`.
    #[must_use]
    pub fn pad(&self, naxes: usize) -> Vector {
        self.iter().pad_using(naxes, |_| 0.0).collect()
    }

    /// Returns a scaled copy of the vector.
    #[must_use]
    pub fn scale(&self, scalar: Float) -> Vector {
        self.iter().map(|x| x * scalar).collect()
    }

    /// Returns an iterator over two vectors, both padded to the same
    /// length.
    pub fn zip<'a>(
        a: &'a Vector,
        b: &'a Vector,
    ) -> impl Iterator<Item = (Float, Float)> + 'a {
        let naxes = std::cmp::max(a.naxes(), b.naxes());
        (0..naxes).map(|i| (a.get(i), b.get(i)))
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut iter = self.0.iter();
        if let Some(first) = iter.next() {
            first.fmt(f)?;
            for elem in iter {
                write!(f, ", ")?;
                elem.fmt(f)?;
            }
        }
        write!(f, ")")?;
        Ok(())
    }
}

macro_rules! impl_zero_padded_op {
    (impl $trait_name:ident for $type_name:ty { fn $fn_name:ident() }) => {
        impl $trait_name<&Vector> for $type_name {
            type Output = Vector;

            fn $fn_name(self, rhs: &Vector) -> Self::Output {
                Vector::zip(&self, rhs).map(|(l, r)| l.$fn_name(r)).collect()
            }
        }
    };
}
impl_zero_padded_op!(impl Add for Vector { fn add() });
impl_zero_padded_op!(impl Add for &Vector { fn add() });
impl_zero_padded_op!(impl Sub for Vector { fn sub() });
impl_zero_padded_op!(impl Sub for &Vector { fn sub() });

impl Neg for &Vector {
    type Output = Vector;

    fn neg(self) -> Self::Output {
        self.iter().map(|n| -n).collect()
    }
}
impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Self::Output {
        -&self
    }
}

impl Mul<Float> for &Vector {
    type Output = Vector;

    fn mul(self, rhs: Float) -> Self::Output {
        self.scale(rhs)
    }
}
impl Mul<Float> for Vector {
    type Output = Vector;

    fn mul(self, rhs: Float) -> Self::Output {
        self.scale(rhs)
    }
}

impl Index<usize> for Vector {
    type Output = Float;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}
impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl FromIterator<Float> for Vector {
    fn from_iter<T: IntoIterator<Item = Float>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> From<&'a [Float]> for Vector {
    fn from(slice: &'a [Float]) -> Self {
        slice.iter().copied().collect()
    }
}

impl<'a> Sum<&'a Vector> for Vector {
    fn sum<I: Iterator<Item = &'a Vector>>(iter: I) -> Self {
        let mut ret = Vector::default();
        for v in iter {
            ret = &ret.pad(v.naxes()) + v;
        }
        ret
    }
}

impl approx::AbsDiffEq for Vector {
    type Epsilon = Float;

    fn default_epsilon() -> Self::Epsilon {
        crate::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        Vector::zip(self, other).all(|(l, r)| (l - r).abs() <= epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_add() {
        let v1 = vector![1.0, 2.0, -10.0];
        let v2 = vector![-5.0];
        assert_eq!(&v1 + &v2, vector![-4.0, 2.0, -10.0]);
        assert_eq!(v2 + &v1, vector![-4.0, 2.0, -10.0]);
    }

    #[test]
    fn test_vector_sub() {
        let v1 = vector![1.0, 2.0, -10.0];
        let v2 = vector![-5.0];
        assert_eq!(&v1 - &v2, vector![6.0, 2.0, -10.0]);
        assert_eq!(v2 - &v1, vector![-6.0, -2.0, 10.0]);
    }

    #[test]
    fn test_vector_neg() {
        let v1 = vector![1.0, 2.0, -10.0];
        assert_eq!(-&v1, vector![-1.0, -2.0, 10.0]);
        assert_eq!(-v1, vector![-1.0, -2.0, 10.0]);
    }

    #[test]
    fn test_bad_propagates() {
        let v = vector![1.0, crate::BAD];
        assert!(v.any_bad());
        assert!((&v + &vector![1.0, 1.0]).any_bad());
    }
}
