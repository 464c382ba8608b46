//! Geodesic frame, mapping, and point-set primitives for coordinate
//! regions.
//!
//! Everything here is metric-agnostic: a [`Frame`] supplies geodesic
//! distance and offset primitives, and the shape layer built on top of
//! this crate never assumes a Euclidean metric.

pub use {approx, smallvec};

/// Floating-point type used for geometry.
pub type Float = f64;

/// Small floating-point value used for comparisons and tiny offsets.
pub const EPSILON: Float = 0.000001;

/// Sentinel for an undefined coordinate value.
///
/// NaN propagates through arithmetic, so any computation touching an
/// undefined operand yields an undefined result instead of a plausible
/// finite one. Use [`is_bad()`] to test for it; `BAD == BAD` is false.
pub const BAD: Float = Float::NAN;

/// Returns whether a coordinate value is undefined.
#[inline]
pub fn is_bad(x: Float) -> bool {
    x.is_nan()
}

/// Asserts that both arguments are approximately equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr $(,)?) => {
        $crate::approx::assert_abs_diff_eq!($a, $b, epsilon = $crate::EPSILON)
    };
}

#[macro_use]
mod vector;

pub mod error;
pub mod frame;
pub mod frameset;
pub mod mapping;
pub mod pointset;

pub use error::FrameError;
pub use frame::{CartesianFrame, Frame, SkyFrame};
pub use frameset::FrameSet;
pub use mapping::{LinearMap, Mapping, UnitMap};
pub use pointset::PointSet;
pub use vector::Vector;

/// Structs, traits, and constants.
pub mod prelude {
    pub use crate::error::FrameError;
    pub use crate::frame::{CartesianFrame, Frame, SkyFrame};
    pub use crate::frameset::FrameSet;
    pub use crate::mapping::{LinearMap, Mapping, UnitMap};
    pub use crate::pointset::PointSet;
    pub use crate::vector::Vector;
    pub use crate::{BAD, EPSILON, Float, is_bad};
}
