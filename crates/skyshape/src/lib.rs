//! Coordinate regions over geodesic frames.
//!
//! A [`Region`] is a bounded patch of a coordinate frame that can
//! classify points as inside or outside, report its bounds, mesh its
//! boundary, and try to re-express itself more simply in whatever
//! frame its users currently see. Shapes are defined by a small set of
//! definitional points in a *base* frame and observed through a
//! base-to-current mapping; all geometry goes through the frame's
//! geodesic primitives from [`skymath`], so the same shapes work on
//! flat and spherical frames alike.

pub mod boxregion;
pub mod circle;
pub mod ellipse;
pub mod error;
pub mod region;

pub use boxregion::BoxRegion;
pub use circle::{Circle, CircleSize, best_circle};
pub use ellipse::{Ellipse, best_ellipse};
pub use error::{RegionError, Result};
pub use region::{
    DEFAULT_MESH_SIZE, DEFAULT_UNC_FRACTION, PinResult, Region, RegionData, WhichFrame,
};
