//! Value types used throughout the scene: points, affine matrices and
//! axis-aligned bounds.

mod bounds;
mod matrix;
mod point;

pub use bounds::{Bounds, Rectangle};
pub use matrix::{Decomposed, Matrix};
pub use point::Point;
