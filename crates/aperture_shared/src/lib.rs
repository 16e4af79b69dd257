pub mod geometry;
pub mod level;
pub mod physics;
pub mod surface;
