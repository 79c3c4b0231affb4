//! Geometry primitives: bearings, distances, and ray triangulation.
//!
//! - [`bearing`] maps a detection box and panorama heading to a compass bearing.
//! - [`distance`] provides haversine distances and the local equirectangular
//!   frame used by the solver.
//! - [`triangulation`] intersects a bundle of bearing rays by least squares.

pub mod bearing;
pub mod distance;
pub mod triangulation;

pub use bearing::{resolve_bearing, Bearing};
pub use distance::{haversine_m, LocalFrame, EARTH_RADIUS_M, METERS_PER_DEGREE};
pub use triangulation::{triangulate, Fix, Ray};
