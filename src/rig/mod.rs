//! Rigging module
//!
//! Turns landmark geometry into bone rotations and writes them onto the
//! avatar skeleton.

pub mod binder;
pub mod mapper;

pub use binder::{AvatarBinder, BindReport, LimbBinding};
pub use mapper::{euler_from_matrix, segment_rotation};
