//! Avatar module
//!
//! Loads the rigged avatar asset and holds the rotations of its tracked bones.

pub mod skeleton;

pub use skeleton::{Bone, Rotation, Skeleton, SkeletonPose};
