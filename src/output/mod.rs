//! Output module
//!
//! Streams avatar poses to external renderers.

pub mod sse;
