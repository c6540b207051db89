//! HTTP middleware for the analysis server.

pub mod timing;

pub use timing::{timing_layer, SlowRequestThreshold};
