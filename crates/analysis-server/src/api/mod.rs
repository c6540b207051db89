//! API handlers for the analysis server.

pub mod analysis;
pub mod status;
