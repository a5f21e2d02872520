//! Route Handlers

pub mod metrics;
pub mod predict;
