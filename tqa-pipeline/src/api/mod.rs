//! HTTP API
//!
//! Thin layer over the workflow: trigger endpoints return 202 and run
//! the pipeline in a background task, mirroring how the external
//! scheduler drives the service.

pub mod health;
pub mod pipeline;

pub use health::health_routes;
pub use pipeline::pipeline_routes;
