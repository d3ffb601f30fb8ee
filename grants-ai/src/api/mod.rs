//! HTTP API handlers for grants-ai
//!
//! Read-only presentation of the cache plus health and a manual refresh
//! trigger.

pub mod applications;
pub mod health;
pub mod refresh;

pub use applications::application_routes;
pub use health::health_routes;
pub use refresh::refresh_routes;
