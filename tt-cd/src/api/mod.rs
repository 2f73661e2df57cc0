//! HTTP API layer
//!
//! Route groups:
//! - `health` - liveness endpoint
//! - `content` - upload and inspection of catalogue entries
//! - `topics` - topic catalogue and suggestion endpoints
//! - `links` - per-recipient tracking link creation
//! - `launch` - public content launch page
//! - `tracking` - view, interaction and completion beacons
//! - `scores` - per-recipient topic score reports
//! - `assets` - embedded tracking runtime

pub mod assets;
pub mod content;
pub mod health;
pub mod launch;
pub mod links;
pub mod scores;
pub mod topics;
pub mod tracking;

pub use assets::asset_routes;
pub use content::content_routes;
pub use health::health_routes;
pub use launch::launch_routes;
pub use links::link_routes;
pub use scores::score_routes;
pub use topics::topic_routes;
pub use tracking::tracking_routes;
