//! HTTP API handlers for livearena-battle

pub mod battles;
pub mod duets;
pub mod gifts;
pub mod health;
pub mod sse;

pub use battles::battle_routes;
pub use duets::duet_routes;
pub use gifts::gift_routes;
pub use health::health_routes;
pub use sse::sse_routes;
