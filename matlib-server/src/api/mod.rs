//! HTTP API handlers for matlib-server

pub mod health;
pub mod materials;
pub mod presets;
pub mod uploads;

pub use health::health_routes;
pub use materials::material_routes;
pub use presets::preset_routes;
pub use uploads::upload_routes;
