//! Headless native Shoal client: connects to a relay, drives the shared
//! simulation at a fixed rate and steers with a simple autopilot. Falls
//! back to single-player when the server is unreachable.

pub mod app;
pub mod autopilot;
pub mod config;
pub mod net_client;

pub use app::ClientApp;
pub use config::ClientConfig;
pub use net_client::{TransportError, WsClient};
