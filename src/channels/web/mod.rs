//! Frame web surface and transport bridge.

pub mod server;
pub mod types;

pub use server::{GatewayState, router, start_server};
