//! Reference provider server for Manifold-signed requests.
//!
//! The server answers health checks directly and rejects every other request
//! that does not carry a valid Manifold signature chain. Verified requests are
//! acknowledged by [`handler::ProviderHandler`].

pub mod config;
pub mod gateway;
pub mod handler;
mod server;

pub use config::ServerConfig;
pub use gateway::GatewayService;
pub use server::serve;
