//! ScreenLogic Adapter -- async client for a ScreenLogic pool controller.
//!
//! Dials lazily, logs in, keeps the connection while it is in use and drops
//! it after the keep-alive period. Re-exports the protocol crate's record
//! types so callers need only this crate.

pub mod adapter;
pub mod config;
pub mod error;
pub mod manager;
pub mod operations;
pub mod render;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use adapter::Adapter;
pub use config::{expand_tilde, AdapterConfig, AdapterOptions, Config};
pub use error::{Error, Result};
pub use manager::{ConnectionManager, SessionGuard};
pub use session::Session;
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};

pub use screenlogic_protocol::{
    Circuit, CircuitStatus, ControllerConfig, ControllerState, ControllerStatus, ProtocolError,
};
