//! Configuration and delivery backends for the Leadform server binary.

pub mod config;
pub mod delivery;

pub use config::ServerConfig;
pub use delivery::{DeliveryError, EmailTransport, SmsTransport};
