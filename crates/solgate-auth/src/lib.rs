//! solgate auth: handshake issuance, validation and revocation.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::HandshakeConfig;
pub use error::AuthError;
pub use service::{CreateHandshakeInput, HandshakeService, MintAuthority};
