//! SurrealDB repository implementations.

mod custom_field;
mod handshake;
mod solution;
mod store;

pub use custom_field::SurrealCustomFieldRepository;
pub use handshake::SurrealHandshakeRepository;
pub use solution::SurrealSolutionRepository;
pub use store::SurrealStoreProvisioner;
