//! Domain layer: entities, errors, splitting, and port contracts

/// Code splitting into semantically meaningful chunks
pub mod chunking;
/// Error taxonomy and result alias
pub mod error;
/// Port interfaces consumed by the application layer
pub mod ports;
/// Core business entities and configuration records
pub mod types;
