/// Forge build artifacts and the source-path index over them.
pub mod artifact;

/// Safe tx-builder batch documents.
pub mod batch;

/// Deterministic-deployment candidate extraction.
pub mod extract;

/// Deployment manifest model, per-repo build settings, manifest discovery.
pub mod manifest;

/// Solidity metadata trailer (CBOR auxdata) handling.
pub mod metadata;

/// Source fetching and compilation behind a trait.
pub mod toolchain;

/// The bytecode verification engine.
pub mod verify;
