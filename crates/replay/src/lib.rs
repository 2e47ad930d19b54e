/// Blockchain collaborator: impersonation, raw sends, receipts, time warp.
pub mod chain;

/// The replay engine itself.
pub mod engine;

/// Shadow-execute derivation from queue transactions.
pub mod shadow;

mod contracts;
