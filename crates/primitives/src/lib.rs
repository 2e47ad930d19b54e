pub use alloy_primitives;

/// Decoded multisig call trees as served by the Safe transaction service.
pub mod decoded;

/// Pending transaction records and replay ordering.
pub mod pending;

/// Queue/execute/multisend classification of pending transactions.
pub mod classify;

/// 4-byte selector derivation and timelock selector substitution.
pub mod selector;

/// Deterministic (CREATE2) deployment candidates and address resolution.
pub mod create2;
