use alloy_primitives::{address, keccak256, Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// The well-known deterministic deployment proxy, deployed at the same
/// address on every chain.
pub const DETERMINISTIC_FACTORY: Address = address!("4e59b44847b379578588920cA78FbF26c0B4956C");

/// A `(salt, initcode)` pair extracted from a deterministic factory call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentCandidate {
    pub salt: B256,
    pub initcode: Bytes,
}

impl DeploymentCandidate {
    /// Address this candidate deploys to through `factory`.
    pub fn address(&self, factory: Address) -> Result<Address, Create2Error> {
        create2_address(factory, self.salt.as_slice(), &self.initcode)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Create2Error {
    #[error("expected 32-byte salt, got {0} bytes")]
    SaltLength(usize),
    #[error("initcode is empty")]
    EmptyInitcode,
}

/// Computes `keccak256(0xff ++ factory ++ salt ++ keccak256(initcode))[12..]`.
///
/// The extractor always produces well-formed inputs, but the lengths are
/// validated anyway rather than assumed.
pub fn create2_address(
    factory: Address,
    salt: &[u8],
    initcode: &[u8],
) -> Result<Address, Create2Error> {
    if salt.len() != 32 {
        return Err(Create2Error::SaltLength(salt.len()));
    }
    if initcode.is_empty() {
        return Err(Create2Error::EmptyInitcode);
    }
    Ok(factory.create2(B256::from_slice(salt), keccak256(initcode)))
}
