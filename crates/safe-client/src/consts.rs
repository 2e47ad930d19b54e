use urls::{arbitrum, base, mainnet, optimism, sepolia};

pub mod urls {
    pub mod mainnet {
        pub const CHAIN_ID: u64 = 1;

        pub const TRANSACTION_SERVICE_URL: &str =
            "https://safe-transaction-mainnet.safe.global/api";
    }

    pub mod optimism {
        pub const CHAIN_ID: u64 = 10;

        pub const TRANSACTION_SERVICE_URL: &str =
            "https://safe-transaction-optimism.safe.global/api";
    }

    pub mod base {
        pub const CHAIN_ID: u64 = 8453;

        pub const TRANSACTION_SERVICE_URL: &str =
            "https://safe-transaction-base.safe.global/api";
    }

    pub mod arbitrum {
        pub const CHAIN_ID: u64 = 42161;

        pub const TRANSACTION_SERVICE_URL: &str =
            "https://safe-transaction-arbitrum.safe.global/api";
    }

    pub mod sepolia {
        pub const CHAIN_ID: u64 = 11155111;

        pub const TRANSACTION_SERVICE_URL: &str =
            "https://safe-transaction-sepolia.safe.global/api";
    }
}

/// Resolves the hosted transaction-service URL for a chain. Chains without
/// a hosted service need an explicit `--tx-service-url`.
pub fn get_transaction_service_url(chain_id: u64) -> eyre::Result<String> {
    match chain_id {
        mainnet::CHAIN_ID => Ok(mainnet::TRANSACTION_SERVICE_URL.to_string()),
        optimism::CHAIN_ID => Ok(optimism::TRANSACTION_SERVICE_URL.to_string()),
        base::CHAIN_ID => Ok(base::TRANSACTION_SERVICE_URL.to_string()),
        arbitrum::CHAIN_ID => Ok(arbitrum::TRANSACTION_SERVICE_URL.to_string()),
        sepolia::CHAIN_ID => Ok(sepolia::TRANSACTION_SERVICE_URL.to_string()),
        _ => Err(eyre::eyre!(
            "no hosted transaction service for chain id {chain_id}"
        )),
    }
}
