use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use eyre::{ensure, WrapErr};
use forkops_primitives::{classify::classify, pending::PendingTransaction};
use tracing::{debug, info};

use crate::{
    chain::ChainClient,
    contracts::ISafe,
    shadow::{derive_shadow, replayable, SafeCall, ShadowExecute},
};

/// Gas limit per replayed transaction. Forked nodes accept a full block's
/// worth, and governance batches routinely need most of it.
pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// The multisig whose pending queue is replayed.
    pub safe: Address,
    /// Account that becomes the sole required signer on the fork.
    pub signer: Address,
    pub gas_limit: u64,
}

impl ReplayConfig {
    pub fn new(safe: Address, signer: Address) -> Self {
        Self {
            safe,
            signer,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

/// Replays a multisig's pending transactions against a forked chain,
/// following queue transactions up with locally derived executes once
/// their timelock delay has elapsed.
pub struct ReplayEngine<C> {
    chain: C,
    config: ReplayConfig,
}

/// Pre-validated approved-hash signature: `r` carries the approver, `v = 1`
/// marks it as approved. The Safe accepts it without an on-chain approval
/// when the approver is the transaction sender.
fn approved_hash_signature(owner: Address) -> Bytes {
    let mut sig = Vec::with_capacity(65);
    sig.extend_from_slice(&[0u8; 12]);
    sig.extend_from_slice(owner.as_slice());
    sig.extend_from_slice(&[0u8; 32]);
    sig.push(1);
    sig.into()
}

impl<C: ChainClient> ReplayEngine<C> {
    pub fn new(chain: C, config: ReplayConfig) -> Self {
        Self { chain, config }
    }

    /// Installs the delegated signer as a threshold-one owner of the safe,
    /// then leaves the signer impersonated for the replay run.
    pub async fn prepare(&self) -> eyre::Result<()> {
        let safe = self.config.safe;
        let signer = self.config.signer;
        debug!(%safe, %signer, "installing delegated signer");

        self.chain.impersonate(safe).await?;
        let data = ISafe::addOwnerWithThresholdCall {
            owner: signer,
            _threshold: U256::from(1),
        }
        .abi_encode();
        let hash = self
            .chain
            .send(safe, safe, U256::ZERO, data.into(), self.config.gas_limit)
            .await?;
        let receipt = self.chain.wait_for_receipt(hash).await?;
        ensure!(receipt.success, "failed to add owner {signer} to safe {safe}");

        let ret = self
            .chain
            .call(safe, ISafe::getOwnersCall {}.abi_encode().into())
            .await?;
        let owners = ISafe::getOwnersCall::abi_decode_returns(&ret, true)
            .wrap_err("decoding getOwners response")?
            ._0;
        ensure!(owners.contains(&signer), "owner {signer} was not added to safe {safe}");

        self.chain.stop_impersonating(safe).await?;
        self.chain.impersonate(signer).await?;
        Ok(())
    }

    /// Replays every pending transaction in order, then the derived shadow
    /// executes for any queue transactions seen along the way.
    ///
    /// Shadow executes are dropped entirely when a genuine execute is part
    /// of the pending set; that execute already covers the queued payload,
    /// and replaying both would double-apply it.
    pub async fn run(&self, pending: &[PendingTransaction]) -> eyre::Result<Vec<B256>> {
        let mut replayed = Vec::with_capacity(pending.len());
        let mut shadows: Vec<ShadowExecute> = Vec::new();
        let mut has_real_execute = false;

        for tx in pending {
            let block = self.chain.latest_block().await?;
            let info = classify(tx, block.timestamp)?;
            if info.is_execute {
                has_real_execute = true;
                self.warp(info.eta + 1).await?;
            }
            info!(
                kind = info.kind(),
                hash = %tx.safe_tx_hash,
                nonce = tx.nonce,
                eta = info.eta,
                "replaying safe transaction"
            );
            self.execute(replayable(tx)?).await?;
            replayed.push(tx.safe_tx_hash);
            if info.is_queue {
                shadows.push(derive_shadow(tx, info.eta)?);
            }
        }

        if has_real_execute {
            if !shadows.is_empty() {
                debug!(
                    count = shadows.len(),
                    "dropping shadow executes, a real execute is pending"
                );
            }
        } else {
            for shadow in shadows {
                self.warp(shadow.eta + 1).await?;
                info!(eta = shadow.eta, "shadow-executing queued timelock calls");
                self.execute(shadow.transaction).await?;
            }
        }
        Ok(replayed)
    }

    /// Pushes one call through the safe's `execTransaction`.
    async fn execute(&self, call: SafeCall) -> eyre::Result<B256> {
        let data = ISafe::execTransactionCall {
            to: call.to,
            value: call.value,
            data: call.data,
            operation: call.operation as u8,
            safeTxGas: U256::ZERO,
            baseGas: U256::ZERO,
            gasPrice: U256::ZERO,
            gasToken: Address::ZERO,
            refundReceiver: Address::ZERO,
            signatures: approved_hash_signature(self.config.signer),
        }
        .abi_encode();
        let hash = self
            .chain
            .send(
                self.config.signer,
                self.config.safe,
                U256::ZERO,
                data.into(),
                self.config.gas_limit,
            )
            .await?;
        let receipt = self.chain.wait_for_receipt(hash).await?;
        ensure!(receipt.success, "safe transaction {hash} reverted");
        Ok(hash)
    }

    /// Advances simulated time to `timestamp`, never backwards.
    async fn warp(&self, timestamp: u64) -> eyre::Result<()> {
        let current = self.chain.latest_block().await?.timestamp;
        if timestamp <= current {
            debug!(timestamp, current, "warp target already reached");
            return Ok(());
        }
        info!(from = current, to = timestamp, "warping simulated time");
        self.chain.warp_to(timestamp).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    };

    use alloy_primitives::{address, keccak256};
    use async_trait::async_trait;
    use chrono::Utc;
    use forkops_primitives::{
        decoded::{
            DataDecoded, InnerCall, Parameter, MULTISEND_METHOD, TIMELOCK_EXECUTE_METHOD,
            TIMELOCK_QUEUE_METHOD,
        },
        selector::{TIMELOCK_EXECUTE_SELECTOR, TIMELOCK_QUEUE_SELECTOR},
    };
    use serde_json::json;

    use super::*;
    use crate::{
        chain::{BlockInfo, ReceiptInfo},
        contracts::IMultiSend,
    };

    const SAFE: Address = address!("0000000000000000000000000000000000005afe");
    const SIGNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Impersonate(Address),
        StopImpersonating(Address),
        Send { from: Address, to: Address },
        Warp(u64),
    }

    struct FakeChain {
        ops: Mutex<Vec<Op>>,
        sent: Mutex<Vec<Bytes>>,
        timestamp: AtomicU64,
        fail_receipts: bool,
    }

    impl FakeChain {
        fn at(timestamp: u64) -> Self {
            Self {
                ops: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
                timestamp: AtomicU64::new(timestamp),
                fail_receipts: false,
            }
        }

        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }

        fn sent(&self) -> Vec<Bytes> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainClient for &FakeChain {
        async fn impersonate(&self, address: Address) -> eyre::Result<()> {
            self.ops.lock().unwrap().push(Op::Impersonate(address));
            Ok(())
        }

        async fn stop_impersonating(&self, address: Address) -> eyre::Result<()> {
            self.ops.lock().unwrap().push(Op::StopImpersonating(address));
            Ok(())
        }

        async fn send(
            &self,
            from: Address,
            to: Address,
            _value: U256,
            data: Bytes,
            _gas: u64,
        ) -> eyre::Result<B256> {
            self.ops.lock().unwrap().push(Op::Send { from, to });
            let mut sent = self.sent.lock().unwrap();
            sent.push(data);
            Ok(keccak256((sent.len() as u64).to_be_bytes()))
        }

        async fn call(&self, _to: Address, _data: Bytes) -> eyre::Result<Bytes> {
            Ok(ISafe::getOwnersCall::abi_encode_returns(&(vec![SIGNER],)).into())
        }

        async fn wait_for_receipt(&self, _tx_hash: B256) -> eyre::Result<ReceiptInfo> {
            Ok(ReceiptInfo {
                success: !self.fail_receipts,
            })
        }

        async fn latest_block(&self) -> eyre::Result<BlockInfo> {
            Ok(BlockInfo {
                number: 1,
                timestamp: self.timestamp.load(Ordering::SeqCst),
            })
        }

        async fn warp_to(&self, timestamp: u64) -> eyre::Result<()> {
            self.ops.lock().unwrap().push(Op::Warp(timestamp));
            self.timestamp.store(timestamp, Ordering::SeqCst);
            Ok(())
        }
    }

    fn engine(chain: &FakeChain) -> ReplayEngine<&FakeChain> {
        ReplayEngine::new(chain, ReplayConfig::new(SAFE, SIGNER))
    }

    fn timelock_call(method: &str, eta: u64) -> DataDecoded {
        let params = [
            ("target", "address", json!("0x00000000000000000000000000000000000000aa")),
            ("value", "uint256", json!("0")),
            ("signature", "string", json!("setPriceFeed(address)")),
            ("data", "bytes", json!("0x")),
            ("eta", "uint256", json!(eta.to_string())),
        ];
        DataDecoded {
            method: method.to_string(),
            parameters: params
                .into_iter()
                .map(|(name, ty, value)| Parameter {
                    name: name.to_string(),
                    param_type: ty.to_string(),
                    value,
                    value_decoded: None,
                })
                .collect(),
        }
    }

    fn batch(calls: Vec<DataDecoded>) -> Option<DataDecoded> {
        Some(DataDecoded {
            method: MULTISEND_METHOD.to_string(),
            parameters: vec![Parameter {
                name: "transactions".to_string(),
                param_type: "bytes".to_string(),
                value: json!("0x00"),
                value_decoded: Some(
                    calls
                        .into_iter()
                        .map(|decoded| InnerCall {
                            operation: 0,
                            to: Address::ZERO,
                            value: "0".to_string(),
                            data: Some(format!(
                                "0x{}",
                                alloy_primitives::hex::encode(
                                    if decoded.method == TIMELOCK_QUEUE_METHOD {
                                        TIMELOCK_QUEUE_SELECTOR
                                    } else {
                                        TIMELOCK_EXECUTE_SELECTOR
                                    }
                                )
                            )),
                            data_decoded: Some(decoded),
                        })
                        .collect(),
                ),
            }],
        })
    }

    fn pending(nonce: u64, decoded: Option<DataDecoded>) -> PendingTransaction {
        PendingTransaction {
            safe_tx_hash: keccak256(nonce.to_be_bytes()),
            to: Address::ZERO,
            value: "0".to_string(),
            data: None,
            operation: 0,
            nonce,
            submission_date: Utc::now(),
            is_executed: false,
            data_decoded: decoded,
        }
    }

    #[tokio::test]
    async fn prepare_installs_delegated_signer() {
        let chain = FakeChain::at(100);
        engine(&chain).prepare().await.unwrap();

        assert_eq!(
            chain.ops(),
            vec![
                Op::Impersonate(SAFE),
                Op::Send { from: SAFE, to: SAFE },
                Op::StopImpersonating(SAFE),
                Op::Impersonate(SIGNER),
            ]
        );
        let sent = chain.sent();
        assert_eq!(
            &sent[0][..4],
            ISafe::addOwnerWithThresholdCall::SELECTOR.as_slice()
        );
    }

    #[tokio::test]
    async fn plain_transactions_replay_in_order() {
        let chain = FakeChain::at(100);
        let txs = vec![pending(1, None), pending(2, None)];
        let replayed = engine(&chain).run(&txs).await.unwrap();

        assert_eq!(replayed, vec![txs[0].safe_tx_hash, txs[1].safe_tx_hash]);
        assert!(!chain.ops().iter().any(|op| matches!(op, Op::Warp(_))));
        assert_eq!(chain.sent().len(), 2);
    }

    #[tokio::test]
    async fn queue_is_shadow_executed_after_the_delay() {
        let chain = FakeChain::at(500);
        let txs = vec![pending(1, batch(vec![timelock_call(TIMELOCK_QUEUE_METHOD, 1000)]))];
        let replayed = engine(&chain).run(&txs).await.unwrap();
        assert_eq!(replayed.len(), 1);

        assert!(chain.ops().contains(&Op::Warp(1001)));
        let sent = chain.sent();
        assert_eq!(sent.len(), 2);

        let shadow = ISafe::execTransactionCall::abi_decode(&sent[1], true).unwrap();
        assert_eq!(shadow.operation, 1);
        let inner = IMultiSend::multiSendCall::abi_decode(&shadow.data, true).unwrap();
        assert_eq!(
            &inner.transactions[85..89],
            TIMELOCK_EXECUTE_SELECTOR.as_slice()
        );
    }

    #[tokio::test]
    async fn real_execute_suppresses_shadows() {
        let chain = FakeChain::at(500);
        let txs = vec![pending(
            1,
            batch(vec![
                timelock_call(TIMELOCK_QUEUE_METHOD, 1000),
                timelock_call(TIMELOCK_EXECUTE_METHOD, 900),
            ]),
        )];
        engine(&chain).run(&txs).await.unwrap();

        // warped to the batch eta for the genuine execute, nothing after
        assert_eq!(
            chain
                .ops()
                .iter()
                .filter(|op| matches!(op, Op::Warp(_)))
                .collect::<Vec<_>>(),
            vec![&Op::Warp(1001)]
        );
        assert_eq!(chain.sent().len(), 1);
    }

    #[tokio::test]
    async fn warp_never_goes_backwards() {
        let chain = FakeChain::at(950);
        let txs = vec![pending(1, batch(vec![timelock_call(TIMELOCK_EXECUTE_METHOD, 900)]))];
        engine(&chain).run(&txs).await.unwrap();

        assert!(!chain.ops().iter().any(|op| matches!(op, Op::Warp(_))));
    }

    #[tokio::test]
    async fn already_executed_transaction_aborts_the_run() {
        let chain = FakeChain::at(100);
        let mut tx = pending(1, None);
        tx.is_executed = true;
        assert!(engine(&chain).run(&[tx]).await.is_err());
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn reverted_replay_aborts_the_run() {
        let mut chain = FakeChain::at(100);
        chain.fail_receipts = true;
        let txs = vec![pending(1, None)];
        assert!(engine(&chain).run(&txs).await.is_err());
    }
}
