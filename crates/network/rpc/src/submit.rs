use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use alloy_primitives::{Address, TxHash};
use alloy_signer_local::PrivateKeySigner;
use tokio::{
    sync::{Mutex as AsyncMutex, OwnedMutexGuard},
    time::{sleep, timeout, Instant},
};
use tracing::{debug, info, warn};

use crate::{retry_operation, ChainError};

/// How often [`TransactionSubmitter::wait_for_receipt`] polls the node.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// An account acting on the contracts: a role label, its address and, if known, its key.
#[derive(Clone)]
pub struct Identity {
    /// The role this identity was resolved for.
    pub role: &'static str,
    /// The public address of the account.
    pub address: Address,
    /// The signing key, when the key ring holds one for `address`.
    pub signer: Option<PrivateKeySigner>,
}

impl Identity {
    /// Create a new [`Identity`].
    #[must_use]
    pub fn new(role: &'static str, address: Address, signer: Option<PrivateKeySigner>) -> Self {
        Self { role, address, signer }
    }

    /// Returns the signing key or fails with [`ChainError::MissingSigningKey`].
    pub fn signer(&self) -> Result<&PrivateKeySigner, ChainError> {
        self.signer
            .as_ref()
            .ok_or(ChainError::MissingSigningKey { role: self.role, address: self.address })
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("role", &self.role)
            .field("address", &self.address)
            .field("has_signer", &self.signer.is_some())
            .finish()
    }
}

/// One exclusive token per signer address.
///
/// Holding the token across nonce lookup and broadcast keeps nonces sequential when several
/// tasks submit for the same account.
#[derive(Debug, Default)]
pub struct SignerLocks {
    locks: Mutex<HashMap<Address, Arc<AsyncMutex<()>>>>,
}

impl SignerLocks {
    /// Waits for and takes the token of `address`.
    pub async fn acquire(&self, address: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(address).or_default())
        };
        lock.lock_owned().await
    }
}

/// Signs and broadcasts contract invocations, and runs read-only calls.
///
/// Every remote operation is bounded by `timeout`. Submissions are never retried.
#[derive(Debug, Clone)]
pub struct TransactionSubmitter {
    chain_id: u64,
    gas_limit: u64,
    timeout: Duration,
    locks: Arc<SignerLocks>,
}

impl TransactionSubmitter {
    /// Create a new [`TransactionSubmitter`].
    #[must_use]
    pub fn new(chain_id: u64, gas_limit: u64, timeout: Duration) -> Self {
        Self { chain_id, gas_limit, timeout, locks: Arc::new(SignerLocks::default()) }
    }

    /// Signs `request` with the key of `identity` and broadcasts it.
    ///
    /// Returns the transaction hash once the node accepted the transaction. Inclusion is not
    /// awaited; see [`TransactionSubmitter::wait_for_receipt`]. Fails before touching the network
    /// when `identity` has no key. Waiting for the signer lock counts against the timeout.
    pub async fn submit<P: Provider>(
        &self,
        provider: &P,
        identity: &Identity,
        request: TransactionRequest,
    ) -> Result<TxHash, ChainError> {
        let signer = identity.signer()?;

        let hash = self
            .timed("submit transaction", async {
                let _token = self.locks.acquire(identity.address).await;
                self.sign_and_send(provider, identity.address, signer, request).await
            })
            .await?;

        info!(
            role = identity.role,
            from = %identity.address,
            tx_hash = %hash,
            "transaction submitted"
        );
        Ok(hash)
    }

    async fn sign_and_send<P: Provider>(
        &self,
        provider: &P,
        from: Address,
        signer: &PrivateKeySigner,
        request: TransactionRequest,
    ) -> Result<TxHash, ChainError> {
        let nonce = provider.get_transaction_count(from).pending().await?;
        let gas_price = provider.get_gas_price().await?;
        debug!(%from, nonce, gas_price, "fetched nonce and gas price");

        let wallet = EthereumWallet::from(signer.clone());
        let envelope = request
            .with_from(from)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(self.gas_limit)
            .with_gas_price(gas_price)
            .build(&wallet)
            .await?;

        let pending = provider.send_raw_transaction(&envelope.encoded_2718()).await?;
        Ok(*pending.tx_hash())
    }

    /// Runs a read-only operation with a per-attempt timeout.
    ///
    /// Connection failures are retried with backoff within the same time budget; nothing is
    /// signed or broadcast.
    pub async fn read<T, F, Fut>(&self, operation: &str, f: F) -> Result<T, ChainError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        retry_operation(|| self.timed(operation, f()), Some(self.timeout), operation).await
    }

    /// Fetches the chain id reported by the node.
    pub async fn remote_chain_id<P: Provider>(&self, provider: &P) -> Result<u64, ChainError> {
        self.read("get chain id", || async {
            Ok::<_, ChainError>(provider.get_chain_id().await?)
        })
        .await
    }

    /// Fails with [`ChainError::ChainIdMismatch`] unless the node serves the chain transactions
    /// are signed for.
    pub async fn verify_chain_id<P: Provider>(&self, provider: &P) -> Result<(), ChainError> {
        let actual = self.remote_chain_id(provider).await?;
        if actual != self.chain_id {
            return Err(ChainError::ChainIdMismatch { expected: self.chain_id, actual });
        }
        debug!(chain_id = actual, "node chain id verified");
        Ok(())
    }

    /// Polls for the receipt of `hash` until it is mined or `wait` elapses.
    ///
    /// A mined but reverted transaction yields [`ChainError::Reverted`].
    pub async fn wait_for_receipt<P: Provider>(
        &self,
        provider: &P,
        hash: TxHash,
        wait: Duration,
    ) -> Result<TransactionReceipt, ChainError> {
        let deadline = Instant::now() + wait;
        loop {
            let budget = self.timeout.min(deadline.saturating_duration_since(Instant::now()));
            let receipt = self
                .timed_for(budget, "get transaction receipt", async {
                    Ok::<_, ChainError>(provider.get_transaction_receipt(hash).await?)
                })
                .await;

            match receipt {
                Ok(Some(receipt)) if receipt.status() => {
                    info!(tx_hash = %hash, block = ?receipt.block_number, "transaction confirmed");
                    return Ok(receipt);
                }
                Ok(Some(_)) => return Err(ChainError::Reverted { hash }),
                Ok(None) => debug!(tx_hash = %hash, "transaction not mined yet"),
                Err(e) if e.is_transient() => warn!(tx_hash = %hash, "receipt lookup failed: {e}"),
                Err(e) => return Err(e),
            }

            if Instant::now() + RECEIPT_POLL_INTERVAL > deadline {
                return Err(ChainError::Timeout {
                    operation: format!("waiting for receipt of {hash}"),
                    timeout: wait,
                });
            }
            sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    async fn timed<T, Fut>(&self, operation: &str, fut: Fut) -> Result<T, ChainError>
    where
        Fut: Future<Output = Result<T, ChainError>>,
    {
        self.timed_for(self.timeout, operation, fut).await
    }

    async fn timed_for<T, Fut>(
        &self,
        budget: Duration,
        operation: &str,
        fut: Fut,
    ) -> Result<T, ChainError>
    where
        Fut: Future<Output = Result<T, ChainError>>,
    {
        timeout(budget, fut).await.map_err(|_| ChainError::Timeout {
            operation: operation.to_string(),
            timeout: budget,
        })?
    }
}
