use alloy::{
    contract::{ContractInstance, Interface},
    dyn_abi::DynSolValue,
    providers::Provider,
};
use alloy_primitives::{Address, TxHash};
use apus_rpc::{ChainError, TransactionSubmitter};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    abi::{encode_args, lookup, Arg},
    AddressBook, ClientConfig, ContractArtifact, Role, RoleResolver,
};

/// Errors raised by [`MarketClient`].
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum MarketError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("failed to encode call: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("{contract} has no function `{name}` with the expected arguments")]
    UnknownFunction { contract: String, name: String },

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },
}

struct Contract<P> {
    name: String,
    instance: ContractInstance<P>,
}

impl<P: Provider + Clone> Contract<P> {
    fn new(artifact: &ContractArtifact, provider: P) -> Self {
        Self {
            name: artifact.name.clone(),
            instance: ContractInstance::new(
                artifact.address,
                provider,
                Interface::new(artifact.abi.clone()),
            ),
        }
    }
}

/// Typed access to the market and prover contracts.
///
/// Reads are `eth_call`s and never sign. Writes are signed by the key of the role the method acts
/// as and return once the node accepted the transaction.
pub struct MarketClient<P> {
    market: Contract<P>,
    prover: Contract<P>,
    proof_task: Address,
    roles: RoleResolver,
    submitter: TransactionSubmitter,
}

impl<P: Provider + Clone> MarketClient<P> {
    /// Create a new [`MarketClient`].
    pub fn new(
        provider: P,
        contracts: &AddressBook,
        roles: RoleResolver,
        submitter: TransactionSubmitter,
    ) -> Self {
        Self {
            market: Contract::new(&contracts.market, provider.clone()),
            prover: Contract::new(&contracts.prover, provider),
            proof_task: contracts.proof_task.address,
            roles,
            submitter,
        }
    }

    /// The address of the loaded proof task contract.
    #[must_use]
    pub fn proof_task_address(&self) -> Address {
        self.proof_task
    }

    /// The submitter used for reads and writes.
    #[must_use]
    pub fn submitter(&self) -> &TransactionSubmitter {
        &self.submitter
    }

    /// Calls `Market.get()`.
    pub async fn get(&self) -> Result<Vec<DynSolValue>, MarketError> {
        self.read(&self.market, "get", &[]).await
    }

    /// Points the prover at a proof task contract. Signed by the provider.
    pub async fn set_proof_task_contract(
        &self,
        proof_task: Address,
    ) -> Result<TxHash, MarketError> {
        self.send(&self.prover, Role::Provider, "setProofTaskContract", &[Arg::Address(proof_task)])
            .await
    }

    /// Registers a prover client on the market. Signed by the owner.
    pub async fn join_market(&self, config: &ClientConfig) -> Result<TxHash, MarketError> {
        info!(owner = %config.owner, id = config.id, url = %config.url, "joining market");
        self.send(&self.market, Role::Owner, "joinMarket", &[Arg::ClientConfig(config)]).await
    }

    /// Calls `Market.getLowestN()`.
    pub async fn get_lowest_n(&self) -> Result<Vec<DynSolValue>, MarketError> {
        self.read(&self.market, "getLowestN", &[]).await
    }

    /// Reads the configuration registered by `owner` under `id`.
    pub async fn get_prover_config(
        &self,
        owner: Address,
        id: u64,
    ) -> Result<Vec<DynSolValue>, MarketError> {
        self.read(&self.market, "getProverConfig", &[Arg::Address(owner), Arg::Uint(id)]).await
    }

    /// Marks a task as dispatched to the client `owner`/`id`. Signed by the owner.
    pub async fn dispatch_task_to_client(
        &self,
        owner: Address,
        id: u64,
    ) -> Result<TxHash, MarketError> {
        self.send(
            &self.market,
            Role::Owner,
            "dispatchTaskToClient",
            &[Arg::Address(owner), Arg::Uint(id)],
        )
        .await
    }

    /// Releases a task held by the client `owner`/`id`. Signed by the owner.
    pub async fn release_task_to_client(
        &self,
        owner: Address,
        id: u64,
    ) -> Result<TxHash, MarketError> {
        self.send(
            &self.market,
            Role::Owner,
            "releaseTaskToClient",
            &[Arg::Address(owner), Arg::Uint(id)],
        )
        .await
    }

    async fn read(
        &self,
        contract: &Contract<P>,
        name: &str,
        args: &[Arg<'_>],
    ) -> Result<Vec<DynSolValue>, MarketError> {
        let function = lookup(contract.instance.abi(), &contract.name, name, args.len())?;
        let values = encode_args(function, args)?;
        let call = contract.instance.function_from_selector(&function.selector(), &values)?;

        debug!(contract = %contract.name, function = name, "calling");
        let call = &call;
        let output = self
            .submitter
            .read(name, move || async move { Ok::<_, ChainError>(call.call().await?) })
            .await?;
        Ok(output)
    }

    async fn send(
        &self,
        contract: &Contract<P>,
        role: Role,
        name: &str,
        args: &[Arg<'_>],
    ) -> Result<TxHash, MarketError> {
        let function = lookup(contract.instance.abi(), &contract.name, name, args.len())?;
        let values = encode_args(function, args)?;
        let request = contract
            .instance
            .function_from_selector(&function.selector(), &values)?
            .into_transaction_request();

        let identity = self.roles.resolve(role);
        debug!(
            contract = %contract.name,
            function = name,
            %role,
            from = %identity.address,
            "sending"
        );
        let hash = self.submitter.submit(contract.instance.provider(), &identity, request).await?;
        Ok(hash)
    }
}
