use std::time::Duration;

use alloy::{
    network::{Ethereum, TransactionBuilderError},
    transports::TransportError,
};
use alloy_primitives::{Address, TxHash};
use thiserror::Error;

/// Errors raised while talking to the chain.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ChainError {
    #[error("no signing key is configured for {role} ({address})")]
    MissingSigningKey { role: &'static str, address: Address },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    #[error("failed to build transaction: {0}")]
    Build(#[from] TransactionBuilderError<Ethereum>),

    #[error("rpc request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("transaction {hash} reverted")]
    Reverted { hash: TxHash },

    #[error("node reports chain id {actual}, configured chain id is {expected}")]
    ChainIdMismatch { expected: u64, actual: u64 },
}

impl ChainError {
    /// Whether the error came from the connection rather than from the node's answer.
    ///
    /// Only these are worth retrying, and only for reads.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) | Self::Contract(alloy::contract::Error::TransportError(e)) => {
                e.is_transport_error()
            }
            _ => false,
        }
    }
}
