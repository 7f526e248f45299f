use alloy::{dyn_abi::DynSolValue, json_abi::Param};
use alloy_primitives::Address;
use apus_utils::time_now_centis;
use serde::{Deserialize, Serialize};

use crate::{abi::integer, MarketError};

/// A prover client registration, passed as-is to `joinMarket`.
///
/// Validation is left to the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// The account owning the client.
    pub owner: Address,
    /// The client id, unique per owner.
    pub id: u64,
    /// The endpoint the client serves on.
    pub url: String,
    /// The minimum fee the client accepts.
    pub min_fee: u64,
    /// The maximum number of zkEVM instances the client runs.
    pub max_zk_evm_instance: u64,
    /// The number of instances currently running.
    pub cur_instance: u64,
}

impl ClientConfig {
    /// Create a new [`ClientConfig`] with an id derived from the current time.
    #[must_use]
    pub fn new(
        owner: Address,
        url: impl Into<String>,
        min_fee: u64,
        max_zk_evm_instance: u64,
    ) -> Self {
        Self {
            owner,
            id: time_now_centis(),
            url: url.into(),
            min_fee,
            max_zk_evm_instance,
            cur_instance: 0,
        }
    }

    /// Encodes the config as the tuple `param` declares, following its component order and
    /// integer widths.
    pub fn to_sol_value(&self, param: &Param) -> Result<DynSolValue, MarketError> {
        if param.ty != "tuple" {
            return Err(MarketError::InvalidArgument {
                name: param.name.clone(),
                reason: format!("expected a struct parameter, ABI declares {}", param.ty),
            });
        }

        let fields = param
            .components
            .iter()
            .map(|component| match component.name.as_str() {
                "owner" => match component.ty.as_str() {
                    "address" => Ok(DynSolValue::Address(self.owner)),
                    other => Err(MarketError::InvalidArgument {
                        name: component.name.clone(),
                        reason: format!("expected address, ABI declares {other}"),
                    }),
                },
                "url" => match component.ty.as_str() {
                    "string" => Ok(DynSolValue::String(self.url.clone())),
                    other => Err(MarketError::InvalidArgument {
                        name: component.name.clone(),
                        reason: format!("expected string, ABI declares {other}"),
                    }),
                },
                "id" => integer(component, self.id),
                "minFee" => integer(component, self.min_fee),
                "maxZkEvmInstance" => integer(component, self.max_zk_evm_instance),
                "curInstance" => integer(component, self.cur_instance),
                other => Err(MarketError::InvalidArgument {
                    name: param.name.clone(),
                    reason: format!("unknown struct field `{other}`"),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DynSolValue::Tuple(fields))
    }
}
