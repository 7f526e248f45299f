use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    json_abi::{Function, JsonAbi, Param},
};
use alloy_primitives::{Address, I256, U256};

use crate::{ClientConfig, MarketError};

/// A typed argument, sized to the ABI parameter it is passed for.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Arg<'a> {
    Address(Address),
    Uint(u64),
    ClientConfig(&'a ClientConfig),
}

impl Arg<'_> {
    pub(crate) fn encode(&self, param: &Param) -> Result<DynSolValue, MarketError> {
        match self {
            Arg::Address(address) => match param.ty.as_str() {
                "address" => Ok(DynSolValue::Address(*address)),
                other => Err(mismatch(param, other, "address")),
            },
            Arg::Uint(value) => integer(param, *value),
            Arg::ClientConfig(config) => config.to_sol_value(param),
        }
    }
}

/// Finds the function `name` taking `arity` arguments.
pub(crate) fn lookup<'a>(
    abi: &'a JsonAbi,
    contract: &str,
    name: &str,
    arity: usize,
) -> Result<&'a Function, MarketError> {
    abi.function(name)
        .and_then(|overloads| overloads.iter().find(|function| function.inputs.len() == arity))
        .ok_or_else(|| MarketError::UnknownFunction {
            contract: contract.to_string(),
            name: name.to_string(),
        })
}

/// Encodes `args` against the inputs of `function`, in order.
pub(crate) fn encode_args(
    function: &Function,
    args: &[Arg<'_>],
) -> Result<Vec<DynSolValue>, MarketError> {
    function.inputs.iter().zip(args).map(|(param, arg)| arg.encode(param)).collect()
}

/// Sizes `value` to the integer type of `param`, rejecting values that do not fit.
pub(crate) fn integer(param: &Param, value: u64) -> Result<DynSolValue, MarketError> {
    let ty = DynSolType::parse(&param.ty).map_err(|e| MarketError::InvalidArgument {
        name: param.name.clone(),
        reason: e.to_string(),
    })?;

    match ty {
        DynSolType::Uint(bits) if fits(value, bits) => {
            Ok(DynSolValue::Uint(U256::from(value), bits))
        }
        DynSolType::Int(bits) if fits(value, bits - 1) => {
            Ok(DynSolValue::Int(I256::from_raw(U256::from(value)), bits))
        }
        DynSolType::Uint(bits) | DynSolType::Int(bits) => Err(MarketError::InvalidArgument {
            name: param.name.clone(),
            reason: format!("{value} does not fit in {}", param.ty),
        }),
        _ => Err(mismatch(param, &param.ty, "integer")),
    }
}

fn fits(value: u64, bits: usize) -> bool {
    bits >= 64 || value < (1u64 << bits)
}

fn mismatch(param: &Param, actual: &str, expected: &str) -> MarketError {
    MarketError::InvalidArgument {
        name: param.name.clone(),
        reason: format!("expected {expected} parameter, ABI declares {actual}"),
    }
}
