//! Contract artifacts.
//!
//! Deployment output lives under one directory: `contract_address/<Name>.json` holds the deployed
//! address, `contracts/<Name>.json` holds the compiled contract with its ABI.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use alloy::json_abi::JsonAbi;
use alloy_primitives::Address;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::Settings;

const ADDRESS_DIR: &str = "contract_address";
const CONTRACTS_DIR: &str = "contracts";

/// Errors raised while loading an artifact.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ArtifactError {
    #[error("artifact file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("{path} is not valid JSON: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("{path} has no `{field}` field")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("{path} holds an invalid address: {value}")]
    InvalidAddress { path: PathBuf, value: String },

    #[error("{path} holds an invalid ABI: {source}")]
    InvalidAbi { path: PathBuf, source: serde_json::Error },
}

/// A deployed contract: where it lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// The artifact file name, e.g. `Market.json`.
    pub name: String,
    /// The deployed address.
    pub address: Address,
    /// The `abi` field, verbatim.
    pub abi_json: Value,
    /// The parsed ABI.
    pub abi: JsonAbi,
}

/// Reads artifacts from a build directory.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    root: PathBuf,
}

impl ArtifactLoader {
    /// Create a new [`ArtifactLoader`] rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads the address and ABI stored under `file_name`.
    pub fn load(&self, file_name: &str) -> Result<ContractArtifact, ArtifactError> {
        let address_path = self.root.join(ADDRESS_DIR).join(file_name);
        let address_doc = read_json(&address_path)?;
        let raw_address = field(&address_doc, &address_path, "address")?;
        let address = raw_address
            .as_str()
            .and_then(|value| value.trim().parse::<Address>().ok())
            .ok_or_else(|| ArtifactError::InvalidAddress {
                path: address_path.clone(),
                value: raw_address.to_string(),
            })?;

        let contract_path = self.root.join(CONTRACTS_DIR).join(file_name);
        let contract_doc = read_json(&contract_path)?;
        let abi_json = field(&contract_doc, &contract_path, "abi")?.clone();
        let abi = serde_json::from_value(abi_json.clone())
            .map_err(|source| ArtifactError::InvalidAbi { path: contract_path, source })?;

        debug!(artifact = file_name, %address, "loaded contract artifact");
        Ok(ContractArtifact { name: file_name.to_string(), address, abi_json, abi })
    }
}

/// The contracts the market client talks to.
#[derive(Debug, Clone)]
pub struct AddressBook {
    /// The market contract.
    pub market: ContractArtifact,
    /// The proof task contract.
    pub proof_task: ContractArtifact,
    /// The prover contract.
    pub prover: ContractArtifact,
}

impl AddressBook {
    /// Loads every contract named in `settings`.
    pub fn load(settings: &Settings) -> Result<Self, ArtifactError> {
        let loader = ArtifactLoader::new(&settings.artifacts_dir);
        Ok(Self {
            market: loader.load(&settings.market_artifact)?,
            proof_task: loader.load(&settings.proof_task_artifact)?,
            prover: loader.load(&settings.prover_artifact)?,
        })
    }
}

fn read_json(path: &Path) -> Result<Value, ArtifactError> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ArtifactError::NotFound(path.to_path_buf()),
        _ => ArtifactError::Io { path: path.to_path_buf(), source },
    })?;
    serde_json::from_str(&text)
        .map_err(|source| ArtifactError::Parse { path: path.to_path_buf(), source })
}

fn field<'a>(
    doc: &'a Value,
    path: &Path,
    name: &'static str,
) -> Result<&'a Value, ArtifactError> {
    doc.get(name)
        .ok_or_else(|| ArtifactError::MissingField { path: path.to_path_buf(), field: name })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn write(dir: &TempDir, sub: &str, name: &str, contents: &str) {
        let path = dir.path().join(sub);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(name), contents).unwrap();
    }

    fn abi() -> Value {
        json!([{
            "type": "function",
            "name": "get",
            "inputs": [],
            "outputs": [{ "name": "", "type": "uint256", "internalType": "uint256" }],
            "stateMutability": "view"
        }])
    }

    #[test]
    fn test_load_returns_address_and_abi() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, ADDRESS_DIR, "Market.json", &json!({ "address": ADDRESS }).to_string());
        let contract = json!({ "contractName": "Market", "abi": abi() });
        write(&dir, CONTRACTS_DIR, "Market.json", &contract.to_string());

        let artifact = ArtifactLoader::new(dir.path()).load("Market.json").unwrap();

        assert_eq!(artifact.name, "Market.json");
        assert_eq!(artifact.address, ADDRESS.parse::<Address>().unwrap());
        assert_eq!(artifact.abi_json, abi());
        assert!(artifact.abi.function("get").is_some());
    }

    #[test]
    fn test_missing_address_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, CONTRACTS_DIR, "Market.json", &json!({ "abi": abi() }).to_string());

        let err = ArtifactLoader::new(dir.path()).load("Market.json").unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::NotFound(path) if path.ends_with("contract_address/Market.json")
        ));
    }

    #[test]
    fn test_missing_contract_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, ADDRESS_DIR, "Market.json", &json!({ "address": ADDRESS }).to_string());

        let err = ArtifactLoader::new(dir.path()).load("Market.json").unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, ADDRESS_DIR, "Market.json", "{ \"address\": ");

        let err = ArtifactLoader::new(dir.path()).load("Market.json").unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, ADDRESS_DIR, "Market.json", &json!({ "addr": ADDRESS }).to_string());

        let err = ArtifactLoader::new(dir.path()).load("Market.json").unwrap_err();
        assert!(matches!(err, ArtifactError::MissingField { field: "address", .. }));

        write(&dir, ADDRESS_DIR, "Market.json", &json!({ "address": ADDRESS }).to_string());
        write(&dir, CONTRACTS_DIR, "Market.json", &json!({ "bytecode": "0x" }).to_string());
        let err = ArtifactLoader::new(dir.path()).load("Market.json").unwrap_err();
        assert!(matches!(err, ArtifactError::MissingField { field: "abi", .. }));
    }

    #[test]
    fn test_invalid_address() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, ADDRESS_DIR, "Market.json", &json!({ "address": "0x1234" }).to_string());

        let err = ArtifactLoader::new(dir.path()).load("Market.json").unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidAddress { .. }));
    }

    #[test]
    fn test_invalid_abi() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, ADDRESS_DIR, "Market.json", &json!({ "address": ADDRESS }).to_string());
        write(&dir, CONTRACTS_DIR, "Market.json", &json!({ "abi": "not an abi" }).to_string());

        let err = ArtifactLoader::new(dir.path()).load("Market.json").unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidAbi { .. }));
    }
}
