use alloy::providers::RootProvider;
use tracing::debug;
use url::Url;

/// Creates an HTTP provider for the given RPC endpoint.
///
/// The provider has no fillers and no wallet: nonces, gas and signatures are set explicitly by
/// [`crate::TransactionSubmitter`].
pub fn configure_provider(rpc_url: &str) -> Result<RootProvider, url::ParseError> {
    let url = Url::parse(rpc_url)?;
    debug!(%url, "configuring http provider");
    Ok(RootProvider::new_http(url))
}
