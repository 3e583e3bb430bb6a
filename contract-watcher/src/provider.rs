use std::sync::Arc;

use derive_more::Display;
use ethers::abi::{Abi, Token};
use ethers::prelude::Middleware;
use ethers::providers::{Http, Provider as EthersProvider, ProviderError as EthersProviderError};
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, BlockId, Bytes, Filter, Log,
    TransactionRequest, H256, U64,
};

use crate::headers::Header;

pub type ProviderError = EthersProviderError;

#[derive(Debug, Display)]
pub enum FetchError {
    #[display("provider error: {_0}")]
    Provider(ProviderError),
    #[display("invalid json rpc url {_0}")]
    InvalidUrl(String),
    #[display("invalid address {_0}")]
    InvalidAddress(String),
    #[display("invalid block hash {_0}")]
    InvalidBlockHash(String),
    #[display("abi error calling {method}: {message}")]
    Abi { method: String, message: String },
}

impl std::error::Error for FetchError {}

impl From<ProviderError> for FetchError {
    fn from(error: ProviderError) -> Self {
        FetchError::Provider(error)
    }
}

#[async_trait::async_trait]
pub trait Provider: Clone + Sync + Send {
    async fn get_block_number(&self) -> Result<U64, ProviderError>;
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError>;
    /// `eth_call`; `None` runs against the latest block.
    async fn call(&self, tx: &TypedTransaction, block: Option<BlockId>)
        -> Result<Bytes, ProviderError>;
}

#[async_trait::async_trait]
impl Provider for EthersProvider<Http> {
    async fn get_block_number(&self) -> Result<U64, ProviderError> {
        Middleware::get_block_number(self).await
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        Middleware::get_logs(self, filter).await
    }

    async fn call(
        &self,
        tx: &TypedTransaction,
        block: Option<BlockId>,
    ) -> Result<Bytes, ProviderError> {
        Middleware::call(self, tx, block).await
    }
}

pub fn get(json_rpc_url: &str) -> Result<Arc<impl Provider>, FetchError> {
    let provider = EthersProvider::<Http>::try_from(json_rpc_url)
        .map_err(|_| FetchError::InvalidUrl(json_rpc_url.to_string()))?;

    Ok(Arc::new(provider))
}

/// Every log emitted by `addresses` under `topics` in the block `header` points at.
pub async fn fetch_logs(
    provider: &Arc<impl Provider>,
    addresses: &[String],
    topics: &[H256],
    header: &Header,
) -> Result<Vec<Log>, FetchError> {
    let addresses = addresses
        .iter()
        .map(|address| parse_address(address))
        .collect::<Result<Vec<_>, _>>()?;
    let block_hash = header
        .hash
        .parse::<H256>()
        .map_err(|_| FetchError::InvalidBlockHash(header.hash.clone()))?;

    let filter = Filter::new()
        .address(addresses)
        .topic0(topics.to_vec())
        .at_block_hash(block_hash);

    Ok(provider.get_logs(&filter).await?)
}

/// Calls `method` on the contract at `address` as of `block_number` and decodes
/// what it returned.
pub async fn fetch_contract_data(
    provider: &Arc<impl Provider>,
    abi: &Abi,
    address: &str,
    method: &str,
    args: &[Token],
    block_number: Option<u64>,
) -> Result<Vec<Token>, FetchError> {
    let abi_error = |error: ethers::abi::Error| FetchError::Abi {
        method: method.to_string(),
        message: error.to_string(),
    };

    let function = abi.function(method).map_err(abi_error)?;
    let data = function.encode_input(args).map_err(abi_error)?;

    let tx: TypedTransaction =
        TransactionRequest::new().to(parse_address(address)?).data(data).into();
    let output = provider.call(&tx, block_number.map(BlockId::from)).await?;

    function.decode_output(&output).map_err(abi_error)
}

fn parse_address(address: &str) -> Result<Address, FetchError> {
    address.parse::<Address>().map_err(|_| FetchError::InvalidAddress(address.to_string()))
}
