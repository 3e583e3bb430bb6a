use std::sync::Arc;

use derive_more::Display;
use ethers::abi::Token;

use crate::abis::{Field, MethodDescriptor};
use crate::contract_tables::{ContractTableError, MethodRepository, PollResult};
use crate::contracts::Contract;
use crate::provider::{fetch_contract_data, FetchError, Provider};
use crate::values::DecodedValue;

const MAX_METHOD_ARGUMENTS: usize = 2;

#[derive(Debug, Display)]
pub enum PollerError {
    #[display("method {_0} takes more than 2 arguments")]
    TooManyArguments(String),
    #[display("calling {method} at block {block}: {error}")]
    Call {
        method: String,
        block: i64,
        error: FetchError,
    },
    #[display("method {_0} returned a value that cannot be stored")]
    UnhandledReturnType(String),
    #[display("persisting {method} result: {error}")]
    Persist {
        method: String,
        error: ContractTableError,
    },
}

impl std::error::Error for PollerError {}

/// Replays a contract's read-only methods at historical blocks and stores what
/// they returned.
pub struct Poller<P: Provider> {
    provider: Arc<P>,
    method_repo: MethodRepository,
}

impl<P: Provider> Poller<P> {
    pub fn new(provider: Arc<P>, method_repo: MethodRepository) -> Self {
        Self {
            provider,
            method_repo,
        }
    }

    /// Polls every block from the contract's starting block to its last block, or
    /// to the current head when the last block is open (`-1`).
    pub async fn poll_contract(&mut self, contract: &mut Contract) -> Result<(), PollerError> {
        let last_block = if contract.last_block == -1 {
            self.provider
                .get_block_number()
                .await
                .map_err(|error| PollerError::Call {
                    method: "eth_blockNumber".to_string(),
                    block: contract.last_block,
                    error: error.into(),
                })?
                .as_u64() as i64
        } else {
            contract.last_block
        };

        for block in contract.starting_block..=last_block {
            self.poll_contract_at(contract, block).await?;
        }

        Ok(())
    }

    /// Calls each of the contract's methods at `block` with every combination of
    /// harvested arguments, persisting each result as soon as it arrives.
    pub async fn poll_contract_at(
        &mut self,
        contract: &mut Contract,
        block: i64,
    ) -> Result<(), PollerError> {
        check_arity(&contract.methods)?;

        let methods = contract.methods.clone();
        for method in &methods {
            for args in method_arguments(contract, method) {
                self.poll_method(contract, method, args, block).await?;
            }
        }

        Ok(())
    }

    async fn poll_method(
        &mut self,
        contract: &mut Contract,
        method: &MethodDescriptor,
        args: Vec<DecodedValue>,
        block: i64,
    ) -> Result<(), PollerError> {
        let tokens: Vec<Token> = args.iter().filter_map(to_token).collect();

        let output = fetch_contract_data(
            &self.provider,
            &contract.parsed_abi,
            &contract.address,
            &method.name,
            &tokens,
            Some(block as u64),
        )
        .await
        .map_err(|error| PollerError::Call {
            method: method.name.clone(),
            block,
            error,
        })?;

        let output = output
            .into_iter()
            .next()
            .and_then(DecodedValue::from_token)
            .ok_or_else(|| PollerError::UnhandledReturnType(method.name.clone()))?;

        if contract.piping {
            pipe(contract, &output);
        }

        let result = PollResult {
            method: method.name.clone(),
            block,
            inputs: args.iter().map(ToString::to_string).collect(),
            output: output.to_string(),
        };

        self.method_repo
            .persist_result(&result, method, &contract.address, &contract.name)
            .await
            .map_err(|error| PollerError::Persist {
                method: method.name.clone(),
                error,
            })
    }
}

pub fn check_arity(methods: &[MethodDescriptor]) -> Result<(), PollerError> {
    match methods.iter().find(|method| method.inputs.len() > MAX_METHOD_ARGUMENTS) {
        Some(method) => Err(PollerError::TooManyArguments(method.name.clone())),
        None => Ok(()),
    }
}

/// Every argument list `method` should be called with: a single empty list for
/// 0-arg methods, one list per harvested value for 1-arg methods, and every
/// ordered pair (self-pairs included) for 2-arg methods.
pub fn method_arguments(
    contract: &Contract,
    method: &MethodDescriptor,
) -> Vec<Vec<DecodedValue>> {
    method.inputs.iter().fold(vec![vec![]], |arg_lists, input| {
        let candidates = harvested_values(contract, input);

        arg_lists
            .iter()
            .flat_map(|args| {
                candidates.iter().map(move |candidate| {
                    let mut args = args.clone();
                    args.push(candidate.clone());
                    args
                })
            })
            .collect()
    })
}

fn harvested_values(contract: &Contract, input: &Field) -> Vec<DecodedValue> {
    let mut values: Vec<DecodedValue> = if input.is_address() {
        contract
            .emitted_addrs
            .iter()
            .flatten()
            .map(|addr| DecodedValue::Address(*addr))
            .collect()
    } else if input.is_hash_like() {
        contract
            .emitted_hashes
            .iter()
            .flatten()
            .map(|hash| DecodedValue::Hash(*hash))
            .collect()
    } else {
        vec![]
    };

    values.sort_by_key(ToString::to_string);
    values
}

fn to_token(value: &DecodedValue) -> Option<Token> {
    match value {
        DecodedValue::Address(address) => Some(Token::Address(*address)),
        DecodedValue::Hash(hash) => Some(Token::FixedBytes(hash.as_bytes().to_vec())),
        _ => None,
    }
}

/// Feeds an address or hash a method returned back into the argument pool.
fn pipe(contract: &mut Contract, output: &DecodedValue) {
    if let Some(address) = output.harvested_address() {
        contract.add_emitted_addrs([address]);
    }
    if let Some(hash) = output.harvested_hash() {
        contract.add_emitted_hashes([hash]);
    }
}
