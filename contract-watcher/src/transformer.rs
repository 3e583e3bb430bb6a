mod error;

use std::collections::HashMap;
use std::sync::Arc;

use ethers::types::{Log, H256};
use tokio::sync::Mutex;

use crate::abis::{AbiParser, ParsedAbi};
use crate::checked_headers::HeaderLedger;
use crate::config::{Config, ConfigError};
use crate::contract_tables::{EventRepository, MethodRepository, SyncMode};
use crate::contracts::{ArgFilter, Contract};
use crate::converter::convert_batch;
use crate::headers::Header;
use crate::poller::Poller;
use crate::provider::{fetch_contract_data, fetch_logs, Provider};
use crate::values::DecodedValue;
use crate::{HasRawQueryClient, Repo, WatcherRepo};

pub use error::TransformerError;

/// Header-synced contract watcher.
///
/// `init` resolves ABIs and registers one ledger column per watched event and
/// method; every `execute` then walks the headers still missing for any event,
/// persisting logs and polling methods, and can be repeated safely after a failure.
pub struct Transformer<P: Provider> {
    config: Config,
    provider: Arc<P>,
    contracts: HashMap<String, Contract>,
    watching: Option<Watching<P>>,
    contract_addresses: Vec<String>,
    sorted_event_ids: HashMap<String, Vec<String>>,
    sorted_method_ids: HashMap<String, Vec<String>>,
    event_ids: Vec<String>,
    event_filters: Vec<H256>,
    start: i64,
}

struct Watching<P: Provider> {
    ledger: HeaderLedger,
    event_repo: EventRepository,
    poller: Poller<P>,
}

impl<P: Provider> Transformer<P> {
    pub fn new(config: Config, provider: Arc<P>) -> Self {
        Self {
            config,
            provider,
            contracts: HashMap::new(),
            watching: None,
            contract_addresses: vec![],
            sorted_event_ids: HashMap::new(),
            sorted_method_ids: HashMap::new(),
            event_ids: vec![],
            event_filters: vec![],
            start: 0,
        }
    }

    pub fn contracts(&self) -> &HashMap<String, Contract> {
        &self.contracts
    }

    /// Block the next `execute` resumes from.
    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn init(&mut self) -> Result<(), TransformerError> {
        self.config.validate()?;

        let Config {
            repo,
            contract: contract_config,
            eth_node_fingerprint,
            lookup_table,
            abi_registry,
            ..
        } = &self.config;

        let client = Arc::new(Mutex::new(repo.get_raw_query_client().await?));
        let mut ledger = HeaderLedger::new(client.clone(), eth_node_fingerprint);

        let pool = repo.get_pool(1).await?;
        let mut conn = WatcherRepo::get_conn(&pool).await?;
        let first_block = WatcherRepo::get_first_block_number(&mut conn, eth_node_fingerprint)
            .await?
            .unwrap_or(0);

        let mut parser = AbiParser::new(lookup_table.clone());
        if let Some(abi_registry) = abi_registry {
            parser = parser.with_registry(abi_registry.clone());
        }

        let mut contracts = HashMap::new();
        let mut contract_addresses = vec![];
        let mut sorted_event_ids = HashMap::new();
        let mut sorted_method_ids = HashMap::new();
        let mut event_ids = vec![];
        let mut event_filters = vec![];
        let mut start = i64::MAX;

        for address in &contract_config.addresses {
            let abi = match contract_config.abi(address) {
                Some(abi) => AbiParser::parse_abi_str(abi),
                None => parser.parse(address).await,
            }
            .map_err(|error| TransformerError::Abi {
                address: address.clone(),
                error,
            })?;

            let starting_block = first_block.max(contract_config.starting_block(address));

            let mut contract = Contract::new(address, &abi);
            contract.name = fetch_name(&self.provider, &abi, address)
                .await
                .unwrap_or_else(|| contract_config.name.clone());
            contract.network = contract_config.network.clone();
            contract.starting_block = starting_block;
            contract.events = abi.get_events(contract_config.events(address));
            contract.methods = abi.get_select_methods(contract_config.methods(address));
            contract.event_arg_filter =
                ArgFilter::from_values(contract_config.event_args(address));
            contract.method_arg_filter =
                ArgFilter::from_values(contract_config.method_args(address));
            contract.piping = contract_config.piping(address);
            let contract = contract.init();

            let mut events: Vec<_> = contract.events.values().collect();
            events.sort_by(|a, b| a.name.cmp(&b.name));
            let contract_event_ids: Vec<String> =
                events.iter().map(|event| contract.check_column_id(&event.name)).collect();
            let contract_method_ids: Vec<String> = contract
                .methods
                .iter()
                .map(|method| contract.check_column_id(&method.name))
                .collect();

            let check_column_ids =
                [contract_event_ids.clone(), contract_method_ids.clone()].concat();
            ledger.add_check_columns(&check_column_ids).await?;

            event_ids.extend(contract_event_ids.iter().cloned());
            event_filters.extend(events.iter().map(|event| event.signature()));
            sorted_event_ids.insert(contract.address.clone(), contract_event_ids);
            sorted_method_ids.insert(contract.address.clone(), contract_method_ids);

            start = start.min(contract.starting_block);
            contract_addresses.push(contract.address.clone());
            contracts.insert(contract.address.clone(), contract);
        }

        if event_ids.is_empty() {
            return Err(ConfigError::NoFiltersCreated.into());
        }

        let mode = SyncMode::Header;
        self.watching = Some(Watching {
            ledger,
            event_repo: EventRepository::new(client.clone(), mode),
            poller: Poller::new(self.provider.clone(), MethodRepository::new(client, mode)),
        });
        self.contracts = contracts;
        self.contract_addresses = contract_addresses;
        self.sorted_event_ids = sorted_event_ids;
        self.sorted_method_ids = sorted_method_ids;
        self.event_ids = event_ids;
        self.event_filters = event_filters;
        self.start = start;

        tracing::info!(
            "initialized {} contract(s), starting at block {}",
            self.contracts.len(),
            self.start
        );

        Ok(())
    }

    pub async fn execute(&mut self) -> Result<(), TransformerError> {
        if self.contracts.is_empty() {
            return Err(TransformerError::NoInitializedContracts);
        }

        self.catch_up_method_polling().await?;

        let missing_headers = self
            .watching()?
            .ledger
            .missing_headers_for_all(self.start, -1, &self.event_ids)
            .await?;

        for header in missing_headers {
            // A failure below leaves `start` on this header so the next run retries it
            self.start = header.block_number;

            let logs = fetch_logs(
                &self.provider,
                &self.contract_addresses,
                &self.event_filters,
                &header,
            )
            .await
            .map_err(|error| TransformerError::Fetch {
                block: header.block_number,
                error,
            })?;

            if logs.is_empty() {
                self.watching()?
                    .ledger
                    .mark_header_checked_for_all(header.id, &self.event_ids)
                    .await?;
                self.poll_methods(&header).await?;

                self.start = header.block_number + 1;
                tracing::trace!("no logs found for block {}, continuing", header.block_number);
                continue;
            }

            self.persist_header_logs(&header, logs).await?;
            self.poll_methods(&header).await?;

            self.start = header.block_number + 1;
        }

        Ok(())
    }

    async fn persist_header_logs(
        &mut self,
        header: &Header,
        logs: Vec<Log>,
    ) -> Result<(), TransformerError> {
        let mut sorted_logs: HashMap<String, Vec<Log>> = HashMap::new();
        for log in logs {
            let address = format!("{:?}", log.address);
            sorted_logs.entry(address).or_default().push(log);
        }

        let Self {
            contracts,
            contract_addresses,
            sorted_event_ids,
            watching,
            ..
        } = self;
        let Watching {
            ledger, event_repo, ..
        } = watching.as_mut().ok_or(TransformerError::NoInitializedContracts)?;

        for address in contract_addresses.iter() {
            let Some(contract) = contracts.get_mut(address) else {
                continue;
            };

            let Some(logs) = sorted_logs.get(address) else {
                let event_ids =
                    sorted_event_ids.get(address).map(Vec::as_slice).unwrap_or_default();
                ledger.mark_header_checked_for_all(header.id, event_ids).await?;

                tracing::trace!(
                    "no logs found for contract {} at block {}, continuing",
                    address,
                    header.block_number
                );
                continue;
            };

            let converted_logs = convert_batch(contract, logs, header.id).map_err(|error| {
                TransformerError::Conversion {
                    address: address.clone(),
                    block: header.block_number,
                    error,
                }
            })?;

            for (event_name, event_logs) in converted_logs {
                if event_logs.is_empty() {
                    let event_id = contract.check_column_id(&event_name);
                    ledger.mark_header_checked(header.id, &event_id).await?;
                    continue;
                }

                let Some(event) = contract.events.get(&event_name) else {
                    continue;
                };

                // The header is marked checked for this event in the same transaction
                event_repo
                    .persist_logs(&event_logs, event, &contract.address, &contract.name)
                    .await
                    .map_err(|error| TransformerError::Persist {
                        address: address.clone(),
                        event: event_name.clone(),
                        block: header.block_number,
                        error,
                    })?;
            }
        }

        Ok(())
    }

    /// Polls every contract with methods at `header` and marks its method columns.
    async fn poll_methods(&mut self, header: &Header) -> Result<(), TransformerError> {
        let Self {
            contracts,
            contract_addresses,
            sorted_method_ids,
            watching,
            ..
        } = self;
        let Watching { ledger, poller, .. } =
            watching.as_mut().ok_or(TransformerError::NoInitializedContracts)?;

        for address in contract_addresses.iter() {
            let Some(contract) = contracts.get_mut(address) else {
                continue;
            };

            if contract.methods.is_empty() || header.block_number < contract.starting_block {
                tracing::trace!("not polling contract {}", address);
                continue;
            }

            poller.poll_contract_at(contract, header.block_number).await.map_err(|error| {
                TransformerError::Poll {
                    address: address.clone(),
                    block: header.block_number,
                    error,
                }
            })?;

            let method_ids =
                sorted_method_ids.get(address).map(Vec::as_slice).unwrap_or_default();
            ledger.mark_header_checked_for_all(header.id, method_ids).await?;
        }

        Ok(())
    }

    /// Polls methods at headers whose events were all processed by an earlier run
    /// that stopped before its methods were.
    async fn catch_up_method_polling(&mut self) -> Result<(), TransformerError> {
        let Self {
            contracts,
            contract_addresses,
            sorted_event_ids,
            sorted_method_ids,
            watching,
            ..
        } = self;
        let Watching { ledger, poller, .. } =
            watching.as_mut().ok_or(TransformerError::NoInitializedContracts)?;

        for address in contract_addresses.iter() {
            let Some(contract) = contracts.get_mut(address) else {
                continue;
            };
            let method_ids =
                sorted_method_ids.get(address).map(Vec::as_slice).unwrap_or_default();
            if method_ids.is_empty() {
                continue;
            }
            let event_ids =
                sorted_event_ids.get(address).map(Vec::as_slice).unwrap_or_default();

            let headers = ledger
                .missing_methods_checked_events_intersection(
                    contract.starting_block,
                    -1,
                    method_ids,
                    event_ids,
                )
                .await?;

            for header in headers {
                poller.poll_contract_at(contract, header.block_number).await.map_err(|error| {
                    TransformerError::Poll {
                        address: address.clone(),
                        block: header.block_number,
                        error,
                    }
                })?;

                ledger.mark_header_checked_for_all(header.id, method_ids).await?;
            }
        }

        Ok(())
    }

    fn watching(&self) -> Result<&Watching<P>, TransformerError> {
        self.watching.as_ref().ok_or(TransformerError::NoInitializedContracts)
    }
}

/// Best effort: plenty of contracts have no `name()`.
async fn fetch_name(
    provider: &Arc<impl Provider>,
    abi: &ParsedAbi,
    address: &str,
) -> Option<String> {
    match fetch_contract_data(provider, abi.parsed_abi(), address, "name", &[], None).await {
        Ok(tokens) => tokens
            .into_iter()
            .next()
            .and_then(DecodedValue::from_token)
            .map(|name| name.to_string()),
        Err(error) => {
            tracing::warn!("error fetching name of contract {}: {}", address, error);

            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractConfig;
    use crate::provider::ProviderError;
    use ethers::types::{transaction::eip2718::TypedTransaction, BlockId, Bytes, Filter, U64};

    #[derive(Clone)]
    struct UnreachableProvider;

    #[async_trait::async_trait]
    impl Provider for UnreachableProvider {
        async fn get_block_number(&self) -> Result<U64, ProviderError> {
            panic!("no I/O expected")
        }

        async fn get_logs(&self, _filter: &Filter) -> Result<Vec<Log>, ProviderError> {
            panic!("no I/O expected")
        }

        async fn call(
            &self,
            _tx: &TypedTransaction,
            _block: Option<BlockId>,
        ) -> Result<Bytes, ProviderError> {
            panic!("no I/O expected")
        }
    }

    #[tokio::test]
    async fn execute_before_init_fails_without_io() {
        let contract = ContractConfig::new("TrueUSD")
            .add_address("0x8dd5fbce2f6a956c3022ba3663759011dd51e73e", 6194633);
        let config = Config::new(WatcherRepo::new("postgres://unreachable:1/none"), contract);
        let mut transformer = Transformer::new(config, Arc::new(UnreachableProvider));

        let error = transformer.execute().await.unwrap_err();

        assert!(matches!(error, TransformerError::NoInitializedContracts));
        assert!(error.to_string().contains("no initialized contracts"));
    }

    #[tokio::test]
    async fn init_rejects_configs_without_contracts() {
        let config = Config::new(
            WatcherRepo::new("postgres://unreachable:1/none"),
            ContractConfig::new("Nothing"),
        );
        let mut transformer = Transformer::new(config, Arc::new(UnreachableProvider));

        assert!(matches!(
            transformer.init().await,
            Err(TransformerError::Config(ConfigError::NoContract))
        ));
    }
}
