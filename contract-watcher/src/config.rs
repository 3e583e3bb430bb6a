mod error;

use std::collections::HashMap;
use std::sync::Arc;

use ethers::types::Address;

use crate::abis::AbiRegistry;
use crate::WatcherRepo;

pub use error::ConfigError;

/// The contracts one transformer watches, and what to watch on each address.
///
/// Per-address settings are keyed by the lower-cased address.
#[derive(Clone, Debug, Default)]
pub struct ContractConfig {
    pub name: String,
    pub network: String,
    pub addresses: Vec<String>,
    pub starting_blocks: HashMap<String, i64>,
    pub abis: HashMap<String, String>,
    /// Absent: no events. Empty: every ABI event. Otherwise only the named ones.
    pub events: HashMap<String, Vec<String>>,
    pub event_args: HashMap<String, Vec<String>>,
    /// Same selection rule as `events`.
    pub methods: HashMap<String, Vec<String>>,
    pub method_args: HashMap<String, Vec<String>>,
    pub piping: HashMap<String, bool>,
}

impl ContractConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_address(mut self, address: &str, starting_block: i64) -> Self {
        let address = address.to_lowercase();

        if !self.addresses.contains(&address) {
            self.addresses.push(address.clone());
        }
        self.starting_blocks.insert(address, starting_block);

        self
    }

    pub fn with_network(mut self, network: &str) -> Self {
        self.network = network.to_string();

        self
    }

    pub fn with_abi(mut self, address: &str, abi: &str) -> Self {
        self.abis.insert(address.to_lowercase(), abi.to_string());

        self
    }

    pub fn with_events(mut self, address: &str, events: &[&str]) -> Self {
        self.events.insert(address.to_lowercase(), to_strings(events));

        self
    }

    pub fn with_event_args(mut self, address: &str, args: &[&str]) -> Self {
        self.event_args.insert(address.to_lowercase(), to_strings(args));

        self
    }

    pub fn with_methods(mut self, address: &str, methods: &[&str]) -> Self {
        self.methods.insert(address.to_lowercase(), to_strings(methods));

        self
    }

    pub fn with_method_args(mut self, address: &str, args: &[&str]) -> Self {
        self.method_args.insert(address.to_lowercase(), to_strings(args));

        self
    }

    pub fn with_piping(mut self, address: &str, piping: bool) -> Self {
        self.piping.insert(address.to_lowercase(), piping);

        self
    }

    pub fn starting_block(&self, address: &str) -> i64 {
        self.starting_blocks.get(address).copied().unwrap_or_default()
    }

    pub fn abi(&self, address: &str) -> Option<&str> {
        self.abis.get(address).map(String::as_str)
    }

    pub fn events(&self, address: &str) -> Option<&[String]> {
        self.events.get(address).map(Vec::as_slice)
    }

    pub fn methods(&self, address: &str) -> Option<&[String]> {
        self.methods.get(address).map(Vec::as_slice)
    }

    pub fn event_args(&self, address: &str) -> &[String] {
        self.event_args.get(address).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn method_args(&self, address: &str) -> &[String] {
        self.method_args.get(address).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn piping(&self, address: &str) -> bool {
        self.piping.get(address).copied().unwrap_or_default()
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[derive(Clone)]
pub struct Config {
    pub repo: WatcherRepo,
    pub contract: ContractConfig,
    pub eth_node_fingerprint: String,
    pub execution_interval_ms: u64,
    pub lookup_table: HashMap<String, String>,
    pub abi_registry: Option<Arc<dyn AbiRegistry>>,
}

impl Config {
    pub fn new(repo: WatcherRepo, contract: ContractConfig) -> Self {
        Self {
            repo,
            contract,
            eth_node_fingerprint: "default".to_string(),
            execution_interval_ms: 5_000,
            lookup_table: HashMap::new(),
            abi_registry: None,
        }
    }

    pub fn with_node_fingerprint(mut self, eth_node_fingerprint: &str) -> Self {
        self.eth_node_fingerprint = eth_node_fingerprint.to_string();

        self
    }

    pub fn with_execution_interval_ms(mut self, execution_interval_ms: u64) -> Self {
        self.execution_interval_ms = execution_interval_ms;

        self
    }

    pub fn with_lookup_table(mut self, lookup_table: HashMap<String, String>) -> Self {
        self.lookup_table = lookup_table;

        self
    }

    pub fn with_abi_registry(mut self, abi_registry: impl AbiRegistry + 'static) -> Self {
        self.abi_registry = Some(Arc::new(abi_registry));

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_contract(&self.contract)
    }
}

pub(crate) fn validate_contract(contract: &ContractConfig) -> Result<(), ConfigError> {
    if contract.addresses.is_empty() {
        return Err(ConfigError::NoContract);
    }

    for address in &contract.addresses {
        if address.is_empty() {
            return Err(ConfigError::EmptyContractAddress);
        }
        if address.parse::<Address>().is_err() {
            return Err(ConfigError::InvalidAddress(address.clone()));
        }
    }

    Ok(())
}
