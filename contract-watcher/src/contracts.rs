mod arg_filter;

use std::collections::{HashMap, HashSet};

use ethers::abi::Abi;
use ethers::types::{Address, H256};

use crate::abis::{EventDescriptor, MethodDescriptor, ParsedAbi};
use crate::values::DecodedValue;

pub use arg_filter::ArgFilter;

/// Everything the watcher knows about one contract, plus the addresses and hashes
/// it has seen in that contract's logs so far.
#[derive(Debug, Clone)]
pub struct Contract {
    pub name: String,
    /// Lower-cased hex address.
    pub address: String,
    pub network: String,
    pub starting_block: i64,
    pub last_block: i64,
    pub abi: String,
    pub parsed_abi: Abi,
    pub events: HashMap<String, EventDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub event_arg_filter: ArgFilter,
    pub method_arg_filter: ArgFilter,
    pub emitted_addrs: Option<HashSet<Address>>,
    pub emitted_hashes: Option<HashSet<H256>>,
    pub piping: bool,
}

impl Contract {
    pub fn new(address: &str, abi: &ParsedAbi) -> Self {
        Self {
            name: String::new(),
            address: address.to_lowercase(),
            network: String::new(),
            starting_block: 0,
            last_block: -1,
            abi: abi.abi().to_string(),
            parsed_abi: abi.parsed_abi().clone(),
            events: HashMap::new(),
            methods: vec![],
            event_arg_filter: ArgFilter::Blocked,
            method_arg_filter: ArgFilter::Blocked,
            emitted_addrs: None,
            emitted_hashes: None,
            piping: false,
        }
    }

    /// Allocates only the accumulators the configured methods can consume.
    pub fn init(mut self) -> Self {
        let inputs = || self.methods.iter().flat_map(|method| method.inputs.iter());

        let wants_addrs = inputs().any(|input| input.is_address());
        let wants_hashes = inputs().any(|input| input.is_hash_like());

        if wants_addrs {
            self.emitted_addrs.get_or_insert_with(HashSet::new);
        }
        if wants_hashes {
            self.emitted_hashes.get_or_insert_with(HashSet::new);
        }

        self
    }

    pub fn wanted_event_arg(&self, value: &str) -> bool {
        self.event_arg_filter.allows(value)
    }

    /// True if any decoded value passes the event argument filter, so logs
    /// without arguments never pass.
    pub fn passes_event_filter<'a>(
        &self,
        values: impl IntoIterator<Item = &'a DecodedValue>,
    ) -> bool {
        values.into_iter().any(|value| self.wanted_event_arg(&value.to_string()))
    }

    pub fn wanted_method_arg(&self, value: &DecodedValue) -> bool {
        self.method_arg_filter.allows(&value.to_string())
    }

    pub fn add_emitted_addrs(&mut self, addrs: impl IntoIterator<Item = Address>) {
        if self.methods.is_empty() {
            return;
        }

        let wanted: Vec<_> = addrs
            .into_iter()
            .filter(|addr| self.wanted_method_arg(&DecodedValue::Address(*addr)))
            .collect();

        if let Some(emitted_addrs) = self.emitted_addrs.as_mut() {
            emitted_addrs.extend(wanted);
        }
    }

    pub fn add_emitted_hashes(&mut self, hashes: impl IntoIterator<Item = H256>) {
        if self.methods.is_empty() {
            return;
        }

        let wanted: Vec<_> = hashes
            .into_iter()
            .filter(|hash| self.wanted_method_arg(&DecodedValue::Hash(*hash)))
            .collect();

        if let Some(emitted_hashes) = self.emitted_hashes.as_mut() {
            emitted_hashes.extend(wanted);
        }
    }

    /// Ledger column id of one of this contract's events or methods.
    pub fn check_column_id(&self, event_or_method_name: &str) -> String {
        check_column_id(event_or_method_name, &self.address)
    }
}

pub fn check_column_id(event_or_method_name: &str, address: &str) -> String {
    format!("{event_or_method_name}_{address}").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abis::AbiParser;
    use std::str::FromStr;

    const ABI: &str = r#"[
        {"type":"event","name":"Transfer","anonymous":false,"inputs":[
            {"name":"from","type":"address","indexed":true},
            {"name":"to","type":"address","indexed":true},
            {"name":"value","type":"uint256","indexed":false}]},
        {"type":"function","name":"balanceOf","stateMutability":"view","constant":true,
            "inputs":[{"name":"owner","type":"address"}],
            "outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"nameOf","stateMutability":"view","constant":true,
            "inputs":[{"name":"node","type":"bytes32"}],
            "outputs":[{"name":"","type":"string"}]}
    ]"#;

    const ADDRESS: &str = "0x8dd5fbCe2F6a956C3022bA3663759011Dd51e73E";

    fn contract_with_methods(methods: Option<&[String]>) -> Contract {
        let abi = AbiParser::parse_abi_str(ABI).unwrap();
        let mut contract = Contract::new(ADDRESS, &abi);
        contract.events = abi.get_events(Some(&[]));
        contract.methods = abi.get_select_methods(methods);
        contract.event_arg_filter = ArgFilter::AllowAll;
        contract.method_arg_filter = ArgFilter::AllowAll;

        contract.init()
    }

    fn address(value: &str) -> Address {
        Address::from_str(value).unwrap()
    }

    #[test]
    fn allocates_accumulators_for_method_input_types() {
        let contract = contract_with_methods(Some(&["balanceOf".to_string()]));
        assert!(contract.emitted_addrs.is_some());
        assert!(contract.emitted_hashes.is_none());

        let contract = contract_with_methods(Some(&[]));
        assert!(contract.emitted_addrs.is_some());
        assert!(contract.emitted_hashes.is_some());

        let contract = contract_with_methods(None);
        assert!(contract.emitted_addrs.is_none());
        assert!(contract.emitted_hashes.is_none());
    }

    #[test]
    fn blocked_event_filter_rejects_every_log() {
        let mut contract = contract_with_methods(None);
        contract.event_arg_filter = ArgFilter::Blocked;

        let values = [DecodedValue::BigInt("1".to_string())];
        assert!(!contract.passes_event_filter(&values));
    }

    #[test]
    fn passes_event_filter_when_any_value_is_wanted() {
        let mut contract = contract_with_methods(None);
        contract.event_arg_filter =
            ArgFilter::from_values(&["0x09bbbbe21a5975cac061d82f7b843bce061ba391".to_string()]);

        let wanted = [
            DecodedValue::Address(address("0x09bbbbe21a5975cac061d82f7b843bce061ba391")),
            DecodedValue::BigInt("5".to_string()),
        ];
        let unwanted = [DecodedValue::BigInt("5".to_string())];

        assert!(contract.passes_event_filter(&wanted));
        assert!(!contract.passes_event_filter(&unwanted));
    }

    #[test]
    fn logs_without_arguments_never_pass_the_event_filter() {
        let mut contract = contract_with_methods(None);
        let no_values: [DecodedValue; 0] = [];

        for filter in [
            ArgFilter::Blocked,
            ArgFilter::AllowAll,
            ArgFilter::from_values(&["1".to_string()]),
        ] {
            contract.event_arg_filter = filter;

            assert!(!contract.passes_event_filter(&no_values));
        }
    }

    #[test]
    fn harvests_only_wanted_values_when_methods_exist() {
        let mut contract = contract_with_methods(Some(&["balanceOf".to_string()]));
        let kept = address("0x09bbbbe21a5975cac061d82f7b843bce061ba391");
        let dropped = address("0x000000000000000000000000000000000000af21");
        contract.method_arg_filter = ArgFilter::from_values(&[format!("{kept:?}")]);

        contract.add_emitted_addrs([kept, dropped]);

        let emitted = contract.emitted_addrs.as_ref().unwrap();
        assert!(emitted.contains(&kept));
        assert!(!emitted.contains(&dropped));
    }

    #[test]
    fn does_not_harvest_without_methods() {
        let mut contract = contract_with_methods(None);
        contract.emitted_addrs = Some(HashSet::new());

        contract.add_emitted_addrs([address("0x09bbbbe21a5975cac061d82f7b843bce061ba391")]);

        assert!(contract.emitted_addrs.unwrap().is_empty());
    }

    #[test]
    fn builds_lower_cased_check_column_ids() {
        let contract = contract_with_methods(None);

        assert_eq!(
            contract.check_column_id("Transfer"),
            "transfer_0x8dd5fbce2f6a956c3022ba3663759011dd51e73e"
        );
    }
}
