mod descriptors;
mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use derive_more::Display;
use ethers::abi::{Abi, ParamType};

pub use descriptors::{storage_type, EventDescriptor, Field, MethodDescriptor};
pub use registry::{AbiRegistry, EtherscanRegistry};

#[derive(Debug, Display)]
pub enum AbiError {
    #[display("invalid abi: {_0}")]
    Invalid(String),
    #[display("no abi found for {_0}")]
    NotFound(String),
    #[display("abi registry error: {_0}")]
    Registry(String),
}

impl std::error::Error for AbiError {}

/// Resolves contract ABIs, from a local lookup table first and a remote registry second.
#[derive(Clone, Default)]
pub struct AbiParser {
    lookup_table: HashMap<String, String>,
    registry: Option<Arc<dyn AbiRegistry>>,
}

impl AbiParser {
    pub fn new(lookup_table: HashMap<String, String>) -> Self {
        Self {
            lookup_table: lookup_table
                .into_iter()
                .map(|(address, abi)| (address.to_lowercase(), abi))
                .collect(),
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn AbiRegistry>) -> Self {
        self.registry = Some(registry);

        self
    }

    /// Resolves the ABI of a contract that was configured without one.
    pub async fn parse(&self, address: &str) -> Result<ParsedAbi, AbiError> {
        if let Some(abi) = self.lookup_table.get(&address.to_lowercase()) {
            return Self::parse_abi_str(abi);
        }

        match &self.registry {
            Some(registry) => Self::parse_abi_str(&registry.fetch_abi(address).await?),
            None => Err(AbiError::NotFound(address.to_string())),
        }
    }

    pub fn parse_abi_str(abi: &str) -> Result<ParsedAbi, AbiError> {
        let parsed = serde_json::from_str::<Abi>(abi)
            .map_err(|error| AbiError::Invalid(error.to_string()))?;

        Ok(ParsedAbi {
            abi: abi.to_string(),
            parsed,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ParsedAbi {
    abi: String,
    parsed: Abi,
}

impl ParsedAbi {
    pub fn abi(&self) -> &str {
        &self.abi
    }

    pub fn parsed_abi(&self) -> &Abi {
        &self.parsed
    }

    /// `None` selects nothing, an empty list selects every event.
    pub fn get_events(&self, wanted: Option<&[String]>) -> HashMap<String, EventDescriptor> {
        let Some(wanted) = wanted else {
            return HashMap::new();
        };

        let mut events = HashMap::new();
        for event in self.parsed.events() {
            if is_wanted(wanted, &event.name) {
                events.entry(event.name.clone()).or_insert_with(|| EventDescriptor::new(event));
            }
        }

        events
    }

    /// Every wanted method that has exactly one output, regardless of its inputs.
    pub fn get_methods(&self, wanted: Option<&[String]>) -> Vec<MethodDescriptor> {
        let Some(wanted) = wanted else {
            return vec![];
        };

        self.parsed
            .functions()
            .filter(|function| is_wanted(wanted, &function.name))
            .filter_map(MethodDescriptor::new)
            .collect()
    }

    /// The subset of wanted methods the poller can replay: at most two inputs, all of
    /// them addresses or 32-byte hashes, and a single output the watcher can stringify.
    pub fn get_select_methods(&self, wanted: Option<&[String]>) -> Vec<MethodDescriptor> {
        self.get_methods(wanted)
            .into_iter()
            .filter(|method| {
                method.inputs.len() < 3
                    && method.inputs.iter().all(|input| {
                        matches!(input.kind, ParamType::Address | ParamType::FixedBytes(32))
                    })
                    && is_stringifiable(&method.output.kind)
            })
            .collect()
    }
}

fn is_wanted(wanted: &[String], name: &str) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| w == name)
}

fn is_stringifiable(kind: &ParamType) -> bool {
    matches!(
        kind,
        ParamType::Uint(_)
            | ParamType::Int(_)
            | ParamType::Bool
            | ParamType::String
            | ParamType::Address
            | ParamType::Bytes
            | ParamType::FixedBytes(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_ABI: &str = r#"[
        {"type":"event","name":"Transfer","anonymous":false,"inputs":[
            {"name":"from","type":"address","indexed":true},
            {"name":"to","type":"address","indexed":true},
            {"name":"value","type":"uint256","indexed":false}]},
        {"type":"event","name":"Approval","anonymous":false,"inputs":[
            {"name":"owner","type":"address","indexed":true},
            {"name":"spender","type":"address","indexed":true},
            {"name":"value","type":"uint256","indexed":false}]},
        {"type":"function","name":"balanceOf","stateMutability":"view","constant":true,
            "inputs":[{"name":"owner","type":"address"}],
            "outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"allowance","stateMutability":"view","constant":true,
            "inputs":[{"name":"owner","type":"address"},{"name":"spender","type":"address"}],
            "outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"transfer","stateMutability":"nonpayable","constant":false,
            "inputs":[{"name":"to","type":"address"},{"name":"value","type":"uint256"}],
            "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"name","stateMutability":"view","constant":true,
            "inputs":[],"outputs":[{"name":"","type":"string"}]}
    ]"#;

    fn parsed() -> ParsedAbi {
        AbiParser::parse_abi_str(TOKEN_ABI).unwrap()
    }

    #[test]
    fn selects_events_by_the_three_way_rule() {
        let abi = parsed();

        assert!(abi.get_events(None).is_empty());
        assert_eq!(abi.get_events(Some(&[])).len(), 2);

        let only_transfer = abi.get_events(Some(&["Transfer".to_string()]));
        assert_eq!(only_transfer.keys().collect::<Vec<_>>(), vec!["Transfer"]);
    }

    #[test]
    fn selects_only_pollable_methods() {
        let abi = parsed();
        let mut names: Vec<_> =
            abi.get_select_methods(Some(&[])).into_iter().map(|m| m.name).collect();
        names.sort();

        assert_eq!(names, vec!["allowance", "balanceOf", "name"]);
        assert!(abi.get_select_methods(None).is_empty());
        assert_eq!(abi.get_methods(Some(&[])).len(), 4);
    }

    #[test]
    fn rejects_invalid_abis() {
        assert!(matches!(AbiParser::parse_abi_str("not json"), Err(AbiError::Invalid(_))));
    }

    #[tokio::test]
    async fn resolves_from_the_lookup_table_before_the_registry() {
        let address = "0x8dd5fbCe2F6a956C3022bA3663759011Dd51e73E";
        let parser = AbiParser::new(HashMap::from([(address.to_string(), TOKEN_ABI.to_string())]));

        let abi = parser.parse(&address.to_lowercase()).await.unwrap();
        assert_eq!(abi.abi(), TOKEN_ABI);

        assert!(matches!(
            parser.parse("0x0000000000000000000000000000000000000001").await,
            Err(AbiError::NotFound(_))
        ));
    }
}
