use std::collections::{BTreeMap, HashMap};

use derive_more::Display;
use ethers::abi::RawLog;
use ethers::types::Log;

use crate::abis::EventDescriptor;
use crate::contracts::Contract;
use crate::values::DecodedValue;

#[derive(Debug, Display)]
pub enum ConversionError {
    #[display("cannot convert a log against an empty event")]
    EmptyEvent,
    #[display("error decoding {event} log: {message}")]
    Decode { event: String, message: String },
    #[display("unhandled abi type {_0}")]
    UnhandledAbiType(String),
}

impl std::error::Error for ConversionError {}

/// A log decoded into one string per event field, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    /// Header id in header sync, raw log id in full sync.
    pub id: i64,
    pub values: BTreeMap<String, String>,
    pub raw: serde_json::Value,
    pub log_index: i64,
    pub tx_index: i64,
    pub block_number: i64,
    pub tx_hash: String,
}

/// Decodes `log` as `event`.
///
/// `Ok(None)` means the log was decoded but the contract's event argument filter
/// dropped it. Harvested addresses and hashes are handed to the contract when it
/// accumulates them.
pub fn convert(
    contract: &mut Contract,
    log: &Log,
    event: &EventDescriptor,
    id: i64,
) -> Result<Option<DecodedLog>, ConversionError> {
    if event.is_empty() {
        return Err(ConversionError::EmptyEvent);
    }

    let decode_error = |message: String| ConversionError::Decode {
        event: event.name.clone(),
        message,
    };

    let raw_log = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    let params = event
        .abi_event()
        .parse_log(raw_log)
        .map_err(|error| decode_error(error.to_string()))?
        .params;

    let mut values = Vec::with_capacity(params.len());
    for param in params {
        let kind = event
            .fields
            .iter()
            .find(|field| field.name == param.name)
            .map(|field| field.kind.to_string())
            .unwrap_or_default();

        let value = DecodedValue::from_token(param.value).ok_or_else(|| {
            ConversionError::UnhandledAbiType(format!("{kind} ({})", param.name))
        })?;

        values.push((param.name, value));
    }

    if !contract.passes_event_filter(values.iter().map(|(_, value)| value)) {
        return Ok(None);
    }

    if contract.emitted_addrs.is_some() {
        contract.add_emitted_addrs(values.iter().filter_map(|(_, v)| v.harvested_address()));
    }
    if contract.emitted_hashes.is_some() {
        contract.add_emitted_hashes(values.iter().filter_map(|(_, v)| v.harvested_hash()));
    }

    let raw = serde_json::to_value(log).map_err(|error| decode_error(error.to_string()))?;

    Ok(Some(DecodedLog {
        id,
        values: values.into_iter().map(|(name, value)| (name, value.to_string())).collect(),
        raw,
        log_index: log.log_index.map(|index| index.low_u64() as i64).unwrap_or_default(),
        tx_index: log.transaction_index.map(|index| index.as_u64() as i64).unwrap_or_default(),
        block_number: log.block_number.map(|number| number.as_u64() as i64).unwrap_or_default(),
        tx_hash: log.transaction_hash.map(|hash| format!("{hash:?}")).unwrap_or_default(),
    }))
}

/// Decodes a batch of one contract's logs, grouped by event name.
///
/// Every event of the contract gets an entry, even when none of the logs belong
/// to it, so callers can tell "nothing happened" apart from "not processed".
pub fn convert_batch(
    contract: &mut Contract,
    logs: &[Log],
    id: i64,
) -> Result<HashMap<String, Vec<DecodedLog>>, ConversionError> {
    let events: Vec<_> = contract.events.values().cloned().collect();
    let mut converted = HashMap::with_capacity(events.len());

    for event in events {
        let signature = event.signature();
        let mut decoded_logs = vec![];

        for log in logs.iter().filter(|log| log.topics.first() == Some(&signature)) {
            if let Some(decoded_log) = convert(contract, log, &event, id)? {
                decoded_logs.push(decoded_log);
            }
        }

        converted.insert(event.name.clone(), decoded_logs);
    }

    Ok(converted)
}
