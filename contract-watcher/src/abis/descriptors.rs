use ethers::abi::{Event, EventParam, Function, Param, ParamType};
use ethers::types::H256;

/// Postgres column type a decoded value of `kind` is stored as.
pub fn storage_type(kind: &ParamType) -> &'static str {
    match kind {
        ParamType::Address | ParamType::FixedBytes(_) => "VARCHAR(66)",
        ParamType::Int(_) | ParamType::Uint(_) => "NUMERIC",
        ParamType::Bool => "BOOLEAN",
        ParamType::String | ParamType::Bytes => "TEXT",
        ParamType::Array(_) | ParamType::FixedArray(_, _) | ParamType::Tuple(_) => "TEXT",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: ParamType,
    pub storage_type: &'static str,
    pub indexed: bool,
}

impl Field {
    fn new(name: &str, position: usize, kind: &ParamType, indexed: bool) -> Self {
        let name = if name.is_empty() {
            format!("arg{position}")
        } else {
            name.to_string()
        };

        Self {
            name,
            kind: kind.clone(),
            storage_type: storage_type(kind),
            indexed,
        }
    }

    pub fn column_name(&self) -> String {
        format!("{}_", self.name.to_lowercase())
    }

    pub fn is_address(&self) -> bool {
        matches!(self.kind, ParamType::Address)
    }

    pub fn is_hash_like(&self) -> bool {
        matches!(self.kind, ParamType::FixedBytes(_) | ParamType::Bytes)
    }
}

/// A watched ABI event, with one storage-mapped field per input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDescriptor {
    pub name: String,
    pub anonymous: bool,
    pub fields: Vec<Field>,
}

impl EventDescriptor {
    pub fn new(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            anonymous: event.anonymous,
            fields: event
                .inputs
                .iter()
                .enumerate()
                .map(|(position, input)| {
                    Field::new(&input.name, position, &input.kind, input.indexed)
                })
                .collect(),
        }
    }

    /// Rebuilds the ABI event the fields were derived from.
    pub fn abi_event(&self) -> Event {
        Event {
            name: self.name.clone(),
            inputs: self
                .fields
                .iter()
                .map(|field| EventParam {
                    name: field.name.clone(),
                    kind: field.kind.clone(),
                    indexed: field.indexed,
                })
                .collect(),
            anonymous: self.anonymous,
        }
    }

    /// topic0 of the event
    pub fn signature(&self) -> H256 {
        self.abi_event().signature()
    }

    pub fn table_name(&self) -> String {
        format!("{}_event", self.name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// A pollable ABI method: at most two inputs and exactly one output.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub inputs: Vec<Field>,
    pub output: Field,
    pub function: Function,
}

impl MethodDescriptor {
    /// `None` when the function does not have exactly one output.
    pub fn new(function: &Function) -> Option<Self> {
        let [output] = function.outputs.as_slice() else {
            return None;
        };

        Some(Self {
            name: function.name.clone(),
            inputs: Self::fields(&function.inputs),
            output: Field::new(&output.name, 0, &output.kind, false),
            function: function.clone(),
        })
    }

    fn fields(params: &[Param]) -> Vec<Field> {
        params
            .iter()
            .enumerate()
            .map(|(position, param)| Field::new(&param.name, position, &param.kind, false))
            .collect()
    }

    pub fn table_name(&self) -> String {
        format!("{}_method", self.name.to_lowercase())
    }
}
