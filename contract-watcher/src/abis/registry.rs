use serde::Deserialize;

use super::AbiError;

/// Remote source of contract ABIs, consulted when neither the config nor the
/// local lookup table has one for an address.
#[async_trait::async_trait]
pub trait AbiRegistry: Send + Sync {
    async fn fetch_abi(&self, address: &str) -> Result<String, AbiError>;
}

#[derive(Debug, Clone)]
pub struct EtherscanRegistry {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct EtherscanResponse {
    status: String,
    result: String,
}

impl EtherscanRegistry {
    /// `network` is empty or "mainnet" for Ethereum mainnet, otherwise an Etherscan
    /// subdomain suffix such as "sepolia".
    pub fn new(network: &str) -> Self {
        let base_url = match network {
            "" | "mainnet" => "https://api.etherscan.io/api".to_string(),
            network => format!("https://api-{network}.etherscan.io/api"),
        };

        Self {
            base_url,
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());

        self
    }
}

#[async_trait::async_trait]
impl AbiRegistry for EtherscanRegistry {
    async fn fetch_abi(&self, address: &str) -> Result<String, AbiError> {
        let mut query = vec![
            ("module", "contract"),
            ("action", "getabi"),
            ("address", address),
        ];
        if let Some(api_key) = &self.api_key {
            query.push(("apikey", api_key.as_str()));
        }

        let response: EtherscanResponse = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| AbiError::Registry(error.to_string()))?
            .json()
            .await
            .map_err(|error| AbiError::Registry(error.to_string()))?;

        // Etherscan reports failures with status "0" and the reason in `result`
        if response.status != "1" {
            return Err(AbiError::NotFound(format!("{address}: {}", response.result)));
        }

        Ok(response.result)
    }
}
