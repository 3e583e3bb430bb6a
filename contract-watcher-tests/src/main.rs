use std::env;

use contract_watcher::{
    provider, Config, ContractConfig, EtherscanRegistry, HasRawQueryClient, WatcherRepo,
};
use contract_watcher_tests::db;
use tracing_subscriber::EnvFilter;

/// Prepares the test database. With `JSON_RPC_URL` and `WATCH_CONTRACT` set, it
/// then watches that contract's events against the synced headers.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_url = db::database_url();
    db::setup(&db_url);

    let repo = WatcherRepo::new(&db_url);
    let raw_query_client = repo.get_raw_query_client().await.unwrap();
    contract_watcher::run_internal_migrations(&raw_query_client).await.unwrap();

    let (Ok(json_rpc_url), Ok(address)) = (env::var("JSON_RPC_URL"), env::var("WATCH_CONTRACT"))
    else {
        tracing::info!("database ready, nothing to watch");
        return;
    };

    let starting_block = env::var("WATCH_STARTING_BLOCK")
        .ok()
        .and_then(|block| block.parse().ok())
        .unwrap_or_default();
    let contract = ContractConfig::new("Watched")
        .add_address(&address, starting_block)
        .with_events(&address, &[]);

    let mut registry = EtherscanRegistry::new("mainnet");
    if let Ok(api_key) = env::var("ETHERSCAN_API_KEY") {
        registry = registry.with_api_key(&api_key);
    }

    let config = Config::new(repo, contract).with_abi_registry(registry);
    let provider = provider::get(&json_rpc_url).unwrap();

    contract_watcher::watch(contract_watcher::Transformer::new(config, provider)).await.unwrap();
}
