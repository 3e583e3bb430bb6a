use contract_watcher::{Provider, ProviderError};
use ethers::types::{transaction::eip2718::TypedTransaction, BlockId, Bytes, Filter, Log, U64};

pub fn empty_provider() -> impl Provider {
    #[derive(Clone)]
    struct EmptyProvider;
    #[async_trait::async_trait]
    impl Provider for EmptyProvider {
        async fn get_block_number(&self) -> Result<U64, ProviderError> {
            Ok(U64::from(0))
        }

        async fn get_logs(&self, _filter: &Filter) -> Result<Vec<Log>, ProviderError> {
            Ok(vec![])
        }

        async fn call(
            &self,
            _tx: &TypedTransaction,
            _block: Option<BlockId>,
        ) -> Result<Bytes, ProviderError> {
            Err(ProviderError::CustomError("no contract calls expected".to_string()))
        }
    }

    EmptyProvider
}

/// Serves `$logs` by block hash, the way a node answers a block-hash filter.
#[macro_export]
macro_rules! provider_with_logs {
    ($logs:expr) => {{
        use contract_watcher::{Provider, ProviderError};
        use ethers::types::{
            transaction::eip2718::TypedTransaction, BlockId, Bytes, Filter, FilterBlockOption, Log,
            U64,
        };

        #[derive(Clone)]
        struct LogsProvider {
            logs: Vec<Log>,
        }
        #[async_trait::async_trait]
        impl Provider for LogsProvider {
            async fn get_block_number(&self) -> Result<U64, ProviderError> {
                Ok(U64::from(0))
            }

            async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
                let block_hash = match filter.block_option {
                    FilterBlockOption::AtBlockHash(block_hash) => Some(block_hash),
                    FilterBlockOption::Range { .. } => None,
                };

                Ok(self.logs.iter().filter(|log| log.block_hash == block_hash).cloned().collect())
            }

            async fn call(
                &self,
                _tx: &TypedTransaction,
                _block: Option<BlockId>,
            ) -> Result<Bytes, ProviderError> {
                Err(ProviderError::CustomError("no contract calls expected".to_string()))
            }
        }

        LogsProvider { logs: $logs }
    }};
}

/// Like `provider_with_logs!`, except that the `$failing_call`-th `eth_getLogs`
/// request (counting from 1) fails.
#[macro_export]
macro_rules! provider_failing_logs_at {
    ($logs:expr, $failing_call:expr) => {{
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        use contract_watcher::{Provider, ProviderError};
        use ethers::types::{
            transaction::eip2718::TypedTransaction, BlockId, Bytes, Filter, FilterBlockOption, Log,
            U64,
        };

        #[derive(Clone)]
        struct FlakyProvider {
            logs: Vec<Log>,
            failing_call: usize,
            log_calls: Arc<AtomicUsize>,
        }
        #[async_trait::async_trait]
        impl Provider for FlakyProvider {
            async fn get_block_number(&self) -> Result<U64, ProviderError> {
                Ok(U64::from(0))
            }

            async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
                if self.log_calls.fetch_add(1, Ordering::SeqCst) + 1 == self.failing_call {
                    return Err(ProviderError::CustomError("connection reset".to_string()));
                }

                let block_hash = match filter.block_option {
                    FilterBlockOption::AtBlockHash(block_hash) => Some(block_hash),
                    FilterBlockOption::Range { .. } => None,
                };

                Ok(self.logs.iter().filter(|log| log.block_hash == block_hash).cloned().collect())
            }

            async fn call(
                &self,
                _tx: &TypedTransaction,
                _block: Option<BlockId>,
            ) -> Result<Bytes, ProviderError> {
                Err(ProviderError::CustomError("no contract calls expected".to_string()))
            }
        }

        FlakyProvider {
            logs: $logs,
            failing_call: $failing_call,
            log_calls: Arc::new(AtomicUsize::new(0)),
        }
    }};
}

/// Like `provider_with_logs!`, answering every `eth_call` with `$balance` and
/// counting the calls in `$calls`. `$head` is the reported chain head, 0 if omitted.
#[macro_export]
macro_rules! provider_with_balances {
    ($logs:expr, $balance:expr, $calls:expr) => {
        $crate::provider_with_balances!($logs, $balance, $calls, 0_u64)
    };
    ($logs:expr, $balance:expr, $calls:expr, $head:expr) => {{
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        use contract_watcher::{Provider, ProviderError};
        use ethers::abi::{encode, Token};
        use ethers::types::{
            transaction::eip2718::TypedTransaction, BlockId, Bytes, Filter, FilterBlockOption, Log,
            U256, U64,
        };

        #[derive(Clone)]
        struct BalancesProvider {
            logs: Vec<Log>,
            balance: U256,
            calls: Arc<AtomicUsize>,
            head: U64,
        }
        #[async_trait::async_trait]
        impl Provider for BalancesProvider {
            async fn get_block_number(&self) -> Result<U64, ProviderError> {
                Ok(self.head)
            }

            async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
                let block_hash = match filter.block_option {
                    FilterBlockOption::AtBlockHash(block_hash) => Some(block_hash),
                    FilterBlockOption::Range { .. } => None,
                };

                Ok(self.logs.iter().filter(|log| log.block_hash == block_hash).cloned().collect())
            }

            async fn call(
                &self,
                _tx: &TypedTransaction,
                block: Option<BlockId>,
            ) -> Result<Bytes, ProviderError> {
                if block.is_none() {
                    return Err(ProviderError::CustomError("historical calls only".to_string()));
                }
                self.calls.fetch_add(1, Ordering::SeqCst);

                Ok(Bytes::from(encode(&[Token::Uint(self.balance)])))
            }
        }

        BalancesProvider {
            logs: $logs,
            balance: U256::from($balance),
            calls: $calls,
            head: U64::from($head),
        }
    }};
}
