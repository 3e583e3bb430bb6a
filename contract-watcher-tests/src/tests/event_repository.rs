#[cfg(test)]
mod persist_logs {
    use std::collections::BTreeMap;

    use contract_watcher::contracts::check_column_id;
    use contract_watcher::{
        AbiParser, ContractTableError, DecodedLog, EventRepository, HeaderLedger, SyncMode,
    };

    use crate::factory::{
        create_headers, random_address, random_fingerprint, FIRST_BLOCK_NUMBER, TOKEN_ABI,
        TOKEN_CONTRACT_NAME,
    };
    use crate::{checked_count, count_rows, test_runner};

    fn transfer_event() -> contract_watcher::abis::EventDescriptor {
        let abi = AbiParser::parse_abi_str(TOKEN_ABI).unwrap();

        abi.get_events(Some(&["Transfer".to_string()])).remove("Transfer").unwrap()
    }

    fn decoded_transfer(id: i64, block_number: i64, log_index: i64) -> DecodedLog {
        DecodedLog {
            id,
            values: BTreeMap::from([
                ("from".to_string(), "0xB518b3136e491101f22b77f385fE22269C515188".to_string()),
                ("to".to_string(), "0x7dFd6013cF8D92b751e63d481b51Fe0E4C5abF5E".to_string()),
                ("value".to_string(), "1663".to_string()),
            ]),
            raw: serde_json::json!({ "logIndex": log_index }),
            log_index,
            tx_index: 89,
            block_number,
            tx_hash: format!("0x{:064x}", block_number + log_index),
        }
    }

    #[tokio::test]
    pub async fn stores_header_synced_logs_once_and_marks_their_headers() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            let headers = create_headers(&repo, &fingerprint, &[FIRST_BLOCK_NUMBER]).await;
            let header = &headers[0];

            let address = random_address();
            let event = transfer_event();
            let check_column = check_column_id(&event.name, &address);
            let mut ledger = HeaderLedger::new(repo_client.clone(), &fingerprint);
            ledger.add_check_column(&check_column).await.unwrap();

            let logs = vec![
                decoded_transfer(header.id, header.block_number, 0),
                decoded_transfer(header.id, header.block_number, 1),
            ];
            let mut event_repo = EventRepository::new(repo_client.clone(), SyncMode::Header);

            event_repo.persist_logs(&logs, &event, &address, TOKEN_CONTRACT_NAME).await.unwrap();
            event_repo.persist_logs(&logs, &event, &address, TOKEN_CONTRACT_NAME).await.unwrap();

            let table_id = format!("header_{address}.transfer_event");
            assert_eq!(count_rows(&repo_client, &table_id).await, 2);
            assert!(checked_count(&repo_client, header.id, &check_column).await > 0);
            assert!(ledger
                .missing_headers(header.block_number, -1, &check_column)
                .await
                .unwrap()
                .is_empty());
            assert!(event_repo.check_schema_cache(&format!("header_{address}")));
            assert!(event_repo.check_table_cache(&table_id));
        })
        .await;
    }

    #[tokio::test]
    pub async fn stores_fully_synced_logs_once_per_log_id() {
        test_runner::run_test(|_repo, repo_client| async move {
            let address = random_address();
            let event = transfer_event();
            let logs = vec![
                decoded_transfer(1, FIRST_BLOCK_NUMBER, 0),
                decoded_transfer(2, FIRST_BLOCK_NUMBER, 1),
            ];
            let mut event_repo = EventRepository::new(repo_client.clone(), SyncMode::Full);

            event_repo.persist_logs(&logs, &event, &address, TOKEN_CONTRACT_NAME).await.unwrap();
            event_repo
                .persist_logs(&logs[..1], &event, &address, TOKEN_CONTRACT_NAME)
                .await
                .unwrap();

            let table_id = format!("full_{address}.transfer_event");
            assert_eq!(count_rows(&repo_client, &table_id).await, 2);
        })
        .await;
    }

    #[tokio::test]
    pub async fn stores_logs_of_contracts_with_long_names() {
        test_runner::run_test(|_repo, repo_client| async move {
            let address = random_address();
            let long_name = "Wrapped ".repeat(12);
            let logs = vec![decoded_transfer(5, FIRST_BLOCK_NUMBER, 0)];
            let mut event_repo = EventRepository::new(repo_client.clone(), SyncMode::Full);

            event_repo.persist_logs(&logs, &transfer_event(), &address, &long_name).await.unwrap();

            let table_id = format!("full_{address}.transfer_event");
            assert_eq!(count_rows(&repo_client, &table_id).await, 1);
        })
        .await;
    }

    #[tokio::test]
    pub async fn rolls_back_every_log_of_a_failed_batch() {
        test_runner::run_test(|_repo, repo_client| async move {
            let address = random_address();
            let event = transfer_event();
            let mut broken_log = decoded_transfer(4, FIRST_BLOCK_NUMBER, 1);
            broken_log.values.insert("value".to_string(), "not a number".to_string());
            let logs = vec![decoded_transfer(3, FIRST_BLOCK_NUMBER, 0), broken_log];
            let mut event_repo = EventRepository::new(repo_client.clone(), SyncMode::Full);

            assert!(event_repo
                .persist_logs(&logs, &event, &address, TOKEN_CONTRACT_NAME)
                .await
                .is_err());

            let table_id = format!("full_{address}.transfer_event");
            assert_eq!(count_rows(&repo_client, &table_id).await, 0);
        })
        .await;
    }

    #[tokio::test]
    pub async fn refuses_empty_batches() {
        test_runner::run_test(|_repo, repo_client| async move {
            let mut event_repo = EventRepository::new(repo_client, SyncMode::Header);

            let result = event_repo
                .persist_logs(&[], &transfer_event(), &random_address(), TOKEN_CONTRACT_NAME)
                .await;

            assert!(matches!(result, Err(ContractTableError::EmptyLogs)));
        })
        .await;
    }
}

#[cfg(test)]
mod create_tables {
    use contract_watcher::{EventRepository, SyncMode};

    use crate::factory::random_address;
    use crate::test_runner;

    #[tokio::test]
    pub async fn creates_a_contract_schema_only_once() {
        test_runner::run_test(|_repo, repo_client| async move {
            let address = random_address();
            let mut event_repo = EventRepository::new(repo_client.clone(), SyncMode::Header);

            assert!(event_repo.create_contract_schema(&address).await.unwrap());
            assert!(!event_repo.create_contract_schema(&address).await.unwrap());

            let mut fresh_event_repo = EventRepository::new(repo_client, SyncMode::Header);
            assert!(!fresh_event_repo.create_contract_schema(&address).await.unwrap());
        })
        .await;
    }
}
