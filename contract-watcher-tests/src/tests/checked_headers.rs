#[cfg(test)]
mod missing_headers {
    use contract_watcher::{contracts::check_column_id, HeaderLedger};

    use crate::factory::{create_headers, random_address, random_fingerprint, FIRST_BLOCK_NUMBER};
    use crate::test_runner;

    const N: i64 = FIRST_BLOCK_NUMBER;

    fn block_numbers(headers: &[contract_watcher::Header]) -> Vec<i64> {
        headers.iter().map(|header| header.block_number).collect()
    }

    #[tokio::test]
    pub async fn stops_at_the_first_gap() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            create_headers(&repo, &fingerprint, &[N, N + 1, N + 3, N + 4]).await;

            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client, &fingerprint);
            ledger.add_check_column(&check_column).await.unwrap();

            let missing_headers = ledger.missing_headers(N, -1, &check_column).await.unwrap();

            assert_eq!(block_numbers(&missing_headers), vec![N, N + 1]);
        })
        .await;
    }

    #[tokio::test]
    pub async fn honours_the_upper_bound() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            create_headers(&repo, &fingerprint, &[N, N + 1, N + 2, N + 3]).await;

            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client, &fingerprint);
            ledger.add_check_column(&check_column).await.unwrap();

            let missing_headers =
                ledger.missing_headers(N + 1, N + 2, &check_column).await.unwrap();

            assert_eq!(block_numbers(&missing_headers), vec![N + 1, N + 2]);
        })
        .await;
    }

    #[tokio::test]
    pub async fn only_sees_headers_of_its_node() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            create_headers(&repo, &fingerprint, &[N]).await;
            create_headers(&repo, &random_fingerprint(), &[N + 1]).await;

            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client, &fingerprint);
            ledger.add_check_column(&check_column).await.unwrap();

            let missing_headers = ledger.missing_headers(N, -1, &check_column).await.unwrap();

            assert_eq!(block_numbers(&missing_headers), vec![N]);
        })
        .await;
    }

    #[tokio::test]
    pub async fn reports_headers_missing_any_of_the_columns() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            let headers = create_headers(&repo, &fingerprint, &[N, N + 1]).await;

            let address = random_address();
            let check_columns =
                vec![check_column_id("Transfer", &address), check_column_id("Approval", &address)];
            let mut ledger = HeaderLedger::new(repo_client, &fingerprint);
            ledger.add_check_columns(&check_columns).await.unwrap();

            ledger.mark_header_checked_for_all(headers[0].id, &check_columns).await.unwrap();
            ledger.mark_header_checked(headers[1].id, &check_columns[0]).await.unwrap();

            let missing_headers =
                ledger.missing_headers_for_all(N, -1, &check_columns).await.unwrap();

            assert_eq!(block_numbers(&missing_headers), vec![N + 1]);
        })
        .await;
    }
}

#[cfg(test)]
mod marks {
    use contract_watcher::{contracts::check_column_id, Header, HeaderLedger};

    use crate::factory::{create_headers, random_address, random_fingerprint, FIRST_BLOCK_NUMBER};
    use crate::{checked_count, test_runner};

    const N: i64 = FIRST_BLOCK_NUMBER;

    #[tokio::test]
    pub async fn marked_headers_are_no_longer_missing() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            let headers = create_headers(&repo, &fingerprint, &[N, N + 1]).await;

            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client.clone(), &fingerprint);
            ledger.add_check_column(&check_column).await.unwrap();

            ledger.mark_header_checked(headers[0].id, &check_column).await.unwrap();

            let missing_headers = ledger.missing_headers(N, -1, &check_column).await.unwrap();
            assert_eq!(missing_headers, vec![headers[1].clone()]);
            assert_eq!(checked_count(&repo_client, headers[0].id, &check_column).await, 1);
            assert_eq!(checked_count(&repo_client, headers[1].id, &check_column).await, 0);
        })
        .await;
    }

    #[tokio::test]
    pub async fn counts_every_mark() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            let headers = create_headers(&repo, &fingerprint, &[N]).await;

            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client.clone(), &fingerprint);
            ledger.add_check_column(&check_column).await.unwrap();

            ledger.mark_header_checked(headers[0].id, &check_column).await.unwrap();
            ledger.mark_header_checked(headers[0].id, &check_column).await.unwrap();

            assert_eq!(checked_count(&repo_client, headers[0].id, &check_column).await, 2);
        })
        .await;
    }

    #[tokio::test]
    pub async fn marks_many_headers_together() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            let headers = create_headers(&repo, &fingerprint, &[N, N + 1, N + 2]).await;

            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client, &fingerprint);
            ledger.add_check_column(&check_column).await.unwrap();

            ledger
                .mark_headers_checked_for_all(&headers, &[check_column.clone()])
                .await
                .unwrap();

            assert!(ledger.missing_headers(N, -1, &check_column).await.unwrap().is_empty());
        })
        .await;
    }

    #[tokio::test]
    pub async fn a_failed_batch_marks_no_header() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            let headers = create_headers(&repo, &fingerprint, &[N, N + 1]).await;
            let unsynced_header = Header {
                id: -1,
                ..headers[1].clone()
            };

            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client.clone(), &fingerprint);
            ledger.add_check_column(&check_column).await.unwrap();

            let batch = [headers[0].clone(), unsynced_header];
            assert!(ledger
                .mark_headers_checked_for_all(&batch, &[check_column.clone()])
                .await
                .is_err());

            assert_eq!(checked_count(&repo_client, headers[0].id, &check_column).await, 0);
            let missing_headers = ledger.missing_headers(N, -1, &check_column).await.unwrap();
            assert_eq!(missing_headers, headers);
        })
        .await;
    }

    #[tokio::test]
    pub async fn a_failed_column_batch_adds_and_caches_nothing() {
        test_runner::run_test(|_repo, repo_client| async move {
            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client, &random_fingerprint());

            // A reserved word passes identifier validation but breaks the statement
            let ids = vec![check_column.clone(), "select".to_string()];
            assert!(ledger.add_check_columns(&ids).await.is_err());

            assert_eq!(ledger.check_cache(&check_column), None);
            assert!(ledger.missing_headers(N, -1, &check_column).await.is_err());

            ledger.add_check_columns(&ids[..1]).await.unwrap();
            assert_eq!(ledger.check_cache(&check_column), Some(true));
            assert!(ledger.missing_headers(N, -1, &check_column).await.is_ok());
        })
        .await;
    }

    #[tokio::test]
    pub async fn adding_a_column_twice_is_harmless() {
        test_runner::run_test(|_repo, repo_client| async move {
            let check_column = check_column_id("Transfer", &random_address());
            let mut ledger = HeaderLedger::new(repo_client.clone(), &random_fingerprint());

            assert_eq!(ledger.check_cache(&check_column), None);
            ledger.add_check_column(&check_column).await.unwrap();
            assert_eq!(ledger.check_cache(&check_column), Some(true));

            let mut other_ledger = HeaderLedger::new(repo_client, &random_fingerprint());
            other_ledger.add_check_column(&check_column).await.unwrap();
            assert_eq!(other_ledger.check_cache(&check_column), Some(true));
        })
        .await;
    }
}

#[cfg(test)]
mod methods_checked_events_intersection {
    use contract_watcher::{contracts::check_column_id, HeaderLedger};

    use crate::factory::{create_headers, random_address, random_fingerprint, FIRST_BLOCK_NUMBER};
    use crate::test_runner;

    const N: i64 = FIRST_BLOCK_NUMBER;

    #[tokio::test]
    pub async fn requires_every_event_checked_and_the_methods_unchecked() {
        test_runner::run_test(|repo, repo_client| async move {
            let fingerprint = random_fingerprint();
            let headers = create_headers(&repo, &fingerprint, &[N, N + 1]).await;

            let address = random_address();
            let event_ids =
                vec![check_column_id("Transfer", &address), check_column_id("Approval", &address)];
            let method_ids = vec![check_column_id("balanceOf", &address)];
            let mut ledger = HeaderLedger::new(repo_client, &fingerprint);
            let check_columns = [event_ids.clone(), method_ids.clone()].concat();
            ledger.add_check_columns(&check_columns).await.unwrap();

            ledger.mark_header_checked_for_all(headers[0].id, &event_ids).await.unwrap();
            ledger.mark_header_checked(headers[1].id, &event_ids[0]).await.unwrap();

            let ready_headers = ledger
                .missing_methods_checked_events_intersection(N, -1, &method_ids, &event_ids)
                .await
                .unwrap();
            assert_eq!(ready_headers, vec![headers[0].clone()]);

            ledger.mark_header_checked_for_all(headers[0].id, &method_ids).await.unwrap();

            let ready_headers = ledger
                .missing_methods_checked_events_intersection(N, -1, &method_ids, &event_ids)
                .await
                .unwrap();
            assert!(ready_headers.is_empty());
        })
        .await;
    }
}
