use contract_watcher::{Header, Repo, UnsavedHeader, WatcherRepo};

pub const FIRST_BLOCK_NUMBER: i64 = 6194633;

pub fn random_fingerprint() -> String {
    format!("test-node-{}", rand::random::<u32>())
}

pub fn block_hash(block_number: i64) -> String {
    format!("0x{block_number:064x}")
}

/// Syncs headers for `block_numbers` under `eth_node_fingerprint`, sorted by block.
pub async fn create_headers(
    repo: &WatcherRepo,
    eth_node_fingerprint: &str,
    block_numbers: &[i64],
) -> Vec<Header> {
    let unsaved_headers: Vec<_> = block_numbers
        .iter()
        .map(|block_number| {
            UnsavedHeader::new(
                *block_number,
                &block_hash(*block_number),
                1_580_153_827 + block_number,
                eth_node_fingerprint,
            )
        })
        .collect();

    let pool = repo.get_pool(1).await.unwrap();
    let mut conn = WatcherRepo::get_conn(&pool).await.unwrap();

    let mut headers = WatcherRepo::create_headers(&mut conn, &unsaved_headers).await.unwrap();
    headers.sort_by_key(|header| header.block_number);

    headers
}
