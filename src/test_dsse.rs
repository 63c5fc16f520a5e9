#![cfg(test)]

use crate::{
    DEMO_VALUE_DOMAIN_SIZE, DocumentRank, MASTER_KEY_BYTE_LEN, MemoryBackend, Opcode,
    client::{ChainBucketSource, Client},
    encoder::{RankBucketEncoder, RankDirectory},
    query::{Predicate, PredicateEngine},
    server::Server,
};
use rand::prelude::*;
use rand_chacha::{ChaCha8Rng, ChaCha20Rng};
use std::collections::HashMap;

const DEMO_CORPUS: [(&str, u32); 7] = [("ID1", 22), ("ID2", 20), ("ID3", 18), ("ID4", 25), ("ID5", 30), ("ID6", 22), ("ID7", 18)];

fn generate_random_corpus(rng: &mut ChaCha8Rng, corpus_len: usize, domain_size: u32) -> Vec<(String, u32)> {
    (0..corpus_len).map(|idx| (format!("doc-{:05}", idx), rng.random_range(0..domain_size))).collect()
}

fn generate_master_key(rng: &mut ChaCha8Rng) -> [u8; MASTER_KEY_BYTE_LEN] {
    let mut master_key = [0u8; MASTER_KEY_BYTE_LEN];
    rng.fill_bytes(&mut master_key);
    master_key
}

#[test]
fn test_range_query_over_demo_corpus_with_persistent_store() {
    let store_dir = tempfile::tempdir().expect("Failed to create store directory");
    let mut rng = ChaCha8Rng::from_os_rng();

    let encoder = RankBucketEncoder::new(DEMO_VALUE_DOMAIN_SIZE).expect("Encoder setup failed");
    let encoded = encoder.encode(&DEMO_CORPUS).expect("Encoding failed");

    let mut client = Client::setup(&generate_master_key(&mut rng));
    let tokens = client.encode_token_stream(&encoded.token_stream()).expect("Client can't build update tokens");

    let server = Server::setup(store_dir.path()).expect("Server setup failed");
    server.update_batch(&tokens).expect("Server can't persist update tokens");

    let source = ChainBucketSource::new(&client, &server, encoded.directory.len());
    let engine = PredicateEngine::new(encoded.directory.len(), DEMO_VALUE_DOMAIN_SIZE);

    let answer = engine.evaluate(&source, Predicate::Between(18, 22)).expect("Predicate evaluation failed");
    assert_eq!(answer.iter_ones().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    assert_eq!(encoded.directory.resolve(&answer), Ok(vec!["ID3", "ID7", "ID2", "ID1", "ID6"]));

    let answer = engine.evaluate(&source, Predicate::Between(23, 29)).expect("Predicate evaluation failed");
    assert_eq!(encoded.directory.resolve(&answer), Ok(vec!["ID4"]));

    let answer = engine.evaluate(&source, Predicate::Between(26, 29)).expect("Predicate evaluation failed");
    assert_eq!(answer.count_ones(), 0);

    let answer = engine.evaluate(&source, Predicate::Gt(22)).expect("Predicate evaluation failed");
    assert_eq!(encoded.directory.resolve(&answer), Ok(vec!["ID4", "ID5"]));

    assert_eq!(server.missing_link_count(), 0);
}

#[test]
fn test_chain_index_survives_reopening_store() {
    let store_dir = tempfile::tempdir().expect("Failed to create store directory");
    let mut rng = ChaCha8Rng::from_os_rng();

    let encoder = RankBucketEncoder::new(DEMO_VALUE_DOMAIN_SIZE).expect("Encoder setup failed");
    let encoded = encoder.encode(&DEMO_CORPUS).expect("Encoding failed");
    let directory_bytes = encoded.directory.to_bytes().expect("Rank directory can't be serialized");

    let mut client = Client::setup(&generate_master_key(&mut rng));
    {
        let server = Server::setup(store_dir.path()).expect("Server setup failed");
        server.update_batch(&client.encode_token_stream(&encoded.token_stream()).unwrap()).unwrap();
    }

    // The same in-memory client keeps querying; the rank directory is restored from its serialized form.
    let directory = RankDirectory::from_bytes(&directory_bytes).expect("Rank directory can't be restored");
    let server = Server::setup(store_dir.path()).expect("Server can't reopen store");

    let source = ChainBucketSource::new(&client, &server, directory.len());
    let engine = PredicateEngine::new(directory.len(), DEMO_VALUE_DOMAIN_SIZE);

    let answer = engine.evaluate(&source, Predicate::Eq(22)).expect("Predicate evaluation failed");
    assert_eq!(directory.resolve(&answer), Ok(vec!["ID1", "ID6"]));

    // Appending after reopening extends the existing chain instead of starting a new one.
    server.update(&client.update_value(22, 6, Opcode::Insert).unwrap()).unwrap();
    let found = server.search(&client.search_token_for_value(22).unwrap()).unwrap();
    assert_eq!(found.iter().map(|rank| rank.to_i64().unwrap()).collect::<Vec<_>>(), vec![6, 4, 3]);
}

#[test]
fn test_random_corpora_range_queries_match_plain_scan() {
    const DOMAIN_SIZE: u32 = 48;
    const CORPUS_LEN: usize = 500;
    const NUM_QUERIES: usize = 64;

    let mut rng = ChaCha8Rng::from_os_rng();
    let corpus = generate_random_corpus(&mut rng, CORPUS_LEN, DOMAIN_SIZE);

    let encoder = RankBucketEncoder::new(DOMAIN_SIZE).expect("Encoder setup failed");
    let encoded = encoder.encode(&corpus).expect("Encoding failed");

    let mut client = Client::setup(&generate_master_key(&mut rng));
    let server = Server::with_backend(MemoryBackend::new());
    server.update_batch(&client.encode_token_stream(&encoded.token_stream()).unwrap()).unwrap();

    let source = ChainBucketSource::new(&client, &server, CORPUS_LEN);
    let engine = PredicateEngine::new(CORPUS_LEN, DOMAIN_SIZE);

    for _ in 0..NUM_QUERIES {
        let low = rng.random_range(0..DOMAIN_SIZE);
        let high = rng.random_range(low..DOMAIN_SIZE);

        let answer = engine.evaluate(&source, Predicate::Between(low, high)).expect("Predicate evaluation failed");
        let mut found = encoded.directory.resolve(&answer).unwrap();
        found.sort_unstable();

        let mut expected = corpus
            .iter()
            .filter(|(_, value)| (low..=high).contains(value))
            .map(|(id, _)| id.as_str())
            .collect::<Vec<_>>();
        expected.sort_unstable();

        assert_eq!(found, expected, "low = {}, high = {}", low, high);
    }
}

#[test]
fn test_chain_search_matches_net_insertions() {
    const NUM_KEYWORDS: usize = 8;
    const NUM_UPDATES: usize = 400;

    let mut rng = ChaCha8Rng::from_os_rng();
    let mut client = Client::from_rng(&generate_master_key(&mut rng), ChaCha20Rng::seed_from_u64(rng.random()));
    let server = Server::with_backend(MemoryBackend::new());

    // Per keyword, how many times each rank is currently inserted.
    let mut model: HashMap<usize, HashMap<i64, usize>> = HashMap::new();

    for _ in 0..NUM_UPDATES {
        let keyword = rng.random_range(0..NUM_KEYWORDS);
        let counts = model.entry(keyword).or_default();

        let present = counts.iter().filter(|&(_, &count)| count > 0).map(|(&rank, _)| rank).collect::<Vec<_>>();
        let (rank, opcode) = if !present.is_empty() && rng.random_bool(0.4) {
            (present[rng.random_range(0..present.len())], Opcode::Delete)
        } else {
            (rng.random_range(0..32i64), Opcode::Insert)
        };

        match opcode {
            Opcode::Insert => *counts.entry(rank).or_default() += 1,
            Opcode::Delete => *counts.entry(rank).or_default() -= 1,
        }

        let token = client.update(keyword.to_string().as_bytes(), DocumentRank::from_i64(rank).unwrap(), opcode);
        server.update(&token).expect("Server can't persist update token");
    }

    for (keyword, counts) in model {
        let token = client.search_token(keyword.to_string().as_bytes()).expect("Updated keyword must have a search token");

        let mut found = server.search(&token).unwrap().iter().map(|rank| rank.to_i64().unwrap()).collect::<Vec<_>>();
        found.sort_unstable();

        let mut expected = counts.iter().flat_map(|(&rank, &count)| std::iter::repeat_n(rank, count)).collect::<Vec<_>>();
        expected.sort_unstable();

        assert_eq!(found, expected, "keyword = {}", keyword);
    }

    assert_eq!(server.missing_link_count(), 0);
}

#[test]
fn test_concurrent_searches_over_shared_server() {
    const DOMAIN_SIZE: u32 = 32;
    const CORPUS_LEN: usize = 256;

    let mut rng = ChaCha8Rng::from_os_rng();
    let corpus = generate_random_corpus(&mut rng, CORPUS_LEN, DOMAIN_SIZE);

    let encoded = RankBucketEncoder::new(DOMAIN_SIZE).unwrap().encode(&corpus).unwrap();

    let mut client = Client::setup(&generate_master_key(&mut rng));
    let server = Server::with_backend(MemoryBackend::new());
    server.update_batch(&client.encode_token_stream(&encoded.token_stream()).unwrap()).unwrap();

    let client = &client;
    let server = &server;
    let encoded = &encoded;

    std::thread::scope(|scope| {
        let handles = (0..DOMAIN_SIZE)
            .map(|value| {
                scope.spawn(move || {
                    let source = ChainBucketSource::new(client, server, CORPUS_LEN);
                    let engine = PredicateEngine::new(CORPUS_LEN, DOMAIN_SIZE);

                    let answer = engine.evaluate(&source, Predicate::Eq(value)).unwrap();
                    (value, answer.iter_ones().collect::<Vec<_>>())
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let (value, ranks) = handle.join().expect("Search thread panicked");
            let expected: Vec<usize> = encoded.buckets[value as usize]
                .high_rank
                .map_or(vec![], |high_rank| (encoded.buckets[value as usize].low_rank..=high_rank).collect());

            assert_eq!(ranks, expected, "value = {}", value);
        }
    });
}
