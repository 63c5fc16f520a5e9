//! Encodes a small corpus, stores it in an on-disk chain index and answers a range query over it.
//!
//! Run with `cargo run --example range_query -- 18 22`; set `RUST_LOG=range_dsse=debug` to follow the chain walks.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use range_dsse::{
    DEMO_VALUE_DOMAIN_SIZE, MASTER_KEY_BYTE_LEN,
    client::{ChainBucketSource, Client},
    encoder::RankBucketEncoder,
    query::{Predicate, PredicateEngine},
    server::Server,
};
use tracing_subscriber::EnvFilter;

const CORPUS: [(&str, u32); 7] = [("ID1", 22), ("ID2", 20), ("ID3", 18), ("ID4", 25), ("ID5", 30), ("ID6", 22), ("ID7", 18)];

fn parse_bounds() -> Result<(u32, u32), String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    match args.as_slice() {
        [] => Ok((18, 22)),
        [low, high] => {
            let low = low.parse::<u32>().map_err(|err| format!("bad lower bound '{}': {}", low, err))?;
            let high = high.parse::<u32>().map_err(|err| format!("bad upper bound '{}': {}", high, err))?;
            Ok((low, high))
        }
        _ => Err(String::from("usage: range_query [LOW HIGH]")),
    }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let (low, high) = match parse_bounds() {
        Ok(bounds) => bounds,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(1);
        }
    };

    let encoder = RankBucketEncoder::new(DEMO_VALUE_DOMAIN_SIZE).expect("Value domain must not be empty");
    let encoded = encoder.encode(&CORPUS).expect("Failed to encode corpus");

    println!("Corpus, in rank order:");
    for rank in 0..encoded.directory.len() {
        let id = encoded.directory.document(rank).unwrap_or_default();
        let value = CORPUS.iter().find(|(doc, _)| *doc == id).map_or(0, |(_, value)| *value);
        println!("  rank {} -> {} (value {})", rank, id, value);
    }

    let mut rng = ChaCha8Rng::from_os_rng();
    let mut master_key = [0u8; MASTER_KEY_BYTE_LEN];
    rng.fill_bytes(&mut master_key);

    let mut client = Client::setup(&master_key);
    let tokens = client.encode_token_stream(&encoded.token_stream()).expect("Failed to build update tokens");

    let store_dir = tempfile::tempdir().expect("Failed to create store directory");
    let server = Server::setup(store_dir.path()).expect("Server setup failed");
    server.update_batch(&tokens).expect("Server failed to persist update tokens");
    println!("Stored {} chain links under {}", tokens.len(), store_dir.path().display());

    let source = ChainBucketSource::new(&client, &server, encoded.directory.len());
    let engine = PredicateEngine::new(encoded.directory.len(), DEMO_VALUE_DOMAIN_SIZE);

    let answer = engine.evaluate(&source, Predicate::Between(low, high)).expect("Failed to evaluate range predicate");
    let documents = encoded.directory.resolve(&answer).expect("Answer must cover the whole corpus");

    println!("Bit vector of [{}, {}]: {}", low, high, answer);
    println!("Documents valued within [{}, {}]: {:?}", low, high, documents);
}
