//! Appends insertions and deletions to one keyword's chain and shows what a search reconstructs after each step.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use range_dsse::{DocumentRank, MASTER_KEY_BYTE_LEN, MemoryBackend, Opcode, client::Client, server::Server};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut rng = ChaCha8Rng::from_os_rng();
    let mut master_key = [0u8; MASTER_KEY_BYTE_LEN];
    rng.fill_bytes(&mut master_key);

    let mut client = Client::setup(&master_key);
    let server = Server::with_backend(MemoryBackend::new());

    let keyword = b"colour:red";
    let updates = [(1, Opcode::Insert), (2, Opcode::Insert), (3, Opcode::Insert), (2, Opcode::Delete), (2, Opcode::Insert), (1, Opcode::Delete)];

    for (rank, opcode) in updates {
        let rank = DocumentRank::from_i64(rank).expect("Rank fits in its field");

        let token = client.update(keyword, rank, opcode);
        server.update(&token).expect("Server failed to persist update token");

        let search_token = client.search_token(keyword).expect("Keyword was just updated");
        let found = server.search(&search_token).expect("Server failed to search");

        println!(
            "{:?} {} -> chain of {} link(s), current ranks: [{}]",
            opcode,
            rank,
            search_token.chain_length,
            found.iter().map(|rank| rank.to_string()).collect::<Vec<_>>().join(", ")
        );
    }
}
